//! Music media kind, the one served by core gameplay.

use crate::models::Song;

use super::{AudioPlayback, Error, MediaContent, MediaMetadata, MediaHandler, Result};

/// Audio tracks played from the library.
pub struct MusicMedia;

impl MediaHandler for MusicMedia {
    fn media_type(&self) -> &'static str {
        "music"
    }

    fn load_content(&self, song: &Song) -> Result<MediaContent> {
        if song.file_path.is_empty() {
            return Err(Error::InvalidContent(format!(
                "song {} has no file path",
                song.id
            )));
        }

        Ok(MediaContent {
            id: song.id.clone(),
            title: song.title.clone(),
            artist: Some(song.artist.clone()),
            file_path: Some(song.file_path.clone()),
            text: None,
            metadata: MediaMetadata {
                album: song.album.clone(),
                year: Some(song.year),
                genre: song.genre.clone(),
                language: song.language.clone(),
                duration: Some(song.duration),
            },
        })
    }

    fn audio_playback(&self) -> AudioPlayback {
        // The master's device owns playback.
        AudioPlayback::Master
    }
}
