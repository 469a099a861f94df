//! Media handlers: normalise library content and drive choice generation.

mod music;

pub use music::MusicMedia;

use std::collections::HashMap;
use std::fmt::{self, Display, Formatter};
use std::result::Result as StdResult;
use std::sync::{Arc, LazyLock};

use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::models::{AnswerKind, Song};
use crate::questions;
use crate::utils::text::normalized_eq;

/// Result type for the media layer.
pub type Result<T> = StdResult<T, Error>;

#[derive(Debug, Clone, PartialEq, Eq)]
/// Errors that can occur when loading media content.
pub enum Error {
    /// The media kind is registered but does not serve content yet.
    Unsupported(&'static str),
    /// The record cannot be normalised into playable content.
    InvalidContent(String),
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unsupported(kind) => write!(f, "media kind '{}' does not serve content", kind),
            Self::InvalidContent(detail) => write!(f, "invalid media content: {}", detail),
        }
    }
}

impl std::error::Error for Error {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
/// Which participants play the audio for a song.
pub enum AudioPlayback {
    Master,
    Players,
    All,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// Secondary attributes carried by a normalised content item.
pub struct MediaMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub album: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub genre: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// Normalised view of a content item, independent of its media kind.
pub struct MediaContent {
    pub id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artist: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    pub metadata: MediaMetadata,
}

impl MediaContent {
    /// The comparable value for a question kind.
    pub fn value_for(&self, kind: AnswerKind) -> Option<&str> {
        match kind {
            AnswerKind::Title => Some(&self.title),
            AnswerKind::Artist => self.artist.as_deref(),
        }
    }
}

/// A media kind plugged into the engine.
pub trait MediaHandler: Send + Sync {
    /// Registry tag of this media kind.
    fn media_type(&self) -> &'static str;

    /// Normalises a library record into playable content.
    fn load_content(&self, song: &Song) -> Result<MediaContent>;

    /// Which participants receive the playback instruction.
    fn audio_playback(&self) -> AudioPlayback;

    /// Builds `count` plausible wrong choices for `correct`.
    fn generate_wrong_choices(
        &self,
        correct: &MediaContent,
        pool: &[MediaContent],
        count: usize,
        kind: AnswerKind,
        rng: &mut dyn RngCore,
    ) -> Vec<String> {
        questions::wrong_choices(correct, pool, count, kind, rng)
    }

    /// Whether a submitted value matches the expected one.
    fn validate_match(&self, answer: &str, expected: &str) -> bool {
        normalized_eq(answer, expected)
    }
}

/// A registered media kind that does not serve content yet.
struct StubMedia {
    tag: &'static str,
    playback: AudioPlayback,
}

impl MediaHandler for StubMedia {
    fn media_type(&self) -> &'static str {
        self.tag
    }

    fn load_content(&self, _song: &Song) -> Result<MediaContent> {
        Err(Error::Unsupported(self.tag))
    }

    fn audio_playback(&self) -> AudioPlayback {
        self.playback
    }
}

/// The media registry, populated once at startup.
static MEDIA_REGISTRY: LazyLock<HashMap<&'static str, Arc<dyn MediaHandler>>> =
    LazyLock::new(|| {
        let handlers: [Arc<dyn MediaHandler>; 4] = [
            Arc::new(MusicMedia),
            Arc::new(StubMedia {
                tag: "picture",
                playback: AudioPlayback::All,
            }),
            Arc::new(StubMedia {
                tag: "video",
                playback: AudioPlayback::All,
            }),
            Arc::new(StubMedia {
                tag: "text_question",
                playback: AudioPlayback::All,
            }),
        ];

        handlers
            .into_iter()
            .map(|handler| (handler.media_type(), handler))
            .collect()
    });

/// Looks up a media handler by its tag.
pub fn media(tag: &str) -> Option<Arc<dyn MediaHandler>> {
    MEDIA_REGISTRY.get(tag).cloned()
}

/// Tags of every registered media kind.
pub fn all_media_types() -> Vec<&'static str> {
    let mut tags: Vec<_> = MEDIA_REGISTRY.keys().copied().collect();
    tags.sort_unstable();
    tags
}
