//! Repository contracts the engine depends on, plus the in-memory
//! reference implementations used by the binary and the tests.

mod memory;

pub use memory::{
    MemoryPlaylistRepository, MemoryPlayerRepository, MemoryRoomRepository,
    MemorySessionRepository, MemorySongRepository,
};

use std::fmt::{self, Display, Formatter};
use std::path::Path;
use std::result::Result as StdResult;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use crate::models::{
    Player, PlayerRole, PlayerStats, Playlist, Room, RoomStatus, Round, Session, SessionStatus,
    Song, SongFilters,
};

/// Result type for the storage layer.
pub type Result<T> = StdResult<T, Error>;

#[derive(Debug, Clone, PartialEq, Eq)]
/// Errors raised by repository implementations.
pub enum Error {
    /// No record with the given id or key.
    NotFound {
        entity: &'static str,
        key: String,
    },
    /// A uniqueness invariant would be violated.
    Conflict(String),
    /// The record is malformed.
    Validation(String),
    /// The backing store failed.
    Backend(String),
}

impl Error {
    /// Shorthand for a missing record.
    pub fn not_found(entity: &'static str, key: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            key: key.into(),
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound { entity, key } => write!(f, "{} '{}' was not found", entity, key),
            Self::Conflict(detail) => write!(f, "conflict: {}", detail),
            Self::Validation(detail) => write!(f, "validation: {}", detail),
            Self::Backend(detail) => write!(f, "storage backend error: {}", detail),
        }
    }
}

impl std::error::Error for Error {}

#[derive(Debug, Clone)]
/// Attributes required to create a room.
pub struct NewRoom {
    pub name: String,
    pub max_players: usize,
    pub master_ip: Option<String>,
}

#[derive(Debug, Clone, Default)]
/// Mutable subset of a room.
pub struct RoomPatch {
    pub name: Option<String>,
    pub status: Option<RoomStatus>,
    pub max_players: Option<usize>,
}

#[derive(Debug, Clone)]
/// Attributes required to create a player.
pub struct NewPlayer {
    pub room_id: String,
    pub name: String,
    pub role: PlayerRole,
}

#[derive(Debug, Clone, Default)]
/// Mutable subset of a player.
pub struct PlayerPatch {
    pub connected: Option<bool>,
    pub score: Option<i32>,
    pub round_score: Option<i32>,
    pub is_active: Option<bool>,
    pub is_locked_out: Option<bool>,
    pub stats: Option<PlayerStats>,
}

#[derive(Debug, Clone)]
/// Similarity query for distractor pools.
pub struct SimilarQuery {
    pub genre: Option<String>,
    pub year_min: Option<i32>,
    pub year_max: Option<i32>,
    pub language: Option<String>,
    pub exclude_song_id: Option<String>,
    pub limit: usize,
}

#[async_trait]
/// Access to room records.
pub trait RoomRepository: Send + Sync {
    async fn find_by_id(&self, id: &str) -> Result<Room>;
    async fn find_by_code(&self, code: &str) -> Result<Room>;
    async fn find_by_status(&self, status: RoomStatus) -> Result<Vec<Room>>;
    async fn create(&self, new: NewRoom) -> Result<Room>;
    async fn update(&self, id: &str, patch: RoomPatch) -> Result<Room>;
    async fn delete(&self, id: &str) -> Result<()>;
    /// The room's opaque master secret. Never exposed over the wire.
    async fn master_token(&self, id: &str) -> Result<String>;
}

#[async_trait]
/// Access to player records.
pub trait PlayerRepository: Send + Sync {
    async fn find_by_id(&self, id: &str) -> Result<Player>;
    async fn find_by_room(&self, room_id: &str) -> Result<Vec<Player>>;
    async fn find_by_room_and_name(&self, room_id: &str, name: &str) -> Result<Player>;
    /// Connected players with the `player` role.
    async fn count_connected(&self, room_id: &str) -> Result<usize>;
    async fn create(&self, new: NewPlayer) -> Result<Player>;
    async fn update(&self, id: &str, patch: PlayerPatch) -> Result<Player>;
    async fn delete(&self, id: &str) -> Result<()>;
    async fn delete_by_room(&self, room_id: &str) -> Result<usize>;
    /// Zeroes `score` and `roundScore` for every player of the room.
    async fn reset_scores(&self, room_id: &str) -> Result<()>;
}

#[async_trait]
/// Access to session records.
pub trait SessionRepository: Send + Sync {
    async fn find_by_id(&self, id: &str) -> Result<Session>;
    async fn find_by_room(&self, room_id: &str) -> Result<Vec<Session>>;
    async fn create(&self, room_id: &str) -> Result<Session>;
    async fn set_status(&self, id: &str, status: SessionStatus) -> Result<Session>;
    async fn delete(&self, id: &str) -> Result<()>;
    async fn delete_by_room(&self, room_id: &str) -> Result<usize>;
    async fn end_session(&self, id: &str) -> Result<Session>;
    /// Advances to the next round; resets the song cursor.
    async fn next_round(&self, id: &str) -> Result<Session>;
    async fn next_song(&self, id: &str) -> Result<Session>;
    /// Stores a materialised round. Rounds are immutable once active.
    async fn add_round(&self, round: Round) -> Result<()>;
    async fn rounds_of(&self, session_id: &str) -> Result<Vec<Round>>;
}

#[async_trait]
/// Access to the song library.
pub trait SongRepository: Send + Sync {
    async fn find_by_id(&self, id: &str) -> Result<Song>;
    /// Looks up songs preserving the order of `ids`.
    async fn find_by_ids(&self, ids: &[String]) -> Result<Vec<Song>>;
    /// Random selection matching the filters, capped at the pool size.
    async fn find_by_filters(&self, filters: &SongFilters) -> Result<Vec<Song>>;
    /// Candidates for distractor pools.
    async fn find_similar(&self, query: &SimilarQuery) -> Result<Vec<Song>>;
    async fn get_random(&self, count: usize, include_niche: bool) -> Result<Vec<Song>>;
    async fn create(&self, song: Song) -> Result<Song>;
    async fn update(&self, song: Song) -> Result<Song>;
    async fn delete(&self, id: &str) -> Result<()>;
}

#[async_trait]
/// Access to playlists.
pub trait PlaylistRepository: Send + Sync {
    async fn find_by_id(&self, id: &str) -> Result<Playlist>;
    async fn create(&self, name: &str, song_ids: Vec<String>) -> Result<Playlist>;
    async fn rename(&self, id: &str, name: &str) -> Result<Playlist>;
    async fn delete(&self, id: &str) -> Result<()>;
    /// Replaces the ordered song list.
    async fn set_songs(&self, id: &str, song_ids: Vec<String>) -> Result<Playlist>;
}

#[derive(Clone)]
/// Bundle of every repository the engine needs.
pub struct Repositories {
    pub rooms: Arc<dyn RoomRepository>,
    pub players: Arc<dyn PlayerRepository>,
    pub sessions: Arc<dyn SessionRepository>,
    pub songs: Arc<dyn SongRepository>,
    pub playlists: Arc<dyn PlaylistRepository>,
}

impl Repositories {
    /// In-memory repositories backing the binary and the tests.
    pub fn in_memory() -> Self {
        Self {
            rooms: Arc::new(MemoryRoomRepository::default()),
            players: Arc::new(MemoryPlayerRepository::default()),
            sessions: Arc::new(MemorySessionRepository::default()),
            songs: Arc::new(MemorySongRepository::default()),
            playlists: Arc::new(MemoryPlaylistRepository::default()),
        }
    }
}

#[derive(Debug, Deserialize)]
/// On-disk shape of a library seed file.
struct LibraryFile {
    #[serde(default)]
    songs: Vec<Song>,
    #[serde(default)]
    playlists: Vec<LibraryPlaylist>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LibraryPlaylist {
    name: String,
    song_ids: Vec<String>,
}

/// Seeds the song and playlist repositories from a JSON library file.
///
/// Returns the number of songs loaded.
pub async fn seed_library(repos: &Repositories, path: &Path) -> Result<usize> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| Error::Backend(format!("cannot read library file: {}", e)))?;

    let library: LibraryFile = serde_json::from_str(&raw)
        .map_err(|e| Error::Validation(format!("malformed library file: {}", e)))?;

    let count = library.songs.len();

    for song in library.songs {
        repos.songs.create(song).await?;
    }

    for playlist in library.playlists {
        repos
            .playlists
            .create(&playlist.name, playlist.song_ids)
            .await?;
    }

    Ok(count)
}

#[cfg(test)]
/// Builds a song record for tests.
pub fn test_song(id: &str, title: &str, artist: &str, year: i32, genre: Option<&str>) -> Song {
    Song {
        id: id.to_string(),
        title: title.to_string(),
        artist: artist.to_string(),
        album: None,
        year,
        genre: genre.map(str::to_string),
        language: None,
        duration: 180,
        clip_start: 30,
        clip_duration: 30,
        file_path: format!("/library/{id}.mp3"),
        format: "mp3".to_string(),
        niche: false,
    }
}
