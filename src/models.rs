//! Persistent records and their status enums.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::params::ParamsOverride;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
/// Lifecycle of a room.
pub enum RoomStatus {
    /// Players are gathering, configuration may still change.
    Lobby,
    /// A game is running.
    Playing,
    /// A round finished and the next one has not started yet.
    BetweenRounds,
    /// The game is over.
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
/// Role of a participant within a room.
pub enum PlayerRole {
    /// Drives the game. At most one per room.
    Master,
    /// Competes for points.
    Player,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
/// Lifecycle of a game session.
pub enum SessionStatus {
    Waiting,
    Playing,
    Paused,
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
/// Lifecycle of a round.
pub enum RoundStatus {
    Pending,
    Active,
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
/// Lifecycle of a single song within a round.
pub enum RoundSongStatus {
    Pending,
    Playing,
    Answering,
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
/// Which question an answer responds to.
pub enum AnswerKind {
    Title,
    Artist,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// A room participants connect to.
pub struct Room {
    pub id: String,
    pub name: String,
    /// Join code, unique across live rooms.
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub master_ip: Option<String>,
    pub status: RoomStatus,
    pub max_players: usize,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Opaque secret proving master identity. Never serialised after creation.
    #[serde(skip_serializing, default)]
    pub master_token: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// Per-player gameplay counters.
pub struct PlayerStats {
    pub buzzes: u32,
    pub correct_answers: u32,
    pub wrong_answers: u32,
    /// Fastest accepted buzz, in milliseconds from song start.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub best_buzz_ms: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// A participant bound to a room.
pub struct Player {
    pub id: String,
    pub room_id: String,
    /// Unique within the room, 1-20 chars, no angle brackets.
    pub name: String,
    pub role: PlayerRole,
    pub connected: bool,
    /// Session total. May go negative when penalties apply.
    pub score: i32,
    /// Current round only. Reset when a round becomes active.
    pub round_score: i32,
    /// Holds the current buzz.
    pub is_active: bool,
    /// Excluded from buzzing for the current song.
    pub is_locked_out: bool,
    pub stats: PlayerStats,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// One play-through of a room's rounds.
pub struct Session {
    pub id: String,
    pub room_id: String,
    pub status: SessionStatus,
    pub current_round_index: usize,
    pub current_song_index: usize,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// A round definition, materialised at game start and immutable once active.
pub struct Round {
    pub id: String,
    pub session_id: String,
    /// 0-based and dense within the session.
    pub index: usize,
    pub mode_type: String,
    pub media_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<ParamsOverride>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub song_filters: Option<SongFilters>,
    pub status: RoundStatus,
    /// Materialised song list, in play order.
    pub song_ids: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// A content record in the song library.
pub struct Song {
    pub id: String,
    pub title: String,
    pub artist: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub album: Option<String>,
    pub year: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub genre: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    /// Full track duration in seconds.
    pub duration: u32,
    /// Offset in seconds where the playable clip starts.
    pub clip_start: u32,
    /// Length of the playable clip in seconds.
    pub clip_duration: u32,
    pub file_path: String,
    pub format: String,
    /// Niche tracks are excluded from pools unless explicitly requested.
    #[serde(default)]
    pub niche: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// A submitted answer and its outcome.
pub struct Answer {
    pub id: String,
    pub player_id: String,
    pub round_id: String,
    pub song_id: String,
    #[serde(rename = "type")]
    pub kind: AnswerKind,
    pub value: String,
    pub submitted_at: DateTime<Utc>,
    /// Milliseconds between song start and submission.
    pub time_to_answer_ms: u64,
    pub is_correct: bool,
    pub points_awarded: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// An ordered list of songs.
pub struct Playlist {
    pub id: String,
    pub name: String,
    pub song_ids: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// Pool selector used to materialise a round's songs.
pub struct SongFilters {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub genre: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year_min: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year_max: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artist_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub song_count: Option<usize>,
    #[serde(default)]
    pub include_niche: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// Round configuration supplied by the master at game start.
pub struct RoundConfig {
    pub mode_type: String,
    pub media_type: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub params: Option<ParamsOverride>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub song_filters: Option<SongFilters>,
    /// Explicit song list; takes precedence over filters.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub song_ids: Option<Vec<String>>,
}
