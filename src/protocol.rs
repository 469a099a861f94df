//! Wire models for the room message channel.
//!
//! Every frame is `{"type": <string>, "data": <object>}`; the enums below
//! own the framing on both directions.

use serde::{Deserialize, Serialize};

use crate::media::AudioPlayback;
use crate::models::{AnswerKind, Player, Room, RoundConfig, Session};
use crate::scoring::{FinalScore, RankedScore};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
/// Message received from a client.
pub enum ClientMessage {
    #[serde(rename = "player:join", rename_all = "camelCase")]
    /// Attach as a player to the room.
    PlayerJoin {
        /// Display name, unique within the room.
        name: String,
    },

    #[serde(rename = "player:leave")]
    /// Leave the room for good.
    PlayerLeave,

    #[serde(rename = "player:kick", rename_all = "camelCase")]
    /// Remove a player from the room. Master only.
    PlayerKick { player_id: String },

    #[serde(rename = "state:sync")]
    /// Request a full snapshot of the room state.
    StateSync,

    #[serde(rename = "player:buzz", rename_all = "camelCase")]
    /// Claim the right to answer the current song.
    PlayerBuzz {
        song_index: usize,
        /// Client-side millisecond tick; arbitrates races.
        timestamp: u64,
    },

    #[serde(rename = "player:answer", rename_all = "camelCase")]
    /// Submit an answer for the current song.
    PlayerAnswer {
        song_index: usize,
        #[serde(rename = "type")]
        kind: AnswerKind,
        value: String,
    },

    #[serde(rename = "game:start", rename_all = "camelCase")]
    /// Start the game with the given round plan. Master only.
    GameStart { rounds: Vec<RoundConfig> },

    #[serde(rename = "game:pause")]
    /// Pause gameplay. Master only.
    GamePause,

    #[serde(rename = "game:resume")]
    /// Resume gameplay. Master only.
    GameResume,

    #[serde(rename = "game:skip")]
    /// Skip the current song, or advance past the round break. Master only.
    GameSkip,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// Choices shown to a player. The correct value stays server-side.
pub struct QuestionView {
    pub kind: AnswerKind,
    pub choices: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// Snapshot of the round in progress, sent on `state:synced`.
pub struct RoundSnapshot {
    pub round_index: usize,
    pub mode_type: String,
    pub media_type: String,
    pub song_count: usize,
    pub current_song_index: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
/// Message sent to a client.
pub enum ServerMessage {
    #[serde(rename = "connected", rename_all = "camelCase")]
    /// Handshake acknowledgement.
    Connected { room_id: String },

    #[serde(rename = "state:synced", rename_all = "camelCase")]
    /// Full snapshot of the room state.
    StateSynced {
        room: Room,
        players: Vec<Player>,
        #[serde(skip_serializing_if = "Option::is_none")]
        current_round: Option<RoundSnapshot>,
    },

    #[serde(rename = "error", rename_all = "camelCase")]
    /// An action failed; sent only to the originating socket.
    Error { code: String, message: String },

    #[serde(rename = "player:joined", rename_all = "camelCase")]
    PlayerJoined { player: Player, room: Room },

    #[serde(rename = "player:left", rename_all = "camelCase")]
    PlayerLeft {
        player_id: String,
        player_name: String,
        remaining_players: usize,
    },

    #[serde(rename = "player:kicked", rename_all = "camelCase")]
    /// Sent to the kicked player only.
    PlayerKicked { reason: String },

    #[serde(rename = "player:disconnected", rename_all = "camelCase")]
    PlayerDisconnected {
        player_id: String,
        player_name: String,
    },

    #[serde(rename = "player:reconnected", rename_all = "camelCase")]
    PlayerReconnected {
        player_id: String,
        player_name: String,
    },

    #[serde(rename = "game:started", rename_all = "camelCase")]
    GameStarted { session: Session, room: Room },

    #[serde(rename = "round:started", rename_all = "camelCase")]
    RoundStarted {
        round_index: usize,
        mode_type: String,
        media_type: String,
        song_count: usize,
    },

    #[serde(rename = "song:started", rename_all = "camelCase")]
    SongStarted {
        song_index: usize,
        /// Effective clip length in seconds.
        duration: u32,
        clip_start: u32,
        audio_playback: AudioPlayback,
        /// Master only; players never see the answers.
        #[serde(skip_serializing_if = "Option::is_none")]
        song_title: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        song_artist: Option<String>,
    },

    #[serde(rename = "player:buzzed", rename_all = "camelCase")]
    PlayerBuzzed {
        player_id: String,
        player_name: String,
        song_index: usize,
        timestamp: u64,
        /// Buzzer only.
        #[serde(skip_serializing_if = "Option::is_none")]
        artist_question: Option<QuestionView>,
    },

    #[serde(rename = "buzz:rejected", rename_all = "camelCase")]
    /// Sent to the losing player only.
    BuzzRejected { player_id: String, reason: String },

    #[serde(rename = "answer:result", rename_all = "camelCase")]
    AnswerResult {
        player_id: String,
        player_name: String,
        answer_type: AnswerKind,
        is_correct: bool,
        points_awarded: i32,
    },

    #[serde(rename = "choices:artist", rename_all = "camelCase")]
    /// Artist choices, sent to the prompted player only.
    ChoicesArtist {
        player_id: String,
        choices: Vec<String>,
    },

    #[serde(rename = "choices:title", rename_all = "camelCase")]
    /// Title choices, sent to the prompted player only.
    ChoicesTitle {
        player_id: String,
        choices: Vec<String>,
    },

    #[serde(rename = "song:ended", rename_all = "camelCase")]
    SongEnded {
        song_index: usize,
        correct_title: String,
        correct_artist: String,
    },

    #[serde(rename = "round:ended", rename_all = "camelCase")]
    RoundEnded {
        round_index: usize,
        scores: Vec<RankedScore>,
    },

    #[serde(rename = "round:between", rename_all = "camelCase")]
    RoundBetween {
        completed_round_index: usize,
        next_round_index: usize,
        next_round_mode: String,
        next_round_media: String,
        scores: Vec<RankedScore>,
    },

    #[serde(rename = "game:ended", rename_all = "camelCase")]
    GameEnded { final_scores: Vec<FinalScore> },

    #[serde(rename = "game:paused")]
    GamePaused,

    #[serde(rename = "game:resumed")]
    GameResumed,

    #[serde(rename = "game:skipped")]
    GameSkipped,
}

impl ServerMessage {
    /// The wire tag of this message, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Connected { .. } => "connected",
            Self::StateSynced { .. } => "state:synced",
            Self::Error { .. } => "error",
            Self::PlayerJoined { .. } => "player:joined",
            Self::PlayerLeft { .. } => "player:left",
            Self::PlayerKicked { .. } => "player:kicked",
            Self::PlayerDisconnected { .. } => "player:disconnected",
            Self::PlayerReconnected { .. } => "player:reconnected",
            Self::GameStarted { .. } => "game:started",
            Self::RoundStarted { .. } => "round:started",
            Self::SongStarted { .. } => "song:started",
            Self::PlayerBuzzed { .. } => "player:buzzed",
            Self::BuzzRejected { .. } => "buzz:rejected",
            Self::AnswerResult { .. } => "answer:result",
            Self::ChoicesArtist { .. } => "choices:artist",
            Self::ChoicesTitle { .. } => "choices:title",
            Self::SongEnded { .. } => "song:ended",
            Self::RoundEnded { .. } => "round:ended",
            Self::RoundBetween { .. } => "round:between",
            Self::GameEnded { .. } => "game:ended",
            Self::GamePaused => "game:paused",
            Self::GameResumed => "game:resumed",
            Self::GameSkipped => "game:skipped",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_frames_decode_from_the_documented_shape() {
        let msg: ClientMessage =
            serde_json::from_str(r#"{"type": "player:join", "data": {"name": "Ada"}}"#).unwrap();
        assert!(matches!(msg, ClientMessage::PlayerJoin { ref name } if name == "Ada"));

        let msg: ClientMessage = serde_json::from_str(
            r#"{"type": "player:buzz", "data": {"songIndex": 2, "timestamp": 120}}"#,
        )
        .unwrap();
        assert!(matches!(
            msg,
            ClientMessage::PlayerBuzz {
                song_index: 2,
                timestamp: 120
            }
        ));

        let msg: ClientMessage = serde_json::from_str(
            r#"{"type": "player:answer", "data": {"songIndex": 0, "type": "artist", "value": "Queen"}}"#,
        )
        .unwrap();
        assert!(matches!(
            msg,
            ClientMessage::PlayerAnswer {
                kind: AnswerKind::Artist,
                ..
            }
        ));
    }

    #[test]
    fn dataless_client_frames_decode() {
        let msg: ClientMessage = serde_json::from_str(r#"{"type": "state:sync"}"#).unwrap();
        assert!(matches!(msg, ClientMessage::StateSync));

        let msg: ClientMessage = serde_json::from_str(r#"{"type": "game:pause"}"#).unwrap();
        assert!(matches!(msg, ClientMessage::GamePause));
    }

    #[test]
    fn unknown_type_fails_to_decode() {
        assert!(serde_json::from_str::<ClientMessage>(r#"{"type": "player:dance"}"#).is_err());
    }

    #[test]
    fn server_frames_carry_tag_and_camel_case_data() {
        let frame = serde_json::to_value(ServerMessage::BuzzRejected {
            player_id: "p1".to_string(),
            reason: "locked_out".to_string(),
        })
        .unwrap();

        assert_eq!(frame["type"], "buzz:rejected");
        assert_eq!(frame["data"]["playerId"], "p1");
    }

    #[test]
    fn song_started_omits_answers_unless_present() {
        let frame = serde_json::to_value(ServerMessage::SongStarted {
            song_index: 0,
            duration: 30,
            clip_start: 10,
            audio_playback: AudioPlayback::Master,
            song_title: None,
            song_artist: None,
        })
        .unwrap();

        assert!(frame["data"].get("songTitle").is_none());
        assert_eq!(frame["data"]["audioPlayback"], "master");
    }

    #[test]
    fn kind_matches_wire_tag() {
        let message = ServerMessage::GamePaused;
        let frame = serde_json::to_value(&message).unwrap();
        assert_eq!(frame["type"], message.kind());
    }
}
