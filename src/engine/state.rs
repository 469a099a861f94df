//! Live gameplay state owned by a room's engine.
//!
//! Everything here is ephemeral: it is materialised at game start and
//! dropped when the room finishes. Only the records in [`crate::models`]
//! are persisted.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::media::{MediaContent, MediaHandler};
use crate::models::{
    Answer, AnswerKind, Player, Round, RoundSongStatus, Session, Song,
};
use crate::modes::GameMode;
use crate::params::ModeParams;
use crate::questions::Question;

#[derive(Debug)]
/// One song of a round, with its live buzz and answer state.
pub struct LiveSong {
    /// Position within the round, 0-based.
    pub index: usize,
    pub song: Song,
    pub content: MediaContent,
    pub status: RoundSongStatus,
    /// The player currently answering, if any.
    pub active_player_id: Option<String>,
    /// Players excluded from buzzing for this song.
    pub locked_out: HashSet<String>,
    /// Client-provided millisecond ticks, one per buzzing player.
    pub buzz_timestamps: HashMap<String, u64>,
    pub title_question: Option<Question>,
    pub artist_question: Option<Question>,
    /// Submitted answers, append-only.
    pub answers: Vec<Answer>,
    /// Effective parameters for this song.
    pub params: ModeParams,
    /// When playback started. Drives answer timing stats.
    pub started_at: Option<tokio::time::Instant>,
}

impl LiveSong {
    /// Builds a pending song.
    pub fn new(index: usize, song: Song, content: MediaContent, params: ModeParams) -> Self {
        Self {
            index,
            song,
            content,
            status: RoundSongStatus::Pending,
            active_player_id: None,
            locked_out: HashSet::new(),
            buzz_timestamps: HashMap::new(),
            title_question: None,
            artist_question: None,
            answers: Vec::new(),
            params,
            started_at: None,
        }
    }

    /// Milliseconds since playback started.
    pub fn elapsed_ms(&self) -> u64 {
        self.started_at
            .map(|started| started.elapsed().as_millis() as u64)
            .unwrap_or(0)
    }

    /// Whether the song accepts buzzes or answers.
    pub fn is_open(&self) -> bool {
        matches!(
            self.status,
            RoundSongStatus::Playing | RoundSongStatus::Answering
        )
    }

    /// Whether `player_id` already answered the given question kind.
    pub fn has_answer(&self, player_id: &str, kind: AnswerKind) -> bool {
        self.answers
            .iter()
            .any(|a| a.player_id == player_id && a.kind == kind)
    }

    /// Whether `player_id` submitted any answer for this song.
    pub fn has_any_answer(&self, player_id: &str) -> bool {
        self.answers.iter().any(|a| a.player_id == player_id)
    }

    /// Whether `player_id` answered both question kinds.
    pub fn answered_both(&self, player_id: &str) -> bool {
        self.has_answer(player_id, AnswerKind::Title)
            && self.has_answer(player_id, AnswerKind::Artist)
    }

    /// Whether a prior answer of `kind` by `player_id` was correct.
    pub fn answered_correctly(&self, player_id: &str, kind: AnswerKind) -> bool {
        self.answers
            .iter()
            .any(|a| a.player_id == player_id && a.kind == kind && a.is_correct)
    }

    /// Whether any player resolved the song with a correct answer.
    pub fn any_correct(&self) -> bool {
        self.answers.iter().any(|a| a.is_correct)
    }

    /// The question matching an answer kind, when the mode generated one.
    pub fn question(&self, kind: AnswerKind) -> Option<&Question> {
        match kind {
            AnswerKind::Title => self.title_question.as_ref(),
            AnswerKind::Artist => self.artist_question.as_ref(),
        }
    }
}

/// One round of a running game.
pub struct LiveRound {
    /// The materialised round definition.
    pub def: Round,
    pub mode: Arc<dyn GameMode>,
    pub media: Arc<dyn MediaHandler>,
    pub songs: Vec<LiveSong>,
    /// Index of the song being played.
    pub current_song: usize,
}

impl LiveRound {
    /// The song currently in play.
    pub fn song(&self) -> Option<&LiveSong> {
        self.songs.get(self.current_song)
    }

    /// Mutable access to the song currently in play.
    pub fn song_mut(&mut self) -> Option<&mut LiveSong> {
        self.songs.get_mut(self.current_song)
    }

    /// Whether every song of the round is finished.
    pub fn finished(&self) -> bool {
        self.songs
            .iter()
            .all(|s| s.status == RoundSongStatus::Finished)
    }
}

/// A running game: the session plus its frozen roster and rounds.
pub struct LiveGame {
    pub session: Session,
    /// Roster frozen at game start, keyed by player id. Masters excluded.
    pub players: HashMap<String, Player>,
    /// Per-player scores of finished rounds, in round order.
    pub round_history: HashMap<String, Vec<i32>>,
    pub rounds: Vec<LiveRound>,
    pub current_round: usize,
}

impl LiveGame {
    /// The round currently in play.
    pub fn round(&self) -> Option<&LiveRound> {
        self.rounds.get(self.current_round)
    }

    /// Mutable access to the round currently in play.
    pub fn round_mut(&mut self) -> Option<&mut LiveRound> {
        self.rounds.get_mut(self.current_round)
    }

    /// Whether the current round is the last one.
    pub fn on_last_round(&self) -> bool {
        self.current_round + 1 >= self.rounds.len()
    }

    /// Connected competitors, the denominator for lockout checks.
    pub fn active_player_count(&self) -> usize {
        self.players.values().filter(|p| p.connected).count()
    }

    /// Round-score entries for ranking.
    pub fn round_entries(&self) -> Vec<(String, String, i32)> {
        self.players
            .values()
            .map(|p| (p.id.clone(), p.name.clone(), p.round_score))
            .collect()
    }

    /// Session-total entries for ranking.
    pub fn total_entries(&self) -> Vec<(String, String, i32)> {
        self.players
            .values()
            .map(|p| (p.id.clone(), p.name.clone(), p.score))
            .collect()
    }
}
