//! Game modes: the pluggable rule sets driven by the engine.

mod buzz_and_choice;
mod fast_buzz;
mod picture_round;
mod text_input;

pub use buzz_and_choice::BuzzAndChoice;
pub use fast_buzz::FastBuzz;
pub use picture_round::PictureRound;
pub use text_input::TextInput;

use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

use rand::RngCore;

use crate::engine::state::LiveSong;
use crate::media::{MediaContent, MediaHandler};
use crate::models::{AnswerKind, Round, RoundSongStatus};
use crate::params::ParamsOverride;
use crate::questions::Question;

#[derive(Debug, Clone)]
/// An answer as the engine hands it to a mode.
pub struct SubmittedAnswer {
    pub player_id: String,
    pub kind: AnswerKind,
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
/// Outcome of a rule evaluation for one answer.
pub struct AnswerResult {
    pub is_correct: bool,
    /// Score delta; negative when a penalty applies.
    pub points_awarded: i32,
    pub message: Option<String>,
    /// Prompt the active player with the title choices next.
    pub show_title_choices: bool,
    /// Prompt the active player with the artist choices next.
    pub show_artist_choices: bool,
    /// Exclude the player from further buzzes on this song.
    pub lock_out_player: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
/// Extra data delivered to the winning buzzer only.
pub struct BuzzPayload {
    pub artist_question: Option<Question>,
}

#[derive(Debug, Clone, PartialEq)]
/// Result of buzz arbitration.
pub enum BuzzOutcome {
    /// The buzz won; `preempted` names a displaced previous winner.
    Accepted { preempted: Option<String> },
    /// The buzz lost; the reason goes back to the sender only.
    Rejected(&'static str),
}

/// A rule set plugged into the engine.
///
/// Implementations are pure rule evaluation; side effects on the song are
/// limited to bookkeeping (status, active player, lockouts).
pub trait GameMode: Send + Sync {
    /// Registry tag of this mode.
    fn mode_type(&self) -> &'static str;

    /// The mode's deltas over the system-default parameters.
    fn default_params(&self) -> ParamsOverride {
        ParamsOverride::default()
    }

    /// Initialises per-round state. None of the shipped modes keeps any.
    fn start_round(&self, _round: &mut Round) {}

    /// Initialises per-song state, generating questions where needed.
    fn start_song(
        &self,
        song: &mut LiveSong,
        pool: &[MediaContent],
        media: &dyn MediaHandler,
        rng: &mut dyn RngCore,
    );

    /// Arbitrates a buzz. The default implements the shared race rules.
    fn handle_buzz(&self, player_id: &str, song: &mut LiveSong, timestamp: u64) -> BuzzOutcome {
        resolve_buzz(player_id, song, timestamp)
    }

    /// Evaluates an answer against the rules of this mode.
    fn handle_answer(
        &self,
        answer: &SubmittedAnswer,
        song: &mut LiveSong,
        media: &dyn MediaHandler,
    ) -> AnswerResult;

    /// Whether the submitted value matches the expected one.
    fn validate_answer(
        &self,
        answer: &SubmittedAnswer,
        song: &LiveSong,
        media: &dyn MediaHandler,
    ) -> bool;

    /// Whether `player_id` may buzz right now.
    fn can_buzz(&self, player_id: &str, song: &LiveSong) -> bool {
        song.is_open() && !song.locked_out.contains(player_id)
    }

    /// Whether the song is over after the latest answer.
    fn should_end_song(&self, song: &LiveSong, active_player_count: usize) -> bool;

    /// Extra payload for the winning buzzer. `None` rejects the buzz.
    fn buzz_payload(&self, song: &LiveSong) -> Option<BuzzPayload>;

    /// Whether only the active buzzer may answer.
    fn exclusive_answers(&self) -> bool {
        true
    }

    /// Whether the song timer pauses while a buzz is answered.
    fn pauses_on_buzz(&self) -> bool {
        false
    }

    /// Whether the master validates answers instead of the server.
    fn requires_manual_validation(&self) -> bool {
        false
    }
}

/// Shared buzz arbitration.
///
/// The winner is the lowest client timestamp seen so far among players who
/// are not locked out; a later-arriving, earlier-stamped buzz preempts the
/// current winner as long as that player has not submitted an answer.
/// Equal timestamps keep the first processed buzz.
pub fn resolve_buzz(player_id: &str, song: &mut LiveSong, timestamp: u64) -> BuzzOutcome {
    if !song.is_open() {
        return BuzzOutcome::Rejected("song_not_playing");
    }

    if song.locked_out.contains(player_id) {
        return BuzzOutcome::Rejected("locked_out");
    }

    song.buzz_timestamps
        .entry(player_id.to_string())
        .and_modify(|known| *known = (*known).min(timestamp))
        .or_insert(timestamp);

    match song.active_player_id.clone() {
        None => {
            song.active_player_id = Some(player_id.to_string());
            song.status = RoundSongStatus::Answering;
            BuzzOutcome::Accepted { preempted: None }
        }
        Some(active) if active == player_id => BuzzOutcome::Rejected("already_active"),
        Some(active) => {
            let active_ts = song
                .buzz_timestamps
                .get(&active)
                .copied()
                .unwrap_or(u64::MAX);

            if timestamp < active_ts && !song.has_any_answer(&active) {
                song.active_player_id = Some(player_id.to_string());
                BuzzOutcome::Accepted {
                    preempted: Some(active),
                }
            } else {
                BuzzOutcome::Rejected("too_slow")
            }
        }
    }
}

/// The mode registry, populated once at startup.
static MODE_REGISTRY: LazyLock<HashMap<&'static str, Arc<dyn GameMode>>> = LazyLock::new(|| {
    let modes: [Arc<dyn GameMode>; 4] = [
        Arc::new(FastBuzz),
        Arc::new(BuzzAndChoice),
        Arc::new(TextInput),
        Arc::new(PictureRound::default()),
    ];

    modes
        .into_iter()
        .map(|mode| (mode.mode_type(), mode))
        .collect()
});

/// Looks up a mode by its tag.
pub fn mode(tag: &str) -> Option<Arc<dyn GameMode>> {
    MODE_REGISTRY.get(tag).cloned()
}

/// Tags of every registered mode.
pub fn all_mode_types() -> Vec<&'static str> {
    let mut tags: Vec<_> = MODE_REGISTRY.keys().copied().collect();
    tags.sort_unstable();
    tags
}
