//! Fast buzz: players answer out loud, the master validates.

use rand::RngCore;

use crate::engine::state::LiveSong;
use crate::media::{MediaContent, MediaHandler};
use crate::params::ParamsOverride;
use crate::utils::text::normalize;

use super::{AnswerResult, BuzzPayload, GameMode, SubmittedAnswer};

/// The verbal-answer mode. No generated questions; the master sends
/// `correct` or `wrong` on behalf of the active player.
pub struct FastBuzz;

impl GameMode for FastBuzz {
    fn mode_type(&self) -> &'static str {
        "fast_buzz"
    }

    fn default_params(&self) -> ParamsOverride {
        ParamsOverride {
            manual_validation: Some(true),
            ..Default::default()
        }
    }

    fn start_song(
        &self,
        _song: &mut LiveSong,
        _pool: &[MediaContent],
        _media: &dyn MediaHandler,
        _rng: &mut dyn RngCore,
    ) {
        // Nothing to prepare: there are no choices to generate.
    }

    fn handle_answer(
        &self,
        answer: &SubmittedAnswer,
        song: &mut LiveSong,
        media: &dyn MediaHandler,
    ) -> AnswerResult {
        if self.validate_answer(answer, song, media) {
            return AnswerResult {
                is_correct: true,
                points_awarded: song.params.points_title,
                ..Default::default()
            };
        }

        let points_awarded = if song.params.penalty_enabled {
            -song.params.penalty_amount
        } else {
            0
        };

        AnswerResult {
            is_correct: false,
            points_awarded,
            lock_out_player: true,
            ..Default::default()
        }
    }

    fn validate_answer(
        &self,
        answer: &SubmittedAnswer,
        _song: &LiveSong,
        _media: &dyn MediaHandler,
    ) -> bool {
        normalize(&answer.value) == "correct"
    }

    fn should_end_song(&self, song: &LiveSong, active_player_count: usize) -> bool {
        song.status == crate::models::RoundSongStatus::Finished
            || song.any_correct()
            || song.locked_out.len() >= active_player_count
    }

    fn buzz_payload(&self, _song: &LiveSong) -> Option<BuzzPayload> {
        Some(BuzzPayload::default())
    }

    fn pauses_on_buzz(&self) -> bool {
        true
    }

    fn requires_manual_validation(&self) -> bool {
        true
    }
}
