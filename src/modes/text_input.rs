//! Text input: no buzzing, every player types freely.

use rand::RngCore;

use crate::engine::state::LiveSong;
use crate::media::{MediaContent, MediaHandler};
use crate::models::{AnswerKind, RoundSongStatus};
use crate::utils::text::fuzzy_eq;

use super::{AnswerResult, BuzzOutcome, BuzzPayload, GameMode, SubmittedAnswer};

/// The free-typing mode. Answers match within a Levenshtein threshold
/// unless fuzzy matching is disabled.
pub struct TextInput;

impl GameMode for TextInput {
    fn mode_type(&self) -> &'static str {
        "text_input"
    }

    fn start_song(
        &self,
        _song: &mut LiveSong,
        _pool: &[MediaContent],
        _media: &dyn MediaHandler,
        _rng: &mut dyn RngCore,
    ) {
        // No choices: players type what they hear.
    }

    fn handle_buzz(&self, _player_id: &str, _song: &mut LiveSong, _timestamp: u64) -> BuzzOutcome {
        BuzzOutcome::Rejected("mode_has_no_buzz")
    }

    fn handle_answer(
        &self,
        answer: &SubmittedAnswer,
        song: &mut LiveSong,
        media: &dyn MediaHandler,
    ) -> AnswerResult {
        let is_correct = self.validate_answer(answer, song, media);

        let points_awarded = if is_correct {
            match answer.kind {
                AnswerKind::Title => song.params.points_title,
                AnswerKind::Artist => song.params.points_artist,
            }
        } else {
            0
        };

        AnswerResult {
            is_correct,
            points_awarded,
            ..Default::default()
        }
    }

    fn validate_answer(
        &self,
        answer: &SubmittedAnswer,
        song: &LiveSong,
        _media: &dyn MediaHandler,
    ) -> bool {
        let Some(expected) = song.content.value_for(answer.kind) else {
            return false;
        };

        let max_distance = if song.params.fuzzy_match {
            song.params.levenshtein_distance
        } else {
            0
        };

        fuzzy_eq(&answer.value, expected, max_distance)
    }

    fn can_buzz(&self, _player_id: &str, _song: &LiveSong) -> bool {
        false
    }

    fn exclusive_answers(&self) -> bool {
        false
    }

    fn should_end_song(&self, song: &LiveSong, _active_player_count: usize) -> bool {
        // Only the timer or a master skip closes the song.
        song.status == RoundSongStatus::Finished
    }

    fn buzz_payload(&self, _song: &LiveSong) -> Option<BuzzPayload> {
        None
    }
}
