//! Buzz and choice: two sequential multiple-choice questions per buzz,
//! artist first, title second.

use rand::RngCore;

use crate::engine::state::LiveSong;
use crate::media::{MediaContent, MediaHandler};
use crate::models::{AnswerKind, RoundSongStatus};
use crate::questions::build_question_with;

use super::{AnswerResult, BuzzPayload, GameMode, SubmittedAnswer};

/// The two-question buzz mode.
///
/// Outcomes per buzz cycle:
///
/// | artist  | title   | points                        | lockout |
/// |---------|---------|-------------------------------|---------|
/// | correct | correct | pointsArtist + pointsTitle    | no      |
/// | correct | wrong   | pointsArtist (already scored) | yes     |
/// | wrong   | correct | 0                             | yes     |
/// | wrong   | wrong   | optional penalty              | yes     |
#[derive(Default)]
pub struct BuzzAndChoice;

impl GameMode for BuzzAndChoice {
    fn mode_type(&self) -> &'static str {
        "buzz_and_choice"
    }

    fn start_song(
        &self,
        song: &mut LiveSong,
        pool: &[MediaContent],
        media: &dyn MediaHandler,
        rng: &mut dyn RngCore,
    ) {
        let num_choices = song.params.num_choices;

        song.artist_question =
            build_question_with(media, &song.content, pool, num_choices, AnswerKind::Artist, rng);
        song.title_question =
            build_question_with(media, &song.content, pool, num_choices, AnswerKind::Title, rng);
    }

    fn handle_answer(
        &self,
        answer: &SubmittedAnswer,
        song: &mut LiveSong,
        media: &dyn MediaHandler,
    ) -> AnswerResult {
        let is_correct = self.validate_answer(answer, song, media);

        match answer.kind {
            AnswerKind::Artist => AnswerResult {
                is_correct,
                points_awarded: if is_correct {
                    song.params.points_artist
                } else {
                    0
                },
                // The title question follows either way; points for it only
                // come with a correct artist.
                show_title_choices: true,
                ..Default::default()
            },
            AnswerKind::Title => {
                let artist_correct =
                    song.answered_correctly(&answer.player_id, AnswerKind::Artist);

                if is_correct && artist_correct {
                    AnswerResult {
                        is_correct: true,
                        points_awarded: song.params.points_title,
                        ..Default::default()
                    }
                } else if is_correct || artist_correct {
                    AnswerResult {
                        is_correct,
                        points_awarded: 0,
                        lock_out_player: true,
                        ..Default::default()
                    }
                } else {
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
            }
        }
    }

    fn validate_answer(
        &self,
        answer: &SubmittedAnswer,
        song: &LiveSong,
        media: &dyn MediaHandler,
    ) -> bool {
        let expected = match song.question(answer.kind) {
            Some(question) => question.correct.as_str(),
            None => match song.content.value_for(answer.kind) {
                Some(value) => value,
                None => return false,
            },
        };

        media.validate_match(&answer.value, expected)
    }

    fn should_end_song(&self, song: &LiveSong, active_player_count: usize) -> bool {
        if song.status == RoundSongStatus::Finished {
            return true;
        }

        if !song.locked_out.is_empty() && song.locked_out.len() >= active_player_count {
            return true;
        }

        song.active_player_id
            .as_deref()
            .is_some_and(|active| song.answered_both(active))
    }

    fn buzz_payload(&self, song: &LiveSong) -> Option<BuzzPayload> {
        // Without a generated artist question the cycle cannot run.
        song.artist_question.clone().map(|question| BuzzPayload {
            artist_question: Some(question),
        })
    }

    fn pauses_on_buzz(&self) -> bool {
        true
    }
}
