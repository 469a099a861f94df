//! Picture round: buzz-and-choice rules over picture media.

use rand::RngCore;

use crate::engine::state::LiveSong;
use crate::media::{MediaContent, MediaHandler};
use crate::params::ParamsOverride;

use super::{
    AnswerResult, BuzzAndChoice, BuzzOutcome, BuzzPayload, GameMode, SubmittedAnswer,
};

#[derive(Default)]
/// Buzz-and-choice with questions generated from pictures. Reserved for
/// rounds whose media type is `picture`.
pub struct PictureRound {
    rules: BuzzAndChoice,
}

impl GameMode for PictureRound {
    fn mode_type(&self) -> &'static str {
        "picture_round"
    }

    fn default_params(&self) -> ParamsOverride {
        self.rules.default_params()
    }

    fn start_song(
        &self,
        song: &mut LiveSong,
        pool: &[MediaContent],
        media: &dyn MediaHandler,
        rng: &mut dyn RngCore,
    ) {
        self.rules.start_song(song, pool, media, rng);
    }

    fn handle_buzz(&self, player_id: &str, song: &mut LiveSong, timestamp: u64) -> BuzzOutcome {
        self.rules.handle_buzz(player_id, song, timestamp)
    }

    fn handle_answer(
        &self,
        answer: &SubmittedAnswer,
        song: &mut LiveSong,
        media: &dyn MediaHandler,
    ) -> AnswerResult {
        self.rules.handle_answer(answer, song, media)
    }

    fn validate_answer(
        &self,
        answer: &SubmittedAnswer,
        song: &LiveSong,
        media: &dyn MediaHandler,
    ) -> bool {
        self.rules.validate_answer(answer, song, media)
    }

    fn should_end_song(&self, song: &LiveSong, active_player_count: usize) -> bool {
        self.rules.should_end_song(song, active_player_count)
    }

    fn buzz_payload(&self, song: &LiveSong) -> Option<BuzzPayload> {
        self.rules.buzz_payload(song)
    }

    fn pauses_on_buzz(&self) -> bool {
        self.rules.pauses_on_buzz()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::media;
    use crate::models::AnswerKind;
    use crate::modes::testutil::{playing_song, similar_pool};
    use crate::params::ModeParams;

    #[test]
    fn delegates_the_buzz_and_choice_rules() {
        let mode = PictureRound::default();
        let mut song = playing_song(ModeParams::default());
        let handler = media("music").unwrap();
        let mut rng = rand::thread_rng();

        mode.start_song(&mut song, &similar_pool(), handler.as_ref(), &mut rng);
        assert!(song.artist_question.is_some());
        assert!(mode.pauses_on_buzz());

        let result = mode.handle_answer(
            &SubmittedAnswer {
                player_id: "a".to_string(),
                kind: AnswerKind::Artist,
                value: "Queen".to_string(),
            },
            &mut song,
            handler.as_ref(),
        );
        assert!(result.is_correct);
        assert!(result.show_title_choices);
    }
}
