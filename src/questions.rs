//! Multiple-choice question generation with plausible distractors.

use rand::seq::SliceRandom;
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::media::{MediaContent, MediaHandler};
use crate::models::AnswerKind;
use crate::utils::constants::ENCORE_SIMILAR_YEAR_WINDOW;
use crate::utils::text::normalize;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// A multiple-choice question. The correct value never goes on the wire to
/// players; only `choices` does.
pub struct Question {
    pub kind: AnswerKind,
    pub correct: String,
    pub choices: Vec<String>,
}

/// Builds a question for `kind` around `correct`, with distractors drawn
/// from `pool`. `num_choices` is the size of the final choice set.
///
/// Returns `None` when the correct item has no value for the kind.
pub fn build_question(
    correct: &MediaContent,
    pool: &[MediaContent],
    num_choices: usize,
    kind: AnswerKind,
    rng: &mut dyn RngCore,
) -> Option<Question> {
    let correct_value = correct.value_for(kind)?.to_string();
    let distractors = wrong_choices(correct, pool, num_choices.saturating_sub(1), kind, rng);

    let mut choices = Vec::with_capacity(distractors.len() + 1);
    choices.push(correct_value.clone());
    choices.extend(distractors);
    choices.shuffle(rng);

    Some(Question {
        kind,
        correct: correct_value,
        choices,
    })
}

/// Like [`build_question`], with distractors supplied by the media handler
/// so media kinds can override the policy.
pub fn build_question_with(
    media: &dyn MediaHandler,
    correct: &MediaContent,
    pool: &[MediaContent],
    num_choices: usize,
    kind: AnswerKind,
    rng: &mut dyn RngCore,
) -> Option<Question> {
    let correct_value = correct.value_for(kind)?.to_string();
    let distractors =
        media.generate_wrong_choices(correct, pool, num_choices.saturating_sub(1), kind, rng);

    let mut choices = Vec::with_capacity(distractors.len() + 1);
    choices.push(correct_value.clone());
    choices.extend(distractors);
    choices.shuffle(rng);

    Some(Question {
        kind,
        correct: correct_value,
        choices,
    })
}

/// Picks up to `count` distinct wrong values for `correct` from `pool`.
///
/// Preference goes to similar items: same genre, or released within five
/// years of the correct item. When the similarity pool runs dry, the rest
/// of the pool tops the set up.
pub fn wrong_choices(
    correct: &MediaContent,
    pool: &[MediaContent],
    count: usize,
    kind: AnswerKind,
    rng: &mut dyn RngCore,
) -> Vec<String> {
    let Some(correct_value) = correct.value_for(kind) else {
        return Vec::new();
    };
    let correct_key = normalize(correct_value);

    let candidates: Vec<&MediaContent> = pool
        .iter()
        .filter(|item| item.id != correct.id)
        .filter(|item| {
            item.value_for(kind)
                .is_some_and(|value| normalize(value) != correct_key)
        })
        .collect();

    let mut similar: Vec<&MediaContent> = candidates
        .iter()
        .copied()
        .filter(|item| is_similar(correct, item))
        .collect();
    similar.shuffle(rng);

    let mut chosen = Vec::with_capacity(count);
    let mut seen = vec![correct_key];

    take_distinct(&similar, kind, count, &mut chosen, &mut seen);

    if chosen.len() < count {
        let mut rest: Vec<&MediaContent> = candidates;
        rest.shuffle(rng);
        take_distinct(&rest, kind, count, &mut chosen, &mut seen);
    }

    chosen
}

/// Similarity rule for the distractor pool.
fn is_similar(correct: &MediaContent, candidate: &MediaContent) -> bool {
    let same_genre = match (&correct.metadata.genre, &candidate.metadata.genre) {
        (Some(a), Some(b)) => normalize(a) == normalize(b),
        _ => false,
    };

    let close_year = match (correct.metadata.year, candidate.metadata.year) {
        (Some(a), Some(b)) => (a - b).abs() <= ENCORE_SIMILAR_YEAR_WINDOW,
        _ => false,
    };

    same_genre || close_year
}

/// Appends values from `items` until `chosen` holds `count` entries,
/// skipping values already seen.
fn take_distinct(
    items: &[&MediaContent],
    kind: AnswerKind,
    count: usize,
    chosen: &mut Vec<String>,
    seen: &mut Vec<String>,
) {
    for item in items {
        if chosen.len() >= count {
            break;
        }

        let Some(value) = item.value_for(kind) else {
            continue;
        };
        let key = normalize(value);

        if seen.contains(&key) {
            continue;
        }

        seen.push(key);
        chosen.push(value.to_string());
    }
}
