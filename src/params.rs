//! Gameplay parameters and the three-level override resolver.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
/// Effective parameter set for a song.
pub struct ModeParams {
    /// Playback clip length, in seconds.
    pub song_duration: u32,
    /// Time given to the active player to respond, in seconds.
    pub answer_timer: u32,
    /// Size of a multiple-choice set, correct answer included.
    pub num_choices: usize,
    /// Award for a correct title.
    pub points_title: i32,
    /// Award for a correct artist.
    pub points_artist: i32,
    pub penalty_enabled: bool,
    /// Deduction applied on a wrong answer when penalties are enabled.
    pub penalty_amount: i32,
    /// Whether another player may buzz after a wrong answer on the same song.
    pub allow_rebuzz: bool,
    /// Master validates answers verbally.
    pub manual_validation: bool,
    pub fuzzy_match: bool,
    /// Maximum Levenshtein distance accepted by text input.
    pub levenshtein_distance: usize,
}

impl Default for ModeParams {
    fn default() -> Self {
        Self {
            song_duration: 30,
            answer_timer: 5,
            num_choices: 4,
            points_title: 1,
            points_artist: 1,
            penalty_enabled: false,
            penalty_amount: 0,
            allow_rebuzz: true,
            manual_validation: false,
            fuzzy_match: true,
            levenshtein_distance: 2,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
/// Partial parameter set. Defined keys override the level below.
pub struct ParamsOverride {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub song_duration: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer_timer: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_choices: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub points_title: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub points_artist: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub penalty_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub penalty_amount: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_rebuzz: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manual_validation: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fuzzy_match: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub levenshtein_distance: Option<usize>,
}

impl ParamsOverride {
    /// Overlays the defined keys of this override onto `base`.
    pub fn apply(&self, base: &mut ModeParams) {
        if let Some(v) = self.song_duration {
            base.song_duration = v;
        }
        if let Some(v) = self.answer_timer {
            base.answer_timer = v;
        }
        if let Some(v) = self.num_choices {
            base.num_choices = v;
        }
        if let Some(v) = self.points_title {
            base.points_title = v;
        }
        if let Some(v) = self.points_artist {
            base.points_artist = v;
        }
        if let Some(v) = self.penalty_enabled {
            base.penalty_enabled = v;
        }
        if let Some(v) = self.penalty_amount {
            base.penalty_amount = v;
        }
        if let Some(v) = self.allow_rebuzz {
            base.allow_rebuzz = v;
        }
        if let Some(v) = self.manual_validation {
            base.manual_validation = v;
        }
        if let Some(v) = self.fuzzy_match {
            base.fuzzy_match = v;
        }
        if let Some(v) = self.levenshtein_distance {
            base.levenshtein_distance = v;
        }
    }
}

/// Resolves the effective parameters for a song.
///
/// System defaults first, then the mode's defaults, then the round's
/// overrides; defined keys on the right win.
pub fn resolve(
    system: &ModeParams,
    mode: &ParamsOverride,
    round: Option<&ParamsOverride>,
) -> ModeParams {
    let mut effective = system.clone();

    mode.apply(&mut effective);

    if let Some(round) = round {
        round.apply(&mut effective);
    }

    effective
}
