//! Ranking of players within a round and across a session.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// One row of a round ranking.
pub struct RankedScore {
    pub player_id: String,
    pub player_name: String,
    pub score: i32,
    pub rank: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// One row of the final ranking.
pub struct FinalScore {
    pub player_id: String,
    pub player_name: String,
    pub total_score: i32,
    pub rank: usize,
    /// Per-round scores, indexed by round.
    pub round_scores: Vec<i32>,
}

/// Ranks `(id, name, score)` entries by standard competition ranking.
///
/// Tied scores share the higher rank; the next lower rank is one plus the
/// number of players ahead, so a ranking over scores 5, 3, 3, 1 reads
/// 1, 2, 2, 4.
pub fn competition_ranking(entries: &[(String, String, i32)]) -> Vec<RankedScore> {
    let mut sorted: Vec<&(String, String, i32)> = entries.iter().collect();
    sorted.sort_by(|a, b| b.2.cmp(&a.2).then_with(|| a.1.cmp(&b.1)));

    let mut ranked = Vec::with_capacity(sorted.len());
    let mut rank = 1;

    for (position, (id, name, score)) in sorted.iter().enumerate() {
        if position > 0 && sorted[position - 1].2 != *score {
            rank = position + 1;
        }

        ranked.push(RankedScore {
            player_id: id.clone(),
            player_name: name.clone(),
            score: *score,
            rank,
        });
    }

    ranked
}
