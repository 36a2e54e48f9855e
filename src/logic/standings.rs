//! Group standings: win points and ippon points derived from finished matches.

use crate::models::{score_halves, Match, MatchType, PlayerId};
use serde::{Serialize, Serializer};
use std::collections::HashMap;

/// Win points awarded for a won match.
pub const POINTS_PER_WIN: u32 = 3;

/// Accumulated score of one player.
///
/// Ippon points are kept in halves so tie detection compares exact values.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct Score {
    pub win_points: u32,
    pub ippon_halves: u32,
}

impl Score {
    pub fn ippon_points(&self) -> f64 {
        f64::from(self.ippon_halves) / 2.0
    }

    /// Sort key: higher is better.
    fn key(&self) -> (u32, u32) {
        (self.win_points, self.ippon_halves)
    }
}

impl Serialize for Score {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;
        let mut s = serializer.serialize_struct("Score", 2)?;
        s.serialize_field("win_points", &self.win_points)?;
        s.serialize_field("ippon_points", &self.ippon_points())?;
        s.end()
    }
}

/// A player's place in a ranked group.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Standing {
    pub player_id: PlayerId,
    pub score: Score,
}

/// Scores of every player appearing in a decided match of `match_type`.
///
/// Undecided matches are ignored; there is no draw result.
pub fn compute_scores<'a>(
    matches: impl IntoIterator<Item = &'a Match>,
    match_type: MatchType,
) -> HashMap<PlayerId, Score> {
    let mut scores: HashMap<PlayerId, Score> = HashMap::new();
    for m in matches {
        if m.match_type != match_type {
            continue;
        }
        let Some(winner) = m.winner else {
            continue;
        };
        let [a, b] = m.players.as_slice() else {
            log::warn!("Skipping match {} with {} players in standings", m.id, m.players.len());
            continue;
        };
        scores.entry(winner).or_default().win_points += POINTS_PER_WIN;
        scores.entry(a.player_id).or_default().ippon_halves += score_halves(a, b);
        scores.entry(b.player_id).or_default().ippon_halves += score_halves(b, a);
    }
    scores
}

/// Rank `players` by win points, then ippon points, both descending.
///
/// Players without a score rank as zero. Equal scores keep the given order.
pub fn rank(players: &[PlayerId], scores: &HashMap<PlayerId, Score>) -> Vec<Standing> {
    let mut standings: Vec<Standing> = players
        .iter()
        .map(|&player_id| Standing {
            player_id,
            score: scores.get(&player_id).copied().unwrap_or_default(),
        })
        .collect();
    standings.sort_by(|a, b| b.score.key().cmp(&a.score.key()));
    standings
}
