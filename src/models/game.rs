//! Match, Point and the match-level enums.

use crate::models::error::{TournamentError, TournamentResult};
use crate::models::player::{MatchPlayer, PlayerColor, PlayerId};
use crate::models::tournament::TournamentId;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

/// Unique identifier for a match.
pub type MatchId = Uuid;

/// Opaque reference to a referee or table official.
pub type OfficialId = Uuid;

/// Half points a player needs to win a match (two full points).
pub const WIN_THRESHOLD_HALVES: u32 = 4;

/// Kind of point recorded on a player.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointType {
    Men,
    Kote,
    Do,
    Tsuki,
    /// Foul. Credits half a point to the offender's opponent.
    Hansoku,
}

/// A recorded point. Never modified after it is pushed.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Point {
    #[serde(rename = "type")]
    pub point_type: PointType,
    pub timestamp: DateTime<Utc>,
}

/// Stage of the tournament this match belongs to.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    Group,
    Preliminary,
    RedoPreliminary,
    Playoff,
}

impl MatchType {
    /// Preliminary and redo-preliminary matches feed playoff seeding.
    pub fn is_preliminary_stage(self) -> bool {
        matches!(self, MatchType::Preliminary | MatchType::RedoPreliminary)
    }
}

/// Derived lifecycle state of a match.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    Scheduled,
    Running,
    Paused,
    Finished,
}

/// Input for creating a match outside of automatic scheduling.
#[derive(Clone, Debug, Deserialize)]
pub struct MatchSpec {
    #[serde(default)]
    pub tournament_id: Option<TournamentId>,
    #[serde(rename = "type")]
    pub match_type: MatchType,
    #[serde(default = "default_round")]
    pub round: u32,
    pub red: PlayerId,
    pub white: PlayerId,
    #[serde(default)]
    pub officials: BTreeSet<OfficialId>,
}

fn default_round() -> u32 {
    1
}

/// A single bout between a red and a white player.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Match {
    pub id: MatchId,
    /// None for a standalone exhibition match.
    pub tournament_id: Option<TournamentId>,
    #[serde(rename = "type")]
    pub match_type: MatchType,
    pub round: u32,
    /// Exactly two, one red and one white. Checked by [`Match::validate_players`].
    pub players: Vec<MatchPlayer>,
    /// Set together with `end_timestamp`.
    pub winner: Option<PlayerId>,
    pub start_timestamp: Option<DateTime<Utc>>,
    pub timer_running_since: Option<DateTime<Utc>>,
    /// Accumulated fighting time of all closed timer intervals.
    pub elapsed_ms: i64,
    pub end_timestamp: Option<DateTime<Utc>>,
    pub officials: BTreeSet<OfficialId>,
}

impl Match {
    /// New scheduled match; `red` is listed first.
    pub fn new(
        tournament_id: Option<TournamentId>,
        match_type: MatchType,
        round: u32,
        red: PlayerId,
        white: PlayerId,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            tournament_id,
            match_type,
            round,
            players: vec![
                MatchPlayer::new(red, PlayerColor::Red),
                MatchPlayer::new(white, PlayerColor::White),
            ],
            winner: None,
            start_timestamp: None,
            timer_running_since: None,
            elapsed_ms: 0,
            end_timestamp: None,
            officials: BTreeSet::new(),
        }
    }

    /// Build a match from caller input. Rejects a player facing themself.
    pub fn from_spec(spec: MatchSpec) -> TournamentResult<Self> {
        if spec.red == spec.white {
            return Err(TournamentError::SamePlayerTwice(spec.red));
        }
        Ok(Self {
            officials: spec.officials,
            ..Self::new(
                spec.tournament_id,
                spec.match_type,
                spec.round.max(1),
                spec.red,
                spec.white,
            )
        })
    }

    pub fn status(&self) -> MatchStatus {
        if self.winner.is_some() {
            MatchStatus::Finished
        } else if self.timer_running_since.is_some() {
            MatchStatus::Running
        } else if self.start_timestamp.is_some() {
            MatchStatus::Paused
        } else {
            MatchStatus::Scheduled
        }
    }

    pub fn is_finished(&self) -> bool {
        self.winner.is_some()
    }

    pub fn elapsed_time(&self) -> Duration {
        Duration::milliseconds(self.elapsed_ms)
    }

    pub fn has_player(&self, player_id: PlayerId) -> bool {
        self.players.iter().any(|p| p.player_id == player_id)
    }

    pub fn player_ids(&self) -> impl Iterator<Item = PlayerId> + '_ {
        self.players.iter().map(|p| p.player_id)
    }

    pub fn player(&self, color: PlayerColor) -> Option<&MatchPlayer> {
        self.players.iter().find(|p| p.color == color)
    }

    /// Current score of the player in `color`: own strikes plus half of each opponent foul.
    pub fn score(&self, color: PlayerColor) -> Option<f64> {
        let me = self.player(color)?;
        let opponent = self.player(color.opposite())?;
        Some(f64::from(score_halves(me, opponent)) / 2.0)
    }

    /// Exactly two players with distinct colors, otherwise the stored match is corrupted.
    pub fn validate_players(&self) -> TournamentResult<()> {
        let broken = |reason: &str| TournamentError::BrokenInvariant {
            match_id: self.id,
            reason: reason.to_string(),
        };
        match self.players.as_slice() {
            [a, b] if a.color != b.color => Ok(()),
            [_, _] => Err(broken("both players have the same color")),
            other => Err(broken(&format!("expected 2 players, found {}", other.len()))),
        }
    }
}

/// Score of `me` in half points, given the opponent's record.
pub(crate) fn score_halves(me: &MatchPlayer, opponent: &MatchPlayer) -> u32 {
    2 * me.ippon_count() + opponent.hansoku_count()
}
