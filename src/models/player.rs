//! Player references and the per-match player record.

use crate::models::game::{Point, PointType};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque reference to a player in the external player directory.
pub type PlayerId = Uuid;

/// Side a player fights on (the colored ribbon on their back).
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerColor {
    Red,
    White,
}

impl PlayerColor {
    pub fn opposite(self) -> Self {
        match self {
            PlayerColor::Red => PlayerColor::White,
            PlayerColor::White => PlayerColor::Red,
        }
    }
}

/// One side of a match: who fights, in which color, and the points recorded on them.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MatchPlayer {
    pub player_id: PlayerId,
    pub color: PlayerColor,
    /// In recording order. Hansoku entries are fouls committed by this player.
    pub points: Vec<Point>,
}

impl MatchPlayer {
    pub fn new(player_id: PlayerId, color: PlayerColor) -> Self {
        Self {
            player_id,
            color,
            points: Vec::new(),
        }
    }

    /// Number of valid strikes (everything except hansoku).
    pub fn ippon_count(&self) -> u32 {
        self.points
            .iter()
            .filter(|p| p.point_type != PointType::Hansoku)
            .count() as u32
    }

    /// Number of fouls committed by this player.
    pub fn hansoku_count(&self) -> u32 {
        self.points
            .iter()
            .filter(|p| p.point_type == PointType::Hansoku)
            .count() as u32
    }
}
