//! Data structures for the tournament: players, matches, tournament state.

mod error;
mod game;
mod player;
mod tournament;

pub use error::{ErrorKind, TournamentError, TournamentResult};
pub use game::{
    Match, MatchId, MatchSpec, MatchStatus, MatchType, OfficialId, Point, PointType,
    WIN_THRESHOLD_HALVES,
};
pub(crate) use game::score_halves;
pub use player::{MatchPlayer, PlayerColor, PlayerId};
pub use tournament::{
    Group, TieBreak, Tournament, TournamentId, TournamentSpec, TournamentState, TournamentType,
};
