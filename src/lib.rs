//! Kendo tournament organizer: library with models, scoring engine and tournament progression.

pub mod clock;
pub mod config;
pub mod events;
pub mod locks;
pub mod logic;
pub mod models;
pub mod roster;
pub mod store;

pub use logic::{
    bracket, draw_groups, match_engine, playoff_seeder, standings, start_tournament,
    GroupSeeding, GroupStandings, GroupStatus, Score, SeedingDecision, SeedingReport, Standing,
    TieBreakRequest, TournamentCoordinator,
};
pub use models::{
    ErrorKind, Group, Match, MatchId, MatchPlayer, MatchSpec, MatchStatus, MatchType, OfficialId,
    PlayerColor, PlayerId, Point, PointType, TieBreak, Tournament, TournamentError,
    TournamentId, TournamentResult, TournamentSpec, TournamentState, TournamentType,
};
