//! Tournament business logic: match scoring, standings, seeding, bracket and the coordinator.

pub mod bracket;
mod coordinator;
pub mod match_engine;
pub mod playoff_seeder;
mod setup;
pub mod standings;

pub use coordinator::{GroupStandings, TournamentCoordinator};
pub use playoff_seeder::{
    GroupSeeding, GroupStatus, SeedingDecision, SeedingReport, TieBreakRequest,
};
pub use setup::{draw_groups, start_tournament};
pub use standings::{Score, Standing};
