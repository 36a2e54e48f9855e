//! Error type shared by the engine, the coordinator and the web layer.

use crate::models::game::{MatchId, MatchStatus};
use crate::models::player::PlayerId;
use crate::models::tournament::{TournamentId, TournamentState};
use serde::Serialize;
use thiserror::Error;

/// Coarse classification of a [`TournamentError`], used to pick a response status.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Unknown match or tournament id.
    NotFound,
    /// The caller asked for a transition the current state does not allow.
    BadRequest,
    /// Stored data violates a model invariant (corrupted match).
    BrokenInvariant,
    /// A per-entity lock could not be acquired within the bounded wait.
    Unavailable,
    /// A repository backend failed.
    Internal,
}

/// Errors that can occur during match and tournament operations.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum TournamentError {
    #[error("Match {0} not found")]
    MatchNotFound(MatchId),

    #[error("Tournament {0} not found")]
    TournamentNotFound(TournamentId),

    #[error("Match {0} is already finished")]
    MatchFinished(MatchId),

    #[error("Timer of match {0} is already running")]
    TimerAlreadyRunning(MatchId),

    #[error("Timer of match {0} is not running")]
    TimerNotRunning(MatchId),

    #[error("A player cannot face themself")]
    SamePlayerTwice(PlayerId),

    #[error("Tournament is full ({max_players} players)")]
    TournamentFull { max_players: usize },

    #[error("Player {0} is already signed up")]
    DuplicatePlayer(PlayerId),

    #[error("Need at least {needed} players, have {current}")]
    NotEnoughPlayers { needed: usize, current: usize },

    #[error("Tournament not in correct state: expected {expected:?}, got {actual:?}")]
    InvalidState {
        expected: TournamentState,
        actual: TournamentState,
    },

    #[error("Match {match_id} is {status:?}, expected {expected:?}")]
    InvalidMatchStatus {
        match_id: MatchId,
        expected: MatchStatus,
        status: MatchStatus,
    },

    #[error("Match {0} does not belong to a tournament")]
    NotInTournament(MatchId),

    #[error("Match {0} is part of a tie-break and cannot be deleted")]
    InTieBreak(MatchId),

    #[error("Cannot pair an odd number of players ({players}) into a bracket")]
    OddBracket { players: usize },

    #[error("Invalid tournament settings: {0}")]
    InvalidSettings(String),

    #[error("Invalid roster on line {line}: {reason}")]
    InvalidRoster { line: u64, reason: String },

    #[error("Match {match_id} is corrupted: {reason}")]
    BrokenInvariant { match_id: MatchId, reason: String },

    #[error("Timed out waiting for lock on {0}")]
    LockTimeout(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl TournamentError {
    pub fn kind(&self) -> ErrorKind {
        use TournamentError::*;
        match self {
            MatchNotFound(_) | TournamentNotFound(_) => ErrorKind::NotFound,
            MatchFinished(_)
            | TimerAlreadyRunning(_)
            | TimerNotRunning(_)
            | SamePlayerTwice(_)
            | TournamentFull { .. }
            | DuplicatePlayer(_)
            | NotEnoughPlayers { .. }
            | InvalidState { .. }
            | InvalidMatchStatus { .. }
            | NotInTournament(_)
            | InTieBreak(_)
            | OddBracket { .. }
            | InvalidSettings(_)
            | InvalidRoster { .. } => ErrorKind::BadRequest,
            BrokenInvariant { .. } => ErrorKind::BrokenInvariant,
            LockTimeout(_) => ErrorKind::Unavailable,
            Storage(_) => ErrorKind::Internal,
        }
    }
}

/// Result type for match and tournament operations.
pub type TournamentResult<T> = Result<T, TournamentError>;
