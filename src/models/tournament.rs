//! Tournament, its groups and TournamentState.

use crate::models::error::{TournamentError, TournamentResult};
use crate::models::game::MatchId;
use crate::models::player::PlayerId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

/// Unique identifier for a tournament.
pub type TournamentId = Uuid;

/// How the tournament is played.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TournamentType {
    /// Everybody fights everybody once; best standing wins.
    RoundRobin,
    /// Single elimination from the start.
    Playoff,
    /// Group stage at round 1, then single elimination.
    #[default]
    PreliminaryPlayoff,
}

/// Current phase of the tournament.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TournamentState {
    /// Accepting signups; nothing scheduled yet.
    #[default]
    Registration,
    /// Group (or round-robin) matches are being played.
    Preliminary,
    /// At least one group is playing a redo-preliminary to break a cutoff tie.
    TieBreak,
    /// Elimination bracket in progress.
    Playoff,
    Finished,
}

/// One preliminary pool, in seeding order.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub players: Vec<PlayerId>,
}

impl Group {
    pub fn new(players: Vec<PlayerId>) -> Self {
        Self { players }
    }

    pub fn contains(&self, player_id: PlayerId) -> bool {
        self.players.contains(&player_id)
    }
}

/// A redo-preliminary round scheduled to break a tie at a group's cutoff.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct TieBreak {
    /// Index into `Tournament::groups`.
    pub group: usize,
    /// The tied cohort, in standing order.
    pub players: Vec<PlayerId>,
    /// Contested advancement spots.
    pub spots: usize,
    pub matches: Vec<MatchId>,
}

impl TieBreak {
    /// Same cohort regardless of order.
    pub fn is_for(&self, group: usize, players: &[PlayerId]) -> bool {
        let mine: BTreeSet<_> = self.players.iter().collect();
        let theirs: BTreeSet<_> = players.iter().collect();
        self.group == group && mine == theirs
    }
}

/// Input for creating a tournament.
#[derive(Clone, Debug, Deserialize)]
pub struct TournamentSpec {
    pub name: String,
    #[serde(default, rename = "type")]
    pub tournament_type: TournamentType,
    #[serde(default = "default_advance_count")]
    pub advance_count_per_group: usize,
    #[serde(default = "default_max_players")]
    pub max_players: usize,
    #[serde(default = "default_group_size")]
    pub group_size: usize,
    /// Pre-drawn groups. When empty, groups are drawn at start.
    #[serde(default)]
    pub groups: Vec<Group>,
}

fn default_advance_count() -> usize {
    2
}

fn default_max_players() -> usize {
    64
}

fn default_group_size() -> usize {
    4
}

impl TournamentSpec {
    pub fn new(name: impl Into<String>, tournament_type: TournamentType) -> Self {
        Self {
            name: name.into(),
            tournament_type,
            advance_count_per_group: default_advance_count(),
            max_players: default_max_players(),
            group_size: default_group_size(),
            groups: Vec::new(),
        }
    }
}

/// Full tournament aggregate: signups, groups, schedule and progression bookkeeping.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Tournament {
    pub id: TournamentId,
    pub name: String,
    #[serde(rename = "type")]
    pub tournament_type: TournamentType,
    pub state: TournamentState,
    /// Signed-up players in signup order.
    pub players: Vec<PlayerId>,
    pub max_players: usize,
    pub group_size: usize,
    pub groups: Vec<Group>,
    pub advance_count_per_group: usize,
    /// Every match of the tournament, in creation order.
    pub match_schedule: Vec<MatchId>,
    /// Players that cleared the preliminary stage, group by group.
    pub advancing_players: Vec<PlayerId>,
    pub tie_breaks: Vec<TieBreak>,
    /// Finished matches whose progression has been committed.
    pub processed_matches: BTreeSet<MatchId>,
    pub champion: Option<PlayerId>,
}

impl Tournament {
    /// Create a tournament in Registration. Explicit groups sign their players up.
    pub fn new(spec: TournamentSpec) -> TournamentResult<Self> {
        let name = spec.name.trim();
        if name.is_empty() {
            return Err(TournamentError::InvalidSettings("name is empty".into()));
        }
        if spec.group_size < 2 {
            return Err(TournamentError::InvalidSettings(
                "groups need at least 2 players".into(),
            ));
        }
        if spec.tournament_type == TournamentType::PreliminaryPlayoff
            && spec.advance_count_per_group == 0
        {
            return Err(TournamentError::InvalidSettings(
                "at least one player per group must advance".into(),
            ));
        }

        let mut tournament = Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            tournament_type: spec.tournament_type,
            state: TournamentState::Registration,
            players: Vec::new(),
            max_players: spec.max_players,
            group_size: spec.group_size,
            groups: Vec::new(),
            advance_count_per_group: spec.advance_count_per_group,
            match_schedule: Vec::new(),
            advancing_players: Vec::new(),
            tie_breaks: Vec::new(),
            processed_matches: BTreeSet::new(),
            champion: None,
        };
        for group in &spec.groups {
            for &player_id in &group.players {
                tournament.add_player(player_id)?;
            }
        }
        tournament.groups = spec.groups;
        Ok(tournament)
    }

    /// Sign a player up (only valid in Registration).
    pub fn add_player(&mut self, player_id: PlayerId) -> TournamentResult<()> {
        self.expect_state(TournamentState::Registration)?;
        if self.players.contains(&player_id) {
            return Err(TournamentError::DuplicatePlayer(player_id));
        }
        if self.players.len() >= self.max_players {
            return Err(TournamentError::TournamentFull {
                max_players: self.max_players,
            });
        }
        self.players.push(player_id);
        Ok(())
    }

    pub fn expect_state(&self, expected: TournamentState) -> TournamentResult<()> {
        if self.state != expected {
            return Err(TournamentError::InvalidState {
                expected,
                actual: self.state,
            });
        }
        Ok(())
    }

    /// Index of the group a player was drawn into.
    pub fn group_of(&self, player_id: PlayerId) -> Option<usize> {
        self.groups.iter().position(|g| g.contains(player_id))
    }

    /// Round at which the elimination bracket starts.
    pub fn first_playoff_round(&self) -> u32 {
        match self.tournament_type {
            TournamentType::PreliminaryPlayoff => 2,
            TournamentType::RoundRobin | TournamentType::Playoff => 1,
        }
    }
}
