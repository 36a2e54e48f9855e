//! Repository traits for matches and tournaments, plus an in-memory implementation.
//!
//! The coordinator only needs find-then-save consistency per aggregate; cross-aggregate
//! ordering is handled by the coordinator itself.

use crate::models::{Match, MatchId, Tournament, TournamentId, TournamentResult};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

#[async_trait]
pub trait MatchRepository: Send + Sync {
    async fn find(&self, id: MatchId) -> TournamentResult<Option<Match>>;

    /// Matches that exist among `ids`, in the order given.
    async fn find_many(&self, ids: &[MatchId]) -> TournamentResult<Vec<Match>>;

    /// Insert or replace.
    async fn save(&self, m: &Match) -> TournamentResult<()>;

    /// Returns whether a match was removed.
    async fn delete_one(&self, id: MatchId) -> TournamentResult<bool>;
}

#[async_trait]
pub trait TournamentRepository: Send + Sync {
    async fn find(&self, id: TournamentId) -> TournamentResult<Option<Tournament>>;

    /// Insert or replace.
    async fn save(&self, tournament: &Tournament) -> TournamentResult<()>;

    /// Returns whether a tournament was removed.
    async fn delete_one(&self, id: TournamentId) -> TournamentResult<bool>;
}

/// Process-local store, used by the web binary and the tests.
#[derive(Default)]
pub struct InMemoryStore {
    matches: RwLock<HashMap<MatchId, Match>>,
    tournaments: RwLock<HashMap<TournamentId, Tournament>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MatchRepository for InMemoryStore {
    async fn find(&self, id: MatchId) -> TournamentResult<Option<Match>> {
        Ok(self.matches.read().await.get(&id).cloned())
    }

    async fn find_many(&self, ids: &[MatchId]) -> TournamentResult<Vec<Match>> {
        let matches = self.matches.read().await;
        Ok(ids.iter().filter_map(|id| matches.get(id).cloned()).collect())
    }

    async fn save(&self, m: &Match) -> TournamentResult<()> {
        self.matches.write().await.insert(m.id, m.clone());
        Ok(())
    }

    async fn delete_one(&self, id: MatchId) -> TournamentResult<bool> {
        Ok(self.matches.write().await.remove(&id).is_some())
    }
}

#[async_trait]
impl TournamentRepository for InMemoryStore {
    async fn find(&self, id: TournamentId) -> TournamentResult<Option<Tournament>> {
        Ok(self.tournaments.read().await.get(&id).cloned())
    }

    async fn save(&self, tournament: &Tournament) -> TournamentResult<()> {
        self.tournaments
            .write()
            .await
            .insert(tournament.id, tournament.clone());
        Ok(())
    }

    async fn delete_one(&self, id: TournamentId) -> TournamentResult<bool> {
        Ok(self.tournaments.write().await.remove(&id).is_some())
    }
}
