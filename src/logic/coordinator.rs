//! Tournament coordinator: the operations exposed to the outside world, and the
//! progression that runs after a match finishes.
//!
//! Consistency model:
//! - every match mutation runs under that match's lock, every tournament mutation under
//!   that tournament's lock; the two are never held together;
//! - a point or timer change is saved before progression starts, and a failed
//!   progression is logged, never returned to the caller of the mutation;
//! - progression saves new matches before the tournament referencing them, and marks the
//!   finished match in `processed_matches` in that same tournament save, so a repeated
//!   or retried progression creates nothing twice; a reset takes the match out of
//!   `processed_matches` again.

use crate::clock::{Clock, SystemClock};
use crate::config::CoordinatorConfig;
use crate::events::{MatchEvent, MatchEvents};
use crate::locks::EntityLocks;
use crate::logic::standings::{compute_scores, rank, Standing};
use crate::logic::{bracket, match_engine, playoff_seeder, setup};
use crate::logic::playoff_seeder::SeedingDecision;
use crate::models::{
    Match, MatchId, MatchSpec, MatchStatus, MatchType, PlayerColor, PlayerId, PointType, TieBreak,
    Tournament, TournamentError, TournamentId, TournamentResult, TournamentSpec, TournamentState,
    TournamentType,
};
use crate::store::{InMemoryStore, MatchRepository, TournamentRepository};
use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use std::sync::Arc;

/// Ranked standings of one group.
#[derive(Clone, Debug, Serialize)]
pub struct GroupStandings {
    pub group: usize,
    pub standings: Vec<Standing>,
}

pub struct TournamentCoordinator {
    matches: Arc<dyn MatchRepository>,
    tournaments: Arc<dyn TournamentRepository>,
    events: Arc<MatchEvents>,
    clock: Arc<dyn Clock>,
    match_locks: EntityLocks<MatchId>,
    tournament_locks: EntityLocks<TournamentId>,
}

impl TournamentCoordinator {
    pub fn new(
        matches: Arc<dyn MatchRepository>,
        tournaments: Arc<dyn TournamentRepository>,
        events: Arc<MatchEvents>,
        clock: Arc<dyn Clock>,
        config: CoordinatorConfig,
    ) -> Self {
        Self {
            matches,
            tournaments,
            events,
            clock,
            match_locks: EntityLocks::new("match", config.lock_timeout),
            tournament_locks: EntityLocks::new("tournament", config.lock_timeout),
        }
    }

    /// Coordinator over a fresh in-memory store, using `clock`.
    pub fn in_memory(clock: Arc<dyn Clock>, config: CoordinatorConfig) -> Self {
        let store = Arc::new(InMemoryStore::new());
        Self::new(
            store.clone(),
            store,
            Arc::new(MatchEvents::new()),
            clock,
            config,
        )
    }

    /// In-memory coordinator on the system clock.
    pub fn with_system_clock(config: CoordinatorConfig) -> Self {
        Self::in_memory(Arc::new(SystemClock), config)
    }

    pub fn events(&self) -> &MatchEvents {
        &self.events
    }

    // ---- matches ----------------------------------------------------------

    /// Create a match; a match of a tournament is appended to its schedule.
    pub async fn create_match(&self, spec: MatchSpec) -> TournamentResult<Match> {
        let m = Match::from_spec(spec)?;
        let Some(tournament_id) = m.tournament_id else {
            self.matches.save(&m).await?;
            return Ok(m);
        };

        let _guard = self.tournament_locks.acquire(tournament_id).await?;
        let mut tournament = self.find_tournament(tournament_id).await?;
        self.matches.save(&m).await?;
        tournament.match_schedule.push(m.id);
        self.tournaments.save(&tournament).await?;
        log::info!("Created {:?} match {} in tournament {}", m.match_type, m.id, tournament_id);
        Ok(m)
    }

    pub async fn get_match(&self, id: MatchId) -> TournamentResult<Match> {
        self.matches
            .find(id)
            .await?
            .ok_or(TournamentError::MatchNotFound(id))
    }

    /// Delete a match and drop it from its tournament's schedule.
    ///
    /// Matches of a recorded tie-break cannot be deleted. Deleting a preliminary match
    /// re-seeds the group stage, since no finish event will come for it.
    pub async fn delete_match(&self, id: MatchId) -> TournamentResult<()> {
        let m = self.get_match(id).await?;
        if let Some(tournament_id) = m.tournament_id {
            let _guard = self.tournament_locks.acquire(tournament_id).await?;
            let tournament = self.tournaments.find(tournament_id).await?;
            if tournament.is_some_and(|t| t.tie_breaks.iter().any(|tb| tb.matches.contains(&id))) {
                return Err(TournamentError::InTieBreak(id));
            }
        }

        let (tournament_id, match_type) = {
            let _guard = self.match_locks.acquire(id).await?;
            let m = self.get_match(id).await?;
            self.matches.delete_one(id).await?;
            (m.tournament_id, m.match_type)
        };
        log::info!("Deleted match {}", id);

        let Some(tournament_id) = tournament_id else {
            return Ok(());
        };
        let _guard = self.tournament_locks.acquire(tournament_id).await?;
        let Some(mut tournament) = self.tournaments.find(tournament_id).await? else {
            return Ok(());
        };
        tournament.match_schedule.retain(|&m| m != id);
        tournament.processed_matches.remove(&id);

        let seeding = match_type == MatchType::Preliminary
            && tournament.tournament_type == TournamentType::PreliminaryPlayoff
            && matches!(
                tournament.state,
                TournamentState::Preliminary | TournamentState::TieBreak
            );
        if seeding {
            let schedule = self.matches.find_many(&tournament.match_schedule).await?;
            match seed_playoffs(&mut tournament, &schedule) {
                Ok(created) => {
                    for m in &created {
                        self.matches.save(m).await?;
                        tournament.match_schedule.push(m.id);
                    }
                }
                Err(e) => log::error!(
                    "Re-seeding tournament {} after deleting match {} failed: {}",
                    tournament_id,
                    id,
                    e
                ),
            }
        }
        self.tournaments.save(&tournament).await
    }

    /// Record a point. When it finishes the match, progression runs after the point is saved.
    pub async fn add_point(
        &self,
        match_id: MatchId,
        point_type: PointType,
        color: PlayerColor,
    ) -> TournamentResult<Match> {
        let mut winner = None;
        let m = self
            .mutate_match(match_id, |m, now| {
                winner = match_engine::add_point(m, point_type, color, now)?;
                Ok(())
            })
            .await?;

        self.events.publish(
            match_id,
            MatchEvent::PointAdded { r#match: m.clone() },
        );
        if winner.is_some() {
            self.events
                .publish(match_id, MatchEvent::Finished { r#match: m.clone() });
            self.on_match_finished(&m).await;
        }
        Ok(m)
    }

    pub async fn start_timer(&self, match_id: MatchId) -> TournamentResult<Match> {
        let m = self
            .mutate_match(match_id, |m, now| match_engine::start_timer(m, now))
            .await?;
        self.events
            .publish(match_id, MatchEvent::TimerStarted { r#match: m.clone() });
        Ok(m)
    }

    pub async fn stop_timer(&self, match_id: MatchId) -> TournamentResult<Match> {
        let m = self
            .mutate_match(match_id, |m, now| match_engine::stop_timer(m, now))
            .await?;
        self.events
            .publish(match_id, MatchEvent::TimerStopped { r#match: m.clone() });
        Ok(m)
    }

    /// Administrative override. Matches already generated from this result are kept; the
    /// next finish of the match runs progression again.
    pub async fn reset_match(&self, match_id: MatchId) -> TournamentResult<Match> {
        let m = self
            .mutate_match(match_id, |m, _| {
                match_engine::reset(m);
                Ok(())
            })
            .await?;
        self.events
            .publish(match_id, MatchEvent::Reset { r#match: m.clone() });

        if let Some(tournament_id) = m.tournament_id {
            let _guard = self.tournament_locks.acquire(tournament_id).await?;
            if let Some(mut tournament) = self.tournaments.find(tournament_id).await? {
                if tournament.processed_matches.remove(&match_id) {
                    self.tournaments.save(&tournament).await?;
                }
            }
        }
        Ok(m)
    }

    /// Load, mutate and save one match under its lock.
    async fn mutate_match<F>(&self, match_id: MatchId, f: F) -> TournamentResult<Match>
    where
        F: FnOnce(&mut Match, DateTime<Utc>) -> TournamentResult<()>,
    {
        let _guard = self.match_locks.acquire(match_id).await?;
        let mut m = self.get_match(match_id).await?;
        f(&mut m, self.clock.now())?;
        self.matches.save(&m).await?;
        Ok(m)
    }

    // ---- tournaments ------------------------------------------------------

    pub async fn create_tournament(&self, spec: TournamentSpec) -> TournamentResult<Tournament> {
        let tournament = Tournament::new(spec)?;
        self.tournaments.save(&tournament).await?;
        log::info!("Created tournament {} ({:?})", tournament.id, tournament.tournament_type);
        Ok(tournament)
    }

    pub async fn get_tournament(&self, id: TournamentId) -> TournamentResult<Tournament> {
        self.find_tournament(id).await
    }

    pub async fn add_player_to_tournament(
        &self,
        tournament_id: TournamentId,
        player_id: PlayerId,
    ) -> TournamentResult<Tournament> {
        self.add_players_to_tournament(tournament_id, &[player_id])
            .await
    }

    /// Sign up several players at once; nothing is saved if any of them is rejected.
    pub async fn add_players_to_tournament(
        &self,
        tournament_id: TournamentId,
        player_ids: &[PlayerId],
    ) -> TournamentResult<Tournament> {
        let _guard = self.tournament_locks.acquire(tournament_id).await?;
        let mut tournament = self.find_tournament(tournament_id).await?;
        for &player_id in player_ids {
            tournament.add_player(player_id)?;
        }
        self.tournaments.save(&tournament).await?;
        Ok(tournament)
    }

    /// Close registration, draw groups and schedule the first stage.
    pub async fn start_tournament(&self, tournament_id: TournamentId) -> TournamentResult<Tournament> {
        let _guard = self.tournament_locks.acquire(tournament_id).await?;
        let mut tournament = self.find_tournament(tournament_id).await?;
        let mut rng = StdRng::from_entropy();
        let matches = setup::start_tournament(&mut tournament, &mut rng)?;
        for m in &matches {
            self.matches.save(m).await?;
        }
        self.tournaments.save(&tournament).await?;
        Ok(tournament)
    }

    /// Ranked standings per group, from the stage that decides the groups.
    pub async fn standings(&self, tournament_id: TournamentId) -> TournamentResult<Vec<GroupStandings>> {
        let tournament = self.find_tournament(tournament_id).await?;
        let schedule = self.matches.find_many(&tournament.match_schedule).await?;
        let match_type = match tournament.tournament_type {
            TournamentType::RoundRobin => MatchType::Group,
            TournamentType::Playoff | TournamentType::PreliminaryPlayoff => MatchType::Preliminary,
        };
        let scores = compute_scores(&schedule, match_type);
        Ok(tournament
            .groups
            .iter()
            .enumerate()
            .map(|(group, g)| GroupStandings {
                group,
                standings: rank(&g.players, &scores),
            })
            .collect())
    }

    /// Run progression again for a finished match, e.g. after a logged failure.
    pub async fn retry_progression(&self, match_id: MatchId) -> TournamentResult<Tournament> {
        let m = self.get_match(match_id).await?;
        if !m.is_finished() {
            return Err(TournamentError::InvalidMatchStatus {
                match_id,
                expected: MatchStatus::Finished,
                status: m.status(),
            });
        }
        let tournament_id = m
            .tournament_id
            .ok_or(TournamentError::NotInTournament(match_id))?;
        self.progress(match_id, tournament_id).await?;
        self.find_tournament(tournament_id).await
    }

    async fn find_tournament(&self, id: TournamentId) -> TournamentResult<Tournament> {
        self.tournaments
            .find(id)
            .await?
            .ok_or(TournamentError::TournamentNotFound(id))
    }

    // ---- progression ------------------------------------------------------

    /// The point is already committed; a progression failure only gets logged.
    async fn on_match_finished(&self, m: &Match) {
        let Some(tournament_id) = m.tournament_id else {
            return;
        };
        if let Err(e) = self.progress(m.id, tournament_id).await {
            log::error!(
                "Progression after match {} in tournament {:?} failed: {}",
                m.id,
                m.tournament_id,
                e
            );
        }
    }

    /// Progression reads the match as stored, so a result reset in the meantime is not
    /// processed.
    async fn progress(&self, match_id: MatchId, tournament_id: TournamentId) -> TournamentResult<()> {
        let _guard = self.tournament_locks.acquire(tournament_id).await?;
        let mut tournament = self.find_tournament(tournament_id).await?;
        if tournament.processed_matches.contains(&match_id) {
            log::debug!("Match {} already processed, skipping", match_id);
            return Ok(());
        }

        let schedule = self.matches.find_many(&tournament.match_schedule).await?;
        let Some(finished) = schedule
            .iter()
            .find(|m| m.id == match_id && m.is_finished())
        else {
            log::debug!("Match {} is no longer a finished match of {}, skipping", match_id, tournament_id);
            return Ok(());
        };
        let mut created = Vec::new();

        if tournament.tournament_type != TournamentType::RoundRobin {
            created.extend(bracket::next_round(&tournament, finished, &schedule));
            if bracket::is_final(&tournament, finished, &schedule) {
                tournament.champion = finished.winner;
                tournament.state = TournamentState::Finished;
                log::info!("Tournament {} won by {:?}", tournament.id, finished.winner);
            }
        }

        if finished.match_type.is_preliminary_stage()
            && tournament.tournament_type == TournamentType::PreliminaryPlayoff
        {
            created.extend(seed_playoffs(&mut tournament, &schedule)?);
        }

        if tournament.tournament_type == TournamentType::RoundRobin
            && schedule.iter().all(Match::is_finished)
        {
            let scores = compute_scores(&schedule, MatchType::Group);
            tournament.champion = rank(&tournament.players, &scores)
                .first()
                .map(|s| s.player_id);
            tournament.state = TournamentState::Finished;
            log::info!("Round robin {} complete, champion {:?}", tournament.id, tournament.champion);
        }

        for m in &created {
            self.matches.save(m).await?;
            tournament.match_schedule.push(m.id);
        }
        tournament.processed_matches.insert(finished.id);
        self.tournaments.save(&tournament).await?;
        Ok(())
    }
}

/// Re-seed the group stage and turn the decision into new matches.
fn seed_playoffs(tournament: &mut Tournament, schedule: &[Match]) -> TournamentResult<Vec<Match>> {
    let report = playoff_seeder::seed(
        &tournament.groups,
        tournament.advance_count_per_group,
        schedule,
        &tournament.tie_breaks,
    );
    tournament.advancing_players = report.advancing_players.clone();

    match playoff_seeder::decide(&report) {
        SeedingDecision::Wait => Ok(Vec::new()),
        SeedingDecision::TieBreaks(requests) => {
            let mut created = Vec::new();
            for request in requests {
                let matches: Vec<Match> = playoff_seeder::round_robin_pairings(&request.players)
                    .into_iter()
                    .map(|(red, white)| {
                        Match::new(Some(tournament.id), MatchType::RedoPreliminary, 1, red, white)
                    })
                    .collect();
                log::info!(
                    "Group {} of tournament {} tied for {} spot(s) between {} players; scheduling {} redo matches",
                    request.group,
                    tournament.id,
                    request.spots,
                    request.players.len(),
                    matches.len()
                );
                tournament.tie_breaks.push(TieBreak {
                    group: request.group,
                    players: request.players,
                    spots: request.spots,
                    matches: matches.iter().map(|m| m.id).collect(),
                });
                created.extend(matches);
            }
            tournament.state = TournamentState::TieBreak;
            Ok(created)
        }
        SeedingDecision::Bracket(players) => {
            let drawn = tournament.state == TournamentState::Playoff
                || schedule.iter().any(|m| m.match_type == MatchType::Playoff);
            if drawn {
                return Ok(Vec::new());
            }
            let matches = bracket::first_round(tournament, &players)?;
            tournament.state = TournamentState::Playoff;
            log::info!(
                "Tournament {} seeded {} players into the bracket",
                tournament.id,
                players.len()
            );
            Ok(matches)
        }
    }
}
