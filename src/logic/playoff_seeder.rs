//! Playoff seeding: who leaves the group stage, and which cutoff ties still need a
//! redo-preliminary before the bracket can be drawn.

use crate::logic::standings::{compute_scores, rank, Standing};
use crate::models::{Group, Match, MatchType, PlayerId, TieBreak};
use serde::Serialize;

/// Where a single group stands in the seeding process.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupStatus {
    /// Some preliminary match of the group is not finished.
    InProgress,
    /// Every advancement spot is decided.
    Resolved,
    /// Tie at the cutoff with no redo-preliminary scheduled for it yet.
    Tied,
    /// Tie at the cutoff whose redo-preliminary is still being played.
    AwaitingTieBreak,
}

/// Seeding outcome for one group.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GroupSeeding {
    pub group: usize,
    pub status: GroupStatus,
    /// Players strictly above the tie boundary, in standing order.
    pub advancing: Vec<PlayerId>,
    pub tied_players: Vec<PlayerId>,
    /// Spots still contested; zero once resolved.
    pub available_spots: usize,
}

/// Seeding outcome for the whole tournament.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct SeedingReport {
    /// Advancers of every group, concatenated in group order.
    pub advancing_players: Vec<PlayerId>,
    /// Tied cohort per group, empty when the group has no tie.
    pub tied_groups: Vec<Vec<PlayerId>>,
    /// Unresolved contested spots per group.
    pub available_spots: Vec<usize>,
    pub groups: Vec<GroupSeeding>,
}

impl SeedingReport {
    pub fn is_resolved(&self) -> bool {
        self.groups.iter().all(|g| g.status == GroupStatus::Resolved)
    }
}

/// A redo-preliminary round the coordinator must schedule.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TieBreakRequest {
    pub group: usize,
    pub players: Vec<PlayerId>,
    pub spots: usize,
}

/// What the coordinator should do with a [`SeedingReport`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum SeedingDecision {
    /// Every group is resolved: draw the bracket from these players.
    Bracket(Vec<PlayerId>),
    /// Schedule a redo-preliminary among each request's players.
    TieBreaks(Vec<TieBreakRequest>),
    /// Matches are still being played.
    Wait,
}

enum Cutoff {
    Clear(Vec<PlayerId>),
    Tie {
        above: Vec<PlayerId>,
        cohort: Vec<PlayerId>,
        spots: usize,
    },
}

/// Compare the last advancing standing with the first one left out.
fn cutoff(standings: &[Standing], advance: usize) -> Cutoff {
    if advance == 0 {
        return Cutoff::Clear(Vec::new());
    }
    if standings.len() <= advance {
        return Cutoff::Clear(standings.iter().map(|s| s.player_id).collect());
    }
    let last_in = standings[advance - 1].score;
    if last_in != standings[advance].score {
        return Cutoff::Clear(standings[..advance].iter().map(|s| s.player_id).collect());
    }
    // Standings are sorted, so the cohort is contiguous.
    let begin = standings
        .iter()
        .position(|s| s.score == last_in)
        .unwrap_or(advance - 1);
    Cutoff::Tie {
        above: standings[..begin].iter().map(|s| s.player_id).collect(),
        cohort: standings
            .iter()
            .filter(|s| s.score == last_in)
            .map(|s| s.player_id)
            .collect(),
        spots: advance - begin,
    }
}

/// Seed one group, replaying its recorded tie-breaks in order.
fn seed_group(
    index: usize,
    group: &Group,
    advance: usize,
    matches: &[Match],
    tie_breaks: &[TieBreak],
) -> GroupSeeding {
    let preliminary: Vec<&Match> = matches
        .iter()
        .filter(|m| m.match_type == MatchType::Preliminary)
        .filter(|m| m.player_ids().all(|p| group.contains(p)))
        .collect();
    if preliminary.iter().any(|m| !m.is_finished()) {
        return GroupSeeding {
            group: index,
            status: GroupStatus::InProgress,
            advancing: Vec::new(),
            tied_players: Vec::new(),
            available_spots: advance.min(group.players.len()),
        };
    }

    let group_tie_breaks: Vec<&TieBreak> =
        tie_breaks.iter().filter(|tb| tb.group == index).collect();
    let mut next_tie_break = 0;
    let mut advancing = Vec::new();
    let mut candidates = group.players.clone();
    let mut spots = advance;
    let mut scores = compute_scores(preliminary, MatchType::Preliminary);

    loop {
        let (cohort, contested) = match cutoff(&rank(&candidates, &scores), spots) {
            Cutoff::Clear(top) => {
                advancing.extend(top);
                return GroupSeeding {
                    group: index,
                    status: GroupStatus::Resolved,
                    advancing,
                    tied_players: Vec::new(),
                    available_spots: 0,
                };
            }
            Cutoff::Tie {
                above,
                cohort,
                spots,
            } => {
                advancing.extend(above);
                (cohort, spots)
            }
        };

        let found = group_tie_breaks[next_tie_break..]
            .iter()
            .position(|tb| tb.is_for(index, &cohort));
        let Some(offset) = found else {
            return GroupSeeding {
                group: index,
                status: GroupStatus::Tied,
                advancing,
                tied_players: cohort,
                available_spots: contested,
            };
        };
        let tie_break = group_tie_breaks[next_tie_break + offset];
        next_tie_break += offset + 1;

        let redo: Vec<&Match> = matches
            .iter()
            .filter(|m| tie_break.matches.contains(&m.id))
            .collect();
        if redo.len() < tie_break.matches.len() || redo.iter().any(|m| !m.is_finished()) {
            return GroupSeeding {
                group: index,
                status: GroupStatus::AwaitingTieBreak,
                advancing,
                tied_players: cohort,
                available_spots: contested,
            };
        }

        scores = compute_scores(redo, MatchType::RedoPreliminary);
        candidates = cohort;
        spots = contested;
    }
}

/// Seed every group from the tournament's matches.
///
/// `matches` may contain any match of the tournament; only preliminary matches played
/// inside a group and the matches of recorded tie-breaks are considered.
pub fn seed(
    groups: &[Group],
    advance_count: usize,
    matches: &[Match],
    tie_breaks: &[TieBreak],
) -> SeedingReport {
    let mut report = SeedingReport::default();
    for (index, group) in groups.iter().enumerate() {
        let seeding = seed_group(index, group, advance_count, matches, tie_breaks);
        report
            .advancing_players
            .extend(seeding.advancing.iter().copied());
        report.tied_groups.push(seeding.tied_players.clone());
        report.available_spots.push(seeding.available_spots);
        report.groups.push(seeding);
    }
    report
}

/// Bracket only once every group is resolved; otherwise break the open ties first.
pub fn decide(report: &SeedingReport) -> SeedingDecision {
    let tied: Vec<TieBreakRequest> = report
        .groups
        .iter()
        .filter(|g| g.status == GroupStatus::Tied)
        .map(|g| TieBreakRequest {
            group: g.group,
            players: g.tied_players.clone(),
            spots: g.available_spots,
        })
        .collect();
    if !tied.is_empty() {
        SeedingDecision::TieBreaks(tied)
    } else if report.is_resolved() {
        SeedingDecision::Bracket(report.advancing_players.clone())
    } else {
        SeedingDecision::Wait
    }
}

/// Every pairing of a round robin, adding one player at a time against those before.
pub fn round_robin_pairings(players: &[PlayerId]) -> Vec<(PlayerId, PlayerId)> {
    (1..players.len())
        .flat_map(|j| (0..j).map(move |i| (players[i], players[j])))
        .collect()
}
