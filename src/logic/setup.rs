//! Setup phase: draw groups and build the initial schedule (Registration -> Preliminary or Playoff).

use crate::logic::bracket;
use crate::logic::playoff_seeder::round_robin_pairings;
use crate::models::{
    Group, Match, MatchType, PlayerId, Tournament, TournamentError, TournamentResult,
    TournamentState, TournamentType,
};
use rand::seq::SliceRandom;
use rand::Rng;

/// Start the tournament and return the matches of its first stage.
///
/// The caller persists the returned matches and the tournament; `match_schedule` is
/// already updated here.
pub fn start_tournament<R: Rng + ?Sized>(
    tournament: &mut Tournament,
    rng: &mut R,
) -> TournamentResult<Vec<Match>> {
    tournament.expect_state(TournamentState::Registration)?;
    if tournament.players.len() < 2 {
        return Err(TournamentError::NotEnoughPlayers {
            needed: 2,
            current: tournament.players.len(),
        });
    }

    let matches = match tournament.tournament_type {
        TournamentType::RoundRobin => {
            tournament.groups = vec![Group::new(tournament.players.clone())];
            tournament.state = TournamentState::Preliminary;
            group_round_robins(tournament, MatchType::Group)
        }
        TournamentType::PreliminaryPlayoff => {
            if tournament.groups.is_empty() {
                tournament.groups = draw_groups(&tournament.players, tournament.group_size, rng);
            } else {
                place_late_signups(tournament);
            }
            let matches = group_round_robins(tournament, MatchType::Preliminary);
            if matches.is_empty() {
                // Every group is smaller than its pairing needs: straight to the bracket.
                let players: Vec<PlayerId> = tournament
                    .groups
                    .iter()
                    .flat_map(|g| g.players.iter().copied())
                    .collect();
                let bracket = bracket::first_round(tournament, &players)?;
                tournament.advancing_players = players;
                tournament.state = TournamentState::Playoff;
                bracket
            } else {
                tournament.state = TournamentState::Preliminary;
                matches
            }
        }
        TournamentType::Playoff => {
            let mut players = tournament.players.clone();
            players.shuffle(rng);
            let bracket = bracket::first_round(tournament, &players)?;
            tournament.state = TournamentState::Playoff;
            bracket
        }
    };

    tournament
        .match_schedule
        .extend(matches.iter().map(|m| m.id));
    log::info!(
        "Started tournament {} ({:?}) with {} players in {} group(s), {} matches scheduled",
        tournament.id,
        tournament.tournament_type,
        tournament.players.len(),
        tournament.groups.len(),
        matches.len()
    );
    Ok(matches)
}

/// Shuffle players and deal them into `ceil(n / group_size)` groups of near-equal size.
pub fn draw_groups<R: Rng + ?Sized>(
    players: &[PlayerId],
    group_size: usize,
    rng: &mut R,
) -> Vec<Group> {
    let mut shuffled = players.to_vec();
    shuffled.shuffle(rng);
    let count = shuffled.len().div_ceil(group_size.max(1)).max(1);
    let mut groups = vec![Group::default(); count];
    for (i, player) in shuffled.into_iter().enumerate() {
        groups[i % count].players.push(player);
    }
    groups
}

/// Put players who signed up outside the given groups into the smallest group.
fn place_late_signups(tournament: &mut Tournament) {
    let ungrouped: Vec<PlayerId> = tournament
        .players
        .iter()
        .copied()
        .filter(|&p| tournament.group_of(p).is_none())
        .collect();
    for player in ungrouped {
        let Some((index, group)) = tournament
            .groups
            .iter_mut()
            .enumerate()
            .min_by_key(|(_, g)| g.players.len())
        else {
            return;
        };
        group.players.push(player);
        log::info!("Placed late signup {} in group {} of tournament {}", player, index, tournament.id);
    }
}

/// One full round robin per group at round 1.
fn group_round_robins(tournament: &Tournament, match_type: MatchType) -> Vec<Match> {
    tournament
        .groups
        .iter()
        .flat_map(|g| round_robin_pairings(&g.players))
        .map(|(red, white)| Match::new(Some(tournament.id), match_type, 1, red, white))
        .collect()
}
