//! Single-elimination bracket: first-round pairing and winner-to-next-round pairing.

use crate::models::{
    Match, MatchType, PlayerId, Tournament, TournamentError, TournamentResult, TournamentType,
};

/// Pair players by position: `(0, 1)`, `(2, 3)`, ...
///
/// An odd count has no defined bye policy and is refused.
pub fn first_round(tournament: &Tournament, players: &[PlayerId]) -> TournamentResult<Vec<Match>> {
    if players.len() < 2 {
        return Err(TournamentError::NotEnoughPlayers {
            needed: 2,
            current: players.len(),
        });
    }
    if players.len() % 2 != 0 {
        return Err(TournamentError::OddBracket {
            players: players.len(),
        });
    }
    let round = tournament.first_playoff_round();
    Ok(players
        .chunks_exact(2)
        .map(|pair| Match::new(Some(tournament.id), MatchType::Playoff, round, pair[0], pair[1]))
        .collect())
}

/// Pair the winner of `finished` with the first other winner of the same round that has
/// no next-round match yet.
///
/// `schedule` holds the tournament's matches in schedule order. Returns `None` when there
/// is nothing to schedule: wrong tournament type, preliminary round, no partner finished
/// yet, or the winner already has a next-round match.
pub fn next_round(tournament: &Tournament, finished: &Match, schedule: &[Match]) -> Option<Match> {
    match tournament.tournament_type {
        TournamentType::RoundRobin => return None,
        TournamentType::PreliminaryPlayoff if finished.round == 1 => return None,
        _ => {}
    }
    if finished.match_type != MatchType::Playoff {
        return None;
    }
    let winner = finished.winner?;
    let round = finished.round;
    let has_next_match =
        |player: PlayerId| schedule.iter().any(|m| m.round == round + 1 && m.has_player(player));
    if has_next_match(winner) {
        log::debug!("Winner {} of match {} already scheduled for round {}", winner, finished.id, round + 1);
        return None;
    }

    let (partner_index, partner) = schedule
        .iter()
        .enumerate()
        .filter(|(_, m)| m.id != finished.id && m.round == round && m.match_type == MatchType::Playoff)
        .filter_map(|(i, m)| m.winner.map(|w| (i, w)))
        .find(|&(_, w)| w != winner && !has_next_match(w))?;

    // Keep schedule order on the mat: the earlier match's winner fights as red.
    let finished_index = schedule
        .iter()
        .position(|m| m.id == finished.id)
        .unwrap_or(schedule.len());
    let (red, white) = if partner_index < finished_index {
        (partner, winner)
    } else {
        (winner, partner)
    };
    log::info!("Round {} pairing in tournament {}: {} vs {}", round + 1, tournament.id, red, white);
    Some(Match::new(
        Some(tournament.id),
        MatchType::Playoff,
        round + 1,
        red,
        white,
    ))
}

/// Whether `finished` decided the whole bracket.
pub fn is_final(tournament: &Tournament, finished: &Match, schedule: &[Match]) -> bool {
    if finished.match_type != MatchType::Playoff || !finished.is_finished() {
        return false;
    }
    let first = tournament.first_playoff_round();
    if finished.round < first {
        return false;
    }
    let mut expected = schedule
        .iter()
        .filter(|m| m.match_type == MatchType::Playoff && m.round == first)
        .count();
    for _ in first..finished.round {
        expected = expected.div_ceil(2);
    }
    expected == 1
}
