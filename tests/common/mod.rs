//! Helpers shared by the integration tests.
#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use kendo_tournament::{Match, MatchType, PlayerColor, PlayerId, Point, PointType, TournamentId};

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap()
}

fn points(types: &[PointType]) -> Vec<Point> {
    types
        .iter()
        .map(|&point_type| Point {
            point_type,
            timestamp: t0(),
        })
        .collect()
}

/// A finished match: `red` beat `white`, with the given points recorded on each side.
pub fn decided(
    tournament_id: Option<TournamentId>,
    match_type: MatchType,
    round: u32,
    (red, red_points): (PlayerId, &[PointType]),
    (white, white_points): (PlayerId, &[PointType]),
    winner: PlayerColor,
) -> Match {
    let mut m = Match::new(tournament_id, match_type, round, red, white);
    m.players[0].points = points(red_points);
    m.players[1].points = points(white_points);
    m.winner = Some(match winner {
        PlayerColor::Red => red,
        PlayerColor::White => white,
    });
    m.end_timestamp = Some(t0());
    m
}

/// `winner` beat `loser` with men + kote, no fouls.
pub fn clean_win(match_type: MatchType, winner: PlayerId, loser: PlayerId) -> Match {
    decided(
        None,
        match_type,
        1,
        (winner, &[PointType::Men, PointType::Kote]),
        (loser, &[]),
        PlayerColor::Red,
    )
}
