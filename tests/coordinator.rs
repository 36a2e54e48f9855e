//! Integration tests for the tournament coordinator: exposed operations and progression.

mod common;

use chrono::Duration;
use kendo_tournament::clock::ManualClock;
use kendo_tournament::config::CoordinatorConfig;
use kendo_tournament::events::MatchEvent;
use kendo_tournament::{
    ErrorKind, Group, Match, MatchId, MatchSpec, MatchStatus, MatchType, PlayerColor, PlayerId,
    PointType, TournamentCoordinator, TournamentError, TournamentId, TournamentSpec,
    TournamentState, TournamentType,
};
use std::sync::Arc;
use uuid::Uuid;

fn coordinator() -> (TournamentCoordinator, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(common::t0()));
    let coordinator = TournamentCoordinator::in_memory(clock.clone(), CoordinatorConfig::default());
    (coordinator, clock)
}

fn players(n: usize) -> Vec<PlayerId> {
    (0..n).map(|_| Uuid::new_v4()).collect()
}

fn spec(match_type: MatchType, red: PlayerId, white: PlayerId) -> MatchSpec {
    MatchSpec {
        tournament_id: None,
        match_type,
        round: 1,
        red,
        white,
        officials: Default::default(),
    }
}

/// Score men + kote for `player` in match `match_id`.
async fn win(c: &TournamentCoordinator, match_id: MatchId, player: PlayerId) -> Match {
    let m = c.get_match(match_id).await.unwrap();
    let color = m
        .players
        .iter()
        .find(|p| p.player_id == player)
        .unwrap()
        .color;
    c.add_point(match_id, PointType::Men, color).await.unwrap();
    c.add_point(match_id, PointType::Kote, color).await.unwrap()
}

async fn schedule(c: &TournamentCoordinator, id: TournamentId) -> Vec<Match> {
    let t = c.get_tournament(id).await.unwrap();
    let mut matches = Vec::new();
    for match_id in t.match_schedule {
        matches.push(c.get_match(match_id).await.unwrap());
    }
    matches
}

fn between(schedule: &[Match], a: PlayerId, b: PlayerId, match_type: MatchType) -> MatchId {
    schedule
        .iter()
        .find(|m| m.match_type == match_type && m.has_player(a) && m.has_player(b))
        .map(|m| m.id)
        .unwrap()
}

#[tokio::test]
async fn white_wins_with_men_and_kote_and_match_is_then_immutable() {
    let (c, _) = coordinator();
    let p = players(2);
    let m = c.create_match(spec(MatchType::Group, p[0], p[1])).await.unwrap();

    c.add_point(m.id, PointType::Men, PlayerColor::White).await.unwrap();
    let m = c.add_point(m.id, PointType::Kote, PlayerColor::White).await.unwrap();

    assert_eq!(m.winner, Some(p[1]));
    assert_eq!(m.score(PlayerColor::White), Some(2.0));
    assert_eq!(m.status(), MatchStatus::Finished);

    let err = c
        .add_point(m.id, PointType::Do, PlayerColor::Red)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BadRequest);
    assert_eq!(c.get_match(m.id).await.unwrap(), m);
}

#[tokio::test]
async fn timer_uses_the_injected_clock() {
    let (c, clock) = coordinator();
    let p = players(2);
    let m = c.create_match(spec(MatchType::Group, p[0], p[1])).await.unwrap();

    let err = c.stop_timer(m.id).await.unwrap_err();
    assert_eq!(err, TournamentError::TimerNotRunning(m.id));

    c.start_timer(m.id).await.unwrap();
    assert!(matches!(
        c.start_timer(m.id).await,
        Err(TournamentError::TimerAlreadyRunning(_))
    ));
    clock.advance(Duration::seconds(90));
    let m = c.stop_timer(m.id).await.unwrap();
    assert_eq!(m.elapsed_time(), Duration::seconds(90));
    assert_eq!(m.start_timestamp, Some(common::t0()));
}

#[tokio::test]
async fn unknown_ids_are_not_found() {
    let (c, _) = coordinator();
    let id = Uuid::new_v4();
    assert_eq!(c.get_match(id).await.unwrap_err().kind(), ErrorKind::NotFound);
    assert_eq!(c.delete_match(id).await.unwrap_err().kind(), ErrorKind::NotFound);
    assert_eq!(
        c.add_point(id, PointType::Men, PlayerColor::Red).await.unwrap_err(),
        TournamentError::MatchNotFound(id)
    );
    assert_eq!(
        c.add_player_to_tournament(id, Uuid::new_v4()).await.unwrap_err(),
        TournamentError::TournamentNotFound(id)
    );
}

#[tokio::test]
async fn deleting_a_match_removes_it_from_the_schedule() {
    let (c, _) = coordinator();
    let t = c
        .create_tournament(TournamentSpec::new("Club night", TournamentType::RoundRobin))
        .await
        .unwrap();
    let p = players(2);
    let mut s = spec(MatchType::Group, p[0], p[1]);
    s.tournament_id = Some(t.id);
    let m = c.create_match(s).await.unwrap();
    assert_eq!(c.get_tournament(t.id).await.unwrap().match_schedule, vec![m.id]);

    c.delete_match(m.id).await.unwrap();
    assert!(c.get_tournament(t.id).await.unwrap().match_schedule.is_empty());
    assert_eq!(c.get_match(m.id).await.unwrap_err(), TournamentError::MatchNotFound(m.id));
}

#[tokio::test]
async fn signup_rejects_duplicates_and_full_tournaments() {
    let (c, _) = coordinator();
    let mut tspec = TournamentSpec::new("Small cup", TournamentType::Playoff);
    tspec.max_players = 2;
    let t = c.create_tournament(tspec).await.unwrap();
    let p = players(3);

    c.add_player_to_tournament(t.id, p[0]).await.unwrap();
    assert_eq!(
        c.add_player_to_tournament(t.id, p[0]).await.unwrap_err(),
        TournamentError::DuplicatePlayer(p[0])
    );
    c.add_player_to_tournament(t.id, p[1]).await.unwrap();
    let err = c.add_player_to_tournament(t.id, p[2]).await.unwrap_err();
    assert_eq!(err, TournamentError::TournamentFull { max_players: 2 });
    assert_eq!(err.kind(), ErrorKind::BadRequest);

    let t = c.start_tournament(t.id).await.unwrap();
    assert!(matches!(
        c.add_player_to_tournament(t.id, Uuid::new_v4()).await,
        Err(TournamentError::InvalidState { .. })
    ));
}

#[tokio::test]
async fn tie_at_the_cutoff_goes_through_a_redo_preliminary_before_the_bracket() {
    let (c, _) = coordinator();
    let p = players(5);
    let (a, b, cc, d, e) = (p[0], p[1], p[2], p[3], p[4]);
    let mut tspec = TournamentSpec::new("Regional", TournamentType::PreliminaryPlayoff);
    tspec.advance_count_per_group = 1;
    tspec.groups = vec![Group::new(vec![a, b, cc]), Group::new(vec![d, e])];
    let t = c.create_tournament(tspec).await.unwrap();
    let t = c.start_tournament(t.id).await.unwrap();
    assert_eq!(t.state, TournamentState::Preliminary);
    assert_eq!(t.match_schedule.len(), 4);
    assert_eq!(t.group_of(cc), Some(0));
    assert_eq!(t.group_of(e), Some(1));

    let s = schedule(&c, t.id).await;
    win(&c, between(&s, d, e, MatchType::Preliminary), d).await;
    let t = c.get_tournament(t.id).await.unwrap();
    assert_eq!(t.advancing_players, vec![d]);
    assert_eq!(t.match_schedule.len(), 4);

    // a > b > c > a: everybody on (3, 2.0).
    win(&c, between(&s, a, b, MatchType::Preliminary), a).await;
    win(&c, between(&s, b, cc, MatchType::Preliminary), b).await;
    win(&c, between(&s, a, cc, MatchType::Preliminary), cc).await;

    let t = c.get_tournament(t.id).await.unwrap();
    assert_eq!(t.state, TournamentState::TieBreak);
    assert_eq!(t.tie_breaks.len(), 1);
    assert_eq!(t.tie_breaks[0].players, vec![a, b, cc]);
    assert_eq!(t.tie_breaks[0].spots, 1);
    let s = schedule(&c, t.id).await;
    let redo: Vec<&Match> = s
        .iter()
        .filter(|m| m.match_type == MatchType::RedoPreliminary)
        .collect();
    assert_eq!(redo.len(), 3);
    assert!(redo.iter().all(|m| m.round == 1));

    win(&c, between(&s, a, b, MatchType::RedoPreliminary), a).await;
    win(&c, between(&s, a, cc, MatchType::RedoPreliminary), a).await;
    assert_eq!(c.get_tournament(t.id).await.unwrap().match_schedule.len(), 7);
    win(&c, between(&s, b, cc, MatchType::RedoPreliminary), b).await;

    let t = c.get_tournament(t.id).await.unwrap();
    assert_eq!(t.state, TournamentState::Playoff);
    assert_eq!(t.advancing_players, vec![a, d]);
    let s = schedule(&c, t.id).await;
    let final_match = s.last().unwrap();
    assert_eq!(final_match.match_type, MatchType::Playoff);
    assert_eq!(final_match.round, 2);
    assert_eq!(
        final_match.player_ids().collect::<Vec<_>>(),
        vec![a, d]
    );

    win(&c, final_match.id, d).await;
    let t = c.get_tournament(t.id).await.unwrap();
    assert_eq!(t.state, TournamentState::Finished);
    assert_eq!(t.champion, Some(d));
}

#[tokio::test]
async fn playoff_tournament_runs_to_a_champion() {
    let (c, _) = coordinator();
    let t = c
        .create_tournament(TournamentSpec::new("Knockout", TournamentType::Playoff))
        .await
        .unwrap();
    for player in players(4) {
        c.add_player_to_tournament(t.id, player).await.unwrap();
    }
    let t = c.start_tournament(t.id).await.unwrap();
    assert_eq!(t.state, TournamentState::Playoff);

    let first = schedule(&c, t.id).await;
    assert_eq!(first.len(), 2);
    let w1 = first[0].players[0].player_id;
    let w2 = first[1].players[1].player_id;
    win(&c, first[0].id, w1).await;
    assert_eq!(schedule(&c, t.id).await.len(), 2);
    win(&c, first[1].id, w2).await;

    let s = schedule(&c, t.id).await;
    assert_eq!(s.len(), 3);
    assert_eq!(s[2].round, 2);
    assert_eq!(s[2].player_ids().collect::<Vec<_>>(), vec![w1, w2]);

    win(&c, s[2].id, w2).await;
    let t = c.get_tournament(t.id).await.unwrap();
    assert_eq!(t.state, TournamentState::Finished);
    assert_eq!(t.champion, Some(w2));
}

#[tokio::test]
async fn round_robin_finishes_with_the_best_standing() {
    let (c, _) = coordinator();
    let t = c
        .create_tournament(TournamentSpec::new("League", TournamentType::RoundRobin))
        .await
        .unwrap();
    let p = players(3);
    for &player in &p {
        c.add_player_to_tournament(t.id, player).await.unwrap();
    }
    let t = c.start_tournament(t.id).await.unwrap();
    let s = schedule(&c, t.id).await;
    assert_eq!(s.len(), 3);
    assert!(s.iter().all(|m| m.match_type == MatchType::Group));

    win(&c, between(&s, p[0], p[1], MatchType::Group), p[1]).await;
    win(&c, between(&s, p[1], p[2], MatchType::Group), p[1]).await;
    assert_eq!(c.get_tournament(t.id).await.unwrap().state, TournamentState::Preliminary);
    win(&c, between(&s, p[0], p[2], MatchType::Group), p[0]).await;

    let t = c.get_tournament(t.id).await.unwrap();
    assert_eq!(t.state, TournamentState::Finished);
    assert_eq!(t.champion, Some(p[1]));

    let standings = c.standings(t.id).await.unwrap();
    assert_eq!(standings[0].standings[0].player_id, p[1]);
    assert_eq!(standings[0].standings[0].score.win_points, 6);
    // Only group matches were played, nothing was generated.
    assert_eq!(schedule(&c, t.id).await.len(), 3);
}

#[tokio::test]
async fn failed_progression_keeps_the_point_and_retry_is_idempotent() {
    let (c, _) = coordinator();
    let p = players(6);
    let mut tspec = TournamentSpec::new("Odd field", TournamentType::PreliminaryPlayoff);
    tspec.advance_count_per_group = 1;
    tspec.groups = p.chunks(2).map(|pair| Group::new(pair.to_vec())).collect();
    let t = c.create_tournament(tspec).await.unwrap();
    let t = c.start_tournament(t.id).await.unwrap();

    let s = schedule(&c, t.id).await;
    for m in &s {
        let finished = win(&c, m.id, m.players[0].player_id).await;
        assert!(finished.is_finished());
    }

    // Three advancers cannot be paired: the point stands, the bracket does not appear.
    let t = c.get_tournament(t.id).await.unwrap();
    assert_eq!(t.state, TournamentState::Preliminary);
    assert_eq!(t.match_schedule.len(), 3);
    let last = s.last().unwrap().id;
    assert!(!t.processed_matches.contains(&last));
    assert_eq!(
        c.retry_progression(last).await.unwrap_err(),
        TournamentError::OddBracket { players: 3 }
    );

    // An already processed match is a no-op on retry.
    let first = s[0].id;
    assert!(t.processed_matches.contains(&first));
    let again = c.retry_progression(first).await.unwrap();
    assert_eq!(again.match_schedule, t.match_schedule);
}

#[tokio::test]
async fn retry_requires_a_finished_match() {
    let (c, _) = coordinator();
    let p = players(2);
    let m = c.create_match(spec(MatchType::Group, p[0], p[1])).await.unwrap();
    assert!(matches!(
        c.retry_progression(m.id).await,
        Err(TournamentError::InvalidMatchStatus { .. })
    ));
}

#[tokio::test]
async fn subscribers_receive_point_and_finish_events() {
    let (c, _) = coordinator();
    let p = players(2);
    let m = c.create_match(spec(MatchType::Group, p[0], p[1])).await.unwrap();
    let mut rx = c.events().subscribe(m.id);

    c.add_point(m.id, PointType::Men, PlayerColor::Red).await.unwrap();
    c.add_point(m.id, PointType::Men, PlayerColor::Red).await.unwrap();

    assert!(matches!(rx.try_recv(), Ok(MatchEvent::PointAdded { .. })));
    assert!(matches!(rx.try_recv(), Ok(MatchEvent::PointAdded { .. })));
    match rx.try_recv() {
        Ok(MatchEvent::Finished { r#match }) => assert_eq!(r#match.winner, Some(p[0])),
        other => panic!("expected finish event, got {other:?}"),
    }

    drop(rx);
    c.events().unsubscribe(m.id);
    // Publishing without listeners is silently dropped.
    c.reset_match(m.id).await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_points_on_one_match_are_serialized() {
    let (c, _) = coordinator();
    let c = Arc::new(c);
    let p = players(2);
    let m = c.create_match(spec(MatchType::Group, p[0], p[1])).await.unwrap();

    let match_id = m.id;
    let handles: Vec<_> = (0..10)
        .map(|_| {
            let c = c.clone();
            tokio::spawn(async move { c.add_point(match_id, PointType::Men, PlayerColor::Red).await })
        })
        .collect();
    let mut accepted = 0;
    let mut rejected = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => accepted += 1,
            Err(TournamentError::MatchFinished(_)) => rejected += 1,
            Err(e) => panic!("unexpected error {e}"),
        }
    }

    assert_eq!((accepted, rejected), (2, 8));
    let m = c.get_match(m.id).await.unwrap();
    assert_eq!(m.winner, Some(p[0]));
    assert_eq!(m.player(PlayerColor::Red).unwrap().points.len(), 2);
}

/// Two groups of two, one advancer each.
async fn two_pair_groups(c: &TournamentCoordinator, p: &[PlayerId]) -> TournamentId {
    let mut tspec = TournamentSpec::new("Pairs", TournamentType::PreliminaryPlayoff);
    tspec.advance_count_per_group = 1;
    tspec.groups = p.chunks(2).map(|pair| Group::new(pair.to_vec())).collect();
    let t = c.create_tournament(tspec).await.unwrap();
    c.start_tournament(t.id).await.unwrap().id
}

#[tokio::test]
async fn a_reset_match_is_seeded_again_when_it_finishes() {
    let (c, _) = coordinator();
    let p = players(4);
    let tid = two_pair_groups(&c, &p).await;
    let s = schedule(&c, tid).await;
    let (m1, m2) = (
        between(&s, p[0], p[1], MatchType::Preliminary),
        between(&s, p[2], p[3], MatchType::Preliminary),
    );

    win(&c, m1, p[0]).await;
    assert!(c.get_tournament(tid).await.unwrap().processed_matches.contains(&m1));
    c.reset_match(m1).await.unwrap();
    assert!(!c.get_tournament(tid).await.unwrap().processed_matches.contains(&m1));

    win(&c, m2, p[2]).await;
    assert_eq!(c.get_tournament(tid).await.unwrap().state, TournamentState::Preliminary);
    win(&c, m1, p[1]).await;

    let t = c.get_tournament(tid).await.unwrap();
    assert_eq!(t.state, TournamentState::Playoff);
    assert_eq!(t.advancing_players, vec![p[1], p[2]]);
    let playoff: Vec<Match> = schedule(&c, tid)
        .await
        .into_iter()
        .filter(|m| m.match_type == MatchType::Playoff)
        .collect();
    assert_eq!(playoff.len(), 1);
    assert_eq!(playoff[0].player_ids().collect::<Vec<_>>(), vec![p[1], p[2]]);
}

#[tokio::test]
async fn tie_break_matches_cannot_be_deleted() {
    let (c, _) = coordinator();
    let p = players(5);
    let (a, b, cc) = (p[0], p[1], p[2]);
    let mut tspec = TournamentSpec::new("Regional", TournamentType::PreliminaryPlayoff);
    tspec.advance_count_per_group = 1;
    tspec.groups = vec![Group::new(vec![a, b, cc]), Group::new(vec![p[3], p[4]])];
    let t = c.create_tournament(tspec).await.unwrap();
    let t = c.start_tournament(t.id).await.unwrap();

    let s = schedule(&c, t.id).await;
    win(&c, between(&s, a, b, MatchType::Preliminary), a).await;
    win(&c, between(&s, b, cc, MatchType::Preliminary), b).await;
    win(&c, between(&s, a, cc, MatchType::Preliminary), cc).await;

    let before = c.get_tournament(t.id).await.unwrap();
    assert_eq!(before.state, TournamentState::TieBreak);
    let redo = before.tie_breaks[0].matches[0];
    let err = c.delete_match(redo).await.unwrap_err();
    assert_eq!(err, TournamentError::InTieBreak(redo));
    assert_eq!(err.kind(), ErrorKind::BadRequest);

    assert!(c.get_match(redo).await.is_ok());
    let after = c.get_tournament(t.id).await.unwrap();
    assert_eq!(after.tie_breaks, before.tie_breaks);
    assert_eq!(after.match_schedule, before.match_schedule);
}

#[tokio::test]
async fn deleting_an_unplayed_preliminary_match_reseeds_the_groups() {
    let (c, _) = coordinator();
    let p = players(5);
    let mut tspec = TournamentSpec::new("Walkover", TournamentType::PreliminaryPlayoff);
    tspec.advance_count_per_group = 1;
    tspec.groups = vec![Group::new(vec![p[0], p[1]]), Group::new(vec![p[2], p[3], p[4]])];
    let t = c.create_tournament(tspec).await.unwrap();
    let t = c.start_tournament(t.id).await.unwrap();

    let s = schedule(&c, t.id).await;
    win(&c, between(&s, p[0], p[1], MatchType::Preliminary), p[0]).await;
    win(&c, between(&s, p[2], p[3], MatchType::Preliminary), p[2]).await;
    win(&c, between(&s, p[2], p[4], MatchType::Preliminary), p[2]).await;
    assert_eq!(c.get_tournament(t.id).await.unwrap().state, TournamentState::Preliminary);

    c.delete_match(between(&s, p[3], p[4], MatchType::Preliminary))
        .await
        .unwrap();

    let t = c.get_tournament(t.id).await.unwrap();
    assert_eq!(t.state, TournamentState::Playoff);
    assert_eq!(t.advancing_players, vec![p[0], p[2]]);
    let s = schedule(&c, t.id).await;
    assert_eq!(s.len(), 4);
    assert_eq!(s[3].match_type, MatchType::Playoff);
}

#[tokio::test]
async fn late_signups_join_the_smallest_explicit_group() {
    let (c, _) = coordinator();
    let p = players(7);
    let mut tspec = TournamentSpec::new("Open", TournamentType::PreliminaryPlayoff);
    tspec.groups = vec![Group::new(p[..3].to_vec()), Group::new(p[3..5].to_vec())];
    let t = c.create_tournament(tspec).await.unwrap();
    c.add_player_to_tournament(t.id, p[5]).await.unwrap();
    c.add_player_to_tournament(t.id, p[6]).await.unwrap();

    let t = c.start_tournament(t.id).await.unwrap();
    assert_eq!(t.group_of(p[5]), Some(1));
    assert_eq!(t.group_of(p[6]), Some(0));
    assert!(t.players.iter().all(|&player| t.group_of(player).is_some()));

    // Groups of four and three: 6 + 3 round robin matches.
    let s = schedule(&c, t.id).await;
    assert_eq!(s.len(), 9);
    assert!(s.iter().any(|m| m.has_player(p[5])));
    assert!(s.iter().any(|m| m.has_player(p[6])));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_group_finishes_draw_one_first_round() {
    for _ in 0..10 {
        let (c, _) = coordinator();
        let c = Arc::new(c);
        let p = players(8);
        let tid = two_pair_groups(&c, &p).await;

        let handles: Vec<_> = schedule(&c, tid)
            .await
            .into_iter()
            .map(|m| {
                let c = c.clone();
                let winner = m.players[0].player_id;
                tokio::spawn(async move { win(&c, m.id, winner).await })
            })
            .collect();
        for handle in handles {
            assert!(handle.await.unwrap().is_finished());
        }

        let t = c.get_tournament(tid).await.unwrap();
        assert_eq!(t.state, TournamentState::Playoff);
        assert_eq!(t.processed_matches.len(), 4);
        let playoff: Vec<Match> = schedule(&c, tid)
            .await
            .into_iter()
            .filter(|m| m.match_type == MatchType::Playoff)
            .collect();
        assert_eq!(playoff.len(), 2);
        assert!(playoff.iter().all(|m| m.round == 2));
        assert_eq!(t.match_schedule.len(), 6);
    }
}
