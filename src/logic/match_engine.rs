//! Scoring and timer state machine for a single match.
//!
//! `Scheduled -> Running <-> Paused -> Finished`. A finished match accepts no point or
//! timer change; only [`reset`] brings it back to `Scheduled`.
//!
//! All operations take the current time from the caller so the same wall-clock read is
//! used for the point timestamp and for `end_timestamp`.

use crate::models::{
    score_halves, Match, MatchStatus, Point, PlayerColor, PlayerId, PointType, TournamentError,
    TournamentResult, WIN_THRESHOLD_HALVES,
};
use chrono::{DateTime, Utc};

/// Record a point on the player fighting in `color`, then check for a winner.
///
/// Returns the winner if this point finished the match.
pub fn add_point(
    m: &mut Match,
    point_type: PointType,
    color: PlayerColor,
    now: DateTime<Utc>,
) -> TournamentResult<Option<PlayerId>> {
    ensure_not_finished(m)?;
    m.validate_players()?;

    let player = m
        .players
        .iter_mut()
        .find(|p| p.color == color)
        .ok_or_else(|| TournamentError::BrokenInvariant {
            match_id: m.id,
            reason: format!("no player with color {color:?}"),
        })?;
    player.points.push(Point {
        point_type,
        timestamp: now,
    });

    let winner = evaluate_winner(m);
    if let Some(winner) = winner {
        finish(m, winner, now);
        log::info!("Match {} won by {}", m.id, winner);
    }
    Ok(winner)
}

/// First player (in stored order) whose score reached two points.
fn evaluate_winner(m: &Match) -> Option<PlayerId> {
    let [a, b] = m.players.as_slice() else {
        return None;
    };
    [(a, b), (b, a)]
        .into_iter()
        .find(|(me, opponent)| score_halves(me, opponent) >= WIN_THRESHOLD_HALVES)
        .map(|(me, _)| me.player_id)
}

/// Set winner and end time together, closing a running timer interval at `now`.
fn finish(m: &mut Match, winner: PlayerId, now: DateTime<Utc>) {
    if let Some(since) = m.timer_running_since.take() {
        m.elapsed_ms += elapsed_between(since, now);
    }
    m.winner = Some(winner);
    m.end_timestamp = Some(now);
}

/// Start (or resume) the match clock.
pub fn start_timer(m: &mut Match, now: DateTime<Utc>) -> TournamentResult<()> {
    ensure_not_finished(m)?;
    if m.timer_running_since.is_some() {
        return Err(TournamentError::TimerAlreadyRunning(m.id));
    }
    m.timer_running_since = Some(now);
    if m.start_timestamp.is_none() {
        m.start_timestamp = Some(now);
    }
    Ok(())
}

/// Pause the match clock, adding the closed interval to the elapsed time.
pub fn stop_timer(m: &mut Match, now: DateTime<Utc>) -> TournamentResult<()> {
    ensure_not_finished(m)?;
    let since = m
        .timer_running_since
        .take()
        .ok_or(TournamentError::TimerNotRunning(m.id))?;
    m.elapsed_ms += elapsed_between(since, now);
    Ok(())
}

/// Administrative restart: drop all points, the result and the clock.
pub fn reset(m: &mut Match) {
    for player in &mut m.players {
        player.points.clear();
    }
    m.winner = None;
    m.end_timestamp = None;
    m.start_timestamp = None;
    m.timer_running_since = None;
    m.elapsed_ms = 0;
    log::warn!("Match {} reset to scheduled", m.id);
}

fn ensure_not_finished(m: &Match) -> TournamentResult<()> {
    if m.status() == MatchStatus::Finished {
        return Err(TournamentError::MatchFinished(m.id));
    }
    Ok(())
}

/// Clock skew can put `now` before `since`; never let elapsed time shrink.
fn elapsed_between(since: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (now - since).num_milliseconds().max(0)
}
