//! Best-effort live updates per match, for scoreboards and viewers.

use crate::models::{Match, MatchId};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Mutex;
use tokio::sync::broadcast;

/// Buffered events per match before slow receivers start lagging.
const CHANNEL_CAPACITY: usize = 64;

/// State change of a match. Each event carries the committed match snapshot.
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum MatchEvent {
    PointAdded { r#match: Match },
    TimerStarted { r#match: Match },
    TimerStopped { r#match: Match },
    Finished { r#match: Match },
    Reset { r#match: Match },
}

/// One broadcast channel per match id.
#[derive(Default)]
pub struct MatchEvents {
    channels: Mutex<HashMap<MatchId, broadcast::Sender<MatchEvent>>>,
}

impl MatchEvents {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, match_id: MatchId) -> broadcast::Receiver<MatchEvent> {
        let mut channels = self.channels.lock().unwrap_or_else(|e| e.into_inner());
        channels
            .entry(match_id)
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .subscribe()
    }

    /// Drop the channel once its last receiver is gone. Callers drop their receiver first.
    pub fn unsubscribe(&self, match_id: MatchId) {
        let mut channels = self.channels.lock().unwrap_or_else(|e| e.into_inner());
        if channels
            .get(&match_id)
            .is_some_and(|tx| tx.receiver_count() == 0)
        {
            channels.remove(&match_id);
        }
    }

    /// Fire and forget: delivery failures never touch committed state.
    pub fn publish(&self, match_id: MatchId, event: MatchEvent) {
        let channels = self.channels.lock().unwrap_or_else(|e| e.into_inner());
        let Some(tx) = channels.get(&match_id) else {
            return;
        };
        if let Err(e) = tx.send(event) {
            log::debug!("No live listeners for match {}: {}", match_id, e);
        }
    }
}
