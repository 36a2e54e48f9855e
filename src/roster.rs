//! CSV roster import: one player id per row under a `player_id` header.

use crate::models::{PlayerId, TournamentError, TournamentResult};
use serde::Deserialize;
use std::io::Read;

#[derive(Deserialize)]
struct RosterRow {
    player_id: String,
}

/// Read player ids from a CSV roster. Extra columns (names, clubs) are ignored.
pub fn read_player_ids<R: Read>(reader: R) -> TournamentResult<Vec<PlayerId>> {
    let mut csv_reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut ids = Vec::new();
    for row in csv_reader.deserialize::<RosterRow>() {
        let row = row.map_err(|e| TournamentError::InvalidRoster {
            line: e.position().map_or(0, |p| p.line()),
            reason: e.to_string(),
        })?;
        let id = row.player_id.parse().map_err(|_| TournamentError::InvalidRoster {
            // Header is line 1.
            line: ids.len() as u64 + 2,
            reason: format!("{:?} is not a player id", row.player_id),
        })?;
        ids.push(id);
    }
    Ok(ids)
}
