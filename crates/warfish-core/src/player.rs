//! Player roster entries.
//!
//! A player's territory set is a mirror of the board's ownership fields and
//! is only ever updated by [`Board`](crate::board::Board) itself.

use crate::board::{PlayerId, TerritoryId};
use crate::payload::{self, PayloadError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;

/// A single player's state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    /// Server-assigned player id
    pub id: PlayerId,
    /// Display name
    pub name: String,
    /// Whether it is currently this player's turn
    pub is_turn: bool,
    /// False once the player has been eliminated
    pub active: bool,
    /// Team number (only meaningful in team games)
    pub team_id: i64,
    /// Units waiting to be placed
    pub reserve_units: u32,
    /// Warfish profile id, passed through untouched
    pub profile_id: String,
    /// Territories this player owns
    pub territories: BTreeSet<TerritoryId>,
}

impl Player {
    /// Create a new active player with an empty reserve
    pub fn new(id: PlayerId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            is_turn: false,
            active: true,
            team_id: 0,
            reserve_units: 0,
            profile_id: String::new(),
            territories: BTreeSet::new(),
        }
    }

    /// Set the reserve (builder style, mostly for tests and fixtures)
    pub fn with_reserve(mut self, reserve_units: u32) -> Self {
        self.reserve_units = reserve_units;
        self
    }

    /// Decode one entry of the `players` section of `getState`.
    ///
    /// A hidden reserve (`"?"`) is read as zero.
    pub fn from_payload(value: &Value) -> Result<Self, PayloadError> {
        let id = payload::as_u32(payload::get(value, "id")?, "id")?;
        let name = payload::as_text(payload::get(value, "name")?, "name")?;
        let reserve_units = match value.get("units") {
            Some(units) => payload::as_hidden_u32(units, "units")?.unwrap_or(0),
            None => 0,
        };
        let team_id = match value.get("teamid") {
            Some(team) => payload::as_i64(team, "teamid")?,
            None => 0,
        };
        let profile_id = match value.get("profileid") {
            Some(profile) => payload::as_text(profile, "profileid")?,
            None => String::new(),
        };

        Ok(Self {
            id,
            name,
            is_turn: payload::opt_flag(value, "isturn"),
            active: value.get("active").map(payload::as_flag).unwrap_or(true),
            team_id,
            reserve_units,
            profile_id,
            territories: BTreeSet::new(),
        })
    }

    /// Whether this player owns the given territory
    pub fn owns(&self, territory: TerritoryId) -> bool {
        self.territories.contains(&territory)
    }

    /// Number of territories owned
    pub fn territory_count(&self) -> usize {
        self.territories.len()
    }

    /// Remove placed units from the reserve. The server is authoritative, so
    /// over-spending clamps at zero instead of failing.
    pub(crate) fn spend_reserve(&mut self, units: u32) {
        self.reserve_units = self.reserve_units.saturating_sub(units);
    }
}
