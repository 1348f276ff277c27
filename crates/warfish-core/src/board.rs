//! Game board representation: territories, continents and the player roster.
//!
//! This module contains:
//! - The raw records the server sends to describe a map
//! - Territory and continent types
//! - The board graph with ownership bookkeeping
//! - Read-only queries used by strategies
//!
//! Once built, a board only changes through `MoveResult` application
//! (see [`crate::results`]); every mutator here is crate-private.

use crate::game::GameError;
use crate::payload::{self, PayloadError};
use crate::player::Player;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

/// Server-assigned territory id
pub type TerritoryId = u32;

/// Server-assigned continent id
pub type ContinentId = u32;

/// Server-assigned player id
pub type PlayerId = u32;

/// `playerid` value the server uses for neutral territories
pub const NEUTRAL_PLAYER: i64 = -1;

/// One entry of the `map` section: a territory without any state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerritoryRecord {
    pub id: TerritoryId,
    pub name: String,
    pub max_units: Option<u32>,
}

impl TerritoryRecord {
    pub fn from_payload(value: &Value) -> Result<Self, PayloadError> {
        let max_units = match value.get("maxunits") {
            Some(max) => payload::as_hidden_u32(max, "maxunits")?,
            None => None,
        };
        Ok(Self {
            id: payload::as_u32(payload::get(value, "id")?, "id")?,
            name: payload::as_text(payload::get(value, "name")?, "name")?,
            max_units,
        })
    }
}

/// One entry of the `board` section: `attacker` may attack `defender`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BorderRecord {
    pub attacker: TerritoryId,
    pub defender: TerritoryId,
}

impl BorderRecord {
    pub fn from_payload(value: &Value) -> Result<Self, PayloadError> {
        Ok(Self {
            attacker: payload::as_u32(payload::get(value, "a")?, "a")?,
            defender: payload::as_u32(payload::get(value, "b")?, "b")?,
        })
    }
}

/// One entry of the `continents` section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContinentRecord {
    pub id: ContinentId,
    pub name: String,
    pub bonus: u32,
    pub territories: Vec<TerritoryId>,
}

impl ContinentRecord {
    pub fn from_payload(value: &Value) -> Result<Self, PayloadError> {
        Ok(Self {
            id: payload::as_u32(payload::get(value, "id")?, "id")?,
            name: payload::as_text(payload::get(value, "name")?, "name")?,
            bonus: payload::as_u32(payload::get(value, "units")?, "units")?,
            territories: payload::id_list(payload::get(value, "cids")?, "cids")?,
        })
    }
}

/// One entry of the state `board` section: who holds a territory and how many
/// armies are on it (`None` when hidden by fog)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AreaRecord {
    pub territory: TerritoryId,
    pub owner: Option<PlayerId>,
    pub armies: Option<u32>,
}

impl AreaRecord {
    pub fn from_payload(value: &Value) -> Result<Self, PayloadError> {
        let owner = match payload::as_i64(payload::get(value, "playerid")?, "playerid")? {
            NEUTRAL_PLAYER => None,
            id => Some(u32::try_from(id).map_err(|_| PayloadError::NotANumber {
                field: "playerid".into(),
                value: id.to_string(),
            })?),
        };
        let armies = match value.get("units") {
            Some(units) => payload::as_hidden_u32(units, "units")?,
            None => None,
        };
        Ok(Self {
            territory: payload::as_u32(payload::get(value, "id")?, "id")?,
            owner,
            armies,
        })
    }
}

/// An ownable node of the board graph
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Territory {
    pub id: TerritoryId,
    pub name: String,
    /// Per-territory unit cap from the map data, passed through untouched
    pub max_units: Option<u32>,
    /// `None` for neutral territories
    pub owner: Option<PlayerId>,
    pub armies: u32,
    /// Territories this one may attack
    pub attackable_neighbors: BTreeSet<TerritoryId>,
    /// Territories that may attack this one
    pub defendable_neighbors: BTreeSet<TerritoryId>,
}

impl Territory {
    /// Create an unowned, empty territory with no neighbors
    pub fn new(id: TerritoryId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            max_units: None,
            owner: None,
            armies: 0,
            attackable_neighbors: BTreeSet::new(),
            defendable_neighbors: BTreeSet::new(),
        }
    }

    pub fn is_owned_by(&self, player: PlayerId) -> bool {
        self.owner == Some(player)
    }

    pub fn is_neutral(&self) -> bool {
        self.owner.is_none()
    }
}

/// A fixed group of territories worth a bonus to whoever holds all of them
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Continent {
    pub id: ContinentId,
    pub name: String,
    pub bonus: u32,
    pub territories: BTreeSet<TerritoryId>,
}

impl Continent {
    pub fn contains(&self, territory: TerritoryId) -> bool {
        self.territories.contains(&territory)
    }

    pub fn len(&self) -> usize {
        self.territories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.territories.is_empty()
    }
}

/// The board: territory graph, continents and players
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Board {
    territories: BTreeMap<TerritoryId, Territory>,
    continents: BTreeMap<ContinentId, Continent>,
    players: BTreeMap<PlayerId, Player>,
}

impl Board {
    /// Build a board from the server datasets.
    ///
    /// Order matters: territories first, then continents (which must only
    /// reference known territories), then borders, then the ownership snapshot.
    pub fn build(
        territories: &[TerritoryRecord],
        borders: &[BorderRecord],
        continents: &[ContinentRecord],
        areas: &[AreaRecord],
        players: Vec<Player>,
    ) -> Result<Self, GameError> {
        let mut board = Self {
            territories: BTreeMap::new(),
            continents: BTreeMap::new(),
            players: BTreeMap::new(),
        };

        for record in territories {
            let mut territory = Territory::new(record.id, record.name.clone());
            territory.max_units = record.max_units;
            if board.territories.insert(record.id, territory).is_some() {
                return Err(GameError::DataIntegrity(format!(
                    "territory {} is listed twice",
                    record.id
                )));
            }
        }

        for record in continents {
            let mut members = BTreeSet::new();
            for id in &record.territories {
                if !board.territories.contains_key(id) {
                    return Err(GameError::DataIntegrity(format!(
                        "continent {} ({}) references unknown territory {}",
                        record.id, record.name, id
                    )));
                }
                members.insert(*id);
            }
            board.continents.insert(
                record.id,
                Continent {
                    id: record.id,
                    name: record.name.clone(),
                    bonus: record.bonus,
                    territories: members,
                },
            );
        }

        for border in borders {
            for id in [border.attacker, border.defender] {
                if !board.territories.contains_key(&id) {
                    return Err(GameError::DataIntegrity(format!(
                        "border {} -> {} references unknown territory {}",
                        border.attacker, border.defender, id
                    )));
                }
            }
            if let Some(attacker) = board.territories.get_mut(&border.attacker) {
                attacker.attackable_neighbors.insert(border.defender);
            }
            if let Some(defender) = board.territories.get_mut(&border.defender) {
                defender.defendable_neighbors.insert(border.attacker);
            }
        }

        for mut player in players {
            // Derived from the snapshot below, never trusted from the roster.
            player.territories.clear();
            board.players.insert(player.id, player);
        }

        for area in areas {
            let territory = board.territories.get_mut(&area.territory).ok_or_else(|| {
                GameError::DataIntegrity(format!(
                    "board state references unknown territory {}",
                    area.territory
                ))
            })?;
            if let Some(owner) = area.owner {
                let player = board.players.get_mut(&owner).ok_or_else(|| {
                    GameError::DataIntegrity(format!(
                        "territory {} is held by unknown player {}",
                        area.territory, owner
                    ))
                })?;
                territory.owner = Some(owner);
                player.territories.insert(area.territory);
            }
            // A hidden count on an owned territory still has its garrison.
            territory.armies = match (area.armies, area.owner) {
                (Some(armies), _) => armies,
                (None, Some(_)) => 1,
                (None, None) => 0,
            };
        }

        board.check_invariants()?;
        Ok(board)
    }

    /// Get a territory by id
    pub fn territory(&self, id: TerritoryId) -> Option<&Territory> {
        self.territories.get(&id)
    }

    /// All territories in id order
    pub fn territories(&self) -> impl Iterator<Item = &Territory> {
        self.territories.values()
    }

    pub fn territory_count(&self) -> usize {
        self.territories.len()
    }

    /// Get a continent by id
    pub fn continent(&self, id: ContinentId) -> Option<&Continent> {
        self.continents.get(&id)
    }

    /// All continents in id order
    pub fn continents(&self) -> impl Iterator<Item = &Continent> {
        self.continents.values()
    }

    /// Get a player by id
    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.get(&id)
    }

    /// All players in id order
    pub fn players(&self) -> impl Iterator<Item = &Player> {
        self.players.values()
    }

    /// Find a player by display name
    pub fn player_by_name(&self, name: &str) -> Option<&Player> {
        self.players.values().find(|p| p.name == name)
    }

    /// Territories the given one may attack
    pub fn attackable_neighbors(&self, id: TerritoryId) -> impl Iterator<Item = &Territory> {
        self.neighbors(id, |t| &t.attackable_neighbors)
    }

    /// Territories that may attack the given one
    pub fn defendable_neighbors(&self, id: TerritoryId) -> impl Iterator<Item = &Territory> {
        self.neighbors(id, |t| &t.defendable_neighbors)
    }

    fn neighbors<'a>(
        &'a self,
        id: TerritoryId,
        edges: fn(&Territory) -> &BTreeSet<TerritoryId>,
    ) -> impl Iterator<Item = &'a Territory> + 'a {
        self.territories
            .get(&id)
            .into_iter()
            .flat_map(move |t| edges(t).iter())
            .filter_map(move |n| self.territories.get(n))
    }

    /// Territories owned by a player, in id order
    pub fn owned_territories(&self, player: PlayerId) -> impl Iterator<Item = &Territory> {
        self.players
            .get(&player)
            .into_iter()
            .flat_map(|p| p.territories.iter())
            .filter_map(move |id| self.territories.get(id))
    }

    /// Territories belonging to a continent, in id order
    pub fn continent_territories(&self, id: ContinentId) -> impl Iterator<Item = &Territory> {
        self.continents
            .get(&id)
            .into_iter()
            .flat_map(|c| c.territories.iter())
            .filter_map(move |t| self.territories.get(t))
    }

    /// The player holding every territory of a continent, if any
    pub fn continent_controller(&self, id: ContinentId) -> Option<PlayerId> {
        let mut owners = self.continent_territories(id).map(|t| t.owner);
        let first = owners.next()??;
        owners.all(|o| o == Some(first)).then_some(first)
    }

    /// Sum of continent bonuses a player currently earns
    pub fn continent_bonus(&self, player: PlayerId) -> u32 {
        self.continents
            .values()
            .filter(|c| self.continent_controller(c.id) == Some(player))
            .map(|c| c.bonus)
            .sum()
    }

    /// Total armies a player has on the board
    pub fn total_armies(&self, player: PlayerId) -> u32 {
        self.owned_territories(player).map(|t| t.armies).sum()
    }

    /// Verify the ownership mirror and the garrison floor.
    ///
    /// - every owned territory appears in its owner's territory set
    /// - every id in a player's set names a territory owned by that player
    /// - every owned territory holds at least one army
    pub fn check_invariants(&self) -> Result<(), GameError> {
        for territory in self.territories.values() {
            let Some(owner) = territory.owner else {
                continue;
            };
            let player = self.players.get(&owner).ok_or_else(|| {
                GameError::DataIntegrity(format!(
                    "territory {} is held by unknown player {}",
                    territory.id, owner
                ))
            })?;
            if !player.owns(territory.id) {
                return Err(GameError::DataIntegrity(format!(
                    "territory {} is held by player {} but missing from their set",
                    territory.id, owner
                )));
            }
            if territory.armies == 0 {
                return Err(GameError::DataIntegrity(format!(
                    "territory {} is held by player {} with no armies",
                    territory.id, owner
                )));
            }
        }

        for player in self.players.values() {
            for id in &player.territories {
                let held = self
                    .territories
                    .get(id)
                    .is_some_and(|t| t.is_owned_by(player.id));
                if !held {
                    return Err(GameError::DataIntegrity(format!(
                        "player {} lists territory {} they do not hold",
                        player.id, id
                    )));
                }
            }
        }

        Ok(())
    }

    // ==================== Mutation (result application only) ====================

    fn territory_mut(&mut self, id: TerritoryId) -> Result<&mut Territory, GameError> {
        self.territories
            .get_mut(&id)
            .ok_or(GameError::UnknownTerritory(id))
    }

    pub(crate) fn add_armies(&mut self, id: TerritoryId, armies: u32) -> Result<(), GameError> {
        let territory = self.territory_mut(id)?;
        territory.armies = territory.armies.saturating_add(armies);
        Ok(())
    }

    pub(crate) fn remove_armies(&mut self, id: TerritoryId, armies: u32) -> Result<(), GameError> {
        let territory = self.territory_mut(id)?;
        territory.armies = territory.armies.saturating_sub(armies);
        Ok(())
    }

    pub(crate) fn set_armies(&mut self, id: TerritoryId, armies: u32) -> Result<(), GameError> {
        self.territory_mut(id)?.armies = armies;
        Ok(())
    }

    /// Hand a territory to a new owner, keeping both players' sets in step.
    /// Returns the previous owner.
    pub(crate) fn transfer_territory(
        &mut self,
        id: TerritoryId,
        new_owner: Option<PlayerId>,
    ) -> Result<Option<PlayerId>, GameError> {
        if let Some(owner) = new_owner {
            if !self.players.contains_key(&owner) {
                return Err(GameError::UnknownPlayer(owner.to_string()));
            }
        }

        let territory = self.territory_mut(id)?;
        let previous = std::mem::replace(&mut territory.owner, new_owner);

        if let Some(old) = previous.and_then(|p| self.players.get_mut(&p)) {
            old.territories.remove(&id);
        }
        if let Some(new) = new_owner.and_then(|p| self.players.get_mut(&p)) {
            new.territories.insert(id);
        }
        Ok(previous)
    }

    pub(crate) fn set_player_active(&mut self, player: PlayerId, active: bool) {
        if let Some(p) = self.players.get_mut(&player) {
            p.active = active;
        }
    }

    pub(crate) fn spend_reserve(&mut self, player: PlayerId, units: u32) {
        if let Some(p) = self.players.get_mut(&player) {
            p.spend_reserve(units);
        }
    }
}
