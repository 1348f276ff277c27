//! Automated players.
//!
//! A [`Strategy`] only decides; it reads the board and answers with
//! placements and attacks. The turn runner submits and applies them.
//!
//! Two strategies are bundled:
//! - Random: spreads the reserve evenly and attacks anything it can
//! - Continent: picks the continent that looks cheapest to hold and pushes
//!   everything into it

use crate::board::{Board, ContinentId, PlayerId, Territory, TerritoryId};
use rand::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info};

/// Armies a territory needs before the random bot attacks from it
const RANDOM_ATTACK_MIN: u32 = 4;

/// The continent bot attacks from territories holding more than this
const CONTINENT_ATTACK_THRESHOLD: u32 = 3;

/// An attack a strategy wants to make
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttackChoice {
    pub from: TerritoryId,
    pub to: TerritoryId,
    pub units: u32,
}

/// Decision making for one player
pub trait Strategy {
    /// Called once before the first action of a turn
    fn begin_turn(&mut self, _board: &Board, _player: PlayerId) {}

    /// Distribute the player's reserve
    fn select_placement(&mut self, board: &Board, player: PlayerId) -> BTreeMap<TerritoryId, u32>;

    /// Pick the next attack, or `None` to stop attacking
    fn select_attack(&mut self, board: &Board, player: PlayerId) -> Option<AttackChoice>;
}

/// Bundled strategy kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BotStrategy {
    Random,
    Continent,
}

/// A bot player
pub struct Bot {
    pub strategy: BotStrategy,
    rng: StdRng,
    target: Option<ContinentId>,
}

impl Bot {
    pub fn new(strategy: BotStrategy) -> Self {
        Self {
            strategy,
            rng: StdRng::from_entropy(),
            target: None,
        }
    }

    pub fn with_seed(strategy: BotStrategy, seed: u64) -> Self {
        Self {
            strategy,
            rng: StdRng::seed_from_u64(seed),
            target: None,
        }
    }

    /// Continent the continent bot is currently going for
    pub fn target(&self) -> Option<ContinentId> {
        self.target
    }

    // ==================== Random ====================

    /// Round-robin the reserve one unit at a time over owned territories
    fn place_random(&self, board: &Board, player: PlayerId) -> BTreeMap<TerritoryId, u32> {
        let owned: Vec<TerritoryId> = board.owned_territories(player).map(|t| t.id).collect();
        let reserve = board.player(player).map(|p| p.reserve_units).unwrap_or(0);

        let mut placements = BTreeMap::new();
        for id in owned.iter().cycle().take(reserve as usize) {
            *placements.entry(*id).or_insert(0) += 1;
        }
        placements
    }

    fn attack_random(&mut self, board: &Board, player: PlayerId) -> Option<AttackChoice> {
        let candidates: Vec<AttackChoice> = board
            .owned_territories(player)
            .filter(|t| t.armies >= RANDOM_ATTACK_MIN)
            .flat_map(|from| {
                board
                    .attackable_neighbors(from.id)
                    .filter(move |to| !to.is_owned_by(player))
                    .map(move |to| AttackChoice {
                        from: from.id,
                        to: to.id,
                        units: from.armies - 1,
                    })
            })
            .collect();

        candidates.choose(&mut self.rng).copied()
    }

    // ==================== Continent ====================

    fn choose_target(&mut self, board: &Board, player: PlayerId) {
        let utilities = continent_utilities(board, player);
        self.target = utilities
            .iter()
            .max_by(|a, b| a.1.cmp(b.1).then(b.0.cmp(a.0)))
            .map(|(id, _)| *id);

        match self.target.and_then(|id| board.continent(id)) {
            Some(continent) => info!("Target continent: {}", continent.name),
            None => info!("No continent worth targeting"),
        }
    }

    /// Owned territories that border an enemy or neutral territory of the
    /// target continent
    fn staging_territories<'a>(
        &self,
        board: &'a Board,
        player: PlayerId,
    ) -> impl Iterator<Item = &'a Territory> + 'a {
        let target = self.target.and_then(|id| board.continent(id));
        board.owned_territories(player).filter(move |t| {
            target.is_some_and(|continent| {
                board
                    .attackable_neighbors(t.id)
                    .any(|n| continent.contains(n.id) && !n.is_owned_by(player))
            })
        })
    }

    /// Everything goes on the strongest staging territory. Without one,
    /// the strongest owned territory gets it.
    fn place_continent(&mut self, board: &Board, player: PlayerId) -> BTreeMap<TerritoryId, u32> {
        if self.target.is_none() {
            self.choose_target(board, player);
        }
        let reserve = board.player(player).map(|p| p.reserve_units).unwrap_or(0);
        if reserve == 0 {
            return BTreeMap::new();
        }

        let base = strongest(self.staging_territories(board, player))
            .or_else(|| strongest(board.owned_territories(player)));
        base.map(|t| BTreeMap::from([(t.id, reserve)]))
            .unwrap_or_default()
    }

    fn attack_continent(&mut self, board: &Board, player: PlayerId) -> Option<AttackChoice> {
        let continent = board.continent(self.target?)?;
        let from = strongest(
            self.staging_territories(board, player)
                .filter(|t| t.armies > CONTINENT_ATTACK_THRESHOLD),
        )?;
        let to = board
            .attackable_neighbors(from.id)
            .find(|n| continent.contains(n.id) && !n.is_owned_by(player))?;

        Some(AttackChoice {
            from: from.id,
            to: to.id,
            units: from.armies - 1,
        })
    }
}

impl Strategy for Bot {
    fn begin_turn(&mut self, board: &Board, player: PlayerId) {
        if self.strategy == BotStrategy::Continent {
            self.choose_target(board, player);
        }
    }

    fn select_placement(&mut self, board: &Board, player: PlayerId) -> BTreeMap<TerritoryId, u32> {
        match self.strategy {
            BotStrategy::Random => self.place_random(board, player),
            BotStrategy::Continent => self.place_continent(board, player),
        }
    }

    fn select_attack(&mut self, board: &Board, player: PlayerId) -> Option<AttackChoice> {
        match self.strategy {
            BotStrategy::Random => self.attack_random(board, player),
            BotStrategy::Continent => self.attack_continent(board, player),
        }
    }
}

/// Most armies wins; ties go to the lowest id
fn strongest<'a>(territories: impl Iterator<Item = &'a Territory>) -> Option<&'a Territory> {
    territories.max_by(|a, b| match a.armies.cmp(&b.armies) {
        Ordering::Equal => b.id.cmp(&a.id),
        other => other,
    })
}

/// Score every continent worth attacking for `player`.
///
/// The score favors small continents with few entry points and rewards
/// territories already held:
///
/// ```text
/// bonus - size - access_points - outside_neighbors - worst_border
///       + 2 * owned + neutral
/// ```
///
/// An access point is a member territory that can be attacked from outside
/// the continent; `worst_border` is the largest number of outside attackers
/// any single access point has. Continents the player already holds, or
/// cannot attack into at all, are left out.
pub fn continent_utilities(board: &Board, player: PlayerId) -> BTreeMap<ContinentId, i32> {
    let mut utilities = BTreeMap::new();

    for continent in board.continents() {
        let mut reachable = false;
        let mut owned = 0;
        let mut neutral = 0;
        let mut outside_neighbors = BTreeSet::new();
        let mut worst_border = 0;
        let mut access_points = 0;

        for territory in board.continent_territories(continent.id) {
            if territory.is_owned_by(player) {
                owned += 1;
            } else if territory.is_neutral() {
                neutral += 1;
            }

            let mut outside = 0;
            for neighbor in board.defendable_neighbors(territory.id) {
                if !continent.contains(neighbor.id) {
                    outside += 1;
                    outside_neighbors.insert(neighbor.id);
                }
                if neighbor.is_owned_by(player) {
                    reachable = true;
                }
            }
            if outside > 0 {
                access_points += 1;
                worst_border = worst_border.max(outside);
            }
        }

        if owned == continent.len() || !reachable {
            debug!(continent = %continent.name, owned, reachable, "continent skipped");
            continue;
        }

        let utility = continent.bonus as i32 - continent.len() as i32 - access_points
            - outside_neighbors.len() as i32
            - worst_border
            + 2 * owned as i32
            + neutral;
        debug!(
            continent = %continent.name,
            bonus = continent.bonus,
            size = continent.len(),
            access_points,
            outside_neighbors = outside_neighbors.len(),
            worst_border,
            owned,
            utility,
            "continent scored"
        );
        utilities.insert(continent.id, utility);
    }

    utilities
}
