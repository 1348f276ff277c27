//! Moves a player can submit and the events a turn produces.
//!
//! This module defines the server's action kinds, the legal-action set it
//! reports after every move, the typed `Move` requests, and the `TurnEvent`
//! stream the turn runner emits.

use crate::board::{Board, PlayerId, TerritoryId};
use crate::game::GameError;
use crate::payload::{self, PayloadError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// An action kind as named by the server
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionKind {
    /// Place reserve units
    PlaceUnits,
    /// Attack a neighboring territory
    Attack,
    /// Move units between owned territories (fortify)
    Transfer,
    /// Move extra units into a just-captured territory
    FreeTransfer,
    /// End the turn
    EndTurn,
    /// Anything else the server reports (card trades, etc.)
    Other(String),
}

impl ActionKind {
    /// The id the server uses for this action
    pub fn id(&self) -> &str {
        match self {
            ActionKind::PlaceUnits => "placeunits",
            ActionKind::Attack => "attack",
            ActionKind::Transfer => "transfer",
            ActionKind::FreeTransfer => "freetransfer",
            ActionKind::EndTurn => "endturn",
            ActionKind::Other(id) => id.as_str(),
        }
    }

    pub fn from_id(id: &str) -> Self {
        match id {
            "placeunits" => ActionKind::PlaceUnits,
            "attack" => ActionKind::Attack,
            "transfer" => ActionKind::Transfer,
            "freetransfer" => ActionKind::FreeTransfer,
            "endturn" => ActionKind::EndTurn,
            other => ActionKind::Other(other.to_string()),
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// The legal-action set: ordered as reported, without duplicates
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PossibleActions(Vec<ActionKind>);

impl PossibleActions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from server action ids
    pub fn from_ids<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        ids.into_iter()
            .map(|id| ActionKind::from_id(id.as_ref()))
            .collect()
    }

    /// Decode a `possibleactions` element. An element without `_content`
    /// means nothing is possible.
    pub fn from_payload(value: &Value) -> Result<Self, PayloadError> {
        let Some(content) = value.get("_content") else {
            return Ok(Self::new());
        };
        let Some(actions) = content.get("action") else {
            return Ok(Self::new());
        };
        payload::items(actions)
            .into_iter()
            .map(|action| -> Result<ActionKind, PayloadError> {
                let id = payload::as_text(payload::get(action, "id")?, "id")?;
                Ok(ActionKind::from_id(&id))
            })
            .collect()
    }

    pub fn contains(&self, action: &ActionKind) -> bool {
        self.0.contains(action)
    }

    /// Add an action if not already present
    pub fn insert(&mut self, action: ActionKind) {
        if !self.contains(&action) {
            self.0.push(action);
        }
    }

    /// Remove an action, returning whether it was present
    pub fn remove(&mut self, action: &ActionKind) -> bool {
        let before = self.0.len();
        self.0.retain(|a| a != action);
        self.0.len() != before
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ActionKind> {
        self.0.iter()
    }
}

impl FromIterator<ActionKind> for PossibleActions {
    fn from_iter<T: IntoIterator<Item = ActionKind>>(iter: T) -> Self {
        let mut actions = Self::new();
        for action in iter {
            actions.insert(action);
        }
        actions
    }
}

impl fmt::Display for PossibleActions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ids: Vec<&str> = self.0.iter().map(ActionKind::id).collect();
        write!(f, "{{{}}}", ids.join(", "))
    }
}

/// An attack from one territory into a neighbor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttackMove {
    pub from: TerritoryId,
    pub to: TerritoryId,
    pub units: u32,
    /// Keep rolling until one side is exhausted
    pub continuous: bool,
}

/// A request submitted to the server. Each value is consumed by one
/// submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Move {
    /// Place reserve units: territory -> count
    PlaceUnits(BTreeMap<TerritoryId, u32>),
    Attack(AttackMove),
    /// Move units into the territory captured by the preceding attack
    FreeTransfer { units: u32 },
    EndTurn,
}

impl Move {
    /// The action kind this move exercises
    pub fn kind(&self) -> ActionKind {
        match self {
            Move::PlaceUnits(_) => ActionKind::PlaceUnits,
            Move::Attack(_) => ActionKind::Attack,
            Move::FreeTransfer { .. } => ActionKind::FreeTransfer,
            Move::EndTurn => ActionKind::EndTurn,
        }
    }

    /// Request parameters for this move. Placements are listed in ascending
    /// territory order so `clist` and `ulist` always line up.
    pub fn query_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![("action", self.kind().id().to_string())];
        match self {
            Move::PlaceUnits(placements) => {
                let ids: Vec<String> = placements.keys().map(|id| id.to_string()).collect();
                let counts: Vec<String> = placements.values().map(|n| n.to_string()).collect();
                params.push(("clist", ids.join(",")));
                params.push(("ulist", counts.join(",")));
            }
            Move::Attack(attack) => {
                params.push(("fromcid", attack.from.to_string()));
                params.push(("tocid", attack.to.to_string()));
                params.push(("numunits", attack.units.to_string()));
                let continuous = if attack.continuous { "1" } else { "0" };
                params.push(("continuous", continuous.to_string()));
            }
            Move::FreeTransfer { units } => {
                params.push(("numunits", units.to_string()));
            }
            Move::EndTurn => {}
        }
        params
    }

    /// Total units a placement puts on the board (zero for other moves)
    pub fn placed_units(&self) -> u32 {
        match self {
            Move::PlaceUnits(placements) => placements.values().sum(),
            _ => 0,
        }
    }

    /// Check the move's shape against the board before it is submitted.
    /// This is not a legality check; the server is the authority on that.
    pub fn validate(&self, board: &Board) -> Result<(), GameError> {
        match self {
            Move::PlaceUnits(placements) => {
                if placements.is_empty() {
                    return Err(GameError::InvalidMove("placement is empty".into()));
                }
                for (id, count) in placements {
                    if board.territory(*id).is_none() {
                        return Err(GameError::UnknownTerritory(*id));
                    }
                    if *count == 0 {
                        return Err(GameError::InvalidMove(format!(
                            "placement of zero units on territory {id}"
                        )));
                    }
                }
            }
            Move::Attack(attack) => {
                for id in [attack.from, attack.to] {
                    if board.territory(id).is_none() {
                        return Err(GameError::UnknownTerritory(id));
                    }
                }
                if attack.from == attack.to {
                    return Err(GameError::InvalidMove(format!(
                        "territory {} cannot attack itself",
                        attack.from
                    )));
                }
                if attack.units == 0 {
                    return Err(GameError::InvalidMove("attack with no units".into()));
                }
            }
            Move::FreeTransfer { .. } | Move::EndTurn => {}
        }
        Ok(())
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Move::PlaceUnits(placements) => {
                let parts: Vec<String> = placements
                    .iter()
                    .map(|(id, n)| format!("{n} on {id}"))
                    .collect();
                write!(f, "place {}", parts.join(", "))
            }
            Move::Attack(a) => write!(
                f,
                "attack {} -> {} with {}{}",
                a.from,
                a.to,
                a.units,
                if a.continuous { " (continuous)" } else { "" }
            ),
            Move::FreeTransfer { units } => write!(f, "free transfer of {units}"),
            Move::EndTurn => f.write_str("end turn"),
        }
    }
}

/// Why the runner dropped an action locally instead of submitting it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkipReason {
    /// The strategy found nothing worth attacking
    NoTarget,
    /// The runner does not play this action
    NotPlayed,
    /// The strategy had no units to place
    NothingToPlace,
}

/// Events that occur while a turn is played
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TurnEvent {
    /// The runner picked an action to play
    ActionChosen { action: ActionKind },

    /// A move was sent to the server
    MoveSubmitted { request: Move },

    /// Reserve units were placed
    UnitsPlaced { placements: BTreeMap<TerritoryId, u32> },

    /// An attack was resolved by the server
    AttackResolved {
        from: TerritoryId,
        to: TerritoryId,
        attacker_losses: u32,
        defender_losses: u32,
        captured: bool,
        /// Defending player knocked out of the game
        eliminated: Option<PlayerId>,
    },

    /// Units followed a capture into the new territory
    UnitsTransferred {
        from: TerritoryId,
        to: TerritoryId,
        units: u32,
    },

    /// The server ended the turn
    TurnEnded,

    /// An action was dropped from the legal set locally
    ActionSkipped { action: ActionKind, reason: SkipReason },

    /// A result could not be mirrored onto the board
    StateGap { detail: String },

    /// Nothing left that the runner knows how to play
    NoActionAvailable { remaining: PossibleActions },
}

impl fmt::Display for TurnEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TurnEvent::ActionChosen { action } => write!(f, "playing {action}"),
            TurnEvent::MoveSubmitted { request } => write!(f, "submitted: {request}"),
            TurnEvent::UnitsPlaced { placements } => {
                write!(f, "placed {} units", placements.values().sum::<u32>())
            }
            TurnEvent::AttackResolved {
                from,
                to,
                attacker_losses,
                defender_losses,
                captured,
                eliminated,
            } => {
                write!(
                    f,
                    "attack {from} -> {to}: lost {attacker_losses}, killed {defender_losses}"
                )?;
                if *captured {
                    f.write_str(", captured")?;
                }
                if let Some(player) = eliminated {
                    write!(f, ", player {player} eliminated")?;
                }
                Ok(())
            }
            TurnEvent::UnitsTransferred { from, to, units } => {
                write!(f, "moved {units} from {from} to {to}")
            }
            TurnEvent::TurnEnded => f.write_str("turn ended"),
            TurnEvent::ActionSkipped { action, reason } => {
                write!(f, "skipping {action} ({reason:?})")
            }
            TurnEvent::StateGap { detail } => write!(f, "board not updated: {detail}"),
            TurnEvent::NoActionAvailable { remaining } => {
                write!(f, "no playable action in {remaining}")
            }
        }
    }
}
