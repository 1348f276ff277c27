//! Game state: the board mirror plus the turn context.
//!
//! This module contains the main `GameState` struct, the decoding of the
//! server's initial game description, and the single path through which a
//! move is submitted and its result mirrored locally.

use crate::actions::{ActionKind, Move, PossibleActions, TurnEvent};
use crate::board::{
    AreaRecord, Board, BorderRecord, ContinentRecord, PlayerId, TerritoryId, TerritoryRecord,
};
use crate::payload::{self, PayloadError};
use crate::player::Player;
use crate::remote::MoveExecutor;
use crate::results::MoveResult;
use crate::rules::Rules;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

/// Errors raised while setting up or playing a game
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum GameError {
    #[error("Malformed game data: {0}")]
    DataIntegrity(String),

    #[error("Undecodable move result: {0}")]
    Protocol(String),

    #[error("Transport failure: {0}")]
    Transport(String),

    #[error("Board could not be updated: {0}")]
    StateGap(String),

    #[error("Invalid move: {0}")]
    InvalidMove(String),

    #[error("Unknown player: {0}")]
    UnknownPlayer(String),

    #[error("Unknown territory: {0}")]
    UnknownTerritory(TerritoryId),
}

impl GameError {
    /// Whether play can safely continue after this error
    pub fn is_recoverable(&self) -> bool {
        matches!(self, GameError::StateGap(_))
    }
}

fn integrity(section: &'static str) -> impl Fn(PayloadError) -> GameError {
    move |e| GameError::DataIntegrity(format!("{section}: {e}"))
}

/// Decode every element of a list section with `decode`.
fn records<T>(
    root: &Value,
    section: &'static str,
    list: &str,
    decode: fn(&Value) -> Result<T, PayloadError>,
) -> Result<Vec<T>, GameError> {
    let value = payload::section(root, section, list).map_err(integrity(section))?;
    payload::items(value)
        .into_iter()
        .map(|item| decode(item).map_err(integrity(section)))
        .collect()
}

/// The mutable part of a turn: what the server allows next, and what was
/// done last
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnContext {
    possible_actions: PossibleActions,
    last_move: Option<Move>,
}

impl TurnContext {
    pub fn new(possible_actions: PossibleActions) -> Self {
        Self {
            possible_actions,
            last_move: None,
        }
    }

    pub fn possible_actions(&self) -> &PossibleActions {
        &self.possible_actions
    }

    pub fn last_move(&self) -> Option<&Move> {
        self.last_move.as_ref()
    }
}

/// A move that went through the server and onto the board
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutedMove {
    pub result: MoveResult,
    /// What the result did to the board
    pub event: TurnEvent,
}

/// The complete local view of one game
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameState {
    /// Warfish table id
    pub id: String,
    board: Board,
    rules: Rules,
    context: TurnContext,
}

impl GameState {
    pub fn new(id: impl Into<String>, board: Board, rules: Rules, possible_actions: PossibleActions) -> Self {
        Self {
            id: id.into(),
            board,
            rules,
            context: TurnContext::new(possible_actions),
        }
    }

    /// Build a game from the `getDetails` (sections board, rules, map,
    /// continents) and `getState` (sections players, board, possibleactions)
    /// payloads.
    pub fn from_server(id: impl Into<String>, details: &Value, state: &Value) -> Result<Self, GameError> {
        let territories = records(details, "map", "territory", TerritoryRecord::from_payload)?;
        let borders = records(details, "board", "border", BorderRecord::from_payload)?;
        let continents = records(details, "continents", "continent", ContinentRecord::from_payload)?;
        let players = records(state, "players", "player", Player::from_payload)?;
        let areas = records(state, "board", "area", AreaRecord::from_payload)?;

        let rules = match payload::path(details, &["_content", "rules"]) {
            Ok(rules) => Rules::from_payload(rules),
            Err(_) => Rules::default(),
        };
        let possible_actions = match payload::path(state, &["_content", "possibleactions"]) {
            Ok(actions) => {
                PossibleActions::from_payload(actions).map_err(integrity("possibleactions"))?
            }
            Err(_) => PossibleActions::new(),
        };

        let board = Board::build(&territories, &borders, &continents, &areas, players)?;
        debug!(
            territories = board.territory_count(),
            continents = continents.len(),
            actions = %possible_actions,
            "loaded game"
        );
        Ok(Self::new(id, board, rules, possible_actions))
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn rules(&self) -> &Rules {
        &self.rules
    }

    pub fn context(&self) -> &TurnContext {
        &self.context
    }

    pub fn possible_actions(&self) -> &PossibleActions {
        self.context.possible_actions()
    }

    pub fn last_move(&self) -> Option<&Move> {
        self.context.last_move()
    }

    /// Look up a player id by display name
    pub fn player_id(&self, name: &str) -> Result<PlayerId, GameError> {
        self.board
            .player_by_name(name)
            .map(|p| p.id)
            .ok_or_else(|| GameError::UnknownPlayer(name.to_string()))
    }

    /// Drop an action from the legal set without telling the server.
    /// Returns whether it was present.
    pub fn dismiss_action(&mut self, action: &ActionKind) -> bool {
        self.context.possible_actions.remove(action)
    }

    /// Submit a move, decode the answer, and mirror it onto the board.
    ///
    /// The legal-action set is replaced by the one the server reports. A
    /// [`GameError::StateGap`] while applying is logged and reported through
    /// the returned event; every other error is returned and leaves the
    /// board and the turn context as they were.
    pub fn execute_move<E>(&mut self, executor: &mut E, request: Move) -> Result<ExecutedMove, GameError>
    where
        E: MoveExecutor + ?Sized,
    {
        request.validate(&self.board)?;
        let payload = executor.submit(&request)?;
        let result = MoveResult::decode(&payload, &request)?;

        // Nothing is committed until the result applies cleanly
        let mut board = self.board.clone();
        let event = match result.apply(&mut board, self.context.last_move.as_ref()) {
            Ok(event) => {
                board.check_invariants()?;
                self.board = board;
                event
            }
            Err(e) if e.is_recoverable() => {
                warn!("{}", e);
                TurnEvent::StateGap {
                    detail: e.to_string(),
                }
            }
            Err(e) => return Err(e),
        };

        self.context.possible_actions = result.possible_actions().clone();
        self.context.last_move = Some(request);
        Ok(ExecutedMove { result, event })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::tests::sample_board;
    use crate::remote::ScriptedExecutor;
    use crate::results::tests::{attack_response, response};
    use crate::actions::AttackMove;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::collections::BTreeMap;

    fn details() -> Value {
        json!({
            "_content": {
                "map": {"_content": {"territory": [
                    {"id": "1", "name": "Alaska", "maxunits": "0"},
                    {"id": "2", "name": "Alberta", "maxunits": "0"},
                    {"id": "3", "name": "Kamchatka", "maxunits": "0"}
                ]}},
                "board": {"_content": {"border": [
                    {"a": "1", "b": "2"}, {"a": "2", "b": "1"},
                    {"a": "1", "b": "3"}, {"a": "3", "b": "1"}
                ]}},
                "continents": {"_content": {"continent": {
                    "id": "1", "name": "North", "units": "5", "cids": "1,2,3"
                }}},
                "rules": {"numattacks": "-1", "continuousattack": "1", "keeppossession": "0"}
            }
        })
    }

    fn state() -> Value {
        json!({
            "_content": {
                "players": {"_content": {"player": [
                    {"id": "0", "name": "Alice", "isturn": 1, "active": 1, "teamid": "0", "units": "4", "profileid": "11"},
                    {"id": "1", "name": "Bob", "isturn": 0, "active": 1, "teamid": "0", "units": "?", "profileid": "12"}
                ]}},
                "board": {"_content": {"area": [
                    {"id": "1", "playerid": "0", "units": "5"},
                    {"id": "2", "playerid": "1", "units": "2"},
                    {"id": "3", "playerid": "-1", "units": "3"}
                ]}},
                "possibleactions": {"_content": {"action": [{"id": "placeunits"}]}}
            }
        })
    }

    #[test]
    fn test_from_server() {
        let game = GameState::from_server("73888572", &details(), &state()).unwrap();
        let board = game.board();

        assert_eq!(board.territory_count(), 3);
        assert_eq!(board.territory(1).unwrap().owner, Some(0));
        assert_eq!(board.territory(1).unwrap().armies, 5);
        assert!(board.territory(3).unwrap().is_neutral());
        assert_eq!(board.continent(1).unwrap().len(), 3);
        assert_eq!(board.player(0).unwrap().reserve_units, 4);
        assert_eq!(game.player_id("Bob"), Ok(1));
        assert_eq!(
            game.player_id("Carol"),
            Err(GameError::UnknownPlayer("Carol".into()))
        );
        assert_eq!(
            game.possible_actions(),
            &PossibleActions::from_ids(["placeunits"])
        );
        assert_eq!(game.rules().get("keeppossession"), Some(&json!("0")));
        assert!(game.last_move().is_none());
    }

    #[test]
    fn test_from_server_without_possible_actions() {
        let mut state = state();
        state["_content"]["possibleactions"] = json!({});
        let game = GameState::from_server("1", &details(), &state).unwrap();
        assert!(game.possible_actions().is_empty());
    }

    #[test]
    fn test_from_server_rejects_bad_data() {
        let mut details = details();
        details["_content"]["continents"]["_content"]["continent"]["cids"] = json!("1,2,9");
        assert!(matches!(
            GameState::from_server("1", &details, &state()),
            Err(GameError::DataIntegrity(_))
        ));

        let mut state = state();
        state["_content"]["board"]["_content"]["area"][0]["units"] = json!("five");
        assert!(matches!(
            GameState::from_server("1", &self::details(), &state),
            Err(GameError::DataIntegrity(msg)) if msg.contains("units")
        ));

        let mut details = self::details();
        details["_content"]
            .as_object_mut()
            .unwrap()
            .remove("map");
        assert!(matches!(
            GameState::from_server("1", &details, &self::state()),
            Err(GameError::DataIntegrity(msg)) if msg.contains("map")
        ));
    }

    #[test]
    fn test_execute_move_replaces_actions_and_remembers_move() {
        let mut game = GameState::new(
            "1",
            sample_board(),
            Rules::default(),
            PossibleActions::from_ids(["placeunits"]),
        );
        let mut executor = ScriptedExecutor::new([response(&["attack", "transfer", "endturn"], json!({}))]);

        let request = Move::PlaceUnits(BTreeMap::from([(1, 3), (3, 2)]));
        let executed = game.execute_move(&mut executor, request.clone()).unwrap();

        assert_eq!(
            executed.event,
            TurnEvent::UnitsPlaced {
                placements: BTreeMap::from([(1, 3), (3, 2)])
            }
        );
        assert_eq!(
            game.possible_actions(),
            &PossibleActions::from_ids(["attack", "transfer", "endturn"])
        );
        assert_eq!(game.last_move(), Some(&request));
        assert_eq!(executor.submitted(), &[request]);
    }

    #[test]
    fn test_execute_move_reports_state_gap_and_continues() {
        let mut game = GameState::new(
            "1",
            sample_board(),
            Rules::default(),
            PossibleActions::from_ids(["freetransfer"]),
        );
        let mut executor = ScriptedExecutor::new([response(&["attack", "endturn"], json!({}))]);

        let executed = game
            .execute_move(&mut executor, Move::FreeTransfer { units: 2 })
            .unwrap();

        assert!(matches!(executed.event, TurnEvent::StateGap { .. }));
        assert_eq!(game.board().total_armies(1), 9);
        assert_eq!(
            game.possible_actions(),
            &PossibleActions::from_ids(["attack", "endturn"])
        );
    }

    #[test]
    fn test_execute_move_surfaces_fatal_errors() {
        let mut game = GameState::new(
            "1",
            sample_board(),
            Rules::default(),
            PossibleActions::from_ids(["attack"]),
        );
        let attack = Move::Attack(AttackMove {
            from: 1,
            to: 2,
            units: 5,
            continuous: true,
        });

        // Executor has nothing left to answer with
        let mut empty = ScriptedExecutor::new(Vec::<Value>::new());
        assert!(matches!(
            game.execute_move(&mut empty, attack.clone()),
            Err(GameError::Transport(_))
        ));

        // Answer without the attack results
        let mut executor = ScriptedExecutor::new([response(&["attack"], json!({}))]);
        assert!(matches!(
            game.execute_move(&mut executor, attack),
            Err(GameError::Protocol(_))
        ));

        // Invalid shape never reaches the executor
        let mut executor = ScriptedExecutor::new([attack_response(&["attack"], 0, 0, false, false)]);
        assert!(matches!(
            game.execute_move(&mut executor, Move::PlaceUnits(BTreeMap::new())),
            Err(GameError::InvalidMove(_))
        ));
        assert!(executor.submitted().is_empty());
    }

    #[test]
    fn test_failed_application_leaves_game_untouched() {
        let mut game = GameState::new(
            "1",
            sample_board(),
            Rules::default(),
            PossibleActions::from_ids(["attack", "endturn"]),
        );
        let before: Vec<_> = game.board().territories().cloned().collect();
        // A capture with a single survivor cannot garrison the new territory
        let mut executor =
            ScriptedExecutor::new([attack_response(&["freetransfer"], 5, 2, true, false)]);
        let attack = Move::Attack(AttackMove {
            from: 1,
            to: 2,
            units: 5,
            continuous: true,
        });

        let err = game.execute_move(&mut executor, attack).unwrap_err();

        assert!(matches!(err, GameError::DataIntegrity(_)));
        assert_eq!(game.board().territories().cloned().collect::<Vec<_>>(), before);
        assert_eq!(game.board().player(1).unwrap().territories.len(), 2);
        assert_eq!(
            game.possible_actions(),
            &PossibleActions::from_ids(["attack", "endturn"])
        );
        assert_eq!(game.last_move(), None);
    }

    #[test]
    fn test_attack_on_hidden_defender_keeps_playing() {
        let mut state = state();
        state["_content"]["board"]["_content"]["area"][1]["units"] = json!("?");
        let mut game = GameState::from_server("1", &details(), &state).unwrap();
        let mut executor =
            ScriptedExecutor::new([attack_response(&["attack", "endturn"], 0, 2, false, false)]);
        let attack = Move::Attack(AttackMove {
            from: 1,
            to: 2,
            units: 4,
            continuous: true,
        });

        let executed = game.execute_move(&mut executor, attack).unwrap();

        assert!(!executed.result.captured());
        assert_eq!(game.board().territory(2).unwrap().armies, 1);
        assert_eq!(game.board().territory(2).unwrap().owner, Some(1));
        assert_eq!(
            game.possible_actions(),
            &PossibleActions::from_ids(["attack", "endturn"])
        );
    }
}
