//! Move results: decoding server responses and mirroring them onto the board.
//!
//! A result is decoded according to the move that produced it, never by
//! sniffing the payload. Applying a result is the only way the board's
//! ownership and army counts change after setup.

use crate::actions::{ActionKind, AttackMove, Move, PossibleActions, TurnEvent};
use crate::board::{Board, TerritoryId};
use crate::game::GameError;
use crate::payload::{self, PayloadError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Garrison the server leaves in a captured territory when a free transfer
/// follows
pub const CAPTURE_GARRISON: u32 = 3;

/// Fields every result carries
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultStatus {
    pub code: String,
    pub message: String,
    /// Legal actions after this move, as reported by the server
    pub possible_actions: PossibleActions,
}

/// What happened in an attack
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttackOutcome {
    pub from: TerritoryId,
    pub to: TerritoryId,
    pub attacker_losses: u32,
    pub defender_losses: u32,
    pub captured: bool,
    pub defender_eliminated: bool,
}

/// The server's answer to a move
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MoveResult {
    PlaceUnits {
        status: ResultStatus,
        placements: BTreeMap<TerritoryId, u32>,
    },
    Attack {
        status: ResultStatus,
        outcome: AttackOutcome,
    },
    FreeTransfer {
        status: ResultStatus,
        units: u32,
    },
    EndTurn {
        status: ResultStatus,
    },
}

fn protocol(action: &ActionKind) -> impl Fn(PayloadError) -> GameError + '_ {
    move |e| GameError::Protocol(format!("{action} result: {e}"))
}

/// Read `_content.return` and the fields shared by every result.
fn decode_status(
    payload: &Value,
    action: &ActionKind,
    actions_required: bool,
) -> Result<ResultStatus, GameError> {
    let ret = payload::path(payload, &["_content", "return"]).map_err(protocol(action))?;
    let code = payload::as_text(payload::get(ret, "code").map_err(protocol(action))?, "code")
        .map_err(protocol(action))?;
    let message = match ret.get("msg") {
        Some(msg) => payload::as_text(msg, "msg").map_err(protocol(action))?,
        None => String::new(),
    };
    let possible_actions = match payload::path(ret, &["_content", "possibleactions"]) {
        Ok(actions) => PossibleActions::from_payload(actions).map_err(protocol(action))?,
        Err(_) if !actions_required => PossibleActions::new(),
        Err(e) => return Err(protocol(action)(e)),
    };
    Ok(ResultStatus {
        code,
        message,
        possible_actions,
    })
}

fn decode_attack(payload: &Value, attack: &AttackMove) -> Result<AttackOutcome, GameError> {
    let action = ActionKind::Attack;
    let results = payload::path(payload, &["_content", "return", "_content", "results"])
        .map_err(protocol(&action))?;
    let count = |key: &str| -> Result<u32, GameError> {
        let value = payload::get(results, key).map_err(protocol(&action))?;
        payload::as_u32(value, key).map_err(protocol(&action))
    };
    Ok(AttackOutcome {
        from: attack.from,
        to: attack.to,
        attacker_losses: count("totalattackerlosses")?,
        defender_losses: count("totaldefenderlosses")?,
        captured: payload::opt_flag(results, "captured"),
        defender_eliminated: payload::opt_flag(results, "eliminate"),
    })
}

impl MoveResult {
    /// Decode the server's response to `request`.
    ///
    /// Fails with [`GameError::Protocol`] when a required field is missing
    /// or malformed. Fields nobody asked for are ignored.
    pub fn decode(payload: &Value, request: &Move) -> Result<Self, GameError> {
        let action = request.kind();
        match request {
            Move::PlaceUnits(placements) => Ok(MoveResult::PlaceUnits {
                status: decode_status(payload, &action, true)?,
                placements: placements.clone(),
            }),
            Move::Attack(attack) => Ok(MoveResult::Attack {
                status: decode_status(payload, &action, true)?,
                outcome: decode_attack(payload, attack)?,
            }),
            Move::FreeTransfer { units } => Ok(MoveResult::FreeTransfer {
                status: decode_status(payload, &action, true)?,
                units: *units,
            }),
            Move::EndTurn => Ok(MoveResult::EndTurn {
                status: decode_status(payload, &action, false)?,
            }),
        }
    }

    pub fn status(&self) -> &ResultStatus {
        match self {
            MoveResult::PlaceUnits { status, .. }
            | MoveResult::Attack { status, .. }
            | MoveResult::FreeTransfer { status, .. }
            | MoveResult::EndTurn { status } => status,
        }
    }

    pub fn possible_actions(&self) -> &PossibleActions {
        &self.status().possible_actions
    }

    /// Whether this result captured a territory
    pub fn captured(&self) -> bool {
        matches!(self, MoveResult::Attack { outcome, .. } if outcome.captured)
    }

    /// Mirror this result onto the board.
    ///
    /// `last_move` is the move executed before the one this result answers;
    /// a free transfer is resolved against it. Without a preceding attack
    /// the board is left untouched and [`GameError::StateGap`] is returned.
    pub fn apply(&self, board: &mut Board, last_move: Option<&Move>) -> Result<TurnEvent, GameError> {
        match self {
            MoveResult::PlaceUnits { placements, .. } => {
                for (&territory, &count) in placements {
                    board.add_armies(territory, count)?;
                    if let Some(owner) = board.territory(territory).and_then(|t| t.owner) {
                        board.spend_reserve(owner, count);
                    }
                }
                Ok(TurnEvent::UnitsPlaced {
                    placements: placements.clone(),
                })
            }

            MoveResult::Attack { status, outcome } => {
                board.remove_armies(outcome.from, outcome.attacker_losses)?;
                board.remove_armies(outcome.to, outcome.defender_losses)?;

                let mut eliminated = None;
                if !outcome.captured {
                    // A hidden count can undershoot; the defender still holds
                    let defender = board
                        .territory(outcome.to)
                        .ok_or(GameError::UnknownTerritory(outcome.to))?;
                    if defender.owner.is_some() && defender.armies == 0 {
                        board.set_armies(outcome.to, 1)?;
                    }
                } else {
                    let attacker = board
                        .territory(outcome.from)
                        .ok_or(GameError::UnknownTerritory(outcome.from))?;
                    let (new_owner, remaining) = (attacker.owner, attacker.armies);
                    let defender = board.transfer_territory(outcome.to, new_owner)?;

                    if status.possible_actions.contains(&ActionKind::FreeTransfer) {
                        // The attacker always keeps one
                        let moved = CAPTURE_GARRISON.min(remaining.saturating_sub(1));
                        board.set_armies(outcome.from, remaining - moved)?;
                        board.set_armies(outcome.to, moved)?;
                    } else {
                        board.set_armies(outcome.to, remaining.saturating_sub(1))?;
                        board.set_armies(outcome.from, 1)?;
                    }

                    if outcome.defender_eliminated {
                        if let Some(player) = defender {
                            board.set_player_active(player, false);
                            eliminated = Some(player);
                        }
                    }
                }

                Ok(TurnEvent::AttackResolved {
                    from: outcome.from,
                    to: outcome.to,
                    attacker_losses: outcome.attacker_losses,
                    defender_losses: outcome.defender_losses,
                    captured: outcome.captured,
                    eliminated,
                })
            }

            MoveResult::FreeTransfer { units, .. } => {
                let Some(Move::Attack(attack)) = last_move else {
                    return Err(GameError::StateGap(format!(
                        "free transfer of {units} with no preceding attack"
                    )));
                };
                board.remove_armies(attack.from, *units)?;
                board.add_armies(attack.to, *units)?;
                Ok(TurnEvent::UnitsTransferred {
                    from: attack.from,
                    to: attack.to,
                    units: *units,
                })
            }

            MoveResult::EndTurn { .. } => Ok(TurnEvent::TurnEnded),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::board::tests::sample_board;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    /// A `doMove` response carrying the given legal actions and extra fields
    /// under `_content.return._content`.
    pub(crate) fn response(actions: &[&str], extra: Value) -> Value {
        let actions: Vec<Value> = actions.iter().map(|id| json!({ "id": id })).collect();
        let mut content = json!({
            "possibleactions": { "_content": { "action": actions } }
        });
        if let (Some(content), Some(extra)) = (content.as_object_mut(), extra.as_object()) {
            content.extend(extra.clone());
        }
        json!({
            "_content": {
                "return": {
                    "code": "200",
                    "msg": "OK",
                    "_content": content
                }
            }
        })
    }

    pub(crate) fn attack_response(
        actions: &[&str],
        attacker_losses: u32,
        defender_losses: u32,
        captured: bool,
        eliminated: bool,
    ) -> Value {
        response(
            actions,
            json!({
                "results": {
                    "totalattackerlosses": attacker_losses.to_string(),
                    "totaldefenderlosses": defender_losses.to_string(),
                    "captured": if captured { "1" } else { "0" },
                    "eliminate": if eliminated { "1" } else { "0" },
                    "attackdice": "6,4,1"
                }
            }),
        )
    }

    fn attack(from: TerritoryId, to: TerritoryId, units: u32) -> Move {
        Move::Attack(AttackMove {
            from,
            to,
            units,
            continuous: true,
        })
    }

    fn armies(board: &Board, id: TerritoryId) -> u32 {
        board.territory(id).unwrap().armies
    }

    #[test]
    fn test_decode_place_units() {
        let request = Move::PlaceUnits(BTreeMap::from([(1, 3), (3, 2)]));
        let result =
            MoveResult::decode(&response(&["attack", "transfer", "endturn"], json!({})), &request)
                .unwrap();

        assert_eq!(result.status().code, "200");
        assert_eq!(
            result.possible_actions(),
            &PossibleActions::from_ids(["attack", "transfer", "endturn"])
        );
        assert!(!result.captured());
    }

    #[test]
    fn test_decode_attack() {
        let result = MoveResult::decode(
            &attack_response(&["freetransfer"], 1, 2, true, false),
            &attack(1, 2, 5),
        )
        .unwrap();

        let MoveResult::Attack { outcome, .. } = result else {
            panic!("expected an attack result");
        };
        assert_eq!(
            outcome,
            AttackOutcome {
                from: 1,
                to: 2,
                attacker_losses: 1,
                defender_losses: 2,
                captured: true,
                defender_eliminated: false,
            }
        );
    }

    #[test]
    fn test_decode_attack_without_optional_flags() {
        let payload = response(
            &["attack"],
            json!({"results": {"totalattackerlosses": 2, "totaldefenderlosses": 0}}),
        );
        let result = MoveResult::decode(&payload, &attack(1, 2, 5)).unwrap();
        assert!(!result.captured());
    }

    #[test]
    fn test_decode_rejects_missing_and_malformed_fields() {
        let missing_losses = response(&["attack"], json!({"results": {"totalattackerlosses": 1}}));
        assert!(matches!(
            MoveResult::decode(&missing_losses, &attack(1, 2, 5)),
            Err(GameError::Protocol(msg)) if msg.contains("totaldefenderlosses")
        ));

        let malformed = response(
            &["attack"],
            json!({"results": {"totalattackerlosses": "two", "totaldefenderlosses": 1}}),
        );
        assert!(matches!(
            MoveResult::decode(&malformed, &attack(1, 2, 5)),
            Err(GameError::Protocol(_))
        ));

        assert!(matches!(
            MoveResult::decode(&json!({"_content": {}}), &Move::EndTurn),
            Err(GameError::Protocol(_))
        ));
    }

    #[test]
    fn test_decode_end_turn_without_actions() {
        let payload = json!({"_content": {"return": {"code": 200, "msg": "Turn over"}}});
        let result = MoveResult::decode(&payload, &Move::EndTurn).unwrap();

        assert!(result.possible_actions().is_empty());
        assert_eq!(result.status().message, "Turn over");

        // Every other kind needs the legal-action set
        assert!(MoveResult::decode(&payload, &Move::FreeTransfer { units: 1 }).is_err());
    }

    #[test]
    fn test_apply_place_units() {
        let mut board = sample_board();
        let before: BTreeMap<TerritoryId, u32> =
            board.territories().map(|t| (t.id, t.armies)).collect();
        let placements = BTreeMap::from([(1, 3), (3, 2)]);
        let request = Move::PlaceUnits(placements.clone());
        let result = MoveResult::decode(&response(&["attack"], json!({})), &request).unwrap();

        result.apply(&mut board, None).unwrap();

        assert_eq!(armies(&board, 1), 9);
        assert_eq!(armies(&board, 3), 5);
        // Untouched territories stay put, placed ones grow by exactly the placement
        for (id, count) in &before {
            let placed = placements.get(id).copied().unwrap_or(0);
            assert_eq!(armies(&board, *id), count + placed, "territory {id}");
        }
        let increase: u32 = board.territories().map(|t| t.armies - before[&t.id]).sum();
        assert_eq!(increase, request.placed_units());
        assert_eq!(board.player(1).unwrap().reserve_units, 0);
        board.check_invariants().unwrap();
    }

    #[test]
    fn test_apply_capture_with_free_transfer() {
        let mut board = sample_board();
        let result = MoveResult::decode(
            &attack_response(&["freetransfer"], 1, 2, true, false),
            &attack(1, 2, 5),
        )
        .unwrap();

        result.apply(&mut board, None).unwrap();

        // 6 - 1 lost = 5, split 2 / 3
        assert_eq!(armies(&board, 1), 2);
        assert_eq!(armies(&board, 2), 3);
        assert_eq!(board.territory(2).unwrap().owner, Some(1));
        assert!(board.player(1).unwrap().owns(2));
        assert!(!board.player(2).unwrap().owns(2));
        board.check_invariants().unwrap();
    }

    #[test]
    fn test_small_capture_keeps_attacker_garrison() {
        let mut board = sample_board();
        board.set_armies(1, 4).unwrap();
        let result = MoveResult::decode(
            &attack_response(&["freetransfer"], 1, 2, true, false),
            &attack(1, 2, 3),
        )
        .unwrap();

        result.apply(&mut board, None).unwrap();

        assert_eq!(armies(&board, 1), 1);
        assert_eq!(armies(&board, 2), 2);
        board.check_invariants().unwrap();
    }

    #[test]
    fn test_failed_attack_on_undercounted_defender_keeps_garrison() {
        let mut board = sample_board();
        // Alberta read as 1 from a hidden count; the server says 2 fell
        board.set_armies(2, 1).unwrap();
        let result = MoveResult::decode(
            &attack_response(&["attack", "endturn"], 1, 2, false, false),
            &attack(1, 2, 5),
        )
        .unwrap();

        result.apply(&mut board, None).unwrap();

        assert_eq!(armies(&board, 1), 5);
        assert_eq!(armies(&board, 2), 1);
        assert_eq!(board.territory(2).unwrap().owner, Some(2));
        board.check_invariants().unwrap();
    }

    #[test]
    fn test_apply_capture_without_free_transfer() {
        let mut board = sample_board();
        let result = MoveResult::decode(
            &attack_response(&["attack", "endturn"], 0, 2, true, false),
            &attack(1, 2, 5),
        )
        .unwrap();

        result.apply(&mut board, None).unwrap();

        assert_eq!(armies(&board, 1), 1);
        assert_eq!(armies(&board, 2), 5);
        assert_eq!(board.territory(2).unwrap().owner, Some(1));
        board.check_invariants().unwrap();
    }

    #[test]
    fn test_apply_failed_attack_only_counts_losses() {
        let mut board = sample_board();
        let result = MoveResult::decode(
            &attack_response(&["attack", "endturn"], 4, 1, false, false),
            &attack(1, 2, 5),
        )
        .unwrap();

        let event = result.apply(&mut board, None).unwrap();

        assert_eq!(armies(&board, 1), 2);
        assert_eq!(armies(&board, 2), 1);
        assert_eq!(board.territory(2).unwrap().owner, Some(2));
        assert!(matches!(event, TurnEvent::AttackResolved { captured: false, .. }));
    }

    #[test]
    fn test_apply_elimination_marks_defender_inactive() {
        let mut board = sample_board();
        // Bob already lost Greenland
        board.transfer_territory(5, Some(1)).unwrap();

        let result = MoveResult::decode(
            &attack_response(&["attack", "endturn"], 0, 2, true, true),
            &attack(1, 2, 5),
        )
        .unwrap();
        let event = result.apply(&mut board, None).unwrap();

        assert!(!board.player(2).unwrap().active);
        assert_eq!(board.player(2).unwrap().territory_count(), 0);
        assert!(matches!(
            event,
            TurnEvent::AttackResolved {
                eliminated: Some(2),
                ..
            }
        ));
    }

    #[test]
    fn test_capture_of_neutral_territory() {
        let mut board = sample_board();
        board.add_armies(2, 4).unwrap();
        // Alberta (Bob, 6) attacks neutral Ontario (2)
        let result = MoveResult::decode(
            &attack_response(&["attack"], 1, 2, true, true),
            &attack(2, 4, 5),
        )
        .unwrap();

        let event = result.apply(&mut board, None).unwrap();

        assert_eq!(board.territory(4).unwrap().owner, Some(2));
        // Nobody to eliminate
        assert!(matches!(event, TurnEvent::AttackResolved { eliminated: None, .. }));
        board.check_invariants().unwrap();
    }

    #[test]
    fn test_apply_free_transfer_after_attack() {
        let mut board = sample_board();
        let previous = attack(1, 2, 5);
        MoveResult::decode(&attack_response(&["freetransfer"], 1, 2, true, false), &previous)
            .unwrap()
            .apply(&mut board, None)
            .unwrap();

        let request = Move::FreeTransfer { units: 1 };
        let result = MoveResult::decode(&response(&["attack", "endturn"], json!({})), &request)
            .unwrap();
        result.apply(&mut board, Some(&previous)).unwrap();

        assert_eq!(armies(&board, 1), 1);
        assert_eq!(armies(&board, 2), 4);
        board.check_invariants().unwrap();
    }

    #[test]
    fn test_free_transfer_without_attack_is_a_state_gap() {
        let mut board = sample_board();
        let snapshot = board.clone();
        let request = Move::FreeTransfer { units: 2 };
        let result = MoveResult::decode(&response(&["attack"], json!({})), &request).unwrap();

        let err = result.apply(&mut board, None).unwrap_err();
        assert!(err.is_recoverable());

        let after_placement = Move::PlaceUnits(BTreeMap::from([(1, 1)]));
        assert!(matches!(
            result.apply(&mut board, Some(&after_placement)),
            Err(GameError::StateGap(_))
        ));

        let unchanged: Vec<_> = board.territories().cloned().collect();
        let original: Vec<_> = snapshot.territories().cloned().collect();
        assert_eq!(unchanged, original);
    }

    #[test]
    fn test_end_turn_changes_nothing() {
        let mut board = sample_board();
        let result = MoveResult::decode(&response(&[], json!({})), &Move::EndTurn).unwrap();

        assert_eq!(result.apply(&mut board, None).unwrap(), TurnEvent::TurnEnded);
        assert_eq!(board.total_armies(1), 9);
    }
}
