//! The turn loop.
//!
//! Each step looks at the legal-action set and does the highest-priority
//! thing it can: place units, attack, skip transfers, end the turn. Every
//! step either replaces the set with the server's answer or removes one
//! action locally, so a turn always finishes.

use crate::actions::{ActionKind, AttackMove, Move, SkipReason, TurnEvent};
use crate::board::PlayerId;
use crate::bot::Strategy;
use crate::game::{ExecutedMove, GameError, GameState};
use crate::remote::MoveExecutor;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Where the turn loop stands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TurnPhase {
    AwaitingAction,
    TurnComplete,
}

/// Everything that happened during a turn
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnSummary {
    pub events: Vec<TurnEvent>,
    /// Moves sent to the server
    pub submissions: usize,
}

/// Plays one turn for one player
pub struct TurnRunner<'a, E: ?Sized, S: ?Sized> {
    game: &'a mut GameState,
    executor: &'a mut E,
    strategy: &'a mut S,
    player: PlayerId,
    phase: TurnPhase,
    summary: TurnSummary,
}

impl<'a, E, S> TurnRunner<'a, E, S>
where
    E: MoveExecutor + ?Sized,
    S: Strategy + ?Sized,
{
    pub fn new(game: &'a mut GameState, executor: &'a mut E, strategy: &'a mut S, player: PlayerId) -> Self {
        Self {
            game,
            executor,
            strategy,
            player,
            phase: TurnPhase::AwaitingAction,
            summary: TurnSummary::default(),
        }
    }

    pub fn phase(&self) -> TurnPhase {
        self.phase
    }

    pub fn summary(&self) -> &TurnSummary {
        &self.summary
    }

    pub fn game(&self) -> &GameState {
        &*self.game
    }

    /// Play until the turn is over.
    ///
    /// Stops at the first error other than a state gap; the summary of what
    /// happened so far is lost in that case but the board stays consistent.
    pub fn run(mut self) -> Result<TurnSummary, GameError> {
        self.strategy.begin_turn(self.game.board(), self.player);
        while self.phase == TurnPhase::AwaitingAction {
            self.step()?;
        }
        info!(
            submissions = self.summary.submissions,
            events = self.summary.events.len(),
            "Turn complete"
        );
        Ok(self.summary)
    }

    /// Take the single highest-priority action available.
    pub fn step(&mut self) -> Result<TurnPhase, GameError> {
        if self.phase == TurnPhase::TurnComplete {
            return Ok(self.phase);
        }

        let actions = self.game.possible_actions();
        if actions.contains(&ActionKind::PlaceUnits) {
            self.record(TurnEvent::ActionChosen {
                action: ActionKind::PlaceUnits,
            });
            let placements = self
                .strategy
                .select_placement(self.game.board(), self.player);
            if placements.is_empty() {
                self.skip(ActionKind::PlaceUnits, SkipReason::NothingToPlace);
            } else {
                self.submit(Move::PlaceUnits(placements))?;
            }
        } else if actions.contains(&ActionKind::Attack) {
            self.attack()?;
        } else if actions.contains(&ActionKind::Transfer) {
            self.skip(ActionKind::Transfer, SkipReason::NotPlayed);
        } else if actions.contains(&ActionKind::EndTurn) {
            self.record(TurnEvent::ActionChosen {
                action: ActionKind::EndTurn,
            });
            self.submit(Move::EndTurn)?;
            self.finish();
        } else {
            let remaining = actions.clone();
            if !remaining.is_empty() {
                warn!("No playable action in {}", remaining);
            }
            self.record(TurnEvent::NoActionAvailable { remaining });
            self.finish();
        }

        Ok(self.phase)
    }

    fn attack(&mut self) -> Result<(), GameError> {
        let Some(choice) = self.strategy.select_attack(self.game.board(), self.player) else {
            self.skip(ActionKind::Attack, SkipReason::NoTarget);
            return Ok(());
        };

        self.record(TurnEvent::ActionChosen {
            action: ActionKind::Attack,
        });
        let executed = self.submit(Move::Attack(AttackMove {
            from: choice.from,
            to: choice.to,
            units: choice.units,
            continuous: true,
        }))?;

        if executed.result.captured()
            && self
                .game
                .possible_actions()
                .contains(&ActionKind::FreeTransfer)
        {
            // The server waits for the transfer even when nothing can move
            let available = self
                .game
                .board()
                .territory(choice.from)
                .map(|t| t.armies)
                .unwrap_or(0);
            self.record(TurnEvent::ActionChosen {
                action: ActionKind::FreeTransfer,
            });
            self.submit(Move::FreeTransfer {
                units: available.saturating_sub(1),
            })?;
        }
        Ok(())
    }

    fn submit(&mut self, request: Move) -> Result<ExecutedMove, GameError> {
        self.record(TurnEvent::MoveSubmitted {
            request: request.clone(),
        });
        let executed = self.game.execute_move(&mut *self.executor, request)?;
        self.summary.submissions += 1;
        self.record(executed.event.clone());
        Ok(executed)
    }

    fn skip(&mut self, action: ActionKind, reason: SkipReason) {
        self.game.dismiss_action(&action);
        self.record(TurnEvent::ActionSkipped { action, reason });
    }

    fn finish(&mut self) {
        self.phase = TurnPhase::TurnComplete;
    }

    fn record(&mut self, event: TurnEvent) {
        match &event {
            TurnEvent::StateGap { .. } => warn!("{}", event),
            _ => info!("{}", event),
        }
        self.summary.events.push(event);
    }
}

/// Play one full turn for `player`
pub fn play_turn<E, S>(
    game: &mut GameState,
    executor: &mut E,
    strategy: &mut S,
    player: PlayerId,
) -> Result<TurnSummary, GameError>
where
    E: MoveExecutor + ?Sized,
    S: Strategy + ?Sized,
{
    TurnRunner::new(game, executor, strategy, player).run()
}
