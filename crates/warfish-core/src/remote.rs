//! Seams to the game server.
//!
//! The engine never talks to the network itself. A [`MoveExecutor`] turns a
//! [`Move`] into the server's raw response, and a [`GameSource`] produces the
//! initial [`GameState`]. The HTTP client lives in the bot binary; the
//! [`ScriptedExecutor`] here replays canned responses.

use crate::actions::Move;
use crate::game::{GameError, GameState};
use serde_json::Value;
use std::collections::VecDeque;

/// Submits moves to the server, one blocking round-trip each
pub trait MoveExecutor {
    /// Send `request` and return the raw response payload.
    ///
    /// Any failure to obtain a payload is a [`GameError::Transport`].
    fn submit(&mut self, request: &Move) -> Result<Value, GameError>;
}

/// Loads the current state of a game
pub trait GameSource {
    fn load_game(&mut self, game_id: &str) -> Result<GameState, GameError>;
}

impl<E: MoveExecutor + ?Sized> MoveExecutor for &mut E {
    fn submit(&mut self, request: &Move) -> Result<Value, GameError> {
        (**self).submit(request)
    }
}

/// Answers moves from a fixed queue of responses and records what was asked
#[derive(Debug, Clone, Default)]
pub struct ScriptedExecutor {
    responses: VecDeque<Value>,
    submitted: Vec<Move>,
}

impl ScriptedExecutor {
    pub fn new(responses: impl IntoIterator<Item = Value>) -> Self {
        Self {
            responses: responses.into_iter().collect(),
            submitted: Vec::new(),
        }
    }

    /// Queue another response
    pub fn push(&mut self, response: Value) {
        self.responses.push_back(response);
    }

    /// Every move submitted so far, in order
    pub fn submitted(&self) -> &[Move] {
        &self.submitted
    }

    pub fn remaining(&self) -> usize {
        self.responses.len()
    }
}

impl MoveExecutor for ScriptedExecutor {
    fn submit(&mut self, request: &Move) -> Result<Value, GameError> {
        let response = self
            .responses
            .pop_front()
            .ok_or_else(|| GameError::Transport(format!("no scripted response for {request}")))?;
        self.submitted.push(request.clone());
        Ok(response)
    }
}
