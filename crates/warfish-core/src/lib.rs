//! Warfish - a turn engine for automated Risk-style players
//!
//! This crate provides the core logic for playing turns on a Warfish table:
//! - Board graph with territories, continents and ownership
//! - Moves, server results, and how results change the board
//! - A turn loop driven by the server's legal-action set
//! - Pluggable strategies, with two bundled bots
//!
//! # Architecture
//!
//! The engine does no I/O. Moves reach the server through a
//! [`MoveExecutor`], and the initial state comes from a [`GameSource`]. The
//! HTTP client lives in the `warfish-bot` binary.
//!
//! # Modules
//!
//! - [`payload`]: Readers for the loosely typed Warfish JSON
//! - [`board`]: Territories, continents and the board graph
//! - [`player`]: Player roster entries
//! - [`rules`]: Table rules
//! - [`actions`]: Action kinds, moves and turn events
//! - [`results`]: Move results and their effect on the board
//! - [`game`]: Game state and move execution
//! - [`remote`]: Server seams
//! - [`bot`]: Strategies
//! - [`turn`]: The turn loop

pub mod actions;
pub mod board;
pub mod bot;
pub mod game;
pub mod payload;
pub mod player;
pub mod remote;
pub mod results;
pub mod rules;
pub mod turn;

// Re-export commonly used types
pub use actions::{ActionKind, AttackMove, Move, PossibleActions, SkipReason, TurnEvent};
pub use board::{Board, Continent, ContinentId, PlayerId, Territory, TerritoryId};
pub use bot::{continent_utilities, AttackChoice, Bot, BotStrategy, Strategy};
pub use game::{ExecutedMove, GameError, GameState, TurnContext};
pub use player::Player;
pub use remote::{GameSource, MoveExecutor, ScriptedExecutor};
pub use results::{AttackOutcome, MoveResult, ResultStatus};
pub use rules::{FogLevel, Rules};
pub use turn::{play_turn, TurnPhase, TurnRunner, TurnSummary};
