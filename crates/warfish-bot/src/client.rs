//! Blocking HTTP client for the Warfish REST service.

use crate::config::ClientConfig;
use crate::protocol::RestCall;
use reqwest::blocking::Client;
use reqwest::header::COOKIE;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;
use warfish_core::{GameError, GameSource, GameState, Move, MoveExecutor};

/// Errors from talking to the server
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Server answered {status}: {body}")]
    Status { status: u16, body: String },

    #[error("No table loaded; call load_game first")]
    NoTable,
}

impl From<ClientError> for GameError {
    fn from(err: ClientError) -> Self {
        GameError::Transport(err.to_string())
    }
}

/// A Warfish session authenticated by a browser cookie
pub struct WarfishClient {
    http: Client,
    config: ClientConfig,
    cookie: String,
    table: Option<String>,
}

impl WarfishClient {
    pub fn new(config: ClientConfig, cookie: impl Into<String>) -> Result<Self, ClientError> {
        let http = Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            http,
            config,
            cookie: cookie.into(),
            table: None,
        })
    }

    fn call(&self, call: RestCall<'_>, game_id: &str) -> Result<Value, ClientError> {
        let query = call.query(&self.config.methods, game_id);
        debug!(method = call.method(&self.config.methods), gid = game_id, "request");

        let resp = self
            .http
            .get(&self.config.endpoint)
            .query(&query)
            .header(COOKIE, &self.cookie)
            .send()?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text()?;
            return Err(ClientError::Status { status, body });
        }
        Ok(resp.json()?)
    }
}

impl GameSource for WarfishClient {
    fn load_game(&mut self, game_id: &str) -> Result<GameState, GameError> {
        let details = self.call(RestCall::Details, game_id)?;
        let state = self.call(RestCall::State, game_id)?;
        let game = GameState::from_server(game_id, &details, &state)?;
        self.table = Some(game_id.to_string());
        Ok(game)
    }
}

impl MoveExecutor for WarfishClient {
    fn submit(&mut self, request: &Move) -> Result<Value, GameError> {
        let table = self.table.as_deref().ok_or(ClientError::NoTable)?;
        Ok(self.call(RestCall::DoMove(request), table)?)
    }
}
