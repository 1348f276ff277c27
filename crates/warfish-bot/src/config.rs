//! Client configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Public Warfish REST endpoint
pub const DEFAULT_ENDPOINT: &str = "http://216.169.106.90/war/services/rest";

/// How to reach the Warfish server
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// REST endpoint URL, without query string
    pub endpoint: String,
    /// Server method names
    pub methods: MethodNames,
    /// Per-request timeout
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            methods: MethodNames::default(),
            timeout: Duration::from_secs(30),
        }
    }
}

impl ClientConfig {
    pub fn with_endpoint(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Self::default()
        }
    }
}

/// Names the server uses for each REST method
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodNames {
    pub details: String,
    pub state: String,
    pub do_move: String,
}

impl Default for MethodNames {
    fn default() -> Self {
        Self {
            details: "warfish.tables.getDetails".into(),
            state: "warfish.tables.getState".into(),
            do_move: "warfish.tables.doMove".into(),
        }
    }
}
