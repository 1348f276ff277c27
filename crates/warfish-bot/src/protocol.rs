//! Warfish REST request layout.
//!
//! Every call is a GET on the endpoint with `_method`, `gid` and
//! `_format=json`, plus method specific parameters.

use crate::config::MethodNames;
use warfish_core::Move;

/// Sections requested from `getDetails`
pub const DETAILS_SECTIONS: [&str; 4] = ["board", "rules", "map", "continents"];

/// Sections requested from `getState`
pub const STATE_SECTIONS: [&str; 3] = ["players", "board", "possibleactions"];

/// Calls the bot makes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestCall<'a> {
    /// Static table description: map, borders, continents, rules
    Details,
    /// Current ownership, players and legal actions
    State,
    /// Submit a move
    DoMove(&'a Move),
}

impl RestCall<'_> {
    pub fn method<'m>(&self, methods: &'m MethodNames) -> &'m str {
        match self {
            RestCall::Details => &methods.details,
            RestCall::State => &methods.state,
            RestCall::DoMove(_) => &methods.do_move,
        }
    }

    /// Full query string parameters for this call on table `game_id`
    pub fn query(&self, methods: &MethodNames, game_id: &str) -> Vec<(String, String)> {
        let mut query = vec![
            ("_method".to_string(), self.method(methods).to_string()),
            ("gid".to_string(), game_id.to_string()),
        ];
        match self {
            RestCall::Details => query.push(("sections".into(), DETAILS_SECTIONS.join(","))),
            RestCall::State => query.push(("sections".into(), STATE_SECTIONS.join(","))),
            RestCall::DoMove(request) => query.extend(
                request
                    .query_params()
                    .into_iter()
                    .map(|(key, value)| (key.to_string(), value)),
            ),
        }
        query.push(("_format".into(), "json".into()));
        query
    }
}
