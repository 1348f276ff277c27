//! Table rules.
//!
//! Warfish tables are highly customizable, but only the standard rule set is
//! modeled by the turn engine. The well-understood settings get typed
//! accessors; every field, understood or not, is also kept verbatim so nothing
//! the server sent is lost (`keeppossession`, `numpercountry` and a few others
//! have no known meaning and are never interpreted).

use crate::payload;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// How much of the board is hidden from each player
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FogLevel {
    None,
    Light,
    Moderate,
    Foggy,
    Very,
    Extreme,
}

impl FogLevel {
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(FogLevel::None),
            1 => Some(FogLevel::Light),
            2 => Some(FogLevel::Moderate),
            3 => Some(FogLevel::Foggy),
            4 => Some(FogLevel::Very),
            5 => Some(FogLevel::Extreme),
            _ => None,
        }
    }
}

/// Rules for a particular table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Rules {
    raw: Map<String, Value>,
}

impl Rules {
    /// Wrap the `rules` section of `getDetails`. Anything that is not an
    /// object yields empty rules.
    pub fn from_payload(value: &Value) -> Self {
        Self {
            raw: value.as_object().cloned().unwrap_or_default(),
        }
    }

    /// Raw value of any rule field
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.raw.get(key)
    }

    /// All rule fields as sent by the server
    pub fn raw(&self) -> &Map<String, Value> {
        &self.raw
    }

    fn number(&self, key: &str) -> Option<i64> {
        self.raw.get(key).and_then(|v| payload::as_i64(v, key).ok())
    }

    fn flag(&self, key: &str) -> bool {
        self.raw.get(key).map(payload::as_flag).unwrap_or(false)
    }

    fn list(&self, key: &str) -> Vec<u32> {
        self.raw
            .get(key)
            .and_then(|v| payload::id_list(v, key).ok())
            .unwrap_or_default()
    }

    pub fn num_attacks(&self) -> Option<i64> {
        self.number("numattacks")
    }

    pub fn num_transfers(&self) -> Option<i64> {
        self.number("numtransfers")
    }

    pub fn pre_transfers(&self) -> Option<i64> {
        self.number("pretransfer")
    }

    /// Dice rolled by the attacker and the defender
    pub fn damage_dice(&self) -> (Option<i64>, Option<i64>) {
        (self.number("afdie"), self.number("dfdie"))
    }

    /// Sides on the attacker's and the defender's dice
    pub fn die_sides(&self) -> (Option<i64>, Option<i64>) {
        (self.number("adie"), self.number("ddie"))
    }

    pub fn num_reserves(&self) -> Option<i64> {
        self.number("numreserves")
    }

    pub fn max_units_per_territory(&self) -> Option<i64> {
        self.number("maxpercountry")
    }

    pub fn boot_time(&self) -> Option<i64> {
        self.number("boottime")
    }

    pub fn fog(&self) -> FogLevel {
        self.number("fog")
            .and_then(FogLevel::from_code)
            .unwrap_or(FogLevel::None)
    }

    pub fn allows_abandon(&self) -> bool {
        self.flag("allowabandon")
    }

    pub fn allows_return_to_attack(&self) -> bool {
        self.flag("returntoattack")
    }

    pub fn allows_return_to_placement(&self) -> bool {
        self.flag("returntoplace")
    }

    /// Continuous attacks are assumed available unless the table says otherwise
    pub fn allows_continuous_attack(&self) -> bool {
        self.raw
            .get("continuousattack")
            .map(payload::as_flag)
            .unwrap_or(true)
    }

    pub fn is_blind_at_once(&self) -> bool {
        self.flag("baoplay")
    }

    pub fn is_team_game(&self) -> bool {
        self.flag("teamgame")
    }

    pub fn allows_team_transfer(&self) -> bool {
        self.flag("teamtransfer")
    }

    pub fn allows_team_placement(&self) -> bool {
        self.flag("teamplaceunits")
    }

    pub fn has_cards(&self) -> bool {
        self.flag("hascards")
    }

    pub fn card_scale(&self) -> Vec<u32> {
        self.list("cardscale")
    }

    pub fn next_cards_worth(&self) -> Vec<u32> {
        self.list("nextcardsworth")
    }

    pub fn card_sets_traded(&self) -> Option<i64> {
        self.number("cardsetstraded")
    }

    /// Settings this table uses that the turn engine does not model.
    /// Empty for a standard game.
    pub fn unsupported_settings(&self) -> Vec<&'static str> {
        let mut settings = Vec::new();
        if self.fog() != FogLevel::None {
            settings.push("fog of war");
        }
        if self.is_blind_at_once() {
            settings.push("blind-at-once play");
        }
        if self.is_team_game() {
            settings.push("team game");
        }
        if !self.allows_continuous_attack() {
            settings.push("no continuous attacks");
        }
        settings
    }
}
