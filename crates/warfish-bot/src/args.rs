use crate::config::{ClientConfig, DEFAULT_ENDPOINT};
use clap::Parser;
use warfish_core::{Bot, BotStrategy};

#[derive(Parser, Debug, PartialEq)]
#[command(version, about = "Plays one Warfish turn with a bundled bot", long_about = None)]
pub struct Cli {
    /// Table (game) id
    #[arg(long, env = "WARFISH_GAME_ID")]
    pub game_id: String,

    /// Name of the player to move for, as shown on the table
    #[arg(long, env = "WARFISH_PLAYER")]
    pub player: String,

    /// Session cookie authenticating as that player
    #[arg(long, env = "WARFISH_COOKIE", hide_env_values = true)]
    pub cookie: String,

    /// REST endpoint
    #[arg(long, env = "WARFISH_ENDPOINT", default_value = DEFAULT_ENDPOINT)]
    pub endpoint: String,

    /// Which bot plays the turn
    #[arg(long, env = "WARFISH_STRATEGY", value_enum, default_value_t = StrategyArg::Continent)]
    pub strategy: StrategyArg,

    /// Seed for the bot's RNG (random when omitted)
    #[arg(long, env = "WARFISH_SEED")]
    pub seed: Option<u64>,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum, PartialEq, Eq)]
pub enum StrategyArg {
    /// Spread units evenly and attack anything in reach
    Random,
    /// Go after the most promising continent
    Continent,
}

impl From<StrategyArg> for BotStrategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::Random => BotStrategy::Random,
            StrategyArg::Continent => BotStrategy::Continent,
        }
    }
}

impl Cli {
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig::with_endpoint(&self.endpoint)
    }

    pub fn bot(&self) -> Bot {
        match self.seed {
            Some(seed) => Bot::with_seed(self.strategy.into(), seed),
            None => Bot::new(self.strategy.into()),
        }
    }
}
