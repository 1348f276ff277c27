//! Warfish bot: plays one turn on a Warfish table.

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use warfish_core::{play_turn, GameSource};

mod args;
mod client;
mod config;
mod protocol;

use args::Cli;
use client::WarfishClient;

fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = cli.client_config();
    info!("Connecting to {}", config.endpoint);

    let mut client = WarfishClient::new(config, cli.cookie.as_str()).context("Failed to build HTTP client")?;
    let mut game = client
        .load_game(&cli.game_id)
        .with_context(|| format!("Failed to load table {}", cli.game_id))?;

    let player = game
        .player_id(&cli.player)
        .with_context(|| format!("Player {:?} is not seated at table {}", cli.player, cli.game_id))?;

    let unsupported = game.rules().unsupported_settings();
    if !unsupported.is_empty() {
        warn!("Table uses settings the bot does not model: {}", unsupported.join(", "));
    }

    let mut bot = cli.bot();
    info!(
        "Playing for {} (player {}) with the {:?} bot",
        cli.player, player, bot.strategy
    );

    let summary = play_turn(&mut game, &mut client, &mut bot, player).context("Turn aborted")?;

    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
