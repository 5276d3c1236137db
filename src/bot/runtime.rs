//! Bot runtime - gateway client lifecycle.

use serenity::all::{Client, GatewayIntents};
use tracing::{error, info};

use super::dispatcher::{AppState, Handler};
use crate::config::Config;

/// Connect to the gateway and process events until Ctrl+C.
pub async fn run(config: &Config, state: AppState) -> anyhow::Result<()> {
    // GUILD_MEMBERS and MESSAGE_CONTENT are privileged intents
    let intents = GatewayIntents::GUILDS
        | GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::GUILD_MEMBERS
        | GatewayIntents::GUILD_MODERATION
        | GatewayIntents::GUILD_MESSAGE_REACTIONS
        | GatewayIntents::MESSAGE_CONTENT;

    let mut client = Client::builder(&config.bot_token, intents)
        .event_handler(Handler::new(state))
        .await?;

    let shard_manager = client.shard_manager.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Shutdown signal received, closing shards...");
                shard_manager.shutdown_all().await;
            }
            Err(e) => error!("Failed to listen for shutdown signal: {}", e),
        }
    });

    info!("Starting gateway client...");
    client.start().await?;

    info!("Bot stopped");
    Ok(())
}
