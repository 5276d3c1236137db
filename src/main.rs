//! Bastion - Discord moderation bot
//!
//! Guards guilds against mass destructive actions and bot spam.
//!
//! ## Architecture
//!
//! - `config` - Environment configuration
//! - `settings` - Reloadable moderation policy (TOML file)
//! - `cache` - TTL caches with Moka
//! - `gateway` - Boundary to the Discord API (serenity)
//! - `permissions` - Admin checking with caching
//! - `bot` - Client lifecycle and event routing
//! - `events` - Event handlers (anti-nuke, spam, reaction roles, welcome)
//! - `plugins` - Operator command handlers
//! - `storage` - Reaction-role persistence
//! - `completion` - Welcome text generation
//! - `i18n` - Localized replies
//! - `utils` - Utility functions

mod bot;
mod cache;
mod completion;
mod config;
mod error;
mod events;
mod gateway;
mod i18n;
mod permissions;
mod plugins;
mod settings;
mod storage;
mod utils;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use bot::AppState;
use config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file first (before anything else)
    dotenvy::dotenv().ok();

    // If RUST_LOG is not set, default to "info" level for our crate
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("bastion=info,serenity=warn"));

    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Starting Bastion bot...");

    i18n::init();

    let config = Config::from_env()?;
    info!("Configuration loaded successfully");

    if config.owner_ids.is_empty() {
        info!("No owner IDs configured (OWNER_IDS is empty)");
    } else {
        info!("Bot owners: {:?}", config.owner_ids);
    }

    let state = AppState::from_config(&config);
    let locale = state.locale();
    if !i18n::is_supported(&locale) {
        warn!("No translations for locale '{}', replies fall back to English", locale);
    }
    info!(
        "Settings from {}, reaction roles from {}",
        config.settings_path.display(),
        config.reaction_roles_path.display()
    );

    bot::run(&config, state).await
}
