//! Configuration module for Bastion bot.
//!
//! Loads process configuration from environment variables. Moderation policy
//! lives in the settings file (see `settings`).

use std::env;
use std::path::PathBuf;

use anyhow::Context;

const DEFAULT_PREFIX: &str = "!!!";
const DEFAULT_SETTINGS_PATH: &str = "settings.toml";
const DEFAULT_REACTION_ROLES_PATH: &str = "data/reaction_roles.json";

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    // Discord
    pub bot_token: String,

    /// Owner user IDs (comma-separated)
    /// These users pass every command permission check.
    pub owner_ids: Vec<u64>,

    /// Prefix for operator commands.
    pub command_prefix: String,

    pub settings_path: PathBuf,
    pub reaction_roles_path: PathBuf,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        let bot_token = env::var("BOT_TOKEN").context("BOT_TOKEN must be set")?;

        Ok(Self::from_lookup(bot_token, |key| env::var(key).ok()))
    }

    fn from_lookup(bot_token: String, lookup: impl Fn(&str) -> Option<String>) -> Self {
        // Parse owner IDs
        let owner_ids = lookup("OWNER_IDS")
            .unwrap_or_default()
            .split(',')
            .filter_map(|s| s.trim().parse::<u64>().ok())
            .collect();

        let non_empty = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        Self {
            bot_token,
            owner_ids,
            command_prefix: non_empty("COMMAND_PREFIX").unwrap_or_else(|| DEFAULT_PREFIX.to_string()),
            settings_path: non_empty("SETTINGS_PATH")
                .unwrap_or_else(|| DEFAULT_SETTINGS_PATH.to_string())
                .into(),
            reaction_roles_path: non_empty("REACTION_ROLES_PATH")
                .unwrap_or_else(|| DEFAULT_REACTION_ROLES_PATH.to_string())
                .into(),
        }
    }
}
