//! Settings store for the moderation policy.
//!
//! Policy lives in a TOML file next to the bot. It is parsed eagerly into
//! validated structs; out-of-range values are coerced once here and never at
//! the use site. Operator commands edit a few list keys and write the file
//! back, preserving everything else in the document.

mod anti_nuke;
mod value;

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use serenity::all::{ChannelId, GuildId, UserId};
use toml::{Table, Value};
use tracing::{info, warn};

pub use anti_nuke::{AntiNukeSettings, Punishment, Threshold};

use crate::error::ConfigError;
use value::{entry_text, to_bool, to_id_set, to_int, to_string, to_string_list};

const DEFAULT_MODEL: &str = "gpt-4-turbo-preview";

/// Spam blocker policy.
#[derive(Debug, Clone, PartialEq)]
pub struct SpamSettings {
    /// Empty means every channel is monitored.
    pub monitored_channel_ids: HashSet<ChannelId>,
    pub allowed_bot_ids: HashSet<UserId>,
    pub block_all_unauthorized_bots: bool,
    pub block_embeds: bool,
    pub send_warning: bool,
    pub spam_keywords: Vec<String>,
}

impl Default for SpamSettings {
    fn default() -> Self {
        Self {
            monitored_channel_ids: HashSet::new(),
            allowed_bot_ids: HashSet::new(),
            block_all_unauthorized_bots: true,
            block_embeds: false,
            send_warning: false,
            spam_keywords: Vec::new(),
        }
    }
}

/// Welcome message generation settings.
#[derive(Debug, Clone, PartialEq)]
pub struct WelcomeSettings {
    pub enabled: bool,
    pub api_key: Option<String>,
    /// OpenAI-compatible base URL; the official endpoint when unset.
    pub base_url: Option<String>,
    pub model: String,
    pub system_prompt: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for WelcomeSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            api_key: None,
            base_url: None,
            model: DEFAULT_MODEL.to_string(),
            system_prompt: String::new(),
            max_tokens: 500,
            temperature: 0.8,
        }
    }
}

impl WelcomeSettings {
    fn from_table(section: Option<&Table>) -> Self {
        let Some(section) = section else {
            return Self::default();
        };
        let defaults = Self::default();
        let api_key = to_string(section.get("api_key"));

        Self {
            enabled: to_bool(section.get("enabled"), api_key.is_some()),
            api_key,
            base_url: to_string(section.get("base_url")),
            model: to_string(section.get("model")).unwrap_or(defaults.model),
            system_prompt: to_string(section.get("system_prompt")).unwrap_or_default(),
            max_tokens: section
                .get("max_tokens")
                .and_then(to_int)
                .filter(|n| *n > 0)
                .map(|n| n.min(u32::MAX as i64) as u32)
                .unwrap_or(defaults.max_tokens),
            temperature: match section.get("temperature") {
                Some(Value::Float(f)) => *f as f32,
                Some(Value::Integer(i)) => *i as f32,
                _ => defaults.temperature,
            },
        }
    }

    /// Generation needs both the toggle and a key.
    pub fn is_active(&self) -> bool {
        self.enabled && self.api_key.is_some()
    }
}

/// Complete, validated bot settings.
#[derive(Debug, Clone, PartialEq)]
pub struct BotSettings {
    pub locale: String,
    /// Shared guild allow-list; empty means every guild.
    pub monitored_guild_ids: HashSet<GuildId>,
    pub anti_nuke: AntiNukeSettings,
    pub spam: SpamSettings,
    pub welcome: WelcomeSettings,
}

impl Default for BotSettings {
    fn default() -> Self {
        Self {
            locale: "en".to_string(),
            monitored_guild_ids: HashSet::new(),
            anti_nuke: AntiNukeSettings::default(),
            spam: SpamSettings::default(),
            welcome: WelcomeSettings::default(),
        }
    }
}

impl BotSettings {
    pub fn from_table(table: &Table) -> Self {
        let monitored_guild_ids = to_id_set(table.get("monitored_guilds"), GuildId::new);
        let defaults = SpamSettings::default();

        Self {
            locale: to_string(table.get("locale")).unwrap_or_else(|| "en".to_string()),
            anti_nuke: AntiNukeSettings::from_table(
                table.get("anti_nuke").and_then(Value::as_table),
                monitored_guild_ids.clone(),
            ),
            spam: SpamSettings {
                monitored_channel_ids: to_id_set(table.get("monitored_channels"), ChannelId::new),
                allowed_bot_ids: to_id_set(table.get("allowed_bots"), UserId::new),
                block_all_unauthorized_bots: to_bool(
                    table.get("block_all_unauthorized_bots"),
                    defaults.block_all_unauthorized_bots,
                ),
                block_embeds: to_bool(table.get("block_embeds"), defaults.block_embeds),
                send_warning: to_bool(table.get("send_warning"), defaults.send_warning),
                spam_keywords: to_string_list(table.get("spam_keywords")),
            },
            welcome: WelcomeSettings::from_table(table.get("welcome").and_then(Value::as_table)),
            monitored_guild_ids,
        }
    }

    /// Whether the guild is in the shared allow-list.
    pub fn is_monitored(&self, guild_id: GuildId) -> bool {
        self.monitored_guild_ids.is_empty() || self.monitored_guild_ids.contains(&guild_id)
    }
}

/// Top-level list keys that operator commands may edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListKey {
    MonitoredGuilds,
    MonitoredChannels,
    AllowedBots,
    SpamKeywords,
}

impl ListKey {
    fn as_str(self) -> &'static str {
        match self {
            Self::MonitoredGuilds => "monitored_guilds",
            Self::MonitoredChannels => "monitored_channels",
            Self::AllowedBots => "allowed_bots",
            Self::SpamKeywords => "spam_keywords",
        }
    }
}

/// Edit applied to a list key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListEdit {
    Add(String),
    Remove(String),
}

/// File-backed settings holder with an atomically swappable snapshot.
pub struct SettingsStore {
    path: PathBuf,
    current: RwLock<Arc<BotSettings>>,
    /// Serializes read-modify-write cycles on the file.
    write_lock: Mutex<()>,
}

impl SettingsStore {
    /// Open the store, falling back to disabled defaults when the file is unusable.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let settings = match Self::load(&path) {
            Ok(settings) => settings,
            Err(e) => {
                warn!("{}; anti-nuke disabled until the settings file is fixed", e);
                BotSettings::default()
            }
        };

        Self {
            path,
            current: RwLock::new(Arc::new(settings)),
            write_lock: Mutex::new(()),
        }
    }

    /// Read and validate the settings file.
    pub fn load(path: &Path) -> Result<BotSettings, ConfigError> {
        let table = read_table(path)?;
        let settings = BotSettings::from_table(&table);

        info!(
            "Settings loaded: anti_nuke enabled={} punishment={} log_channel={:?}",
            settings.anti_nuke.enabled,
            settings.anti_nuke.punishment,
            settings.anti_nuke.log_channel_id,
        );

        Ok(settings)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current snapshot.
    pub fn current(&self) -> Arc<BotSettings> {
        self.current.read().clone()
    }

    /// Re-read the file and swap the snapshot.
    ///
    /// On failure the previous snapshot is kept with anti-nuke disabled.
    pub fn reload(&self) -> Result<Arc<BotSettings>, ConfigError> {
        match Self::load(&self.path) {
            Ok(settings) => {
                let settings = Arc::new(settings);
                *self.current.write() = settings.clone();
                Ok(settings)
            }
            Err(e) => {
                let mut current = self.current.write();
                let mut degraded = (**current).clone();
                degraded.anti_nuke.enabled = false;
                *current = Arc::new(degraded);
                Err(e)
            }
        }
    }

    /// Apply a list edit to the file and reload.
    ///
    /// Returns `false` when the edit was a no-op (value already present or absent).
    pub fn edit_list(&self, key: ListKey, edit: ListEdit) -> Result<bool, ConfigError> {
        let _guard = self.write_lock.lock();
        let mut table = read_table(&self.path)?;

        let entry = table
            .entry(key.as_str())
            .or_insert_with(|| Value::Array(Vec::new()));
        if !entry.is_array() {
            *entry = Value::Array(Vec::new());
        }
        let Some(items) = entry.as_array_mut() else {
            return Ok(false);
        };

        let changed = apply_edit(items, &edit);
        if !changed {
            return Ok(false);
        }

        let text = toml::to_string_pretty(&table)?;
        fs::write(&self.path, text).map_err(|source| ConfigError::Io {
            path: self.path.clone(),
            source,
        })?;
        info!("Settings list '{}' updated: {:?}", key.as_str(), edit);

        let settings = Arc::new(BotSettings::from_table(&table));
        *self.current.write() = settings;
        Ok(true)
    }
}

fn read_table(path: &Path) -> Result<Table, ConfigError> {
    let text = fs::read_to_string(path).map_err(|source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            ConfigError::Missing(path.to_path_buf())
        } else {
            ConfigError::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    })?;
    Ok(text.parse::<Table>()?)
}

fn apply_edit(items: &mut Vec<Value>, edit: &ListEdit) -> bool {
    match edit {
        ListEdit::Add(value) => {
            if items.iter().any(|v| entry_text(v).as_deref() == Some(value.as_str())) {
                return false;
            }
            items.push(Value::String(value.clone()));
            true
        }
        ListEdit::Remove(value) => {
            let before = items.len();
            items.retain(|v| entry_text(v).as_deref() != Some(value.as_str()));
            items.len() != before
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::antinuke::ActionKind;

    const SAMPLE: &str = r#"
locale = "ja"
monitored_guilds = ["10", 11]
allowed_bots = [500]
spam_keywords = ["free nitro"]
block_embeds = true

[anti_nuke]
enabled = true
punishment = "kick"

[anti_nuke.action_thresholds.channel_delete]
count = 5
window_seconds = 60

[welcome]
api_key = "sk-test"
max_tokens = "oops"
"#;

    fn write_sample() -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, SAMPLE).unwrap();
        (dir, path)
    }

    #[test]
    fn test_load_sample() {
        let (_dir, path) = write_sample();
        let settings = SettingsStore::load(&path).unwrap();

        assert_eq!(settings.locale, "ja");
        assert_eq!(settings.monitored_guild_ids.len(), 2);
        assert_eq!(settings.anti_nuke.monitored_guild_ids, settings.monitored_guild_ids);
        assert_eq!(settings.anti_nuke.punishment, Punishment::Kick);
        assert_eq!(
            settings.anti_nuke.threshold(ActionKind::ChannelDelete),
            Threshold::new(5, 60)
        );
        assert!(settings.spam.allowed_bot_ids.contains(&UserId::new(500)));
        assert!(settings.spam.block_all_unauthorized_bots);
        assert!(settings.spam.block_embeds);
        assert!(settings.welcome.is_active());
        assert_eq!(settings.welcome.max_tokens, 500);
    }

    #[test]
    fn test_missing_file_opens_disabled() {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::open(dir.path().join("absent.toml"));
        assert!(!store.current().anti_nuke.enabled);
        assert!(matches!(store.reload(), Err(ConfigError::Missing(_))));
    }

    #[test]
    fn test_reload_failure_disables_anti_nuke_only() {
        let (_dir, path) = write_sample();
        let store = SettingsStore::open(&path);
        assert!(store.current().anti_nuke.enabled);

        fs::write(&path, "this is = = not toml").unwrap();
        assert!(matches!(store.reload(), Err(ConfigError::Parse(_))));

        let current = store.current();
        assert!(!current.anti_nuke.enabled);
        assert_eq!(current.locale, "ja");
    }

    #[test]
    fn test_edit_list_writes_back() {
        let (_dir, path) = write_sample();
        let store = SettingsStore::open(&path);

        assert!(store.edit_list(ListKey::AllowedBots, ListEdit::Add("600".into())).unwrap());
        assert!(!store.edit_list(ListKey::AllowedBots, ListEdit::Add("500".into())).unwrap());
        assert!(store.current().spam.allowed_bot_ids.contains(&UserId::new(600)));

        assert!(store.edit_list(ListKey::AllowedBots, ListEdit::Remove("500".into())).unwrap());
        assert!(!store.edit_list(ListKey::AllowedBots, ListEdit::Remove("500".into())).unwrap());

        let reloaded = SettingsStore::load(&path).unwrap();
        assert_eq!(reloaded.spam.allowed_bot_ids, HashSet::from([UserId::new(600)]));
        assert_eq!(reloaded.anti_nuke.punishment, Punishment::Kick);
    }

    #[test]
    fn test_edit_creates_missing_list() {
        let (_dir, path) = write_sample();
        let store = SettingsStore::open(&path);

        assert!(store.edit_list(ListKey::MonitoredChannels, ListEdit::Add("77".into())).unwrap());
        assert!(store.current().spam.monitored_channel_ids.contains(&ChannelId::new(77)));
    }
}
