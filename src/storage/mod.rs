//! Reaction-role persistence.
//!
//! The table lives in a JSON file shaped as
//! `{"<guild>-<message>": {"<emoji>": <role id>}}`. A missing or unreadable
//! file loads as an empty table; every mutation rewrites the whole file.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use serde_json::Value;
use serenity::all::{GuildId, MessageId, RoleId};
use tracing::{debug, info, warn};

use crate::error::StorageError;

/// emoji → role id
pub type EmojiRoles = BTreeMap<String, u64>;

/// One reaction-role message in a guild listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageBindings {
    pub message_id: MessageId,
    pub roles: Vec<(String, RoleId)>,
}

fn key(guild_id: GuildId, message_id: MessageId) -> String {
    format!("{}-{}", guild_id, message_id)
}

/// File-backed reaction-role table.
pub struct ReactionRoleStore {
    path: PathBuf,
    mappings: RwLock<BTreeMap<String, EmojiRoles>>,
}

impl ReactionRoleStore {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let mappings = load(&path);
        info!(
            "Loaded {} reaction-role message(s) from {}",
            mappings.len(),
            path.display()
        );
        Self {
            path,
            mappings: RwLock::new(mappings),
        }
    }

    /// Role bound to an emoji on a message.
    pub fn role_for(&self, guild_id: GuildId, message_id: MessageId, emoji: &str) -> Option<RoleId> {
        self.mappings
            .read()
            .get(&key(guild_id, message_id))
            .and_then(|emojis| emojis.get(emoji))
            .copied()
            .filter(|id| *id != 0)
            .map(RoleId::new)
    }

    /// Bind an emoji to a role, replacing any previous binding.
    pub fn bind(
        &self,
        guild_id: GuildId,
        message_id: MessageId,
        emoji: &str,
        role_id: RoleId,
    ) -> Result<(), StorageError> {
        let mut mappings = self.mappings.write();
        mappings
            .entry(key(guild_id, message_id))
            .or_default()
            .insert(emoji.to_string(), role_id.get());
        save(&self.path, &mappings)
    }

    /// Remove a binding. Returns `false` when it did not exist.
    pub fn unbind(
        &self,
        guild_id: GuildId,
        message_id: MessageId,
        emoji: &str,
    ) -> Result<bool, StorageError> {
        let mut mappings = self.mappings.write();
        let key = key(guild_id, message_id);

        let Some(emojis) = mappings.get_mut(&key) else {
            return Ok(false);
        };
        if emojis.remove(emoji).is_none() {
            return Ok(false);
        }
        if emojis.is_empty() {
            mappings.remove(&key);
        }

        save(&self.path, &mappings)?;
        Ok(true)
    }

    /// Every binding in a guild, ordered by message key.
    pub fn for_guild(&self, guild_id: GuildId) -> Vec<MessageBindings> {
        let prefix = format!("{}-", guild_id);
        self.mappings
            .read()
            .iter()
            .filter_map(|(key, emojis)| {
                let message_id = key
                    .strip_prefix(&prefix)?
                    .parse::<u64>()
                    .ok()
                    .filter(|id| *id != 0)?;
                Some(MessageBindings {
                    message_id: MessageId::new(message_id),
                    roles: emojis
                        .iter()
                        .filter(|(_, id)| **id != 0)
                        .map(|(emoji, id)| (emoji.clone(), RoleId::new(*id)))
                        .collect(),
                })
            })
            .collect()
    }
}

fn load(path: &Path) -> BTreeMap<String, EmojiRoles> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) => {
            debug!("No reaction-role file at {}: {}", path.display(), e);
            return BTreeMap::new();
        }
    };

    let value: Value = match serde_json::from_str(&raw) {
        Ok(value) => value,
        Err(e) => {
            warn!("Ignoring malformed reaction-role file {}: {}", path.display(), e);
            return BTreeMap::new();
        }
    };

    let Value::Object(entries) = value else {
        warn!("Reaction-role file {} is not an object", path.display());
        return BTreeMap::new();
    };

    entries
        .into_iter()
        .filter_map(|(key, emojis)| {
            let Value::Object(emojis) = emojis else {
                return None;
            };
            let roles = emojis
                .into_iter()
                .filter_map(|(emoji, role)| role_id(&role).map(|id| (emoji, id)))
                .collect();
            Some((key, roles))
        })
        .collect()
}

fn role_id(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
    .filter(|id| *id != 0)
}

fn save(path: &Path, mappings: &BTreeMap<String, EmojiRoles>) -> Result<(), StorageError> {
    let encoded = serde_json::to_string_pretty(mappings)?;
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|source| StorageError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    fs::write(path, encoded).map_err(|source| StorageError::Io {
        path: path.to_path_buf(),
        source,
    })
}
