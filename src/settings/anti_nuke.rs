//! Anti-nuke policy model.

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use serenity::all::{ChannelId, GuildId, RoleId, UserId};
use toml::{Table, Value};
use tracing::warn;

use super::value::{to_bool, to_id, to_id_set, to_int, to_string};
use crate::events::antinuke::ActionKind;

/// Response applied to an actor whose burst crossed a threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Punishment {
    /// Remove every removable role and assign the quarantine role.
    #[default]
    StripRoles,
    Kick,
    Ban,
}

impl Punishment {
    /// Unknown modes fall back to stripping roles.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "kick" => Self::Kick,
            "ban" => Self::Ban,
            _ => Self::StripRoles,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::StripRoles => "strip_roles",
            Self::Kick => "kick",
            Self::Ban => "ban",
        }
    }
}

impl fmt::Display for Punishment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rate limit for one action kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Threshold {
    /// Number of actions that trips the response; `0` disables the kind.
    pub count: u32,
    /// Window length, always at least one second.
    pub window_seconds: u64,
}

impl Threshold {
    pub fn new(count: u32, window_seconds: u64) -> Self {
        Self {
            count,
            window_seconds: window_seconds.max(1),
        }
    }

    /// Inert threshold used for kinds without configuration.
    pub const fn disabled() -> Self {
        Self {
            count: 0,
            window_seconds: 1,
        }
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.count > 0
    }

    /// Coerce `{count, window_seconds}`; unparseable numbers become 0 and 1.
    fn from_table(table: Option<&Table>) -> Self {
        let field = |name: &str| table.and_then(|t| t.get(name)).and_then(to_int).unwrap_or(0);
        let count = field("count").clamp(0, u32::MAX as i64) as u32;
        let window = field("window_seconds").max(1) as u64;
        Self::new(count, window)
    }
}

/// Validated anti-nuke settings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AntiNukeSettings {
    pub enabled: bool,
    pub punishment: Punishment,
    pub log_channel_id: Option<ChannelId>,
    pub quarantine_role_id: Option<RoleId>,
    pub exempt_user_ids: HashSet<UserId>,
    pub exempt_role_ids: HashSet<RoleId>,
    pub thresholds: BTreeMap<ActionKind, Threshold>,
    /// Empty means every guild is monitored.
    pub monitored_guild_ids: HashSet<GuildId>,
}

impl AntiNukeSettings {
    /// Build from the `[anti_nuke]` table plus the shared monitored guild list.
    pub fn from_table(section: Option<&Table>, monitored_guild_ids: HashSet<GuildId>) -> Self {
        let Some(section) = section else {
            return Self {
                monitored_guild_ids,
                ..Self::default()
            };
        };

        let punishment = to_string(section.get("punishment"))
            .map(|s| Punishment::parse(&s))
            .unwrap_or_default();

        let mut thresholds = BTreeMap::new();
        if let Some(Value::Table(raw)) = section.get("action_thresholds") {
            for (key, entry) in raw {
                match key.parse::<ActionKind>() {
                    Ok(kind) => {
                        thresholds.insert(kind, Threshold::from_table(entry.as_table()));
                    }
                    Err(()) => warn!("Ignoring threshold for unknown action kind '{}'", key),
                }
            }
        }

        Self {
            enabled: to_bool(section.get("enabled"), false),
            punishment,
            log_channel_id: section.get("log_channel_id").and_then(to_id).map(ChannelId::new),
            quarantine_role_id: section
                .get("quarantine_role_id")
                .and_then(to_id)
                .map(RoleId::new),
            exempt_user_ids: to_id_set(section.get("exempt_user_ids"), UserId::new),
            exempt_role_ids: to_id_set(section.get("exempt_role_ids"), RoleId::new),
            thresholds,
            monitored_guild_ids,
        }
    }

    /// Threshold for a kind; unconfigured kinds are inert.
    pub fn threshold(&self, kind: ActionKind) -> Threshold {
        self.thresholds
            .get(&kind)
            .copied()
            .unwrap_or(Threshold::disabled())
    }

    /// Whether events from this guild should be processed at all.
    pub fn monitors(&self, guild_id: GuildId) -> bool {
        self.enabled
            && (self.monitored_guild_ids.is_empty() || self.monitored_guild_ids.contains(&guild_id))
    }
}
