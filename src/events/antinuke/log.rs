//! Reporting to the configured moderation log channel.

use serenity::all::{ChannelId, GuildId};
use tracing::{info, warn};

use crate::cache::{CacheConfig, TypedCache};
use crate::gateway::Gateway;

/// Log sink for anti-nuke reports.
///
/// Every report is traced; it is also posted to the log channel when one is
/// configured and belongs to the reporting guild.
#[derive(Clone)]
pub struct LogSink {
    /// Channel id → owning guild (`None` for non-guild channels).
    channel_owners: TypedCache<u64, Option<GuildId>>,
    /// Guild ids recently warned about a missing audit-log permission.
    audit_warned: TypedCache<u64, ()>,
}

impl LogSink {
    pub fn new() -> Self {
        Self {
            channel_owners: TypedCache::new("log_channel_owners", CacheConfig::channel_owner()),
            audit_warned: TypedCache::new("audit_permission_warned", CacheConfig::warning_dedupe()),
        }
    }

    pub async fn report(
        &self,
        gateway: &dyn Gateway,
        guild_id: GuildId,
        log_channel: Option<ChannelId>,
        text: &str,
    ) {
        info!("{} (guild {})", text, guild_id);

        let Some(channel_id) = log_channel else {
            return;
        };

        let owner = match self.channel_owners.get(&channel_id.get()) {
            Some(owner) => owner,
            None => match gateway.channel_guild(channel_id).await {
                Ok(owner) => {
                    self.channel_owners.insert(channel_id.get(), owner);
                    owner
                }
                Err(e) => {
                    warn!("Log channel {} is not accessible: {}", channel_id, e);
                    return;
                }
            },
        };

        if owner.is_some_and(|owner| owner != guild_id) {
            return;
        }

        if let Err(e) = gateway.send_message(channel_id, text).await {
            warn!("Failed to post to log channel {}: {}", channel_id, e);
        }
    }

    /// Report at most once per guild per dedupe window.
    pub async fn report_once(
        &self,
        gateway: &dyn Gateway,
        guild_id: GuildId,
        log_channel: Option<ChannelId>,
        text: &str,
    ) {
        if self.audit_warned.insert_if_absent(guild_id.get(), ()) {
            self.report(gateway, guild_id, log_channel, text).await;
        } else {
            warn!("{} (guild {}, repeated)", text, guild_id);
        }
    }

    /// Forget cached channel ownership and warning state.
    pub fn reset(&self) {
        self.channel_owners.invalidate_all();
        self.audit_warned.invalidate_all();
    }
}

impl Default for LogSink {
    fn default() -> Self {
        Self::new()
    }
}
