//! Boundary between the moderation logic and the chat platform.
//!
//! Everything the pipeline reads from or does to a guild goes through the
//! [`Gateway`] trait, so the detection and response logic runs the same
//! against serenity's HTTP client and cache or against an in-memory double.
//!
//! ## Usage
//!
//! ```rust
//! let gateway = SerenityGateway::from_context(&ctx);
//! let owner = gateway.guild_owner(guild_id);
//! gateway.send_message(channel_id, "hello").await?;
//! ```

mod discord;
#[cfg(test)]
pub mod mock;

use chrono::{DateTime, Utc};
use serenity::all::{ChannelId, GuildId, MessageId, Permissions, RoleId, UserId};
use serenity::async_trait;

pub use discord::SerenityGateway;

use crate::error::GatewayError;
use crate::events::antinuke::ActionKind;

pub type GatewayResult<T> = Result<T, GatewayError>;

/// Position of a role in the guild hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoleSnapshot {
    pub id: RoleId,
    pub position: u16,
}

impl RoleSnapshot {
    pub fn new(id: u64, position: u16) -> Self {
        Self {
            id: RoleId::new(id),
            position,
        }
    }

    /// Hierarchy comparison: higher position wins, ties go to the older role.
    pub fn is_above(&self, other: &RoleSnapshot) -> bool {
        self.position > other.position || (self.position == other.position && self.id < other.id)
    }

    /// The implicit everyone role shares the guild's id.
    pub fn is_default(&self, guild_id: GuildId) -> bool {
        self.id.get() == guild_id.get()
    }
}

/// A guild member with role positions resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberSnapshot {
    pub user_id: UserId,
    pub roles: Vec<RoleSnapshot>,
}

impl MemberSnapshot {
    /// Highest role held, if any.
    pub fn top_role(&self) -> Option<RoleSnapshot> {
        self.roles.iter().copied().reduce(|top, role| if role.is_above(&top) { role } else { top })
    }
}

/// What the bot itself may do in a guild.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BotMember {
    pub can_manage_roles: bool,
    pub top_role: Option<RoleSnapshot>,
}

impl BotMember {
    /// Whether the bot outranks `role`. A bot without roles outranks nothing.
    pub fn outranks(&self, role: &RoleSnapshot) -> bool {
        self.top_role.is_some_and(|top| top.is_above(role))
    }
}

/// One audit-log entry, reduced to what correlation needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditRecord {
    pub target_id: Option<u64>,
    pub actor_id: Option<UserId>,
    pub created_at: DateTime<Utc>,
}

/// Reads and actions against the chat platform.
///
/// Synchronous methods read only from the local cache and never hit the network.
#[async_trait]
pub trait Gateway: Send + Sync {
    /// The bot's own user id.
    fn bot_id(&self) -> UserId;

    /// Guild owner from cache.
    fn guild_owner(&self, guild_id: GuildId) -> Option<UserId>;

    /// Role ids of a cached member; `None` when the member is not cached.
    fn cached_member_roles(&self, guild_id: GuildId, user_id: UserId) -> Option<Vec<RoleId>>;

    /// Most recent audit entries for an action kind, newest first.
    async fn audit_log(
        &self,
        guild_id: GuildId,
        kind: ActionKind,
        limit: u8,
    ) -> GatewayResult<Vec<AuditRecord>>;

    /// Resolve a current member (cache first); `Ok(None)` if not in the guild.
    async fn member(&self, guild_id: GuildId, user_id: UserId)
    -> GatewayResult<Option<MemberSnapshot>>;

    /// The bot's own capabilities in the guild.
    async fn bot_member(&self, guild_id: GuildId) -> GatewayResult<BotMember>;

    async fn role(&self, guild_id: GuildId, role_id: RoleId) -> GatewayResult<Option<RoleSnapshot>>;

    /// Guild-level permission bits of a member.
    async fn member_permissions(&self, guild_id: GuildId, user_id: UserId)
    -> GatewayResult<Permissions>;

    async fn remove_roles(
        &self,
        guild_id: GuildId,
        user_id: UserId,
        roles: &[RoleId],
        reason: &str,
    ) -> GatewayResult<()>;

    async fn add_role(
        &self,
        guild_id: GuildId,
        user_id: UserId,
        role_id: RoleId,
        reason: &str,
    ) -> GatewayResult<()>;

    async fn kick(&self, guild_id: GuildId, user_id: UserId, reason: &str) -> GatewayResult<()>;

    /// Ban by id; works for users no longer in the guild.
    async fn ban(&self, guild_id: GuildId, user_id: UserId, reason: &str) -> GatewayResult<()>;

    async fn send_message(&self, channel_id: ChannelId, text: &str) -> GatewayResult<MessageId>;

    /// Send a message that may ping only the listed users. Everyone, here
    /// and role mentions in `text` render without notifying anybody.
    async fn send_message_mentioning(
        &self,
        channel_id: ChannelId,
        text: &str,
        users: &[UserId],
    ) -> GatewayResult<MessageId>;

    async fn delete_message(&self, channel_id: ChannelId, message_id: MessageId)
    -> GatewayResult<()>;

    /// Guild a channel belongs to; `Ok(None)` for non-guild channels.
    async fn channel_guild(&self, channel_id: ChannelId) -> GatewayResult<Option<GuildId>>;

    /// System channel, or the first text channel the bot can write to.
    fn welcome_channel(&self, guild_id: GuildId) -> Option<ChannelId>;

    async fn add_reaction(
        &self,
        channel_id: ChannelId,
        message_id: MessageId,
        emoji: &str,
    ) -> GatewayResult<()>;

    /// Remove every reaction of one emoji from a message.
    async fn clear_reaction(
        &self,
        channel_id: ChannelId,
        message_id: MessageId,
        emoji: &str,
    ) -> GatewayResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_hierarchy_ties_favor_older_role() {
        let older = RoleSnapshot::new(10, 5);
        let newer = RoleSnapshot::new(20, 5);
        let lower = RoleSnapshot::new(5, 4);

        assert!(older.is_above(&newer));
        assert!(!newer.is_above(&older));
        assert!(newer.is_above(&lower));
        assert!(!older.is_above(&older));
    }

    #[test]
    fn test_member_top_role() {
        let member = MemberSnapshot {
            user_id: UserId::new(1),
            roles: vec![RoleSnapshot::new(3, 1), RoleSnapshot::new(4, 7), RoleSnapshot::new(5, 2)],
        };
        assert_eq!(member.top_role(), Some(RoleSnapshot::new(4, 7)));
    }

    #[test]
    fn test_roleless_bot_outranks_nothing() {
        let bot = BotMember {
            can_manage_roles: true,
            top_role: None,
        };
        assert!(!bot.outranks(&RoleSnapshot::new(1, 0)));
    }
}
