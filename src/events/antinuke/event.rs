//! Normalized privileged-action events.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serenity::all::{GuildChannel, GuildId, Role, RoleId, User};

/// Category of monitored privileged action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ActionKind {
    ChannelDelete,
    ChannelCreate,
    RoleDelete,
    MemberBan,
    MemberKick,
}

impl ActionKind {
    pub const ALL: [ActionKind; 5] = [
        Self::ChannelDelete,
        Self::ChannelCreate,
        Self::RoleDelete,
        Self::MemberBan,
        Self::MemberKick,
    ];

    /// Key used in the settings file and in log messages.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ChannelDelete => "channel_delete",
            Self::ChannelCreate => "channel_create",
            Self::RoleDelete => "role_delete",
            Self::MemberBan => "member_ban",
            Self::MemberKick => "member_kick",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or(())
    }
}

/// A gateway notification reduced to what the anti-nuke pipeline needs.
#[derive(Debug, Clone)]
pub struct ActionEvent {
    pub guild_id: GuildId,
    pub kind: ActionKind,
    /// Id of the channel, role or user the action was applied to.
    pub target_id: Option<u64>,
    /// Human-readable description carried into reports and audit reasons.
    pub note: String,
    /// When the event was received; burst windows are measured from it.
    pub occurred_at: DateTime<Utc>,
}

impl ActionEvent {
    pub fn new(guild_id: GuildId, kind: ActionKind, target_id: Option<u64>, note: String) -> Self {
        Self {
            guild_id,
            kind,
            target_id,
            note,
            occurred_at: Utc::now(),
        }
    }

    pub fn channel_deleted(channel: &GuildChannel) -> Self {
        Self::new(
            channel.guild_id,
            ActionKind::ChannelDelete,
            Some(channel.id.get()),
            format!("channel deleted: #{}", channel.name),
        )
    }

    pub fn channel_created(channel: &GuildChannel) -> Self {
        Self::new(
            channel.guild_id,
            ActionKind::ChannelCreate,
            Some(channel.id.get()),
            format!("channel created: #{}", channel.name),
        )
    }

    /// Role data is only present when the role was cached before deletion.
    pub fn role_deleted(guild_id: GuildId, role_id: RoleId, role: Option<&Role>) -> Self {
        let note = match role {
            Some(role) => format!("role deleted: {}", role.name),
            None => format!("role deleted: {}", role_id),
        };
        Self::new(guild_id, ActionKind::RoleDelete, Some(role_id.get()), note)
    }

    pub fn member_banned(guild_id: GuildId, user: &User) -> Self {
        Self::new(
            guild_id,
            ActionKind::MemberBan,
            Some(user.id.get()),
            format!("user banned: {} ({})", user.name, user.id),
        )
    }

    /// A removal is correlated as a kick; voluntary leaves find no audit entry.
    pub fn member_removed(guild_id: GuildId, user: &User) -> Self {
        Self::new(
            guild_id,
            ActionKind::MemberKick,
            Some(user.id.get()),
            format!("user kicked: {} ({})", user.name, user.id),
        )
    }
}
