//! Grants and revokes roles bound to message reactions.

use serenity::all::{GuildId, MessageId, Reaction, UserId};
use tracing::{debug, info, warn};

use crate::bot::dispatcher::AppState;
use crate::gateway::Gateway;

/// A reaction added to or removed from a guild message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReactionChange {
    pub guild_id: GuildId,
    pub message_id: MessageId,
    pub user_id: UserId,
    /// Unicode emoji, or `<:name:id>` for custom emoji.
    pub emoji: String,
    pub added: bool,
}

impl ReactionChange {
    /// `None` outside guilds or when the reacting user is unknown.
    pub fn from_reaction(reaction: &Reaction, added: bool) -> Option<Self> {
        Some(Self {
            guild_id: reaction.guild_id?,
            message_id: reaction.message_id,
            user_id: reaction.user_id?,
            emoji: reaction.emoji.to_string(),
            added,
        })
    }
}

pub async fn handle(
    state: &AppState,
    gateway: &dyn Gateway,
    change: ReactionChange,
) -> anyhow::Result<()> {
    if !state.settings.current().is_monitored(change.guild_id) || change.user_id == gateway.bot_id() {
        return Ok(());
    }

    let Some(role_id) =
        state
            .reaction_roles
            .role_for(change.guild_id, change.message_id, &change.emoji)
    else {
        return Ok(());
    };

    if gateway.role(change.guild_id, role_id).await?.is_none() {
        debug!("Reaction role {} no longer exists", role_id);
        return Ok(());
    }
    if gateway.member(change.guild_id, change.user_id).await?.is_none() {
        return Ok(());
    }
    if gateway
        .member_permissions(change.guild_id, change.user_id)
        .await?
        .administrator()
    {
        return Ok(());
    }

    let result = if change.added {
        gateway
            .add_role(change.guild_id, change.user_id, role_id, "Reaction role")
            .await
    } else {
        gateway
            .remove_roles(change.guild_id, change.user_id, &[role_id], "Reaction role removed")
            .await
    };

    match result {
        Ok(()) => info!(
            "Reaction role {} {} for {} in guild {}",
            role_id,
            if change.added { "granted" } else { "revoked" },
            change.user_id,
            change.guild_id
        ),
        Err(e) => warn!("Failed to update reaction role {}: {}", role_id, e),
    }
    Ok(())
}
