//! Actors the anti-nuke engine never tracks.

use serenity::all::{GuildId, UserId};

use crate::gateway::Gateway;
use crate::settings::AntiNukeSettings;

/// Whether an actor is immune to tracking.
///
/// Role exemptions are checked against cached roles only; an uncached
/// member is tracked.
pub fn is_exempt(
    gateway: &dyn Gateway,
    settings: &AntiNukeSettings,
    guild_id: GuildId,
    actor: UserId,
) -> bool {
    if actor == gateway.bot_id()
        || gateway.guild_owner(guild_id) == Some(actor)
        || settings.exempt_user_ids.contains(&actor)
    {
        return true;
    }

    if settings.exempt_role_ids.is_empty() {
        return false;
    }

    gateway
        .cached_member_roles(guild_id, actor)
        .is_some_and(|roles| roles.iter().any(|r| settings.exempt_role_ids.contains(r)))
}
