//! Permission checker with caching.

use serenity::all::{GuildId, Permissions as PermissionBits, UserId};
use tracing::debug;

use crate::cache::{CacheConfig, TypedCache};
use crate::error::GatewayError;
use crate::gateway::Gateway;

/// Cache key for permission lookups.
type PermissionCacheKey = (u64, u64); // (guild_id, user_id)

/// Permission checker with caching support.
///
/// Bot owners (from OWNER_IDS env) automatically bypass all permission checks.
#[derive(Clone)]
pub struct Permissions {
    cache: TypedCache<PermissionCacheKey, PermissionBits>,
    /// Bot owner IDs - these users have all permissions in all guilds.
    owner_ids: Vec<u64>,
}

impl Permissions {
    /// Create a new permission checker with bot owner IDs.
    pub fn with_owners(owner_ids: Vec<u64>) -> Self {
        Self {
            cache: TypedCache::new("member_permissions", CacheConfig::permissions()),
            owner_ids,
        }
    }

    /// Check if a user is a bot owner.
    #[inline]
    pub fn is_bot_owner(&self, user_id: UserId) -> bool {
        self.owner_ids.contains(&user_id.get())
    }

    /// Guild-level permission bits of a member.
    ///
    /// Bot owners always get every permission.
    pub async fn get_permissions(
        &self,
        gateway: &dyn Gateway,
        guild_id: GuildId,
        user_id: UserId,
    ) -> Result<PermissionBits, GatewayError> {
        if self.is_bot_owner(user_id) {
            debug!("User {} is bot owner, granting all permissions", user_id);
            return Ok(PermissionBits::all());
        }

        let cache_key = (guild_id.get(), user_id.get());
        if let Some(cached) = self.cache.get(&cache_key) {
            debug!("Permission cache hit for user {} in guild {}", user_id, guild_id);
            return Ok(cached);
        }

        debug!("Permission cache miss for user {} in guild {}", user_id, guild_id);
        let bits = gateway.member_permissions(guild_id, user_id).await?;
        self.cache.insert(cache_key, bits);
        Ok(bits)
    }

    /// Check if a user is an administrator.
    /// Bot owners always return true.
    pub async fn is_admin(
        &self,
        gateway: &dyn Gateway,
        guild_id: GuildId,
        user_id: UserId,
    ) -> Result<bool, GatewayError> {
        Ok(self
            .get_permissions(gateway, guild_id, user_id)
            .await?
            .administrator())
    }

    /// Check if a user can manage roles.
    /// Bot owners always return true.
    pub async fn can_manage_roles(
        &self,
        gateway: &dyn Gateway,
        guild_id: GuildId,
        user_id: UserId,
    ) -> Result<bool, GatewayError> {
        let bits = self.get_permissions(gateway, guild_id, user_id).await?;
        Ok(bits.administrator() || bits.manage_roles())
    }

    /// Invalidate cached permissions for a user.
    ///
    /// Call this when a member's roles change.
    pub fn invalidate(&self, guild_id: GuildId, user_id: UserId) {
        self.cache.invalidate(&(guild_id.get(), user_id.get()));
        debug!(
            "Invalidated permission cache for user {} in guild {}",
            user_id, guild_id
        );
    }
}
