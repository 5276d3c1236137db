//! Cache presets.

use std::time::Duration;

/// Size and expiry of one cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    pub max_capacity: u64,
    /// Entries expire this long after insertion.
    pub ttl: Duration,
    /// Entries also expire when unread for this long.
    pub tti: Option<Duration>,
}

impl CacheConfig {
    const fn new(max_capacity: u64, ttl_secs: u64) -> Self {
        Self {
            max_capacity,
            ttl: Duration::from_secs(ttl_secs),
            tti: None,
        }
    }

    /// Member permission bits checked by operator commands.
    /// Short TTL so revoked admins lose access quickly.
    pub fn permissions() -> Self {
        Self {
            tti: Some(Duration::from_secs(60)),
            ..Self::new(10_000, 120)
        }
    }

    /// Channel → guild ownership; channels never move between guilds.
    pub fn channel_owner() -> Self {
        Self::new(1_000, 3_600)
    }

    /// Dedupe window for repeated warnings about the same guild.
    pub fn warning_dedupe() -> Self {
        Self::new(5_000, 600)
    }
}
