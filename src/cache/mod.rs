//! Cache module - Typed caches backed by Moka.
//!
//! Small, short-lived caches that keep the hot paths off the API:
//! permission bits for command checks, log channel ownership, and
//! rate-limited warnings.
//!
//! ## Usage
//!
//! ```rust
//! let cache: TypedCache<(u64, u64), u64> =
//!     TypedCache::new("member_permissions", CacheConfig::permissions());
//!
//! cache.insert((guild_id, user_id), bits);
//! let bits = cache.get(&(guild_id, user_id));
//! ```

mod config;
mod typed;

pub use config::CacheConfig;
pub use typed::TypedCache;
