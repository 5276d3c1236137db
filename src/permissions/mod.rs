//! Permission system for operator commands.
//!
//! This module checks whether a member may run a command in a guild.
//!
//! ## Features
//!
//! - Cached permission lookups (reduces API hits)
//! - Administrator and Manage Roles checks
//! - Bot owner bypass
//!
//! ## Usage
//!
//! ```rust
//! let perms = Permissions::with_owners(config.owner_ids.clone());
//!
//! // Check if user is admin
//! if perms.is_admin(&gateway, guild_id, user_id).await? {
//!     // ...
//! }
//! ```

mod checker;

pub use checker::Permissions;
