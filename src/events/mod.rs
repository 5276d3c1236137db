//! Event handler system.
//!
//! Each module handles one kind of guild event routed by
//! [`Handler`](crate::bot::dispatcher::Handler):
//! - `antinuke`: destructive actions (channel, role, ban, removal)
//! - `spam`: messages from unauthorized bots
//! - `reaction_role`: reaction add/remove on bound messages
//! - `welcome`: member joins

pub mod antinuke;
pub mod reaction_role;
pub mod spam;
pub mod welcome;
