//! Plugin system for operator commands.
//!
//! Add new commands by:
//! 1. Adding a variant to [`CommandKind`] with its name, requirement and usage
//! 2. Implementing the handler in the matching plugin module
//! 3. Adding the branch to [`dispatch`]

pub mod antinuke;
pub mod reaction_role;
pub mod spam;

use serenity::all::{ChannelId, GuildId, UserId};
use tracing::{info, warn};

use crate::bot::dispatcher::AppState;
use crate::gateway::Gateway;
use crate::i18n::{format_text, get_text};
use crate::utils::truncate_message;

/// Permission a command requires from its caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    Administrator,
    ManageRoles,
}

impl Requirement {
    fn label_key(self) -> &'static str {
        match self {
            Self::Administrator => "permission.administrator",
            Self::ManageRoles => "permission.manage_roles",
        }
    }
}

/// All operator commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    // Anti-nuke
    AntinukeReload,
    AntinukeStatus,

    // Spam blocker
    ReloadConfig,
    AddGuild,
    AddChannel,
    AddBot,
    RemoveBot,
    ListBots,
    AddKeyword,
    ListKeywords,

    // Reaction roles
    ReactionRole,
    RmList,
    RmReactionRole,
}

impl CommandKind {
    pub const ALL: [CommandKind; 13] = [
        Self::AntinukeReload,
        Self::AntinukeStatus,
        Self::ReloadConfig,
        Self::AddGuild,
        Self::AddChannel,
        Self::AddBot,
        Self::RemoveBot,
        Self::ListBots,
        Self::AddKeyword,
        Self::ListKeywords,
        Self::ReactionRole,
        Self::RmList,
        Self::RmReactionRole,
    ];

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::AntinukeReload => "antinuke_reload",
            Self::AntinukeStatus => "antinuke_status",
            Self::ReloadConfig => "reload_config",
            Self::AddGuild => "add_guild",
            Self::AddChannel => "add_channel",
            Self::AddBot => "add_bot",
            Self::RemoveBot => "remove_bot",
            Self::ListBots => "list_bots",
            Self::AddKeyword => "add_keyword",
            Self::ListKeywords => "list_keywords",
            Self::ReactionRole => "reactionrole",
            Self::RmList => "rmlist",
            Self::RmReactionRole => "rmreactionrole",
        }
    }

    pub fn requirement(self) -> Requirement {
        match self {
            Self::ReactionRole | Self::RmList | Self::RmReactionRole => Requirement::ManageRoles,
            _ => Requirement::Administrator,
        }
    }

    /// Argument synopsis shown on misuse.
    pub fn usage(self) -> &'static str {
        match self {
            Self::AddGuild => "add_guild <server id>",
            Self::AddChannel => "add_channel <channel id>",
            Self::AddBot => "add_bot <bot id>",
            Self::RemoveBot => "remove_bot <bot id>",
            Self::AddKeyword => "add_keyword <text>",
            Self::ReactionRole => "reactionrole <message id> <emoji> <role id>",
            Self::RmReactionRole => "rmreactionrole <message id> <emoji>",
            other => other.name(),
        }
    }
}

/// A recognized command and its unparsed arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Invocation<'a> {
    pub kind: CommandKind,
    pub rest: &'a str,
}

impl<'a> Invocation<'a> {
    /// Whitespace-separated arguments.
    pub fn args(&self) -> Vec<&'a str> {
        self.rest.split_whitespace().collect()
    }
}

/// Split `<prefix><name> <rest>`. Unknown names are not commands.
pub fn parse<'a>(prefix: &str, content: &'a str) -> Option<Invocation<'a>> {
    let body = content.trim().strip_prefix(prefix)?;
    let (name, rest) = body
        .split_once(char::is_whitespace)
        .unwrap_or((body, ""));

    Some(Invocation {
        kind: CommandKind::from_name(name)?,
        rest: rest.trim(),
    })
}

/// Everything a command handler needs about where it was invoked.
pub struct CommandContext<'a> {
    pub state: &'a AppState,
    pub gateway: &'a dyn Gateway,
    pub guild_id: GuildId,
    pub channel_id: ChannelId,
    pub author_id: UserId,
    pub locale: String,
}

impl CommandContext<'_> {
    pub fn text(&self, key: &str) -> String {
        get_text(&self.locale, key)
    }

    pub fn format(&self, key: &str, args: &[(&str, &str)]) -> String {
        format_text(&self.locale, key, args)
    }

    /// Send a reply to the invoking channel.
    pub async fn reply(&self, text: &str) -> anyhow::Result<()> {
        self.gateway
            .send_message(self.channel_id, &truncate_message(text))
            .await?;
        Ok(())
    }

    pub async fn reply_usage(&self, kind: CommandKind) -> anyhow::Result<()> {
        let usage = format!("{}{}", self.state.prefix, kind.usage());
        self.reply(&self.format("common.usage", &[("usage", &usage)]))
            .await
    }

    /// Check the caller against a requirement, replying when it fails.
    async fn authorize(&self, requirement: Requirement) -> anyhow::Result<bool> {
        let permissions = &self.state.permissions;
        let allowed = match requirement {
            Requirement::Administrator => {
                permissions
                    .is_admin(self.gateway, self.guild_id, self.author_id)
                    .await
            }
            Requirement::ManageRoles => {
                permissions
                    .can_manage_roles(self.gateway, self.guild_id, self.author_id)
                    .await
            }
        };

        match allowed {
            Ok(true) => Ok(true),
            Ok(false) => {
                let label = self.text(requirement.label_key());
                self.reply(&self.format("common.no_permission", &[("permission", &label)]))
                    .await?;
                Ok(false)
            }
            Err(e) => {
                warn!("Permission lookup for {} failed: {}", self.author_id, e);
                self.reply(&self.format(
                    "common.permission_check_failed",
                    &[("error", &e.to_string())],
                ))
                .await?;
                Ok(false)
            }
        }
    }
}

/// Run a parsed command after its permission check.
pub async fn dispatch(ctx: &CommandContext<'_>, invocation: Invocation<'_>) -> anyhow::Result<()> {
    if !ctx.authorize(invocation.kind.requirement()).await? {
        return Ok(());
    }

    info!(
        "Command {} by {} in guild {}",
        invocation.kind.name(),
        ctx.author_id,
        ctx.guild_id
    );

    match invocation.kind {
        CommandKind::AntinukeReload => antinuke::reload(ctx).await,
        CommandKind::AntinukeStatus => antinuke::status(ctx).await,
        CommandKind::ReloadConfig => antinuke::reload_config(ctx).await,
        CommandKind::AddGuild => spam::add_guild(ctx, invocation).await,
        CommandKind::AddChannel => spam::add_channel(ctx, invocation).await,
        CommandKind::AddBot => spam::add_bot(ctx, invocation).await,
        CommandKind::RemoveBot => spam::remove_bot(ctx, invocation).await,
        CommandKind::ListBots => spam::list_bots(ctx).await,
        CommandKind::AddKeyword => spam::add_keyword(ctx, invocation).await,
        CommandKind::ListKeywords => spam::list_keywords(ctx).await,
        CommandKind::ReactionRole => reaction_role::reaction_role(ctx, invocation).await,
        CommandKind::RmList => reaction_role::list(ctx).await,
        CommandKind::RmReactionRole => reaction_role::remove(ctx, invocation).await,
    }
}
