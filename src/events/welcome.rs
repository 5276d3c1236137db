//! Welcome event handler.
//!
//! Greets new members with a generated message, or a plain one when the
//! completion endpoint fails.

use serenity::all::{Context, GuildId, Member, Mentionable, UserId};
use tracing::{debug, info, warn};

use crate::bot::dispatcher::AppState;
use crate::completion::JoinContext;
use crate::error::CompletionError;
use crate::gateway::Gateway;
use crate::i18n::format_text;
use crate::utils::truncate_message;

/// A member who just joined, with the guild details the greeting needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinedMember {
    pub guild_id: GuildId,
    pub user_id: UserId,
    pub display_name: String,
    pub is_bot: bool,
    pub guild_name: String,
    pub member_count: u64,
}

impl JoinedMember {
    /// Guild name and size come from the cache and are blank when it is cold.
    pub fn from_member(ctx: &Context, member: &Member) -> Self {
        let (guild_name, member_count) = ctx
            .cache
            .guild(member.guild_id)
            .map(|guild| (guild.name.clone(), guild.member_count))
            .unwrap_or_default();

        Self {
            guild_id: member.guild_id,
            user_id: member.user.id,
            display_name: member.display_name().to_string(),
            is_bot: member.user.bot,
            guild_name,
            member_count,
        }
    }

    fn context(&self) -> JoinContext {
        JoinContext {
            guild_name: self.guild_name.clone(),
            member_count: self.member_count,
            display_name: self.display_name.clone(),
        }
    }
}

/// Build the posted text from the generation result.
pub fn compose(
    locale: &str,
    mention: &str,
    guild_name: &str,
    generated: Result<String, CompletionError>,
) -> String {
    let text = match generated {
        Ok(text) => format_text(
            locale,
            "welcome.generated",
            &[("mention", mention), ("text", &text)],
        ),
        Err(e) => {
            warn!("Welcome generation failed: {}", e);
            format_text(
                locale,
                "welcome.fallback",
                &[("mention", mention), ("guild", guild_name)],
            )
        }
    };
    truncate_message(&text)
}

pub async fn handle(
    state: &AppState,
    gateway: &dyn Gateway,
    join: JoinedMember,
) -> anyhow::Result<()> {
    if join.is_bot {
        return Ok(());
    }

    let settings = state.settings.current();
    if !settings.welcome.is_active() {
        debug!("Welcome generation inactive, skipping {}", join.user_id);
        return Ok(());
    }

    let Some(channel_id) = gateway.welcome_channel(join.guild_id) else {
        warn!("No writable channel for welcome in guild {}", join.guild_id);
        return Ok(());
    };

    let generated = state.welcome.write(&settings.welcome, &join.context()).await;
    let text = compose(
        &settings.locale,
        &join.user_id.mention().to_string(),
        &join.guild_name,
        generated,
    );

    gateway
        .send_message_mentioning(channel_id, &text, &[join.user_id])
        .await?;
    info!("Welcomed {} in guild {}", join.display_name, join.guild_id);
    Ok(())
}
