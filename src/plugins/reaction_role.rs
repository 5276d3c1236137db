//! Reaction role commands.
//!
//! Commands:
//! - `reactionrole <message> <emoji> <role>`: bind an emoji and seed the reaction
//! - `rmlist`: list bindings in this guild
//! - `rmreactionrole <message> <emoji>`: unbind and clear the reaction

use serenity::all::{MessageId, Mentionable, RoleId};
use tracing::{debug, info};

use super::{CommandContext, Invocation};
use crate::error::GatewayError;
use crate::utils::{escape_markdown, parse_id};

async fn reply_invalid_id(ctx: &CommandContext<'_>, raw: &str) -> anyhow::Result<()> {
    ctx.reply(&ctx.format("common.invalid_id", &[("value", &escape_markdown(raw))]))
        .await
}

pub async fn reaction_role(ctx: &CommandContext<'_>, inv: Invocation<'_>) -> anyhow::Result<()> {
    if !ctx.state.settings.current().is_monitored(ctx.guild_id) {
        return ctx.reply(&ctx.text("reaction_role.disabled")).await;
    }

    let [raw_message, emoji, raw_role] = inv.args()[..] else {
        return ctx.reply_usage(inv.kind).await;
    };
    let Some(message_id) = parse_id(raw_message).map(MessageId::new) else {
        return reply_invalid_id(ctx, raw_message).await;
    };
    let Some(role_id) = parse_id(raw_role).map(RoleId::new) else {
        return reply_invalid_id(ctx, raw_role).await;
    };

    if ctx.gateway.role(ctx.guild_id, role_id).await?.is_none() {
        return ctx.reply(&ctx.text("reaction_role.role_not_found")).await;
    }

    if let Err(e) = ctx
        .gateway
        .add_reaction(ctx.channel_id, message_id, emoji)
        .await
    {
        let text = match e {
            GatewayError::NotFound(_) => ctx.text("reaction_role.message_not_found"),
            GatewayError::Permission(_) => ctx.text("reaction_role.no_reaction_permission"),
            other => ctx.format("reaction_role.add_failed", &[("error", &other.to_string())]),
        };
        return ctx.reply(&text).await;
    }

    if let Err(e) = ctx
        .state
        .reaction_roles
        .bind(ctx.guild_id, message_id, emoji, role_id)
    {
        return ctx
            .reply(&ctx.format("reaction_role.save_failed", &[("error", &e.to_string())]))
            .await;
    }
    info!(
        "Bound {} on message {} to role {} in guild {}",
        emoji, message_id, role_id, ctx.guild_id
    );

    ctx.reply(&ctx.format(
        "reaction_role.added",
        &[
            ("message", &message_id.to_string()),
            ("emoji", emoji),
            ("role", &role_id.mention().to_string()),
        ],
    ))
    .await
}

pub async fn list(ctx: &CommandContext<'_>) -> anyhow::Result<()> {
    let bindings = ctx.state.reaction_roles.for_guild(ctx.guild_id);
    if bindings.is_empty() {
        return ctx.reply(&ctx.text("reaction_role.list_empty")).await;
    }

    let mut lines = vec![ctx.text("reaction_role.list_title")];
    for binding in bindings {
        lines.push(ctx.format(
            "reaction_role.list_message",
            &[("message", &binding.message_id.to_string())],
        ));
        for (emoji, role_id) in binding.roles {
            let role = match ctx.gateway.role(ctx.guild_id, role_id).await {
                Ok(Some(_)) => role_id.mention().to_string(),
                _ => ctx.format("reaction_role.unknown_role", &[("id", &role_id.to_string())]),
            };
            lines.push(ctx.format(
                "reaction_role.list_entry",
                &[("emoji", &emoji), ("role", &role)],
            ));
        }
    }

    ctx.reply(&lines.join("\n")).await
}

pub async fn remove(ctx: &CommandContext<'_>, inv: Invocation<'_>) -> anyhow::Result<()> {
    let [raw_message, emoji] = inv.args()[..] else {
        return ctx.reply_usage(inv.kind).await;
    };
    let Some(message_id) = parse_id(raw_message).map(MessageId::new) else {
        return reply_invalid_id(ctx, raw_message).await;
    };

    match ctx
        .state
        .reaction_roles
        .unbind(ctx.guild_id, message_id, emoji)
    {
        Ok(true) => {}
        Ok(false) => return ctx.reply(&ctx.text("reaction_role.not_found")).await,
        Err(e) => {
            return ctx
                .reply(&ctx.format("reaction_role.save_failed", &[("error", &e.to_string())]))
                .await;
        }
    }

    if let Err(e) = ctx
        .gateway
        .clear_reaction(ctx.channel_id, message_id, emoji)
        .await
    {
        debug!("Could not clear {} from message {}: {}", emoji, message_id, e);
    }

    ctx.reply(&ctx.text("reaction_role.removed")).await
}
