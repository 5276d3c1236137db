//! Graduated response against an actor whose burst crossed a threshold.

use serenity::all::{GuildId, Mentionable, RoleId, UserId};
use tracing::warn;

use super::{ActionEvent, LogSink};
use crate::error::GatewayError;
use crate::gateway::{BotMember, Gateway, MemberSnapshot, RoleSnapshot};
use crate::settings::{AntiNukeSettings, Punishment};

/// What a punishment attempt actually did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PunishmentOutcome {
    Stripped {
        removed: Vec<RoleId>,
        quarantined: bool,
    },
    Kicked,
    Banned,
    /// Nothing could be done; the reason was reported.
    Skipped(String),
    Failed(GatewayError),
}

/// Audit-log reason attached to every punitive call.
pub fn reason(event: &ActionEvent) -> String {
    format!("Anti-nuke: {} - {}", event.kind, event.note)
}

/// Apply the configured punishment and report the outcome.
pub async fn punish(
    gateway: &dyn Gateway,
    sink: &LogSink,
    settings: &AntiNukeSettings,
    event: &ActionEvent,
    actor: UserId,
) -> PunishmentOutcome {
    let reason = reason(event);
    let outcome = match settings.punishment {
        Punishment::StripRoles => strip_roles(gateway, sink, settings, event, actor, &reason).await,
        Punishment::Kick => kick(gateway, event, actor, &reason).await,
        Punishment::Ban => match gateway.ban(event.guild_id, actor, &reason).await {
            Ok(()) => PunishmentOutcome::Banned,
            Err(e) => PunishmentOutcome::Failed(e),
        },
    };

    let text = describe(&outcome, event, actor);
    sink.report(gateway, event.guild_id, settings.log_channel_id, &text).await;
    outcome
}

async fn kick(
    gateway: &dyn Gateway,
    event: &ActionEvent,
    actor: UserId,
    reason: &str,
) -> PunishmentOutcome {
    match gateway.member(event.guild_id, actor).await {
        Ok(Some(_)) => match gateway.kick(event.guild_id, actor, reason).await {
            Ok(()) => PunishmentOutcome::Kicked,
            Err(e) => PunishmentOutcome::Failed(e),
        },
        Ok(None) => PunishmentOutcome::Skipped("the actor already left the server".into()),
        Err(e) => PunishmentOutcome::Failed(e),
    }
}

async fn strip_roles(
    gateway: &dyn Gateway,
    sink: &LogSink,
    settings: &AntiNukeSettings,
    event: &ActionEvent,
    actor: UserId,
    reason: &str,
) -> PunishmentOutcome {
    let guild_id = event.guild_id;
    let member = match gateway.member(guild_id, actor).await {
        Ok(Some(member)) => member,
        Ok(None) => {
            warn!("Cannot strip roles of {} in guild {}: not a member", actor, guild_id);
            return PunishmentOutcome::Skipped("the actor is no longer a member".into());
        }
        Err(e) => return PunishmentOutcome::Failed(e),
    };

    let bot = match gateway.bot_member(guild_id).await {
        Ok(bot) => bot,
        Err(e) => return PunishmentOutcome::Failed(e),
    };
    if !bot.can_manage_roles {
        return PunishmentOutcome::Failed(GatewayError::Permission("manage_roles".into()));
    }

    let (removable, out_of_reach) = partition_roles(&member, guild_id, |role| bot.outranks(role));
    if removable.is_empty() && !out_of_reach.is_empty() {
        let text = format!(
            "⚠️ Anti-nuke: {} holds roles above the bot's highest role; none could be removed.",
            actor.mention()
        );
        sink.report(gateway, guild_id, settings.log_channel_id, &text).await;
    }

    if !removable.is_empty()
        && let Err(e) = gateway
            .remove_roles(guild_id, actor, &removable, reason)
            .await
    {
        return PunishmentOutcome::Failed(e);
    }

    let quarantined = match settings.quarantine_role_id {
        Some(role_id) => quarantine(gateway, guild_id, actor, role_id, &bot).await,
        None => false,
    };

    PunishmentOutcome::Stripped {
        removed: removable,
        quarantined,
    }
}

/// Split a member's non-default roles into (removable, above the bot).
fn partition_roles(
    member: &MemberSnapshot,
    guild_id: GuildId,
    outranked: impl Fn(&RoleSnapshot) -> bool,
) -> (Vec<RoleId>, Vec<RoleId>) {
    let (below, above): (Vec<&RoleSnapshot>, Vec<&RoleSnapshot>) = member
        .roles
        .iter()
        .filter(|role| !role.is_default(guild_id))
        .partition(|role| outranked(role));
    (
        below.into_iter().map(|r| r.id).collect(),
        above.into_iter().map(|r| r.id).collect(),
    )
}

async fn quarantine(
    gateway: &dyn Gateway,
    guild_id: GuildId,
    actor: UserId,
    role_id: RoleId,
    bot: &BotMember,
) -> bool {
    let role = match gateway.role(guild_id, role_id).await {
        Ok(Some(role)) => role,
        Ok(None) => {
            warn!("Quarantine role {} not found in guild {}", role_id, guild_id);
            return false;
        }
        Err(e) => {
            warn!("Failed to resolve quarantine role {}: {}", role_id, e);
            return false;
        }
    };

    if !bot.outranks(&role) {
        warn!(
            "Quarantine role {} is above the bot in guild {}, not assigned",
            role_id, guild_id
        );
        return false;
    }

    match gateway
        .add_role(guild_id, actor, role_id, "Anti-nuke quarantine")
        .await
    {
        Ok(()) => true,
        Err(e) => {
            warn!("Failed to assign quarantine role to {}: {}", actor, e);
            false
        }
    }
}

fn describe(outcome: &PunishmentOutcome, event: &ActionEvent, actor: UserId) -> String {
    let cause = format!("{} ({})", event.kind, event.note);
    match outcome {
        PunishmentOutcome::Stripped {
            removed,
            quarantined,
        } => {
            let mut text = format!(
                "🛡️ Anti-nuke: removed {} role(s) from {} after {}.",
                removed.len(),
                actor.mention(),
                cause
            );
            if *quarantined {
                text.push_str(" Quarantine role assigned.");
            }
            text
        }
        PunishmentOutcome::Kicked => {
            format!("🛡️ Anti-nuke: kicked {} after {}.", actor.mention(), cause)
        }
        PunishmentOutcome::Banned => {
            format!("🛡️ Anti-nuke: banned {} after {}.", actor.mention(), cause)
        }
        PunishmentOutcome::Skipped(why) => format!(
            "⚠️ Anti-nuke: could not punish {} after {}: {}.",
            actor.mention(),
            cause,
            why
        ),
        PunishmentOutcome::Failed(GatewayError::Permission(detail)) => format!(
            "⚠️ Anti-nuke: missing permission to punish {} after {} ({}).",
            actor.mention(),
            cause,
            detail
        ),
        PunishmentOutcome::Failed(e) => format!(
            "⚠️ Anti-nuke: punishing {} after {} failed: {}.",
            actor.mention(),
            cause,
            e
        ),
    }
}
