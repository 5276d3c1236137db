//! Anti-nuke operator commands.
//!
//! Commands:
//! - `antinuke_reload`: re-read the settings file and reset all tracking
//! - `antinuke_status`: show the active policy
//! - `reload_config`: same reload with a generic confirmation

use serenity::all::Mentionable;
use tracing::warn;

use super::CommandContext;

pub async fn reload(ctx: &CommandContext<'_>) -> anyhow::Result<()> {
    match ctx.state.reload_settings() {
        Ok(_) => ctx.reply(&ctx.text("antinuke.reloaded")).await,
        Err(e) => {
            warn!(
                "Reload of {} failed: {}",
                ctx.state.settings.path().display(),
                e
            );
            ctx.reply(&ctx.format("antinuke.reload_failed", &[("error", &e.to_string())]))
                .await
        }
    }
}

pub async fn reload_config(ctx: &CommandContext<'_>) -> anyhow::Result<()> {
    match ctx.state.reload_settings() {
        Ok(_) => ctx.reply(&ctx.text("config.reloaded")).await,
        Err(e) => {
            warn!(
                "Reload of {} failed: {}",
                ctx.state.settings.path().display(),
                e
            );
            ctx.reply(&ctx.format("config.reload_failed", &[("error", &e.to_string())]))
                .await
        }
    }
}

pub async fn status(ctx: &CommandContext<'_>) -> anyhow::Result<()> {
    let settings = ctx.state.antinuke.settings();
    let yes_no = |flag: bool| ctx.text(if flag { "common.yes" } else { "common.no" });
    let none = ctx.text("common.none");

    let mut lines = vec![
        ctx.text("antinuke.status_title"),
        ctx.format("antinuke.status_enabled", &[("value", &yes_no(settings.enabled))]),
        ctx.format(
            "antinuke.status_punishment",
            &[("value", settings.punishment.as_str())],
        ),
        ctx.format(
            "antinuke.status_log_channel",
            &[(
                "value",
                &settings
                    .log_channel_id
                    .map(|id| id.mention().to_string())
                    .unwrap_or_else(|| none.clone()),
            )],
        ),
        ctx.format(
            "antinuke.status_quarantine",
            &[(
                "value",
                &settings
                    .quarantine_role_id
                    .map(|id| id.mention().to_string())
                    .unwrap_or_else(|| none.clone()),
            )],
        ),
        ctx.text("antinuke.status_thresholds_title"),
    ];

    let mut thresholds: Vec<_> = settings.thresholds.iter().collect();
    thresholds.sort_by_key(|(kind, _)| kind.as_str());
    if thresholds.is_empty() {
        lines.push(ctx.text("antinuke.status_no_thresholds"));
    }
    for (kind, threshold) in thresholds {
        lines.push(ctx.format(
            "antinuke.status_threshold",
            &[
                ("kind", kind.as_str()),
                ("count", &threshold.count.to_string()),
                ("seconds", &threshold.window_seconds.to_string()),
            ],
        ));
    }

    lines.push(ctx.format(
        "antinuke.status_windows",
        &[("count", &ctx.state.antinuke.tracked_windows().to_string())],
    ));

    ctx.reply(&lines.join("\n")).await
}
