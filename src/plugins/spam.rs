//! Spam blocker operator commands.
//!
//! Every edit is written back to the settings file and takes effect
//! immediately.

use serenity::all::{Mentionable, UserId};

use super::{CommandContext, CommandKind, Invocation};
use crate::settings::{ListEdit, ListKey};
use crate::utils::{escape_markdown, parse_id};

/// Reply keys for one id-list command.
struct IdListReplies {
    changed: &'static str,
    unchanged: &'static str,
}

pub async fn add_guild(ctx: &CommandContext<'_>, inv: Invocation<'_>) -> anyhow::Result<()> {
    let replies = IdListReplies {
        changed: "config.guild_added",
        unchanged: "config.guild_exists",
    };
    edit_id_list(ctx, inv, ListKey::MonitoredGuilds, ListEdit::Add, replies).await
}

pub async fn add_channel(ctx: &CommandContext<'_>, inv: Invocation<'_>) -> anyhow::Result<()> {
    let replies = IdListReplies {
        changed: "config.channel_added",
        unchanged: "config.channel_exists",
    };
    edit_id_list(ctx, inv, ListKey::MonitoredChannels, ListEdit::Add, replies).await
}

pub async fn add_bot(ctx: &CommandContext<'_>, inv: Invocation<'_>) -> anyhow::Result<()> {
    let replies = IdListReplies {
        changed: "config.bot_added",
        unchanged: "config.bot_exists",
    };
    edit_id_list(ctx, inv, ListKey::AllowedBots, ListEdit::Add, replies).await
}

pub async fn remove_bot(ctx: &CommandContext<'_>, inv: Invocation<'_>) -> anyhow::Result<()> {
    let replies = IdListReplies {
        changed: "config.bot_removed",
        unchanged: "config.bot_missing",
    };
    edit_id_list(ctx, inv, ListKey::AllowedBots, ListEdit::Remove, replies).await
}

async fn edit_id_list(
    ctx: &CommandContext<'_>,
    inv: Invocation<'_>,
    key: ListKey,
    edit: fn(String) -> ListEdit,
    replies: IdListReplies,
) -> anyhow::Result<()> {
    let Some(raw) = inv.args().first().copied() else {
        return ctx.reply_usage(inv.kind).await;
    };
    let Some(id) = parse_id(raw) else {
        return ctx
            .reply(&ctx.format("common.invalid_id", &[("value", &escape_markdown(raw))]))
            .await;
    };

    let id = id.to_string();
    match ctx.state.edit_settings_list(key, edit(id.clone())) {
        Ok(true) => ctx.reply(&ctx.format(replies.changed, &[("id", &id)])).await,
        Ok(false) => ctx.reply(&ctx.format(replies.unchanged, &[("id", &id)])).await,
        Err(e) => {
            ctx.reply(&ctx.format("common.save_failed", &[("error", &e.to_string())]))
                .await
        }
    }
}

pub async fn list_bots(ctx: &CommandContext<'_>) -> anyhow::Result<()> {
    let settings = ctx.state.settings.current();
    let mut ids: Vec<UserId> = settings.spam.allowed_bot_ids.iter().copied().collect();
    ids.sort();

    let body = if ids.is_empty() {
        ctx.text("config.bots_empty")
    } else {
        ids.iter()
            .map(|id| format!("- {}", id.mention()))
            .collect::<Vec<_>>()
            .join("\n")
    };

    ctx.reply(&format!("{}\n{}", ctx.text("config.bots_title"), body))
        .await
}

pub async fn add_keyword(ctx: &CommandContext<'_>, inv: Invocation<'_>) -> anyhow::Result<()> {
    let keyword = inv.rest;
    if keyword.is_empty() {
        return ctx.reply_usage(CommandKind::AddKeyword).await;
    }

    let shown = escape_markdown(keyword);
    let key = match ctx
        .state
        .edit_settings_list(ListKey::SpamKeywords, ListEdit::Add(keyword.to_string()))
    {
        Ok(true) => "config.keyword_added",
        Ok(false) => "config.keyword_exists",
        Err(e) => {
            return ctx
                .reply(&ctx.format("common.save_failed", &[("error", &e.to_string())]))
                .await;
        }
    };
    ctx.reply(&ctx.format(key, &[("keyword", &shown)])).await
}

pub async fn list_keywords(ctx: &CommandContext<'_>) -> anyhow::Result<()> {
    let settings = ctx.state.settings.current();
    let keywords = &settings.spam.spam_keywords;

    let body = if keywords.is_empty() {
        ctx.text("config.keywords_empty")
    } else {
        keywords
            .iter()
            .map(|k| format!("- {}", escape_markdown(k)))
            .collect::<Vec<_>>()
            .join("\n")
    };

    ctx.reply(&format!("{}\n{}", ctx.text("config.keywords_title"), body))
        .await
}

#[cfg(test)]
mod tests {
    use serenity::all::{ChannelId, GuildId};

    use crate::bot::dispatcher::testing::state_with;
    use crate::gateway::mock::MockGateway;
    use crate::plugins::testing::run;

    #[tokio::test]
    async fn test_add_guild_writes_file_and_reaches_engine() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_with(dir.path(), "locale = \"en\"\n");
        let gateway = MockGateway::new();

        run(&state, &gateway, "!!!add_guild 55").await;
        run(&state, &gateway, "!!!add_guild 55").await;

        let sent = gateway.sent();
        assert!(sent[0].starts_with("✅"));
        assert!(sent[1].starts_with("⚠️"));
        assert!(
            state
                .antinuke
                .settings()
                .monitored_guild_ids
                .contains(&GuildId::new(55))
        );

        let file = std::fs::read_to_string(dir.path().join("settings.toml")).unwrap();
        assert!(file.contains("monitored_guilds"));
        assert!(file.contains("locale"));
    }

    #[tokio::test]
    async fn test_channel_mention_is_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_with(dir.path(), "");
        let gateway = MockGateway::new();

        run(&state, &gateway, "!!!add_channel <#66>").await;
        assert!(
            state
                .settings
                .current()
                .spam
                .monitored_channel_ids
                .contains(&ChannelId::new(66))
        );
    }

    #[tokio::test]
    async fn test_bot_allow_list_round() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_with(dir.path(), "");
        let gateway = MockGateway::new();

        run(&state, &gateway, "!!!list_bots").await;
        run(&state, &gateway, "!!!add_bot 500").await;
        run(&state, &gateway, "!!!list_bots").await;
        run(&state, &gateway, "!!!remove_bot 500").await;
        run(&state, &gateway, "!!!remove_bot 500").await;

        let sent = gateway.sent();
        assert!(sent[0].ends_with("none"));
        assert!(sent[2].contains("<@500>"));
        assert!(sent[3].contains("removed"));
        assert!(sent[4].contains("not on the allow list"));
        assert!(state.settings.current().spam.allowed_bot_ids.is_empty());
    }

    #[tokio::test]
    async fn test_bad_ids_and_missing_arguments() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_with(dir.path(), "");
        let gateway = MockGateway::new();

        run(&state, &gateway, "!!!add_bot abc").await;
        run(&state, &gateway, "!!!add_bot").await;

        let sent = gateway.sent();
        assert!(sent[0].contains("not a valid id"));
        assert!(sent[1].contains("!!!add_bot <bot id>"));
        assert!(state.settings.current().spam.allowed_bot_ids.is_empty());
    }

    #[tokio::test]
    async fn test_keywords_keep_full_text() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_with(dir.path(), "");
        let gateway = MockGateway::new();

        run(&state, &gateway, "!!!list_keywords").await;
        run(&state, &gateway, "!!!add_keyword free *nitro* here").await;
        run(&state, &gateway, "!!!list_keywords").await;

        assert_eq!(
            state.settings.current().spam.spam_keywords,
            vec!["free *nitro* here".to_string()]
        );
        let sent = gateway.sent();
        assert!(sent[0].contains("No keywords"));
        assert!(sent[2].contains("free \\*nitro\\* here"));
    }
}
