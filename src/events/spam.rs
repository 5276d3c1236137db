//! Spam blocker.
//!
//! Removes messages from bots that are not on the allow list, either all of
//! them or only those matching the spam predicate.

use std::time::Duration;

use serenity::all::{ChannelId, GuildId, Message, MessageId, UserId};
use tracing::{debug, info, warn};

use crate::bot::dispatcher::AppState;
use crate::gateway::Gateway;
use crate::i18n::{format_text, get_text};
use crate::settings::{BotSettings, SpamSettings};

/// How long a spam notice stays up.
const WARNING_LIFETIME: Duration = Duration::from_secs(5);

/// Title and description of an embed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmbedText {
    pub title: Option<String>,
    pub description: Option<String>,
}

/// A guild message reduced to what the blocker inspects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingMessage {
    pub guild_id: GuildId,
    pub channel_id: ChannelId,
    pub message_id: MessageId,
    pub author_id: UserId,
    pub author_name: String,
    pub author_is_bot: bool,
    pub content: String,
    pub embeds: Vec<EmbedText>,
}

impl IncomingMessage {
    /// `None` for direct messages.
    pub fn from_message(msg: &Message) -> Option<Self> {
        Some(Self {
            guild_id: msg.guild_id?,
            channel_id: msg.channel_id,
            message_id: msg.id,
            author_id: msg.author.id,
            author_name: msg.author.name.clone(),
            author_is_bot: msg.author.bot,
            content: msg.content.clone(),
            embeds: msg
                .embeds
                .iter()
                .map(|embed| EmbedText {
                    title: embed.title.clone(),
                    description: embed.description.clone(),
                })
                .collect(),
        })
    }
}

/// Why a message is removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Allow,
    UnauthorizedBot,
    SpamContent,
}

impl Verdict {
    fn reason_key(self) -> &'static str {
        match self {
            Self::Allow => "",
            Self::UnauthorizedBot => "spam.reason_unauthorized_bot",
            Self::SpamContent => "spam.reason_spam_content",
        }
    }
}

/// Embed blocking or a case-insensitive keyword hit in content or embeds.
pub fn is_spam(settings: &SpamSettings, msg: &IncomingMessage) -> bool {
    if settings.block_embeds && !msg.embeds.is_empty() {
        return true;
    }

    let keywords: Vec<String> = settings
        .spam_keywords
        .iter()
        .map(|k| k.to_lowercase())
        .filter(|k| !k.is_empty())
        .collect();
    if keywords.is_empty() {
        return false;
    }

    let hit = |text: &str| {
        let text = text.to_lowercase();
        keywords.iter().any(|k| text.contains(k.as_str()))
    };

    hit(&msg.content)
        || msg.embeds.iter().any(|embed| {
            embed.title.as_deref().is_some_and(hit) || embed.description.as_deref().is_some_and(hit)
        })
}

/// Policy decision, before the administrator exemption.
pub fn classify(settings: &BotSettings, msg: &IncomingMessage) -> Verdict {
    if !settings.is_monitored(msg.guild_id) {
        return Verdict::Allow;
    }

    let spam = &settings.spam;
    if !spam.monitored_channel_ids.is_empty() && !spam.monitored_channel_ids.contains(&msg.channel_id) {
        return Verdict::Allow;
    }

    if !msg.author_is_bot || spam.allowed_bot_ids.contains(&msg.author_id) {
        return Verdict::Allow;
    }

    if spam.block_all_unauthorized_bots {
        Verdict::UnauthorizedBot
    } else if is_spam(spam, msg) {
        Verdict::SpamContent
    } else {
        Verdict::Allow
    }
}

/// Apply the blocker to one message.
pub async fn handle(
    state: &AppState,
    gateway: &dyn Gateway,
    msg: &IncomingMessage,
) -> anyhow::Result<()> {
    let settings = state.settings.current();
    let verdict = classify(&settings, msg);
    if verdict == Verdict::Allow {
        return Ok(());
    }

    let is_admin = state
        .permissions
        .is_admin(gateway, msg.guild_id, msg.author_id)
        .await
        .unwrap_or(false);
    if is_admin {
        debug!("Skipping spam check for administrator {}", msg.author_id);
        return Ok(());
    }

    gateway.delete_message(msg.channel_id, msg.message_id).await?;

    let reason = get_text(&settings.locale, verdict.reason_key());
    info!(
        "Deleted message: {} {} (ID: {}) embeds={}",
        reason,
        msg.author_name,
        msg.author_id,
        msg.embeds.len()
    );

    if settings.spam.send_warning {
        let mut text = format_text(
            &settings.locale,
            "spam.warning",
            &[("reason", &reason), ("author", &msg.author_name)],
        );
        if !msg.embeds.is_empty() {
            text.push_str(&format_text(
                &settings.locale,
                "spam.warning_embeds",
                &[("count", &msg.embeds.len().to_string())],
            ));
        }

        let notice = gateway.send_message(msg.channel_id, &text).await?;
        tokio::time::sleep(WARNING_LIFETIME).await;
        if let Err(e) = gateway.delete_message(msg.channel_id, notice).await {
            warn!("Failed to remove spam notice: {}", e);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use serenity::all::Permissions as PermissionBits;

    use super::*;
    use crate::bot::dispatcher::testing::state_with;
    use crate::gateway::mock::{Call, MockGateway};

    fn message(is_bot: bool) -> IncomingMessage {
        IncomingMessage {
            guild_id: GuildId::new(10),
            channel_id: ChannelId::new(20),
            message_id: MessageId::new(30),
            author_id: UserId::new(40),
            author_name: "spammer".into(),
            author_is_bot: is_bot,
            content: "Get FREE Nitro now".into(),
            embeds: vec![],
        }
    }

    fn spam_settings(keywords: &[&str]) -> SpamSettings {
        SpamSettings {
            block_all_unauthorized_bots: false,
            spam_keywords: keywords.iter().map(|k| k.to_string()).collect(),
            ..SpamSettings::default()
        }
    }

    #[test]
    fn test_keyword_match_is_case_insensitive() {
        assert!(is_spam(&spam_settings(&["free nitro"]), &message(true)));
        assert!(!is_spam(&spam_settings(&["casino"]), &message(true)));
        assert!(!is_spam(&spam_settings(&[]), &message(true)));
    }

    #[test]
    fn test_keyword_in_embed_title_or_description() {
        let mut msg = message(true);
        msg.content.clear();
        msg.embeds = vec![EmbedText {
            title: None,
            description: Some("Join our CASINO".into()),
        }];

        assert!(is_spam(&spam_settings(&["casino"]), &msg));

        let blocks_embeds = SpamSettings {
            block_embeds: true,
            ..spam_settings(&[])
        };
        assert!(is_spam(&blocks_embeds, &msg));
    }

    #[test]
    fn test_classify_scopes() {
        let mut settings = BotSettings::default();
        assert_eq!(classify(&settings, &message(false)), Verdict::Allow);
        assert_eq!(classify(&settings, &message(true)), Verdict::UnauthorizedBot);

        settings.spam.allowed_bot_ids.insert(UserId::new(40));
        assert_eq!(classify(&settings, &message(true)), Verdict::Allow);
        settings.spam.allowed_bot_ids.clear();

        settings.spam.monitored_channel_ids.insert(ChannelId::new(21));
        assert_eq!(classify(&settings, &message(true)), Verdict::Allow);
        settings.spam.monitored_channel_ids.clear();

        settings.monitored_guild_ids.insert(GuildId::new(11));
        assert_eq!(classify(&settings, &message(true)), Verdict::Allow);
        settings.monitored_guild_ids.clear();

        settings.spam = spam_settings(&["nitro"]);
        assert_eq!(classify(&settings, &message(true)), Verdict::SpamContent);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unauthorized_bot_is_deleted_with_notice() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_with(dir.path(), "send_warning = true\n");
        let gateway = MockGateway::new();
        let msg = message(true);

        handle(&state, &gateway, &msg).await.unwrap();

        let calls = gateway.calls();
        assert_eq!(calls[0], Call::Delete(msg.channel_id, msg.message_id));
        assert!(matches!(&calls[1], Call::Send(_, text) if text.contains("spammer")));
        assert!(matches!(calls[2], Call::Delete(_, id) if id != msg.message_id));
    }

    #[tokio::test]
    async fn test_admin_bot_is_left_alone() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_with(dir.path(), "");
        let gateway = MockGateway::new();
        let msg = message(true);
        gateway
            .permissions
            .lock()
            .insert((msg.guild_id, msg.author_id), PermissionBits::ADMINISTRATOR);

        handle(&state, &gateway, &msg).await.unwrap();
        assert!(gateway.calls().is_empty());
    }

    #[tokio::test]
    async fn test_human_messages_are_never_touched() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_with(dir.path(), "spam_keywords = [\"nitro\"]\n");
        let gateway = MockGateway::new();

        handle(&state, &gateway, &message(false)).await.unwrap();
        assert!(gateway.calls().is_empty());
    }
}
