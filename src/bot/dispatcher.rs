//! Shared application state and event routing.
//!
//! Serenity hands every gateway event to [`Handler`], which normalizes it and
//! routes it to the matching event module or command plugin.

use std::sync::Arc;

use serenity::all::{
    ActivityData, Context, GuildChannel, GuildId, GuildMemberUpdateEvent, Member, Message,
    Reaction, Ready, Role, RoleId, User,
};
use serenity::async_trait;
use serenity::client::EventHandler;
use tracing::{debug, error, info};

use crate::completion::WelcomeWriter;
use crate::config::Config;
use crate::error::ConfigError;
use crate::events::antinuke::{ActionEvent, AntiNuke};
use crate::events::{self, reaction_role::ReactionChange, spam::IncomingMessage};
use crate::gateway::{Gateway, SerenityGateway};
use crate::permissions::Permissions;
use crate::plugins::{self, CommandContext};
use crate::settings::{BotSettings, ListEdit, ListKey, SettingsStore};
use crate::storage::ReactionRoleStore;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Policy file and its current snapshot.
    pub settings: Arc<SettingsStore>,

    /// Anti-nuke engine.
    pub antinuke: Arc<AntiNuke>,

    /// Reaction-role table.
    pub reaction_roles: Arc<ReactionRoleStore>,

    /// Permission checker with caching.
    pub permissions: Permissions,

    /// Welcome text generator.
    pub welcome: WelcomeWriter,

    /// Operator command prefix.
    pub prefix: String,
}

impl AppState {
    /// Create a new application state.
    pub fn new(
        settings: SettingsStore,
        reaction_roles: ReactionRoleStore,
        owner_ids: Vec<u64>,
        prefix: String,
    ) -> Self {
        let antinuke = AntiNuke::new(settings.current().anti_nuke.clone());

        Self {
            settings: Arc::new(settings),
            antinuke: Arc::new(antinuke),
            reaction_roles: Arc::new(reaction_roles),
            permissions: Permissions::with_owners(owner_ids),
            welcome: WelcomeWriter::new(),
            prefix,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            SettingsStore::open(&config.settings_path),
            ReactionRoleStore::open(&config.reaction_roles_path),
            config.owner_ids.clone(),
            config.command_prefix.clone(),
        )
    }

    /// Locale for user-facing text.
    pub fn locale(&self) -> String {
        self.settings.current().locale.clone()
    }

    /// Re-read the settings file and hand the new policy to the engine.
    ///
    /// The engine is refreshed either way, so a failed reload leaves it disabled.
    pub fn reload_settings(&self) -> Result<Arc<BotSettings>, ConfigError> {
        let result = self.settings.reload();
        self.antinuke.apply(self.settings.current().anti_nuke.clone());
        result
    }

    /// Edit a settings list and keep the engine in sync with the guild list.
    pub fn edit_settings_list(&self, key: ListKey, edit: ListEdit) -> Result<bool, ConfigError> {
        let changed = self.settings.edit_list(key, edit)?;
        if changed && key == ListKey::MonitoredGuilds {
            self.antinuke.apply(self.settings.current().anti_nuke.clone());
        }
        Ok(changed)
    }
}

/// Serenity event handler.
pub struct Handler {
    pub state: AppState,
}

impl Handler {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }

    /// Run an anti-nuke event in its own task so the audit-log wait
    /// never blocks the shard.
    fn track(&self, ctx: &Context, event: ActionEvent) {
        let engine = self.state.antinuke.clone();
        let gateway = SerenityGateway::from_context(ctx);
        tokio::spawn(async move {
            engine.handle(&gateway, event).await;
        });
    }

    async fn route_command(&self, gateway: &dyn Gateway, msg: &Message, guild_id: GuildId) {
        let Some(invocation) = plugins::parse(&self.state.prefix, &msg.content) else {
            return;
        };

        let ctx = CommandContext {
            state: &self.state,
            gateway,
            guild_id,
            channel_id: msg.channel_id,
            author_id: msg.author.id,
            locale: self.state.locale(),
        };

        if let Err(e) = plugins::dispatch(&ctx, invocation).await {
            error!("Command {} failed: {:#}", invocation.kind.name(), e);
        }
    }
}

/// Activity shown while connected.
fn presence() -> ActivityData {
    ActivityData::playing("blocking spam...")
}

#[async_trait]
impl EventHandler for Handler {
    async fn ready(&self, ctx: Context, ready: Ready) {
        info!(
            "Logged in as {} ({} guilds)",
            ready.user.name,
            ready.guilds.len()
        );

        ctx.set_activity(Some(presence()));
    }

    async fn channel_create(&self, ctx: Context, channel: GuildChannel) {
        self.track(&ctx, ActionEvent::channel_created(&channel));
    }

    async fn channel_delete(
        &self,
        ctx: Context,
        channel: GuildChannel,
        _messages: Option<Vec<Message>>,
    ) {
        self.track(&ctx, ActionEvent::channel_deleted(&channel));
    }

    async fn guild_role_delete(
        &self,
        ctx: Context,
        guild_id: GuildId,
        removed_role_id: RoleId,
        removed_role: Option<Role>,
    ) {
        self.track(
            &ctx,
            ActionEvent::role_deleted(guild_id, removed_role_id, removed_role.as_ref()),
        );
    }

    async fn guild_ban_addition(&self, ctx: Context, guild_id: GuildId, banned_user: User) {
        self.track(&ctx, ActionEvent::member_banned(guild_id, &banned_user));
    }

    async fn guild_member_removal(
        &self,
        ctx: Context,
        guild_id: GuildId,
        user: User,
        _member: Option<Member>,
    ) {
        self.track(&ctx, ActionEvent::member_removed(guild_id, &user));
    }

    async fn message(&self, ctx: Context, msg: Message) {
        let Some(incoming) = IncomingMessage::from_message(&msg) else {
            return;
        };
        let gateway = SerenityGateway::from_context(&ctx);
        if incoming.author_id == gateway.bot_id() {
            return;
        }

        if let Err(e) = events::spam::handle(&self.state, &gateway, &incoming).await {
            error!("Spam blocker failed: {:#}", e);
        }
        if !incoming.author_is_bot {
            self.route_command(&gateway, &msg, incoming.guild_id).await;
        }
    }

    async fn reaction_add(&self, ctx: Context, reaction: Reaction) {
        self.reaction(&ctx, &reaction, true).await;
    }

    async fn reaction_remove(&self, ctx: Context, reaction: Reaction) {
        self.reaction(&ctx, &reaction, false).await;
    }

    async fn guild_member_update(
        &self,
        _ctx: Context,
        _old_if_available: Option<Member>,
        _new: Option<Member>,
        event: GuildMemberUpdateEvent,
    ) {
        self.state
            .permissions
            .invalidate(event.guild_id, event.user.id);
    }

    async fn guild_member_addition(&self, ctx: Context, new_member: Member) {
        let gateway = SerenityGateway::from_context(&ctx);
        let join = events::welcome::JoinedMember::from_member(&ctx, &new_member);
        if let Err(e) = events::welcome::handle(&self.state, &gateway, join).await {
            error!("Welcome message failed: {:#}", e);
        }
    }
}

impl Handler {
    async fn reaction(&self, ctx: &Context, reaction: &Reaction, added: bool) {
        let Some(change) = ReactionChange::from_reaction(reaction, added) else {
            debug!("Ignoring reaction outside a guild");
            return;
        };
        let gateway = SerenityGateway::from_context(ctx);
        if let Err(e) = events::reaction_role::handle(&self.state, &gateway, change).await {
            error!("Reaction role update failed: {:#}", e);
        }
    }
}


#[cfg(test)]
mod tests {
    use serenity::all::{ActivityType, UserId};

    use super::testing::state_with;
    use super::*;

    #[test]
    fn test_presence_is_playing_status() {
        let activity = presence();
        assert_eq!(activity.kind, ActivityType::Playing);
        assert_eq!(activity.name, "blocking spam...");
    }

    #[test]
    fn test_failed_reload_disables_engine() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_with(
            dir.path(),
            "[anti_nuke]\nenabled = true\n[anti_nuke.action_thresholds.channel_delete]\ncount = 2\nwindow_seconds = 10\n",
        );
        assert!(state.antinuke.settings().enabled);

        std::fs::write(dir.path().join("settings.toml"), "not = [valid").unwrap();
        assert!(state.reload_settings().is_err());
        assert!(!state.antinuke.settings().enabled);
        assert!(!state.settings.current().anti_nuke.enabled);
    }

    #[test]
    fn test_reload_with_same_content_keeps_policy() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_with(
            dir.path(),
            "[anti_nuke]\nenabled = true\npunishment = \"ban\"\n",
        );
        let before = state.antinuke.settings();

        state.reload_settings().unwrap();
        assert_eq!(*state.antinuke.settings(), *before);
    }

    #[test]
    fn test_guild_list_edit_reaches_engine() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_with(dir.path(), "[anti_nuke]\nenabled = true\n");

        assert!(
            state
                .edit_settings_list(ListKey::MonitoredGuilds, ListEdit::Add("55".into()))
                .unwrap()
        );
        assert!(
            state
                .antinuke
                .settings()
                .monitored_guild_ids
                .contains(&GuildId::new(55))
        );
        assert!(state.permissions.is_bot_owner(UserId::new(1)));
        assert_eq!(state.locale(), "en");
    }
}
