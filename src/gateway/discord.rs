//! Gateway implementation over serenity's HTTP client and cache.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serenity::all::{
    Cache, ChannelId, ChannelType, Context, CreateAllowedMentions, CreateMessage, GuildId, Http,
    MessageId, Permissions, ReactionType, Role, RoleId, UserId,
};
use serenity::async_trait;
use serenity::model::guild::audit_log::{Action, ChannelAction, MemberAction, RoleAction};

use super::{AuditRecord, BotMember, Gateway, GatewayResult, MemberSnapshot, RoleSnapshot};
use crate::error::GatewayError;
use crate::events::antinuke::ActionKind;

/// Owner and role table of a guild, from cache or HTTP.
struct GuildView {
    owner_id: UserId,
    roles: HashMap<RoleId, Role>,
}

/// Serenity-backed [`Gateway`].
///
/// Cheap to build per event: it only clones the context's `Arc`s.
#[derive(Clone)]
pub struct SerenityGateway {
    http: Arc<Http>,
    cache: Arc<Cache>,
    bot_id: UserId,
}

impl SerenityGateway {
    pub fn from_context(ctx: &Context) -> Self {
        Self {
            http: ctx.http.clone(),
            cache: ctx.cache.clone(),
            bot_id: ctx.cache.current_user().id,
        }
    }

    async fn guild_view(&self, guild_id: GuildId) -> GatewayResult<GuildView> {
        if let Some(view) = self.cache.guild(guild_id).map(|guild| GuildView {
            owner_id: guild.owner_id,
            roles: guild.roles.clone(),
        }) {
            return Ok(view);
        }

        let guild = self.http.get_guild(guild_id).await?;
        Ok(GuildView {
            owner_id: guild.owner_id,
            roles: guild.roles,
        })
    }

    /// Role ids of a member, from cache or HTTP; `Ok(None)` if not a member.
    async fn member_roles(
        &self,
        guild_id: GuildId,
        user_id: UserId,
    ) -> GatewayResult<Option<Vec<RoleId>>> {
        if let Some(roles) = self.cached_member_roles(guild_id, user_id) {
            return Ok(Some(roles));
        }

        match self.http.get_member(guild_id, user_id).await {
            Ok(member) => Ok(Some(member.roles)),
            Err(e) => match GatewayError::from(e) {
                GatewayError::NotFound(_) => Ok(None),
                other => Err(other),
            },
        }
    }

    fn reaction(emoji: &str) -> GatewayResult<ReactionType> {
        ReactionType::try_from(emoji)
            .map_err(|_| GatewayError::NotFound(format!("emoji '{}'", emoji)))
    }
}

fn audit_action(kind: ActionKind) -> Action {
    match kind {
        ActionKind::ChannelDelete => Action::Channel(ChannelAction::Delete),
        ActionKind::ChannelCreate => Action::Channel(ChannelAction::Create),
        ActionKind::RoleDelete => Action::Role(RoleAction::Delete),
        ActionKind::MemberBan => Action::Member(MemberAction::BanAdd),
        ActionKind::MemberKick => Action::Member(MemberAction::Kick),
    }
}

fn snapshot(view: &GuildView, role_id: RoleId) -> Option<RoleSnapshot> {
    view.roles.get(&role_id).map(|role| RoleSnapshot {
        id: role.id,
        position: role.position,
    })
}

#[async_trait]
impl Gateway for SerenityGateway {
    fn bot_id(&self) -> UserId {
        self.bot_id
    }

    fn guild_owner(&self, guild_id: GuildId) -> Option<UserId> {
        self.cache.guild(guild_id).map(|guild| guild.owner_id)
    }

    fn cached_member_roles(&self, guild_id: GuildId, user_id: UserId) -> Option<Vec<RoleId>> {
        let guild = self.cache.guild(guild_id)?;
        guild.members.get(&user_id).map(|member| member.roles.clone())
    }

    async fn audit_log(
        &self,
        guild_id: GuildId,
        kind: ActionKind,
        limit: u8,
    ) -> GatewayResult<Vec<AuditRecord>> {
        let logs = guild_id
            .audit_logs(&self.http, Some(audit_action(kind)), None, None, Some(limit))
            .await?;

        Ok(logs
            .entries
            .into_iter()
            .map(|entry| AuditRecord {
                target_id: entry.target_id.map(|target| target.get()),
                actor_id: Some(entry.user_id),
                created_at: DateTime::from_timestamp(entry.id.created_at().unix_timestamp(), 0)
                    .unwrap_or_else(Utc::now),
            })
            .collect())
    }

    async fn member(
        &self,
        guild_id: GuildId,
        user_id: UserId,
    ) -> GatewayResult<Option<MemberSnapshot>> {
        let Some(role_ids) = self.member_roles(guild_id, user_id).await? else {
            return Ok(None);
        };
        let view = self.guild_view(guild_id).await?;

        Ok(Some(MemberSnapshot {
            user_id,
            roles: role_ids
                .into_iter()
                .filter_map(|id| snapshot(&view, id))
                .collect(),
        }))
    }

    async fn bot_member(&self, guild_id: GuildId) -> GatewayResult<BotMember> {
        let member = self
            .member(guild_id, self.bot_id)
            .await?
            .ok_or_else(|| GatewayError::NotFound(format!("bot member in guild {}", guild_id)))?;
        let permissions = self.member_permissions(guild_id, self.bot_id).await?;

        Ok(BotMember {
            can_manage_roles: permissions.administrator() || permissions.manage_roles(),
            top_role: member.top_role(),
        })
    }

    async fn role(&self, guild_id: GuildId, role_id: RoleId) -> GatewayResult<Option<RoleSnapshot>> {
        let view = self.guild_view(guild_id).await?;
        Ok(snapshot(&view, role_id))
    }

    async fn member_permissions(
        &self,
        guild_id: GuildId,
        user_id: UserId,
    ) -> GatewayResult<Permissions> {
        let view = self.guild_view(guild_id).await?;
        if view.owner_id == user_id {
            return Ok(Permissions::all());
        }

        let role_ids = self
            .member_roles(guild_id, user_id)
            .await?
            .ok_or_else(|| GatewayError::NotFound(format!("member {}", user_id)))?;

        let everyone = RoleId::new(guild_id.get());
        let permissions = std::iter::once(everyone)
            .chain(role_ids)
            .filter_map(|id| view.roles.get(&id))
            .fold(Permissions::empty(), |acc, role| acc | role.permissions);

        if permissions.administrator() {
            return Ok(Permissions::all());
        }
        Ok(permissions)
    }

    async fn remove_roles(
        &self,
        guild_id: GuildId,
        user_id: UserId,
        roles: &[RoleId],
        reason: &str,
    ) -> GatewayResult<()> {
        for role_id in roles {
            self.http
                .remove_member_role(guild_id, user_id, *role_id, Some(reason))
                .await?;
        }
        Ok(())
    }

    async fn add_role(
        &self,
        guild_id: GuildId,
        user_id: UserId,
        role_id: RoleId,
        reason: &str,
    ) -> GatewayResult<()> {
        self.http
            .add_member_role(guild_id, user_id, role_id, Some(reason))
            .await?;
        Ok(())
    }

    async fn kick(&self, guild_id: GuildId, user_id: UserId, reason: &str) -> GatewayResult<()> {
        self.http.kick_member(guild_id, user_id, Some(reason)).await?;
        Ok(())
    }

    async fn ban(&self, guild_id: GuildId, user_id: UserId, reason: &str) -> GatewayResult<()> {
        self.http.ban_user(guild_id, user_id, 0, Some(reason)).await?;
        Ok(())
    }

    async fn send_message(&self, channel_id: ChannelId, text: &str) -> GatewayResult<MessageId> {
        let message = channel_id.say(&self.http, text).await?;
        Ok(message.id)
    }

    async fn send_message_mentioning(
        &self,
        channel_id: ChannelId,
        text: &str,
        users: &[UserId],
    ) -> GatewayResult<MessageId> {
        let mentions = CreateAllowedMentions::new().users(users.iter().copied());
        let builder = CreateMessage::new().content(text).allowed_mentions(mentions);
        let message = channel_id.send_message(&self.http, builder).await?;
        Ok(message.id)
    }

    async fn delete_message(
        &self,
        channel_id: ChannelId,
        message_id: MessageId,
    ) -> GatewayResult<()> {
        self.http.delete_message(channel_id, message_id, None).await?;
        Ok(())
    }

    async fn channel_guild(&self, channel_id: ChannelId) -> GatewayResult<Option<GuildId>> {
        let channel = self.http.get_channel(channel_id).await?;
        Ok(channel.guild().map(|channel| channel.guild_id))
    }

    fn welcome_channel(&self, guild_id: GuildId) -> Option<ChannelId> {
        let guild = self.cache.guild(guild_id)?;
        if let Some(system) = guild.system_channel_id {
            return Some(system);
        }

        let me = guild.members.get(&self.bot_id)?;
        let mut text_channels: Vec<_> = guild
            .channels
            .values()
            .filter(|channel| channel.kind == ChannelType::Text)
            .collect();
        text_channels.sort_by_key(|channel| (channel.position, channel.id));

        text_channels
            .into_iter()
            .find(|channel| guild.user_permissions_in(channel, me).send_messages())
            .map(|channel| channel.id)
    }

    async fn add_reaction(
        &self,
        channel_id: ChannelId,
        message_id: MessageId,
        emoji: &str,
    ) -> GatewayResult<()> {
        let reaction = Self::reaction(emoji)?;
        self.http
            .create_reaction(channel_id, message_id, &reaction)
            .await?;
        Ok(())
    }

    async fn clear_reaction(
        &self,
        channel_id: ChannelId,
        message_id: MessageId,
        emoji: &str,
    ) -> GatewayResult<()> {
        let reaction = Self::reaction(emoji)?;
        self.http
            .delete_message_reaction_emoji(channel_id, message_id, &reaction)
            .await?;
        Ok(())
    }
}
