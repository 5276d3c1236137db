//! In-memory gateway that records every outbound call.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use serenity::all::{ChannelId, GuildId, MessageId, Permissions, RoleId, UserId};
use serenity::async_trait;

use super::{AuditRecord, BotMember, Gateway, GatewayResult, MemberSnapshot, RoleSnapshot};
use crate::error::GatewayError;
use crate::events::antinuke::ActionKind;

pub const BOT_ID: u64 = 9_000;

/// Outbound call as observed by the mock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    AuditLog(GuildId, ActionKind),
    RemoveRoles(UserId, Vec<RoleId>),
    AddRole(UserId, RoleId),
    Kick(UserId),
    Ban(UserId),
    Send(ChannelId, String),
    /// A send restricted to pinging the listed users.
    SendMentioning(ChannelId, String, Vec<UserId>),
    Delete(ChannelId, MessageId),
    AddReaction(MessageId, String),
    ClearReaction(MessageId, String),
}

pub struct MockGateway {
    pub owners: Mutex<HashMap<GuildId, UserId>>,
    pub cached_roles: Mutex<HashMap<(GuildId, UserId), Vec<RoleId>>>,
    pub members: Mutex<HashMap<(GuildId, UserId), MemberSnapshot>>,
    pub bot: Mutex<BotMember>,
    pub roles: Mutex<HashMap<RoleId, RoleSnapshot>>,
    pub permissions: Mutex<HashMap<(GuildId, UserId), Permissions>>,
    pub audit: Mutex<GatewayResult<Vec<AuditRecord>>>,
    pub channel_guilds: Mutex<HashMap<ChannelId, GuildId>>,
    pub welcome: Mutex<Option<ChannelId>>,
    /// Operation name → error returned instead of succeeding.
    pub failures: Mutex<HashMap<&'static str, GatewayError>>,
    pub calls: Mutex<Vec<Call>>,
    next_message: AtomicU64,
}

impl Default for MockGateway {
    fn default() -> Self {
        Self {
            owners: Mutex::default(),
            cached_roles: Mutex::default(),
            members: Mutex::default(),
            bot: Mutex::new(BotMember {
                can_manage_roles: true,
                top_role: Some(RoleSnapshot::new(BOT_ID, 50)),
            }),
            roles: Mutex::default(),
            permissions: Mutex::default(),
            audit: Mutex::new(Ok(Vec::new())),
            channel_guilds: Mutex::default(),
            welcome: Mutex::new(None),
            failures: Mutex::default(),
            calls: Mutex::default(),
            next_message: AtomicU64::new(1),
        }
    }
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_member(&self, guild_id: GuildId, member: MemberSnapshot) {
        self.cached_roles
            .lock()
            .insert((guild_id, member.user_id), member.roles.iter().map(|r| r.id).collect());
        self.members.lock().insert((guild_id, member.user_id), member);
    }

    pub fn fail(&self, op: &'static str, err: GatewayError) {
        self.failures.lock().insert(op, err);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    /// Text of every message sent, in order.
    pub fn sent(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Send(_, text) | Call::SendMentioning(_, text, _) => Some(text),
                _ => None,
            })
            .collect()
    }

    fn next_message_id(&self) -> MessageId {
        MessageId::new(self.next_message.fetch_add(1, Ordering::Relaxed))
    }

    fn record(&self, op: &'static str, call: Call) -> GatewayResult<()> {
        self.calls.lock().push(call);
        match self.failures.lock().get(op) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl Gateway for MockGateway {
    fn bot_id(&self) -> UserId {
        UserId::new(BOT_ID)
    }

    fn guild_owner(&self, guild_id: GuildId) -> Option<UserId> {
        self.owners.lock().get(&guild_id).copied()
    }

    fn cached_member_roles(&self, guild_id: GuildId, user_id: UserId) -> Option<Vec<RoleId>> {
        self.cached_roles.lock().get(&(guild_id, user_id)).cloned()
    }

    async fn audit_log(
        &self,
        guild_id: GuildId,
        kind: ActionKind,
        limit: u8,
    ) -> GatewayResult<Vec<AuditRecord>> {
        self.calls.lock().push(Call::AuditLog(guild_id, kind));
        self.audit
            .lock()
            .clone()
            .map(|records| records.into_iter().take(limit as usize).collect())
    }

    async fn member(
        &self,
        guild_id: GuildId,
        user_id: UserId,
    ) -> GatewayResult<Option<MemberSnapshot>> {
        if let Some(err) = self.failures.lock().get("member") {
            return Err(err.clone());
        }
        Ok(self.members.lock().get(&(guild_id, user_id)).cloned())
    }

    async fn bot_member(&self, _guild_id: GuildId) -> GatewayResult<BotMember> {
        Ok(self.bot.lock().clone())
    }

    async fn role(&self, _guild_id: GuildId, role_id: RoleId) -> GatewayResult<Option<RoleSnapshot>> {
        Ok(self.roles.lock().get(&role_id).copied())
    }

    async fn member_permissions(
        &self,
        guild_id: GuildId,
        user_id: UserId,
    ) -> GatewayResult<Permissions> {
        if let Some(err) = self.failures.lock().get("member_permissions") {
            return Err(err.clone());
        }
        Ok(self
            .permissions
            .lock()
            .get(&(guild_id, user_id))
            .copied()
            .unwrap_or_else(Permissions::empty))
    }

    async fn remove_roles(
        &self,
        _guild_id: GuildId,
        user_id: UserId,
        roles: &[RoleId],
        _reason: &str,
    ) -> GatewayResult<()> {
        self.record("remove_roles", Call::RemoveRoles(user_id, roles.to_vec()))
    }

    async fn add_role(
        &self,
        _guild_id: GuildId,
        user_id: UserId,
        role_id: RoleId,
        _reason: &str,
    ) -> GatewayResult<()> {
        self.record("add_role", Call::AddRole(user_id, role_id))
    }

    async fn kick(&self, _guild_id: GuildId, user_id: UserId, _reason: &str) -> GatewayResult<()> {
        self.record("kick", Call::Kick(user_id))
    }

    async fn ban(&self, _guild_id: GuildId, user_id: UserId, _reason: &str) -> GatewayResult<()> {
        self.record("ban", Call::Ban(user_id))
    }

    async fn send_message(&self, channel_id: ChannelId, text: &str) -> GatewayResult<MessageId> {
        self.record("send_message", Call::Send(channel_id, text.to_string()))?;
        Ok(self.next_message_id())
    }

    async fn send_message_mentioning(
        &self,
        channel_id: ChannelId,
        text: &str,
        users: &[UserId],
    ) -> GatewayResult<MessageId> {
        let call = Call::SendMentioning(channel_id, text.to_string(), users.to_vec());
        self.record("send_message", call)?;
        Ok(self.next_message_id())
    }

    async fn delete_message(
        &self,
        channel_id: ChannelId,
        message_id: MessageId,
    ) -> GatewayResult<()> {
        self.record("delete_message", Call::Delete(channel_id, message_id))
    }

    async fn channel_guild(&self, channel_id: ChannelId) -> GatewayResult<Option<GuildId>> {
        Ok(self.channel_guilds.lock().get(&channel_id).copied())
    }

    fn welcome_channel(&self, _guild_id: GuildId) -> Option<ChannelId> {
        *self.welcome.lock()
    }

    async fn add_reaction(
        &self,
        _channel_id: ChannelId,
        message_id: MessageId,
        emoji: &str,
    ) -> GatewayResult<()> {
        self.record("add_reaction", Call::AddReaction(message_id, emoji.to_string()))
    }

    async fn clear_reaction(
        &self,
        _channel_id: ChannelId,
        message_id: MessageId,
        emoji: &str,
    ) -> GatewayResult<()> {
        self.record("clear_reaction", Call::ClearReaction(message_id, emoji.to_string()))
    }
}
