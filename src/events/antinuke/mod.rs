//! Anti-nuke engine.
//!
//! Detects bursts of destructive actions by a single account and responds
//! with the configured punishment.
//!
//! ## Pipeline
//!
//! ```text
//! gateway event → ActionEvent → monitored? → resolve_actor (audit log)
//!               → is_exempt → WindowTracker::register_and_check → punish → LogSink
//! ```
//!
//! Each event runs in its own task. The window table is the only state shared
//! between tasks and every update to one key is exclusive, so a burst fires at
//! most once.

mod correlator;
mod event;
mod exemption;
mod log;
mod punish;
mod tracker;

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, warn};

pub use correlator::resolve_actor;
pub use event::{ActionEvent, ActionKind};
pub use exemption::is_exempt;
pub use log::LogSink;
pub use punish::{PunishmentOutcome, punish};
pub use tracker::WindowTracker;

use crate::gateway::Gateway;
use crate::settings::AntiNukeSettings;

/// Engine instance shared by every event handler.
pub struct AntiNuke {
    settings: RwLock<Arc<AntiNukeSettings>>,
    tracker: WindowTracker,
    sink: LogSink,
}

impl AntiNuke {
    pub fn new(settings: AntiNukeSettings) -> Self {
        Self {
            settings: RwLock::new(Arc::new(settings)),
            tracker: WindowTracker::new(),
            sink: LogSink::new(),
        }
    }

    /// Current settings snapshot.
    pub fn settings(&self) -> Arc<AntiNukeSettings> {
        self.settings.read().clone()
    }

    /// Swap in new settings and forget every tracked window.
    pub fn apply(&self, settings: AntiNukeSettings) {
        let mut current = self.settings.write();
        *current = Arc::new(settings);
        self.tracker.clear();
        self.sink.reset();
    }

    /// Number of (guild, actor, kind) windows currently tracked.
    pub fn tracked_windows(&self) -> usize {
        self.tracker.tracked_keys()
    }

    /// Run one event through the pipeline.
    ///
    /// Returns the punishment outcome when the event completed a burst.
    pub async fn handle(
        &self,
        gateway: &dyn Gateway,
        event: ActionEvent,
    ) -> Option<PunishmentOutcome> {
        let snapshot = self.settings();
        if !snapshot.monitors(event.guild_id) {
            return None;
        }
        if !snapshot.threshold(event.kind).is_active() {
            debug!("No threshold for {}, skipping", event.kind);
            return None;
        }

        let actor = resolve_actor(
            gateway,
            &self.sink,
            snapshot.log_channel_id,
            event.guild_id,
            event.kind,
            event.target_id,
        )
        .await?;

        // A reload may have landed during the lookup.
        let settings = self.settings();
        if !settings.monitors(event.guild_id) {
            return None;
        }
        if is_exempt(gateway, &settings, event.guild_id, actor) {
            debug!("{} by exempt actor {}", event.kind, actor);
            return None;
        }

        let key = (event.guild_id, actor, event.kind);
        let triggered = {
            let current = self.settings.read();
            self.tracker
                .register_and_check(key, current.threshold(event.kind), event.occurred_at)
        };
        if !triggered {
            debug!(
                "{} by {} in guild {}: {} in window",
                event.kind,
                actor,
                event.guild_id,
                self.tracker.window_len(&key)
            );
            return None;
        }

        warn!(
            "Anti-nuke triggered: {} exceeded the {} threshold in guild {}",
            actor, event.kind, event.guild_id
        );
        Some(punish(gateway, &self.sink, &settings, &event, actor).await)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use serenity::all::{ChannelId, GuildId, RoleId, UserId};

    use super::*;
    use crate::error::GatewayError;
    use crate::gateway::AuditRecord;
    use crate::gateway::mock::{Call, MockGateway};
    use crate::settings::{Punishment, Threshold};

    const GUILD: GuildId = GuildId::new(1);
    const LOG: ChannelId = ChannelId::new(77);
    const ACTOR: UserId = UserId::new(42);

    fn settings(count: u32) -> AntiNukeSettings {
        AntiNukeSettings {
            enabled: true,
            punishment: Punishment::Ban,
            log_channel_id: Some(LOG),
            thresholds: [(ActionKind::ChannelDelete, Threshold::new(count, 60))].into(),
            ..AntiNukeSettings::default()
        }
    }

    fn gateway_with_actor(actor: UserId) -> MockGateway {
        let gateway = MockGateway::new();
        gateway.channel_guilds.lock().insert(LOG, GUILD);
        *gateway.audit.lock() = Ok(vec![AuditRecord {
            target_id: Some(5),
            actor_id: Some(actor),
            created_at: Utc::now(),
        }]);
        gateway
    }

    fn delete() -> ActionEvent {
        ActionEvent::new(GUILD, ActionKind::ChannelDelete, Some(5), "#general".into())
    }

    fn bans(gateway: &MockGateway) -> usize {
        gateway
            .calls()
            .iter()
            .filter(|c| matches!(c, Call::Ban(_)))
            .count()
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_is_punished_once() {
        let engine = AntiNuke::new(settings(3));
        let gateway = gateway_with_actor(ACTOR);

        assert_eq!(engine.handle(&gateway, delete()).await, None);
        assert_eq!(engine.handle(&gateway, delete()).await, None);
        assert_eq!(
            engine.handle(&gateway, delete()).await,
            Some(PunishmentOutcome::Banned)
        );
        assert_eq!(bans(&gateway), 1);
        assert_eq!(engine.tracked_windows(), 0);

        // The next event opens a fresh window.
        assert_eq!(engine.handle(&gateway, delete()).await, None);
        assert_eq!(engine.tracker.window_len(&(GUILD, ACTOR, ActionKind::ChannelDelete)), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_uses_event_time_not_handling_time() {
        let engine = AntiNuke::new(settings(2));
        let gateway = gateway_with_actor(ACTOR);
        let stale = ActionEvent {
            occurred_at: Utc::now() - Duration::seconds(90),
            ..delete()
        };

        assert_eq!(engine.handle(&gateway, stale).await, None);
        assert_eq!(engine.handle(&gateway, delete()).await, None);
        assert_eq!(bans(&gateway), 0);
        assert_eq!(engine.tracker.window_len(&(GUILD, ACTOR, ActionKind::ChannelDelete)), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exempt_actor_is_never_tracked() {
        let engine = AntiNuke::new(AntiNukeSettings {
            exempt_user_ids: [ACTOR].into(),
            ..settings(1)
        });
        let gateway = gateway_with_actor(ACTOR);

        for _ in 0..10 {
            assert_eq!(engine.handle(&gateway, delete()).await, None);
        }
        assert_eq!(engine.tracked_windows(), 0);
        assert_eq!(bans(&gateway), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exempt_role_is_never_tracked() {
        let engine = AntiNuke::new(AntiNukeSettings {
            exempt_role_ids: [RoleId::new(500)].into(),
            ..settings(1)
        });
        let gateway = gateway_with_actor(ACTOR);
        gateway
            .cached_roles
            .lock()
            .insert((GUILD, ACTOR), vec![RoleId::new(500)]);

        assert_eq!(engine.handle(&gateway, delete()).await, None);
        assert_eq!(engine.tracked_windows(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unmonitored_guild_skips_audit_lookup() {
        let engine = AntiNuke::new(AntiNukeSettings {
            monitored_guild_ids: [GuildId::new(2)].into(),
            ..settings(1)
        });
        let gateway = gateway_with_actor(ACTOR);

        assert_eq!(engine.handle(&gateway, delete()).await, None);
        assert!(gateway.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_unconfigured_kind_skips_audit_lookup() {
        let engine = AntiNuke::new(settings(1));
        let gateway = gateway_with_actor(ACTOR);
        let event = ActionEvent::new(GUILD, ActionKind::RoleDelete, Some(5), "@mods".into());

        assert_eq!(engine.handle(&gateway, event).await, None);
        assert!(gateway.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_apply_clears_half_completed_burst() {
        let engine = AntiNuke::new(settings(2));
        let gateway = gateway_with_actor(ACTOR);

        assert_eq!(engine.handle(&gateway, delete()).await, None);
        assert_eq!(engine.tracked_windows(), 1);

        engine.apply(settings(2));
        assert_eq!(engine.tracked_windows(), 0);

        assert_eq!(engine.handle(&gateway, delete()).await, None);
        assert!(engine.handle(&gateway, delete()).await.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_disabled_engine_does_nothing() {
        let engine = AntiNuke::new(AntiNukeSettings {
            enabled: false,
            ..settings(1)
        });
        let gateway = gateway_with_actor(ACTOR);

        assert_eq!(engine.handle(&gateway, delete()).await, None);
        assert!(gateway.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_unattributed_event_is_dropped() {
        let engine = AntiNuke::new(settings(1));
        let gateway = gateway_with_actor(ACTOR);
        *gateway.audit.lock() = Err(GatewayError::Transport("timeout".into()));

        assert_eq!(engine.handle(&gateway, delete()).await, None);
        assert_eq!(engine.tracked_windows(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_events_fire_once() {
        let engine = Arc::new(AntiNuke::new(settings(4)));
        let gateway = Arc::new(gateway_with_actor(ACTOR));

        let tasks: Vec<_> = (0..4)
            .map(|_| {
                let engine = engine.clone();
                let gateway = gateway.clone();
                tokio::spawn(async move { engine.handle(gateway.as_ref(), delete()).await })
            })
            .collect();

        let mut fired = 0;
        for task in tasks {
            if task.await.unwrap().is_some() {
                fired += 1;
            }
        }
        assert_eq!(fired, 1);
        assert_eq!(bans(&gateway), 1);
    }
}
