//! Attributes a raw gateway event to the account that caused it.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serenity::all::{ChannelId, GuildId, UserId};
use tracing::{debug, warn};

use super::{ActionKind, LogSink};
use crate::gateway::{AuditRecord, Gateway};

/// Wait before reading the audit log so the entry has time to appear.
pub const PROPAGATION_DELAY: Duration = Duration::from_secs(1);
/// Audit entries scanned per lookup.
pub const AUDIT_SCAN_LIMIT: u8 = 5;
/// Entries older than this never match.
pub const MAX_ENTRY_AGE_SECS: i64 = 120;

/// Look up the actor behind an action.
///
/// Failures never surface: a missing audit-log permission is reported to the
/// log channel (once per guild per dedupe window), anything else is traced.
pub async fn resolve_actor(
    gateway: &dyn Gateway,
    sink: &LogSink,
    log_channel: Option<ChannelId>,
    guild_id: GuildId,
    kind: ActionKind,
    target_id: Option<u64>,
) -> Option<UserId> {
    tokio::time::sleep(PROPAGATION_DELAY).await;

    let records = match gateway.audit_log(guild_id, kind, AUDIT_SCAN_LIMIT).await {
        Ok(records) => records,
        Err(e) if e.is_permission() => {
            let text = format!(
                "⚠️ Anti-nuke cannot read the audit log ({}). Grant the View Audit Log permission.",
                e
            );
            sink.report_once(gateway, guild_id, log_channel, &text).await;
            return None;
        }
        Err(e) => {
            warn!("Audit log lookup failed for {} in guild {}: {}", kind, guild_id, e);
            return None;
        }
    };

    let actor = first_match(&records, target_id, Utc::now());
    if actor.is_none() {
        debug!(
            "No audit entry for {} (target {:?}) in guild {}",
            kind, target_id, guild_id
        );
    }
    actor
}

/// First record that hits the target, is recent enough and names an actor.
fn first_match(
    records: &[AuditRecord],
    target_id: Option<u64>,
    now: DateTime<Utc>,
) -> Option<UserId> {
    records
        .iter()
        .filter(|record| target_id.is_none() || record.target_id == target_id)
        .filter(|record| (now - record.created_at).num_seconds() <= MAX_ENTRY_AGE_SECS)
        .find_map(|record| record.actor_id)
}
