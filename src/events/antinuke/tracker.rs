//! Sliding-window counter for attributed privileged actions.

use std::collections::VecDeque;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use serenity::all::{GuildId, UserId};

use super::ActionKind;
use crate::settings::Threshold;

/// Window key: one actor's actions of one kind in one guild.
pub type WindowKey = (GuildId, UserId, ActionKind);

/// Per-key timestamp windows (in-memory, sharded).
///
/// Each update holds the shard lock for the key's entry, so append, prune
/// and compare-and-reset happen as one step per key.
#[derive(Clone, Default)]
pub struct WindowTracker {
    windows: Arc<DashMap<WindowKey, VecDeque<DateTime<Utc>>>>,
}

impl WindowTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an action and report whether the threshold was reached.
    ///
    /// On trigger the key is removed, so the next action starts a fresh window.
    pub fn register_and_check(
        &self,
        key: WindowKey,
        threshold: Threshold,
        timestamp: DateTime<Utc>,
    ) -> bool {
        if !threshold.is_active() {
            return false;
        }

        let window = Duration::seconds(threshold.window_seconds.min(i64::MAX as u64) as i64);
        let mut entry = match self.windows.entry(key) {
            Entry::Occupied(entry) => entry,
            Entry::Vacant(entry) => entry.insert_entry(VecDeque::new()),
        };

        let timestamps = entry.get_mut();
        timestamps.push_back(timestamp);
        while let Some(front) = timestamps.front()
            && timestamp - *front > window
        {
            timestamps.pop_front();
        }

        if timestamps.len() < threshold.count as usize {
            return false;
        }

        // Reset under the same entry lock so concurrent updates cannot both fire.
        entry.remove();
        true
    }

    /// Number of timestamps currently held for a key.
    pub fn window_len(&self, key: &WindowKey) -> usize {
        self.windows.get(key).map(|w| w.len()).unwrap_or(0)
    }

    /// Drop every tracked window.
    pub fn clear(&self) {
        self.windows.clear();
    }

    /// Number of keys with a live window.
    pub fn tracked_keys(&self) -> usize {
        self.windows.len()
    }
}
