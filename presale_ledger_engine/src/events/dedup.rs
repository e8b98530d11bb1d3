//! Notification deduplication.
//!
//! Webhook retries and duplicate polls would otherwise re-emit the same notification. The deduper
//! keeps a bounded, time-windowed map keyed by `(kind, user, metadata-hash)` with explicit
//! eviction. It is an injectable collaborator of the credit flow, not a process-global cache, and
//! callers pass `now` so the window is testable.

use std::{
    collections::HashMap,
    sync::{Mutex, PoisonError},
};

use blake2::{Blake2b512, Digest};
use chrono::{DateTime, Duration, Utc};
use log::trace;

use crate::events::NotificationKind;

const DEFAULT_WINDOW_SECS: i64 = 600;
const DEFAULT_MAX_ENTRIES: usize = 4096;

pub struct NotificationDeduper {
    window: Duration,
    max_entries: usize,
    seen: Mutex<HashMap<String, DateTime<Utc>>>,
}

impl Default for NotificationDeduper {
    fn default() -> Self {
        Self::new(Duration::seconds(DEFAULT_WINDOW_SECS), DEFAULT_MAX_ENTRIES)
    }
}

impl NotificationDeduper {
    pub fn new(window: Duration, max_entries: usize) -> Self {
        Self { window, max_entries, seen: Mutex::new(HashMap::new()) }
    }

    /// Whether a notification of `kind` for `user_id` with this metadata should go out, i.e. no
    /// identical notification was marked sent inside the window. Expired entries are evicted on
    /// every call; there are no background timers.
    pub fn should_send(&self, kind: NotificationKind, user_id: &str, metadata: &str, now: DateTime<Utc>) -> bool {
        let key = self.key(kind, user_id, metadata);
        let mut seen = self.seen.lock().unwrap_or_else(PoisonError::into_inner);
        seen.retain(|_, sent_at| now - *sent_at < self.window);
        !seen.contains_key(&key)
    }

    /// Records that the notification went out. Bounded: when the map is full, the oldest entry
    /// makes way.
    pub fn mark_sent(&self, kind: NotificationKind, user_id: &str, metadata: &str, now: DateTime<Utc>) {
        let key = self.key(kind, user_id, metadata);
        let mut seen = self.seen.lock().unwrap_or_else(PoisonError::into_inner);
        if seen.len() >= self.max_entries && !seen.contains_key(&key) {
            if let Some(oldest) = seen.iter().min_by_key(|(_, at)| **at).map(|(k, _)| k.clone()) {
                seen.remove(&oldest);
            }
        }
        trace!("📣️ Marking {} for {user_id} as sent", kind.as_str());
        seen.insert(key, now);
    }

    /// Explicitly drops every entry older than the window.
    pub fn evict_expired(&self, now: DateTime<Utc>) {
        let mut seen = self.seen.lock().unwrap_or_else(PoisonError::into_inner);
        seen.retain(|_, sent_at| now - *sent_at < self.window);
    }

    fn key(&self, kind: NotificationKind, user_id: &str, metadata: &str) -> String {
        let digest = Blake2b512::digest(metadata.as_bytes());
        format!("{}:{user_id}:{}", kind.as_str(), hex::encode(&digest[..16]))
    }
}
