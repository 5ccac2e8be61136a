use crate::platform::Platform;

use chrono::{DateTime, Duration, Utc};
use log::{trace, warn};
use serenity::model::id::ChannelId;
use std::collections::HashMap;
use std::ops::Deref;
use std::sync::{Arc, Mutex, PoisonError};

#[derive(Debug)]
struct CacheEntry {
    name: String,
    cached_at: DateTime<Utc>,
    pending_ops: usize,
}

type Entries = Arc<Mutex<HashMap<ChannelId, CacheEntry>>>;

fn lock(entries: &Entries) -> std::sync::MutexGuard<'_, HashMap<ChannelId, CacheEntry>> {
    entries.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Caches thread names looked up from discord. Entries are reference counted
/// while in use and the sweep only evicts entries that are both past their
/// ttl and no longer in use.
#[derive(Debug)]
pub struct ThreadNameCache {
    ttl: Duration,
    entries: Entries,
}

/// A resolved thread name. Holding it keeps the cache entry alive, dropping
/// it releases the entry.
#[derive(Debug)]
pub struct ThreadName {
    name: String,
    channel_id: ChannelId,
    // None when the lookup failed and `name` is the raw id
    entries: Option<Entries>,
}

impl ThreadName {
    /// True if discord couldn't be asked and the name is just the id.
    #[inline]
    pub const fn is_fallback(&self) -> bool {
        self.entries.is_none()
    }
}

impl Deref for ThreadName {
    type Target = str;

    fn deref(&self) -> &str {
        &self.name
    }
}

impl Drop for ThreadName {
    fn drop(&mut self) {
        if let Some(entries) = &self.entries {
            match lock(entries).get_mut(&self.channel_id) {
                Some(entry) if entry.pending_ops > 0 => entry.pending_ops -= 1,
                _ => warn!("released thread name {} with no pending ops", self.channel_id),
            }
        }
    }
}

impl ThreadNameCache {
    pub fn new(ttl: Duration) -> ThreadNameCache {
        ThreadNameCache {
            ttl,
            entries: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn lease(&self, channel_id: ChannelId, name: String) -> ThreadName {
        ThreadName {
            name,
            channel_id,
            entries: Some(Arc::clone(&self.entries)),
        }
    }

    pub async fn acquire<P: Platform>(
        &self,
        platform: &P,
        channel_id: ChannelId,
        now: DateTime<Utc>,
    ) -> ThreadName {
        let cached = lock(&self.entries).get_mut(&channel_id).map(|entry| {
            entry.pending_ops += 1;
            entry.name.clone()
        });
        if let Some(name) = cached {
            trace!("thread {channel_id} in cache");
            return self.lease(channel_id, name);
        }

        match platform.channel_name(channel_id).await {
            Ok(name) => {
                // another caller may have filled the entry while we were waiting
                let mut entries = lock(&self.entries);
                let entry = entries.entry(channel_id).or_insert_with(|| CacheEntry {
                    name,
                    cached_at: now,
                    pending_ops: 0,
                });
                entry.pending_ops += 1;
                let name = entry.name.clone();
                drop(entries);
                self.lease(channel_id, name)
            }
            Err(why) => {
                warn!("failed to look up name for {channel_id}, using id: {why}");
                ThreadName {
                    name: channel_id.to_string(),
                    channel_id,
                    entries: None,
                }
            }
        }
    }

    /// Evicts entries older than the ttl with nothing pending on them.
    pub fn sweep(&self, now: DateTime<Utc>) -> usize {
        let ttl = self.ttl;
        let mut entries = lock(&self.entries);
        let before = entries.len();
        entries.retain(|channel_id, entry| {
            let keep = entry.pending_ops > 0 || now.signed_duration_since(entry.cached_at) <= ttl;
            if !keep {
                trace!("evicting thread name for {channel_id}");
            }
            keep
        });
        before - entries.len()
    }

    #[cfg(test)]
    fn pending_ops(&self, channel_id: ChannelId) -> Option<usize> {
        lock(&self.entries).get(&channel_id).map(|e| e.pending_ops)
    }
}
