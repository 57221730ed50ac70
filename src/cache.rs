// Ephemeral folder-listing cache, keyed by a session token suffix.
//
// Entries are pure reconstructable projections of upstream state; the
// last write for a key wins and that race is benign.
use crate::schemas::FolderStat;
use dashmap::DashMap;
use std::time::{Duration, Instant};

/// Length of the token suffix used as the cache key. Suffix collisions
/// across distinct tokens are an accepted risk, not a goal.
const CACHE_KEY_SUFFIX_LEN: usize = 12;

/// Hard cap on tracked keys; the sweep on `put` keeps the map from
/// growing without bound under token churn.
const MAX_ENTRIES: usize = 4096;

struct CacheEntry {
    expires_at: Instant,
    payload: Vec<FolderStat>,
}

/// Constructor-injected cache service owned by the app state; handlers
/// receive it through dependency injection rather than a module global.
pub struct FolderCache {
    entries: DashMap<String, CacheEntry>,
    ttl: Duration,
}

impl FolderCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    pub fn cache_key(token: &str) -> String {
        let chars: Vec<char> = token.chars().collect();
        let start = chars.len().saturating_sub(CACHE_KEY_SUFFIX_LEN);
        chars[start..].iter().collect()
    }

    /// Returns the cached payload only while it is still within its TTL.
    pub fn get(&self, token: &str) -> Option<Vec<FolderStat>> {
        let key = Self::cache_key(token);
        let entry = self.entries.get(&key)?;
        if Instant::now() < entry.expires_at {
            Some(entry.payload.clone())
        } else {
            None
        }
    }

    /// Unconditionally overwrites the entry for this token's key.
    pub fn put(&self, token: &str, payload: Vec<FolderStat>) {
        let now = Instant::now();
        self.entries.retain(|_, entry| entry.expires_at > now);
        if self.entries.len() >= MAX_ENTRIES {
            self.entries.clear();
        }
        self.entries.insert(
            Self::cache_key(token),
            CacheEntry {
                expires_at: now + self.ttl,
                payload,
            },
        );
    }

    /// Drops the entry for this token. Called by mutation endpoints so a
    /// follow-up listing reflects the change before the TTL elapses.
    pub fn invalidate(&self, token: &str) {
        self.entries.remove(&Self::cache_key(token));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
