use crate::models::Entry;
use dashmap::DashMap;
use std::time::{Duration, Instant};

/// Share key -> listing store with a per-slot time to live.
///
/// A miss is always safe: callers fall back to fetching the listing again.
pub trait ListingCache: Send + Sync {
    fn get(&self, public_key: &str) -> Option<Vec<Entry>>;

    /// Overwrites any previous slot for the key and restarts its TTL.
    fn put(&self, public_key: &str, entries: Vec<Entry>, ttl: Duration);

    /// Number of slots that have not expired yet. Expired slots are
    /// evicted along the way.
    fn live_listings(&self) -> usize;
}

struct CachedListing {
    entries: Vec<Entry>,
    /// `None` when the TTL reaches past what `Instant` can represent.
    expires_at: Option<Instant>,
}

impl CachedListing {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|expires_at| now < expires_at)
    }
}

/// Process-local cache. Expired slots are dropped when their key is read
/// and on every `live_listings` sweep.
#[derive(Default)]
pub struct InMemoryListingCache {
    slots: DashMap<String, CachedListing>,
}

impl InMemoryListingCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ListingCache for InMemoryListingCache {
    fn get(&self, public_key: &str) -> Option<Vec<Entry>> {
        let now = Instant::now();
        {
            let slot = self.slots.get(public_key)?;
            if slot.is_live(now) {
                return Some(slot.entries.clone());
            }
        }

        self.slots
            .remove_if(public_key, |_, slot| !slot.is_live(now));
        None
    }

    fn put(&self, public_key: &str, entries: Vec<Entry>, ttl: Duration) {
        let expires_at = Instant::now().checked_add(ttl);
        self.slots.insert(
            public_key.to_string(),
            CachedListing {
                entries,
                expires_at,
            },
        );
    }

    fn live_listings(&self) -> usize {
        let now = Instant::now();
        self.slots.retain(|_, slot| slot.is_live(now));
        self.slots.len()
    }
}
