//! In-memory response cache: exact lookup by fingerprint key, a
//! similarity-scored fallback for near-duplicate prompts, LRU eviction by
//! `last_accessed_at`, and TTL expiry.

use chrono::Utc;
use gateway_core::{CacheEntry, Message};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Point-in-time cache statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CacheStats {
    /// Current number of live entries.
    pub size: usize,
    /// Configured capacity.
    pub max_size: usize,
    /// Lifetime hit count (reset only by `clear`).
    pub hits: u64,
    /// Lifetime miss count (reset only by `clear`).
    pub misses: u64,
    /// `hits / (hits + misses)`, or `0.0` with no lookups yet.
    pub hit_rate: f64,
}

/// A stored entry plus the query text its key was derived from, kept
/// around only so `get_similar` has something to compare against — the
/// key itself is a one-way hash and cannot be un-hashed back into text.
struct Stored {
    entry: CacheEntry,
    query: String,
}

struct Inner {
    entries: HashMap<String, Stored>,
}

/// The Router's (and, standalone, any caller's) response cache.
pub struct ResponseCache {
    inner: Mutex<Inner>,
    max_size: usize,
    ttl: Duration,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl ResponseCache {
    /// Construct an empty cache with the given capacity and entry TTL.
    #[must_use]
    pub fn new(max_size: usize, ttl: Duration) -> Self {
        Self {
            inner: Mutex::new(Inner {
                entries: HashMap::new(),
            }),
            max_size,
            ttl,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Derive the fingerprint key for a message list: the joined
    /// `"role:content"` atoms run through a 32-bit polynomial hash,
    /// rendered in radix-36.
    #[must_use]
    pub fn fingerprint(messages: &[Message]) -> String {
        let joined = messages
            .iter()
            .map(Message::fingerprint_atom)
            .collect::<Vec<_>>()
            .join("|");
        fingerprint_key(&joined)
    }

    /// Exact lookup. Expired entries read as absent (and are dropped).
    /// On hit, bumps `access_count` and refreshes `last_accessed_at`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<CacheEntry> {
        let mut inner = self.inner.lock();
        let Some(stored) = inner.entries.get(key) else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            return None;
        };

        if self.is_expired(&stored.entry) {
            inner.entries.remove(key);
            self.misses.fetch_add(1, Ordering::Relaxed);
            return None;
        }

        let stored = inner.entries.get_mut(key).expect("checked above");
        stored.entry.access_count += 1;
        stored.entry.last_accessed_at = Utc::now();
        self.hits.fetch_add(1, Ordering::Relaxed);
        Some(stored.entry.clone())
    }

    /// Whether an unexpired entry exists for `key`, without affecting
    /// the hit/miss counters. Lets a caller probe the exact key before
    /// falling back to [`ResponseCache::get_similar`] without booking
    /// two lookups for what is logically one.
    #[must_use]
    pub fn contains_fresh(&self, key: &str) -> bool {
        let inner = self.inner.lock();
        inner
            .entries
            .get(key)
            .is_some_and(|stored| !self.is_expired(&stored.entry))
    }

    /// Linear scan for the best near-duplicate above `threshold`. Also
    /// updates access stats on whichever entry (if any) is returned.
    #[must_use]
    pub fn get_similar(&self, messages: &[Message], threshold: f64) -> Option<CacheEntry> {
        let query = messages
            .iter()
            .map(Message::fingerprint_atom)
            .collect::<Vec<_>>()
            .join("|");

        let mut inner = self.inner.lock();
        let now = Utc::now();

        let expired: Vec<String> = inner
            .entries
            .iter()
            .filter(|(_, s)| self.is_expired(&s.entry))
            .map(|(k, _)| k.clone())
            .collect();
        for key in expired {
            inner.entries.remove(&key);
        }

        let best_key = inner
            .entries
            .iter()
            .map(|(k, s)| (k.clone(), dice_similarity(&query, &s.query)))
            .filter(|(_, score)| *score > threshold)
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(k, _)| k);

        match best_key {
            Some(key) => {
                let stored = inner.entries.get_mut(&key).expect("key from this map");
                stored.entry.access_count += 1;
                stored.entry.last_accessed_at = now;
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(stored.entry.clone())
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Insert a new entry for `messages`, evicting the LRU entry first
    /// if at capacity. The key is derived from `messages` the same way
    /// [`ResponseCache::fingerprint`] does; the joined query text is
    /// retained internally so `get_similar` has something to score
    /// against later (the key itself, being a hash, cannot be un-hashed
    /// back into text).
    ///
    /// Returns the fingerprint key the entry was stored under.
    pub fn set(
        &self,
        messages: &[Message],
        content: impl Into<String>,
        provider: impl Into<String>,
        model: impl Into<String>,
        quality: f64,
    ) -> String {
        let query = messages
            .iter()
            .map(Message::fingerprint_atom)
            .collect::<Vec<_>>()
            .join("|");
        let key = fingerprint_key(&query);
        let entry = CacheEntry::new(key.clone(), content, provider, model, quality);

        let mut inner = self.inner.lock();
        if !inner.entries.contains_key(&key) && inner.entries.len() >= self.max_size {
            if let Some(lru_key) = inner
                .entries
                .iter()
                .min_by_key(|(_, s)| s.entry.last_accessed_at)
                .map(|(k, _)| k.clone())
            {
                inner.entries.remove(&lru_key);
            }
        }
        inner.entries.insert(key.clone(), Stored { entry, query });
        key
    }

    /// Current statistics.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        let size = self.inner.lock().entries.len();
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        let hit_rate = if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        };

        CacheStats {
            size,
            max_size: self.max_size,
            hits,
            misses,
            hit_rate,
        }
    }

    /// Drop all entries and reset hit/miss counters.
    pub fn clear(&self) {
        self.inner.lock().entries.clear();
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
    }

    fn is_expired(&self, entry: &CacheEntry) -> bool {
        let age = Utc::now().signed_duration_since(entry.stored_at);
        age.to_std().map(|a| a > self.ttl).unwrap_or(false)
    }
}

/// `hash = ((hash << 5) - hash) + charCode(c); hash &= hash`, carried
/// out in wrapping 32-bit arithmetic; the final value is rendered
/// absolute and in radix-36. Mirrors the reference string-hash used
/// throughout spec.md for deterministic fingerprinting.
#[must_use]
pub fn fingerprint_key(s: &str) -> String {
    let mut hash: i32 = 0;
    for c in s.chars() {
        hash = hash
            .wrapping_shl(5)
            .wrapping_sub(hash)
            .wrapping_add(c as i32);
    }
    to_radix36(hash.unsigned_abs())
}

fn to_radix36(mut n: u32) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if n == 0 {
        return "0".to_string();
    }
    let mut buf = Vec::new();
    while n > 0 {
        buf.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    buf.reverse();
    String::from_utf8(buf).expect("radix-36 digits are ASCII")
}

/// Word-set Dice coefficient: lowercase both strings, split on
/// whitespace, drop tokens of length ≤ 2, and compare the resulting
/// sets. Exact match after lowercasing short-circuits to `1.0`.
#[must_use]
pub fn dice_similarity(a: &str, b: &str) -> f64 {
    let a_lower = a.to_lowercase();
    let b_lower = b.to_lowercase();
    if a_lower == b_lower {
        return 1.0;
    }

    let set_of = |s: &str| -> std::collections::HashSet<String> {
        s.split_whitespace()
            .filter(|t| t.len() > 2)
            .map(ToString::to_string)
            .collect()
    };

    let set_a = set_of(&a_lower);
    let set_b = set_of(&b_lower);
    if set_a.is_empty() || set_b.is_empty() {
        return 0.0;
    }

    let intersection = set_a.intersection(&set_b).count();
    (2.0 * intersection as f64) / (set_a.len() + set_b.len()) as f64
}
