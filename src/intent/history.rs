//! Bounded rolling histories for stateful predictors

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};

use sha2::{Digest, Sha256};

/// Number of recent authors remembered by [`AuthorHistory`]
pub const AUTHOR_HISTORY_CAPACITY: usize = 50;

/// Fixed-capacity FIFO; the oldest entry is evicted first
#[derive(Debug, Clone)]
pub struct RollingHistory<T> {
    entries: VecDeque<T>,
    capacity: usize,
}

impl<T> RollingHistory<T> {
    /// Create an empty history holding at most `capacity` entries
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append an entry, evicting the oldest when full
    pub fn push(&mut self, entry: T) {
        if self.capacity == 0 {
            return;
        }
        if self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    /// Entries from oldest to newest
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.entries.iter()
    }

    /// Number of entries held
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Maximum number of entries
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }
}

/// Recent message authors, each keyed by a hash of arrival time and name
///
/// Shared between a predictor (which records) and its handler (which reads).
#[derive(Debug)]
pub struct AuthorHistory {
    entries: Mutex<RollingHistory<(u128, String)>>,
}

impl Default for AuthorHistory {
    fn default() -> Self {
        Self {
            entries: Mutex::new(RollingHistory::new(AUTHOR_HISTORY_CAPACITY)),
        }
    }
}

impl AuthorHistory {
    /// Record an author seen now
    pub fn record(&self, author: &str) {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        self.record_with_key(author_key(nanos, author), author);
    }

    /// Record an author under an explicit key
    pub fn record_with_key(&self, key: u128, author: &str) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((key, author.to_string()));
    }

    /// The author holding the greatest key, if any
    #[must_use]
    pub fn best(&self) -> Option<String> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .max_by_key(|(key, _)| *key)
            .map(|(_, name)| name.clone())
    }

    /// Authors from oldest to newest
    #[must_use]
    pub fn authors(&self) -> Vec<String> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, name)| name.clone())
            .collect()
    }
}

/// Hash of the timestamp and author, truncated to 128 bits
fn author_key(nanos: u128, author: &str) -> u128 {
    let digest = Sha256::digest(format!("{nanos}{author}").as_bytes());
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&digest[..16]);
    u128::from_be_bytes(bytes)
}
