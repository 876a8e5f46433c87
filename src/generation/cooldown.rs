//! Per-author cooldown gate for expensive generation calls

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

/// What a cooldown key is made of
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CooldownScope {
    /// One window per author, across channels
    #[default]
    Author,
    /// One window per author in each channel
    AuthorInChannel,
}

/// Outcome of a cooldown check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CooldownDecision {
    /// The action may run; the send time has been recorded
    Proceed,
    /// Still cooling down; tell the author once
    Notify {
        /// Time left in the window
        remaining: Duration,
    },
    /// Still cooling down and already notified this window
    Suppress,
}

#[derive(Debug, Default, Clone, Copy)]
struct CooldownEntry {
    last_sent: Option<Instant>,
    last_notified: Option<Instant>,
}

/// Rate limiter that allows one action per window and throttles its own
/// "please wait" notices to one per window
///
/// Entries are never evicted.
#[derive(Debug)]
pub struct CooldownGate {
    cooldown: Duration,
    channel_overrides: HashMap<String, Duration>,
    scope: CooldownScope,
    entries: Mutex<HashMap<String, CooldownEntry>>,
}

impl CooldownGate {
    /// Create a gate with the given default window
    #[must_use]
    pub fn new(cooldown: Duration, scope: CooldownScope) -> Self {
        Self {
            cooldown,
            channel_overrides: HashMap::new(),
            scope,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Use a different window in specific channels
    #[must_use]
    pub fn with_channel_overrides(mut self, overrides: HashMap<String, Duration>) -> Self {
        self.channel_overrides = overrides;
        self
    }

    /// Window that applies in a channel
    #[must_use]
    pub fn cooldown_for(&self, channel_id: &str) -> Duration {
        self.channel_overrides
            .get(channel_id)
            .copied()
            .unwrap_or(self.cooldown)
    }

    /// Check and record a request made now
    pub fn check(&self, author: &str, channel_id: &str) -> CooldownDecision {
        self.check_at(author, channel_id, Instant::now())
    }

    /// Check and record a request made at `now`
    pub fn check_at(&self, author: &str, channel_id: &str, now: Instant) -> CooldownDecision {
        let cooldown = self.cooldown_for(channel_id);
        let key = match self.scope {
            CooldownScope::Author => author.to_string(),
            CooldownScope::AuthorInChannel => format!("{channel_id}:{author}"),
        };

        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let entry = entries.entry(key).or_default();

        let elapsed = entry.last_sent.map(|sent| now.duration_since(sent));
        match elapsed {
            Some(elapsed) if elapsed < cooldown => {
                let notified_recently = entry
                    .last_notified
                    .is_some_and(|at| now.duration_since(at) < cooldown);
                if notified_recently {
                    CooldownDecision::Suppress
                } else {
                    entry.last_notified = Some(now);
                    CooldownDecision::Notify {
                        remaining: cooldown - elapsed,
                    }
                }
            }
            _ => {
                entry.last_sent = Some(now);
                CooldownDecision::Proceed
            }
        }
    }

    /// Number of keys tracked
    #[must_use]
    pub fn tracked(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
