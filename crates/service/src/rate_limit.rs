//! In-process cooldown limiter for the monthly sync endpoint. One bucket per
//! key (the caller identity), refused while the previous acquisition is
//! younger than the cooldown. State is per-process and lost on restart.

use std::time::{Duration, Instant};

use dashmap::DashMap;

pub const SYNC_COOLDOWN: Duration = Duration::from_secs(60);

#[derive(Debug)]
pub struct SyncRateLimiter {
    cooldown: Duration,
    last_seen: DashMap<String, Instant>,
}

impl Default for SyncRateLimiter {
    fn default() -> Self {
        Self::new(SYNC_COOLDOWN)
    }
}

impl SyncRateLimiter {
    pub fn new(cooldown: Duration) -> Self {
        Self { cooldown, last_seen: DashMap::new() }
    }

    /// Try to take the slot for `key`. On refusal returns the remaining
    /// cooldown.
    pub fn try_acquire(&self, key: &str) -> Result<(), Duration> {
        use dashmap::mapref::entry::Entry;
        let now = Instant::now();
        match self.last_seen.entry(key.to_string()) {
            Entry::Occupied(mut taken) => {
                let elapsed = now.duration_since(*taken.get());
                if elapsed < self.cooldown {
                    return Err(self.cooldown - elapsed);
                }
                taken.insert(now);
                Ok(())
            }
            Entry::Vacant(free) => {
                free.insert(now);
                Ok(())
            }
        }
    }
}
