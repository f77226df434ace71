// src/staleness.rs
//! Per-category freshness rules.

/// Stale iff no prior update is recorded or `now - last > refresh_interval`.
///
/// Exactly at the interval boundary the snapshot is still fresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StalenessPolicy {
    pub refresh_interval_secs: u64,
}

impl StalenessPolicy {
    pub fn new(refresh_interval_secs: u64) -> Self {
        Self {
            refresh_interval_secs,
        }
    }

    pub fn is_stale(&self, last_update: Option<i64>, now: i64) -> bool {
        match last_update {
            None => true,
            Some(last) => {
                let age = now.saturating_sub(last);
                age > 0 && age as u64 > self.refresh_interval_secs
            }
        }
    }

    /// `force` always wins.
    pub fn needs_refresh(&self, last_update: Option<i64>, now: i64, force: bool) -> bool {
        force || self.is_stale(last_update, now)
    }
}

/// Exponential hold-off after consecutive empty fetches.
///
/// With a streak of `n >= 1`, the live tier is skipped until
/// `base * 2^(n-1)` seconds (capped at `max`) have passed since the last
/// empty fetch. `base == 0` disables it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmptyBackoff {
    pub base_secs: u64,
    pub max_secs: u64,
}

impl EmptyBackoff {
    pub fn disabled() -> Self {
        Self {
            base_secs: 0,
            max_secs: 0,
        }
    }

    pub fn delay_secs(&self, streak: u32) -> u64 {
        if self.base_secs == 0 || streak == 0 {
            return 0;
        }
        let shift = (streak - 1).min(20);
        self.base_secs
            .saturating_mul(1u64 << shift)
            .min(self.max_secs.max(self.base_secs))
    }
}

/// In-memory record of empty results for one category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EmptyStreak {
    pub count: u32,
    pub last_empty_at: Option<i64>,
}

impl EmptyStreak {
    pub fn record_empty(&mut self, now: i64) {
        self.count = self.count.saturating_add(1);
        self.last_empty_at = Some(now);
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Whether `backoff` currently holds off the live tier.
    pub fn holds_off(&self, backoff: &EmptyBackoff, now: i64) -> bool {
        match self.last_empty_at {
            Some(at) if self.count > 0 => {
                let wait = backoff.delay_secs(self.count) as i64;
                wait > 0 && now.saturating_sub(at) < wait
            }
            _ => false,
        }
    }
}
