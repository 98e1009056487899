//! Sliding-window rate limiter with a cool-down block period.
//!
//! Keys are arbitrary strings (`ip:1.2.3.4`, `prefix:sk_live_abcd`,
//! `login:1.2.3.4`). State lives in a process-wide map; a multi-instance
//! deployment needs an external store for consistent limits.

use std::time::{Duration, Instant};

use dashmap::DashMap;

/// Default attempt window: 1 minute.
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(60);

/// Default attempts allowed per window.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 10;

/// Default block applied after the window is exhausted: 5 minutes.
pub const DEFAULT_BLOCK_DURATION: Duration = Duration::from_secs(5 * 60);

/// Tunable limiter parameters. Tests use short durations.
#[derive(Debug, Clone, Copy)]
pub struct RateLimiterConfig {
    pub window: Duration,
    pub max_attempts: u32,
    pub block_duration: Duration,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            window: DEFAULT_WINDOW,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            block_duration: DEFAULT_BLOCK_DURATION,
        }
    }
}

/// Per-key attempt state.
#[derive(Debug, Clone)]
struct RateLimitEntry {
    attempts: u32,
    window_start: Instant,
    blocked_until: Option<Instant>,
}

/// Sliding fixed-window rate limiter.
///
/// The per-key read-modify-write happens under the map's per-entry lock, so
/// concurrent `allow` calls for the same key are effectively atomic.
#[derive(Debug, Default)]
pub struct RateLimiter {
    entries: DashMap<String, RateLimitEntry>,
    config: RateLimiterConfig,
}

impl RateLimiter {
    /// Create a limiter with the given parameters.
    pub fn new(config: RateLimiterConfig) -> Self {
        Self {
            entries: DashMap::new(),
            config,
        }
    }

    /// Record an attempt for `key`, returning whether it is allowed.
    ///
    /// Exactly `max_attempts` calls succeed inside one window; the next call
    /// sets a block and is denied. Once the block elapses, state resets on
    /// the following call.
    pub fn allow(&self, key: &str) -> bool {
        let now = Instant::now();
        let mut entry = self
            .entries
            .entry(key.to_string())
            .or_insert_with(|| RateLimitEntry {
                attempts: 0,
                window_start: now,
                blocked_until: None,
            });

        if let Some(until) = entry.blocked_until {
            if now < until {
                return false;
            }
            entry.attempts = 0;
            entry.window_start = now;
            entry.blocked_until = None;
        }

        if now.duration_since(entry.window_start) > self.config.window {
            entry.attempts = 0;
            entry.window_start = now;
        }

        entry.attempts += 1;
        if entry.attempts > self.config.max_attempts {
            entry.blocked_until = Some(now + self.config.block_duration);
            return false;
        }
        true
    }

    /// Clear all state for a key immediately.
    ///
    /// Called on successful authentication so legitimate users are not
    /// punished for earlier failed attempts.
    pub fn reset(&self, key: &str) {
        self.entries.remove(key);
    }

    /// Evict entries whose window has expired and which are not blocked.
    ///
    /// Run periodically from a background task to bound memory.
    pub fn sweep(&self) {
        let now = Instant::now();
        let window = self.config.window;
        self.entries.retain(|_, entry| {
            if let Some(until) = entry.blocked_until {
                return now < until;
            }
            now.duration_since(entry.window_start) <= window
        });
    }

    /// Number of tracked keys (for observability and tests).
    pub fn tracked_keys(&self) -> usize {
        self.entries.len()
    }
}
