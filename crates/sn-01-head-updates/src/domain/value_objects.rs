//! Value objects for pipeline configuration and bounded state.

use chrono::{DateTime, Duration, Utc};
use std::collections::{HashMap, HashSet, VecDeque};

/// Default number of signatures remembered for dedup.
pub const DEFAULT_REPLAY_CAPACITY: usize = 200;

/// Default rate window in seconds.
pub const DEFAULT_RATE_WINDOW_SECS: u64 = 60;

/// Default accepted updates per source per window.
pub const DEFAULT_RATE_MAX_PER_WINDOW: u32 = 30;

/// Default allowed clock skew in seconds.
pub const DEFAULT_MAX_SKEW_SECS: u64 = 300;

/// Rate-limiter entries kept before expired windows are pruned.
const RATE_PRUNE_THRESHOLD: usize = 1024;

/// Head-update pipeline configuration.
#[derive(Clone, Debug)]
pub struct PipelineConfig {
    /// Replay cache capacity.
    pub replay_capacity: usize,
    /// Rate window length.
    pub rate_window: Duration,
    /// Updates allowed per source per window.
    pub rate_max_per_window: u32,
    /// Maximum `|now - issuedAt|`.
    pub max_skew: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            replay_capacity: DEFAULT_REPLAY_CAPACITY,
            rate_window: Duration::seconds(DEFAULT_RATE_WINDOW_SECS as i64),
            rate_max_per_window: DEFAULT_RATE_MAX_PER_WINDOW,
            max_skew: Duration::seconds(DEFAULT_MAX_SKEW_SECS as i64),
        }
    }
}

impl PipelineConfig {
    /// Small limits for tests.
    pub fn for_testing() -> Self {
        Self {
            replay_capacity: 8,
            rate_window: Duration::seconds(10),
            rate_max_per_window: 3,
            max_skew: Duration::seconds(60),
        }
    }
}

/// Bounded set of recently accepted signatures; the oldest is evicted.
#[derive(Debug)]
pub struct ReplayCache {
    order: VecDeque<String>,
    members: HashSet<String>,
    capacity: usize,
}

impl ReplayCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            order: VecDeque::with_capacity(capacity),
            members: HashSet::with_capacity(capacity),
            capacity,
        }
    }

    /// Check if a signature has been recorded.
    pub fn contains(&self, signature: &str) -> bool {
        self.members.contains(signature)
    }

    /// Record a signature. Returns `false` if it was already present.
    pub fn insert(&mut self, signature: &str) -> bool {
        if self.members.contains(signature) {
            return false;
        }
        if self.order.len() >= self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.members.remove(&oldest);
            }
        }
        self.order.push_back(signature.to_string());
        self.members.insert(signature.to_string());
        true
    }

    /// Forget a signature so a redelivery is processed again.
    pub fn remove(&mut self, signature: &str) {
        if self.members.remove(signature) {
            self.order.retain(|s| s != signature);
        }
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// Result of counting one update against its source's window.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RateDecision {
    /// Within budget.
    Allowed,
    /// Over budget. `warn` is true only for the first rejection in the
    /// current window.
    Limited { warn: bool },
}

#[derive(Clone, Debug)]
struct SourceWindow {
    window_start: DateTime<Utc>,
    count: u32,
    warned: bool,
}

/// Fixed-window counter per source.
#[derive(Debug)]
pub struct SourceRateLimiter {
    windows: HashMap<String, SourceWindow>,
    window: Duration,
    max_per_window: u32,
}

impl SourceRateLimiter {
    pub fn new(window: Duration, max_per_window: u32) -> Self {
        Self {
            windows: HashMap::new(),
            window,
            max_per_window,
        }
    }

    /// Count an update from `source` at `now`.
    pub fn record(&mut self, source: &str, now: DateTime<Utc>) -> RateDecision {
        if self.windows.len() >= RATE_PRUNE_THRESHOLD && !self.windows.contains_key(source) {
            self.prune(now);
        }

        let window = self.window;
        let entry = self
            .windows
            .entry(source.to_string())
            .or_insert_with(|| SourceWindow {
                window_start: now,
                count: 0,
                warned: false,
            });

        // Reset window once it has fully elapsed
        if now - entry.window_start >= window {
            entry.window_start = now;
            entry.count = 0;
            entry.warned = false;
        }

        entry.count = entry.count.saturating_add(1);
        if entry.count <= self.max_per_window {
            return RateDecision::Allowed;
        }

        let warn = !entry.warned;
        entry.warned = true;
        RateDecision::Limited { warn }
    }

    /// Drop windows that have expired.
    pub fn prune(&mut self, now: DateTime<Utc>) {
        let window = self.window;
        self.windows.retain(|_, w| now - w.window_start < window);
    }

    /// Number of tracked sources.
    pub fn tracked_sources(&self) -> usize {
        self.windows.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_replay_cache_evicts_oldest() {
        let mut cache = ReplayCache::new(3);
        for sig in ["a", "b", "c", "d"] {
            assert!(cache.insert(sig));
        }
        assert_eq!(cache.len(), 3);
        assert!(!cache.contains("a"));
        assert!(cache.contains("d"));
    }

    #[test]
    fn test_replay_cache_rejects_duplicate_insert() {
        let mut cache = ReplayCache::new(3);
        assert!(cache.insert("a"));
        assert!(!cache.insert("a"));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_replay_cache_remove() {
        let mut cache = ReplayCache::new(3);
        cache.insert("a");
        cache.insert("b");
        cache.remove("a");
        assert!(!cache.contains("a"));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_rate_limit_threshold() {
        let mut limiter = SourceRateLimiter::new(Duration::seconds(60), 30);
        for _ in 0..30 {
            assert_eq!(limiter.record("alice", t0()), RateDecision::Allowed);
        }
        assert_eq!(
            limiter.record("alice", t0()),
            RateDecision::Limited { warn: true }
        );
        assert_eq!(
            limiter.record("alice", t0()),
            RateDecision::Limited { warn: false }
        );
        // Other sources have their own budget
        assert_eq!(limiter.record("bob", t0()), RateDecision::Allowed);
    }

    #[test]
    fn test_rate_limit_window_resets() {
        let mut limiter = SourceRateLimiter::new(Duration::seconds(60), 1);
        assert_eq!(limiter.record("alice", t0()), RateDecision::Allowed);
        assert!(matches!(
            limiter.record("alice", t0() + Duration::seconds(59)),
            RateDecision::Limited { .. }
        ));
        assert_eq!(
            limiter.record("alice", t0() + Duration::seconds(60)),
            RateDecision::Allowed
        );
        assert!(matches!(
            limiter.record("alice", t0() + Duration::seconds(61)),
            RateDecision::Limited { warn: true }
        ));
    }

    #[test]
    fn test_prune_expired_windows() {
        let mut limiter = SourceRateLimiter::new(Duration::seconds(60), 5);
        limiter.record("a", t0());
        limiter.record("b", t0() + Duration::seconds(30));
        limiter.prune(t0() + Duration::seconds(61));
        assert_eq!(limiter.tracked_sources(), 1);
    }
}
