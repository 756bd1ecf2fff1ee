//! Configuration for the session store.

use std::time::Duration;

/// Default maximum number of live sessions.
pub const DEFAULT_MAX_SESSIONS: usize = 10_000;

/// Default idle TTL (10 minutes, long enough to finish a GitHub sign-in).
pub const DEFAULT_TTL: Option<Duration> = Some(Duration::from_secs(600));

/// Configuration for the session store.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Maximum number of sessions kept before LRU eviction.
    pub max_sessions: usize,

    /// Idle time after which a session is dropped. `None` keeps sessions
    /// until evicted.
    pub ttl: Option<Duration>,

    /// Whether to sweep expired sessions in the background.
    /// If false, expired sessions are only dropped on access.
    pub enable_cleanup_task: bool,

    /// Interval for the background sweep.
    pub cleanup_interval: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_sessions: DEFAULT_MAX_SESSIONS,
            ttl: DEFAULT_TTL,
            enable_cleanup_task: true,
            cleanup_interval: Duration::from_secs(60),
        }
    }
}

impl StoreConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum number of sessions.
    pub fn with_max_sessions(mut self, max: usize) -> Self {
        self.max_sessions = max;
        self
    }

    /// Set the idle TTL.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// Keep sessions until evicted.
    pub fn without_ttl(mut self) -> Self {
        self.ttl = None;
        self
    }

    /// Enable or disable the background sweep.
    pub fn with_cleanup_task(mut self, enabled: bool) -> Self {
        self.enable_cleanup_task = enabled;
        self
    }

    /// Set the sweep interval.
    pub fn with_cleanup_interval(mut self, interval: Duration) -> Self {
        self.cleanup_interval = interval;
        self
    }
}
