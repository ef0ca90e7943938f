use once_cell::sync::Lazy;
use std::{env, time::Duration};

/// Holds all tunables, read-once from ENV with fallbacks.
pub struct Settings {
    pub settle_delay: Duration,
    pub key_hold_delay: Duration,
    pub volume_echo_window: Duration,
    pub foreground_retry_delay: Duration,
    pub command_buffer_capacity: usize,
}

impl Settings {
    fn from_env() -> Self {
        // optionally load .env
        let _ = dotenvy::dotenv();

        // helper to parse usize
        fn parse_usize(var: &str, default: usize) -> usize {
            env::var(var)
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default)
        }

        // helper to parse millis into Duration
        fn parse_millis(var: &str, default_ms: u64) -> Duration {
            env::var(var)
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .map(Duration::from_millis)
                .unwrap_or_else(|| Duration::from_millis(default_ms))
        }

        Settings {
            settle_delay: parse_millis("SETTLE_DELAY_MS", 10_000),
            key_hold_delay: parse_millis("KEY_HOLD_DELAY_MS", 500),
            volume_echo_window: parse_millis("VOLUME_ECHO_WINDOW_MS", 1_000),
            foreground_retry_delay: parse_millis("FOREGROUND_RETRY_DELAY_MS", 5_000),
            command_buffer_capacity: parse_usize("COMMAND_BUFFER_CAPACITY", 100),
        }
    }
}

/// Global settings instance
pub static SETTINGS: Lazy<Settings> = Lazy::new(Settings::from_env);

/// Per-controller timing overrides. Defaults come from [`SETTINGS`]; tests
/// inject much shorter values to drive the timers in real time.
#[derive(Debug, Clone)]
pub struct SessionTimings {
    /// Deferral between a listen trigger and the actual subscription,
    /// so listening never races app startup.
    pub settle_delay: Duration,
    /// Synthetic press-and-hold release timer for fast-seek keys.
    pub key_hold_delay: Duration,
    /// Window during which a local volume change is attributed to a remote
    /// command we just applied.
    pub volume_echo_window: Duration,
    /// Retry delay for the playback-foreground fallback when no player is
    /// active yet.
    pub foreground_retry_delay: Duration,
}

impl Default for SessionTimings {
    fn default() -> Self {
        Self {
            settle_delay: SETTINGS.settle_delay,
            key_hold_delay: SETTINGS.key_hold_delay,
            volume_echo_window: SETTINGS.volume_echo_window,
            foreground_retry_delay: SETTINGS.foreground_retry_delay,
        }
    }
}
