use std::env;
use std::time::Duration;

/// Application configuration
/// Provides defaults with environment variable overrides
#[derive(Debug, Clone)]
pub struct Config {
    /// Judge base URL. Empty means no judge is configured.
    pub judge_url: String,
    pub judge_api_key: String,
    pub execution_timeout_ms: u64,
    pub memory_limit_mb: u64,
    pub cpu_time_limit_secs: u64,
    pub poll_interval_ms: u64,
    pub request_timeout_ms: u64,
    pub local_fallback_enabled: bool,
    pub local_fallback_timeout_ms: u64,
    pub redis_url: String,
    pub port: u16,
    /// Execution requests allowed per client IP per hour; 0 disables the limit
    pub rate_limit_execute: u64,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup
    /// Unset, empty or unparsable values fall back to defaults
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let text = |key: &str, default: &str| -> String {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| default.to_string())
        };
        let number = |key: &str, default: u64| -> u64 {
            lookup(key)
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(default)
        };

        Self {
            judge_url: text("JUDGE0_API_URL", "").trim().trim_end_matches('/').to_string(),
            judge_api_key: text("JUDGE0_API_KEY", ""),
            execution_timeout_ms: number("CODE_EXECUTION_TIMEOUT", 5000),
            memory_limit_mb: number("CODE_EXECUTION_MEMORY_LIMIT", 128),
            cpu_time_limit_secs: number("CODE_EXECUTION_CPU_LIMIT", 5),
            poll_interval_ms: number("JUDGE_POLL_INTERVAL_MS", 500).max(1),
            request_timeout_ms: number("JUDGE_REQUEST_TIMEOUT_MS", 30_000),
            local_fallback_enabled: lookup("LOCAL_FALLBACK_ENABLED")
                .map(|v| !matches!(v.trim().to_lowercase().as_str(), "false" | "0" | "no" | "off"))
                .unwrap_or(true),
            local_fallback_timeout_ms: number("LOCAL_FALLBACK_TIMEOUT_MS", 5000),
            redis_url: text("REDIS_URL", "redis://127.0.0.1:6379"),
            port: lookup("PORT")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(3000),
            rate_limit_execute: number("RATE_LIMIT_EXECUTE", 100),
        }
    }

    pub fn execution_timeout(&self) -> Duration {
        Duration::from_millis(self.execution_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn local_fallback_timeout(&self) -> Duration {
        Duration::from_millis(self.local_fallback_timeout_ms)
    }

    /// Memory ceiling as the judge expects it (KB)
    pub fn memory_limit_kb(&self) -> u64 {
        self.memory_limit_mb * 1024
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}
