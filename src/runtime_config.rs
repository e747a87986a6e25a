//! # Runtime Configuration Module
//!
//! Environment-driven knobs that tune the host at process start.
//!
//! ## Environment Variables
//!
//! ### `RESTHOST_MAX_THREADS_PER_CPU`
//!
//! Upper bound of the adaptive worker pool, expressed per available core.
//! The pool never grows beyond `cores × RESTHOST_MAX_THREADS_PER_CPU`.
//!
//! Default: `8`
//!
//! ### `RESTHOST_POOL_IDLE_MS`
//!
//! How long a worker above the minimum may sit without work before it
//! retires.
//!
//! Default: `30000`
//!
//! ### `RESTHOST_EXPOSE_DIAGNOSTICS`
//!
//! When `true`, the HTML fault page rendered by the default error handler
//! includes the error's debug representation and any captured backtrace.
//! Turn it off for internet-facing deployments.
//!
//! Default: `true`
//!
//! ## Usage
//!
//! ```rust
//! use resthost::runtime_config::RuntimeConfig;
//!
//! let config = RuntimeConfig::from_env();
//! println!("pool ceiling per core: {}", config.max_threads_per_cpu);
//! ```

use std::env;
use std::time::Duration;

/// Default worker ceiling per core.
pub const DEFAULT_MAX_THREADS_PER_CPU: usize = 8;

/// Default idle period before a surplus worker retires.
pub const DEFAULT_POOL_IDLE_MS: u64 = 30_000;

/// Runtime configuration loaded from environment variables.
#[derive(Debug, Clone, Copy)]
pub struct RuntimeConfig {
    /// Worker ceiling per core (default: 8)
    pub max_threads_per_cpu: usize,
    /// Idle period after which a surplus worker retires (default: 30s)
    pub pool_idle_timeout: Duration,
    /// Render debug detail and traces into HTML fault pages (default: true)
    pub expose_diagnostics: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            max_threads_per_cpu: DEFAULT_MAX_THREADS_PER_CPU,
            pool_idle_timeout: Duration::from_millis(DEFAULT_POOL_IDLE_MS),
            expose_diagnostics: true,
        }
    }
}

impl RuntimeConfig {
    /// Load configuration from environment variables.
    ///
    /// Unparseable values fall back to the defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let max_threads_per_cpu = env::var("RESTHOST_MAX_THREADS_PER_CPU")
            .ok()
            .and_then(|v| v.trim().parse::<usize>().ok())
            .filter(|v| *v > 0)
            .unwrap_or(defaults.max_threads_per_cpu);

        let pool_idle_timeout = env::var("RESTHOST_POOL_IDLE_MS")
            .ok()
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(Duration::from_millis)
            .unwrap_or(defaults.pool_idle_timeout);

        let expose_diagnostics = env::var("RESTHOST_EXPOSE_DIAGNOSTICS")
            .ok()
            .and_then(|v| parse_bool(&v))
            .unwrap_or(defaults.expose_diagnostics);

        RuntimeConfig {
            max_threads_per_cpu,
            pool_idle_timeout,
            expose_diagnostics,
        }
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bool_spellings() {
        assert_eq!(parse_bool("TRUE"), Some(true));
        assert_eq!(parse_bool(" off "), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }

    #[test]
    fn defaults_are_sane() {
        let config = RuntimeConfig::default();
        assert_eq!(config.max_threads_per_cpu, 8);
        assert_eq!(config.pool_idle_timeout, Duration::from_secs(30));
        assert!(config.expose_diagnostics);
    }
}
