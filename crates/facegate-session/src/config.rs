use facegate_core::models::DEFAULT_MODEL_URL;
use facegate_core::AcceptancePolicy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("reading config at {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parsing config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Session configuration: defaults, then an optional TOML file, then
/// `FACEGATE_*` environment variables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL serving the weights manifests and shards.
    pub model_url: String,
    /// Sampling period in milliseconds.
    pub tick_ms: u64,
    /// Per-request timeout for model downloads, in seconds.
    pub fetch_timeout_secs: u64,
    /// Acceptance thresholds.
    pub policy: AcceptancePolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model_url: DEFAULT_MODEL_URL.to_string(),
            tick_ms: 100,
            fetch_timeout_secs: 30,
            policy: AcceptancePolicy::default(),
        }
    }
}

impl Config {
    /// Load from `path` (if given and present) and apply environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let base = match path {
            Some(path) if path.exists() => Self::from_file(path)?,
            Some(path) => {
                tracing::debug!(path = %path.display(), "config file absent; using defaults");
                Self::default()
            }
            None => Self::default(),
        };
        Ok(base.with_overrides(|key| std::env::var(key).ok()))
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Apply overrides from `lookup`; unparsable values are ignored.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(url) = lookup("FACEGATE_MODEL_URL") {
            self.model_url = url;
        }
        self.tick_ms = parsed(&lookup, "FACEGATE_TICK_MS", self.tick_ms);
        self.fetch_timeout_secs =
            parsed(&lookup, "FACEGATE_FETCH_TIMEOUT_SECS", self.fetch_timeout_secs);

        let p = &mut self.policy;
        p.good_score = parsed(&lookup, "FACEGATE_GOOD_SCORE", p.good_score);
        p.accept_score = parsed(&lookup, "FACEGATE_ACCEPT_SCORE", p.accept_score);
        p.good_samples = parsed(&lookup, "FACEGATE_GOOD_SAMPLES", p.good_samples);
        p.warn_every = parsed(&lookup, "FACEGATE_WARN_EVERY", p.warn_every);
        p.max_attempts = parsed(&lookup, "FACEGATE_MAX_ATTEMPTS", p.max_attempts);
        self
    }

    /// Sampling period; never shorter than one millisecond.
    pub fn tick_period(&self) -> Duration {
        Duration::from_millis(self.tick_ms.max(1))
    }

    /// Per-request timeout for model fetches; never shorter than one second.
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs.max(1))
    }
}

fn parsed<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> T {
    match lookup(key) {
        Some(v) => v.parse().unwrap_or_else(|_| {
            tracing::warn!(key, value = %v, "ignoring unparsable override");
            default
        }),
        None => default,
    }
}
