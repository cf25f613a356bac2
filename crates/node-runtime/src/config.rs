//! # Node Configuration
//!
//! One TOML file covers every subsystem. Every table and every field is
//! optional; anything left out takes its default. Environment variables are
//! applied on top of the file, then the whole configuration is validated so
//! a bad value fails at startup.
//!
//! ```toml
//! chain_id = "0x0101010101010101010101010101010101010101010101010101010101010101"
//! cache_capacity = 64
//!
//! [validators]
//! network_id = 12345
//! node_ids = ["NodeID-..."]
//!
//! [poll]
//! k = 20
//! alpha = 15
//!
//! [throttler]
//! vdr_alloc_size = 33554432
//!
//! [benchlist]
//! threshold = 10
//! duration_secs = 900
//!
//! [logging]
//! level = "info"
//! json = false
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use shared_types::ChainId;
use thiserror::Error;
use vc_01_validators::{
    DefaultValidatorsConfig, ManagerConfig, ValidatorError, DEFAULT_CACHE_CAPACITY,
    VALIDATORS_FILE_ENV,
};
use vc_02_poll::{PollConfig, PollError};
use vc_03_throttling::{ByteThrottlerConfig, ThrottlerConfigError};
use vc_04_benchlist::{BenchlistConfig, BenchlistError};

// =============================================================================
// ENVIRONMENT VARIABLES
// =============================================================================

pub const ENV_CHAIN_ID: &str = "VC_CHAIN_ID";
pub const ENV_NETWORK_ID: &str = "VC_NETWORK_ID";
pub const ENV_VALIDATOR_WEIGHT: &str = "VC_VALIDATOR_WEIGHT";
pub const ENV_CACHE_CAPACITY: &str = "VC_CACHE_CAPACITY";
pub const ENV_POLL_K: &str = "VC_POLL_K";
pub const ENV_POLL_ALPHA: &str = "VC_POLL_ALPHA";
pub const ENV_THROTTLER_VDR_ALLOC_BYTES: &str = "VC_THROTTLER_VDR_ALLOC_BYTES";
pub const ENV_THROTTLER_AT_LARGE_ALLOC_BYTES: &str = "VC_THROTTLER_AT_LARGE_ALLOC_BYTES";
pub const ENV_THROTTLER_NODE_MAX_AT_LARGE_BYTES: &str = "VC_THROTTLER_NODE_MAX_AT_LARGE_BYTES";
pub const ENV_BENCH_THRESHOLD: &str = "VC_BENCH_THRESHOLD";
pub const ENV_BENCH_MIN_FAILING_SECS: &str = "VC_BENCH_MIN_FAILING_SECS";
pub const ENV_BENCH_DURATION_SECS: &str = "VC_BENCH_DURATION_SECS";
pub const ENV_BENCH_MAX_PORTION: &str = "VC_BENCH_MAX_PORTION";
pub const ENV_LOG_LEVEL: &str = "VC_LOG_LEVEL";
pub const ENV_JSON_LOGS: &str = "VC_JSON_LOGS";

// =============================================================================
// ERRORS
// =============================================================================

/// Configuration errors. All of them are fatal at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid value {value:?} for {var}: {reason}")]
    InvalidEnv {
        var: &'static str,
        value: String,
        reason: String,
    },

    #[error("Failed to initialise logging: {reason}")]
    Logging { reason: String },

    #[error(transparent)]
    Validators(#[from] ValidatorError),

    #[error(transparent)]
    Poll(#[from] PollError),

    #[error(transparent)]
    Throttler(#[from] ThrottlerConfigError),

    #[error(transparent)]
    Benchlist(#[from] BenchlistError),
}

// =============================================================================
// SECTIONS
// =============================================================================

/// Benchlist settings in file-friendly units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BenchlistSettings {
    pub threshold: u32,
    pub minimum_failing_duration_secs: u64,
    pub duration_secs: u64,
    pub max_portion: f64,
}

impl Default for BenchlistSettings {
    fn default() -> Self {
        let defaults = BenchlistConfig::default();
        Self {
            threshold: defaults.threshold,
            minimum_failing_duration_secs: defaults.minimum_failing_duration.as_secs(),
            duration_secs: defaults.duration.as_secs(),
            max_portion: defaults.max_portion,
        }
    }
}

impl BenchlistSettings {
    pub fn to_config(&self) -> BenchlistConfig {
        BenchlistConfig {
            threshold: self.threshold,
            minimum_failing_duration: Duration::from_secs(self.minimum_failing_duration_secs),
            duration: Duration::from_secs(self.duration_secs),
            max_portion: self.max_portion,
        }
    }
}

/// Log output settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub level: String,
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

// =============================================================================
// NODE CONFIG
// =============================================================================

/// Complete node configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Chain the benchlist reports transitions for.
    pub chain_id: ChainId,
    /// Validator sets cached by reference point.
    pub cache_capacity: usize,
    pub validators: DefaultValidatorsConfig,
    pub poll: PollConfig,
    pub throttler: ByteThrottlerConfig,
    pub benchlist: BenchlistSettings,
    pub logging: LoggingConfig,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            chain_id: ChainId::default(),
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            validators: DefaultValidatorsConfig::default(),
            poll: PollConfig::default(),
            throttler: ByteThrottlerConfig::default(),
            benchlist: BenchlistSettings::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl NodeConfig {
    /// Load from `path` (defaults when `None`), apply the process
    /// environment and validate.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_overrides(|var| std::env::var(var).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Apply overrides from `lookup`, keyed by environment variable name.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        override_parsed(&lookup, ENV_CHAIN_ID, &mut self.chain_id)?;
        override_parsed(&lookup, ENV_NETWORK_ID, &mut self.validators.network_id)?;
        if let Some(value) = lookup(ENV_VALIDATOR_WEIGHT) {
            self.validators.weight = Some(parse_env(ENV_VALIDATOR_WEIGHT, &value)?);
        }
        if let Some(path) = lookup(VALIDATORS_FILE_ENV) {
            self.validators.validators_file = Some(PathBuf::from(path));
        }
        override_parsed(&lookup, ENV_CACHE_CAPACITY, &mut self.cache_capacity)?;

        override_parsed(&lookup, ENV_POLL_K, &mut self.poll.k)?;
        override_parsed(&lookup, ENV_POLL_ALPHA, &mut self.poll.alpha)?;

        override_parsed(
            &lookup,
            ENV_THROTTLER_VDR_ALLOC_BYTES,
            &mut self.throttler.vdr_alloc_size,
        )?;
        override_parsed(
            &lookup,
            ENV_THROTTLER_AT_LARGE_ALLOC_BYTES,
            &mut self.throttler.at_large_alloc_size,
        )?;
        override_parsed(
            &lookup,
            ENV_THROTTLER_NODE_MAX_AT_LARGE_BYTES,
            &mut self.throttler.node_max_at_large_bytes,
        )?;

        override_parsed(&lookup, ENV_BENCH_THRESHOLD, &mut self.benchlist.threshold)?;
        override_parsed(
            &lookup,
            ENV_BENCH_MIN_FAILING_SECS,
            &mut self.benchlist.minimum_failing_duration_secs,
        )?;
        override_parsed(&lookup, ENV_BENCH_DURATION_SECS, &mut self.benchlist.duration_secs)?;
        override_parsed(&lookup, ENV_BENCH_MAX_PORTION, &mut self.benchlist.max_portion)?;

        if let Some(level) = lookup(ENV_LOG_LEVEL) {
            self.logging.level = level;
        }
        if let Some(value) = lookup(ENV_JSON_LOGS) {
            self.logging.json = value.eq_ignore_ascii_case("true") || value == "1";
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.manager_config().validate()?;
        self.poll.validate()?;
        self.throttler.validate()?;
        self.benchlist.to_config().validate()?;
        Ok(())
    }

    pub fn manager_config(&self) -> ManagerConfig {
        ManagerConfig {
            cache_capacity: self.cache_capacity,
        }
    }

    #[cfg(test)]
    pub fn for_testing() -> Self {
        Self {
            poll: PollConfig { k: 3, alpha: 2 },
            throttler: ByteThrottlerConfig {
                vdr_alloc_size: 1024,
                at_large_alloc_size: 1024,
                node_max_at_large_bytes: 1024,
            },
            ..Self::default()
        }
    }
}

fn parse_env<T>(var: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| ConfigError::InvalidEnv {
        var,
        value: value.to_string(),
        reason: e.to_string(),
    })
}

fn override_parsed<F, T>(lookup: &F, var: &'static str, target: &mut T) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    if let Some(value) = lookup(var) {
        *target = parse_env(var, &value)?;
    }
    Ok(())
}
