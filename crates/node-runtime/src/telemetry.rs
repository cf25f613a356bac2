//! Tracing setup.
//!
//! `RUST_LOG` wins when set; otherwise the configured level (which
//! `VC_LOG_LEVEL` may override) is used as the filter directive.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::config::{ConfigError, LoggingConfig};

/// Install the global subscriber. Fails if one is already installed.
pub fn init_tracing(config: &LoggingConfig) -> Result<(), ConfigError> {
    let env_filter = build_filter(config)?;

    let fmt_layer = if config.json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_ansi(true)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .map_err(|e| ConfigError::Logging {
            reason: e.to_string(),
        })?;

    tracing::info!(
        level = %config.level,
        json = config.json,
        "Tracing initialized"
    );
    Ok(())
}

fn build_filter(config: &LoggingConfig) -> Result<EnvFilter, ConfigError> {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| ConfigError::Logging {
            reason: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bad_directive_rejected() {
        if std::env::var("RUST_LOG").is_ok() {
            return;
        }
        let config = LoggingConfig {
            level: "info,vc_03_throttling=loudest".to_string(),
            json: false,
        };
        assert!(matches!(
            build_filter(&config),
            Err(ConfigError::Logging { .. })
        ));
    }

    #[test]
    fn test_level_directive_accepted() {
        let config = LoggingConfig {
            level: "vc_04_benchlist=debug,info".to_string(),
            json: true,
        };
        assert!(build_filter(&config).is_ok());
    }
}
