//! Structured logging for the pipeline.
//!
//! Provides dual-mode logging on stderr:
//! - Human-readable console output for interactive use
//! - JSON lines for machine consumers
//!
//! # Usage
//!
//! ```ignore
//! use lw_core::logging::{init_logging, LogConfig};
//!
//! let config = LogConfig::from_env(None, None);
//! init_logging(&config);
//! ```
//!
//! The pipeline emits `debug` events per unit, `info` events per completed
//! pass and a `warn` event when a pass aborts. Every event carries an `event`
//! field from [`event_names`] and a `phase` field.

pub mod config;
pub mod events;

pub use config::{LogConfig, LogFormat, LogLevel};
pub use events::{event_names, Phase};

use std::io::IsTerminal;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{fmt, EnvFilter, Layer, Registry};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

fn output_layer(config: &LogConfig) -> BoxedLayer {
    match config.format {
        LogFormat::Human => {
            let use_ansi = std::io::stderr().is_terminal();
            let layer = fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_ansi(use_ansi);
            if config.timestamps {
                layer.boxed()
            } else {
                layer.without_time().boxed()
            }
        }
        LogFormat::Jsonl => fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_current_span(false)
            .boxed(),
    }
}

fn filter(config: &LogConfig) -> EnvFilter {
    config
        .rust_log()
        .and_then(|directive| EnvFilter::try_new(directive).ok())
        .unwrap_or_else(|| EnvFilter::new(config.directive()))
}

/// Install the global subscriber.
///
/// Panics if a global subscriber is already set; use [`try_init_logging`]
/// where that can happen.
pub fn init_logging(config: &LogConfig) {
    tracing_subscriber::registry()
        .with(output_layer(config))
        .with(filter(config))
        .init();
}

/// Install the global subscriber, reporting instead of panicking when one
/// is already set.
pub fn try_init_logging(config: &LogConfig) -> Result<(), TryInitError> {
    tracing_subscriber::registry()
        .with(output_layer(config))
        .with(filter(config))
        .try_init()
}

/// Initialize logging from the environment alone.
pub fn init_default_logging() {
    init_logging(&LogConfig::from_env(None, None));
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_subscriber::filter::LevelFilter;

    #[test]
    fn test_second_try_init_fails_cleanly() {
        let config = LogConfig::default().with_level(LogLevel::Off);
        // Another test may already have installed a subscriber.
        let _ = try_init_logging(&config);
        assert!(try_init_logging(&config).is_err());
    }

    fn max_level(config: &LogConfig) -> Option<LevelFilter> {
        <EnvFilter as Layer<Registry>>::max_level_hint(&filter(config))
    }

    #[test]
    fn test_configured_level_beats_rust_log() {
        let rust_log_only = |key: &str| (key == "RUST_LOG").then(|| "error".to_string());

        let explicit = LogConfig::from_lookup(rust_log_only, Some(LogLevel::Debug), None);
        assert_eq!(max_level(&explicit), Some(LevelFilter::DEBUG));

        let lw_log = LogConfig::from_lookup(
            |key: &str| match key {
                "LW_LOG" => Some("trace".to_string()),
                "RUST_LOG" => Some("error".to_string()),
                _ => None,
            },
            None,
            None,
        );
        assert_eq!(max_level(&lw_log), Some(LevelFilter::TRACE));

        let fallback = LogConfig::from_lookup(rust_log_only, None, None);
        assert_eq!(max_level(&fallback), Some(LevelFilter::ERROR));
    }

    #[test]
    fn test_both_formats_build_layers() {
        for format in [LogFormat::Human, LogFormat::Jsonl] {
            let config = LogConfig::default().with_format(format).with_timestamps(false);
            let _layer = output_layer(&config);
        }
    }
}
