//! Structured logging for the worker message journal
//!
//! Installs a global `tracing` subscriber with JSONL output by default,
//! optional pretty console output for development, and optional rolling
//! JSONL files.
//!
//! # Quick Start
//!
//! ```ignore
//! use journal_logging::{JournalSubscriberBuilder, LogConfig};
//!
//! // JSONL to stderr at info level
//! let _guard = JournalSubscriberBuilder::new().init();
//!
//! // Pretty output plus JSONL files under ./logs
//! let _guard = JournalSubscriberBuilder::new()
//!     .with_config(LogConfig::development().with_file("./logs"))
//!     .init();
//! ```
//!
//! `RUST_LOG` always takes precedence over the configured default level.
//! Keep the returned guard alive; dropping it flushes and closes file
//! output.

pub mod config;
pub mod error;
pub mod layers;

pub use config::{ConsoleConfig, FileConfig, JsonlConfig, LogConfig, RotationStrategy};
pub use error::LogError;

use tracing::Subscriber;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::layers::BoxedLayer;

/// Builder for configuring and initializing the journal logging subscriber
#[derive(Debug, Clone, Default)]
pub struct JournalSubscriberBuilder {
    config: LogConfig,
}

impl JournalSubscriberBuilder {
    /// Create a builder with default configuration (JSONL to stderr)
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a specific configuration
    pub fn with_config(mut self, config: LogConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the default log level
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.config.default_level = level.into();
        self
    }

    /// Enable or disable console output
    pub fn with_console(mut self, enabled: bool) -> Self {
        self.config.console.enabled = enabled;
        self
    }

    /// Configure file output
    pub fn with_file_output(mut self, config: FileConfig) -> Self {
        self.config.file = Some(config);
        self
    }

    /// The configuration this builder will install
    pub fn config(&self) -> &LogConfig {
        &self.config
    }

    /// Filter from `RUST_LOG`, falling back to the configured level
    pub fn env_filter(&self) -> Result<EnvFilter, LogError> {
        match EnvFilter::try_from_default_env() {
            Ok(filter) => Ok(filter),
            Err(_) => EnvFilter::try_new(&self.config.default_level)
                .map_err(|e| LogError::Filter(format!("{:?}: {e}", self.config.default_level))),
        }
    }

    /// Output layers for the enabled destinations
    ///
    /// Returns the file writer guard when file output is enabled.
    pub fn build_layers<S>(&self) -> Result<(Vec<BoxedLayer<S>>, Option<WorkerGuard>), LogError>
    where
        S: Subscriber + for<'a> LookupSpan<'a> + 'static,
    {
        let mut outputs = Vec::new();
        let mut guard = None;

        if self.config.console.enabled {
            outputs.push(layers::console_layer(
                &self.config.console,
                &self.config.jsonl,
            )?);
        }
        if let Some(file) = &self.config.file {
            let (writer, file_guard) = layers::file_writer(file)?;
            outputs.push(layers::jsonl_layer(&self.config.jsonl, writer));
            guard = Some(file_guard);
        }

        Ok((outputs, guard))
    }

    /// Try to install the subscriber globally
    ///
    /// Fails if the configuration is invalid or a global subscriber is
    /// already set.
    pub fn try_init(self) -> Result<Option<WorkerGuard>, LogError> {
        let filter = self.env_filter()?;
        let (outputs, guard) = self.build_layers()?;

        tracing_subscriber::registry()
            .with(filter)
            .with(outputs)
            .try_init()?;
        Ok(guard)
    }

    /// Install the subscriber globally
    ///
    /// Setup failures are reported on stderr and leave logging disabled.
    pub fn init(self) -> Option<WorkerGuard> {
        self.try_init().unwrap_or_else(|e| {
            eprintln!("Warning: Failed to initialize logging: {e}");
            None
        })
    }
}

/// Initialize logging for tests (warnings only)
///
/// Safe to call from every test; only the first call installs anything.
pub fn init_testing() {
    let _ = JournalSubscriberBuilder::new()
        .with_config(LogConfig::testing())
        .try_init();
}
