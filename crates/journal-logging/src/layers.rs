//! Output layers
//!
//! Each helper returns a boxed layer so the subscriber can be assembled
//! from whatever combination of outputs the configuration enables.

use std::fs::{self, File};

use tracing::Subscriber;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{EnvFilter, Layer};

use crate::config::{ConsoleConfig, FileConfig, JsonlConfig, RotationStrategy};
use crate::error::LogError;

/// A type-erased layer over subscriber `S`
pub type BoxedLayer<S> = Box<dyn Layer<S> + Send + Sync + 'static>;

/// JSONL layer writing to `writer`
pub fn jsonl_layer<S, W>(jsonl: &JsonlConfig, writer: W) -> BoxedLayer<S>
where
    S: Subscriber + for<'a> LookupSpan<'a> + 'static,
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    tracing_subscriber::fmt::layer()
        .json()
        .with_current_span(jsonl.include_current_span)
        .with_span_list(jsonl.include_spans)
        .flatten_event(jsonl.flatten_events)
        .with_file(jsonl.include_location)
        .with_line_number(jsonl.include_location)
        .with_writer(writer)
        .boxed()
}

/// Console layer on stderr, pretty or JSONL
pub fn console_layer<S>(
    console: &ConsoleConfig,
    jsonl: &JsonlConfig,
) -> Result<BoxedLayer<S>, LogError>
where
    S: Subscriber + for<'a> LookupSpan<'a> + 'static,
{
    let layer: BoxedLayer<S> = if console.pretty {
        tracing_subscriber::fmt::layer()
            .with_ansi(console.ansi)
            .with_target(true)
            .with_writer(std::io::stderr)
            .boxed()
    } else {
        jsonl_layer(jsonl, std::io::stderr)
    };

    match &console.level {
        Some(level) => {
            let filter = EnvFilter::try_new(level)
                .map_err(|e| LogError::Filter(format!("console level {level:?}: {e}")))?;
            Ok(layer.with_filter(filter).boxed())
        }
        None => Ok(layer),
    }
}

/// Non-blocking writer for file output
///
/// The returned guard flushes buffered lines when dropped.
pub fn file_writer(config: &FileConfig) -> Result<(NonBlocking, WorkerGuard), LogError> {
    fs::create_dir_all(&config.directory)?;

    let rotation = match config.rotation {
        RotationStrategy::Never => {
            let path = config.directory.join(format!("{}.log", config.prefix));
            let file = File::create(path)?;
            return Ok(tracing_appender::non_blocking(file));
        }
        RotationStrategy::Daily => Rotation::DAILY,
        RotationStrategy::Hourly => Rotation::HOURLY,
    };

    let mut builder = RollingFileAppender::builder()
        .rotation(rotation)
        .filename_prefix(&config.prefix)
        .filename_suffix("log");
    if let Some(max_files) = config.max_files {
        builder = builder.max_log_files(max_files);
    }
    let appender = builder.build(&config.directory)?;
    Ok(tracing_appender::non_blocking(appender))
}
