//! Logging setup on `tracing-subscriber`.
//!
//! Each worker runs inside an `info_span!("bot", instance, bot)`, so every
//! event a bot emits carries its identity. [`WorkerSpans`] decides whether
//! the span itself shows up as start/stop lines.
//!
//! Logs go to stderr unless configured otherwise; stdout belongs to the
//! console bridge that prints bot replies.
//!
//! ```rust,ignore
//! use botyard_runtime::LoggingBuilder;
//! use botyard_runtime::config::WorkerSpans;
//!
//! LoggingBuilder::new()
//!     .directive("botyard_bots=debug")
//!     .worker_spans(WorkerSpans::Lifecycle)
//!     .init();
//! ```

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use tracing::warn;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt};

use crate::config::{LogFormat, LogOutput, LoggingConfig, WorkerSpans};

/// File name used when `file_path` names a directory only.
const DEFAULT_LOG_FILE: &str = "botyard.log";

impl WorkerSpans {
    fn fmt_span(self) -> FmtSpan {
        match self {
            Self::Off => FmtSpan::NONE,
            Self::Lifecycle => FmtSpan::NEW | FmtSpan::CLOSE,
            Self::All => FmtSpan::FULL,
        }
    }
}

/// Installs the global subscriber described by `config`.
///
/// Later calls are ignored, so tests and embedders may initialize first.
pub fn init_from_config(config: &LoggingConfig) {
    let _ = LoggingBuilder::from_config(config).try_init();
}

// =============================================================================
// LoggingBuilder
// =============================================================================

/// Collects subscriber settings before installing them.
///
/// `RUST_LOG`, when set, replaces the base level; directives are added on
/// top of it.
#[derive(Debug)]
pub struct LoggingBuilder {
    level: tracing::Level,
    directives: Vec<String>,
    worker_spans: WorkerSpans,
    format: LogFormat,
    output: LogOutput,
    file_path: Option<PathBuf>,
    thread_ids: bool,
    file_location: bool,
}

impl Default for LoggingBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl LoggingBuilder {
    pub fn new() -> Self {
        Self {
            level: tracing::Level::INFO,
            directives: Vec::new(),
            worker_spans: WorkerSpans::Off,
            format: LogFormat::Compact,
            output: LogOutput::Stderr,
            file_path: None,
            thread_ids: false,
            file_location: false,
        }
    }

    /// Mirrors the `[logging]` section. Per-module filters are applied in
    /// name order so the resulting filter does not depend on map order.
    pub fn from_config(config: &LoggingConfig) -> Self {
        let mut filters: Vec<_> = config.filters.iter().collect();
        filters.sort_by(|a, b| a.0.cmp(b.0));

        Self {
            level: config.level.to_tracing_level(),
            directives: filters
                .into_iter()
                .map(|(module, level)| format!("{module}={level}"))
                .collect(),
            worker_spans: config.worker_spans,
            format: config.format,
            output: config.output,
            file_path: config.file_path.clone(),
            thread_ids: config.thread_ids,
            file_location: config.file_location,
        }
    }

    pub fn level(mut self, level: tracing::Level) -> Self {
        self.level = level;
        self
    }

    /// Adds a filter directive such as `botyard_bots=debug`.
    pub fn directive(mut self, directive: &str) -> Self {
        self.directives.push(directive.to_string());
        self
    }

    pub fn worker_spans(mut self, spans: WorkerSpans) -> Self {
        self.worker_spans = spans;
        self
    }

    pub fn format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn output(mut self, output: LogOutput) -> Self {
        self.output = output;
        self
    }

    pub fn file_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.file_path = Some(path.into());
        self
    }

    /// Installs the subscriber, ignoring an already-installed one.
    pub fn init(self) {
        let _ = self.try_init();
    }

    /// Installs the subscriber.
    ///
    /// Problems that only degrade logging (a bad directive, a file output
    /// without a path) are reported through the new subscriber once it is
    /// live.
    pub fn try_init(self) -> Result<(), TryInitError> {
        let (filter, rejected) = self.filter();
        let (writer, fell_back) = self.writer();

        tracing_subscriber::registry()
            .with(self.fmt_layer(writer))
            .with(filter)
            .try_init()?;

        for (directive, error) in rejected {
            warn!(%directive, %error, "Ignoring invalid log directive");
        }
        if fell_back {
            warn!("File output requested without a file path, logging to stderr");
        }
        Ok(())
    }

    /// Builds the filter and returns the directives that failed to parse.
    fn filter(&self) -> (EnvFilter, Vec<(String, String)>) {
        let mut filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(self.level.as_str().to_lowercase()));
        let mut rejected = Vec::new();

        for directive in &self.directives {
            match directive.parse::<Directive>() {
                Ok(parsed) => filter = filter.add_directive(parsed),
                Err(e) => rejected.push((directive.clone(), e.to_string())),
            }
        }
        (filter, rejected)
    }

    /// Resolves the destination; `true` means a file was requested but
    /// stderr is used instead.
    fn writer(&self) -> (BoxMakeWriter, bool) {
        match (self.output, &self.file_path) {
            (LogOutput::Stdout, _) => (BoxMakeWriter::new(std::io::stdout), false),
            (LogOutput::Stderr, _) => (BoxMakeWriter::new(std::io::stderr), false),
            (LogOutput::File, Some(path)) => {
                let appender = tracing_appender::rolling::never(
                    path.parent().unwrap_or_else(|| Path::new(".")),
                    path.file_name()
                        .unwrap_or_else(|| OsStr::new(DEFAULT_LOG_FILE)),
                );
                (BoxMakeWriter::new(appender), false)
            }
            (LogOutput::File, None) => (BoxMakeWriter::new(std::io::stderr), true),
        }
    }

    fn fmt_layer(&self, writer: BoxMakeWriter) -> Box<dyn Layer<Registry> + Send + Sync> {
        let layer = fmt::layer()
            .with_writer(writer)
            .with_span_events(self.worker_spans.fmt_span())
            .with_thread_ids(self.thread_ids)
            .with_file(self.file_location)
            .with_line_number(self.file_location);

        match self.format {
            LogFormat::Full => layer.boxed(),
            LogFormat::Pretty => layer.pretty().boxed(),
            #[cfg(feature = "json-log")]
            LogFormat::Json => layer.json().boxed(),
            // Without `json-log`, json falls back to compact.
            _ => layer.compact().boxed(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::config::LogLevel;

    #[test]
    fn test_worker_span_levels() {
        assert_eq!(WorkerSpans::Off.fmt_span(), FmtSpan::NONE);
        assert_eq!(WorkerSpans::Lifecycle.fmt_span(), FmtSpan::NEW | FmtSpan::CLOSE);
        assert_eq!(WorkerSpans::All.fmt_span(), FmtSpan::FULL);
    }

    #[test]
    fn test_from_config_orders_filters() {
        let config = LoggingConfig {
            level: LogLevel::Warn,
            filters: HashMap::from([
                ("botyard_runtime".to_string(), LogLevel::Debug),
                ("botyard_bots".to_string(), LogLevel::Trace),
            ]),
            worker_spans: WorkerSpans::Lifecycle,
            file_location: true,
            ..Default::default()
        };
        let builder = LoggingBuilder::from_config(&config);
        assert_eq!(builder.level, tracing::Level::WARN);
        assert_eq!(
            builder.directives,
            ["botyard_bots=trace", "botyard_runtime=debug"]
        );
        assert_eq!(builder.worker_spans, WorkerSpans::Lifecycle);
        assert!(builder.file_location);
    }

    #[test]
    fn test_invalid_directive_is_reported_not_fatal() {
        let (_, rejected) = LoggingBuilder::new()
            .directive("botyard_bots=debug")
            .directive("botyard_runtime=loud")
            .filter();
        assert_eq!(rejected.len(), 1);
        assert_eq!(rejected[0].0, "botyard_runtime=loud");
    }

    #[test]
    fn test_file_output_without_path_falls_back() {
        let (_, fell_back) = LoggingBuilder::new().output(LogOutput::File).writer();
        assert!(fell_back);

        let dir = tempfile::tempdir().unwrap();
        let (_, fell_back) = LoggingBuilder::new()
            .output(LogOutput::File)
            .file_path(dir.path().join("bots.log"))
            .writer();
        assert!(!fell_back);
        assert!(!LoggingBuilder::new().writer().1);
    }
}
