//!  Logging setup for ember binaries and tests.
//!
//!  Events are written to stdout and, optionally, to a rolling log file. Each destination gets
//!  its own [`LayerInfo`] with a [`LogFormat`] and filter directives. The entry point is
//!  [`EmberTracer`].
//!
//!  # Examples
//!
//!  ```
//!  use ember_tracing::{
//!      tracing::level_filters::LevelFilter, EmberTracer, LayerInfo, LogFormat, Tracer,
//!  };
//!
//!  fn main() -> eyre::Result<()> {
//!      let tracer = EmberTracer::new().with_stdout(LayerInfo::new(
//!          LogFormat::LogFmt,
//!          LevelFilter::INFO.to_string(),
//!          "net::range=debug".to_string(),
//!          None,
//!      ));
//!
//!      let _handle = tracer.init()?;
//!      Ok(())
//!  }
//!  ```

#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

// Re-export tracing crates
pub use tracing;
pub use tracing_appender;
pub use tracing_subscriber;

// Re-export our types
pub use formatter::LogFormat;
pub use layers::{FileInfo, FileWorkerGuard};
pub use test_tracer::TestTracer;

mod formatter;
mod layers;
mod test_tracer;

use crate::layers::Layers;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

///  Tracer for application logging.
///
///  Always logs to stdout, file logging is opt-in.
#[derive(Debug, Clone, Default)]
pub struct EmberTracer {
    stdout: LayerInfo,
    file: Option<(LayerInfo, FileInfo)>,
}

impl EmberTracer {
    ///  Constructs a new tracer with the default stdout layer and no file layer.
    pub fn new() -> Self {
        Self::default()
    }

    ///  Sets a custom configuration for the stdout layer.
    pub fn with_stdout(mut self, config: LayerInfo) -> Self {
        self.stdout = config;
        self
    }

    ///  Enables the file layer.
    ///
    ///  # Arguments
    ///  * `config` - The `LayerInfo` to use for the file layer.
    ///  * `file_info` - Where and how the log file is written.
    pub fn with_file(mut self, config: LayerInfo, file_info: FileInfo) -> Self {
        self.file = Some((config, file_info));
        self
    }
}

///  Configuration for a logging layer.
#[derive(Debug, Clone)]
pub struct LayerInfo {
    format: LogFormat,
    default_directive: String,
    filters: String,
    color: Option<String>,
}

impl LayerInfo {
    ///  Constructs a new `LayerInfo`.
    ///
    ///  # Arguments
    ///  * `format` - Specifies the format for log messages.
    ///  * `default_directive` - Directive used when `RUST_LOG` is not set.
    ///  * `filters` - Additional comma separated directives, e.g. `net::range=trace`.
    ///  * `color` - Optional color configuration, `never` disables colors.
    pub const fn new(
        format: LogFormat,
        default_directive: String,
        filters: String,
        color: Option<String>,
    ) -> Self {
        Self { format, default_directive, filters, color }
    }
}

impl Default for LayerInfo {
    ///  Terminal format at INFO, without additional filters and with colors.
    fn default() -> Self {
        Self {
            format: LogFormat::Terminal,
            default_directive: LevelFilter::INFO.to_string(),
            filters: String::new(),
            color: Some("always".to_string()),
        }
    }
}

/// Keeps the logging setup alive.
///
/// Dropping the handle flushes and stops the file writer.
#[derive(Debug, Default)]
pub struct TracerHandle {
    /// Guard for the file layer, if any
    pub file_guard: Option<FileWorkerGuard>,
}

/// Trait defining a general interface for logging configuration.
pub trait Tracer {
    /// Initialize the logging configuration.
    ///
    /// Installing the global subscriber only once is fine, following calls keep the first
    /// subscriber.
    fn init(self) -> eyre::Result<TracerHandle>;
}

impl Tracer for EmberTracer {
    fn init(self) -> eyre::Result<TracerHandle> {
        let mut layers = Layers::new();

        layers.stdout(
            self.stdout.format,
            self.stdout.default_directive.parse()?,
            &self.stdout.filters,
            self.stdout.color,
        )?;

        let file_guard = self
            .file
            .map(|(config, file_info)| layers.file(config.format, &config.filters, file_info))
            .transpose()?;

        let _ =
            tracing_subscriber::registry().with(layers.into_inner()).try_init().inspect_err(|e| {
                tracing::warn!(%e, "Tracing subscriber could not be initialized")
            });
        Ok(TracerHandle { file_guard })
    }
}

///  Initializes a tracing subscriber for tests.
///
///  The filter is configurable via `RUST_LOG`.
///
///  # Note
///
///  The subscriber will silently fail if it could not be installed.
pub fn init_test_tracing() {
    let _ = TestTracer::default().init();
}
