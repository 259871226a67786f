use crate::layers::BoxedLayer;
use clap::ValueEnum;
use std::fmt;
use tracing_appender::non_blocking::NonBlocking;
use tracing_subscriber::{EnvFilter, Layer, Registry};

/// The output format of a logging layer.
#[derive(Debug, Copy, Clone, ValueEnum, Eq, PartialEq)]
pub enum LogFormat {
    /// One JSON object per event, for log collectors.
    Json,

    /// `key=value` pairs.
    #[value(name = "logfmt")]
    LogFmt,

    /// Human readable output.
    Terminal,
}

impl LogFormat {
    /// Creates a layer writing in this format.
    ///
    /// Events go to `file_writer` if set and to stdout otherwise. ANSI colors are only used when
    /// `color` is set to anything but `never`, `RUST_LOG_STYLE` overrides it.
    pub fn apply(
        &self,
        filter: EnvFilter,
        color: Option<String>,
        file_writer: Option<NonBlocking>,
    ) -> BoxedLayer<Registry> {
        let ansi = ansi_enabled(color.as_deref());
        let target = target_enabled(&filter);

        match self {
            Self::Json => {
                let layer =
                    tracing_subscriber::fmt::layer().json().with_ansi(ansi).with_target(target);
                match file_writer {
                    Some(writer) => layer.with_writer(writer).with_filter(filter).boxed(),
                    None => layer.with_filter(filter).boxed(),
                }
            }
            Self::LogFmt => tracing_logfmt::layer().with_filter(filter).boxed(),
            Self::Terminal => {
                let layer = tracing_subscriber::fmt::layer().with_ansi(ansi).with_target(target);
                match file_writer {
                    Some(writer) => layer.with_writer(writer).with_filter(filter).boxed(),
                    None => layer.with_filter(filter).boxed(),
                }
            }
        }
    }
}

fn ansi_enabled(color: Option<&str>) -> bool {
    let Some(color) = color else { return false };
    std::env::var("RUST_LOG_STYLE").map(|style| style != "never").unwrap_or(color != "never")
}

/// Targets like `net::range` are shown if `RUST_LOG_TARGET` is set to anything but `0`, or by
/// default when the filter enables levels below INFO.
fn target_enabled(filter: &EnvFilter) -> bool {
    std::env::var("RUST_LOG_TARGET").map(|val| val != "0").unwrap_or_else(|_| {
        filter.max_level_hint().map_or(true, |max_level| max_level > tracing::Level::INFO)
    })
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json => f.write_str("json"),
            Self::LogFmt => f.write_str("logfmt"),
            Self::Terminal => f.write_str("terminal"),
        }
    }
}
