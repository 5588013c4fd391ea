//! Optional tracing output on stderr.
//!
//! Off unless a level is configured. `RUST_LOG`, when set, replaces the
//! configured filter.

use tracing::Level;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Parses a `[log] level` value. Accepts the `tracing` level names in any case,
/// plus `warning`.
pub fn parse_level(s: &str) -> Option<Level> {
    if s.eq_ignore_ascii_case("warning") {
        return Some(Level::WARN);
    }
    s.parse().ok()
}

/// Shape of the lines written to stderr.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    /// One JSON object per event.
    Json,
}

impl LogFormat {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "text" => Some(Self::Text),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

#[derive(Debug, Default)]
pub struct LogConfig {
    /// `None` disables logging.
    pub level: Option<Level>,
    pub format: LogFormat,
}

fn filter_for(level: Level) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("azwork={}", level.as_str().to_ascii_lowercase()))
    })
}

/// Installs the global subscriber. Returns `false` when logging is disabled or a
/// subscriber is already installed.
pub fn init_logging(config: LogConfig) -> bool {
    let Some(level) = config.level else {
        return false;
    };
    let filter = filter_for(level);

    let installed = match config.format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stderr).json())
            .try_init(),
        LogFormat::Text => tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .compact(),
            )
            .try_init(),
    };
    installed.is_ok()
}
