//! Logging setup and the diagnostics context handed to the query client
//!
//! Library code never installs a logger. The binary calls [`init`] once at
//! startup; the query client logs through the [`Diagnostics`] it was given.
//!
//! Levels: `off`, `error`, `warn`, `info`, `debug`, `trace`. The level comes
//! from the caller, else `AOI_QUERY_LOG`, else `warn`.

use log::LevelFilter;

/// Environment variable consulted when no explicit level is passed
pub const LOG_ENV: &str = "AOI_QUERY_LOG";

/// Default log target of the query client
pub const DEFAULT_TARGET: &str = "aoi_query::query";

/// Logging context injected into the query client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostics {
    target: String,
}

impl Diagnostics {
    /// Log under a custom target (e.g. one per client instance)
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
        }
    }

    pub fn target(&self) -> &str {
        &self.target
    }
}

impl Default for Diagnostics {
    fn default() -> Self {
        Self::new(DEFAULT_TARGET)
    }
}

/// Parse a level name; unknown names fall back to `info`
pub fn parse_level(level: &str) -> LevelFilter {
    match level.trim().to_ascii_lowercase().as_str() {
        "off" => LevelFilter::Off,
        "error" => LevelFilter::Error,
        "warn" => LevelFilter::Warn,
        "info" => LevelFilter::Info,
        "debug" => LevelFilter::Debug,
        "trace" => LevelFilter::Trace,
        _ => LevelFilter::Info,
    }
}

/// Resolve the effective level: explicit, then environment, then `fallback`
pub fn resolve_level(explicit: Option<&str>, fallback: &str) -> LevelFilter {
    match explicit {
        Some(level) => parse_level(level),
        None => match std::env::var(LOG_ENV) {
            Ok(level) => parse_level(&level),
            Err(_) => parse_level(fallback),
        },
    }
}

/// Install the stderr logger.
///
/// Safe to call more than once; later calls are ignored.
pub fn init(level: LevelFilter) {
    let _ = env_logger::Builder::new()
        .filter_level(level)
        .format_timestamp_millis()
        .format_target(true)
        .try_init();
}
