//! Structured logging setup
//!
//! Console output by default, JSON when asked for. `RUST_LOG` directives are
//! honoured on top of the configured level. Initialisation happens once per
//! process; later calls are ignored.
//!
//! Command output lines are logged at `trace` under `buildsieve::runner`, so
//! `RUST_LOG=buildsieve::runner=trace` streams every build live.

use std::env;
use std::sync::Once;
use tracing::Level;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

static INIT: Once = Once::new();

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Minimum level for `buildsieve` targets
    pub level: Level,

    /// One JSON object per event instead of console lines
    pub use_json: bool,

    /// Include the module target (e.g., buildsieve::selector) in logs
    pub include_target: bool,

    /// Include file and line number information
    pub include_location: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            use_json: false,
            include_target: true,
            include_location: false,
        }
    }
}

impl LoggingConfig {
    pub fn with_level(level: Level) -> Self {
        Self {
            level,
            ..Default::default()
        }
    }
}

/// Parses a log level from a string, case-insensitively
///
/// Unknown values fall back to `INFO` with a warning on stderr.
///
/// ```
/// use buildsieve::util::logging::parse_level;
/// use tracing::Level;
///
/// assert_eq!(parse_level("debug"), Level::DEBUG);
/// assert_eq!(parse_level("INFO"), Level::INFO);
/// assert_eq!(parse_level("invalid"), Level::INFO);
/// ```
pub fn parse_level(level_str: &str) -> Level {
    match level_str.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => {
            eprintln!(
                "Invalid log level '{}', defaulting to INFO. Valid levels: trace, debug, info, warn, error",
                level_str
            );
            Level::INFO
        }
    }
}

/// Install the global subscriber. Only the first call has any effect.
pub fn init_logging(config: LoggingConfig) {
    INIT.call_once(|| {
        let mut filter = EnvFilter::from_default_env();
        for directive in base_directives(&config.level, env::var("RUST_LOG").is_err()) {
            if let Ok(d) = directive.parse() {
                filter = filter.add_directive(d);
            }
        }

        // Logs go to stderr so reports on stdout stay machine-readable
        if config.use_json {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .json()
                        .with_writer(std::io::stderr)
                        .with_target(config.include_target)
                        .with_file(config.include_location)
                        .with_line_number(config.include_location),
                )
                .init();
        } else {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .with_writer(std::io::stderr)
                        .with_target(config.include_target)
                        .with_file(config.include_location)
                        .with_line_number(config.include_location),
                )
                .init();
        }
    });
}

/// Crate level first, then quieter HTTP internals unless `RUST_LOG` takes over
fn base_directives(level: &Level, quiet_http: bool) -> Vec<String> {
    let mut directives = vec![format!("buildsieve={}", level.as_str().to_lowercase())];
    if quiet_http {
        directives.extend(
            ["h2=warn", "hyper=warn", "hyper_util=warn", "reqwest=warn"]
                .iter()
                .map(|d| d.to_string()),
        );
    }
    directives
}

/// Reads `BUILDSIEVE_LOG_LEVEL` and `BUILDSIEVE_LOG_JSON`
pub fn config_from_env() -> LoggingConfig {
    let level = env::var("BUILDSIEVE_LOG_LEVEL")
        .map(|v| parse_level(&v))
        .unwrap_or(Level::INFO);

    let use_json = env::var("BUILDSIEVE_LOG_JSON")
        .ok()
        .and_then(|v| v.parse::<bool>().ok())
        .unwrap_or(false);

    LoggingConfig {
        level,
        use_json,
        ..Default::default()
    }
}

/// ```no_run
/// buildsieve::util::logging::init_from_env();
/// tracing::info!("ready");
/// ```
pub fn init_from_env() {
    init_logging(config_from_env());
}
