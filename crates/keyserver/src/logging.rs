//! # Logging
//!
//! Structured logging on the `tracing` ecosystem.
//!
//! The gateway logs to stderr in one of three formats and can additionally
//! write a daily-rolling log file. Every HTTP request runs inside a span that
//! carries a correlation id (see [`new_correlation_id`]).
//!
//! Passwords, passphrases and mnemonics are never logged. Security-relevant
//! events go through [`log_security_event`] on the `keyserver::security`
//! target so they can be routed separately.
//!
//! ```no_run
//! use keyserver::logging::{init_logging, LogConfig, LogFormat, LogLevel};
//!
//! let config = LogConfig {
//!     level: LogLevel::Debug,
//!     format: LogFormat::Json,
//!     ..Default::default()
//! };
//! let _guard = init_logging(&config).expect("logging initializes once");
//! tracing::info!("gateway starting");
//! ```

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::Level;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer, Registry,
};

/// Target used for security events.
pub const SECURITY_TARGET: &str = "keyserver::security";

/// Error type for logging initialization failures.
#[derive(Debug, thiserror::Error)]
pub enum LogError {
    /// The log file or its directory could not be created.
    #[error("failed to create log file: {0}")]
    FileCreation(String),
    /// A global subscriber is already installed.
    #[error("failed to initialize logging: {0}")]
    SubscriberInit(String),
    /// The configuration is unusable.
    #[error("invalid log configuration: {0}")]
    InvalidConfig(String),
}

/// Minimum severity of logged messages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogLevel {
    /// Everything.
    Trace,
    /// Debug and above.
    Debug,
    /// Info and above.
    #[default]
    Info,
    /// Warnings and errors.
    Warn,
    /// Errors only.
    Error,
}

impl LogLevel {
    /// Convert to a tracing [`Level`].
    #[must_use]
    pub const fn as_tracing_level(self) -> Level {
        match self {
            Self::Trace => Level::TRACE,
            Self::Debug => Level::DEBUG,
            Self::Info => Level::INFO,
            Self::Warn => Level::WARN,
            Self::Error => Level::ERROR,
        }
    }

    /// Directive string for [`EnvFilter`].
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    /// Multi-line, human-readable output.
    #[default]
    Pretty,
    /// One JSON object per line, for log aggregation.
    Json,
    /// Single-line human-readable output.
    Compact,
}

impl std::fmt::Display for LogFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Pretty => "pretty",
            Self::Json => "json",
            Self::Compact => "compact",
        })
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Default)]
pub struct LogConfig {
    /// Minimum level. `RUST_LOG` overrides it when set.
    pub level: LogLevel,
    /// Console format.
    pub format: LogFormat,
    /// Optional log file, rotated daily. Its directory is created if missing.
    pub file_path: Option<PathBuf>,
}

/// Keeps the background log-file writer alive; logs are flushed when it drops.
pub struct LogGuard {
    guard: Option<tracing_appender::non_blocking::WorkerGuard>,
}

impl std::fmt::Debug for LogGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogGuard")
            .field("has_file_guard", &self.guard.is_some())
            .finish()
    }
}

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

// Console output goes to stderr so client commands can pipe their JSON.
fn console_layer(format: LogFormat) -> BoxedLayer {
    match format {
        LogFormat::Pretty => fmt::layer()
            .pretty()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_span_events(FmtSpan::CLOSE)
            .boxed(),
        LogFormat::Json => fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_current_span(true)
            .boxed(),
        LogFormat::Compact => fmt::layer()
            .compact()
            .with_writer(std::io::stderr)
            .with_target(true)
            .boxed(),
    }
}

fn file_layer(
    format: LogFormat,
    writer: tracing_appender::non_blocking::NonBlocking,
) -> BoxedLayer {
    match format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_writer(writer)
            .with_target(true)
            .boxed(),
        LogFormat::Pretty | LogFormat::Compact => fmt::layer()
            .compact()
            .with_writer(writer)
            .with_ansi(false)
            .with_target(true)
            .boxed(),
    }
}

fn open_log_file(
    path: &Path,
) -> Result<
    (
        tracing_appender::non_blocking::NonBlocking,
        tracing_appender::non_blocking::WorkerGuard,
    ),
    LogError,
> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir)
        .map_err(|e| LogError::FileCreation(format!("{}: {e}", dir.display())))?;

    let filename = path
        .file_name()
        .and_then(|s| s.to_str())
        .ok_or_else(|| {
            LogError::InvalidConfig(format!("invalid log file name: {}", path.display()))
        })?;

    let appender = tracing_appender::rolling::daily(dir, filename);
    Ok(tracing_appender::non_blocking(appender))
}

/// Installs the global subscriber.
///
/// # Errors
///
/// Returns [`LogError`] if the log file cannot be created or a subscriber
/// is already installed.
pub fn init_logging(config: &LogConfig) -> Result<LogGuard, LogError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.level.as_str()))
        .map_err(|e| LogError::InvalidConfig(e.to_string()))?;

    let mut layers = vec![console_layer(config.format)];
    let mut guard = None;

    if let Some(path) = &config.file_path {
        let (writer, worker_guard) = open_log_file(path)?;
        layers.push(file_layer(config.format, writer));
        guard = Some(worker_guard);
    }

    tracing_subscriber::registry()
        .with(layers)
        .with(filter)
        .try_init()
        .map_err(|e| LogError::SubscriberInit(e.to_string()))?;

    Ok(LogGuard { guard })
}

/// Masks a value that must be referenced in a log line.
///
/// Values shorter than 12 characters become `***`; longer ones keep their
/// first and last four characters.
///
/// ```
/// use keyserver::logging::redact_sensitive;
///
/// assert_eq!(redact_sensitive("cosmos1yv6alpum5r0nmnzkk4esp3"), "cosm***esp3");
/// assert_eq!(redact_sensitive("123456789"), "***");
/// ```
#[must_use]
pub fn redact_sensitive(value: &str) -> String {
    const MIN_LENGTH_FOR_PARTIAL: usize = 12;
    const VISIBLE_CHARS: usize = 4;

    let chars: Vec<char> = value.chars().collect();
    if chars.len() < MIN_LENGTH_FOR_PARTIAL {
        return "***".to_string();
    }

    let prefix: String = chars.iter().take(VISIBLE_CHARS).collect();
    let suffix: String = chars.iter().skip(chars.len() - VISIBLE_CHARS).collect();
    format!("{prefix}***{suffix}")
}

/// A 32-character hex id for correlating the log lines of one request.
///
/// Unique within the process; not suitable for anything security related.
#[must_use]
pub fn new_correlation_id() -> String {
    static COUNTER: AtomicU64 = AtomicU64::new(0);

    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    let counter = COUNTER.fetch_add(1, Ordering::Relaxed);

    // Truncation keeps the low 64 bits, which is all the id needs.
    #[allow(clippy::cast_possible_truncation)]
    let time_part = nanos as u64;

    // splitmix64 over the counter so consecutive ids look unrelated.
    let mut mixed = counter.wrapping_add(time_part).wrapping_add(0x9e37_79b9_7f4a_7c15);
    mixed = (mixed ^ (mixed >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    mixed = (mixed ^ (mixed >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    mixed ^= mixed >> 31;

    format!("{time_part:016x}{mixed:016x}")
}

/// Maps `-v` counts to a level: 0 = warn, 1 = info, 2 = debug, 3+ = trace.
#[must_use]
pub const fn verbosity_to_level(verbosity: u8) -> LogLevel {
    match verbosity {
        0 => LogLevel::Warn,
        1 => LogLevel::Info,
        2 => LogLevel::Debug,
        _ => LogLevel::Trace,
    }
}

/// Logs a security-relevant event (key created, deleted, wrong password, ...).
///
/// `key_name` and `details` pass through [`redact_sensitive`] before they
/// reach any sink.
pub fn log_security_event(event: &str, key_name: &str, details: &str) {
    tracing::info!(
        target: SECURITY_TARGET,
        security_event = event,
        key_name = %redact_sensitive(key_name),
        details = %redact_sensitive(details),
        "security event"
    );
}
