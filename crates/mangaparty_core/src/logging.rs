//! Rolling file logs and the core event line format.
//!
//! # Responsibility
//! - Start the `flexi_logger` file backend once per process.
//! - Build the `key=value` event lines every core module emits.
//!
//! # Invariants
//! - A second `init_logging` with the same level and directory is a no-op;
//!   any other combination is rejected with `LoggingError::Conflict`.
//! - Initialization never panics.
//! - An event line starts with `event`, `module`, `status`; every value is
//!   a single token (no whitespace, no `=`), capped at `MAX_VALUE_CHARS`.
//! - Callers pass metadata only: ids, kinds, layers, counts, error codes.
//!   Attribute values and notes never reach a field.

use crate::db::migrations::latest_version;
use flexi_logger::{
    Cleanup, Criterion, FileSpec, FlexiLoggerError, LogSpecification, Logger, LoggerHandle,
    Naming, WriteMode,
};
use log::{error, info, LevelFilter};
use once_cell::sync::OnceCell;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::time::Instant;

const LOG_FILE_BASENAME: &str = "mangaparty";
const ROTATE_AT_BYTES: u64 = 8 * 1024 * 1024;
const KEEP_ROTATED_FILES: usize = 7;
const MAX_VALUE_CHARS: usize = 120;

static ACTIVE: OnceCell<ActiveLogger> = OnceCell::new();
static PANIC_HOOK: OnceCell<()> = OnceCell::new();

struct ActiveLogger {
    level: LevelFilter,
    log_dir: PathBuf,
    _handle: LoggerHandle,
}

/// Outcome slot of an event line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventStatus {
    Start,
    Ok,
    Error,
}

impl EventStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Ok => "ok",
            Self::Error => "error",
        }
    }
}

/// One structured log line.
///
/// ```
/// use mangaparty_core::logging::{EventLine, EventStatus};
///
/// let line = EventLine::new("entity_delete", "service", EventStatus::Ok).field("layers", 2);
/// assert_eq!(
///     line.to_string(),
///     "event=entity_delete module=service status=ok layers=2"
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventLine {
    line: String,
}

impl EventLine {
    pub fn new(event: &str, module: &str, status: EventStatus) -> Self {
        let mut line = Self {
            line: String::with_capacity(128),
        };
        line.push("event", event);
        line.push("module", module);
        line.push("status", status.as_str());
        line
    }

    /// Appends `key=value`; the value is flattened into one token.
    pub fn field(mut self, key: &str, value: impl Display) -> Self {
        let value = value.to_string();
        self.push(key, &value);
        self
    }

    /// Appends `duration_ms` measured from `started_at`.
    pub fn elapsed(self, started_at: Instant) -> Self {
        self.field("duration_ms", started_at.elapsed().as_millis())
    }

    /// Appends the stable `error_code` of a failure.
    pub fn error_code(self, code: &str) -> Self {
        self.field("error_code", code)
    }

    fn push(&mut self, key: &str, value: &str) {
        if !self.line.is_empty() {
            self.line.push(' ');
        }
        self.line.push_str(key);
        self.line.push('=');
        push_token(&mut self.line, value);
    }
}

impl Display for EventLine {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.line)
    }
}

fn push_token(out: &mut String, value: &str) {
    if value.is_empty() {
        out.push('-');
        return;
    }
    for (index, ch) in value.chars().enumerate() {
        if index == MAX_VALUE_CHARS {
            out.push_str("...");
            return;
        }
        if ch.is_whitespace() || ch.is_control() || ch == '=' {
            out.push('_');
        } else {
            out.push(ch);
        }
    }
}

#[derive(Debug)]
pub enum LoggingError {
    UnsupportedLevel(String),
    /// Log directory is empty or relative.
    RelativeDirectory(PathBuf),
    CreateDirectory {
        path: PathBuf,
        source: std::io::Error,
    },
    Backend(FlexiLoggerError),
    /// Logging already runs with another level or directory.
    Conflict {
        active_level: LevelFilter,
        active_dir: PathBuf,
    },
}

impl Display for LoggingError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnsupportedLevel(level) => write!(
                f,
                "unsupported log level `{level}`; expected trace|debug|info|warn|error"
            ),
            Self::RelativeDirectory(path) => {
                write!(f, "log_dir must be an absolute path, got `{}`", path.display())
            }
            Self::CreateDirectory { path, source } => write!(
                f,
                "cannot create log directory `{}`: {source}",
                path.display()
            ),
            Self::Backend(err) => write!(f, "cannot start file logger: {err}"),
            Self::Conflict {
                active_level,
                active_dir,
            } => write!(
                f,
                "logging already active at level {active_level} in `{}`",
                active_dir.display()
            ),
        }
    }
}

impl Error for LoggingError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::CreateDirectory { source, .. } => Some(source),
            Self::Backend(err) => Some(err),
            _ => None,
        }
    }
}

/// Starts rolling file logs under `log_dir` and installs the panic hook.
///
/// # Errors
/// - `UnsupportedLevel` for anything but trace/debug/info/warn(ing)/error.
/// - `RelativeDirectory` when `log_dir` is not absolute.
/// - `Conflict` when logging already runs with another level or directory.
pub fn init_logging(level: &str, log_dir: impl AsRef<Path>) -> Result<(), LoggingError> {
    let level = parse_level(level)?;
    let log_dir = log_dir.as_ref();
    if !log_dir.is_absolute() {
        return Err(LoggingError::RelativeDirectory(log_dir.to_path_buf()));
    }

    let active = ACTIVE.get_or_try_init(|| start_file_logger(level, log_dir))?;
    if active.level != level || active.log_dir != log_dir {
        return Err(LoggingError::Conflict {
            active_level: active.level,
            active_dir: active.log_dir.clone(),
        });
    }
    Ok(())
}

/// Level and directory of the running file logger, if any.
pub fn logging_status() -> Option<(LevelFilter, PathBuf)> {
    ACTIVE
        .get()
        .map(|active| (active.level, active.log_dir.clone()))
}

/// `debug` for debug builds, `info` for release builds.
pub fn default_log_level() -> &'static str {
    if cfg!(debug_assertions) {
        "debug"
    } else {
        "info"
    }
}

fn parse_level(level: &str) -> Result<LevelFilter, LoggingError> {
    let trimmed = level.trim();
    let candidate = if trimmed.eq_ignore_ascii_case("warning") {
        "warn"
    } else {
        trimmed
    };
    match candidate.parse::<LevelFilter>() {
        // Disabling goes through `log_dir = None`, not a level.
        Ok(LevelFilter::Off) | Err(_) => Err(LoggingError::UnsupportedLevel(level.to_string())),
        Ok(parsed) => Ok(parsed),
    }
}

fn start_file_logger(level: LevelFilter, log_dir: &Path) -> Result<ActiveLogger, LoggingError> {
    std::fs::create_dir_all(log_dir).map_err(|source| LoggingError::CreateDirectory {
        path: log_dir.to_path_buf(),
        source,
    })?;

    let handle = Logger::with(LogSpecification::builder().default(level).build())
        .log_to_file(
            FileSpec::default()
                .directory(log_dir)
                .basename(LOG_FILE_BASENAME),
        )
        .rotate(
            Criterion::Size(ROTATE_AT_BYTES),
            Naming::Numbers,
            Cleanup::KeepLogFiles(KEEP_ROTATED_FILES),
        )
        .write_mode(WriteMode::BufferAndFlush)
        .append()
        // Concurrent writers run on their own threads.
        .format_for_files(flexi_logger::with_thread)
        .start()
        .map_err(LoggingError::Backend)?;

    install_panic_hook();
    info!(
        "{}",
        EventLine::new("core_init", "core", EventStatus::Ok)
            .field("version", env!("CARGO_PKG_VERSION"))
            .field("schema_version", latest_version())
            .field("level", level.as_str().to_ascii_lowercase())
            .field("os", std::env::consts::OS)
    );

    Ok(ActiveLogger {
        level,
        log_dir: log_dir.to_path_buf(),
        _handle: handle,
    })
}

fn install_panic_hook() {
    PANIC_HOOK.get_or_init(|| {
        let previous = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            error!("{}", panic_event(info));
            previous(info);
        }));
    });
}

fn panic_event(info: &std::panic::PanicHookInfo<'_>) -> EventLine {
    let location = info
        .location()
        .map_or_else(|| "unknown".to_string(), |loc| format!("{}:{}", loc.file(), loc.line()));
    let payload = info
        .payload()
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| info.payload().downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string payload");
    EventLine::new("panic_captured", "core", EventStatus::Error)
        .field("location", location)
        .field("payload", payload)
}
