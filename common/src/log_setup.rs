use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use tracing::Level;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

#[derive(Debug, thiserror::Error)]
pub enum LogSetupError {
    #[error("Invalid log filter '{filter}': {source}")]
    Filter {
        filter: String,
        #[source]
        source: tracing_subscriber::filter::ParseError,
    },
    #[error("Failed to prepare log directory '{}': {source}", dir.display())]
    Directory {
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to create log file appender: {0}")]
    Appender(#[from] tracing_appender::rolling::InitError),
    #[error("Logging already initialized")]
    AlreadyInitialized,
}

/// Where and how verbosely a process logs.
#[derive(Clone, Debug)]
pub struct LogOptions {
    /// Filter used when `RUST_LOG` is unset, e.g. `"info"` or `"darkroom=debug"`.
    pub base_level: String,
    /// Prefix of the daily log files.
    pub file_prefix: String,
    /// Directory for log files; `None` disables file logging.
    pub dir: Option<PathBuf>,
    /// Rolled files kept on disk.
    pub max_files: usize,
}

impl Default for LogOptions {
    fn default() -> Self {
        Self {
            base_level: "info".to_string(),
            file_prefix: "darkroom".to_string(),
            dir: Some(PathBuf::from("logs")),
            max_files: 5,
        }
    }
}

impl LogOptions {
    pub fn with_level(mut self, base_level: impl Into<String>) -> Self {
        self.base_level = base_level.into();
        self
    }

    pub fn console_only(mut self) -> Self {
        self.dir = None;
        self
    }
}

/// Shorthand for [`init_logging`] with default options at `base_level`.
pub fn setup_logging(base_level: &str) -> Result<(), LogSetupError> {
    init_logging(&LogOptions::default().with_level(base_level))
}

/// Installs the global subscriber: console output, with warnings and above
/// also going to stderr, plus an optional daily-rolling file.
///
/// `RUST_LOG` overrides `options.base_level` when set.
pub fn init_logging(options: &LogOptions) -> Result<(), LogSetupError> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&options.base_level).map_err(|source| {
            LogSetupError::Filter {
                filter: options.base_level.clone(),
                source,
            }
        })?,
    };

    let console_writer = std::io::stdout.and(std::io::stderr.with_min_level(Level::WARN));
    let console_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_ansi(true)
        .with_writer(console_writer);

    let (file_layer, guard) = match &options.dir {
        Some(dir) => {
            let (file_writer, guard) = rolling_file_writer(dir, options)?;
            let layer = tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_line_number(true)
                .with_file(true)
                .with_ansi(false)
                .with_writer(file_writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|_| LogSetupError::AlreadyInitialized)?;

    // Kept only once the subscriber writing through it is installed.
    if let Some(guard) = guard {
        LOG_GUARD
            .set(guard)
            .map_err(|_| LogSetupError::AlreadyInitialized)?;
    }
    Ok(())
}

fn rolling_file_writer(
    dir: &Path,
    options: &LogOptions,
) -> Result<(NonBlocking, WorkerGuard), LogSetupError> {
    std::fs::create_dir_all(dir).map_err(|source| LogSetupError::Directory {
        dir: dir.to_path_buf(),
        source,
    })?;

    let appender = tracing_appender::rolling::Builder::new()
        .rotation(tracing_appender::rolling::Rotation::DAILY)
        .filename_prefix(&options.file_prefix)
        .filename_suffix("log")
        .max_log_files(options.max_files)
        .build(dir)?;

    Ok(tracing_appender::non_blocking(appender))
}
