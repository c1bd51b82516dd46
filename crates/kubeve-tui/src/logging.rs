//! File logging for the interactive binary.
//!
//! The terminal belongs to the UI, so logs only go to a file. Without a file
//! no subscriber is installed and every `tracing` call is a no-op.

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::OnceLock;

use clap::ValueEnum;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

/// Overrides the level-derived filter with a full directive string.
pub const LOG_FILTER_ENV: &str = "KUBEVE_LOG_FILTER";

#[derive(Clone, Copy, Debug, Default, ValueEnum, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Error,
    #[default]
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct LogConfig {
    pub level: LogLevel,
    pub file: Option<PathBuf>,
}

#[derive(thiserror::Error, Debug)]
pub enum InitError {
    #[error("failed to open log file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to configure logger: {0}")]
    Configure(String),
}

static GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Installs the global subscriber. Calling it again is a no-op.
pub fn init(config: &LogConfig) -> Result<(), InitError> {
    if GUARD.get().is_some() {
        return Ok(());
    }
    let Some(path) = &config.file else {
        return Ok(());
    };

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| InitError::Io {
            path: path.clone(),
            source,
        })?;
    let (writer, guard) = tracing_appender::non_blocking(file);

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(build_env_filter(config.level))
        .with_target(config.level >= LogLevel::Debug)
        .with_thread_ids(config.level >= LogLevel::Trace)
        .with_ansi(false)
        .with_writer(writer)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .map_err(|err| InitError::Configure(err.to_string()))?;

    let _ = GUARD.set(guard);
    Ok(())
}

fn build_env_filter(level: LogLevel) -> EnvFilter {
    match std::env::var(LOG_FILTER_ENV) {
        Ok(directives) => EnvFilter::new(directives),
        Err(_) => EnvFilter::new(default_directives(level)),
    }
}

/// Our own crates at `level`, dependencies at warn.
fn default_directives(level: LogLevel) -> String {
    let filter = level.as_str();
    match level {
        LogLevel::Error | LogLevel::Warn => filter.to_owned(),
        LogLevel::Info | LogLevel::Debug | LogLevel::Trace => format!(
            "warn,kubeve={filter},kubeve_tui={filter},kubeve_kube={filter},kubeve_core={filter}"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::{default_directives, init, LogConfig, LogLevel};

    #[test]
    fn directives_scope_verbose_levels_to_own_crates() {
        assert_eq!(default_directives(LogLevel::Warn), "warn");
        assert_eq!(default_directives(LogLevel::Error), "error");
        let debug = default_directives(LogLevel::Debug);
        assert!(debug.starts_with("warn,"));
        assert!(debug.contains("kubeve_tui=debug"));
        assert!(debug.contains("kubeve_kube=debug"));
    }

    #[test]
    fn without_file_nothing_is_installed() {
        assert!(init(&LogConfig::default()).is_ok());
    }
}
