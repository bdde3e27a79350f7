/// Engine-wide services shared by every scene in the process.
///
/// Scenes own all of their per-frame state, so the only process-wide
/// resource is the logger. It lives in thread-safe static storage behind an
/// RwLock so worker threads can log while the main thread swaps loggers.

use std::sync::{OnceLock, RwLock};
use std::time::SystemTime;
use crate::log::{ConsoleLogger, LogEntry, LogSeverity, Logger};

/// Global logger (initialized with ConsoleLogger on first use)
static LOGGER: OnceLock<RwLock<Box<dyn Logger>>> = OnceLock::new();

fn logger() -> &'static RwLock<Box<dyn Logger>> {
    LOGGER.get_or_init(|| RwLock::new(Box::new(ConsoleLogger::default())))
}

/// Access point for process-wide services (logging).
///
/// # Example
///
/// ```no_run
/// use raytile::raytile::{Engine, log::{Logger, LogEntry}};
///
/// struct FileLogger;
/// impl Logger for FileLogger {
///     fn log(&self, entry: &LogEntry) {
///         // Write to file...
///     }
/// }
///
/// Engine::set_logger(FileLogger);
/// ```
pub struct Engine;

impl Engine {
    /// Replace the active logger
    pub fn set_logger<L: Logger + 'static>(logger_impl: L) {
        if let Ok(mut lock) = logger().write() {
            *lock = Box::new(logger_impl);
        }
    }

    /// Restore the default console logger
    pub fn reset_logger() {
        if let Ok(mut lock) = logger().write() {
            *lock = Box::new(ConsoleLogger::default());
        }
    }

    /// Log a message without source location.
    ///
    /// Used by the `engine_trace!` .. `engine_warn!` macros.
    pub fn log(severity: LogSeverity, source: &str, message: String) {
        if let Ok(lock) = logger().read() {
            lock.log(&LogEntry {
                severity,
                timestamp: SystemTime::now(),
                source: source.to_string(),
                message,
                file: None,
                line: None,
            });
        }
    }

    /// Log a message with file:line information.
    ///
    /// Used by `engine_error!` (and through it `engine_err!`/`engine_bail!`).
    pub fn log_detailed(
        severity: LogSeverity,
        source: &str,
        message: String,
        file: &'static str,
        line: u32,
    ) {
        if let Ok(lock) = logger().read() {
            lock.log(&LogEntry {
                severity,
                timestamp: SystemTime::now(),
                source: source.to_string(),
                message,
                file: Some(file),
                line: Some(line),
            });
        }
    }
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
