//! Unit tests for log.rs
//!
//! Tests LogSeverity ordering, LogEntry, and ConsoleLogger formatting.

use crate::log::{ConsoleLogger, LogEntry, LogSeverity, Logger};
use std::time::SystemTime;

fn entry(severity: LogSeverity, file: Option<&'static str>, line: Option<u32>) -> LogEntry {
    LogEntry {
        severity,
        timestamp: SystemTime::now(),
        source: "raytile::Scene".to_string(),
        message: "tile grid 8x8".to_string(),
        file,
        line,
    }
}

// ============================================================================
// LOG SEVERITY TESTS
// ============================================================================

#[test]
fn test_log_severity_ordering() {
    assert!(LogSeverity::Trace < LogSeverity::Debug);
    assert!(LogSeverity::Debug < LogSeverity::Info);
    assert!(LogSeverity::Info < LogSeverity::Warn);
    assert!(LogSeverity::Warn < LogSeverity::Error);
}

#[test]
fn test_log_severity_labels_fixed_width() {
    for severity in [
        LogSeverity::Trace,
        LogSeverity::Debug,
        LogSeverity::Info,
        LogSeverity::Warn,
        LogSeverity::Error,
    ] {
        assert_eq!(severity.label().len(), 5);
    }
}

// ============================================================================
// LOG ENTRY TESTS
// ============================================================================

#[test]
fn test_log_entry_clone() {
    let entry1 = entry(LogSeverity::Warn, Some("scene.rs"), Some(10));
    let entry2 = entry1.clone();

    assert_eq!(entry1.severity, entry2.severity);
    assert_eq!(entry1.source, entry2.source);
    assert_eq!(entry1.message, entry2.message);
    assert_eq!(entry1.file, entry2.file);
    assert_eq!(entry1.line, entry2.line);
}

// ============================================================================
// CONSOLE LOGGER TESTS
// ============================================================================

#[test]
fn test_console_logger_default_min_severity() {
    assert_eq!(ConsoleLogger::default().min_severity(), LogSeverity::Debug);
}

#[test]
fn test_format_entry_without_location() {
    colored::control::set_override(false);
    let line = ConsoleLogger::format_entry(&entry(LogSeverity::Info, None, None));
    assert!(line.contains("[INFO ]"));
    assert!(line.contains("[raytile::Scene]"));
    assert!(line.ends_with("tile grid 8x8"));
}

#[test]
fn test_format_entry_with_location() {
    colored::control::set_override(false);
    let line = ConsoleLogger::format_entry(&entry(LogSeverity::Error, Some("scene.rs"), Some(42)));
    assert!(line.contains("[ERROR]"));
    assert!(line.ends_with("(scene.rs:42)"));
}

#[test]
fn test_console_logger_accepts_all_levels() {
    // Filtering must not panic for entries below the threshold
    let logger = ConsoleLogger::new(LogSeverity::Error);
    logger.log(&entry(LogSeverity::Trace, None, None));
    logger.log(&entry(LogSeverity::Error, Some("x.rs"), Some(1)));
}
