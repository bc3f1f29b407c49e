//! Unit tests for log.rs
//!
//! Tests LogSeverity ordering, LogEntry formatting and DefaultLogger filtering.

use crate::log::{DefaultLogger, LogEntry, LogSeverity, Logger};
use std::time::SystemTime;

fn entry(severity: LogSeverity, file: Option<&'static str>, line: Option<u32>) -> LogEntry {
    LogEntry {
        severity,
        timestamp: SystemTime::now(),
        source: "xenon::test".to_string(),
        message: "pipeline cache miss".to_string(),
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
fn test_log_severity_labels_have_fixed_width() {
    for severity in [
        LogSeverity::Trace,
        LogSeverity::Debug,
        LogSeverity::Info,
        LogSeverity::Warn,
        LogSeverity::Error,
    ] {
        assert_eq!(severity.label().len(), 5);
    }
    assert_eq!(LogSeverity::Error.label(), "ERROR");
    assert_eq!(LogSeverity::Info.label(), "INFO ");
}

// ============================================================================
// FORMATTING TESTS
// ============================================================================

#[test]
fn test_format_plain_without_location() {
    let text = DefaultLogger::format_plain(&entry(LogSeverity::Info, None, None));
    assert!(text.contains("[INFO ] [xenon::test] pipeline cache miss"));
    assert!(!text.contains("("));
}

#[test]
fn test_format_plain_with_location() {
    let text = DefaultLogger::format_plain(&entry(LogSeverity::Error, Some("buffer.rs"), Some(12)));
    assert!(text.contains("[ERROR] [xenon::test] pipeline cache miss (buffer.rs:12)"));
}

#[test]
fn test_format_plain_requires_both_file_and_line() {
    let text = DefaultLogger::format_plain(&entry(LogSeverity::Error, Some("buffer.rs"), None));
    assert!(!text.contains("buffer.rs"));
}

// ============================================================================
// DEFAULT LOGGER TESTS
// ============================================================================

#[test]
fn test_default_logger_prints_everything_by_default() {
    assert_eq!(DefaultLogger::new().min_severity(), LogSeverity::Trace);
    assert_eq!(DefaultLogger::default().min_severity(), LogSeverity::Trace);
}

#[test]
fn test_default_logger_with_min_severity() {
    let logger = DefaultLogger::with_min_severity(LogSeverity::Warn);
    assert_eq!(logger.min_severity(), LogSeverity::Warn);
    // Filtered and printed entries must both be accepted without panicking
    logger.log(&entry(LogSeverity::Debug, None, None));
    logger.log(&entry(LogSeverity::Error, Some("log_tests.rs"), Some(1)));
}

#[test]
fn test_logger_is_object_safe() {
    let logger: Box<dyn Logger> = Box::new(DefaultLogger::new());
    logger.log(&entry(LogSeverity::Trace, None, None));
}
