//! Unit tests for the Engine logging facade
//!
//! The logger is process-wide, so every test is #[serial].

use crate::engine::Engine;
use crate::log::LogSeverity;
use crate::test_logger::TestLogger;
use serial_test::serial;

#[test]
#[serial]
fn test_log_routes_to_installed_logger() {
    let logs = TestLogger::install();

    Engine::log(LogSeverity::Info, "xenon::test", "hello".to_string());

    let entries = logs.entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].severity, LogSeverity::Info);
    assert_eq!(entries[0].source, "xenon::test");
    assert_eq!(entries[0].message, "hello");
    assert!(entries[0].file.is_none());

    TestLogger::uninstall();
}

#[test]
#[serial]
fn test_log_detailed_carries_location() {
    let logs = TestLogger::install();

    Engine::log_detailed(LogSeverity::Error, "xenon::test", "boom".to_string(), "engine.rs", 7);

    let entries = logs.entries();
    assert_eq!(entries[0].file, Some("engine.rs"));
    assert_eq!(entries[0].line, Some(7));

    TestLogger::uninstall();
}

#[test]
#[serial]
fn test_macros_use_expected_severity() {
    let logs = TestLogger::install();

    crate::engine_trace!("xenon::test", "t");
    crate::engine_debug!("xenon::test", "d");
    crate::engine_info!("xenon::test", "i");
    crate::engine_warn!("xenon::test", "w");
    crate::engine_error!("xenon::test", "e {}", 1);

    let severities: Vec<LogSeverity> = logs.entries().iter().map(|e| e.severity).collect();
    assert_eq!(
        severities,
        vec![
            LogSeverity::Trace,
            LogSeverity::Debug,
            LogSeverity::Info,
            LogSeverity::Warn,
            LogSeverity::Error,
        ]
    );
    assert!(logs.contains("e 1"));

    TestLogger::uninstall();
}

#[test]
#[serial]
fn test_reset_logger_detaches_capture() {
    let logs = TestLogger::install();
    TestLogger::uninstall();

    Engine::log(LogSeverity::Info, "xenon::test", "not captured".to_string());

    assert!(logs.entries().is_empty());
}
