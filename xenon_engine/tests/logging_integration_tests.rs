//! Integration tests for the Engine logging system and the error macros
//!
//! No GPU required.

use std::sync::{Arc, Mutex};

use serial_test::serial;
use xenon_engine::xenon::backend::PipelineCache;
use xenon_engine::xenon::log::{LogEntry, LogSeverity, Logger};
use xenon_engine::xenon::{Engine, Error, Result};
use xenon_engine::{engine_bail, engine_bail_warn, engine_err, engine_info};

/// Installs itself as the engine logger and keeps every entry
struct CapturingLogger {
    entries: Arc<Mutex<Vec<LogEntry>>>,
}

impl CapturingLogger {
    fn install() -> Arc<Mutex<Vec<LogEntry>>> {
        let entries = Arc::new(Mutex::new(Vec::new()));
        Engine::set_logger(Self { entries: entries.clone() });
        entries
    }
}

impl Logger for CapturingLogger {
    fn log(&self, entry: &LogEntry) {
        self.entries.lock().unwrap().push(entry.clone());
    }
}

// ===== LOGGING =====

#[test]
#[serial]
fn test_integration_entries_keep_order_and_source() {
    let entries = CapturingLogger::install();

    Engine::log(LogSeverity::Info, "xenon::Instance", "Device created".to_string());
    Engine::log(LogSeverity::Warn, "xenon::Device", "Ray tracing unavailable".to_string());
    Engine::log(LogSeverity::Error, "xenon::Buffer", "Write out of range".to_string());

    let captured = entries.lock().unwrap();
    let summary: Vec<(LogSeverity, &str)> = captured.iter().map(|e| (e.severity, e.source.as_str())).collect();
    assert_eq!(
        summary,
        vec![
            (LogSeverity::Info, "xenon::Instance"),
            (LogSeverity::Warn, "xenon::Device"),
            (LogSeverity::Error, "xenon::Buffer"),
        ]
    );
    drop(captured);

    Engine::reset_logger();
}

#[test]
#[serial]
fn test_integration_detailed_entry_carries_location() {
    let entries = CapturingLogger::install();

    Engine::log_detailed(
        LogSeverity::Error,
        "xenon::CommandSubmitter",
        "Fence wait timed out".to_string(),
        "command.rs",
        128,
    );

    let captured = entries.lock().unwrap();
    assert_eq!(captured.len(), 1);
    assert_eq!((captured[0].file, captured[0].line), (Some("command.rs"), Some(128)));
    drop(captured);

    Engine::reset_logger();
}

#[test]
#[serial]
fn test_integration_reset_detaches_custom_logger() {
    let entries = CapturingLogger::install();

    engine_info!("xenon::Instance", "Frame {}", 1);
    Engine::reset_logger();
    engine_info!("xenon::Instance", "Frame {}", 2);

    let captured = entries.lock().unwrap();
    assert_eq!(captured.len(), 1);
    assert_eq!(captured[0].message, "Frame 1");
}

#[test]
#[serial]
fn test_integration_missing_cache_handler_is_reported_not_failed() {
    let entries = CapturingLogger::install();

    let cache = PipelineCache::new(None);
    assert!(cache.load(42).is_empty());
    cache.store(42, &[1, 2, 3]);

    let captured = entries.lock().unwrap();
    assert_eq!(captured.len(), 2);
    assert!(captured.iter().all(|e| e.severity == LogSeverity::Info && e.source == "xenon::Pipeline"));
    drop(captured);

    Engine::reset_logger();
}

// ===== ERROR MACROS =====

fn failing_operation(fail: bool) -> Result<u32> {
    if fail {
        engine_bail!("xenon::test", "Operation failed with code {}", 7);
    }
    Ok(1)
}

fn degraded_operation() -> Result<()> {
    engine_bail_warn!("xenon::test", "Feature unavailable");
}

#[test]
#[serial]
fn test_integration_bail_logs_and_returns_backend_error() {
    let entries = CapturingLogger::install();

    assert_eq!(failing_operation(false), Ok(1));
    let result = failing_operation(true);

    assert_eq!(result, Err(Error::BackendError("Operation failed with code 7".to_string())));
    let captured = entries.lock().unwrap();
    assert_eq!(captured.len(), 1);
    assert_eq!(captured[0].severity, LogSeverity::Error);
    assert_eq!(captured[0].source, "xenon::test");
    assert!(captured[0].file.is_some());
    drop(captured);

    Engine::reset_logger();
}

#[test]
#[serial]
fn test_integration_warning_bail_logs_at_warn_level() {
    let entries = CapturingLogger::install();

    assert!(degraded_operation().is_err());

    let captured = entries.lock().unwrap();
    assert_eq!(captured.len(), 1);
    assert_eq!(captured[0].severity, LogSeverity::Warn);
    drop(captured);

    Engine::reset_logger();
}

#[test]
#[serial]
fn test_integration_err_macro_builds_without_returning() {
    let entries = CapturingLogger::install();

    let error = engine_err!("xenon::test", "Device lost");

    assert_eq!(error.to_string(), "Backend error: Device lost");
    assert_eq!(entries.lock().unwrap().len(), 1);

    Engine::reset_logger();
}
