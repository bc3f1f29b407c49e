//! Unit tests for error.rs
//!
//! Tests Error variants, Display output and the logging error macros.

use crate::error::{Error, Result};
use crate::log::LogSeverity;
use crate::test_logger::TestLogger;
use serial_test::serial;

// ============================================================================
// ERROR DISPLAY TESTS
// ============================================================================

#[test]
fn test_backend_error_display() {
    let err = Error::BackendError("vkCreateFence failed".to_string());
    let display = format!("{}", err);
    assert!(display.contains("Backend error"));
    assert!(display.contains("vkCreateFence failed"));
}

#[test]
fn test_out_of_memory_display() {
    assert_eq!(format!("{}", Error::OutOfMemory), "Out of GPU memory");
}

#[test]
fn test_invalid_resource_display() {
    let err = Error::InvalidResource("write past the end of the buffer".to_string());
    let display = format!("{}", err);
    assert!(display.starts_with("Invalid resource"));
    assert!(display.contains("write past the end"));
}

#[test]
fn test_initialization_failed_display() {
    let err = Error::InitializationFailed("no adapter".to_string());
    assert_eq!(format!("{}", err), "Initialization failed: no adapter");
}

#[test]
fn test_invalid_pipeline_cache_display() {
    let err = Error::InvalidPipelineCache("VK_ERROR_UNKNOWN".to_string());
    assert_eq!(format!("{}", err), "Invalid pipeline cache: VK_ERROR_UNKNOWN");
}

#[test]
fn test_error_is_std_error() {
    let err = Error::OutOfMemory;
    let _: &dyn std::error::Error = &err;
}

#[test]
fn test_result_alias() {
    fn fails() -> Result<u32> {
        Err(Error::OutOfMemory)
    }
    assert_eq!(fails(), Err(Error::OutOfMemory));
}

// ============================================================================
// MACRO TESTS
// ============================================================================

#[test]
#[serial]
fn test_engine_err_logs_and_builds_backend_error() {
    let logs = TestLogger::install();

    let err = crate::engine_err!("xenon::test", "fence {} lost", 3);

    assert_eq!(err, Error::BackendError("fence 3 lost".to_string()));
    let entries = logs.entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].severity, LogSeverity::Error);
    assert_eq!(entries[0].source, "xenon::test");
    assert_eq!(entries[0].message, "fence 3 lost");
    assert!(entries[0].file.is_some());
    assert!(entries[0].line.is_some());

    TestLogger::uninstall();
}

#[test]
#[serial]
fn test_engine_bail_returns_early() {
    let logs = TestLogger::install();

    fn bail(value: u32) -> Result<u32> {
        if value > 1 {
            crate::engine_bail!("xenon::test", "value {} too large", value);
        }
        Ok(value)
    }

    assert_eq!(bail(1), Ok(1));
    assert!(matches!(bail(2), Err(Error::BackendError(_))));
    assert_eq!(logs.count(LogSeverity::Error), 1);

    TestLogger::uninstall();
}

#[test]
#[serial]
fn test_engine_bail_warn_logs_warning() {
    let logs = TestLogger::install();

    fn bail() -> Result<()> {
        crate::engine_bail_warn!("xenon::test", "soft failure");
    }

    assert_eq!(bail(), Err(Error::BackendError("soft failure".to_string())));
    assert_eq!(logs.count(LogSeverity::Warn), 1);
    assert_eq!(logs.count(LogSeverity::Error), 0);

    TestLogger::uninstall();
}
