//! Capturing logger shared by the unit tests.
//!
//! Tests that install it must be `#[serial]`: the engine logger is process-wide.

use std::sync::{Arc, Mutex};

use crate::engine::Engine;
use crate::log::{LogEntry, LogSeverity, Logger};

/// Handle to the entries captured by an installed `TestLogger`
#[derive(Clone)]
pub struct CapturedLogs {
    entries: Arc<Mutex<Vec<LogEntry>>>,
}

impl CapturedLogs {
    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries.lock().unwrap().clone()
    }

    pub fn count(&self, severity: LogSeverity) -> usize {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .filter(|entry| entry.severity == severity)
            .count()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .any(|entry| entry.message.contains(needle))
    }

    pub fn clear(&self) {
        self.entries.lock().unwrap().clear();
    }
}

/// Logger that stores every entry instead of printing it
pub struct TestLogger {
    entries: Arc<Mutex<Vec<LogEntry>>>,
}

impl TestLogger {
    /// Install a fresh capturing logger and return a handle to its entries
    pub fn install() -> CapturedLogs {
        let entries = Arc::new(Mutex::new(Vec::new()));
        Engine::set_logger(TestLogger { entries: entries.clone() });
        CapturedLogs { entries }
    }

    /// Restore the default console logger
    pub fn uninstall() {
        Engine::reset_logger();
    }
}

impl Logger for TestLogger {
    fn log(&self, entry: &LogEntry) {
        self.entries.lock().unwrap().push(entry.clone());
    }
}
