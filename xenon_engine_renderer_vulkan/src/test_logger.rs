//! Capturing logger for the backend unit tests
//!
//! Tests that install it must be `#[serial]`: the engine logger is process-wide.

use std::sync::{Arc, Mutex};

use xenon_engine::xenon::log::{LogEntry, LogSeverity, Logger};
use xenon_engine::xenon::Engine;

#[derive(Clone)]
pub struct CapturedLogs {
    entries: Arc<Mutex<Vec<LogEntry>>>,
}

impl CapturedLogs {
    pub fn count(&self, severity: LogSeverity) -> usize {
        self.entries.lock().unwrap().iter().filter(|e| e.severity == severity).count()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.entries.lock().unwrap().iter().any(|e| e.message.contains(needle))
    }

    pub fn sources(&self) -> Vec<String> {
        self.entries.lock().unwrap().iter().map(|e| e.source.clone()).collect()
    }
}

pub struct TestLogger {
    entries: Arc<Mutex<Vec<LogEntry>>>,
}

impl TestLogger {
    pub fn install() -> CapturedLogs {
        let entries = Arc::new(Mutex::new(Vec::new()));
        Engine::set_logger(TestLogger { entries: entries.clone() });
        CapturedLogs { entries }
    }

    pub fn uninstall() {
        Engine::reset_logger();
    }
}

impl Logger for TestLogger {
    fn log(&self, entry: &LogEntry) {
        self.entries.lock().unwrap().push(entry.clone());
    }
}
