/// Vulkan validation messages routed to the engine logger
///
/// Messages from the validation layers are filtered by severity and category,
/// counted, forwarded to the engine logger and optionally appended to a file.
/// The messenger itself only exists with the `vulkan-validation` feature; the
/// statistics are always available and stay at zero without it.

use std::fs::OpenOptions;
use std::io::Write;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use ash::vk;
use colored::*;
use rustc_hash::FxHashMap;
use xenon_engine::xenon::log::LogSeverity;
use xenon_engine::xenon::{DebugMessageFilter, DebugOutput, DebugSeverity, Engine, ValidationStats};

const VALIDATION_SOURCE: &str = "xenon::vulkan::validation";

/// Global debug configuration (shared across callbacks)
static DEBUG_CONFIG: Mutex<Option<DebugConfig>> = Mutex::new(None);

/// Global validation statistics
static VALIDATION_STATS: ValidationStatsTracker = ValidationStatsTracker::new();

/// Occurrences of each message text, used to flag repeats
static MESSAGE_TRACKER: Mutex<Option<FxHashMap<String, u32>>> = Mutex::new(None);

/// Debug configuration for the callback
#[derive(Debug, Clone, PartialEq)]
pub struct DebugConfig {
    pub severity: DebugSeverity,
    pub output: DebugOutput,
    pub message_filter: DebugMessageFilter,
}

struct ValidationStatsTracker {
    errors: AtomicU32,
    warnings: AtomicU32,
    info: AtomicU32,
    verbose: AtomicU32,
}

impl ValidationStatsTracker {
    const fn new() -> Self {
        Self {
            errors: AtomicU32::new(0),
            warnings: AtomicU32::new(0),
            info: AtomicU32::new(0),
            verbose: AtomicU32::new(0),
        }
    }

    fn counter(&self, severity: vk::DebugUtilsMessageSeverityFlagsEXT) -> &AtomicU32 {
        if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::ERROR) {
            &self.errors
        } else if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::WARNING) {
            &self.warnings
        } else if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::INFO) {
            &self.info
        } else {
            &self.verbose
        }
    }

    fn get_stats(&self) -> ValidationStats {
        ValidationStats {
            errors: self.errors.load(Ordering::Relaxed),
            warnings: self.warnings.load(Ordering::Relaxed),
            info: self.info.load(Ordering::Relaxed),
            verbose: self.verbose.load(Ordering::Relaxed),
        }
    }

    fn reset(&self) {
        self.errors.store(0, Ordering::Relaxed);
        self.warnings.store(0, Ordering::Relaxed);
        self.info.store(0, Ordering::Relaxed);
        self.verbose.store(0, Ordering::Relaxed);
    }
}

/// Install the configuration used by the callback and reset the statistics
pub fn init_debug_config(config: DebugConfig) {
    VALIDATION_STATS.reset();

    if let Ok(mut tracker) = MESSAGE_TRACKER.lock() {
        *tracker = Some(FxHashMap::default());
    }
    if let Ok(mut current) = DEBUG_CONFIG.lock() {
        *current = Some(config);
    }
}

/// Stop handling messages (called before the messenger is destroyed)
pub fn cleanup_debug_config() {
    if let Ok(mut current) = DEBUG_CONFIG.lock() {
        *current = None;
    }
}

/// Get current validation statistics
pub fn get_validation_stats() -> ValidationStats {
    VALIDATION_STATS.get_stats()
}

/// Print a one-line summary of the validation messages counted so far
///
/// A clean run prints a single green confirmation.
pub fn print_validation_stats_report() {
    let stats = get_validation_stats();
    let repeated = MESSAGE_TRACKER
        .lock()
        .ok()
        .and_then(|tracker| tracker.as_ref().map(|m| m.values().filter(|&&count| count > 1).count()))
        .unwrap_or(0);
    println!("{}", validation_report(&stats, repeated));
}

fn validation_report(stats: &ValidationStats, repeated: usize) -> String {
    if stats.total() == 0 {
        return format!("{} no validation messages", "[xenon::vulkan]".green().bold());
    }

    let mut parts = Vec::with_capacity(5);
    let counts = [
        (stats.errors, "error(s)".red().bold()),
        (stats.warnings, "warning(s)".yellow().bold()),
        (stats.info, "info".cyan()),
        (stats.verbose, "verbose".bright_black()),
    ];
    for (count, label) in counts {
        if count > 0 {
            parts.push(format!("{} {}", count, label));
        }
    }
    if repeated > 0 {
        parts.push(format!("{} repeated", repeated));
    }

    format!(
        "{} {} validation message(s): {}",
        "[xenon::vulkan]".bright_blue().bold(),
        stats.total(),
        parts.join(", ")
    )
}

/// Severity flags the messenger is created with
pub(crate) fn message_severity_flags(severity: DebugSeverity) -> vk::DebugUtilsMessageSeverityFlagsEXT {
    match severity {
        DebugSeverity::ErrorsOnly => vk::DebugUtilsMessageSeverityFlagsEXT::ERROR,
        DebugSeverity::ErrorsAndWarnings => {
            vk::DebugUtilsMessageSeverityFlagsEXT::ERROR | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
        }
        DebugSeverity::All => {
            vk::DebugUtilsMessageSeverityFlagsEXT::ERROR
                | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
                | vk::DebugUtilsMessageSeverityFlagsEXT::INFO
                | vk::DebugUtilsMessageSeverityFlagsEXT::VERBOSE
        }
    }
}

fn passes_severity(severity: DebugSeverity, message_severity: vk::DebugUtilsMessageSeverityFlagsEXT) -> bool {
    message_severity.intersects(message_severity_flags(severity))
}

fn passes_category(filter: &DebugMessageFilter, message_type: vk::DebugUtilsMessageTypeFlagsEXT) -> bool {
    if message_type.contains(vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION) {
        filter.show_validation
    } else if message_type.contains(vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE) {
        filter.show_performance
    } else {
        filter.show_general
    }
}

fn log_severity(message_severity: vk::DebugUtilsMessageSeverityFlagsEXT) -> LogSeverity {
    if message_severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::ERROR) {
        LogSeverity::Error
    } else if message_severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::WARNING) {
        LogSeverity::Warn
    } else if message_severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::INFO) {
        LogSeverity::Info
    } else {
        LogSeverity::Trace
    }
}

fn type_label(message_type: vk::DebugUtilsMessageTypeFlagsEXT) -> &'static str {
    if message_type.contains(vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION) {
        "Validation"
    } else if message_type.contains(vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE) {
        "Performance"
    } else {
        "General"
    }
}

fn track_message(message: &str) -> u32 {
    let Ok(mut tracker) = MESSAGE_TRACKER.lock() else {
        return 1;
    };
    let count = tracker.get_or_insert_with(FxHashMap::default).entry(message.to_string()).or_insert(0);
    *count += 1;
    *count
}

/// Filter, count and forward one validation message
///
/// Returns whether the message passed the filters.
pub(crate) fn handle_message(
    config: &DebugConfig,
    message_severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    message_type: vk::DebugUtilsMessageTypeFlagsEXT,
    message_id_name: &str,
    message: &str,
) -> bool {
    if !passes_severity(config.severity, message_severity) || !passes_category(&config.message_filter, message_type) {
        return false;
    }

    VALIDATION_STATS.counter(message_severity).fetch_add(1, Ordering::Relaxed);

    let occurrences = track_message(message);
    let repeat_indicator = if occurrences > 1 {
        format!(" [×{}]", occurrences)
    } else {
        String::new()
    };
    let severity = log_severity(message_severity);
    let text = format!("[{}]{} {}: {}", type_label(message_type), repeat_indicator, message_id_name, message);

    match &config.output {
        DebugOutput::Console => Engine::log(severity, VALIDATION_SOURCE, text),
        DebugOutput::File(path) => write_to_file(path, severity, &text),
        DebugOutput::Both(path) => {
            write_to_file(path, severity, &text);
            Engine::log(severity, VALIDATION_SOURCE, text);
        }
    }
    true
}

/// Vulkan debug messenger callback
#[cfg(feature = "vulkan-validation")]
pub(crate) unsafe extern "system" fn vulkan_debug_callback(
    message_severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    message_type: vk::DebugUtilsMessageTypeFlagsEXT,
    p_callback_data: *const vk::DebugUtilsMessengerCallbackDataEXT<'_>,
    _user_data: *mut std::os::raw::c_void,
) -> vk::Bool32 {
    let config = match DEBUG_CONFIG.lock() {
        Ok(guard) => match guard.as_ref() {
            Some(config) => config.clone(),
            None => return vk::FALSE,
        },
        Err(_) => return vk::FALSE,
    };

    if p_callback_data.is_null() {
        return vk::FALSE;
    }

    unsafe {
        let callback_data = &*p_callback_data;
        let message_id_name = callback_data
            .message_id_name_as_c_str()
            .map(|s| s.to_string_lossy())
            .unwrap_or_else(|| "Unknown".into());
        let message = callback_data
            .message_as_c_str()
            .map(|s| s.to_string_lossy())
            .unwrap_or_else(|| "No message".into());

        handle_message(&config, message_severity, message_type, &message_id_name, &message);
    }

    // Never abort the Vulkan call that triggered the message
    vk::FALSE
}

/// Create the messenger for an instance created with `VK_EXT_debug_utils`
#[cfg(feature = "vulkan-validation")]
pub(crate) fn create_debug_messenger(
    entry: &ash::Entry,
    instance: &ash::Instance,
    config: DebugConfig,
) -> xenon_engine::xenon::Result<(ash::ext::debug_utils::Instance, vk::DebugUtilsMessengerEXT)> {
    let debug_utils = ash::ext::debug_utils::Instance::new(entry, instance);
    let severity_flags = message_severity_flags(config.severity);
    init_debug_config(config);

    let debug_info = vk::DebugUtilsMessengerCreateInfoEXT::default()
        .message_severity(severity_flags)
        .message_type(
            vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
        )
        .pfn_user_callback(Some(vulkan_debug_callback));

    let messenger = unsafe { debug_utils.create_debug_utils_messenger(&debug_info, None) }.map_err(|e| {
        xenon_engine::engine_error!(crate::vulkan_context::SOURCE, "Failed to create debug messenger: {:?}", e);
        xenon_engine::xenon::Error::InitializationFailed(format!("Failed to create debug messenger: {:?}", e))
    })?;

    Ok((debug_utils, messenger))
}

fn write_to_file(path: &str, severity: LogSeverity, text: &str) {
    if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(path) {
        let _ = writeln!(file, "[VULKAN {}] {}", severity.label().trim(), text);
    }
}

#[cfg(test)]
#[path = "debug_tests.rs"]
mod tests;
