/// Instance configuration
///
/// `Config` is consumed by `Instance::new` and forwarded to the selected
/// backend when the backend instance and device are created.

use std::path::PathBuf;

use crate::backend::RenderTargetType;
use crate::error::{Error, Result};

/// Graphics API requested by the application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendType {
    /// Let the factory pick its own API
    Any,
    /// Vulkan 1.3
    Vulkan,
    /// Direct3D 12 (Windows only)
    DirectX12,
}

impl BackendType {
    /// Whether the backend can exist on the platform this crate was compiled for
    pub fn is_available_on_platform(self) -> bool {
        match self {
            BackendType::Any | BackendType::Vulkan => true,
            BackendType::DirectX12 => cfg!(windows),
        }
    }
}

/// Minimum severity of validation layer messages forwarded to the logger
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebugSeverity {
    ErrorsOnly,
    ErrorsAndWarnings,
    All,
}

/// Where validation layer messages are written
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DebugOutput {
    /// Engine logger only
    Console,
    /// Append to a file
    File(String),
    /// Engine logger and file
    Both(String),
}

/// Validation message categories to keep
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebugMessageFilter {
    pub show_general: bool,
    pub show_validation: bool,
    pub show_performance: bool,
}

impl Default for DebugMessageFilter {
    fn default() -> Self {
        Self {
            show_general: true,
            show_validation: true,
            show_performance: true,
        }
    }
}

/// Counters of validation messages received since the instance was created
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ValidationStats {
    pub errors: u32,
    pub warnings: u32,
    pub info: u32,
    pub verbose: u32,
}

impl ValidationStats {
    pub fn total(&self) -> u32 {
        self.errors + self.warnings + self.info + self.verbose
    }
}

/// Instance configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Application name reported to the driver
    pub application_name: String,
    /// Application version reported to the driver
    pub application_version: u32,
    /// Requested graphics API
    pub backend: BackendType,
    /// Render target types the device should support
    pub render_targets: RenderTargetType,
    /// Enable API validation (Vulkan layers / D3D12 debug layer)
    pub enable_validation: bool,
    /// Validation message severity filter
    pub debug_severity: DebugSeverity,
    /// Validation message destination
    pub debug_output: DebugOutput,
    /// Validation message category filter
    pub debug_message_filter: DebugMessageFilter,
    /// Directory used by the default pipeline cache handler
    pub cache_directory: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            application_name: "Xenon Application".to_string(),
            application_version: 1,
            backend: BackendType::Any,
            render_targets: RenderTargetType::RASTERIZER,
            enable_validation: cfg!(debug_assertions),
            debug_severity: DebugSeverity::ErrorsAndWarnings,
            debug_output: DebugOutput::Console,
            debug_message_filter: DebugMessageFilter::default(),
            cache_directory: PathBuf::from("cache"),
        }
    }
}

impl Config {
    /// Check the configuration before any GPU object is created
    pub fn validate(&self) -> Result<()> {
        if self.application_name.trim().is_empty() {
            return Err(Error::InitializationFailed(
                "Application name must not be empty".to_string(),
            ));
        }
        if self.render_targets.is_empty() {
            return Err(Error::InitializationFailed(
                "At least one render target type must be requested".to_string(),
            ));
        }
        if !self.backend.is_available_on_platform() {
            return Err(Error::InitializationFailed(format!(
                "Backend {:?} is not available on this platform",
                self.backend
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
