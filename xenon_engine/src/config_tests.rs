//! Unit tests for config.rs

use crate::backend::RenderTargetType;
use crate::config::{BackendType, Config, DebugMessageFilter, ValidationStats};
use crate::error::Error;

#[test]
fn test_default_config_is_valid() {
    let config = Config::default();
    assert!(config.validate().is_ok());
    assert_eq!(config.backend, BackendType::Any);
    assert_eq!(config.render_targets, RenderTargetType::RASTERIZER);
}

#[test]
fn test_empty_name_is_rejected() {
    let config = Config {
        application_name: "   ".to_string(),
        ..Config::default()
    };
    assert!(matches!(config.validate(), Err(Error::InitializationFailed(_))));
}

#[test]
fn test_empty_render_targets_are_rejected() {
    let config = Config {
        render_targets: RenderTargetType::empty(),
        ..Config::default()
    };
    assert!(matches!(config.validate(), Err(Error::InitializationFailed(_))));
}

#[test]
fn test_directx12_availability_follows_platform() {
    let config = Config {
        backend: BackendType::DirectX12,
        ..Config::default()
    };
    assert_eq!(config.validate().is_ok(), cfg!(windows));
    assert!(BackendType::Vulkan.is_available_on_platform());
}

#[test]
fn test_message_filter_defaults_to_everything() {
    let filter = DebugMessageFilter::default();
    assert!(filter.show_general && filter.show_validation && filter.show_performance);
}

#[test]
fn test_validation_stats_total() {
    let stats = ValidationStats { errors: 1, warnings: 2, info: 3, verbose: 4 };
    assert_eq!(stats.total(), 10);
    assert_eq!(ValidationStats::default().total(), 0);
}
