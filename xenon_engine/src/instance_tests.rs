//! Unit tests for instance.rs, backed by the mock factory

use std::path::PathBuf;

use crate::backend::RenderTargetType;
use crate::config::{BackendType, Config};
use crate::error::Error;
use crate::instance::Instance;
use crate::log::LogSeverity;
use crate::mock_backend::{MockDevice, MockFactory};
use crate::test_logger::TestLogger;
use serial_test::serial;

fn factory_without_ray_tracing() -> Box<MockFactory> {
    Box::new(MockFactory { available: RenderTargetType::RASTERIZER, host_visible: true })
}

// ============================================================================
// CREATION
// ============================================================================

#[test]
#[serial]
fn test_instance_reports_configuration() {
    let logs = TestLogger::install();
    let config = Config {
        application_name: "Viewer".to_string(),
        application_version: 7,
        ..Config::default()
    };

    let instance = Instance::new(config, Box::new(MockFactory::new())).unwrap();

    assert_eq!(instance.application_name(), "Viewer");
    assert_eq!(instance.application_version(), 7);
    assert_eq!(instance.backend_instance().application_name(), "Viewer");
    assert_eq!(instance.backend_type(), BackendType::Vulkan);
    assert!(instance.device().downcast_ref::<MockDevice>().is_some());
    assert!(logs.contains("Created Vulkan instance for 'Viewer'"));
    TestLogger::uninstall();
}

#[test]
#[serial]
fn test_invalid_config_creates_nothing() {
    let _logs = TestLogger::install();
    let config = Config { application_name: String::new(), ..Config::default() };

    let result = Instance::new(config, Box::new(MockFactory::new()));

    assert!(matches!(result, Err(Error::InitializationFailed(_))));
    TestLogger::uninstall();
}

#[test]
#[serial]
fn test_backend_mismatch_is_rejected() {
    let _logs = TestLogger::install();
    let config = Config { backend: BackendType::DirectX12, ..Config::default() };

    let result = Instance::new(config, Box::new(MockFactory::new()));

    assert!(matches!(result, Err(Error::InitializationFailed(_))));
    TestLogger::uninstall();
}

#[test]
#[serial]
fn test_matching_backend_is_accepted() {
    let _logs = TestLogger::install();
    let config = Config { backend: BackendType::Vulkan, ..Config::default() };
    assert!(Instance::new(config, Box::new(MockFactory::new())).is_ok());
    TestLogger::uninstall();
}

// ============================================================================
// RENDER TARGETS
// ============================================================================

#[test]
#[serial]
fn test_unsupported_render_targets_are_narrowed_with_a_warning() {
    let logs = TestLogger::install();
    let config = Config {
        render_targets: RenderTargetType::RASTERIZER | RenderTargetType::RAY_TRACER,
        ..Config::default()
    };

    let instance = Instance::new(config, factory_without_ray_tracing()).unwrap();

    assert_eq!(instance.supported_render_targets(), RenderTargetType::RASTERIZER);
    assert_eq!(logs.count(LogSeverity::Warn), 1);
    TestLogger::uninstall();
}

#[test]
#[serial]
fn test_supported_render_targets_are_kept() {
    let logs = TestLogger::install();
    let config = Config {
        render_targets: RenderTargetType::RASTERIZER | RenderTargetType::RAY_TRACER,
        ..Config::default()
    };

    let instance = Instance::new(config, Box::new(MockFactory::new())).unwrap();

    assert!(instance.supported_render_targets().contains(RenderTargetType::RAY_TRACER));
    assert_eq!(logs.count(LogSeverity::Warn), 0);
    TestLogger::uninstall();
}

// ============================================================================
// CACHE HANDLERS
// ============================================================================

#[test]
#[serial]
fn test_cache_handlers_are_namespaced_per_pipeline() {
    let _logs = TestLogger::install();
    let config = Config { cache_directory: PathBuf::from("pipeline-cache"), ..Config::default() };
    let instance = Instance::new(config, Box::new(MockFactory::new())).unwrap();

    let a = instance.create_cache_handler(1);
    let b = instance.create_cache_handler(0xABCD);

    assert_eq!(a.directory(), PathBuf::from("pipeline-cache").join("0000000000000001"));
    assert_eq!(b.directory(), PathBuf::from("pipeline-cache").join("000000000000abcd"));
    TestLogger::uninstall();
}
