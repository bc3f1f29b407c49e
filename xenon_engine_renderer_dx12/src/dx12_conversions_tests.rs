//! Unit tests for the Direct3D 12 conversion functions
//!
//! Tests exercising fallbacks capture the engine logger and must stay `#[serial]`.

use serial_test::serial;
use windows::Win32::Graphics::Direct3D::*;
use windows::Win32::Graphics::Direct3D12::*;
use windows::Win32::Graphics::Dxgi::Common::*;
use xenon_engine::xenon::backend::*;
use xenon_engine::xenon::log::LogSeverity;

use crate::dx12_conversions::*;
use crate::test_logger::TestLogger;

#[test]
#[serial]
fn test_undefined_values_fall_back_with_one_error_each() {
    let logs = TestLogger::install();

    assert_eq!(primitive_topology(PrimitiveTopology::Undefined).1, D3D_PRIMITIVE_TOPOLOGY_POINTLIST);
    assert_eq!(cull_mode(CullMode::Undefined), D3D12_CULL_MODE_NONE);
    assert!(front_counter_clockwise(FrontFace::Undefined).as_bool());
    assert_eq!(fill_mode(PolygonMode::Undefined), D3D12_FILL_MODE_SOLID);
    assert_eq!(logic_op(ColorBlendLogic::Undefined), D3D12_LOGIC_OP_CLEAR);
    assert_eq!(comparison_func(DepthCompareLogic::Undefined), D3D12_COMPARISON_FUNC_NEVER);
    assert_eq!(blend(ColorBlendFactor::Undefined), D3D12_BLEND_ZERO);
    assert_eq!(blend_op(ColorBlendOperator::Undefined), D3D12_BLEND_OP_ADD);

    assert_eq!(logs.count(LogSeverity::Error), 8);
    TestLogger::uninstall();
}

#[test]
#[serial]
fn test_unsupported_values_fall_back_with_a_warning() {
    let logs = TestLogger::install();

    assert_eq!(primitive_topology(PrimitiveTopology::TriangleFan).1, D3D_PRIMITIVE_TOPOLOGY_TRIANGLELIST);
    assert_eq!(cull_mode(CullMode::FrontAndBack), D3D12_CULL_MODE_BACK);
    assert_eq!(fill_mode(PolygonMode::Point), D3D12_FILL_MODE_WIREFRAME);
    assert_eq!(blend_op(ColorBlendOperator::Multiply), D3D12_BLEND_OP_ADD);

    assert_eq!(logs.count(LogSeverity::Warn), 4);
    assert_eq!(logs.count(LogSeverity::Error), 0);
    TestLogger::uninstall();
}

#[test]
#[serial]
fn test_vertex_formats_without_dxgi_equivalent_log_an_error() {
    let logs = TestLogger::install();

    assert_eq!(vertex_format(VertexElementFormat::R32G32B32_SFLOAT), DXGI_FORMAT_R32G32B32_FLOAT);
    assert_eq!(logs.count(LogSeverity::Error), 0);

    assert_eq!(vertex_format(VertexElementFormat::R64_UINT), DXGI_FORMAT_UNKNOWN);
    assert_eq!(vertex_format(VertexElementFormat::R8G8B8_UINT), DXGI_FORMAT_UNKNOWN);
    assert_eq!(logs.count(LogSeverity::Error), 2);
    TestLogger::uninstall();
}

#[test]
fn test_patch_topology_counts_control_points() {
    assert_eq!(patch_topology(3), D3D_PRIMITIVE_TOPOLOGY_3_CONTROL_POINT_PATCHLIST);
    assert_eq!(patch_topology(0), D3D_PRIMITIVE_TOPOLOGY_1_CONTROL_POINT_PATCHLIST);
    assert_eq!(patch_topology(64), D3D_PRIMITIVE_TOPOLOGY_32_CONTROL_POINT_PATCHLIST);
}

#[test]
fn test_sampled_depth_images_are_typeless() {
    assert_eq!(resource_format(DataFormat::D32_SFLOAT, ImageUsage::DEPTH_ATTACHMENT), DXGI_FORMAT_D32_FLOAT);
    assert_eq!(
        resource_format(DataFormat::D32_SFLOAT, ImageUsage::DEPTH_ATTACHMENT | ImageUsage::GRAPHICS),
        DXGI_FORMAT_R32_TYPELESS
    );
    assert_eq!(shader_resource_format(DataFormat::D24_UNORM_S8_UINT), DXGI_FORMAT_R24_UNORM_X8_TYPELESS);
    assert_eq!(resource_format(DataFormat::R8G8B8A8_SRGB, ImageUsage::GRAPHICS), DXGI_FORMAT_R8G8B8A8_UNORM_SRGB);
}

#[test]
fn test_depth_only_images_deny_shader_access() {
    let flags = resource_flags(ImageUsage::DEPTH_ATTACHMENT);
    assert!(flags.contains(D3D12_RESOURCE_FLAG_ALLOW_DEPTH_STENCIL));
    assert!(flags.contains(D3D12_RESOURCE_FLAG_DENY_SHADER_RESOURCE));

    let flags = resource_flags(ImageUsage::DEPTH_ATTACHMENT | ImageUsage::GRAPHICS);
    assert!(!flags.contains(D3D12_RESOURCE_FLAG_DENY_SHADER_RESOURCE));
}

#[test]
fn test_identity_swizzle_is_the_default_mapping() {
    let identity = [ComponentSwizzle::Identity; 4];
    assert_eq!(component_mapping(identity), D3D12_DEFAULT_SHADER_4_COMPONENT_MAPPING);

    let explicit = [ComponentSwizzle::R, ComponentSwizzle::G, ComponentSwizzle::B, ComponentSwizzle::A];
    assert_eq!(component_mapping(explicit), D3D12_DEFAULT_SHADER_4_COMPONENT_MAPPING);
}

#[test]
fn test_forced_components() {
    let mapping = component_mapping([
        ComponentSwizzle::Zero,
        ComponentSwizzle::One,
        ComponentSwizzle::R,
        ComponentSwizzle::Identity,
    ]);
    assert_eq!(mapping & 0x7, 4);
    assert_eq!((mapping >> 3) & 0x7, 5);
    assert_eq!((mapping >> 6) & 0x7, 0);
    assert_eq!((mapping >> 9) & 0x7, 3);
}

#[test]
fn test_sampler_filters() {
    assert_eq!(
        sampler_filter(ImageFilter::Nearest, ImageFilter::Nearest, ImageMipMapMode::Nearest, false, false),
        D3D12_FILTER_MIN_MAG_MIP_POINT
    );
    assert_eq!(
        sampler_filter(ImageFilter::Linear, ImageFilter::Linear, ImageMipMapMode::Linear, false, false),
        D3D12_FILTER_MIN_MAG_MIP_LINEAR
    );
    assert_eq!(
        sampler_filter(ImageFilter::Linear, ImageFilter::Linear, ImageMipMapMode::Linear, false, true),
        D3D12_FILTER_COMPARISON_MIN_MAG_MIP_LINEAR
    );
    assert_eq!(
        sampler_filter(ImageFilter::Nearest, ImageFilter::Nearest, ImageMipMapMode::Nearest, true, false),
        D3D12_FILTER_ANISOTROPIC
    );
}

#[test]
fn test_scissor_rect_uses_exclusive_bounds() {
    let rect = rect(Rect2D { x: 10, y: 20, width: 30, height: 40 });
    assert_eq!((rect.left, rect.top, rect.right, rect.bottom), (10, 20, 40, 60));
}
