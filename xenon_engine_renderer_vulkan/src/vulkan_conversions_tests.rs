//! Unit tests for the Vulkan conversion functions
//!
//! Pure mappings, no GPU required. Tests exercising fallbacks capture the
//! engine logger and must stay `#[serial]`.

use ash::vk;
use serial_test::serial;
use xenon_engine::xenon::backend::*;
use xenon_engine::xenon::log::LogSeverity;

use crate::test_logger::TestLogger;
use crate::vulkan_conversions::*;

// ============================================================================
// FALLBACKS
// ============================================================================

#[test]
#[serial]
fn test_undefined_values_fall_back_with_one_error_each() {
    let logs = TestLogger::install();

    assert_eq!(primitive_topology(PrimitiveTopology::Undefined), vk::PrimitiveTopology::POINT_LIST);
    assert_eq!(cull_mode(CullMode::Undefined), vk::CullModeFlags::NONE);
    assert_eq!(front_face(FrontFace::Undefined), vk::FrontFace::COUNTER_CLOCKWISE);
    assert_eq!(polygon_mode(PolygonMode::Undefined), vk::PolygonMode::FILL);
    assert_eq!(logic_op(ColorBlendLogic::Undefined), vk::LogicOp::CLEAR);
    assert_eq!(compare_op(DepthCompareLogic::Undefined), vk::CompareOp::NEVER);
    assert_eq!(blend_factor(ColorBlendFactor::Undefined), vk::BlendFactor::ZERO);
    assert_eq!(blend_op(ColorBlendOperator::Undefined), vk::BlendOp::ADD);
    assert_eq!(vertex_format(VertexElementFormat::Undefined), vk::Format::UNDEFINED);

    assert_eq!(logs.count(LogSeverity::Error), 9);
    TestLogger::uninstall();
}

#[test]
#[serial]
fn test_defined_values_do_not_log() {
    let logs = TestLogger::install();

    assert_eq!(primitive_topology(PrimitiveTopology::TriangleList), vk::PrimitiveTopology::TRIANGLE_LIST);
    assert_eq!(cull_mode(CullMode::FrontAndBack), vk::CullModeFlags::FRONT_AND_BACK);
    assert_eq!(front_face(FrontFace::Clockwise), vk::FrontFace::CLOCKWISE);
    assert_eq!(polygon_mode(PolygonMode::Line), vk::PolygonMode::LINE);
    assert_eq!(compare_op(DepthCompareLogic::LessOrEqual), vk::CompareOp::LESS_OR_EQUAL);

    assert_eq!(logs.count(LogSeverity::Error), 0);
    TestLogger::uninstall();
}

// ============================================================================
// BLENDING
// ============================================================================

#[test]
fn test_logic_op_names_that_differ_from_vulkan() {
    assert_eq!(logic_op(ColorBlendLogic::NoOperator), vk::LogicOp::NO_OP);
    assert_eq!(logic_op(ColorBlendLogic::ReverseOr), vk::LogicOp::OR_REVERSE);
    assert_eq!(logic_op(ColorBlendLogic::InvertedOr), vk::LogicOp::OR_INVERTED);
}

#[test]
fn test_dual_source_blend_factors() {
    assert_eq!(blend_factor(ColorBlendFactor::SourceOneColor), vk::BlendFactor::SRC1_COLOR);
    assert_eq!(blend_factor(ColorBlendFactor::OneMinusSourceOneAlpha), vk::BlendFactor::ONE_MINUS_SRC1_ALPHA);
}

#[test]
fn test_basic_and_advanced_blend_ops() {
    assert_eq!(blend_op(ColorBlendOperator::Maximum), vk::BlendOp::MAX);
    assert_eq!(blend_op(ColorBlendOperator::Multiply), vk::BlendOp::MULTIPLY_EXT);
    assert_eq!(blend_op(ColorBlendOperator::Blue), vk::BlendOp::BLUE_EXT);
}

#[test]
fn test_color_write_mask() {
    assert_eq!(
        color_write_mask(ColorWriteMask::all()),
        vk::ColorComponentFlags::R | vk::ColorComponentFlags::G | vk::ColorComponentFlags::B | vk::ColorComponentFlags::A
    );
    assert_eq!(
        color_write_mask(ColorWriteMask::R | ColorWriteMask::A),
        vk::ColorComponentFlags::R | vk::ColorComponentFlags::A
    );
}

// ============================================================================
// FORMATS
// ============================================================================

#[test]
fn test_vertex_formats() {
    assert_eq!(vertex_format(VertexElementFormat::R32G32B32_SFLOAT), vk::Format::R32G32B32_SFLOAT);
    assert_eq!(vertex_format(VertexElementFormat::R8G8B8A8_UNORM), vk::Format::R8G8B8A8_UNORM);
    assert_eq!(vertex_format(VertexElementFormat::R64G64B64A64_SINT), vk::Format::R64G64B64A64_SINT);
}

#[test]
fn test_data_formats_and_aspects() {
    assert_eq!(data_format(DataFormat::B8G8R8A8_SRGB), vk::Format::B8G8R8A8_SRGB);
    assert_eq!(data_format(DataFormat::D32_SFLOAT_S8_UINT), vk::Format::D32_SFLOAT_S8_UINT);
    assert_eq!(aspect_flags(DataFormat::R8G8B8A8_UNORM), vk::ImageAspectFlags::COLOR);
    assert_eq!(aspect_flags(DataFormat::D32_SFLOAT), vk::ImageAspectFlags::DEPTH);
    assert_eq!(
        aspect_flags(DataFormat::D24_UNORM_S8_UINT),
        vk::ImageAspectFlags::DEPTH | vk::ImageAspectFlags::STENCIL
    );
}

#[test]
#[serial]
fn test_surface_formats_round_trip() {
    for format in [DataFormat::B8G8R8A8_SRGB, DataFormat::R8G8B8A8_UNORM] {
        assert_eq!(vk_format_to_data_format(data_format(format)), format);
    }

    let logs = TestLogger::install();
    assert_eq!(vk_format_to_data_format(vk::Format::A2B10G10R10_UNORM_PACK32), DataFormat::Undefined);
    assert_eq!(logs.count(LogSeverity::Error), 1);
    TestLogger::uninstall();
}

#[test]
fn test_cube_maps_are_cube_compatible_2d_images() {
    let (image, view, flags) = image_type(ImageType::CubeMap);
    assert_eq!(image, vk::ImageType::TYPE_2D);
    assert_eq!(view, vk::ImageViewType::CUBE);
    assert!(flags.contains(vk::ImageCreateFlags::CUBE_COMPATIBLE));
}

#[test]
fn test_image_usage_always_allows_transfers() {
    let flags = image_usage(ImageUsage::STORAGE);
    assert!(flags.contains(vk::ImageUsageFlags::STORAGE));
    assert!(flags.contains(vk::ImageUsageFlags::TRANSFER_SRC | vk::ImageUsageFlags::TRANSFER_DST));
    assert!(!flags.contains(vk::ImageUsageFlags::SAMPLED));
}

// ============================================================================
// SHADERS & SYNCHRONIZATION
// ============================================================================

#[test]
fn test_shader_stage_flags_combine() {
    assert_eq!(
        shader_stage_flags(ShaderType::VERTEX | ShaderType::FRAGMENT),
        vk::ShaderStageFlags::VERTEX | vk::ShaderStageFlags::FRAGMENT
    );
    assert_eq!(shader_stage_flags(ShaderType::RAY_GEN), vk::ShaderStageFlags::RAYGEN_KHR);
    assert_eq!(shader_stage_flags(ShaderType::empty()), vk::ShaderStageFlags::empty());
}

#[test]
fn test_descriptor_types() {
    assert_eq!(descriptor_type(ResourceType::UniformBuffer), vk::DescriptorType::UNIFORM_BUFFER);
    assert_eq!(descriptor_type(ResourceType::DynamicStorageBuffer), vk::DescriptorType::STORAGE_BUFFER_DYNAMIC);
    assert_eq!(
        descriptor_type(ResourceType::AccelerationStructure),
        vk::DescriptorType::ACCELERATION_STRUCTURE_KHR
    );
}

#[test]
fn test_copy_states_use_transfer_access() {
    assert_eq!(
        buffer_state_access(ResourceState::CopySource),
        (vk::AccessFlags::TRANSFER_READ, vk::PipelineStageFlags::TRANSFER)
    );
    assert_eq!(
        buffer_state_access(ResourceState::CopyDestination),
        (vk::AccessFlags::TRANSFER_WRITE, vk::PipelineStageFlags::TRANSFER)
    );
    assert_eq!(buffer_state_access(ResourceState::IndexBuffer).0, vk::AccessFlags::INDEX_READ);
}

#[test]
fn test_wait_stages() {
    assert_eq!(
        pipeline_stage(CommandRecorderUsage::Graphics.wait_stage()),
        vk::PipelineStageFlags::ALL_GRAPHICS
    );
    assert_eq!(
        pipeline_stage(PipelineStage::ColorAttachmentOutput),
        vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT
    );
}

#[test]
fn test_scissor_rect() {
    let scissor = rect(Rect2D { x: -4, y: 2, width: 640, height: 480 });
    assert_eq!(scissor.offset.x, -4);
    assert_eq!(scissor.extent.width, 640);
}
