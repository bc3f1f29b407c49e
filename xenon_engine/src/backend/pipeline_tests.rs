//! Unit tests for pipeline.rs

use crate::backend::pipeline::*;
use crate::backend::shader::{Shader, ShaderReflection, ShaderResource, ShaderSource};
use crate::backend::types::{DescriptorType, ResourceOperation, ResourceType, ShaderType};

fn shader_with_uniform(binding: u32, seed: u32) -> Shader {
    Shader::from_spirv(
        ShaderSource::new(vec![0x0723_0203, seed]),
        ShaderReflection {
            resources: vec![ShaderResource {
                binding,
                set: DescriptorType::Scene,
                resource_type: ResourceType::UniformBuffer,
                operations: ResourceOperation::READ,
            }],
            ..ShaderReflection::default()
        },
    )
}

// ============================================================================
// DYNAMIC STATES
// ============================================================================

#[test]
fn test_viewport_and_scissor_are_always_dynamic() {
    assert_eq!(
        dynamic_states(DynamicStateFlags::empty()),
        vec![DynamicState::Viewport, DynamicState::Scissor]
    );
}

#[test]
fn test_flagged_dynamic_states_follow_in_order() {
    let states = dynamic_states(DynamicStateFlags::DEPTH_BOUNDS | DynamicStateFlags::LINE_WIDTH);
    assert_eq!(
        states,
        vec![
            DynamicState::Viewport,
            DynamicState::Scissor,
            DynamicState::LineWidth,
            DynamicState::DepthBounds,
        ]
    );
    assert_eq!(dynamic_states(DynamicStateFlags::all()).len(), 6);
}

// ============================================================================
// SPECIFICATION DEFAULTS
// ============================================================================

#[test]
fn test_default_specification() {
    let spec = RasterizingPipelineSpecification::default();
    assert_eq!(spec.primitive_topology, PrimitiveTopology::TriangleList);
    assert_eq!(spec.cull_mode, CullMode::Back);
    assert_eq!(spec.front_face, FrontFace::CounterClockwise);
    assert_eq!(spec.depth_compare_logic, DepthCompareLogic::LessOrEqual);
    assert_eq!(spec.rasterizer_line_width, 1.0);
    assert!(spec.enable_depth_test);
    assert_eq!(spec.color_blend_attachments.len(), 1);
    assert_eq!(spec.color_blend_attachments[0].color_write_mask, ColorWriteMask::all());
}

#[test]
fn test_alpha_blending_preset() {
    let attachment = ColorBlendAttachment::alpha_blending();
    assert!(attachment.enable_blend);
    assert_eq!(attachment.src_blend_factor, ColorBlendFactor::SourceAlpha);
    assert_eq!(attachment.dst_blend_factor, ColorBlendFactor::OneMinusSourceAlpha);
    assert_eq!(attachment.blend_operator, ColorBlendOperator::Add);
}

#[test]
fn test_basic_blend_operators() {
    assert!(ColorBlendOperator::Maximum.is_basic());
    assert!(!ColorBlendOperator::Multiply.is_basic());
    assert!(!ColorBlendOperator::Undefined.is_basic());
}

// ============================================================================
// SHADER STAGES AND BINDINGS
// ============================================================================

#[test]
fn test_empty_shaders_are_skipped() {
    let spec = RasterizingPipelineSpecification {
        vertex_shader: shader_with_uniform(0, 1),
        ..RasterizingPipelineSpecification::default()
    };
    let stages = spec.shader_stages();
    assert_eq!(stages.len(), 1);
    assert_eq!(stages[0].1, ShaderType::VERTEX);
}

#[test]
fn test_binding_map_merges_stages() {
    let spec = RasterizingPipelineSpecification {
        vertex_shader: shader_with_uniform(0, 1),
        fragment_shader: shader_with_uniform(0, 2),
        ..RasterizingPipelineSpecification::default()
    };

    let map = spec.binding_map();
    let scene = map.bindings(DescriptorType::Scene);

    assert_eq!(scene.len(), 1);
    assert_eq!(scene[&0].applicable_shaders, ShaderType::VERTEX | ShaderType::FRAGMENT);
}

#[test]
fn test_shader_group_stages_and_hit_detection() {
    let group = ShaderGroup {
        closest_hit: Some(shader_with_uniform(1, 3)),
        ..ShaderGroup::default()
    };
    assert!(group.is_hit_group());
    assert_eq!(group.stages().len(), 1);

    let miss = ShaderGroup {
        miss: Some(shader_with_uniform(1, 4)),
        ..ShaderGroup::default()
    };
    assert!(!miss.is_hit_group());
}

#[test]
fn test_ray_tracing_content_hash_depends_on_shaders() {
    let a = RayTracingPipelineSpecification {
        shader_groups: vec![ShaderGroup { ray_gen: Some(shader_with_uniform(0, 5)), ..ShaderGroup::default() }],
        ..RayTracingPipelineSpecification::default()
    };
    let b = RayTracingPipelineSpecification {
        shader_groups: vec![ShaderGroup { ray_gen: Some(shader_with_uniform(0, 6)), ..ShaderGroup::default() }],
        ..RayTracingPipelineSpecification::default()
    };
    assert_ne!(a.content_hash(), b.content_hash());
    assert_eq!(a.content_hash(), a.clone().content_hash());
}
