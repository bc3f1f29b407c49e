//! Unit tests for types.rs

use crate::backend::types::*;

#[test]
fn test_render_target_bits_match_wire_values() {
    assert_eq!(RenderTargetType::RASTERIZER.bits(), 1);
    assert_eq!(RenderTargetType::RAY_TRACER.bits(), 2);
    assert_eq!(RenderTargetType::PATH_TRACER.bits(), 4);
}

#[test]
fn test_attachment_counts() {
    let types = AttachmentType::COLOR | AttachmentType::NORMAL | AttachmentType::DEPTH;
    assert_eq!(types.color_attachment_count(), 2);
    assert!(types.has_depth_stencil());
    assert!(!AttachmentType::COLOR.has_depth_stencil());
    assert!(AttachmentType::STENCIL.has_depth_stencil());
}

#[test]
fn test_sample_counts() {
    assert_eq!(MultiSamplingCount::default().sample_count(), 1);
    assert_eq!(MultiSamplingCount::X8.sample_count(), 8);
    assert_eq!(MultiSamplingCount::X64.sample_count(), 64);
}

#[test]
fn test_descriptor_set_indices() {
    for (index, class) in DescriptorType::ALL.iter().enumerate() {
        assert_eq!(class.set_index() as usize, index);
        assert_eq!(DescriptorType::from_set_index(index as u32), Some(*class));
    }
    assert_eq!(DescriptorType::from_set_index(4), None);
}

#[test]
fn test_data_format_properties() {
    assert_eq!(DataFormat::R8G8B8A8_UNORM.texel_size(), 4);
    assert_eq!(DataFormat::R32G32B32A32_SFLOAT.texel_size(), 16);
    assert_eq!(DataFormat::Undefined.texel_size(), 0);
    assert!(DataFormat::D32_SFLOAT.is_depth());
    assert!(!DataFormat::D32_SFLOAT.has_stencil());
    assert!(DataFormat::D24_UNORM_S8_UINT.has_stencil());
    assert!(!DataFormat::R8G8B8A8_SRGB.is_depth());
}

#[test]
fn test_recorder_wait_stages() {
    assert_eq!(CommandRecorderUsage::Graphics.wait_stage(), PipelineStage::AllGraphics);
    assert_eq!(CommandRecorderUsage::Compute.wait_stage(), PipelineStage::ComputeShader);
    assert_eq!(CommandRecorderUsage::Transfer.wait_stage(), PipelineStage::Transfer);
}

#[test]
fn test_index_stride_sizes() {
    assert_eq!(IndexBufferStride::Uint16.size_bytes(), 2);
    assert_eq!(IndexBufferStride::Uint32.size_bytes(), 4);
}
