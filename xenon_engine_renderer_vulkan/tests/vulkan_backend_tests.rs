//! Integration tests for the Vulkan backend
//!
//! All tests require a GPU and are marked with #[ignore].
//!
//! Run with: cargo test -p xenon_engine_renderer_vulkan --test vulkan_backend_tests -- --ignored


use std::time::Duration;

use gpu_test_utils::{device, factory, supports_ray_tracing};
use xenon_engine::xenon::backend::{
    AttachmentType, BufferType, CommandRecorderUsage, DataFormat, ImageSamplerSpecification, ImageSpecification,
    ImageUsage, ImageViewSpecification, MultiSamplingCount, RasterizingPipelineSpecification, RenderTargetType,
    ResourceState, Shader,
};
use xenon_engine::xenon::backend::{Buffer, CommandRecorder, Rasterizer};
use xenon_engine_renderer_vulkan::reflect_spirv;

// ============================================================================
// DEVICE TESTS
// ============================================================================

#[test]
#[ignore] // Requires GPU
fn test_vulkan_device_supports_rasterizer() {
    let targets = device().supported_render_targets();
    assert!(targets.contains(RenderTargetType::RASTERIZER));
    assert!(!targets.contains(RenderTargetType::PATH_TRACER));
    device().wait_idle().unwrap();
}

// ============================================================================
// BUFFER TESTS
// ============================================================================

#[test]
#[ignore] // Requires GPU
fn test_vulkan_uniform_buffer_write_read() {
    let buffer = factory().create_buffer(device(), 64, BufferType::Uniform).unwrap();
    let data: Vec<u8> = (0..64).collect();

    buffer.write(&data, 0, None).unwrap();

    let read = buffer.read().unwrap();
    assert_eq!(&read[..64], data.as_slice());
}

#[test]
#[ignore] // Requires GPU
fn test_vulkan_device_local_buffer_write_read() {
    let buffer = factory().create_buffer(device(), 256, BufferType::Vertex).unwrap();
    let data: Vec<u8> = (0..=255).collect();

    buffer.write(&data, 0, None).unwrap();

    {
        let read = buffer.read().unwrap();
        assert_eq!(&read[..256], data.as_slice());
    }
    assert_eq!(buffer.state(), ResourceState::VertexAndConstantBuffer);
}

#[test]
#[ignore] // Requires GPU
fn test_vulkan_buffer_copy_with_offsets() {
    let src = factory().create_buffer(device(), 128, BufferType::Storage).unwrap();
    let dst = factory().create_buffer(device(), 128, BufferType::Storage).unwrap();
    let data = vec![7u8; 32];

    src.write(&data, 16, None).unwrap();
    dst.copy(src.as_ref(), 32, 16, 64).unwrap();

    let read = dst.read().unwrap();
    assert_eq!(&read[64..96], data.as_slice());
    assert_eq!(src.state(), ResourceState::Common);
    assert_eq!(dst.state(), ResourceState::Common);
}

#[test]
#[ignore] // Requires GPU
fn test_vulkan_zero_sized_buffer_is_rejected() {
    assert!(factory().create_buffer(device(), 0, BufferType::Storage).is_err());
}

// ============================================================================
// IMAGE TESTS
// ============================================================================

#[test]
#[ignore] // Requires GPU
fn test_vulkan_image_upload_and_mip_maps() {
    let specification = ImageSpecification {
        width: 64,
        height: 64,
        usage: ImageUsage::GRAPHICS,
        format: DataFormat::R8G8B8A8_UNORM,
        enable_mip_maps: true,
        ..Default::default()
    };
    let image = factory().create_image(device(), &specification).unwrap();
    assert_eq!(image.specification().mip_levels(), 7);

    let staging = factory()
        .create_buffer(device(), specification.base_level_size(), BufferType::Staging)
        .unwrap();
    staging.write(&vec![255u8; specification.base_level_size() as usize], 0, None).unwrap();

    image.copy_from_buffer(staging.as_ref(), None).unwrap();
    image.generate_mip_maps(None).unwrap();
}

#[test]
#[ignore] // Requires GPU
fn test_vulkan_image_view_and_sampler() {
    let specification = ImageSpecification {
        width: 16,
        height: 16,
        usage: ImageUsage::GRAPHICS,
        format: DataFormat::R8G8B8A8_SRGB,
        ..Default::default()
    };
    let image = factory().create_image(device(), &specification).unwrap();
    let view = factory()
        .create_image_view(device(), image.as_ref(), &ImageViewSpecification::default())
        .unwrap();
    let sampler = factory()
        .create_image_sampler(device(), &ImageSamplerSpecification::default())
        .unwrap();

    assert_eq!(view.specification(), &ImageViewSpecification::default());
    assert!(sampler.specification().max_lod >= sampler.specification().min_lod);
}

// ============================================================================
// RASTERIZER TESTS
// ============================================================================

#[test]
#[ignore] // Requires GPU
fn test_vulkan_rasterizer_attachments() {
    let rasterizer = factory()
        .create_rasterizer(
            device(),
            320,
            240,
            AttachmentType::COLOR | AttachmentType::DEPTH,
            false,
            MultiSamplingCount::X1,
        )
        .unwrap();

    let color = rasterizer.image_attachment(AttachmentType::COLOR).unwrap();
    assert_eq!(color.specification().format, DataFormat::R8G8B8A8_UNORM);
    assert_eq!(color.specification().width, 320);

    let depth = rasterizer.image_attachment(AttachmentType::DEPTH).unwrap();
    assert_eq!(depth.specification().format, DataFormat::D32_SFLOAT);

    assert!(rasterizer.image_attachment(AttachmentType::NORMAL).is_none());
}

#[test]
#[ignore] // Requires GPU
fn test_vulkan_multisampled_rasterizer_exposes_resolved_color() {
    let rasterizer = factory()
        .create_rasterizer(device(), 64, 64, AttachmentType::COLOR, false, MultiSamplingCount::X4)
        .unwrap();

    let color = rasterizer.image_attachment(AttachmentType::COLOR).unwrap();
    assert_eq!(color.specification().multi_sampling_count, MultiSamplingCount::X1);
}

#[test]
#[ignore] // Requires GPU
fn test_vulkan_triple_buffered_rasterizer_advances_on_bind() {
    let rasterizer = factory()
        .create_rasterizer(device(), 64, 64, AttachmentType::COLOR, true, MultiSamplingCount::X1)
        .unwrap();
    let mut recorder = factory()
        .create_command_recorder(device(), CommandRecorderUsage::Graphics, 1)
        .unwrap();
    let mut submitter = factory().create_command_submitter(device()).unwrap();

    let mut frames = Vec::new();
    for _ in 0..4 {
        recorder.begin().unwrap();
        recorder.bind_rasterizer(rasterizer.as_ref(), &[]).unwrap();
        recorder.end_rasterizer().unwrap();
        recorder.end().unwrap();

        submitter.submit(&[&[recorder.as_ref()]], None).unwrap();
        submitter.wait(Duration::from_secs(5)).unwrap();
        frames.push(rasterizer.frame_index());
    }

    assert_eq!(frames, vec![0, 1, 2, 0]);
}

#[test]
#[ignore] // Requires GPU
fn test_vulkan_rasterizing_pipeline_requires_vertex_shader() {
    let rasterizer = factory()
        .create_rasterizer(device(), 64, 64, AttachmentType::COLOR, false, MultiSamplingCount::X1)
        .unwrap();
    let specification = RasterizingPipelineSpecification::default();

    let result = factory().create_rasterizing_pipeline(device(), None, rasterizer.as_ref(), &specification);
    assert!(result.is_err());
}

#[test]
#[ignore] // Requires GPU
fn test_vulkan_compute_pipeline_rejects_empty_shader() {
    assert!(factory().create_compute_pipeline(device(), None, &Shader::default()).is_err());
}

// ============================================================================
// COMMAND TESTS
// ============================================================================

#[test]
#[ignore] // Requires GPU
fn test_vulkan_recorded_copy_is_submitted() {
    let src = factory().create_buffer(device(), 64, BufferType::Staging).unwrap();
    let dst = factory().create_buffer(device(), 64, BufferType::Storage).unwrap();
    src.write(&[42u8; 64], 0, None).unwrap();

    let mut recorder = factory()
        .create_command_recorder(device(), CommandRecorderUsage::Transfer, 2)
        .unwrap();
    recorder.begin().unwrap();
    recorder.copy_buffer(src.as_ref(), 0, dst.as_ref(), 0, 64).unwrap();
    recorder.end().unwrap();

    let mut submitter = factory().create_command_submitter(device()).unwrap();
    submitter.submit(&[&[recorder.as_ref()]], None).unwrap();
    assert!(submitter.is_waiting());
    submitter.wait(Duration::from_secs(5)).unwrap();
    assert!(!submitter.is_waiting());

    let read = dst.read().unwrap();
    assert!(read[..64].iter().all(|b| *b == 42));
}

#[test]
#[ignore] // Requires GPU
fn test_vulkan_dependent_batches_are_submitted_in_order() {
    let a = factory().create_buffer(device(), 16, BufferType::Storage).unwrap();
    let b = factory().create_buffer(device(), 16, BufferType::Storage).unwrap();
    let c = factory().create_buffer(device(), 16, BufferType::Storage).unwrap();
    a.write(&[9u8; 16], 0, None).unwrap();

    let mut first = factory()
        .create_command_recorder(device(), CommandRecorderUsage::Transfer, 1)
        .unwrap();
    first.begin().unwrap();
    first.copy_buffer(a.as_ref(), 0, b.as_ref(), 0, 16).unwrap();
    first.end().unwrap();

    let mut second = factory()
        .create_command_recorder(device(), CommandRecorderUsage::Transfer, 1)
        .unwrap();
    second.begin().unwrap();
    second.copy_buffer(b.as_ref(), 0, c.as_ref(), 0, 16).unwrap();
    second.end().unwrap();

    let mut submitter = factory().create_command_submitter(device()).unwrap();
    submitter
        .submit(&[&[first.as_ref()], &[second.as_ref()]], None)
        .unwrap();
    submitter.wait(Duration::from_secs(5)).unwrap();

    let read = c.read().unwrap();
    assert!(read[..16].iter().all(|v| *v == 9));
}

#[test]
#[ignore] // Requires GPU
fn test_vulkan_submit_requires_wait_between_submissions() {
    let src = factory().create_buffer(device(), 16, BufferType::Staging).unwrap();
    let dst = factory().create_buffer(device(), 16, BufferType::Storage).unwrap();

    let mut first = factory()
        .create_command_recorder(device(), CommandRecorderUsage::Transfer, 1)
        .unwrap();
    first.begin().unwrap();
    first.copy_buffer(src.as_ref(), 0, dst.as_ref(), 0, 16).unwrap();
    first.end().unwrap();

    let mut second = factory()
        .create_command_recorder(device(), CommandRecorderUsage::Transfer, 1)
        .unwrap();
    second.begin().unwrap();
    second.copy_buffer(src.as_ref(), 0, dst.as_ref(), 0, 16).unwrap();
    second.end().unwrap();

    let mut submitter = factory().create_command_submitter(device()).unwrap();
    submitter.submit(&[&[first.as_ref()]], None).unwrap();

    // No implicit wait: the second submission is refused until wait() ran
    assert!(submitter.submit(&[&[second.as_ref()]], None).is_err());
    assert!(submitter.is_waiting());

    submitter.wait(Duration::from_secs(5)).unwrap();
    submitter.submit(&[&[second.as_ref()]], None).unwrap();
    submitter.wait(Duration::from_secs(5)).unwrap();
}

#[test]
#[ignore] // Requires GPU
fn test_vulkan_recorder_rejects_commands_before_begin() {
    let src = factory().create_buffer(device(), 16, BufferType::Staging).unwrap();
    let dst = factory().create_buffer(device(), 16, BufferType::Storage).unwrap();
    let mut recorder = factory()
        .create_command_recorder(device(), CommandRecorderUsage::Transfer, 1)
        .unwrap();

    assert!(recorder.copy_buffer(src.as_ref(), 0, dst.as_ref(), 0, 16).is_err());
    assert!(recorder.end().is_err());
}

#[test]
#[ignore] // Requires GPU
fn test_vulkan_recorder_ring_wraps() {
    let mut recorder = factory()
        .create_command_recorder(device(), CommandRecorderUsage::Graphics, 3)
        .unwrap();
    assert_eq!(recorder.buffer_count(), 3);

    let indices: Vec<u32> = (0..4)
        .map(|_| {
            recorder.next();
            recorder.current_index()
        })
        .collect();
    assert_eq!(indices, vec![1, 2, 0, 1]);
}

// ============================================================================
// QUERY TESTS
// ============================================================================

#[test]
#[ignore] // Requires GPU
fn test_vulkan_occlusion_query_index_is_checked() {
    let query = factory().create_occlusion_query(device(), 4).unwrap();
    assert_eq!(query.sample_count(), 4);

    let mut recorder = factory()
        .create_command_recorder(device(), CommandRecorderUsage::Graphics, 1)
        .unwrap();
    recorder.begin().unwrap();
    recorder.reset_query(query.as_ref()).unwrap();
    assert!(recorder.begin_query(query.as_ref(), 4).is_err());
    recorder.end().unwrap();
}

#[test]
#[ignore] // Requires GPU
fn test_vulkan_empty_occlusion_query_is_rejected() {
    assert!(factory().create_occlusion_query(device(), 0).is_err());
}

// ============================================================================
// RAY TRACING TESTS
// ============================================================================

#[test]
#[ignore] // Requires GPU
fn test_vulkan_ray_tracer_matches_device_support() {
    let result = factory().create_ray_tracer(device(), 128, 128);
    if supports_ray_tracing() {
        let ray_tracer = result.unwrap();
        assert_eq!(ray_tracer.width(), 128);
        assert!(ray_tracer.image().specification().usage.contains(ImageUsage::STORAGE));
    } else {
        assert!(result.is_err());
    }
}

#[test]
#[ignore] // Requires GPU
fn test_vulkan_empty_acceleration_structures_are_rejected() {
    assert!(factory().create_bottom_level_acceleration_structure(device(), &[]).is_err());
    assert!(factory().create_top_level_acceleration_structure(device(), &[]).is_err());
}

// ============================================================================
// REFLECTION TESTS
// ============================================================================

#[test]
#[ignore] // Requires GPU
fn test_vulkan_reflection_rejects_invalid_binary() {
    assert!(reflect_spirv(&[0xdead_beef, 0, 0]).is_err());
}
