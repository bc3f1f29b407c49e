use super::*;

#[test]
fn test_generic_read_matches_its_component_states() {
    let components = STATE_VERTEX_AND_CONSTANT_BUFFER
        | STATE_INDEX_BUFFER
        | STATE_NON_PIXEL_SHADER_RESOURCE
        | STATE_PIXEL_SHADER_RESOURCE
        | 0x200 // indirect argument
        | STATE_COPY_SOURCE;
    assert_eq!(STATE_GENERIC_READ, components);
}

#[test]
fn test_buffer_placement() {
    assert_eq!(
        buffer_placement(BufferType::Uniform),
        (MemoryLocation::CpuToGpu, ResourceState::GenericRead)
    );
    assert_eq!(
        buffer_placement(BufferType::Staging),
        (MemoryLocation::CpuToGpu, ResourceState::GenericRead)
    );
    assert_eq!(
        buffer_placement(BufferType::Vertex),
        (MemoryLocation::GpuOnly, ResourceState::VertexAndConstantBuffer)
    );
    assert_eq!(
        buffer_placement(BufferType::Index),
        (MemoryLocation::GpuOnly, ResourceState::IndexBuffer)
    );
    assert_eq!(buffer_placement(BufferType::Storage), (MemoryLocation::GpuOnly, ResourceState::Common));
}

#[test]
fn test_heap_kind_follows_memory_location() {
    assert_eq!(HeapKind::from(MemoryLocation::GpuOnly), HeapKind::Default);
    assert_eq!(HeapKind::from(MemoryLocation::CpuToGpu), HeapKind::Upload);
    assert_eq!(HeapKind::from(MemoryLocation::GpuToCpu), HeapKind::Readback);
}

#[test]
fn test_copy_between_device_buffers_transitions_both_sides() {
    let barriers = plan_buffer_copy(
        (ResourceState::VertexAndConstantBuffer, MemoryLocation::GpuOnly),
        (ResourceState::Common, MemoryLocation::GpuOnly),
    );

    assert_eq!(
        barriers.before,
        vec![
            StateTransition {
                side: CopySide::Destination,
                before: ResourceState::VertexAndConstantBuffer,
                after: ResourceState::CopyDestination,
            },
            StateTransition {
                side: CopySide::Source,
                before: ResourceState::Common,
                after: ResourceState::CopySource,
            },
        ]
    );
    assert_eq!(
        barriers.after,
        vec![
            StateTransition {
                side: CopySide::Source,
                before: ResourceState::CopySource,
                after: ResourceState::Common,
            },
            StateTransition {
                side: CopySide::Destination,
                before: ResourceState::CopyDestination,
                after: ResourceState::VertexAndConstantBuffer,
            },
        ]
    );
}

#[test]
fn test_copy_from_upload_heap_only_transitions_destination() {
    let barriers = plan_buffer_copy(
        (ResourceState::IndexBuffer, MemoryLocation::GpuOnly),
        (ResourceState::GenericRead, MemoryLocation::CpuToGpu),
    );
    assert_eq!(barriers.before.len(), 1);
    assert_eq!(barriers.before[0].side, CopySide::Destination);
    assert_eq!(barriers.after.len(), 1);
    assert_eq!(barriers.after[0].after, ResourceState::IndexBuffer);
}

#[test]
fn test_copy_into_readback_heap_only_transitions_source() {
    let barriers = plan_buffer_copy(
        (ResourceState::CopyDestination, MemoryLocation::GpuToCpu),
        (ResourceState::UnorderedAccess, MemoryLocation::GpuOnly),
    );
    assert_eq!(barriers.before.len(), 1);
    assert_eq!(barriers.before[0].side, CopySide::Source);
    assert_eq!(barriers.before[0].after, ResourceState::CopySource);
}

#[test]
fn test_side_already_in_copy_state_is_not_transitioned() {
    let barriers = plan_buffer_copy(
        (ResourceState::CopyDestination, MemoryLocation::GpuOnly),
        (ResourceState::CopySource, MemoryLocation::GpuOnly),
    );
    assert!(barriers.before.is_empty());
    assert!(barriers.after.is_empty());
}

#[test]
fn test_planned_copy_restores_both_states() {
    let states = [
        ResourceState::Common,
        ResourceState::VertexAndConstantBuffer,
        ResourceState::IndexBuffer,
        ResourceState::UnorderedAccess,
        ResourceState::GenericRead,
    ];
    for dst in states {
        for src in states {
            let barriers = plan_buffer_copy((dst, MemoryLocation::GpuOnly), (src, MemoryLocation::GpuOnly));
            let mut current = [dst, src];
            for transition in barriers.before.iter().chain(&barriers.after) {
                let slot = match transition.side {
                    CopySide::Destination => 0,
                    CopySide::Source => 1,
                };
                assert_eq!(current[slot], transition.before);
                current[slot] = transition.after;
            }
            assert_eq!(current, [dst, src]);
        }
    }
}

#[test]
fn test_image_resting_state_priority() {
    assert_eq!(
        ImageState::resting(ImageUsage::STORAGE | ImageUsage::GRAPHICS),
        ImageState::UnorderedAccess
    );
    assert_eq!(ImageState::resting(ImageUsage::GRAPHICS), ImageState::ShaderResource);
    assert_eq!(ImageState::resting(ImageUsage::DEPTH_ATTACHMENT), ImageState::DepthWrite);
    assert_eq!(ImageState::resting(ImageUsage::COLOR_ATTACHMENT), ImageState::RenderTarget);
    assert_eq!(ImageState::resting(ImageUsage::empty()), ImageState::CopyDestination);
}

#[test]
fn test_shader_resource_state_covers_all_stages() {
    let bits = ImageState::ShaderResource.bits();
    assert_ne!(bits & STATE_PIXEL_SHADER_RESOURCE, 0);
    assert_ne!(bits & STATE_NON_PIXEL_SHADER_RESOURCE, 0);
}

#[test]
fn test_presented_buffers_are_in_the_common_state() {
    assert_eq!(ImageState::Present.bits(), STATE_COMMON);
    assert_ne!(ImageState::ResolveSource.bits(), ImageState::ResolveDestination.bits());
}
