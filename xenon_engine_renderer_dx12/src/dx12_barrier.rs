/// Resource state tracking for Direct3D 12
///
/// D3D12 transitions name both the state a resource leaves and the one it
/// enters, so every buffer and image carries its current state. This module
/// maps the engine states onto `D3D12_RESOURCE_STATES` bits and plans the
/// transitions wrapped around a copy.

use xenon_engine::xenon::backend::{copy_transition, BufferType, ImageUsage, MemoryLocation, ResourceState};

// D3D12_RESOURCE_STATES values
pub const STATE_COMMON: i32 = 0;
pub const STATE_VERTEX_AND_CONSTANT_BUFFER: i32 = 0x1;
pub const STATE_INDEX_BUFFER: i32 = 0x2;
pub const STATE_RENDER_TARGET: i32 = 0x4;
pub const STATE_UNORDERED_ACCESS: i32 = 0x8;
pub const STATE_DEPTH_WRITE: i32 = 0x10;
pub const STATE_NON_PIXEL_SHADER_RESOURCE: i32 = 0x40;
pub const STATE_PIXEL_SHADER_RESOURCE: i32 = 0x80;
pub const STATE_COPY_DEST: i32 = 0x400;
pub const STATE_COPY_SOURCE: i32 = 0x800;
pub const STATE_RESOLVE_DEST: i32 = 0x1000;
pub const STATE_RESOLVE_SOURCE: i32 = 0x2000;
pub const STATE_GENERIC_READ: i32 = 0xac3;

/// Heap a resource is placed in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeapKind {
    /// D3D12_HEAP_TYPE_DEFAULT
    Default,
    /// D3D12_HEAP_TYPE_UPLOAD
    Upload,
    /// D3D12_HEAP_TYPE_READBACK
    Readback,
}

impl From<MemoryLocation> for HeapKind {
    fn from(location: MemoryLocation) -> Self {
        match location {
            MemoryLocation::GpuOnly => HeapKind::Default,
            MemoryLocation::CpuToGpu => HeapKind::Upload,
            MemoryLocation::GpuToCpu => HeapKind::Readback,
        }
    }
}

/// Memory location and creation state of a buffer of `buffer_type`
///
/// Upload heap resources must be created and kept in `GenericRead`, so
/// uniform and staging buffers live there permanently.
pub fn buffer_placement(buffer_type: BufferType) -> (MemoryLocation, ResourceState) {
    match buffer_type {
        BufferType::Uniform | BufferType::Staging => (MemoryLocation::CpuToGpu, ResourceState::GenericRead),
        other => (MemoryLocation::GpuOnly, ResourceState::initial_for(other)),
    }
}

/// `D3D12_RESOURCE_STATES` bits of a buffer state
pub fn buffer_state_bits(state: ResourceState) -> i32 {
    match state {
        ResourceState::Common => STATE_COMMON,
        ResourceState::VertexAndConstantBuffer => STATE_VERTEX_AND_CONSTANT_BUFFER,
        ResourceState::IndexBuffer => STATE_INDEX_BUFFER,
        ResourceState::UnorderedAccess => STATE_UNORDERED_ACCESS,
        ResourceState::CopySource => STATE_COPY_SOURCE,
        ResourceState::CopyDestination => STATE_COPY_DEST,
        ResourceState::GenericRead => STATE_GENERIC_READ,
    }
}

// ===== BUFFER COPIES =====

/// Which side of a copy a transition applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopySide {
    Source,
    Destination,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateTransition {
    pub side: CopySide,
    pub before: ResourceState,
    pub after: ResourceState,
}

/// Transitions recorded before and after a buffer copy
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CopyBarriers {
    pub before: Vec<StateTransition>,
    pub after: Vec<StateTransition>,
}

/// Plan the transitions of a copy from `src` into `dst`
///
/// Each side is given as its current state and memory location. A side
/// already in `GenericRead`, living in the readback heap or already in the
/// copy state is left alone. `after` reverts `before` in reverse order, so
/// both buffers end in the state they started in.
pub fn plan_buffer_copy(
    dst: (ResourceState, MemoryLocation),
    src: (ResourceState, MemoryLocation),
) -> CopyBarriers {
    let mut barriers = CopyBarriers::default();

    let sides = [
        (CopySide::Destination, dst, ResourceState::CopyDestination),
        (CopySide::Source, src, ResourceState::CopySource),
    ];
    for (side, (state, location), copy_state) in sides {
        if let Some(target) = copy_transition(state, location, copy_state) {
            barriers.before.push(StateTransition { side, before: state, after: target });
        }
    }

    barriers.after = barriers
        .before
        .iter()
        .rev()
        .map(|t| StateTransition { side: t.side, before: t.after, after: t.before })
        .collect();
    barriers
}

// ===== IMAGES =====

/// State an image can be in between commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageState {
    Common,
    CopyDestination,
    CopySource,
    ShaderResource,
    RenderTarget,
    DepthWrite,
    UnorderedAccess,
    ResolveSource,
    ResolveDestination,
    /// Swapchain buffers while they are presented
    Present,
}

impl ImageState {
    pub fn bits(self) -> i32 {
        match self {
            ImageState::Common => STATE_COMMON,
            ImageState::CopyDestination => STATE_COPY_DEST,
            ImageState::CopySource => STATE_COPY_SOURCE,
            ImageState::ShaderResource => STATE_PIXEL_SHADER_RESOURCE | STATE_NON_PIXEL_SHADER_RESOURCE,
            ImageState::RenderTarget => STATE_RENDER_TARGET,
            ImageState::DepthWrite => STATE_DEPTH_WRITE,
            ImageState::UnorderedAccess => STATE_UNORDERED_ACCESS,
            ImageState::ResolveSource => STATE_RESOLVE_SOURCE,
            ImageState::ResolveDestination => STATE_RESOLVE_DEST,
            ImageState::Present => STATE_COMMON,
        }
    }

    /// State an image of `usage` is left in after transfers
    ///
    /// Follows the same priority as the Vulkan resting layout: storage,
    /// sampled, depth attachment, color attachment, then copy destination.
    pub fn resting(usage: ImageUsage) -> Self {
        if usage.contains(ImageUsage::STORAGE) {
            ImageState::UnorderedAccess
        } else if usage.contains(ImageUsage::GRAPHICS) {
            ImageState::ShaderResource
        } else if usage.contains(ImageUsage::DEPTH_ATTACHMENT) {
            ImageState::DepthWrite
        } else if usage.contains(ImageUsage::COLOR_ATTACHMENT) {
            ImageState::RenderTarget
        } else {
            ImageState::CopyDestination
        }
    }
}

#[cfg(test)]
#[path = "dx12_barrier_tests.rs"]
mod tests;
