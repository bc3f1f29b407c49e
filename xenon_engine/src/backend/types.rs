/// Shared enumerations and flag sets used across every backend

use bitflags::bitflags;

// ===== RENDER TARGETS =====

bitflags! {
    /// Render target capabilities of a device
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct RenderTargetType: u8 {
        const RASTERIZER = 1 << 0;
        const RAY_TRACER = 1 << 1;
        const PATH_TRACER = 1 << 2;
    }
}

bitflags! {
    /// Attachments owned by a rasterizer
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct AttachmentType: u8 {
        /// RGBA8 color output
        const COLOR = 1 << 0;
        /// Per-pixel entity identifier (R32 float)
        const ENTITY_ID = 1 << 1;
        /// World-space normals (RGBA32 float)
        const NORMAL = 1 << 2;
        /// Depth buffer
        const DEPTH = 1 << 3;
        /// Stencil buffer (shares the depth image)
        const STENCIL = 1 << 4;
    }
}

impl AttachmentType {
    /// Color-like attachments in the order they appear in a render pass
    pub const COLOR_ORDER: [AttachmentType; 3] =
        [AttachmentType::COLOR, AttachmentType::ENTITY_ID, AttachmentType::NORMAL];

    /// Number of color-like attachments (everything except depth/stencil)
    pub fn color_attachment_count(self) -> usize {
        Self::COLOR_ORDER.iter().filter(|t| self.contains(**t)).count()
    }

    /// Whether a depth and/or stencil image is required
    pub fn has_depth_stencil(self) -> bool {
        self.intersects(AttachmentType::DEPTH | AttachmentType::STENCIL)
    }
}

/// Number of samples per pixel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MultiSamplingCount {
    #[default]
    X1,
    X2,
    X4,
    X8,
    X16,
    X32,
    X64,
}

impl MultiSamplingCount {
    pub fn sample_count(self) -> u32 {
        match self {
            MultiSamplingCount::X1 => 1,
            MultiSamplingCount::X2 => 2,
            MultiSamplingCount::X4 => 4,
            MultiSamplingCount::X8 => 8,
            MultiSamplingCount::X16 => 16,
            MultiSamplingCount::X32 => 32,
            MultiSamplingCount::X64 => 64,
        }
    }
}

// ===== BUFFERS =====

/// Intended use of a buffer, fixed at creation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferType {
    /// Index data
    Index,
    /// Vertex or instance data
    Vertex,
    /// Uniform/constant data (sized to a 256-byte multiple on DX12)
    Uniform,
    /// Read-write storage data
    Storage,
    /// Host-visible transfer source/destination
    Staging,
    /// Backend-internal usage (scratch memory, shader binding tables, ...)
    BackendSpecific,
}

/// Width of an index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexBufferStride {
    Uint16,
    Uint32,
}

impl IndexBufferStride {
    pub fn size_bytes(self) -> u64 {
        match self {
            IndexBufferStride::Uint16 => 2,
            IndexBufferStride::Uint32 => 4,
        }
    }
}

// ===== IMAGES =====

/// Texel formats understood by every backend
#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DataFormat {
    #[default]
    Undefined,
    R8_SRGB,
    R8G8_SRGB,
    R8G8B8A8_UNORM,
    R8G8B8A8_SRGB,
    B8G8R8A8_UNORM,
    B8G8R8A8_SRGB,
    R16G16B16A16_SFLOAT,
    R32_SFLOAT,
    R32G32B32A32_SFLOAT,
    D16_UNORM,
    D32_SFLOAT,
    D24_UNORM_S8_UINT,
    D32_SFLOAT_S8_UINT,
}

impl DataFormat {
    /// Bytes per texel (0 for `Undefined`)
    pub fn texel_size(self) -> u64 {
        match self {
            DataFormat::Undefined => 0,
            DataFormat::R8_SRGB => 1,
            DataFormat::R8G8_SRGB | DataFormat::D16_UNORM => 2,
            DataFormat::R8G8B8A8_UNORM
            | DataFormat::R8G8B8A8_SRGB
            | DataFormat::B8G8R8A8_UNORM
            | DataFormat::B8G8R8A8_SRGB
            | DataFormat::R32_SFLOAT
            | DataFormat::D32_SFLOAT
            | DataFormat::D24_UNORM_S8_UINT => 4,
            DataFormat::R16G16B16A16_SFLOAT | DataFormat::D32_SFLOAT_S8_UINT => 8,
            DataFormat::R32G32B32A32_SFLOAT => 16,
        }
    }

    pub fn is_depth(self) -> bool {
        matches!(
            self,
            DataFormat::D16_UNORM
                | DataFormat::D32_SFLOAT
                | DataFormat::D24_UNORM_S8_UINT
                | DataFormat::D32_SFLOAT_S8_UINT
        )
    }

    pub fn has_stencil(self) -> bool {
        matches!(self, DataFormat::D24_UNORM_S8_UINT | DataFormat::D32_SFLOAT_S8_UINT)
    }
}

// ===== SHADERS & DESCRIPTORS =====

bitflags! {
    /// Shader stages, used as a mask for binding visibility
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ShaderType: u16 {
        const VERTEX = 1 << 0;
        const FRAGMENT = 1 << 1;
        const COMPUTE = 1 << 2;
        const RAY_GEN = 1 << 3;
        const INTERSECTION = 1 << 4;
        const ANY_HIT = 1 << 5;
        const CLOSEST_HIT = 1 << 6;
        const MISS = 1 << 7;
        const CALLABLE = 1 << 8;
    }
}

/// Descriptor set class, partitioned by update frequency
///
/// The discriminant is the set index used by every pipeline layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DescriptorType {
    UserDefined = 0,
    Material = 1,
    PerGeometry = 2,
    Scene = 3,
}

impl DescriptorType {
    /// All classes, in set-index order
    pub const ALL: [DescriptorType; 4] = [
        DescriptorType::UserDefined,
        DescriptorType::Material,
        DescriptorType::PerGeometry,
        DescriptorType::Scene,
    ];

    pub fn set_index(self) -> u32 {
        self as u32
    }

    /// Class for a reflected set index, `None` when the set is out of range
    pub fn from_set_index(set: u32) -> Option<Self> {
        Self::ALL.get(set as usize).copied()
    }
}

/// Kind of resource bound at a descriptor binding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceType {
    Sampler,
    CombinedImageSampler,
    SampledImage,
    StorageImage,
    UniformTexelBuffer,
    StorageTexelBuffer,
    UniformBuffer,
    StorageBuffer,
    DynamicUniformBuffer,
    DynamicStorageBuffer,
    InputAttachment,
    AccelerationStructure,
}

bitflags! {
    /// Access a shader performs on a resource
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ResourceOperation: u8 {
        const READ = 1 << 0;
        const WRITE = 1 << 1;
    }
}

// ===== COMMANDS =====

/// How a command recorder is submitted, fixed at creation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandRecorderUsage {
    /// Rasterization and general work on the graphics queue
    Graphics,
    /// Compute dispatches
    Compute,
    /// Copies only
    Transfer,
    /// Recorded for execution inside another recorder
    Secondary,
}

impl CommandRecorderUsage {
    /// Pipeline stage that dependents of this recorder must wait at
    pub fn wait_stage(self) -> PipelineStage {
        match self {
            CommandRecorderUsage::Graphics | CommandRecorderUsage::Secondary => {
                PipelineStage::AllGraphics
            }
            CommandRecorderUsage::Compute => PipelineStage::ComputeShader,
            CommandRecorderUsage::Transfer => PipelineStage::Transfer,
        }
    }
}

/// Coarse pipeline stages used for cross-batch waits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineStage {
    ColorAttachmentOutput,
    AllGraphics,
    ComputeShader,
    Transfer,
    AllCommands,
}

/// Viewport rectangle and depth range
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub min_depth: f32,
    pub max_depth: f32,
}

/// Integer rectangle (scissor)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect2D {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

/// Clear value for one rasterizer attachment
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClearValue {
    Color([f32; 4]),
    DepthStencil { depth: f32, stencil: u32 },
}

#[cfg(test)]
#[path = "types_tests.rs"]
mod tests;
