/// Pipeline specifications and pipeline traits
///
/// Specifications are plain values. Backends translate them into native
/// pipeline objects; the translation of every fixed-function enum is total and
/// falls back to a documented default (with one error log) for `Undefined`.

use std::any::Any;

use bitflags::bitflags;

use crate::backend::binding::ShaderBindingMap;
use crate::backend::descriptor::Descriptor;
use crate::backend::shader::Shader;
use crate::backend::types::{DescriptorType, ShaderType};
use crate::backend::vertex::VertexSpecification;
use crate::error::Result;

// ===== FIXED-FUNCTION ENUMS =====

/// Primitive assembly topology. `Undefined` translates to `PointList`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PrimitiveTopology {
    Undefined,
    PointList,
    LineList,
    LineStrip,
    #[default]
    TriangleList,
    TriangleStrip,
    TriangleFan,
    LineListWithAdjacency,
    LineStripWithAdjacency,
    TriangleListWithAdjacency,
    TriangleStripWithAdjacency,
    PatchList,
}

/// Face culling. `Undefined` translates to `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CullMode {
    Undefined,
    None,
    Front,
    #[default]
    Back,
    FrontAndBack,
}

/// Winding of front faces. `Undefined` translates to `CounterClockwise`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FrontFace {
    Undefined,
    #[default]
    CounterClockwise,
    Clockwise,
}

/// Polygon rasterization mode. `Undefined` translates to `Fill`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PolygonMode {
    Undefined,
    #[default]
    Fill,
    Line,
    Point,
}

/// Framebuffer logic operation. `Undefined` translates to `Clear`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ColorBlendLogic {
    Undefined,
    #[default]
    Clear,
    And,
    AndReverse,
    Copy,
    AndInverted,
    NoOperator,
    Xor,
    Or,
    Nor,
    Equivalent,
    Invert,
    ReverseOr,
    CopyInverted,
    InvertedOr,
    Nand,
    Set,
}

/// Depth comparison. `Undefined` translates to `Never`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DepthCompareLogic {
    Undefined,
    Never,
    Less,
    Equal,
    #[default]
    LessOrEqual,
    Greater,
    NotEqual,
    GreaterOrEqual,
    Always,
}

/// Blend factor. `Undefined` translates to `Zero`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ColorBlendFactor {
    Undefined,
    #[default]
    Zero,
    One,
    SourceColor,
    OneMinusSourceColor,
    DestinationColor,
    OneMinusDestinationColor,
    SourceAlpha,
    OneMinusSourceAlpha,
    DestinationAlpha,
    OneMinusDestinationAlpha,
    ConstantColor,
    OneMinusConstantColor,
    ConstantAlpha,
    OneMinusConstantAlpha,
    SourceAlphaSaturate,
    SourceOneColor,
    OneMinusSourceOneColor,
    SourceOneAlpha,
    OneMinusSourceOneAlpha,
}

/// Blend operator. `Undefined` translates to `Add`.
///
/// Everything after `Maximum` is an advanced blend operator. Vulkan maps them
/// through `VK_EXT_blend_operation_advanced`; DirectX 12 has no equivalent and
/// falls back to `Add`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ColorBlendOperator {
    Undefined,
    #[default]
    Add,
    Subtract,
    ReverseSubtract,
    Minimum,
    Maximum,
    Zero,
    Source,
    Destination,
    SourceOver,
    DestinationOver,
    SourceIn,
    DestinationIn,
    SourceOut,
    DestinationOut,
    SourceAtop,
    DestinationAtop,
    Xor,
    Multiply,
    Screen,
    Overlay,
    Darken,
    Lighten,
    ColorDodge,
    ColorBurn,
    HardLight,
    SoftLight,
    Difference,
    Exclusion,
    Invert,
    InvertRgb,
    LinearDodge,
    LinearBurn,
    VividLight,
    LinearLight,
    PinLight,
    HardMix,
    HslHue,
    HslSaturation,
    HslColor,
    HslLuminosity,
    Plus,
    PlusClamped,
    PlusClampedAlpha,
    PlusDarker,
    Minus,
    MinusClamped,
    Contrast,
    InvertOvg,
    Red,
    Green,
    Blue,
}

impl ColorBlendOperator {
    /// Whether the operator is one of the five core blend operators
    pub fn is_basic(self) -> bool {
        matches!(
            self,
            ColorBlendOperator::Add
                | ColorBlendOperator::Subtract
                | ColorBlendOperator::ReverseSubtract
                | ColorBlendOperator::Minimum
                | ColorBlendOperator::Maximum
        )
    }
}

bitflags! {
    /// Color channels written by an attachment
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ColorWriteMask: u8 {
        const R = 1 << 0;
        const G = 1 << 1;
        const B = 1 << 2;
        const A = 1 << 3;
    }
}

bitflags! {
    /// Optional dynamic states. Viewport and scissor are always dynamic.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct DynamicStateFlags: u8 {
        const LINE_WIDTH = 1 << 0;
        const DEPTH_BIAS = 1 << 1;
        const BLEND_CONSTANTS = 1 << 2;
        const DEPTH_BOUNDS = 1 << 3;
    }
}

/// A pipeline state set at record time instead of build time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DynamicState {
    Viewport,
    Scissor,
    LineWidth,
    DepthBias,
    BlendConstants,
    DepthBounds,
}

/// Dynamic states of a pipeline: viewport and scissor, then the flagged ones
pub fn dynamic_states(flags: DynamicStateFlags) -> Vec<DynamicState> {
    let mut states = vec![DynamicState::Viewport, DynamicState::Scissor];
    if flags.contains(DynamicStateFlags::LINE_WIDTH) {
        states.push(DynamicState::LineWidth);
    }
    if flags.contains(DynamicStateFlags::DEPTH_BIAS) {
        states.push(DynamicState::DepthBias);
    }
    if flags.contains(DynamicStateFlags::BLEND_CONSTANTS) {
        states.push(DynamicState::BlendConstants);
    }
    if flags.contains(DynamicStateFlags::DEPTH_BOUNDS) {
        states.push(DynamicState::DepthBounds);
    }
    states
}

// ===== RASTERIZING PIPELINE =====

/// Blend configuration of one color attachment
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorBlendAttachment {
    pub enable_blend: bool,
    pub src_blend_factor: ColorBlendFactor,
    pub dst_blend_factor: ColorBlendFactor,
    pub blend_operator: ColorBlendOperator,
    pub src_alpha_blend_factor: ColorBlendFactor,
    pub dst_alpha_blend_factor: ColorBlendFactor,
    pub alpha_blend_operator: ColorBlendOperator,
    pub color_write_mask: ColorWriteMask,
}

impl Default for ColorBlendAttachment {
    fn default() -> Self {
        Self {
            enable_blend: false,
            src_blend_factor: ColorBlendFactor::One,
            dst_blend_factor: ColorBlendFactor::Zero,
            blend_operator: ColorBlendOperator::Add,
            src_alpha_blend_factor: ColorBlendFactor::One,
            dst_alpha_blend_factor: ColorBlendFactor::Zero,
            alpha_blend_operator: ColorBlendOperator::Add,
            color_write_mask: ColorWriteMask::all(),
        }
    }
}

impl ColorBlendAttachment {
    /// Standard `src * a + dst * (1 - a)` alpha blending
    pub fn alpha_blending() -> Self {
        Self {
            enable_blend: true,
            src_blend_factor: ColorBlendFactor::SourceAlpha,
            dst_blend_factor: ColorBlendFactor::OneMinusSourceAlpha,
            src_alpha_blend_factor: ColorBlendFactor::One,
            dst_alpha_blend_factor: ColorBlendFactor::OneMinusSourceAlpha,
            ..Self::default()
        }
    }
}

/// Everything a rasterizing pipeline is built from
///
/// The fixed-function part is translated once per pipeline and shared by all
/// of its vertex layout specializations.
#[derive(Debug, Clone)]
pub struct RasterizingPipelineSpecification {
    pub vertex_shader: Shader,
    pub fragment_shader: Shader,

    pub color_blend_attachments: Vec<ColorBlendAttachment>,
    pub color_blend_constants: [f32; 4],

    pub depth_bias_factor: f32,
    pub depth_constant_factor: f32,
    pub depth_slope_factor: f32,
    pub rasterizer_line_width: f32,
    pub min_sample_shading: f32,

    pub tessellation_patch_control_points: u32,

    pub primitive_topology: PrimitiveTopology,
    pub cull_mode: CullMode,
    pub front_face: FrontFace,
    pub polygon_mode: PolygonMode,
    pub color_blend_logic: ColorBlendLogic,
    pub depth_compare_logic: DepthCompareLogic,
    pub dynamic_state_flags: DynamicStateFlags,

    pub enable_primitive_restart: bool,
    pub enable_depth_bias: bool,
    pub enable_depth_clamp: bool,
    pub enable_rasterizer_discard: bool,
    pub enable_alpha_coverage: bool,
    pub enable_alpha_to_one: bool,
    pub enable_sample_shading: bool,
    pub enable_color_blend_logic: bool,
    pub enable_depth_test: bool,
    pub enable_depth_write: bool,
}

impl Default for RasterizingPipelineSpecification {
    fn default() -> Self {
        Self {
            vertex_shader: Shader::default(),
            fragment_shader: Shader::default(),
            color_blend_attachments: vec![ColorBlendAttachment::default()],
            color_blend_constants: [0.0; 4],
            depth_bias_factor: 0.0,
            depth_constant_factor: 0.0,
            depth_slope_factor: 0.0,
            rasterizer_line_width: 1.0,
            min_sample_shading: 0.0,
            tessellation_patch_control_points: 0,
            primitive_topology: PrimitiveTopology::default(),
            cull_mode: CullMode::default(),
            front_face: FrontFace::default(),
            polygon_mode: PolygonMode::default(),
            color_blend_logic: ColorBlendLogic::default(),
            depth_compare_logic: DepthCompareLogic::default(),
            dynamic_state_flags: DynamicStateFlags::empty(),
            enable_primitive_restart: false,
            enable_depth_bias: false,
            enable_depth_clamp: false,
            enable_rasterizer_discard: false,
            enable_alpha_coverage: false,
            enable_alpha_to_one: false,
            enable_sample_shading: false,
            enable_color_blend_logic: false,
            enable_depth_test: true,
            enable_depth_write: true,
        }
    }
}

impl RasterizingPipelineSpecification {
    /// Shader stages that carry a binary, in pipeline order
    pub fn shader_stages(&self) -> Vec<(&Shader, ShaderType)> {
        let mut stages = Vec::with_capacity(2);
        if self.vertex_shader.is_valid() {
            stages.push((&self.vertex_shader, ShaderType::VERTEX));
        }
        if self.fragment_shader.is_valid() {
            stages.push((&self.fragment_shader, ShaderType::FRAGMENT));
        }
        stages
    }

    /// Union of the resources of every stage, per descriptor class
    pub fn binding_map(&self) -> ShaderBindingMap {
        ShaderBindingMap::from_stages(&self.shader_stages())
    }
}

/// Graphics pipeline specialized lazily per vertex layout
///
/// Backends expose their native specialization lookup on the concrete type
/// (the command recorder downcasts through `as_any` when binding).
pub trait RasterizingPipeline: Send + Sync {
    fn specification(&self) -> &RasterizingPipelineSpecification;

    /// Create a descriptor for one descriptor class of this pipeline
    fn create_descriptor(&self, descriptor_type: DescriptorType) -> Result<Box<dyn Descriptor>>;

    /// Build (or find) the specialization for a vertex layout
    ///
    /// Returns the layout hash identifying the specialization.
    fn specialize(&self, vertex_specification: &VertexSpecification) -> Result<u64>;

    /// Rebuild every specialization, e.g. after the render target changed
    fn recreate(&self) -> Result<()>;

    /// Number of specializations built so far
    fn specialization_count(&self) -> usize;

    fn as_any(&self) -> &dyn Any;
}

// ===== COMPUTE PIPELINE =====

/// Compute pipeline keyed by its shader's content hash
pub trait ComputePipeline: Send + Sync {
    fn shader(&self) -> &Shader;

    fn create_descriptor(&self, descriptor_type: DescriptorType) -> Result<Box<dyn Descriptor>>;

    fn as_any(&self) -> &dyn Any;
}

// ===== RAY TRACING PIPELINE =====

/// Shaders of one shader binding table group
#[derive(Debug, Clone, Default)]
pub struct ShaderGroup {
    pub ray_gen: Option<Shader>,
    pub intersection: Option<Shader>,
    pub any_hit: Option<Shader>,
    pub closest_hit: Option<Shader>,
    pub miss: Option<Shader>,
    pub callable: Option<Shader>,
}

impl ShaderGroup {
    /// Every shader of the group with its stage
    pub fn stages(&self) -> Vec<(&Shader, ShaderType)> {
        [
            (&self.ray_gen, ShaderType::RAY_GEN),
            (&self.intersection, ShaderType::INTERSECTION),
            (&self.any_hit, ShaderType::ANY_HIT),
            (&self.closest_hit, ShaderType::CLOSEST_HIT),
            (&self.miss, ShaderType::MISS),
            (&self.callable, ShaderType::CALLABLE),
        ]
        .into_iter()
        .filter_map(|(shader, stage)| shader.as_ref().map(|s| (s, stage)))
        .collect()
    }

    /// Whether the group is a hit group (intersection, any-hit or closest-hit)
    pub fn is_hit_group(&self) -> bool {
        self.intersection.is_some() || self.any_hit.is_some() || self.closest_hit.is_some()
    }
}

#[derive(Debug, Clone)]
pub struct RayTracingPipelineSpecification {
    pub shader_groups: Vec<ShaderGroup>,
    pub max_ray_recursion_depth: u32,
}

impl Default for RayTracingPipelineSpecification {
    fn default() -> Self {
        Self {
            shader_groups: Vec::new(),
            max_ray_recursion_depth: 1,
        }
    }
}

impl RayTracingPipelineSpecification {
    /// Union of the resources of every shader of every group
    pub fn binding_map(&self) -> ShaderBindingMap {
        let stages: Vec<_> = self.shader_groups.iter().flat_map(ShaderGroup::stages).collect();
        ShaderBindingMap::from_stages(&stages)
    }

    /// Cache discriminant: content hashes of all shaders folded together
    pub fn content_hash(&self) -> u64 {
        self.shader_groups
            .iter()
            .flat_map(ShaderGroup::stages)
            .fold(0u64, |acc, (shader, _)| acc.rotate_left(5) ^ shader.content_hash())
    }
}

pub trait RayTracingPipeline: Send + Sync {
    fn specification(&self) -> &RayTracingPipelineSpecification;

    fn create_descriptor(&self, descriptor_type: DescriptorType) -> Result<Box<dyn Descriptor>>;

    fn as_any(&self) -> &dyn Any;
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
