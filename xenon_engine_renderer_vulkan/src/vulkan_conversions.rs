/// Conversions from engine value types to Vulkan enums and flags
///
/// Every translation is total: values without a Vulkan counterpart (the
/// `Undefined` variants) log one error and fall back to a fixed value.

use ash::vk;
use xenon_engine::engine_error;
use xenon_engine::xenon::backend::{
    AddressMode, BorderColor, ClearValue, ColorBlendFactor, ColorBlendLogic, ColorBlendOperator, ColorWriteMask,
    ComponentSwizzle, CullMode, DataFormat, DepthCompareLogic, DynamicState, FrontFace, ImageFilter,
    ImageMipMapMode, ImageType, ImageUsage, IndexBufferStride, MultiSamplingCount, PipelineStage, PolygonMode,
    PrimitiveTopology, Rect2D, ResourceState, ResourceType, ShaderType, VertexElementFormat, VertexInputRate,
    Viewport,
};

const SOURCE: &str = "xenon::vulkan";

// ===== FIXED-FUNCTION STATE =====

pub(crate) fn primitive_topology(topology: PrimitiveTopology) -> vk::PrimitiveTopology {
    match topology {
        PrimitiveTopology::PointList => vk::PrimitiveTopology::POINT_LIST,
        PrimitiveTopology::LineList => vk::PrimitiveTopology::LINE_LIST,
        PrimitiveTopology::LineStrip => vk::PrimitiveTopology::LINE_STRIP,
        PrimitiveTopology::TriangleList => vk::PrimitiveTopology::TRIANGLE_LIST,
        PrimitiveTopology::TriangleStrip => vk::PrimitiveTopology::TRIANGLE_STRIP,
        PrimitiveTopology::TriangleFan => vk::PrimitiveTopology::TRIANGLE_FAN,
        PrimitiveTopology::LineListWithAdjacency => vk::PrimitiveTopology::LINE_LIST_WITH_ADJACENCY,
        PrimitiveTopology::LineStripWithAdjacency => vk::PrimitiveTopology::LINE_STRIP_WITH_ADJACENCY,
        PrimitiveTopology::TriangleListWithAdjacency => vk::PrimitiveTopology::TRIANGLE_LIST_WITH_ADJACENCY,
        PrimitiveTopology::TriangleStripWithAdjacency => vk::PrimitiveTopology::TRIANGLE_STRIP_WITH_ADJACENCY,
        PrimitiveTopology::PatchList => vk::PrimitiveTopology::PATCH_LIST,
        PrimitiveTopology::Undefined => {
            engine_error!(SOURCE, "Invalid primitive topology {:?}! Defaulting to PointList.", topology);
            vk::PrimitiveTopology::POINT_LIST
        }
    }
}

pub(crate) fn cull_mode(mode: CullMode) -> vk::CullModeFlags {
    match mode {
        CullMode::None => vk::CullModeFlags::NONE,
        CullMode::Front => vk::CullModeFlags::FRONT,
        CullMode::Back => vk::CullModeFlags::BACK,
        CullMode::FrontAndBack => vk::CullModeFlags::FRONT_AND_BACK,
        CullMode::Undefined => {
            engine_error!(SOURCE, "Invalid cull mode {:?}! Defaulting to None.", mode);
            vk::CullModeFlags::NONE
        }
    }
}

pub(crate) fn front_face(face: FrontFace) -> vk::FrontFace {
    match face {
        FrontFace::CounterClockwise => vk::FrontFace::COUNTER_CLOCKWISE,
        FrontFace::Clockwise => vk::FrontFace::CLOCKWISE,
        FrontFace::Undefined => {
            engine_error!(SOURCE, "Invalid front face {:?}! Defaulting to CounterClockwise.", face);
            vk::FrontFace::COUNTER_CLOCKWISE
        }
    }
}

pub(crate) fn polygon_mode(mode: PolygonMode) -> vk::PolygonMode {
    match mode {
        PolygonMode::Fill => vk::PolygonMode::FILL,
        PolygonMode::Line => vk::PolygonMode::LINE,
        PolygonMode::Point => vk::PolygonMode::POINT,
        PolygonMode::Undefined => {
            engine_error!(SOURCE, "Invalid polygon mode {:?}! Defaulting to Fill.", mode);
            vk::PolygonMode::FILL
        }
    }
}

pub(crate) fn logic_op(logic: ColorBlendLogic) -> vk::LogicOp {
    match logic {
        ColorBlendLogic::Clear => vk::LogicOp::CLEAR,
        ColorBlendLogic::And => vk::LogicOp::AND,
        ColorBlendLogic::AndReverse => vk::LogicOp::AND_REVERSE,
        ColorBlendLogic::Copy => vk::LogicOp::COPY,
        ColorBlendLogic::AndInverted => vk::LogicOp::AND_INVERTED,
        ColorBlendLogic::NoOperator => vk::LogicOp::NO_OP,
        ColorBlendLogic::Xor => vk::LogicOp::XOR,
        ColorBlendLogic::Or => vk::LogicOp::OR,
        ColorBlendLogic::Nor => vk::LogicOp::NOR,
        ColorBlendLogic::Equivalent => vk::LogicOp::EQUIVALENT,
        ColorBlendLogic::Invert => vk::LogicOp::INVERT,
        ColorBlendLogic::ReverseOr => vk::LogicOp::OR_REVERSE,
        ColorBlendLogic::CopyInverted => vk::LogicOp::COPY_INVERTED,
        ColorBlendLogic::InvertedOr => vk::LogicOp::OR_INVERTED,
        ColorBlendLogic::Nand => vk::LogicOp::NAND,
        ColorBlendLogic::Set => vk::LogicOp::SET,
        ColorBlendLogic::Undefined => {
            engine_error!(SOURCE, "Invalid color blend logic {:?}! Defaulting to Clear.", logic);
            vk::LogicOp::CLEAR
        }
    }
}

pub(crate) fn compare_op(logic: DepthCompareLogic) -> vk::CompareOp {
    match logic {
        DepthCompareLogic::Never => vk::CompareOp::NEVER,
        DepthCompareLogic::Less => vk::CompareOp::LESS,
        DepthCompareLogic::Equal => vk::CompareOp::EQUAL,
        DepthCompareLogic::LessOrEqual => vk::CompareOp::LESS_OR_EQUAL,
        DepthCompareLogic::Greater => vk::CompareOp::GREATER,
        DepthCompareLogic::NotEqual => vk::CompareOp::NOT_EQUAL,
        DepthCompareLogic::GreaterOrEqual => vk::CompareOp::GREATER_OR_EQUAL,
        DepthCompareLogic::Always => vk::CompareOp::ALWAYS,
        DepthCompareLogic::Undefined => {
            engine_error!(SOURCE, "Invalid depth compare logic {:?}! Defaulting to Never.", logic);
            vk::CompareOp::NEVER
        }
    }
}

pub(crate) fn blend_factor(factor: ColorBlendFactor) -> vk::BlendFactor {
    match factor {
        ColorBlendFactor::Zero => vk::BlendFactor::ZERO,
        ColorBlendFactor::One => vk::BlendFactor::ONE,
        ColorBlendFactor::SourceColor => vk::BlendFactor::SRC_COLOR,
        ColorBlendFactor::OneMinusSourceColor => vk::BlendFactor::ONE_MINUS_SRC_COLOR,
        ColorBlendFactor::DestinationColor => vk::BlendFactor::DST_COLOR,
        ColorBlendFactor::OneMinusDestinationColor => vk::BlendFactor::ONE_MINUS_DST_COLOR,
        ColorBlendFactor::SourceAlpha => vk::BlendFactor::SRC_ALPHA,
        ColorBlendFactor::OneMinusSourceAlpha => vk::BlendFactor::ONE_MINUS_SRC_ALPHA,
        ColorBlendFactor::DestinationAlpha => vk::BlendFactor::DST_ALPHA,
        ColorBlendFactor::OneMinusDestinationAlpha => vk::BlendFactor::ONE_MINUS_DST_ALPHA,
        ColorBlendFactor::ConstantColor => vk::BlendFactor::CONSTANT_COLOR,
        ColorBlendFactor::OneMinusConstantColor => vk::BlendFactor::ONE_MINUS_CONSTANT_COLOR,
        ColorBlendFactor::ConstantAlpha => vk::BlendFactor::CONSTANT_ALPHA,
        ColorBlendFactor::OneMinusConstantAlpha => vk::BlendFactor::ONE_MINUS_CONSTANT_ALPHA,
        ColorBlendFactor::SourceAlphaSaturate => vk::BlendFactor::SRC_ALPHA_SATURATE,
        ColorBlendFactor::SourceOneColor => vk::BlendFactor::SRC1_COLOR,
        ColorBlendFactor::OneMinusSourceOneColor => vk::BlendFactor::ONE_MINUS_SRC1_COLOR,
        ColorBlendFactor::SourceOneAlpha => vk::BlendFactor::SRC1_ALPHA,
        ColorBlendFactor::OneMinusSourceOneAlpha => vk::BlendFactor::ONE_MINUS_SRC1_ALPHA,
        ColorBlendFactor::Undefined => {
            engine_error!(SOURCE, "Invalid color blend factor {:?}! Defaulting to Zero.", factor);
            vk::BlendFactor::ZERO
        }
    }
}

/// Blend operator; the advanced ones need `VK_EXT_blend_operation_advanced`
pub(crate) fn blend_op(operator: ColorBlendOperator) -> vk::BlendOp {
    use ColorBlendOperator as O;
    match operator {
        O::Add => vk::BlendOp::ADD,
        O::Subtract => vk::BlendOp::SUBTRACT,
        O::ReverseSubtract => vk::BlendOp::REVERSE_SUBTRACT,
        O::Minimum => vk::BlendOp::MIN,
        O::Maximum => vk::BlendOp::MAX,
        O::Zero => vk::BlendOp::ZERO_EXT,
        O::Source => vk::BlendOp::SRC_EXT,
        O::Destination => vk::BlendOp::DST_EXT,
        O::SourceOver => vk::BlendOp::SRC_OVER_EXT,
        O::DestinationOver => vk::BlendOp::DST_OVER_EXT,
        O::SourceIn => vk::BlendOp::SRC_IN_EXT,
        O::DestinationIn => vk::BlendOp::DST_IN_EXT,
        O::SourceOut => vk::BlendOp::SRC_OUT_EXT,
        O::DestinationOut => vk::BlendOp::DST_OUT_EXT,
        O::SourceAtop => vk::BlendOp::SRC_ATOP_EXT,
        O::DestinationAtop => vk::BlendOp::DST_ATOP_EXT,
        O::Xor => vk::BlendOp::XOR_EXT,
        O::Multiply => vk::BlendOp::MULTIPLY_EXT,
        O::Screen => vk::BlendOp::SCREEN_EXT,
        O::Overlay => vk::BlendOp::OVERLAY_EXT,
        O::Darken => vk::BlendOp::DARKEN_EXT,
        O::Lighten => vk::BlendOp::LIGHTEN_EXT,
        O::ColorDodge => vk::BlendOp::COLORDODGE_EXT,
        O::ColorBurn => vk::BlendOp::COLORBURN_EXT,
        O::HardLight => vk::BlendOp::HARDLIGHT_EXT,
        O::SoftLight => vk::BlendOp::SOFTLIGHT_EXT,
        O::Difference => vk::BlendOp::DIFFERENCE_EXT,
        O::Exclusion => vk::BlendOp::EXCLUSION_EXT,
        O::Invert => vk::BlendOp::INVERT_EXT,
        O::InvertRgb => vk::BlendOp::INVERT_RGB_EXT,
        O::LinearDodge => vk::BlendOp::LINEARDODGE_EXT,
        O::LinearBurn => vk::BlendOp::LINEARBURN_EXT,
        O::VividLight => vk::BlendOp::VIVIDLIGHT_EXT,
        O::LinearLight => vk::BlendOp::LINEARLIGHT_EXT,
        O::PinLight => vk::BlendOp::PINLIGHT_EXT,
        O::HardMix => vk::BlendOp::HARDMIX_EXT,
        O::HslHue => vk::BlendOp::HSL_HUE_EXT,
        O::HslSaturation => vk::BlendOp::HSL_SATURATION_EXT,
        O::HslColor => vk::BlendOp::HSL_COLOR_EXT,
        O::HslLuminosity => vk::BlendOp::HSL_LUMINOSITY_EXT,
        O::Plus => vk::BlendOp::PLUS_EXT,
        O::PlusClamped => vk::BlendOp::PLUS_CLAMPED_EXT,
        O::PlusClampedAlpha => vk::BlendOp::PLUS_CLAMPED_ALPHA_EXT,
        O::PlusDarker => vk::BlendOp::PLUS_DARKER_EXT,
        O::Minus => vk::BlendOp::MINUS_EXT,
        O::MinusClamped => vk::BlendOp::MINUS_CLAMPED_EXT,
        O::Contrast => vk::BlendOp::CONTRAST_EXT,
        O::InvertOvg => vk::BlendOp::INVERT_OVG_EXT,
        O::Red => vk::BlendOp::RED_EXT,
        O::Green => vk::BlendOp::GREEN_EXT,
        O::Blue => vk::BlendOp::BLUE_EXT,
        O::Undefined => {
            engine_error!(SOURCE, "Invalid color blend operator {:?}! Defaulting to Add.", operator);
            vk::BlendOp::ADD
        }
    }
}

pub(crate) fn color_write_mask(mask: ColorWriteMask) -> vk::ColorComponentFlags {
    let mut flags = vk::ColorComponentFlags::empty();
    if mask.contains(ColorWriteMask::R) {
        flags |= vk::ColorComponentFlags::R;
    }
    if mask.contains(ColorWriteMask::G) {
        flags |= vk::ColorComponentFlags::G;
    }
    if mask.contains(ColorWriteMask::B) {
        flags |= vk::ColorComponentFlags::B;
    }
    if mask.contains(ColorWriteMask::A) {
        flags |= vk::ColorComponentFlags::A;
    }
    flags
}

pub(crate) fn dynamic_state(state: DynamicState) -> vk::DynamicState {
    match state {
        DynamicState::Viewport => vk::DynamicState::VIEWPORT,
        DynamicState::Scissor => vk::DynamicState::SCISSOR,
        DynamicState::LineWidth => vk::DynamicState::LINE_WIDTH,
        DynamicState::DepthBias => vk::DynamicState::DEPTH_BIAS,
        DynamicState::BlendConstants => vk::DynamicState::BLEND_CONSTANTS,
        DynamicState::DepthBounds => vk::DynamicState::DEPTH_BOUNDS,
    }
}

// ===== VERTEX INPUT =====

pub(crate) fn vertex_format(format: VertexElementFormat) -> vk::Format {
    use VertexElementFormat as F;
    match format {
        F::R8_UINT => vk::Format::R8_UINT,
        F::R16_UINT => vk::Format::R16_UINT,
        F::R32_UINT => vk::Format::R32_UINT,
        F::R64_UINT => vk::Format::R64_UINT,
        F::R8_SINT => vk::Format::R8_SINT,
        F::R16_SINT => vk::Format::R16_SINT,
        F::R32_SINT => vk::Format::R32_SINT,
        F::R64_SINT => vk::Format::R64_SINT,
        F::R32_SFLOAT => vk::Format::R32_SFLOAT,
        F::R8G8_UINT => vk::Format::R8G8_UINT,
        F::R16G16_UINT => vk::Format::R16G16_UINT,
        F::R32G32_UINT => vk::Format::R32G32_UINT,
        F::R64G64_UINT => vk::Format::R64G64_UINT,
        F::R8G8_SINT => vk::Format::R8G8_SINT,
        F::R16G16_SINT => vk::Format::R16G16_SINT,
        F::R32G32_SINT => vk::Format::R32G32_SINT,
        F::R64G64_SINT => vk::Format::R64G64_SINT,
        F::R32G32_SFLOAT => vk::Format::R32G32_SFLOAT,
        F::R8G8B8_UINT => vk::Format::R8G8B8_UINT,
        F::R16G16B16_UINT => vk::Format::R16G16B16_UINT,
        F::R32G32B32_UINT => vk::Format::R32G32B32_UINT,
        F::R64G64B64_UINT => vk::Format::R64G64B64_UINT,
        F::R8G8B8_SINT => vk::Format::R8G8B8_SINT,
        F::R16G16B16_SINT => vk::Format::R16G16B16_SINT,
        F::R32G32B32_SINT => vk::Format::R32G32B32_SINT,
        F::R64G64B64_SINT => vk::Format::R64G64B64_SINT,
        F::R32G32B32_SFLOAT => vk::Format::R32G32B32_SFLOAT,
        F::R8G8B8A8_UNORM => vk::Format::R8G8B8A8_UNORM,
        F::R16G16B16A16_UINT => vk::Format::R16G16B16A16_UINT,
        F::R32G32B32A32_UINT => vk::Format::R32G32B32A32_UINT,
        F::R64G64B64A64_UINT => vk::Format::R64G64B64A64_UINT,
        F::R8G8B8A8_SNORM => vk::Format::R8G8B8A8_SNORM,
        F::R16G16B16A16_SINT => vk::Format::R16G16B16A16_SINT,
        F::R32G32B32A32_SINT => vk::Format::R32G32B32A32_SINT,
        F::R64G64B64A64_SINT => vk::Format::R64G64B64A64_SINT,
        F::R32G32B32A32_SFLOAT => vk::Format::R32G32B32A32_SFLOAT,
        F::Undefined => {
            engine_error!(SOURCE, "Invalid vertex element format {:?}! Defaulting to Undefined.", format);
            vk::Format::UNDEFINED
        }
    }
}

pub(crate) fn vertex_input_rate(rate: VertexInputRate) -> vk::VertexInputRate {
    match rate {
        VertexInputRate::Vertex => vk::VertexInputRate::VERTEX,
        VertexInputRate::Instance => vk::VertexInputRate::INSTANCE,
    }
}

pub(crate) fn index_type(stride: IndexBufferStride) -> vk::IndexType {
    match stride {
        IndexBufferStride::Uint16 => vk::IndexType::UINT16,
        IndexBufferStride::Uint32 => vk::IndexType::UINT32,
    }
}

// ===== IMAGES =====

pub(crate) fn data_format(format: DataFormat) -> vk::Format {
    match format {
        DataFormat::Undefined => vk::Format::UNDEFINED,
        DataFormat::R8_SRGB => vk::Format::R8_SRGB,
        DataFormat::R8G8_SRGB => vk::Format::R8G8_SRGB,
        DataFormat::R8G8B8A8_UNORM => vk::Format::R8G8B8A8_UNORM,
        DataFormat::R8G8B8A8_SRGB => vk::Format::R8G8B8A8_SRGB,
        DataFormat::B8G8R8A8_UNORM => vk::Format::B8G8R8A8_UNORM,
        DataFormat::B8G8R8A8_SRGB => vk::Format::B8G8R8A8_SRGB,
        DataFormat::R16G16B16A16_SFLOAT => vk::Format::R16G16B16A16_SFLOAT,
        DataFormat::R32_SFLOAT => vk::Format::R32_SFLOAT,
        DataFormat::R32G32B32A32_SFLOAT => vk::Format::R32G32B32A32_SFLOAT,
        DataFormat::D16_UNORM => vk::Format::D16_UNORM,
        DataFormat::D32_SFLOAT => vk::Format::D32_SFLOAT,
        DataFormat::D24_UNORM_S8_UINT => vk::Format::D24_UNORM_S8_UINT,
        DataFormat::D32_SFLOAT_S8_UINT => vk::Format::D32_SFLOAT_S8_UINT,
    }
}

/// Engine format of a surface format
pub(crate) fn vk_format_to_data_format(format: vk::Format) -> DataFormat {
    match format {
        vk::Format::R8G8B8A8_SRGB => DataFormat::R8G8B8A8_SRGB,
        vk::Format::R8G8B8A8_UNORM => DataFormat::R8G8B8A8_UNORM,
        vk::Format::B8G8R8A8_SRGB => DataFormat::B8G8R8A8_SRGB,
        vk::Format::B8G8R8A8_UNORM => DataFormat::B8G8R8A8_UNORM,
        vk::Format::R16G16B16A16_SFLOAT => DataFormat::R16G16B16A16_SFLOAT,
        other => {
            engine_error!(SOURCE, "Unsupported surface format {:?}! Defaulting to Undefined.", other);
            DataFormat::Undefined
        }
    }
}

/// Aspect of an image of `format`
pub(crate) fn aspect_flags(format: DataFormat) -> vk::ImageAspectFlags {
    if format.has_stencil() {
        vk::ImageAspectFlags::DEPTH | vk::ImageAspectFlags::STENCIL
    } else if format.is_depth() {
        vk::ImageAspectFlags::DEPTH
    } else {
        vk::ImageAspectFlags::COLOR
    }
}

pub(crate) fn sample_count(count: MultiSamplingCount) -> vk::SampleCountFlags {
    match count {
        MultiSamplingCount::X1 => vk::SampleCountFlags::TYPE_1,
        MultiSamplingCount::X2 => vk::SampleCountFlags::TYPE_2,
        MultiSamplingCount::X4 => vk::SampleCountFlags::TYPE_4,
        MultiSamplingCount::X8 => vk::SampleCountFlags::TYPE_8,
        MultiSamplingCount::X16 => vk::SampleCountFlags::TYPE_16,
        MultiSamplingCount::X32 => vk::SampleCountFlags::TYPE_32,
        MultiSamplingCount::X64 => vk::SampleCountFlags::TYPE_64,
    }
}

/// Image type, view type and creation flags
pub(crate) fn image_type(image_type: ImageType) -> (vk::ImageType, vk::ImageViewType, vk::ImageCreateFlags) {
    match image_type {
        ImageType::OneDimensional => (vk::ImageType::TYPE_1D, vk::ImageViewType::TYPE_1D, vk::ImageCreateFlags::empty()),
        ImageType::TwoDimensional => (vk::ImageType::TYPE_2D, vk::ImageViewType::TYPE_2D, vk::ImageCreateFlags::empty()),
        ImageType::ThreeDimensional => (vk::ImageType::TYPE_3D, vk::ImageViewType::TYPE_3D, vk::ImageCreateFlags::empty()),
        ImageType::CubeMap => (vk::ImageType::TYPE_2D, vk::ImageViewType::CUBE, vk::ImageCreateFlags::CUBE_COMPATIBLE),
    }
}

/// Usage flags; every image can be a transfer source and destination
pub(crate) fn image_usage(usage: ImageUsage) -> vk::ImageUsageFlags {
    let mut flags = vk::ImageUsageFlags::TRANSFER_SRC | vk::ImageUsageFlags::TRANSFER_DST;
    if usage.contains(ImageUsage::STORAGE) {
        flags |= vk::ImageUsageFlags::STORAGE;
    }
    if usage.contains(ImageUsage::GRAPHICS) {
        flags |= vk::ImageUsageFlags::SAMPLED;
    }
    if usage.contains(ImageUsage::COLOR_ATTACHMENT) {
        flags |= vk::ImageUsageFlags::COLOR_ATTACHMENT;
    }
    if usage.contains(ImageUsage::DEPTH_ATTACHMENT) {
        flags |= vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT;
    }
    flags
}

pub(crate) fn component_swizzle(swizzle: ComponentSwizzle) -> vk::ComponentSwizzle {
    match swizzle {
        ComponentSwizzle::Identity => vk::ComponentSwizzle::IDENTITY,
        ComponentSwizzle::Zero => vk::ComponentSwizzle::ZERO,
        ComponentSwizzle::One => vk::ComponentSwizzle::ONE,
        ComponentSwizzle::R => vk::ComponentSwizzle::R,
        ComponentSwizzle::G => vk::ComponentSwizzle::G,
        ComponentSwizzle::B => vk::ComponentSwizzle::B,
        ComponentSwizzle::A => vk::ComponentSwizzle::A,
    }
}

pub(crate) fn address_mode(mode: AddressMode) -> vk::SamplerAddressMode {
    match mode {
        AddressMode::Repeat => vk::SamplerAddressMode::REPEAT,
        AddressMode::MirroredRepeat => vk::SamplerAddressMode::MIRRORED_REPEAT,
        AddressMode::ClampToEdge => vk::SamplerAddressMode::CLAMP_TO_EDGE,
        AddressMode::ClampToBorder => vk::SamplerAddressMode::CLAMP_TO_BORDER,
        AddressMode::MirrorClampToEdge => vk::SamplerAddressMode::MIRROR_CLAMP_TO_EDGE,
    }
}

pub(crate) fn border_color(color: BorderColor) -> vk::BorderColor {
    match color {
        BorderColor::TransparentBlack => vk::BorderColor::FLOAT_TRANSPARENT_BLACK,
        BorderColor::OpaqueBlack => vk::BorderColor::FLOAT_OPAQUE_BLACK,
        BorderColor::OpaqueWhite => vk::BorderColor::FLOAT_OPAQUE_WHITE,
    }
}

pub(crate) fn filter(filter: ImageFilter) -> vk::Filter {
    match filter {
        ImageFilter::Nearest => vk::Filter::NEAREST,
        ImageFilter::Linear => vk::Filter::LINEAR,
    }
}

pub(crate) fn mipmap_mode(mode: ImageMipMapMode) -> vk::SamplerMipmapMode {
    match mode {
        ImageMipMapMode::Nearest => vk::SamplerMipmapMode::NEAREST,
        ImageMipMapMode::Linear => vk::SamplerMipmapMode::LINEAR,
    }
}

// ===== SHADERS & DESCRIPTORS =====

pub(crate) fn shader_stage_flags(shader_type: ShaderType) -> vk::ShaderStageFlags {
    const STAGES: [(ShaderType, vk::ShaderStageFlags); 9] = [
        (ShaderType::VERTEX, vk::ShaderStageFlags::VERTEX),
        (ShaderType::FRAGMENT, vk::ShaderStageFlags::FRAGMENT),
        (ShaderType::COMPUTE, vk::ShaderStageFlags::COMPUTE),
        (ShaderType::RAY_GEN, vk::ShaderStageFlags::RAYGEN_KHR),
        (ShaderType::INTERSECTION, vk::ShaderStageFlags::INTERSECTION_KHR),
        (ShaderType::ANY_HIT, vk::ShaderStageFlags::ANY_HIT_KHR),
        (ShaderType::CLOSEST_HIT, vk::ShaderStageFlags::CLOSEST_HIT_KHR),
        (ShaderType::MISS, vk::ShaderStageFlags::MISS_KHR),
        (ShaderType::CALLABLE, vk::ShaderStageFlags::CALLABLE_KHR),
    ];

    STAGES
        .iter()
        .filter(|(engine, _)| shader_type.contains(*engine))
        .fold(vk::ShaderStageFlags::empty(), |flags, (_, vulkan)| flags | *vulkan)
}

pub(crate) fn descriptor_type(resource_type: ResourceType) -> vk::DescriptorType {
    match resource_type {
        ResourceType::Sampler => vk::DescriptorType::SAMPLER,
        ResourceType::CombinedImageSampler => vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
        ResourceType::SampledImage => vk::DescriptorType::SAMPLED_IMAGE,
        ResourceType::StorageImage => vk::DescriptorType::STORAGE_IMAGE,
        ResourceType::UniformTexelBuffer => vk::DescriptorType::UNIFORM_TEXEL_BUFFER,
        ResourceType::StorageTexelBuffer => vk::DescriptorType::STORAGE_TEXEL_BUFFER,
        ResourceType::UniformBuffer => vk::DescriptorType::UNIFORM_BUFFER,
        ResourceType::StorageBuffer => vk::DescriptorType::STORAGE_BUFFER,
        ResourceType::DynamicUniformBuffer => vk::DescriptorType::UNIFORM_BUFFER_DYNAMIC,
        ResourceType::DynamicStorageBuffer => vk::DescriptorType::STORAGE_BUFFER_DYNAMIC,
        ResourceType::InputAttachment => vk::DescriptorType::INPUT_ATTACHMENT,
        ResourceType::AccelerationStructure => vk::DescriptorType::ACCELERATION_STRUCTURE_KHR,
    }
}

// ===== SYNCHRONIZATION =====

pub(crate) fn pipeline_stage(stage: PipelineStage) -> vk::PipelineStageFlags {
    match stage {
        PipelineStage::ColorAttachmentOutput => vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
        PipelineStage::AllGraphics => vk::PipelineStageFlags::ALL_GRAPHICS,
        PipelineStage::ComputeShader => vk::PipelineStageFlags::COMPUTE_SHADER,
        PipelineStage::Transfer => vk::PipelineStageFlags::TRANSFER,
        PipelineStage::AllCommands => vk::PipelineStageFlags::ALL_COMMANDS,
    }
}

/// Access mask and stages a buffer in `state` is used with
pub(crate) fn buffer_state_access(state: ResourceState) -> (vk::AccessFlags, vk::PipelineStageFlags) {
    match state {
        ResourceState::Common => (vk::AccessFlags::MEMORY_READ | vk::AccessFlags::MEMORY_WRITE, vk::PipelineStageFlags::ALL_COMMANDS),
        ResourceState::VertexAndConstantBuffer => (
            vk::AccessFlags::VERTEX_ATTRIBUTE_READ | vk::AccessFlags::UNIFORM_READ,
            vk::PipelineStageFlags::VERTEX_INPUT | vk::PipelineStageFlags::VERTEX_SHADER | vk::PipelineStageFlags::FRAGMENT_SHADER,
        ),
        ResourceState::IndexBuffer => (vk::AccessFlags::INDEX_READ, vk::PipelineStageFlags::VERTEX_INPUT),
        ResourceState::UnorderedAccess => (
            vk::AccessFlags::SHADER_READ | vk::AccessFlags::SHADER_WRITE,
            vk::PipelineStageFlags::ALL_COMMANDS,
        ),
        ResourceState::CopySource => (vk::AccessFlags::TRANSFER_READ, vk::PipelineStageFlags::TRANSFER),
        ResourceState::CopyDestination => (vk::AccessFlags::TRANSFER_WRITE, vk::PipelineStageFlags::TRANSFER),
        ResourceState::GenericRead => (vk::AccessFlags::MEMORY_READ | vk::AccessFlags::HOST_WRITE, vk::PipelineStageFlags::ALL_COMMANDS),
    }
}

// ===== COMMAND STATE =====

pub(crate) fn clear_value(value: ClearValue) -> vk::ClearValue {
    match value {
        ClearValue::Color(float32) => vk::ClearValue { color: vk::ClearColorValue { float32 } },
        ClearValue::DepthStencil { depth, stencil } => vk::ClearValue {
            depth_stencil: vk::ClearDepthStencilValue { depth, stencil },
        },
    }
}

pub(crate) fn viewport(viewport: Viewport) -> vk::Viewport {
    vk::Viewport {
        x: viewport.x,
        y: viewport.y,
        width: viewport.width,
        height: viewport.height,
        min_depth: viewport.min_depth,
        max_depth: viewport.max_depth,
    }
}

pub(crate) fn rect(rect: Rect2D) -> vk::Rect2D {
    vk::Rect2D {
        offset: vk::Offset2D { x: rect.x, y: rect.y },
        extent: vk::Extent2D { width: rect.width, height: rect.height },
    }
}

#[cfg(test)]
#[path = "vulkan_conversions_tests.rs"]
mod tests;
