/// Conversions from engine value types to Direct3D 12 enums and structures
///
/// Values D3D12 cannot express log once and fall back to the closest
/// supported value, the same way the `Undefined` variants do.

use windows::Win32::Foundation::{BOOL, RECT};
use windows::Win32::Graphics::Direct3D::*;
use windows::Win32::Graphics::Direct3D12::*;
use windows::Win32::Graphics::Dxgi::Common::*;
use xenon_engine::xenon::backend::{
    AddressMode, BorderColor, ColorBlendFactor, ColorBlendLogic, ColorBlendOperator, ColorWriteMask,
    ComponentSwizzle, CullMode, DataFormat, DepthCompareLogic, FrontFace, ImageFilter, ImageMipMapMode,
    ImageUsage, IndexBufferStride, PolygonMode, PrimitiveTopology, Rect2D, VertexElementFormat, Viewport,
};
use xenon_engine::{engine_error, engine_warn};

use crate::dx12_root_layout::Visibility;

const SOURCE: &str = "xenon::dx12";

// ===== FIXED-FUNCTION STATE =====

/// Topology type of the pipeline state and topology set on the command list
pub(crate) fn primitive_topology(topology: PrimitiveTopology) -> (D3D12_PRIMITIVE_TOPOLOGY_TYPE, D3D_PRIMITIVE_TOPOLOGY) {
    use PrimitiveTopology as T;
    match topology {
        T::PointList => (D3D12_PRIMITIVE_TOPOLOGY_TYPE_POINT, D3D_PRIMITIVE_TOPOLOGY_POINTLIST),
        T::LineList => (D3D12_PRIMITIVE_TOPOLOGY_TYPE_LINE, D3D_PRIMITIVE_TOPOLOGY_LINELIST),
        T::LineStrip => (D3D12_PRIMITIVE_TOPOLOGY_TYPE_LINE, D3D_PRIMITIVE_TOPOLOGY_LINESTRIP),
        T::TriangleList => (D3D12_PRIMITIVE_TOPOLOGY_TYPE_TRIANGLE, D3D_PRIMITIVE_TOPOLOGY_TRIANGLELIST),
        T::TriangleStrip => (D3D12_PRIMITIVE_TOPOLOGY_TYPE_TRIANGLE, D3D_PRIMITIVE_TOPOLOGY_TRIANGLESTRIP),
        T::LineListWithAdjacency => (D3D12_PRIMITIVE_TOPOLOGY_TYPE_LINE, D3D_PRIMITIVE_TOPOLOGY_LINELIST_ADJ),
        T::LineStripWithAdjacency => (D3D12_PRIMITIVE_TOPOLOGY_TYPE_LINE, D3D_PRIMITIVE_TOPOLOGY_LINESTRIP_ADJ),
        T::TriangleListWithAdjacency => {
            (D3D12_PRIMITIVE_TOPOLOGY_TYPE_TRIANGLE, D3D_PRIMITIVE_TOPOLOGY_TRIANGLELIST_ADJ)
        }
        T::TriangleStripWithAdjacency => {
            (D3D12_PRIMITIVE_TOPOLOGY_TYPE_TRIANGLE, D3D_PRIMITIVE_TOPOLOGY_TRIANGLESTRIP_ADJ)
        }
        T::PatchList => (D3D12_PRIMITIVE_TOPOLOGY_TYPE_PATCH, D3D_PRIMITIVE_TOPOLOGY_3_CONTROL_POINT_PATCHLIST),
        T::TriangleFan => {
            engine_warn!(SOURCE, "Triangle fans are not supported by Direct3D 12! Defaulting to TriangleList.");
            (D3D12_PRIMITIVE_TOPOLOGY_TYPE_TRIANGLE, D3D_PRIMITIVE_TOPOLOGY_TRIANGLELIST)
        }
        T::Undefined => {
            engine_error!(SOURCE, "Invalid primitive topology {:?}! Defaulting to PointList.", topology);
            (D3D12_PRIMITIVE_TOPOLOGY_TYPE_POINT, D3D_PRIMITIVE_TOPOLOGY_POINTLIST)
        }
    }
}

/// Patch list topology with `control_points` points per patch (1 to 32)
pub(crate) fn patch_topology(control_points: u32) -> D3D_PRIMITIVE_TOPOLOGY {
    let points = control_points.clamp(1, 32) as i32;
    D3D_PRIMITIVE_TOPOLOGY(D3D_PRIMITIVE_TOPOLOGY_1_CONTROL_POINT_PATCHLIST.0 + points - 1)
}

pub(crate) fn cull_mode(mode: CullMode) -> D3D12_CULL_MODE {
    match mode {
        CullMode::None => D3D12_CULL_MODE_NONE,
        CullMode::Front => D3D12_CULL_MODE_FRONT,
        CullMode::Back => D3D12_CULL_MODE_BACK,
        CullMode::FrontAndBack => {
            engine_warn!(SOURCE, "Culling both faces is not supported by Direct3D 12! Defaulting to Back.");
            D3D12_CULL_MODE_BACK
        }
        CullMode::Undefined => {
            engine_error!(SOURCE, "Invalid cull mode {:?}! Defaulting to None.", mode);
            D3D12_CULL_MODE_NONE
        }
    }
}

/// `FrontCounterClockwise` of the rasterizer state
pub(crate) fn front_counter_clockwise(face: FrontFace) -> BOOL {
    match face {
        FrontFace::CounterClockwise => true.into(),
        FrontFace::Clockwise => false.into(),
        FrontFace::Undefined => {
            engine_error!(SOURCE, "Invalid front face {:?}! Defaulting to CounterClockwise.", face);
            true.into()
        }
    }
}

pub(crate) fn fill_mode(mode: PolygonMode) -> D3D12_FILL_MODE {
    match mode {
        PolygonMode::Fill => D3D12_FILL_MODE_SOLID,
        PolygonMode::Line => D3D12_FILL_MODE_WIREFRAME,
        PolygonMode::Point => {
            engine_warn!(SOURCE, "Point fill is not supported by Direct3D 12! Defaulting to Line.");
            D3D12_FILL_MODE_WIREFRAME
        }
        PolygonMode::Undefined => {
            engine_error!(SOURCE, "Invalid polygon mode {:?}! Defaulting to Fill.", mode);
            D3D12_FILL_MODE_SOLID
        }
    }
}

pub(crate) fn logic_op(logic: ColorBlendLogic) -> D3D12_LOGIC_OP {
    match logic {
        ColorBlendLogic::Clear => D3D12_LOGIC_OP_CLEAR,
        ColorBlendLogic::And => D3D12_LOGIC_OP_AND,
        ColorBlendLogic::AndReverse => D3D12_LOGIC_OP_AND_REVERSE,
        ColorBlendLogic::Copy => D3D12_LOGIC_OP_COPY,
        ColorBlendLogic::AndInverted => D3D12_LOGIC_OP_AND_INVERTED,
        ColorBlendLogic::NoOperator => D3D12_LOGIC_OP_NOOP,
        ColorBlendLogic::Xor => D3D12_LOGIC_OP_XOR,
        ColorBlendLogic::Or => D3D12_LOGIC_OP_OR,
        ColorBlendLogic::Nor => D3D12_LOGIC_OP_NOR,
        ColorBlendLogic::Equivalent => D3D12_LOGIC_OP_EQUIV,
        ColorBlendLogic::Invert => D3D12_LOGIC_OP_INVERT,
        ColorBlendLogic::ReverseOr => D3D12_LOGIC_OP_OR_REVERSE,
        ColorBlendLogic::CopyInverted => D3D12_LOGIC_OP_COPY_INVERTED,
        ColorBlendLogic::InvertedOr => D3D12_LOGIC_OP_OR_INVERTED,
        ColorBlendLogic::Nand => D3D12_LOGIC_OP_NAND,
        ColorBlendLogic::Set => D3D12_LOGIC_OP_SET,
        ColorBlendLogic::Undefined => {
            engine_error!(SOURCE, "Invalid color blend logic {:?}! Defaulting to Clear.", logic);
            D3D12_LOGIC_OP_CLEAR
        }
    }
}

pub(crate) fn comparison_func(logic: DepthCompareLogic) -> D3D12_COMPARISON_FUNC {
    match logic {
        DepthCompareLogic::Never => D3D12_COMPARISON_FUNC_NEVER,
        DepthCompareLogic::Less => D3D12_COMPARISON_FUNC_LESS,
        DepthCompareLogic::Equal => D3D12_COMPARISON_FUNC_EQUAL,
        DepthCompareLogic::LessOrEqual => D3D12_COMPARISON_FUNC_LESS_EQUAL,
        DepthCompareLogic::Greater => D3D12_COMPARISON_FUNC_GREATER,
        DepthCompareLogic::NotEqual => D3D12_COMPARISON_FUNC_NOT_EQUAL,
        DepthCompareLogic::GreaterOrEqual => D3D12_COMPARISON_FUNC_GREATER_EQUAL,
        DepthCompareLogic::Always => D3D12_COMPARISON_FUNC_ALWAYS,
        DepthCompareLogic::Undefined => {
            engine_error!(SOURCE, "Invalid depth compare logic {:?}! Defaulting to Never.", logic);
            D3D12_COMPARISON_FUNC_NEVER
        }
    }
}

/// Blend factor; constant alpha reads the shared blend factor
pub(crate) fn blend(factor: ColorBlendFactor) -> D3D12_BLEND {
    use ColorBlendFactor as F;
    match factor {
        F::Zero => D3D12_BLEND_ZERO,
        F::One => D3D12_BLEND_ONE,
        F::SourceColor => D3D12_BLEND_SRC_COLOR,
        F::OneMinusSourceColor => D3D12_BLEND_INV_SRC_COLOR,
        F::DestinationColor => D3D12_BLEND_DEST_COLOR,
        F::OneMinusDestinationColor => D3D12_BLEND_INV_DEST_COLOR,
        F::SourceAlpha => D3D12_BLEND_SRC_ALPHA,
        F::OneMinusSourceAlpha => D3D12_BLEND_INV_SRC_ALPHA,
        F::DestinationAlpha => D3D12_BLEND_DEST_ALPHA,
        F::OneMinusDestinationAlpha => D3D12_BLEND_INV_DEST_ALPHA,
        F::ConstantColor | F::ConstantAlpha => D3D12_BLEND_BLEND_FACTOR,
        F::OneMinusConstantColor | F::OneMinusConstantAlpha => D3D12_BLEND_INV_BLEND_FACTOR,
        F::SourceAlphaSaturate => D3D12_BLEND_SRC_ALPHA_SAT,
        F::SourceOneColor => D3D12_BLEND_SRC1_COLOR,
        F::OneMinusSourceOneColor => D3D12_BLEND_INV_SRC1_COLOR,
        F::SourceOneAlpha => D3D12_BLEND_SRC1_ALPHA,
        F::OneMinusSourceOneAlpha => D3D12_BLEND_INV_SRC1_ALPHA,
        F::Undefined => {
            engine_error!(SOURCE, "Invalid color blend factor {:?}! Defaulting to Zero.", factor);
            D3D12_BLEND_ZERO
        }
    }
}

/// Blend operator; the advanced operators have no D3D12 counterpart
pub(crate) fn blend_op(operator: ColorBlendOperator) -> D3D12_BLEND_OP {
    match operator {
        ColorBlendOperator::Add => D3D12_BLEND_OP_ADD,
        ColorBlendOperator::Subtract => D3D12_BLEND_OP_SUBTRACT,
        ColorBlendOperator::ReverseSubtract => D3D12_BLEND_OP_REV_SUBTRACT,
        ColorBlendOperator::Minimum => D3D12_BLEND_OP_MIN,
        ColorBlendOperator::Maximum => D3D12_BLEND_OP_MAX,
        ColorBlendOperator::Undefined => {
            engine_error!(SOURCE, "Invalid color blend operator {:?}! Defaulting to Add.", operator);
            D3D12_BLEND_OP_ADD
        }
        advanced => {
            engine_warn!(SOURCE, "Blend operator {:?} is not supported by Direct3D 12! Defaulting to Add.", advanced);
            D3D12_BLEND_OP_ADD
        }
    }
}

pub(crate) fn color_write_mask(mask: ColorWriteMask) -> u8 {
    let mut bits = 0;
    if mask.contains(ColorWriteMask::R) {
        bits |= D3D12_COLOR_WRITE_ENABLE_RED.0;
    }
    if mask.contains(ColorWriteMask::G) {
        bits |= D3D12_COLOR_WRITE_ENABLE_GREEN.0;
    }
    if mask.contains(ColorWriteMask::B) {
        bits |= D3D12_COLOR_WRITE_ENABLE_BLUE.0;
    }
    if mask.contains(ColorWriteMask::A) {
        bits |= D3D12_COLOR_WRITE_ENABLE_ALPHA.0;
    }
    bits as u8
}

pub(crate) fn shader_visibility(visibility: Visibility) -> D3D12_SHADER_VISIBILITY {
    match visibility {
        Visibility::All => D3D12_SHADER_VISIBILITY_ALL,
        Visibility::Vertex => D3D12_SHADER_VISIBILITY_VERTEX,
        Visibility::Pixel => D3D12_SHADER_VISIBILITY_PIXEL,
    }
}

// ===== VERTEX INPUT =====

/// Vertex element format; 64-bit and packed 3 x 8/16-bit layouts do not exist in DXGI
pub(crate) fn vertex_format(format: VertexElementFormat) -> DXGI_FORMAT {
    use VertexElementFormat as F;
    match format {
        F::R8_UINT => DXGI_FORMAT_R8_UINT,
        F::R16_UINT => DXGI_FORMAT_R16_UINT,
        F::R32_UINT => DXGI_FORMAT_R32_UINT,
        F::R8_SINT => DXGI_FORMAT_R8_SINT,
        F::R16_SINT => DXGI_FORMAT_R16_SINT,
        F::R32_SINT => DXGI_FORMAT_R32_SINT,
        F::R32_SFLOAT => DXGI_FORMAT_R32_FLOAT,
        F::R8G8_UINT => DXGI_FORMAT_R8G8_UINT,
        F::R16G16_UINT => DXGI_FORMAT_R16G16_UINT,
        F::R32G32_UINT => DXGI_FORMAT_R32G32_UINT,
        F::R8G8_SINT => DXGI_FORMAT_R8G8_SINT,
        F::R16G16_SINT => DXGI_FORMAT_R16G16_SINT,
        F::R32G32_SINT => DXGI_FORMAT_R32G32_SINT,
        F::R32G32_SFLOAT => DXGI_FORMAT_R32G32_FLOAT,
        F::R32G32B32_UINT => DXGI_FORMAT_R32G32B32_UINT,
        F::R32G32B32_SINT => DXGI_FORMAT_R32G32B32_SINT,
        F::R32G32B32_SFLOAT => DXGI_FORMAT_R32G32B32_FLOAT,
        F::R8G8B8A8_UNORM => DXGI_FORMAT_R8G8B8A8_UNORM,
        F::R8G8B8A8_SNORM => DXGI_FORMAT_R8G8B8A8_SNORM,
        F::R16G16B16A16_UINT => DXGI_FORMAT_R16G16B16A16_UINT,
        F::R16G16B16A16_SINT => DXGI_FORMAT_R16G16B16A16_SINT,
        F::R32G32B32A32_UINT => DXGI_FORMAT_R32G32B32A32_UINT,
        F::R32G32B32A32_SINT => DXGI_FORMAT_R32G32B32A32_SINT,
        F::R32G32B32A32_SFLOAT => DXGI_FORMAT_R32G32B32A32_FLOAT,
        unsupported => {
            engine_error!(SOURCE, "Vertex element format {:?} has no DXGI equivalent! Defaulting to Unknown.", unsupported);
            DXGI_FORMAT_UNKNOWN
        }
    }
}

pub(crate) fn index_format(stride: IndexBufferStride) -> DXGI_FORMAT {
    match stride {
        IndexBufferStride::Uint16 => DXGI_FORMAT_R16_UINT,
        IndexBufferStride::Uint32 => DXGI_FORMAT_R32_UINT,
    }
}

// ===== IMAGES =====

/// View format of `format`; single and dual channel sRGB read as UNORM
pub(crate) fn data_format(format: DataFormat) -> DXGI_FORMAT {
    match format {
        DataFormat::Undefined => DXGI_FORMAT_UNKNOWN,
        DataFormat::R8_SRGB => DXGI_FORMAT_R8_UNORM,
        DataFormat::R8G8_SRGB => DXGI_FORMAT_R8G8_UNORM,
        DataFormat::R8G8B8A8_UNORM => DXGI_FORMAT_R8G8B8A8_UNORM,
        DataFormat::R8G8B8A8_SRGB => DXGI_FORMAT_R8G8B8A8_UNORM_SRGB,
        DataFormat::B8G8R8A8_UNORM => DXGI_FORMAT_B8G8R8A8_UNORM,
        DataFormat::B8G8R8A8_SRGB => DXGI_FORMAT_B8G8R8A8_UNORM_SRGB,
        DataFormat::R16G16B16A16_SFLOAT => DXGI_FORMAT_R16G16B16A16_FLOAT,
        DataFormat::R32_SFLOAT => DXGI_FORMAT_R32_FLOAT,
        DataFormat::R32G32B32A32_SFLOAT => DXGI_FORMAT_R32G32B32A32_FLOAT,
        DataFormat::D16_UNORM => DXGI_FORMAT_D16_UNORM,
        DataFormat::D32_SFLOAT => DXGI_FORMAT_D32_FLOAT,
        DataFormat::D24_UNORM_S8_UINT => DXGI_FORMAT_D24_UNORM_S8_UINT,
        DataFormat::D32_SFLOAT_S8_UINT => DXGI_FORMAT_D32_FLOAT_S8X24_UINT,
    }
}

/// Format the resource is created with
///
/// Sampled depth images are typeless so both depth-stencil and shader
/// resource views can be created on them.
pub(crate) fn resource_format(format: DataFormat, usage: ImageUsage) -> DXGI_FORMAT {
    if !format.is_depth() || !usage.intersects(ImageUsage::GRAPHICS | ImageUsage::STORAGE) {
        return data_format(format);
    }
    match format {
        DataFormat::D16_UNORM => DXGI_FORMAT_R16_TYPELESS,
        DataFormat::D32_SFLOAT => DXGI_FORMAT_R32_TYPELESS,
        DataFormat::D24_UNORM_S8_UINT => DXGI_FORMAT_R24G8_TYPELESS,
        DataFormat::D32_SFLOAT_S8_UINT => DXGI_FORMAT_R32G8X24_TYPELESS,
        other => data_format(other),
    }
}

/// Format shaders read `format` through
pub(crate) fn shader_resource_format(format: DataFormat) -> DXGI_FORMAT {
    match format {
        DataFormat::D16_UNORM => DXGI_FORMAT_R16_UNORM,
        DataFormat::D32_SFLOAT => DXGI_FORMAT_R32_FLOAT,
        DataFormat::D24_UNORM_S8_UINT => DXGI_FORMAT_R24_UNORM_X8_TYPELESS,
        DataFormat::D32_SFLOAT_S8_UINT => DXGI_FORMAT_R32_FLOAT_X8X24_TYPELESS,
        other => data_format(other),
    }
}

/// Engine format of a swapchain buffer format
pub(crate) fn dxgi_to_data_format(format: DXGI_FORMAT) -> DataFormat {
    match format {
        DXGI_FORMAT_R8G8B8A8_UNORM => DataFormat::R8G8B8A8_UNORM,
        DXGI_FORMAT_R8G8B8A8_UNORM_SRGB => DataFormat::R8G8B8A8_SRGB,
        DXGI_FORMAT_B8G8R8A8_UNORM => DataFormat::B8G8R8A8_UNORM,
        DXGI_FORMAT_B8G8R8A8_UNORM_SRGB => DataFormat::B8G8R8A8_SRGB,
        DXGI_FORMAT_R16G16B16A16_FLOAT => DataFormat::R16G16B16A16_SFLOAT,
        other => {
            engine_error!(SOURCE, "Unsupported swapchain format {:?}! Defaulting to Undefined.", other);
            DataFormat::Undefined
        }
    }
}

pub(crate) fn resource_flags(usage: ImageUsage) -> D3D12_RESOURCE_FLAGS {
    let mut flags = D3D12_RESOURCE_FLAG_NONE;
    if usage.contains(ImageUsage::STORAGE) {
        flags |= D3D12_RESOURCE_FLAG_ALLOW_UNORDERED_ACCESS;
    }
    if usage.contains(ImageUsage::COLOR_ATTACHMENT) {
        flags |= D3D12_RESOURCE_FLAG_ALLOW_RENDER_TARGET;
    }
    if usage.contains(ImageUsage::DEPTH_ATTACHMENT) {
        flags |= D3D12_RESOURCE_FLAG_ALLOW_DEPTH_STENCIL;
        if !usage.intersects(ImageUsage::GRAPHICS | ImageUsage::STORAGE) {
            flags |= D3D12_RESOURCE_FLAG_DENY_SHADER_RESOURCE;
        }
    }
    flags
}

/// `Shader4ComponentMapping` of a view
///
/// Each channel takes 3 bits: 0 to 3 select a source channel, 4 forces zero
/// and 5 forces one. Bit 12 is always set.
pub(crate) fn component_mapping(swizzle: [ComponentSwizzle; 4]) -> u32 {
    let mut mapping = 1 << 12;
    for (channel, component) in swizzle.into_iter().enumerate() {
        let source = match component {
            ComponentSwizzle::Identity => channel as u32,
            ComponentSwizzle::R => 0,
            ComponentSwizzle::G => 1,
            ComponentSwizzle::B => 2,
            ComponentSwizzle::A => 3,
            ComponentSwizzle::Zero => 4,
            ComponentSwizzle::One => 5,
        };
        mapping |= source << (3 * channel);
    }
    mapping
}

// ===== SAMPLERS =====

pub(crate) fn address_mode(mode: AddressMode) -> D3D12_TEXTURE_ADDRESS_MODE {
    match mode {
        AddressMode::Repeat => D3D12_TEXTURE_ADDRESS_MODE_WRAP,
        AddressMode::MirroredRepeat => D3D12_TEXTURE_ADDRESS_MODE_MIRROR,
        AddressMode::ClampToEdge => D3D12_TEXTURE_ADDRESS_MODE_CLAMP,
        AddressMode::ClampToBorder => D3D12_TEXTURE_ADDRESS_MODE_BORDER,
        AddressMode::MirrorClampToEdge => D3D12_TEXTURE_ADDRESS_MODE_MIRROR_ONCE,
    }
}

pub(crate) fn border_color(color: BorderColor) -> [f32; 4] {
    match color {
        BorderColor::TransparentBlack => [0.0, 0.0, 0.0, 0.0],
        BorderColor::OpaqueBlack => [0.0, 0.0, 0.0, 1.0],
        BorderColor::OpaqueWhite => [1.0, 1.0, 1.0, 1.0],
    }
}

/// Filter of a sampler, following the `D3D12_ENCODE_BASIC_FILTER` layout
pub(crate) fn sampler_filter(
    min: ImageFilter,
    mag: ImageFilter,
    mip: ImageMipMapMode,
    anisotropic: bool,
    compare: bool,
) -> D3D12_FILTER {
    let reduction = if compare { 1 << 7 } else { 0 };
    if anisotropic {
        return D3D12_FILTER(0x55 | reduction);
    }

    let linear = |filter: ImageFilter| match filter {
        ImageFilter::Nearest => 0,
        ImageFilter::Linear => 1,
    };
    let mip = match mip {
        ImageMipMapMode::Nearest => 0,
        ImageMipMapMode::Linear => 1,
    };
    D3D12_FILTER((linear(min) << 4) | (linear(mag) << 2) | mip | reduction)
}

// ===== COMMAND STATE =====

pub(crate) fn viewport(viewport: Viewport) -> D3D12_VIEWPORT {
    D3D12_VIEWPORT {
        TopLeftX: viewport.x,
        TopLeftY: viewport.y,
        Width: viewport.width,
        Height: viewport.height,
        MinDepth: viewport.min_depth,
        MaxDepth: viewport.max_depth,
    }
}

pub(crate) fn rect(rect: Rect2D) -> RECT {
    RECT {
        left: rect.x,
        top: rect.y,
        right: rect.x.saturating_add(rect.width as i32),
        bottom: rect.y.saturating_add(rect.height as i32),
    }
}

#[cfg(test)]
#[path = "dx12_conversions_tests.rs"]
mod tests;
