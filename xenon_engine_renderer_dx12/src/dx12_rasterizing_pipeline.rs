/// Dx12RasterizingPipeline - graphics pipeline states specialized per vertex layout
///
/// The root signature is derived once from the merged shader bindings. A PSO
/// is compiled lazily for every distinct vertex specification the pipeline
/// gets bound with, seeded from (and persisted to) the cache handler under
/// the layout hash. Render target formats and the sample count are taken
/// from the rasterizer the pipeline is created for.

use std::any::Any;
use std::sync::Arc;

use windows::Win32::Foundation::{BOOL, FALSE, TRUE};
use windows::Win32::Graphics::Direct3D::D3D_PRIMITIVE_TOPOLOGY;
use windows::Win32::Graphics::Direct3D12::*;
use windows::Win32::Graphics::Dxgi::Common::{DXGI_FORMAT, DXGI_FORMAT_UNKNOWN, DXGI_SAMPLE_DESC};
use windows::core::PCSTR;
use xenon_engine::xenon::backend::{
    ColorBlendAttachment, Descriptor, DescriptorType, DynamicStateFlags, InputElement, PipelineCacheHandler,
    PipelineSpecializations, PrimitiveTopology, Rasterizer, RasterizingPipeline, RasterizingPipelineSpecification,
    Specialization, SpecializationBuilder, VertexInputRate, VertexInputState, VertexSpecification,
};
use xenon_engine::xenon::Result;
use xenon_engine::{engine_bail, engine_debug, engine_warn};

use crate::dx12_context::GpuContext;
use crate::dx12_conversions::{
    blend, blend_op, color_write_mask, comparison_func, cull_mode, fill_mode, front_counter_clockwise, logic_op,
    patch_topology, primitive_topology, vertex_format,
};
use crate::dx12_input::input_semantic;
use crate::dx12_rasterizer::Dx12Rasterizer;
use crate::dx12_root_signature::{bytecode, Dx12PipelineLayout, Dx12PipelineState};

const SOURCE: &str = "xenon::dx12::RasterizingPipeline";

/// D3D12_SIMULTANEOUS_RENDER_TARGET_COUNT
const MAX_RENDER_TARGETS: usize = 8;

/// Everything a specialization is compiled from, except the vertex input
struct GraphicsPipelineBuilder {
    ctx: Arc<GpuContext>,
    specification: RasterizingPipelineSpecification,
    layout: Arc<Dx12PipelineLayout>,
    rtv_formats: Vec<DXGI_FORMAT>,
    dsv_format: DXGI_FORMAT,
    sample_count: u32,
}

impl GraphicsPipelineBuilder {
    /// One blend state per render target of the rasterizer
    fn blend_state(&self) -> D3D12_BLEND_DESC {
        let spec = &self.specification;
        let mut desc = D3D12_BLEND_DESC {
            AlphaToCoverageEnable: BOOL::from(spec.enable_alpha_coverage),
            IndependentBlendEnable: TRUE,
            ..Default::default()
        };
        for (index, target) in desc.RenderTarget.iter_mut().take(self.rtv_formats.len()).enumerate() {
            let attachment = spec.color_blend_attachments.get(index).copied().unwrap_or_default();
            *target = render_target_blend(&attachment, spec);
        }
        desc
    }

    fn rasterizer_state(&self) -> D3D12_RASTERIZER_DESC {
        let spec = &self.specification;
        let (depth_bias, depth_bias_clamp, slope_scaled_depth_bias) = if spec.enable_depth_bias {
            (spec.depth_constant_factor as i32, spec.depth_bias_factor, spec.depth_slope_factor)
        } else {
            (0, 0.0, 0.0)
        };
        D3D12_RASTERIZER_DESC {
            FillMode: fill_mode(spec.polygon_mode),
            CullMode: cull_mode(spec.cull_mode),
            FrontCounterClockwise: front_counter_clockwise(spec.front_face),
            DepthBias: depth_bias,
            DepthBiasClamp: depth_bias_clamp,
            SlopeScaledDepthBias: slope_scaled_depth_bias,
            DepthClipEnable: BOOL::from(!spec.enable_depth_clamp),
            MultisampleEnable: BOOL::from(self.sample_count > 1),
            AntialiasedLineEnable: FALSE,
            ForcedSampleCount: 0,
            ConservativeRaster: D3D12_CONSERVATIVE_RASTERIZATION_MODE_OFF,
        }
    }

    fn depth_stencil_state(&self) -> D3D12_DEPTH_STENCIL_DESC {
        let spec = &self.specification;
        let has_depth = self.dsv_format != DXGI_FORMAT_UNKNOWN;
        let keep = D3D12_DEPTH_STENCILOP_DESC {
            StencilFailOp: D3D12_STENCIL_OP_KEEP,
            StencilDepthFailOp: D3D12_STENCIL_OP_KEEP,
            StencilPassOp: D3D12_STENCIL_OP_KEEP,
            StencilFunc: D3D12_COMPARISON_FUNC_ALWAYS,
        };
        D3D12_DEPTH_STENCIL_DESC {
            DepthEnable: BOOL::from(has_depth && spec.enable_depth_test),
            DepthWriteMask: if has_depth && spec.enable_depth_write {
                D3D12_DEPTH_WRITE_MASK_ALL
            } else {
                D3D12_DEPTH_WRITE_MASK_ZERO
            },
            DepthFunc: comparison_func(spec.depth_compare_logic),
            StencilEnable: FALSE,
            StencilReadMask: 0xff,
            StencilWriteMask: 0xff,
            FrontFace: keep,
            BackFace: keep,
        }
    }
}

fn render_target_blend(
    attachment: &ColorBlendAttachment,
    spec: &RasterizingPipelineSpecification,
) -> D3D12_RENDER_TARGET_BLEND_DESC {
    // Blending and logic operations are exclusive on a render target
    let logic = spec.enable_color_blend_logic;
    D3D12_RENDER_TARGET_BLEND_DESC {
        BlendEnable: BOOL::from(attachment.enable_blend && !logic),
        LogicOpEnable: BOOL::from(logic),
        SrcBlend: blend(attachment.src_blend_factor),
        DestBlend: blend(attachment.dst_blend_factor),
        BlendOp: blend_op(attachment.blend_operator),
        SrcBlendAlpha: blend(attachment.src_alpha_blend_factor),
        DestBlendAlpha: blend(attachment.dst_alpha_blend_factor),
        BlendOpAlpha: blend_op(attachment.alpha_blend_operator),
        LogicOp: logic_op(spec.color_blend_logic),
        RenderTargetWriteMask: color_write_mask(attachment.color_write_mask),
    }
}

/// Input layout elements of a resolved vertex input state
fn input_elements(input: &VertexInputState) -> Vec<D3D12_INPUT_ELEMENT_DESC> {
    input
        .attributes
        .iter()
        .filter_map(|attribute| {
            let element = InputElement::from_location(attribute.location)?;
            let (semantic, index) = input_semantic(element);
            let per_instance = input
                .bindings
                .iter()
                .find(|binding| binding.binding == attribute.binding)
                .is_some_and(|binding| binding.input_rate == VertexInputRate::Instance);
            Some(D3D12_INPUT_ELEMENT_DESC {
                SemanticName: PCSTR(semantic.as_ptr().cast()),
                SemanticIndex: index,
                Format: vertex_format(attribute.format),
                InputSlot: attribute.binding,
                AlignedByteOffset: attribute.offset,
                InputSlotClass: if per_instance {
                    D3D12_INPUT_CLASSIFICATION_PER_INSTANCE_DATA
                } else {
                    D3D12_INPUT_CLASSIFICATION_PER_VERTEX_DATA
                },
                InstanceDataStepRate: u32::from(per_instance),
            })
        })
        .collect()
}

impl SpecializationBuilder for GraphicsPipelineBuilder {
    type Pipeline = Dx12PipelineState;

    fn build(&self, input: &VertexInputState, cache_data: &[u8]) -> Result<Dx12PipelineState> {
        let spec = &self.specification;
        let elements = input_elements(input);

        let mut rtv_formats = [DXGI_FORMAT_UNKNOWN; MAX_RENDER_TARGETS];
        for (slot, format) in rtv_formats.iter_mut().zip(&self.rtv_formats) {
            *slot = *format;
        }

        // Rasterizer discard has no state in D3D12; dropping the pixel shader has the same effect
        let pixel_shader = if spec.fragment_shader.is_valid() && !spec.enable_rasterizer_discard {
            bytecode(spec.fragment_shader.dxil())
        } else {
            D3D12_SHADER_BYTECODE::default()
        };

        let (topology_type, _) = primitive_topology(spec.primitive_topology);
        let strip_cut = if spec.enable_primitive_restart {
            D3D12_INDEX_BUFFER_STRIP_CUT_VALUE_0xFFFFFFFF
        } else {
            D3D12_INDEX_BUFFER_STRIP_CUT_VALUE_DISABLED
        };

        Dx12PipelineState::build(cache_data, |cached| {
            let desc = D3D12_GRAPHICS_PIPELINE_STATE_DESC {
                pRootSignature: unsafe { std::mem::transmute_copy(&self.layout.root_signature) },
                VS: bytecode(spec.vertex_shader.dxil()),
                PS: pixel_shader,
                BlendState: self.blend_state(),
                SampleMask: D3D12_DEFAULT_SAMPLE_MASK,
                RasterizerState: self.rasterizer_state(),
                DepthStencilState: self.depth_stencil_state(),
                InputLayout: D3D12_INPUT_LAYOUT_DESC {
                    pInputElementDescs: elements.as_ptr(),
                    NumElements: elements.len() as u32,
                },
                IBStripCutValue: strip_cut,
                PrimitiveTopologyType: topology_type,
                NumRenderTargets: self.rtv_formats.len() as u32,
                RTVFormats: rtv_formats,
                DSVFormat: self.dsv_format,
                SampleDesc: DXGI_SAMPLE_DESC { Count: self.sample_count, Quality: 0 },
                NodeMask: 0,
                CachedPSO: cached,
                Flags: D3D12_PIPELINE_STATE_FLAG_NONE,
                ..Default::default()
            };
            unsafe { self.ctx.device.CreateGraphicsPipelineState(&desc) }
        })
    }

    fn cache_data(&self, pipeline: &Dx12PipelineState) -> Result<Vec<u8>> {
        pipeline.cache_data()
    }
}

/// Direct3D 12 rasterizing pipeline implementation
pub struct Dx12RasterizingPipeline {
    builder: GraphicsPipelineBuilder,
    pub(crate) layout: Arc<Dx12PipelineLayout>,
    /// Topology set on the command list when the pipeline is bound
    pub(crate) topology: D3D_PRIMITIVE_TOPOLOGY,
    specializations: PipelineSpecializations<Dx12PipelineState>,
}

impl Dx12RasterizingPipeline {
    pub(crate) fn new(
        ctx: Arc<GpuContext>,
        cache_handler: Option<Box<dyn PipelineCacheHandler>>,
        rasterizer: &dyn Rasterizer,
        specification: &RasterizingPipelineSpecification,
    ) -> Result<Self> {
        let Some(rasterizer) = rasterizer.downcast_ref::<Dx12Rasterizer>() else {
            engine_bail!(SOURCE, "Rasterizer was not created by the Direct3D 12 backend");
        };
        if !specification.vertex_shader.dxil().is_valid() {
            engine_bail!(SOURCE, "A rasterizing pipeline needs a vertex shader with a DXIL binary");
        }

        let color_count = rasterizer.color_count() as usize;
        if specification.color_blend_attachments.len() > color_count {
            engine_warn!(
                SOURCE,
                "{} color blend attachment(s) given for {} color attachment(s); the extra ones are ignored",
                specification.color_blend_attachments.len(),
                color_count
            );
        }
        Self::warn_unsupported(specification);

        let layout = Arc::new(Dx12PipelineLayout::new(Arc::clone(&ctx), specification.binding_map(), true)?);
        let base_input = VertexInputState::from_shader_inputs(specification.vertex_shader.input_attributes());

        let topology = match specification.primitive_topology {
            PrimitiveTopology::PatchList => patch_topology(specification.tessellation_patch_control_points),
            other => primitive_topology(other).1,
        };

        engine_debug!(
            SOURCE,
            "Created rasterizing pipeline with {} vertex input(s)",
            base_input.attributes.len()
        );

        Ok(Self {
            builder: GraphicsPipelineBuilder {
                ctx,
                specification: specification.clone(),
                layout: Arc::clone(&layout),
                rtv_formats: rasterizer.rtv_formats(),
                dsv_format: rasterizer.dsv_format(),
                sample_count: rasterizer.multi_sampling_count().sample_count(),
            },
            layout,
            topology,
            specializations: PipelineSpecializations::new(base_input, cache_handler),
        })
    }

    /// State D3D12 has no equivalent for is ignored with a warning
    fn warn_unsupported(specification: &RasterizingPipelineSpecification) {
        if specification.rasterizer_line_width != 1.0 {
            engine_warn!(SOURCE, "Line width {} is not supported, lines are 1 pixel wide", specification.rasterizer_line_width);
        }
        if specification.enable_alpha_to_one {
            engine_warn!(SOURCE, "Alpha to one is not supported by Direct3D 12, ignoring it");
        }
        if specification.enable_sample_shading {
            engine_warn!(SOURCE, "Sample shading is selected by the pixel shader in Direct3D 12, ignoring it");
        }
        let static_only = DynamicStateFlags::LINE_WIDTH | DynamicStateFlags::DEPTH_BIAS;
        if specification.dynamic_state_flags.intersects(static_only) {
            engine_warn!(
                SOURCE,
                "Dynamic {:?} is not supported, the pipeline values are used",
                specification.dynamic_state_flags & static_only
            );
        }
    }

    /// Specialization for `vertex_specification`, compiled on first use
    pub(crate) fn specialization(
        &self,
        vertex_specification: &VertexSpecification,
    ) -> Result<Arc<Specialization<Dx12PipelineState>>> {
        self.specializations.get_or_build(&self.builder, vertex_specification)
    }

    pub(crate) fn blend_constants(&self) -> [f32; 4] {
        self.builder.specification.color_blend_constants
    }
}

impl RasterizingPipeline for Dx12RasterizingPipeline {
    fn specification(&self) -> &RasterizingPipelineSpecification {
        &self.builder.specification
    }

    fn create_descriptor(&self, descriptor_type: DescriptorType) -> Result<Box<dyn Descriptor>> {
        self.layout.create_descriptor(descriptor_type)
    }

    fn specialize(&self, vertex_specification: &VertexSpecification) -> Result<u64> {
        Ok(self.specialization(vertex_specification)?.hash())
    }

    fn recreate(&self) -> Result<()> {
        self.specializations.recreate(&self.builder)
    }

    fn specialization_count(&self) -> usize {
        self.specializations.len()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
