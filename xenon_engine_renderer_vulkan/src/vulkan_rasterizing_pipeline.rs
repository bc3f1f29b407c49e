/// VulkanRasterizingPipeline - graphics pipelines specialized per vertex layout
///
/// The pipeline layout is derived once from the merged shader bindings. A
/// `VkPipeline` is compiled lazily for every distinct vertex specification
/// the pipeline gets bound with, seeded from (and persisted to) the cache
/// handler under the layout hash.

use std::any::Any;
use std::sync::Arc;

use ash::vk;
use xenon_engine::xenon::backend::{
    dynamic_states, ColorBlendAttachment, Descriptor, DescriptorType, PipelineCacheHandler, PipelineSpecializations,
    PrimitiveTopology, Rasterizer, RasterizingPipeline, RasterizingPipelineSpecification, Specialization,
    SpecializationBuilder, VertexInputState, VertexSpecification,
};
use xenon_engine::xenon::Result;
use xenon_engine::{engine_bail, engine_debug, engine_warn};

use crate::vulkan_context::GpuContext;
use crate::vulkan_conversions::{
    blend_factor, blend_op, color_write_mask, compare_op, cull_mode, dynamic_state, front_face, logic_op,
    polygon_mode, primitive_topology, sample_count, vertex_format, vertex_input_rate,
};
use crate::vulkan_pipeline_layout::{ShaderModule, VulkanPipelineHandle, VulkanPipelineLayout};
use crate::vulkan_rasterizer::VulkanRasterizer;
use crate::vulkan_render_pass::VulkanRenderPass;

const SOURCE: &str = "xenon::vulkan::RasterizingPipeline";

/// Everything a specialization is compiled from, except the vertex input
struct GraphicsPipelineBuilder {
    ctx: Arc<GpuContext>,
    specification: RasterizingPipelineSpecification,
    layout: Arc<VulkanPipelineLayout>,
    render_pass: Arc<VulkanRenderPass>,
}

impl GraphicsPipelineBuilder {
    /// One blend state per color attachment of the render pass
    fn blend_attachments(&self) -> Vec<vk::PipelineColorBlendAttachmentState> {
        let color_count = self.render_pass.color_count as usize;
        (0..color_count)
            .map(|i| {
                let blend = self
                    .specification
                    .color_blend_attachments
                    .get(i)
                    .copied()
                    .unwrap_or_default();
                color_blend_attachment(&blend)
            })
            .collect()
    }
}

fn color_blend_attachment(blend: &ColorBlendAttachment) -> vk::PipelineColorBlendAttachmentState {
    let mut attachment = vk::PipelineColorBlendAttachmentState::default()
        .color_write_mask(color_write_mask(blend.color_write_mask))
        .blend_enable(blend.enable_blend);
    if blend.enable_blend {
        attachment = attachment
            .src_color_blend_factor(blend_factor(blend.src_blend_factor))
            .dst_color_blend_factor(blend_factor(blend.dst_blend_factor))
            .color_blend_op(blend_op(blend.blend_operator))
            .src_alpha_blend_factor(blend_factor(blend.src_alpha_blend_factor))
            .dst_alpha_blend_factor(blend_factor(blend.dst_alpha_blend_factor))
            .alpha_blend_op(blend_op(blend.alpha_blend_operator));
    }
    attachment
}

impl SpecializationBuilder for GraphicsPipelineBuilder {
    type Pipeline = VulkanPipelineHandle;

    fn build(&self, input: &VertexInputState, cache_data: &[u8]) -> Result<VulkanPipelineHandle> {
        let spec = &self.specification;

        // Shader stages
        let vertex_module = ShaderModule::new(&self.ctx, &spec.vertex_shader)?;
        let fragment_module = if spec.fragment_shader.is_valid() {
            Some(ShaderModule::new(&self.ctx, &spec.fragment_shader)?)
        } else {
            None
        };
        let mut shader_stages = vec![vertex_module.stage_info(vk::ShaderStageFlags::VERTEX)];
        if let Some(module) = &fragment_module {
            shader_stages.push(module.stage_info(vk::ShaderStageFlags::FRAGMENT));
        }

        // Vertex input state
        let vertex_bindings: Vec<vk::VertexInputBindingDescription> = input
            .bindings
            .iter()
            .map(|binding| vk::VertexInputBindingDescription {
                binding: binding.binding,
                stride: binding.stride,
                input_rate: vertex_input_rate(binding.input_rate),
            })
            .collect();

        let vertex_attributes: Vec<vk::VertexInputAttributeDescription> = input
            .attributes
            .iter()
            .map(|attribute| vk::VertexInputAttributeDescription {
                location: attribute.location,
                binding: attribute.binding,
                format: vertex_format(attribute.format),
                offset: attribute.offset,
            })
            .collect();

        let vertex_input_state = vk::PipelineVertexInputStateCreateInfo::default()
            .vertex_binding_descriptions(&vertex_bindings)
            .vertex_attribute_descriptions(&vertex_attributes);

        // Input assembly state
        let input_assembly_state = vk::PipelineInputAssemblyStateCreateInfo::default()
            .topology(primitive_topology(spec.primitive_topology))
            .primitive_restart_enable(spec.enable_primitive_restart);

        let tessellation_state = vk::PipelineTessellationStateCreateInfo::default()
            .patch_control_points(spec.tessellation_patch_control_points);

        // Viewport state (dynamic)
        let viewports = [vk::Viewport::default()];
        let scissors = [vk::Rect2D::default()];
        let viewport_state = vk::PipelineViewportStateCreateInfo::default()
            .viewports(&viewports)
            .scissors(&scissors);

        // Rasterization state
        let rasterization_state = {
            let mut info = vk::PipelineRasterizationStateCreateInfo::default()
                .depth_clamp_enable(spec.enable_depth_clamp)
                .rasterizer_discard_enable(spec.enable_rasterizer_discard)
                .polygon_mode(polygon_mode(spec.polygon_mode))
                .line_width(spec.rasterizer_line_width)
                .cull_mode(cull_mode(spec.cull_mode))
                .front_face(front_face(spec.front_face));
            if spec.enable_depth_bias {
                info = info
                    .depth_bias_enable(true)
                    .depth_bias_constant_factor(spec.depth_constant_factor)
                    .depth_bias_slope_factor(spec.depth_slope_factor)
                    .depth_bias_clamp(spec.depth_bias_factor);
            } else {
                info = info.depth_bias_enable(false);
            }
            info
        };

        // Depth/stencil state
        let depth_stencil_state = vk::PipelineDepthStencilStateCreateInfo::default()
            .depth_test_enable(spec.enable_depth_test)
            .depth_write_enable(spec.enable_depth_write)
            .depth_compare_op(compare_op(spec.depth_compare_logic))
            .depth_bounds_test_enable(false)
            .stencil_test_enable(false);

        // Multisample state
        let multisample_state = vk::PipelineMultisampleStateCreateInfo::default()
            .rasterization_samples(sample_count(self.render_pass.multi_sampling_count))
            .sample_shading_enable(spec.enable_sample_shading)
            .min_sample_shading(spec.min_sample_shading)
            .alpha_to_coverage_enable(spec.enable_alpha_coverage)
            .alpha_to_one_enable(spec.enable_alpha_to_one);

        // Color blend state
        let blend_attachments = self.blend_attachments();
        let color_blend_state = vk::PipelineColorBlendStateCreateInfo::default()
            .logic_op_enable(spec.enable_color_blend_logic)
            .logic_op(logic_op(spec.color_blend_logic))
            .attachments(&blend_attachments)
            .blend_constants(spec.color_blend_constants);

        // Dynamic state
        let dynamic: Vec<vk::DynamicState> = dynamic_states(spec.dynamic_state_flags)
            .into_iter()
            .map(dynamic_state)
            .collect();
        let dynamic_state_info = vk::PipelineDynamicStateCreateInfo::default().dynamic_states(&dynamic);

        let mut create_info = vk::GraphicsPipelineCreateInfo::default()
            .stages(&shader_stages)
            .vertex_input_state(&vertex_input_state)
            .input_assembly_state(&input_assembly_state)
            .viewport_state(&viewport_state)
            .rasterization_state(&rasterization_state)
            .multisample_state(&multisample_state)
            .color_blend_state(&color_blend_state)
            .dynamic_state(&dynamic_state_info)
            .layout(self.layout.layout)
            .render_pass(self.render_pass.render_pass)
            .subpass(0);
        if self.render_pass.has_depth() {
            create_info = create_info.depth_stencil_state(&depth_stencil_state);
        }
        if spec.primitive_topology == PrimitiveTopology::PatchList && spec.tessellation_patch_control_points > 0 {
            create_info = create_info.tessellation_state(&tessellation_state);
        }

        VulkanPipelineHandle::build(&self.ctx, cache_data, |cache| unsafe {
            self.ctx
                .device
                .create_graphics_pipelines(cache, &[create_info], None)
                .map(|pipelines| pipelines[0])
                .map_err(|(_, e)| e)
        })
    }

    fn cache_data(&self, pipeline: &VulkanPipelineHandle) -> Result<Vec<u8>> {
        pipeline.cache_data()
    }
}

/// Vulkan rasterizing pipeline implementation
pub struct VulkanRasterizingPipeline {
    builder: GraphicsPipelineBuilder,
    pub(crate) layout: Arc<VulkanPipelineLayout>,
    specializations: PipelineSpecializations<VulkanPipelineHandle>,
}

impl VulkanRasterizingPipeline {
    pub(crate) fn new(
        ctx: Arc<GpuContext>,
        cache_handler: Option<Box<dyn PipelineCacheHandler>>,
        rasterizer: &dyn Rasterizer,
        specification: &RasterizingPipelineSpecification,
    ) -> Result<Self> {
        let Some(rasterizer) = rasterizer.downcast_ref::<VulkanRasterizer>() else {
            engine_bail!(SOURCE, "Rasterizer was not created by the Vulkan backend");
        };
        if !specification.vertex_shader.spirv().is_valid() {
            engine_bail!(SOURCE, "A rasterizing pipeline needs a vertex shader with a SPIR-V binary");
        }

        let color_count = rasterizer.render_pass.color_count as usize;
        if specification.color_blend_attachments.len() > color_count {
            engine_warn!(
                SOURCE,
                "{} color blend attachment(s) given for {} color attachment(s); the extra ones are ignored",
                specification.color_blend_attachments.len(),
                color_count
            );
        }

        let layout = Arc::new(VulkanPipelineLayout::new(Arc::clone(&ctx), specification.binding_map())?);
        let base_input = VertexInputState::from_shader_inputs(specification.vertex_shader.input_attributes());

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
                render_pass: Arc::clone(&rasterizer.render_pass),
            },
            layout,
            specializations: PipelineSpecializations::new(base_input, cache_handler),
        })
    }

    /// Specialization for `vertex_specification`, compiled on first use
    pub(crate) fn specialization(
        &self,
        vertex_specification: &VertexSpecification,
    ) -> Result<Arc<Specialization<VulkanPipelineHandle>>> {
        self.specializations.get_or_build(&self.builder, vertex_specification)
    }
}

impl RasterizingPipeline for VulkanRasterizingPipeline {
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
