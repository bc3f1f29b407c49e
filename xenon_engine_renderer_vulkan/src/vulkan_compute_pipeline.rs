/// VulkanComputePipeline - compute pipeline cached under its shader's content hash

use std::any::Any;
use std::sync::Arc;

use ash::vk;
use xenon_engine::xenon::backend::{
    build_with_cache_retry, ComputePipeline, Descriptor, DescriptorType, PipelineCache, PipelineCacheHandler, Shader,
    ShaderBindingMap, ShaderType,
};
use xenon_engine::xenon::Result;
use xenon_engine::engine_debug;

use crate::vulkan_context::GpuContext;
use crate::vulkan_pipeline_layout::{ShaderModule, VulkanPipelineHandle, VulkanPipelineLayout};

const SOURCE: &str = "xenon::vulkan::ComputePipeline";

/// Vulkan compute pipeline implementation
pub struct VulkanComputePipeline {
    shader: Shader,
    pub(crate) layout: Arc<VulkanPipelineLayout>,
    pub(crate) pipeline: VulkanPipelineHandle,
}

impl VulkanComputePipeline {
    pub(crate) fn new(
        ctx: Arc<GpuContext>,
        cache_handler: Option<Box<dyn PipelineCacheHandler>>,
        shader: &Shader,
    ) -> Result<Self> {
        let binding_map = ShaderBindingMap::from_stages(&[(shader, ShaderType::COMPUTE)]);
        let layout = Arc::new(VulkanPipelineLayout::new(Arc::clone(&ctx), binding_map)?);

        let cache = PipelineCache::new(cache_handler);
        let hash = shader.content_hash();
        let cache_data = cache.load(hash);

        let module = ShaderModule::new(&ctx, shader)?;
        let pipeline = build_with_cache_retry(&cache_data, |data| {
            let create_info = vk::ComputePipelineCreateInfo::default()
                .stage(module.stage_info(vk::ShaderStageFlags::COMPUTE))
                .layout(layout.layout);
            VulkanPipelineHandle::build(&ctx, data, |pipeline_cache| unsafe {
                ctx.device
                    .create_compute_pipelines(pipeline_cache, &[create_info], None)
                    .map(|pipelines| pipelines[0])
                    .map_err(|(_, e)| e)
            })
        })?;
        cache.store(hash, &pipeline.cache_data()?);

        engine_debug!(SOURCE, "Created compute pipeline {:#018x}", hash);
        Ok(Self { shader: shader.clone(), layout, pipeline })
    }
}

impl ComputePipeline for VulkanComputePipeline {
    fn shader(&self) -> &Shader {
        &self.shader
    }

    fn create_descriptor(&self, descriptor_type: DescriptorType) -> Result<Box<dyn Descriptor>> {
        self.layout.create_descriptor(descriptor_type)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
