/// Objects shared by every Vulkan pipeline kind
///
/// - `VulkanPipelineLayout`: one descriptor set layout per descriptor class
///   (user defined, material, per geometry, scene) derived once from the
///   merged shader bindings, plus the pipeline layout over the four of them
/// - `VulkanPipelineHandle`: a built pipeline with the pipeline cache it was
///   compiled through
/// - `ShaderModule`: a temporary shader module for pipeline creation

use std::ffi::CString;
use std::sync::Arc;

use ash::vk;
use xenon_engine::xenon::backend::{Descriptor, DescriptorType, Shader, ShaderBindingMap};
use xenon_engine::xenon::{Error, Result};
use xenon_engine::{engine_bail, engine_err, engine_warn};

use crate::vulkan_context::GpuContext;
use crate::vulkan_conversions::{descriptor_type, shader_stage_flags};
use crate::vulkan_descriptor::VulkanDescriptor;

const SOURCE: &str = "xenon::vulkan::Pipeline";

// ===== PIPELINE LAYOUT =====

pub(crate) struct VulkanPipelineLayout {
    ctx: Arc<GpuContext>,
    pub(crate) layout: vk::PipelineLayout,
    /// Indexed by `DescriptorType::set_index`
    pub(crate) set_layouts: [vk::DescriptorSetLayout; 4],
    binding_map: ShaderBindingMap,
}

impl VulkanPipelineLayout {
    pub(crate) fn new(ctx: Arc<GpuContext>, binding_map: ShaderBindingMap) -> Result<Self> {
        let mut layout = Self {
            ctx,
            layout: vk::PipelineLayout::null(),
            set_layouts: [vk::DescriptorSetLayout::null(); 4],
            binding_map,
        };

        // Handles created so far are released by Drop on failure
        for (class, bindings) in layout.binding_map.iter() {
            let vk_bindings: Vec<vk::DescriptorSetLayoutBinding> = bindings
                .iter()
                .map(|(binding, info)| {
                    vk::DescriptorSetLayoutBinding::default()
                        .binding(*binding)
                        .descriptor_type(descriptor_type(info.resource_type))
                        .descriptor_count(1)
                        .stage_flags(shader_stage_flags(info.applicable_shaders))
                })
                .collect();

            let create_info = vk::DescriptorSetLayoutCreateInfo::default().bindings(&vk_bindings);
            let set_layout = unsafe { layout.ctx.device.create_descriptor_set_layout(&create_info, None) }
                .map_err(|e| engine_err!(SOURCE, "Failed to create the {:?} descriptor set layout: {:?}", class, e))?;
            layout.set_layouts[class.set_index() as usize] = set_layout;
        }

        let create_info = vk::PipelineLayoutCreateInfo::default().set_layouts(&layout.set_layouts);
        layout.layout = unsafe { layout.ctx.device.create_pipeline_layout(&create_info, None) }
            .map_err(|e| engine_err!(SOURCE, "Failed to create pipeline layout: {:?}", e))?;

        Ok(layout)
    }

    pub(crate) fn binding_map(&self) -> &ShaderBindingMap {
        &self.binding_map
    }

    /// Create a descriptor for one class of this layout
    pub(crate) fn create_descriptor(self: &Arc<Self>, descriptor_type: DescriptorType) -> Result<Box<dyn Descriptor>> {
        Ok(Box::new(VulkanDescriptor::new(Arc::clone(&self.ctx), Arc::clone(self), descriptor_type)?))
    }
}

impl Drop for VulkanPipelineLayout {
    fn drop(&mut self) {
        unsafe {
            if self.layout != vk::PipelineLayout::null() {
                self.ctx.device.destroy_pipeline_layout(self.layout, None);
            }
            for set_layout in self.set_layouts {
                if set_layout != vk::DescriptorSetLayout::null() {
                    self.ctx.device.destroy_descriptor_set_layout(set_layout, None);
                }
            }
        }
    }
}

// ===== PIPELINE HANDLE =====

/// Built pipeline and the cache its compilation went through
pub(crate) struct VulkanPipelineHandle {
    ctx: Arc<GpuContext>,
    pub(crate) pipeline: vk::Pipeline,
    cache: vk::PipelineCache,
}

impl VulkanPipelineHandle {
    /// Create a pipeline cache seeded with `cache_data` and build a pipeline through it
    ///
    /// A driver rejecting non-empty cache data is reported as
    /// `Error::InvalidPipelineCache` so the caller can retry without it.
    pub(crate) fn build<F>(ctx: &Arc<GpuContext>, cache_data: &[u8], create: F) -> Result<Self>
    where
        F: FnOnce(vk::PipelineCache) -> std::result::Result<vk::Pipeline, vk::Result>,
    {
        let cache_info = vk::PipelineCacheCreateInfo::default().initial_data(cache_data);
        let cache = match unsafe { ctx.device.create_pipeline_cache(&cache_info, None) } {
            Ok(cache) => cache,
            Err(e) => return Err(pipeline_error(e, "pipeline cache", cache_data)),
        };

        match create(cache) {
            Ok(pipeline) => Ok(Self { ctx: Arc::clone(ctx), pipeline, cache }),
            Err(e) => {
                unsafe {
                    ctx.device.destroy_pipeline_cache(cache, None);
                }
                Err(pipeline_error(e, "pipeline", cache_data))
            }
        }
    }

    /// Serialized cache bytes, to be persisted by a cache handler
    pub(crate) fn cache_data(&self) -> Result<Vec<u8>> {
        unsafe { self.ctx.device.get_pipeline_cache_data(self.cache) }
            .map_err(|e| engine_err!(SOURCE, "Failed to get the pipeline cache data: {:?}", e))
    }
}

/// Map a creation failure, flagging the cache data when the driver may have rejected it
fn pipeline_error(result: vk::Result, what: &str, cache_data: &[u8]) -> Error {
    let cache_rejected = matches!(result, vk::Result::ERROR_UNKNOWN | vk::Result::ERROR_INITIALIZATION_FAILED);
    if cache_rejected && !cache_data.is_empty() {
        engine_warn!(SOURCE, "Failed to create the {} with the cached data: {:?}", what, result);
        Error::InvalidPipelineCache(format!("{:?}", result))
    } else {
        engine_err!(SOURCE, "Failed to create the {}: {:?}", what, result)
    }
}

impl Drop for VulkanPipelineHandle {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device.destroy_pipeline(self.pipeline, None);
            self.ctx.device.destroy_pipeline_cache(self.cache, None);
        }
    }
}

// ===== SHADER MODULE =====

/// Shader module living for the duration of one pipeline creation
pub(crate) struct ShaderModule<'a> {
    ctx: &'a GpuContext,
    pub(crate) module: vk::ShaderModule,
    pub(crate) entry_point: CString,
}

impl<'a> ShaderModule<'a> {
    pub(crate) fn new(ctx: &'a GpuContext, shader: &Shader) -> Result<Self> {
        let source = shader.spirv();
        if !source.is_valid() {
            engine_bail!(SOURCE, "Shader has no SPIR-V binary");
        }
        let entry_point = CString::new(source.entry_point())
            .map_err(|_| engine_err!(SOURCE, "Shader entry point '{}' contains a NUL byte", source.entry_point()))?;

        let create_info = vk::ShaderModuleCreateInfo::default().code(source.binary());
        let module = unsafe { ctx.device.create_shader_module(&create_info, None) }
            .map_err(|e| engine_err!(SOURCE, "Failed to create shader module: {:?}", e))?;

        Ok(Self { ctx, module, entry_point })
    }

    pub(crate) fn stage_info(&self, stage: vk::ShaderStageFlags) -> vk::PipelineShaderStageCreateInfo<'_> {
        vk::PipelineShaderStageCreateInfo::default()
            .stage(stage)
            .module(self.module)
            .name(&self.entry_point)
    }
}

impl Drop for ShaderModule<'_> {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device.destroy_shader_module(self.module, None);
        }
    }
}
