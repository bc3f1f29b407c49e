/// VulkanFactory - creates every Vulkan backend object

use std::sync::Arc;

use winit::window::Window;
use xenon_engine::xenon::backend::{
    backend_device, require_ray_tracing, AccelerationStructureGeometry, AttachmentType, BackendInstance,
    BottomLevelAccelerationStructure, Buffer, BufferType, CommandRecorder, CommandRecorderUsage, CommandSubmitter,
    ComputePipeline, Device, Factory, Image, ImageSampler, ImageSamplerSpecification, ImageSpecification, ImageView,
    ImageViewSpecification, MultiSamplingCount, OcclusionQuery, PipelineCacheHandler, Rasterizer, RasterizingPipeline,
    RasterizingPipelineSpecification, RayTracer, RayTracingPipeline, RayTracingPipelineSpecification,
    RenderTargetType, Shader, Swapchain, TopLevelAccelerationStructure,
};
use xenon_engine::xenon::{BackendType, Config, Result};
use xenon_engine::engine_bail;

use crate::vulkan_buffer::VulkanBuffer;
use crate::vulkan_command_recorder::VulkanCommandRecorder;
use crate::vulkan_command_submitter::VulkanCommandSubmitter;
use crate::vulkan_compute_pipeline::VulkanComputePipeline;
use crate::vulkan_context::GpuContext;
use crate::vulkan_device::VulkanDevice;
use crate::vulkan_image::VulkanImage;
use crate::vulkan_image_view::VulkanImageView;
use crate::vulkan_instance::VulkanInstance;
use crate::vulkan_query::VulkanOcclusionQuery;
use crate::vulkan_rasterizer::VulkanRasterizer;
use crate::vulkan_rasterizing_pipeline::VulkanRasterizingPipeline;
use crate::vulkan_ray_tracing::{
    VulkanBottomLevelAccelerationStructure, VulkanRayTracer, VulkanRayTracingPipeline,
    VulkanTopLevelAccelerationStructure,
};
use crate::vulkan_sampler::VulkanImageSampler;
use crate::vulkan_swapchain::VulkanSwapchain;

const SOURCE: &str = "xenon::vulkan::Factory";

/// Vulkan backend factory
///
/// # Example
///
/// ```no_run
/// use xenon_engine::xenon::{Config, Instance};
/// use xenon_engine_renderer_vulkan::VulkanFactory;
///
/// let instance = Instance::new(Config::default(), Box::new(VulkanFactory::new()))?;
/// # Ok::<(), xenon_engine::xenon::Error>(())
/// ```
#[derive(Debug, Default)]
pub struct VulkanFactory;

impl VulkanFactory {
    pub fn new() -> Self {
        Self
    }

    fn context(device: &dyn Device) -> Result<Arc<GpuContext>> {
        Ok(Arc::clone(&backend_device::<VulkanDevice>(device, SOURCE)?.context))
    }

    /// Context of a device that was created with ray tracing enabled
    fn ray_tracing_context(device: &dyn Device) -> Result<Arc<GpuContext>> {
        require_ray_tracing(device, SOURCE)?;
        Self::context(device)
    }
}

impl Factory for VulkanFactory {
    fn backend_type(&self) -> BackendType {
        BackendType::Vulkan
    }

    fn create_instance(&self, config: &Config) -> Result<Box<dyn BackendInstance>> {
        Ok(Box::new(VulkanInstance::new(config)?))
    }

    fn create_device(
        &self,
        instance: &dyn BackendInstance,
        required_render_targets: RenderTargetType,
    ) -> Result<Box<dyn Device>> {
        let Some(instance) = instance.downcast_ref::<VulkanInstance>() else {
            engine_bail!(SOURCE, "The instance was not created by the Vulkan backend");
        };
        Ok(Box::new(VulkanDevice::new(instance, required_render_targets)?))
    }

    fn create_command_recorder(
        &self,
        device: &dyn Device,
        usage: CommandRecorderUsage,
        buffer_count: u32,
    ) -> Result<Box<dyn CommandRecorder>> {
        Ok(Box::new(VulkanCommandRecorder::new(Self::context(device)?, usage, buffer_count)?))
    }

    fn create_buffer(&self, device: &dyn Device, size: u64, buffer_type: BufferType) -> Result<Box<dyn Buffer>> {
        Ok(Box::new(VulkanBuffer::new(Self::context(device)?, size, buffer_type)?))
    }

    fn create_image(&self, device: &dyn Device, specification: &ImageSpecification) -> Result<Box<dyn Image>> {
        Ok(Box::new(VulkanImage::new(Self::context(device)?, specification)?))
    }

    fn create_rasterizer(
        &self,
        device: &dyn Device,
        width: u32,
        height: u32,
        attachment_types: AttachmentType,
        enable_triple_buffering: bool,
        multi_sampling_count: MultiSamplingCount,
    ) -> Result<Box<dyn Rasterizer>> {
        Ok(Box::new(VulkanRasterizer::new(
            Self::context(device)?,
            width,
            height,
            attachment_types,
            enable_triple_buffering,
            multi_sampling_count,
        )?))
    }

    fn create_swapchain(&self, device: &dyn Device, window: &Window) -> Result<Box<dyn Swapchain>> {
        Ok(Box::new(VulkanSwapchain::new(Self::context(device)?, window)?))
    }

    fn create_image_view(
        &self,
        device: &dyn Device,
        image: &dyn Image,
        specification: &ImageViewSpecification,
    ) -> Result<Box<dyn ImageView>> {
        Ok(Box::new(VulkanImageView::new(Self::context(device)?, image, specification)?))
    }

    fn create_image_sampler(
        &self,
        device: &dyn Device,
        specification: &ImageSamplerSpecification,
    ) -> Result<Box<dyn ImageSampler>> {
        Ok(Box::new(VulkanImageSampler::new(Self::context(device)?, specification)?))
    }

    fn create_rasterizing_pipeline(
        &self,
        device: &dyn Device,
        cache_handler: Option<Box<dyn PipelineCacheHandler>>,
        rasterizer: &dyn Rasterizer,
        specification: &RasterizingPipelineSpecification,
    ) -> Result<Box<dyn RasterizingPipeline>> {
        Ok(Box::new(VulkanRasterizingPipeline::new(
            Self::context(device)?,
            cache_handler,
            rasterizer,
            specification,
        )?))
    }

    fn create_compute_pipeline(
        &self,
        device: &dyn Device,
        cache_handler: Option<Box<dyn PipelineCacheHandler>>,
        compute_shader: &Shader,
    ) -> Result<Box<dyn ComputePipeline>> {
        Ok(Box::new(VulkanComputePipeline::new(Self::context(device)?, cache_handler, compute_shader)?))
    }

    fn create_command_submitter(&self, device: &dyn Device) -> Result<Box<dyn CommandSubmitter>> {
        Ok(Box::new(VulkanCommandSubmitter::new(Self::context(device)?)?))
    }

    fn create_occlusion_query(&self, device: &dyn Device, sample_count: u64) -> Result<Box<dyn OcclusionQuery>> {
        Ok(Box::new(VulkanOcclusionQuery::new(Self::context(device)?, sample_count)?))
    }

    fn create_top_level_acceleration_structure(
        &self,
        device: &dyn Device,
        bottom_level_acceleration_structures: &[&dyn BottomLevelAccelerationStructure],
    ) -> Result<Box<dyn TopLevelAccelerationStructure>> {
        Ok(Box::new(VulkanTopLevelAccelerationStructure::new(
            Self::ray_tracing_context(device)?,
            bottom_level_acceleration_structures,
        )?))
    }

    fn create_bottom_level_acceleration_structure(
        &self,
        device: &dyn Device,
        geometries: &[AccelerationStructureGeometry<'_>],
    ) -> Result<Box<dyn BottomLevelAccelerationStructure>> {
        Ok(Box::new(VulkanBottomLevelAccelerationStructure::new(
            Self::ray_tracing_context(device)?,
            geometries,
        )?))
    }

    fn create_ray_tracer(&self, device: &dyn Device, width: u32, height: u32) -> Result<Box<dyn RayTracer>> {
        Ok(Box::new(VulkanRayTracer::new(Self::ray_tracing_context(device)?, width, height)?))
    }

    fn create_ray_tracing_pipeline(
        &self,
        device: &dyn Device,
        cache_handler: Option<Box<dyn PipelineCacheHandler>>,
        specification: &RayTracingPipelineSpecification,
    ) -> Result<Box<dyn RayTracingPipeline>> {
        Ok(Box::new(VulkanRayTracingPipeline::new(
            Self::ray_tracing_context(device)?,
            cache_handler,
            specification,
        )?))
    }
}
