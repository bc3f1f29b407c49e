/// Dx12Factory - creates every Direct3D 12 backend object
///
/// Devices only advertise the rasterizer render target, so every ray tracing
/// object is rejected by `require_ray_tracing` before anything is created.

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

use crate::dx12_buffer::Dx12Buffer;
use crate::dx12_command_recorder::Dx12CommandRecorder;
use crate::dx12_command_submitter::Dx12CommandSubmitter;
use crate::dx12_compute_pipeline::Dx12ComputePipeline;
use crate::dx12_context::GpuContext;
use crate::dx12_device::Dx12Device;
use crate::dx12_image::Dx12Image;
use crate::dx12_image_view::Dx12ImageView;
use crate::dx12_instance::Dx12Instance;
use crate::dx12_query::Dx12OcclusionQuery;
use crate::dx12_rasterizer::Dx12Rasterizer;
use crate::dx12_rasterizing_pipeline::Dx12RasterizingPipeline;
use crate::dx12_sampler::Dx12ImageSampler;
use crate::dx12_swapchain::Dx12Swapchain;

const SOURCE: &str = "xenon::dx12::Factory";

/// Direct3D 12 backend factory
///
/// # Example
///
/// ```no_run
/// use xenon_engine::xenon::{BackendType, Config, Instance};
/// use xenon_engine_renderer_dx12::Dx12Factory;
///
/// let config = Config { backend: BackendType::DirectX12, ..Config::default() };
/// let instance = Instance::new(config, Box::new(Dx12Factory::new()))?;
/// # Ok::<(), xenon_engine::xenon::Error>(())
/// ```
#[derive(Debug, Default)]
pub struct Dx12Factory;

impl Dx12Factory {
    pub fn new() -> Self {
        Self
    }

    fn context(device: &dyn Device) -> Result<Arc<GpuContext>> {
        Ok(Arc::clone(&backend_device::<Dx12Device>(device, SOURCE)?.context))
    }
}

impl Factory for Dx12Factory {
    fn backend_type(&self) -> BackendType {
        BackendType::DirectX12
    }

    fn create_instance(&self, config: &Config) -> Result<Box<dyn BackendInstance>> {
        Ok(Box::new(Dx12Instance::new(config)?))
    }

    fn create_device(
        &self,
        instance: &dyn BackendInstance,
        required_render_targets: RenderTargetType,
    ) -> Result<Box<dyn Device>> {
        let Some(instance) = instance.downcast_ref::<Dx12Instance>() else {
            engine_bail!(SOURCE, "The instance was not created by the Direct3D 12 backend");
        };
        Ok(Box::new(Dx12Device::new(instance, required_render_targets)?))
    }

    fn create_command_recorder(
        &self,
        device: &dyn Device,
        usage: CommandRecorderUsage,
        buffer_count: u32,
    ) -> Result<Box<dyn CommandRecorder>> {
        Ok(Box::new(Dx12CommandRecorder::new(Self::context(device)?, usage, buffer_count)?))
    }

    fn create_buffer(&self, device: &dyn Device, size: u64, buffer_type: BufferType) -> Result<Box<dyn Buffer>> {
        Ok(Box::new(Dx12Buffer::new(Self::context(device)?, size, buffer_type)?))
    }

    fn create_image(&self, device: &dyn Device, specification: &ImageSpecification) -> Result<Box<dyn Image>> {
        Ok(Box::new(Dx12Image::new(Self::context(device)?, specification)?))
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
        Ok(Box::new(Dx12Rasterizer::new(
            Self::context(device)?,
            width,
            height,
            attachment_types,
            enable_triple_buffering,
            multi_sampling_count,
        )?))
    }

    fn create_swapchain(&self, device: &dyn Device, window: &Window) -> Result<Box<dyn Swapchain>> {
        Ok(Box::new(Dx12Swapchain::new(Self::context(device)?, window)?))
    }

    fn create_image_view(
        &self,
        device: &dyn Device,
        image: &dyn Image,
        specification: &ImageViewSpecification,
    ) -> Result<Box<dyn ImageView>> {
        // Views are plain descriptions until attached to a descriptor
        Self::context(device)?;
        Ok(Box::new(Dx12ImageView::new(image, specification)?))
    }

    fn create_image_sampler(
        &self,
        device: &dyn Device,
        specification: &ImageSamplerSpecification,
    ) -> Result<Box<dyn ImageSampler>> {
        Self::context(device)?;
        Ok(Box::new(Dx12ImageSampler::new(specification)))
    }

    fn create_rasterizing_pipeline(
        &self,
        device: &dyn Device,
        cache_handler: Option<Box<dyn PipelineCacheHandler>>,
        rasterizer: &dyn Rasterizer,
        specification: &RasterizingPipelineSpecification,
    ) -> Result<Box<dyn RasterizingPipeline>> {
        Ok(Box::new(Dx12RasterizingPipeline::new(
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
        Ok(Box::new(Dx12ComputePipeline::new(Self::context(device)?, cache_handler, compute_shader)?))
    }

    fn create_command_submitter(&self, device: &dyn Device) -> Result<Box<dyn CommandSubmitter>> {
        Ok(Box::new(Dx12CommandSubmitter::new(Self::context(device)?)?))
    }

    fn create_occlusion_query(&self, device: &dyn Device, sample_count: u64) -> Result<Box<dyn OcclusionQuery>> {
        Ok(Box::new(Dx12OcclusionQuery::new(Self::context(device)?, sample_count)?))
    }

    fn create_top_level_acceleration_structure(
        &self,
        device: &dyn Device,
        _bottom_level_acceleration_structures: &[&dyn BottomLevelAccelerationStructure],
    ) -> Result<Box<dyn TopLevelAccelerationStructure>> {
        require_ray_tracing(device, SOURCE)?;
        engine_bail!(SOURCE, "Acceleration structures are not supported by the Direct3D 12 backend")
    }

    fn create_bottom_level_acceleration_structure(
        &self,
        device: &dyn Device,
        _geometries: &[AccelerationStructureGeometry<'_>],
    ) -> Result<Box<dyn BottomLevelAccelerationStructure>> {
        require_ray_tracing(device, SOURCE)?;
        engine_bail!(SOURCE, "Acceleration structures are not supported by the Direct3D 12 backend")
    }

    fn create_ray_tracer(&self, device: &dyn Device, _width: u32, _height: u32) -> Result<Box<dyn RayTracer>> {
        require_ray_tracing(device, SOURCE)?;
        engine_bail!(SOURCE, "Ray tracers are not supported by the Direct3D 12 backend")
    }

    fn create_ray_tracing_pipeline(
        &self,
        device: &dyn Device,
        _cache_handler: Option<Box<dyn PipelineCacheHandler>>,
        _specification: &RayTracingPipelineSpecification,
    ) -> Result<Box<dyn RayTracingPipeline>> {
        require_ray_tracing(device, SOURCE)?;
        engine_bail!(SOURCE, "Ray tracing pipelines are not supported by the Direct3D 12 backend")
    }
}
