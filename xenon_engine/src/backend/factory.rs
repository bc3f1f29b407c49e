/// Backend factory: the single entry point creating every backend object
///
/// One implementation per graphics API. The factory is owned by the
/// `Instance` that uses it; there is no process-wide factory.

use winit::window::Window;

use crate::backend::buffer::Buffer;
use crate::backend::command::{CommandRecorder, CommandSubmitter};
use crate::backend::device::{BackendInstance, Device};
use crate::backend::image::{Image, ImageSampler, ImageSamplerSpecification, ImageSpecification, ImageView, ImageViewSpecification};
use crate::backend::pipeline::{
    ComputePipeline, RasterizingPipeline, RasterizingPipelineSpecification, RayTracingPipeline,
    RayTracingPipelineSpecification,
};
use crate::backend::pipeline_cache::PipelineCacheHandler;
use crate::backend::query::OcclusionQuery;
use crate::backend::rasterizer::Rasterizer;
use crate::backend::ray_tracing::{
    AccelerationStructureGeometry, BottomLevelAccelerationStructure, RayTracer, TopLevelAccelerationStructure,
};
use crate::backend::shader::Shader;
use crate::backend::swapchain::Swapchain;
use crate::backend::types::{AttachmentType, BufferType, CommandRecorderUsage, MultiSamplingCount, RenderTargetType};
use crate::config::{BackendType, Config};
use crate::engine_bail;
use crate::error::Result;

/// Creates the objects of one backend
///
/// Every call is synchronous and hands back an exclusively owned object.
/// Failures are returned as errors after being logged at the failure site.
pub trait Factory: Send + Sync {
    /// Graphics API this factory implements
    fn backend_type(&self) -> BackendType;

    fn create_instance(&self, config: &Config) -> Result<Box<dyn BackendInstance>>;

    /// Create a device supporting as many of `required_render_targets` as the hardware allows
    fn create_device(
        &self,
        instance: &dyn BackendInstance,
        required_render_targets: RenderTargetType,
    ) -> Result<Box<dyn Device>>;

    fn create_command_recorder(
        &self,
        device: &dyn Device,
        usage: CommandRecorderUsage,
        buffer_count: u32,
    ) -> Result<Box<dyn CommandRecorder>>;

    fn create_buffer(&self, device: &dyn Device, size: u64, buffer_type: BufferType) -> Result<Box<dyn Buffer>>;

    fn create_image(&self, device: &dyn Device, specification: &ImageSpecification) -> Result<Box<dyn Image>>;

    fn create_rasterizer(
        &self,
        device: &dyn Device,
        width: u32,
        height: u32,
        attachment_types: AttachmentType,
        enable_triple_buffering: bool,
        multi_sampling_count: MultiSamplingCount,
    ) -> Result<Box<dyn Rasterizer>>;

    /// The window must outlive the swapchain
    fn create_swapchain(&self, device: &dyn Device, window: &Window) -> Result<Box<dyn Swapchain>>;

    fn create_image_view(
        &self,
        device: &dyn Device,
        image: &dyn Image,
        specification: &ImageViewSpecification,
    ) -> Result<Box<dyn ImageView>>;

    fn create_image_sampler(
        &self,
        device: &dyn Device,
        specification: &ImageSamplerSpecification,
    ) -> Result<Box<dyn ImageSampler>>;

    fn create_rasterizing_pipeline(
        &self,
        device: &dyn Device,
        cache_handler: Option<Box<dyn PipelineCacheHandler>>,
        rasterizer: &dyn Rasterizer,
        specification: &RasterizingPipelineSpecification,
    ) -> Result<Box<dyn RasterizingPipeline>>;

    fn create_compute_pipeline(
        &self,
        device: &dyn Device,
        cache_handler: Option<Box<dyn PipelineCacheHandler>>,
        compute_shader: &Shader,
    ) -> Result<Box<dyn ComputePipeline>>;

    fn create_command_submitter(&self, device: &dyn Device) -> Result<Box<dyn CommandSubmitter>>;

    fn create_occlusion_query(&self, device: &dyn Device, sample_count: u64) -> Result<Box<dyn OcclusionQuery>>;

    fn create_top_level_acceleration_structure(
        &self,
        device: &dyn Device,
        bottom_level_acceleration_structures: &[&dyn BottomLevelAccelerationStructure],
    ) -> Result<Box<dyn TopLevelAccelerationStructure>>;

    fn create_bottom_level_acceleration_structure(
        &self,
        device: &dyn Device,
        geometries: &[AccelerationStructureGeometry<'_>],
    ) -> Result<Box<dyn BottomLevelAccelerationStructure>>;

    fn create_ray_tracer(&self, device: &dyn Device, width: u32, height: u32) -> Result<Box<dyn RayTracer>>;

    fn create_ray_tracing_pipeline(
        &self,
        device: &dyn Device,
        cache_handler: Option<Box<dyn PipelineCacheHandler>>,
        specification: &RayTracingPipelineSpecification,
    ) -> Result<Box<dyn RayTracingPipeline>>;
}

/// Downcast a device handed to a factory to the factory's own device type
pub fn backend_device<'a, T: Device + 'static>(device: &'a dyn Device, source: &str) -> Result<&'a T> {
    match device.downcast_ref::<T>() {
        Some(device) => Ok(device),
        None => engine_bail!(source, "The device was not created by this backend"),
    }
}

/// Reject ray tracing objects on devices that did not enable ray tracing
pub fn require_ray_tracing(device: &dyn Device, source: &str) -> Result<()> {
    if device.supported_render_targets().contains(RenderTargetType::RAY_TRACER) {
        Ok(())
    } else {
        engine_bail!(source, "Ray tracing is not supported by this device")
    }
}
