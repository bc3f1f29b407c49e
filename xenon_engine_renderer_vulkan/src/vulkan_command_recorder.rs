/// VulkanCommandRecorder - Vulkan implementation of the CommandRecorder trait
///
/// Records into a ring of command buffers allocated from one pool. Every
/// buffer owns the semaphore it signals when submitted, and remembers the
/// submission it was part of so `begin` can wait for its previous use.

use std::any::Any;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use ash::vk;
use xenon_engine::xenon::backend::{
    default_clear_values, Buffer, ClearValue, CommandRecorder, CommandRecorderUsage, ComputePipeline, Descriptor,
    DescriptorType, Image, IndexBufferStride, MultiSamplingCount, OcclusionQuery, Rasterizer, RasterizingPipeline,
    RayTracer, RayTracingPipeline, Rect2D, Swapchain, VertexSpecification, Viewport,
};
use xenon_engine::xenon::{Error, Result};
use xenon_engine::{engine_bail, engine_err, engine_warn};

use crate::vulkan_buffer::VulkanBuffer;
use crate::vulkan_command_submitter::SubmitFence;
use crate::vulkan_compute_pipeline::VulkanComputePipeline;
use crate::vulkan_context::GpuContext;
use crate::vulkan_conversions::{clear_value, index_type, rect, viewport};
use crate::vulkan_descriptor::VulkanDescriptor;
use crate::vulkan_image::{record_layout_transition, VulkanImage};
use crate::vulkan_query::VulkanOcclusionQuery;
use crate::vulkan_rasterizer::VulkanRasterizer;
use crate::vulkan_rasterizing_pipeline::VulkanRasterizingPipeline;
use crate::vulkan_ray_tracing::{VulkanRayTracer, VulkanRayTracingPipeline};
use crate::vulkan_swapchain::VulkanSwapchain;

const SOURCE: &str = "xenon::vulkan::CommandRecorder";

/// Record into the caller's recorder, or into a one-shot buffer that is
/// submitted and waited for when there is none
pub(crate) fn record_or_submit<F>(ctx: &GpuContext, recorder: Option<&mut dyn CommandRecorder>, record: F) -> Result<()>
where
    F: FnOnce(vk::CommandBuffer) -> Result<()>,
{
    match recorder {
        Some(recorder) => {
            let Some(recorder) = recorder.downcast_mut::<VulkanCommandRecorder>() else {
                engine_bail!(SOURCE, "Recorder was not created by the Vulkan backend");
            };
            let command_buffer = recorder.recording_buffer()?;
            record(command_buffer)
        }
        None => {
            let mut result = Ok(());
            ctx.execute_one_shot(|command_buffer| {
                result = record(command_buffer);
            })?;
            result
        }
    }
}

/// One command buffer of the ring
struct RecorderSlot {
    command_buffer: vk::CommandBuffer,
    signal: vk::Semaphore,
    /// Fence and epoch of the submission the buffer was last part of
    submission: Mutex<Option<(Arc<SubmitFence>, u64)>>,
    /// Pipeline objects referenced by the recorded commands
    retained: Vec<Arc<dyn Any + Send + Sync>>,
    recording: bool,
    recorded: bool,
}

/// What the last bound pipeline needs for descriptor binds
#[derive(Clone, Copy)]
struct BoundPipeline {
    layout: vk::PipelineLayout,
    bind_point: vk::PipelineBindPoint,
    vertex_stride: Option<u32>,
}

/// Vulkan command recorder implementation
pub struct VulkanCommandRecorder {
    ctx: Arc<GpuContext>,
    usage: CommandRecorderUsage,
    command_pool: vk::CommandPool,
    slots: Vec<RecorderSlot>,
    current: usize,
    in_render_pass: bool,
    bound_pipeline: Option<BoundPipeline>,
}

impl VulkanCommandRecorder {
    pub(crate) fn new(ctx: Arc<GpuContext>, usage: CommandRecorderUsage, buffer_count: u32) -> Result<Self> {
        let buffer_count = buffer_count.max(1);

        let pool_info = vk::CommandPoolCreateInfo::default()
            .queue_family_index(ctx.graphics_queue_family)
            .flags(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER);
        let command_pool = unsafe { ctx.device.create_command_pool(&pool_info, None) }
            .map_err(|e| engine_err!(SOURCE, "Failed to create command pool: {:?}", e))?;

        let level = match usage {
            CommandRecorderUsage::Secondary => vk::CommandBufferLevel::SECONDARY,
            _ => vk::CommandBufferLevel::PRIMARY,
        };
        let alloc_info = vk::CommandBufferAllocateInfo::default()
            .command_pool(command_pool)
            .level(level)
            .command_buffer_count(buffer_count);

        let mut recorder = Self {
            ctx,
            usage,
            command_pool,
            slots: Vec::with_capacity(buffer_count as usize),
            current: 0,
            in_render_pass: false,
            bound_pipeline: None,
        };

        // Drop releases the pool (and its buffers) and any semaphore created so far
        let command_buffers = unsafe { recorder.ctx.device.allocate_command_buffers(&alloc_info) }
            .map_err(|e| engine_err!(SOURCE, "Failed to allocate command buffers: {:?}", e))?;
        for command_buffer in command_buffers {
            let signal = unsafe {
                recorder
                    .ctx
                    .device
                    .create_semaphore(&vk::SemaphoreCreateInfo::default(), None)
            }
            .map_err(|e| engine_err!(SOURCE, "Failed to create semaphore: {:?}", e))?;
            recorder.slots.push(RecorderSlot {
                command_buffer,
                signal,
                submission: Mutex::new(None),
                retained: Vec::new(),
                recording: false,
                recorded: false,
            });
        }

        Ok(recorder)
    }

    fn slot(&self) -> &RecorderSlot {
        &self.slots[self.current]
    }

    /// Command buffer being recorded, or an error outside `begin`/`end`
    pub(crate) fn recording_buffer(&self) -> Result<vk::CommandBuffer> {
        let slot = self.slot();
        if !slot.recording {
            engine_bail!(SOURCE, "Command recorder is not recording");
        }
        Ok(slot.command_buffer)
    }

    fn render_pass_buffer(&self) -> Result<vk::CommandBuffer> {
        let command_buffer = self.recording_buffer()?;
        if !self.in_render_pass {
            engine_bail!(SOURCE, "Not inside a render pass");
        }
        Ok(command_buffer)
    }

    fn outside_render_pass_buffer(&self) -> Result<vk::CommandBuffer> {
        let command_buffer = self.recording_buffer()?;
        if self.in_render_pass {
            engine_bail!(SOURCE, "Command must be recorded outside a render pass");
        }
        Ok(command_buffer)
    }

    /// Buffer to hand to the queue: recorded and not being recorded
    pub(crate) fn submittable_buffer(&self) -> Result<vk::CommandBuffer> {
        let slot = self.slot();
        if slot.recording || !slot.recorded {
            engine_bail!(SOURCE, "Command recorder has nothing recorded to submit (call begin/end first)");
        }
        Ok(slot.command_buffer)
    }

    pub(crate) fn signal_semaphore(&self) -> vk::Semaphore {
        self.slot().signal
    }

    pub(crate) fn mark_submitted(&self, fence: &Arc<SubmitFence>, epoch: u64) {
        if let Ok(mut submission) = self.slot().submission.lock() {
            *submission = Some((Arc::clone(fence), epoch));
        }
    }

    fn retain(&mut self, object: Arc<dyn Any + Send + Sync>) {
        self.slots[self.current].retained.push(object);
    }

    fn bound_pipeline(&self, bind_point: vk::PipelineBindPoint) -> Result<BoundPipeline> {
        match self.bound_pipeline {
            Some(bound) if bound.bind_point == bind_point => Ok(bound),
            _ => engine_bail!(SOURCE, "No {:?} pipeline is bound", bind_point),
        }
    }

    fn bind_descriptor_sets(
        &self,
        command_buffer: vk::CommandBuffer,
        bound: BoundPipeline,
        descriptors: &[(DescriptorType, &dyn Descriptor)],
    ) -> Result<()> {
        for (descriptor_type, descriptor) in descriptors {
            let Some(descriptor) = descriptor.downcast_ref::<VulkanDescriptor>() else {
                engine_bail!(SOURCE, "Descriptor was not created by the Vulkan backend");
            };
            if descriptor.descriptor_type() != *descriptor_type {
                engine_bail!(
                    SOURCE,
                    "A {:?} descriptor cannot be bound as {:?}",
                    descriptor.descriptor_type(),
                    descriptor_type
                );
            }
            unsafe {
                self.ctx.device.cmd_bind_descriptor_sets(
                    command_buffer,
                    bound.bind_point,
                    bound.layout,
                    descriptor_type.set_index(),
                    &[descriptor.set],
                    &[],
                );
            }
        }
        Ok(())
    }

    fn query<'a>(query: &'a dyn OcclusionQuery) -> Result<&'a VulkanOcclusionQuery> {
        match query.downcast_ref::<VulkanOcclusionQuery>() {
            Some(query) => Ok(query),
            None => engine_bail!(SOURCE, "Query was not created by the Vulkan backend"),
        }
    }
}

impl CommandRecorder for VulkanCommandRecorder {
    fn usage(&self) -> CommandRecorderUsage {
        self.usage
    }

    fn buffer_count(&self) -> u32 {
        self.slots.len() as u32
    }

    fn current_index(&self) -> u32 {
        self.current as u32
    }

    fn next(&mut self) {
        self.current = (self.current + 1) % self.slots.len();
    }

    fn begin(&mut self) -> Result<()> {
        let usage = self.usage;
        let device = &self.ctx.device;
        let slot = &mut self.slots[self.current];
        if slot.recording {
            engine_bail!(SOURCE, "Command recorder is already recording");
        }

        let submission = slot
            .submission
            .get_mut()
            .map_err(|_| Error::BackendError("Recorder submission lock poisoned".to_string()))?
            .take();
        if let Some((fence, epoch)) = submission {
            fence.wait_for(epoch, Duration::MAX)?;
        }
        slot.retained.clear();

        let inheritance = vk::CommandBufferInheritanceInfo::default();
        let mut begin_info = vk::CommandBufferBeginInfo::default().flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
        if usage == CommandRecorderUsage::Secondary {
            begin_info = begin_info.inheritance_info(&inheritance);
        }

        unsafe {
            device
                .reset_command_buffer(slot.command_buffer, vk::CommandBufferResetFlags::empty())
                .map_err(|e| engine_err!(SOURCE, "Failed to reset command buffer: {:?}", e))?;
            device
                .begin_command_buffer(slot.command_buffer, &begin_info)
                .map_err(|e| engine_err!(SOURCE, "Failed to begin command buffer: {:?}", e))?;
        }

        slot.recording = true;
        slot.recorded = false;
        self.in_render_pass = false;
        self.bound_pipeline = None;
        Ok(())
    }

    fn end(&mut self) -> Result<()> {
        let command_buffer = self.recording_buffer()?;
        if self.in_render_pass {
            engine_bail!(SOURCE, "Render pass not ended before ending the command recorder");
        }

        unsafe { self.ctx.device.end_command_buffer(command_buffer) }
            .map_err(|e| engine_err!(SOURCE, "Failed to end command buffer: {:?}", e))?;

        let slot = &mut self.slots[self.current];
        slot.recording = false;
        slot.recorded = true;
        Ok(())
    }

    fn copy_buffer(
        &mut self,
        src: &dyn Buffer,
        src_offset: u64,
        dst: &dyn Buffer,
        dst_offset: u64,
        size: u64,
    ) -> Result<()> {
        let (Some(src), Some(dst)) = (src.downcast_ref::<VulkanBuffer>(), dst.downcast_ref::<VulkanBuffer>()) else {
            engine_bail!(SOURCE, "Buffers were not created by the Vulkan backend");
        };
        let command_buffer = self.outside_render_pass_buffer()?;
        dst.record_copy(command_buffer, src, size, src_offset, dst_offset)
    }

    fn copy_to_swapchain(&mut self, image: &dyn Image, swapchain: &dyn Swapchain) -> Result<()> {
        let Some(image) = image.downcast_ref::<VulkanImage>() else {
            engine_bail!(SOURCE, "Image was not created by the Vulkan backend");
        };
        let Some(swapchain) = swapchain.downcast_ref::<VulkanSwapchain>() else {
            engine_bail!(SOURCE, "Swapchain was not created by the Vulkan backend");
        };
        let command_buffer = self.outside_render_pass_buffer()?;
        if !swapchain.is_renderable() {
            return Ok(());
        }
        let Some(dst_image) = swapchain.current_image() else {
            engine_bail!(SOURCE, "Swapchain has no acquired image (call prepare first)");
        };

        let color_range = vk::ImageSubresourceRange {
            aspect_mask: vk::ImageAspectFlags::COLOR,
            base_mip_level: 0,
            level_count: 1,
            base_array_layer: 0,
            layer_count: 1,
        };
        let color_layers = vk::ImageSubresourceLayers {
            aspect_mask: vk::ImageAspectFlags::COLOR,
            mip_level: 0,
            base_array_layer: 0,
            layer_count: 1,
        };

        let src_spec = image.specification();
        let dst_extent = swapchain.extent();
        let filter = if src_spec.width == dst_extent.width && src_spec.height == dst_extent.height {
            vk::Filter::NEAREST
        } else {
            vk::Filter::LINEAR
        };

        image.record_transition(command_buffer, vk::ImageLayout::TRANSFER_SRC_OPTIMAL);
        record_layout_transition(
            &self.ctx.device,
            command_buffer,
            dst_image,
            color_range,
            vk::ImageLayout::UNDEFINED,
            vk::ImageLayout::TRANSFER_DST_OPTIMAL,
        );

        let region = vk::ImageBlit {
            src_subresource: color_layers,
            src_offsets: [
                vk::Offset3D { x: 0, y: 0, z: 0 },
                vk::Offset3D { x: src_spec.width as i32, y: src_spec.height as i32, z: 1 },
            ],
            dst_subresource: color_layers,
            dst_offsets: [
                vk::Offset3D { x: 0, y: 0, z: 0 },
                vk::Offset3D { x: dst_extent.width as i32, y: dst_extent.height as i32, z: 1 },
            ],
        };
        unsafe {
            self.ctx.device.cmd_blit_image(
                command_buffer,
                image.image,
                vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
                dst_image,
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                &[region],
                filter,
            );
        }

        record_layout_transition(
            &self.ctx.device,
            command_buffer,
            dst_image,
            color_range,
            vk::ImageLayout::TRANSFER_DST_OPTIMAL,
            vk::ImageLayout::PRESENT_SRC_KHR,
        );
        image.record_transition(command_buffer, image.resting_layout());
        Ok(())
    }

    fn bind_rasterizer(&mut self, rasterizer: &dyn Rasterizer, clear_values: &[ClearValue]) -> Result<()> {
        let Some(rasterizer) = rasterizer.downcast_ref::<VulkanRasterizer>() else {
            engine_bail!(SOURCE, "Rasterizer was not created by the Vulkan backend");
        };
        let command_buffer = self.outside_render_pass_buffer()?;

        // Missing clear values fall back to the defaults of their slot
        let defaults = default_clear_values(rasterizer.attachment_types());
        if clear_values.len() > defaults.len() {
            engine_warn!(
                SOURCE,
                "{} clear values given for {} attachment(s), ignoring the extra ones",
                clear_values.len(),
                defaults.len()
            );
        }
        let mut vk_clear_values: Vec<vk::ClearValue> = defaults
            .iter()
            .enumerate()
            .map(|(i, default)| clear_value(*clear_values.get(i).unwrap_or(default)))
            .collect();
        // Resolve attachments are never cleared but still occupy indices
        let resolve_count = rasterizer.render_pass.color_count as usize;
        if rasterizer.render_pass.multi_sampling_count != MultiSamplingCount::X1 {
            vk_clear_values.extend(std::iter::repeat_n(vk::ClearValue::default(), resolve_count));
        }

        let framebuffer = rasterizer.begin_frame();
        let extent = rasterizer.extent();
        let render_pass_info = vk::RenderPassBeginInfo::default()
            .render_pass(rasterizer.render_pass.render_pass)
            .framebuffer(framebuffer)
            .render_area(vk::Rect2D { offset: vk::Offset2D { x: 0, y: 0 }, extent })
            .clear_values(&vk_clear_values);

        unsafe {
            self.ctx
                .device
                .cmd_begin_render_pass(command_buffer, &render_pass_info, vk::SubpassContents::INLINE);

            // Viewport and scissor are dynamic in every pipeline; default to the full target
            let full_viewport = vk::Viewport::default()
                .width(extent.width as f32)
                .height(extent.height as f32)
                .min_depth(0.0)
                .max_depth(1.0);
            self.ctx.device.cmd_set_viewport(command_buffer, 0, &[full_viewport]);
            self.ctx
                .device
                .cmd_set_scissor(command_buffer, 0, &[vk::Rect2D { offset: vk::Offset2D::default(), extent }]);
        }

        self.in_render_pass = true;
        self.retain(Arc::clone(&rasterizer.render_pass) as Arc<dyn Any + Send + Sync>);
        Ok(())
    }

    fn bind_rasterizing_pipeline(
        &mut self,
        pipeline: &dyn RasterizingPipeline,
        vertex_specification: &VertexSpecification,
    ) -> Result<()> {
        let Some(pipeline) = pipeline.as_any().downcast_ref::<VulkanRasterizingPipeline>() else {
            engine_bail!(SOURCE, "Pipeline was not created by the Vulkan backend");
        };
        let command_buffer = self.recording_buffer()?;
        let specialization = pipeline.specialization(vertex_specification)?;

        unsafe {
            self.ctx.device.cmd_bind_pipeline(
                command_buffer,
                vk::PipelineBindPoint::GRAPHICS,
                specialization.pipeline().pipeline,
            );
        }

        self.bound_pipeline = Some(BoundPipeline {
            layout: pipeline.layout.layout,
            bind_point: vk::PipelineBindPoint::GRAPHICS,
            vertex_stride: specialization.input().bindings.first().map(|binding| binding.stride),
        });
        self.retain(specialization as Arc<dyn Any + Send + Sync>);
        Ok(())
    }

    fn bind_vertex_buffer(&mut self, buffer: &dyn Buffer, vertex_stride: u32) -> Result<()> {
        let Some(buffer) = buffer.downcast_ref::<VulkanBuffer>() else {
            engine_bail!(SOURCE, "Buffer was not created by the Vulkan backend");
        };
        let command_buffer = self.recording_buffer()?;

        if let Some(stride) = self.bound_pipeline.and_then(|bound| bound.vertex_stride) {
            if stride != vertex_stride {
                engine_warn!(
                    SOURCE,
                    "Vertex stride {} differs from the {} bytes the bound pipeline was built for",
                    vertex_stride,
                    stride
                );
            }
        }

        unsafe {
            self.ctx
                .device
                .cmd_bind_vertex_buffers(command_buffer, 0, &[buffer.buffer], &[0]);
        }
        Ok(())
    }

    fn bind_index_buffer(&mut self, buffer: &dyn Buffer, stride: IndexBufferStride) -> Result<()> {
        let Some(buffer) = buffer.downcast_ref::<VulkanBuffer>() else {
            engine_bail!(SOURCE, "Buffer was not created by the Vulkan backend");
        };
        let command_buffer = self.recording_buffer()?;

        unsafe {
            self.ctx
                .device
                .cmd_bind_index_buffer(command_buffer, buffer.buffer, 0, index_type(stride));
        }
        Ok(())
    }

    fn bind_descriptors(
        &mut self,
        pipeline: &dyn RasterizingPipeline,
        descriptors: &[(DescriptorType, &dyn Descriptor)],
    ) -> Result<()> {
        let Some(pipeline) = pipeline.as_any().downcast_ref::<VulkanRasterizingPipeline>() else {
            engine_bail!(SOURCE, "Pipeline was not created by the Vulkan backend");
        };
        let command_buffer = self.recording_buffer()?;
        let mut bound = self.bound_pipeline(vk::PipelineBindPoint::GRAPHICS)?;
        bound.layout = pipeline.layout.layout;
        self.bind_descriptor_sets(command_buffer, bound, descriptors)
    }

    fn set_viewport(&mut self, value: Viewport) -> Result<()> {
        let command_buffer = self.recording_buffer()?;
        unsafe {
            self.ctx.device.cmd_set_viewport(command_buffer, 0, &[viewport(value)]);
        }
        Ok(())
    }

    fn set_scissor(&mut self, scissor: Rect2D) -> Result<()> {
        let command_buffer = self.recording_buffer()?;
        unsafe {
            self.ctx.device.cmd_set_scissor(command_buffer, 0, &[rect(scissor)]);
        }
        Ok(())
    }

    fn draw_indexed(
        &mut self,
        vertex_offset: u64,
        index_offset: u64,
        index_count: u64,
        instance_count: u32,
        first_instance: u32,
    ) -> Result<()> {
        let command_buffer = self.render_pass_buffer()?;
        self.bound_pipeline(vk::PipelineBindPoint::GRAPHICS)?;

        let (Ok(vertex_offset), Ok(first_index), Ok(index_count)) = (
            i32::try_from(vertex_offset),
            u32::try_from(index_offset),
            u32::try_from(index_count),
        ) else {
            engine_bail!(
                SOURCE,
                "Draw parameters out of range (vertex offset {}, index offset {}, index count {})",
                vertex_offset,
                index_offset,
                index_count
            );
        };

        unsafe {
            self.ctx.device.cmd_draw_indexed(
                command_buffer,
                index_count,
                instance_count,
                first_index,
                vertex_offset,
                first_instance,
            );
        }
        Ok(())
    }

    fn end_rasterizer(&mut self) -> Result<()> {
        let command_buffer = self.render_pass_buffer()?;
        unsafe {
            self.ctx.device.cmd_end_render_pass(command_buffer);
        }
        self.in_render_pass = false;
        Ok(())
    }

    fn bind_compute_pipeline(&mut self, pipeline: &dyn ComputePipeline, descriptor: Option<&dyn Descriptor>) -> Result<()> {
        let Some(pipeline) = pipeline.as_any().downcast_ref::<VulkanComputePipeline>() else {
            engine_bail!(SOURCE, "Pipeline was not created by the Vulkan backend");
        };
        let command_buffer = self.outside_render_pass_buffer()?;

        unsafe {
            self.ctx.device.cmd_bind_pipeline(
                command_buffer,
                vk::PipelineBindPoint::COMPUTE,
                pipeline.pipeline.pipeline,
            );
        }
        let bound = BoundPipeline {
            layout: pipeline.layout.layout,
            bind_point: vk::PipelineBindPoint::COMPUTE,
            vertex_stride: None,
        };
        self.bound_pipeline = Some(bound);

        if let Some(descriptor) = descriptor {
            let descriptor_type = descriptor.descriptor_type();
            self.bind_descriptor_sets(command_buffer, bound, &[(descriptor_type, descriptor)])?;
        }
        Ok(())
    }

    fn dispatch(&mut self, group_count_x: u32, group_count_y: u32, group_count_z: u32) -> Result<()> {
        let command_buffer = self.outside_render_pass_buffer()?;
        self.bound_pipeline(vk::PipelineBindPoint::COMPUTE)?;

        unsafe {
            self.ctx
                .device
                .cmd_dispatch(command_buffer, group_count_x, group_count_y, group_count_z);
        }
        Ok(())
    }

    fn trace_rays(
        &mut self,
        pipeline: &dyn RayTracingPipeline,
        ray_tracer: &dyn RayTracer,
        descriptors: &[(DescriptorType, &dyn Descriptor)],
    ) -> Result<()> {
        let Some(pipeline) = pipeline.as_any().downcast_ref::<VulkanRayTracingPipeline>() else {
            engine_bail!(SOURCE, "Pipeline was not created by the Vulkan backend");
        };
        let Some(ray_tracer) = ray_tracer.downcast_ref::<VulkanRayTracer>() else {
            engine_bail!(SOURCE, "Ray tracer was not created by the Vulkan backend");
        };
        let command_buffer = self.outside_render_pass_buffer()?;
        let ray_tracing = self.ctx.ray_tracing()?;

        ray_tracer
            .storage_image()
            .record_transition(command_buffer, vk::ImageLayout::GENERAL);

        let bound = BoundPipeline {
            layout: pipeline.layout.layout,
            bind_point: vk::PipelineBindPoint::RAY_TRACING_KHR,
            vertex_stride: None,
        };
        unsafe {
            self.ctx.device.cmd_bind_pipeline(
                command_buffer,
                vk::PipelineBindPoint::RAY_TRACING_KHR,
                pipeline.pipeline.pipeline,
            );
        }
        self.bound_pipeline = Some(bound);
        self.bind_descriptor_sets(command_buffer, bound, descriptors)?;

        let [raygen, miss, hit, callable] = pipeline.regions();
        unsafe {
            ray_tracing.pipeline.cmd_trace_rays(
                command_buffer,
                &raygen,
                &miss,
                &hit,
                &callable,
                ray_tracer.width(),
                ray_tracer.height(),
                1,
            );
        }
        Ok(())
    }

    fn reset_query(&mut self, query: &dyn OcclusionQuery) -> Result<()> {
        let query = Self::query(query)?;
        let command_buffer = self.outside_render_pass_buffer()?;
        unsafe {
            self.ctx
                .device
                .cmd_reset_query_pool(command_buffer, query.pool, 0, query.sample_count() as u32);
        }
        Ok(())
    }

    fn begin_query(&mut self, query: &dyn OcclusionQuery, index: u32) -> Result<()> {
        let query = Self::query(query)?;
        let command_buffer = self.recording_buffer()?;
        query.check_index(index)?;
        unsafe {
            self.ctx
                .device
                .cmd_begin_query(command_buffer, query.pool, index, query.control_flags());
        }
        Ok(())
    }

    fn end_query(&mut self, query: &dyn OcclusionQuery, index: u32) -> Result<()> {
        let query = Self::query(query)?;
        let command_buffer = self.recording_buffer()?;
        query.check_index(index)?;
        unsafe {
            self.ctx.device.cmd_end_query(command_buffer, query.pool, index);
        }
        Ok(())
    }

    fn resolve_query(&mut self, query: &dyn OcclusionQuery) -> Result<()> {
        let query = Self::query(query)?;
        let command_buffer = self.outside_render_pass_buffer()?;
        query.record_resolve(command_buffer);
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl Drop for VulkanCommandRecorder {
    fn drop(&mut self) {
        for slot in &mut self.slots {
            let submission = slot.submission.get_mut().ok().and_then(Option::take);
            if let Some((fence, epoch)) = submission {
                if fence.wait_for(epoch, Duration::MAX).is_err() {
                    engine_warn!(SOURCE, "Failed to wait for a submitted command buffer before destroying it");
                }
            }
        }

        unsafe {
            for slot in &self.slots {
                self.ctx.device.destroy_semaphore(slot.signal, None);
            }
            // Frees every command buffer allocated from it
            self.ctx.device.destroy_command_pool(self.command_pool, None);
        }
    }
}
