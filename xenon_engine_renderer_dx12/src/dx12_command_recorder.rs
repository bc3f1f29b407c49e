/// Dx12CommandRecorder - Direct3D 12 implementation of the CommandRecorder trait
///
/// Records into a ring of direct command lists, each with its own allocator.
/// A list remembers the fence value of the submission it was part of so
/// `begin` can wait for its previous use before resetting the allocator.
///
/// Every usage records direct lists: the engine submits everything on the
/// direct queue, and bundles cannot hold the barriers transfers need.

use std::any::Any;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use windows::Win32::Foundation::RECT;
use windows::Win32::Graphics::Direct3D12::*;
use xenon_engine::xenon::backend::{
    default_clear_values, Buffer, ClearValue, CommandRecorder, CommandRecorderUsage, ComputePipeline, Descriptor,
    DescriptorType, Image, IndexBufferStride, MultiSamplingCount, OcclusionQuery, Rasterizer, RasterizingPipeline,
    RayTracer, RayTracingPipeline, Rect2D, Swapchain, VertexSpecification, Viewport,
};
use xenon_engine::xenon::{Error, Result};
use xenon_engine::{engine_bail, engine_debug, engine_err, engine_warn};

use crate::dx12_barrier::ImageState;
use crate::dx12_buffer::Dx12Buffer;
use crate::dx12_command_submitter::SubmitFence;
use crate::dx12_compute_pipeline::Dx12ComputePipeline;
use crate::dx12_context::{transition_barrier, GpuContext};
use crate::dx12_conversions::{index_format, rect, viewport};
use crate::dx12_descriptor::Dx12Descriptor;
use crate::dx12_image::{subresource_location, Dx12Image};
use crate::dx12_query::Dx12OcclusionQuery;
use crate::dx12_rasterizer::{Dx12Rasterizer, RasterizerFrame};
use crate::dx12_rasterizing_pipeline::Dx12RasterizingPipeline;
use crate::dx12_root_signature::Dx12PipelineLayout;
use crate::dx12_swapchain::Dx12Swapchain;

const SOURCE: &str = "xenon::dx12::CommandRecorder";

/// Record into the caller's recorder, or into the one-shot list that is
/// submitted and waited for when there is none
pub(crate) fn record_or_submit<F>(ctx: &GpuContext, recorder: Option<&mut dyn CommandRecorder>, record: F) -> Result<()>
where
    F: FnOnce(&ID3D12GraphicsCommandList) -> Result<()>,
{
    match recorder {
        Some(recorder) => {
            let Some(recorder) = recorder.downcast_mut::<Dx12CommandRecorder>() else {
                engine_bail!(SOURCE, "Recorder was not created by the Direct3D 12 backend");
            };
            let list = recorder.recording_list()?;
            record(list)
        }
        None => ctx.execute_one_shot(record),
    }
}

/// One command list of the ring
struct RecorderSlot {
    allocator: ID3D12CommandAllocator,
    list: ID3D12GraphicsCommandList,
    /// Fence and value of the submission the list was last part of
    submission: Mutex<Option<(Arc<SubmitFence>, u64)>>,
    /// Objects referenced by the recorded commands
    retained: Vec<Arc<dyn Any + Send + Sync>>,
    recording: bool,
    recorded: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BindPoint {
    Graphics,
    Compute,
}

/// What the last bound pipeline needs for descriptor binds
#[derive(Clone)]
struct BoundPipeline {
    layout: Arc<Dx12PipelineLayout>,
    bind_point: BindPoint,
    vertex_stride: Option<u32>,
}

/// Direct3D 12 command recorder implementation
pub struct Dx12CommandRecorder {
    ctx: Arc<GpuContext>,
    usage: CommandRecorderUsage,
    slots: Vec<RecorderSlot>,
    current: usize,
    /// Frame of the rasterizer bound between `bind_rasterizer` and `end_rasterizer`
    frame: Option<Arc<RasterizerFrame>>,
    bound_pipeline: Option<BoundPipeline>,
}

impl Dx12CommandRecorder {
    pub(crate) fn new(ctx: Arc<GpuContext>, usage: CommandRecorderUsage, buffer_count: u32) -> Result<Self> {
        let buffer_count = buffer_count.max(1);
        let mut slots = Vec::with_capacity(buffer_count as usize);

        for _ in 0..buffer_count {
            unsafe {
                let allocator: ID3D12CommandAllocator = ctx
                    .device
                    .CreateCommandAllocator(D3D12_COMMAND_LIST_TYPE_DIRECT)
                    .map_err(|e| engine_err!(SOURCE, "Failed to create command allocator: {:?}", e))?;
                let list: ID3D12GraphicsCommandList = ctx
                    .device
                    .CreateCommandList(0, D3D12_COMMAND_LIST_TYPE_DIRECT, &allocator, None::<&ID3D12PipelineState>)
                    .map_err(|e| engine_err!(SOURCE, "Failed to create command list: {:?}", e))?;
                // Lists are created recording; `begin` resets them
                list.Close()
                    .map_err(|e| engine_err!(SOURCE, "Failed to close command list: {:?}", e))?;
                slots.push(RecorderSlot {
                    allocator,
                    list,
                    submission: Mutex::new(None),
                    retained: Vec::new(),
                    recording: false,
                    recorded: false,
                });
            }
        }

        Ok(Self { ctx, usage, slots, current: 0, frame: None, bound_pipeline: None })
    }

    fn slot(&self) -> &RecorderSlot {
        &self.slots[self.current]
    }

    /// List being recorded, or an error outside `begin`/`end`
    pub(crate) fn recording_list(&self) -> Result<&ID3D12GraphicsCommandList> {
        let slot = self.slot();
        if !slot.recording {
            engine_bail!(SOURCE, "Command recorder is not recording");
        }
        Ok(&slot.list)
    }

    fn render_pass_list(&self) -> Result<&ID3D12GraphicsCommandList> {
        let list = self.recording_list()?;
        if self.frame.is_none() {
            engine_bail!(SOURCE, "Not inside a render pass");
        }
        Ok(list)
    }

    fn outside_render_pass_list(&self) -> Result<&ID3D12GraphicsCommandList> {
        let list = self.recording_list()?;
        if self.frame.is_some() {
            engine_bail!(SOURCE, "Command must be recorded outside a render pass");
        }
        Ok(list)
    }

    /// List to hand to the queue: recorded and not being recorded
    pub(crate) fn submittable_list(&self) -> Result<&ID3D12GraphicsCommandList> {
        let slot = self.slot();
        if slot.recording || !slot.recorded {
            engine_bail!(SOURCE, "Command recorder has nothing recorded to submit (call begin/end first)");
        }
        Ok(&slot.list)
    }

    pub(crate) fn mark_submitted(&self, fence: &Arc<SubmitFence>, value: u64) {
        if let Ok(mut submission) = self.slot().submission.lock() {
            *submission = Some((Arc::clone(fence), value));
        }
    }

    fn retain(&mut self, object: Arc<dyn Any + Send + Sync>) {
        self.slots[self.current].retained.push(object);
    }

    fn bound_pipeline(&self, bind_point: BindPoint) -> Result<BoundPipeline> {
        match &self.bound_pipeline {
            Some(bound) if bound.bind_point == bind_point => Ok(bound.clone()),
            _ => engine_bail!(SOURCE, "No {:?} pipeline is bound", bind_point),
        }
    }

    /// Set the root tables of every descriptor
    ///
    /// A descriptor can be bound with any pipeline whose root layout has the
    /// same tables for its class.
    fn bind_descriptor_tables(
        list: &ID3D12GraphicsCommandList,
        bound: &BoundPipeline,
        descriptors: &[(DescriptorType, &dyn Descriptor)],
    ) -> Result<()> {
        for (descriptor_type, descriptor) in descriptors {
            let Some(descriptor) = descriptor.downcast_ref::<Dx12Descriptor>() else {
                engine_bail!(SOURCE, "Descriptor was not created by the Direct3D 12 backend");
            };
            if descriptor.descriptor_type() != *descriptor_type {
                engine_bail!(
                    SOURCE,
                    "A {:?} descriptor cannot be bound as {:?}",
                    descriptor.descriptor_type(),
                    descriptor_type
                );
            }

            let tables = bound.layout.root_layout().class(*descriptor_type);
            if descriptor.layout().root_layout().class(*descriptor_type) != tables {
                engine_bail!(
                    SOURCE,
                    "The {:?} descriptor was laid out for a different pipeline",
                    descriptor_type
                );
            }

            let (resources, samplers) = descriptor.table_handles();
            let parameters = [
                tables.resources.as_ref().zip(resources),
                tables.samplers.as_ref().zip(samplers),
            ];
            for (table, handle) in parameters.into_iter().flatten() {
                unsafe {
                    match bound.bind_point {
                        BindPoint::Graphics => list.SetGraphicsRootDescriptorTable(table.parameter, handle),
                        BindPoint::Compute => list.SetComputeRootDescriptorTable(table.parameter, handle),
                    }
                }
            }
        }
        Ok(())
    }

    fn query<'a>(query: &'a dyn OcclusionQuery) -> Result<&'a Dx12OcclusionQuery> {
        match query.downcast_ref::<Dx12OcclusionQuery>() {
            Some(query) => Ok(query),
            None => engine_bail!(SOURCE, "Query was not created by the Direct3D 12 backend"),
        }
    }
}

impl CommandRecorder for Dx12CommandRecorder {
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
        let slot = &mut self.slots[self.current];
        if slot.recording {
            engine_bail!(SOURCE, "Command recorder is already recording");
        }

        let submission = slot
            .submission
            .get_mut()
            .map_err(|_| Error::BackendError("Recorder submission lock poisoned".to_string()))?
            .take();
        if let Some((fence, value)) = submission {
            fence.wait_for(value, Duration::MAX)?;
        }
        slot.retained.clear();

        unsafe {
            slot.allocator
                .Reset()
                .map_err(|e| engine_err!(SOURCE, "Failed to reset command allocator: {:?}", e))?;
            slot.list
                .Reset(&slot.allocator, None::<&ID3D12PipelineState>)
                .map_err(|e| engine_err!(SOURCE, "Failed to reset command list: {:?}", e))?;

            // Every descriptor table lives in the two device heaps
            let heaps = [Some(self.ctx.resource_heap.heap.clone()), Some(self.ctx.sampler_heap.heap.clone())];
            slot.list.SetDescriptorHeaps(&heaps);
        }

        slot.recording = true;
        slot.recorded = false;
        self.frame = None;
        self.bound_pipeline = None;
        Ok(())
    }

    fn end(&mut self) -> Result<()> {
        let list = self.recording_list()?;
        if self.frame.is_some() {
            engine_bail!(SOURCE, "Render pass not ended before ending the command recorder");
        }

        unsafe { list.Close() }.map_err(|e| engine_err!(SOURCE, "Failed to close command list: {:?}", e))?;

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
        let (Some(src), Some(dst)) = (src.downcast_ref::<Dx12Buffer>(), dst.downcast_ref::<Dx12Buffer>()) else {
            engine_bail!(SOURCE, "Buffers were not created by the Direct3D 12 backend");
        };
        let list = self.outside_render_pass_list()?;
        dst.record_copy(list, src, size, src_offset, dst_offset)
    }

    fn copy_to_swapchain(&mut self, image: &dyn Image, swapchain: &dyn Swapchain) -> Result<()> {
        let Some(image) = image.downcast_ref::<Dx12Image>() else {
            engine_bail!(SOURCE, "Image was not created by the Direct3D 12 backend");
        };
        let Some(swapchain) = swapchain.downcast_ref::<Dx12Swapchain>() else {
            engine_bail!(SOURCE, "Swapchain was not created by the Direct3D 12 backend");
        };
        let list = self.outside_render_pass_list()?;
        if !swapchain.is_renderable() {
            return Ok(());
        }
        let Some(back_buffer) = swapchain.current_buffer() else {
            engine_bail!(SOURCE, "Swapchain has no back buffer (call prepare first)");
        };

        let src_spec = image.specification();
        if src_spec.multi_sampling_count != MultiSamplingCount::X1 {
            engine_bail!(SOURCE, "Multisampled images cannot be copied to the swapchain, copy the resolve target");
        }
        if src_spec.format != swapchain.format() {
            engine_bail!(
                SOURCE,
                "A {:?} image cannot be copied to the {:?} swapchain",
                src_spec.format,
                swapchain.format()
            );
        }

        // Copies do not scale: the overlapping region is copied
        let width = src_spec.width.min(swapchain.width());
        let height = src_spec.height.min(swapchain.height());
        if (width, height) != (swapchain.width(), swapchain.height()) {
            engine_debug!(
                SOURCE,
                "Copying a {}x{} image to a {}x{} swapchain, only {}x{} is covered",
                src_spec.width,
                src_spec.height,
                swapchain.width(),
                swapchain.height(),
                width,
                height
            );
        }

        image.record_transition(list, ImageState::CopySource);
        let to_copy = transition_barrier(
            back_buffer,
            D3D12_RESOURCE_BARRIER_ALL_SUBRESOURCES,
            ImageState::Present.bits(),
            ImageState::CopyDestination.bits(),
        );
        let src_box = D3D12_BOX { left: 0, top: 0, front: 0, right: width, bottom: height, back: 1 };
        let dst = subresource_location(back_buffer, 0);
        let src = subresource_location(&image.resource, 0);
        let to_present = transition_barrier(
            back_buffer,
            D3D12_RESOURCE_BARRIER_ALL_SUBRESOURCES,
            ImageState::CopyDestination.bits(),
            ImageState::Present.bits(),
        );
        unsafe {
            list.ResourceBarrier(&[to_copy]);
            list.CopyTextureRegion(&dst, 0, 0, 0, &src, Some(&src_box as *const _));
            list.ResourceBarrier(&[to_present]);
        }
        image.record_transition(list, image.resting_state());
        Ok(())
    }

    fn bind_rasterizer(&mut self, rasterizer: &dyn Rasterizer, clear_values: &[ClearValue]) -> Result<()> {
        let Some(rasterizer) = rasterizer.downcast_ref::<Dx12Rasterizer>() else {
            engine_bail!(SOURCE, "Rasterizer was not created by the Direct3D 12 backend");
        };
        let list = self.outside_render_pass_list()?;

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
        let clear_values: Vec<ClearValue> = defaults
            .iter()
            .enumerate()
            .map(|(i, default)| *clear_values.get(i).unwrap_or(default))
            .collect();

        let frame = rasterizer.begin_frame(list, &clear_values)?;

        // Viewport and scissor default to the full target
        let full_viewport = D3D12_VIEWPORT {
            TopLeftX: 0.0,
            TopLeftY: 0.0,
            Width: rasterizer.width() as f32,
            Height: rasterizer.height() as f32,
            MinDepth: 0.0,
            MaxDepth: 1.0,
        };
        let full_scissor = RECT { left: 0, top: 0, right: rasterizer.width() as i32, bottom: rasterizer.height() as i32 };
        unsafe {
            list.RSSetViewports(&[full_viewport]);
            list.RSSetScissorRects(&[full_scissor]);
        }

        self.retain(Arc::clone(&frame) as Arc<dyn Any + Send + Sync>);
        self.frame = Some(frame);
        Ok(())
    }

    fn bind_rasterizing_pipeline(
        &mut self,
        pipeline: &dyn RasterizingPipeline,
        vertex_specification: &VertexSpecification,
    ) -> Result<()> {
        let Some(pipeline) = pipeline.as_any().downcast_ref::<Dx12RasterizingPipeline>() else {
            engine_bail!(SOURCE, "Pipeline was not created by the Direct3D 12 backend");
        };
        let list = self.recording_list()?;
        let specialization = pipeline.specialization(vertex_specification)?;

        unsafe {
            list.SetGraphicsRootSignature(&pipeline.layout.root_signature);
            list.SetPipelineState(&specialization.pipeline().state);
            list.IASetPrimitiveTopology(pipeline.topology);
            list.OMSetBlendFactor(Some(&pipeline.blend_constants()));
        }

        self.bound_pipeline = Some(BoundPipeline {
            layout: Arc::clone(&pipeline.layout),
            bind_point: BindPoint::Graphics,
            vertex_stride: specialization.input().bindings.first().map(|binding| binding.stride),
        });
        self.retain(Arc::clone(&pipeline.layout) as Arc<dyn Any + Send + Sync>);
        self.retain(specialization as Arc<dyn Any + Send + Sync>);
        Ok(())
    }

    fn bind_vertex_buffer(&mut self, buffer: &dyn Buffer, vertex_stride: u32) -> Result<()> {
        let Some(buffer) = buffer.downcast_ref::<Dx12Buffer>() else {
            engine_bail!(SOURCE, "Buffer was not created by the Direct3D 12 backend");
        };
        let list = self.recording_list()?;

        if let Some(stride) = self.bound_pipeline.as_ref().and_then(|bound| bound.vertex_stride) {
            if stride != vertex_stride {
                engine_warn!(
                    SOURCE,
                    "Vertex stride {} differs from the {} bytes the bound pipeline was built for",
                    vertex_stride,
                    stride
                );
            }
        }

        let Ok(size) = u32::try_from(buffer.size()) else {
            engine_bail!(SOURCE, "A {} byte buffer is too large for a vertex buffer view", buffer.size());
        };
        let view = D3D12_VERTEX_BUFFER_VIEW {
            BufferLocation: buffer.gpu_address(),
            SizeInBytes: size,
            StrideInBytes: vertex_stride,
        };
        unsafe { list.IASetVertexBuffers(0, Some(std::slice::from_ref(&view))) };
        Ok(())
    }

    fn bind_index_buffer(&mut self, buffer: &dyn Buffer, stride: IndexBufferStride) -> Result<()> {
        let Some(buffer) = buffer.downcast_ref::<Dx12Buffer>() else {
            engine_bail!(SOURCE, "Buffer was not created by the Direct3D 12 backend");
        };
        let list = self.recording_list()?;

        let Ok(size) = u32::try_from(buffer.size()) else {
            engine_bail!(SOURCE, "A {} byte buffer is too large for an index buffer view", buffer.size());
        };
        let view = D3D12_INDEX_BUFFER_VIEW {
            BufferLocation: buffer.gpu_address(),
            SizeInBytes: size,
            Format: index_format(stride),
        };
        unsafe { list.IASetIndexBuffer(Some(&view as *const _)) };
        Ok(())
    }

    fn bind_descriptors(
        &mut self,
        pipeline: &dyn RasterizingPipeline,
        descriptors: &[(DescriptorType, &dyn Descriptor)],
    ) -> Result<()> {
        let Some(pipeline) = pipeline.as_any().downcast_ref::<Dx12RasterizingPipeline>() else {
            engine_bail!(SOURCE, "Pipeline was not created by the Direct3D 12 backend");
        };
        let list = self.recording_list()?;
        let mut bound = self.bound_pipeline(BindPoint::Graphics)?;
        if !Arc::ptr_eq(&bound.layout, &pipeline.layout) {
            // Root tables are only valid for the root signature they were set with
            unsafe { list.SetGraphicsRootSignature(&pipeline.layout.root_signature) };
            bound.layout = Arc::clone(&pipeline.layout);
        }
        Self::bind_descriptor_tables(list, &bound, descriptors)
    }

    fn set_viewport(&mut self, value: Viewport) -> Result<()> {
        let list = self.recording_list()?;
        unsafe { list.RSSetViewports(&[viewport(value)]) };
        Ok(())
    }

    fn set_scissor(&mut self, scissor: Rect2D) -> Result<()> {
        let list = self.recording_list()?;
        unsafe { list.RSSetScissorRects(&[rect(scissor)]) };
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
        let list = self.render_pass_list()?;
        self.bound_pipeline(BindPoint::Graphics)?;

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

        unsafe { list.DrawIndexedInstanced(index_count, instance_count, first_index, vertex_offset, first_instance) };
        Ok(())
    }

    fn end_rasterizer(&mut self) -> Result<()> {
        let list = self.render_pass_list()?;
        if let Some(frame) = &self.frame {
            frame.end(list);
        }
        self.frame = None;
        Ok(())
    }

    fn bind_compute_pipeline(&mut self, pipeline: &dyn ComputePipeline, descriptor: Option<&dyn Descriptor>) -> Result<()> {
        let Some(pipeline) = pipeline.as_any().downcast_ref::<Dx12ComputePipeline>() else {
            engine_bail!(SOURCE, "Pipeline was not created by the Direct3D 12 backend");
        };
        let list = self.outside_render_pass_list()?;

        unsafe {
            list.SetComputeRootSignature(&pipeline.layout.root_signature);
            list.SetPipelineState(&pipeline.pipeline.state);
        }
        let bound = BoundPipeline {
            layout: Arc::clone(&pipeline.layout),
            bind_point: BindPoint::Compute,
            vertex_stride: None,
        };

        if let Some(descriptor) = descriptor {
            let descriptor_type = descriptor.descriptor_type();
            Self::bind_descriptor_tables(list, &bound, &[(descriptor_type, descriptor)])?;
        }

        let state: Arc<dyn Any + Send + Sync> = Arc::new(pipeline.pipeline.state.clone());
        self.retain(state);
        self.retain(Arc::clone(&pipeline.layout) as Arc<dyn Any + Send + Sync>);
        self.bound_pipeline = Some(bound);
        Ok(())
    }

    fn dispatch(&mut self, group_count_x: u32, group_count_y: u32, group_count_z: u32) -> Result<()> {
        let list = self.outside_render_pass_list()?;
        self.bound_pipeline(BindPoint::Compute)?;
        unsafe { list.Dispatch(group_count_x, group_count_y, group_count_z) };
        Ok(())
    }

    fn trace_rays(
        &mut self,
        _pipeline: &dyn RayTracingPipeline,
        _ray_tracer: &dyn RayTracer,
        _descriptors: &[(DescriptorType, &dyn Descriptor)],
    ) -> Result<()> {
        self.outside_render_pass_list()?;
        engine_bail!(SOURCE, "Ray tracing is not supported by the Direct3D 12 backend");
    }

    fn reset_query(&mut self, query: &dyn OcclusionQuery) -> Result<()> {
        Self::query(query)?;
        // Query heaps need no reset: `BeginQuery` restarts the count
        self.outside_render_pass_list()?;
        Ok(())
    }

    fn begin_query(&mut self, query: &dyn OcclusionQuery, index: u32) -> Result<()> {
        let query = Self::query(query)?;
        let list = self.recording_list()?;
        query.check_index(index)?;
        unsafe { list.BeginQuery(&query.heap, D3D12_QUERY_TYPE_OCCLUSION, index) };
        Ok(())
    }

    fn end_query(&mut self, query: &dyn OcclusionQuery, index: u32) -> Result<()> {
        let query = Self::query(query)?;
        let list = self.recording_list()?;
        query.check_index(index)?;
        unsafe { list.EndQuery(&query.heap, D3D12_QUERY_TYPE_OCCLUSION, index) };
        Ok(())
    }

    fn resolve_query(&mut self, query: &dyn OcclusionQuery) -> Result<()> {
        let query = Self::query(query)?;
        let list = self.outside_render_pass_list()?;
        query.record_resolve(list);
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl Drop for Dx12CommandRecorder {
    fn drop(&mut self) {
        for slot in &mut self.slots {
            let submission = slot.submission.get_mut().ok().and_then(Option::take);
            if let Some((fence, value)) = submission {
                if fence.wait_for(value, Duration::MAX).is_err() {
                    engine_warn!(SOURCE, "Failed to wait for a submitted command list before destroying it");
                }
            }
        }
    }
}
