/// Command recording and submission
///
/// `CommandRecorder` records into a ring of backend command buffers.
/// `CommandSubmitter` submits batches of recorders; the synchronization it
/// builds is planned here by `plan_submission`, independent of the backend.

use std::any::Any;
use std::time::Duration;

use crate::backend::buffer::Buffer;
use crate::backend::descriptor::Descriptor;
use crate::backend::image::Image;
use crate::backend::pipeline::{ComputePipeline, RasterizingPipeline, RayTracingPipeline};
use crate::backend::query::OcclusionQuery;
use crate::backend::rasterizer::Rasterizer;
use crate::backend::ray_tracing::RayTracer;
use crate::backend::swapchain::Swapchain;
use crate::backend::types::{
    ClearValue, CommandRecorderUsage, DescriptorType, IndexBufferStride, PipelineStage, Rect2D, Viewport,
};
use crate::backend::vertex::VertexSpecification;
use crate::error::Result;

// ===== RECORDER =====

/// Records GPU commands into the current buffer of its ring
///
/// `next()` advances the ring (double/triple buffering); every method records
/// into the buffer selected by the last `next()`.
pub trait CommandRecorder: Send + Sync {
    fn usage(&self) -> CommandRecorderUsage;

    /// Number of command buffers in the ring
    fn buffer_count(&self) -> u32;

    /// Index of the buffer currently recorded into
    fn current_index(&self) -> u32;

    /// Advance to the next buffer of the ring
    fn next(&mut self);

    /// Begin recording, waiting for the previous use of the buffer if needed
    fn begin(&mut self) -> Result<()>;

    fn end(&mut self) -> Result<()>;

    fn copy_buffer(
        &mut self,
        src: &dyn Buffer,
        src_offset: u64,
        dst: &dyn Buffer,
        dst_offset: u64,
        size: u64,
    ) -> Result<()>;

    /// Copy an image (e.g. a rasterizer attachment) to the swapchain's current image
    fn copy_to_swapchain(&mut self, image: &dyn Image, swapchain: &dyn Swapchain) -> Result<()>;

    /// Begin the rasterizer's render pass, clearing attachments in `AttachmentType::COLOR_ORDER` then depth
    fn bind_rasterizer(&mut self, rasterizer: &dyn Rasterizer, clear_values: &[ClearValue]) -> Result<()>;

    /// Bind the specialization of `pipeline` for a vertex layout, building it if needed
    fn bind_rasterizing_pipeline(
        &mut self,
        pipeline: &dyn RasterizingPipeline,
        vertex_specification: &VertexSpecification,
    ) -> Result<()>;

    fn bind_vertex_buffer(&mut self, buffer: &dyn Buffer, vertex_stride: u32) -> Result<()>;

    fn bind_index_buffer(&mut self, buffer: &dyn Buffer, stride: IndexBufferStride) -> Result<()>;

    /// Bind one descriptor per class for the pipeline bound last
    fn bind_descriptors(
        &mut self,
        pipeline: &dyn RasterizingPipeline,
        descriptors: &[(DescriptorType, &dyn Descriptor)],
    ) -> Result<()>;

    fn set_viewport(&mut self, viewport: Viewport) -> Result<()>;

    fn set_scissor(&mut self, scissor: Rect2D) -> Result<()>;

    fn draw_indexed(
        &mut self,
        vertex_offset: u64,
        index_offset: u64,
        index_count: u64,
        instance_count: u32,
        first_instance: u32,
    ) -> Result<()>;

    /// End the render pass begun by `bind_rasterizer`
    fn end_rasterizer(&mut self) -> Result<()>;

    fn bind_compute_pipeline(&mut self, pipeline: &dyn ComputePipeline, descriptor: Option<&dyn Descriptor>) -> Result<()>;

    fn dispatch(&mut self, group_count_x: u32, group_count_y: u32, group_count_z: u32) -> Result<()>;

    /// Trace rays over the ray tracer's whole extent
    fn trace_rays(
        &mut self,
        pipeline: &dyn RayTracingPipeline,
        ray_tracer: &dyn RayTracer,
        descriptors: &[(DescriptorType, &dyn Descriptor)],
    ) -> Result<()>;

    /// Reset every sample of a query; must be recorded outside a render pass
    fn reset_query(&mut self, query: &dyn OcclusionQuery) -> Result<()>;

    fn begin_query(&mut self, query: &dyn OcclusionQuery, index: u32) -> Result<()>;

    fn end_query(&mut self, query: &dyn OcclusionQuery, index: u32) -> Result<()>;

    /// Make the query's samples available to `OcclusionQuery::samples`
    fn resolve_query(&mut self, query: &dyn OcclusionQuery) -> Result<()>;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl dyn CommandRecorder + '_ {
    pub fn downcast_ref<T: CommandRecorder + 'static>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    pub fn downcast_mut<T: CommandRecorder + 'static>(&mut self) -> Option<&mut T> {
        self.as_any_mut().downcast_mut::<T>()
    }
}

// ===== SUBMITTER =====

/// Submits batches of recorders and tracks their completion with one fence
///
/// Within one `submit`, batch N never starts before every recorder of batch
/// N-1 signalled. Nothing is ordered across separate `submit` calls beyond
/// what the caller builds with `wait`.
pub trait CommandSubmitter: Send + Sync {
    /// Submit `batches` in order, synchronizing with `swapchain` when it is renderable
    fn submit(&mut self, batches: &[&[&dyn CommandRecorder]], swapchain: Option<&dyn Swapchain>) -> Result<()>;

    /// Block until the last submission completed, then reset the fence
    ///
    /// Returns immediately when nothing is outstanding.
    fn wait(&mut self, timeout: Duration) -> Result<()>;

    /// Whether a submission is outstanding
    fn is_waiting(&self) -> bool;

    /// `wait` without a timeout
    fn wait_idle(&mut self) -> Result<()> {
        self.wait(Duration::MAX)
    }
}

/// Timeout in nanoseconds, saturating `Duration::MAX` to "forever"
pub fn timeout_nanos(timeout: Duration) -> u64 {
    u64::try_from(timeout.as_nanos()).unwrap_or(u64::MAX)
}

// ===== SUBMISSION PLANNING =====

/// A synchronization primitive referenced by a submission plan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyncPrimitive {
    /// Swapchain image became available
    ImageAcquired,
    /// Swapchain image may be presented
    RenderFinished,
    /// Signal of one recorder's current command buffer
    Recorder { batch: usize, index: usize },
}

/// One wait of a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubmissionWait {
    pub primitive: SyncPrimitive,
    pub stage: PipelineStage,
}

/// Submission descriptor of one batch
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BatchPlan {
    /// Index of the batch in the submitted list
    pub batch: usize,
    /// Number of recorders submitted together
    pub recorder_count: usize,
    pub waits: Vec<SubmissionWait>,
    pub signals: Vec<SyncPrimitive>,
}

/// Plan the synchronization of one `submit` call
///
/// `batches` holds the wait stage of every recorder, batch by batch.
///
/// - each batch signals one primitive per recorder;
/// - each batch after the first waits on every signal of the previous one,
///   at the stage of the recorder that signals it;
/// - with a renderable swapchain the first batch also waits for the image
///   (at color attachment output) and the last batch signals only the
///   render-finished primitive.
///
/// Empty batches are skipped so they never break the chain.
pub fn plan_submission(batches: &[Vec<PipelineStage>], swapchain_renderable: bool) -> Vec<BatchPlan> {
    let mut plans: Vec<BatchPlan> = Vec::with_capacity(batches.len());

    for (batch, stages) in batches.iter().enumerate() {
        if stages.is_empty() {
            continue;
        }

        let waits = match plans.last() {
            Some(previous) => previous
                .signals
                .iter()
                .zip(&batches[previous.batch])
                .map(|(primitive, stage)| SubmissionWait { primitive: *primitive, stage: *stage })
                .collect(),
            None if swapchain_renderable => vec![SubmissionWait {
                primitive: SyncPrimitive::ImageAcquired,
                stage: PipelineStage::ColorAttachmentOutput,
            }],
            None => Vec::new(),
        };

        plans.push(BatchPlan {
            batch,
            recorder_count: stages.len(),
            waits,
            signals: (0..stages.len()).map(|index| SyncPrimitive::Recorder { batch, index }).collect(),
        });
    }

    if swapchain_renderable {
        if let Some(last) = plans.last_mut() {
            last.signals = vec![SyncPrimitive::RenderFinished];
        }
    }
    plans
}

#[cfg(test)]
#[path = "command_tests.rs"]
mod tests;
