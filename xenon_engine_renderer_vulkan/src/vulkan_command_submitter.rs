/// VulkanCommandSubmitter - Vulkan implementation of the CommandSubmitter trait
///
/// The synchronization of a submission comes from `plan_submission`; this
/// module only maps the planned primitives onto semaphores. A recorder signal
/// that no later batch waits on is dropped from the submit info, since a
/// binary semaphore must not be signalled twice without a wait in between.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use ash::vk;
use rustc_hash::FxHashSet;
use xenon_engine::xenon::backend::{
    plan_submission, timeout_nanos, CommandRecorder, CommandSubmitter, PipelineStage, Swapchain, SyncPrimitive,
};
use xenon_engine::xenon::Result;
use xenon_engine::{engine_bail, engine_err, engine_error, engine_trace};

use crate::vulkan_command_recorder::VulkanCommandRecorder;
use crate::vulkan_context::GpuContext;
use crate::vulkan_conversions::pipeline_stage;
use crate::vulkan_swapchain::VulkanSwapchain;

const SOURCE: &str = "xenon::vulkan::CommandSubmitter";

#[derive(Default)]
struct FenceEpochs {
    submitted: u64,
    completed: u64,
}

/// Reusable fence numbering its submissions
///
/// Recorders remember the epoch their buffer was submitted in, so beginning a
/// buffer again can wait for exactly that submission.
pub(crate) struct SubmitFence {
    ctx: Arc<GpuContext>,
    fence: vk::Fence,
    epochs: Mutex<FenceEpochs>,
}

impl SubmitFence {
    fn new(ctx: Arc<GpuContext>) -> Result<Self> {
        let fence = unsafe { ctx.device.create_fence(&vk::FenceCreateInfo::default(), None) }
            .map_err(|e| engine_err!(SOURCE, "Failed to create fence: {:?}", e))?;
        Ok(Self { ctx, fence, epochs: Mutex::new(FenceEpochs::default()) })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, FenceEpochs>> {
        self.epochs.lock().map_err(|_| engine_err!(SOURCE, "Fence lock poisoned"))
    }

    fn is_outstanding(&self) -> bool {
        self.epochs.lock().map(|e| e.completed < e.submitted).unwrap_or(false)
    }

    /// Submit to the queue under a new epoch
    fn submit(&self, submits: &[vk::SubmitInfo<'_>]) -> Result<u64> {
        let mut epochs = self.lock()?;
        self.ctx.queue_submit(submits, self.fence)?;
        epochs.submitted += 1;
        Ok(epochs.submitted)
    }

    /// Block until the submission of `epoch` completed, then reset the fence
    pub(crate) fn wait_for(&self, epoch: u64, timeout: Duration) -> Result<()> {
        let mut epochs = self.lock()?;
        if epochs.completed >= epoch {
            return Ok(());
        }

        unsafe {
            self.ctx
                .device
                .wait_for_fences(&[self.fence], true, timeout_nanos(timeout))
                .map_err(|e| engine_err!(SOURCE, "Failed to wait for the fence: {:?}", e))?;
            self.ctx
                .device
                .reset_fences(&[self.fence])
                .map_err(|e| engine_err!(SOURCE, "Failed to reset the fence: {:?}", e))?;
        }
        epochs.completed = epochs.submitted;
        Ok(())
    }

    fn wait_all(&self, timeout: Duration) -> Result<()> {
        let submitted = self.lock()?.submitted;
        self.wait_for(submitted, timeout)
    }
}

impl Drop for SubmitFence {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device.destroy_fence(self.fence, None);
        }
    }
}

/// Vulkan command submitter implementation
pub struct VulkanCommandSubmitter {
    fence: Arc<SubmitFence>,
    waiting: bool,
}

impl VulkanCommandSubmitter {
    pub(crate) fn new(ctx: Arc<GpuContext>) -> Result<Self> {
        Ok(Self { fence: Arc::new(SubmitFence::new(ctx)?), waiting: false })
    }
}

impl CommandSubmitter for VulkanCommandSubmitter {
    fn submit(&mut self, batches: &[&[&dyn CommandRecorder]], swapchain: Option<&dyn Swapchain>) -> Result<()> {
        // The fence is reused, and only `wait` blocks on it
        if self.fence.is_outstanding() {
            engine_bail!(SOURCE, "The previous submission is still outstanding, call wait() first");
        }

        let mut recorders: Vec<Vec<&VulkanCommandRecorder>> = Vec::with_capacity(batches.len());
        for batch in batches {
            let mut vulkan_batch = Vec::with_capacity(batch.len());
            for recorder in batch.iter() {
                let Some(recorder) = recorder.downcast_ref::<VulkanCommandRecorder>() else {
                    engine_bail!(SOURCE, "Recorder was not created by the Vulkan backend");
                };
                vulkan_batch.push(recorder);
            }
            recorders.push(vulkan_batch);
        }

        let swapchain = match swapchain {
            Some(swapchain) => match swapchain.downcast_ref::<VulkanSwapchain>() {
                Some(swapchain) => Some(swapchain).filter(|s| s.is_renderable()),
                None => engine_bail!(SOURCE, "Swapchain was not created by the Vulkan backend"),
            },
            None => None,
        };

        let stages: Vec<Vec<PipelineStage>> = batches
            .iter()
            .map(|batch| batch.iter().map(|r| r.usage().wait_stage()).collect())
            .collect();
        let plans = plan_submission(&stages, swapchain.is_some());

        let consumed: FxHashSet<SyncPrimitive> = plans
            .iter()
            .flat_map(|plan| plan.waits.iter().map(|wait| wait.primitive))
            .chain(swapchain.map(|_| SyncPrimitive::RenderFinished))
            .collect();

        let semaphore = |primitive: SyncPrimitive| -> vk::Semaphore {
            match primitive {
                SyncPrimitive::ImageAcquired => swapchain.map(|s| s.sync_semaphores().0).unwrap_or_default(),
                SyncPrimitive::RenderFinished => swapchain.map(|s| s.sync_semaphores().1).unwrap_or_default(),
                SyncPrimitive::Recorder { batch, index } => recorders[batch][index].signal_semaphore(),
            }
        };

        // Owned storage the submit infos point into
        let mut command_buffers: Vec<Vec<vk::CommandBuffer>> = Vec::with_capacity(plans.len());
        let mut wait_semaphores: Vec<Vec<vk::Semaphore>> = Vec::with_capacity(plans.len());
        let mut wait_stages: Vec<Vec<vk::PipelineStageFlags>> = Vec::with_capacity(plans.len());
        let mut signal_semaphores: Vec<Vec<vk::Semaphore>> = Vec::with_capacity(plans.len());

        for plan in &plans {
            let mut buffers = Vec::with_capacity(plan.recorder_count);
            for recorder in &recorders[plan.batch] {
                buffers.push(recorder.submittable_buffer()?);
            }
            command_buffers.push(buffers);
            wait_semaphores.push(plan.waits.iter().map(|wait| semaphore(wait.primitive)).collect());
            wait_stages.push(plan.waits.iter().map(|wait| pipeline_stage(wait.stage)).collect());
            signal_semaphores.push(
                plan.signals
                    .iter()
                    .filter(|signal| consumed.contains(signal))
                    .map(|signal| semaphore(*signal))
                    .collect(),
            );
        }

        let submits: Vec<vk::SubmitInfo<'_>> = (0..plans.len())
            .map(|i| {
                vk::SubmitInfo::default()
                    .command_buffers(&command_buffers[i])
                    .wait_semaphores(&wait_semaphores[i])
                    .wait_dst_stage_mask(&wait_stages[i])
                    .signal_semaphores(&signal_semaphores[i])
            })
            .collect();

        self.waiting = !batches.is_empty();
        if submits.is_empty() {
            return Ok(());
        }

        let epoch = self.fence.submit(&submits)?;
        for plan in &plans {
            for recorder in &recorders[plan.batch] {
                recorder.mark_submitted(&self.fence, epoch);
            }
        }

        engine_trace!(SOURCE, "Submitted {} batch(es) as epoch {}", submits.len(), epoch);
        Ok(())
    }

    fn wait(&mut self, timeout: Duration) -> Result<()> {
        if self.waiting {
            self.fence.wait_all(timeout)?;
            self.waiting = false;
        }
        Ok(())
    }

    fn is_waiting(&self) -> bool {
        self.waiting
    }
}

impl Drop for VulkanCommandSubmitter {
    fn drop(&mut self) {
        if self.wait(Duration::MAX).is_err() {
            engine_error!(SOURCE, "Failed to wait for the command submitter to finish execution!");
        }
    }
}
