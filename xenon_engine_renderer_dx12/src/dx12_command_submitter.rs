/// Dx12CommandSubmitter - Direct3D 12 implementation of the CommandSubmitter trait
///
/// Batches are ordered by `queue_operations`, which turns the planned
/// primitives into waits and signals on one monotonically increasing fence.
/// Each submission ends with a signal of its own that recorders remember, so
/// beginning a list again waits for exactly the submission it was part of.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use windows::core::Interface;
use windows::Win32::Graphics::Direct3D12::{ID3D12CommandList, ID3D12Fence, D3D12_FENCE_FLAG_NONE};
use xenon_engine::xenon::backend::{plan_submission, CommandRecorder, CommandSubmitter, PipelineStage, Swapchain};
use xenon_engine::xenon::Result;
use xenon_engine::{engine_bail, engine_err, engine_error, engine_trace};

use crate::dx12_command_recorder::Dx12CommandRecorder;
use crate::dx12_context::{wait_for_fence, GpuContext};
use crate::dx12_queue::{last_signal, queue_operations, QueueOperation};
use crate::dx12_swapchain::Dx12Swapchain;

const SOURCE: &str = "xenon::dx12::CommandSubmitter";

/// Fence shared by a submitter and the recorders it submitted
pub(crate) struct SubmitFence {
    fence: ID3D12Fence,
    /// Last value signalled on the queue
    value: Mutex<u64>,
}

impl SubmitFence {
    fn new(ctx: &GpuContext) -> Result<Self> {
        let fence: ID3D12Fence = unsafe { ctx.device.CreateFence(0, D3D12_FENCE_FLAG_NONE) }
            .map_err(|e| engine_err!(SOURCE, "Failed to create fence: {:?}", e))?;
        Ok(Self { fence, value: Mutex::new(0) })
    }

    /// Block until the submission that signalled `value` completed
    pub(crate) fn wait_for(&self, value: u64, timeout: Duration) -> Result<()> {
        wait_for_fence(&self.fence, value, timeout)
    }
}

/// Direct3D 12 command submitter implementation
pub struct Dx12CommandSubmitter {
    ctx: Arc<GpuContext>,
    fence: Arc<SubmitFence>,
    /// Fence value of the last submission
    last_value: u64,
    waiting: bool,
}

impl Dx12CommandSubmitter {
    pub(crate) fn new(ctx: Arc<GpuContext>) -> Result<Self> {
        let fence = Arc::new(SubmitFence::new(&ctx)?);
        Ok(Self { ctx, fence, last_value: 0, waiting: false })
    }
}

impl CommandSubmitter for Dx12CommandSubmitter {
    fn submit(&mut self, batches: &[&[&dyn CommandRecorder]], swapchain: Option<&dyn Swapchain>) -> Result<()> {
        let mut recorders: Vec<Vec<&Dx12CommandRecorder>> = Vec::with_capacity(batches.len());
        for batch in batches {
            let mut dx12_batch = Vec::with_capacity(batch.len());
            for recorder in batch.iter() {
                let Some(recorder) = recorder.downcast_ref::<Dx12CommandRecorder>() else {
                    engine_bail!(SOURCE, "Recorder was not created by the Direct3D 12 backend");
                };
                dx12_batch.push(recorder);
            }
            recorders.push(dx12_batch);
        }

        let renderable = match swapchain {
            Some(swapchain) => match swapchain.downcast_ref::<Dx12Swapchain>() {
                Some(swapchain) => swapchain.is_renderable(),
                None => engine_bail!(SOURCE, "Swapchain was not created by the Direct3D 12 backend"),
            },
            None => false,
        };

        let stages: Vec<Vec<PipelineStage>> = batches
            .iter()
            .map(|batch| batch.iter().map(|r| r.usage().wait_stage()).collect())
            .collect();
        let plans = plan_submission(&stages, renderable);

        self.waiting = !batches.is_empty();
        if plans.is_empty() {
            return Ok(());
        }

        let mut lists: Vec<Vec<Option<ID3D12CommandList>>> = Vec::with_capacity(recorders.len());
        for batch in &recorders {
            let mut batch_lists = Vec::with_capacity(batch.len());
            for recorder in batch {
                let list = recorder
                    .submittable_list()?
                    .cast::<ID3D12CommandList>()
                    .map_err(|e| engine_err!(SOURCE, "Failed to cast the command list: {:?}", e))?;
                batch_lists.push(Some(list));
            }
            lists.push(batch_lists);
        }

        let operations = queue_operations(&plans);
        let mut signalled = self
            .fence
            .value
            .lock()
            .map_err(|_| engine_err!(SOURCE, "Fence lock poisoned"))?;
        let base = *signalled;
        let completion = base + last_signal(&operations) + 1;

        let fence = &self.fence.fence;
        self.ctx.with_queue(|queue| unsafe {
            for operation in &operations {
                match *operation {
                    QueueOperation::Wait { value } => queue
                        .Wait(fence, base + value)
                        .map_err(|e| engine_err!(SOURCE, "Failed to queue a fence wait: {:?}", e))?,
                    QueueOperation::Execute { batch } => queue.ExecuteCommandLists(&lists[batch]),
                    QueueOperation::Signal { value } => queue
                        .Signal(fence, base + value)
                        .map_err(|e| engine_err!(SOURCE, "Failed to queue a fence signal: {:?}", e))?,
                }
            }
            queue
                .Signal(fence, completion)
                .map_err(|e| engine_err!(SOURCE, "Failed to signal the submission fence: {:?}", e))
        })?;
        *signalled = completion;
        drop(signalled);

        for plan in &plans {
            for recorder in &recorders[plan.batch] {
                recorder.mark_submitted(&self.fence, completion);
            }
        }
        self.last_value = completion;

        engine_trace!(SOURCE, "Submitted {} batch(es) up to fence value {}", plans.len(), completion);
        Ok(())
    }

    fn wait(&mut self, timeout: Duration) -> Result<()> {
        if self.waiting {
            self.fence.wait_for(self.last_value, timeout)?;
            self.waiting = false;
        }
        Ok(())
    }

    fn is_waiting(&self) -> bool {
        self.waiting
    }
}

impl Drop for Dx12CommandSubmitter {
    fn drop(&mut self) {
        if self.wait(Duration::MAX).is_err() {
            engine_error!(SOURCE, "Failed to wait for the command submitter to finish execution!");
        }
    }
}
