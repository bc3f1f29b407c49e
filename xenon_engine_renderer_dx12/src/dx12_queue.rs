/// Direct3D 12 translation of a submission plan
///
/// D3D12 has no semaphores: ordering between batches is expressed with
/// `ID3D12CommandQueue::Signal` and `Wait` on one fence, each signal taking
/// the next fence value. Swapchain primitives disappear entirely, since the
/// back buffer is acquired implicitly and `Present` is queued after the
/// submitted work on the same queue.

use rustc_hash::FxHashMap;
use xenon_engine::xenon::backend::{BatchPlan, SyncPrimitive};

/// One call on the direct queue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueOperation {
    /// Wait until the sync fence reaches `base + value`
    Wait { value: u64 },
    /// `ExecuteCommandLists` with every recorder of `batch`
    Execute { batch: usize },
    /// Signal `base + value` on the sync fence
    Signal { value: u64 },
}

/// Translate `plans` into queue operations
///
/// Values are relative to the fence value the submitter had before the
/// submission and start at 1. A recorder signal is emitted only when a later
/// wait consumes it.
pub fn queue_operations(plans: &[BatchPlan]) -> Vec<QueueOperation> {
    let consumed: Vec<SyncPrimitive> = plans
        .iter()
        .flat_map(|plan| plan.waits.iter().map(|wait| wait.primitive))
        .filter(|primitive| matches!(primitive, SyncPrimitive::Recorder { .. }))
        .collect();

    let mut values: FxHashMap<SyncPrimitive, u64> = FxHashMap::default();
    let mut next_value = 1;
    let mut operations = Vec::new();

    for plan in plans {
        // Several recorders of one batch share the value of their common signal
        let mut waited = Vec::new();
        for wait in &plan.waits {
            if let Some(value) = values.get(&wait.primitive).copied() {
                if !waited.contains(&value) {
                    waited.push(value);
                    operations.push(QueueOperation::Wait { value });
                }
            }
        }

        operations.push(QueueOperation::Execute { batch: plan.batch });

        let signals: Vec<SyncPrimitive> =
            plan.signals.iter().copied().filter(|primitive| consumed.contains(primitive)).collect();
        if !signals.is_empty() {
            for primitive in signals {
                values.insert(primitive, next_value);
            }
            operations.push(QueueOperation::Signal { value: next_value });
            next_value += 1;
        }
    }
    operations
}

/// Highest relative value signalled by `operations`
pub fn last_signal(operations: &[QueueOperation]) -> u64 {
    operations
        .iter()
        .filter_map(|operation| match operation {
            QueueOperation::Signal { value } => Some(*value),
            _ => None,
        })
        .max()
        .unwrap_or(0)
}

#[cfg(test)]
#[path = "dx12_queue_tests.rs"]
mod tests;
