use super::*;
use xenon_engine::xenon::backend::{plan_submission, PipelineStage};

#[test]
fn test_single_batch_only_executes() {
    let plans = plan_submission(&[vec![PipelineStage::AllCommands]], false);
    assert_eq!(queue_operations(&plans), vec![QueueOperation::Execute { batch: 0 }]);
}

#[test]
fn test_swapchain_primitives_are_dropped() {
    let plans = plan_submission(&[vec![PipelineStage::ColorAttachmentOutput]], true);
    let operations = queue_operations(&plans);
    assert_eq!(operations, vec![QueueOperation::Execute { batch: 0 }]);
    assert_eq!(last_signal(&operations), 0);
}

#[test]
fn test_chained_batches_signal_then_wait() {
    let plans = plan_submission(
        &[
            vec![PipelineStage::Transfer],
            vec![PipelineStage::ComputeShader],
            vec![PipelineStage::AllGraphics],
        ],
        true,
    );

    assert_eq!(
        queue_operations(&plans),
        vec![
            QueueOperation::Execute { batch: 0 },
            QueueOperation::Signal { value: 1 },
            QueueOperation::Wait { value: 1 },
            QueueOperation::Execute { batch: 1 },
            QueueOperation::Signal { value: 2 },
            QueueOperation::Wait { value: 2 },
            QueueOperation::Execute { batch: 2 },
        ]
    );
}

#[test]
fn test_recorders_of_one_batch_share_one_signal() {
    let plans = plan_submission(
        &[
            vec![PipelineStage::Transfer, PipelineStage::Transfer, PipelineStage::AllCommands],
            vec![PipelineStage::AllGraphics],
        ],
        false,
    );

    let operations = queue_operations(&plans);
    assert_eq!(
        operations,
        vec![
            QueueOperation::Execute { batch: 0 },
            QueueOperation::Signal { value: 1 },
            QueueOperation::Wait { value: 1 },
            QueueOperation::Execute { batch: 1 },
        ]
    );
    assert_eq!(last_signal(&operations), 1);
}

#[test]
fn test_empty_batches_keep_the_chain() {
    let plans = plan_submission(
        &[vec![PipelineStage::Transfer], Vec::new(), vec![PipelineStage::AllGraphics]],
        false,
    );

    assert_eq!(
        queue_operations(&plans),
        vec![
            QueueOperation::Execute { batch: 0 },
            QueueOperation::Signal { value: 1 },
            QueueOperation::Wait { value: 1 },
            QueueOperation::Execute { batch: 2 },
        ]
    );
}

#[test]
fn test_no_batches_no_operations() {
    assert!(queue_operations(&plan_submission(&[], true)).is_empty());
}
