//! Unit tests for command.rs (submission planning)

use std::time::Duration;

use crate::backend::command::*;
use crate::backend::types::PipelineStage;

fn recorder(batch: usize, index: usize) -> SyncPrimitive {
    SyncPrimitive::Recorder { batch, index }
}

// ============================================================================
// WITHOUT SWAPCHAIN
// ============================================================================

#[test]
fn test_empty_submission_has_no_plan() {
    assert!(plan_submission(&[], false).is_empty());
    assert!(plan_submission(&[], true).is_empty());
}

#[test]
fn test_single_batch_signals_every_recorder() {
    let plans = plan_submission(&[vec![PipelineStage::AllGraphics, PipelineStage::Transfer]], false);

    assert_eq!(plans.len(), 1);
    assert!(plans[0].waits.is_empty());
    assert_eq!(plans[0].recorder_count, 2);
    assert_eq!(plans[0].signals, vec![recorder(0, 0), recorder(0, 1)]);
}

#[test]
fn test_three_batches_chain_on_previous_signals() {
    let plans = plan_submission(
        &[
            vec![PipelineStage::Transfer],
            vec![PipelineStage::ComputeShader, PipelineStage::AllGraphics],
            vec![PipelineStage::AllGraphics],
        ],
        false,
    );

    assert_eq!(plans.len(), 3);
    assert!(plans[0].waits.is_empty());

    assert_eq!(
        plans[1].waits,
        vec![SubmissionWait { primitive: recorder(0, 0), stage: PipelineStage::Transfer }]
    );
    assert_eq!(
        plans[2].waits,
        vec![
            SubmissionWait { primitive: recorder(1, 0), stage: PipelineStage::ComputeShader },
            SubmissionWait { primitive: recorder(1, 1), stage: PipelineStage::AllGraphics },
        ]
    );
    assert_eq!(plans[2].signals, vec![recorder(2, 0)]);
}

#[test]
fn test_empty_batches_do_not_break_the_chain() {
    let plans = plan_submission(
        &[vec![PipelineStage::Transfer], vec![], vec![PipelineStage::AllGraphics]],
        false,
    );

    assert_eq!(plans.len(), 2);
    assert_eq!(plans[1].batch, 2);
    assert_eq!(plans[1].waits[0].primitive, recorder(0, 0));
}

// ============================================================================
// WITH SWAPCHAIN
// ============================================================================

#[test]
fn test_swapchain_wraps_the_submission() {
    let plans = plan_submission(
        &[vec![PipelineStage::AllGraphics], vec![PipelineStage::AllGraphics, PipelineStage::AllGraphics]],
        true,
    );

    assert_eq!(
        plans[0].waits,
        vec![SubmissionWait {
            primitive: SyncPrimitive::ImageAcquired,
            stage: PipelineStage::ColorAttachmentOutput,
        }]
    );
    assert_eq!(plans[0].signals, vec![recorder(0, 0)]);

    assert_eq!(plans[1].waits.len(), 1);
    assert_eq!(plans[1].signals, vec![SyncPrimitive::RenderFinished]);
}

#[test]
fn test_single_batch_with_swapchain() {
    let plans = plan_submission(&[vec![PipelineStage::AllGraphics]], true);

    assert_eq!(plans[0].waits[0].primitive, SyncPrimitive::ImageAcquired);
    assert_eq!(plans[0].signals, vec![SyncPrimitive::RenderFinished]);
}

#[test]
fn test_timeout_saturates() {
    assert_eq!(timeout_nanos(Duration::MAX), u64::MAX);
    assert_eq!(timeout_nanos(Duration::from_millis(2)), 2_000_000);
}
