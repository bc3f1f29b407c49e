//! Unit tests for specialization.rs
//!
//! Uses the mock builder and the in-memory cache handler from mock_backend.

use std::sync::{Arc, Barrier};
use std::thread;

use crate::backend::pipeline_cache::pipeline_cache_key;
use crate::backend::shader::ShaderAttribute;
use crate::backend::specialization::*;
use crate::backend::vertex::*;
use crate::error::Error;
use crate::log::LogSeverity;
use crate::mock_backend::{MemoryCacheHandler, MockPipelineBuilder};
use crate::test_logger::TestLogger;
use serial_test::serial;

fn position_only() -> VertexSpecification {
    VertexSpecification::new().add_element(
        InputElement::VertexPosition,
        AttributeDataType::Vec3,
        ComponentDataType::Float,
    )
}

fn position_color() -> VertexSpecification {
    position_only().add_element(InputElement::VertexColor0, AttributeDataType::Vec4, ComponentDataType::Uint8)
}

fn base_input() -> VertexInputState {
    VertexInputState::from_shader_inputs(&[ShaderAttribute {
        location: InputElement::VertexPosition.location(),
        data_type: AttributeDataType::Vec3,
    }])
}

fn specializations(handler: Option<&MemoryCacheHandler>) -> PipelineSpecializations<crate::mock_backend::MockPipelineObject> {
    PipelineSpecializations::new(
        base_input(),
        handler.map(|h| Box::new(h.clone()) as Box<dyn crate::backend::PipelineCacheHandler>),
    )
}

// ============================================================================
// LOOKUP
// ============================================================================

#[test]
#[serial]
fn test_same_layout_builds_once() {
    let builder = MockPipelineBuilder::new();
    let cache = specializations(None);

    let first = cache.get_or_build(&builder, &position_only()).unwrap();
    let second = cache.get_or_build(&builder, &position_only()).unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(builder.build_count(), 1);
    assert_eq!(cache.len(), 1);
}

#[test]
#[serial]
fn test_distinct_layouts_build_distinct_specializations() {
    let builder = MockPipelineBuilder::new();
    let cache = specializations(None);

    let a = cache.get_or_build(&builder, &position_only()).unwrap();
    let b = cache.get_or_build(&builder, &position_color()).unwrap();

    assert_ne!(a.hash(), b.hash());
    assert_eq!(builder.build_count(), 2);
    assert!(cache.contains(&position_only()));
    assert!(cache.contains(&position_color()));
}

#[test]
#[serial]
fn test_specialization_carries_resolved_input() {
    let builder = MockPipelineBuilder::new();
    let cache = specializations(None);

    let entry = cache.get_or_build(&builder, &position_color()).unwrap();

    assert_eq!(entry.input().bindings.len(), 1);
    assert_eq!(entry.input().bindings[0].stride, 16);
    assert_eq!(entry.pipeline().input, *entry.input());
}

#[test]
#[serial]
fn test_missing_shader_input_is_rejected_without_building() {
    let logs = TestLogger::install();
    let builder = MockPipelineBuilder::new();
    let cache = specializations(None);

    let result = cache.get_or_build(&builder, &VertexSpecification::new());

    assert!(matches!(result, Err(Error::InvalidResource(_))));
    assert_eq!(builder.build_count(), 0);
    assert!(cache.is_empty());
    assert_eq!(logs.count(LogSeverity::Error), 1);
    TestLogger::uninstall();
}

#[test]
#[serial]
fn test_concurrent_requests_build_at_most_once() {
    let builder = Arc::new(MockPipelineBuilder::with_build_delay(std::time::Duration::from_millis(20)));
    let cache = Arc::new(specializations(None));
    let barrier = Arc::new(Barrier::new(8));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let builder = builder.clone();
            let cache = cache.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                cache.get_or_build(builder.as_ref(), &position_only()).unwrap()
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert_eq!(builder.build_count(), 1);
    assert!(results.iter().all(|r| Arc::ptr_eq(r, &results[0])));
}

// ============================================================================
// CACHE PERSISTENCE
// ============================================================================

#[test]
#[serial]
fn test_blob_is_stored_under_xored_key() {
    let handler = MemoryCacheHandler::new();
    let builder = MockPipelineBuilder::new();
    let cache = specializations(Some(&handler));

    let entry = cache.get_or_build(&builder, &position_only()).unwrap();
    let key = pipeline_cache_key(position_only().generate_hash());

    assert_eq!(handler.get(key), Some(builder.cache_data(entry.pipeline()).unwrap()));
    assert_eq!(handler.get(position_only().generate_hash()), None);
}

#[test]
#[serial]
fn test_stored_blob_seeds_next_pipeline() {
    let handler = MemoryCacheHandler::new();
    let builder = MockPipelineBuilder::new();

    let first = specializations(Some(&handler));
    let built = first.get_or_build(&builder, &position_only()).unwrap();
    let blob = builder.cache_data(built.pipeline()).unwrap();

    let second = specializations(Some(&handler));
    let rebuilt = second.get_or_build(&builder, &position_only()).unwrap();

    assert_eq!(rebuilt.pipeline().seeded_with, blob);
}

#[test]
#[serial]
fn test_missing_handler_logs_info() {
    let logs = TestLogger::install();
    let builder = MockPipelineBuilder::new();
    let cache = specializations(None);

    cache.get_or_build(&builder, &position_only()).unwrap();

    assert!(logs.contains("was not set to load"));
    assert!(logs.contains("was not set to save"));
    assert_eq!(logs.count(LogSeverity::Error), 0);
    TestLogger::uninstall();
}

#[test]
#[serial]
fn test_rejected_cache_retries_without_data() {
    let logs = TestLogger::install();
    let handler = MemoryCacheHandler::new();
    handler.insert(pipeline_cache_key(position_only().generate_hash()), b"corrupted".to_vec());

    let builder = MockPipelineBuilder::rejecting_cache();
    let cache = specializations(Some(&handler));

    let entry = cache.get_or_build(&builder, &position_only()).unwrap();

    assert!(entry.pipeline().seeded_with.is_empty());
    assert_eq!(builder.build_count(), 1);
    assert_eq!(logs.count(LogSeverity::Error), 1);
    TestLogger::uninstall();
}

#[test]
#[serial]
fn test_retry_is_skipped_for_empty_cache() {
    let mut calls = 0;
    let result: crate::error::Result<()> = build_with_cache_retry(&[], |_| {
        calls += 1;
        Err(Error::InvalidPipelineCache("empty".to_string()))
    });

    assert!(matches!(result, Err(Error::InvalidPipelineCache(_))));
    assert_eq!(calls, 1);
}

#[test]
#[serial]
fn test_other_errors_are_not_retried() {
    let mut calls = 0;
    let result: crate::error::Result<()> = build_with_cache_retry(b"blob", |_| {
        calls += 1;
        Err(Error::OutOfMemory)
    });

    assert_eq!(result, Err(Error::OutOfMemory));
    assert_eq!(calls, 1);
}

// ============================================================================
// RECREATE
// ============================================================================

#[test]
#[serial]
fn test_recreate_rebuilds_every_entry_from_its_own_cache() {
    let handler = MemoryCacheHandler::new();
    let builder = MockPipelineBuilder::new();
    let cache = specializations(Some(&handler));

    let old_a = cache.get_or_build(&builder, &position_only()).unwrap();
    let old_b = cache.get_or_build(&builder, &position_color()).unwrap();

    cache.recreate(&builder).unwrap();

    let new_a = cache.get_or_build(&builder, &position_only()).unwrap();
    let new_b = cache.get_or_build(&builder, &position_color()).unwrap();

    assert_eq!(builder.build_count(), 4);
    assert!(!Arc::ptr_eq(&old_a, &new_a));
    assert_eq!(new_a.pipeline().seeded_with, builder.cache_data(old_a.pipeline()).unwrap());
    assert_eq!(new_b.pipeline().seeded_with, builder.cache_data(old_b.pipeline()).unwrap());
    assert_eq!(new_a.input(), old_a.input());

    let key = pipeline_cache_key(position_only().generate_hash());
    assert_eq!(handler.get(key), Some(builder.cache_data(new_a.pipeline()).unwrap()));
}

#[test]
#[serial]
fn test_recreate_on_empty_cache_is_a_no_op() {
    let builder = MockPipelineBuilder::new();
    let cache = specializations(None);

    cache.recreate(&builder).unwrap();

    assert_eq!(builder.build_count(), 0);
}
