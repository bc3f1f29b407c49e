//! Unit tests for buffer.rs

use crate::backend::buffer::*;
use crate::backend::types::BufferType;
use crate::error::Error;
use crate::log::LogSeverity;
use crate::test_logger::TestLogger;
use serial_test::serial;

// ============================================================================
// INITIAL STATES
// ============================================================================

#[test]
fn test_initial_states_follow_buffer_type() {
    assert_eq!(ResourceState::initial_for(BufferType::Index), ResourceState::IndexBuffer);
    assert_eq!(ResourceState::initial_for(BufferType::Vertex), ResourceState::VertexAndConstantBuffer);
    for buffer_type in [BufferType::Uniform, BufferType::Storage, BufferType::Staging, BufferType::BackendSpecific] {
        assert_eq!(ResourceState::initial_for(buffer_type), ResourceState::Common);
    }
}

#[test]
fn test_host_visibility() {
    assert!(!MemoryLocation::GpuOnly.is_host_visible());
    assert!(MemoryLocation::CpuToGpu.is_host_visible());
    assert!(MemoryLocation::GpuToCpu.is_host_visible());
}

// ============================================================================
// COPY TRANSITIONS
// ============================================================================

#[test]
fn test_device_local_buffers_transition_for_copies() {
    assert_eq!(
        copy_transition(ResourceState::Common, MemoryLocation::GpuOnly, ResourceState::CopyDestination),
        Some(ResourceState::CopyDestination)
    );
    assert_eq!(
        copy_transition(ResourceState::IndexBuffer, MemoryLocation::GpuOnly, ResourceState::CopySource),
        Some(ResourceState::CopySource)
    );
}

#[test]
fn test_generic_read_is_never_transitioned() {
    assert_eq!(
        copy_transition(ResourceState::GenericRead, MemoryLocation::CpuToGpu, ResourceState::CopySource),
        None
    );
    assert_eq!(
        copy_transition(ResourceState::GenericRead, MemoryLocation::GpuOnly, ResourceState::CopyDestination),
        None
    );
}

#[test]
fn test_readback_heap_is_never_transitioned() {
    assert_eq!(
        copy_transition(ResourceState::CopyDestination, MemoryLocation::GpuToCpu, ResourceState::CopyDestination),
        None
    );
}

#[test]
fn test_buffer_already_in_copy_state_is_not_transitioned() {
    assert_eq!(
        copy_transition(ResourceState::CopyDestination, MemoryLocation::GpuOnly, ResourceState::CopyDestination),
        None
    );
    assert_eq!(
        copy_transition(ResourceState::CopySource, MemoryLocation::CpuToGpu, ResourceState::CopySource),
        None
    );
    // The opposite copy state still needs a transition
    assert_eq!(
        copy_transition(ResourceState::CopySource, MemoryLocation::GpuOnly, ResourceState::CopyDestination),
        Some(ResourceState::CopyDestination)
    );
}

#[test]
fn test_direct_writes_need_upload_heap_in_generic_read() {
    assert!(is_directly_writable(ResourceState::GenericRead, MemoryLocation::CpuToGpu));
    assert!(!is_directly_writable(ResourceState::Common, MemoryLocation::CpuToGpu));
    assert!(!is_directly_writable(ResourceState::GenericRead, MemoryLocation::GpuOnly));
    assert!(!is_directly_writable(ResourceState::GenericRead, MemoryLocation::GpuToCpu));
}

// ============================================================================
// SIZES AND RANGES
// ============================================================================

#[test]
fn test_align_up() {
    assert_eq!(align_up(0, 256), 0);
    assert_eq!(align_up(1, 256), 256);
    assert_eq!(align_up(256, 256), 256);
    assert_eq!(align_up(257, 256), 512);
    assert_eq!(align_up(13, 4), 16);
}

#[test]
#[serial]
fn test_range_inside_buffer_is_accepted() {
    let logs = TestLogger::install();
    assert!(check_range("test", 64, 0, 64).is_ok());
    assert!(check_range("test", 64, 64, 0).is_ok());
    assert_eq!(logs.count(LogSeverity::Error), 0);
    TestLogger::uninstall();
}

#[test]
#[serial]
fn test_range_past_the_end_is_rejected_and_logged() {
    let logs = TestLogger::install();

    let result = check_range("test", 64, 60, 8);

    assert!(matches!(result, Err(Error::InvalidResource(_))));
    assert_eq!(logs.count(LogSeverity::Error), 1);
    assert!(logs.contains("out of range"));
    TestLogger::uninstall();
}

#[test]
#[serial]
fn test_overflowing_range_is_rejected() {
    let _logs = TestLogger::install();
    assert!(check_range("test", u64::MAX, u64::MAX, 2).is_err());
    TestLogger::uninstall();
}
