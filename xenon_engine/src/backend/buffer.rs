/// Buffer trait, residency and access-state model

use std::any::Any;
use std::ops::Deref;
use std::ptr::NonNull;

use crate::backend::command::CommandRecorder;
use crate::backend::types::BufferType;
use crate::error::{Error, Result};
use crate::engine_error;

/// Heap class a buffer lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemoryLocation {
    /// Device-local, not mappable
    GpuOnly,
    /// Host-visible, written by the CPU (upload heap)
    CpuToGpu,
    /// Host-visible, read back by the CPU (readback heap)
    GpuToCpu,
}

impl MemoryLocation {
    pub fn is_host_visible(self) -> bool {
        !matches!(self, MemoryLocation::GpuOnly)
    }
}

/// Tracked access state of a buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceState {
    Common,
    VertexAndConstantBuffer,
    IndexBuffer,
    UnorderedAccess,
    CopySource,
    CopyDestination,
    GenericRead,
}

impl ResourceState {
    /// State a freshly created buffer of `buffer_type` starts in
    pub fn initial_for(buffer_type: BufferType) -> Self {
        match buffer_type {
            BufferType::Index => ResourceState::IndexBuffer,
            BufferType::Vertex => ResourceState::VertexAndConstantBuffer,
            BufferType::Uniform
            | BufferType::Storage
            | BufferType::Staging
            | BufferType::BackendSpecific => ResourceState::Common,
        }
    }
}

/// State one side of a copy must be moved to for the copy, if any
///
/// Buffers in `GenericRead`, living in the readback heap or already in
/// `copy_state` are usable by the copy as they are and are left untouched.
/// Any transition returned here is reverted right after the copy.
pub fn copy_transition(state: ResourceState, location: MemoryLocation, copy_state: ResourceState) -> Option<ResourceState> {
    if state == ResourceState::GenericRead || state == copy_state || location == MemoryLocation::GpuToCpu {
        None
    } else {
        Some(copy_state)
    }
}

/// Whether a write can go straight through a CPU mapping
pub fn is_directly_writable(state: ResourceState, location: MemoryLocation) -> bool {
    location == MemoryLocation::CpuToGpu && state == ResourceState::GenericRead
}

/// Round `size` up to a multiple of `alignment` (a power of two)
pub fn align_up(size: u64, alignment: u64) -> u64 {
    debug_assert!(alignment.is_power_of_two());
    (size + alignment - 1) & !(alignment - 1)
}

/// Reject accesses of `length` bytes at `offset` outside a buffer of `size` bytes
pub fn check_range(source: &str, size: u64, offset: u64, length: u64) -> Result<()> {
    match offset.checked_add(length) {
        Some(end) if end <= size => Ok(()),
        _ => {
            let message = format!(
                "Access of {} bytes at offset {} is out of range for a buffer of {} bytes",
                length, offset, size
            );
            engine_error!(source, "{}", message);
            Err(Error::InvalidResource(message))
        }
    }
}

/// GPU buffer
///
/// Writes are transparent to where the memory lives: host-visible buffers are
/// mapped directly, device-local ones go through a staging buffer created on
/// first use.
pub trait Buffer: Send + Sync {
    /// Size in bytes (may exceed the requested size because of alignment)
    fn size(&self) -> u64;

    fn buffer_type(&self) -> BufferType;

    fn memory_location(&self) -> MemoryLocation;

    /// Current tracked access state
    fn state(&self) -> ResourceState;

    /// Copy `data` into the buffer at `offset`
    ///
    /// When staging is required and `recorder` is given, the staging copy is
    /// recorded into it; otherwise it is submitted and waited for.
    fn write(&self, data: &[u8], offset: u64, recorder: Option<&mut dyn CommandRecorder>) -> Result<()>;

    /// Synchronous device-side copy of `size` bytes from `src` into `self`
    ///
    /// States of both buffers are the same after the call as before it.
    fn copy(&self, src: &dyn Buffer, size: u64, src_offset: u64, dst_offset: u64) -> Result<()>;

    /// Map the current contents for reading
    ///
    /// The returned pointer covers `size()` bytes and stays valid until
    /// `end_read`. Prefer `read()`, which pairs the two calls.
    fn begin_read(&self) -> Result<NonNull<u8>>;

    /// Unmap the contents mapped by `begin_read`
    fn end_read(&self);

    fn as_any(&self) -> &dyn Any;
}

impl dyn Buffer + '_ {
    /// Scoped read of the buffer contents
    pub fn read(&self) -> Result<BufferRead<'_>> {
        let ptr = self.begin_read()?;
        Ok(BufferRead { buffer: self, ptr, len: self.size() as usize })
    }

    /// Downcast to a backend buffer
    pub fn downcast_ref<T: Buffer + 'static>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }
}

/// Mapped contents of a buffer; unmapped on drop
pub struct BufferRead<'a> {
    buffer: &'a dyn Buffer,
    ptr: NonNull<u8>,
    len: usize,
}

impl Deref for BufferRead<'_> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        // SAFETY: begin_read maps size() bytes that stay valid until end_read,
        // which only runs when this guard is dropped
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }
}

impl Drop for BufferRead<'_> {
    fn drop(&mut self) {
        self.buffer.end_read();
    }
}

#[cfg(test)]
#[path = "buffer_tests.rs"]
mod tests;
