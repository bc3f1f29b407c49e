/// Dx12Buffer - Direct3D 12 implementation of the Buffer trait
///
/// Upload and readback heap buffers are mapped once at creation and written
/// or read in place. Default heap buffers receive writes through an upload
/// buffer and are read back through a readback buffer, both created on
/// first use.

use std::any::Any;
use std::ffi::c_void;
use std::mem::ManuallyDrop;
use std::ptr::NonNull;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, OnceLock};

use gpu_allocator::d3d12::Allocation;
use windows::Win32::Graphics::Direct3D12::*;
use windows::Win32::Graphics::Dxgi::Common::{DXGI_FORMAT_UNKNOWN, DXGI_SAMPLE_DESC};
use xenon_engine::xenon::backend::{
    check_range, copy_transition, is_directly_writable, Buffer, BufferType, CommandRecorder, MemoryLocation, ResourceState,
};
use xenon_engine::xenon::{Error, Result};
use xenon_engine::{engine_bail, engine_err, engine_warn};

use crate::dx12_alignment::buffer_size;
use crate::dx12_barrier::{buffer_placement, buffer_state_bits, plan_buffer_copy, CopySide, StateTransition};
use crate::dx12_context::{transition_barrier, GpuContext};

const SOURCE: &str = "xenon::dx12::Buffer";

/// Persistently mapped pointer of an upload or readback resource
#[derive(Clone, Copy)]
struct Mapping(NonNull<u8>);

// The mapping lives as long as the resource and every access is range checked
unsafe impl Send for Mapping {}
unsafe impl Sync for Mapping {}

pub struct Dx12Buffer {
    ctx: Arc<GpuContext>,
    /// Released before its allocation in `Drop`
    pub(crate) resource: ManuallyDrop<ID3D12Resource>,
    allocation: Option<Allocation>,
    mapping: Option<Mapping>,
    size: u64,
    buffer_type: BufferType,
    location: MemoryLocation,
    state: Mutex<ResourceState>,
    upload: OnceLock<Box<Dx12Buffer>>,
    readback: OnceLock<Box<Dx12Buffer>>,
    reading: AtomicBool,
}

impl Dx12Buffer {
    /// Create a buffer of `buffer_type`
    ///
    /// Uniform buffers are sized to a multiple of 256 bytes. Uniform and
    /// staging buffers live in the upload heap, everything else in the
    /// default heap.
    pub(crate) fn new(ctx: Arc<GpuContext>, size: u64, buffer_type: BufferType) -> Result<Self> {
        let (location, state) = buffer_placement(buffer_type);
        Self::with_placement(ctx, "buffer", buffer_size(size, buffer_type), buffer_type, location, state)
    }

    /// Create a buffer with explicit placement (backend-internal buffers)
    pub(crate) fn with_placement(
        ctx: Arc<GpuContext>,
        name: &str,
        size: u64,
        buffer_type: BufferType,
        location: MemoryLocation,
        state: ResourceState,
    ) -> Result<Self> {
        if size == 0 {
            engine_bail!(SOURCE, "Cannot create an empty {} buffer", name);
        }

        let flags = match buffer_type {
            BufferType::Storage | BufferType::BackendSpecific if location == MemoryLocation::GpuOnly => {
                D3D12_RESOURCE_FLAG_ALLOW_UNORDERED_ACCESS
            }
            _ => D3D12_RESOURCE_FLAG_NONE,
        };
        let desc = D3D12_RESOURCE_DESC {
            Dimension: D3D12_RESOURCE_DIMENSION_BUFFER,
            Alignment: 0,
            Width: size,
            Height: 1,
            DepthOrArraySize: 1,
            MipLevels: 1,
            Format: DXGI_FORMAT_UNKNOWN,
            SampleDesc: DXGI_SAMPLE_DESC { Count: 1, Quality: 0 },
            Layout: D3D12_TEXTURE_LAYOUT_ROW_MAJOR,
            Flags: flags,
        };

        let (resource, allocation) = ctx.create_resource(
            name,
            &desc,
            location,
            D3D12_RESOURCE_STATES(buffer_state_bits(state)),
            None,
        )?;

        let mapping = match location {
            MemoryLocation::GpuOnly => None,
            MemoryLocation::CpuToGpu | MemoryLocation::GpuToCpu => {
                // Nothing is read back from upload heaps
                let no_read = D3D12_RANGE { Begin: 0, End: 0 };
                let read_range = (location == MemoryLocation::CpuToGpu).then_some(&no_read as *const D3D12_RANGE);

                let mut data: *mut c_void = std::ptr::null_mut();
                let mapped = unsafe { resource.Map(0, read_range, Some(&mut data)) };
                match (mapped, NonNull::new(data.cast::<u8>())) {
                    (Ok(()), Some(ptr)) => Some(Mapping(ptr)),
                    (result, _) => {
                        drop(resource);
                        ctx.free(allocation);
                        engine_bail!(SOURCE, "Failed to map the {} buffer: {:?}", name, result.err());
                    }
                }
            }
        };

        Ok(Self {
            ctx,
            resource: ManuallyDrop::new(resource),
            allocation: Some(allocation),
            mapping,
            size,
            buffer_type,
            location,
            state: Mutex::new(state),
            upload: OnceLock::new(),
            readback: OnceLock::new(),
            reading: AtomicBool::new(false),
        })
    }

    pub(crate) fn gpu_address(&self) -> u64 {
        unsafe { self.resource.GetGPUVirtualAddress() }
    }

    fn mapped_ptr(&self) -> Result<NonNull<u8>> {
        self.mapping
            .map(|mapping| mapping.0)
            .ok_or_else(|| engine_err!(SOURCE, "Buffer is not CPU-accessible"))
    }

    pub(crate) fn write_mapped(&self, data: &[u8], offset: u64) -> Result<()> {
        check_range(SOURCE, self.size, offset, data.len() as u64)?;
        let ptr = self.mapped_ptr()?;
        unsafe {
            std::ptr::copy_nonoverlapping(data.as_ptr(), ptr.as_ptr().add(offset as usize), data.len());
        }
        Ok(())
    }

    /// Copy of the mapped bytes
    pub(crate) fn read_mapped(&self) -> Result<Vec<u8>> {
        let ptr = self.mapped_ptr()?;
        Ok(unsafe { std::slice::from_raw_parts(ptr.as_ptr(), self.size as usize) }.to_vec())
    }

    pub(crate) fn current_state(&self) -> ResourceState {
        self.state.lock().map(|state| *state).unwrap_or(ResourceState::Common)
    }

    fn set_state(&self, state: ResourceState) {
        if let Ok(mut current) = self.state.lock() {
            *current = state;
        }
    }

    /// Record the transitions of one side of a planned copy
    fn record_transitions(list: &ID3D12GraphicsCommandList, transitions: &[StateTransition], dst: &Self, src: &Self) {
        if transitions.is_empty() {
            return;
        }
        let barriers: Vec<D3D12_RESOURCE_BARRIER> = transitions
            .iter()
            .map(|transition| {
                let buffer = match transition.side {
                    CopySide::Destination => dst,
                    CopySide::Source => src,
                };
                buffer.set_state(transition.after);
                transition_barrier(
                    &buffer.resource,
                    D3D12_RESOURCE_BARRIER_ALL_SUBRESOURCES,
                    buffer_state_bits(transition.before),
                    buffer_state_bits(transition.after),
                )
            })
            .collect();
        unsafe { list.ResourceBarrier(&barriers) };
    }

    /// Record a copy from `src` into `self`, wrapped in the transitions both sides need
    ///
    /// Every transition is reverted after the copy, so both states end as
    /// they started.
    pub(crate) fn record_copy(
        &self,
        list: &ID3D12GraphicsCommandList,
        src: &Dx12Buffer,
        size: u64,
        src_offset: u64,
        dst_offset: u64,
    ) -> Result<()> {
        check_range(SOURCE, src.size, src_offset, size)?;
        check_range(SOURCE, self.size, dst_offset, size)?;

        let barriers = plan_buffer_copy(
            (self.current_state(), self.location),
            (src.current_state(), src.location),
        );
        Self::record_transitions(list, &barriers.before, self, src);
        unsafe {
            list.CopyBufferRegion(&*self.resource, dst_offset, &*src.resource, src_offset, size);
        }
        Self::record_transitions(list, &barriers.after, self, src);
        Ok(())
    }

    /// Record `record` with the buffer readable by the copy engine, then restore its state
    pub(crate) fn record_as_copy_source<F>(&self, list: &ID3D12GraphicsCommandList, record: F)
    where
        F: FnOnce(&ID3D12Resource),
    {
        let before = self.current_state();
        let copy_state = copy_transition(before, self.location, ResourceState::CopySource);
        if let Some(state) = copy_state {
            let barrier = transition_barrier(
                &self.resource,
                D3D12_RESOURCE_BARRIER_ALL_SUBRESOURCES,
                buffer_state_bits(before),
                buffer_state_bits(state),
            );
            unsafe { list.ResourceBarrier(&[barrier]) };
        }
        record(&self.resource);
        if let Some(state) = copy_state {
            let barrier = transition_barrier(
                &self.resource,
                D3D12_RESOURCE_BARRIER_ALL_SUBRESOURCES,
                buffer_state_bits(state),
                buffer_state_bits(before),
            );
            unsafe { list.ResourceBarrier(&[barrier]) };
        }
    }

    /// Submit a copy from `src` into `self` and wait for it
    fn copy_now(&self, src: &Dx12Buffer, size: u64, src_offset: u64, dst_offset: u64) -> Result<()> {
        self.ctx
            .execute_one_shot(|list| self.record_copy(list, src, size, src_offset, dst_offset))
    }

    /// Get the buffer in `cell`, creating it on first use
    fn once_buffer<'a>(
        &self,
        cell: &'a OnceLock<Box<Dx12Buffer>>,
        location: MemoryLocation,
        state: ResourceState,
        name: &str,
    ) -> Result<&'a Dx12Buffer> {
        if let Some(buffer) = cell.get() {
            return Ok(buffer);
        }

        let buffer = Dx12Buffer::with_placement(
            Arc::clone(&self.ctx),
            name,
            self.size,
            BufferType::Staging,
            location,
            state,
        )?;
        // A concurrent first use may have won the race; its buffer is kept
        let _ = cell.set(Box::new(buffer));
        cell.get()
            .map(|buffer| buffer.as_ref())
            .ok_or_else(|| Error::BackendError(format!("Failed to create {} buffer", name)))
    }
}

impl Buffer for Dx12Buffer {
    fn size(&self) -> u64 {
        self.size
    }

    fn buffer_type(&self) -> BufferType {
        self.buffer_type
    }

    fn memory_location(&self) -> MemoryLocation {
        self.location
    }

    fn state(&self) -> ResourceState {
        self.current_state()
    }

    fn write(&self, data: &[u8], offset: u64, recorder: Option<&mut dyn CommandRecorder>) -> Result<()> {
        check_range(SOURCE, self.size, offset, data.len() as u64)?;
        if data.is_empty() {
            return Ok(());
        }

        if is_directly_writable(self.current_state(), self.location) {
            return self.write_mapped(data, offset);
        }

        let upload = self.once_buffer(&self.upload, MemoryLocation::CpuToGpu, ResourceState::GenericRead, "upload")?;
        upload.write_mapped(data, offset)?;

        match recorder {
            Some(recorder) => recorder.copy_buffer(upload, offset, self, offset, data.len() as u64),
            None => self.copy_now(upload, data.len() as u64, offset, offset),
        }
    }

    fn copy(&self, src: &dyn Buffer, size: u64, src_offset: u64, dst_offset: u64) -> Result<()> {
        let Some(src) = src.downcast_ref::<Dx12Buffer>() else {
            engine_bail!(SOURCE, "Source buffer was not created by the Direct3D 12 backend");
        };
        self.copy_now(src, size, src_offset, dst_offset)
    }

    fn begin_read(&self) -> Result<NonNull<u8>> {
        if self.location == MemoryLocation::GpuToCpu {
            self.reading.store(true, Ordering::SeqCst);
            return self.mapped_ptr();
        }

        let readback = self.once_buffer(
            &self.readback,
            MemoryLocation::GpuToCpu,
            ResourceState::CopyDestination,
            "readback",
        )?;
        readback.copy_now(self, self.size, 0, 0)?;
        self.reading.store(true, Ordering::SeqCst);
        readback.mapped_ptr()
    }

    fn end_read(&self) {
        if !self.reading.swap(false, Ordering::SeqCst) {
            engine_warn!(SOURCE, "end_read called without a matching begin_read");
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for Dx12Buffer {
    fn drop(&mut self) {
        unsafe {
            ManuallyDrop::drop(&mut self.resource);
        }
        if let Some(allocation) = self.allocation.take() {
            self.ctx.free(allocation);
        }
    }
}
