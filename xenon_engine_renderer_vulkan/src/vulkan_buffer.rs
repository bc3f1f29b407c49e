/// VulkanBuffer - Vulkan implementation of the Buffer trait
///
/// Host-visible buffers (uniform and staging) stay persistently mapped and are
/// written in place. Device-local buffers receive writes through a staging
/// buffer and read back through a readback buffer, both created on first use.

use std::any::Any;
use std::ptr::NonNull;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, OnceLock};

use ash::vk;
use gpu_allocator::vulkan::Allocation;
use xenon_engine::xenon::backend::{
    check_range, copy_transition, is_directly_writable, Buffer, BufferType, CommandRecorder, MemoryLocation,
    ResourceState,
};
use xenon_engine::xenon::{Error, Result};
use xenon_engine::{engine_bail, engine_err, engine_warn};

use crate::vulkan_context::GpuContext;
use crate::vulkan_conversions::buffer_state_access;

const SOURCE: &str = "xenon::vulkan::Buffer";

/// Vulkan buffer implementation
pub struct VulkanBuffer {
    /// Shared GPU context (device, allocator, queue, command pool)
    ctx: Arc<GpuContext>,
    /// Vulkan buffer
    pub(crate) buffer: vk::Buffer,
    /// GPU memory allocation, `None` only while dropping
    allocation: Option<Allocation>,
    size: u64,
    buffer_type: BufferType,
    location: MemoryLocation,
    state: Mutex<ResourceState>,
    staging: OnceLock<Box<VulkanBuffer>>,
    readback: OnceLock<Box<VulkanBuffer>>,
    reading: AtomicBool,
}

impl VulkanBuffer {
    /// Create a buffer of `buffer_type`
    ///
    /// Uniform and staging buffers live in host-visible memory, everything
    /// else is device-local.
    pub(crate) fn new(ctx: Arc<GpuContext>, size: u64, buffer_type: BufferType) -> Result<Self> {
        let (location, state) = match buffer_type {
            BufferType::Uniform | BufferType::Staging => (MemoryLocation::CpuToGpu, ResourceState::GenericRead),
            _ => (MemoryLocation::GpuOnly, ResourceState::initial_for(buffer_type)),
        };
        let usage = Self::usage_flags(buffer_type, ctx.ray_tracing.is_some());
        Self::with_usage(ctx, "buffer", size, buffer_type, usage, location, state)
    }

    /// Create a buffer with explicit usage and placement (backend-internal buffers)
    pub(crate) fn with_usage(
        ctx: Arc<GpuContext>,
        name: &str,
        size: u64,
        buffer_type: BufferType,
        usage: vk::BufferUsageFlags,
        location: MemoryLocation,
        state: ResourceState,
    ) -> Result<Self> {
        if size == 0 {
            engine_bail!(SOURCE, "Cannot create an empty {} buffer", name);
        }

        unsafe {
            let buffer_create_info = vk::BufferCreateInfo::default()
                .size(size)
                .usage(usage)
                .sharing_mode(vk::SharingMode::EXCLUSIVE);

            let buffer = ctx
                .device
                .create_buffer(&buffer_create_info, None)
                .map_err(|e| engine_err!(SOURCE, "Failed to create buffer of size {} bytes: {:?}", size, e))?;

            let requirements = ctx.device.get_buffer_memory_requirements(buffer);
            let allocation = match ctx.allocate(name, requirements, Self::allocator_location(location), true) {
                Ok(allocation) => allocation,
                Err(e) => {
                    ctx.device.destroy_buffer(buffer, None);
                    return Err(e);
                }
            };

            if let Err(e) = ctx
                .device
                .bind_buffer_memory(buffer, allocation.memory(), allocation.offset())
            {
                ctx.free(allocation);
                ctx.device.destroy_buffer(buffer, None);
                engine_bail!(SOURCE, "Failed to bind buffer memory: {:?}", e);
            }

            Ok(Self {
                ctx,
                buffer,
                allocation: Some(allocation),
                size,
                buffer_type,
                location,
                state: Mutex::new(state),
                staging: OnceLock::new(),
                readback: OnceLock::new(),
                reading: AtomicBool::new(false),
            })
        }
    }

    fn usage_flags(buffer_type: BufferType, ray_tracing: bool) -> vk::BufferUsageFlags {
        let transfer = vk::BufferUsageFlags::TRANSFER_SRC | vk::BufferUsageFlags::TRANSFER_DST;
        let geometry_input = if ray_tracing {
            vk::BufferUsageFlags::SHADER_DEVICE_ADDRESS
                | vk::BufferUsageFlags::ACCELERATION_STRUCTURE_BUILD_INPUT_READ_ONLY_KHR
        } else {
            vk::BufferUsageFlags::empty()
        };

        transfer
            | match buffer_type {
                BufferType::Index => vk::BufferUsageFlags::INDEX_BUFFER | geometry_input,
                BufferType::Vertex => vk::BufferUsageFlags::VERTEX_BUFFER | geometry_input,
                BufferType::Uniform => vk::BufferUsageFlags::UNIFORM_BUFFER,
                BufferType::Storage => vk::BufferUsageFlags::STORAGE_BUFFER,
                BufferType::Staging => vk::BufferUsageFlags::empty(),
                BufferType::BackendSpecific => vk::BufferUsageFlags::STORAGE_BUFFER | geometry_input,
            }
    }

    fn allocator_location(location: MemoryLocation) -> gpu_allocator::MemoryLocation {
        match location {
            MemoryLocation::GpuOnly => gpu_allocator::MemoryLocation::GpuOnly,
            MemoryLocation::CpuToGpu => gpu_allocator::MemoryLocation::CpuToGpu,
            MemoryLocation::GpuToCpu => gpu_allocator::MemoryLocation::GpuToCpu,
        }
    }

    /// Address for acceleration structure builds and shader binding tables
    pub(crate) fn device_address(&self) -> vk::DeviceAddress {
        let info = vk::BufferDeviceAddressInfo::default().buffer(self.buffer);
        unsafe { self.ctx.device.get_buffer_device_address(&info) }
    }

    fn mapped_ptr(&self) -> Result<NonNull<u8>> {
        self.allocation
            .as_ref()
            .and_then(|allocation| allocation.mapped_ptr())
            .map(|ptr| ptr.cast::<u8>())
            .ok_or_else(|| engine_err!(SOURCE, "Buffer is not CPU-accessible"))
    }

    fn write_mapped(&self, data: &[u8], offset: u64) -> Result<()> {
        let ptr = self.mapped_ptr()?;
        unsafe {
            std::ptr::copy_nonoverlapping(data.as_ptr(), ptr.as_ptr().add(offset as usize), data.len());
        }
        Ok(())
    }

    fn current_state(&self) -> ResourceState {
        self.state.lock().map(|state| *state).unwrap_or(ResourceState::Common)
    }

    fn set_state(&self, state: ResourceState) {
        if let Ok(mut current) = self.state.lock() {
            *current = state;
        }
    }

    /// Record a pipeline barrier moving the buffer from `from` to `to`
    fn record_transition(&self, command_buffer: vk::CommandBuffer, from: ResourceState, to: ResourceState) {
        let (src_access, src_stage) = buffer_state_access(from);
        let (dst_access, dst_stage) = buffer_state_access(to);
        let barrier = vk::BufferMemoryBarrier::default()
            .src_access_mask(src_access)
            .dst_access_mask(dst_access)
            .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .buffer(self.buffer)
            .offset(0)
            .size(vk::WHOLE_SIZE);

        unsafe {
            self.ctx.device.cmd_pipeline_barrier(
                command_buffer,
                src_stage,
                dst_stage,
                vk::DependencyFlags::empty(),
                &[],
                &[barrier],
                &[],
            );
        }
        self.set_state(to);
    }

    /// Record a copy from `src` into `self`, wrapped in the transitions both sides need
    ///
    /// Any transition is reverted after the copy, so both states end as they started.
    pub(crate) fn record_copy(
        &self,
        command_buffer: vk::CommandBuffer,
        src: &VulkanBuffer,
        size: u64,
        src_offset: u64,
        dst_offset: u64,
    ) -> Result<()> {
        check_range(SOURCE, src.size, src_offset, size)?;
        check_range(SOURCE, self.size, dst_offset, size)?;

        let dst_before = self.current_state();
        let src_before = src.current_state();
        let dst_copy = copy_transition(dst_before, self.location, ResourceState::CopyDestination);
        let src_copy = copy_transition(src_before, src.location, ResourceState::CopySource);

        if let Some(state) = dst_copy {
            self.record_transition(command_buffer, dst_before, state);
        }
        if let Some(state) = src_copy {
            src.record_transition(command_buffer, src_before, state);
        }

        let region = vk::BufferCopy::default()
            .src_offset(src_offset)
            .dst_offset(dst_offset)
            .size(size);
        unsafe {
            self.ctx.device.cmd_copy_buffer(command_buffer, src.buffer, self.buffer, &[region]);
        }

        if let Some(state) = dst_copy {
            self.record_transition(command_buffer, state, dst_before);
        }
        if let Some(state) = src_copy {
            src.record_transition(command_buffer, state, src_before);
        }
        Ok(())
    }

    /// Record `record` with the buffer in a copy-source state, then restore its state
    pub(crate) fn record_as_copy_source<F>(&self, command_buffer: vk::CommandBuffer, record: F)
    where
        F: FnOnce(vk::Buffer),
    {
        let before = self.current_state();
        let copy_state = copy_transition(before, self.location, ResourceState::CopySource);
        if let Some(state) = copy_state {
            self.record_transition(command_buffer, before, state);
        }
        record(self.buffer);
        if let Some(state) = copy_state {
            self.record_transition(command_buffer, state, before);
        }
    }

    /// Submit a copy from `src` into `self` and wait for it
    fn copy_now(&self, src: &VulkanBuffer, size: u64, src_offset: u64, dst_offset: u64) -> Result<()> {
        let mut result = Ok(());
        self.ctx.execute_one_shot(|command_buffer| {
            result = self.record_copy(command_buffer, src, size, src_offset, dst_offset);
        })?;
        result
    }

    /// Get the buffer in `cell`, creating it on first use
    fn once_buffer<'a>(
        &self,
        cell: &'a OnceLock<Box<VulkanBuffer>>,
        location: MemoryLocation,
        state: ResourceState,
        name: &str,
    ) -> Result<&'a VulkanBuffer> {
        if let Some(buffer) = cell.get() {
            return Ok(buffer);
        }

        let usage = vk::BufferUsageFlags::TRANSFER_SRC | vk::BufferUsageFlags::TRANSFER_DST;
        let buffer = VulkanBuffer::with_usage(
            Arc::clone(&self.ctx),
            name,
            self.size,
            BufferType::Staging,
            usage,
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

impl Buffer for VulkanBuffer {
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

        let staging = self.once_buffer(
            &self.staging,
            MemoryLocation::CpuToGpu,
            ResourceState::GenericRead,
            "staging",
        )?;
        staging.write_mapped(data, offset)?;

        match recorder {
            Some(recorder) => recorder.copy_buffer(staging, offset, self, offset, data.len() as u64),
            None => self.copy_now(staging, data.len() as u64, offset, offset),
        }
    }

    fn copy(&self, src: &dyn Buffer, size: u64, src_offset: u64, dst_offset: u64) -> Result<()> {
        let Some(src) = src.downcast_ref::<VulkanBuffer>() else {
            engine_bail!(SOURCE, "Source buffer was not created by the Vulkan backend");
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

impl Drop for VulkanBuffer {
    fn drop(&mut self) {
        unsafe {
            if let Some(allocation) = self.allocation.take() {
                self.ctx.free(allocation);
            }
            self.ctx.device.destroy_buffer(self.buffer, None);
        }
    }
}
