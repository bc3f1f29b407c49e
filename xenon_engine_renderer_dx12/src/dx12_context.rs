/// Shared Direct3D 12 contexts
///
/// `InstanceContext` owns the DXGI factory. `GpuContext` owns everything GPU
/// objects need:
/// - the device and its direct queue (submissions serialized through a lock)
/// - the placed-resource allocator
/// - the two shader-visible descriptor heaps every descriptor allocates from
/// - a command list for one-shot transfers
///
/// Every backend object holds an `Arc<GpuContext>`, and the context holds an
/// `Arc<InstanceContext>`, so destruction always runs objects, then device,
/// then factory.

use std::mem::ManuallyDrop;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use gpu_allocator::d3d12::{Allocation, AllocationCreateDesc, Allocator};
use windows::core::Interface;
use windows::Win32::Foundation::{CloseHandle, HANDLE, WAIT_OBJECT_0};
use windows::Win32::Graphics::Direct3D12::*;
use windows::Win32::Graphics::Dxgi::IDXGIFactory4;
use windows::Win32::System::Threading::{CreateEventW, WaitForSingleObject, INFINITE};
use xenon_engine::xenon::backend::MemoryLocation;
use xenon_engine::xenon::{Error, Result};
use xenon_engine::{engine_bail, engine_err, engine_error};

use crate::dx12_slots::SlotAllocator;

pub(crate) const SOURCE: &str = "xenon::dx12";

/// Descriptors in the shader-visible CBV/SRV/UAV heap
const RESOURCE_HEAP_SIZE: u32 = 16384;

/// D3D12_MAX_SHADER_VISIBLE_SAMPLER_HEAP_SIZE
const SAMPLER_HEAP_SIZE: u32 = 2048;

// ===== INSTANCE CONTEXT =====

pub(crate) struct InstanceContext {
    pub factory: IDXGIFactory4,
    pub application_name: String,
    pub application_version: u32,
    pub debug_layer: bool,
}

// ===== DESCRIPTOR HEAPS =====

/// A shader-visible heap and the ranges handed out of it
pub(crate) struct ShaderVisibleHeap {
    pub heap: ID3D12DescriptorHeap,
    pub increment: u32,
    slots: Mutex<SlotAllocator>,
}

/// Range of a shader-visible heap owned by one descriptor table
pub(crate) struct HeapRange {
    pub start: u32,
    pub count: u32,
}

impl ShaderVisibleHeap {
    fn new(device: &ID3D12Device, heap_type: D3D12_DESCRIPTOR_HEAP_TYPE, capacity: u32) -> Result<Self> {
        let desc = D3D12_DESCRIPTOR_HEAP_DESC {
            Type: heap_type,
            NumDescriptors: capacity,
            Flags: D3D12_DESCRIPTOR_HEAP_FLAG_SHADER_VISIBLE,
            NodeMask: 0,
        };
        unsafe {
            let heap: ID3D12DescriptorHeap = device
                .CreateDescriptorHeap(&desc)
                .map_err(|e| engine_err!(SOURCE, "Failed to create a shader-visible descriptor heap: {:?}", e))?;
            let increment = device.GetDescriptorHandleIncrementSize(heap_type);
            Ok(Self { heap, increment, slots: Mutex::new(SlotAllocator::new(capacity)) })
        }
    }

    pub fn allocate(&self, count: u32) -> Result<HeapRange> {
        let mut slots = self.slots.lock().map_err(|_| engine_err!(SOURCE, "Descriptor heap lock poisoned"))?;
        match slots.allocate(count) {
            Some(start) => Ok(HeapRange { start, count }),
            None => engine_bail!(
                SOURCE,
                "Shader-visible descriptor heap exhausted ({} of {} slots free, {} requested)",
                slots.available(),
                slots.capacity(),
                count
            ),
        }
    }

    pub fn release(&self, range: &HeapRange) {
        if let Ok(mut slots) = self.slots.lock() {
            slots.release(range.start, range.count);
        }
    }

    pub fn cpu_handle(&self, slot: u32) -> D3D12_CPU_DESCRIPTOR_HANDLE {
        let start = unsafe { self.heap.GetCPUDescriptorHandleForHeapStart() };
        D3D12_CPU_DESCRIPTOR_HANDLE { ptr: start.ptr + (slot * self.increment) as usize }
    }

    pub fn gpu_handle(&self, slot: u32) -> D3D12_GPU_DESCRIPTOR_HANDLE {
        let start = unsafe { self.heap.GetGPUDescriptorHandleForHeapStart() };
        D3D12_GPU_DESCRIPTOR_HANDLE { ptr: start.ptr + (slot * self.increment) as u64 }
    }
}

// ===== FENCE WAITS =====

/// Block until `fence` reaches `value`
pub(crate) fn wait_for_fence(fence: &ID3D12Fence, value: u64, timeout: Duration) -> Result<()> {
    unsafe {
        if fence.GetCompletedValue() >= value {
            return Ok(());
        }

        let event: HANDLE = CreateEventW(None, false, false, None)
            .map_err(|e| engine_err!(SOURCE, "Failed to create a fence event: {:?}", e))?;
        let result = fence
            .SetEventOnCompletion(value, event)
            .map_err(|e| engine_err!(SOURCE, "Failed to set the fence completion event: {:?}", e))
            .and_then(|()| {
                let milliseconds = match timeout {
                    Duration::MAX => INFINITE,
                    timeout => u32::try_from(timeout.as_millis()).unwrap_or(INFINITE),
                };
                if WaitForSingleObject(event, milliseconds) == WAIT_OBJECT_0 {
                    Ok(())
                } else {
                    Err(engine_err!(SOURCE, "Timed out waiting for fence value {}", value))
                }
            });
        CloseHandle(event).ok();
        result
    }
}

// ===== BARRIERS =====

/// Transition barrier of one subresource
///
/// The barrier borrows `resource` without a reference count, so it must be
/// recorded while `resource` is alive.
pub(crate) fn transition_barrier(
    resource: &ID3D12Resource,
    subresource: u32,
    before: i32,
    after: i32,
) -> D3D12_RESOURCE_BARRIER {
    D3D12_RESOURCE_BARRIER {
        Type: D3D12_RESOURCE_BARRIER_TYPE_TRANSITION,
        Flags: D3D12_RESOURCE_BARRIER_FLAG_NONE,
        Anonymous: D3D12_RESOURCE_BARRIER_0 {
            Transition: ManuallyDrop::new(D3D12_RESOURCE_TRANSITION_BARRIER {
                pResource: unsafe { std::mem::transmute_copy(resource) },
                Subresource: subresource,
                StateBefore: D3D12_RESOURCE_STATES(before),
                StateAfter: D3D12_RESOURCE_STATES(after),
            }),
        },
    }
}

/// Unordered access barrier covering every UAV write
pub(crate) fn uav_barrier() -> D3D12_RESOURCE_BARRIER {
    D3D12_RESOURCE_BARRIER {
        Type: D3D12_RESOURCE_BARRIER_TYPE_UAV,
        Flags: D3D12_RESOURCE_BARRIER_FLAG_NONE,
        Anonymous: D3D12_RESOURCE_BARRIER_0 {
            UAV: ManuallyDrop::new(D3D12_RESOURCE_UAV_BARRIER { pResource: ManuallyDrop::new(None) }),
        },
    }
}

// ===== GPU CONTEXT =====

struct OneShot {
    allocator: ID3D12CommandAllocator,
    list: ID3D12GraphicsCommandList,
    fence: ID3D12Fence,
    value: u64,
}

pub(crate) struct GpuContext {
    pub device: ID3D12Device,
    pub queue: ID3D12CommandQueue,
    queue_lock: Mutex<()>,

    /// Wrapped in ManuallyDrop so heaps are released before the device
    allocator: ManuallyDrop<Mutex<Allocator>>,

    pub resource_heap: ShaderVisibleHeap,
    pub sampler_heap: ShaderVisibleHeap,

    one_shot: Mutex<OneShot>,

    pub adapter_name: String,
    pub instance: Arc<InstanceContext>,
}

impl GpuContext {
    pub fn new(instance: Arc<InstanceContext>, device: ID3D12Device, allocator: Allocator, adapter_name: String) -> Result<Self> {
        unsafe {
            let queue_desc = D3D12_COMMAND_QUEUE_DESC {
                Type: D3D12_COMMAND_LIST_TYPE_DIRECT,
                Priority: D3D12_COMMAND_QUEUE_PRIORITY_NORMAL.0,
                Flags: D3D12_COMMAND_QUEUE_FLAG_NONE,
                NodeMask: 0,
            };
            let queue: ID3D12CommandQueue = device.CreateCommandQueue(&queue_desc).map_err(|e| {
                engine_error!(SOURCE, "Failed to create the direct queue: {:?}", e);
                Error::InitializationFailed(format!("Failed to create the direct queue: {:?}", e))
            })?;

            let command_allocator: ID3D12CommandAllocator = device
                .CreateCommandAllocator(D3D12_COMMAND_LIST_TYPE_DIRECT)
                .map_err(|e| engine_err!(SOURCE, "Failed to create the one-shot command allocator: {:?}", e))?;
            let list: ID3D12GraphicsCommandList = device
                .CreateCommandList(0, D3D12_COMMAND_LIST_TYPE_DIRECT, &command_allocator, None::<&ID3D12PipelineState>)
                .map_err(|e| engine_err!(SOURCE, "Failed to create the one-shot command list: {:?}", e))?;
            list.Close()
                .map_err(|e| engine_err!(SOURCE, "Failed to close the one-shot command list: {:?}", e))?;
            let fence: ID3D12Fence = device
                .CreateFence(0, D3D12_FENCE_FLAG_NONE)
                .map_err(|e| engine_err!(SOURCE, "Failed to create the one-shot fence: {:?}", e))?;

            let resource_heap =
                ShaderVisibleHeap::new(&device, D3D12_DESCRIPTOR_HEAP_TYPE_CBV_SRV_UAV, RESOURCE_HEAP_SIZE)?;
            let sampler_heap = ShaderVisibleHeap::new(&device, D3D12_DESCRIPTOR_HEAP_TYPE_SAMPLER, SAMPLER_HEAP_SIZE)?;

            Ok(Self {
                device,
                queue,
                queue_lock: Mutex::new(()),
                allocator: ManuallyDrop::new(Mutex::new(allocator)),
                resource_heap,
                sampler_heap,
                one_shot: Mutex::new(OneShot { allocator: command_allocator, list, fence, value: 0 }),
                adapter_name,
                instance,
            })
        }
    }

    /// Run `f` while holding the queue lock
    pub fn with_queue<T>(&self, f: impl FnOnce(&ID3D12CommandQueue) -> Result<T>) -> Result<T> {
        let _guard = self.queue_lock.lock().map_err(|_| engine_err!(SOURCE, "Queue lock poisoned"))?;
        f(&self.queue)
    }

    /// Record `record` into the one-shot list, execute it and wait for completion
    pub fn execute_one_shot<F>(&self, record: F) -> Result<()>
    where
        F: FnOnce(&ID3D12GraphicsCommandList) -> Result<()>,
    {
        let mut one_shot = self
            .one_shot
            .lock()
            .map_err(|_| engine_err!(SOURCE, "One-shot command list lock poisoned"))?;

        unsafe {
            one_shot
                .allocator
                .Reset()
                .map_err(|e| engine_err!(SOURCE, "Failed to reset the one-shot command allocator: {:?}", e))?;
            one_shot
                .list
                .Reset(&one_shot.allocator, None::<&ID3D12PipelineState>)
                .map_err(|e| engine_err!(SOURCE, "Failed to reset the one-shot command list: {:?}", e))?;

            let recorded = record(&one_shot.list);
            one_shot
                .list
                .Close()
                .map_err(|e| engine_err!(SOURCE, "Failed to close the one-shot command list: {:?}", e))?;
            recorded?;

            one_shot.value += 1;
            let value = one_shot.value;
            let list: ID3D12CommandList = one_shot
                .list
                .cast()
                .map_err(|e| engine_err!(SOURCE, "Failed to cast the one-shot command list: {:?}", e))?;
            self.with_queue(|queue| {
                queue.ExecuteCommandLists(&[Some(list)]);
                queue
                    .Signal(&one_shot.fence, value)
                    .map_err(|e| engine_err!(SOURCE, "Failed to signal the one-shot fence: {:?}", e))
            })?;
            wait_for_fence(&one_shot.fence, value, Duration::MAX)
        }
    }

    /// Create a placed resource, mapping heap exhaustion to `Error::OutOfMemory`
    pub fn create_resource(
        &self,
        name: &str,
        desc: &D3D12_RESOURCE_DESC,
        location: MemoryLocation,
        initial_state: D3D12_RESOURCE_STATES,
        clear_value: Option<&D3D12_CLEAR_VALUE>,
    ) -> Result<(ID3D12Resource, Allocation)> {
        let mut allocator = self
            .allocator
            .lock()
            .map_err(|_| engine_err!(SOURCE, "Allocator lock poisoned"))?;

        let location = match location {
            MemoryLocation::GpuOnly => gpu_allocator::MemoryLocation::GpuOnly,
            MemoryLocation::CpuToGpu => gpu_allocator::MemoryLocation::CpuToGpu,
            MemoryLocation::GpuToCpu => gpu_allocator::MemoryLocation::GpuToCpu,
        };
        let allocation_desc = AllocationCreateDesc::from_d3d12_resource_desc(&self.device, desc, name, location);
        let allocation = allocator.allocate(&allocation_desc).map_err(|e| {
            let size_mb = allocation_desc.size as f64 / (1024.0 * 1024.0);
            engine_error!(SOURCE, "Out of GPU memory for {} (required: {:.2} MB): {:?}", name, size_mb, e);
            Error::OutOfMemory
        })?;

        let mut resource: Option<ID3D12Resource> = None;
        let created = unsafe {
            self.device.CreatePlacedResource(
                allocation.heap(),
                allocation.offset(),
                desc,
                initial_state,
                clear_value.map(|value| value as *const _),
                &mut resource,
            )
        };
        match (created, resource) {
            (Ok(()), Some(resource)) => Ok((resource, allocation)),
            (result, _) => {
                allocator.free(allocation).ok();
                engine_bail!(SOURCE, "Failed to create the {} resource: {:?}", name, result.err())
            }
        }
    }

    /// Return an allocation; never fails loudly since it runs from `Drop`
    pub fn free(&self, allocation: Allocation) {
        if let Ok(mut allocator) = self.allocator.lock() {
            allocator.free(allocation).ok();
        }
    }

    /// Signal the queue and wait until everything submitted so far completed
    pub fn wait_idle(&self) -> Result<()> {
        let fence: ID3D12Fence = unsafe { self.device.CreateFence(0, D3D12_FENCE_FLAG_NONE) }
            .map_err(|e| engine_err!(SOURCE, "Failed to create the idle fence: {:?}", e))?;
        self.with_queue(|queue| {
            unsafe { queue.Signal(&fence, 1) }
                .map_err(|e| engine_err!(SOURCE, "Failed to signal the idle fence: {:?}", e))
        })?;
        wait_for_fence(&fence, 1, Duration::MAX)
    }
}

impl Drop for GpuContext {
    fn drop(&mut self) {
        if self.wait_idle().is_err() {
            engine_error!(SOURCE, "Failed to wait for the device to become idle before destroying it");
        }
        unsafe {
            ManuallyDrop::drop(&mut self.allocator);
        }
    }
}
