/// Shared Vulkan contexts
///
/// `InstanceContext` owns the Vulkan instance (and the validation messenger),
/// `GpuContext` owns the logical device with everything GPU objects need:
/// - Device for Vulkan API calls
/// - Allocator for memory management
/// - Queue for command submission (externally synchronized through a lock)
/// - Command pool for one-shot transfer operations
///
/// Every backend object holds an `Arc<GpuContext>`, and the context holds an
/// `Arc<InstanceContext>`, so destruction always runs objects, then device,
/// then instance.

use std::mem::ManuallyDrop;
use std::sync::{Arc, Mutex};

use ash::vk;
use gpu_allocator::vulkan::{Allocation, AllocationCreateDesc, AllocationScheme, Allocator};
use gpu_allocator::MemoryLocation;
use xenon_engine::xenon::{Error, Result};
use xenon_engine::{engine_err, engine_error};

pub(crate) const SOURCE: &str = "xenon::vulkan";

// ===== INSTANCE CONTEXT =====

/// Vulkan instance and the loaders living as long as it
pub(crate) struct InstanceContext {
    pub entry: ash::Entry,
    pub instance: ash::Instance,
    pub surface_loader: ash::khr::surface::Instance,
    pub application_name: String,
    pub application_version: u32,
    #[cfg(feature = "vulkan-validation")]
    pub(crate) debug_messenger: Option<(ash::ext::debug_utils::Instance, vk::DebugUtilsMessengerEXT)>,
}

impl Drop for InstanceContext {
    fn drop(&mut self) {
        unsafe {
            #[cfg(feature = "vulkan-validation")]
            {
                // No callback may run while the messenger is being torn down
                crate::debug::cleanup_debug_config();
                if let Some((debug_utils, messenger)) = self.debug_messenger.take() {
                    debug_utils.destroy_debug_utils_messenger(messenger, None);
                }
            }

            self.instance.destroy_instance(None);
        }
    }
}

// ===== GPU CONTEXT =====

/// Ray tracing extension loaders and the pipeline limits the shader binding table needs
pub(crate) struct RayTracingContext {
    pub acceleration_structure: ash::khr::acceleration_structure::Device,
    pub pipeline: ash::khr::ray_tracing_pipeline::Device,
    pub shader_group_handle_size: u32,
    pub shader_group_handle_alignment: u32,
    pub shader_group_base_alignment: u32,
    pub max_ray_recursion_depth: u32,
}

/// Shared GPU context for all Vulkan resources
pub(crate) struct GpuContext {
    /// Vulkan logical device
    pub device: ash::Device,

    /// Wrapped in ManuallyDrop so memory pages are released BEFORE the device is destroyed
    pub allocator: ManuallyDrop<Mutex<Allocator>>,

    pub physical_device: vk::PhysicalDevice,
    pub limits: vk::PhysicalDeviceLimits,
    pub device_name: String,

    /// Graphics + compute queue, also used for presentation
    pub graphics_queue: vk::Queue,
    pub graphics_queue_family: u32,
    queue_lock: Mutex<()>,

    /// Reusable pool for one-shot transfers (TRANSIENT + RESET_COMMAND_BUFFER)
    pub upload_command_pool: Mutex<vk::CommandPool>,

    /// Present when the device was created with ray tracing enabled
    pub ray_tracing: Option<RayTracingContext>,

    pub swapchain_loader: ash::khr::swapchain::Device,

    /// Dropped after `Drop::drop` ran, i.e. after the device is gone
    pub instance: Arc<InstanceContext>,
}

impl GpuContext {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        instance: Arc<InstanceContext>,
        device: ash::Device,
        allocator: Allocator,
        physical_device: vk::PhysicalDevice,
        properties: &vk::PhysicalDeviceProperties,
        graphics_queue_family: u32,
        upload_command_pool: vk::CommandPool,
        ray_tracing: Option<RayTracingContext>,
    ) -> Self {
        let graphics_queue = unsafe { device.get_device_queue(graphics_queue_family, 0) };
        let swapchain_loader = ash::khr::swapchain::Device::new(&instance.instance, &device);
        let device_name = properties
            .device_name_as_c_str()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|_| "Unknown".to_string());

        Self {
            device,
            allocator: ManuallyDrop::new(Mutex::new(allocator)),
            physical_device,
            limits: properties.limits,
            device_name,
            graphics_queue,
            graphics_queue_family,
            queue_lock: Mutex::new(()),
            upload_command_pool: Mutex::new(upload_command_pool),
            ray_tracing,
            swapchain_loader,
            instance,
        }
    }

    pub fn ray_tracing(&self) -> Result<&RayTracingContext> {
        self.ray_tracing
            .as_ref()
            .ok_or_else(|| engine_err!(SOURCE, "Ray tracing was not enabled on this device"))
    }

    /// Submit to the graphics queue
    pub fn queue_submit(&self, submits: &[vk::SubmitInfo<'_>], fence: vk::Fence) -> Result<()> {
        let _guard = self
            .queue_lock
            .lock()
            .map_err(|_| engine_err!(SOURCE, "Queue lock poisoned"))?;
        unsafe {
            self.device
                .queue_submit(self.graphics_queue, submits, fence)
                .map_err(|e| engine_err!(SOURCE, "Failed to submit command buffers: {:?}", e))
        }
    }

    /// Present on the graphics queue; returns whether the swapchain is suboptimal
    pub fn queue_present(&self, present_info: &vk::PresentInfoKHR<'_>) -> std::result::Result<bool, vk::Result> {
        let _guard = self.queue_lock.lock().map_err(|_| vk::Result::ERROR_UNKNOWN)?;
        unsafe { self.swapchain_loader.queue_present(self.graphics_queue, present_info) }
    }

    /// Record `record` into a transient command buffer, submit it and wait for completion
    pub fn execute_one_shot<F>(&self, record: F) -> Result<()>
    where
        F: FnOnce(vk::CommandBuffer),
    {
        let pool = self
            .upload_command_pool
            .lock()
            .map_err(|_| engine_err!(SOURCE, "Upload command pool lock poisoned"))?;

        unsafe {
            let alloc_info = vk::CommandBufferAllocateInfo::default()
                .command_pool(*pool)
                .level(vk::CommandBufferLevel::PRIMARY)
                .command_buffer_count(1);

            let command_buffer = self
                .device
                .allocate_command_buffers(&alloc_info)
                .map_err(|e| engine_err!(SOURCE, "Failed to allocate one-shot command buffer: {:?}", e))?[0];

            let result = self.record_and_wait(command_buffer, record);
            self.device.free_command_buffers(*pool, &[command_buffer]);
            result
        }
    }

    unsafe fn record_and_wait<F>(&self, command_buffer: vk::CommandBuffer, record: F) -> Result<()>
    where
        F: FnOnce(vk::CommandBuffer),
    {
        unsafe {
            let begin_info = vk::CommandBufferBeginInfo::default()
                .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
            self.device
                .begin_command_buffer(command_buffer, &begin_info)
                .map_err(|e| engine_err!(SOURCE, "Failed to begin one-shot command buffer: {:?}", e))?;

            record(command_buffer);

            self.device
                .end_command_buffer(command_buffer)
                .map_err(|e| engine_err!(SOURCE, "Failed to end one-shot command buffer: {:?}", e))?;

            let fence = self
                .device
                .create_fence(&vk::FenceCreateInfo::default(), None)
                .map_err(|e| engine_err!(SOURCE, "Failed to create one-shot fence: {:?}", e))?;

            let command_buffers = [command_buffer];
            let submit_info = vk::SubmitInfo::default().command_buffers(&command_buffers);
            let result = self.queue_submit(&[submit_info], fence).and_then(|()| {
                self.device
                    .wait_for_fences(&[fence], true, u64::MAX)
                    .map_err(|e| engine_err!(SOURCE, "Failed to wait for one-shot fence: {:?}", e))
            });

            self.device.destroy_fence(fence, None);
            result
        }
    }

    /// Allocate device memory, mapping exhaustion to `Error::OutOfMemory`
    pub fn allocate(
        &self,
        name: &str,
        requirements: vk::MemoryRequirements,
        location: MemoryLocation,
        linear: bool,
    ) -> Result<Allocation> {
        let mut allocator = self
            .allocator
            .lock()
            .map_err(|_| engine_err!(SOURCE, "Allocator lock poisoned"))?;

        allocator
            .allocate(&AllocationCreateDesc {
                name,
                requirements,
                location,
                linear,
                allocation_scheme: AllocationScheme::GpuAllocatorManaged,
            })
            .map_err(|e| {
                let size_mb = requirements.size as f64 / (1024.0 * 1024.0);
                engine_error!(SOURCE, "Out of GPU memory for {} (required: {:.2} MB): {:?}", name, size_mb, e);
                Error::OutOfMemory
            })
    }

    /// Return an allocation; never fails loudly since it runs from `Drop`
    pub fn free(&self, allocation: Allocation) {
        if let Ok(mut allocator) = self.allocator.lock() {
            allocator.free(allocation).ok();
        }
    }
}

impl Drop for GpuContext {
    fn drop(&mut self) {
        unsafe {
            self.device.device_wait_idle().ok();

            if let Ok(pool) = self.upload_command_pool.get_mut() {
                if *pool != vk::CommandPool::null() {
                    self.device.destroy_command_pool(*pool, None);
                    *pool = vk::CommandPool::null();
                }
            }

            ManuallyDrop::drop(&mut self.allocator);

            self.device.destroy_device(None);
        }
    }
}
