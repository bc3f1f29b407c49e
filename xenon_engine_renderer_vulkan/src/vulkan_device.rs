/// VulkanDevice - Vulkan implementation of the Device trait
///
/// Picks a physical device (discrete GPUs first), creates the logical device
/// with a single graphics + compute queue, the memory allocator and the
/// upload command pool, and enables the ray tracing extensions when they are
/// both requested and supported.

use std::any::Any;
use std::ffi::{c_char, CStr};
use std::sync::Arc;

use ash::vk;
use gpu_allocator::vulkan::{Allocator, AllocatorCreateDesc};
use xenon_engine::xenon::backend::{negotiate_render_targets, Device, RenderTargetType};
use xenon_engine::xenon::{Error, Result};
use xenon_engine::{engine_debug, engine_err, engine_error, engine_info, engine_warn};

use crate::vulkan_context::{GpuContext, InstanceContext, RayTracingContext, SOURCE};
use crate::vulkan_instance::VulkanInstance;

const RAY_TRACING_EXTENSIONS: [&CStr; 3] = [
    ash::khr::acceleration_structure::NAME,
    ash::khr::ray_tracing_pipeline::NAME,
    ash::khr::deferred_host_operations::NAME,
];

/// Physical device chosen for the logical device
struct Candidate {
    physical_device: vk::PhysicalDevice,
    properties: vk::PhysicalDeviceProperties,
    queue_family: u32,
    extensions: Vec<vk::ExtensionProperties>,
    score: u32,
}

impl Candidate {
    fn has_extension(&self, name: &CStr) -> bool {
        self.extensions
            .iter()
            .any(|properties| properties.extension_name_as_c_str().is_ok_and(|n| n == name))
    }
}

pub struct VulkanDevice {
    pub(crate) context: Arc<GpuContext>,
    render_targets: RenderTargetType,
}

impl VulkanDevice {
    pub fn new(instance: &VulkanInstance, required_render_targets: RenderTargetType) -> Result<Self> {
        let instance_context = Arc::clone(&instance.context);
        let candidate = Self::pick_physical_device(&instance_context)?;

        let mut available = RenderTargetType::RASTERIZER;
        if Self::supports_ray_tracing(&instance_context, &candidate) {
            available |= RenderTargetType::RAY_TRACER;
        }
        let render_targets = negotiate_render_targets(required_render_targets, available);
        let enable_ray_tracing = render_targets.contains(RenderTargetType::RAY_TRACER);

        let context = Self::create_context(instance_context, &candidate, enable_ray_tracing)?;

        engine_info!(
            SOURCE,
            "Vulkan device '{}' created (render targets: {:?})",
            context.device_name,
            render_targets
        );

        Ok(Self { context: Arc::new(context), render_targets })
    }

    fn pick_physical_device(instance: &InstanceContext) -> Result<Candidate> {
        unsafe {
            let physical_devices = instance.instance.enumerate_physical_devices().map_err(|e| {
                engine_error!(SOURCE, "Failed to enumerate physical devices: {:?}", e);
                Error::InitializationFailed(format!("Failed to enumerate physical devices: {:?}", e))
            })?;

            let mut best: Option<Candidate> = None;
            for physical_device in physical_devices {
                let properties = instance.instance.get_physical_device_properties(physical_device);
                let name = properties
                    .device_name_as_c_str()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_default();

                let queue_families = instance
                    .instance
                    .get_physical_device_queue_family_properties(physical_device);
                let Some(queue_family) = queue_families
                    .iter()
                    .position(|family| {
                        family
                            .queue_flags
                            .contains(vk::QueueFlags::GRAPHICS | vk::QueueFlags::COMPUTE)
                    })
                    .map(|index| index as u32)
                else {
                    engine_debug!(SOURCE, "Skipping '{}': no graphics + compute queue family", name);
                    continue;
                };

                let extensions = instance
                    .instance
                    .enumerate_device_extension_properties(physical_device)
                    .unwrap_or_default();

                let score = match properties.device_type {
                    vk::PhysicalDeviceType::DISCRETE_GPU => 3,
                    vk::PhysicalDeviceType::INTEGRATED_GPU => 2,
                    vk::PhysicalDeviceType::VIRTUAL_GPU => 1,
                    _ => 0,
                };

                let candidate = Candidate { physical_device, properties, queue_family, extensions, score };
                if !candidate.has_extension(ash::khr::swapchain::NAME) {
                    engine_debug!(SOURCE, "Skipping '{}': VK_KHR_swapchain is not supported", name);
                    continue;
                }

                if best.as_ref().is_none_or(|b| candidate.score > b.score) {
                    best = Some(candidate);
                }
            }

            best.ok_or_else(|| {
                engine_error!(SOURCE, "No suitable Vulkan GPU found");
                Error::InitializationFailed("No suitable Vulkan GPU found".to_string())
            })
        }
    }

    fn supports_ray_tracing(instance: &InstanceContext, candidate: &Candidate) -> bool {
        if !RAY_TRACING_EXTENSIONS.iter().all(|name| candidate.has_extension(name)) {
            return false;
        }

        let mut acceleration_structure = vk::PhysicalDeviceAccelerationStructureFeaturesKHR::default();
        let mut ray_tracing_pipeline = vk::PhysicalDeviceRayTracingPipelineFeaturesKHR::default();
        let mut vulkan_12 = vk::PhysicalDeviceVulkan12Features::default();
        {
            let mut features = vk::PhysicalDeviceFeatures2::default()
                .push_next(&mut acceleration_structure)
                .push_next(&mut ray_tracing_pipeline)
                .push_next(&mut vulkan_12);
            unsafe {
                instance
                    .instance
                    .get_physical_device_features2(candidate.physical_device, &mut features);
            }
        }

        acceleration_structure.acceleration_structure == vk::TRUE
            && ray_tracing_pipeline.ray_tracing_pipeline == vk::TRUE
            && vulkan_12.buffer_device_address == vk::TRUE
    }

    fn create_context(
        instance: Arc<InstanceContext>,
        candidate: &Candidate,
        enable_ray_tracing: bool,
    ) -> Result<GpuContext> {
        unsafe {
            let supported = instance.instance.get_physical_device_features(candidate.physical_device);
            let device_features = vk::PhysicalDeviceFeatures::default()
                .sampler_anisotropy(supported.sampler_anisotropy == vk::TRUE)
                .fill_mode_non_solid(supported.fill_mode_non_solid == vk::TRUE)
                .wide_lines(supported.wide_lines == vk::TRUE)
                .depth_bounds(supported.depth_bounds == vk::TRUE)
                .logic_op(supported.logic_op == vk::TRUE)
                .dual_src_blend(supported.dual_src_blend == vk::TRUE)
                .independent_blend(supported.independent_blend == vk::TRUE)
                .occlusion_query_precise(supported.occlusion_query_precise == vk::TRUE);

            let mut extension_names: Vec<*const c_char> = vec![ash::khr::swapchain::NAME.as_ptr()];
            if candidate.has_extension(ash::ext::blend_operation_advanced::NAME) {
                extension_names.push(ash::ext::blend_operation_advanced::NAME.as_ptr());
            } else {
                engine_debug!(SOURCE, "VK_EXT_blend_operation_advanced unavailable, advanced blend operators disabled");
            }
            if enable_ray_tracing {
                extension_names.extend(RAY_TRACING_EXTENSIONS.iter().map(|name| name.as_ptr()));
            }

            let mut acceleration_structure_features =
                vk::PhysicalDeviceAccelerationStructureFeaturesKHR::default().acceleration_structure(true);
            let mut ray_tracing_features =
                vk::PhysicalDeviceRayTracingPipelineFeaturesKHR::default().ray_tracing_pipeline(true);
            let mut vulkan_12_features =
                vk::PhysicalDeviceVulkan12Features::default().buffer_device_address(enable_ray_tracing);

            let queue_priorities = [1.0];
            let queue_create_infos = [vk::DeviceQueueCreateInfo::default()
                .queue_family_index(candidate.queue_family)
                .queue_priorities(&queue_priorities)];

            let mut device_create_info = vk::DeviceCreateInfo::default()
                .queue_create_infos(&queue_create_infos)
                .enabled_extension_names(&extension_names)
                .enabled_features(&device_features)
                .push_next(&mut vulkan_12_features);
            if enable_ray_tracing {
                device_create_info = device_create_info
                    .push_next(&mut acceleration_structure_features)
                    .push_next(&mut ray_tracing_features);
            }

            let device = instance
                .instance
                .create_device(candidate.physical_device, &device_create_info, None)
                .map_err(|e| {
                    engine_error!(SOURCE, "Failed to create logical device: {:?}", e);
                    Error::InitializationFailed(format!("Failed to create device: {:?}", e))
                })?;

            let allocator = match Allocator::new(&AllocatorCreateDesc {
                instance: instance.instance.clone(),
                device: device.clone(),
                physical_device: candidate.physical_device,
                debug_settings: Default::default(),
                buffer_device_address: enable_ray_tracing,
                allocation_sizes: Default::default(),
            }) {
                Ok(allocator) => allocator,
                Err(e) => {
                    device.destroy_device(None);
                    engine_error!(SOURCE, "Failed to create GPU allocator: {:?}", e);
                    return Err(Error::InitializationFailed(format!("Failed to create allocator: {:?}", e)));
                }
            };

            let upload_pool_create_info = vk::CommandPoolCreateInfo::default()
                .queue_family_index(candidate.queue_family)
                .flags(vk::CommandPoolCreateFlags::TRANSIENT | vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER);

            let upload_command_pool = match device.create_command_pool(&upload_pool_create_info, None) {
                Ok(pool) => pool,
                Err(e) => {
                    drop(allocator);
                    device.destroy_device(None);
                    engine_error!(SOURCE, "Failed to create upload command pool: {:?}", e);
                    return Err(Error::InitializationFailed(format!(
                        "Failed to create upload command pool: {:?}",
                        e
                    )));
                }
            };

            let ray_tracing = if enable_ray_tracing {
                Some(Self::ray_tracing_context(&instance, candidate.physical_device, &device))
            } else {
                None
            };

            Ok(GpuContext::new(
                instance,
                device,
                allocator,
                candidate.physical_device,
                &candidate.properties,
                candidate.queue_family,
                upload_command_pool,
                ray_tracing,
            ))
        }
    }

    fn ray_tracing_context(
        instance: &InstanceContext,
        physical_device: vk::PhysicalDevice,
        device: &ash::Device,
    ) -> RayTracingContext {
        let mut pipeline_properties = vk::PhysicalDeviceRayTracingPipelinePropertiesKHR::default();
        {
            let mut properties = vk::PhysicalDeviceProperties2::default().push_next(&mut pipeline_properties);
            unsafe {
                instance
                    .instance
                    .get_physical_device_properties2(physical_device, &mut properties);
            }
        }

        RayTracingContext {
            acceleration_structure: ash::khr::acceleration_structure::Device::new(&instance.instance, device),
            pipeline: ash::khr::ray_tracing_pipeline::Device::new(&instance.instance, device),
            shader_group_handle_size: pipeline_properties.shader_group_handle_size,
            shader_group_handle_alignment: pipeline_properties.shader_group_handle_alignment,
            shader_group_base_alignment: pipeline_properties.shader_group_base_alignment,
            max_ray_recursion_depth: pipeline_properties.max_ray_recursion_depth,
        }
    }

    pub fn device_name(&self) -> &str {
        &self.context.device_name
    }
}

impl Device for VulkanDevice {
    fn supported_render_targets(&self) -> RenderTargetType {
        self.render_targets
    }

    fn wait_idle(&self) -> Result<()> {
        unsafe {
            self.context
                .device
                .device_wait_idle()
                .map_err(|e| engine_err!(SOURCE, "Failed to wait for device idle: {:?}", e))
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for VulkanDevice {
    fn drop(&mut self) {
        if Arc::strong_count(&self.context) > 1 {
            engine_warn!(
                SOURCE,
                "Device dropped while {} object(s) still reference it; destruction is deferred to the last one",
                Arc::strong_count(&self.context) - 1
            );
        }
    }
}
