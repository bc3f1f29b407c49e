/*!
# Xenon Engine - Vulkan Backend

Vulkan implementation of the `xenon_engine` backend abstraction.

Built on `ash` for the Vulkan bindings and `gpu-allocator` for memory
management. `VulkanFactory` is the only entry point: hand it to
`xenon_engine::xenon::Instance::new` and every object is created through it.

Ray tracing objects require a device created with
`RenderTargetType::RAY_TRACER` on hardware exposing
`VK_KHR_acceleration_structure` and `VK_KHR_ray_tracing_pipeline`.
*/

// Device and shared context
mod vulkan_context;
mod vulkan_instance;
mod vulkan_device;
mod vulkan_conversions;
mod debug;

// Resources
mod vulkan_buffer;
mod vulkan_image;
mod vulkan_image_view;
mod vulkan_sampler;

// Render targets
mod vulkan_render_pass;
mod vulkan_rasterizer;
mod vulkan_swapchain;
mod vulkan_ray_tracing;

// Pipelines
mod vulkan_reflection;
mod vulkan_pipeline_layout;
mod vulkan_descriptor;
mod vulkan_rasterizing_pipeline;
mod vulkan_compute_pipeline;

// Commands
mod vulkan_command_recorder;
mod vulkan_command_submitter;
mod vulkan_query;

mod vulkan_factory;

#[cfg(test)]
mod test_logger;

pub use vulkan_factory::VulkanFactory;
pub use vulkan_instance::VulkanInstance;
pub use vulkan_device::VulkanDevice;

// Shader loading
pub use vulkan_reflection::{reflect_spirv, shader_from_spirv};

// Re-export debug utilities
pub use debug::{get_validation_stats, print_validation_stats_report};
