/*!
# Xenon Engine - Direct3D 12 Backend

Direct3D 12 implementation of the `xenon_engine` backend abstraction.

Built on the `windows` crate for Direct3D 12 and DXGI, and `gpu-allocator`
for placed resources. `Dx12Factory` is the only entry point: hand it to
`xenon_engine::xenon::Instance::new` and every object is created through it.

API calls only exist on Windows. State tracking, barrier planning, queue
ordering, root layouts and CPU mip generation are plain Rust and build (and
are tested) on every platform.

Devices offer the rasterizer render target only; ray tracing objects are
rejected by the factory.
*/

// Off Windows only the tests reach the platform-independent modules
#![cfg_attr(not(windows), allow(dead_code))]

// Platform-independent planning
mod dx12_alignment;
mod dx12_barrier;
mod dx12_input;
mod dx12_mip;
mod dx12_queue;
mod dx12_root_layout;
mod dx12_slots;

// Device and shared context
#[cfg(windows)]
mod dx12_context;
#[cfg(windows)]
mod dx12_instance;
#[cfg(windows)]
mod dx12_device;
#[cfg(windows)]
mod dx12_conversions;

// Resources
#[cfg(windows)]
mod dx12_buffer;
#[cfg(windows)]
mod dx12_image;
#[cfg(windows)]
mod dx12_image_view;
#[cfg(windows)]
mod dx12_sampler;

// Render targets
#[cfg(windows)]
mod dx12_rasterizer;
#[cfg(windows)]
mod dx12_swapchain;

// Pipelines
#[cfg(windows)]
mod dx12_root_signature;
#[cfg(windows)]
mod dx12_descriptor;
#[cfg(windows)]
mod dx12_rasterizing_pipeline;
#[cfg(windows)]
mod dx12_compute_pipeline;

// Commands
#[cfg(windows)]
mod dx12_command_recorder;
#[cfg(windows)]
mod dx12_command_submitter;
#[cfg(windows)]
mod dx12_query;

#[cfg(windows)]
mod dx12_factory;

#[cfg(all(test, windows))]
mod test_logger;

#[cfg(windows)]
pub use dx12_factory::Dx12Factory;
#[cfg(windows)]
pub use dx12_instance::Dx12Instance;
#[cfg(windows)]
pub use dx12_device::Dx12Device;
