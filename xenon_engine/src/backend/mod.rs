/// Backend abstraction: traits implemented once per graphics API and the
/// API-agnostic value types, planners and caches they share

pub mod binding;
pub mod buffer;
pub mod command;
pub mod descriptor;
pub mod device;
pub mod factory;
pub mod image;
pub mod pipeline;
pub mod pipeline_cache;
pub mod query;
pub mod rasterizer;
pub mod ray_tracing;
pub mod shader;
pub mod specialization;
pub mod swapchain;
pub mod types;
pub mod vertex;

pub use binding::*;
pub use buffer::*;
pub use command::*;
pub use descriptor::*;
pub use device::*;
pub use factory::*;
pub use image::*;
pub use pipeline::*;
pub use pipeline_cache::*;
pub use query::*;
pub use rasterizer::*;
pub use ray_tracing::*;
pub use shader::*;
pub use specialization::*;
pub use swapchain::*;
pub use types::*;
pub use vertex::*;
