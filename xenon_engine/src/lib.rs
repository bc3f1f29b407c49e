/*!
# Xenon Engine

API-agnostic core of the Xenon renderer.

The crate defines the backend abstraction that the Vulkan
(`xenon_engine_renderer_vulkan`) and DirectX 12 (`xenon_engine_renderer_dx12`)
crates implement, together with everything both backends share:

- **Factory**: creates every backend object; owned by an `Instance`
- **Buffer / Image**: GPU resources with transparent staging
- **RasterizingPipeline / ComputePipeline / RayTracingPipeline**: pipelines
  specialized lazily per vertex layout, backed by a pluggable pipeline cache
- **CommandRecorder / CommandSubmitter**: recording and batch submission with
  backend-independent synchronization planning

Logging goes through a replaceable `Logger` installed on `Engine`.
*/

// Internal modules
mod error;
mod engine;
mod hash;
pub mod log;
pub mod config;
pub mod backend;
pub mod cache_handler;
pub mod instance;

#[cfg(test)]
mod test_logger;
#[cfg(test)]
mod mock_backend;

// Main xenon namespace module
pub mod xenon {
    // Error types
    pub use crate::error::{Error, Result};

    // Logger registry
    pub use crate::engine::Engine;

    // Frontend
    pub use crate::config::*;
    pub use crate::instance::Instance;
    pub use crate::cache_handler::DefaultCacheHandler;

    // Content hashing shared by shaders, vertex layouts and caches
    pub use crate::hash::generate_hash;

    // Logging sub-module (types only, macros are exported at the crate root)
    pub mod log {
        pub use crate::log::{Logger, LogEntry, LogSeverity, DefaultLogger};
    }

    // Backend abstraction
    pub mod backend {
        pub use crate::backend::*;
    }
}
