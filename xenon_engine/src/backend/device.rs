/// Backend instance and device traits

use std::any::Any;

use crate::backend::types::RenderTargetType;
use crate::engine_warn;
use crate::error::Result;

/// Connection to the graphics API (Vulkan instance, DXGI factory)
pub trait BackendInstance: Send + Sync {
    fn application_name(&self) -> &str;

    fn application_version(&self) -> u32;

    fn as_any(&self) -> &dyn Any;
}

impl dyn BackendInstance + '_ {
    pub fn downcast_ref<T: BackendInstance + 'static>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }
}

/// Logical connection to one GPU
///
/// Every object created from a device holds a reference to its shared context,
/// so a device is never torn down while they are alive.
pub trait Device: Send + Sync {
    /// Render target types this device was created with
    fn supported_render_targets(&self) -> RenderTargetType;

    /// Block until the device is idle
    fn wait_idle(&self) -> Result<()>;

    fn as_any(&self) -> &dyn Any;
}

impl dyn Device + '_ {
    pub fn downcast_ref<T: Device + 'static>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }
}

/// Keep the requested render target types the hardware can serve
///
/// Logs a warning naming the dropped types when the request is narrowed.
pub fn negotiate_render_targets(requested: RenderTargetType, available: RenderTargetType) -> RenderTargetType {
    let supported = requested & available;
    if supported != requested {
        engine_warn!(
            "xenon::Device",
            "Requested render targets {:?} are not all supported; enabling {:?} only",
            requested,
            supported
        );
    }
    supported
}
