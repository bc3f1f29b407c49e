/// Swapchain trait

use std::any::Any;

use crate::backend::types::DataFormat;
use crate::error::Result;

/// Presentable surface with per-frame image-acquired and render-finished primitives
///
/// A swapchain is not renderable while its window is minimized (zero extent);
/// submitters then skip its synchronization primitives.
pub trait Swapchain: Send + Sync {
    /// Acquire the next image; must precede recording of the frame
    fn prepare(&mut self) -> Result<()>;

    /// Present the acquired image and advance the frame index
    fn present(&mut self) -> Result<()>;

    /// Rebuild the images after the surface changed size
    fn recreate(&mut self) -> Result<()>;

    fn is_renderable(&self) -> bool;

    fn image_count(&self) -> u32;

    /// Index of the image acquired by the last `prepare`
    fn image_index(&self) -> u32;

    /// Index of the frame in flight
    fn frame_index(&self) -> u32;

    fn width(&self) -> u32;

    fn height(&self) -> u32;

    fn format(&self) -> DataFormat;

    fn as_any(&self) -> &dyn Any;
}

impl dyn Swapchain + '_ {
    pub fn downcast_ref<T: Swapchain + 'static>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }
}
