/// VulkanSwapchain - Vulkan implementation of the Swapchain trait
///
/// Presentation is completely separated from rendering: frames are rendered
/// into rasterizer attachments and blitted into the acquired image by
/// `CommandRecorder::copy_to_swapchain`.

use std::any::Any;
use std::sync::Arc;

use ash::vk;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use winit::window::Window;
use xenon_engine::xenon::backend::{DataFormat, Swapchain};
use xenon_engine::xenon::{Error, Result};
use xenon_engine::{engine_debug, engine_err, engine_error, engine_info, engine_warn};

use crate::vulkan_context::GpuContext;
use crate::vulkan_conversions::vk_format_to_data_format;

const SOURCE: &str = "xenon::vulkan::Swapchain";

/// Number of frames that can be processed concurrently
const MAX_FRAMES_IN_FLIGHT: usize = 2;

/// Vulkan swapchain implementation
pub struct VulkanSwapchain {
    ctx: Arc<GpuContext>,

    surface: vk::SurfaceKHR,

    /// Null while the surface has a zero extent
    swapchain: vk::SwapchainKHR,
    images: Vec<vk::Image>,
    format: vk::SurfaceFormatKHR,
    extent: vk::Extent2D,
    /// Used when the surface lets the swapchain pick its extent
    window_extent: vk::Extent2D,

    /// One per frame in flight (acquire)
    image_acquired_semaphores: Vec<vk::Semaphore>,
    /// One per swapchain image (present)
    render_finished_semaphores: Vec<vk::Semaphore>,

    frame_index: usize,
    image_index: u32,
}

impl VulkanSwapchain {
    pub(crate) fn new(ctx: Arc<GpuContext>, window: &Window) -> Result<Self> {
        let instance = &ctx.instance;
        let display_handle = window.display_handle().map_err(|e| {
            engine_error!(SOURCE, "Failed to get display handle for swapchain: {}", e);
            Error::InitializationFailed(format!("Failed to get display handle: {}", e))
        })?;
        let window_handle = window.window_handle().map_err(|e| {
            engine_error!(SOURCE, "Failed to get window handle for swapchain: {}", e);
            Error::InitializationFailed(format!("Failed to get window handle: {}", e))
        })?;

        let surface = unsafe {
            ash_window::create_surface(
                &instance.entry,
                &instance.instance,
                display_handle.as_raw(),
                window_handle.as_raw(),
                None,
            )
        }
        .map_err(|e| {
            engine_error!(SOURCE, "Failed to create surface: {:?}", e);
            Error::InitializationFailed(format!("Failed to create surface: {:?}", e))
        })?;

        let size = window.inner_size();
        let mut swapchain = Self {
            ctx,
            surface,
            swapchain: vk::SwapchainKHR::null(),
            images: Vec::new(),
            format: vk::SurfaceFormatKHR::default(),
            extent: vk::Extent2D::default(),
            window_extent: vk::Extent2D { width: size.width, height: size.height },
            image_acquired_semaphores: Vec::with_capacity(MAX_FRAMES_IN_FLIGHT),
            render_finished_semaphores: Vec::new(),
            frame_index: 0,
            image_index: 0,
        };
        // From here on Drop releases whatever was created
        swapchain.check_present_support()?;
        swapchain.format = swapchain.choose_format()?;
        for _ in 0..MAX_FRAMES_IN_FLIGHT {
            let semaphore = swapchain.create_semaphore()?;
            swapchain.image_acquired_semaphores.push(semaphore);
        }
        swapchain.build()?;

        engine_info!(
            SOURCE,
            "Swapchain created: {}x{}, {} image(s), {:?}",
            swapchain.extent.width,
            swapchain.extent.height,
            swapchain.images.len(),
            swapchain.format.format
        );
        Ok(swapchain)
    }

    fn check_present_support(&self) -> Result<()> {
        let supported = unsafe {
            self.ctx.instance.surface_loader.get_physical_device_surface_support(
                self.ctx.physical_device,
                self.ctx.graphics_queue_family,
                self.surface,
            )
        }
        .map_err(|e| engine_err!(SOURCE, "Failed to query surface support: {:?}", e))?;

        if !supported {
            engine_error!(SOURCE, "The graphics queue cannot present to this surface");
            return Err(Error::InitializationFailed("Surface presentation not supported".to_string()));
        }
        Ok(())
    }

    fn choose_format(&self) -> Result<vk::SurfaceFormatKHR> {
        let formats = unsafe {
            self.ctx
                .instance
                .surface_loader
                .get_physical_device_surface_formats(self.ctx.physical_device, self.surface)
        }
        .map_err(|e| {
            engine_error!(SOURCE, "Failed to query surface formats: {:?}", e);
            Error::InitializationFailed(format!("Failed to get surface formats: {:?}", e))
        })?;

        formats
            .iter()
            .find(|f| f.format == vk::Format::B8G8R8A8_SRGB || f.format == vk::Format::R8G8B8A8_SRGB)
            .or_else(|| formats.first())
            .copied()
            .ok_or_else(|| {
                engine_error!(SOURCE, "The surface reports no formats");
                Error::InitializationFailed("No surface format available".to_string())
            })
    }

    fn create_semaphore(&self) -> Result<vk::Semaphore> {
        unsafe { self.ctx.device.create_semaphore(&vk::SemaphoreCreateInfo::default(), None) }
            .map_err(|e| engine_err!(SOURCE, "Failed to create semaphore: {:?}", e))
    }

    /// (Re)create the swapchain for the current surface extent
    ///
    /// A zero extent (minimized window) leaves the swapchain unrenderable.
    fn build(&mut self) -> Result<()> {
        let capabilities = unsafe {
            self.ctx
                .instance
                .surface_loader
                .get_physical_device_surface_capabilities(self.ctx.physical_device, self.surface)
        }
        .map_err(|e| engine_err!(SOURCE, "Failed to get surface capabilities: {:?}", e))?;

        let extent = if capabilities.current_extent.width != u32::MAX {
            capabilities.current_extent
        } else {
            vk::Extent2D {
                width: self.window_extent.width.clamp(
                    capabilities.min_image_extent.width,
                    capabilities.max_image_extent.width,
                ),
                height: self.window_extent.height.clamp(
                    capabilities.min_image_extent.height,
                    capabilities.max_image_extent.height,
                ),
            }
        };

        let old_swapchain = self.swapchain;
        if extent.width == 0 || extent.height == 0 {
            engine_debug!(SOURCE, "Surface has a zero extent, swapchain is not renderable");
            self.destroy_swapchain();
            self.extent = extent;
            return Ok(());
        }

        let image_count = capabilities.min_image_count + 1;
        let image_count = if capabilities.max_image_count > 0 {
            image_count.min(capabilities.max_image_count)
        } else {
            image_count
        };

        let create_info = vk::SwapchainCreateInfoKHR::default()
            .surface(self.surface)
            .min_image_count(image_count)
            .image_format(self.format.format)
            .image_color_space(self.format.color_space)
            .image_extent(extent)
            .image_array_layers(1)
            .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT | vk::ImageUsageFlags::TRANSFER_DST)
            .image_sharing_mode(vk::SharingMode::EXCLUSIVE)
            .pre_transform(capabilities.current_transform)
            .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
            .present_mode(vk::PresentModeKHR::FIFO)
            .clipped(true)
            .old_swapchain(old_swapchain);

        let swapchain = unsafe { self.ctx.swapchain_loader.create_swapchain(&create_info, None) }
            .map_err(|e| engine_err!(SOURCE, "Failed to create swapchain: {:?}", e))?;

        self.destroy_swapchain();
        self.swapchain = swapchain;
        self.extent = extent;
        self.images = unsafe { self.ctx.swapchain_loader.get_swapchain_images(swapchain) }
            .map_err(|e| engine_err!(SOURCE, "Failed to get swapchain images: {:?}", e))?;

        // Render-finished semaphores follow the image count
        while self.render_finished_semaphores.len() < self.images.len() {
            let semaphore = self.create_semaphore()?;
            self.render_finished_semaphores.push(semaphore);
        }
        Ok(())
    }

    fn destroy_swapchain(&mut self) {
        if self.swapchain != vk::SwapchainKHR::null() {
            unsafe {
                self.ctx.swapchain_loader.destroy_swapchain(self.swapchain, None);
            }
            self.swapchain = vk::SwapchainKHR::null();
        }
        self.images.clear();
    }

    /// Semaphores the submitter waits on and signals for the current frame
    pub(crate) fn sync_semaphores(&self) -> (vk::Semaphore, vk::Semaphore) {
        (
            self.image_acquired_semaphores[self.frame_index],
            self.render_finished_semaphores[self.image_index as usize],
        )
    }

    /// Image acquired by the last `prepare`
    pub(crate) fn current_image(&self) -> Option<vk::Image> {
        self.images.get(self.image_index as usize).copied()
    }

    pub(crate) fn extent(&self) -> vk::Extent2D {
        self.extent
    }

    fn acquire(&mut self) -> std::result::Result<u32, vk::Result> {
        unsafe {
            self.ctx
                .swapchain_loader
                .acquire_next_image(
                    self.swapchain,
                    u64::MAX,
                    self.image_acquired_semaphores[self.frame_index],
                    vk::Fence::null(),
                )
                .map(|(index, _suboptimal)| index)
        }
    }
}

impl Swapchain for VulkanSwapchain {
    fn prepare(&mut self) -> Result<()> {
        if !self.is_renderable() {
            return Ok(());
        }

        let index = match self.acquire() {
            Ok(index) => index,
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => {
                engine_debug!(SOURCE, "Swapchain out of date during acquire, recreating");
                self.recreate()?;
                if !self.is_renderable() {
                    return Ok(());
                }
                self.acquire()
                    .map_err(|e| engine_err!(SOURCE, "Failed to acquire next swapchain image: {:?}", e))?
            }
            Err(e) => return Err(engine_err!(SOURCE, "Failed to acquire next swapchain image: {:?}", e)),
        };
        self.image_index = index;
        Ok(())
    }

    fn present(&mut self) -> Result<()> {
        if !self.is_renderable() {
            return Ok(());
        }

        let swapchains = [self.swapchain];
        let image_indices = [self.image_index];
        let wait_semaphores = [self.render_finished_semaphores[self.image_index as usize]];
        let present_info = vk::PresentInfoKHR::default()
            .wait_semaphores(&wait_semaphores)
            .swapchains(&swapchains)
            .image_indices(&image_indices);

        let result = self.ctx.queue_present(&present_info);
        self.frame_index = (self.frame_index + 1) % MAX_FRAMES_IN_FLIGHT;

        match result {
            Ok(false) => Ok(()),
            Ok(true) | Err(vk::Result::SUBOPTIMAL_KHR) | Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => {
                engine_debug!(SOURCE, "Swapchain suboptimal or out of date during present, recreating");
                self.recreate()
            }
            Err(e) => Err(engine_err!(SOURCE, "Failed to present swapchain image: {:?}", e)),
        }
    }

    fn recreate(&mut self) -> Result<()> {
        unsafe { self.ctx.device.device_wait_idle() }
            .map_err(|e| engine_err!(SOURCE, "Failed to wait idle before swapchain recreate: {:?}", e))?;

        self.build()?;
        self.image_index = 0;
        if self.is_renderable() {
            engine_debug!(SOURCE, "Swapchain recreated: {}x{}", self.extent.width, self.extent.height);
        }
        Ok(())
    }

    fn is_renderable(&self) -> bool {
        self.swapchain != vk::SwapchainKHR::null() && self.extent.width > 0 && self.extent.height > 0
    }

    fn image_count(&self) -> u32 {
        self.images.len() as u32
    }

    fn image_index(&self) -> u32 {
        self.image_index
    }

    fn frame_index(&self) -> u32 {
        self.frame_index as u32
    }

    fn width(&self) -> u32 {
        self.extent.width
    }

    fn height(&self) -> u32 {
        self.extent.height
    }

    fn format(&self) -> DataFormat {
        vk_format_to_data_format(self.format.format)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for VulkanSwapchain {
    fn drop(&mut self) {
        unsafe {
            if self.ctx.device.device_wait_idle().is_err() {
                engine_warn!(SOURCE, "Failed to wait idle before destroying the swapchain");
            }

            for &semaphore in self.image_acquired_semaphores.iter().chain(&self.render_finished_semaphores) {
                self.ctx.device.destroy_semaphore(semaphore, None);
            }
            self.destroy_swapchain();
            self.ctx.instance.surface_loader.destroy_surface(self.surface, None);
        }
    }
}
