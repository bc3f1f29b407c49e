/// Dx12Swapchain - DXGI flip-model implementation of the Swapchain trait
///
/// As on Vulkan, frames are rendered into rasterizer attachments and copied
/// into the current back buffer by `CommandRecorder::copy_to_swapchain`.
/// Presentation is queued on the direct queue after the submitted work, so
/// no acquire or render-finished primitive exists: `prepare` only reads the
/// back buffer index.

use std::any::Any;
use std::ffi::c_void;
use std::sync::Arc;

use raw_window_handle::{HasWindowHandle, RawWindowHandle};
use winit::window::Window;
use windows::core::Interface;
use windows::Win32::Foundation::{DXGI_STATUS_OCCLUDED, FALSE, HWND};
use windows::Win32::Graphics::Direct3D12::ID3D12Resource;
use windows::Win32::Graphics::Dxgi::Common::{
    DXGI_ALPHA_MODE_UNSPECIFIED, DXGI_FORMAT, DXGI_FORMAT_R8G8B8A8_UNORM, DXGI_FORMAT_UNKNOWN, DXGI_SAMPLE_DESC,
};
use windows::Win32::Graphics::Dxgi::{
    IDXGIOutput, IDXGISwapChain3, DXGI_ERROR_DEVICE_REMOVED, DXGI_ERROR_DEVICE_RESET, DXGI_MWA_NO_ALT_ENTER,
    DXGI_PRESENT, DXGI_SCALING_STRETCH, DXGI_SWAP_CHAIN_DESC1, DXGI_SWAP_CHAIN_FLAG, DXGI_SWAP_EFFECT_FLIP_DISCARD,
    DXGI_USAGE_RENDER_TARGET_OUTPUT,
};
use xenon_engine::xenon::backend::{DataFormat, Swapchain};
use xenon_engine::xenon::{Error, Result};
use xenon_engine::{engine_debug, engine_err, engine_error, engine_info, engine_warn};

use crate::dx12_context::GpuContext;
use crate::dx12_conversions::dxgi_to_data_format;

const SOURCE: &str = "xenon::dx12::Swapchain";

/// Flip-model swapchains need at least two buffers
const BUFFER_COUNT: u32 = 3;

/// Matches the rasterizer color attachment so frames are copied without conversion
const BUFFER_FORMAT: DXGI_FORMAT = DXGI_FORMAT_R8G8B8A8_UNORM;

/// Direct3D 12 swapchain implementation
pub struct Dx12Swapchain {
    ctx: Arc<GpuContext>,
    /// HWND value; kept as an integer so the swapchain stays `Send`
    hwnd: isize,

    /// None while the window has a zero extent
    swapchain: Option<IDXGISwapChain3>,
    buffers: Vec<ID3D12Resource>,
    width: u32,
    height: u32,

    frame_index: u32,
    image_index: u32,
}

impl Dx12Swapchain {
    pub(crate) fn new(ctx: Arc<GpuContext>, window: &Window) -> Result<Self> {
        let window_handle = window.window_handle().map_err(|e| {
            engine_error!(SOURCE, "Failed to get window handle for swapchain: {}", e);
            Error::InitializationFailed(format!("Failed to get window handle: {}", e))
        })?;
        let hwnd = match window_handle.as_raw() {
            RawWindowHandle::Win32(handle) => handle.hwnd.get(),
            other => {
                engine_error!(SOURCE, "Direct3D 12 swapchains need a Win32 window, got {:?}", other);
                return Err(Error::InitializationFailed("Unsupported window handle".to_string()));
            }
        };

        let size = window.inner_size();
        let mut swapchain = Self {
            ctx,
            hwnd,
            swapchain: None,
            buffers: Vec::new(),
            width: size.width,
            height: size.height,
            frame_index: 0,
            image_index: 0,
        };
        if swapchain.width > 0 && swapchain.height > 0 {
            swapchain.build()?;
        } else {
            engine_debug!(SOURCE, "Window has a zero extent, swapchain is not renderable");
        }

        engine_info!(
            SOURCE,
            "Swapchain created: {}x{}, {} buffer(s), {:?}",
            swapchain.width,
            swapchain.height,
            swapchain.buffers.len(),
            BUFFER_FORMAT
        );
        Ok(swapchain)
    }

    fn hwnd(&self) -> HWND {
        HWND(self.hwnd as *mut c_void)
    }

    /// Create the swapchain, or resize its buffers to the window's client area
    fn build(&mut self) -> Result<()> {
        self.buffers.clear();

        let swapchain = match self.swapchain.take() {
            Some(swapchain) => {
                // Zero extent and unknown format keep the window size and current format
                unsafe { swapchain.ResizeBuffers(0, 0, 0, DXGI_FORMAT_UNKNOWN, DXGI_SWAP_CHAIN_FLAG(0)) }
                    .map_err(|e| engine_err!(SOURCE, "Failed to resize swapchain buffers: {:?}", e))?;
                swapchain
            }
            None => self.create()?,
        };

        let desc = unsafe { swapchain.GetDesc1() }
            .map_err(|e| engine_err!(SOURCE, "Failed to query the swapchain description: {:?}", e))?;
        self.width = desc.Width;
        self.height = desc.Height;

        for index in 0..desc.BufferCount {
            let buffer: ID3D12Resource = unsafe { swapchain.GetBuffer(index) }
                .map_err(|e| engine_err!(SOURCE, "Failed to get swapchain buffer {}: {:?}", index, e))?;
            self.buffers.push(buffer);
        }
        self.image_index = unsafe { swapchain.GetCurrentBackBufferIndex() };
        self.swapchain = Some(swapchain);
        Ok(())
    }

    fn create(&self) -> Result<IDXGISwapChain3> {
        // A zero extent sizes the buffers to the window's client area
        let desc = DXGI_SWAP_CHAIN_DESC1 {
            Width: 0,
            Height: 0,
            Format: BUFFER_FORMAT,
            Stereo: FALSE,
            SampleDesc: DXGI_SAMPLE_DESC { Count: 1, Quality: 0 },
            BufferUsage: DXGI_USAGE_RENDER_TARGET_OUTPUT,
            BufferCount: BUFFER_COUNT,
            Scaling: DXGI_SCALING_STRETCH,
            SwapEffect: DXGI_SWAP_EFFECT_FLIP_DISCARD,
            AlphaMode: DXGI_ALPHA_MODE_UNSPECIFIED,
            Flags: 0,
        };

        let factory = &self.ctx.instance.factory;
        unsafe {
            let swapchain = factory
                .CreateSwapChainForHwnd(&self.ctx.queue, self.hwnd(), &desc, None, None::<&IDXGIOutput>)
                .map_err(|e| {
                    engine_error!(SOURCE, "Failed to create swapchain: {:?}", e);
                    Error::InitializationFailed(format!("Failed to create swapchain: {:?}", e))
                })?;
            if let Err(e) = factory.MakeWindowAssociation(self.hwnd(), DXGI_MWA_NO_ALT_ENTER) {
                engine_warn!(SOURCE, "Failed to disable the Alt+Enter fullscreen toggle: {:?}", e);
            }
            swapchain
                .cast::<IDXGISwapChain3>()
                .map_err(|e| engine_err!(SOURCE, "IDXGISwapChain3 is not supported: {:?}", e))
        }
    }

    /// Back buffer selected by the last `prepare`
    pub(crate) fn current_buffer(&self) -> Option<&ID3D12Resource> {
        self.buffers.get(self.image_index as usize)
    }
}

impl Swapchain for Dx12Swapchain {
    fn prepare(&mut self) -> Result<()> {
        if let Some(swapchain) = &self.swapchain {
            self.image_index = unsafe { swapchain.GetCurrentBackBufferIndex() };
        }
        Ok(())
    }

    fn present(&mut self) -> Result<()> {
        let Some(swapchain) = &self.swapchain else {
            return Ok(());
        };

        let result = self.ctx.with_queue(|_| Ok(unsafe { swapchain.Present(1, DXGI_PRESENT(0)) }))?;
        self.frame_index = (self.frame_index + 1) % BUFFER_COUNT;

        if result == DXGI_STATUS_OCCLUDED {
            engine_debug!(SOURCE, "Window is occluded, frame not shown");
            return Ok(());
        }
        if result == DXGI_ERROR_DEVICE_REMOVED || result == DXGI_ERROR_DEVICE_RESET {
            let reason = unsafe { self.ctx.device.GetDeviceRemovedReason() };
            engine_error!(SOURCE, "Device lost during present: {:?} ({:?})", result, reason);
            return Err(Error::BackendError(format!("Device lost during present: {:?}", result)));
        }
        result.ok().map_err(|e| engine_err!(SOURCE, "Failed to present swapchain buffer: {:?}", e))
    }

    fn recreate(&mut self) -> Result<()> {
        // Buffers cannot be resized while the GPU still references them
        self.ctx.wait_idle()?;
        self.build()?;
        if self.is_renderable() {
            engine_debug!(SOURCE, "Swapchain recreated: {}x{}", self.width, self.height);
        }
        Ok(())
    }

    fn is_renderable(&self) -> bool {
        self.swapchain.is_some() && self.width > 0 && self.height > 0
    }

    fn image_count(&self) -> u32 {
        self.buffers.len() as u32
    }

    fn image_index(&self) -> u32 {
        self.image_index
    }

    fn frame_index(&self) -> u32 {
        self.frame_index
    }

    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn format(&self) -> DataFormat {
        dxgi_to_data_format(BUFFER_FORMAT)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for Dx12Swapchain {
    fn drop(&mut self) {
        if self.ctx.wait_idle().is_err() {
            engine_warn!(SOURCE, "Failed to wait idle before destroying the swapchain");
        }
        self.buffers.clear();
        self.swapchain = None;
    }
}
