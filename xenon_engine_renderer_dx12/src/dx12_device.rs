/// Dx12Device - Direct3D 12 implementation of the Device trait
///
/// Picks the hardware adapter with the most dedicated video memory and
/// creates the device at feature level 12.0. Only the rasterizer render
/// target is offered; DXR is not wired into this backend.

use std::any::Any;
use std::sync::Arc;

use gpu_allocator::d3d12::{Allocator, AllocatorCreateDesc, ID3D12DeviceVersion};
use windows::Win32::Graphics::Direct3D::D3D_FEATURE_LEVEL_12_0;
use windows::Win32::Graphics::Direct3D12::{D3D12CreateDevice, ID3D12Device};
use windows::Win32::Graphics::Dxgi::{IDXGIAdapter1, DXGI_ADAPTER_DESC1, DXGI_ADAPTER_FLAG_SOFTWARE};
use xenon_engine::xenon::backend::{negotiate_render_targets, Device, RenderTargetType};
use xenon_engine::xenon::{Error, Result};
use xenon_engine::{engine_debug, engine_error, engine_info, engine_warn};

use crate::dx12_context::{GpuContext, InstanceContext, SOURCE};
use crate::dx12_instance::Dx12Instance;

struct Candidate {
    adapter: IDXGIAdapter1,
    name: String,
    dedicated_video_memory: usize,
}

pub struct Dx12Device {
    pub(crate) context: Arc<GpuContext>,
    render_targets: RenderTargetType,
}

impl Dx12Device {
    pub fn new(instance: &Dx12Instance, required_render_targets: RenderTargetType) -> Result<Self> {
        let instance_context = Arc::clone(&instance.context);
        let candidate = Self::pick_adapter(&instance_context)?;
        let render_targets = negotiate_render_targets(required_render_targets, RenderTargetType::RASTERIZER);

        let mut device: Option<ID3D12Device> = None;
        unsafe { D3D12CreateDevice(&candidate.adapter, D3D_FEATURE_LEVEL_12_0, &mut device) }.map_err(|e| {
            engine_error!(SOURCE, "Failed to create D3D12 device on '{}': {:?}", candidate.name, e);
            Error::InitializationFailed(format!("Failed to create device: {:?}", e))
        })?;
        let Some(device) = device else {
            engine_error!(SOURCE, "D3D12CreateDevice returned no device");
            return Err(Error::InitializationFailed("D3D12CreateDevice returned no device".to_string()));
        };

        let allocator = Allocator::new(&AllocatorCreateDesc {
            device: ID3D12DeviceVersion::Device(device.clone()),
            debug_settings: Default::default(),
            allocation_sizes: Default::default(),
        })
        .map_err(|e| {
            engine_error!(SOURCE, "Failed to create GPU allocator: {:?}", e);
            Error::InitializationFailed(format!("Failed to create allocator: {:?}", e))
        })?;

        let context = GpuContext::new(instance_context, device, allocator, candidate.name)?;

        engine_info!(
            SOURCE,
            "Direct3D 12 device '{}' created (render targets: {:?})",
            context.adapter_name,
            render_targets
        );

        Ok(Self { context: Arc::new(context), render_targets })
    }

    fn pick_adapter(instance: &InstanceContext) -> Result<Candidate> {
        let mut best: Option<Candidate> = None;

        for index in 0.. {
            let Ok(adapter) = (unsafe { instance.factory.EnumAdapters1(index) }) else {
                break;
            };
            let desc: DXGI_ADAPTER_DESC1 = match unsafe { adapter.GetDesc1() } {
                Ok(desc) => desc,
                Err(e) => {
                    engine_debug!(SOURCE, "Skipping adapter {}: {:?}", index, e);
                    continue;
                }
            };

            let name_length = desc.Description.iter().position(|c| *c == 0).unwrap_or(desc.Description.len());
            let name = String::from_utf16_lossy(&desc.Description[..name_length]);

            if desc.Flags & DXGI_ADAPTER_FLAG_SOFTWARE.0 as u32 != 0 {
                engine_debug!(SOURCE, "Skipping '{}': software adapter", name);
                continue;
            }

            let candidate = Candidate { adapter, name, dedicated_video_memory: desc.DedicatedVideoMemory };
            if best
                .as_ref()
                .is_none_or(|b| candidate.dedicated_video_memory > b.dedicated_video_memory)
            {
                best = Some(candidate);
            }
        }

        best.ok_or_else(|| {
            engine_error!(SOURCE, "No suitable Direct3D 12 adapter found");
            Error::InitializationFailed("No suitable Direct3D 12 adapter found".to_string())
        })
    }

    pub fn adapter_name(&self) -> &str {
        &self.context.adapter_name
    }
}

impl Device for Dx12Device {
    fn supported_render_targets(&self) -> RenderTargetType {
        self.render_targets
    }

    fn wait_idle(&self) -> Result<()> {
        self.context.wait_idle()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for Dx12Device {
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
