/// Dx12Instance - Direct3D 12 implementation of the BackendInstance trait
///
/// Owns the DXGI factory adapters and swapchains are created from. With
/// validation enabled the D3D12 debug layer is switched on first, since it
/// only applies to devices created after it.

use std::any::Any;
use std::sync::Arc;

use windows::Win32::Graphics::Direct3D12::{D3D12GetDebugInterface, ID3D12Debug};
use windows::Win32::Graphics::Dxgi::{
    CreateDXGIFactory2, IDXGIFactory4, DXGI_CREATE_FACTORY_DEBUG, DXGI_CREATE_FACTORY_FLAGS,
};
use xenon_engine::xenon::backend::BackendInstance;
use xenon_engine::xenon::{Config, Error, Result};
use xenon_engine::{engine_error, engine_info, engine_warn};

use crate::dx12_context::{InstanceContext, SOURCE};

pub struct Dx12Instance {
    pub(crate) context: Arc<InstanceContext>,
}

impl Dx12Instance {
    pub fn new(config: &Config) -> Result<Self> {
        let debug_layer = config.enable_validation && Self::enable_debug_layer();

        let flags = if debug_layer { DXGI_CREATE_FACTORY_DEBUG } else { DXGI_CREATE_FACTORY_FLAGS(0) };
        let factory: IDXGIFactory4 = unsafe { CreateDXGIFactory2(flags) }.map_err(|e| {
            engine_error!(SOURCE, "Failed to create DXGI factory: {:?}", e);
            Error::InitializationFailed(format!("Failed to create DXGI factory: {:?}", e))
        })?;

        engine_info!(
            SOURCE,
            "Direct3D 12 instance created for '{}' (debug layer: {})",
            config.application_name,
            debug_layer
        );

        Ok(Self {
            context: Arc::new(InstanceContext {
                factory,
                application_name: config.application_name.clone(),
                application_version: config.application_version,
                debug_layer,
            }),
        })
    }

    /// Whether the debug layer could be enabled
    fn enable_debug_layer() -> bool {
        let mut debug: Option<ID3D12Debug> = None;
        match unsafe { D3D12GetDebugInterface(&mut debug) } {
            Ok(()) => match debug {
                Some(debug) => {
                    unsafe { debug.EnableDebugLayer() };
                    true
                }
                None => false,
            },
            Err(e) => {
                engine_warn!(SOURCE, "Validation requested but the D3D12 debug layer is unavailable: {:?}", e);
                false
            }
        }
    }
}

impl BackendInstance for Dx12Instance {
    fn application_name(&self) -> &str {
        &self.context.application_name
    }

    fn application_version(&self) -> u32 {
        self.context.application_version
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
