/// Frontend instance: owns the backend factory, the backend instance and the device
///
/// The factory is injected by the application, so several instances (even of
/// different backends) can coexist. Fields drop in declaration order: the
/// device goes before the backend instance, which goes before the factory.

use crate::backend::{BackendInstance, Device, Factory, RenderTargetType};
use crate::cache_handler::DefaultCacheHandler;
use crate::config::{BackendType, Config};
use crate::engine_info;
use crate::error::{Error, Result};

pub struct Instance {
    device: Box<dyn Device>,
    backend_instance: Box<dyn BackendInstance>,
    factory: Box<dyn Factory>,
    config: Config,
}

impl Instance {
    /// Create the backend instance and device described by `config`
    ///
    /// # Arguments
    ///
    /// * `config` - Validated before any backend object is created
    /// * `factory` - Backend implementation used for every object of this instance
    ///
    /// # Errors
    ///
    /// `Error::InitializationFailed` when the configuration is invalid or
    /// names a different backend than `factory`, and any backend error raised
    /// while creating the instance or the device.
    pub fn new(config: Config, factory: Box<dyn Factory>) -> Result<Self> {
        config.validate()?;

        let backend_type = factory.backend_type();
        if config.backend != BackendType::Any && config.backend != backend_type {
            return Err(Error::InitializationFailed(format!(
                "Configuration requests {:?} but the factory implements {:?}",
                config.backend, backend_type
            )));
        }

        let backend_instance = factory.create_instance(&config)?;
        let device = factory.create_device(backend_instance.as_ref(), config.render_targets)?;

        engine_info!(
            "xenon::Instance",
            "Created {:?} instance for '{}' (render targets: {:?})",
            backend_type,
            config.application_name,
            device.supported_render_targets()
        );

        Ok(Self { device, backend_instance, factory, config })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn application_name(&self) -> &str {
        &self.config.application_name
    }

    pub fn application_version(&self) -> u32 {
        self.config.application_version
    }

    pub fn backend_type(&self) -> BackendType {
        self.factory.backend_type()
    }

    /// Render targets the device actually enabled (may be narrower than requested)
    pub fn supported_render_targets(&self) -> RenderTargetType {
        self.device.supported_render_targets()
    }

    pub fn factory(&self) -> &dyn Factory {
        self.factory.as_ref()
    }

    pub fn device(&self) -> &dyn Device {
        self.device.as_ref()
    }

    pub fn backend_instance(&self) -> &dyn BackendInstance {
        self.backend_instance.as_ref()
    }

    /// File-backed cache handler for one pipeline
    ///
    /// Handlers get their own sub-directory per `namespace` (typically a
    /// pipeline's shader content hash) under the configured cache directory,
    /// so key domains of different pipelines never share files.
    pub fn create_cache_handler(&self, namespace: u64) -> DefaultCacheHandler {
        DefaultCacheHandler::new(self.config.cache_directory.join(format!("{:016x}", namespace)))
    }
}

#[cfg(test)]
#[path = "instance_tests.rs"]
mod tests;
