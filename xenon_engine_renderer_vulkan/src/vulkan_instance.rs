/// VulkanInstance - Vulkan implementation of the BackendInstance trait
///
/// The instance is created without a window: surface support is enabled for
/// every windowing system the loader reports, so any later window can get a
/// swapchain.

use std::any::Any;
use std::ffi::{c_char, CStr, CString};
use std::sync::Arc;

use ash::vk;
use xenon_engine::xenon::backend::BackendInstance;
use xenon_engine::xenon::{Config, Error, Result};
use xenon_engine::{engine_debug, engine_error, engine_info, engine_warn};

use crate::vulkan_context::{InstanceContext, SOURCE};

#[cfg(feature = "vulkan-validation")]
const VALIDATION_LAYER: &CStr = c"VK_LAYER_KHRONOS_validation";

/// Surface extensions enabled when the loader offers them
const SURFACE_EXTENSIONS: [&CStr; 6] = [
    ash::khr::win32_surface::NAME,
    ash::khr::xlib_surface::NAME,
    ash::khr::xcb_surface::NAME,
    ash::khr::wayland_surface::NAME,
    ash::ext::metal_surface::NAME,
    ash::khr::android_surface::NAME,
];

pub struct VulkanInstance {
    pub(crate) context: Arc<InstanceContext>,
}

impl VulkanInstance {
    pub fn new(config: &Config) -> Result<Self> {
        unsafe {
            let entry = ash::Entry::load().map_err(|e| {
                engine_error!(SOURCE, "Failed to load Vulkan library: {:?}", e);
                Error::InitializationFailed(format!("Failed to load Vulkan library: {:?}", e))
            })?;

            let application_name = CString::new(config.application_name.as_str()).map_err(|e| {
                engine_error!(SOURCE, "Invalid application name: {}", e);
                Error::InitializationFailed(format!("Invalid application name: {}", e))
            })?;

            let app_info = vk::ApplicationInfo::default()
                .application_name(&application_name)
                .application_version(config.application_version)
                .engine_name(c"Xenon")
                .engine_version(vk::make_api_version(0, 0, 1, 0))
                .api_version(vk::API_VERSION_1_3);

            let available = entry.enumerate_instance_extension_properties(None).map_err(|e| {
                engine_error!(SOURCE, "Failed to enumerate instance extensions: {:?}", e);
                Error::InitializationFailed(format!("Failed to enumerate instance extensions: {:?}", e))
            })?;
            let is_available = |name: &CStr| {
                available
                    .iter()
                    .any(|properties| properties.extension_name_as_c_str().is_ok_and(|n| n == name))
            };

            if !is_available(ash::khr::surface::NAME) {
                engine_error!(SOURCE, "VK_KHR_surface is not available");
                return Err(Error::InitializationFailed("VK_KHR_surface is not available".to_string()));
            }

            let mut extension_names: Vec<*const c_char> = vec![ash::khr::surface::NAME.as_ptr()];
            for name in SURFACE_EXTENSIONS {
                if is_available(name) {
                    engine_debug!(SOURCE, "Enabling {}", name.to_string_lossy());
                    extension_names.push(name.as_ptr());
                }
            }

            let mut flags = vk::InstanceCreateFlags::empty();
            if is_available(ash::khr::portability_enumeration::NAME) {
                extension_names.push(ash::khr::portability_enumeration::NAME.as_ptr());
                flags |= vk::InstanceCreateFlags::ENUMERATE_PORTABILITY_KHR;
            }

            let enable_validation = Self::validation_enabled(&entry, config);
            #[allow(unused_mut)]
            let mut layer_names: Vec<*const c_char> = Vec::new();
            #[cfg(feature = "vulkan-validation")]
            if enable_validation {
                extension_names.push(ash::ext::debug_utils::NAME.as_ptr());
                layer_names.push(VALIDATION_LAYER.as_ptr());
            }

            let create_info = vk::InstanceCreateInfo::default()
                .flags(flags)
                .application_info(&app_info)
                .enabled_layer_names(&layer_names)
                .enabled_extension_names(&extension_names);

            let instance = entry.create_instance(&create_info, None).map_err(|e| {
                engine_error!(SOURCE, "Failed to create Vulkan instance: {:?}", e);
                Error::InitializationFailed(format!("Failed to create instance: {:?}", e))
            })?;

            let surface_loader = ash::khr::surface::Instance::new(&entry, &instance);

            #[cfg(feature = "vulkan-validation")]
            let debug_messenger = if enable_validation {
                let debug_config = crate::debug::DebugConfig {
                    severity: config.debug_severity,
                    output: config.debug_output.clone(),
                    message_filter: config.debug_message_filter,
                };
                match crate::debug::create_debug_messenger(&entry, &instance, debug_config) {
                    Ok(messenger) => Some(messenger),
                    Err(e) => {
                        instance.destroy_instance(None);
                        return Err(e);
                    }
                }
            } else {
                None
            };

            engine_info!(
                SOURCE,
                "Vulkan instance created for '{}' (validation: {})",
                config.application_name,
                enable_validation
            );

            Ok(Self {
                context: Arc::new(InstanceContext {
                    entry,
                    instance,
                    surface_loader,
                    application_name: config.application_name.clone(),
                    application_version: config.application_version,
                    #[cfg(feature = "vulkan-validation")]
                    debug_messenger,
                }),
            })
        }
    }

    /// Whether validation is requested, compiled in and installed
    #[cfg(feature = "vulkan-validation")]
    fn validation_enabled(entry: &ash::Entry, config: &Config) -> bool {
        if !config.enable_validation {
            return false;
        }
        let layers = unsafe { entry.enumerate_instance_layer_properties() }.unwrap_or_default();
        let installed = layers
            .iter()
            .any(|layer| layer.layer_name_as_c_str().is_ok_and(|name| name == VALIDATION_LAYER));
        if !installed {
            engine_warn!(SOURCE, "Validation requested but VK_LAYER_KHRONOS_validation is not installed");
        }
        installed
    }

    #[cfg(not(feature = "vulkan-validation"))]
    fn validation_enabled(_entry: &ash::Entry, config: &Config) -> bool {
        if config.enable_validation {
            engine_warn!(SOURCE, "Validation requested but the `vulkan-validation` feature is disabled");
        }
        false
    }
}

impl BackendInstance for VulkanInstance {
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
