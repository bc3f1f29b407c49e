/// VulkanImageSampler - Vulkan implementation of the ImageSampler trait
///
/// Anisotropy is clamped to the device limit and silently disabled when the
/// device does not support it.

use std::any::Any;
use std::sync::Arc;

use ash::vk;
use xenon_engine::xenon::backend::{ImageSampler, ImageSamplerSpecification};
use xenon_engine::xenon::Result;
use xenon_engine::{engine_err, engine_warn};

use crate::vulkan_context::GpuContext;
use crate::vulkan_conversions::{address_mode, border_color, compare_op, filter, mipmap_mode};

const SOURCE: &str = "xenon::vulkan::Sampler";

pub struct VulkanImageSampler {
    ctx: Arc<GpuContext>,
    pub(crate) sampler: vk::Sampler,
    specification: ImageSamplerSpecification,
}

impl VulkanImageSampler {
    pub(crate) fn new(ctx: Arc<GpuContext>, specification: &ImageSamplerSpecification) -> Result<Self> {
        let anisotropy_supported = unsafe {
            ctx.instance
                .instance
                .get_physical_device_features(ctx.physical_device)
                .sampler_anisotropy
                == vk::TRUE
        };
        let enable_anisotropy = specification.enable_anisotropy && anisotropy_supported;
        if specification.enable_anisotropy && !anisotropy_supported {
            engine_warn!(SOURCE, "Anisotropic filtering is not supported by this device, disabling it");
        }
        let max_anisotropy = specification
            .max_anisotropy
            .clamp(1.0, ctx.limits.max_sampler_anisotropy.max(1.0));

        let compare = if specification.enable_compare {
            compare_op(specification.compare_logic)
        } else {
            vk::CompareOp::ALWAYS
        };

        let create_info = vk::SamplerCreateInfo::default()
            .mag_filter(filter(specification.mag_filter))
            .min_filter(filter(specification.min_filter))
            .mipmap_mode(mipmap_mode(specification.mip_map_mode))
            .address_mode_u(address_mode(specification.address_mode_u))
            .address_mode_v(address_mode(specification.address_mode_v))
            .address_mode_w(address_mode(specification.address_mode_w))
            .mip_lod_bias(specification.mip_lod_bias)
            .anisotropy_enable(enable_anisotropy)
            .max_anisotropy(if enable_anisotropy { max_anisotropy } else { 1.0 })
            .compare_enable(specification.enable_compare)
            .compare_op(compare)
            .min_lod(specification.min_lod)
            .max_lod(specification.max_lod.min(vk::LOD_CLAMP_NONE))
            .border_color(border_color(specification.border_color))
            .unnormalized_coordinates(specification.enable_unnormalized_coordinates);

        let sampler = unsafe { ctx.device.create_sampler(&create_info, None) }
            .map_err(|e| engine_err!(SOURCE, "Failed to create sampler: {:?}", e))?;

        Ok(Self { ctx, sampler, specification: *specification })
    }
}

impl ImageSampler for VulkanImageSampler {
    fn specification(&self) -> &ImageSamplerSpecification {
        &self.specification
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for VulkanImageSampler {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device.destroy_sampler(self.sampler, None);
        }
    }
}
