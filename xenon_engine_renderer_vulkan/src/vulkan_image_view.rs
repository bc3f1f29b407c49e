/// VulkanImageView - Vulkan implementation of the ImageView trait

use std::any::Any;
use std::sync::Arc;

use ash::vk;
use xenon_engine::xenon::backend::{Image, ImageView, ImageViewSpecification};
use xenon_engine::xenon::Result;
use xenon_engine::{engine_bail, engine_err};

use crate::vulkan_context::GpuContext;
use crate::vulkan_conversions::{component_swizzle, data_format, image_type};
use crate::vulkan_image::VulkanImage;

const SOURCE: &str = "xenon::vulkan::ImageView";

pub struct VulkanImageView {
    ctx: Arc<GpuContext>,
    pub(crate) view: vk::ImageView,
    specification: ImageViewSpecification,
}

impl VulkanImageView {
    pub(crate) fn new(ctx: Arc<GpuContext>, image: &dyn Image, specification: &ImageViewSpecification) -> Result<Self> {
        let Some(image) = image.downcast_ref::<VulkanImage>() else {
            engine_bail!(SOURCE, "Image was not created by the Vulkan backend");
        };

        let image_specification = image.specification();
        let mip_levels = image_specification.mip_levels();
        let layers = image.layer_count();
        if specification.base_mip_level >= mip_levels || specification.base_array_layer >= layers {
            engine_bail!(
                SOURCE,
                "View starts at mip {} / layer {} but the image has {} mip(s) and {} layer(s)",
                specification.base_mip_level,
                specification.base_array_layer,
                mip_levels,
                layers
            );
        }

        let level_count = match specification.level_count {
            0 => vk::REMAINING_MIP_LEVELS,
            count => count,
        };
        let layer_count = match specification.layer_count {
            0 => vk::REMAINING_ARRAY_LAYERS,
            count => count,
        };

        // Sampling a depth/stencil image reads the depth aspect only
        let mut aspect_mask = image.aspect_mask();
        if aspect_mask.contains(vk::ImageAspectFlags::DEPTH) {
            aspect_mask = vk::ImageAspectFlags::DEPTH;
        }

        let (_, view_type, _) = image_type(image_specification.image_type);
        let create_info = vk::ImageViewCreateInfo::default()
            .image(image.image)
            .view_type(view_type)
            .format(data_format(image_specification.format))
            .components(vk::ComponentMapping {
                r: component_swizzle(specification.component_r),
                g: component_swizzle(specification.component_g),
                b: component_swizzle(specification.component_b),
                a: component_swizzle(specification.component_a),
            })
            .subresource_range(vk::ImageSubresourceRange {
                aspect_mask,
                base_mip_level: specification.base_mip_level,
                level_count,
                base_array_layer: specification.base_array_layer,
                layer_count,
            });

        let view = unsafe { ctx.device.create_image_view(&create_info, None) }
            .map_err(|e| engine_err!(SOURCE, "Failed to create image view: {:?}", e))?;

        Ok(Self { ctx, view, specification: *specification })
    }
}

impl ImageView for VulkanImageView {
    fn specification(&self) -> &ImageViewSpecification {
        &self.specification
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for VulkanImageView {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device.destroy_image_view(self.view, None);
        }
    }
}
