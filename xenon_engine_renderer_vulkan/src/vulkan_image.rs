/// VulkanImage - Vulkan implementation of the Image trait
///
/// The image tracks one layout for all of its subresources. Transfers leave
/// every level in the image's resting layout, derived from its usage.

use std::any::Any;
use std::sync::{Arc, Mutex};

use ash::vk;
use gpu_allocator::vulkan::Allocation;
use gpu_allocator::MemoryLocation;
use xenon_engine::xenon::backend::{
    check_range, Buffer, CommandRecorder, DataFormat, Image, ImageSpecification, ImageType, ImageUsage,
};
use xenon_engine::xenon::Result;
use xenon_engine::{engine_bail, engine_debug, engine_err};

use crate::vulkan_buffer::VulkanBuffer;
use crate::vulkan_command_recorder::record_or_submit;
use crate::vulkan_context::GpuContext;
use crate::vulkan_conversions::{aspect_flags, data_format, image_type, image_usage, sample_count};

const SOURCE: &str = "xenon::vulkan::Image";

/// Access mask and stages an image in `layout` is used with
pub(crate) fn layout_access(layout: vk::ImageLayout) -> (vk::AccessFlags, vk::PipelineStageFlags) {
    match layout {
        vk::ImageLayout::UNDEFINED => (vk::AccessFlags::empty(), vk::PipelineStageFlags::TOP_OF_PIPE),
        vk::ImageLayout::TRANSFER_SRC_OPTIMAL => (vk::AccessFlags::TRANSFER_READ, vk::PipelineStageFlags::TRANSFER),
        vk::ImageLayout::TRANSFER_DST_OPTIMAL => (vk::AccessFlags::TRANSFER_WRITE, vk::PipelineStageFlags::TRANSFER),
        vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL => (vk::AccessFlags::SHADER_READ, vk::PipelineStageFlags::ALL_COMMANDS),
        vk::ImageLayout::GENERAL => (
            vk::AccessFlags::SHADER_READ | vk::AccessFlags::SHADER_WRITE,
            vk::PipelineStageFlags::ALL_COMMANDS,
        ),
        vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL => (
            vk::AccessFlags::COLOR_ATTACHMENT_READ | vk::AccessFlags::COLOR_ATTACHMENT_WRITE,
            vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
        ),
        vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL => (
            vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_READ | vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE,
            vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS | vk::PipelineStageFlags::LATE_FRAGMENT_TESTS,
        ),
        vk::ImageLayout::PRESENT_SRC_KHR => (vk::AccessFlags::empty(), vk::PipelineStageFlags::BOTTOM_OF_PIPE),
        _ => (
            vk::AccessFlags::MEMORY_READ | vk::AccessFlags::MEMORY_WRITE,
            vk::PipelineStageFlags::ALL_COMMANDS,
        ),
    }
}

/// Record a layout transition of `range` of `image`
pub(crate) fn record_layout_transition(
    device: &ash::Device,
    command_buffer: vk::CommandBuffer,
    image: vk::Image,
    range: vk::ImageSubresourceRange,
    old_layout: vk::ImageLayout,
    new_layout: vk::ImageLayout,
) {
    let (src_access, src_stage) = layout_access(old_layout);
    let (dst_access, dst_stage) = layout_access(new_layout);
    let barrier = vk::ImageMemoryBarrier::default()
        .old_layout(old_layout)
        .new_layout(new_layout)
        .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
        .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
        .image(image)
        .subresource_range(range)
        .src_access_mask(src_access)
        .dst_access_mask(dst_access);

    unsafe {
        device.cmd_pipeline_barrier(
            command_buffer,
            src_stage,
            dst_stage,
            vk::DependencyFlags::empty(),
            &[],
            &[],
            &[barrier],
        );
    }
}

/// Vulkan image implementation
pub struct VulkanImage {
    ctx: Arc<GpuContext>,
    pub(crate) image: vk::Image,
    /// View over every level and layer, used for attachments and storage writes
    pub(crate) view: vk::ImageView,
    allocation: Option<Allocation>,
    specification: ImageSpecification,
    aspect_mask: vk::ImageAspectFlags,
    layout: Mutex<vk::ImageLayout>,
}

impl VulkanImage {
    pub(crate) fn new(ctx: Arc<GpuContext>, specification: &ImageSpecification) -> Result<Self> {
        if specification.width == 0 || specification.height == 0 {
            engine_bail!(
                SOURCE,
                "Invalid image extent {}x{}",
                specification.width,
                specification.height
            );
        }
        if specification.format == DataFormat::Undefined {
            engine_bail!(SOURCE, "Cannot create an image with an undefined format");
        }

        let (vk_image_type, vk_view_type, flags) = image_type(specification.image_type);
        let format = data_format(specification.format);
        let aspect_mask = aspect_flags(specification.format);
        let mip_levels = specification.mip_levels();
        let array_layers = Self::array_layers(specification);
        let depth = match specification.image_type {
            ImageType::ThreeDimensional => specification.depth.max(1),
            _ => 1,
        };

        unsafe {
            let image_create_info = vk::ImageCreateInfo::default()
                .flags(flags)
                .image_type(vk_image_type)
                .format(format)
                .extent(vk::Extent3D { width: specification.width, height: specification.height, depth })
                .mip_levels(mip_levels)
                .array_layers(array_layers)
                .samples(sample_count(specification.multi_sampling_count))
                .tiling(vk::ImageTiling::OPTIMAL)
                .usage(image_usage(specification.usage))
                .sharing_mode(vk::SharingMode::EXCLUSIVE)
                .initial_layout(vk::ImageLayout::UNDEFINED);

            let image = ctx
                .device
                .create_image(&image_create_info, None)
                .map_err(|e| engine_err!(SOURCE, "Failed to create image: {:?}", e))?;

            let requirements = ctx.device.get_image_memory_requirements(image);
            let allocation = match ctx.allocate("image", requirements, MemoryLocation::GpuOnly, false) {
                Ok(allocation) => allocation,
                Err(e) => {
                    ctx.device.destroy_image(image, None);
                    return Err(e);
                }
            };

            if let Err(e) = ctx
                .device
                .bind_image_memory(image, allocation.memory(), allocation.offset())
            {
                ctx.free(allocation);
                ctx.device.destroy_image(image, None);
                engine_bail!(SOURCE, "Failed to bind image memory: {:?}", e);
            }

            let view_create_info = vk::ImageViewCreateInfo::default()
                .image(image)
                .view_type(vk_view_type)
                .format(format)
                .subresource_range(vk::ImageSubresourceRange {
                    aspect_mask,
                    base_mip_level: 0,
                    level_count: mip_levels,
                    base_array_layer: 0,
                    layer_count: array_layers,
                });

            let view = match ctx.device.create_image_view(&view_create_info, None) {
                Ok(view) => view,
                Err(e) => {
                    ctx.free(allocation);
                    ctx.device.destroy_image(image, None);
                    engine_bail!(SOURCE, "Failed to create image view: {:?}", e);
                }
            };

            Ok(Self {
                ctx,
                image,
                view,
                allocation: Some(allocation),
                specification: *specification,
                aspect_mask,
                layout: Mutex::new(vk::ImageLayout::UNDEFINED),
            })
        }
    }

    /// Cube maps hold six faces per layer
    fn array_layers(specification: &ImageSpecification) -> u32 {
        match specification.image_type {
            ImageType::CubeMap => 6 * specification.layers.max(1),
            _ => specification.layers.max(1),
        }
    }

    pub(crate) fn layer_count(&self) -> u32 {
        Self::array_layers(&self.specification)
    }

    pub(crate) fn aspect_mask(&self) -> vk::ImageAspectFlags {
        self.aspect_mask
    }

    /// Layout the image is left in after transfers
    pub(crate) fn resting_layout(&self) -> vk::ImageLayout {
        let usage = self.specification.usage;
        if usage.contains(ImageUsage::STORAGE) {
            vk::ImageLayout::GENERAL
        } else if usage.contains(ImageUsage::GRAPHICS) {
            vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL
        } else if usage.contains(ImageUsage::DEPTH_ATTACHMENT) {
            vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL
        } else if usage.contains(ImageUsage::COLOR_ATTACHMENT) {
            vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL
        } else {
            vk::ImageLayout::TRANSFER_DST_OPTIMAL
        }
    }

    pub(crate) fn layout(&self) -> vk::ImageLayout {
        self.layout.lock().map(|layout| *layout).unwrap_or(vk::ImageLayout::UNDEFINED)
    }

    /// Update the tracked layout after a render pass changed it
    pub(crate) fn set_layout(&self, layout: vk::ImageLayout) {
        if let Ok(mut current) = self.layout.lock() {
            *current = layout;
        }
    }

    fn full_range(&self) -> vk::ImageSubresourceRange {
        self.level_range(0, self.specification.mip_levels())
    }

    fn level_range(&self, base_mip_level: u32, level_count: u32) -> vk::ImageSubresourceRange {
        vk::ImageSubresourceRange {
            aspect_mask: self.aspect_mask,
            base_mip_level,
            level_count,
            base_array_layer: 0,
            layer_count: self.layer_count(),
        }
    }

    fn base_layers(&self, mip_level: u32) -> vk::ImageSubresourceLayers {
        vk::ImageSubresourceLayers {
            aspect_mask: self.aspect_mask,
            mip_level,
            base_array_layer: 0,
            layer_count: self.layer_count(),
        }
    }

    /// Record a transition of every subresource to `new_layout`
    pub(crate) fn record_transition(&self, command_buffer: vk::CommandBuffer, new_layout: vk::ImageLayout) {
        let old_layout = self.layout();
        if old_layout == new_layout {
            return;
        }
        record_layout_transition(&self.ctx.device, command_buffer, self.image, self.full_range(), old_layout, new_layout);
        self.set_layout(new_layout);
    }

    fn record_copy_from_buffer(&self, command_buffer: vk::CommandBuffer, src: &VulkanBuffer) {
        self.record_transition(command_buffer, vk::ImageLayout::TRANSFER_DST_OPTIMAL);

        let depth = match self.specification.image_type {
            ImageType::ThreeDimensional => self.specification.depth.max(1),
            _ => 1,
        };
        let region = vk::BufferImageCopy::default()
            .buffer_offset(0)
            .buffer_row_length(0)
            .buffer_image_height(0)
            .image_subresource(self.base_layers(0))
            .image_offset(vk::Offset3D { x: 0, y: 0, z: 0 })
            .image_extent(vk::Extent3D {
                width: self.specification.width,
                height: self.specification.height,
                depth,
            });

        src.record_as_copy_source(command_buffer, |buffer| unsafe {
            self.ctx.device.cmd_copy_buffer_to_image(
                command_buffer,
                buffer,
                self.image,
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                &[region],
            );
        });

        self.record_transition(command_buffer, self.resting_layout());
    }

    fn record_copy_from_image(&self, command_buffer: vk::CommandBuffer, src: &VulkanImage) {
        let src_before = match src.layout() {
            vk::ImageLayout::UNDEFINED => src.resting_layout(),
            layout => layout,
        };
        src.record_transition(command_buffer, vk::ImageLayout::TRANSFER_SRC_OPTIMAL);
        self.record_transition(command_buffer, vk::ImageLayout::TRANSFER_DST_OPTIMAL);

        let mut src_layers = src.base_layers(0);
        let mut dst_layers = self.base_layers(0);
        let layer_count = src_layers.layer_count.min(dst_layers.layer_count);
        src_layers.layer_count = layer_count;
        dst_layers.layer_count = layer_count;

        let region = vk::ImageCopy::default()
            .src_subresource(src_layers)
            .src_offset(vk::Offset3D { x: 0, y: 0, z: 0 })
            .dst_subresource(dst_layers)
            .dst_offset(vk::Offset3D { x: 0, y: 0, z: 0 })
            .extent(vk::Extent3D { width: self.specification.width, height: self.specification.height, depth: 1 });

        unsafe {
            self.ctx.device.cmd_copy_image(
                command_buffer,
                src.image,
                vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
                self.image,
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                &[region],
            );
        }

        src.record_transition(command_buffer, src_before);
        self.record_transition(command_buffer, self.resting_layout());
    }

    fn blit_filter(&self) -> vk::Filter {
        let properties = unsafe {
            self.ctx.instance.instance.get_physical_device_format_properties(
                self.ctx.physical_device,
                data_format(self.specification.format),
            )
        };
        if properties
            .optimal_tiling_features
            .contains(vk::FormatFeatureFlags::SAMPLED_IMAGE_FILTER_LINEAR)
        {
            vk::Filter::LINEAR
        } else {
            vk::Filter::NEAREST
        }
    }

    fn record_mip_chain(&self, command_buffer: vk::CommandBuffer, filter: vk::Filter) {
        let mip_levels = self.specification.mip_levels();
        let resting = self.resting_layout();
        let device = &self.ctx.device;

        self.record_transition(command_buffer, vk::ImageLayout::TRANSFER_DST_OPTIMAL);

        for mip in 1..mip_levels {
            let src_mip = mip - 1;
            let (src_width, src_height) = self.specification.mip_extent(src_mip);
            let (dst_width, dst_height) = self.specification.mip_extent(mip);

            record_layout_transition(
                device,
                command_buffer,
                self.image,
                self.level_range(src_mip, 1),
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
            );

            let blit = vk::ImageBlit::default()
                .src_subresource(self.base_layers(src_mip))
                .src_offsets([
                    vk::Offset3D { x: 0, y: 0, z: 0 },
                    vk::Offset3D { x: src_width as i32, y: src_height as i32, z: 1 },
                ])
                .dst_subresource(self.base_layers(mip))
                .dst_offsets([
                    vk::Offset3D { x: 0, y: 0, z: 0 },
                    vk::Offset3D { x: dst_width as i32, y: dst_height as i32, z: 1 },
                ]);

            unsafe {
                device.cmd_blit_image(
                    command_buffer,
                    self.image,
                    vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
                    self.image,
                    vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                    &[blit],
                    filter,
                );
            }

            // Done with this level
            record_layout_transition(
                device,
                command_buffer,
                self.image,
                self.level_range(src_mip, 1),
                vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
                resting,
            );
        }

        record_layout_transition(
            device,
            command_buffer,
            self.image,
            self.level_range(mip_levels - 1, 1),
            vk::ImageLayout::TRANSFER_DST_OPTIMAL,
            resting,
        );
        self.set_layout(resting);
    }
}

impl Image for VulkanImage {
    fn specification(&self) -> &ImageSpecification {
        &self.specification
    }

    fn copy_from_buffer(&self, src: &dyn Buffer, recorder: Option<&mut dyn CommandRecorder>) -> Result<()> {
        let Some(src) = src.downcast_ref::<VulkanBuffer>() else {
            engine_bail!(SOURCE, "Source buffer was not created by the Vulkan backend");
        };
        let required = self.specification.base_level_size() * self.layer_count() as u64;
        check_range(SOURCE, src.size(), 0, required)?;

        record_or_submit(&self.ctx, recorder, |command_buffer| {
            self.record_copy_from_buffer(command_buffer, src);
            Ok(())
        })
    }

    fn copy_from_image(&self, src: &dyn Image, recorder: Option<&mut dyn CommandRecorder>) -> Result<()> {
        let Some(src) = src.downcast_ref::<VulkanImage>() else {
            engine_bail!(SOURCE, "Source image was not created by the Vulkan backend");
        };
        let (src_spec, dst_spec) = (src.specification(), &self.specification);
        if src_spec.width != dst_spec.width || src_spec.height != dst_spec.height {
            engine_bail!(
                SOURCE,
                "Cannot copy a {}x{} image into a {}x{} image",
                src_spec.width,
                src_spec.height,
                dst_spec.width,
                dst_spec.height
            );
        }

        record_or_submit(&self.ctx, recorder, |command_buffer| {
            self.record_copy_from_image(command_buffer, src);
            Ok(())
        })
    }

    fn generate_mip_maps(&self, recorder: Option<&mut dyn CommandRecorder>) -> Result<()> {
        if self.specification.mip_levels() <= 1 {
            engine_debug!(SOURCE, "Image has a single mip level, nothing to generate");
            return Ok(());
        }

        let filter = self.blit_filter();
        record_or_submit(&self.ctx, recorder, |command_buffer| {
            self.record_mip_chain(command_buffer, filter);
            Ok(())
        })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for VulkanImage {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device.destroy_image_view(self.view, None);
            if let Some(allocation) = self.allocation.take() {
                self.ctx.free(allocation);
            }
            self.ctx.device.destroy_image(self.image, None);
        }
    }
}
