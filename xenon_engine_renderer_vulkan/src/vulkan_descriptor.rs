/// VulkanDescriptor - one descriptor set of a pipeline layout
///
/// Each descriptor owns a pool sized for exactly its bindings, so descriptors
/// can be created and dropped independently from any thread.

use std::any::Any;
use std::sync::Arc;

use ash::vk;
use xenon_engine::xenon::backend::{
    checked_binding, Buffer, Descriptor, DescriptorBindings, DescriptorType, Image, ImageSampler, ImageView,
    ResourceType, TopLevelAccelerationStructure, BUFFER_RESOURCE_TYPES, IMAGE_RESOURCE_TYPES,
};
use xenon_engine::xenon::Result;
use xenon_engine::{engine_bail, engine_err, engine_trace};

use crate::vulkan_buffer::VulkanBuffer;
use crate::vulkan_context::GpuContext;
use crate::vulkan_conversions::descriptor_type as vk_descriptor_type;
use crate::vulkan_image::VulkanImage;
use crate::vulkan_image_view::VulkanImageView;
use crate::vulkan_pipeline_layout::VulkanPipelineLayout;
use crate::vulkan_ray_tracing::VulkanTopLevelAccelerationStructure;
use crate::vulkan_sampler::VulkanImageSampler;

const SOURCE: &str = "xenon::vulkan::Descriptor";

/// Vulkan descriptor implementation
pub struct VulkanDescriptor {
    ctx: Arc<GpuContext>,
    /// Keeps the set layout alive as long as the set
    _layout: Arc<VulkanPipelineLayout>,
    descriptor_type: DescriptorType,
    bindings: DescriptorBindings,
    pool: vk::DescriptorPool,
    pub(crate) set: vk::DescriptorSet,
}

impl VulkanDescriptor {
    pub(crate) fn new(
        ctx: Arc<GpuContext>,
        layout: Arc<VulkanPipelineLayout>,
        descriptor_type: DescriptorType,
    ) -> Result<Self> {
        let bindings = layout.binding_map().bindings(descriptor_type).clone();

        let mut pool_sizes: Vec<vk::DescriptorPoolSize> = Vec::new();
        for info in bindings.values() {
            let ty = vk_descriptor_type(info.resource_type);
            match pool_sizes.iter_mut().find(|size| size.ty == ty) {
                Some(size) => size.descriptor_count += 1,
                None => pool_sizes.push(vk::DescriptorPoolSize { ty, descriptor_count: 1 }),
            }
        }
        // Pools cannot be created without sizes, even for an empty set
        if pool_sizes.is_empty() {
            pool_sizes.push(vk::DescriptorPoolSize { ty: vk::DescriptorType::UNIFORM_BUFFER, descriptor_count: 1 });
        }

        let pool_info = vk::DescriptorPoolCreateInfo::default()
            .max_sets(1)
            .pool_sizes(&pool_sizes);
        let pool = unsafe { ctx.device.create_descriptor_pool(&pool_info, None) }
            .map_err(|e| engine_err!(SOURCE, "Failed to create descriptor pool: {:?}", e))?;

        let set_layouts = [layout.set_layouts[descriptor_type.set_index() as usize]];
        let alloc_info = vk::DescriptorSetAllocateInfo::default()
            .descriptor_pool(pool)
            .set_layouts(&set_layouts);
        let set = match unsafe { ctx.device.allocate_descriptor_sets(&alloc_info) } {
            Ok(sets) => sets[0],
            Err(e) => {
                unsafe {
                    ctx.device.destroy_descriptor_pool(pool, None);
                }
                engine_bail!(SOURCE, "Failed to allocate descriptor set: {:?}", e);
            }
        };

        engine_trace!(SOURCE, "Created {:?} descriptor with {} binding(s)", descriptor_type, bindings.len());
        Ok(Self { ctx, _layout: layout, descriptor_type, bindings, pool, set })
    }

    fn write(&self, write: vk::WriteDescriptorSet<'_>) {
        unsafe {
            self.ctx.device.update_descriptor_sets(&[write], &[]);
        }
    }
}

impl Descriptor for VulkanDescriptor {
    fn descriptor_type(&self) -> DescriptorType {
        self.descriptor_type
    }

    fn bindings(&self) -> &DescriptorBindings {
        &self.bindings
    }

    fn attach_buffer(&mut self, binding: u32, buffer: &dyn Buffer) -> Result<()> {
        let info = checked_binding(&self.bindings, binding, &BUFFER_RESOURCE_TYPES)?;
        let Some(buffer) = buffer.downcast_ref::<VulkanBuffer>() else {
            engine_bail!(SOURCE, "Buffer was not created by the Vulkan backend");
        };

        let buffer_infos = [vk::DescriptorBufferInfo::default()
            .buffer(buffer.buffer)
            .offset(0)
            .range(vk::WHOLE_SIZE)];
        self.write(
            vk::WriteDescriptorSet::default()
                .dst_set(self.set)
                .dst_binding(binding)
                .descriptor_type(vk_descriptor_type(info.resource_type))
                .buffer_info(&buffer_infos),
        );
        Ok(())
    }

    fn attach_image(
        &mut self,
        binding: u32,
        image: &dyn Image,
        view: &dyn ImageView,
        sampler: &dyn ImageSampler,
    ) -> Result<()> {
        let info = checked_binding(&self.bindings, binding, &IMAGE_RESOURCE_TYPES)?;
        if image.downcast_ref::<VulkanImage>().is_none() {
            engine_bail!(SOURCE, "Image was not created by the Vulkan backend");
        }
        let Some(view) = view.as_any().downcast_ref::<VulkanImageView>() else {
            engine_bail!(SOURCE, "Image view was not created by the Vulkan backend");
        };
        let Some(sampler) = sampler.as_any().downcast_ref::<VulkanImageSampler>() else {
            engine_bail!(SOURCE, "Sampler was not created by the Vulkan backend");
        };

        let image_layout = match info.resource_type {
            ResourceType::StorageImage => vk::ImageLayout::GENERAL,
            _ => vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
        };
        let image_infos = [vk::DescriptorImageInfo::default()
            .image_layout(image_layout)
            .image_view(view.view)
            .sampler(sampler.sampler)];
        self.write(
            vk::WriteDescriptorSet::default()
                .dst_set(self.set)
                .dst_binding(binding)
                .descriptor_type(vk_descriptor_type(info.resource_type))
                .image_info(&image_infos),
        );
        Ok(())
    }

    fn attach_acceleration_structure(
        &mut self,
        binding: u32,
        acceleration_structure: &dyn TopLevelAccelerationStructure,
    ) -> Result<()> {
        checked_binding(&self.bindings, binding, &[ResourceType::AccelerationStructure])?;
        let Some(tlas) = acceleration_structure.downcast_ref::<VulkanTopLevelAccelerationStructure>() else {
            engine_bail!(SOURCE, "Acceleration structure was not created by the Vulkan backend");
        };

        let handles = [tlas.handle];
        let mut as_info = vk::WriteDescriptorSetAccelerationStructureKHR::default().acceleration_structures(&handles);
        let mut write = vk::WriteDescriptorSet::default()
            .dst_set(self.set)
            .dst_binding(binding)
            .descriptor_type(vk::DescriptorType::ACCELERATION_STRUCTURE_KHR)
            .push_next(&mut as_info);
        // Not derived from the pNext chain
        write.descriptor_count = 1;
        self.write(write);
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for VulkanDescriptor {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device.destroy_descriptor_pool(self.pool, None);
        }
    }
}
