/// Descriptor (one bound descriptor set class) trait

use std::any::Any;

use crate::backend::binding::{DescriptorBindingInfo, DescriptorBindings};
use crate::backend::buffer::Buffer;
use crate::backend::image::{Image, ImageSampler, ImageView};
use crate::backend::ray_tracing::TopLevelAccelerationStructure;
use crate::backend::types::{DescriptorType, ResourceType};
use crate::error::{Error, Result};
use crate::engine_error;

/// Resources bound to one descriptor set class of a pipeline
///
/// Created by `RasterizingPipeline::create_descriptor` (or the compute and
/// ray tracing equivalents) from the pipeline's binding table.
pub trait Descriptor: Send + Sync {
    fn descriptor_type(&self) -> DescriptorType;

    fn bindings(&self) -> &DescriptorBindings;

    fn attach_buffer(&mut self, binding: u32, buffer: &dyn Buffer) -> Result<()>;

    fn attach_image(
        &mut self,
        binding: u32,
        image: &dyn Image,
        view: &dyn ImageView,
        sampler: &dyn ImageSampler,
    ) -> Result<()>;

    fn attach_acceleration_structure(
        &mut self,
        binding: u32,
        acceleration_structure: &dyn TopLevelAccelerationStructure,
    ) -> Result<()>;

    fn as_any(&self) -> &dyn Any;
}

impl dyn Descriptor + '_ {
    pub fn downcast_ref<T: Descriptor + 'static>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }
}

/// Look up `binding` and check its resource type is one of `accepted`
pub fn checked_binding(
    bindings: &DescriptorBindings,
    binding: u32,
    accepted: &[ResourceType],
) -> Result<DescriptorBindingInfo> {
    let Some(info) = bindings.get(&binding) else {
        let message = format!("Binding {} does not exist in this descriptor", binding);
        engine_error!("xenon::Descriptor", "{}", message);
        return Err(Error::InvalidResource(message));
    };

    if !accepted.contains(&info.resource_type) {
        let message = format!(
            "Binding {} expects a {:?}, which cannot be attached here",
            binding, info.resource_type
        );
        engine_error!("xenon::Descriptor", "{}", message);
        return Err(Error::InvalidResource(message));
    }
    Ok(*info)
}

/// Resource types a buffer can be attached to
pub const BUFFER_RESOURCE_TYPES: [ResourceType; 6] = [
    ResourceType::UniformBuffer,
    ResourceType::StorageBuffer,
    ResourceType::DynamicUniformBuffer,
    ResourceType::DynamicStorageBuffer,
    ResourceType::UniformTexelBuffer,
    ResourceType::StorageTexelBuffer,
];

/// Resource types an image can be attached to
pub const IMAGE_RESOURCE_TYPES: [ResourceType; 4] = [
    ResourceType::CombinedImageSampler,
    ResourceType::SampledImage,
    ResourceType::StorageImage,
    ResourceType::InputAttachment,
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::types::ShaderType;
    use crate::test_logger::TestLogger;
    use serial_test::serial;

    fn bindings() -> DescriptorBindings {
        let mut bindings = DescriptorBindings::new();
        bindings.insert(
            0,
            DescriptorBindingInfo {
                resource_type: ResourceType::UniformBuffer,
                applicable_shaders: ShaderType::VERTEX,
            },
        );
        bindings
    }

    #[test]
    #[serial]
    fn test_checked_binding_accepts_matching_type() {
        let info = checked_binding(&bindings(), 0, &BUFFER_RESOURCE_TYPES).unwrap();
        assert_eq!(info.resource_type, ResourceType::UniformBuffer);
    }

    #[test]
    #[serial]
    fn test_checked_binding_rejects_missing_and_mismatched() {
        let logs = TestLogger::install();

        assert!(checked_binding(&bindings(), 3, &BUFFER_RESOURCE_TYPES).is_err());
        assert!(checked_binding(&bindings(), 0, &IMAGE_RESOURCE_TYPES).is_err());
        assert_eq!(logs.count(crate::log::LogSeverity::Error), 2);

        TestLogger::uninstall();
    }
}
