/// SPIR-V reflection with spirq
///
/// Produces the backend-independent `ShaderReflection` (stage inputs, stage
/// outputs and descriptor resources) so applications can build a `Shader`
/// straight from a SPIR-V binary.

use spirq::ty::{AccessType, DescriptorType as SpirvDescriptorType, Type};
use spirq::var::Variable;
use xenon_engine::xenon::backend::{
    AttributeDataType, DescriptorType, ResourceOperation, ResourceType, Shader, ShaderAttribute, ShaderReflection,
    ShaderResource, ShaderSource,
};
use xenon_engine::xenon::Result;
use xenon_engine::{engine_bail, engine_err, engine_warn};

const SOURCE: &str = "xenon::vulkan::reflection";

/// Reflect the interface of a SPIR-V binary
///
/// Every entry point of the module contributes; resources seen by several
/// entry points are reported once. Variables the engine cannot express
/// (structs as stage inputs, descriptor sets above 3) are skipped with a warning.
pub fn reflect_spirv(binary: &[u32]) -> Result<ShaderReflection> {
    if binary.is_empty() {
        engine_bail!(SOURCE, "Cannot reflect an empty SPIR-V binary");
    }

    let entry_points = spirq::ReflectConfig::new()
        .spv(binary)
        .ref_all_rscs(true)
        .reflect()
        .map_err(|e| engine_err!(SOURCE, "SPIR-V reflection failed: {:?}", e))?;

    let mut reflection = ShaderReflection::default();

    for entry_point in &entry_points {
        for var in entry_point.vars.iter() {
            match var {
                Variable::Input { location, ty, .. } => {
                    if let Some(attribute) = attribute(location.loc(), ty) {
                        push_unique(&mut reflection.input_attributes, attribute);
                    }
                }
                Variable::Output { location, ty, .. } => {
                    if let Some(attribute) = attribute(location.loc(), ty) {
                        push_unique(&mut reflection.output_attributes, attribute);
                    }
                }
                Variable::Descriptor { desc_bind, desc_ty, .. } => {
                    let Some(set) = DescriptorType::from_set_index(desc_bind.set()) else {
                        engine_warn!(
                            SOURCE,
                            "Ignoring binding {} of descriptor set {}: only sets 0..=3 are supported",
                            desc_bind.bind(),
                            desc_bind.set()
                        );
                        continue;
                    };
                    let (resource_type, operations) = resource(desc_ty);
                    push_unique(
                        &mut reflection.resources,
                        ShaderResource { binding: desc_bind.bind(), set, resource_type, operations },
                    );
                }
                _ => {}
            }
        }
    }

    reflection.input_attributes.sort_by_key(|a| a.location);
    reflection.output_attributes.sort_by_key(|a| a.location);
    reflection.resources.sort_by_key(|r| (r.set, r.binding));

    Ok(reflection)
}

/// Build a SPIR-V only `Shader` with reflected metadata
pub fn shader_from_spirv(source: ShaderSource) -> Result<Shader> {
    let reflection = reflect_spirv(source.binary())?;
    Ok(Shader::from_spirv(source, reflection))
}

fn push_unique<T: PartialEq>(items: &mut Vec<T>, item: T) {
    if !items.contains(&item) {
        items.push(item);
    }
}

fn attribute(location: u32, ty: &Type) -> Option<ShaderAttribute> {
    let data_type = match ty {
        Type::Scalar(_) => AttributeDataType::Scalar,
        Type::Vector(vector) => match vector.nscalar {
            2 => AttributeDataType::Vec2,
            3 => AttributeDataType::Vec3,
            4 => AttributeDataType::Vec4,
            _ => return unsupported_attribute(location, ty),
        },
        Type::Matrix(matrix) => match matrix.nvector {
            2 => AttributeDataType::Mat2,
            3 => AttributeDataType::Mat3,
            4 => AttributeDataType::Mat4,
            _ => return unsupported_attribute(location, ty),
        },
        _ => return unsupported_attribute(location, ty),
    };
    Some(ShaderAttribute { location, data_type })
}

fn unsupported_attribute(location: u32, ty: &Type) -> Option<ShaderAttribute> {
    engine_warn!(SOURCE, "Ignoring attribute at location {} with unsupported type {:?}", location, ty);
    None
}

fn operations(access: &AccessType) -> ResourceOperation {
    match access {
        AccessType::ReadOnly => ResourceOperation::READ,
        AccessType::WriteOnly => ResourceOperation::WRITE,
        AccessType::ReadWrite => ResourceOperation::READ | ResourceOperation::WRITE,
    }
}

fn resource(desc_ty: &SpirvDescriptorType) -> (ResourceType, ResourceOperation) {
    match desc_ty {
        SpirvDescriptorType::Sampler() => (ResourceType::Sampler, ResourceOperation::READ),
        SpirvDescriptorType::CombinedImageSampler() => (ResourceType::CombinedImageSampler, ResourceOperation::READ),
        SpirvDescriptorType::SampledImage() => (ResourceType::SampledImage, ResourceOperation::READ),
        SpirvDescriptorType::StorageImage(access) => (ResourceType::StorageImage, operations(access)),
        SpirvDescriptorType::UniformTexelBuffer() => (ResourceType::UniformTexelBuffer, ResourceOperation::READ),
        SpirvDescriptorType::StorageTexelBuffer(access) => (ResourceType::StorageTexelBuffer, operations(access)),
        SpirvDescriptorType::UniformBuffer() => (ResourceType::UniformBuffer, ResourceOperation::READ),
        SpirvDescriptorType::StorageBuffer(access) => (ResourceType::StorageBuffer, operations(access)),
        SpirvDescriptorType::InputAttachment(_) => (ResourceType::InputAttachment, ResourceOperation::READ),
        SpirvDescriptorType::AccelStruct() => (ResourceType::AccelerationStructure, ResourceOperation::READ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use xenon_engine::xenon::log::LogSeverity;

    use crate::test_logger::TestLogger;

    #[test]
    #[serial]
    fn test_empty_binary_is_rejected() {
        let logs = TestLogger::install();
        assert!(reflect_spirv(&[]).is_err());
        assert_eq!(logs.count(LogSeverity::Error), 1);
        TestLogger::uninstall();
    }

    #[test]
    #[serial]
    fn test_garbage_binary_is_rejected() {
        let logs = TestLogger::install();
        assert!(shader_from_spirv(ShaderSource::new(vec![0xDEAD_BEEF, 1, 2, 3, 4])).is_err());
        assert!(logs.contains("SPIR-V reflection failed"));
        TestLogger::uninstall();
    }

    #[test]
    fn test_storage_access_maps_to_operations() {
        assert_eq!(
            resource(&SpirvDescriptorType::StorageBuffer(AccessType::ReadWrite)),
            (ResourceType::StorageBuffer, ResourceOperation::READ | ResourceOperation::WRITE)
        );
        assert_eq!(
            resource(&SpirvDescriptorType::StorageImage(AccessType::WriteOnly)),
            (ResourceType::StorageImage, ResourceOperation::WRITE)
        );
        assert_eq!(
            resource(&SpirvDescriptorType::UniformBuffer()),
            (ResourceType::UniformBuffer, ResourceOperation::READ)
        );
        assert_eq!(
            resource(&SpirvDescriptorType::AccelStruct()).0,
            ResourceType::AccelerationStructure
        );
    }

    #[test]
    fn test_duplicates_are_reported_once() {
        let mut items = vec![ShaderAttribute { location: 0, data_type: AttributeDataType::Vec3 }];
        push_unique(&mut items, ShaderAttribute { location: 0, data_type: AttributeDataType::Vec3 });
        push_unique(&mut items, ShaderAttribute { location: 1, data_type: AttributeDataType::Vec2 });
        assert_eq!(items.len(), 2);
    }
}
