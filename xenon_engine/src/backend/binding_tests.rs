//! Unit tests for binding.rs

use crate::backend::binding::*;
use crate::backend::shader::{Shader, ShaderReflection, ShaderResource, ShaderSource};
use crate::backend::types::{DescriptorType, ResourceOperation, ResourceType, ShaderType};

fn shader_with(resources: Vec<ShaderResource>) -> Shader {
    Shader::from_spirv(
        ShaderSource::new(vec![0x0723_0203]),
        ShaderReflection { resources, ..ShaderReflection::default() },
    )
}

fn resource(binding: u32, set: DescriptorType, resource_type: ResourceType) -> ShaderResource {
    ShaderResource { binding, set, resource_type, operations: ResourceOperation::READ }
}

#[test]
fn test_shared_binding_merges_stage_masks() {
    let vertex = shader_with(vec![resource(0, DescriptorType::Scene, ResourceType::UniformBuffer)]);
    let fragment = shader_with(vec![
        resource(0, DescriptorType::Scene, ResourceType::UniformBuffer),
        resource(1, DescriptorType::Material, ResourceType::CombinedImageSampler),
    ]);

    let map = ShaderBindingMap::from_stages(&[(&vertex, ShaderType::VERTEX), (&fragment, ShaderType::FRAGMENT)]);

    let scene = map.bindings(DescriptorType::Scene);
    assert_eq!(scene.len(), 1);
    assert_eq!(scene[&0].applicable_shaders, ShaderType::VERTEX | ShaderType::FRAGMENT);

    let material = map.bindings(DescriptorType::Material);
    assert_eq!(material[&1].applicable_shaders, ShaderType::FRAGMENT);
    assert_eq!(material[&1].resource_type, ResourceType::CombinedImageSampler);
}

#[test]
fn test_same_binding_in_different_classes_stays_separate() {
    let shader = shader_with(vec![
        resource(0, DescriptorType::UserDefined, ResourceType::StorageBuffer),
        resource(0, DescriptorType::PerGeometry, ResourceType::UniformBuffer),
    ]);

    let map = ShaderBindingMap::from_stages(&[(&shader, ShaderType::COMPUTE)]);

    assert_eq!(map.bindings(DescriptorType::UserDefined).len(), 1);
    assert_eq!(map.bindings(DescriptorType::PerGeometry).len(), 1);
    assert!(map.bindings(DescriptorType::Scene).is_empty());
}

#[test]
fn test_iteration_follows_set_order() {
    let map = ShaderBindingMap::new();
    let classes: Vec<DescriptorType> = map.iter().map(|(class, _)| class).collect();
    assert_eq!(classes, DescriptorType::ALL.to_vec());
    assert!(map.is_empty());
}

#[test]
fn test_bindings_are_sorted_by_index() {
    let shader = shader_with(vec![
        resource(5, DescriptorType::Material, ResourceType::SampledImage),
        resource(2, DescriptorType::Material, ResourceType::Sampler),
    ]);

    let map = ShaderBindingMap::from_stages(&[(&shader, ShaderType::FRAGMENT)]);

    let indices: Vec<u32> = map.bindings(DescriptorType::Material).keys().copied().collect();
    assert_eq!(indices, vec![2, 5]);
}
