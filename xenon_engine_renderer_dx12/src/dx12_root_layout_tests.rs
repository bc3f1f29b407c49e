use super::*;
use xenon_engine::xenon::backend::DescriptorBindingInfo;

fn info(resource_type: ResourceType, stages: ShaderType) -> DescriptorBindingInfo {
    DescriptorBindingInfo { resource_type, applicable_shaders: stages }
}

fn layout_of(classes: &[(DescriptorType, DescriptorBindings)]) -> RootLayout {
    // Build through the per-class path the binding map uses
    let mut layout = RootLayout::default();
    let mut next_parameter = 0;
    for class in DescriptorType::ALL {
        let empty = DescriptorBindings::new();
        let bindings = classes
            .iter()
            .find(|(c, _)| *c == class)
            .map(|(_, b)| b)
            .unwrap_or(&empty);
        layout.classes[class.set_index() as usize] =
            ClassTables::from_bindings(class, bindings, &mut next_parameter);
    }
    layout.parameter_count = next_parameter;
    layout
}

#[test]
fn test_resource_ranges() {
    assert_eq!(RangeKind::resource_range(ResourceType::UniformBuffer), Some(RangeKind::ConstantBuffer));
    assert_eq!(RangeKind::resource_range(ResourceType::StorageImage), Some(RangeKind::UnorderedAccess));
    assert_eq!(RangeKind::resource_range(ResourceType::SampledImage), Some(RangeKind::ShaderResource));
    assert_eq!(
        RangeKind::resource_range(ResourceType::CombinedImageSampler),
        Some(RangeKind::ShaderResource)
    );
    assert_eq!(RangeKind::resource_range(ResourceType::Sampler), None);
    assert!(RangeKind::needs_sampler(ResourceType::CombinedImageSampler));
    assert!(!RangeKind::needs_sampler(ResourceType::UniformBuffer));
}

#[test]
fn test_empty_map_has_no_parameters() {
    let layout = RootLayout::from_binding_map(&ShaderBindingMap::new());
    assert_eq!(layout.parameter_count(), 0);
    assert!(layout.tables().is_empty());
}

#[test]
fn test_combined_image_sampler_takes_both_tables() {
    let mut material = DescriptorBindings::new();
    material.insert(0, info(ResourceType::UniformBuffer, ShaderType::VERTEX | ShaderType::FRAGMENT));
    material.insert(2, info(ResourceType::CombinedImageSampler, ShaderType::FRAGMENT));

    let layout = layout_of(&[(DescriptorType::Material, material)]);
    let tables = layout.class(DescriptorType::Material);

    let resources = tables.resources.as_ref().unwrap();
    assert_eq!(resources.parameter, 0);
    assert_eq!(resources.visibility, Some(Visibility::All));
    assert_eq!(resources.slot(0), Some(0));
    assert_eq!(resources.slot(2), Some(1));
    assert_eq!(
        resources.entries[1],
        TableEntry { binding: 2, kind: RangeKind::ShaderResource, register: 2, space: 1 }
    );

    let samplers = tables.samplers.as_ref().unwrap();
    assert_eq!(samplers.parameter, 1);
    assert_eq!(samplers.visibility, Some(Visibility::Pixel));
    assert_eq!(samplers.slot(2), Some(0));
    assert_eq!(samplers.slot(0), None);
}

#[test]
fn test_parameters_follow_class_order() {
    let mut scene = DescriptorBindings::new();
    scene.insert(0, info(ResourceType::UniformBuffer, ShaderType::VERTEX));
    let mut user = DescriptorBindings::new();
    user.insert(1, info(ResourceType::StorageBuffer, ShaderType::VERTEX));

    let layout = layout_of(&[(DescriptorType::Scene, scene), (DescriptorType::UserDefined, user)]);

    assert_eq!(layout.parameter_count(), 2);
    let user_table = layout.class(DescriptorType::UserDefined).resources.as_ref().unwrap();
    let scene_table = layout.class(DescriptorType::Scene).resources.as_ref().unwrap();
    assert_eq!(user_table.parameter, 0);
    assert_eq!(user_table.visibility, Some(Visibility::Vertex));
    assert_eq!(scene_table.parameter, 1);
    assert_eq!(scene_table.entries[0].space, 3);
    assert!(layout.class(DescriptorType::Material).resources.is_none());

    let parameters: Vec<u32> = layout.tables().iter().map(|t| t.parameter).collect();
    assert_eq!(parameters, vec![0, 1]);
}
