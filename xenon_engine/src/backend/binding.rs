/// Descriptor binding discovery across the shader stages of a pipeline

use std::collections::BTreeMap;

use crate::backend::shader::Shader;
use crate::backend::types::{DescriptorType, ResourceType, ShaderType};
use crate::engine_warn;

/// One binding slot of a descriptor set class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DescriptorBindingInfo {
    pub resource_type: ResourceType,
    /// Stages that access the binding
    pub applicable_shaders: ShaderType,
}

/// Bindings of one descriptor set class, ordered by binding index
pub type DescriptorBindings = BTreeMap<u32, DescriptorBindingInfo>;

/// Union of the resources of every stage, partitioned per descriptor set class
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShaderBindingMap {
    classes: [DescriptorBindings; 4],
}

impl ShaderBindingMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the map from `(shader, stage)` pairs
    pub fn from_stages(stages: &[(&Shader, ShaderType)]) -> Self {
        let mut map = Self::new();
        for (shader, stage) in stages {
            map.add_shader(shader, *stage);
        }
        map
    }

    /// Merge one stage's resources
    ///
    /// A binding already present in the class gets `stage` OR'ed into its
    /// applicable stages instead of being duplicated.
    pub fn add_shader(&mut self, shader: &Shader, stage: ShaderType) {
        for resource in shader.resources() {
            let bindings = &mut self.classes[resource.set.set_index() as usize];
            match bindings.get_mut(&resource.binding) {
                Some(existing) => {
                    if existing.resource_type != resource.resource_type {
                        engine_warn!(
                            "xenon::Pipeline",
                            "Binding {} of {:?} is declared as {:?} and {:?}; keeping {:?}",
                            resource.binding,
                            resource.set,
                            existing.resource_type,
                            resource.resource_type,
                            existing.resource_type
                        );
                    }
                    existing.applicable_shaders |= stage;
                }
                None => {
                    bindings.insert(
                        resource.binding,
                        DescriptorBindingInfo {
                            resource_type: resource.resource_type,
                            applicable_shaders: stage,
                        },
                    );
                }
            }
        }
    }

    pub fn bindings(&self, class: DescriptorType) -> &DescriptorBindings {
        &self.classes[class.set_index() as usize]
    }

    /// Classes in set-index order with their bindings
    pub fn iter(&self) -> impl Iterator<Item = (DescriptorType, &DescriptorBindings)> {
        DescriptorType::ALL.into_iter().zip(self.classes.iter())
    }

    pub fn is_empty(&self) -> bool {
        self.classes.iter().all(BTreeMap::is_empty)
    }
}

#[cfg(test)]
#[path = "binding_tests.rs"]
mod tests;
