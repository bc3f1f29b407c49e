/// Root signature layout of a pipeline
///
/// Every descriptor class becomes up to two descriptor tables: one for
/// constant buffer, shader resource and unordered access views and one for
/// samplers, since D3D12 keeps samplers in their own heap. A binding keeps its
/// number as shader register and its class's set index as register space.

use xenon_engine::xenon::backend::{DescriptorBindings, DescriptorType, ResourceType, ShaderBindingMap, ShaderType};

/// Register class of a descriptor range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RangeKind {
    /// `b` registers
    ConstantBuffer,
    /// `t` registers
    ShaderResource,
    /// `u` registers
    UnorderedAccess,
    /// `s` registers
    Sampler,
}

impl RangeKind {
    /// Resource view range of `resource_type`, `None` for pure samplers
    pub fn resource_range(resource_type: ResourceType) -> Option<Self> {
        match resource_type {
            ResourceType::UniformBuffer | ResourceType::DynamicUniformBuffer => Some(RangeKind::ConstantBuffer),
            ResourceType::StorageBuffer
            | ResourceType::DynamicStorageBuffer
            | ResourceType::StorageTexelBuffer
            | ResourceType::StorageImage => Some(RangeKind::UnorderedAccess),
            ResourceType::CombinedImageSampler
            | ResourceType::SampledImage
            | ResourceType::UniformTexelBuffer
            | ResourceType::InputAttachment
            | ResourceType::AccelerationStructure => Some(RangeKind::ShaderResource),
            ResourceType::Sampler => None,
        }
    }

    /// Whether `resource_type` also needs a sampler slot
    pub fn needs_sampler(resource_type: ResourceType) -> bool {
        matches!(resource_type, ResourceType::CombinedImageSampler | ResourceType::Sampler)
    }
}

/// Stages a root parameter is visible to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Visibility {
    All,
    Vertex,
    Pixel,
}

impl Visibility {
    fn from_stages(stages: ShaderType) -> Self {
        if stages == ShaderType::VERTEX {
            Visibility::Vertex
        } else if stages == ShaderType::FRAGMENT {
            Visibility::Pixel
        } else {
            Visibility::All
        }
    }
}

/// One descriptor of a table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TableEntry {
    pub binding: u32,
    pub kind: RangeKind,
    pub register: u32,
    pub space: u32,
}

/// A descriptor table root parameter
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DescriptorTable {
    /// Index of the root parameter
    pub parameter: u32,
    pub entries: Vec<TableEntry>,
    pub visibility: Option<Visibility>,
}

impl DescriptorTable {
    /// Offset of `binding` inside the table
    pub fn slot(&self, binding: u32) -> Option<u32> {
        self.entries
            .iter()
            .position(|entry| entry.binding == binding)
            .map(|slot| slot as u32)
    }

    pub fn len(&self) -> u32 {
        self.entries.len() as u32
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Tables of one descriptor class
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassTables {
    pub resources: Option<DescriptorTable>,
    pub samplers: Option<DescriptorTable>,
}

impl ClassTables {
    fn from_bindings(class: DescriptorType, bindings: &DescriptorBindings, next_parameter: &mut u32) -> Self {
        let space = class.set_index();
        let mut resources = DescriptorTable::default();
        let mut samplers = DescriptorTable::default();
        let mut resource_stages = ShaderType::empty();
        let mut sampler_stages = ShaderType::empty();

        for (binding, info) in bindings {
            if let Some(kind) = RangeKind::resource_range(info.resource_type) {
                resources.entries.push(TableEntry { binding: *binding, kind, register: *binding, space });
                resource_stages |= info.applicable_shaders;
            }
            if RangeKind::needs_sampler(info.resource_type) {
                samplers.entries.push(TableEntry {
                    binding: *binding,
                    kind: RangeKind::Sampler,
                    register: *binding,
                    space,
                });
                sampler_stages |= info.applicable_shaders;
            }
        }

        let mut assign = |mut table: DescriptorTable, stages: ShaderType| {
            if table.is_empty() {
                return None;
            }
            table.parameter = *next_parameter;
            table.visibility = Some(Visibility::from_stages(stages));
            *next_parameter += 1;
            Some(table)
        };

        let resources = assign(resources, resource_stages);
        let samplers = assign(samplers, sampler_stages);
        Self { resources, samplers }
    }
}

/// Root parameters of a pipeline, grouped by descriptor class
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RootLayout {
    classes: [ClassTables; 4],
    parameter_count: u32,
}

impl RootLayout {
    pub fn from_binding_map(map: &ShaderBindingMap) -> Self {
        let mut layout = RootLayout::default();
        let mut next_parameter = 0;
        for (class, bindings) in map.iter() {
            layout.classes[class.set_index() as usize] =
                ClassTables::from_bindings(class, bindings, &mut next_parameter);
        }
        layout.parameter_count = next_parameter;
        layout
    }

    pub fn class(&self, class: DescriptorType) -> &ClassTables {
        &self.classes[class.set_index() as usize]
    }

    /// Root parameter tables in parameter order
    pub fn tables(&self) -> Vec<&DescriptorTable> {
        let mut tables: Vec<&DescriptorTable> = self
            .classes
            .iter()
            .flat_map(|class| [class.resources.as_ref(), class.samplers.as_ref()])
            .flatten()
            .collect();
        tables.sort_by_key(|table| table.parameter);
        tables
    }

    pub fn parameter_count(&self) -> u32 {
        self.parameter_count
    }
}

#[cfg(test)]
#[path = "dx12_root_layout_tests.rs"]
mod tests;
