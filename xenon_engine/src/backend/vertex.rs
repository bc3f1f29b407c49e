/// Vertex layouts and the per-layout vertex input state of a pipeline
///
/// A `VertexSpecification` describes the attributes a mesh provides. Pipelines
/// derive a base `VertexInputState` from the vertex shader's declared inputs
/// once, then resolve it against each distinct specification they are asked
/// to draw with (see `PipelineSpecializations`).

use std::mem::{offset_of, size_of};

use bytemuck::{Pod, Zeroable};

use crate::backend::shader::ShaderAttribute;
use crate::error::{Error, Result};
use crate::hash::generate_hash;
use crate::{engine_error, engine_warn};

/// Binding slot used for per-vertex data
pub const VERTEX_BINDING: u32 = 0;

/// Binding slot used for per-instance data (`InstanceEntry`)
pub const INSTANCE_BINDING: u32 = 1;

// ===== INPUT ELEMENTS =====

/// Vertex shader input slots. The discriminant is the shader input location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum InputElement {
    VertexPosition = 0,
    VertexNormal,
    VertexTangent,
    VertexColor0,
    VertexColor1,
    VertexColor2,
    VertexColor3,
    VertexColor4,
    VertexColor5,
    VertexColor6,
    VertexColor7,
    VertexTextureCoordinate0,
    VertexTextureCoordinate1,
    VertexTextureCoordinate2,
    VertexTextureCoordinate3,
    VertexTextureCoordinate4,
    VertexTextureCoordinate5,
    VertexTextureCoordinate6,
    VertexTextureCoordinate7,
    VertexJointIndices,
    VertexJointWeight,

    InstancePosition,
    InstanceRotation,
    InstanceScale,
    InstanceID,
}

/// Number of per-vertex input elements
pub const VERTEX_ELEMENT_COUNT: usize = InputElement::InstancePosition as usize;

impl InputElement {
    /// Every element, in location order
    pub const ALL: [InputElement; 25] = [
        InputElement::VertexPosition,
        InputElement::VertexNormal,
        InputElement::VertexTangent,
        InputElement::VertexColor0,
        InputElement::VertexColor1,
        InputElement::VertexColor2,
        InputElement::VertexColor3,
        InputElement::VertexColor4,
        InputElement::VertexColor5,
        InputElement::VertexColor6,
        InputElement::VertexColor7,
        InputElement::VertexTextureCoordinate0,
        InputElement::VertexTextureCoordinate1,
        InputElement::VertexTextureCoordinate2,
        InputElement::VertexTextureCoordinate3,
        InputElement::VertexTextureCoordinate4,
        InputElement::VertexTextureCoordinate5,
        InputElement::VertexTextureCoordinate6,
        InputElement::VertexTextureCoordinate7,
        InputElement::VertexJointIndices,
        InputElement::VertexJointWeight,
        InputElement::InstancePosition,
        InputElement::InstanceRotation,
        InputElement::InstanceScale,
        InputElement::InstanceID,
    ];

    /// Element bound at a shader input location
    pub fn from_location(location: u32) -> Option<Self> {
        Self::ALL.get(location as usize).copied()
    }

    pub fn location(self) -> u32 {
        self as u32
    }

    /// Whether the element is sourced from the per-vertex binding
    pub fn is_vertex_element(self) -> bool {
        (self as usize) < VERTEX_ELEMENT_COUNT
    }

    /// Fixed format and offset of an instance element inside `InstanceEntry`
    pub fn instance_layout(self) -> Option<(VertexElementFormat, u32)> {
        match self {
            InputElement::InstancePosition => Some((
                VertexElementFormat::R32G32B32_SFLOAT,
                offset_of!(InstanceEntry, position) as u32,
            )),
            InputElement::InstanceRotation => Some((
                VertexElementFormat::R32G32B32_SFLOAT,
                offset_of!(InstanceEntry, rotation) as u32,
            )),
            InputElement::InstanceScale => Some((
                VertexElementFormat::R32G32B32_SFLOAT,
                offset_of!(InstanceEntry, scale) as u32,
            )),
            InputElement::InstanceID => Some((
                VertexElementFormat::R32_UINT,
                offset_of!(InstanceEntry, instance_id) as u32,
            )),
            _ => None,
        }
    }
}

/// Shape of an attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeDataType {
    Vec2,
    Vec3,
    Vec4,
    Mat2,
    Mat3,
    Mat4,
    Scalar,
}

impl AttributeDataType {
    pub fn component_count(self) -> u8 {
        match self {
            AttributeDataType::Scalar => 1,
            AttributeDataType::Vec2 => 2,
            AttributeDataType::Vec3 => 3,
            AttributeDataType::Vec4 => 4,
            AttributeDataType::Mat2 => 4,
            AttributeDataType::Mat3 => 9,
            AttributeDataType::Mat4 => 16,
        }
    }
}

/// Scalar type of each component of an attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentDataType {
    Void,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Int8,
    Int16,
    Int32,
    Int64,
    Float,
}

impl ComponentDataType {
    pub fn size_bytes(self) -> u32 {
        match self {
            ComponentDataType::Void => 0,
            ComponentDataType::Uint8 | ComponentDataType::Int8 => 1,
            ComponentDataType::Uint16 | ComponentDataType::Int16 => 2,
            ComponentDataType::Uint32 | ComponentDataType::Int32 | ComponentDataType::Float => 4,
            ComponentDataType::Uint64 | ComponentDataType::Int64 => 8,
        }
    }
}

// ===== ELEMENT FORMATS =====

/// Format of one vertex attribute as seen by the input assembler
#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum VertexElementFormat {
    #[default]
    Undefined,

    R8_UINT,
    R16_UINT,
    R32_UINT,
    R64_UINT,
    R8_SINT,
    R16_SINT,
    R32_SINT,
    R64_SINT,
    R32_SFLOAT,

    R8G8_UINT,
    R16G16_UINT,
    R32G32_UINT,
    R64G64_UINT,
    R8G8_SINT,
    R16G16_SINT,
    R32G32_SINT,
    R64G64_SINT,
    R32G32_SFLOAT,

    R8G8B8_UINT,
    R16G16B16_UINT,
    R32G32B32_UINT,
    R64G64B64_UINT,
    R8G8B8_SINT,
    R16G16B16_SINT,
    R32G32B32_SINT,
    R64G64B64_SINT,
    R32G32B32_SFLOAT,

    R8G8B8A8_UNORM,
    R16G16B16A16_UINT,
    R32G32B32A32_UINT,
    R64G64B64A64_UINT,
    R8G8B8A8_SNORM,
    R16G16B16A16_SINT,
    R32G32B32A32_SINT,
    R64G64B64A64_SINT,
    R32G32B32A32_SFLOAT,
}

/// Input assembler format for `component_count` components of `data_type`.
///
/// Four 8-bit components map to normalized formats. Component counts above
/// four (matrices) and `Void` have no single format: an error is logged and
/// `Undefined` is returned.
pub fn vertex_element_format(component_count: u8, data_type: ComponentDataType) -> VertexElementFormat {
    use ComponentDataType as C;
    use VertexElementFormat as F;

    match (component_count, data_type) {
        (1, C::Uint8) => F::R8_UINT,
        (1, C::Uint16) => F::R16_UINT,
        (1, C::Uint32) => F::R32_UINT,
        (1, C::Uint64) => F::R64_UINT,
        (1, C::Int8) => F::R8_SINT,
        (1, C::Int16) => F::R16_SINT,
        (1, C::Int32) => F::R32_SINT,
        (1, C::Int64) => F::R64_SINT,
        (1, C::Float) => F::R32_SFLOAT,

        (2, C::Uint8) => F::R8G8_UINT,
        (2, C::Uint16) => F::R16G16_UINT,
        (2, C::Uint32) => F::R32G32_UINT,
        (2, C::Uint64) => F::R64G64_UINT,
        (2, C::Int8) => F::R8G8_SINT,
        (2, C::Int16) => F::R16G16_SINT,
        (2, C::Int32) => F::R32G32_SINT,
        (2, C::Int64) => F::R64G64_SINT,
        (2, C::Float) => F::R32G32_SFLOAT,

        (3, C::Uint8) => F::R8G8B8_UINT,
        (3, C::Uint16) => F::R16G16B16_UINT,
        (3, C::Uint32) => F::R32G32B32_UINT,
        (3, C::Uint64) => F::R64G64B64_UINT,
        (3, C::Int8) => F::R8G8B8_SINT,
        (3, C::Int16) => F::R16G16B16_SINT,
        (3, C::Int32) => F::R32G32B32_SINT,
        (3, C::Int64) => F::R64G64B64_SINT,
        (3, C::Float) => F::R32G32B32_SFLOAT,

        (4, C::Uint8) => F::R8G8B8A8_UNORM,
        (4, C::Uint16) => F::R16G16B16A16_UINT,
        (4, C::Uint32) => F::R32G32B32A32_UINT,
        (4, C::Uint64) => F::R64G64B64A64_UINT,
        (4, C::Int8) => F::R8G8B8A8_SNORM,
        (4, C::Int16) => F::R16G16B16A16_SINT,
        (4, C::Int32) => F::R32G32B32A32_SINT,
        (4, C::Int64) => F::R64G64B64A64_SINT,
        (4, C::Float) => F::R32G32B32A32_SFLOAT,

        _ => {
            engine_error!(
                "xenon::Vertex",
                "There are no available formats for component count {} and component data type {:?}! Defaulting to Undefined.",
                component_count,
                data_type
            );
            F::Undefined
        }
    }
}

// ===== INSTANCE DATA =====

/// Per-instance data layout bound at `INSTANCE_BINDING`
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct InstanceEntry {
    pub position: [f32; 3],
    pub rotation: [f32; 3],
    pub scale: [f32; 3],
    pub instance_id: u32,
}

// ===== VERTEX SPECIFICATION =====

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct ElementDescription {
    attribute: AttributeDataType,
    component: ComponentDataType,
}

/// Attributes provided by a mesh, packed in location order
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct VertexSpecification {
    elements: [Option<ElementDescription>; VERTEX_ELEMENT_COUNT],
}

impl VertexSpecification {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare an element. Instance elements are fixed by `InstanceEntry` and are ignored.
    pub fn add_element(
        mut self,
        element: InputElement,
        attribute: AttributeDataType,
        component: ComponentDataType,
    ) -> Self {
        if !element.is_vertex_element() {
            engine_warn!(
                "xenon::Vertex",
                "{:?} is an instance element and cannot be part of a vertex specification",
                element
            );
            return self;
        }
        self.elements[element as usize] = Some(ElementDescription { attribute, component });
        self
    }

    pub fn is_available(&self, element: InputElement) -> bool {
        element.is_vertex_element() && self.elements[element as usize].is_some()
    }

    /// Size of one element in bytes (0 when absent)
    pub fn element_size(&self, element: InputElement) -> u32 {
        if !element.is_vertex_element() {
            return 0;
        }
        self.elements[element as usize]
            .map(|d| d.attribute.component_count() as u32 * d.component.size_bytes())
            .unwrap_or(0)
    }

    /// Byte offset of an element inside one vertex
    pub fn offset_of(&self, element: InputElement) -> u32 {
        InputElement::ALL[..(element as usize).min(VERTEX_ELEMENT_COUNT)]
            .iter()
            .map(|e| self.element_size(*e))
            .sum()
    }

    /// Stride of one vertex
    pub fn size(&self) -> u32 {
        InputElement::ALL[..VERTEX_ELEMENT_COUNT]
            .iter()
            .map(|e| self.element_size(*e))
            .sum()
    }

    pub fn element_attribute_data_type(&self, element: InputElement) -> Option<AttributeDataType> {
        self.description(element).map(|d| d.attribute)
    }

    pub fn element_component_data_type(&self, element: InputElement) -> Option<ComponentDataType> {
        self.description(element).map(|d| d.component)
    }

    /// Input assembler format of an available element
    pub fn element_format(&self, element: InputElement) -> Option<VertexElementFormat> {
        self.description(element)
            .map(|d| vertex_element_format(d.attribute.component_count(), d.component))
    }

    /// Layout hash used to key pipeline specializations
    pub fn generate_hash(&self) -> u64 {
        let mut bytes = Vec::with_capacity(VERTEX_ELEMENT_COUNT * 3);
        for (location, description) in self.elements.iter().enumerate() {
            if let Some(d) = description {
                bytes.push(location as u8);
                bytes.push(d.attribute as u8);
                bytes.push(d.component as u8);
            }
        }
        generate_hash(&bytes, 0)
    }

    fn description(&self, element: InputElement) -> Option<ElementDescription> {
        if !element.is_vertex_element() {
            return None;
        }
        self.elements[element as usize]
    }
}

// ===== VERTEX INPUT STATE =====

/// Rate at which a binding advances
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexInputRate {
    Vertex,
    Instance,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexInputBinding {
    pub binding: u32,
    pub stride: u32,
    pub input_rate: VertexInputRate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexInputAttribute {
    pub location: u32,
    pub binding: u32,
    pub format: VertexElementFormat,
    pub offset: u32,
}

/// Backend-agnostic description of a pipeline's input assembly bindings
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct VertexInputState {
    pub bindings: Vec<VertexInputBinding>,
    pub attributes: Vec<VertexInputAttribute>,
}

impl VertexInputState {
    /// Base state derived from a vertex shader's input attributes
    ///
    /// Instance elements receive their fixed `InstanceEntry` format and offset
    /// and, when any is present, the per-instance binding is added. Vertex
    /// elements stay unresolved until `resolve` is given a specification.
    pub fn from_shader_inputs(inputs: &[ShaderAttribute]) -> Self {
        let mut state = VertexInputState::default();
        let mut has_instance_inputs = false;

        for input in inputs {
            let element = InputElement::from_location(input.location);
            let binding = match element {
                Some(e) if !e.is_vertex_element() => INSTANCE_BINDING,
                _ => VERTEX_BINDING,
            };
            let (format, offset) = element
                .and_then(InputElement::instance_layout)
                .unwrap_or((VertexElementFormat::Undefined, 0));

            has_instance_inputs |= binding == INSTANCE_BINDING;
            state.attributes.push(VertexInputAttribute {
                location: input.location,
                binding,
                format,
                offset,
            });
        }

        if has_instance_inputs {
            state.bindings.push(VertexInputBinding {
                binding: INSTANCE_BINDING,
                stride: size_of::<InstanceEntry>() as u32,
                input_rate: VertexInputRate::Instance,
            });
        }
        state
    }

    /// Specialize this base state for one vertex layout
    ///
    /// Every per-vertex attribute takes its offset and format from
    /// `specification`; attributes are then sorted by offset and the
    /// per-vertex binding is added when at least one attribute resolved.
    ///
    /// # Errors
    ///
    /// `Error::InvalidResource` when the shader consumes a per-vertex input
    /// that the specification does not provide.
    pub fn resolve(&self, specification: &VertexSpecification) -> Result<VertexInputState> {
        let mut state = self.clone();
        let mut has_vertex_data = false;

        for attribute in state.attributes.iter_mut() {
            if attribute.binding != VERTEX_BINDING {
                continue;
            }

            let element = InputElement::from_location(attribute.location)
                .filter(|e| specification.is_available(*e));
            let Some(element) = element else {
                let message = format!(
                    "Vertex shader input at location {} is not provided by the vertex specification",
                    attribute.location
                );
                engine_error!("xenon::Vertex", "{}", message);
                return Err(Error::InvalidResource(message));
            };

            attribute.offset = specification.offset_of(element);
            attribute.format = specification
                .element_format(element)
                .unwrap_or(VertexElementFormat::Undefined);
            has_vertex_data = true;
        }

        state.attributes.sort_by_key(|a| a.offset);

        if has_vertex_data {
            state.bindings.push(VertexInputBinding {
                binding: VERTEX_BINDING,
                stride: specification.size(),
                input_rate: VertexInputRate::Vertex,
            });
        }
        Ok(state)
    }
}

#[cfg(test)]
#[path = "vertex_tests.rs"]
mod tests;
