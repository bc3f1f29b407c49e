/// Shader binaries and their reflection metadata

use crate::backend::types::{DescriptorType, ResourceOperation, ResourceType};
use crate::backend::vertex::AttributeDataType;
use crate::hash::generate_hash;

/// One compiled shader binary
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ShaderSource {
    binary: Vec<u32>,
    entry_point: String,
}

impl ShaderSource {
    /// Wrap a binary with the `main` entry point
    pub fn new(binary: Vec<u32>) -> Self {
        Self::with_entry_point(binary, "main")
    }

    pub fn with_entry_point(binary: Vec<u32>, entry_point: impl Into<String>) -> Self {
        Self { binary, entry_point: entry_point.into() }
    }

    /// Build from raw bytes, padding the tail with zeros to a whole word
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let words = bytes
            .chunks(4)
            .map(|chunk| {
                let mut word = [0u8; 4];
                word[..chunk.len()].copy_from_slice(chunk);
                u32::from_le_bytes(word)
            })
            .collect();
        Self::new(words)
    }

    pub fn binary(&self) -> &[u32] {
        &self.binary
    }

    pub fn binary_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.binary)
    }

    pub fn entry_point(&self) -> &str {
        &self.entry_point
    }

    pub fn is_valid(&self) -> bool {
        !self.binary.is_empty()
    }
}

/// Shader input or output attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShaderAttribute {
    pub location: u32,
    pub data_type: AttributeDataType,
}

/// Resource consumed by a shader
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShaderResource {
    pub binding: u32,
    pub set: DescriptorType,
    pub resource_type: ResourceType,
    pub operations: ResourceOperation,
}

/// Reflected interface of a shader
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShaderReflection {
    pub input_attributes: Vec<ShaderAttribute>,
    pub output_attributes: Vec<ShaderAttribute>,
    pub resources: Vec<ShaderResource>,
}

/// Immutable shader: a SPIR-V and a DXIL binary plus reflection metadata
///
/// Reflection is fixed at construction and the content hash is computed once.
#[derive(Debug, Clone, Default)]
pub struct Shader {
    spirv: ShaderSource,
    dxil: ShaderSource,
    reflection: ShaderReflection,
    hash: u64,
}

impl Shader {
    /// Create a shader from both binaries
    ///
    /// # Arguments
    ///
    /// * `spirv` - Binary consumed by the Vulkan backend
    /// * `dxil` - Binary consumed by the DirectX 12 backend (may be empty off Windows)
    /// * `reflection` - Interface shared by both binaries
    pub fn new(spirv: ShaderSource, dxil: ShaderSource, reflection: ShaderReflection) -> Self {
        let hash = generate_hash(spirv.binary_bytes(), generate_hash(dxil.binary_bytes(), 0));
        Self { spirv, dxil, reflection, hash }
    }

    /// Create a SPIR-V only shader
    pub fn from_spirv(spirv: ShaderSource, reflection: ShaderReflection) -> Self {
        Self::new(spirv, ShaderSource::default(), reflection)
    }

    pub fn spirv(&self) -> &ShaderSource {
        &self.spirv
    }

    pub fn dxil(&self) -> &ShaderSource {
        &self.dxil
    }

    pub fn input_attributes(&self) -> &[ShaderAttribute] {
        &self.reflection.input_attributes
    }

    pub fn output_attributes(&self) -> &[ShaderAttribute] {
        &self.reflection.output_attributes
    }

    pub fn resources(&self) -> &[ShaderResource] {
        &self.reflection.resources
    }

    /// Content hash of both binaries
    pub fn content_hash(&self) -> u64 {
        self.hash
    }

    /// Whether the shader carries any binary at all
    pub fn is_valid(&self) -> bool {
        self.spirv.is_valid() || self.dxil.is_valid()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_hash_covers_both_binaries() {
        let a = Shader::new(ShaderSource::new(vec![1, 2]), ShaderSource::new(vec![3]), ShaderReflection::default());
        let b = Shader::new(ShaderSource::new(vec![1, 2]), ShaderSource::new(vec![4]), ShaderReflection::default());
        let c = Shader::from_spirv(ShaderSource::new(vec![1, 2]), ShaderReflection::default());

        assert_ne!(a.content_hash(), b.content_hash());
        assert_ne!(a.content_hash(), c.content_hash());
        assert_eq!(
            c.content_hash(),
            generate_hash(ShaderSource::new(vec![1, 2]).binary_bytes(), 0)
        );
    }

    #[test]
    fn test_hash_ignores_reflection() {
        let reflection = ShaderReflection {
            input_attributes: vec![ShaderAttribute { location: 0, data_type: AttributeDataType::Vec3 }],
            ..ShaderReflection::default()
        };
        let a = Shader::from_spirv(ShaderSource::new(vec![7]), reflection);
        let b = Shader::from_spirv(ShaderSource::new(vec![7]), ShaderReflection::default());
        assert_eq!(a.content_hash(), b.content_hash());
        assert_eq!(a.input_attributes().len(), 1);
    }

    #[test]
    fn test_from_bytes_pads_last_word() {
        let source = ShaderSource::from_bytes(&[0x03, 0x02, 0x23, 0x07, 0xAA]);
        assert_eq!(source.binary(), &[0x0723_0203, 0x0000_00AA]);
        assert_eq!(source.entry_point(), "main");
    }

    #[test]
    fn test_default_shader_is_invalid() {
        assert!(!Shader::default().is_valid());
        assert_eq!(Shader::default().content_hash(), 0);
    }
}
