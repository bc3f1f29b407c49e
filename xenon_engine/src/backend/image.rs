/// Image, image view and sampler traits with their specifications

use std::any::Any;

use bitflags::bitflags;

use crate::backend::buffer::Buffer;
use crate::backend::command::CommandRecorder;
use crate::backend::pipeline::DepthCompareLogic;
use crate::backend::types::{DataFormat, MultiSamplingCount};
use crate::error::Result;

// ===== IMAGE =====

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ImageType {
    OneDimensional,
    #[default]
    TwoDimensional,
    ThreeDimensional,
    CubeMap,
}

bitflags! {
    /// How an image is used
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ImageUsage: u8 {
        /// Written from shaders as a storage image
        const STORAGE = 1 << 0;
        /// Sampled from shaders
        const GRAPHICS = 1 << 1;
        const COLOR_ATTACHMENT = 1 << 2;
        const DEPTH_ATTACHMENT = 1 << 3;
    }
}

/// Everything an image is created from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ImageSpecification {
    pub width: u32,
    pub height: u32,
    pub depth: u32,
    pub layers: u32,
    pub image_type: ImageType,
    pub usage: ImageUsage,
    pub format: DataFormat,
    pub multi_sampling_count: MultiSamplingCount,
    pub enable_mip_maps: bool,
}

impl Default for ImageSpecification {
    fn default() -> Self {
        Self {
            width: 0,
            height: 0,
            depth: 1,
            layers: 1,
            image_type: ImageType::TwoDimensional,
            usage: ImageUsage::GRAPHICS,
            format: DataFormat::R8G8B8A8_UNORM,
            multi_sampling_count: MultiSamplingCount::X1,
            enable_mip_maps: false,
        }
    }
}

impl ImageSpecification {
    /// Number of mip levels: the full chain down to 1x1 when mip maps are enabled
    pub fn mip_levels(&self) -> u32 {
        if !self.enable_mip_maps {
            return 1;
        }
        let largest = self.width.max(self.height).max(1);
        u32::BITS - largest.leading_zeros()
    }

    /// Extent of one mip level
    pub fn mip_extent(&self, level: u32) -> (u32, u32) {
        ((self.width >> level).max(1), (self.height >> level).max(1))
    }

    /// Bytes of the base level of one layer
    pub fn base_level_size(&self) -> u64 {
        self.width as u64 * self.height as u64 * self.depth as u64 * self.format.texel_size()
    }
}

/// GPU image with a tracked layout/state
///
/// Transfers follow the same duality as `Buffer::write`: recorded into the
/// given recorder, or submitted and waited for when there is none.
pub trait Image: Send + Sync {
    fn specification(&self) -> &ImageSpecification;

    /// Copy the whole base level from a buffer holding tightly packed texels
    fn copy_from_buffer(&self, src: &dyn Buffer, recorder: Option<&mut dyn CommandRecorder>) -> Result<()>;

    /// Copy the base level of another image of the same extent
    fn copy_from_image(&self, src: &dyn Image, recorder: Option<&mut dyn CommandRecorder>) -> Result<()>;

    /// Fill every mip level below the base from the base level
    fn generate_mip_maps(&self, recorder: Option<&mut dyn CommandRecorder>) -> Result<()>;

    fn as_any(&self) -> &dyn Any;
}

impl dyn Image + '_ {
    pub fn downcast_ref<T: Image + 'static>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }
}

// ===== IMAGE VIEW =====

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ComponentSwizzle {
    #[default]
    Identity,
    Zero,
    One,
    R,
    G,
    B,
    A,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ImageViewSpecification {
    pub component_r: ComponentSwizzle,
    pub component_g: ComponentSwizzle,
    pub component_b: ComponentSwizzle,
    pub component_a: ComponentSwizzle,
    pub base_mip_level: u32,
    /// 0 means every level from `base_mip_level`
    pub level_count: u32,
    pub base_array_layer: u32,
    /// 0 means every layer from `base_array_layer`
    pub layer_count: u32,
}

pub trait ImageView: Send + Sync {
    fn specification(&self) -> &ImageViewSpecification;

    fn as_any(&self) -> &dyn Any;
}

// ===== IMAGE SAMPLER =====

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AddressMode {
    #[default]
    Repeat,
    MirroredRepeat,
    ClampToEdge,
    ClampToBorder,
    MirrorClampToEdge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BorderColor {
    #[default]
    TransparentBlack,
    OpaqueBlack,
    OpaqueWhite,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ImageFilter {
    Nearest,
    #[default]
    Linear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ImageMipMapMode {
    Nearest,
    #[default]
    Linear,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageSamplerSpecification {
    pub address_mode_u: AddressMode,
    pub address_mode_v: AddressMode,
    pub address_mode_w: AddressMode,
    pub border_color: BorderColor,
    pub compare_logic: DepthCompareLogic,
    pub mag_filter: ImageFilter,
    pub min_filter: ImageFilter,
    pub mip_map_mode: ImageMipMapMode,
    pub max_anisotropy: f32,
    pub mip_lod_bias: f32,
    pub min_lod: f32,
    pub max_lod: f32,
    pub enable_anisotropy: bool,
    pub enable_compare: bool,
    pub enable_unnormalized_coordinates: bool,
}

impl Default for ImageSamplerSpecification {
    fn default() -> Self {
        Self {
            address_mode_u: AddressMode::Repeat,
            address_mode_v: AddressMode::Repeat,
            address_mode_w: AddressMode::Repeat,
            border_color: BorderColor::OpaqueWhite,
            compare_logic: DepthCompareLogic::Always,
            mag_filter: ImageFilter::Linear,
            min_filter: ImageFilter::Linear,
            mip_map_mode: ImageMipMapMode::Linear,
            max_anisotropy: 1.0,
            mip_lod_bias: 0.0,
            min_lod: 0.0,
            max_lod: f32::MAX,
            enable_anisotropy: false,
            enable_compare: false,
            enable_unnormalized_coordinates: false,
        }
    }
}

pub trait ImageSampler: Send + Sync {
    fn specification(&self) -> &ImageSamplerSpecification;

    fn as_any(&self) -> &dyn Any;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mip_levels_cover_the_full_chain() {
        let spec = ImageSpecification { width: 256, height: 64, enable_mip_maps: true, ..Default::default() };
        assert_eq!(spec.mip_levels(), 9);
        assert_eq!(spec.mip_extent(8), (1, 1));
        assert_eq!(spec.mip_extent(7), (2, 1));
    }

    #[test]
    fn test_mip_levels_without_mip_maps() {
        let spec = ImageSpecification { width: 256, height: 256, ..Default::default() };
        assert_eq!(spec.mip_levels(), 1);
    }

    #[test]
    fn test_non_power_of_two_mip_chain() {
        let spec = ImageSpecification { width: 300, height: 5, enable_mip_maps: true, ..Default::default() };
        assert_eq!(spec.mip_levels(), 9);
        assert_eq!(spec.mip_extent(1), (150, 2));
    }

    #[test]
    fn test_base_level_size() {
        let spec = ImageSpecification { width: 4, height: 4, ..Default::default() };
        assert_eq!(spec.base_level_size(), 64);
    }
}
