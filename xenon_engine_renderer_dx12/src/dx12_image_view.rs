/// Dx12ImageView - Direct3D 12 implementation of the ImageView trait
///
/// D3D12 views are descriptors, not objects. The view keeps the descriptions
/// and `Dx12Descriptor::attach_image` writes them into the descriptor heap.

use std::any::Any;

use windows::Win32::Graphics::Direct3D12::*;
use xenon_engine::xenon::backend::{Image, ImageType, ImageView, ImageViewSpecification};
use xenon_engine::xenon::Result;
use xenon_engine::engine_bail;

use crate::dx12_conversions::{component_mapping, shader_resource_format};
use crate::dx12_image::Dx12Image;

const SOURCE: &str = "xenon::dx12::ImageView";

pub struct Dx12ImageView {
    specification: ImageViewSpecification,
    pub(crate) shader_resource: D3D12_SHADER_RESOURCE_VIEW_DESC,
    pub(crate) unordered_access: D3D12_UNORDERED_ACCESS_VIEW_DESC,
}

impl Dx12ImageView {
    pub(crate) fn new(image: &dyn Image, specification: &ImageViewSpecification) -> Result<Self> {
        let Some(image) = image.downcast_ref::<Dx12Image>() else {
            engine_bail!(SOURCE, "Image was not created by the Direct3D 12 backend");
        };

        let image_specification = image.specification();
        let mip_levels = image_specification.mip_levels();
        let layers = image.layer_count();
        if specification.base_mip_level >= mip_levels || specification.base_array_layer >= layers {
            engine_bail!(
                SOURCE,
                "View starts at mip {} / layer {} but the image has {} mip(s) and {} layer(s)",
                specification.base_mip_level,
                specification.base_array_layer,
                mip_levels,
                layers
            );
        }

        let level_count = match specification.level_count {
            0 => mip_levels - specification.base_mip_level,
            count => count.min(mip_levels - specification.base_mip_level),
        };
        let layer_count = match specification.layer_count {
            0 => layers - specification.base_array_layer,
            count => count.min(layers - specification.base_array_layer),
        };

        let range = ViewRange {
            base_mip: specification.base_mip_level,
            mip_count: level_count,
            base_layer: specification.base_array_layer,
            layer_count,
        };
        let multisampled = image_specification.multi_sampling_count.sample_count() > 1;

        let mut shader_resource = D3D12_SHADER_RESOURCE_VIEW_DESC {
            Format: shader_resource_format(image_specification.format),
            Shader4ComponentMapping: component_mapping([
                specification.component_r,
                specification.component_g,
                specification.component_b,
                specification.component_a,
            ]),
            ..Default::default()
        };
        Self::describe_shader_resource(&mut shader_resource, image_specification.image_type, multisampled, range);

        let mut unordered_access = D3D12_UNORDERED_ACCESS_VIEW_DESC {
            Format: shader_resource.Format,
            ..Default::default()
        };
        Self::describe_unordered_access(&mut unordered_access, image_specification.image_type, range);

        Ok(Self { specification: *specification, shader_resource, unordered_access })
    }

    fn describe_shader_resource(
        desc: &mut D3D12_SHADER_RESOURCE_VIEW_DESC,
        image_type: ImageType,
        multisampled: bool,
        range: ViewRange,
    ) {
        match image_type {
            ImageType::OneDimensional => {
                desc.ViewDimension = D3D12_SRV_DIMENSION_TEXTURE1DARRAY;
                desc.Anonymous.Texture1DArray = D3D12_TEX1D_ARRAY_SRV {
                    MostDetailedMip: range.base_mip,
                    MipLevels: range.mip_count,
                    FirstArraySlice: range.base_layer,
                    ArraySize: range.layer_count,
                    ResourceMinLODClamp: 0.0,
                };
            }
            ImageType::ThreeDimensional => {
                desc.ViewDimension = D3D12_SRV_DIMENSION_TEXTURE3D;
                desc.Anonymous.Texture3D = D3D12_TEX3D_SRV {
                    MostDetailedMip: range.base_mip,
                    MipLevels: range.mip_count,
                    ResourceMinLODClamp: 0.0,
                };
            }
            ImageType::CubeMap if range.layer_count >= 6 => {
                desc.ViewDimension = D3D12_SRV_DIMENSION_TEXTURECUBEARRAY;
                desc.Anonymous.TextureCubeArray = D3D12_TEXCUBE_ARRAY_SRV {
                    MostDetailedMip: range.base_mip,
                    MipLevels: range.mip_count,
                    First2DArrayFace: range.base_layer,
                    NumCubes: range.layer_count / 6,
                    ResourceMinLODClamp: 0.0,
                };
            }
            _ if multisampled => {
                desc.ViewDimension = D3D12_SRV_DIMENSION_TEXTURE2DMSARRAY;
                desc.Anonymous.Texture2DMSArray = D3D12_TEX2DMS_ARRAY_SRV {
                    FirstArraySlice: range.base_layer,
                    ArraySize: range.layer_count,
                };
            }
            _ => {
                desc.ViewDimension = D3D12_SRV_DIMENSION_TEXTURE2DARRAY;
                desc.Anonymous.Texture2DArray = D3D12_TEX2D_ARRAY_SRV {
                    MostDetailedMip: range.base_mip,
                    MipLevels: range.mip_count,
                    FirstArraySlice: range.base_layer,
                    ArraySize: range.layer_count,
                    PlaneSlice: 0,
                    ResourceMinLODClamp: 0.0,
                };
            }
        }
    }

    /// Storage views write the base mip of the range
    fn describe_unordered_access(desc: &mut D3D12_UNORDERED_ACCESS_VIEW_DESC, image_type: ImageType, range: ViewRange) {
        match image_type {
            ImageType::OneDimensional => {
                desc.ViewDimension = D3D12_UAV_DIMENSION_TEXTURE1DARRAY;
                desc.Anonymous.Texture1DArray = D3D12_TEX1D_ARRAY_UAV {
                    MipSlice: range.base_mip,
                    FirstArraySlice: range.base_layer,
                    ArraySize: range.layer_count,
                };
            }
            ImageType::ThreeDimensional => {
                desc.ViewDimension = D3D12_UAV_DIMENSION_TEXTURE3D;
                desc.Anonymous.Texture3D = D3D12_TEX3D_UAV { MipSlice: range.base_mip, FirstWSlice: 0, WSize: u32::MAX };
            }
            _ => {
                desc.ViewDimension = D3D12_UAV_DIMENSION_TEXTURE2DARRAY;
                desc.Anonymous.Texture2DArray = D3D12_TEX2D_ARRAY_UAV {
                    MipSlice: range.base_mip,
                    FirstArraySlice: range.base_layer,
                    ArraySize: range.layer_count,
                    PlaneSlice: 0,
                };
            }
        }
    }
}

#[derive(Clone, Copy)]
struct ViewRange {
    base_mip: u32,
    mip_count: u32,
    base_layer: u32,
    layer_count: u32,
}

impl ImageView for Dx12ImageView {
    fn specification(&self) -> &ImageViewSpecification {
        &self.specification
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
