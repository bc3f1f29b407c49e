/// Dx12ImageSampler - Direct3D 12 implementation of the ImageSampler trait
///
/// Like image views, samplers are descriptors: the description is written
/// into the sampler heap by the descriptor it gets attached to.

use std::any::Any;

use windows::Win32::Graphics::Direct3D12::*;
use xenon_engine::xenon::backend::{ImageSampler, ImageSamplerSpecification};
use xenon_engine::engine_warn;

use crate::dx12_conversions::{address_mode, border_color, comparison_func, sampler_filter};

const SOURCE: &str = "xenon::dx12::Sampler";

/// D3D12_MAX_MAXANISOTROPY
const MAX_ANISOTROPY: f32 = 16.0;

pub struct Dx12ImageSampler {
    specification: ImageSamplerSpecification,
    pub(crate) desc: D3D12_SAMPLER_DESC,
}

impl Dx12ImageSampler {
    pub(crate) fn new(specification: &ImageSamplerSpecification) -> Self {
        if specification.enable_unnormalized_coordinates {
            engine_warn!(SOURCE, "Unnormalized sampler coordinates are not supported by Direct3D 12, ignoring them");
        }

        let comparison = if specification.enable_compare {
            comparison_func(specification.compare_logic)
        } else {
            D3D12_COMPARISON_FUNC_NEVER
        };

        let desc = D3D12_SAMPLER_DESC {
            Filter: sampler_filter(
                specification.min_filter,
                specification.mag_filter,
                specification.mip_map_mode,
                specification.enable_anisotropy,
                specification.enable_compare,
            ),
            AddressU: address_mode(specification.address_mode_u),
            AddressV: address_mode(specification.address_mode_v),
            AddressW: address_mode(specification.address_mode_w),
            MipLODBias: specification.mip_lod_bias,
            MaxAnisotropy: specification.max_anisotropy.clamp(1.0, MAX_ANISOTROPY) as u32,
            ComparisonFunc: comparison,
            BorderColor: border_color(specification.border_color),
            MinLOD: specification.min_lod,
            MaxLOD: specification.max_lod,
        };

        Self { specification: *specification, desc }
    }
}

impl ImageSampler for Dx12ImageSampler {
    fn specification(&self) -> &ImageSamplerSpecification {
        &self.specification
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
