/// Dx12Image - Direct3D 12 implementation of the Image trait
///
/// Like the Vulkan image, one state is tracked for every subresource and
/// transfers leave the image in its resting state. Buffer data arrives tightly
/// packed, so rows are respaced to the 256-byte pitch D3D12 copies require
/// whenever the two layouts differ.

use std::any::Any;
use std::mem::ManuallyDrop;
use std::sync::{Arc, Mutex, OnceLock};

use gpu_allocator::d3d12::Allocation;
use windows::Win32::Graphics::Direct3D12::*;
use windows::Win32::Graphics::Dxgi::Common::{DXGI_FORMAT, DXGI_SAMPLE_DESC};
use xenon_engine::xenon::backend::{
    align_up, check_range, Buffer, BufferType, CommandRecorder, DataFormat, Image, ImageSpecification, ImageType,
    MemoryLocation, ResourceState,
};
use xenon_engine::xenon::{Error, Result};
use xenon_engine::{engine_bail, engine_debug};

use crate::dx12_alignment::{pitch_rows, unpitch_rows, TextureFootprint, TEXTURE_PLACEMENT_ALIGNMENT};
use crate::dx12_barrier::ImageState;
use crate::dx12_buffer::Dx12Buffer;
use crate::dx12_command_recorder::record_or_submit;
use crate::dx12_context::{transition_barrier, GpuContext};
use crate::dx12_conversions::{resource_flags, resource_format};
use crate::dx12_mip::{mip_chain_rgba8, supports_cpu_mip_maps};

const SOURCE: &str = "xenon::dx12::Image";

/// Copy location addressing one subresource of `resource`
///
/// Borrows `resource` without a reference count, like `transition_barrier`.
pub(crate) fn subresource_location(resource: &ID3D12Resource, subresource: u32) -> D3D12_TEXTURE_COPY_LOCATION {
    D3D12_TEXTURE_COPY_LOCATION {
        pResource: unsafe { std::mem::transmute_copy(resource) },
        Type: D3D12_TEXTURE_COPY_TYPE_SUBRESOURCE_INDEX,
        Anonymous: D3D12_TEXTURE_COPY_LOCATION_0 { SubresourceIndex: subresource },
    }
}

/// Copy location of a pitched subresource at `offset` of a buffer
fn footprint_location(
    buffer: &ID3D12Resource,
    offset: u64,
    format: DXGI_FORMAT,
    footprint: &TextureFootprint,
    depth: u32,
) -> D3D12_TEXTURE_COPY_LOCATION {
    D3D12_TEXTURE_COPY_LOCATION {
        pResource: unsafe { std::mem::transmute_copy(buffer) },
        Type: D3D12_TEXTURE_COPY_TYPE_PLACED_FOOTPRINT,
        Anonymous: D3D12_TEXTURE_COPY_LOCATION_0 {
            PlacedFootprint: D3D12_PLACED_SUBRESOURCE_FOOTPRINT {
                Offset: offset,
                Footprint: D3D12_SUBRESOURCE_FOOTPRINT {
                    Format: format,
                    Width: footprint.width,
                    Height: footprint.height / depth.max(1),
                    Depth: depth.max(1),
                    RowPitch: footprint.row_pitch as u32,
                },
            },
        },
    }
}

/// Offsets of `count` pitched subresources packed one after the other
fn placed_offsets(sizes: impl IntoIterator<Item = u64>) -> (Vec<u64>, u64) {
    let mut offsets = Vec::new();
    let mut end = 0;
    for size in sizes {
        let offset = align_up(end, TEXTURE_PLACEMENT_ALIGNMENT);
        offsets.push(offset);
        end = offset + size;
    }
    (offsets, end)
}

pub struct Dx12Image {
    ctx: Arc<GpuContext>,
    /// Released before its allocation in `Drop`
    pub(crate) resource: ManuallyDrop<ID3D12Resource>,
    allocation: Option<Allocation>,
    specification: ImageSpecification,
    format: DXGI_FORMAT,
    state: Mutex<ImageState>,
    /// Pitched copy of packed buffer data, created on first unaligned upload
    pitched: OnceLock<Box<Dx12Buffer>>,
    /// Lower mip levels waiting to be copied into the image
    mip_upload: OnceLock<Box<Dx12Buffer>>,
}

impl Dx12Image {
    pub(crate) fn new(ctx: Arc<GpuContext>, specification: &ImageSpecification) -> Result<Self> {
        Self::with_state(ctx, specification, ImageState::CopyDestination, None)
    }

    /// Create an image starting in `state`; attachments pass their optimized clear value
    pub(crate) fn with_state(
        ctx: Arc<GpuContext>,
        specification: &ImageSpecification,
        state: ImageState,
        clear_value: Option<D3D12_CLEAR_VALUE>,
    ) -> Result<Self> {
        if specification.width == 0 || specification.height == 0 {
            engine_bail!(
                SOURCE,
                "Invalid image extent {}x{}",
                specification.width,
                specification.height
            );
        }
        if specification.format == DataFormat::Undefined {
            engine_bail!(SOURCE, "Cannot create an image with an undefined format");
        }

        let (dimension, depth_or_array_size) = match specification.image_type {
            ImageType::OneDimensional => (D3D12_RESOURCE_DIMENSION_TEXTURE1D, Self::array_layers(specification)),
            ImageType::ThreeDimensional => (D3D12_RESOURCE_DIMENSION_TEXTURE3D, specification.depth.max(1)),
            _ => (D3D12_RESOURCE_DIMENSION_TEXTURE2D, Self::array_layers(specification)),
        };
        let format = resource_format(specification.format, specification.usage);
        let desc = D3D12_RESOURCE_DESC {
            Dimension: dimension,
            Alignment: 0,
            Width: specification.width as u64,
            Height: specification.height,
            DepthOrArraySize: depth_or_array_size as u16,
            MipLevels: specification.mip_levels() as u16,
            Format: format,
            SampleDesc: DXGI_SAMPLE_DESC { Count: specification.multi_sampling_count.sample_count(), Quality: 0 },
            Layout: D3D12_TEXTURE_LAYOUT_UNKNOWN,
            Flags: resource_flags(specification.usage),
        };

        let (resource, allocation) = ctx.create_resource(
            "image",
            &desc,
            MemoryLocation::GpuOnly,
            D3D12_RESOURCE_STATES(state.bits()),
            clear_value.as_ref(),
        )?;

        Ok(Self {
            ctx,
            resource: ManuallyDrop::new(resource),
            allocation: Some(allocation),
            specification: *specification,
            format,
            state: Mutex::new(state),
            pitched: OnceLock::new(),
            mip_upload: OnceLock::new(),
        })
    }

    /// Cube maps hold six faces per layer; 3D images have a single layer
    fn array_layers(specification: &ImageSpecification) -> u32 {
        match specification.image_type {
            ImageType::CubeMap => 6 * specification.layers.max(1),
            ImageType::ThreeDimensional => 1,
            _ => specification.layers.max(1),
        }
    }

    pub(crate) fn layer_count(&self) -> u32 {
        Self::array_layers(&self.specification)
    }

    fn depth(&self) -> u32 {
        match self.specification.image_type {
            ImageType::ThreeDimensional => self.specification.depth.max(1),
            _ => 1,
        }
    }

    pub(crate) fn format(&self) -> DXGI_FORMAT {
        self.format
    }

    /// D3D12CalcSubresource for the single plane formats the engine uses
    pub(crate) fn subresource(&self, mip_level: u32, layer: u32) -> u32 {
        mip_level + layer * self.specification.mip_levels()
    }

    pub(crate) fn state(&self) -> ImageState {
        self.state.lock().map(|state| *state).unwrap_or(ImageState::Common)
    }

    /// Update the tracked state after the rasterizer changed it
    pub(crate) fn set_state(&self, state: ImageState) {
        if let Ok(mut current) = self.state.lock() {
            *current = state;
        }
    }

    pub(crate) fn resting_state(&self) -> ImageState {
        ImageState::resting(self.specification.usage)
    }

    /// Record a transition of every subresource to `state`
    pub(crate) fn record_transition(&self, list: &ID3D12GraphicsCommandList, state: ImageState) {
        let current = self.state();
        if current == state {
            return;
        }
        let barrier = transition_barrier(
            &self.resource,
            D3D12_RESOURCE_BARRIER_ALL_SUBRESOURCES,
            current.bits(),
            state.bits(),
        );
        unsafe { list.ResourceBarrier(&[barrier]) };
        self.set_state(state);
    }

    /// Footprint of one layer of `mip_level`; 3D slices are stacked as extra rows
    fn footprint(&self, mip_level: u32) -> TextureFootprint {
        let (width, height) = self.specification.mip_extent(mip_level);
        TextureFootprint::new(width, height * self.depth(), self.specification.format.texel_size())
    }

    /// Get the buffer in `cell`, creating it with `size` bytes on first use
    fn once_buffer<'a>(
        &self,
        cell: &'a OnceLock<Box<Dx12Buffer>>,
        name: &str,
        size: u64,
        location: MemoryLocation,
        state: ResourceState,
    ) -> Result<&'a Dx12Buffer> {
        if let Some(buffer) = cell.get() {
            return Ok(buffer);
        }
        let buffer = Dx12Buffer::with_placement(Arc::clone(&self.ctx), name, size, BufferType::Staging, location, state)?;
        let _ = cell.set(Box::new(buffer));
        cell.get()
            .map(|buffer| buffer.as_ref())
            .ok_or_else(|| Error::BackendError(format!("Failed to create {} buffer", name)))
    }

    fn record_copy_from_buffer(&self, list: &ID3D12GraphicsCommandList, src: &Dx12Buffer) -> Result<()> {
        let footprint = self.footprint(0);
        let layers = self.layer_count();
        let packed_size = footprint.packed_size();
        let depth = self.depth();

        self.record_transition(list, ImageState::CopyDestination);

        // Packed rows at placeable offsets are already a valid footprint
        let direct = footprint.is_packed() && packed_size % TEXTURE_PLACEMENT_ALIGNMENT == 0;
        if direct {
            src.record_as_copy_source(list, |buffer| {
                for layer in 0..layers {
                    let dst = subresource_location(&self.resource, self.subresource(0, layer));
                    let src = footprint_location(buffer, layer as u64 * packed_size, self.format, &footprint, depth);
                    unsafe { list.CopyTextureRegion(&dst, 0, 0, 0, &src, None) };
                }
            });
        } else {
            let (offsets, total) = placed_offsets((0..layers).map(|_| footprint.pitched_size()));
            let pitched = self.once_buffer(
                &self.pitched,
                "pitched image data",
                total,
                MemoryLocation::GpuOnly,
                ResourceState::CopyDestination,
            )?;
            if pitched.size() < total {
                engine_bail!(SOURCE, "Pitched upload buffer is smaller than the image data");
            }

            // Respace the rows on the GPU, one region per row
            src.record_as_copy_source(list, |buffer| {
                for (layer, offset) in offsets.iter().enumerate() {
                    for row in 0..footprint.height as u64 {
                        unsafe {
                            list.CopyBufferRegion(
                                &*pitched.resource,
                                offset + row * footprint.row_pitch,
                                buffer,
                                layer as u64 * packed_size + row * footprint.row_size,
                                footprint.row_size,
                            );
                        }
                    }
                }
            });
            pitched.record_as_copy_source(list, |buffer| {
                for (layer, offset) in offsets.iter().enumerate() {
                    let dst = subresource_location(&self.resource, self.subresource(0, layer as u32));
                    let src = footprint_location(buffer, *offset, self.format, &footprint, depth);
                    unsafe { list.CopyTextureRegion(&dst, 0, 0, 0, &src, None) };
                }
            });
        }

        self.record_transition(list, self.resting_state());
        Ok(())
    }

    fn record_copy_from_image(&self, list: &ID3D12GraphicsCommandList, src: &Dx12Image) {
        let src_before = src.state();
        src.record_transition(list, ImageState::CopySource);
        self.record_transition(list, ImageState::CopyDestination);

        for layer in 0..self.layer_count().min(src.layer_count()) {
            let dst_location = subresource_location(&self.resource, self.subresource(0, layer));
            let src_location = subresource_location(&src.resource, src.subresource(0, layer));
            unsafe { list.CopyTextureRegion(&dst_location, 0, 0, 0, &src_location, None) };
        }

        src.record_transition(list, src_before);
        self.record_transition(list, self.resting_state());
    }

    /// Read every layer of the base level back, tightly packed
    fn read_base_level(&self) -> Result<Vec<Vec<u8>>> {
        let footprint = self.footprint(0);
        let layers = self.layer_count();
        let (offsets, total) = placed_offsets((0..layers).map(|_| footprint.pitched_size()));
        let readback = Dx12Buffer::with_placement(
            Arc::clone(&self.ctx),
            "mip base readback",
            total,
            BufferType::Staging,
            MemoryLocation::GpuToCpu,
            ResourceState::CopyDestination,
        )?;

        self.ctx.execute_one_shot(|list| {
            let before = self.state();
            self.record_transition(list, ImageState::CopySource);
            for (layer, offset) in offsets.iter().enumerate() {
                let dst = footprint_location(&readback.resource, *offset, self.format, &footprint, self.depth());
                let src = subresource_location(&self.resource, self.subresource(0, layer as u32));
                unsafe { list.CopyTextureRegion(&dst, 0, 0, 0, &src, None) };
            }
            self.record_transition(list, before);
            Ok(())
        })?;

        let pitched = readback.read_mapped()?;
        Ok(offsets
            .iter()
            .map(|offset| {
                let start = (*offset as usize).min(pitched.len());
                unpitch_rows(&pitched[start..], &footprint)
            })
            .collect())
    }
}

impl Image for Dx12Image {
    fn specification(&self) -> &ImageSpecification {
        &self.specification
    }

    fn copy_from_buffer(&self, src: &dyn Buffer, recorder: Option<&mut dyn CommandRecorder>) -> Result<()> {
        let Some(src) = src.downcast_ref::<Dx12Buffer>() else {
            engine_bail!(SOURCE, "Source buffer was not created by the Direct3D 12 backend");
        };
        let required = self.specification.base_level_size() * self.layer_count() as u64;
        check_range(SOURCE, src.size(), 0, required)?;

        record_or_submit(&self.ctx, recorder, |list| self.record_copy_from_buffer(list, src))
    }

    fn copy_from_image(&self, src: &dyn Image, recorder: Option<&mut dyn CommandRecorder>) -> Result<()> {
        let Some(src) = src.downcast_ref::<Dx12Image>() else {
            engine_bail!(SOURCE, "Source image was not created by the Direct3D 12 backend");
        };
        let (src_spec, dst_spec) = (src.specification(), &self.specification);
        if src_spec.width != dst_spec.width || src_spec.height != dst_spec.height {
            engine_bail!(
                SOURCE,
                "Cannot copy a {}x{} image into a {}x{} image",
                src_spec.width,
                src_spec.height,
                dst_spec.width,
                dst_spec.height
            );
        }

        record_or_submit(&self.ctx, recorder, |list| {
            self.record_copy_from_image(list, src);
            Ok(())
        })
    }

    /// Filter the chain on the CPU from the base level currently on the GPU
    ///
    /// The base level is read back immediately, so with a recorder its upload
    /// must already have been submitted and completed.
    fn generate_mip_maps(&self, recorder: Option<&mut dyn CommandRecorder>) -> Result<()> {
        let mip_levels = self.specification.mip_levels();
        if mip_levels <= 1 {
            engine_debug!(SOURCE, "Image has a single mip level, nothing to generate");
            return Ok(());
        }
        if !supports_cpu_mip_maps(self.specification.format) || self.depth() > 1 {
            engine_bail!(
                SOURCE,
                "Cannot generate mip maps for {:?} images of depth {}",
                self.specification.format,
                self.depth()
            );
        }

        let (width, height) = (self.specification.width, self.specification.height);
        let levels: Vec<Vec<(Vec<u8>, u32, u32)>> = self
            .read_base_level()?
            .iter()
            .map(|base| mip_chain_rgba8(base, width, height, mip_levels))
            .collect();

        // One placed footprint per (layer, level), in subresource order
        let footprints: Vec<(u32, u32, TextureFootprint)> = levels
            .iter()
            .enumerate()
            .flat_map(|(layer, chain)| {
                chain.iter().enumerate().map(move |(index, (_, w, h))| {
                    (layer as u32, index as u32 + 1, TextureFootprint::new(*w, *h, 4))
                })
            })
            .collect();
        let (offsets, total) = placed_offsets(footprints.iter().map(|(_, _, footprint)| footprint.pitched_size()));

        let upload = self.once_buffer(
            &self.mip_upload,
            "mip upload",
            total,
            MemoryLocation::CpuToGpu,
            ResourceState::GenericRead,
        )?;
        let texels = levels.iter().flat_map(|chain| chain.iter().map(|(texels, _, _)| texels));
        for ((texels, (_, _, footprint)), offset) in texels.zip(&footprints).zip(&offsets) {
            upload.write_mapped(&pitch_rows(texels, footprint), *offset)?;
        }

        record_or_submit(&self.ctx, recorder, |list| {
            self.record_transition(list, ImageState::CopyDestination);
            for ((layer, level, footprint), offset) in footprints.iter().zip(&offsets) {
                let dst = subresource_location(&self.resource, self.subresource(*level, *layer));
                let src = footprint_location(&upload.resource, *offset, self.format, footprint, 1);
                unsafe { list.CopyTextureRegion(&dst, 0, 0, 0, &src, None) };
            }
            self.record_transition(list, self.resting_state());
            Ok(())
        })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for Dx12Image {
    fn drop(&mut self) {
        unsafe {
            ManuallyDrop::drop(&mut self.resource);
        }
        if let Some(allocation) = self.allocation.take() {
            self.ctx.free(allocation);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placed_offsets_align_every_subresource() {
        let (offsets, end) = placed_offsets([100, 600, 1]);
        assert_eq!(offsets, vec![0, 512, 1536]);
        assert_eq!(end, 1537);
    }
}
