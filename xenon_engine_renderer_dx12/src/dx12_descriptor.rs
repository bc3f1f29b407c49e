/// Dx12Descriptor - descriptor tables of one class of a root signature
///
/// Each descriptor owns a range of the device's shader-visible resource heap
/// and, when the class samples images, a range of the sampler heap. Attaching
/// writes views straight into those ranges; binding only sets table handles.

use std::any::Any;
use std::sync::Arc;

use windows::Win32::Graphics::Direct3D12::*;
use windows::Win32::Graphics::Dxgi::Common::DXGI_FORMAT_R32_TYPELESS;
use xenon_engine::xenon::backend::{
    align_up, checked_binding, Buffer, Descriptor, DescriptorBindings, DescriptorType, Image, ImageSampler, ImageView,
    MemoryLocation, ResourceType, TopLevelAccelerationStructure, BUFFER_RESOURCE_TYPES, IMAGE_RESOURCE_TYPES,
};
use xenon_engine::xenon::Result;
use xenon_engine::{engine_bail, engine_trace};

use crate::dx12_alignment::CONSTANT_BUFFER_ALIGNMENT;
use crate::dx12_buffer::Dx12Buffer;
use crate::dx12_context::{GpuContext, HeapRange, ShaderVisibleHeap};
use crate::dx12_image::Dx12Image;
use crate::dx12_image_view::Dx12ImageView;
use crate::dx12_root_layout::{DescriptorTable, RangeKind};
use crate::dx12_root_signature::Dx12PipelineLayout;
use crate::dx12_sampler::Dx12ImageSampler;

const SOURCE: &str = "xenon::dx12::Descriptor";

/// A table of the root signature and the heap range backing it
struct TableRange {
    table: DescriptorTable,
    range: HeapRange,
}

pub struct Dx12Descriptor {
    ctx: Arc<GpuContext>,
    /// Keeps the root signature alive as long as the tables
    layout: Arc<Dx12PipelineLayout>,
    descriptor_type: DescriptorType,
    bindings: DescriptorBindings,
    resources: Option<TableRange>,
    samplers: Option<TableRange>,
}

impl Dx12Descriptor {
    pub(crate) fn new(
        ctx: Arc<GpuContext>,
        layout: Arc<Dx12PipelineLayout>,
        descriptor_type: DescriptorType,
    ) -> Result<Self> {
        let bindings = layout.binding_map().bindings(descriptor_type).clone();
        let class = layout.root_layout().class(descriptor_type).clone();

        let resources = match class.resources {
            Some(table) => Some(TableRange { range: ctx.resource_heap.allocate(table.len())?, table }),
            None => None,
        };
        let samplers = match class.samplers {
            Some(table) => match ctx.sampler_heap.allocate(table.len()) {
                Ok(range) => Some(TableRange { range, table }),
                Err(e) => {
                    if let Some(resources) = &resources {
                        ctx.resource_heap.release(&resources.range);
                    }
                    return Err(e);
                }
            },
            None => None,
        };

        engine_trace!(SOURCE, "Created {:?} descriptor with {} binding(s)", descriptor_type, bindings.len());
        Ok(Self { ctx, layout, descriptor_type, bindings, resources, samplers })
    }

    pub(crate) fn layout(&self) -> &Arc<Dx12PipelineLayout> {
        &self.layout
    }

    /// GPU handles of the resource and sampler tables, for `Set*RootDescriptorTable`
    pub(crate) fn table_handles(&self) -> (Option<D3D12_GPU_DESCRIPTOR_HANDLE>, Option<D3D12_GPU_DESCRIPTOR_HANDLE>) {
        (
            self.resources.as_ref().map(|t| self.ctx.resource_heap.gpu_handle(t.range.start)),
            self.samplers.as_ref().map(|t| self.ctx.sampler_heap.gpu_handle(t.range.start)),
        )
    }

    /// CPU handle of `binding` in `tables`
    fn handle(heap: &ShaderVisibleHeap, tables: Option<&TableRange>, binding: u32) -> Result<D3D12_CPU_DESCRIPTOR_HANDLE> {
        match tables.and_then(|t| t.table.slot(binding).map(|slot| t.range.start + slot)) {
            Some(slot) => Ok(heap.cpu_handle(slot)),
            None => engine_bail!(SOURCE, "Binding {} has no slot in the descriptor table", binding),
        }
    }

    fn resource_handle(&self, binding: u32) -> Result<D3D12_CPU_DESCRIPTOR_HANDLE> {
        Self::handle(&self.ctx.resource_heap, self.resources.as_ref(), binding)
    }

    fn sampler_handle(&self, binding: u32) -> Result<D3D12_CPU_DESCRIPTOR_HANDLE> {
        Self::handle(&self.ctx.sampler_heap, self.samplers.as_ref(), binding)
    }
}

impl Descriptor for Dx12Descriptor {
    fn descriptor_type(&self) -> DescriptorType {
        self.descriptor_type
    }

    fn bindings(&self) -> &DescriptorBindings {
        &self.bindings
    }

    fn attach_buffer(&mut self, binding: u32, buffer: &dyn Buffer) -> Result<()> {
        let info = checked_binding(&self.bindings, binding, &BUFFER_RESOURCE_TYPES)?;
        let Some(buffer) = buffer.downcast_ref::<Dx12Buffer>() else {
            engine_bail!(SOURCE, "Buffer was not created by the Direct3D 12 backend");
        };
        let handle = self.resource_handle(binding)?;
        let device = &self.ctx.device;

        // Texel and storage buffers are exposed as raw 32-bit views
        let elements = (buffer.size() / 4) as u32;
        match RangeKind::resource_range(info.resource_type) {
            Some(RangeKind::ConstantBuffer) => {
                let desc = D3D12_CONSTANT_BUFFER_VIEW_DESC {
                    BufferLocation: buffer.gpu_address(),
                    SizeInBytes: align_up(buffer.size(), CONSTANT_BUFFER_ALIGNMENT) as u32,
                };
                unsafe { device.CreateConstantBufferView(Some(&desc), handle) };
            }
            Some(RangeKind::ShaderResource) => {
                let mut desc = D3D12_SHADER_RESOURCE_VIEW_DESC {
                    Format: DXGI_FORMAT_R32_TYPELESS,
                    ViewDimension: D3D12_SRV_DIMENSION_BUFFER,
                    Shader4ComponentMapping: D3D12_DEFAULT_SHADER_4_COMPONENT_MAPPING,
                    ..Default::default()
                };
                desc.Anonymous.Buffer = D3D12_BUFFER_SRV {
                    FirstElement: 0,
                    NumElements: elements,
                    StructureByteStride: 0,
                    Flags: D3D12_BUFFER_SRV_FLAG_RAW,
                };
                unsafe { device.CreateShaderResourceView(&*buffer.resource, Some(&desc), handle) };
            }
            Some(RangeKind::UnorderedAccess) => {
                if buffer.memory_location() != MemoryLocation::GpuOnly {
                    engine_bail!(
                        SOURCE,
                        "A {:?} buffer cannot be written by shaders at binding {}",
                        buffer.buffer_type(),
                        binding
                    );
                }
                let mut desc = D3D12_UNORDERED_ACCESS_VIEW_DESC {
                    Format: DXGI_FORMAT_R32_TYPELESS,
                    ViewDimension: D3D12_UAV_DIMENSION_BUFFER,
                    ..Default::default()
                };
                desc.Anonymous.Buffer = D3D12_BUFFER_UAV {
                    FirstElement: 0,
                    NumElements: elements,
                    StructureByteStride: 0,
                    CounterOffsetInBytes: 0,
                    Flags: D3D12_BUFFER_UAV_FLAG_RAW,
                };
                unsafe { device.CreateUnorderedAccessView(&*buffer.resource, None::<&ID3D12Resource>, Some(&desc), handle) };
            }
            Some(RangeKind::Sampler) | None => {
                engine_bail!(SOURCE, "Binding {} does not hold a buffer view", binding);
            }
        }
        Ok(())
    }

    fn attach_image(
        &mut self,
        binding: u32,
        image: &dyn Image,
        view: &dyn ImageView,
        sampler: &dyn ImageSampler,
    ) -> Result<()> {
        let info = checked_binding(&self.bindings, binding, &IMAGE_RESOURCE_TYPES)?;
        let Some(image) = image.downcast_ref::<Dx12Image>() else {
            engine_bail!(SOURCE, "Image was not created by the Direct3D 12 backend");
        };
        let Some(view) = view.as_any().downcast_ref::<Dx12ImageView>() else {
            engine_bail!(SOURCE, "Image view was not created by the Direct3D 12 backend");
        };
        let Some(sampler) = sampler.as_any().downcast_ref::<Dx12ImageSampler>() else {
            engine_bail!(SOURCE, "Sampler was not created by the Direct3D 12 backend");
        };

        let handle = self.resource_handle(binding)?;
        let device = &self.ctx.device;
        unsafe {
            match info.resource_type {
                ResourceType::StorageImage => {
                    device.CreateUnorderedAccessView(&*image.resource, None::<&ID3D12Resource>, Some(&view.unordered_access), handle)
                }
                _ => device.CreateShaderResourceView(&*image.resource, Some(&view.shader_resource), handle),
            }
        }

        if RangeKind::needs_sampler(info.resource_type) {
            let sampler_handle = self.sampler_handle(binding)?;
            unsafe { device.CreateSampler(&sampler.desc, sampler_handle) };
        }
        Ok(())
    }

    fn attach_acceleration_structure(
        &mut self,
        binding: u32,
        _acceleration_structure: &dyn TopLevelAccelerationStructure,
    ) -> Result<()> {
        checked_binding(&self.bindings, binding, &[ResourceType::AccelerationStructure])?;
        engine_bail!(SOURCE, "Acceleration structures are not supported by the Direct3D 12 backend");
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for Dx12Descriptor {
    fn drop(&mut self) {
        if let Some(resources) = &self.resources {
            self.ctx.resource_heap.release(&resources.range);
        }
        if let Some(samplers) = &self.samplers {
            self.ctx.sampler_heap.release(&samplers.range);
        }
    }
}
