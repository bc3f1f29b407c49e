/// Dx12Rasterizer - attachments and render target views of a render target
///
/// D3D12 has no render pass or framebuffer objects. Every frame owns its
/// attachments and a block of render target / depth stencil views in two
/// CPU-only heaps; binding the rasterizer transitions, binds and clears them,
/// and ending it resolves multisampled color into the resolve targets.

use std::any::Any;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use windows::Win32::Foundation::FALSE;
use windows::Win32::Graphics::Direct3D12::*;
use windows::Win32::Graphics::Dxgi::Common::{DXGI_FORMAT, DXGI_FORMAT_UNKNOWN};
use xenon_engine::xenon::backend::{
    attachment_layout, AttachmentType, ClearValue, DataFormat, Image, ImageSpecification, ImageUsage,
    MultiSamplingCount, Rasterizer,
};
use xenon_engine::xenon::Result;
use xenon_engine::{engine_bail, engine_debug, engine_err};

use crate::dx12_barrier::ImageState;
use crate::dx12_context::GpuContext;
use crate::dx12_conversions::data_format;
use crate::dx12_image::Dx12Image;

const SOURCE: &str = "xenon::dx12::Rasterizer";

/// Attachments of one frame
///
/// Shared with the recorder that bound it, which ends the frame and keeps
/// its images alive until the recorded commands are retired.
pub(crate) struct RasterizerFrame {
    /// Color attachments in `AttachmentType::COLOR_ORDER`, then depth
    attachments: Vec<(AttachmentType, Dx12Image)>,
    /// Single-sample targets of the color attachments when multisampling
    resolves: Vec<(AttachmentType, Dx12Image)>,
}

impl RasterizerFrame {
    /// Resolve multisampled color and leave color attachments readable
    pub(crate) fn end(&self, list: &ID3D12GraphicsCommandList) {
        if self.resolves.is_empty() {
            for (slot, image) in &self.attachments {
                if !slot.has_depth_stencil() {
                    image.record_transition(list, image.resting_state());
                }
            }
            return;
        }

        for ((_, source), (_, target)) in self
            .attachments
            .iter()
            .filter(|(slot, _)| !slot.has_depth_stencil())
            .zip(&self.resolves)
        {
            source.record_transition(list, ImageState::ResolveSource);
            target.record_transition(list, ImageState::ResolveDestination);
            unsafe { list.ResolveSubresource(&*target.resource, 0, &*source.resource, 0, target.format()) };
            target.record_transition(list, target.resting_state());
            source.record_transition(list, ImageState::RenderTarget);
        }
    }
}

/// A CPU-only descriptor heap holding the views of every frame
struct ViewHeap {
    heap: ID3D12DescriptorHeap,
    increment: u32,
}

impl ViewHeap {
    fn new(device: &ID3D12Device, heap_type: D3D12_DESCRIPTOR_HEAP_TYPE, capacity: u32) -> Result<Self> {
        let desc = D3D12_DESCRIPTOR_HEAP_DESC {
            Type: heap_type,
            NumDescriptors: capacity,
            Flags: D3D12_DESCRIPTOR_HEAP_FLAG_NONE,
            NodeMask: 0,
        };
        unsafe {
            let heap: ID3D12DescriptorHeap = device
                .CreateDescriptorHeap(&desc)
                .map_err(|e| engine_err!(SOURCE, "Failed to create a {:?} view heap: {:?}", heap_type, e))?;
            let increment = device.GetDescriptorHandleIncrementSize(heap_type);
            Ok(Self { heap, increment })
        }
    }

    fn handle(&self, slot: u32) -> D3D12_CPU_DESCRIPTOR_HANDLE {
        let start = unsafe { self.heap.GetCPUDescriptorHandleForHeapStart() };
        D3D12_CPU_DESCRIPTOR_HANDLE { ptr: start.ptr + (slot * self.increment) as usize }
    }
}

/// Direct3D 12 rasterizer implementation
pub struct Dx12Rasterizer {
    ctx: Arc<GpuContext>,
    width: u32,
    height: u32,
    attachment_types: AttachmentType,
    multi_sampling_count: MultiSamplingCount,
    triple_buffering: bool,
    layout: Vec<(AttachmentType, DataFormat)>,
    color_count: u32,
    frames: Vec<Arc<RasterizerFrame>>,
    rtv_heap: Option<ViewHeap>,
    dsv_heap: Option<ViewHeap>,
    bind_count: AtomicU32,
}

impl Dx12Rasterizer {
    pub(crate) fn new(
        ctx: Arc<GpuContext>,
        width: u32,
        height: u32,
        attachment_types: AttachmentType,
        enable_triple_buffering: bool,
        multi_sampling_count: MultiSamplingCount,
    ) -> Result<Self> {
        if width == 0 || height == 0 {
            engine_bail!(SOURCE, "Invalid rasterizer extent {}x{}", width, height);
        }
        if attachment_types.is_empty() {
            engine_bail!(SOURCE, "A rasterizer needs at least one attachment");
        }

        let layout = attachment_layout(attachment_types);
        let color_count = attachment_types.color_attachment_count() as u32;
        let frame_count: u32 = if enable_triple_buffering { 3 } else { 1 };

        let rtv_heap = match color_count {
            0 => None,
            count => Some(ViewHeap::new(&ctx.device, D3D12_DESCRIPTOR_HEAP_TYPE_RTV, count * frame_count)?),
        };
        let dsv_heap = match attachment_types.has_depth_stencil() {
            true => Some(ViewHeap::new(&ctx.device, D3D12_DESCRIPTOR_HEAP_TYPE_DSV, frame_count)?),
            false => None,
        };

        let mut rasterizer = Self {
            ctx,
            width,
            height,
            attachment_types,
            multi_sampling_count,
            triple_buffering: enable_triple_buffering,
            layout,
            color_count,
            frames: Vec::with_capacity(frame_count as usize),
            rtv_heap,
            dsv_heap,
            bind_count: AtomicU32::new(0),
        };
        for frame_index in 0..frame_count {
            let frame = rasterizer.create_frame(frame_index)?;
            rasterizer.frames.push(Arc::new(frame));
        }

        engine_debug!(
            SOURCE,
            "Created {}x{} rasterizer with {} frame(s) and {:?} sampling",
            width,
            height,
            frame_count,
            multi_sampling_count
        );
        Ok(rasterizer)
    }

    fn create_frame(&self, frame_index: u32) -> Result<RasterizerFrame> {
        let multisampled = self.is_multisampled();
        let mut attachments = Vec::new();
        let mut resolves = Vec::new();

        for (slot, format) in &self.layout {
            let depth = slot.has_depth_stencil();
            let usage = if depth {
                ImageUsage::DEPTH_ATTACHMENT
            } else {
                ImageUsage::COLOR_ATTACHMENT | ImageUsage::GRAPHICS
            };
            let specification = ImageSpecification {
                width: self.width,
                height: self.height,
                usage,
                format: *format,
                multi_sampling_count: self.multi_sampling_count,
                ..Default::default()
            };

            // Optimized clear values match the defaults of `default_clear_values`
            let clear_value = if depth {
                D3D12_CLEAR_VALUE {
                    Format: data_format(*format),
                    Anonymous: D3D12_CLEAR_VALUE_0 { DepthStencil: D3D12_DEPTH_STENCIL_VALUE { Depth: 1.0, Stencil: 0 } },
                }
            } else {
                D3D12_CLEAR_VALUE { Format: data_format(*format), Anonymous: D3D12_CLEAR_VALUE_0 { Color: [0.0; 4] } }
            };
            let initial = if depth { ImageState::DepthWrite } else { ImageState::RenderTarget };
            let image = Dx12Image::with_state(Arc::clone(&self.ctx), &specification, initial, Some(clear_value))?;
            attachments.push((*slot, image));

            if multisampled && !depth {
                let specification = ImageSpecification { multi_sampling_count: MultiSamplingCount::X1, ..specification };
                let resolve = Dx12Image::with_state(
                    Arc::clone(&self.ctx),
                    &specification,
                    ImageState::resting(specification.usage),
                    None,
                )?;
                resolves.push((*slot, resolve));
            }
        }

        let frame = RasterizerFrame { attachments, resolves };
        let mut color = 0;
        for (slot, image) in &frame.attachments {
            if slot.has_depth_stencil() {
                let handle = self.dsv_handle(frame_index)?;
                unsafe { self.ctx.device.CreateDepthStencilView(&*image.resource, None, handle) };
            } else {
                let handle = self.rtv_handle(frame_index, color)?;
                unsafe { self.ctx.device.CreateRenderTargetView(&*image.resource, None, handle) };
                color += 1;
            }
        }
        Ok(frame)
    }

    fn is_multisampled(&self) -> bool {
        self.multi_sampling_count != MultiSamplingCount::X1
    }

    fn rtv_handle(&self, frame_index: u32, color: u32) -> Result<D3D12_CPU_DESCRIPTOR_HANDLE> {
        match &self.rtv_heap {
            Some(heap) => Ok(heap.handle(frame_index * self.color_count + color)),
            None => engine_bail!(SOURCE, "Rasterizer has no color attachment"),
        }
    }

    fn dsv_handle(&self, frame_index: u32) -> Result<D3D12_CPU_DESCRIPTOR_HANDLE> {
        match &self.dsv_heap {
            Some(heap) => Ok(heap.handle(frame_index)),
            None => engine_bail!(SOURCE, "Rasterizer has no depth attachment"),
        }
    }

    /// Formats pipelines drawing into this rasterizer are compiled for
    pub(crate) fn rtv_formats(&self) -> Vec<DXGI_FORMAT> {
        self.layout
            .iter()
            .filter(|(slot, _)| !slot.has_depth_stencil())
            .map(|(_, format)| data_format(*format))
            .collect()
    }

    pub(crate) fn dsv_format(&self) -> DXGI_FORMAT {
        self.layout
            .iter()
            .find(|(slot, _)| slot.has_depth_stencil())
            .map(|(_, format)| data_format(*format))
            .unwrap_or(DXGI_FORMAT_UNKNOWN)
    }

    pub(crate) fn color_count(&self) -> u32 {
        self.color_count
    }

    /// Advance to the next frame, then bind and clear its attachments
    ///
    /// `clear_values` is already completed to one value per attachment.
    /// The returned frame is ended with `RasterizerFrame::end`.
    pub(crate) fn begin_frame(
        &self,
        list: &ID3D12GraphicsCommandList,
        clear_values: &[ClearValue],
    ) -> Result<Arc<RasterizerFrame>> {
        let frame_index = self.bind_count.fetch_add(1, Ordering::AcqRel) % self.frames.len() as u32;
        let frame = Arc::clone(&self.frames[frame_index as usize]);

        for (slot, image) in &frame.attachments {
            let state = if slot.has_depth_stencil() { ImageState::DepthWrite } else { ImageState::RenderTarget };
            image.record_transition(list, state);
        }

        let rtv_handles = (0..self.color_count)
            .map(|color| self.rtv_handle(frame_index, color))
            .collect::<Result<Vec<_>>>()?;
        let dsv_handle = match self.dsv_heap {
            Some(_) => Some(self.dsv_handle(frame_index)?),
            None => None,
        };

        unsafe {
            list.OMSetRenderTargets(
                rtv_handles.len() as u32,
                (!rtv_handles.is_empty()).then_some(rtv_handles.as_ptr()),
                FALSE,
                dsv_handle.as_ref().map(|handle| handle as *const _),
            );

            let mut color = 0;
            for ((slot, _), clear) in frame.attachments.iter().zip(clear_values) {
                match (slot.has_depth_stencil(), clear) {
                    (false, ClearValue::Color(rgba)) => {
                        list.ClearRenderTargetView(rtv_handles[color], rgba, None);
                        color += 1;
                    }
                    (true, ClearValue::DepthStencil { depth, stencil }) => {
                        if let Some(handle) = dsv_handle {
                            let mut flags = D3D12_CLEAR_FLAG_DEPTH;
                            if slot.contains(AttachmentType::STENCIL) {
                                flags |= D3D12_CLEAR_FLAG_STENCIL;
                            }
                            list.ClearDepthStencilView(handle, flags, *depth, *stencil as u8, &[]);
                        }
                    }
                    (_, clear) => {
                        engine_bail!(SOURCE, "Clear value {:?} does not fit the {:?} attachment", clear, slot);
                    }
                }
            }
        }
        Ok(frame)
    }

    fn current_frame(&self) -> &RasterizerFrame {
        &self.frames[self.frame_index() as usize]
    }
}

impl Rasterizer for Dx12Rasterizer {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn attachment_types(&self) -> AttachmentType {
        self.attachment_types
    }

    fn multi_sampling_count(&self) -> MultiSamplingCount {
        self.multi_sampling_count
    }

    fn is_triple_buffering_enabled(&self) -> bool {
        self.triple_buffering
    }

    fn frame_index(&self) -> u32 {
        let binds = self.bind_count.load(Ordering::Acquire);
        binds.saturating_sub(1) % self.frames.len().max(1) as u32
    }

    fn image_attachment(&self, attachment: AttachmentType) -> Option<&dyn Image> {
        let frame = self.current_frame();
        // Multisampled color is read through its resolve target
        frame
            .resolves
            .iter()
            .chain(frame.attachments.iter())
            .find(|(slot, _)| *slot == attachment || (slot.has_depth_stencil() && attachment.has_depth_stencil()))
            .map(|(_, image)| image as &dyn Image)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
