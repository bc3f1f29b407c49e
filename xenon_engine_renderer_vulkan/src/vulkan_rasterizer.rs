/// VulkanRasterizer - attachments and framebuffers of a render target
///
/// With triple buffering every frame owns its own attachments. Binding the
/// rasterizer advances to the next frame; `image_attachment` then returns the
/// images of the most recently bound frame.

use std::any::Any;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use ash::vk;
use xenon_engine::xenon::backend::{
    AttachmentType, Image, ImageSpecification, ImageUsage, MultiSamplingCount, Rasterizer,
};
use xenon_engine::xenon::Result;
use xenon_engine::{engine_bail, engine_debug, engine_err};

use crate::vulkan_context::GpuContext;
use crate::vulkan_image::VulkanImage;
use crate::vulkan_render_pass::{VulkanRenderPass, COLOR_FINAL_LAYOUT, DEPTH_FINAL_LAYOUT};

const SOURCE: &str = "xenon::vulkan::Rasterizer";

/// Attachments of one frame
struct RasterizerFrame {
    /// In render pass order
    attachments: Vec<(AttachmentType, VulkanImage)>,
    /// Single-sample targets of the color attachments when multisampling
    resolves: Vec<(AttachmentType, VulkanImage)>,
    framebuffer: vk::Framebuffer,
}

/// Vulkan rasterizer implementation
pub struct VulkanRasterizer {
    ctx: Arc<GpuContext>,
    pub(crate) render_pass: Arc<VulkanRenderPass>,
    width: u32,
    height: u32,
    attachment_types: AttachmentType,
    multi_sampling_count: MultiSamplingCount,
    triple_buffering: bool,
    frames: Vec<RasterizerFrame>,
    bind_count: AtomicU32,
}

impl VulkanRasterizer {
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

        let render_pass = Arc::new(VulkanRenderPass::new(ctx.clone(), attachment_types, multi_sampling_count)?);

        let frame_count = if enable_triple_buffering { 3 } else { 1 };
        let mut rasterizer = Self {
            ctx,
            render_pass,
            width,
            height,
            attachment_types,
            multi_sampling_count,
            triple_buffering: enable_triple_buffering,
            frames: Vec::with_capacity(frame_count),
            bind_count: AtomicU32::new(0),
        };
        // Frames created so far are released by Drop if a later one fails
        for _ in 0..frame_count {
            let frame = rasterizer.create_frame()?;
            rasterizer.frames.push(frame);
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

    fn create_frame(&self) -> Result<RasterizerFrame> {
        let multisampled = self.multi_sampling_count != MultiSamplingCount::X1;
        let mut attachments = Vec::new();
        let mut resolves = Vec::new();

        for (slot, format) in &self.render_pass.layout {
            let usage = if slot.has_depth_stencil() {
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
            attachments.push((*slot, VulkanImage::new(self.ctx.clone(), &specification)?));

            if multisampled && !slot.has_depth_stencil() {
                let specification = ImageSpecification {
                    multi_sampling_count: MultiSamplingCount::X1,
                    ..specification
                };
                resolves.push((*slot, VulkanImage::new(self.ctx.clone(), &specification)?));
            }
        }

        let views: Vec<vk::ImageView> = attachments
            .iter()
            .chain(resolves.iter())
            .map(|(_, image)| image.view)
            .collect();

        let framebuffer_info = vk::FramebufferCreateInfo::default()
            .render_pass(self.render_pass.render_pass)
            .attachments(&views)
            .width(self.width)
            .height(self.height)
            .layers(1);

        let framebuffer = unsafe { self.ctx.device.create_framebuffer(&framebuffer_info, None) }
            .map_err(|e| engine_err!(SOURCE, "Failed to create framebuffer: {:?}", e))?;

        Ok(RasterizerFrame { attachments, resolves, framebuffer })
    }

    /// Advance to the next frame and return its framebuffer
    ///
    /// The tracked layouts of the frame's images are set to the layouts the
    /// render pass leaves them in.
    pub(crate) fn begin_frame(&self) -> vk::Framebuffer {
        let index = self.bind_count.fetch_add(1, Ordering::AcqRel) as usize % self.frames.len();
        let frame = &self.frames[index];
        for (slot, image) in &frame.attachments {
            if slot.has_depth_stencil() {
                image.set_layout(DEPTH_FINAL_LAYOUT);
            } else if frame.resolves.is_empty() {
                image.set_layout(COLOR_FINAL_LAYOUT);
            } else {
                image.set_layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL);
            }
        }
        for (_, image) in &frame.resolves {
            image.set_layout(COLOR_FINAL_LAYOUT);
        }
        frame.framebuffer
    }

    pub(crate) fn extent(&self) -> vk::Extent2D {
        vk::Extent2D { width: self.width, height: self.height }
    }

    fn current_frame(&self) -> &RasterizerFrame {
        &self.frames[self.frame_index() as usize]
    }
}

impl Rasterizer for VulkanRasterizer {
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

impl Drop for VulkanRasterizer {
    fn drop(&mut self) {
        unsafe {
            for frame in &self.frames {
                self.ctx.device.destroy_framebuffer(frame.framebuffer, None);
            }
        }
    }
}
