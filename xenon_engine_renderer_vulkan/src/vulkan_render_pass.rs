/// VulkanRenderPass - render pass shared by a rasterizer and its pipelines
///
/// Attachment order: color-like attachments, then depth/stencil, then one
/// single-sample resolve attachment per color attachment when multisampling.

use std::sync::Arc;

use ash::vk;
use xenon_engine::xenon::backend::{attachment_layout, AttachmentType, DataFormat, MultiSamplingCount};
use xenon_engine::xenon::Result;
use xenon_engine::engine_err;

use crate::vulkan_context::GpuContext;
use crate::vulkan_conversions::{data_format, sample_count};

const SOURCE: &str = "xenon::vulkan::RenderPass";

/// Layout color attachments are left in: ready to be sampled or copied
pub(crate) const COLOR_FINAL_LAYOUT: vk::ImageLayout = vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL;
pub(crate) const DEPTH_FINAL_LAYOUT: vk::ImageLayout = vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL;

/// Vulkan render pass implementation
pub(crate) struct VulkanRenderPass {
    ctx: Arc<GpuContext>,
    /// Vulkan render pass handle
    pub(crate) render_pass: vk::RenderPass,
    pub(crate) layout: Vec<(AttachmentType, DataFormat)>,
    pub(crate) color_count: u32,
    pub(crate) multi_sampling_count: MultiSamplingCount,
}

impl VulkanRenderPass {
    pub(crate) fn new(
        ctx: Arc<GpuContext>,
        attachment_types: AttachmentType,
        multi_sampling_count: MultiSamplingCount,
    ) -> Result<Self> {
        let layout = attachment_layout(attachment_types);
        let samples = sample_count(multi_sampling_count);
        let resolve = multi_sampling_count != MultiSamplingCount::X1;

        let mut attachments = Vec::with_capacity(layout.len() * 2);
        let mut color_refs = Vec::new();
        let mut resolve_refs = Vec::new();
        let mut depth_ref: Option<vk::AttachmentReference> = None;

        for (slot, format) in &layout {
            let index = attachments.len() as u32;
            if slot.has_depth_stencil() {
                attachments.push(
                    vk::AttachmentDescription::default()
                        .format(data_format(*format))
                        .samples(samples)
                        .load_op(vk::AttachmentLoadOp::CLEAR)
                        .store_op(vk::AttachmentStoreOp::STORE)
                        .stencil_load_op(vk::AttachmentLoadOp::CLEAR)
                        .stencil_store_op(vk::AttachmentStoreOp::STORE)
                        .initial_layout(vk::ImageLayout::UNDEFINED)
                        .final_layout(DEPTH_FINAL_LAYOUT),
                );
                depth_ref = Some(
                    vk::AttachmentReference::default()
                        .attachment(index)
                        .layout(vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL),
                );
            } else {
                // A multisampled color attachment is only kept through its resolve
                let (store_op, final_layout) = if resolve {
                    (vk::AttachmentStoreOp::DONT_CARE, vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL)
                } else {
                    (vk::AttachmentStoreOp::STORE, COLOR_FINAL_LAYOUT)
                };
                attachments.push(
                    vk::AttachmentDescription::default()
                        .format(data_format(*format))
                        .samples(samples)
                        .load_op(vk::AttachmentLoadOp::CLEAR)
                        .store_op(store_op)
                        .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
                        .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
                        .initial_layout(vk::ImageLayout::UNDEFINED)
                        .final_layout(final_layout),
                );
                color_refs.push(
                    vk::AttachmentReference::default()
                        .attachment(index)
                        .layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL),
                );
            }
        }

        if resolve {
            for (_, format) in layout.iter().filter(|(slot, _)| !slot.has_depth_stencil()) {
                resolve_refs.push(
                    vk::AttachmentReference::default()
                        .attachment(attachments.len() as u32)
                        .layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL),
                );
                attachments.push(
                    vk::AttachmentDescription::default()
                        .format(data_format(*format))
                        .samples(vk::SampleCountFlags::TYPE_1)
                        .load_op(vk::AttachmentLoadOp::DONT_CARE)
                        .store_op(vk::AttachmentStoreOp::STORE)
                        .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
                        .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
                        .initial_layout(vk::ImageLayout::UNDEFINED)
                        .final_layout(COLOR_FINAL_LAYOUT),
                );
            }
        }

        let mut subpass = vk::SubpassDescription::default()
            .pipeline_bind_point(vk::PipelineBindPoint::GRAPHICS)
            .color_attachments(&color_refs);
        if resolve {
            subpass = subpass.resolve_attachments(&resolve_refs);
        }
        if let Some(ref depth_ref) = depth_ref {
            subpass = subpass.depth_stencil_attachment(depth_ref);
        }

        // Include depth stages when a depth attachment is present
        let (stage_mask, access_mask) = if depth_ref.is_some() {
            (
                vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT | vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS,
                vk::AccessFlags::COLOR_ATTACHMENT_WRITE | vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE,
            )
        } else {
            (vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT, vk::AccessFlags::COLOR_ATTACHMENT_WRITE)
        };

        let dependencies = [
            vk::SubpassDependency::default()
                .src_subpass(vk::SUBPASS_EXTERNAL)
                .dst_subpass(0)
                .src_stage_mask(stage_mask)
                .src_access_mask(vk::AccessFlags::empty())
                .dst_stage_mask(stage_mask)
                .dst_access_mask(access_mask),
            vk::SubpassDependency::default()
                .src_subpass(0)
                .dst_subpass(vk::SUBPASS_EXTERNAL)
                .src_stage_mask(stage_mask)
                .src_access_mask(access_mask)
                .dst_stage_mask(vk::PipelineStageFlags::FRAGMENT_SHADER | vk::PipelineStageFlags::TRANSFER)
                .dst_access_mask(vk::AccessFlags::SHADER_READ | vk::AccessFlags::TRANSFER_READ),
        ];

        let render_pass_info = vk::RenderPassCreateInfo::default()
            .attachments(&attachments)
            .subpasses(std::slice::from_ref(&subpass))
            .dependencies(&dependencies);

        let render_pass = unsafe { ctx.device.create_render_pass(&render_pass_info, None) }
            .map_err(|e| engine_err!(SOURCE, "Failed to create render pass: {:?}", e))?;

        Ok(Self {
            ctx,
            render_pass,
            color_count: color_refs.len() as u32,
            layout,
            multi_sampling_count,
        })
    }

    pub(crate) fn has_depth(&self) -> bool {
        self.layout.iter().any(|(slot, _)| slot.has_depth_stencil())
    }
}

impl Drop for VulkanRenderPass {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device.destroy_render_pass(self.render_pass, None);
        }
    }
}
