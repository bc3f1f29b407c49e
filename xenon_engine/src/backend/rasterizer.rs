/// Rasterizer (render pass + attachments) trait

use std::any::Any;

use crate::backend::image::Image;
use crate::backend::types::{AttachmentType, ClearValue, DataFormat, MultiSamplingCount};

/// Format of one attachment slot
pub fn attachment_format(attachment: AttachmentType, types: AttachmentType) -> DataFormat {
    if attachment == AttachmentType::COLOR {
        DataFormat::R8G8B8A8_UNORM
    } else if attachment == AttachmentType::ENTITY_ID {
        DataFormat::R32_SFLOAT
    } else if attachment == AttachmentType::NORMAL {
        DataFormat::R32G32B32A32_SFLOAT
    } else if attachment.intersects(AttachmentType::DEPTH | AttachmentType::STENCIL) {
        if types.contains(AttachmentType::STENCIL) {
            DataFormat::D32_SFLOAT_S8_UINT
        } else {
            DataFormat::D32_SFLOAT
        }
    } else {
        DataFormat::Undefined
    }
}

/// Attachments of a rasterizer in render pass order: color-like ones, then depth/stencil
pub fn attachment_layout(types: AttachmentType) -> Vec<(AttachmentType, DataFormat)> {
    let mut layout: Vec<_> = AttachmentType::COLOR_ORDER
        .iter()
        .filter(|t| types.contains(**t))
        .map(|t| (*t, attachment_format(*t, types)))
        .collect();

    if types.has_depth_stencil() {
        let slot = types & (AttachmentType::DEPTH | AttachmentType::STENCIL);
        layout.push((slot, attachment_format(slot, types)));
    }
    layout
}

/// Clear values matching `attachment_layout`
pub fn default_clear_values(types: AttachmentType) -> Vec<ClearValue> {
    attachment_layout(types)
        .into_iter()
        .map(|(slot, _)| {
            if slot.has_depth_stencil() {
                ClearValue::DepthStencil { depth: 1.0, stencil: 0 }
            } else {
                ClearValue::Color([0.0, 0.0, 0.0, 0.0])
            }
        })
        .collect()
}

/// Render target drawn into by rasterizing pipelines
pub trait Rasterizer: Send + Sync {
    fn width(&self) -> u32;

    fn height(&self) -> u32;

    fn attachment_types(&self) -> AttachmentType;

    fn multi_sampling_count(&self) -> MultiSamplingCount;

    fn is_triple_buffering_enabled(&self) -> bool;

    fn frame_index(&self) -> u32;

    /// Image of one attachment of the current frame
    fn image_attachment(&self, attachment: AttachmentType) -> Option<&dyn Image>;

    fn as_any(&self) -> &dyn Any;
}

impl dyn Rasterizer + '_ {
    pub fn downcast_ref<T: Rasterizer + 'static>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }
}
