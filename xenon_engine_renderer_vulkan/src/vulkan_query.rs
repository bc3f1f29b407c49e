/// VulkanOcclusionQuery - occlusion query pool with a readback buffer
///
/// `CommandRecorder::resolve_query` copies the pool results into a
/// host-visible buffer; `samples` reads that buffer, so it is only meaningful
/// once the resolving submission completed.

use std::any::Any;
use std::sync::Arc;

use ash::vk;
use xenon_engine::xenon::backend::{Buffer, BufferType, MemoryLocation, OcclusionQuery, ResourceState};
use xenon_engine::xenon::{Error, Result};
use xenon_engine::{engine_bail, engine_err, engine_error, engine_trace};

use crate::vulkan_buffer::VulkanBuffer;
use crate::vulkan_context::GpuContext;

const SOURCE: &str = "xenon::vulkan::OcclusionQuery";

/// Vulkan occlusion query implementation
pub struct VulkanOcclusionQuery {
    ctx: Arc<GpuContext>,
    pub(crate) pool: vk::QueryPool,
    results: VulkanBuffer,
    sample_count: u64,
    precise: bool,
}

impl VulkanOcclusionQuery {
    pub(crate) fn new(ctx: Arc<GpuContext>, sample_count: u64) -> Result<Self> {
        let Ok(query_count) = u32::try_from(sample_count) else {
            engine_bail!(SOURCE, "Occlusion query sample count {} is too large", sample_count);
        };
        if query_count == 0 {
            engine_bail!(SOURCE, "An occlusion query needs at least one sample");
        }

        let precise = unsafe {
            ctx.instance
                .instance
                .get_physical_device_features(ctx.physical_device)
                .occlusion_query_precise
                == vk::TRUE
        };

        let results = VulkanBuffer::with_usage(
            Arc::clone(&ctx),
            "occlusion query results",
            sample_count * size_of::<u64>() as u64,
            BufferType::BackendSpecific,
            vk::BufferUsageFlags::TRANSFER_DST,
            MemoryLocation::GpuToCpu,
            ResourceState::CopyDestination,
        )?;

        let create_info = vk::QueryPoolCreateInfo::default()
            .query_type(vk::QueryType::OCCLUSION)
            .query_count(query_count);
        let pool = unsafe { ctx.device.create_query_pool(&create_info, None) }
            .map_err(|e| engine_err!(SOURCE, "Failed to create occlusion query pool: {:?}", e))?;

        engine_trace!(SOURCE, "Created occlusion query with {} samples (precise: {})", sample_count, precise);
        Ok(Self { ctx, pool, results, sample_count, precise })
    }

    pub(crate) fn check_index(&self, index: u32) -> Result<()> {
        if u64::from(index) >= self.sample_count {
            let message = format!("Query index {} is out of range (sample count {})", index, self.sample_count);
            engine_error!(SOURCE, "{}", message);
            return Err(Error::InvalidResource(message));
        }
        Ok(())
    }

    /// Precise counts when the device supports them, otherwise any-passed booleans
    pub(crate) fn control_flags(&self) -> vk::QueryControlFlags {
        if self.precise {
            vk::QueryControlFlags::PRECISE
        } else {
            vk::QueryControlFlags::empty()
        }
    }

    /// Copy every query result into the readback buffer
    pub(crate) fn record_resolve(&self, command_buffer: vk::CommandBuffer) {
        unsafe {
            self.ctx.device.cmd_copy_query_pool_results(
                command_buffer,
                self.pool,
                0,
                self.sample_count as u32,
                self.results.buffer,
                0,
                size_of::<u64>() as u64,
                vk::QueryResultFlags::TYPE_64 | vk::QueryResultFlags::WAIT,
            );
        }
    }
}

impl OcclusionQuery for VulkanOcclusionQuery {
    fn sample_count(&self) -> u64 {
        self.sample_count
    }

    fn samples(&self) -> Result<Vec<u64>> {
        let results: &dyn Buffer = &self.results;
        let bytes = results.read()?;
        Ok(bytes
            .chunks_exact(size_of::<u64>())
            .take(self.sample_count as usize)
            .map(|chunk| {
                let mut sample = [0u8; 8];
                sample.copy_from_slice(chunk);
                u64::from_ne_bytes(sample)
            })
            .collect())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for VulkanOcclusionQuery {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device.destroy_query_pool(self.pool, None);
        }
    }
}
