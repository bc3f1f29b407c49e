/// Dx12OcclusionQuery - occlusion query heap with a readback buffer
///
/// `CommandRecorder::resolve_query` resolves the heap into a readback-heap
/// buffer; `samples` reads that buffer, so it is only meaningful once the
/// resolving submission completed.

use std::any::Any;
use std::sync::Arc;

use windows::Win32::Graphics::Direct3D12::{
    ID3D12GraphicsCommandList, ID3D12QueryHeap, D3D12_QUERY_HEAP_DESC, D3D12_QUERY_HEAP_TYPE_OCCLUSION,
    D3D12_QUERY_TYPE_OCCLUSION,
};
use xenon_engine::xenon::backend::{BufferType, MemoryLocation, OcclusionQuery, ResourceState};
use xenon_engine::xenon::{Error, Result};
use xenon_engine::{engine_bail, engine_err, engine_error, engine_trace};

use crate::dx12_buffer::Dx12Buffer;
use crate::dx12_context::GpuContext;

const SOURCE: &str = "xenon::dx12::OcclusionQuery";

/// Direct3D 12 occlusion query implementation
pub struct Dx12OcclusionQuery {
    pub(crate) heap: ID3D12QueryHeap,
    results: Dx12Buffer,
    sample_count: u64,
}

impl Dx12OcclusionQuery {
    pub(crate) fn new(ctx: Arc<GpuContext>, sample_count: u64) -> Result<Self> {
        let Ok(query_count) = u32::try_from(sample_count) else {
            engine_bail!(SOURCE, "Occlusion query sample count {} is too large", sample_count);
        };
        if query_count == 0 {
            engine_bail!(SOURCE, "An occlusion query needs at least one sample");
        }

        // Readback heap resources stay in the copy destination state
        let results = Dx12Buffer::with_placement(
            Arc::clone(&ctx),
            "occlusion query results",
            sample_count * size_of::<u64>() as u64,
            BufferType::BackendSpecific,
            MemoryLocation::GpuToCpu,
            ResourceState::CopyDestination,
        )?;

        let desc = D3D12_QUERY_HEAP_DESC { Type: D3D12_QUERY_HEAP_TYPE_OCCLUSION, Count: query_count, NodeMask: 0 };
        let mut heap: Option<ID3D12QueryHeap> = None;
        let created = unsafe { ctx.device.CreateQueryHeap(&desc, &mut heap) };
        let heap = match (created, heap) {
            (Ok(()), Some(heap)) => heap,
            (result, _) => engine_bail!(SOURCE, "Failed to create occlusion query heap: {:?}", result.err()),
        };

        engine_trace!(SOURCE, "Created occlusion query with {} samples", sample_count);
        Ok(Self { heap, results, sample_count })
    }

    pub(crate) fn check_index(&self, index: u32) -> Result<()> {
        if u64::from(index) >= self.sample_count {
            let message = format!("Query index {} is out of range (sample count {})", index, self.sample_count);
            engine_error!(SOURCE, "{}", message);
            return Err(Error::InvalidResource(message));
        }
        Ok(())
    }

    /// Resolve every query into the readback buffer
    pub(crate) fn record_resolve(&self, list: &ID3D12GraphicsCommandList) {
        unsafe {
            list.ResolveQueryData(
                &self.heap,
                D3D12_QUERY_TYPE_OCCLUSION,
                0,
                self.sample_count as u32,
                &*self.results.resource,
                0,
            );
        }
    }
}

impl OcclusionQuery for Dx12OcclusionQuery {
    fn sample_count(&self) -> u64 {
        self.sample_count
    }

    fn samples(&self) -> Result<Vec<u64>> {
        let bytes = self
            .results
            .read_mapped()
            .map_err(|_| engine_err!(SOURCE, "Occlusion query results are not readable"))?;
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
