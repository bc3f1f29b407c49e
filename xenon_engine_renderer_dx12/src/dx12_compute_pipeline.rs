/// Dx12ComputePipeline - compute PSO cached under its shader's content hash

use std::any::Any;
use std::sync::Arc;

use windows::Win32::Graphics::Direct3D12::{D3D12_COMPUTE_PIPELINE_STATE_DESC, D3D12_PIPELINE_STATE_FLAG_NONE};
use xenon_engine::xenon::backend::{
    build_with_cache_retry, ComputePipeline, Descriptor, DescriptorType, PipelineCache, PipelineCacheHandler, Shader,
    ShaderBindingMap, ShaderType,
};
use xenon_engine::xenon::Result;
use xenon_engine::{engine_bail, engine_debug};

use crate::dx12_context::GpuContext;
use crate::dx12_root_signature::{bytecode, Dx12PipelineLayout, Dx12PipelineState};

const SOURCE: &str = "xenon::dx12::ComputePipeline";

/// Direct3D 12 compute pipeline implementation
pub struct Dx12ComputePipeline {
    shader: Shader,
    pub(crate) layout: Arc<Dx12PipelineLayout>,
    pub(crate) pipeline: Dx12PipelineState,
}

impl Dx12ComputePipeline {
    pub(crate) fn new(
        ctx: Arc<GpuContext>,
        cache_handler: Option<Box<dyn PipelineCacheHandler>>,
        shader: &Shader,
    ) -> Result<Self> {
        if !shader.dxil().is_valid() {
            engine_bail!(SOURCE, "A compute pipeline needs a shader with a DXIL binary");
        }

        let binding_map = ShaderBindingMap::from_stages(&[(shader, ShaderType::COMPUTE)]);
        let layout = Arc::new(Dx12PipelineLayout::new(Arc::clone(&ctx), binding_map, false)?);

        let cache = PipelineCache::new(cache_handler);
        let hash = shader.content_hash();
        let cache_data = cache.load(hash);

        let pipeline = build_with_cache_retry(&cache_data, |data| {
            Dx12PipelineState::build(data, |cached| {
                let desc = D3D12_COMPUTE_PIPELINE_STATE_DESC {
                    pRootSignature: unsafe { std::mem::transmute_copy(&layout.root_signature) },
                    CS: bytecode(shader.dxil()),
                    NodeMask: 0,
                    CachedPSO: cached,
                    Flags: D3D12_PIPELINE_STATE_FLAG_NONE,
                };
                unsafe { ctx.device.CreateComputePipelineState(&desc) }
            })
        })?;
        cache.store(hash, &pipeline.cache_data()?);

        engine_debug!(SOURCE, "Created compute pipeline {:#018x}", hash);
        Ok(Self { shader: shader.clone(), layout, pipeline })
    }
}

impl ComputePipeline for Dx12ComputePipeline {
    fn shader(&self) -> &Shader {
        &self.shader
    }

    fn create_descriptor(&self, descriptor_type: DescriptorType) -> Result<Box<dyn Descriptor>> {
        self.layout.create_descriptor(descriptor_type)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
