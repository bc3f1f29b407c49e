/// Per-vertex-layout pipeline specialization cache
///
/// Rasterizing pipelines compile one backend pipeline object per distinct
/// vertex layout. `PipelineSpecializations` owns those objects keyed by
/// `VertexSpecification::generate_hash`, and `PipelineCache` wraps the
/// optional cache handler used to persist the compiled blobs. Both are shared
/// by the Vulkan and DirectX 12 backends, which only provide a
/// `SpecializationBuilder`.

use std::sync::{Arc, Mutex};

use rustc_hash::FxHashMap;

use crate::backend::pipeline_cache::{pipeline_cache_key, PipelineCacheHandler};
use crate::backend::vertex::{VertexInputState, VertexSpecification};
use crate::error::{Error, Result};
use crate::{engine_debug, engine_error, engine_info};

// ===== PIPELINE CACHE =====

/// Optional persistence of compiled pipeline blobs
pub struct PipelineCache {
    handler: Option<Box<dyn PipelineCacheHandler>>,
}

impl PipelineCache {
    pub fn new(handler: Option<Box<dyn PipelineCacheHandler>>) -> Self {
        Self { handler }
    }

    pub fn has_handler(&self) -> bool {
        self.handler.is_some()
    }

    /// Load the blob for a discriminant hash; empty when there is none
    pub fn load(&self, hash: u64) -> Vec<u8> {
        match &self.handler {
            Some(handler) => handler.load(pipeline_cache_key(hash)),
            None => {
                engine_info!("xenon::Pipeline", "A pipeline cache handler was not set to load the pipeline cache.");
                Vec::new()
            }
        }
    }

    /// Persist the blob for a discriminant hash
    pub fn store(&self, hash: u64, bytes: &[u8]) {
        match &self.handler {
            Some(handler) => handler.store(pipeline_cache_key(hash), bytes),
            None => {
                engine_info!("xenon::Pipeline", "A pipeline cache handler was not set to save the pipeline cache.");
            }
        }
    }
}

/// Run `build` with `cache_data`, retrying once without it if the backend
/// reports `Error::InvalidPipelineCache`
pub fn build_with_cache_retry<T>(cache_data: &[u8], mut build: impl FnMut(&[u8]) -> Result<T>) -> Result<T> {
    match build(cache_data) {
        Err(Error::InvalidPipelineCache(reason)) if !cache_data.is_empty() => {
            engine_error!(
                "xenon::Pipeline",
                "The backend rejected the pipeline cache data ({}). Trying without the cache data.",
                reason
            );
            build(&[])
        }
        other => other,
    }
}

// ===== SPECIALIZATIONS =====

/// Backend hook compiling one pipeline object for a resolved vertex input state
pub trait SpecializationBuilder {
    type Pipeline: Send + Sync;

    /// Compile a pipeline seeded with `cache_data` (possibly empty)
    ///
    /// Must return `Error::InvalidPipelineCache` when the backend rejects the
    /// cache bytes, so the caller can retry without them.
    fn build(&self, input: &VertexInputState, cache_data: &[u8]) -> Result<Self::Pipeline>;

    /// Serialize the pipeline cache of a compiled pipeline
    fn cache_data(&self, pipeline: &Self::Pipeline) -> Result<Vec<u8>>;
}

/// A compiled pipeline for one vertex layout
#[derive(Debug)]
pub struct Specialization<P> {
    hash: u64,
    input: VertexInputState,
    pipeline: P,
}

impl<P> Specialization<P> {
    /// Vertex layout hash this specialization was built for
    pub fn hash(&self) -> u64 {
        self.hash
    }

    /// Resolved vertex input state
    pub fn input(&self) -> &VertexInputState {
        &self.input
    }

    /// Backend pipeline object
    pub fn pipeline(&self) -> &P {
        &self.pipeline
    }
}

/// Lazily built specializations of one pipeline
///
/// The whole lookup-or-build-and-insert sequence runs under one mutex, so at
/// most one backend object is ever compiled per vertex layout hash.
pub struct PipelineSpecializations<P> {
    base_input: VertexInputState,
    cache: PipelineCache,
    entries: Mutex<FxHashMap<u64, Arc<Specialization<P>>>>,
}

impl<P: Send + Sync> PipelineSpecializations<P> {
    /// # Arguments
    ///
    /// * `base_input` - Vertex input state derived from the vertex shader
    /// * `cache_handler` - Optional persistence of compiled blobs
    pub fn new(base_input: VertexInputState, cache_handler: Option<Box<dyn PipelineCacheHandler>>) -> Self {
        Self {
            base_input,
            cache: PipelineCache::new(cache_handler),
            entries: Mutex::new(FxHashMap::default()),
        }
    }

    pub fn base_input(&self) -> &VertexInputState {
        &self.base_input
    }

    pub fn cache(&self) -> &PipelineCache {
        &self.cache
    }

    /// Return the specialization for `specification`, building it on first use
    pub fn get_or_build<B>(&self, builder: &B, specification: &VertexSpecification) -> Result<Arc<Specialization<P>>>
    where
        B: SpecializationBuilder<Pipeline = P> + ?Sized,
    {
        let hash = specification.generate_hash();
        let mut entries = self.lock_entries()?;

        if let Some(entry) = entries.get(&hash) {
            return Ok(Arc::clone(entry));
        }

        let cache_data = self.cache.load(hash);
        let input = self.base_input.resolve(specification)?;
        let pipeline = build_with_cache_retry(&cache_data, |data| builder.build(&input, data))?;
        self.cache.store(hash, &builder.cache_data(&pipeline)?);

        engine_debug!("xenon::Pipeline", "Built pipeline specialization {:#018x}", hash);

        let entry = Arc::new(Specialization { hash, input, pipeline });
        entries.insert(hash, Arc::clone(&entry));
        Ok(entry)
    }

    /// Rebuild every specialization and persist each cache again
    ///
    /// Entries are replaced: callers still holding an old `Arc` keep a valid
    /// (stale) pipeline until they drop it.
    pub fn recreate<B>(&self, builder: &B) -> Result<()>
    where
        B: SpecializationBuilder<Pipeline = P> + ?Sized,
    {
        let mut entries = self.lock_entries()?;

        for entry in entries.values_mut() {
            let cache_data = builder.cache_data(&entry.pipeline)?;
            let pipeline = build_with_cache_retry(&cache_data, |data| builder.build(&entry.input, data))?;
            self.cache.store(entry.hash, &builder.cache_data(&pipeline)?);

            *entry = Arc::new(Specialization {
                hash: entry.hash,
                input: entry.input.clone(),
                pipeline,
            });
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, specification: &VertexSpecification) -> bool {
        self.entries
            .lock()
            .map(|e| e.contains_key(&specification.generate_hash()))
            .unwrap_or(false)
    }

    fn lock_entries(&self) -> Result<std::sync::MutexGuard<'_, FxHashMap<u64, Arc<Specialization<P>>>>> {
        self.entries
            .lock()
            .map_err(|_| Error::BackendError("Pipeline specialization map lock poisoned".to_string()))
    }
}

#[cfg(test)]
#[path = "specialization_tests.rs"]
mod tests;
