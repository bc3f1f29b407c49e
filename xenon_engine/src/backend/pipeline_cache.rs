/// Pipeline cache persistence interface and key derivation

/// Namespacing constant folded into every pipeline cache key
pub const PIPELINE_CACHE_MAGIC: u64 =
    0b0111110011100110101100111010010010001011111101111110001010110001;

/// Storage for backend-compiled pipeline cache blobs
///
/// Owned by a pipeline and only called by its specialization cache. An empty
/// `load` result means "no cache" and is never an error.
pub trait PipelineCacheHandler: Send + Sync {
    /// Load the blob previously stored under `key`
    fn load(&self, key: u64) -> Vec<u8>;

    /// Persist `bytes` under `key`
    fn store(&self, key: u64, bytes: &[u8]);
}

/// Cache key for a pipeline specialization
///
/// The discriminant hash (vertex layout hash for rasterizing pipelines, shader
/// content hash for compute and ray tracing pipelines) is XOR'ed with
/// `PIPELINE_CACHE_MAGIC` so pipeline blobs cannot collide with other caches
/// keyed by the same raw hash.
pub fn pipeline_cache_key(hash: u64) -> u64 {
    hash ^ PIPELINE_CACHE_MAGIC
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_is_an_involution() {
        let hash = 0x1234_5678_9ABC_DEF0;
        assert_eq!(pipeline_cache_key(pipeline_cache_key(hash)), hash);
        assert_eq!(pipeline_cache_key(0), PIPELINE_CACHE_MAGIC);
    }

    #[test]
    fn test_key_never_equals_raw_hash() {
        for hash in [0u64, 1, 42, u64::MAX, PIPELINE_CACHE_MAGIC] {
            assert_ne!(pipeline_cache_key(hash), hash);
        }
    }

    #[test]
    fn test_distinct_hashes_stay_distinct() {
        let hashes = [0u64, 1, 2, 0xFFFF, u64::MAX, 0xDEAD_BEEF];
        for (i, a) in hashes.iter().enumerate() {
            for b in &hashes[i + 1..] {
                assert_ne!(pipeline_cache_key(*a), pipeline_cache_key(*b));
            }
        }
    }

    #[test]
    fn test_pipeline_keys_do_not_collide_with_raw_keys_of_another_domain() {
        // A shader-content cache stores under the raw hash; the pipeline cache
        // for the same numeric hash must land elsewhere.
        let shared_hash = 0x0BAD_F00D_u64;
        let shader_cache_key = shared_hash;
        let pipeline_key = pipeline_cache_key(shared_hash);
        assert_ne!(shader_cache_key, pipeline_key);
    }
}
