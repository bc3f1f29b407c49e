/// Content hashing shared by vertex layouts, shaders and pipeline cache keys

use xxhash_rust::xxh64::xxh64;

/// 64-bit XXH64 hash of `bytes`.
///
/// Empty input returns `seed` unchanged so that hashes can be chained over
/// optional blobs (a shader without DXIL hashes like its SPIR-V alone).
pub fn generate_hash(bytes: &[u8], seed: u64) -> u64 {
    if bytes.is_empty() {
        return seed;
    }
    xxh64(bytes, seed)
}

#[cfg(test)]
mod tests {
    use super::generate_hash;

    #[test]
    fn test_empty_input_returns_seed() {
        assert_eq!(generate_hash(&[], 0), 0);
        assert_eq!(generate_hash(&[], 1234), 1234);
    }

    #[test]
    fn test_hash_depends_on_content_and_seed() {
        let a = generate_hash(b"position", 0);
        assert_eq!(a, generate_hash(b"position", 0));
        assert_ne!(a, generate_hash(b"normal", 0));
        assert_ne!(a, generate_hash(b"position", 1));
    }
}
