/// File-backed pipeline cache handler
///
/// One file per key, `<directory>/<decimal key>.bin`, holding the raw blob
/// returned by the backend. No header, no checksum: a stale or corrupt blob is
/// detected by the backend and handled by the pipeline's retry path.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::backend::PipelineCacheHandler;
use crate::{engine_trace, engine_warn};

pub struct DefaultCacheHandler {
    directory: PathBuf,
}

impl DefaultCacheHandler {
    /// Create a handler storing its files in `directory` (created on first store)
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self { directory: directory.into() }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Path of the file holding `key`
    pub fn path_for(&self, key: u64) -> PathBuf {
        self.directory.join(format!("{}.bin", key))
    }
}

impl PipelineCacheHandler for DefaultCacheHandler {
    fn load(&self, key: u64) -> Vec<u8> {
        let path = self.path_for(key);
        match fs::read(&path) {
            Ok(bytes) => {
                engine_trace!("xenon::CacheHandler", "Loaded {} bytes from {}", bytes.len(), path.display());
                bytes
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Vec::new(),
            Err(e) => {
                engine_warn!("xenon::CacheHandler", "Failed to read {}: {}", path.display(), e);
                Vec::new()
            }
        }
    }

    fn store(&self, key: u64, bytes: &[u8]) {
        if let Err(e) = fs::create_dir_all(&self.directory) {
            engine_warn!(
                "xenon::CacheHandler",
                "Failed to create cache directory {}: {}",
                self.directory.display(),
                e
            );
            return;
        }

        let path = self.path_for(key);
        if let Err(e) = fs::write(&path, bytes) {
            engine_warn!("xenon::CacheHandler", "Failed to write {}: {}", path.display(), e);
        }
    }
}

#[cfg(test)]
#[path = "cache_handler_tests.rs"]
mod tests;
