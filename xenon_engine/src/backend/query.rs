/// Occlusion query trait

use std::any::Any;

use crate::error::Result;

/// Pool of occlusion samples written by `CommandRecorder::begin_query` / `end_query`
pub trait OcclusionQuery: Send + Sync {
    fn sample_count(&self) -> u64;

    /// Passed-sample counts of every query, valid after the resolving recorder completed
    fn samples(&self) -> Result<Vec<u64>>;

    fn as_any(&self) -> &dyn Any;
}

impl dyn OcclusionQuery + '_ {
    pub fn downcast_ref<T: OcclusionQuery + 'static>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }
}
