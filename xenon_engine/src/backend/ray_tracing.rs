/// Acceleration structures and ray tracer traits

use std::any::Any;

use crate::backend::buffer::Buffer;
use crate::backend::image::Image;
use crate::backend::types::IndexBufferStride;
use crate::backend::vertex::VertexSpecification;

/// Triangle geometry of a bottom level acceleration structure
#[derive(Clone, Copy)]
pub struct AccelerationStructureGeometry<'a> {
    pub vertex_buffer: &'a dyn Buffer,
    pub vertex_specification: &'a VertexSpecification,
    pub vertex_count: u32,
    pub index_buffer: &'a dyn Buffer,
    pub index_stride: IndexBufferStride,
    pub index_count: u32,
}

impl AccelerationStructureGeometry<'_> {
    pub fn primitive_count(&self) -> u32 {
        self.index_count / 3
    }
}

pub trait BottomLevelAccelerationStructure: Send + Sync {
    fn geometry_count(&self) -> usize;

    /// Device address referenced by top level instances
    fn device_address(&self) -> u64;

    fn as_any(&self) -> &dyn Any;
}

pub trait TopLevelAccelerationStructure: Send + Sync {
    fn instance_count(&self) -> usize;

    fn as_any(&self) -> &dyn Any;
}

impl dyn TopLevelAccelerationStructure + '_ {
    pub fn downcast_ref<T: TopLevelAccelerationStructure + 'static>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }
}

/// Render target written by ray generation shaders
pub trait RayTracer: Send + Sync {
    fn width(&self) -> u32;

    fn height(&self) -> u32;

    /// Storage image rays are traced into
    fn image(&self) -> &dyn Image;

    fn as_any(&self) -> &dyn Any;
}

impl dyn RayTracer + '_ {
    pub fn downcast_ref<T: RayTracer + 'static>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }
}
