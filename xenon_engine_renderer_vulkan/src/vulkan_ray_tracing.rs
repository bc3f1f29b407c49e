/// Ray tracing objects on `VK_KHR_acceleration_structure` and `VK_KHR_ray_tracing_pipeline`
///
/// - Acceleration structures are built once, synchronously, when created.
/// - The ray tracing pipeline owns its shader binding table. Every general
///   shader (ray generation, miss, callable) gets its own record, and the hit
///   shaders of one `ShaderGroup` share a hit group record.

use std::any::Any;
use std::sync::Arc;

use ash::vk;
use xenon_engine::xenon::backend::{
    align_up, build_with_cache_retry, AccelerationStructureGeometry, BottomLevelAccelerationStructure, Buffer,
    BufferType, DataFormat, Descriptor, DescriptorType, Image, ImageSpecification, ImageUsage, InputElement,
    MemoryLocation, PipelineCache, PipelineCacheHandler, RayTracer, RayTracingPipeline,
    RayTracingPipelineSpecification, ResourceState, Shader, TopLevelAccelerationStructure,
};
use xenon_engine::xenon::Result;
use xenon_engine::{engine_bail, engine_debug, engine_err, engine_warn};

use crate::vulkan_buffer::VulkanBuffer;
use crate::vulkan_context::GpuContext;
use crate::vulkan_conversions::{index_type, vertex_format};
use crate::vulkan_image::VulkanImage;
use crate::vulkan_pipeline_layout::{ShaderModule, VulkanPipelineHandle, VulkanPipelineLayout};

const SOURCE: &str = "xenon::vulkan::RayTracing";

// ===== ACCELERATION STRUCTURES =====

/// Acceleration structure handle with the buffer backing it
struct AccelerationStructure {
    ctx: Arc<GpuContext>,
    handle: vk::AccelerationStructureKHR,
    _storage: VulkanBuffer,
}

impl AccelerationStructure {
    /// Create an acceleration structure of `ty` and build it from `geometries`
    fn build(
        ctx: &Arc<GpuContext>,
        ty: vk::AccelerationStructureTypeKHR,
        geometries: &[vk::AccelerationStructureGeometryKHR<'_>],
        primitive_counts: &[u32],
    ) -> Result<Self> {
        let ray_tracing = ctx.ray_tracing()?;

        let mut build_info = vk::AccelerationStructureBuildGeometryInfoKHR::default()
            .ty(ty)
            .flags(vk::BuildAccelerationStructureFlagsKHR::PREFER_FAST_TRACE)
            .mode(vk::BuildAccelerationStructureModeKHR::BUILD)
            .geometries(geometries);

        let mut sizes = vk::AccelerationStructureBuildSizesInfoKHR::default();
        unsafe {
            ray_tracing.acceleration_structure.get_acceleration_structure_build_sizes(
                vk::AccelerationStructureBuildTypeKHR::DEVICE,
                &build_info,
                primitive_counts,
                &mut sizes,
            );
        }

        let storage = VulkanBuffer::with_usage(
            Arc::clone(ctx),
            "acceleration structure",
            sizes.acceleration_structure_size,
            BufferType::BackendSpecific,
            vk::BufferUsageFlags::ACCELERATION_STRUCTURE_STORAGE_KHR | vk::BufferUsageFlags::SHADER_DEVICE_ADDRESS,
            MemoryLocation::GpuOnly,
            ResourceState::Common,
        )?;

        let create_info = vk::AccelerationStructureCreateInfoKHR::default()
            .buffer(storage.buffer)
            .size(sizes.acceleration_structure_size)
            .ty(ty);
        let handle = unsafe {
            ray_tracing
                .acceleration_structure
                .create_acceleration_structure(&create_info, None)
        }
        .map_err(|e| engine_err!(SOURCE, "Failed to create acceleration structure: {:?}", e))?;
        let structure = Self { ctx: Arc::clone(ctx), handle, _storage: storage };

        // Dropped once the build completed
        let scratch = VulkanBuffer::with_usage(
            Arc::clone(ctx),
            "acceleration structure scratch",
            sizes.build_scratch_size.max(1),
            BufferType::BackendSpecific,
            vk::BufferUsageFlags::STORAGE_BUFFER | vk::BufferUsageFlags::SHADER_DEVICE_ADDRESS,
            MemoryLocation::GpuOnly,
            ResourceState::Common,
        )?;

        build_info = build_info
            .dst_acceleration_structure(handle)
            .scratch_data(vk::DeviceOrHostAddressKHR { device_address: scratch.device_address() });

        let ranges: Vec<vk::AccelerationStructureBuildRangeInfoKHR> = primitive_counts
            .iter()
            .map(|count| vk::AccelerationStructureBuildRangeInfoKHR::default().primitive_count(*count))
            .collect();

        ctx.execute_one_shot(|command_buffer| unsafe {
            ray_tracing.acceleration_structure.cmd_build_acceleration_structures(
                command_buffer,
                &[build_info],
                &[&ranges],
            );
        })?;

        Ok(structure)
    }

    fn device_address(&self) -> vk::DeviceAddress {
        let info = vk::AccelerationStructureDeviceAddressInfoKHR::default().acceleration_structure(self.handle);
        match self.ctx.ray_tracing() {
            Ok(ray_tracing) => unsafe {
                ray_tracing
                    .acceleration_structure
                    .get_acceleration_structure_device_address(&info)
            },
            Err(_) => 0,
        }
    }
}

impl Drop for AccelerationStructure {
    fn drop(&mut self) {
        if let Some(ray_tracing) = &self.ctx.ray_tracing {
            unsafe {
                ray_tracing
                    .acceleration_structure
                    .destroy_acceleration_structure(self.handle, None);
            }
        }
    }
}

fn vulkan_buffer<'a>(buffer: &'a dyn Buffer, what: &str) -> Result<&'a VulkanBuffer> {
    match buffer.downcast_ref::<VulkanBuffer>() {
        Some(buffer) => Ok(buffer),
        None => engine_bail!(SOURCE, "The {} buffer was not created by the Vulkan backend", what),
    }
}

/// Vulkan bottom level acceleration structure implementation
pub struct VulkanBottomLevelAccelerationStructure {
    _structure: AccelerationStructure,
    address: vk::DeviceAddress,
    geometry_count: usize,
}

impl VulkanBottomLevelAccelerationStructure {
    pub(crate) fn new(ctx: Arc<GpuContext>, geometries: &[AccelerationStructureGeometry<'_>]) -> Result<Self> {
        if geometries.is_empty() {
            engine_bail!(SOURCE, "A bottom level acceleration structure needs at least one geometry");
        }

        let mut vk_geometries = Vec::with_capacity(geometries.len());
        let mut primitive_counts = Vec::with_capacity(geometries.len());
        for geometry in geometries {
            let vertex_buffer = vulkan_buffer(geometry.vertex_buffer, "vertex")?;
            let index_buffer = vulkan_buffer(geometry.index_buffer, "index")?;
            let Some(position_format) = geometry.vertex_specification.element_format(InputElement::VertexPosition)
            else {
                engine_bail!(SOURCE, "Acceleration structure geometry has no vertex position");
            };

            let triangles = vk::AccelerationStructureGeometryTrianglesDataKHR::default()
                .vertex_format(vertex_format(position_format))
                .vertex_data(vk::DeviceOrHostAddressConstKHR {
                    device_address: vertex_buffer.device_address()
                        + u64::from(geometry.vertex_specification.offset_of(InputElement::VertexPosition)),
                })
                .vertex_stride(u64::from(geometry.vertex_specification.size()))
                .max_vertex(geometry.vertex_count.saturating_sub(1))
                .index_type(index_type(geometry.index_stride))
                .index_data(vk::DeviceOrHostAddressConstKHR { device_address: index_buffer.device_address() });

            vk_geometries.push(
                vk::AccelerationStructureGeometryKHR::default()
                    .geometry_type(vk::GeometryTypeKHR::TRIANGLES)
                    .geometry(vk::AccelerationStructureGeometryDataKHR { triangles })
                    .flags(vk::GeometryFlagsKHR::OPAQUE),
            );
            primitive_counts.push(geometry.primitive_count());
        }

        let structure = AccelerationStructure::build(
            &ctx,
            vk::AccelerationStructureTypeKHR::BOTTOM_LEVEL,
            &vk_geometries,
            &primitive_counts,
        )?;
        let address = structure.device_address();

        engine_debug!(SOURCE, "Built bottom level acceleration structure with {} geometries", geometries.len());
        Ok(Self { _structure: structure, address, geometry_count: geometries.len() })
    }
}

impl BottomLevelAccelerationStructure for VulkanBottomLevelAccelerationStructure {
    fn geometry_count(&self) -> usize {
        self.geometry_count
    }

    fn device_address(&self) -> u64 {
        self.address
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Vulkan top level acceleration structure implementation
pub struct VulkanTopLevelAccelerationStructure {
    _structure: AccelerationStructure,
    pub(crate) handle: vk::AccelerationStructureKHR,
    instance_count: usize,
}

impl VulkanTopLevelAccelerationStructure {
    pub(crate) fn new(
        ctx: Arc<GpuContext>,
        bottom_level_acceleration_structures: &[&dyn BottomLevelAccelerationStructure],
    ) -> Result<Self> {
        if bottom_level_acceleration_structures.is_empty() {
            engine_bail!(SOURCE, "A top level acceleration structure needs at least one instance");
        }

        let identity = vk::TransformMatrixKHR {
            matrix: [1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0],
        };
        let instances: Vec<vk::AccelerationStructureInstanceKHR> = bottom_level_acceleration_structures
            .iter()
            .enumerate()
            .map(|(index, blas)| vk::AccelerationStructureInstanceKHR {
                transform: identity,
                instance_custom_index_and_mask: vk::Packed24_8::new(index as u32, 0xff),
                instance_shader_binding_table_record_offset_and_flags: vk::Packed24_8::new(
                    0,
                    vk::GeometryInstanceFlagsKHR::TRIANGLE_FACING_CULL_DISABLE.as_raw() as u8,
                ),
                acceleration_structure_reference: vk::AccelerationStructureReferenceKHR {
                    device_handle: blas.device_address(),
                },
            })
            .collect();

        // SAFETY: AccelerationStructureInstanceKHR is a plain repr(C) struct
        let bytes = unsafe {
            std::slice::from_raw_parts(instances.as_ptr().cast::<u8>(), std::mem::size_of_val(instances.as_slice()))
        };
        let instance_buffer = VulkanBuffer::with_usage(
            Arc::clone(&ctx),
            "acceleration structure instances",
            bytes.len() as u64,
            BufferType::BackendSpecific,
            vk::BufferUsageFlags::ACCELERATION_STRUCTURE_BUILD_INPUT_READ_ONLY_KHR
                | vk::BufferUsageFlags::SHADER_DEVICE_ADDRESS,
            MemoryLocation::CpuToGpu,
            ResourceState::GenericRead,
        )?;
        instance_buffer.write(bytes, 0, None)?;

        let instances_data = vk::AccelerationStructureGeometryInstancesDataKHR::default()
            .array_of_pointers(false)
            .data(vk::DeviceOrHostAddressConstKHR { device_address: instance_buffer.device_address() });
        let geometry = vk::AccelerationStructureGeometryKHR::default()
            .geometry_type(vk::GeometryTypeKHR::INSTANCES)
            .geometry(vk::AccelerationStructureGeometryDataKHR { instances: instances_data });

        let structure = AccelerationStructure::build(
            &ctx,
            vk::AccelerationStructureTypeKHR::TOP_LEVEL,
            &[geometry],
            &[instances.len() as u32],
        )?;

        engine_debug!(SOURCE, "Built top level acceleration structure with {} instances", instances.len());
        Ok(Self { handle: structure.handle, _structure: structure, instance_count: instances.len() })
    }
}

impl TopLevelAccelerationStructure for VulkanTopLevelAccelerationStructure {
    fn instance_count(&self) -> usize {
        self.instance_count
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// ===== RAY TRACER =====

/// Vulkan ray tracer implementation
pub struct VulkanRayTracer {
    image: VulkanImage,
    width: u32,
    height: u32,
}

impl VulkanRayTracer {
    pub(crate) fn new(ctx: Arc<GpuContext>, width: u32, height: u32) -> Result<Self> {
        if width == 0 || height == 0 {
            engine_bail!(SOURCE, "Invalid ray tracer extent {}x{}", width, height);
        }
        let specification = ImageSpecification {
            width,
            height,
            usage: ImageUsage::STORAGE | ImageUsage::GRAPHICS,
            format: DataFormat::R8G8B8A8_UNORM,
            ..Default::default()
        };
        Ok(Self { image: VulkanImage::new(ctx, &specification)?, width, height })
    }

    pub(crate) fn storage_image(&self) -> &VulkanImage {
        &self.image
    }
}

impl RayTracer for VulkanRayTracer {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn image(&self) -> &dyn Image {
        &self.image
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// ===== RAY TRACING PIPELINE =====

/// Shader binding table records, by region
#[derive(Default)]
struct GroupIndices {
    ray_gen: Vec<u32>,
    miss: Vec<u32>,
    hit: Vec<u32>,
    callable: Vec<u32>,
}

/// Shader binding table buffer and the regions `vkCmdTraceRaysKHR` reads
struct ShaderBindingTable {
    _buffer: VulkanBuffer,
    regions: [vk::StridedDeviceAddressRegionKHR; 4],
}

/// Vulkan ray tracing pipeline implementation
pub struct VulkanRayTracingPipeline {
    specification: RayTracingPipelineSpecification,
    pub(crate) layout: Arc<VulkanPipelineLayout>,
    pub(crate) pipeline: VulkanPipelineHandle,
    shader_binding_table: ShaderBindingTable,
}

impl VulkanRayTracingPipeline {
    pub(crate) fn new(
        ctx: Arc<GpuContext>,
        cache_handler: Option<Box<dyn PipelineCacheHandler>>,
        specification: &RayTracingPipelineSpecification,
    ) -> Result<Self> {
        let ray_tracing = ctx.ray_tracing()?;

        // Modules, stage infos and SBT groups
        let mut modules: Vec<ShaderModule<'_>> = Vec::new();
        let mut stage_flags: Vec<vk::ShaderStageFlags> = Vec::new();
        let mut groups: Vec<vk::RayTracingShaderGroupCreateInfoKHR<'_>> = Vec::new();
        let mut indices = GroupIndices::default();

        let mut add_stage = |shader: &Shader, stage: vk::ShaderStageFlags| -> Result<u32> {
            modules.push(ShaderModule::new(&ctx, shader)?);
            stage_flags.push(stage);
            Ok(stage_flags.len() as u32 - 1)
        };

        for group in &specification.shader_groups {
            let general = [
                (&group.ray_gen, vk::ShaderStageFlags::RAYGEN_KHR),
                (&group.miss, vk::ShaderStageFlags::MISS_KHR),
                (&group.callable, vk::ShaderStageFlags::CALLABLE_KHR),
            ];
            for (shader, stage) in general {
                let Some(shader) = shader else { continue };
                let stage_index = add_stage(shader, stage)?;
                let group_index = groups.len() as u32;
                groups.push(
                    vk::RayTracingShaderGroupCreateInfoKHR::default()
                        .ty(vk::RayTracingShaderGroupTypeKHR::GENERAL)
                        .general_shader(stage_index)
                        .closest_hit_shader(vk::SHADER_UNUSED_KHR)
                        .any_hit_shader(vk::SHADER_UNUSED_KHR)
                        .intersection_shader(vk::SHADER_UNUSED_KHR),
                );
                match stage {
                    vk::ShaderStageFlags::RAYGEN_KHR => indices.ray_gen.push(group_index),
                    vk::ShaderStageFlags::MISS_KHR => indices.miss.push(group_index),
                    _ => indices.callable.push(group_index),
                }
            }

            if group.is_hit_group() {
                let mut hit_stage = |shader: &Option<Shader>, stage| -> Result<u32> {
                    match shader {
                        Some(shader) => add_stage(shader, stage),
                        None => Ok(vk::SHADER_UNUSED_KHR),
                    }
                };
                let closest_hit = hit_stage(&group.closest_hit, vk::ShaderStageFlags::CLOSEST_HIT_KHR)?;
                let any_hit = hit_stage(&group.any_hit, vk::ShaderStageFlags::ANY_HIT_KHR)?;
                let intersection = hit_stage(&group.intersection, vk::ShaderStageFlags::INTERSECTION_KHR)?;
                let ty = if group.intersection.is_some() {
                    vk::RayTracingShaderGroupTypeKHR::PROCEDURAL_HIT_GROUP
                } else {
                    vk::RayTracingShaderGroupTypeKHR::TRIANGLES_HIT_GROUP
                };

                indices.hit.push(groups.len() as u32);
                groups.push(
                    vk::RayTracingShaderGroupCreateInfoKHR::default()
                        .ty(ty)
                        .general_shader(vk::SHADER_UNUSED_KHR)
                        .closest_hit_shader(closest_hit)
                        .any_hit_shader(any_hit)
                        .intersection_shader(intersection),
                );
            }
        }

        match indices.ray_gen.len() {
            0 => engine_bail!(SOURCE, "A ray tracing pipeline needs a ray generation shader"),
            1 => {}
            count => engine_warn!(SOURCE, "{} ray generation shaders given; only the first one is traced", count),
        }

        let stages: Vec<vk::PipelineShaderStageCreateInfo<'_>> = modules
            .iter()
            .zip(&stage_flags)
            .map(|(module, stage)| module.stage_info(*stage))
            .collect();

        let max_depth = specification.max_ray_recursion_depth.min(ray_tracing.max_ray_recursion_depth);
        if max_depth < specification.max_ray_recursion_depth {
            engine_warn!(
                SOURCE,
                "Ray recursion depth {} exceeds the device limit, clamped to {}",
                specification.max_ray_recursion_depth,
                max_depth
            );
        }

        let layout = Arc::new(VulkanPipelineLayout::new(Arc::clone(&ctx), specification.binding_map())?);

        let cache = PipelineCache::new(cache_handler);
        let hash = specification.content_hash();
        let cache_data = cache.load(hash);

        let pipeline = build_with_cache_retry(&cache_data, |data| {
            let create_info = vk::RayTracingPipelineCreateInfoKHR::default()
                .stages(&stages)
                .groups(&groups)
                .max_pipeline_ray_recursion_depth(max_depth)
                .layout(layout.layout);
            VulkanPipelineHandle::build(&ctx, data, |pipeline_cache| unsafe {
                ray_tracing
                    .pipeline
                    .create_ray_tracing_pipelines(vk::DeferredOperationKHR::null(), pipeline_cache, &[create_info], None)
                    .map(|pipelines| pipelines[0])
                    .map_err(|(_, e)| e)
            })
        })?;
        cache.store(hash, &pipeline.cache_data()?);

        let shader_binding_table = Self::create_shader_binding_table(&ctx, pipeline.pipeline, groups.len(), &indices)?;

        engine_debug!(
            SOURCE,
            "Created ray tracing pipeline with {} stage(s) in {} group(s)",
            stages.len(),
            groups.len()
        );
        Ok(Self {
            specification: specification.clone(),
            layout,
            pipeline,
            shader_binding_table,
        })
    }

    fn create_shader_binding_table(
        ctx: &Arc<GpuContext>,
        pipeline: vk::Pipeline,
        group_count: usize,
        indices: &GroupIndices,
    ) -> Result<ShaderBindingTable> {
        let ray_tracing = ctx.ray_tracing()?;
        let handle_size = ray_tracing.shader_group_handle_size as usize;
        let base_alignment = u64::from(ray_tracing.shader_group_base_alignment.max(1));
        let handle_stride = align_up(
            u64::from(ray_tracing.shader_group_handle_size),
            u64::from(ray_tracing.shader_group_handle_alignment.max(1)),
        );

        let handles = unsafe {
            ray_tracing.pipeline.get_ray_tracing_shader_group_handles(
                pipeline,
                0,
                group_count as u32,
                group_count * handle_size,
            )
        }
        .map_err(|e| engine_err!(SOURCE, "Failed to get the shader group handles: {:?}", e))?;

        // Ray generation region: exactly one record whose stride is its size
        let ray_gen_stride = align_up(handle_stride, base_alignment);
        let region_records: [(&[u32], u64); 4] = [
            (&indices.ray_gen[..1], ray_gen_stride),
            (&indices.miss, handle_stride),
            (&indices.hit, handle_stride),
            (&indices.callable, handle_stride),
        ];

        let mut table: Vec<u8> = Vec::new();
        let mut layout: [(u64, u64, u64); 4] = [(0, 0, 0); 4];
        for (region, (records, stride)) in region_records.iter().enumerate() {
            if records.is_empty() {
                continue;
            }
            let offset = table.len() as u64;
            let size = align_up(records.len() as u64 * stride, base_alignment);
            table.resize((offset + size) as usize, 0);
            for (i, group) in records.iter().enumerate() {
                let src = *group as usize * handle_size;
                let dst = (offset + i as u64 * stride) as usize;
                table[dst..dst + handle_size].copy_from_slice(&handles[src..src + handle_size]);
            }
            layout[region] = (offset, *stride, size);
        }

        // Room to align the start of the table in device memory
        let buffer = VulkanBuffer::with_usage(
            Arc::clone(ctx),
            "shader binding table",
            table.len() as u64 + base_alignment,
            BufferType::BackendSpecific,
            vk::BufferUsageFlags::SHADER_BINDING_TABLE_KHR | vk::BufferUsageFlags::SHADER_DEVICE_ADDRESS,
            MemoryLocation::CpuToGpu,
            ResourceState::GenericRead,
        )?;
        let base_address = buffer.device_address();
        let start = align_up(base_address, base_alignment) - base_address;
        buffer.write(&table, start, None)?;

        let regions = layout.map(|(offset, stride, size)| {
            let device_address = if size == 0 { 0 } else { base_address + start + offset };
            vk::StridedDeviceAddressRegionKHR { device_address, stride, size }
        });

        Ok(ShaderBindingTable { _buffer: buffer, regions })
    }

    /// Ray generation, miss, hit and callable regions, in `vkCmdTraceRaysKHR` order
    pub(crate) fn regions(&self) -> [vk::StridedDeviceAddressRegionKHR; 4] {
        self.shader_binding_table.regions
    }
}

impl RayTracingPipeline for VulkanRayTracingPipeline {
    fn specification(&self) -> &RayTracingPipelineSpecification {
        &self.specification
    }

    fn create_descriptor(&self, descriptor_type: DescriptorType) -> Result<Box<dyn Descriptor>> {
        self.layout.create_descriptor(descriptor_type)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
