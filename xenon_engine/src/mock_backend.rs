/// Mock backend for unit tests (no GPU required)
///
/// Buffers hold their bytes in memory and track states and barriers like a
/// real backend. Recorders record commands as strings, and the submitter
/// "executes" them in the order the submission plan allows.

use std::any::Any;
use std::collections::{HashMap, HashSet};
use std::ptr::NonNull;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;

use winit::window::Window;

use crate::backend::*;
use crate::config::{BackendType, Config};
use crate::error::{Error, Result};
use crate::{engine_bail, engine_warn};

const SOURCE: &str = "xenon::Mock";

/// Shared journal of everything the mock GPU did
pub type Journal = Arc<Mutex<Vec<String>>>;

// ============================================================================
// Pipeline cache and specialization builder
// ============================================================================

/// In-memory pipeline cache handler; clones share the same storage
#[derive(Clone, Default)]
pub struct MemoryCacheHandler {
    entries: Arc<Mutex<HashMap<u64, Vec<u8>>>>,
}

impl MemoryCacheHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: u64) -> Option<Vec<u8>> {
        self.entries.lock().unwrap().get(&key).cloned()
    }

    pub fn insert(&self, key: u64, bytes: Vec<u8>) {
        self.entries.lock().unwrap().insert(key, bytes);
    }
}

impl PipelineCacheHandler for MemoryCacheHandler {
    fn load(&self, key: u64) -> Vec<u8> {
        self.get(key).unwrap_or_default()
    }

    fn store(&self, key: u64, bytes: &[u8]) {
        self.insert(key, bytes.to_vec());
    }
}

/// "Compiled" pipeline produced by `MockPipelineBuilder`
#[derive(Debug)]
pub struct MockPipelineObject {
    pub id: usize,
    pub input: VertexInputState,
    pub seeded_with: Vec<u8>,
}

/// Counts builds; optionally slow, optionally rejecting any cache data
#[derive(Default)]
pub struct MockPipelineBuilder {
    builds: AtomicUsize,
    reject_cache: bool,
    delay: Option<Duration>,
}

impl MockPipelineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rejecting_cache() -> Self {
        Self { reject_cache: true, ..Self::default() }
    }

    pub fn with_build_delay(delay: Duration) -> Self {
        Self { delay: Some(delay), ..Self::default() }
    }

    pub fn build_count(&self) -> usize {
        self.builds.load(Ordering::SeqCst)
    }
}

impl SpecializationBuilder for MockPipelineBuilder {
    type Pipeline = MockPipelineObject;

    fn build(&self, input: &VertexInputState, cache_data: &[u8]) -> Result<MockPipelineObject> {
        if self.reject_cache && !cache_data.is_empty() {
            return Err(Error::InvalidPipelineCache("stale blob".to_string()));
        }
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        let id = self.builds.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(MockPipelineObject { id, input: input.clone(), seeded_with: cache_data.to_vec() })
    }

    fn cache_data(&self, pipeline: &MockPipelineObject) -> Result<Vec<u8>> {
        Ok(format!("blob-{}", pipeline.id).into_bytes())
    }
}

// ============================================================================
// Mock Instance / Device
// ============================================================================

pub struct MockInstance {
    name: String,
    version: u32,
}

impl BackendInstance for MockInstance {
    fn application_name(&self) -> &str {
        &self.name
    }

    fn application_version(&self) -> u32 {
        self.version
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

pub struct MockDevice {
    render_targets: RenderTargetType,
    host_visible: bool,
    journal: Journal,
}

impl MockDevice {
    pub fn new(render_targets: RenderTargetType, host_visible: bool) -> Self {
        Self { render_targets, host_visible, journal: Journal::default() }
    }

    pub fn journal(&self) -> Journal {
        self.journal.clone()
    }
}

impl Device for MockDevice {
    fn supported_render_targets(&self) -> RenderTargetType {
        self.render_targets
    }

    fn wait_idle(&self) -> Result<()> {
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// ============================================================================
// Mock Buffer
// ============================================================================

pub struct MockBuffer {
    name: String,
    buffer_type: BufferType,
    location: MemoryLocation,
    state: Mutex<ResourceState>,
    data: Mutex<Vec<u8>>,
    staging: OnceLock<Box<MockBuffer>>,
    readback: OnceLock<Box<MockBuffer>>,
    reading: AtomicBool,
    journal: Journal,
}

impl MockBuffer {
    pub fn new(name: &str, size: u64, buffer_type: BufferType, host_visible: bool, journal: Journal) -> Self {
        let (location, state) = if host_visible {
            (MemoryLocation::CpuToGpu, ResourceState::GenericRead)
        } else {
            (MemoryLocation::GpuOnly, ResourceState::initial_for(buffer_type))
        };
        Self::with_location(name, size, buffer_type, location, state, journal)
    }

    fn with_location(
        name: &str,
        size: u64,
        buffer_type: BufferType,
        location: MemoryLocation,
        state: ResourceState,
        journal: Journal,
    ) -> Self {
        Self {
            name: name.to_string(),
            buffer_type,
            location,
            state: Mutex::new(state),
            data: Mutex::new(vec![0; size as usize]),
            staging: OnceLock::new(),
            readback: OnceLock::new(),
            reading: AtomicBool::new(false),
            journal,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the staging buffer was ever created
    pub fn has_staging(&self) -> bool {
        self.staging.get().is_some()
    }

    fn log(&self, entry: String) {
        self.journal.lock().unwrap().push(entry);
    }

    /// Barrier-wrapped copy, shared by `copy` and recorded copies
    fn perform_copy(&self, src: &MockBuffer, size: u64, src_offset: u64, dst_offset: u64) -> Result<()> {
        check_range(SOURCE, src.size(), src_offset, size)?;
        check_range(SOURCE, self.size(), dst_offset, size)?;

        let dst_before = self.state();
        let src_before = src.state();
        let dst_copy = copy_transition(dst_before, self.location, ResourceState::CopyDestination);
        let src_copy = copy_transition(src_before, src.location, ResourceState::CopySource);

        if let Some(state) = dst_copy {
            self.transition(dst_before, state);
        }
        if let Some(state) = src_copy {
            src.transition(src_before, state);
        }

        let bytes = src.data.lock().unwrap()[src_offset as usize..(src_offset + size) as usize].to_vec();
        self.data.lock().unwrap()[dst_offset as usize..(dst_offset + size) as usize].copy_from_slice(&bytes);
        self.log(format!("copy {} -> {} ({} bytes)", src.name, self.name, size));

        if let Some(state) = dst_copy {
            self.transition(state, dst_before);
        }
        if let Some(state) = src_copy {
            src.transition(state, src_before);
        }
        Ok(())
    }

    fn transition(&self, from: ResourceState, to: ResourceState) {
        *self.state.lock().unwrap() = to;
        self.log(format!("barrier {}: {:?} -> {:?}", self.name, from, to));
    }
}

impl Buffer for MockBuffer {
    fn size(&self) -> u64 {
        self.data.lock().unwrap().len() as u64
    }

    fn buffer_type(&self) -> BufferType {
        self.buffer_type
    }

    fn memory_location(&self) -> MemoryLocation {
        self.location
    }

    fn state(&self) -> ResourceState {
        *self.state.lock().unwrap()
    }

    fn write(&self, data: &[u8], offset: u64, recorder: Option<&mut dyn CommandRecorder>) -> Result<()> {
        check_range(SOURCE, self.size(), offset, data.len() as u64)?;

        if is_directly_writable(self.state(), self.location) {
            self.data.lock().unwrap()[offset as usize..offset as usize + data.len()].copy_from_slice(data);
            self.log(format!("map-write {} ({} bytes)", self.name, data.len()));
            return Ok(());
        }

        let staging = self.staging.get_or_init(|| {
            Box::new(MockBuffer::with_location(
                &format!("{}-staging", self.name),
                self.size(),
                BufferType::Staging,
                MemoryLocation::CpuToGpu,
                ResourceState::GenericRead,
                self.journal.clone(),
            ))
        });
        staging.write(data, offset, None)?;

        match recorder {
            Some(recorder) => recorder.copy_buffer(staging.as_ref(), offset, self, offset, data.len() as u64),
            None => self.perform_copy(staging, data.len() as u64, offset, offset),
        }
    }

    fn copy(&self, src: &dyn Buffer, size: u64, src_offset: u64, dst_offset: u64) -> Result<()> {
        let Some(src) = src.downcast_ref::<MockBuffer>() else {
            engine_bail!(SOURCE, "Source buffer does not belong to the mock backend");
        };
        self.perform_copy(src, size, src_offset, dst_offset)
    }

    fn begin_read(&self) -> Result<NonNull<u8>> {
        let readback = self.readback.get_or_init(|| {
            Box::new(MockBuffer::with_location(
                &format!("{}-readback", self.name),
                self.size(),
                BufferType::Staging,
                MemoryLocation::GpuToCpu,
                ResourceState::CopyDestination,
                self.journal.clone(),
            ))
        });
        readback.perform_copy(self, self.size(), 0, 0)?;
        self.reading.store(true, Ordering::SeqCst);

        let mut data = readback.data.lock().unwrap();
        NonNull::new(data.as_mut_ptr()).ok_or_else(|| Error::BackendError("Empty readback buffer".to_string()))
    }

    fn end_read(&self) {
        if !self.reading.swap(false, Ordering::SeqCst) {
            engine_warn!(SOURCE, "end_read called on {} without begin_read", self.name);
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// ============================================================================
// Mock Image / View / Sampler
// ============================================================================

pub struct MockImage {
    specification: ImageSpecification,
    journal: Journal,
}

impl MockImage {
    fn transfer(&self, what: &str, recorder: Option<&mut dyn CommandRecorder>) -> Result<()> {
        let mode = if recorder.is_some() { "recorded" } else { "immediate" };
        self.journal.lock().unwrap().push(format!("image {} ({})", what, mode));
        Ok(())
    }
}

impl Image for MockImage {
    fn specification(&self) -> &ImageSpecification {
        &self.specification
    }

    fn copy_from_buffer(&self, src: &dyn Buffer, recorder: Option<&mut dyn CommandRecorder>) -> Result<()> {
        check_range(SOURCE, src.size(), 0, self.specification.base_level_size())?;
        self.transfer("copy from buffer", recorder)
    }

    fn copy_from_image(&self, _src: &dyn Image, recorder: Option<&mut dyn CommandRecorder>) -> Result<()> {
        self.transfer("copy from image", recorder)
    }

    fn generate_mip_maps(&self, recorder: Option<&mut dyn CommandRecorder>) -> Result<()> {
        self.transfer("generate mip maps", recorder)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

pub struct MockImageView {
    specification: ImageViewSpecification,
}

impl ImageView for MockImageView {
    fn specification(&self) -> &ImageViewSpecification {
        &self.specification
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

pub struct MockImageSampler {
    specification: ImageSamplerSpecification,
}

impl ImageSampler for MockImageSampler {
    fn specification(&self) -> &ImageSamplerSpecification {
        &self.specification
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// ============================================================================
// Mock Rasterizer / Swapchain / Query
// ============================================================================

pub struct MockRasterizer {
    width: u32,
    height: u32,
    attachment_types: AttachmentType,
    multi_sampling_count: MultiSamplingCount,
    triple_buffering: bool,
}

impl Rasterizer for MockRasterizer {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn attachment_types(&self) -> AttachmentType {
        self.attachment_types
    }

    fn multi_sampling_count(&self) -> MultiSamplingCount {
        self.multi_sampling_count
    }

    fn is_triple_buffering_enabled(&self) -> bool {
        self.triple_buffering
    }

    fn frame_index(&self) -> u32 {
        0
    }

    fn image_attachment(&self, _attachment: AttachmentType) -> Option<&dyn Image> {
        None
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

pub struct MockSwapchain {
    pub renderable: bool,
}

impl Swapchain for MockSwapchain {
    fn prepare(&mut self) -> Result<()> {
        Ok(())
    }

    fn present(&mut self) -> Result<()> {
        Ok(())
    }

    fn recreate(&mut self) -> Result<()> {
        Ok(())
    }

    fn is_renderable(&self) -> bool {
        self.renderable
    }

    fn image_count(&self) -> u32 {
        3
    }

    fn image_index(&self) -> u32 {
        0
    }

    fn frame_index(&self) -> u32 {
        0
    }

    fn width(&self) -> u32 {
        if self.renderable { 800 } else { 0 }
    }

    fn height(&self) -> u32 {
        if self.renderable { 600 } else { 0 }
    }

    fn format(&self) -> DataFormat {
        DataFormat::B8G8R8A8_UNORM
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

pub struct MockOcclusionQuery {
    sample_count: u64,
}

impl OcclusionQuery for MockOcclusionQuery {
    fn sample_count(&self) -> u64 {
        self.sample_count
    }

    fn samples(&self) -> Result<Vec<u64>> {
        Ok(vec![0; self.sample_count as usize])
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// ============================================================================
// Mock Descriptor / Pipelines
// ============================================================================

pub struct MockDescriptor {
    descriptor_type: DescriptorType,
    bindings: DescriptorBindings,
    pub attached: Vec<u32>,
}

impl Descriptor for MockDescriptor {
    fn descriptor_type(&self) -> DescriptorType {
        self.descriptor_type
    }

    fn bindings(&self) -> &DescriptorBindings {
        &self.bindings
    }

    fn attach_buffer(&mut self, binding: u32, _buffer: &dyn Buffer) -> Result<()> {
        checked_binding(&self.bindings, binding, &BUFFER_RESOURCE_TYPES)?;
        self.attached.push(binding);
        Ok(())
    }

    fn attach_image(
        &mut self,
        binding: u32,
        _image: &dyn Image,
        _view: &dyn ImageView,
        _sampler: &dyn ImageSampler,
    ) -> Result<()> {
        checked_binding(&self.bindings, binding, &IMAGE_RESOURCE_TYPES)?;
        self.attached.push(binding);
        Ok(())
    }

    fn attach_acceleration_structure(
        &mut self,
        binding: u32,
        _acceleration_structure: &dyn TopLevelAccelerationStructure,
    ) -> Result<()> {
        checked_binding(&self.bindings, binding, &[ResourceType::AccelerationStructure])?;
        self.attached.push(binding);
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

pub struct MockRasterizingPipeline {
    specification: RasterizingPipelineSpecification,
    binding_map: ShaderBindingMap,
    builder: MockPipelineBuilder,
    specializations: PipelineSpecializations<MockPipelineObject>,
}

impl MockRasterizingPipeline {
    pub fn new(
        cache_handler: Option<Box<dyn PipelineCacheHandler>>,
        specification: &RasterizingPipelineSpecification,
    ) -> Self {
        let base_input = VertexInputState::from_shader_inputs(specification.vertex_shader.input_attributes());
        Self {
            binding_map: specification.binding_map(),
            specification: specification.clone(),
            builder: MockPipelineBuilder::new(),
            specializations: PipelineSpecializations::new(base_input, cache_handler),
        }
    }

    pub fn build_count(&self) -> usize {
        self.builder.build_count()
    }
}

impl RasterizingPipeline for MockRasterizingPipeline {
    fn specification(&self) -> &RasterizingPipelineSpecification {
        &self.specification
    }

    fn create_descriptor(&self, descriptor_type: DescriptorType) -> Result<Box<dyn Descriptor>> {
        Ok(Box::new(MockDescriptor {
            descriptor_type,
            bindings: self.binding_map.bindings(descriptor_type).clone(),
            attached: Vec::new(),
        }))
    }

    fn specialize(&self, vertex_specification: &VertexSpecification) -> Result<u64> {
        Ok(self.specializations.get_or_build(&self.builder, vertex_specification)?.hash())
    }

    fn recreate(&self) -> Result<()> {
        self.specializations.recreate(&self.builder)
    }

    fn specialization_count(&self) -> usize {
        self.specializations.len()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

pub struct MockComputePipeline {
    shader: Shader,
    binding_map: ShaderBindingMap,
}

impl ComputePipeline for MockComputePipeline {
    fn shader(&self) -> &Shader {
        &self.shader
    }

    fn create_descriptor(&self, descriptor_type: DescriptorType) -> Result<Box<dyn Descriptor>> {
        Ok(Box::new(MockDescriptor {
            descriptor_type,
            bindings: self.binding_map.bindings(descriptor_type).clone(),
            attached: Vec::new(),
        }))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// ============================================================================
// Mock Command Recorder
// ============================================================================

pub struct MockCommandRecorder {
    name: String,
    usage: CommandRecorderUsage,
    buffer_count: u32,
    current: u32,
    pub commands: Vec<String>,
}

impl MockCommandRecorder {
    pub fn new(name: &str, usage: CommandRecorderUsage, buffer_count: u32) -> Self {
        Self { name: name.to_string(), usage, buffer_count: buffer_count.max(1), current: 0, commands: Vec::new() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn record(&mut self, command: String) -> Result<()> {
        self.commands.push(command);
        Ok(())
    }
}

impl CommandRecorder for MockCommandRecorder {
    fn usage(&self) -> CommandRecorderUsage {
        self.usage
    }

    fn buffer_count(&self) -> u32 {
        self.buffer_count
    }

    fn current_index(&self) -> u32 {
        self.current
    }

    fn next(&mut self) {
        self.current = (self.current + 1) % self.buffer_count;
    }

    fn begin(&mut self) -> Result<()> {
        self.record("begin".to_string())
    }

    fn end(&mut self) -> Result<()> {
        self.record("end".to_string())
    }

    fn copy_buffer(
        &mut self,
        src: &dyn Buffer,
        src_offset: u64,
        dst: &dyn Buffer,
        dst_offset: u64,
        size: u64,
    ) -> Result<()> {
        let (Some(src), Some(dst)) = (src.downcast_ref::<MockBuffer>(), dst.downcast_ref::<MockBuffer>()) else {
            engine_bail!(SOURCE, "Buffers do not belong to the mock backend");
        };
        dst.perform_copy(src, size, src_offset, dst_offset)?;
        self.record(format!("copy_buffer {} -> {}", src.name(), dst.name()))
    }

    fn copy_to_swapchain(&mut self, _image: &dyn Image, _swapchain: &dyn Swapchain) -> Result<()> {
        self.record("copy_to_swapchain".to_string())
    }

    fn bind_rasterizer(&mut self, _rasterizer: &dyn Rasterizer, clear_values: &[ClearValue]) -> Result<()> {
        self.record(format!("bind_rasterizer ({} clears)", clear_values.len()))
    }

    fn bind_rasterizing_pipeline(
        &mut self,
        pipeline: &dyn RasterizingPipeline,
        vertex_specification: &VertexSpecification,
    ) -> Result<()> {
        let hash = pipeline.specialize(vertex_specification)?;
        self.record(format!("bind_rasterizing_pipeline {:016x}", hash))
    }

    fn bind_vertex_buffer(&mut self, _buffer: &dyn Buffer, vertex_stride: u32) -> Result<()> {
        self.record(format!("bind_vertex_buffer stride {}", vertex_stride))
    }

    fn bind_index_buffer(&mut self, _buffer: &dyn Buffer, stride: IndexBufferStride) -> Result<()> {
        self.record(format!("bind_index_buffer {:?}", stride))
    }

    fn bind_descriptors(
        &mut self,
        _pipeline: &dyn RasterizingPipeline,
        descriptors: &[(DescriptorType, &dyn Descriptor)],
    ) -> Result<()> {
        self.record(format!("bind_descriptors {}", descriptors.len()))
    }

    fn set_viewport(&mut self, _viewport: Viewport) -> Result<()> {
        self.record("set_viewport".to_string())
    }

    fn set_scissor(&mut self, _scissor: Rect2D) -> Result<()> {
        self.record("set_scissor".to_string())
    }

    fn draw_indexed(
        &mut self,
        _vertex_offset: u64,
        _index_offset: u64,
        index_count: u64,
        instance_count: u32,
        _first_instance: u32,
    ) -> Result<()> {
        self.record(format!("draw_indexed {} x{}", index_count, instance_count))
    }

    fn end_rasterizer(&mut self) -> Result<()> {
        self.record("end_rasterizer".to_string())
    }

    fn bind_compute_pipeline(&mut self, _pipeline: &dyn ComputePipeline, _descriptor: Option<&dyn Descriptor>) -> Result<()> {
        self.record("bind_compute_pipeline".to_string())
    }

    fn dispatch(&mut self, x: u32, y: u32, z: u32) -> Result<()> {
        self.record(format!("dispatch {}x{}x{}", x, y, z))
    }

    fn trace_rays(
        &mut self,
        _pipeline: &dyn RayTracingPipeline,
        ray_tracer: &dyn RayTracer,
        _descriptors: &[(DescriptorType, &dyn Descriptor)],
    ) -> Result<()> {
        self.record(format!("trace_rays {}x{}", ray_tracer.width(), ray_tracer.height()))
    }

    fn reset_query(&mut self, _query: &dyn OcclusionQuery) -> Result<()> {
        self.record("reset_query".to_string())
    }

    fn begin_query(&mut self, _query: &dyn OcclusionQuery, index: u32) -> Result<()> {
        self.record(format!("begin_query {}", index))
    }

    fn end_query(&mut self, _query: &dyn OcclusionQuery, index: u32) -> Result<()> {
        self.record(format!("end_query {}", index))
    }

    fn resolve_query(&mut self, _query: &dyn OcclusionQuery) -> Result<()> {
        self.record("resolve_query".to_string())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

// ============================================================================
// Mock Command Submitter
// ============================================================================

/// Executes submissions immediately, recording the order recorders ran in
///
/// A batch only runs once every primitive it waits on has been signalled;
/// a missing signal is recorded as a `stall` entry.
pub struct MockCommandSubmitter {
    waiting: bool,
    pub execution_log: Journal,
}

impl MockCommandSubmitter {
    pub fn new() -> Self {
        Self { waiting: false, execution_log: Journal::default() }
    }
}

impl CommandSubmitter for MockCommandSubmitter {
    fn submit(&mut self, batches: &[&[&dyn CommandRecorder]], swapchain: Option<&dyn Swapchain>) -> Result<()> {
        self.waiting = !batches.is_empty();

        let stages: Vec<Vec<PipelineStage>> = batches
            .iter()
            .map(|batch| batch.iter().map(|r| r.usage().wait_stage()).collect())
            .collect();
        let renderable = swapchain.is_some_and(|s| s.is_renderable());
        let plans = plan_submission(&stages, renderable);

        let mut signalled: HashSet<SyncPrimitive> = HashSet::new();
        signalled.insert(SyncPrimitive::ImageAcquired);

        let mut log = self.execution_log.lock().unwrap();
        for plan in plans {
            for wait in &plan.waits {
                if !signalled.contains(&wait.primitive) {
                    log.push(format!("stall on {:?}", wait.primitive));
                }
            }
            for recorder in batches[plan.batch] {
                let Some(recorder) = recorder.downcast_ref::<MockCommandRecorder>() else {
                    engine_bail!(SOURCE, "Recorder does not belong to the mock backend");
                };
                log.push(format!("execute {}", recorder.name()));
            }
            signalled.extend(plan.signals.iter().copied());
            for signal in &plan.signals {
                log.push(format!("signal {:?}", signal));
            }
        }
        Ok(())
    }

    fn wait(&mut self, _timeout: Duration) -> Result<()> {
        self.waiting = false;
        Ok(())
    }

    fn is_waiting(&self) -> bool {
        self.waiting
    }
}

// ============================================================================
// Mock Ray Tracing
// ============================================================================

pub struct MockBottomLevelAccelerationStructure {
    geometry_count: usize,
}

impl BottomLevelAccelerationStructure for MockBottomLevelAccelerationStructure {
    fn geometry_count(&self) -> usize {
        self.geometry_count
    }

    fn device_address(&self) -> u64 {
        0x1000
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

pub struct MockTopLevelAccelerationStructure {
    instance_count: usize,
}

impl TopLevelAccelerationStructure for MockTopLevelAccelerationStructure {
    fn instance_count(&self) -> usize {
        self.instance_count
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// ============================================================================
// Mock Factory
// ============================================================================

/// Factory of the mock backend
///
/// `available` is what the "hardware" supports; devices narrow the request to it.
pub struct MockFactory {
    pub available: RenderTargetType,
    pub host_visible: bool,
}

impl MockFactory {
    pub fn new() -> Self {
        Self { available: RenderTargetType::all(), host_visible: true }
    }

    fn device<'a>(&self, device: &'a dyn Device) -> Result<&'a MockDevice> {
        backend_device::<MockDevice>(device, SOURCE)
    }
}

impl Factory for MockFactory {
    fn backend_type(&self) -> BackendType {
        BackendType::Vulkan
    }

    fn create_instance(&self, config: &Config) -> Result<Box<dyn BackendInstance>> {
        Ok(Box::new(MockInstance {
            name: config.application_name.clone(),
            version: config.application_version,
        }))
    }

    fn create_device(
        &self,
        _instance: &dyn BackendInstance,
        required_render_targets: RenderTargetType,
    ) -> Result<Box<dyn Device>> {
        let supported = negotiate_render_targets(required_render_targets, self.available);
        Ok(Box::new(MockDevice::new(supported, self.host_visible)))
    }

    fn create_command_recorder(
        &self,
        device: &dyn Device,
        usage: CommandRecorderUsage,
        buffer_count: u32,
    ) -> Result<Box<dyn CommandRecorder>> {
        self.device(device)?;
        Ok(Box::new(MockCommandRecorder::new("recorder", usage, buffer_count)))
    }

    fn create_buffer(&self, device: &dyn Device, size: u64, buffer_type: BufferType) -> Result<Box<dyn Buffer>> {
        let device = self.device(device)?;
        Ok(Box::new(MockBuffer::new("buffer", size, buffer_type, device.host_visible, device.journal())))
    }

    fn create_image(&self, device: &dyn Device, specification: &ImageSpecification) -> Result<Box<dyn Image>> {
        let device = self.device(device)?;
        Ok(Box::new(MockImage { specification: *specification, journal: device.journal() }))
    }

    fn create_rasterizer(
        &self,
        device: &dyn Device,
        width: u32,
        height: u32,
        attachment_types: AttachmentType,
        enable_triple_buffering: bool,
        multi_sampling_count: MultiSamplingCount,
    ) -> Result<Box<dyn Rasterizer>> {
        self.device(device)?;
        Ok(Box::new(MockRasterizer {
            width,
            height,
            attachment_types,
            multi_sampling_count,
            triple_buffering: enable_triple_buffering,
        }))
    }

    fn create_swapchain(&self, _device: &dyn Device, _window: &Window) -> Result<Box<dyn Swapchain>> {
        Ok(Box::new(MockSwapchain { renderable: true }))
    }

    fn create_image_view(
        &self,
        _device: &dyn Device,
        _image: &dyn Image,
        specification: &ImageViewSpecification,
    ) -> Result<Box<dyn ImageView>> {
        Ok(Box::new(MockImageView { specification: *specification }))
    }

    fn create_image_sampler(
        &self,
        _device: &dyn Device,
        specification: &ImageSamplerSpecification,
    ) -> Result<Box<dyn ImageSampler>> {
        Ok(Box::new(MockImageSampler { specification: *specification }))
    }

    fn create_rasterizing_pipeline(
        &self,
        device: &dyn Device,
        cache_handler: Option<Box<dyn PipelineCacheHandler>>,
        _rasterizer: &dyn Rasterizer,
        specification: &RasterizingPipelineSpecification,
    ) -> Result<Box<dyn RasterizingPipeline>> {
        self.device(device)?;
        Ok(Box::new(MockRasterizingPipeline::new(cache_handler, specification)))
    }

    fn create_compute_pipeline(
        &self,
        device: &dyn Device,
        _cache_handler: Option<Box<dyn PipelineCacheHandler>>,
        compute_shader: &Shader,
    ) -> Result<Box<dyn ComputePipeline>> {
        self.device(device)?;
        Ok(Box::new(MockComputePipeline {
            binding_map: ShaderBindingMap::from_stages(&[(compute_shader, ShaderType::COMPUTE)]),
            shader: compute_shader.clone(),
        }))
    }

    fn create_command_submitter(&self, device: &dyn Device) -> Result<Box<dyn CommandSubmitter>> {
        self.device(device)?;
        Ok(Box::new(MockCommandSubmitter::new()))
    }

    fn create_occlusion_query(&self, device: &dyn Device, sample_count: u64) -> Result<Box<dyn OcclusionQuery>> {
        self.device(device)?;
        Ok(Box::new(MockOcclusionQuery { sample_count }))
    }

    fn create_top_level_acceleration_structure(
        &self,
        device: &dyn Device,
        bottom_level_acceleration_structures: &[&dyn BottomLevelAccelerationStructure],
    ) -> Result<Box<dyn TopLevelAccelerationStructure>> {
        require_ray_tracing(device, SOURCE)?;
        Ok(Box::new(MockTopLevelAccelerationStructure {
            instance_count: bottom_level_acceleration_structures.len(),
        }))
    }

    fn create_bottom_level_acceleration_structure(
        &self,
        device: &dyn Device,
        geometries: &[AccelerationStructureGeometry<'_>],
    ) -> Result<Box<dyn BottomLevelAccelerationStructure>> {
        require_ray_tracing(device, SOURCE)?;
        Ok(Box::new(MockBottomLevelAccelerationStructure { geometry_count: geometries.len() }))
    }

    fn create_ray_tracer(&self, device: &dyn Device, _width: u32, _height: u32) -> Result<Box<dyn RayTracer>> {
        require_ray_tracing(device, SOURCE)?;
        engine_bail!(SOURCE, "The mock backend has no storage images to trace into")
    }

    fn create_ray_tracing_pipeline(
        &self,
        device: &dyn Device,
        _cache_handler: Option<Box<dyn PipelineCacheHandler>>,
        _specification: &RayTracingPipelineSpecification,
    ) -> Result<Box<dyn RayTracingPipeline>> {
        require_ray_tracing(device, SOURCE)?;
        engine_bail!(SOURCE, "The mock backend does not build ray tracing pipelines")
    }
}

#[cfg(test)]
#[path = "mock_backend_tests.rs"]
mod tests;
