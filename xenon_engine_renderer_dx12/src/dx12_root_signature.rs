/// Objects shared by every Direct3D 12 pipeline kind
///
/// - `Dx12PipelineLayout`: the root signature serialized from the pipeline's
///   `RootLayout`, which descriptors of the pipeline are laid out against
/// - `Dx12PipelineState`: a compiled PSO seeded from cached blob bytes

use std::sync::Arc;

use windows::core::HRESULT;
use windows::Win32::Foundation::{D3D12_ERROR_ADAPTER_NOT_FOUND, D3D12_ERROR_DRIVER_VERSION_MISMATCH, E_INVALIDARG};
use windows::Win32::Graphics::Direct3D::{ID3DBlob, D3D_ROOT_SIGNATURE_VERSION_1_0};
use windows::Win32::Graphics::Direct3D12::*;
use xenon_engine::xenon::backend::{Descriptor, DescriptorType, ShaderBindingMap, ShaderSource};
use xenon_engine::xenon::{Error, Result};
use xenon_engine::{engine_bail, engine_err, engine_trace, engine_warn};

use crate::dx12_context::GpuContext;
use crate::dx12_conversions::shader_visibility;
use crate::dx12_descriptor::Dx12Descriptor;
use crate::dx12_root_layout::{DescriptorTable, RangeKind, RootLayout, Visibility};

const SOURCE: &str = "xenon::dx12::Pipeline";

/// Bytes of a blob, borrowed for the lifetime of the blob
pub(crate) fn blob_bytes(blob: &ID3DBlob) -> &[u8] {
    unsafe { std::slice::from_raw_parts(blob.GetBufferPointer().cast::<u8>(), blob.GetBufferSize()) }
}

fn range_type(kind: RangeKind) -> D3D12_DESCRIPTOR_RANGE_TYPE {
    match kind {
        RangeKind::ConstantBuffer => D3D12_DESCRIPTOR_RANGE_TYPE_CBV,
        RangeKind::ShaderResource => D3D12_DESCRIPTOR_RANGE_TYPE_SRV,
        RangeKind::UnorderedAccess => D3D12_DESCRIPTOR_RANGE_TYPE_UAV,
        RangeKind::Sampler => D3D12_DESCRIPTOR_RANGE_TYPE_SAMPLER,
    }
}

/// One range per table entry, at the entry's offset in the table
fn descriptor_ranges(table: &DescriptorTable) -> Vec<D3D12_DESCRIPTOR_RANGE> {
    table
        .entries
        .iter()
        .enumerate()
        .map(|(offset, entry)| D3D12_DESCRIPTOR_RANGE {
            RangeType: range_type(entry.kind),
            NumDescriptors: 1,
            BaseShaderRegister: entry.register,
            RegisterSpace: entry.space,
            OffsetInDescriptorsFromTableStart: offset as u32,
        })
        .collect()
}

pub(crate) struct Dx12PipelineLayout {
    ctx: Arc<GpuContext>,
    pub(crate) root_signature: ID3D12RootSignature,
    root_layout: RootLayout,
    binding_map: ShaderBindingMap,
}

impl Dx12PipelineLayout {
    /// # Arguments
    ///
    /// * `binding_map` - Merged bindings of every stage of the pipeline
    /// * `input_assembler` - Whether the pipeline reads vertex buffers through an input layout
    pub(crate) fn new(ctx: Arc<GpuContext>, binding_map: ShaderBindingMap, input_assembler: bool) -> Result<Self> {
        let root_layout = RootLayout::from_binding_map(&binding_map);
        let tables = root_layout.tables();

        // Ranges must outlive serialization, parameters point into them
        let ranges: Vec<Vec<D3D12_DESCRIPTOR_RANGE>> = tables.iter().map(|table| descriptor_ranges(table)).collect();
        let parameters: Vec<D3D12_ROOT_PARAMETER> = tables
            .iter()
            .zip(&ranges)
            .map(|(table, ranges)| D3D12_ROOT_PARAMETER {
                ParameterType: D3D12_ROOT_PARAMETER_TYPE_DESCRIPTOR_TABLE,
                Anonymous: D3D12_ROOT_PARAMETER_0 {
                    DescriptorTable: D3D12_ROOT_DESCRIPTOR_TABLE {
                        NumDescriptorRanges: ranges.len() as u32,
                        pDescriptorRanges: ranges.as_ptr(),
                    },
                },
                ShaderVisibility: shader_visibility(table.visibility.unwrap_or(Visibility::All)),
            })
            .collect();

        let desc = D3D12_ROOT_SIGNATURE_DESC {
            NumParameters: parameters.len() as u32,
            pParameters: parameters.as_ptr(),
            NumStaticSamplers: 0,
            pStaticSamplers: std::ptr::null(),
            Flags: if input_assembler {
                D3D12_ROOT_SIGNATURE_FLAG_ALLOW_INPUT_ASSEMBLER_INPUT_LAYOUT
            } else {
                D3D12_ROOT_SIGNATURE_FLAG_NONE
            },
        };

        let mut blob: Option<ID3DBlob> = None;
        let mut error_blob: Option<ID3DBlob> = None;
        let serialized =
            unsafe { D3D12SerializeRootSignature(&desc, D3D_ROOT_SIGNATURE_VERSION_1_0, &mut blob, Some(&mut error_blob)) };
        let blob = match (serialized, blob) {
            (Ok(()), Some(blob)) => blob,
            (result, _) => {
                let message = error_blob
                    .as_ref()
                    .map(|error| String::from_utf8_lossy(blob_bytes(error)).into_owned())
                    .unwrap_or_default();
                engine_bail!(SOURCE, "Failed to serialize the root signature: {:?} {}", result.err(), message);
            }
        };

        let root_signature: ID3D12RootSignature = unsafe { ctx.device.CreateRootSignature(0, blob_bytes(&blob)) }
            .map_err(|e| engine_err!(SOURCE, "Failed to create the root signature: {:?}", e))?;

        engine_trace!(SOURCE, "Created a root signature with {} descriptor table(s)", parameters.len());
        Ok(Self { ctx, root_signature, root_layout, binding_map })
    }

    pub(crate) fn root_layout(&self) -> &RootLayout {
        &self.root_layout
    }

    pub(crate) fn binding_map(&self) -> &ShaderBindingMap {
        &self.binding_map
    }

    /// Create a descriptor for one class of this layout
    pub(crate) fn create_descriptor(self: &Arc<Self>, descriptor_type: DescriptorType) -> Result<Box<dyn Descriptor>> {
        Ok(Box::new(Dx12Descriptor::new(Arc::clone(&self.ctx), Arc::clone(self), descriptor_type)?))
    }
}

// ===== PIPELINE STATE =====

/// Bytecode of a DXIL binary, borrowed for the lifetime of `source`
pub(crate) fn bytecode(source: &ShaderSource) -> D3D12_SHADER_BYTECODE {
    let bytes = source.binary_bytes();
    D3D12_SHADER_BYTECODE { pShaderBytecode: bytes.as_ptr().cast(), BytecodeLength: bytes.len() }
}

/// A compiled pipeline state object
pub(crate) struct Dx12PipelineState {
    pub(crate) state: ID3D12PipelineState,
}

impl Dx12PipelineState {
    /// Build a pipeline seeded with `cache_data`
    ///
    /// A driver rejecting non-empty cache data is reported as
    /// `Error::InvalidPipelineCache` so the caller can retry without it.
    pub(crate) fn build<F>(cache_data: &[u8], create: F) -> Result<Self>
    where
        F: FnOnce(D3D12_CACHED_PIPELINE_STATE) -> windows::core::Result<ID3D12PipelineState>,
    {
        let cached = D3D12_CACHED_PIPELINE_STATE {
            pCachedBlob: if cache_data.is_empty() { std::ptr::null() } else { cache_data.as_ptr().cast() },
            CachedBlobSizeInBytes: cache_data.len(),
        };
        match create(cached) {
            Ok(state) => Ok(Self { state }),
            Err(e) => Err(pipeline_error(e.code(), cache_data)),
        }
    }

    /// Driver blob to be persisted by a cache handler
    pub(crate) fn cache_data(&self) -> Result<Vec<u8>> {
        let blob = unsafe { self.state.GetCachedBlob() }
            .map_err(|e| engine_err!(SOURCE, "Failed to get the pipeline cache data: {:?}", e))?;
        Ok(blob_bytes(&blob).to_vec())
    }
}

/// Map a creation failure, flagging the cache data when the driver may have rejected it
fn pipeline_error(code: HRESULT, cache_data: &[u8]) -> Error {
    let cache_rejected =
        code == D3D12_ERROR_ADAPTER_NOT_FOUND || code == D3D12_ERROR_DRIVER_VERSION_MISMATCH || code == E_INVALIDARG;
    if cache_rejected && !cache_data.is_empty() {
        engine_warn!(SOURCE, "Failed to create the pipeline state with the cached blob: {:?}", code);
        Error::InvalidPipelineCache(format!("{:?}", code))
    } else {
        engine_err!(SOURCE, "Failed to create the pipeline state: {:?}", code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejected_cache_is_retryable_only_with_cache_data() {
        let retry = pipeline_error(D3D12_ERROR_DRIVER_VERSION_MISMATCH, &[1, 2, 3]);
        assert!(matches!(retry, Error::InvalidPipelineCache(_)));

        let fatal = pipeline_error(D3D12_ERROR_DRIVER_VERSION_MISMATCH, &[]);
        assert!(matches!(fatal, Error::BackendError(_)));
    }

    #[test]
    fn test_unrelated_failures_are_not_cache_errors() {
        let error = pipeline_error(windows::Win32::Foundation::E_OUTOFMEMORY, &[1, 2, 3]);
        assert!(matches!(error, Error::BackendError(_)));
    }
}
