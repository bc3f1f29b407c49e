/// Direct3D 12 placement and pitch rules
///
/// Constant buffers are sized in 256-byte steps and buffer-to-texture copies
/// use rows padded to 256 bytes. Both rules are plain arithmetic, kept apart
/// from the API code so they are exercised on every platform.

use xenon_engine::xenon::backend::{align_up, BufferType};

/// D3D12_CONSTANT_BUFFER_DATA_PLACEMENT_ALIGNMENT
pub const CONSTANT_BUFFER_ALIGNMENT: u64 = 256;

/// D3D12_TEXTURE_DATA_PITCH_ALIGNMENT
pub const TEXTURE_PITCH_ALIGNMENT: u64 = 256;

/// D3D12_TEXTURE_DATA_PLACEMENT_ALIGNMENT
pub const TEXTURE_PLACEMENT_ALIGNMENT: u64 = 512;

/// Size of the resource backing a buffer of `size` bytes
///
/// Uniform buffers grow to the next constant buffer boundary; every other
/// type keeps the requested size.
pub fn buffer_size(size: u64, buffer_type: BufferType) -> u64 {
    match buffer_type {
        BufferType::Uniform => align_up(size, CONSTANT_BUFFER_ALIGNMENT),
        _ => size,
    }
}

/// Layout of one texture subresource inside a linear buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureFootprint {
    pub width: u32,
    pub height: u32,
    /// Bytes of texel data per row
    pub row_size: u64,
    /// Bytes between the starts of two rows
    pub row_pitch: u64,
}

impl TextureFootprint {
    pub fn new(width: u32, height: u32, texel_size: u64) -> Self {
        let row_size = width as u64 * texel_size;
        Self {
            width,
            height,
            row_size,
            row_pitch: align_up(row_size.max(1), TEXTURE_PITCH_ALIGNMENT),
        }
    }

    /// Bytes the pitched subresource occupies
    ///
    /// The last row is not padded, as in `GetCopyableFootprints`.
    pub fn pitched_size(&self) -> u64 {
        match self.height {
            0 => 0,
            rows => self.row_pitch * (rows as u64 - 1) + self.row_size,
        }
    }

    /// Bytes of the tightly packed subresource
    pub fn packed_size(&self) -> u64 {
        self.row_size * self.height as u64
    }

    /// Whether packed and pitched layouts are byte-identical
    pub fn is_packed(&self) -> bool {
        self.row_pitch == self.row_size || self.height <= 1
    }
}

/// Spread tightly packed rows onto the pitched layout of `footprint`
///
/// Padding bytes are zero. Missing input rows are left zeroed as well.
pub fn pitch_rows(packed: &[u8], footprint: &TextureFootprint) -> Vec<u8> {
    let mut pitched = vec![0u8; footprint.pitched_size() as usize];
    let row_size = footprint.row_size as usize;
    let row_pitch = footprint.row_pitch as usize;

    for (row, chunk) in packed.chunks(row_size).take(footprint.height as usize).enumerate() {
        let start = row * row_pitch;
        pitched[start..start + chunk.len()].copy_from_slice(chunk);
    }
    pitched
}

/// Gather the texel rows of a pitched subresource into a packed buffer
pub fn unpitch_rows(pitched: &[u8], footprint: &TextureFootprint) -> Vec<u8> {
    let row_size = footprint.row_size as usize;
    let row_pitch = footprint.row_pitch as usize;
    let mut packed = Vec::with_capacity(footprint.packed_size() as usize);

    for row in 0..footprint.height as usize {
        let start = row * row_pitch;
        let end = (start + row_size).min(pitched.len());
        if start >= end {
            break;
        }
        packed.extend_from_slice(&pitched[start..end]);
    }
    packed
}

#[cfg(test)]
#[path = "dx12_alignment_tests.rs"]
mod tests;
