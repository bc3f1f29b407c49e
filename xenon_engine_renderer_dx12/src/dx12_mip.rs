/// CPU mip chain generation
///
/// D3D12 has no blit command, so mip levels of 8-bit four channel images are
/// filtered on the CPU and uploaded level by level.

use xenon_engine::xenon::backend::DataFormat;

/// Whether `format` can be filtered by `downsample_rgba8`
pub fn supports_cpu_mip_maps(format: DataFormat) -> bool {
    matches!(
        format,
        DataFormat::R8G8B8A8_UNORM
            | DataFormat::R8G8B8A8_SRGB
            | DataFormat::B8G8R8A8_UNORM
            | DataFormat::B8G8R8A8_SRGB
    )
}

/// Halve a tightly packed four channel image with a 2x2 box filter
///
/// Odd edges reuse their last texel. Returns the texels and the new extent,
/// which never drops below 1x1.
pub fn downsample_rgba8(src: &[u8], width: u32, height: u32) -> (Vec<u8>, u32, u32) {
    let dst_width = (width / 2).max(1);
    let dst_height = (height / 2).max(1);
    let mut dst = vec![0u8; dst_width as usize * dst_height as usize * 4];

    let texel = |x: u32, y: u32, channel: usize| -> u32 {
        let x = x.min(width.saturating_sub(1)) as usize;
        let y = y.min(height.saturating_sub(1)) as usize;
        src.get((y * width as usize + x) * 4 + channel).copied().unwrap_or(0) as u32
    };

    for y in 0..dst_height {
        for x in 0..dst_width {
            for channel in 0..4 {
                let sum = texel(x * 2, y * 2, channel)
                    + texel(x * 2 + 1, y * 2, channel)
                    + texel(x * 2, y * 2 + 1, channel)
                    + texel(x * 2 + 1, y * 2 + 1, channel);
                // Rounded average
                dst[(y as usize * dst_width as usize + x as usize) * 4 + channel] = ((sum + 2) / 4) as u8;
            }
        }
    }
    (dst, dst_width, dst_height)
}

/// Every level below the base, from level 1 to `mip_levels - 1`
pub fn mip_chain_rgba8(base: &[u8], width: u32, height: u32, mip_levels: u32) -> Vec<(Vec<u8>, u32, u32)> {
    let mut chain: Vec<(Vec<u8>, u32, u32)> = Vec::new();
    for _ in 1..mip_levels {
        let next = match chain.last() {
            Some((texels, w, h)) => downsample_rgba8(texels, *w, *h),
            None => downsample_rgba8(base, width, height),
        };
        chain.push(next);
    }
    chain
}

#[cfg(test)]
#[path = "dx12_mip_tests.rs"]
mod tests;
