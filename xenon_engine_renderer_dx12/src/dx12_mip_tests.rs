use super::*;

#[test]
fn test_only_four_channel_8bit_formats_are_supported() {
    assert!(supports_cpu_mip_maps(DataFormat::R8G8B8A8_UNORM));
    assert!(supports_cpu_mip_maps(DataFormat::B8G8R8A8_SRGB));
    assert!(!supports_cpu_mip_maps(DataFormat::R32G32B32A32_SFLOAT));
    assert!(!supports_cpu_mip_maps(DataFormat::D32_SFLOAT));
    assert!(!supports_cpu_mip_maps(DataFormat::R8_SRGB));
}

#[test]
fn test_downsample_averages_each_quad() {
    // 2x2 image, one channel varies per texel
    let src = [
        0, 10, 255, 255, //
        4, 10, 255, 255, //
        8, 10, 255, 255, //
        12, 10, 255, 255,
    ];
    let (dst, width, height) = downsample_rgba8(&src, 2, 2);
    assert_eq!((width, height), (1, 1));
    assert_eq!(dst, vec![6, 10, 255, 255]);
}

#[test]
fn test_downsample_clamps_odd_edges() {
    // 3x1 image: the second output texel would read past the right edge
    let src = [
        0, 0, 0, 0, //
        100, 0, 0, 0, //
        200, 0, 0, 0,
    ];
    let (dst, width, height) = downsample_rgba8(&src, 3, 1);
    assert_eq!((width, height), (1, 1));
    assert_eq!(dst[0], 50);
}

#[test]
fn test_chain_reaches_one_by_one() {
    let base = vec![128u8; 8 * 4 * 4];
    let chain = mip_chain_rgba8(&base, 8, 4, 4);

    let extents: Vec<(u32, u32)> = chain.iter().map(|(_, w, h)| (*w, *h)).collect();
    assert_eq!(extents, vec![(4, 2), (2, 1), (1, 1)]);
    for (texels, w, h) in &chain {
        assert_eq!(texels.len(), (*w * *h * 4) as usize);
        assert!(texels.iter().all(|t| *t == 128));
    }
}

#[test]
fn test_single_level_has_no_chain() {
    assert!(mip_chain_rgba8(&[0u8; 16], 2, 2, 1).is_empty());
}
