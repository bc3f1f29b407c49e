use super::*;

#[test]
fn test_uniform_buffers_round_up_to_constant_buffer_alignment() {
    assert_eq!(buffer_size(1, BufferType::Uniform), 256);
    assert_eq!(buffer_size(64, BufferType::Uniform), 256);
    assert_eq!(buffer_size(256, BufferType::Uniform), 256);
    assert_eq!(buffer_size(257, BufferType::Uniform), 512);
}

#[test]
fn test_other_buffers_keep_their_size() {
    for buffer_type in [
        BufferType::Index,
        BufferType::Vertex,
        BufferType::Storage,
        BufferType::Staging,
        BufferType::BackendSpecific,
    ] {
        assert_eq!(buffer_size(100, buffer_type), 100);
    }
}

#[test]
fn test_footprint_pads_rows_to_pitch_alignment() {
    let footprint = TextureFootprint::new(10, 3, 4);
    assert_eq!(footprint.row_size, 40);
    assert_eq!(footprint.row_pitch, 256);
    assert_eq!(footprint.pitched_size(), 256 * 2 + 40);
    assert_eq!(footprint.packed_size(), 120);
    assert!(!footprint.is_packed());
}

#[test]
fn test_footprint_of_aligned_rows_is_packed() {
    let footprint = TextureFootprint::new(64, 8, 4);
    assert_eq!(footprint.row_pitch, 256);
    assert!(footprint.is_packed());
    assert_eq!(footprint.pitched_size(), footprint.packed_size());
}

#[test]
fn test_single_row_is_always_packed() {
    let footprint = TextureFootprint::new(3, 1, 4);
    assert!(footprint.is_packed());
    assert_eq!(footprint.pitched_size(), 12);
}

#[test]
fn test_pitch_then_unpitch_restores_texels() {
    let footprint = TextureFootprint::new(5, 4, 4);
    let packed: Vec<u8> = (0..footprint.packed_size() as usize).map(|i| i as u8).collect();

    let pitched = pitch_rows(&packed, &footprint);
    assert_eq!(pitched.len() as u64, footprint.pitched_size());
    // Second row starts at the pitch, padding in between is zero
    assert_eq!(&pitched[256..276], &packed[20..40]);
    assert!(pitched[20..256].iter().all(|b| *b == 0));

    assert_eq!(unpitch_rows(&pitched, &footprint), packed);
}

#[test]
fn test_pitch_rows_with_short_input_leaves_zeroes() {
    let footprint = TextureFootprint::new(2, 3, 4);
    let pitched = pitch_rows(&[1u8; 8], &footprint);
    assert!(pitched[..8].iter().all(|b| *b == 1));
    assert!(pitched[256..].iter().all(|b| *b == 0));
}
