//! Little-endian integer and bit-field extraction from byte windows

/// Read an unsigned little-endian integer of up to `length` bytes at `index`.
///
/// Bytes past the end of `data` are not read; a truncated read yields the
/// smaller integer formed by the bytes that exist.
pub fn get_int(data: &[u8], index: usize, length: usize) -> u32 {
    data.iter()
        .skip(index)
        .take(length.min(4))
        .enumerate()
        .fold(0, |value, (i, byte)| value | (u32::from(*byte) << (i * 8)))
}

/// Read the 3-byte window at `index`, mask it and right-justify the field.
pub fn get_bits(data: &[u8], index: usize, mask: u32) -> u32 {
    if mask == 0 {
        return 0;
    }
    (get_int(data, index, 3) & mask) >> mask.trailing_zeros()
}
