//! This module provides shared, low-level conversions between raw byte buffers
//! and typed slices.
//!
//! All conversions are panic-free and validated: pipeline buffers are plain
//! `Vec<u8>` with no alignment guarantee, so the bytes-to-typed direction
//! always copies (`pod_collect_to_vec`) instead of reinterpreting in place.

use crate::error::TszipError;

/// Copies a byte slice into a vector of a primitive type.
///
/// Returns `TszipError::BufferMismatch` if the byte length is not a multiple
/// of the element size, which in the decode path means a corrupt payload.
pub fn bytes_to_typed_vec<T: bytemuck::Pod>(bytes: &[u8]) -> Result<Vec<T>, TszipError> {
    let element_size = std::mem::size_of::<T>();
    if element_size == 0 || bytes.len() % element_size != 0 {
        return Err(TszipError::BufferMismatch(element_size, bytes.len()));
    }
    Ok(bytemuck::pod_collect_to_vec(bytes))
}

/// Converts a slice of primitive values into an owned byte vector.
/// Element bytes are in native (little-endian on all supported targets) order.
pub fn typed_slice_to_bytes<T: bytemuck::NoUninit>(data: &[T]) -> Vec<u8> {
    bytemuck::cast_slice(data).to_vec()
}

//==================================================================================
// Unit Tests
//==================================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typed_vec_roundtrip() {
        let original: Vec<i32> = vec![1, -2, 1_000_000];
        let bytes = typed_slice_to_bytes(&original);
        let back: Vec<i32> = bytes_to_typed_vec(&bytes).unwrap();
        assert_eq!(back, original);
    }

    #[test]
    fn test_length_mismatch_error() {
        let bytes: Vec<u8> = vec![0, 1, 2, 3, 4];
        let result: Result<Vec<i32>, _> = bytes_to_typed_vec(&bytes);
        assert!(matches!(result, Err(TszipError::BufferMismatch(4, 5))));
    }

    #[test]
    fn test_unaligned_input_still_decodes() {
        let original: Vec<u64> = vec![258, 1 << 40];
        let bytes = typed_slice_to_bytes(&original);
        // Force a deliberately misaligned view of the same bytes.
        let mut shifted = vec![0u8];
        shifted.extend_from_slice(&bytes);
        let back: Vec<u64> = bytes_to_typed_vec(&shifted[1..]).unwrap();
        assert_eq!(back, original);
    }
}
