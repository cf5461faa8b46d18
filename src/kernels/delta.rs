//! Kernels for delta encoding and decoding of integer streams.
//!
//! Sorted or slowly-varying columns (genomic positions after bit-casting,
//! ragged offsets, parent ids) turn into streams of small values under this
//! transform, which the later bit-width stages then shrink. The core algorithms
//! run **in-place** on a scratch copy; the public API conforms to the
//! executor's output-buffer contract.

use num_traits::{PrimInt, WrappingAdd, WrappingSub};

use crate::error::TszipError;
use crate::utils::typed_slice_to_bytes;

//==================================================================================
// 1. Generic Core Logic
//==================================================================================

/// Delta-encodes a mutable slice in place: `data[i] -= data[i - order]`.
/// Iterates backwards so the original values feed every subtraction.
fn encode_slice_inplace<T>(data: &mut [T], order: usize)
where
    T: PrimInt + WrappingSub,
{
    if order == 0 || data.len() <= order {
        return;
    }
    for i in (order..data.len()).rev() {
        data[i] = data[i].wrapping_sub(&data[i - order]);
    }
}

/// Delta-decodes (cumulative sum) a mutable slice in place.
/// Iterates forwards so already-decoded values feed every addition.
fn decode_slice_inplace<T>(data: &mut [T], order: usize)
where
    T: PrimInt + WrappingAdd,
{
    if order == 0 || data.len() <= order {
        return;
    }
    for i in order..data.len() {
        data[i] = data[i].wrapping_add(&data[i - order]);
    }
}

//==================================================================================
// 2. Public API
//==================================================================================

/// Delta-encodes `input_slice` and appends the result bytes to `output_buf`.
pub fn encode<T>(input_slice: &[T], output_buf: &mut Vec<u8>, order: usize) -> Result<(), TszipError>
where
    T: PrimInt + WrappingSub + bytemuck::NoUninit,
{
    let mut data = input_slice.to_vec();
    encode_slice_inplace(&mut data, order);
    output_buf.clear();
    output_buf.extend_from_slice(&typed_slice_to_bytes(&data));
    Ok(())
}

/// Reconstructs the original values from a delta-encoded slice.
pub fn decode<T>(input_slice: &[T], output_buf: &mut Vec<u8>, order: usize) -> Result<(), TszipError>
where
    T: PrimInt + WrappingAdd + bytemuck::NoUninit,
{
    let mut data = input_slice.to_vec();
    decode_slice_inplace(&mut data, order);
    output_buf.clear();
    output_buf.extend_from_slice(&typed_slice_to_bytes(&data));
    Ok(())
}

//==================================================================================
// 3. Unit Tests
//==================================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::bytes_to_typed_vec;

    #[test]
    fn test_roundtrip_order_1() {
        let original: Vec<i64> = vec![100, 110, 115, 112, 122];

        let mut encoded = Vec::new();
        encode(&original, &mut encoded, 1).unwrap();
        let encoded_vals: Vec<i64> = bytes_to_typed_vec(&encoded).unwrap();
        assert_eq!(encoded_vals, vec![100, 10, 5, -3, 10]);

        let mut decoded = Vec::new();
        decode(&encoded_vals, &mut decoded, 1).unwrap();
        assert_eq!(bytes_to_typed_vec::<i64>(&decoded).unwrap(), original);
    }

    #[test]
    fn test_roundtrip_higher_order() {
        let original: Vec<u32> = vec![10, 20, 15, 28, 25];
        let mut buffer = original.clone();

        encode_slice_inplace(&mut buffer, 2);
        assert_eq!(buffer, vec![10, 20, 5, 8, 10]);

        decode_slice_inplace(&mut buffer, 2);
        assert_eq!(buffer, original);
    }

    #[test]
    fn test_wrapping_at_extremes() {
        let original: Vec<u8> = vec![255, 0, 255, 0];
        let mut encoded = Vec::new();
        encode(&original, &mut encoded, 1).unwrap();

        let encoded_vals: Vec<u8> = bytes_to_typed_vec(&encoded).unwrap();
        let mut decoded = Vec::new();
        decode(&encoded_vals, &mut decoded, 1).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn test_empty_and_single_element() {
        for original in [vec![], vec![42i32]] {
            let mut encoded = Vec::new();
            encode(&original, &mut encoded, 1).unwrap();
            let encoded_vals: Vec<i32> = bytes_to_typed_vec(&encoded).unwrap();
            assert_eq!(encoded_vals, original);

            let mut decoded = Vec::new();
            decode(&encoded_vals, &mut decoded, 1).unwrap();
            assert_eq!(bytes_to_typed_vec::<i32>(&decoded).unwrap(), original);
        }
    }
}
