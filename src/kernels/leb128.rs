//! Kernels for LEB128 (little-endian base 128) variable-length integer coding.
//!
//! Effective on streams of unsigned integers where most values are small, which
//! is exactly what the delta and zig-zag stages produce for id and offset
//! columns. Fully panic-free; `encode_one`/`decode_one` are shared with the
//! RLE kernel for its run lengths.

use num_traits::{PrimInt, Unsigned};
use std::io::Cursor;

use crate::error::TszipError;

//==================================================================================
// 1. Single-Value Coding
//==================================================================================

/// Appends one unsigned integer to `buffer` as a LEB128 byte sequence.
pub fn encode_one<T>(mut value: T, buffer: &mut Vec<u8>) -> Result<(), TszipError>
where
    T: PrimInt + Unsigned,
{
    let zero = T::zero();
    let seven_bit_mask = T::from(0x7F).ok_or_else(|| {
        TszipError::InternalError("Failed to create 7-bit mask for type".to_string())
    })?;
    let continuation_bit = T::from(0x80).ok_or_else(|| {
        TszipError::InternalError("Failed to create continuation bit for type".to_string())
    })?;

    loop {
        let mut byte = value & seven_bit_mask;
        value = value >> 7;
        if value != zero {
            byte = byte | continuation_bit;
        }
        let byte_u8 = byte.to_u8().ok_or_else(|| {
            TszipError::InternalError("Failed to convert generic integer to u8".to_string())
        })?;
        buffer.push(byte_u8);
        if value == zero {
            return Ok(());
        }
    }
}

/// Reads one unsigned integer from a LEB128 byte stream cursor.
pub fn decode_one<T>(cursor: &mut Cursor<&[u8]>) -> Result<T, TszipError>
where
    T: PrimInt + Unsigned,
{
    let mut result = T::zero();
    let mut shift = 0;
    let total_bits = std::mem::size_of::<T>() * 8;

    loop {
        let pos = cursor.position() as usize;
        let byte = *cursor
            .get_ref()
            .get(pos)
            .ok_or_else(|| TszipError::DecodeError("Unexpected end of LEB128 buffer".to_string()))?;
        cursor.set_position((pos + 1) as u64);

        let payload = T::from(byte & 0x7F).ok_or_else(|| {
            TszipError::InternalError("Failed to widen 7-bit payload".to_string())
        })?;
        result = result | (payload << shift);

        if byte & 0x80 == 0 {
            return Ok(result);
        }
        shift += 7;
        if shift >= total_bits {
            return Err(TszipError::DecodeError(
                "Integer overflow during LEB128 decoding".to_string(),
            ));
        }
    }
}

//==================================================================================
// 2. Public API
//==================================================================================

/// LEB128-encodes a slice of unsigned integers into `output_buf`.
pub fn encode<T>(input_slice: &[T], output_buf: &mut Vec<u8>) -> Result<(), TszipError>
where
    T: PrimInt + Unsigned,
{
    output_buf.clear();
    for &val in input_slice {
        encode_one(val, output_buf)?;
    }
    Ok(())
}

/// Decodes exactly `num_values` integers and writes their native-endian bytes
/// into `output_buf`. Trailing bytes after the last value are a corruption sign
/// and rejected.
pub fn decode<T>(
    input_bytes: &[u8],
    output_buf: &mut Vec<u8>,
    num_values: usize,
) -> Result<(), TszipError>
where
    T: PrimInt + Unsigned + bytemuck::NoUninit,
{
    output_buf.clear();
    output_buf.reserve(num_values * std::mem::size_of::<T>());

    let mut cursor = Cursor::new(input_bytes);
    for _ in 0..num_values {
        let val: T = decode_one(&mut cursor)?;
        output_buf.extend_from_slice(bytemuck::bytes_of(&val));
    }

    if (cursor.position() as usize) != input_bytes.len() {
        return Err(TszipError::DecodeError(
            "Trailing bytes after final LEB128 value".to_string(),
        ));
    }
    Ok(())
}

//==================================================================================
// 3. Unit Tests
//==================================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::typed_slice_to_bytes;

    #[test]
    fn test_roundtrip_u32() {
        let original: Vec<u32> = vec![0, 127, 128, 1000, u32::MAX];

        let mut encoded = Vec::new();
        encode(&original, &mut encoded).unwrap();

        let mut decoded = Vec::new();
        decode::<u32>(&encoded, &mut decoded, original.len()).unwrap();
        assert_eq!(decoded, typed_slice_to_bytes(&original));
    }

    #[test]
    fn test_roundtrip_u8() {
        let original: Vec<u8> = vec![0, 1, 127, 128, 255];

        let mut encoded = Vec::new();
        encode(&original, &mut encoded).unwrap();

        let mut decoded = Vec::new();
        decode::<u8>(&encoded, &mut decoded, original.len()).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn test_truncated_buffer_is_decode_error() {
        let original: Vec<u64> = vec![624485]; // Encodes to [0xE5, 0x8E, 0x26].
        let mut encoded = Vec::new();
        encode(&original, &mut encoded).unwrap();

        let truncated = &encoded[..encoded.len() - 1];
        let mut decoded = Vec::new();
        let result = decode::<u64>(truncated, &mut decoded, 1);
        assert!(matches!(result, Err(TszipError::DecodeError(_))));
    }

    #[test]
    fn test_overflow_is_decode_error() {
        let encoded = vec![0xFF; 11];
        let mut decoded = Vec::new();
        let result = decode::<u64>(&encoded, &mut decoded, 1);
        assert!(matches!(result, Err(TszipError::DecodeError(_))));
    }

    #[test]
    fn test_trailing_bytes_rejected() {
        let mut encoded = Vec::new();
        encode(&[5u32], &mut encoded).unwrap();
        encoded.push(0);

        let mut decoded = Vec::new();
        let result = decode::<u32>(&encoded, &mut decoded, 1);
        assert!(matches!(result, Err(TszipError::DecodeError(_))));
    }
}
