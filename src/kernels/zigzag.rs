//! Kernels for zig-zag encoding and decoding.
//!
//! A lossless, bitwise mapping of signed integers to unsigned integers that
//! keeps small-magnitude values small, so varint coding after a delta step
//! stays effective for negative deltas and null ids (-1). Panic-free.

use num_traits::{PrimInt, Signed, Unsigned};
use std::ops::{BitXor, Shl, Shr};

use crate::error::TszipError;
use crate::traits::{HasSigned, HasUnsigned};

//==================================================================================
// 1. Generic Core Logic
//==================================================================================

/// Encodes a single signed integer: `(n << 1) ^ (n >> (BITS - 1))`.
/// The right shift must be arithmetic, which `PrimInt` guarantees for signed types.
pub fn encode_val<T>(n: T) -> T::Unsigned
where
    T: PrimInt + Signed + HasUnsigned + Shl<usize, Output = T> + Shr<usize, Output = T> + BitXor<T, Output = T>,
    T::Unsigned: PrimInt,
{
    let bits = std::mem::size_of::<T>() * 8;
    let shifted = (n << 1) ^ (n >> (bits - 1));
    // Same-size bit reinterpretation; the pair types are linked by HasUnsigned.
    unsafe { std::mem::transmute_copy::<T, T::Unsigned>(&shifted) }
}

/// Decodes a single unsigned integer: `(n >> 1) ^ -(n & 1)`.
pub fn decode_val<U>(n: U) -> U::Signed
where
    U: PrimInt + Unsigned + HasSigned + Shr<usize, Output = U> + BitXor<U, Output = U>,
    U::Signed: PrimInt + std::ops::Neg<Output = U::Signed>,
{
    let shifted = n >> 1;
    let lsb = n & U::one();
    let signed_shifted = unsafe { std::mem::transmute_copy::<U, U::Signed>(&shifted) };
    let signed_lsb = unsafe { std::mem::transmute_copy::<U, U::Signed>(&lsb) };
    signed_shifted ^ (-signed_lsb)
}

//==================================================================================
// 2. Public API
//==================================================================================

/// Zig-zag encodes a slice of signed integers into `output_buf`.
pub fn encode<T>(input_slice: &[T], output_buf: &mut Vec<u8>) -> Result<(), TszipError>
where
    T: PrimInt + Signed + HasUnsigned + Shl<usize, Output = T> + Shr<usize, Output = T> + BitXor<T, Output = T>,
    T::Unsigned: PrimInt + bytemuck::NoUninit,
{
    output_buf.clear();
    output_buf.reserve(input_slice.len() * std::mem::size_of::<T::Unsigned>());
    for &value in input_slice {
        let encoded = encode_val(value);
        output_buf.extend_from_slice(bytemuck::bytes_of(&encoded));
    }
    Ok(())
}

/// Zig-zag decodes a slice of unsigned integers back to signed, into `output_buf`.
pub fn decode<U>(input_slice: &[U], output_buf: &mut Vec<u8>) -> Result<(), TszipError>
where
    U: PrimInt + Unsigned + HasSigned + Shr<usize, Output = U> + BitXor<U, Output = U>,
    U::Signed: PrimInt + bytemuck::NoUninit + std::ops::Neg<Output = U::Signed>,
{
    output_buf.clear();
    output_buf.reserve(input_slice.len() * std::mem::size_of::<U::Signed>());
    for &value in input_slice {
        let decoded = decode_val(value);
        output_buf.extend_from_slice(bytemuck::bytes_of(&decoded));
    }
    Ok(())
}

//==================================================================================
// 3. Unit Tests
//==================================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::{bytes_to_typed_vec, typed_slice_to_bytes};

    #[test]
    fn test_core_mapping_i32() {
        assert_eq!(encode_val(0i32), 0u32);
        assert_eq!(encode_val(-1i32), 1u32);
        assert_eq!(encode_val(1i32), 2u32);

        assert_eq!(decode_val(0u32), 0i32);
        assert_eq!(decode_val(1u32), -1i32);
        assert_eq!(decode_val(2u32), 1i32);
    }

    #[test]
    fn test_roundtrip_i16() {
        let original: Vec<i16> = vec![-5, 4, -3, 2, -1, 0, 100, -100];

        let mut encoded = Vec::new();
        encode(&original, &mut encoded).unwrap();
        let encoded_vals: Vec<u16> = bytes_to_typed_vec(&encoded).unwrap();
        assert_eq!(encoded_vals[0], 9u16);
        assert_eq!(encoded_vals[1], 8u16);

        let mut decoded = Vec::new();
        decode(&encoded_vals, &mut decoded).unwrap();
        assert_eq!(decoded, typed_slice_to_bytes(&original));
    }

    #[test]
    fn test_extreme_values_i64() {
        let original: Vec<i64> = vec![i64::MAX, i64::MIN, -1, 0, 1];

        let mut encoded = Vec::new();
        encode(&original, &mut encoded).unwrap();
        let encoded_vals: Vec<u64> = bytes_to_typed_vec(&encoded).unwrap();

        let mut decoded = Vec::new();
        decode(&encoded_vals, &mut decoded).unwrap();
        assert_eq!(decoded, typed_slice_to_bytes(&original));
    }

    #[test]
    fn test_empty_slice() {
        let original: Vec<i32> = vec![];
        let mut encoded = Vec::new();
        encode(&original, &mut encoded).unwrap();
        assert!(encoded.is_empty());
    }
}
