//! Kernels for run-length encoding and decoding.
//!
//! Effective for low-cardinality columns with long runs of identical values,
//! such as node and individual flag columns. The wire format is a sequence of
//! `(value, run_length)` pairs with the run length LEB128-encoded.

use num_traits::PrimInt;
use std::io::Cursor;

use super::leb128;
use crate::error::TszipError;

//==================================================================================
// 1. Public API
//==================================================================================

/// Run-length encodes `input_slice` into `output_buf`.
pub fn encode<T>(input_slice: &[T], output_buf: &mut Vec<u8>) -> Result<(), TszipError>
where
    T: PrimInt + bytemuck::NoUninit,
{
    output_buf.clear();
    if input_slice.is_empty() {
        return Ok(());
    }

    let mut current_val = input_slice[0];
    let mut run_count: u64 = 1;

    for &val in &input_slice[1..] {
        if val == current_val {
            run_count += 1;
        } else {
            output_buf.extend_from_slice(bytemuck::bytes_of(&current_val));
            leb128::encode_one(run_count, output_buf)?;
            current_val = val;
            run_count = 1;
        }
    }
    output_buf.extend_from_slice(bytemuck::bytes_of(&current_val));
    leb128::encode_one(run_count, output_buf)?;
    Ok(())
}

/// Expands run-length pairs back into exactly `num_values` values.
pub fn decode<T>(
    input_bytes: &[u8],
    output_buf: &mut Vec<u8>,
    num_values: usize,
) -> Result<(), TszipError>
where
    T: PrimInt + bytemuck::AnyBitPattern,
{
    let element_size = std::mem::size_of::<T>();
    output_buf.clear();
    output_buf.reserve(num_values * element_size);

    let mut cursor = Cursor::new(input_bytes);
    while (cursor.position() as usize) < input_bytes.len() {
        let start = cursor.position() as usize;
        let value_bytes = input_bytes.get(start..start + element_size).ok_or_else(|| {
            TszipError::DecodeError("Truncated RLE buffer: cannot read value".to_string())
        })?;
        cursor.set_position((start + element_size) as u64);

        let run_length = leb128::decode_one::<u64>(&mut cursor)?;
        // Compared in u64: `run_length as usize * element_size` can overflow
        // on a crafted payload before the bound is ever checked.
        let remaining = (num_values - output_buf.len() / element_size) as u64;
        if run_length > remaining {
            return Err(TszipError::DecodeError(
                "RLE run overflows the expected value count".to_string(),
            ));
        }
        for _ in 0..run_length {
            output_buf.extend_from_slice(value_bytes);
        }
    }

    if output_buf.len() / element_size != num_values {
        return Err(TszipError::DecodeError(format!(
            "RLE decoded to {} values, but expected {}",
            output_buf.len() / element_size,
            num_values
        )));
    }
    Ok(())
}

//==================================================================================
// 2. Unit Tests
//==================================================================================
