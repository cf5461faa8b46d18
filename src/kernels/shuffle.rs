//! Kernel for byte-shuffling streams of fixed-width primitives.
//!
//! Reorganizes a row-oriented byte stream into byte planes (all first bytes,
//! then all second bytes, ...), which groups the slowly-varying high bytes of
//! float and wide-integer columns together for the entropy coder.

use crate::error::TszipError;

//==================================================================================
// 1. Generic Core Logic
//==================================================================================

fn shuffle_slice<T>(input_slice: &[T], output_buf: &mut Vec<u8>) -> Result<(), TszipError>
where
    T: bytemuck::NoUninit,
{
    let element_size = std::mem::size_of::<T>();
    if element_size <= 1 {
        output_buf.clear();
        output_buf.extend_from_slice(bytemuck::cast_slice(input_slice));
        return Ok(());
    }

    let num_elements = input_slice.len();
    output_buf.clear();
    output_buf.resize(num_elements * element_size, 0);

    for i in 0..element_size {
        for (j, value) in input_slice.iter().enumerate() {
            output_buf[i * num_elements + j] = bytemuck::bytes_of(value)[i];
        }
    }
    Ok(())
}

fn unshuffle_slice(
    input_bytes: &[u8],
    output_buf: &mut Vec<u8>,
    element_size: usize,
) -> Result<(), TszipError> {
    if element_size <= 1 {
        output_buf.clear();
        output_buf.extend_from_slice(input_bytes);
        return Ok(());
    }
    if input_bytes.len() % element_size != 0 {
        return Err(TszipError::DecodeError(format!(
            "Shuffled buffer length {} is not a multiple of element size {}",
            input_bytes.len(),
            element_size
        )));
    }

    let num_elements = input_bytes.len() / element_size;
    output_buf.clear();
    output_buf.resize(input_bytes.len(), 0);

    for i in 0..element_size {
        for j in 0..num_elements {
            output_buf[j * element_size + i] = input_bytes[i * num_elements + j];
        }
    }
    Ok(())
}

//==================================================================================
// 2. Public API
//==================================================================================

/// Shuffles a typed slice into byte-plane order.
pub fn encode<T>(input_slice: &[T], output_buf: &mut Vec<u8>) -> Result<(), TszipError>
where
    T: bytemuck::NoUninit,
{
    shuffle_slice(input_slice, output_buf)
}

/// Restores row order from a byte-plane buffer of `element_size`-wide values.
pub fn decode(
    input_bytes: &[u8],
    output_buf: &mut Vec<u8>,
    element_size: usize,
) -> Result<(), TszipError> {
    unshuffle_slice(input_bytes, output_buf, element_size)
}

//==================================================================================
// 3. Unit Tests
//==================================================================================
