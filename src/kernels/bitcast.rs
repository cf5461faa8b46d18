//! Kernel for bit-casting between same-width primitive types.
//!
//! Reinterprets IEEE-754 float bit patterns as unsigned integers so that the
//! integer transforms (delta, shuffle) apply to float columns. The mapping is
//! exact for every bit pattern, including NaNs and signed zeros.

use crate::error::TszipError;
use bytemuck::AnyBitPattern;

//==================================================================================
// 1. Private Core Logic
//==================================================================================

fn bitcast_internal<I, O>(input_bytes: &[u8], output_buf: &mut Vec<u8>) -> Result<(), TszipError>
where
    I: AnyBitPattern,
    O: AnyBitPattern,
{
    if std::mem::size_of::<I>() != std::mem::size_of::<O>() {
        return Err(TszipError::InternalError(format!(
            "Bit-cast size mismatch: {} ({} bytes) -> {} ({} bytes)",
            std::any::type_name::<I>(),
            std::mem::size_of::<I>(),
            std::any::type_name::<O>(),
            std::mem::size_of::<O>()
        )));
    }
    if input_bytes.len() % std::mem::size_of::<I>() != 0 {
        return Err(TszipError::BufferMismatch(
            std::mem::size_of::<I>(),
            input_bytes.len(),
        ));
    }
    // Same size, same bytes: the "cast" is a plain copy of the buffer.
    output_buf.clear();
    output_buf.extend_from_slice(input_bytes);
    Ok(())
}

//==================================================================================
// 2. Public API
//==================================================================================

/// Casts from type `I` to type `O` (e.g. `f64` -> `u64`).
pub fn encode<I, O>(input_bytes: &[u8], output_buf: &mut Vec<u8>) -> Result<(), TszipError>
where
    I: AnyBitPattern,
    O: AnyBitPattern,
{
    bitcast_internal::<I, O>(input_bytes, output_buf)
}

/// Casts from type `I` back to type `O` (e.g. `u64` -> `f64`).
pub fn decode<I, O>(input_bytes: &[u8], output_buf: &mut Vec<u8>) -> Result<(), TszipError>
where
    I: AnyBitPattern,
    O: AnyBitPattern,
{
    bitcast_internal::<I, O>(input_bytes, output_buf)
}

//==================================================================================
// 3. Unit Tests
//==================================================================================
