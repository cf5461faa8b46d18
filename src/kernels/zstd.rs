//! Kernel wrapping Zstandard compression and decompression.
//!
//! The terminal entropy coder of every codec chain: it receives a byte buffer
//! already reshaped by the preceding filters and produces the final compressed
//! payload. A safe, panic-free wrapper around the `zstd` crate's streaming API.

use std::io::Write;
use zstd::stream::{Decoder, Encoder};

use crate::error::TszipError;

//==================================================================================
// 1. Core Logic
//==================================================================================

fn compress_slice(
    input_bytes: &[u8],
    output_buf: &mut Vec<u8>,
    level: i32,
) -> Result<(), TszipError> {
    let mut encoder = Encoder::new(output_buf, level)
        .map_err(|e| TszipError::InternalError(format!("Zstd encoder setup failed: {e}")))?;
    encoder
        .write_all(input_bytes)
        .map_err(|e| TszipError::InternalError(format!("Zstd compression failed: {e}")))?;
    // `finish` is essential to finalize the Zstd frame.
    encoder
        .finish()
        .map_err(|e| TszipError::InternalError(format!("Zstd frame finalize failed: {e}")))?;
    Ok(())
}

fn decompress_slice(input_bytes: &[u8], output_buf: &mut Vec<u8>) -> Result<(), TszipError> {
    let mut decoder = Decoder::new(input_bytes)
        .map_err(|e| TszipError::DecodeError(format!("Zstd decoder setup failed: {e}")))?;
    std::io::copy(&mut decoder, output_buf)
        .map_err(|e| TszipError::DecodeError(format!("Zstd decompression failed: {e}")))?;
    Ok(())
}

//==================================================================================
// 2. Public API
//==================================================================================

/// Compresses `input_bytes` at the given level into `output_buf`.
pub fn encode(input_bytes: &[u8], output_buf: &mut Vec<u8>, level: i32) -> Result<(), TszipError> {
    output_buf.clear();
    compress_slice(input_bytes, output_buf, level)
}

/// Decompresses a Zstandard frame into `output_buf`.
/// A corrupt or truncated frame fails with `DecodeError`.
pub fn decode(input_bytes: &[u8], output_buf: &mut Vec<u8>) -> Result<(), TszipError> {
    output_buf.clear();
    decompress_slice(input_bytes, output_buf)
}

//==================================================================================
// 3. Unit Tests
//==================================================================================
