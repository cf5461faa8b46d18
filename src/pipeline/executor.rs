//! The chain executor: applies a codec chain to a typed column, one fixed-size
//! chunk at a time.
//!
//! Chunks are independent. Each chunk flows through the filters via a pair of
//! swap buffers, tracking the dtype transform each filter declares, and is
//! finalized by the terminal coder. Decode replays the same dtype flow in
//! reverse, so a filter always knows which concrete type it is reconstructing.

use crate::error::TszipError;
use crate::pipeline::chain::CodecChain;
use crate::pipeline::registry::CodecRegistry;
use crate::types::DType;

/// Number of elements per chunk. Large enough that zstd sees a useful window,
/// small enough that decode working memory stays bounded.
pub const DEFAULT_CHUNK_LEN: usize = 65_536;

/// Encodes a typed column (given as raw little-endian bytes) into one encoded
/// payload per chunk. A zero-length column produces zero chunks.
pub fn encode_array(
    registry: &CodecRegistry,
    chain: &CodecChain,
    dtype: DType,
    input_bytes: &[u8],
    num_values: usize,
    chunk_len: usize,
) -> Result<Vec<Vec<u8>>, TszipError> {
    let elem_size = dtype.size();
    if input_bytes.len() != num_values * elem_size {
        return Err(TszipError::BufferMismatch(elem_size, input_bytes.len()));
    }
    if chunk_len == 0 {
        return Err(TszipError::InternalError(
            "chunk_len must be non-zero".to_string(),
        ));
    }
    if num_values == 0 {
        return Ok(Vec::new());
    }

    let mut chunks = Vec::with_capacity(num_values.div_ceil(chunk_len));
    let mut buffer_a = Vec::new();
    let mut buffer_b = Vec::new();

    for chunk_bytes in input_bytes.chunks(chunk_len * elem_size) {
        buffer_a.clear();
        buffer_a.extend_from_slice(chunk_bytes);

        let mut current_dtype = dtype;
        for spec in &chain.filters {
            let codec = registry.get(&spec.id)?;
            codec.encode(&buffer_a, &mut buffer_b, current_dtype, &spec.params)?;
            std::mem::swap(&mut buffer_a, &mut buffer_b);
            current_dtype = codec.transform_dtype(current_dtype, &spec.params)?;
        }

        let coder = registry.get(&chain.coder.id)?;
        coder.encode(&buffer_a, &mut buffer_b, current_dtype, &chain.coder.params)?;
        chunks.push(buffer_b.clone());
    }

    Ok(chunks)
}

/// Decodes the chunks produced by [`encode_array`] back into the column's raw
/// little-endian bytes. Every failure inside a decode step surfaces as
/// `DecodeError`, except a missing codec which stays `UnsupportedCodec`.
pub fn decode_array(
    registry: &CodecRegistry,
    chain: &CodecChain,
    dtype: DType,
    chunks: &[Vec<u8>],
    num_values: usize,
    chunk_len: usize,
) -> Result<Vec<u8>, TszipError> {
    if chunk_len == 0 {
        return Err(TszipError::DecodeError(
            "chunk_len must be non-zero".to_string(),
        ));
    }

    // The dtype entering each filter on the encode side. dtype_flow[i] is the
    // type filter i must reconstruct when decoding.
    let mut dtype_flow = vec![dtype];
    for spec in &chain.filters {
        let codec = registry.get(&spec.id)?;
        let next = codec
            .transform_dtype(*dtype_flow.last().unwrap_or(&dtype), &spec.params)
            .map_err(as_decode_error)?;
        dtype_flow.push(next);
    }
    let coder_dtype = *dtype_flow.last().unwrap_or(&dtype);

    let expected_chunks = num_values.div_ceil(chunk_len);
    if chunks.len() != expected_chunks {
        return Err(TszipError::DecodeError(format!(
            "Expected {} chunks for {} values, found {}",
            expected_chunks,
            num_values,
            chunks.len()
        )));
    }

    let mut out = Vec::with_capacity(num_values * dtype.size());
    let mut buffer_a = Vec::new();
    let mut buffer_b = Vec::new();
    let mut remaining = num_values;

    for chunk in chunks {
        let n = remaining.min(chunk_len);

        let coder = registry.get(&chain.coder.id)?;
        coder
            .decode(chunk, &mut buffer_a, coder_dtype, n, &chain.coder.params)
            .map_err(as_decode_error)?;

        for (i, spec) in chain.filters.iter().enumerate().rev() {
            let codec = registry.get(&spec.id)?;
            codec
                .decode(&buffer_a, &mut buffer_b, dtype_flow[i], n, &spec.params)
                .map_err(as_decode_error)?;
            std::mem::swap(&mut buffer_a, &mut buffer_b);
        }

        if buffer_a.len() != n * dtype.size() {
            return Err(TszipError::DecodeError(format!(
                "Chunk decoded to {} bytes, expected {}",
                buffer_a.len(),
                n * dtype.size()
            )));
        }
        out.extend_from_slice(&buffer_a);
        remaining -= n;
    }

    if out.len() != num_values * dtype.size() {
        return Err(TszipError::DecodeError(format!(
            "Column decoded to {} bytes, expected {}",
            out.len(),
            num_values * dtype.size()
        )));
    }
    Ok(out)
}

/// Decode-side failures are reported uniformly, whatever layer they came from.
/// A missing codec stays `UnsupportedCodec` so callers can distinguish "file
/// needs a newer reader" from "file is damaged".
fn as_decode_error(err: TszipError) -> TszipError {
    match err {
        TszipError::DecodeError(_) | TszipError::UnsupportedCodec(_) => err,
        other => TszipError::DecodeError(other.to_string()),
    }
}

//==================================================================================
// Unit Tests
//==================================================================================
