//! Pure, stateless compression and decompression kernels.
//!
//! Each kernel declares a forward and an inverse transform over raw buffers and
//! is exact: `decode(encode(x)) == x` bit-for-bit for every representable
//! input, including empty and single-element arrays. Kernels know nothing about
//! columns, chains, or the container; the pipeline registry routes to them.

/// Value reduction.
pub mod delta;

/// Sparsity exploitation.
pub mod rle;

/// Bit-width reduction.
pub mod leb128;
pub mod zigzag;

/// Type normalization (float bits as unsigned integers).
pub mod bitcast;

/// Byte distribution.
pub mod shuffle;

/// Final stage: entropy coding.
pub mod zstd;
