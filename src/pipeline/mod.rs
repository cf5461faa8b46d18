//! The column codec pipeline: self-describing codec chains, the codec
//! registry, and the chain executor.
//!
//! A chain is an ordered list of reversible filters terminated by exactly one
//! entropy coder. Encode applies the filters in order and then the coder;
//! decode applies the coder's inverse first and then the filters' inverses in
//! reverse order. The chain recorded in container metadata is always the exact
//! chain that produced the stored bytes.

pub mod chain;
pub mod executor;
pub mod registry;

pub use chain::{CodecChain, CodecSpec};
pub use executor::{decode_array, encode_array, DEFAULT_CHUNK_LEN};
pub use registry::{Codec, CodecRegistry};
