//! This module defines the single, unified error type for the entire tszip library.
//! It uses the `thiserror` crate to provide ergonomic, context-aware error handling.
//!
//! Every failure the core can produce is surfaced to the caller of
//! `compress`/`decompress`; nothing is silently recovered. The CLI is the only
//! layer that catches these, to print a message and set a non-zero exit code.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TszipError {
    // =========================================================================
    // === High-Level, Semantic Errors (Specific to our library's logic)
    // =========================================================================
    /// A table column has no entry in the codec policy table, or its dtype
    /// does not match the schema.
    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    /// A codec chain references a filter or coder id that is not registered.
    #[error("Codec chain references unregistered codec '{0}'")]
    UnsupportedCodec(String),

    /// A compressed payload is corrupt or truncated.
    #[error("Decoding failed: {0}")]
    DecodeError(String),

    /// Row counts or offset arrays are inconsistent during recomposition.
    #[error("Structural mismatch during recomposition: {0}")]
    StructuralMismatch(String),

    /// The recomposed table collection failed its structural validity check.
    #[error("Reconstructed table collection is invalid: {0}")]
    CorruptData(String),

    /// The container's major format version (or a required codec) is not supported.
    #[error("Incompatible container version: {0}")]
    IncompatibleVersion(String),

    /// The input is not in a recognizable file format.
    #[error("Unrecognized file format: {0}")]
    FileFormatError(String),

    #[error("Unsupported data type for this operation: {0}")]
    UnsupportedType(String),

    // =========================================================================
    // === External Error Wrappers (Using #[from] for automatic conversion)
    // =========================================================================
    /// An error originating from the underlying I/O subsystem.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An error from the Serde JSON library during footer/plan serialization.
    #[error("Serde JSON error: {0}")]
    SerdeJson(#[from] serde_json::Error),

    // =========================================================================
    // === Low-Level Pipeline/Kernel Errors
    // =========================================================================
    #[error("Buffer length mismatch: expected a multiple of {0}, got {1}")]
    BufferMismatch(usize, usize),

    #[error("Internal logic error (this is a bug): {0}")]
    InternalError(String),
}

// =============================================================================
// === Manual `From` Implementations ===
// =============================================================================

impl From<bytemuck::PodCastError> for TszipError {
    fn from(err: bytemuck::PodCastError) -> Self {
        TszipError::InternalError(format!("Byte slice casting failed: {err}"))
    }
}
