//! The codec policy table: one codec chain per table column, chosen for the
//! statistical shape that column is known to have.
//!
//! `policy_for` is a pure function over (table, column, dtype) and is
//! exhaustive over the table schema. A column it does not recognize is a
//! configuration error, not a fallback case: silently handing an unknown
//! column to a generic coder would degrade ratios without any signal.

use serde_json::json;

use crate::error::TszipError;
use crate::pipeline::{CodecChain, CodecSpec};
use crate::types::DType;

/// Zstd level used by every chain. Matches the "slow but small" end of the
/// scale; compression runs once, decompression is cheap at any level.
pub const ZSTD_LEVEL: i64 = 9;

/// The statistical shape of a column, which determines its filter chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Role {
    /// Monotonically sorted float positions. Bit-cast to integers, delta,
    /// then shuffle the small residual bytes into planes.
    SortedPosition,
    /// General float values (times, coordinates). Bit-cast and shuffle only;
    /// deltas of unsorted floats are noise.
    Float,
    /// Signed integer ids with no ordering guarantee.
    Id,
    /// Signed integer ids that are sorted or nearly sorted row-to-row.
    SortedId,
    /// Small repeated unsigned values (bit flags, enums).
    Flags,
    /// Ragged-column offset arrays: non-decreasing unsigned counters.
    Offset,
    /// Raw bytes of ragged payloads (metadata, allele strings, JSON).
    ByteData,
}

impl Role {
    fn chain(self) -> CodecChain {
        let coder = CodecSpec::with_params("zstd", json!({ "level": ZSTD_LEVEL }));
        let filters = match self {
            Role::SortedPosition => vec![
                CodecSpec::new("bitcast"),
                CodecSpec::with_params("delta", json!({ "order": 1 })),
                CodecSpec::new("shuffle"),
            ],
            Role::Float => vec![CodecSpec::new("bitcast"), CodecSpec::new("shuffle")],
            Role::Id => vec![CodecSpec::new("zigzag"), CodecSpec::new("leb128")],
            Role::SortedId => vec![
                CodecSpec::with_params("delta", json!({ "order": 1 })),
                CodecSpec::new("zigzag"),
                CodecSpec::new("leb128"),
            ],
            Role::Flags => vec![CodecSpec::new("rle")],
            Role::Offset => vec![
                CodecSpec::with_params("delta", json!({ "order": 1 })),
                CodecSpec::new("leb128"),
            ],
            Role::ByteData => vec![],
        };
        CodecChain::new(filters, coder)
    }
}

/// The schema dtype and role of every column the decomposition can produce,
/// including the `_offset` halves of ragged columns. Returns `None` for any
/// (table, column) pair outside the schema.
fn schema_entry(table: &str, column: &str) -> Option<(DType, Role)> {
    use DType::*;
    use Role::*;
    let entry = match (table, column) {
        ("individuals", "flags") => (UInt32, Flags),
        ("individuals", "location") => (Float64, Float),
        ("individuals", "location_offset") => (UInt64, Offset),
        ("individuals", "parents") => (Int32, Id),
        ("individuals", "parents_offset") => (UInt64, Offset),
        ("individuals", "metadata") => (UInt8, ByteData),
        ("individuals", "metadata_offset") => (UInt64, Offset),

        ("nodes", "flags") => (UInt32, Flags),
        ("nodes", "time") => (Float64, Float),
        ("nodes", "population") => (Int32, Id),
        ("nodes", "individual") => (Int32, Id),
        ("nodes", "metadata") => (UInt8, ByteData),
        ("nodes", "metadata_offset") => (UInt64, Offset),

        ("edges", "left") => (Float64, Float),
        ("edges", "right") => (Float64, Float),
        // Edges are sorted by parent time, so parent ids repeat in runs.
        ("edges", "parent") => (Int32, SortedId),
        ("edges", "child") => (Int32, Id),
        ("edges", "metadata") => (UInt8, ByteData),
        ("edges", "metadata_offset") => (UInt64, Offset),

        ("migrations", "left") => (Float64, Float),
        ("migrations", "right") => (Float64, Float),
        ("migrations", "node") => (Int32, Id),
        ("migrations", "source") => (Int32, Id),
        ("migrations", "dest") => (Int32, Id),
        ("migrations", "time") => (Float64, Float),
        ("migrations", "metadata") => (UInt8, ByteData),
        ("migrations", "metadata_offset") => (UInt64, Offset),

        ("sites", "position") => (Float64, SortedPosition),
        ("sites", "ancestral_state") => (UInt8, ByteData),
        ("sites", "ancestral_state_offset") => (UInt64, Offset),
        ("sites", "metadata") => (UInt8, ByteData),
        ("sites", "metadata_offset") => (UInt64, Offset),

        ("mutations", "site") => (Int32, SortedId),
        ("mutations", "node") => (Int32, Id),
        ("mutations", "parent") => (Int32, Id),
        ("mutations", "time") => (Float64, Float),
        ("mutations", "derived_state") => (UInt8, ByteData),
        ("mutations", "derived_state_offset") => (UInt64, Offset),
        ("mutations", "metadata") => (UInt8, ByteData),
        ("mutations", "metadata_offset") => (UInt64, Offset),

        ("populations", "metadata") => (UInt8, ByteData),
        ("populations", "metadata_offset") => (UInt64, Offset),

        ("provenances", "timestamp") => (UInt8, ByteData),
        ("provenances", "timestamp_offset") => (UInt64, Offset),
        ("provenances", "record") => (UInt8, ByteData),
        ("provenances", "record_offset") => (UInt64, Offset),

        _ => return None,
    };
    Some(entry)
}

/// Returns the codec chain for a column, or `SchemaMismatch` if the column is
/// outside the schema or its dtype differs from the schema's.
///
/// `dtype` is the column's logical dtype. Integer columns may later be stored
/// narrowed; every chain here is width-agnostic within its dtype category, so
/// the same chain applies to the narrowed form.
pub fn policy_for(table: &str, column: &str, dtype: DType) -> Result<CodecChain, TszipError> {
    let (expected, role) = schema_entry(table, column).ok_or_else(|| {
        TszipError::SchemaMismatch(format!("No codec policy for column {table}/{column}"))
    })?;
    if dtype != expected {
        return Err(TszipError::SchemaMismatch(format!(
            "Column {table}/{column} has dtype {dtype}, schema requires {expected}"
        )));
    }
    Ok(role.chain())
}

//==================================================================================
// Unit Tests
//==================================================================================
