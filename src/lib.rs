//! Column-aware, lossless compression for tree-sequence genealogical data.
//!
//! Generic byte compressors do poorly on tree-sequence files because the
//! columnar, typed, often sorted structure of the tables is invisible to
//! them. This crate decomposes a table collection into its typed columns,
//! pushes each through a codec chain chosen for that column's statistical
//! shape (delta for sorted ids, float-bit delta for genomic positions, RLE
//! for flags), and packages the result as a single seekable container file.
//! Decompression is the exact inverse and reproduces every column
//! bit-for-bit.
//!
//! The two core operations:
//!
//! ```no_run
//! use tszip::{compress, decompress, CompressOptions};
//! use tszip::tables::{TableCollection, TreeSequence};
//! use std::path::Path;
//!
//! # fn main() -> Result<(), tszip::TszipError> {
//! let ts = TreeSequence::new(TableCollection::new(100.0))?;
//! compress(&ts, Path::new("example.tsz"), &CompressOptions::default())?;
//! let back = decompress(Path::new("example.tsz"))?;
//! assert_eq!(back, ts);
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod compress;
pub mod container;
pub mod decompose;
pub mod error;
pub mod kernels;
pub mod pipeline;
pub mod policy;
pub mod provenance;
pub mod tables;
pub mod traits;
pub mod types;
pub mod utils;

pub use compress::{
    compress, compress_path, compress_to, decompress, decompress_from, load, summary, ArrayStats,
    CompressOptions, ContainerSummary,
};
pub use container::{FORMAT_NAME, FORMAT_VERSION};
pub use error::TszipError;
pub use tables::{TableCollection, TreeSequence};

/// The version of this crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
