//! The top-level facade: compress a tree sequence into a container file and
//! reconstruct one back out.
//!
//! Compression decomposes the collection into named columns (materializing
//! them all), narrows integer columns to their minimal dtype, encodes each
//! through its policy chain and streams the result through the container
//! writer. Decompression validates the container and codec ids up front,
//! then decodes column by column; decode working memory beyond the
//! accumulated output is one column's chunks at a time.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufReader, Read, Seek, SeekFrom, Write};
use std::path::Path;

use serde_json::json;

use crate::container::{AtomicFile, ContainerReader, ContainerWriter, MAGIC};
use crate::decompose::{decompose, recompose, Decomposed};
use crate::error::TszipError;
use crate::pipeline::{decode_array, encode_array, CodecChain, CodecRegistry, DEFAULT_CHUNK_LEN};
use crate::policy::policy_for;
use crate::provenance::provenance_record;
use crate::tables::TreeSequence;
use crate::types::ColumnData;

/// Knobs for a compress call.
#[derive(Debug, Clone)]
pub struct CompressOptions {
    /// Elements per independently compressed chunk.
    pub chunk_len: usize,
    /// Per-array chain overrides, keyed by array name (`table/column`).
    /// Arrays not listed use the policy table.
    pub overrides: BTreeMap<String, CodecChain>,
    /// Overwrite an existing destination instead of refusing.
    pub force: bool,
}

impl Default for CompressOptions {
    fn default() -> Self {
        Self {
            chunk_len: DEFAULT_CHUNK_LEN,
            overrides: BTreeMap::new(),
            force: false,
        }
    }
}

//==================================================================================
// 1. Compression
//==================================================================================

/// Compresses a tree sequence to a container file at `dest`.
///
/// Refuses to overwrite an existing destination unless `options.force` is
/// set. The file is written to a temp sibling and renamed into place, so an
/// interrupted run never leaves a partial file under the final name.
pub fn compress(ts: &TreeSequence, dest: &Path, options: &CompressOptions) -> Result<(), TszipError> {
    if !options.force && dest.exists() {
        return Err(TszipError::Io(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!("'{}' already exists", dest.display()),
        )));
    }
    let file = AtomicFile::create(dest)?;
    let file = compress_to(ts, file, options)?;
    file.commit()
}

/// Loads a tree sequence from `source` (container or plain dump alike) and
/// compresses it to `dest`.
pub fn compress_path(
    source: &Path,
    dest: &Path,
    options: &CompressOptions,
) -> Result<(), TszipError> {
    let ts = load(source)?;
    compress(&ts, dest, options)
}

/// Compresses a tree sequence to any byte sink, returning the sink.
pub fn compress_to<W: Write>(
    ts: &TreeSequence,
    writer: W,
    options: &CompressOptions,
) -> Result<W, TszipError> {
    let registry = CodecRegistry::builtin();
    let decomposed = decompose(ts.tables());
    let mut container = ContainerWriter::new(writer)?;

    for (name, column) in &decomposed.arrays {
        let (table, column_name) = name.split_once('/').ok_or_else(|| {
            TszipError::InternalError(format!("Array name '{name}' is not table/column"))
        })?;
        let chain = match options.overrides.get(name) {
            Some(chain) => chain.clone(),
            None => policy_for(table, column_name, column.dtype())?,
        };

        let stored_dtype = column.minimal_dtype();
        let stored = column.cast_to(stored_dtype)?;
        let raw_bytes = stored.to_bytes();
        let chunks = encode_array(
            &registry,
            &chain,
            stored_dtype,
            &raw_bytes,
            stored.len(),
            options.chunk_len,
        )?;

        let stored_size: usize = chunks.iter().map(Vec::len).sum();
        let actual_size = column.len() * column.dtype().size();
        log::debug!(
            "{name}: {} values, {} -> {} bytes ({:.2}x), stored as {stored_dtype}",
            column.len(),
            actual_size,
            stored_size,
            actual_size as f64 / stored_size.max(1) as f64,
        );

        container.write_array(
            name,
            column.dtype(),
            stored_dtype,
            column.len(),
            options.chunk_len,
            chain,
            &chunks,
        )?;
    }

    let provenance = provenance_record(json!({
        "command": "compress",
        "chunk_len": options.chunk_len,
    }));
    container.finish(
        ts.tables().sequence_length,
        decomposed.row_counts,
        provenance,
    )
}

//==================================================================================
// 2. Decompression
//==================================================================================

/// Decompresses a container file back into a validated tree sequence.
pub fn decompress(source: &Path) -> Result<TreeSequence, TszipError> {
    decompress_from(BufReader::new(File::open(source)?))
}

/// Decompresses a container from any seekable source.
pub fn decompress_from<R: Read + Seek>(reader: R) -> Result<TreeSequence, TszipError> {
    let registry = CodecRegistry::builtin();
    let mut container = ContainerReader::open(reader)?;
    container.check_codecs(&registry)?;

    let descriptors = container.metadata().arrays.clone();
    let row_counts = container.metadata().row_counts.clone();
    let sequence_length = container.metadata().sequence_length;

    let mut arrays = BTreeMap::new();
    for (name, descriptor) in descriptors {
        let chunks = container.read_array(&name)?;
        let raw_bytes = decode_array(
            &registry,
            &descriptor.chain,
            descriptor.stored_dtype,
            &chunks,
            descriptor.num_values as usize,
            descriptor.chunk_len as usize,
        )?;
        let stored = ColumnData::from_bytes(descriptor.stored_dtype, &raw_bytes)?;
        // A footer pairing dtypes no narrowing step produces is metadata
        // corruption, not a missing capability.
        let column = stored.cast_to(descriptor.dtype).map_err(|e| match e {
            TszipError::UnsupportedType(_) => TszipError::StructuralMismatch(format!(
                "Array '{name}' stored as {} cannot restore dtype {}",
                descriptor.stored_dtype, descriptor.dtype
            )),
            other => other,
        })?;
        arrays.insert(name, column);
    }

    recompose(Decomposed { arrays, row_counts }, sequence_length)
}

/// Opens either a container or a plain tree-sequence dump, sniffing the
/// leading magic to decide.
pub fn load(source: &Path) -> Result<TreeSequence, TszipError> {
    let mut file = File::open(source)?;
    let mut magic = [0u8; 8];
    let is_container = match file.read_exact(&mut magic) {
        Ok(()) => &magic == MAGIC,
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => false,
        Err(e) => return Err(TszipError::Io(e)),
    };
    file.seek(SeekFrom::Start(0))?;
    if is_container {
        decompress_from(BufReader::new(file))
    } else {
        TreeSequence::load(BufReader::new(file))
    }
}

//==================================================================================
// 3. List-Mode Summaries
//==================================================================================

/// Per-array size statistics, computed from metadata alone.
#[derive(Debug, Clone)]
pub struct ArrayStats {
    pub name: String,
    pub stored_size: u64,
    pub actual_size: u64,
}

#[derive(Debug, Clone)]
pub struct ContainerSummary {
    pub format_version: (u32, u32),
    pub sequence_length: f64,
    pub arrays: Vec<ArrayStats>,
}

impl ContainerSummary {
    pub fn total_stored(&self) -> u64 {
        self.arrays.iter().map(|a| a.stored_size).sum()
    }

    pub fn total_actual(&self) -> u64 {
        self.arrays.iter().map(|a| a.actual_size).sum()
    }
}

/// Reads a container's metadata without touching any payload.
pub fn summary(source: &Path) -> Result<ContainerSummary, TszipError> {
    let container = ContainerReader::open(BufReader::new(File::open(source)?))?;
    let metadata = container.metadata();
    Ok(ContainerSummary {
        format_version: metadata.format_version,
        sequence_length: metadata.sequence_length,
        arrays: metadata
            .arrays
            .iter()
            .map(|(name, descriptor)| ArrayStats {
                name: name.clone(),
                stored_size: descriptor.stored_size(),
                actual_size: descriptor.actual_size(),
            })
            .collect(),
    })
}

//==================================================================================
// 4. Unit Tests
//==================================================================================
