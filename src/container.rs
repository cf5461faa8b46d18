//! The container format: a magic-framed payload stream with a JSON footer.
//!
//! Layout, front to back:
//!
//! `[8-byte magic] [array payloads, chunk after chunk] [JSON footer]
//!  [footer length, u64 LE] [8-byte magic]`
//!
//! The footer carries the format name and version, the per-array descriptors
//! (dtype, stored dtype, chunk layout, codec chain, payload offset) and the
//! provenance record. Putting it at the end lets the writer stream payloads
//! with O(chunk) memory; the reader still validates the leading magic before
//! parsing anything else, so a non-container input fails with
//! `FileFormatError` up front.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::TszipError;
use crate::pipeline::{CodecChain, CodecRegistry};
use crate::types::DType;

/// Leading and trailing frame marker.
pub const MAGIC: &[u8; 8] = b"\x89TSZ\r\n\x1a\n";

pub const FORMAT_NAME: &str = "tszip";
pub const FORMAT_VERSION: (u32, u32) = (1, 0);

//==================================================================================
// 1. Metadata Schema
//==================================================================================

/// Everything needed to locate and decode one stored array.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ArrayDescriptor {
    /// The column's logical dtype, restored on decode.
    pub dtype: DType,
    /// The dtype actually encoded, after integer narrowing.
    pub stored_dtype: DType,
    pub num_values: u64,
    pub chunk_len: u64,
    pub chain: CodecChain,
    /// Byte offset of the first chunk, relative to the payload region.
    pub offset: u64,
    /// Compressed size of each chunk, in payload order.
    pub chunk_sizes: Vec<u64>,
}

impl ArrayDescriptor {
    /// Total compressed bytes occupied by this array's payload.
    pub fn stored_size(&self) -> u64 {
        self.chunk_sizes.iter().sum()
    }

    /// Uncompressed size of the logical column.
    pub fn actual_size(&self) -> u64 {
        self.num_values * self.dtype.size() as u64
    }
}

/// The footer record. Unknown fields written by newer minor versions are
/// ignored on read.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ContainerMetadata {
    pub format_name: String,
    pub format_version: (u32, u32),
    pub sequence_length: f64,
    pub row_counts: BTreeMap<String, u64>,
    pub provenance: Value,
    pub arrays: BTreeMap<String, ArrayDescriptor>,
}

//==================================================================================
// 2. Writer
//==================================================================================

/// Streams a container to any `Write` sink. Arrays are appended one at a
/// time; `finish` emits the footer and trailing frame.
pub struct ContainerWriter<W: Write> {
    writer: W,
    payload_len: u64,
    arrays: BTreeMap<String, ArrayDescriptor>,
}

impl<W: Write> ContainerWriter<W> {
    pub fn new(mut writer: W) -> Result<Self, TszipError> {
        writer.write_all(MAGIC)?;
        Ok(Self {
            writer,
            payload_len: 0,
            arrays: BTreeMap::new(),
        })
    }

    /// Appends one encoded array's chunks and records its descriptor.
    #[allow(clippy::too_many_arguments)]
    pub fn write_array(
        &mut self,
        name: &str,
        dtype: DType,
        stored_dtype: DType,
        num_values: usize,
        chunk_len: usize,
        chain: CodecChain,
        chunks: &[Vec<u8>],
    ) -> Result<(), TszipError> {
        let offset = self.payload_len;
        let mut chunk_sizes = Vec::with_capacity(chunks.len());
        for chunk in chunks {
            self.writer.write_all(chunk)?;
            self.payload_len += chunk.len() as u64;
            chunk_sizes.push(chunk.len() as u64);
        }
        self.arrays.insert(
            name.to_string(),
            ArrayDescriptor {
                dtype,
                stored_dtype,
                num_values: num_values as u64,
                chunk_len: chunk_len as u64,
                chain,
                offset,
                chunk_sizes,
            },
        );
        Ok(())
    }

    /// Writes the footer and trailing magic, returning the underlying sink.
    pub fn finish(
        mut self,
        sequence_length: f64,
        row_counts: BTreeMap<String, u64>,
        provenance: Value,
    ) -> Result<W, TszipError> {
        let metadata = ContainerMetadata {
            format_name: FORMAT_NAME.to_string(),
            format_version: FORMAT_VERSION,
            sequence_length,
            row_counts,
            provenance,
            arrays: self.arrays,
        };
        let footer = serde_json::to_vec(&metadata)?;
        self.writer.write_all(&footer)?;
        self.writer.write_all(&(footer.len() as u64).to_le_bytes())?;
        self.writer.write_all(MAGIC)?;
        self.writer.flush()?;
        Ok(self.writer)
    }
}

//==================================================================================
// 3. Reader
//==================================================================================

/// Reads a container from any seekable source. Opening validates framing,
/// format name and version before any payload byte is touched.
pub struct ContainerReader<R: Read + Seek> {
    reader: R,
    metadata: ContainerMetadata,
}

impl<R: Read + Seek> ContainerReader<R> {
    pub fn open(mut reader: R) -> Result<Self, TszipError> {
        reader.seek(SeekFrom::Start(0))?;
        let mut magic = [0u8; 8];
        read_frame(&mut reader, &mut magic)?;
        if &magic != MAGIC {
            return Err(TszipError::FileFormatError(
                "leading magic bytes do not match".to_string(),
            ));
        }

        let total_len = reader.seek(SeekFrom::End(0))?;
        let frame_len = (MAGIC.len() * 2 + 8) as u64;
        if total_len < frame_len {
            return Err(TszipError::FileFormatError(
                "file too short to hold a footer".to_string(),
            ));
        }

        reader.seek(SeekFrom::End(-16))?;
        let mut tail = [0u8; 16];
        read_frame(&mut reader, &mut tail)?;
        if &tail[8..] != MAGIC {
            return Err(TszipError::FileFormatError(
                "trailing magic bytes do not match".to_string(),
            ));
        }
        let footer_len = u64::from_le_bytes(tail[..8].try_into().unwrap_or([0; 8]));
        if footer_len > total_len - frame_len {
            return Err(TszipError::FileFormatError(
                "footer length exceeds file size".to_string(),
            ));
        }

        reader.seek(SeekFrom::End(-16 - footer_len as i64))?;
        let mut footer = vec![0u8; footer_len as usize];
        read_frame(&mut reader, &mut footer)?;
        let metadata: ContainerMetadata = serde_json::from_slice(&footer)
            .map_err(|e| TszipError::FileFormatError(format!("footer is not valid JSON: {e}")))?;

        if metadata.format_name != FORMAT_NAME {
            return Err(TszipError::FileFormatError(format!(
                "format name '{}' is not '{FORMAT_NAME}'",
                metadata.format_name
            )));
        }
        let (major, minor) = metadata.format_version;
        if major != FORMAT_VERSION.0 {
            return Err(TszipError::IncompatibleVersion(format!(
                "file is format version {major}.{minor}, this build reads {}.{}",
                FORMAT_VERSION.0, FORMAT_VERSION.1
            )));
        }
        if minor > FORMAT_VERSION.1 {
            log::warn!(
                "container written by a newer minor version ({major}.{minor}), reading anyway"
            );
        }

        Ok(Self { reader, metadata })
    }

    pub fn metadata(&self) -> &ContainerMetadata {
        &self.metadata
    }

    /// Verifies every codec id referenced by any array is registered. Run
    /// before any payload read, so an unreadable file fails up front.
    pub fn check_codecs(&self, registry: &CodecRegistry) -> Result<(), TszipError> {
        for (name, descriptor) in &self.metadata.arrays {
            for id in descriptor.chain.ids() {
                if !registry.contains(id) {
                    return Err(TszipError::IncompatibleVersion(format!(
                        "array {name} requires unrecognized codec '{id}'"
                    )));
                }
            }
        }
        Ok(())
    }

    /// Reads one array's compressed chunks from the payload region.
    pub fn read_array(&mut self, name: &str) -> Result<Vec<Vec<u8>>, TszipError> {
        let descriptor = self.metadata.arrays.get(name).ok_or_else(|| {
            TszipError::StructuralMismatch(format!("Missing required array {name}"))
        })?;
        let mut position = MAGIC.len() as u64 + descriptor.offset;
        let mut chunks = Vec::with_capacity(descriptor.chunk_sizes.len());
        for &size in &descriptor.chunk_sizes {
            self.reader.seek(SeekFrom::Start(position))?;
            let mut chunk = vec![0u8; size as usize];
            read_frame(&mut self.reader, &mut chunk)?;
            position += size;
            chunks.push(chunk);
        }
        Ok(chunks)
    }
}

/// `read_exact` with EOF normalized to `DecodeError`: running off the end of
/// a payload means the file was truncated, not that I/O failed.
fn read_frame<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<(), TszipError> {
    reader.read_exact(buf).map_err(|e| {
        if e.kind() == io::ErrorKind::UnexpectedEof {
            TszipError::DecodeError("payload truncated".to_string())
        } else {
            TszipError::Io(e)
        }
    })
}

//==================================================================================
// 4. Atomic File Writes
//==================================================================================

/// Writes to a hidden sibling temp file and renames into place on commit.
/// If the writer is dropped without committing, the temp file is removed and
/// any pre-existing destination is left untouched.
pub struct AtomicFile {
    file: Option<File>,
    temp_path: PathBuf,
    final_path: PathBuf,
    committed: bool,
}

impl AtomicFile {
    pub fn create(path: &Path) -> Result<Self, TszipError> {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                TszipError::Io(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("destination '{}' has no file name", path.display()),
                ))
            })?;
        // Same directory as the destination so the final rename never
        // crosses a filesystem boundary.
        let temp_path = path.with_file_name(format!(
            ".{file_name}.tszip_work_{}",
            std::process::id()
        ));
        let file = File::create(&temp_path)?;
        Ok(Self {
            file: Some(file),
            temp_path,
            final_path: path.to_path_buf(),
            committed: false,
        })
    }

    /// Flushes, closes and renames the temp file onto the destination.
    pub fn commit(mut self) -> Result<(), TszipError> {
        if let Some(file) = self.file.take() {
            file.sync_all()?;
        }
        fs::rename(&self.temp_path, &self.final_path)?;
        self.committed = true;
        Ok(())
    }
}

impl Write for AtomicFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match &mut self.file {
            Some(file) => file.write(buf),
            None => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "atomic file already committed",
            )),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match &mut self.file {
            Some(file) => file.flush(),
            None => Ok(()),
        }
    }
}

impl Drop for AtomicFile {
    fn drop(&mut self) {
        if !self.committed {
            self.file.take();
            let _ = fs::remove_file(&self.temp_path);
        }
    }
}

//==================================================================================
// 5. Unit Tests
//==================================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::CodecSpec;
    use serde_json::json;
    use std::io::Cursor;

    fn write_example() -> Vec<u8> {
        let mut writer = ContainerWriter::new(Vec::new()).unwrap();
        let chain = CodecChain::new(vec![], CodecSpec::with_params("zstd", json!({"level": 3})));
        writer
            .write_array(
                "nodes/time",
                DType::Float64,
                DType::Float64,
                3,
                65_536,
                chain,
                &[vec![1, 2, 3, 4], vec![5, 6]],
            )
            .unwrap();
        writer
            .finish(10.0, BTreeMap::new(), json!({"schema_version": "1.0.0"}))
            .unwrap()
    }

    /// Re-frames a container with its footer JSON rewritten by `edit`.
    fn rewrite_footer(bytes: &[u8], edit: impl Fn(&mut Value)) -> Vec<u8> {
        let tail = &bytes[bytes.len() - 16..];
        let footer_len = u64::from_le_bytes(tail[..8].try_into().unwrap()) as usize;
        let footer_start = bytes.len() - 16 - footer_len;

        let mut footer: Value = serde_json::from_slice(&bytes[footer_start..footer_start + footer_len]).unwrap();
        edit(&mut footer);
        let new_footer = serde_json::to_vec(&footer).unwrap();

        let mut out = bytes[..footer_start].to_vec();
        out.extend_from_slice(&new_footer);
        out.extend_from_slice(&(new_footer.len() as u64).to_le_bytes());
        out.extend_from_slice(MAGIC);
        out
    }

    #[test]
    fn test_roundtrip_metadata_and_payload() {
        let bytes = write_example();
        let mut reader = ContainerReader::open(Cursor::new(bytes)).unwrap();

        let metadata = reader.metadata();
        assert_eq!(metadata.format_name, FORMAT_NAME);
        assert_eq!(metadata.sequence_length, 10.0);
        let descriptor = &metadata.arrays["nodes/time"];
        assert_eq!(descriptor.chunk_sizes, vec![4, 2]);
        assert_eq!(descriptor.stored_size(), 6);
        assert_eq!(descriptor.actual_size(), 24);

        let chunks = reader.read_array("nodes/time").unwrap();
        assert_eq!(chunks, vec![vec![1, 2, 3, 4], vec![5, 6]]);
    }

    #[test]
    fn test_bad_leading_magic_is_file_format_error() {
        let mut bytes = write_example();
        bytes[0] = b'Z';
        let result = ContainerReader::open(Cursor::new(bytes));
        assert!(matches!(result, Err(TszipError::FileFormatError(_))));
    }

    #[test]
    fn test_non_container_input_is_file_format_error() {
        let result = ContainerReader::open(Cursor::new(b"hello world, not a container".to_vec()));
        assert!(matches!(result, Err(TszipError::FileFormatError(_))));
    }

    #[test]
    fn test_wrong_format_name_is_file_format_error() {
        let bytes = rewrite_footer(&write_example(), |footer| {
            footer["format_name"] = json!("parquet");
        });
        let result = ContainerReader::open(Cursor::new(bytes));
        assert!(matches!(result, Err(TszipError::FileFormatError(_))));
    }

    #[test]
    fn test_newer_major_version_is_incompatible() {
        let bytes = rewrite_footer(&write_example(), |footer| {
            footer["format_version"] = json!([FORMAT_VERSION.0 + 1, 0]);
        });
        let result = ContainerReader::open(Cursor::new(bytes));
        assert!(matches!(result, Err(TszipError::IncompatibleVersion(_))));
    }

    #[test]
    fn test_newer_minor_version_is_read() {
        let bytes = rewrite_footer(&write_example(), |footer| {
            footer["format_version"] = json!([FORMAT_VERSION.0, FORMAT_VERSION.1 + 1]);
        });
        ContainerReader::open(Cursor::new(bytes)).unwrap();
    }

    #[test]
    fn test_unknown_footer_fields_are_ignored() {
        let bytes = rewrite_footer(&write_example(), |footer| {
            footer["future_option"] = json!({"enabled": true});
        });
        ContainerReader::open(Cursor::new(bytes)).unwrap();
    }

    #[test]
    fn test_unknown_codec_id_is_incompatible() {
        let bytes = rewrite_footer(&write_example(), |footer| {
            footer["arrays"]["nodes/time"]["chain"]["coder"]["id"] = json!("ans");
        });
        let reader = ContainerReader::open(Cursor::new(bytes)).unwrap();
        let result = reader.check_codecs(&CodecRegistry::builtin());
        assert!(matches!(result, Err(TszipError::IncompatibleVersion(_))));
    }

    #[test]
    fn test_payload_past_end_of_file_is_decode_error() {
        // A descriptor whose chunks extend past the end of the file, as left
        // by truncation in transit.
        let bytes = rewrite_footer(&write_example(), |footer| {
            footer["arrays"]["nodes/time"]["chunk_sizes"] = json!([4, 1_000_000]);
        });
        let mut reader = ContainerReader::open(Cursor::new(bytes)).unwrap();
        let result = reader.read_array("nodes/time");
        assert!(matches!(result, Err(TszipError::DecodeError(_))));
    }

    #[test]
    fn test_atomic_file_commit_and_abort() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("out.tsz");
        std::fs::write(&dest, b"previous contents").unwrap();

        // Aborted write: temp file cleaned up, destination untouched.
        {
            let mut aborted = AtomicFile::create(&dest).unwrap();
            aborted.write_all(b"partial").unwrap();
        }
        assert_eq!(std::fs::read(&dest).unwrap(), b"previous contents");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);

        // Committed write replaces the destination.
        let mut committed = AtomicFile::create(&dest).unwrap();
        committed.write_all(b"new contents").unwrap();
        committed.commit().unwrap();
        assert_eq!(std::fs::read(&dest).unwrap(), b"new contents");
    }
}
