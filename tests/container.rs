//! Container-level robustness: format sniffing, version gating, corruption
//! detection and atomic writes, exercised through the public facade.

mod common;

use std::fs;
use std::io::Cursor;

use serde_json::{json, Value};

use common::simulated_tree_sequence;
use tszip::container::MAGIC;
use tszip::pipeline::{CodecChain, CodecSpec};
use tszip::{compress, compress_to, decompress_from, load, CompressOptions, TszipError};

/// Re-frames a container with its footer JSON rewritten by `edit`.
fn rewrite_footer(bytes: &[u8], edit: impl Fn(&mut Value)) -> Vec<u8> {
    let tail = &bytes[bytes.len() - 16..];
    let footer_len = u64::from_le_bytes(tail[..8].try_into().unwrap()) as usize;
    let footer_start = bytes.len() - 16 - footer_len;

    let mut footer: Value =
        serde_json::from_slice(&bytes[footer_start..footer_start + footer_len]).unwrap();
    edit(&mut footer);
    let new_footer = serde_json::to_vec(&footer).unwrap();

    let mut out = bytes[..footer_start].to_vec();
    out.extend_from_slice(&new_footer);
    out.extend_from_slice(&(new_footer.len() as u64).to_le_bytes());
    out.extend_from_slice(MAGIC);
    out
}

fn example_container() -> Vec<u8> {
    let ts = simulated_tree_sequence(23);
    compress_to(&ts, Vec::new(), &CompressOptions::default()).unwrap()
}

#[test]
fn garbage_input_is_file_format_error() {
    let result = decompress_from(Cursor::new(b"definitely not a container file".to_vec()));
    assert!(matches!(result, Err(TszipError::FileFormatError(_))));
}

#[test]
fn plain_dump_is_not_a_container() {
    let ts = simulated_tree_sequence(23);
    let mut dump = Vec::new();
    ts.dump(&mut dump).unwrap();
    let result = decompress_from(Cursor::new(dump));
    assert!(matches!(result, Err(TszipError::FileFormatError(_))));
}

#[test]
fn newer_major_version_fails_before_payload() {
    let bytes = rewrite_footer(&example_container(), |footer| {
        let major = footer["format_version"][0].as_u64().unwrap();
        footer["format_version"] = json!([major + 1, 0]);
    });
    let result = decompress_from(Cursor::new(bytes));
    assert!(matches!(result, Err(TszipError::IncompatibleVersion(_))));
}

#[test]
fn newer_minor_version_still_reads() {
    let ts = simulated_tree_sequence(23);
    let bytes = compress_to(&ts, Vec::new(), &CompressOptions::default()).unwrap();
    let bytes = rewrite_footer(&bytes, |footer| {
        let minor = footer["format_version"][1].as_u64().unwrap();
        footer["format_version"][1] = json!(minor + 1);
        footer["future_field"] = json!("ignored");
    });
    let back = decompress_from(Cursor::new(bytes)).unwrap();
    assert_eq!(back, ts);
}

#[test]
fn unrecognized_codec_id_is_incompatible_version() {
    let bytes = rewrite_footer(&example_container(), |footer| {
        footer["arrays"]["nodes/time"]["chain"]["coder"]["id"] = json!("arith0");
    });
    let result = decompress_from(Cursor::new(bytes));
    assert!(matches!(result, Err(TszipError::IncompatibleVersion(_))));
}

#[test]
fn uncastable_dtype_pair_is_structural_mismatch() {
    // The payload still decodes as its stored dtype; only the restore cast
    // to the rewritten logical dtype is impossible.
    let bytes = rewrite_footer(&example_container(), |footer| {
        footer["arrays"]["nodes/time"]["dtype"] = json!("Int32");
    });
    let result = decompress_from(Cursor::new(bytes));
    assert!(matches!(result, Err(TszipError::StructuralMismatch(_))));
}

#[test]
fn corrupt_payload_is_decode_error() {
    let mut bytes = example_container();
    // The first chunk starts right after the leading magic; breaking its
    // frame header makes the terminal coder reject it.
    bytes[MAGIC.len()] ^= 0xFF;
    let result = decompress_from(Cursor::new(bytes));
    assert!(matches!(result, Err(TszipError::DecodeError(_))));
}

#[test]
fn truncated_file_never_yields_data() {
    let bytes = example_container();
    // Chop the tail off: the trailing frame is gone entirely.
    let truncated = bytes[..bytes.len() / 2].to_vec();
    let result = decompress_from(Cursor::new(truncated));
    assert!(result.is_err());
}

#[test]
fn failed_compress_leaves_destination_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("out.tsz");
    fs::write(&dest, b"prior valid content").unwrap();

    // An override referencing an unknown coder makes encoding fail after the
    // writer has already started streaming.
    let mut options = CompressOptions {
        force: true,
        ..Default::default()
    };
    options.overrides.insert(
        "nodes/time".to_string(),
        CodecChain::new(vec![], CodecSpec::new("ans")),
    );

    let ts = simulated_tree_sequence(29);
    let result = compress(&ts, &dest, &options);
    assert!(matches!(result, Err(TszipError::UnsupportedCodec(_))));

    // Destination untouched, no stray temp files.
    assert_eq!(fs::read(&dest).unwrap(), b"prior valid content");
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
}

#[test]
fn load_sniffs_container_and_plain_dump() {
    let dir = tempfile::tempdir().unwrap();
    let ts = simulated_tree_sequence(31);

    let container_path = dir.path().join("sim.trees.tsz");
    compress(&ts, &container_path, &CompressOptions::default()).unwrap();
    assert_eq!(load(&container_path).unwrap(), ts);

    let plain_path = dir.path().join("sim.trees");
    ts.dump_path(&plain_path).unwrap();
    assert_eq!(load(&plain_path).unwrap(), ts);
}
