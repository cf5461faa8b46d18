//! The command-line surface: gzip-style batch compress/decompress.
//!
//! One binary, positional files, `-d` to decompress, `-l` to list. Each file
//! is processed independently: a failure is reported and counted, and the
//! remaining files still run. The process exit code is non-zero if any file
//! failed.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use clap::Parser;

use crate::compress::{compress_path, decompress, summary, CompressOptions};
use crate::error::TszipError;

#[derive(Parser, Debug)]
#[command(
    name = "tszip",
    version,
    about = "Compress and decompress tree-sequence files"
)]
pub struct Cli {
    /// Files to process.
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Decompress instead of compress.
    #[arg(short = 'd', long)]
    pub decompress: bool,

    /// List stored arrays and sizes instead of extracting.
    #[arg(short = 'l', long)]
    pub list: bool,

    /// Keep input files instead of removing them.
    #[arg(short = 'k', long)]
    pub keep: bool,

    /// Overwrite existing output files.
    #[arg(short = 'f', long)]
    pub force: bool,

    /// Suffix for compressed files.
    #[arg(short = 'S', long, default_value = ".tsz")]
    pub suffix: String,

    /// Increase verbosity (-v for info, -vv for debug).
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// Processes every file, reporting per-file errors without aborting the
/// batch. Returns the process exit code.
pub fn run(cli: &Cli) -> i32 {
    let mut failures = 0;
    for file in &cli.files {
        let result = if cli.list {
            list_one(file)
        } else if cli.decompress {
            decompress_one(cli, file)
        } else {
            compress_one(cli, file)
        };
        if let Err(e) = result {
            eprintln!("tszip: {}: {e}", file.display());
            failures += 1;
        }
    }
    i32::from(failures > 0)
}

fn compress_one(cli: &Cli, file: &Path) -> Result<(), TszipError> {
    let dest = with_suffix(file, &cli.suffix);
    let options = CompressOptions {
        force: cli.force,
        ..Default::default()
    };
    compress_path(file, &dest, &options)?;
    log::info!("compressed {} -> {}", file.display(), dest.display());
    if !cli.keep {
        fs::remove_file(file)?;
    }
    Ok(())
}

fn decompress_one(cli: &Cli, file: &Path) -> Result<(), TszipError> {
    let dest = strip_suffix(file, &cli.suffix)?;
    if !cli.force && dest.exists() {
        return Err(TszipError::Io(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!("'{}' already exists", dest.display()),
        )));
    }
    let ts = decompress(file)?;
    ts.dump_path(&dest)?;
    log::info!("decompressed {} -> {}", file.display(), dest.display());
    if !cli.keep {
        fs::remove_file(file)?;
    }
    Ok(())
}

fn list_one(file: &Path) -> Result<(), TszipError> {
    let summary = summary(file)?;
    println!("{}:", file.display());
    println!(
        "  format version {}.{}, sequence length {}",
        summary.format_version.0, summary.format_version.1, summary.sequence_length
    );
    println!("  {:<34} {:>12} {:>12} {:>8}", "array", "stored", "actual", "ratio");
    for array in &summary.arrays {
        println!(
            "  {:<34} {:>12} {:>12} {:>8.2}",
            array.name,
            array.stored_size,
            array.actual_size,
            array.actual_size as f64 / array.stored_size.max(1) as f64,
        );
    }
    println!(
        "  {:<34} {:>12} {:>12} {:>8.2}",
        "total",
        summary.total_stored(),
        summary.total_actual(),
        summary.total_actual() as f64 / summary.total_stored().max(1) as f64,
    );
    Ok(())
}

/// `example.trees` -> `example.trees.tsz`.
fn with_suffix(file: &Path, suffix: &str) -> PathBuf {
    let mut name = file.as_os_str().to_os_string();
    name.push(suffix);
    PathBuf::from(name)
}

/// `example.trees.tsz` -> `example.trees`, or an error if the suffix is absent.
fn strip_suffix(file: &Path, suffix: &str) -> Result<PathBuf, TszipError> {
    let name = file.to_string_lossy();
    match name.strip_suffix(suffix) {
        Some(stem) if !stem.is_empty() => Ok(PathBuf::from(stem)),
        _ => Err(TszipError::Io(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("file name does not end in '{suffix}'"),
        ))),
    }
}

//==================================================================================
// Unit Tests
//==================================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tables::{TableCollection, TreeSequence, NULL};

    fn example_ts() -> TreeSequence {
        let mut tables = TableCollection::new(50.0);
        tables.nodes.add_row(1, 0.0, NULL, NULL, &[]);
        tables.nodes.add_row(0, 1.0, NULL, NULL, &[]);
        tables.edges.add_row(0.0, 50.0, 1, 0, &[]);
        TreeSequence::new(tables).unwrap()
    }

    fn cli_for(files: Vec<PathBuf>) -> Cli {
        Cli {
            files,
            decompress: false,
            list: false,
            keep: true,
            force: false,
            suffix: ".tsz".to_string(),
            verbose: 0,
        }
    }

    #[test]
    fn test_suffix_handling() {
        assert_eq!(
            with_suffix(Path::new("a.trees"), ".tsz"),
            PathBuf::from("a.trees.tsz")
        );
        assert_eq!(
            strip_suffix(Path::new("a.trees.tsz"), ".tsz").unwrap(),
            PathBuf::from("a.trees")
        );
        assert!(strip_suffix(Path::new("a.trees"), ".tsz").is_err());
        assert!(strip_suffix(Path::new(".tsz"), ".tsz").is_err());
    }

    #[test]
    fn test_compress_then_decompress_via_cli() {
        let dir = tempfile::tempdir().unwrap();
        let plain = dir.path().join("a.trees");
        let ts = example_ts();
        ts.dump_path(&plain).unwrap();

        let cli = cli_for(vec![plain.clone()]);
        assert_eq!(run(&cli), 0);
        let compressed = dir.path().join("a.trees.tsz");
        assert!(compressed.exists());

        fs::remove_file(&plain).unwrap();
        let cli = Cli {
            decompress: true,
            ..cli_for(vec![compressed])
        };
        assert_eq!(run(&cli), 0);
        assert_eq!(TreeSequence::load_path(&plain).unwrap(), ts);
    }

    #[test]
    fn test_batch_partial_failure() {
        let dir = tempfile::tempdir().unwrap();
        let ts = example_ts();

        let first = dir.path().join("a.trees");
        let second = dir.path().join("b.trees");
        let third = dir.path().join("c.trees");
        ts.dump_path(&first).unwrap();
        fs::write(&second, b"this is not a tree sequence").unwrap();
        ts.dump_path(&third).unwrap();

        let cli = cli_for(vec![first, second, third]);
        assert_eq!(run(&cli), 1);

        // The good files were still processed.
        assert!(dir.path().join("a.trees.tsz").exists());
        assert!(!dir.path().join("b.trees.tsz").exists());
        assert!(dir.path().join("c.trees.tsz").exists());
    }

    #[test]
    fn test_list_mode() {
        let dir = tempfile::tempdir().unwrap();
        let compressed = dir.path().join("a.trees.tsz");
        crate::compress::compress(&example_ts(), &compressed, &CompressOptions::default()).unwrap();

        let cli = Cli {
            list: true,
            ..cli_for(vec![compressed])
        };
        assert_eq!(run(&cli), 0);
    }

    #[test]
    fn test_input_removed_without_keep() {
        let dir = tempfile::tempdir().unwrap();
        let plain = dir.path().join("a.trees");
        example_ts().dump_path(&plain).unwrap();

        let cli = Cli {
            keep: false,
            ..cli_for(vec![plain.clone()])
        };
        assert_eq!(run(&cli), 0);
        assert!(!plain.exists());
        assert!(dir.path().join("a.trees.tsz").exists());
    }
}
