//! Roundtrip command implementation.

use crate::utils::{CodecOptions, decode_file, encode_file, hex_string, load_metadata};
use d2codec_item::{MetaData, Result as CodecResult};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Outcome of re-encoding one file.
enum Outcome {
    Identical { len: usize },
    Differs { first: usize, original: usize, encoded: usize },
}

pub fn cmd_roundtrip(
    files: &[PathBuf],
    options: &CodecOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    let meta = load_metadata(options)?;

    let results: Vec<_> = files
        .par_iter()
        .map(|path| (path, roundtrip_file(path, options, &meta)))
        .collect();

    let mut failed = 0usize;
    for (path, result) in results {
        match result {
            Ok(Outcome::Identical { len }) => {
                println!("OK    {} ({} bytes)", path.display(), len);
            }
            Ok(Outcome::Differs {
                first,
                original,
                encoded,
            }) => {
                println!(
                    "DIFF  {} (first difference at byte {}, {} -> {} bytes)",
                    path.display(),
                    first,
                    original,
                    encoded
                );
                failed += 1;
            }
            Err(e) => {
                println!("ERROR {}: {}", path.display(), e);
                failed += 1;
            }
        }
    }

    println!();
    println!("{} of {} files round-tripped", files.len() - failed, files.len());
    if failed > 0 {
        return Err(format!("{} files did not round-trip", failed).into());
    }
    Ok(())
}

fn roundtrip_file(path: &Path, options: &CodecOptions, meta: &MetaData) -> CodecResult<Outcome> {
    let decoded = decode_file(path, options, meta)?;
    let encoded = encode_file(&decoded, options, meta)?;
    let original = std::fs::read(path)?;
    // Trailing bytes after the decoded items are not part of the comparison.
    let original = &original[..decoded.consumed.min(original.len())];

    if original == encoded.as_slice() {
        return Ok(Outcome::Identical { len: encoded.len() });
    }
    let first = original
        .iter()
        .zip(&encoded)
        .position(|(a, b)| a != b)
        .unwrap_or(original.len().min(encoded.len()));
    debug!(
        file = %path.display(),
        original = %hex_string(&original[first..original.len().min(first + 8)]),
        encoded = %hex_string(&encoded[first..encoded.len().min(first + 8)]),
        "round-trip mismatch"
    );
    Ok(Outcome::Differs {
        first,
        original: original.len(),
        encoded: encoded.len(),
    })
}
