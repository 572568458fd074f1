//! Decode command implementation.

use crate::utils::{CodecOptions, DecodedFile, decode_file, load_metadata, print_item};
use rayon::prelude::*;
use std::path::PathBuf;
use tracing::warn;

pub fn cmd_decode(
    files: &[PathBuf],
    options: &CodecOptions,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let meta = load_metadata(options)?;

    let results: Vec<_> = files
        .par_iter()
        .map(|path| (path, decode_file(path, options, &meta)))
        .collect();

    let mut decoded = Vec::with_capacity(results.len());
    let mut failures = 0usize;
    for (path, result) in results {
        match result {
            Ok(file) => {
                if file.consumed < file.input_len {
                    warn!(
                        file = %path.display(),
                        trailing = file.input_len - file.consumed,
                        "bytes left after the last item"
                    );
                }
                decoded.push(file);
            }
            Err(e) => {
                eprintln!("{}: {}", path.display(), e);
                failures += 1;
            }
        }
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&decoded)?);
    } else {
        for file in &decoded {
            print_summary(file);
        }
    }

    if failures > 0 {
        return Err(format!("{} of {} files failed to decode", failures, files.len()).into());
    }
    Ok(())
}

fn print_summary(file: &DecodedFile) {
    let total: usize = file.items.iter().map(|item| item.count_recursive()).sum();
    match file.header {
        Some(header) => println!(
            "{}: list {:#06x}, {} items ({} including socketed)",
            file.file,
            header,
            file.items.len(),
            total
        ),
        None => println!("{}: {} bytes", file.file, file.consumed),
    }
    for item in &file.items {
        print_item(item, 0);
    }
}
