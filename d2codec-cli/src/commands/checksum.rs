//! Checksum command implementation.

use d2codec_core::fixup::{
    CHECKSUM_OFFSET, FILE_SIZE_OFFSET, fix_checksum, fix_size, read_field, verify_checksum,
};
use std::path::PathBuf;

pub fn cmd_checksum(file: &PathBuf, fix: bool) -> Result<(), Box<dyn std::error::Error>> {
    let mut bytes = std::fs::read(file)?;

    let size_field = read_field(&bytes, FILE_SIZE_OFFSET)?;
    let size_ok = size_field as usize == bytes.len();
    let checksum_ok = verify_checksum(&bytes, CHECKSUM_OFFSET)?;

    println!("File: {}", file.display());
    println!(
        "Size: {} bytes, header says {} ({})",
        bytes.len(),
        size_field,
        if size_ok { "ok" } else { "mismatch" }
    );
    println!(
        "Checksum: {:#010x} ({})",
        read_field(&bytes, CHECKSUM_OFFSET)?,
        if checksum_ok { "ok" } else { "mismatch" }
    );

    if fix {
        if size_ok && checksum_ok {
            println!("Nothing to fix");
            return Ok(());
        }
        fix_size(&mut bytes, FILE_SIZE_OFFSET)?;
        let sum = fix_checksum(&mut bytes, CHECKSUM_OFFSET)?;
        std::fs::write(file, &bytes)?;
        println!("Fixed: checksum {:#010x}", sum);
    } else if !(size_ok && checksum_ok) {
        return Err("size or checksum does not match (use --fix to repair)".into());
    }
    Ok(())
}
