//! Huffman command implementations.

use crate::utils::{bit_string, hex_string, parse_bits_or_hex};
use d2codec_core::{BitReader, BitWriter};
use d2codec_item::{ItemCode, item_code_tree};

pub fn cmd_huffman_encode(code: &str) -> Result<(), Box<dyn std::error::Error>> {
    let code = ItemCode::new(code)?;
    let tree = item_code_tree();

    println!("Code: {:?}", code.trimmed());
    // All four stored bytes, padding included.
    let mut total = 0usize;
    for &byte in code.as_bytes() {
        let bits = tree.encode_char(byte as char)?;
        total += bits.len();
        println!(
            "  {:?} {:>2} bits  {}",
            byte as char,
            bits.len(),
            bit_string(&bits)
        );
    }

    let mut writer = BitWriter::new();
    tree.encode_code(&mut writer, &code)?;
    println!("Total: {} bits", total);
    println!("Packed: {}", hex_string(&writer.into_bytes()));
    Ok(())
}

pub fn cmd_huffman_decode(input: &str) -> Result<(), Box<dyn std::error::Error>> {
    let bytes = parse_bits_or_hex(input)?;
    let mut reader = BitReader::new(&bytes);
    let code = item_code_tree().decode_code(&mut reader)?;

    println!("Code: {:?}", code.trimmed());
    println!("Bits used: {}", reader.position());
    Ok(())
}
