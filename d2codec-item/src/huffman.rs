//! Item-code Huffman coding.
//!
//! From format version 0x61 on, the four ASCII characters of an item type
//! code are stored with a fixed prefix code instead of as raw bytes. The
//! codebook covers digits, lowercase letters and space; codes are 2 to 9
//! bits long and are read one bit at a time, first bit = first edge from
//! the root (`1` goes right, `0` goes left).

use crate::item::ItemCode;
use d2codec_core::error::{CodecError, Result};
use d2codec_core::{BitReader, BitWriter};
use std::sync::OnceLock;

/// Maximum code length in the item-code table.
pub const MAX_CODE_LENGTH: usize = 9;

/// The fixed item-code codebook.
pub const ITEM_CODE_TABLE: [(char, &str); 37] = [
    ('0', "11111011"),
    (' ', "10"),
    ('1', "1111100"),
    ('2', "001100"),
    ('3', "1101101"),
    ('4', "11111010"),
    ('5', "00010110"),
    ('6', "1101111"),
    ('7', "01111"),
    ('8', "000100"),
    ('9', "01110"),
    ('a', "11110"),
    ('b', "0101"),
    ('c', "01000"),
    ('d', "110001"),
    ('e', "110000"),
    ('f', "010011"),
    ('g', "11010"),
    ('h', "00011"),
    ('i', "1111110"),
    ('j', "000101110"),
    ('k', "010010"),
    ('l', "11101"),
    ('m', "01101"),
    ('n', "001101"),
    ('o', "1111111"),
    ('p', "11001"),
    ('q', "11011001"),
    ('r', "11100"),
    ('s', "0010"),
    ('t', "01100"),
    ('u', "00001"),
    ('v', "1101110"),
    ('w', "00000"),
    ('x', "00111"),
    ('y', "0001010"),
    ('z', "11011000"),
];

/// Trie node. Children index into the node arena: `[left, right]`.
#[derive(Debug, Clone, Default)]
struct Node {
    symbol: Option<char>,
    children: [Option<usize>; 2],
}

impl Node {
    fn is_leaf(&self) -> bool {
        self.children == [None, None]
    }
}

/// A symbol's code, first bit in the LSB.
#[derive(Debug, Clone, Copy)]
struct Code {
    bits: u16,
    len: u8,
}

/// Prefix-code trie for item type codes.
#[derive(Debug, Clone)]
pub struct ItemCodeTree {
    /// Node arena; index 0 is the root.
    nodes: Vec<Node>,
    /// Encoding table indexed by ASCII value.
    codes: [Option<Code>; 128],
}

impl ItemCodeTree {
    /// Build a tree from `(symbol, code)` pairs where codes are `0`/`1` strings.
    ///
    /// Fails if a code is empty, longer than [`MAX_CODE_LENGTH`], contains
    /// other characters, or collides with another code's prefix.
    pub fn from_table(table: &[(char, &str)]) -> Result<Self> {
        let mut tree = Self::empty();
        for &(symbol, code) in table {
            if !symbol.is_ascii() {
                return Err(table_error(format!("symbol {symbol:?} is not ASCII")));
            }
            if code.is_empty() || code.len() > MAX_CODE_LENGTH {
                return Err(table_error(format!(
                    "code for {symbol:?} has length {}",
                    code.len()
                )));
            }
            if let Some(bad) = code.chars().find(|c| *c != '0' && *c != '1') {
                return Err(table_error(format!(
                    "code for {symbol:?} contains {bad:?}"
                )));
            }
            tree.insert(symbol, code)?;
        }
        tree.index_codes(0, 0, 0);
        Ok(tree)
    }

    /// Build the standard item-code tree.
    pub fn standard() -> Self {
        let mut tree = Self::empty();
        for &(symbol, code) in &ITEM_CODE_TABLE {
            let inserted = tree.insert(symbol, code);
            debug_assert!(
                inserted.is_ok(),
                "item code table entry {symbol:?} is invalid: {inserted:?}"
            );
        }
        tree.index_codes(0, 0, 0);
        tree
    }

    fn empty() -> Self {
        Self {
            nodes: vec![Node::default()],
            codes: [None; 128],
        }
    }

    fn insert(&mut self, symbol: char, code: &str) -> Result<()> {
        let mut current = 0;
        for bit in code.bytes() {
            if self.nodes[current].symbol.is_some() {
                return Err(table_error(format!("code for {symbol:?} extends another code")));
            }
            let branch = (bit == b'1') as usize;
            current = match self.nodes[current].children[branch] {
                Some(next) => next,
                None => {
                    self.nodes.push(Node::default());
                    let next = self.nodes.len() - 1;
                    self.nodes[current].children[branch] = Some(next);
                    next
                }
            };
        }
        if !self.nodes[current].is_leaf() || self.nodes[current].symbol.is_some() {
            return Err(table_error(format!("code for {symbol:?} is already taken")));
        }
        self.nodes[current].symbol = Some(symbol);
        Ok(())
    }

    /// Walk the trie and record the path to every leaf.
    fn index_codes(&mut self, node: usize, bits: u16, len: u8) {
        if let Some(symbol) = self.nodes[node].symbol {
            self.codes[symbol as usize] = Some(Code { bits, len });
            return;
        }
        let children = self.nodes[node].children;
        for (branch, child) in children.iter().enumerate() {
            if let Some(child) = *child {
                self.index_codes(child, bits | ((branch as u16) << len), len + 1);
            }
        }
    }

    /// Get the code for `symbol` as a bit sequence, first bit first.
    pub fn encode_char(&self, symbol: char) -> Result<Vec<bool>> {
        let code = self.lookup(symbol)?;
        Ok((0..code.len).map(|i| (code.bits >> i) & 1 != 0).collect())
    }

    /// Write the code for `symbol`.
    pub fn write_char(&self, writer: &mut BitWriter, symbol: char) -> Result<()> {
        let code = self.lookup(symbol)?;
        writer.write_u16(code.bits, code.len as usize);
        Ok(())
    }

    fn lookup(&self, symbol: char) -> Result<Code> {
        self.codes
            .get(symbol as usize)
            .copied()
            .flatten()
            .ok_or_else(|| CodecError::malformed_symbol(symbol))
    }

    /// Decode one symbol, consuming its code from `reader`.
    ///
    /// A path that leaves the trie fails with
    /// [`CodecError::InvalidHuffmanCode`]; at most [`MAX_CODE_LENGTH`] bits
    /// are consumed.
    pub fn decode_char(&self, reader: &mut BitReader<'_>) -> Result<char> {
        let start = reader.position();
        let mut current = 0;
        loop {
            let node = &self.nodes[current];
            if let Some(symbol) = node.symbol {
                return Ok(symbol);
            }
            let branch = reader.read_bit()? as usize;
            current = node.children[branch].ok_or_else(|| CodecError::invalid_huffman(start))?;
        }
    }

    /// Decode a four-character item code.
    pub fn decode_code(&self, reader: &mut BitReader<'_>) -> Result<ItemCode> {
        let mut bytes = [0u8; 4];
        for byte in &mut bytes {
            *byte = self.decode_char(reader)? as u8;
        }
        Ok(ItemCode::from_bytes(bytes))
    }

    /// Encode a four-character item code.
    pub fn encode_code(&self, writer: &mut BitWriter, code: &ItemCode) -> Result<()> {
        for &byte in code.as_bytes() {
            self.write_char(writer, byte as char)?;
        }
        Ok(())
    }
}

fn table_error(message: String) -> CodecError {
    CodecError::invalid_metadata("item code table", message)
}

/// The process-wide standard item-code tree.
pub fn item_code_tree() -> &'static ItemCodeTree {
    static TREE: OnceLock<ItemCodeTree> = OnceLock::new();
    TREE.get_or_init(ItemCodeTree::standard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_table_is_valid() {
        // from_table rejects prefix collisions; the fixed table must pass.
        let tree = ItemCodeTree::from_table(&ITEM_CODE_TABLE).unwrap();
        for &(symbol, code) in &ITEM_CODE_TABLE {
            let bits: String = tree
                .encode_char(symbol)
                .unwrap()
                .into_iter()
                .map(|b| if b { '1' } else { '0' })
                .collect();
            assert_eq!(bits, code, "symbol {symbol:?}");
        }
    }

    #[test]
    fn test_shared_tree_matches_table() {
        let shared = item_code_tree();
        let checked = ItemCodeTree::from_table(&ITEM_CODE_TABLE).unwrap();
        for &(symbol, code) in &ITEM_CODE_TABLE {
            let bits = shared.encode_char(symbol).unwrap();
            assert_eq!(bits, checked.encode_char(symbol).unwrap(), "symbol {symbol:?}");
            assert_eq!(bits.len(), code.len(), "symbol {symbol:?}");
            assert!(
                bits.iter().zip(code.bytes()).all(|(&bit, c)| bit == (c == b'1')),
                "symbol {symbol:?}"
            );
        }
    }

    #[test]
    fn test_bijection() {
        let tree = item_code_tree();
        for &(symbol, _) in &ITEM_CODE_TABLE {
            let mut writer = BitWriter::new();
            tree.write_char(&mut writer, symbol).unwrap();
            let len = writer.len();
            let bytes = writer.to_bytes();
            let mut reader = BitReader::new(&bytes);
            assert_eq!(tree.decode_char(&mut reader).unwrap(), symbol);
            assert_eq!(reader.position(), len);
        }
    }

    #[test]
    fn test_unknown_symbol() {
        let tree = item_code_tree();
        assert!(matches!(
            tree.encode_char('Q'),
            Err(CodecError::MalformedHuffmanSymbol { symbol: 'Q' })
        ));
        assert!(tree.encode_char('#').is_err());
        assert!(tree.encode_char('é').is_err());
    }

    #[test]
    fn test_dangling_branch() {
        // 0,0,0,1,0,1,1,1,1 leaves the trie after "j"'s sibling.
        let data = [0xE8, 0x01];
        let mut reader = BitReader::new(&data);
        assert!(matches!(
            item_code_tree().decode_char(&mut reader),
            Err(CodecError::InvalidHuffmanCode { bit_position: 0 })
        ));
        assert!(reader.position() <= MAX_CODE_LENGTH);
    }

    #[test]
    fn test_exhausted_input() {
        // Six ones are a proper prefix of "1111111" ('o').
        let data = [0xFF];
        let mut reader = BitReader::new(&data);
        reader.advance_bits(2).unwrap();
        let err = item_code_tree().decode_char(&mut reader).unwrap_err();
        assert!(err.is_end_of_data());
    }

    #[test]
    fn test_code_roundtrip() {
        let tree = item_code_tree();
        let code = ItemCode::new("hp1").unwrap();
        let mut writer = BitWriter::new();
        tree.encode_code(&mut writer, &code).unwrap();
        let bytes = writer.to_bytes();
        let mut reader = BitReader::new(&bytes);
        let decoded = tree.decode_code(&mut reader).unwrap();
        assert_eq!(decoded, code);
        assert_eq!(decoded.as_bytes(), b"hp1 ");
    }

    #[test]
    fn test_rejects_prefix_collision() {
        let table = [('a', "10"), ('b', "101")];
        assert!(ItemCodeTree::from_table(&table).is_err());
        let table = [('a', "101"), ('b', "10")];
        assert!(ItemCodeTree::from_table(&table).is_err());
        let table = [('a', "1x")];
        assert!(ItemCodeTree::from_table(&table).is_err());
    }
}
