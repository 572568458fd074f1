//! Command implementations for the d2codec CLI.

pub mod checksum;
pub mod decode;
pub mod huffman;
pub mod roundtrip;

pub use checksum::cmd_checksum;
pub use decode::cmd_decode;
pub use huffman::{cmd_huffman_decode, cmd_huffman_encode};
pub use roundtrip::cmd_roundtrip;
