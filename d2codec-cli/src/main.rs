//! d2codec CLI
//!
//! Decode, re-encode and inspect item records from character and stash
//! save files.

mod commands;
mod utils;

use clap::{Args, Parser, Subcommand};
use commands::{
    cmd_checksum, cmd_decode, cmd_huffman_decode, cmd_huffman_encode, cmd_roundtrip,
};
use d2codec_item::FormatVersion;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "d2codec")]
#[command(author, version, about = "Bit-level item codec for legacy save files")]
#[command(long_about = "
d2codec reads and writes the bit-packed item records of character and stash
save files. Stat widths and item classes come from the game's data tables
(ItemStatCost.txt, Armor.txt, Weapons.txt, Misc.txt).

Examples:
  d2codec decode --data-dir data/global/excel item.bin
  d2codec decode --data-dir data/global/excel --list --json items.bin
  d2codec roundtrip --data-dir data/global/excel --format-version 0x60 *.bin
  d2codec huffman encode hp1
  d2codec huffman decode 0110000101111111
  d2codec checksum hero.d2s --fix
")]
struct Cli {
    /// Log codec activity (repeat for trace output)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode item records and print a summary
    #[command(alias = "d")]
    Decode {
        /// Files holding one item, or an item list with --list
        #[arg(required = true)]
        files: Vec<PathBuf>,

        #[command(flatten)]
        codec: CodecArgs,

        /// Output as JSON (machine-readable)
        #[arg(short, long)]
        json: bool,
    },

    /// Decode, re-encode and compare with the input bytes
    #[command(alias = "r")]
    Roundtrip {
        /// Files holding one item, or an item list with --list
        #[arg(required = true)]
        files: Vec<PathBuf>,

        #[command(flatten)]
        codec: CodecArgs,
    },

    /// Inspect the item code Huffman table
    Huffman {
        #[command(subcommand)]
        action: HuffmanAction,
    },

    /// Verify or repair the size and checksum fields of a save file
    Checksum {
        /// Save file to check
        file: PathBuf,

        /// Rewrite the size and checksum fields in place
        #[arg(long)]
        fix: bool,
    },
}

/// Options shared by commands that run the item codec.
#[derive(Args, Debug, Clone)]
struct CodecArgs {
    /// Directory holding ItemStatCost.txt, Armor.txt, Weapons.txt and Misc.txt
    #[arg(short, long)]
    data_dir: PathBuf,

    /// Save format version, decimal or 0x-prefixed hex
    #[arg(short = 'f', long, default_value_t = FormatVersion::HUFFMAN_MIN)]
    format_version: FormatVersion,

    /// Input is a "JM" item list rather than a single item
    #[arg(short, long)]
    list: bool,
}

#[derive(Subcommand)]
enum HuffmanAction {
    /// Print the bits of an item code
    Encode {
        /// Item code of up to four characters
        code: String,
    },

    /// Decode an item code from a bit string ("0110...") or hex bytes ("e20f...")
    Decode {
        /// Bits in stream order, or bytes in hex
        input: String,
    },
}

fn main() {
    let cli = Cli::parse();
    utils::init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Decode { files, codec, json } => cmd_decode(&files, &codec.into(), json),
        Commands::Roundtrip { files, codec } => cmd_roundtrip(&files, &codec.into()),
        Commands::Huffman { action } => match action {
            HuffmanAction::Encode { code } => cmd_huffman_encode(&code),
            HuffmanAction::Decode { input } => cmd_huffman_decode(&input),
        },
        Commands::Checksum { file, fix } => cmd_checksum(&file, fix),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

impl From<CodecArgs> for utils::CodecOptions {
    fn from(args: CodecArgs) -> Self {
        Self {
            data_dir: args.data_dir,
            version: args.format_version,
            list: args.list,
        }
    }
}
