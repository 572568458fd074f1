//! Item record model.
//!
//! These are plain owned values produced by [`ItemCodec`](crate::ItemCodec)
//! and consumed by it on write. Fields whose presence is decided by a flag or
//! by item-type metadata are `Option`s; the encoder checks that they agree
//! with the flags before writing anything.

use crate::stat::StatList;
use d2codec_core::error::{CodecError, Result};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;

/// Header tag written before every item in legacy formats ("JM").
pub const ITEM_HEADER: u16 = 0x4D4A;

/// Maximum number of characters in a player name.
pub const MAX_NAME_LEN: usize = 15;

/// A four-character item type code, space padded (`"hp1 "`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ItemCode([u8; 4]);

impl ItemCode {
    /// Create a code from up to four ASCII characters, padding with spaces.
    pub fn new(code: &str) -> Result<Self> {
        if code.len() > 4 || !code.is_ascii() {
            return Err(CodecError::invalid_item(format!(
                "item code {code:?} is not at most four ASCII characters"
            )));
        }
        let mut bytes = [b' '; 4];
        bytes[..code.len()].copy_from_slice(code.as_bytes());
        Ok(Self(bytes))
    }

    /// Wrap four raw bytes as read from the stream.
    pub const fn from_bytes(bytes: [u8; 4]) -> Self {
        Self(bytes)
    }

    /// The four stored bytes.
    pub fn as_bytes(&self) -> &[u8; 4] {
        &self.0
    }

    /// The code without trailing padding, as used for table lookups.
    ///
    /// Bytes that are not UTF-8 are replaced with U+FFFD, so a corrupt legacy
    /// code still shows up in lookups and logs.
    pub fn trimmed(&self) -> Cow<'_, str> {
        match String::from_utf8_lossy(&self.0) {
            Cow::Borrowed(text) => Cow::Borrowed(text.trim_end_matches([' ', '\0'])),
            Cow::Owned(text) => Cow::Owned(text.trim_end_matches([' ', '\0']).to_string()),
        }
    }

    /// Check whether this is a tome (`tbk`/`ibk`), which stores a spell suffix.
    pub fn is_book(&self) -> bool {
        matches!(self.trimmed().trim_start(), "tbk" | "ibk")
    }
}

impl fmt::Display for ItemCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.escape_ascii())
    }
}

impl TryFrom<String> for ItemCode {
    type Error = CodecError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(&value)
    }
}

impl From<ItemCode> for String {
    fn from(code: ItemCode) -> Self {
        code.0.iter().map(|&b| b as char).collect()
    }
}

/// The 32 item flag bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemFlags(pub u32);

impl ItemFlags {
    /// Item has been identified.
    pub const IDENTIFIED: u32 = 1 << 4;
    /// Item has sockets.
    pub const SOCKETED: u32 = 1 << 11;
    /// Item was picked up this session.
    pub const NEW: u32 = 1 << 13;
    /// Item is an ear.
    pub const EAR: u32 = 1 << 16;
    /// Item is starting equipment.
    pub const STARTER: u32 = 1 << 17;
    /// Item has no complete block.
    pub const COMPACT: u32 = 1 << 21;
    /// Item is ethereal.
    pub const ETHEREAL: u32 = 1 << 22;
    /// Item carries a player name.
    pub const PERSONALIZED: u32 = 1 << 24;
    /// Item is a runeword.
    pub const RUNEWORD: u32 = 1 << 26;

    /// Raw flag word.
    pub fn bits(&self) -> u32 {
        self.0
    }

    /// Check whether every bit of `mask` is set.
    pub fn contains(&self, mask: u32) -> bool {
        self.0 & mask == mask
    }

    /// Set or clear the bits of `mask`.
    pub fn set(&mut self, mask: u32, value: bool) {
        if value {
            self.0 |= mask;
        } else {
            self.0 &= !mask;
        }
    }

    /// Identified flag.
    pub fn is_identified(&self) -> bool {
        self.contains(Self::IDENTIFIED)
    }

    /// Socketed flag.
    pub fn is_socketed(&self) -> bool {
        self.contains(Self::SOCKETED)
    }

    /// New flag.
    pub fn is_new(&self) -> bool {
        self.contains(Self::NEW)
    }

    /// Ear flag.
    pub fn is_ear(&self) -> bool {
        self.contains(Self::EAR)
    }

    /// Starter flag.
    pub fn is_starter(&self) -> bool {
        self.contains(Self::STARTER)
    }

    /// Compact flag.
    pub fn is_compact(&self) -> bool {
        self.contains(Self::COMPACT)
    }

    /// Ethereal flag.
    pub fn is_ethereal(&self) -> bool {
        self.contains(Self::ETHEREAL)
    }

    /// Personalized flag.
    pub fn is_personalized(&self) -> bool {
        self.contains(Self::PERSONALIZED)
    }

    /// Runeword flag.
    pub fn is_runeword(&self) -> bool {
        self.contains(Self::RUNEWORD)
    }
}

/// Per-item version tag.
///
/// Legacy formats store 10 bits shown in base 10; later formats store 3 bits
/// shown in base 2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemVersion {
    /// 10-bit tag of formats up to 0x60.
    Legacy(u16),
    /// 3-bit tag of formats from 0x61 on.
    Modern(u8),
}

impl ItemVersion {
    /// Raw numeric value of the tag.
    pub fn raw(&self) -> u16 {
        match *self {
            Self::Legacy(v) => v,
            Self::Modern(v) => v as u16,
        }
    }
}

impl fmt::Display for ItemVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Legacy(v) => write!(f, "{v}"),
            Self::Modern(v) => write!(f, "{v:b}"),
        }
    }
}

/// Where an item is held (3 bits).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ItemMode {
    /// In a grid container (inventory, cube, stash).
    #[default]
    Stored,
    /// Equipped on the body.
    Equipped,
    /// In the belt.
    Belt,
    /// Held in the cursor buffer.
    Buffer,
    /// Inserted into a socket.
    Socketed,
    /// Any other value.
    Unknown(u8),
}

impl ItemMode {
    /// Map a raw 3-bit value.
    pub fn from_raw(raw: u8) -> Self {
        match raw {
            0 => Self::Stored,
            1 => Self::Equipped,
            2 => Self::Belt,
            4 => Self::Buffer,
            6 => Self::Socketed,
            other => Self::Unknown(other),
        }
    }

    /// The raw 3-bit value.
    pub fn raw(&self) -> u8 {
        match *self {
            Self::Stored => 0,
            Self::Equipped => 1,
            Self::Belt => 2,
            Self::Buffer => 4,
            Self::Socketed => 6,
            Self::Unknown(raw) => raw,
        }
    }
}

/// Equipment slot of an equipped item (4 bits).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ItemLocation {
    /// Not equipped.
    #[default]
    None,
    /// Helm slot.
    Head,
    /// Amulet slot.
    Neck,
    /// Body armor slot.
    Torso,
    /// Right hand.
    RightHand,
    /// Left hand.
    LeftHand,
    /// Right ring.
    RightFinger,
    /// Left ring.
    LeftFinger,
    /// Belt slot.
    Waist,
    /// Boots slot.
    Feet,
    /// Gloves slot.
    Gloves,
    /// Weapon-swap right hand.
    SwapRight,
    /// Weapon-swap left hand.
    SwapLeft,
    /// Any other value.
    Unknown(u8),
}

impl ItemLocation {
    const NAMED: [Self; 13] = [
        Self::None,
        Self::Head,
        Self::Neck,
        Self::Torso,
        Self::RightHand,
        Self::LeftHand,
        Self::RightFinger,
        Self::LeftFinger,
        Self::Waist,
        Self::Feet,
        Self::Gloves,
        Self::SwapRight,
        Self::SwapLeft,
    ];

    /// Map a raw 4-bit value.
    pub fn from_raw(raw: u8) -> Self {
        Self::NAMED
            .get(raw as usize)
            .copied()
            .unwrap_or(Self::Unknown(raw))
    }

    /// The raw 4-bit value.
    pub fn raw(&self) -> u8 {
        match *self {
            Self::Unknown(raw) => raw,
            named => Self::NAMED
                .iter()
                .position(|l| *l == named)
                .map_or(0, |i| i as u8),
        }
    }
}

/// Data carried by an ear instead of an item code.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EarData {
    /// Class of the player the ear came from (3 bits).
    pub class: u8,
    /// That player's level (7 bits).
    pub level: u8,
    /// That player's name, at most 15 ASCII characters.
    pub player_name: String,
}

/// Ear or regular item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemKind {
    /// Ear trophy.
    Ear(EarData),
    /// Any item identified by a type code.
    Standard {
        /// Item type code.
        code: ItemCode,
    },
}

impl ItemKind {
    /// The item code, if this is not an ear.
    pub fn code(&self) -> Option<&ItemCode> {
        match self {
            Self::Ear(_) => None,
            Self::Standard { code } => Some(code),
        }
    }
}

/// One magic affix pair of a rare or crafted item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AffixPair {
    /// Magic prefix id (11 bits).
    pub prefix: Option<u16>,
    /// Magic suffix id (11 bits).
    pub suffix: Option<u16>,
}

/// Name and affixes of a rare or crafted item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RareAffixes {
    /// First name word (8 bits).
    pub name_prefix: u8,
    /// Second name word (8 bits).
    pub name_suffix: u8,
    /// Up to three prefix/suffix pairs.
    pub affixes: [AffixPair; 3],
}

/// Quality tier together with its quality-specific fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemQuality {
    /// Low quality (1).
    Inferior {
        /// Inferior name index (3 bits).
        file_index: u8,
    },
    /// Normal (2).
    Normal,
    /// Superior (3).
    Superior {
        /// Superior modifier index (3 bits).
        file_index: u8,
    },
    /// Magic (4).
    Magic {
        /// Prefix id (11 bits).
        prefix: u16,
        /// Suffix id (11 bits).
        suffix: u16,
    },
    /// Set (5).
    Set {
        /// Set item index (12 bits).
        file_index: u16,
        /// Which bonus stat lists follow the base list (5 bits).
        set_item_mask: u8,
    },
    /// Rare (6).
    Rare(RareAffixes),
    /// Unique (7).
    Unique {
        /// Unique item index (12 bits).
        file_index: u16,
    },
    /// Crafted (8).
    Craft(RareAffixes),
    /// Tempered (9).
    Tempered,
    /// Any other 4-bit value; carries no fields.
    Unknown(u8),
}

impl ItemQuality {
    /// The raw 4-bit quality value.
    pub fn raw(&self) -> u8 {
        match *self {
            Self::Inferior { .. } => 1,
            Self::Normal => 2,
            Self::Superior { .. } => 3,
            Self::Magic { .. } => 4,
            Self::Set { .. } => 5,
            Self::Rare(_) => 6,
            Self::Unique { .. } => 7,
            Self::Craft(_) => 8,
            Self::Tempered => 9,
            Self::Unknown(raw) => raw,
        }
    }

    /// Quality name for display.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Inferior { .. } => "inferior",
            Self::Normal => "normal",
            Self::Superior { .. } => "superior",
            Self::Magic { .. } => "magic",
            Self::Set { .. } => "set",
            Self::Rare(_) => "rare",
            Self::Unique { .. } => "unique",
            Self::Craft(_) => "crafted",
            Self::Tempered => "tempered",
            Self::Unknown(_) => "unknown",
        }
    }
}

/// Runeword id and the stat list slot its bonuses live in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Runeword {
    /// Runeword id (12 bits).
    pub id: u16,
    /// Slot `s` (4 bits); the bonus list is selected by mask bit `1 << (s + 1)`.
    pub list_slot: u8,
}

impl Runeword {
    /// Presence mask contribution of this runeword.
    pub fn mask(&self) -> u32 {
        1u32 << (self.list_slot as u32 + 1)
    }
}

/// Durability pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Durability {
    /// Maximum durability; zero means indestructible.
    pub max: u16,
    /// Current durability; only stored when `max > 0`.
    pub current: u16,
}

/// Fields of the complete (non-compact) block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompleteData {
    /// Unique item instance id.
    pub id: u32,
    /// Item level (7 bits).
    pub level: u8,
    /// Alternate graphic (3 bits).
    pub graphic_id: Option<u8>,
    /// Automatic affix (11 bits).
    pub auto_affix_id: Option<u16>,
    /// Quality tier and its fields.
    pub quality: ItemQuality,
    /// Present iff the runeword flag is set.
    pub runeword: Option<Runeword>,
    /// Present iff the personalized flag is set.
    pub personalized_name: Option<String>,
    /// Spell suffix of a tome (5 bits); present iff the code is a book.
    pub tome_suffix_id: Option<u8>,
    /// Opaque 96-bit realm blob.
    pub realm_data: Option<[u32; 3]>,
    /// Defense rating; present iff the code is armor.
    pub armor: Option<u16>,
    /// Present iff the code is armor or a weapon.
    pub durability: Option<Durability>,
    /// Stack size (9 bits); present iff the code is stackable.
    pub quantity: Option<u16>,
    /// Socket total (4 bits); present iff the socketed flag is set.
    pub total_sockets: Option<u8>,
    /// Base stat list followed by one list per presence mask bit.
    pub stat_lists: Vec<StatList>,
}

impl CompleteData {
    /// Bitmask of optional stat lists following the base list.
    pub fn property_list_mask(&self) -> u32 {
        let mut mask = 0;
        if let Some(runeword) = &self.runeword {
            mask |= runeword.mask();
        }
        if let ItemQuality::Set { set_item_mask, .. } = self.quality {
            mask |= set_item_mask as u32;
        }
        mask
    }
}

/// One item record and the items socketed into it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    /// Legacy per-item header; [`ITEM_HEADER`] is written when absent.
    pub legacy_header: Option<u16>,
    /// Flag word.
    pub flags: ItemFlags,
    /// Version tag.
    pub version: ItemVersion,
    /// Storage mode.
    pub mode: ItemMode,
    /// Equipment slot.
    pub location: ItemLocation,
    /// Grid column (4 bits).
    pub x: u8,
    /// Grid row (4 bits).
    pub y: u8,
    /// Storage page (3 bits).
    pub page: u8,
    /// Ear or coded item.
    pub kind: ItemKind,
    /// Present iff the compact flag is clear.
    pub complete: Option<CompleteData>,
    /// Items inserted into this item's sockets.
    pub socketed_items: Vec<Item>,
}

impl Item {
    /// Item code, or `None` for ears.
    pub fn code(&self) -> Option<&ItemCode> {
        self.kind.code()
    }

    /// Check whether the item has no complete block.
    pub fn is_compact(&self) -> bool {
        self.flags.is_compact()
    }

    /// Total number of items in this tree, including this one.
    pub fn count_recursive(&self) -> usize {
        1 + self
            .socketed_items
            .iter()
            .map(Item::count_recursive)
            .sum::<usize>()
    }
}
