//! Item property lists.
//!
//! A property list is a run of stats, each introduced by a 9-bit id, and
//! closed by the id [`STAT_LIST_END`]. Field widths come from the stat's
//! metadata row: an optional parameter of `save_param_bits` bits, then the
//! value in `save_bits` bits stored with `save_add` added.
//!
//! A few damage stats are grouped: their id implies one or two entries with
//! the following ids, written right after without ids of their own.
//!
//! ```text
//! id(9) [param] value | id(9) [param] value | ... | 0x1FF
//! 48    value         ← firemindam
//!       value         ← firemaxdam (49), no id
//! ```

use crate::metadata::{StatCost, StatMetadata};
use d2codec_core::error::{CodecError, Result};
use d2codec_core::{BitReader, BitWriter};
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Width of a stat id.
pub const STAT_ID_BITS: usize = 9;

/// Id that terminates a property list.
pub const STAT_LIST_END: u16 = 0x1FF;

/// Upper bound on entries in one list.
pub const MAX_STATS_PER_LIST: usize = 512;

/// Widest parameter that is split into named fields.
const SPLIT_PARAM_BITS: u8 = 16;

/// Number of id-less entries following a grouped stat.
pub fn group_followers(id: u16) -> u16 {
    match id {
        // item_maxdamage_percent, firemindam, lightmindam, magicmindam
        17 | 48 | 50 | 52 => 1,
        // coldmindam, poisonmindam
        54 | 57 => 2,
        _ => 0,
    }
}

/// Decoded stat parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StatParam {
    /// The stat has no parameter field.
    #[default]
    None,
    /// Raw parameter with no known structure.
    Plain(u32),
    /// Skill tab bonus: tab in the low 3 bits, class level above.
    SkillTab {
        /// Skill tab index.
        tab: u8,
        /// Class-specific tab value.
        level: u16,
    },
    /// Chance to cast: level in the low 6 bits, skill id above.
    SkillCast {
        /// Skill id (10 bits).
        skill_id: u16,
        /// Skill level (6 bits).
        level: u8,
    },
    /// Charged skill. The stat value holds the current charges.
    Charges {
        /// Skill id (10 bits).
        skill_id: u16,
        /// Skill level (6 bits).
        level: u8,
        /// Maximum charges.
        max_charges: u8,
    },
}

/// One property of an item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemStat {
    /// Stat id.
    pub id: u16,
    /// Stat name from metadata.
    pub name: String,
    /// Parameter.
    pub param: StatParam,
    /// Value with the save bias removed.
    pub value: i32,
}

/// An ordered property list.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StatList {
    /// Entries in stream order, grouped followers included.
    pub stats: Vec<ItemStat>,
}

impl StatList {
    /// Create an empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.stats.len()
    }

    /// Check if the list is empty.
    pub fn is_empty(&self) -> bool {
        self.stats.is_empty()
    }

    /// First entry with the given name.
    pub fn find(&self, name: &str) -> Option<&ItemStat> {
        self.stats.iter().find(|s| s.name == name)
    }
}

/// Reads and writes property lists against a stat table.
#[derive(Debug)]
pub struct StatListCodec<'m, M: ?Sized> {
    meta: &'m M,
}

impl<'m, M: StatMetadata + ?Sized> StatListCodec<'m, M> {
    /// Create a codec over `meta`.
    pub fn new(meta: &'m M) -> Self {
        Self { meta }
    }

    /// Read one list up to and including its terminator.
    ///
    /// Running out of data before the terminator fails with
    /// [`CodecError::TruncatedSentinel`].
    pub fn read(&self, reader: &mut BitReader<'_>) -> Result<StatList> {
        let start = reader.position();
        let list = self.read_entries(reader, start).map_err(|e| {
            if e.is_end_of_data() {
                CodecError::truncated_sentinel(start)
            } else {
                e
            }
        })?;
        trace!(
            start,
            end = reader.position(),
            stats = list.len(),
            "read stat list"
        );
        Ok(list)
    }

    fn read_entries(&self, reader: &mut BitReader<'_>, start: usize) -> Result<StatList> {
        let mut list = StatList::new();
        loop {
            let id_position = reader.position();
            let id = reader.read_u16(STAT_ID_BITS)?;
            if id == STAT_LIST_END {
                return Ok(list);
            }
            if list.len() >= MAX_STATS_PER_LIST {
                return Err(CodecError::truncated_sentinel(start));
            }
            list.stats.push(self.read_stat(reader, id, id_position)?);
            for k in 1..=group_followers(id) {
                let position = reader.position();
                list.stats.push(self.read_stat(reader, id + k, position)?);
            }
        }
    }

    fn read_stat(
        &self,
        reader: &mut BitReader<'_>,
        id: u16,
        position: usize,
    ) -> Result<ItemStat> {
        let cost = self
            .meta
            .stat_by_id(id)
            .ok_or_else(|| CodecError::unknown_stat_id(id, position))?;

        let mut param = StatParam::None;
        if cost.save_param_bits > 0 {
            let raw = reader.read_u32(cost.save_param_bits as usize)?;
            param = split_param(cost, raw);
        }

        let raw = reader.read_u32(cost.save_bits as usize)?;
        let mut value = (raw as i32).wrapping_sub(cost.save_add);
        if let StatParam::SkillCast { skill_id, level } = param {
            if splits_charges(cost) {
                param = StatParam::Charges {
                    skill_id,
                    level,
                    max_charges: ((value >> 8) & 0xFF) as u8,
                };
                value &= 0xFF;
            }
        }

        Ok(ItemStat {
            id,
            name: cost.name.clone(),
            param,
            value,
        })
    }

    /// Write `list` followed by the terminator.
    ///
    /// Grouped stats must be followed by their dependent ids in order;
    /// otherwise [`CodecError::MalformedStatGroup`] is returned.
    pub fn write(&self, writer: &mut BitWriter, list: &StatList) -> Result<()> {
        let stats = &list.stats;
        let mut i = 0;
        while i < stats.len() {
            let stat = &stats[i];
            if stat.id >= STAT_LIST_END {
                return Err(CodecError::invalid_item(format!(
                    "stat id {} does not fit the id field",
                    stat.id
                )));
            }
            let followers = group_followers(stat.id);
            for k in 1..=followers {
                let expected = stat.id + k;
                match stats.get(i + k as usize) {
                    Some(next) if next.id == expected => {}
                    Some(next) => {
                        return Err(CodecError::malformed_group(
                            stat.id,
                            expected,
                            format!("found stat {}", next.id),
                        ));
                    }
                    None => {
                        return Err(CodecError::malformed_group(
                            stat.id,
                            expected,
                            "list ends",
                        ));
                    }
                }
            }

            writer.write_u16(stat.id, STAT_ID_BITS);
            for entry in &stats[i..=i + followers as usize] {
                self.write_stat(writer, entry)?;
            }
            i += 1 + followers as usize;
        }
        writer.write_u16(STAT_LIST_END, STAT_ID_BITS);
        Ok(())
    }

    fn write_stat(&self, writer: &mut BitWriter, stat: &ItemStat) -> Result<()> {
        let cost = self
            .meta
            .stat_by_id(stat.id)
            .ok_or_else(|| CodecError::unknown_stat_id(stat.id, writer.position()))?;

        let (param, value) = join_param(cost, stat)?;
        if let Some(param) = param {
            check_width(cost, "parameter", param, cost.save_param_bits)?;
            writer.write_u32(param, cost.save_param_bits as usize);
        }

        let raw = value.wrapping_add(cost.save_add) as u32;
        check_width(cost, "value", raw, cost.save_bits)?;
        writer.write_u32(raw, cost.save_bits as usize);
        Ok(())
    }
}

/// Whether a charges stat's value can be split into max and current charges.
fn splits_charges(cost: &StatCost) -> bool {
    cost.encode == 3 && cost.save_bits <= 16 && cost.save_add == 0
}

fn split_param(cost: &StatCost, raw: u32) -> StatParam {
    if cost.save_param_bits > SPLIT_PARAM_BITS {
        return StatParam::Plain(raw);
    }
    match (cost.encode, cost.desc_func) {
        (2 | 3, _) => StatParam::SkillCast {
            skill_id: ((raw >> 6) & 0x3FF) as u16,
            level: (raw & 0x3F) as u8,
        },
        (_, 14) => StatParam::SkillTab {
            tab: (raw & 0x7) as u8,
            level: ((raw >> 3) & 0x1FFF) as u16,
        },
        _ => StatParam::Plain(raw),
    }
}

/// Rebuild the raw parameter and the unbiased value of a stat.
fn join_param(cost: &StatCost, stat: &ItemStat) -> Result<(Option<u32>, i32)> {
    let has_param = cost.save_param_bits > 0;
    let param = match stat.param {
        StatParam::None if !has_param => return Ok((None, stat.value)),
        StatParam::None => {
            return Err(param_mismatch(cost, "requires a parameter"));
        }
        _ if !has_param => return Err(param_mismatch(cost, "has no parameter")),
        StatParam::Plain(raw) => raw,
        StatParam::SkillTab { tab, level } => {
            if tab > 0x7 || level > 0x1FFF {
                return Err(param_mismatch(cost, "skill tab out of range"));
            }
            (tab as u32) | ((level as u32) << 3)
        }
        StatParam::SkillCast { skill_id, level }
        | StatParam::Charges {
            skill_id, level, ..
        } => {
            if skill_id > 0x3FF || level > 0x3F {
                return Err(param_mismatch(cost, "skill out of range"));
            }
            (level as u32) | ((skill_id as u32) << 6)
        }
    };

    let value = match stat.param {
        StatParam::Charges { max_charges, .. } => {
            if !(0..=0xFF).contains(&stat.value) {
                return Err(param_mismatch(cost, "charges out of range"));
            }
            ((max_charges as i32) << 8) | stat.value
        }
        _ => stat.value,
    };
    Ok((Some(param), value))
}

fn check_width(cost: &StatCost, field: &str, raw: u32, bits: u8) -> Result<()> {
    if bits < 32 && raw >> bits != 0 {
        return Err(CodecError::invalid_item(format!(
            "stat {} ({}): {field} {raw:#x} does not fit {bits} bits",
            cost.id, cost.name
        )));
    }
    Ok(())
}

fn param_mismatch(cost: &StatCost, message: &str) -> CodecError {
    CodecError::invalid_item(format!("stat {} ({}) {message}", cost.id, cost.name))
}
