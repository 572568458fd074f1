//! Item and stat metadata.
//!
//! The item layout depends on two lookups into the game's data tables:
//! per-stat bit widths (`ItemStatCost.txt`) and whether an item code is armor,
//! a weapon, or stackable (`Armor.txt`, `Weapons.txt`, `Misc.txt`). The codec
//! only sees these through the [`StatMetadata`] and [`ItemTypeMetadata`]
//! traits, so callers can supply their own tables.
//!
//! The TSV loaders here follow the game files: a header row of column names,
//! tab-separated cells, and numeric cells that are empty or unparsable read
//! as zero. Lookups compare codes and names with surrounding whitespace
//! trimmed.

use d2codec_core::error::{CodecError, Result};
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

/// Stat name of the armor rating row.
pub const ARMOR_CLASS_STAT: &str = "armorclass";

/// Stat name of the durability row, used for both max and current durability.
pub const MAX_DURABILITY_STAT: &str = "maxdurability";

/// Widest field a stat may declare.
const MAX_FIELD_BITS: u8 = 32;

/// Layout of one stat as stored in an item's property list.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StatCost {
    /// Stat id (9 bits on the wire).
    pub id: u16,
    /// Stat name, e.g. `strength`.
    pub name: String,
    /// Width of the value field.
    pub save_bits: u8,
    /// Bias subtracted from the stored value.
    pub save_add: i32,
    /// Width of the parameter field; zero when the stat has none.
    pub save_param_bits: u8,
    /// Encoding kind (2: chance to cast, 3: charges).
    pub encode: u8,
    /// Description function (14: skill tab bonus).
    pub desc_func: u8,
}

/// Source of stat layouts.
pub trait StatMetadata {
    /// Look up a stat by id.
    fn stat_by_id(&self, id: u16) -> Option<&StatCost>;

    /// Look up a stat by name.
    fn stat_by_name(&self, name: &str) -> Option<&StatCost>;
}

/// Broad class of an item type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemClass {
    /// Listed in `Armor.txt`.
    Armor,
    /// Listed in `Weapons.txt`.
    Weapon,
    /// Listed in `Misc.txt`.
    Misc,
}

/// Source of item type facts.
pub trait ItemTypeMetadata {
    /// Class of `code`, or `None` if the code is unknown.
    fn item_class(&self, code: &str) -> Option<ItemClass>;

    /// Whether items of `code` carry a quantity.
    fn is_stackable(&self, code: &str) -> bool;
}

/// Everything the item codec needs to look up.
pub trait Metadata: StatMetadata + ItemTypeMetadata {}

impl<T: StatMetadata + ItemTypeMetadata + ?Sized> Metadata for T {}

/// Stat layouts indexed by id and by name.
#[derive(Debug, Clone, Default)]
pub struct StatCostTable {
    rows: Vec<StatCost>,
    by_id: HashMap<u16, usize>,
    by_name: HashMap<String, usize>,
}

impl StatCostTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a row. A later row with the same id or name does not replace an
    /// earlier one.
    pub fn insert(&mut self, stat: StatCost) -> Result<()> {
        if stat.save_bits > MAX_FIELD_BITS || stat.save_param_bits > MAX_FIELD_BITS {
            return Err(CodecError::invalid_metadata(
                "ItemStatCost.txt",
                format!(
                    "stat {} declares {}+{} bits",
                    stat.name, stat.save_bits, stat.save_param_bits
                ),
            ));
        }
        let index = self.rows.len();
        self.by_id.entry(stat.id).or_insert(index);
        self.by_name
            .entry(stat.name.trim().to_string())
            .or_insert(index);
        self.rows.push(stat);
        Ok(())
    }

    /// Parse `ItemStatCost.txt`.
    ///
    /// Uses the columns `Stat`, `ID`, `Save Bits`, `Save Add`,
    /// `Save Param Bits`, `Encode` and `descfunc`. Rows with an empty `ID`
    /// are skipped.
    pub fn from_tsv(text: &str) -> Result<Self> {
        let table = Tsv::parse("ItemStatCost.txt", text)?;
        let stat = table.column("Stat")?;
        let id = table.column("ID")?;
        let save_bits = table.column("Save Bits")?;
        let save_add = table.column("Save Add")?;
        let save_param_bits = table.column("Save Param Bits")?;
        let encode = table.column("Encode")?;
        let desc_func = table.column("descfunc")?;

        let mut stats = Self::new();
        for row in table.rows() {
            if row.text(id).is_empty() {
                continue;
            }
            stats.insert(StatCost {
                id: row.number(id),
                name: row.text(stat).to_string(),
                save_bits: row.number(save_bits),
                save_add: row.number(save_add),
                save_param_bits: row.number(save_param_bits),
                encode: row.number(encode),
                desc_func: row.number(desc_func),
            })?;
        }
        debug!(rows = stats.len(), "loaded stat costs");
        Ok(stats)
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Check if the table is empty.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Iterate over rows in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &StatCost> {
        self.rows.iter()
    }
}

impl StatMetadata for StatCostTable {
    fn stat_by_id(&self, id: u16) -> Option<&StatCost> {
        self.by_id.get(&id).map(|&i| &self.rows[i])
    }

    fn stat_by_name(&self, name: &str) -> Option<&StatCost> {
        self.by_name.get(name.trim()).map(|&i| &self.rows[i])
    }
}

#[derive(Debug, Clone, Copy)]
struct ItemType {
    class: ItemClass,
    stackable: bool,
}

/// Item codes by class, with stackability.
#[derive(Debug, Clone, Default)]
pub struct ItemTypeTable {
    types: HashMap<String, ItemType>,
}

impl ItemTypeTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `code`. Armor, weapon and misc tables are consulted in that
    /// order, so the first registration of a code wins.
    pub fn insert(&mut self, code: &str, class: ItemClass, stackable: bool) {
        self.types
            .entry(code.trim().to_string())
            .or_insert(ItemType { class, stackable });
    }

    /// Parse one of `Armor.txt`, `Weapons.txt` or `Misc.txt` into this table.
    ///
    /// Uses the `code` column and, when present, the `stackable` column.
    /// Rows with an empty code are skipped.
    pub fn add_tsv(&mut self, name: &str, text: &str, class: ItemClass) -> Result<usize> {
        let table = Tsv::parse(name, text)?;
        let code = table.column("code")?;
        let stackable = table.optional_column("stackable");

        let mut added = 0;
        for row in table.rows() {
            let value = row.text(code);
            if value.is_empty() {
                continue;
            }
            let stackable = stackable.is_some_and(|c| row.number::<i32>(c) != 0);
            self.insert(value, class, stackable);
            added += 1;
        }
        debug!(table = name, rows = added, "loaded item types");
        Ok(added)
    }

    /// Number of registered codes.
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Check if the table is empty.
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

impl ItemTypeMetadata for ItemTypeTable {
    fn item_class(&self, code: &str) -> Option<ItemClass> {
        self.types.get(code.trim()).map(|t| t.class)
    }

    fn is_stackable(&self, code: &str) -> bool {
        self.types.get(code.trim()).is_some_and(|t| t.stackable)
    }
}

/// Stat and item type tables bundled together.
#[derive(Debug, Clone, Default)]
pub struct MetaData {
    /// Stat layouts.
    pub stats: StatCostTable,
    /// Item types.
    pub items: ItemTypeTable,
}

impl MetaData {
    /// Bundle two tables.
    pub fn new(stats: StatCostTable, items: ItemTypeTable) -> Self {
        Self { stats, items }
    }

    /// Load `ItemStatCost.txt`, `Armor.txt`, `Weapons.txt` and `Misc.txt`
    /// from `dir`.
    pub fn load_dir(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let text = std::fs::read_to_string(dir.join("ItemStatCost.txt"))?;
        let stats = StatCostTable::from_tsv(&text)?;
        let mut items = ItemTypeTable::new();
        for (file, class) in [
            ("Armor.txt", ItemClass::Armor),
            ("Weapons.txt", ItemClass::Weapon),
            ("Misc.txt", ItemClass::Misc),
        ] {
            let text = std::fs::read_to_string(dir.join(file))?;
            items.add_tsv(file, &text, class)?;
        }
        Ok(Self::new(stats, items))
    }
}

impl StatMetadata for MetaData {
    fn stat_by_id(&self, id: u16) -> Option<&StatCost> {
        self.stats.stat_by_id(id)
    }

    fn stat_by_name(&self, name: &str) -> Option<&StatCost> {
        self.stats.stat_by_name(name)
    }
}

impl ItemTypeMetadata for MetaData {
    fn item_class(&self, code: &str) -> Option<ItemClass> {
        self.items.item_class(code)
    }

    fn is_stackable(&self, code: &str) -> bool {
        self.items.is_stackable(code)
    }
}

/// A parsed tab-separated table.
struct Tsv<'a> {
    name: &'a str,
    columns: HashMap<&'a str, usize>,
    lines: Vec<&'a str>,
}

impl<'a> Tsv<'a> {
    fn parse(name: &'a str, text: &'a str) -> Result<Self> {
        let mut lines = text.lines();
        let header = lines
            .next()
            .ok_or_else(|| CodecError::invalid_metadata(name, "missing header row"))?;
        let mut columns = HashMap::new();
        for (i, column) in header.split('\t').enumerate() {
            columns.entry(column.trim()).or_insert(i);
        }
        Ok(Self {
            name,
            columns,
            lines: lines.filter(|l| !l.trim().is_empty()).collect(),
        })
    }

    fn column(&self, column: &str) -> Result<usize> {
        self.optional_column(column).ok_or_else(|| {
            CodecError::invalid_metadata(self.name, format!("missing column '{column}'"))
        })
    }

    fn optional_column(&self, column: &str) -> Option<usize> {
        self.columns.get(column).copied()
    }

    fn rows(&self) -> impl Iterator<Item = Row<'a>> + '_ {
        self.lines.iter().map(|line| Row {
            cells: line.split('\t').collect(),
        })
    }
}

struct Row<'a> {
    cells: Vec<&'a str>,
}

impl<'a> Row<'a> {
    fn text(&self, column: usize) -> &'a str {
        self.cells.get(column).copied().map_or("", str::trim)
    }

    fn number<T: std::str::FromStr + Default>(&self, column: usize) -> T {
        self.text(column).parse().unwrap_or_default()
    }
}
