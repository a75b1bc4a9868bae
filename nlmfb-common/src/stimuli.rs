//! Stimulus loading
//!
//! The stimulus file is a CSV with one row per item. Only the columns named
//! on [`StimulusItem`] are read; anything else in the file is ignored.

use crate::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize};
use std::io::Read;
use std::path::Path;
use tracing::info;

/// Everything the experiment page needs for one item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StimulusItem {
    pub item_id: String,
    /// Item template (story) id
    #[serde(deserialize_with = "deserialize_item_number")]
    pub item: i64,
    pub condition: String,
    pub first_mention: String,
    pub recent_mention: String,
    pub knowledge_cue: String,
    pub start: String,
    pub end: String,

    /// Human-readable passage (the `passage_hr` column)
    #[serde(rename(deserialize = "passage_hr"))]
    pub passage: String,

    pub critical_q: String,
    pub critical_a: String,

    pub attn_check_1_q: String,
    pub attn_check_1_a: String,
    pub attn_check_2_q: String,
    pub attn_check_2_a: String,
}

/// Spreadsheet tools sometimes write integer columns as `3.0`
fn deserialize_item_number<'de, D>(deserializer: D) -> std::result::Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    let trimmed = raw.trim();
    if let Ok(n) = trimmed.parse::<i64>() {
        return Ok(n);
    }
    match trimmed.parse::<f64>() {
        Ok(f) if f.fract() == 0.0 && f.is_finite() => Ok(f as i64),
        _ => Err(serde::de::Error::custom(format!("invalid item number '{}'", raw))),
    }
}

/// All items of the experiment, in file order
#[derive(Debug, Clone, Default)]
pub struct StimulusSet {
    items: Vec<StimulusItem>,
}

impl StimulusSet {
    /// Read the stimulus CSV at `path`
    pub fn load(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path).map_err(|e| {
            Error::Config(format!("Cannot open stimuli file {}: {}", path.display(), e))
        })?;
        let set = Self::from_reader(file)?;
        info!("Loaded {} stimulus items from {}", set.len(), path.display());
        Ok(set)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut csv_reader = csv::Reader::from_reader(reader);
        let items = csv_reader
            .deserialize()
            .collect::<std::result::Result<Vec<StimulusItem>, csv::Error>>()?;
        Ok(Self { items })
    }

    pub fn from_items(items: Vec<StimulusItem>) -> Self {
        Self { items }
    }

    /// Look up an item; the id must identify exactly one row
    pub fn get(&self, item_id: &str) -> Result<&StimulusItem> {
        let mut matches = self.items.iter().filter(|item| item.item_id == item_id);
        match (matches.next(), matches.next()) {
            (Some(item), None) => Ok(item),
            _ => Err(Error::InvalidInput(format!("item_id: '{}' is invalid", item_id))),
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &StimulusItem> {
        self.items.iter()
    }
}
