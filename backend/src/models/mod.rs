//! Domain models shared by the split, compress and upload stages.
//!
//! - [`SpecRow`] - One spreadsheet row describing an item and its image count
//! - [`DefaultFlag`] - Which default slot an image fills (none / primary / secondary)
//! - [`ManifestEntry`] / [`Manifest`] - Generated filename → provenance and routing
//! - [`PayloadItem`] / [`CatalogPayload`] - What the catalog API receives
//! - [`CatalogResponse`] - What the catalog API answers
//!
//! Serialized field names follow the existing `manifest.json` files and the
//! catalog API contract (`excel_col_d`, `is_def`, the `massage` typo, ...).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::error::ManifestError;

// =============================================================================
// Spec Rows
// =============================================================================

/// Minimum number of columns for a usable row (through the step count).
pub const MIN_COLUMNS: usize = 9;

/// Column positions in the spec document (0-based).
pub mod col {
    pub const GROUP_A: usize = 0;
    pub const GROUP_B: usize = 1;
    pub const STYLE: usize = 2;
    pub const ITEM: usize = 3;
    pub const COLOR: usize = 6;
    pub const STEP: usize = 8;
    pub const PRIMARY_DEFAULT: usize = 9;
    pub const SECONDARY_DEFAULT: usize = 10;
    pub const SWATCH: usize = 11;
}

/// Why a raw row cannot be used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowRejection {
    /// Fewer than [`MIN_COLUMNS`] cells.
    TooFewColumns(usize),
    /// Step count is not a positive integer.
    InvalidStepCount(String),
}

impl std::fmt::Display for RowRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RowRejection::TooFewColumns(n) => {
                write!(f, "only {} column(s), need at least {}", n, MIN_COLUMNS)
            }
            RowRejection::InvalidStepCount(v) => write!(f, "invalid step count (col I): '{}'", v),
        }
    }
}

/// A validated spec row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecRow {
    pub group_a: String,
    pub group_b: String,
    /// Full style code, possibly with a `-suffix`.
    pub style_code: String,
    pub item_code: String,
    /// Color code with `/` removed.
    pub color_code: String,
    /// Images allocated to this row, always >= 1.
    pub step_count: usize,
    pub primary_default: Option<usize>,
    pub secondary_default: Option<usize>,
    /// Swatch reference, bare name or name with extension.
    pub swatch_ref: Option<String>,
}

impl SpecRow {
    /// Validate raw positional cells.
    pub fn from_cells(cells: &[String]) -> Result<Self, RowRejection> {
        if cells.len() < MIN_COLUMNS {
            return Err(RowRejection::TooFewColumns(cells.len()));
        }

        let raw_step = cells[col::STEP].trim();
        let step_count = match raw_step.parse::<usize>() {
            Ok(n) if n >= 1 => n,
            _ => return Err(RowRejection::InvalidStepCount(raw_step.to_string())),
        };

        let cell = |i: usize| cells.get(i).map(|s| s.trim()).unwrap_or("");
        let index = |i: usize| cell(i).parse::<usize>().ok();

        Ok(Self {
            group_a: cell(col::GROUP_A).to_string(),
            group_b: cell(col::GROUP_B).to_string(),
            style_code: cell(col::STYLE).to_string(),
            item_code: cell(col::ITEM).to_string(),
            color_code: cell(col::COLOR).replace('/', ""),
            step_count,
            primary_default: index(col::PRIMARY_DEFAULT),
            secondary_default: index(col::SECONDARY_DEFAULT),
            swatch_ref: Some(cell(col::SWATCH))
                .filter(|s| !s.is_empty())
                .map(str::to_string),
        })
    }

    /// Style code up to the first `-`.
    pub fn style_prefix(&self) -> &str {
        self.style_code.split('-').next().unwrap_or("")
    }

    /// Default flag for the `count`-th image (1-based) of this row.
    pub fn default_flag(&self, count: usize) -> DefaultFlag {
        if self.primary_default == Some(count) {
            DefaultFlag::Primary
        } else if self.secondary_default == Some(count) {
            DefaultFlag::Secondary
        } else {
            DefaultFlag::None
        }
    }

    /// Output filename of the `count`-th image (1-based).
    pub fn image_filename(&self, count: usize) -> String {
        format!("{}_0{}.jpg", self.item_code, count)
    }
}

// =============================================================================
// Default Flag
// =============================================================================

/// Serialized as `0`, `1` or `2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum DefaultFlag {
    #[default]
    None,
    Primary,
    Secondary,
}

impl From<DefaultFlag> for u8 {
    fn from(flag: DefaultFlag) -> u8 {
        match flag {
            DefaultFlag::None => 0,
            DefaultFlag::Primary => 1,
            DefaultFlag::Secondary => 2,
        }
    }
}

impl TryFrom<u8> for DefaultFlag {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(DefaultFlag::None),
            1 => Ok(DefaultFlag::Primary),
            2 => Ok(DefaultFlag::Secondary),
            other => Err(format!("invalid is_def value: {}", other)),
        }
    }
}

// =============================================================================
// Manifest
// =============================================================================

/// Provenance and routing for one generated image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// Item code of the source row.
    #[serde(rename = "excel_col_d")]
    pub item_code: String,

    /// Remote path, set by the upload stage.
    #[serde(rename = "ftp_path", default, skip_serializing_if = "String::is_empty")]
    pub remote_path: String,

    /// 1-based position within the row.
    pub sort: usize,

    #[serde(rename = "is_def")]
    pub default_flag: DefaultFlag,

    /// Swatch file copied next to this image, if any.
    #[serde(rename = "color_pic_filename", default, skip_serializing_if = "String::is_empty")]
    pub swatch_filename: String,
}

/// `manifest.json`: generated filename → entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Manifest {
    entries: BTreeMap<String, ManifestEntry>,
}

impl Manifest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, filename: impl Into<String>, entry: ManifestEntry) {
        self.entries.insert(filename.into(), entry);
    }

    pub fn get(&self, filename: &str) -> Option<&ManifestEntry> {
        self.entries.get(filename)
    }

    pub fn get_mut(&mut self, filename: &str) -> Option<&mut ManifestEntry> {
        self.entries.get_mut(filename)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ManifestEntry)> {
        self.entries.iter()
    }

    /// Read from disk.
    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        let content = fs::read_to_string(path).map_err(|source| ManifestError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Write to disk as pretty JSON.
    pub fn save(&self, path: &Path) -> Result<(), ManifestError> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content).map_err(|source| ManifestError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

// =============================================================================
// Catalog API
// =============================================================================

/// One image as sent to the catalog API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayloadItem {
    #[serde(rename = "excel_col_d")]
    pub item_code: String,

    /// Public remote path (`/image/...`).
    #[serde(rename = "ftp_path")]
    pub remote_path: String,

    pub sort: usize,

    #[serde(rename = "is_def")]
    pub default_flag: DefaultFlag,

    /// Public remote path of the swatch, if any.
    #[serde(rename = "color_pic", default, skip_serializing_if = "String::is_empty")]
    pub swatch_path: String,
}

/// Request body: generated filename → item.
pub type CatalogPayload = BTreeMap<String, PayloadItem>;

/// Catalog API answer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogResponse {
    #[serde(default)]
    pub status: String,

    /// The server spells this field `massage`.
    #[serde(rename = "massage", alias = "message", default)]
    pub message: String,

    /// Item codes unknown to the catalog.
    #[serde(rename = "not_found_sns", default)]
    pub not_found: Vec<String>,

    #[serde(rename = "success_goods_color_pic_ids", default)]
    pub color_pic_ids: Vec<i64>,

    #[serde(rename = "success_goods_color_ids", default)]
    pub color_ids: Vec<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    fn cells(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_row_from_cells() {
        let row = SpecRow::from_cells(&cells(&[
            "G1", "G2", "STYLE1-A", "ITEM1", "", "", "RED/BLK", "", "5", "2", "x", "chip",
        ]))
        .unwrap();

        assert_eq!(row.step_count, 5);
        assert_eq!(row.color_code, "REDBLK");
        assert_eq!(row.style_prefix(), "STYLE1");
        assert_eq!(row.primary_default, Some(2));
        assert_eq!(row.secondary_default, None);
        assert_eq!(row.swatch_ref.as_deref(), Some("chip"));
        assert_eq!(row.image_filename(3), "ITEM1_03.jpg");
        assert_eq!(row.image_filename(12), "ITEM1_012.jpg");
    }

    #[test]
    fn test_row_rejections() {
        assert_eq!(
            SpecRow::from_cells(&cells(&["a", "b", "c"])),
            Err(RowRejection::TooFewColumns(3))
        );
        assert_eq!(
            SpecRow::from_cells(&cells(&["a", "b", "c", "d", "", "", "e", "", "Count"])),
            Err(RowRejection::InvalidStepCount("Count".into()))
        );
        assert!(SpecRow::from_cells(&cells(&["a", "b", "c", "d", "", "", "e", "", "0"])).is_err());
    }

    #[test]
    fn test_default_flag() {
        let mut row = SpecRow::from_cells(&cells(&["a", "b", "c", "d", "", "", "e", "", "4"])).unwrap();
        row.primary_default = Some(1);
        row.secondary_default = Some(1);
        assert_eq!(row.default_flag(1), DefaultFlag::Primary);
        row.primary_default = None;
        assert_eq!(row.default_flag(1), DefaultFlag::Secondary);
        assert_eq!(row.default_flag(2), DefaultFlag::None);
    }

    #[test]
    fn test_manifest_wire_format() {
        let mut manifest = Manifest::new();
        manifest.insert(
            "ITEM1_01.jpg",
            ManifestEntry {
                item_code: "ITEM1".into(),
                remote_path: String::new(),
                sort: 1,
                default_flag: DefaultFlag::Primary,
                swatch_filename: "ITEM1_Color.png".into(),
            },
        );

        let value = serde_json::to_value(&manifest).unwrap();
        assert_eq!(
            value,
            json!({
                "ITEM1_01.jpg": {
                    "excel_col_d": "ITEM1",
                    "sort": 1,
                    "is_def": 1,
                    "color_pic_filename": "ITEM1_Color.png"
                }
            })
        );
    }

    #[test]
    fn test_manifest_roundtrip_on_disk() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("manifest.json");

        let mut manifest = Manifest::new();
        for sort in 1..=3 {
            manifest.insert(
                format!("X_0{}.jpg", sort),
                ManifestEntry {
                    item_code: "X".into(),
                    remote_path: if sort == 2 { "/image/GoodsColor/20240101/X_02.jpg".into() } else { String::new() },
                    sort,
                    default_flag: DefaultFlag::None,
                    swatch_filename: String::new(),
                },
            );
        }
        manifest.save(&path).unwrap();

        assert_eq!(Manifest::load(&path).unwrap(), manifest);
    }

    #[test]
    fn test_invalid_is_def_rejected() {
        let result: Result<ManifestEntry, _> =
            serde_json::from_value(json!({"excel_col_d": "A", "sort": 1, "is_def": 7}));
        assert!(result.is_err());
    }

    #[test]
    fn test_response_accepts_both_spellings() {
        let typo: CatalogResponse =
            serde_json::from_value(json!({"status": "error", "massage": "bad key"})).unwrap();
        assert_eq!(typo.message, "bad key");

        let plain: CatalogResponse = serde_json::from_value(json!({
            "status": "success",
            "message": "ok",
            "not_found_sns": ["B"],
            "success_goods_color_ids": [3, 4]
        }))
        .unwrap();
        assert_eq!(plain.message, "ok");
        assert_eq!(plain.not_found, vec!["B".to_string()]);
        assert_eq!(plain.color_ids, vec![3, 4]);
        assert!(plain.color_pic_ids.is_empty());
    }
}
