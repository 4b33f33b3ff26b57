// ============================================================================
// LAYOUT TREE: rows of columns of stacked images
// ============================================================================

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::error::LayoutError;

/// Lower clamp bound shared by column width ratios and item flex values.
pub const MIN_RATIO: f64 = 0.1;
/// Upper clamp bound shared by column width ratios and item flex values.
pub const MAX_RATIO: f64 = 4.0;
/// Default width ratio / flex for freshly created columns and items.
pub const DEFAULT_RATIO: f64 = 1.0;

/// Opaque identity of a row group, column, item, pool image or info item.
/// Fresh ids are random v4 UUIDs and are never reused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ElementId(Uuid);

impl ElementId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ElementId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

/// Natural pixel size of an image.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ImageDimensions {
    pub width: u32,
    pub height: u32,
}

impl ImageDimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Natural aspect ratio (width / height). Zero-height images report 1.0.
    pub fn ratio(&self) -> f64 {
        if self.height == 0 {
            return 1.0;
        }
        self.width as f64 / self.height as f64
    }
}

/// One placed image.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GridItem {
    pub id: ElementId,
    pub src: String,
    pub dimensions: ImageDimensions,
    pub caption: String,
    /// Relative vertical share inside the column.
    pub flex: f64,
    /// File name used on export; generated when absent.
    pub file_name: Option<String>,
}

impl GridItem {
    pub fn new(src: impl Into<String>, dimensions: ImageDimensions, caption: impl Into<String>) -> Self {
        Self {
            id: ElementId::new(),
            src: src.into(),
            dimensions,
            caption: caption.into(),
            flex: DEFAULT_RATIO,
            file_name: None,
        }
    }

    /// On-screen aspect ratio: `width / (height * flex)`. A larger flex claims
    /// more vertical space and renders the image in a flatter box.
    pub fn effective_ratio(&self) -> f64 {
        let flex = if self.flex > 0.0 { self.flex } else { DEFAULT_RATIO };
        self.dimensions.ratio() / flex
    }
}

/// A vertical stack of items inside a row group.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub id: ElementId,
    pub items: Vec<GridItem>,
    /// Relative horizontal share inside the row group.
    pub width_ratio: f64,
}

impl Column {
    pub fn with_item(item: GridItem) -> Self {
        Self {
            id: ElementId::new(),
            items: vec![item],
            width_ratio: DEFAULT_RATIO,
        }
    }
}

/// One horizontal band of the layout.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RowGroup {
    pub id: ElementId,
    pub columns: Vec<Column>,
}

impl RowGroup {
    pub fn with_item(item: GridItem) -> Self {
        Self {
            id: ElementId::new(),
            columns: vec![Column::with_item(item)],
        }
    }
}

/// Group / column / item coordinates of one placed image.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ItemCoords {
    pub group: usize,
    pub col: usize,
    pub item: usize,
}

impl ItemCoords {
    pub fn new(group: usize, col: usize, item: usize) -> Self {
        Self { group, col, item }
    }
}

impl fmt::Display for ItemCoords {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.group, self.col, self.item)
    }
}

/// The full image layout: the value snapshotted by the history manager.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LayoutTree {
    pub groups: Vec<RowGroup>,
}

impl LayoutTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_groups(groups: Vec<RowGroup>) -> Self {
        Self { groups }
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    pub fn item_count(&self) -> usize {
        self.groups
            .iter()
            .flat_map(|g| g.columns.iter())
            .map(|c| c.items.len())
            .sum()
    }

    pub fn column_at(&self, group: usize, col: usize) -> Option<&Column> {
        self.groups.get(group)?.columns.get(col)
    }

    pub fn item_at(&self, coords: ItemCoords) -> Option<&GridItem> {
        self.column_at(coords.group, coords.col)?.items.get(coords.item)
    }

    pub fn contains(&self, coords: ItemCoords) -> bool {
        self.item_at(coords).is_some()
    }

    /// Iterate every placed item together with its coordinates, in
    /// group → column → item order.
    pub fn iter_items(&self) -> impl Iterator<Item = (ItemCoords, &Column, &GridItem)> + '_ {
        self.groups.iter().enumerate().flat_map(|(g, group)| {
            group.columns.iter().enumerate().flat_map(move |(c, column)| {
                column
                    .items
                    .iter()
                    .enumerate()
                    .map(move |(i, item)| (ItemCoords::new(g, c, i), column, item))
            })
        })
    }

    /// Check the structural invariants: no empty row group, no empty column,
    /// every ratio finite and inside the clamp range. A failure here means a
    /// mutation was implemented wrong; it is never an expected condition.
    pub fn validate(&self) -> Result<(), LayoutError> {
        for (g, group) in self.groups.iter().enumerate() {
            if group.columns.is_empty() {
                return Err(LayoutError::EmptyRowGroup { group: g });
            }
            for (c, column) in group.columns.iter().enumerate() {
                if column.items.is_empty() {
                    return Err(LayoutError::EmptyColumn { group: g, col: c });
                }
                if !ratio_in_range(column.width_ratio) {
                    return Err(LayoutError::InvalidRatio {
                        what: "width ratio",
                        value: column.width_ratio,
                    });
                }
                for item in &column.items {
                    if !ratio_in_range(item.flex) {
                        return Err(LayoutError::InvalidRatio {
                            what: "flex",
                            value: item.flex,
                        });
                    }
                }
            }
        }
        Ok(())
    }
}

fn ratio_in_range(value: f64) -> bool {
    value.is_finite() && (MIN_RATIO - 1e-9..=MAX_RATIO + 1e-9).contains(&value)
}
