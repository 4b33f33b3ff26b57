use serde::{Deserialize, Serialize};

use crate::components::info::{InfoItem, default_info_items};
use crate::layout::LayoutTree;

pub const DEFAULT_LEFT_WIDTH: f64 = 60.0;

/// One tour/exhibit document: text fields, the info list and the image layout.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub title: String,
    pub description: String,
    pub note: String,
    /// Publication status; omitted from exports when empty.
    pub status: String,
    /// Width of the layout panel in percent.
    pub left_width: f64,
    pub info_items: Vec<InfoItem>,
    pub layout: LayoutTree,
}

impl Default for Document {
    fn default() -> Self {
        Self::with_left_width(DEFAULT_LEFT_WIDTH)
    }
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_left_width(left_width: f64) -> Self {
        Self {
            title: String::new(),
            description: String::new(),
            note: String::new(),
            status: String::new(),
            left_width,
            info_items: default_info_items(),
            layout: LayoutTree::new(),
        }
    }

    /// Placed images that only exist locally (`data:` / `blob:` sources) and
    /// would be missing when the export is opened elsewhere.
    pub fn has_unpublished_images(&self) -> bool {
        self.layout
            .iter_items()
            .any(|(_, _, item)| item.src.starts_with("data:") || item.src.starts_with("blob:"))
    }
}
