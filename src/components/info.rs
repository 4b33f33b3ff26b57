use serde::{Deserialize, Serialize};

use crate::layout::ElementId;

/// Title of the info row a fresh document starts with.
pub const DEFAULT_INFO_TITLE: &str = "Opening Hours";

/// One key/value row of the exhibit's info list.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InfoItem {
    pub id: ElementId,
    pub title: String,
    pub content: String,
    pub note: String,
}

impl InfoItem {
    pub fn new(title: impl Into<String>, content: impl Into<String>, note: impl Into<String>) -> Self {
        Self {
            id: ElementId::new(),
            title: title.into(),
            content: content.into(),
            note: note.into(),
        }
    }

    pub fn empty() -> Self {
        Self::new("", "", "")
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InfoField {
    Title,
    Content,
    Note,
}

/// The default list for a new document: a single "Opening Hours" row.
pub fn default_info_items() -> Vec<InfoItem> {
    vec![InfoItem::new(DEFAULT_INFO_TITLE, "", "")]
}

pub fn add_info_item(items: &mut Vec<InfoItem>) -> ElementId {
    let item = InfoItem::empty();
    let id = item.id;
    items.push(item);
    id
}

pub fn update_info_item(items: &mut [InfoItem], id: ElementId, field: InfoField, value: impl Into<String>) -> bool {
    let Some(item) = items.iter_mut().find(|i| i.id == id) else {
        return false;
    };
    let value = value.into();
    match field {
        InfoField::Title => item.title = value,
        InfoField::Content => item.content = value,
        InfoField::Note => item.note = value,
    }
    true
}

pub fn delete_info_item(items: &mut Vec<InfoItem>, id: ElementId) -> bool {
    let before = items.len();
    items.retain(|i| i.id != id);
    items.len() != before
}

/// Swap the row at `index` with its neighbour `direction` steps away
/// (-1 = up, +1 = down). Moves past either end are ignored.
pub fn move_info_item(items: &mut [InfoItem], index: usize, direction: isize) -> bool {
    let Some(new_index) = index.checked_add_signed(direction) else {
        return false;
    };
    if index >= items.len() || new_index >= items.len() || new_index == index {
        return false;
    }
    items.swap(index, new_index);
    true
}
