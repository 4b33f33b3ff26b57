use crate::components::info::InfoItem;
use crate::layout::ImageDimensions;

/// Dimensions given to a tour image whose source could not be probed.
pub const FALLBACK_DIMENSIONS: ImageDimensions = ImageDimensions { width: 800, height: 600 };

/// Exhibit data fetched from the tour search service, before it is applied.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TourData {
    pub title: String,
    pub description: String,
    pub note: String,
    pub info: Vec<TourInfo>,
    pub images: Vec<TourImage>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TourInfo {
    pub title: String,
    pub content: String,
}

impl TourInfo {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TourImage {
    pub src: String,
    pub caption: String,
}

/// Keep the editor's value or take the incoming one.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FieldChoice {
    #[default]
    Current,
    Incoming,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum InfoChoice {
    #[default]
    Current,
    /// Replace the whole list.
    Incoming,
    /// Append incoming rows whose (title, content) pair is not present yet.
    Merge,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ImageChoice {
    #[default]
    Skip,
    Add,
}

/// Per-field decisions taken in the apply dialog.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TourSelections {
    pub title: FieldChoice,
    pub description: FieldChoice,
    pub note: FieldChoice,
    pub info: InfoChoice,
    pub images: ImageChoice,
}

/// Apply the info decision to `items`. An empty incoming list never
/// changes anything. Returns whether the list changed.
pub fn apply_info(items: &mut Vec<InfoItem>, incoming: &[TourInfo], choice: InfoChoice) -> bool {
    if incoming.is_empty() {
        return false;
    }
    match choice {
        InfoChoice::Current => false,
        InfoChoice::Incoming => {
            *items = incoming.iter().map(|i| InfoItem::new(&i.title, &i.content, "")).collect();
            true
        }
        InfoChoice::Merge => {
            let fresh: Vec<InfoItem> = incoming
                .iter()
                .filter(|inc| !items.iter().any(|cur| cur.title == inc.title && cur.content == inc.content))
                .map(|i| InfoItem::new(&i.title, &i.content, ""))
                .collect();
            let changed = !fresh.is_empty();
            items.extend(fresh);
            changed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(items: &[InfoItem]) -> Vec<(&str, &str)> {
        items.iter().map(|i| (i.title.as_str(), i.content.as_str())).collect()
    }

    #[test]
    fn merge_skips_known_pairs() {
        let mut items = vec![InfoItem::new("Hours", "9-18", "keep")];
        let incoming = [TourInfo::new("Hours", "9-18"), TourInfo::new("Hours", "10-17"), TourInfo::new("Fee", "free")];
        assert!(apply_info(&mut items, &incoming, InfoChoice::Merge));
        assert_eq!(rows(&items), vec![("Hours", "9-18"), ("Hours", "10-17"), ("Fee", "free")]);
        assert_eq!(items[0].note, "keep");
        assert!(!apply_info(&mut items, &incoming, InfoChoice::Merge));
    }

    #[test]
    fn incoming_replaces_and_empty_is_ignored() {
        let mut items = vec![InfoItem::new("Hours", "9-18", "n")];
        assert!(!apply_info(&mut items, &[], InfoChoice::Incoming));
        assert_eq!(items.len(), 1);

        assert!(apply_info(&mut items, &[TourInfo::new("Fee", "free")], InfoChoice::Incoming));
        assert_eq!(rows(&items), vec![("Fee", "free")]);
        assert_eq!(items[0].note, "");

        assert!(!apply_info(&mut items, &[TourInfo::new("x", "y")], InfoChoice::Current));
    }
}
