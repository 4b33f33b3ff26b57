use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Where a dropped image lands relative to the hovered zone.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DropPosition {
    /// Append a brand-new row group at the end (empty canvas).
    NewGroup,
    NewGroupAbove,
    NewGroupBelow,
    NewColLeft,
    NewColRight,
    StackAbove,
    StackBelow,
}

impl DropPosition {
    pub const ALL: [DropPosition; 7] = [
        DropPosition::NewGroup,
        DropPosition::NewGroupAbove,
        DropPosition::NewGroupBelow,
        DropPosition::NewColLeft,
        DropPosition::NewColRight,
        DropPosition::StackAbove,
        DropPosition::StackBelow,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            DropPosition::NewGroup => "new-group",
            DropPosition::NewGroupAbove => "new-group-above",
            DropPosition::NewGroupBelow => "new-group-below",
            DropPosition::NewColLeft => "new-col-left",
            DropPosition::NewColRight => "new-col-right",
            DropPosition::StackAbove => "stack-above",
            DropPosition::StackBelow => "stack-below",
        }
    }

    /// Stack modes insert inside an existing column and need an item index.
    pub fn is_stack(self) -> bool {
        matches!(self, DropPosition::StackAbove | DropPosition::StackBelow)
    }
}

impl fmt::Display for DropPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DropPosition {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DropPosition::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| format!("unknown drop position '{}'", s))
    }
}

/// Candidate insertion point: the full input of the mutation engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DropTarget {
    pub position: DropPosition,
    pub group_index: usize,
    pub col_index: usize,
    /// Only read by the stack modes.
    pub item_index: Option<usize>,
}

impl DropTarget {
    pub fn new(position: DropPosition, group_index: usize, col_index: usize, item_index: Option<usize>) -> Self {
        Self {
            position,
            group_index,
            col_index,
            item_index: if position.is_stack() { item_index } else { None },
        }
    }

    pub fn new_group() -> Self {
        Self::new(DropPosition::NewGroup, 0, 0, None)
    }

    pub fn group(position: DropPosition, group_index: usize) -> Self {
        Self::new(position, group_index, 0, None)
    }

    pub fn column(position: DropPosition, group_index: usize, col_index: usize) -> Self {
        Self::new(position, group_index, col_index, None)
    }

    pub fn stack(position: DropPosition, group_index: usize, col_index: usize, item_index: usize) -> Self {
        Self::new(position, group_index, col_index, Some(item_index))
    }
}

/// Holds the single hovered drop target of a drag gesture. Setting a new
/// target replaces the previous one; there is never more than one.
#[derive(Debug, Default, Clone)]
pub struct DropTargetTracker {
    current: Option<DropTarget>,
}

impl DropTargetTracker {
    pub fn hover(&mut self, target: DropTarget) {
        self.current = Some(target);
    }

    pub fn leave(&mut self) {
        self.current = None;
    }

    pub fn current(&self) -> Option<DropTarget> {
        self.current
    }

    pub fn take(&mut self) -> Option<DropTarget> {
        self.current.take()
    }

    /// Whether the zone described by the arguments is the highlighted one.
    pub fn is_highlighted(
        &self,
        group_index: usize,
        col_index: usize,
        position: DropPosition,
        item_index: Option<usize>,
    ) -> bool {
        self.current
            .is_some_and(|t| t == DropTarget::new(position, group_index, col_index, item_index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_round_trip_through_strings() {
        for p in DropPosition::ALL {
            assert_eq!(p.as_str().parse::<DropPosition>(), Ok(p));
        }
        assert!("sideways".parse::<DropPosition>().is_err());
    }

    #[test]
    fn item_index_is_dropped_for_non_stack_modes() {
        let t = DropTarget::new(DropPosition::NewColLeft, 1, 2, Some(5));
        assert_eq!(t.item_index, None);
        let s = DropTarget::new(DropPosition::StackBelow, 1, 2, Some(5));
        assert_eq!(s.item_index, Some(5));
    }

    #[test]
    fn last_hover_wins() {
        let mut tracker = DropTargetTracker::default();
        tracker.hover(DropTarget::group(DropPosition::NewGroupAbove, 0));
        tracker.hover(DropTarget::stack(DropPosition::StackAbove, 1, 0, 2));
        assert_eq!(tracker.current(), Some(DropTarget::stack(DropPosition::StackAbove, 1, 0, 2)));
        assert!(tracker.is_highlighted(1, 0, DropPosition::StackAbove, Some(2)));
        assert!(!tracker.is_highlighted(0, 0, DropPosition::NewGroupAbove, None));

        tracker.leave();
        assert_eq!(tracker.current(), None);
    }
}
