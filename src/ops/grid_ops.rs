// ============================================================================
// GRID OPERATIONS: insert / delete / move images in the layout tree
// ============================================================================
//
// Every function takes the committed tree by reference and returns a new
// tree. Empty columns and empty row groups are pruned as part of the same
// operation, so no caller ever sees an empty container.

use crate::components::drop_target::{DropPosition, DropTarget};
use crate::layout::{Column, ElementId, GridItem, ItemCoords, LayoutTree, RowGroup};

/// A drop target resolved to a concrete insertion slot. Indices are
/// insertion boundaries: `GroupAt(0)` inserts before the first group,
/// `GroupAt(len)` appends.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Placement {
    AppendGroup,
    GroupAt(usize),
    ColumnAt { group: usize, index: usize },
    ItemAt { group: usize, col: usize, index: usize },
}

/// Result of removing one item.
#[derive(Clone, Debug)]
pub struct Removal {
    pub tree: LayoutTree,
    pub item: GridItem,
    /// The item's column became empty and was removed.
    pub column_pruned: bool,
    /// The column's row group became empty and was removed too.
    pub group_pruned: bool,
}

/// Check `target` against `tree` and turn it into an insertion slot.
/// Returns `None` when the target references a group, column or item that
/// does not exist, or when a stack mode carries no item index.
pub fn resolve(tree: &LayoutTree, target: DropTarget) -> Option<Placement> {
    let g = target.group_index;
    let c = target.col_index;
    let exists = match target.position {
        DropPosition::NewGroup => true,
        DropPosition::NewGroupAbove | DropPosition::NewGroupBelow => g < tree.groups.len(),
        DropPosition::NewColLeft | DropPosition::NewColRight => {
            tree.groups.get(g).is_some_and(|group| c < group.columns.len())
        }
        DropPosition::StackAbove | DropPosition::StackBelow => {
            let i = target.item_index?;
            tree.column_at(g, c).is_some_and(|column| i < column.items.len())
        }
    };
    if exists { slot(target) } else { None }
}

/// The insertion slot a target names, before any check against a tree.
fn slot(target: DropTarget) -> Option<Placement> {
    let g = target.group_index;
    let c = target.col_index;
    Some(match target.position {
        DropPosition::NewGroup => Placement::AppendGroup,
        DropPosition::NewGroupAbove => Placement::GroupAt(g),
        DropPosition::NewGroupBelow => Placement::GroupAt(g + 1),
        DropPosition::NewColLeft => Placement::ColumnAt { group: g, index: c },
        DropPosition::NewColRight => Placement::ColumnAt { group: g, index: c + 1 },
        DropPosition::StackAbove => Placement::ItemAt {
            group: g,
            col: c,
            index: target.item_index?,
        },
        DropPosition::StackBelow => Placement::ItemAt {
            group: g,
            col: c,
            index: target.item_index? + 1,
        },
    })
}

/// Insert `item` at `target`. The item always receives a fresh id.
pub fn insert(tree: &LayoutTree, target: DropTarget, item: GridItem) -> Option<LayoutTree> {
    let placement = resolve(tree, target)?;
    let mut next = tree.clone();
    place(&mut next, placement, item).then_some(next)
}

/// Append a new row group holding only `item`.
pub fn append_group(tree: &LayoutTree, item: GridItem) -> LayoutTree {
    let mut next = tree.clone();
    place(&mut next, Placement::AppendGroup, item);
    next
}

/// Remove the item at `coords`, pruning its column and row group if they
/// become empty. `None` when nothing lives at `coords`.
pub fn remove_from_source(tree: &LayoutTree, coords: ItemCoords) -> Option<Removal> {
    tree.item_at(coords)?;

    let mut next = tree.clone();
    let group = &mut next.groups[coords.group];
    let column = &mut group.columns[coords.col];
    let item = column.items.remove(coords.item);

    let column_pruned = column.items.is_empty();
    if column_pruned {
        group.columns.remove(coords.col);
    }
    let group_pruned = group.columns.is_empty();
    if group_pruned {
        next.groups.remove(coords.group);
    }

    Some(Removal {
        tree: next,
        item,
        column_pruned,
        group_pruned,
    })
}

/// Delete the item at `coords` with the usual column / group cascade.
pub fn delete_item(tree: &LayoutTree, coords: ItemCoords) -> Option<LayoutTree> {
    remove_from_source(tree, coords).map(|r| r.tree)
}

/// Move the item at `from` to `target`, where `target` was computed against
/// `tree` (the pre-removal layout). The removal runs first; the target's
/// indices are then corrected for a pruned group or column and applied to
/// the post-removal tree.
///
/// When `expected` is given, the item at `from` must still carry that id,
/// otherwise the move is refused (the drag started on a different tree).
pub fn move_item(
    tree: &LayoutTree,
    from: ItemCoords,
    target: DropTarget,
    expected: Option<ElementId>,
) -> Option<LayoutTree> {
    move_item_with(tree, from, target, expected, |_| {})
}

/// [`move_item`] with a hook that may reshape the item between removal and
/// insertion (the empty-canvas drop resets flex this way).
pub fn move_item_with(
    tree: &LayoutTree,
    from: ItemCoords,
    target: DropTarget,
    expected: Option<ElementId>,
    reshape: impl FnOnce(&mut GridItem),
) -> Option<LayoutTree> {
    if let Some(id) = expected {
        if tree.item_at(from)?.id != id {
            return None;
        }
    }

    resolve(tree, target)?;
    let removal = remove_from_source(tree, from)?;
    let target = adjust_for_removal(target, from, &removal);
    let placement = slot(target)?;
    let Removal { tree: mut next, mut item, .. } = removal;
    reshape(&mut item);

    place(&mut next, placement, item).then_some(next)
}

/// Re-index a pre-removal target for the post-removal tree.
///
/// If the source group was pruned, targets in later groups move up by one.
/// Otherwise, if only the source column was pruned, targets in later columns
/// of the same group move left by one. Item indices are never corrected.
pub fn adjust_for_removal(target: DropTarget, from: ItemCoords, removal: &Removal) -> DropTarget {
    let mut target = target;
    if removal.group_pruned {
        if target.group_index > from.group {
            target.group_index -= 1;
        }
    } else if removal.column_pruned && target.group_index == from.group && target.col_index > from.col {
        target.col_index -= 1;
    }
    target
}

/// Insert `item` at `placement`. The group (and column for stacks) must
/// exist; insertion indices past the end append.
fn place(tree: &mut LayoutTree, placement: Placement, item: GridItem) -> bool {
    let item = GridItem {
        id: ElementId::new(),
        ..item
    };
    match placement {
        Placement::AppendGroup => {
            tree.groups.push(RowGroup::with_item(item));
            true
        }
        Placement::GroupAt(index) => {
            let index = index.min(tree.groups.len());
            tree.groups.insert(index, RowGroup::with_item(item));
            true
        }
        Placement::ColumnAt { group, index } => {
            let Some(row) = tree.groups.get_mut(group) else { return false };
            let index = index.min(row.columns.len());
            row.columns.insert(index, Column::with_item(item));
            true
        }
        Placement::ItemAt { group, col, index } => {
            let Some(column) = tree.groups.get_mut(group).and_then(|g| g.columns.get_mut(col)) else {
                return false;
            };
            let index = index.min(column.items.len());
            column.items.insert(index, item);
            true
        }
    }
}
