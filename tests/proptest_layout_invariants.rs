//! Property-based invariant tests for the layout engine.
//!
//! 1. No sequence of inserts, moves and deletes leaves an empty column or an
//!    empty row group
//! 2. Item counts change by exactly one per insert / delete and never on a move
//! 3. Adjusted ratios stay inside [0.1, 4.0] on the 0.1 grid
//! 4. Undoing every committed edit restores the starting layout

use proptest::prelude::*;
use tourfe::components::drag::DropZone;
use tourfe::components::pool::{ImagePool, PoolImage};
use tourfe::ops::adjust::adjust_ratio;
use tourfe::ops::grid_ops;
use tourfe::probe::KnownImages;
use tourfe::settings::EditorSettings;
use tourfe::{Document, DropPosition, DropTarget, GridItem, ImageDimensions, ItemCoords, LayoutTree, Project};

// ── Strategies ──────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
enum Op {
    Insert(DropTarget),
    Move(ItemCoords, DropTarget),
    Delete(ItemCoords),
}

fn target_strategy() -> impl Strategy<Value = DropTarget> {
    (0usize..DropPosition::ALL.len(), 0usize..4, 0usize..4, 0usize..4)
        .prop_map(|(p, g, c, i)| DropTarget::new(DropPosition::ALL[p], g, c, Some(i)))
}

fn coords_strategy() -> impl Strategy<Value = ItemCoords> {
    (0usize..4, 0usize..4, 0usize..4).prop_map(|(g, c, i)| ItemCoords::new(g, c, i))
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => target_strategy().prop_map(Op::Insert),
        2 => (coords_strategy(), target_strategy()).prop_map(|(f, t)| Op::Move(f, t)),
        1 => coords_strategy().prop_map(Op::Delete),
    ]
}

fn item(n: usize) -> GridItem {
    GridItem::new(format!("img{}", n), ImageDimensions::new(100, 80), "")
}

// ═══════════════════════════════════════════════════════════════════════
// 1 + 2. Structural invariants under arbitrary edit sequences
// ═══════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn edits_never_leave_empty_containers(ops in prop::collection::vec(op_strategy(), 1..60)) {
        let mut tree = LayoutTree::new();
        for (n, op) in ops.into_iter().enumerate() {
            let before = tree.item_count();
            match op {
                Op::Insert(target) => {
                    if let Some(next) = grid_ops::insert(&tree, target, item(n)) {
                        prop_assert_eq!(next.item_count(), before + 1);
                        tree = next;
                    }
                }
                Op::Move(from, target) => {
                    if let Some(next) = grid_ops::move_item(&tree, from, target, None) {
                        prop_assert_eq!(next.item_count(), before);
                        tree = next;
                    }
                }
                Op::Delete(coords) => {
                    if let Some(next) = grid_ops::delete_item(&tree, coords) {
                        prop_assert_eq!(next.item_count(), before - 1);
                        tree = next;
                    }
                }
            }
            prop_assert!(tree.validate().is_ok(), "invalid tree: {:?}", tree);
        }
    }

    #[test]
    fn moved_item_keeps_its_payload(ops in prop::collection::vec(target_strategy(), 1..30)) {
        let mut tree = LayoutTree::new();
        for (n, target) in ops.iter().enumerate() {
            if let Some(next) = grid_ops::insert(&tree, *target, item(n)) {
                tree = next;
            }
        }
        let Some((from, moved)) = tree.iter_items().next().map(|(c, _, i)| (c, i.clone())) else {
            return Ok(());
        };
        if let Some(next) = grid_ops::move_item(&tree, from, DropTarget::new_group(), Some(moved.id)) {
            let last = next.groups.last().unwrap();
            prop_assert_eq!(&last.columns[0].items[0].src, &moved.src);
            prop_assert_ne!(last.columns[0].items[0].id, moved.id);
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════
// 3. Ratio bounds
// ═══════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn ratios_stay_on_grid(start in -10.0f64..10.0, deltas in prop::collection::vec(-5.0f64..5.0, 1..40)) {
        let mut value = start;
        for delta in deltas {
            value = adjust_ratio(value, delta);
            prop_assert!((0.1..=4.0).contains(&value), "out of range: {}", value);
            let tenths = value * 10.0;
            prop_assert!((tenths - tenths.round()).abs() < 1e-9, "off grid: {}", value);
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════
// 4. Full undo through the editing session
// ═══════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn undoing_everything_restores_start(targets in prop::collection::vec(target_strategy(), 1..25)) {
        let settings = EditorSettings { max_undo_steps: 100, ..EditorSettings::default() };
        let mut pool = ImagePool::new();
        let id = pool.add(PoolImage::new("p.png", ImageDimensions::new(10, 10)));
        let mut project = Project::from_parts(Document::new(), pool, &settings);
        let probe = KnownImages::new().with("p.png", 10, 10);

        let start = project.layout().clone();
        let mut committed = 0;
        for target in targets {
            project.start_drag_from_pool(id);
            project.hover(target);
            let zone = if target.position == DropPosition::NewGroup { DropZone::EmptyCanvas } else { DropZone::Target };
            if project.drop_on(zone, &probe) == tourfe::DropOutcome::Applied {
                committed += 1;
            }
            prop_assert!(project.layout().validate().is_ok());
        }
        prop_assert_eq!(project.history().undo_count(), committed);
        while project.undo() {}
        prop_assert_eq!(project.layout(), &start);
    }
}
