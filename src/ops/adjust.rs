// ============================================================================
// RATIO ADJUSTMENTS: column width ratio and item flex
// ============================================================================

use crate::layout::{DEFAULT_RATIO, ItemCoords, LayoutTree, MAX_RATIO, MIN_RATIO};

/// Add `delta` to `current`, clamp into [0.1, 4.0] and round to one decimal.
/// A missing (non-finite or non-positive) current value counts as 1.0.
pub fn adjust_ratio(current: f64, delta: f64) -> f64 {
    let base = if current.is_finite() && current > 0.0 { current } else { DEFAULT_RATIO };
    let raw = base + if delta.is_finite() { delta } else { 0.0 };
    quantize(raw.clamp(MIN_RATIO, MAX_RATIO))
}

/// Bring an arbitrary imported ratio into range without applying a delta.
pub fn sanitize_ratio(value: f64) -> f64 {
    adjust_ratio(value, 0.0)
}

fn quantize(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Tree with the column's width ratio adjusted, or `None` if the column does
/// not exist.
pub fn with_width_ratio(tree: &LayoutTree, group: usize, col: usize, delta: f64) -> Option<LayoutTree> {
    tree.column_at(group, col)?;
    let mut next = tree.clone();
    let column = &mut next.groups[group].columns[col];
    column.width_ratio = adjust_ratio(column.width_ratio, delta);
    Some(next)
}

/// Tree with the item's flex adjusted, or `None` if the item does not exist.
pub fn with_flex(tree: &LayoutTree, coords: ItemCoords, delta: f64) -> Option<LayoutTree> {
    tree.item_at(coords)?;
    let mut next = tree.clone();
    let item = &mut next.groups[coords.group].columns[coords.col].items[coords.item];
    item.flex = adjust_ratio(item.flex, delta);
    Some(next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{GridItem, ImageDimensions, RowGroup};

    #[test]
    fn clamps_extremes() {
        assert_eq!(adjust_ratio(1.0, -100.0), 0.1);
        assert_eq!(adjust_ratio(1.0, 100.0), 4.0);
    }

    #[test]
    fn steps_are_quantized() {
        let mut v = 1.0;
        for _ in 0..7 {
            v = adjust_ratio(v, 0.1);
        }
        assert_eq!(v, 1.7);
        assert_eq!(adjust_ratio(1.0, 0.25), 1.3);
    }

    #[test]
    fn unset_value_defaults_to_one() {
        assert_eq!(adjust_ratio(0.0, 0.1), 1.1);
        assert_eq!(adjust_ratio(f64::NAN, -0.2), 0.8);
        assert_eq!(sanitize_ratio(9.0), 4.0);
    }

    #[test]
    fn missing_targets_yield_none() {
        let tree = LayoutTree::from_groups(vec![RowGroup::with_item(GridItem::new(
            "a",
            ImageDimensions::new(1, 1),
            "",
        ))]);
        assert!(with_width_ratio(&tree, 0, 1, 0.1).is_none());
        assert!(with_flex(&tree, ItemCoords::new(1, 0, 0), 0.1).is_none());

        let wider = with_width_ratio(&tree, 0, 0, 0.5).unwrap();
        assert_eq!(wider.groups[0].columns[0].width_ratio, 1.5);
        let taller = with_flex(&tree, ItemCoords::new(0, 0, 0), -0.3).unwrap();
        assert_eq!(taller.groups[0].columns[0].items[0].flex, 0.7);
    }
}
