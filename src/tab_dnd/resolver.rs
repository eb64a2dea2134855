use ahash::HashSet;
use egui::Pos2;
use itertools::Itertools as _;

use super::geometry::{calculate_depth_range, calculate_target_depth};
use super::layout::{DropTarget, StripLayout, TreeLayout, TreeRow};
use super::types::{ItemId, SubtreeLookup};

/// Candidate insertion boundaries along one axis: leading edge, midpoints between neighbours,
/// trailing edge. `spans` must be in visual order.
fn boundaries(spans: impl Iterator<Item = (f32, f32)> + Clone) -> Vec<f32> {
    let mut out = Vec::new();
    if let Some((start, _)) = spans.clone().next() {
        out.push(start);
    }
    out.extend(
        spans
            .clone()
            .tuple_windows()
            .map(|((_, prev_end), (next_start, _))| 0.5 * (prev_end + next_start)),
    );
    if let Some((_, end)) = spans.last() {
        out.push(end);
    }
    out
}

fn nearest_boundary(boundaries: &[f32], pos: f32) -> Option<usize> {
    boundaries
        .iter()
        .position_min_by(|a, b| (*a - pos).abs().total_cmp(&(*b - pos).abs()))
}

/// Resolve the tree gap under `pointer`.
///
/// The dragged item and (when `lookup` is given) its whole subtree are removed from the
/// candidate rows first, so the result never places an item inside itself and its
/// `insert_index` is already a post-removal index.
pub fn resolve_tree_target(
    layout: &TreeLayout,
    pointer: Pos2,
    dragged: Option<ItemId>,
    lookup: Option<&dyn SubtreeLookup>,
) -> DropTarget {
    let mut excluded: HashSet<ItemId> = HashSet::default();
    if let Some(dragged) = dragged {
        excluded.insert(dragged);
        if let Some(lookup) = lookup {
            excluded.extend(lookup.descendants(dragged));
        }
    }

    let mut rows: Vec<TreeRow> = layout
        .rows
        .iter()
        .filter(|row| !excluded.contains(&row.item_id))
        .copied()
        .collect();
    rows.sort_by(|a, b| a.top.total_cmp(&b.top));

    let pointer_content = layout.to_content(pointer);
    let gaps = boundaries(rows.iter().map(|row| (row.top, row.bottom)));
    let Some(gap) = nearest_boundary(&gaps, pointer_content.y) else {
        return DropTarget::None;
    };

    let above = gap.checked_sub(1).map(|i| rows[i].depth);
    let below = rows.get(gap).map(|row| row.depth);
    let range = calculate_depth_range(above, below);

    let depth = range.clamp(calculate_target_depth(
        pointer.x,
        layout.container.left(),
        layout.indent_width,
        range.max_depth,
    ));

    let before = &rows[..gap];
    let parent_pos = before.iter().rposition(|row| row.depth == depth - 1);
    let parent = parent_pos.map(|i| before[i].item_id);
    let siblings_start = parent_pos.map_or(0, |i| i + 1);
    let insert_index = before[siblings_start..]
        .iter()
        .filter(|row| row.depth == depth)
        .count();

    DropTarget::Gap {
        insert_index,
        depth,
        parent,
    }
}

/// Resolve the strip gap under `pointer_x`.
///
/// If `dragged` sits in the strip before the raw gap, the index is shifted down by one to
/// account for its removal.
pub fn resolve_strip_target(
    layout: &StripLayout,
    pointer_x: f32,
    dragged: Option<ItemId>,
) -> DropTarget {
    let slots = layout
        .slots
        .iter()
        .sorted_by_key(|slot| slot.index)
        .collect_vec();

    let edges = boundaries(slots.iter().map(|slot| (slot.left, slot.right)));
    let raw = nearest_boundary(&edges, pointer_x).unwrap_or(0);

    let original = dragged.and_then(|item| layout.index_of(item));
    let insert_index = match original {
        Some(original) if original < raw => raw - 1,
        _ => raw,
    };

    DropTarget::HorizontalGap { insert_index }
}

#[cfg(test)]
mod tests {
    use egui::Rect;

    use super::super::layout::StripSlot;
    use super::super::types::TreeSnapshot;
    use super::*;

    const ROW: f32 = 20.0;
    const INDENT: f32 = 16.0;

    fn tree_layout(depths: &[(u64, i32)]) -> TreeLayout {
        TreeLayout {
            container: Rect::from_min_max(Pos2::new(0.0, 0.0), Pos2::new(300.0, 400.0)),
            scroll_offset: 0.0,
            indent_width: INDENT,
            rows: depths
                .iter()
                .enumerate()
                .map(|(i, &(id, depth))| TreeRow {
                    item_id: ItemId(id),
                    top: i as f32 * ROW,
                    bottom: (i + 1) as f32 * ROW,
                    depth,
                })
                .collect(),
        }
    }

    /// Parent links for the test trees, by item id.
    struct Parents(Vec<(u64, u64)>);

    impl SubtreeLookup for Parents {
        fn descendants(&self, item: ItemId) -> Vec<ItemId> {
            let mut out = Vec::new();
            let mut stack = vec![item.0];
            while let Some(id) = stack.pop() {
                for &(child, parent) in &self.0 {
                    if parent == id {
                        out.push(ItemId(child));
                        stack.push(child);
                    }
                }
            }
            out
        }

        fn snapshot(&self, _item: ItemId) -> Option<TreeSnapshot> {
            None
        }
    }

    #[test]
    fn empty_tree_has_no_gap() {
        let layout = tree_layout(&[]);
        assert_eq!(
            resolve_tree_target(&layout, Pos2::new(10.0, 10.0), None, None),
            DropTarget::None
        );
    }

    #[test]
    fn dragging_the_only_item_has_no_gap() {
        let layout = tree_layout(&[(1, 0)]);
        assert_eq!(
            resolve_tree_target(&layout, Pos2::new(10.0, 10.0), Some(ItemId(1)), None),
            DropTarget::None
        );
    }

    #[test]
    fn top_edge_inserts_first_at_root() {
        let layout = tree_layout(&[(1, 0), (2, 0), (3, 0)]);
        let target = resolve_tree_target(&layout, Pos2::new(200.0, 2.0), Some(ItemId(9)), None);
        assert_eq!(
            target,
            DropTarget::Gap {
                insert_index: 0,
                depth: 0,
                parent: None
            }
        );
    }

    #[test]
    fn indent_nests_under_item_above() {
        // a(0) b(0) c(0); pointer between b and c, one indent in.
        let layout = tree_layout(&[(1, 0), (2, 0), (3, 0)]);
        let pointer = Pos2::new(20.0, 2.0 * ROW);
        let target = resolve_tree_target(&layout, pointer, Some(ItemId(9)), None);
        assert_eq!(
            target,
            DropTarget::Gap {
                insert_index: 0,
                depth: 1,
                parent: Some(ItemId(2))
            }
        );
    }

    #[test]
    fn depth_is_lifted_to_item_below() {
        // a(0) b(1) c(1); gap between b and c must stay at depth >= 1.
        let layout = tree_layout(&[(1, 0), (2, 1), (3, 1)]);
        let target = resolve_tree_target(&layout, Pos2::new(0.0, 2.0 * ROW), Some(ItemId(9)), None);
        assert_eq!(
            target,
            DropTarget::Gap {
                insert_index: 1,
                depth: 1,
                parent: Some(ItemId(1))
            }
        );
    }

    #[test]
    fn bottom_gap_after_child_allows_root_to_grandchild() {
        // a(0) b(1); gap after b: depths 0..=2.
        let layout = tree_layout(&[(1, 0), (2, 1)]);
        let pointer_y = 2.0 * ROW + 5.0;

        let shallow =
            resolve_tree_target(&layout, Pos2::new(0.0, pointer_y), Some(ItemId(9)), None);
        assert_eq!(
            shallow,
            DropTarget::Gap {
                insert_index: 1,
                depth: 0,
                parent: None
            }
        );

        let deep = resolve_tree_target(&layout, Pos2::new(250.0, pointer_y), Some(ItemId(9)), None);
        assert_eq!(
            deep,
            DropTarget::Gap {
                insert_index: 0,
                depth: 2,
                parent: Some(ItemId(2))
            }
        );
    }

    #[test]
    fn scroll_offset_shifts_the_gap() {
        let mut layout = tree_layout(&[(1, 0), (2, 0), (3, 0), (4, 0)]);
        layout.scroll_offset = 2.0 * ROW;
        // Visually at the top of the container, which is the boundary above item 3.
        let target = resolve_tree_target(&layout, Pos2::new(0.0, 1.0), Some(ItemId(9)), None);
        assert_eq!(
            target,
            DropTarget::Gap {
                insert_index: 2,
                depth: 0,
                parent: None
            }
        );
    }

    #[test]
    fn own_subtree_is_never_a_target() {
        // x(0) [x1(1) [x2(2)]] y(0)
        let layout = tree_layout(&[(10, 0), (11, 1), (12, 2), (20, 0)]);
        let parents = Parents(vec![(11, 10), (12, 11)]);

        for step in 0..=40 {
            let y = step as f32 * 2.0;
            for x in [0.0, 20.0, 40.0, 80.0] {
                let target =
                    resolve_tree_target(&layout, Pos2::new(x, y), Some(ItemId(10)), Some(&parents));
                let DropTarget::Gap { parent, depth, .. } = target else {
                    panic!("expected a gap at y={y}");
                };
                assert!(
                    !matches!(parent, Some(ItemId(10 | 11 | 12))),
                    "dropped inside own subtree at ({x}, {y}): {target:?}"
                );
                assert!(depth <= 1, "only y remains as a possible parent");
            }
        }
    }

    #[test]
    fn without_lookup_only_the_item_itself_is_excluded() {
        let layout = tree_layout(&[(10, 0), (11, 1), (20, 0)]);
        let target = resolve_tree_target(&layout, Pos2::new(40.0, ROW), Some(ItemId(10)), None);
        assert_eq!(
            target,
            DropTarget::Gap {
                insert_index: 0,
                depth: 0,
                parent: None
            }
        );
    }

    fn strip(n: usize) -> StripLayout {
        StripLayout {
            slots: (0..n)
                .map(|i| StripSlot {
                    item_id: ItemId(i as u64 + 1),
                    left: i as f32 * 40.0,
                    right: i as f32 * 40.0 + 36.0,
                    index: i,
                })
                .collect(),
        }
    }

    #[test]
    fn first_of_three_to_the_end_lands_at_two() {
        let layout = strip(3);
        assert_eq!(
            resolve_strip_target(&layout, 200.0, Some(ItemId(1))),
            DropTarget::HorizontalGap { insert_index: 2 }
        );
    }

    #[test]
    fn moving_left_is_not_shifted() {
        let layout = strip(3);
        assert_eq!(
            resolve_strip_target(&layout, -10.0, Some(ItemId(3))),
            DropTarget::HorizontalGap { insert_index: 0 }
        );
    }

    #[test]
    fn midpoints_split_neighbours() {
        let layout = strip(3);
        // Boundary between slot 0 and 1 sits at 38.
        assert_eq!(
            resolve_strip_target(&layout, 39.0, None),
            DropTarget::HorizontalGap { insert_index: 1 }
        );
        assert_eq!(
            resolve_strip_target(&layout, 39.0, Some(ItemId(3))),
            DropTarget::HorizontalGap { insert_index: 1 }
        );
    }

    #[test]
    fn empty_strip_inserts_at_zero() {
        assert_eq!(
            resolve_strip_target(&StripLayout::default(), 100.0, Some(ItemId(4))),
            DropTarget::HorizontalGap { insert_index: 0 }
        );
    }
}
