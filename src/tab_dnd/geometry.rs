//! Depth and range math for tree drops. No state, no layout access.

/// The depths a dragged item may take in one gap of the tree.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DepthRange {
    pub min_depth: i32,
    pub max_depth: i32,
}

impl DepthRange {
    pub fn clamp(self, depth: i32) -> i32 {
        depth.clamp(self.min_depth, self.max_depth)
    }

    pub fn contains(self, depth: i32) -> bool {
        self.min_depth <= depth && depth <= self.max_depth
    }
}

/// Allowed depths for a gap between the item above (if any) and the item below (if any).
///
/// The dragged item may become a child of the item above, so it can go one level deeper than
/// it. It may not be shallower than the item below, or that item would lose its parent.
pub fn calculate_depth_range(above_depth: Option<i32>, below_depth: Option<i32>) -> DepthRange {
    let max_depth = above_depth.unwrap_or(-1).saturating_add(1);
    let mut min_depth = below_depth.unwrap_or(0);
    if min_depth > max_depth {
        min_depth = max_depth;
    }
    DepthRange {
        min_depth,
        max_depth,
    }
}

/// Depth selected by the pointer's horizontal offset into the container, one level per indent.
///
/// Always in `[0, max_depth]`, and `0` when there is no usable indent or ceiling.
pub fn calculate_target_depth(
    pointer_x: f32,
    container_left_x: f32,
    indent_width: f32,
    max_depth: i32,
) -> i32 {
    if indent_width.is_nan() || indent_width <= 0.0 || max_depth < 0 {
        return 0;
    }
    if !pointer_x.is_finite() || !container_left_x.is_finite() || pointer_x < container_left_x {
        return 0;
    }

    let levels = ((pointer_x - container_left_x) / indent_width).floor();
    if levels >= max_depth as f32 {
        max_depth
    } else {
        (levels as i32).clamp(0, max_depth)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_neighbourhood_is_root_only() {
        assert_eq!(
            calculate_depth_range(None, None),
            DepthRange {
                min_depth: 0,
                max_depth: 0
            }
        );
    }

    #[test]
    fn child_above_and_nothing_below() {
        // Gap right after a depth-1 child at the end of the list.
        assert_eq!(
            calculate_depth_range(Some(1), None),
            DepthRange {
                min_depth: 0,
                max_depth: 2
            }
        );
    }

    #[test]
    fn item_below_sets_the_floor() {
        assert_eq!(
            calculate_depth_range(Some(2), Some(2)),
            DepthRange {
                min_depth: 2,
                max_depth: 3
            }
        );
    }

    #[test]
    fn degenerate_range_collapses_to_max() {
        // Cannot come from a well-formed tree, but must stay ordered.
        let range = calculate_depth_range(Some(0), Some(4));
        assert_eq!(range.min_depth, 1);
        assert_eq!(range.max_depth, 1);
    }

    #[test]
    fn depth_range_is_always_ordered() {
        let depths = [None, Some(-3), Some(-1), Some(0), Some(1), Some(2), Some(7)];
        for above in depths {
            for below in depths {
                let range = calculate_depth_range(above, below);
                assert!(
                    range.min_depth <= range.max_depth,
                    "above={above:?} below={below:?} gave {range:?}"
                );
            }
        }
    }

    #[test]
    fn target_depth_zero_without_indent_or_ceiling() {
        assert_eq!(calculate_target_depth(500.0, 0.0, 0.0, 5), 0);
        assert_eq!(calculate_target_depth(500.0, 0.0, -4.0, 5), 0);
        assert_eq!(calculate_target_depth(500.0, 0.0, 16.0, -1), 0);
        assert_eq!(calculate_target_depth(500.0, 0.0, f32::NAN, 5), 0);
    }

    #[test]
    fn target_depth_zero_left_of_container() {
        assert_eq!(calculate_target_depth(9.0, 10.0, 16.0, 3), 0);
    }

    #[test]
    fn target_depth_steps_per_indent() {
        assert_eq!(calculate_target_depth(10.0, 10.0, 16.0, 3), 0);
        assert_eq!(calculate_target_depth(25.9, 10.0, 16.0, 3), 0);
        assert_eq!(calculate_target_depth(26.0, 10.0, 16.0, 3), 1);
        assert_eq!(calculate_target_depth(42.0, 10.0, 16.0, 3), 2);
        assert_eq!(calculate_target_depth(1_000.0, 10.0, 16.0, 3), 3);
    }

    #[test]
    fn target_depth_is_monotonic_and_bounded() {
        for max_depth in [0, 1, 4] {
            let mut previous = 0;
            for step in 0..400 {
                let x = -50.0 + step as f32 * 0.75;
                let depth = calculate_target_depth(x, 0.0, 12.0, max_depth);
                assert!(depth >= previous, "not monotonic at x={x}");
                assert!((0..=max_depth).contains(&depth), "out of range at x={x}");
                previous = depth;
            }
        }
    }
}
