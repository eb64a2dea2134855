use egui::{Pos2, Rect};

use super::types::ItemId;

/// One visible row of the tree, in content coordinates (`0.0` is the top of the scrolled content).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TreeRow {
    pub item_id: ItemId,
    pub top: f32,
    pub bottom: f32,
    pub depth: i32,
}

/// Live snapshot of a window's tree surface, taken by the host before each update.
#[derive(Clone, Debug, PartialEq)]
pub struct TreeLayout {
    /// The scrollable container, in window coordinates.
    pub container: Rect,

    /// How far the content is scrolled down, in points.
    pub scroll_offset: f32,

    /// Horizontal distance between two depth levels.
    pub indent_width: f32,

    /// Visible rows in visual order.
    pub rows: Vec<TreeRow>,
}

impl TreeLayout {
    /// Convert a window-space pointer into content space.
    pub fn to_content(&self, pointer: Pos2) -> Pos2 {
        Pos2::new(
            pointer.x,
            pointer.y - self.container.top() + self.scroll_offset,
        )
    }

    pub fn row(&self, item_id: ItemId) -> Option<&TreeRow> {
        self.rows.iter().find(|row| row.item_id == item_id)
    }
}

/// One member of the pinned strip, in window coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StripSlot {
    pub item_id: ItemId,
    pub left: f32,
    pub right: f32,
    pub index: usize,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct StripLayout {
    pub slots: Vec<StripSlot>,
}

impl StripLayout {
    pub fn index_of(&self, item_id: ItemId) -> Option<usize> {
        self.slots
            .iter()
            .find(|slot| slot.item_id == item_id)
            .map(|slot| slot.index)
    }
}

/// Which surface a drag is happening over.
#[derive(Clone, Copy, Debug)]
pub enum DropSurface<'a> {
    Tree(&'a TreeLayout),
    Strip(&'a StripLayout),
}

impl DropSurface<'_> {
    pub fn axis(&self) -> DragAxis {
        match self {
            Self::Tree(_) => DragAxis::Vertical,
            Self::Strip(_) => DragAxis::Horizontal,
        }
    }
}

/// Determines how pointer travel is measured before a press becomes a drag.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DragAxis {
    /// Tree: Euclidean distance.
    Vertical,
    /// Strip: horizontal distance only, so vertical jitter is ignored.
    Horizontal,
}

impl DragAxis {
    pub fn travel(self, from: Pos2, to: Pos2) -> f32 {
        match self {
            Self::Vertical => from.distance(to),
            Self::Horizontal => (to.x - from.x).abs(),
        }
    }
}

/// Resolved insertion point for the current pointer position.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DropTarget {
    #[default]
    None,

    /// Tree gap: insert under `parent` (`None` = top level) at `insert_index` among its children,
    /// with the dragged item already removed from the sibling list.
    Gap {
        insert_index: usize,
        depth: i32,
        parent: Option<ItemId>,
    },

    /// Strip gap: insert at `insert_index`, with the dragged item already removed.
    HorizontalGap { insert_index: usize },
}

impl DropTarget {
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }
}
