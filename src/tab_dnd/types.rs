use serde::{Deserialize, Serialize};

/// Stable identifier of a tree/strip item, independent of its position.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub u64);

/// The host's own identifier for the tab behind an item.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TabId(pub u64);

/// Identifier of one application window taking part in drags.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WindowId(pub u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub u64);

impl std::fmt::Display for ItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "item#{}", self.0)
    }
}

impl std::fmt::Display for WindowId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "window#{}", self.0)
    }
}

/// What a press landed on: the item and the tab it stands for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DragSource {
    pub item_id: ItemId,
    pub tab_id: TabId,
}

/// Serializable copy of a dragged item's subtree.
///
/// Carried in the session so a receiving window can render a placeholder
/// before the authoritative move lands.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeSnapshot {
    pub item_id: ItemId,
    pub tab_id: TabId,
    pub title: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<TreeSnapshot>,
}

impl TreeSnapshot {
    /// Number of items in this snapshot, root included.
    pub fn len(&self) -> usize {
        1 + self.children.iter().map(Self::len).sum::<usize>()
    }

    /// Always `false`: a snapshot has at least its root.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Every item id in pre-order.
    pub fn item_ids(&self) -> Vec<ItemId> {
        let mut out = Vec::with_capacity(self.len());
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            out.push(node.item_id);
            stack.extend(node.children.iter().rev());
        }
        out
    }
}

/// Answers subtree questions about the tree a drag started in.
pub trait SubtreeLookup {
    /// Every descendant of `item` (not including `item` itself).
    fn descendants(&self, item: ItemId) -> Vec<ItemId>;

    /// Snapshot of `item` and its subtree, if `item` exists.
    fn snapshot(&self, item: ItemId) -> Option<TreeSnapshot>;
}
