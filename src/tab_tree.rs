//! An in-memory tab tree with a pinned strip, and a [`HostOps`] host made of one tree per window.
//!
//! Useful for hosts that have no model of their own, and for exercising the drag engine
//! end-to-end without a real window system.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use ahash::HashMap;
use egui::Rect;

use crate::tab_dnd::{
    DragOptions, DropTarget, HostError, HostOps, ItemId, StripLayout, StripSlot, SubtreeLookup,
    TabId, TreeLayout, TreeRow, TreeSnapshot, WindowId,
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TreeEditError {
    UnknownItem(ItemId),
    DuplicateItem(ItemId),
    /// The target would put an item inside its own subtree, or is the wrong kind of gap.
    InvalidTarget(ItemId),
}

impl std::fmt::Display for TreeEditError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownItem(item) => write!(f, "unknown {item}"),
            Self::DuplicateItem(item) => write!(f, "{item} already exists"),
            Self::InvalidTarget(item) => write!(f, "invalid drop target for {item}"),
        }
    }
}

impl std::error::Error for TreeEditError {}

impl From<TreeEditError> for HostError {
    fn from(err: TreeEditError) -> Self {
        Self(err.to_string())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TabNode {
    pub item_id: ItemId,
    pub tab_id: TabId,
    pub title: String,
    pub parent: Option<ItemId>,
    pub children: Vec<ItemId>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PinnedTab {
    pub item_id: ItemId,
    pub tab_id: TabId,
    pub title: String,
}

/// A tree of tabs plus a flat strip of pinned tabs.
#[derive(Clone, Debug, Default)]
pub struct TabTree {
    nodes: HashMap<ItemId, TabNode>,
    roots: Vec<ItemId>,
    pinned: Vec<PinnedTab>,
}

impl TabTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, item: ItemId) -> bool {
        self.nodes.contains_key(&item) || self.pinned_index(item).is_some()
    }

    pub fn node(&self, item: ItemId) -> Option<&TabNode> {
        self.nodes.get(&item)
    }

    /// Children of `parent`, or the top-level items for `None`.
    pub fn children(&self, parent: Option<ItemId>) -> &[ItemId] {
        match parent {
            None => &self.roots,
            Some(parent) => self
                .nodes
                .get(&parent)
                .map_or(&[][..], |node| node.children.as_slice()),
        }
    }

    pub fn pinned(&self) -> &[PinnedTab] {
        &self.pinned
    }

    pub fn pinned_ids(&self) -> Vec<ItemId> {
        self.pinned.iter().map(|tab| tab.item_id).collect()
    }

    fn pinned_index(&self, item: ItemId) -> Option<usize> {
        self.pinned.iter().position(|tab| tab.item_id == item)
    }

    /// Append a new tab under `parent` (top level for `None`).
    pub fn insert(
        &mut self,
        parent: Option<ItemId>,
        item_id: ItemId,
        tab_id: TabId,
        title: impl Into<String>,
    ) -> Result<(), TreeEditError> {
        if self.contains(item_id) {
            return Err(TreeEditError::DuplicateItem(item_id));
        }
        self.siblings_mut(parent)?.push(item_id);
        self.nodes.insert(
            item_id,
            TabNode {
                item_id,
                tab_id,
                title: title.into(),
                parent,
                children: Vec::new(),
            },
        );
        Ok(())
    }

    /// Append a tab to the pinned strip.
    pub fn pin(
        &mut self,
        item_id: ItemId,
        tab_id: TabId,
        title: impl Into<String>,
    ) -> Result<(), TreeEditError> {
        if self.contains(item_id) {
            return Err(TreeEditError::DuplicateItem(item_id));
        }
        self.pinned.push(PinnedTab {
            item_id,
            tab_id,
            title: title.into(),
        });
        Ok(())
    }

    fn siblings_mut(&mut self, parent: Option<ItemId>) -> Result<&mut Vec<ItemId>, TreeEditError> {
        match parent {
            None => Ok(&mut self.roots),
            Some(parent) => self
                .nodes
                .get_mut(&parent)
                .map(|node| &mut node.children)
                .ok_or(TreeEditError::UnknownItem(parent)),
        }
    }

    pub fn depth(&self, item: ItemId) -> Option<i32> {
        let mut node = self.nodes.get(&item)?;
        let mut depth = 0;
        while let Some(parent) = node.parent {
            node = self.nodes.get(&parent)?;
            depth += 1;
        }
        Some(depth)
    }

    /// Tree items in visual (pre-)order, with their depth.
    pub fn visible_items(&self) -> Vec<(ItemId, i32)> {
        let mut out = Vec::with_capacity(self.nodes.len());
        let mut stack: Vec<(ItemId, i32)> = self.roots.iter().rev().map(|&id| (id, 0)).collect();
        while let Some((id, depth)) = stack.pop() {
            out.push((id, depth));
            if let Some(node) = self.nodes.get(&id) {
                stack.extend(node.children.iter().rev().map(|&child| (child, depth + 1)));
            }
        }
        out
    }

    /// Fixed-height rows, one per visible item.
    pub fn tree_layout(&self, container: Rect, options: &DragOptions) -> TreeLayout {
        let row_height = options.row_height.max(1.0);
        TreeLayout {
            container,
            scroll_offset: 0.0,
            indent_width: options.indent_width,
            rows: self
                .visible_items()
                .into_iter()
                .enumerate()
                .map(|(i, (item_id, depth))| TreeRow {
                    item_id,
                    top: i as f32 * row_height,
                    bottom: (i + 1) as f32 * row_height,
                    depth,
                })
                .collect(),
        }
    }

    /// Fixed-width slots, left to right from `left`.
    pub fn strip_layout(&self, left: f32, slot_width: f32, spacing: f32) -> StripLayout {
        StripLayout {
            slots: self
                .pinned
                .iter()
                .enumerate()
                .map(|(index, tab)| {
                    let start = left + index as f32 * (slot_width + spacing);
                    StripSlot {
                        item_id: tab.item_id,
                        left: start,
                        right: start + slot_width,
                        index,
                    }
                })
                .collect(),
        }
    }

    fn is_in_subtree(&self, root: ItemId, candidate: ItemId) -> bool {
        root == candidate || self.descendants(root).contains(&candidate)
    }

    /// Apply a resolved drop for `item`, which must live in this tree.
    pub fn apply_drop(&mut self, item: ItemId, target: DropTarget) -> Result<(), TreeEditError> {
        match target {
            DropTarget::None => Ok(()),

            DropTarget::Gap {
                insert_index,
                parent,
                ..
            } => {
                let old_parent = self
                    .nodes
                    .get(&item)
                    .ok_or(TreeEditError::UnknownItem(item))?
                    .parent;
                if let Some(parent) = parent {
                    if !self.nodes.contains_key(&parent) {
                        return Err(TreeEditError::UnknownItem(parent));
                    }
                    if self.is_in_subtree(item, parent) {
                        return Err(TreeEditError::InvalidTarget(item));
                    }
                }

                self.siblings_mut(old_parent)?.retain(|&id| id != item);
                let siblings = self.siblings_mut(parent)?;
                let index = insert_index.min(siblings.len());
                siblings.insert(index, item);
                if let Some(node) = self.nodes.get_mut(&item) {
                    node.parent = parent;
                }
                Ok(())
            }

            DropTarget::HorizontalGap { insert_index } => {
                let from = self
                    .pinned_index(item)
                    .ok_or(TreeEditError::InvalidTarget(item))?;
                let tab = self.pinned.remove(from);
                let index = insert_index.min(self.pinned.len());
                self.pinned.insert(index, tab);
                Ok(())
            }
        }
    }

    /// Remove `item` with its whole subtree, returning it.
    pub fn detach(&mut self, item: ItemId) -> Result<TreeSnapshot, TreeEditError> {
        if let Some(index) = self.pinned_index(item) {
            let tab = self.pinned.remove(index);
            return Ok(TreeSnapshot {
                item_id: tab.item_id,
                tab_id: tab.tab_id,
                title: tab.title,
                children: Vec::new(),
            });
        }

        let snapshot = self.snapshot(item).ok_or(TreeEditError::UnknownItem(item))?;
        let parent = self.nodes.get(&item).and_then(|node| node.parent);
        self.siblings_mut(parent)?.retain(|&id| id != item);
        for id in snapshot.item_ids() {
            self.nodes.remove(&id);
        }
        Ok(snapshot)
    }

    /// Remove only `item`; its children take its place in its parent.
    pub fn detach_single(&mut self, item: ItemId) -> Result<TreeSnapshot, TreeEditError> {
        if self.pinned_index(item).is_some() {
            return self.detach(item);
        }

        let node = self.nodes.remove(&item).ok_or(TreeEditError::UnknownItem(item))?;
        for &child in &node.children {
            if let Some(child) = self.nodes.get_mut(&child) {
                child.parent = node.parent;
            }
        }
        let siblings = self.siblings_mut(node.parent)?;
        if let Some(index) = siblings.iter().position(|&id| id == item) {
            siblings.splice(index..=index, node.children.iter().copied());
        }
        Ok(TreeSnapshot {
            item_id: node.item_id,
            tab_id: node.tab_id,
            title: node.title,
            children: Vec::new(),
        })
    }

    /// Insert a whole snapshot under `parent` at `index` (clamped).
    pub fn graft(
        &mut self,
        snapshot: &TreeSnapshot,
        parent: Option<ItemId>,
        index: usize,
    ) -> Result<(), TreeEditError> {
        self.can_graft(snapshot)?;
        let siblings = self.siblings_mut(parent)?;
        let index = index.min(siblings.len());
        siblings.insert(index, snapshot.item_id);
        self.insert_nodes(snapshot, parent);
        Ok(())
    }

    /// Fails if any item of `snapshot` is already in this tree.
    pub fn can_graft(&self, snapshot: &TreeSnapshot) -> Result<(), TreeEditError> {
        match snapshot.item_ids().into_iter().find(|&id| self.contains(id)) {
            Some(duplicate) => Err(TreeEditError::DuplicateItem(duplicate)),
            None => Ok(()),
        }
    }

    fn insert_nodes(&mut self, snapshot: &TreeSnapshot, parent: Option<ItemId>) {
        self.nodes.insert(
            snapshot.item_id,
            TabNode {
                item_id: snapshot.item_id,
                tab_id: snapshot.tab_id,
                title: snapshot.title.clone(),
                parent,
                children: snapshot.children.iter().map(|c| c.item_id).collect(),
            },
        );
        for child in &snapshot.children {
            self.insert_nodes(child, Some(snapshot.item_id));
        }
    }
}

impl SubtreeLookup for TabTree {
    fn descendants(&self, item: ItemId) -> Vec<ItemId> {
        let mut out = Vec::new();
        let mut stack: Vec<ItemId> = self.children(Some(item)).iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            out.push(id);
            stack.extend(self.children(Some(id)).iter().rev());
        }
        out
    }

    fn snapshot(&self, item: ItemId) -> Option<TreeSnapshot> {
        if let Some(index) = self.pinned_index(item) {
            let tab = &self.pinned[index];
            return Some(TreeSnapshot {
                item_id: tab.item_id,
                tab_id: tab.tab_id,
                title: tab.title.clone(),
                children: Vec::new(),
            });
        }
        let node = self.nodes.get(&item)?;
        Some(TreeSnapshot {
            item_id: node.item_id,
            tab_id: node.tab_id,
            title: node.title.clone(),
            children: node
                .children
                .iter()
                .filter_map(|&child| self.snapshot(child))
                .collect(),
        })
    }
}

#[derive(Debug, Default)]
struct HostState {
    windows: BTreeMap<WindowId, TabTree>,
    next_window: u64,
    focused: Option<WindowId>,
}

impl HostState {
    fn window_of(&self, item: ItemId) -> Option<WindowId> {
        self.windows
            .iter()
            .find(|(_, tree)| tree.contains(item))
            .map(|(&window, _)| window)
    }

    fn tree_mut(&mut self, window: WindowId) -> Result<&mut TabTree, HostError> {
        self.windows
            .get_mut(&window)
            .ok_or_else(|| HostError(format!("unknown {window}")))
    }

    fn new_window(&mut self) -> WindowId {
        let next = self
            .windows
            .keys()
            .next_back()
            .map_or(1, |last| last.0 + 1)
            .max(self.next_window);
        self.next_window = next + 1;
        let window = WindowId(next);
        self.windows.insert(window, TabTree::new());
        window
    }

    fn relocate(
        &mut self,
        item: ItemId,
        from: Option<WindowId>,
        to: WindowId,
        whole_subtree: bool,
    ) -> Result<(), HostError> {
        let from = match from.filter(|w| self.windows.get(w).is_some_and(|t| t.contains(item))) {
            Some(from) => from,
            None => self
                .window_of(item)
                .ok_or_else(|| HostError(format!("unknown {item}")))?,
        };
        if from == to {
            return Ok(());
        }

        // Nothing leaves the source unless the target can take it.
        let mut moving = self
            .tree_mut(from)?
            .snapshot(item)
            .ok_or_else(|| HostError(format!("unknown {item}")))?;
        if !whole_subtree {
            moving.children.clear();
        }
        self.tree_mut(to)?.can_graft(&moving)?;

        let source = self.tree_mut(from)?;
        let snapshot = if whole_subtree {
            source.detach(item)?
        } else {
            source.detach_single(item)?
        };
        let target = self.tree_mut(to)?;
        let end = target.children(None).len();
        target.graft(&snapshot, None, end)?;
        Ok(())
    }
}

/// A [`HostOps`] host holding one [`TabTree`] per window.
///
/// Clones share the same state, so a test (or an app) can keep one clone while the broker owns
/// another.
#[derive(Clone, Debug, Default)]
pub struct InMemoryHost {
    state: Arc<Mutex<HostState>>,
}

impl InMemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, HostState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add (or replace) a window and its tree.
    pub fn insert_window(&self, window: WindowId, tree: TabTree) {
        self.state().windows.insert(window, tree);
    }

    pub fn remove_window(&self, window: WindowId) -> Option<TabTree> {
        self.state().windows.remove(&window)
    }

    pub fn windows(&self) -> Vec<WindowId> {
        self.state().windows.keys().copied().collect()
    }

    /// A copy of `window`'s tree.
    pub fn tree(&self, window: WindowId) -> Option<TabTree> {
        self.state().windows.get(&window).cloned()
    }

    /// Run `f` on `window`'s tree, e.g. to apply a local drop.
    pub fn with_tree<R>(&self, window: WindowId, f: impl FnOnce(&mut TabTree) -> R) -> Option<R> {
        self.state().windows.get_mut(&window).map(f)
    }

    pub fn window_of(&self, item: ItemId) -> Option<WindowId> {
        self.state().window_of(item)
    }

    pub fn focused(&self) -> Option<WindowId> {
        self.state().focused
    }
}

impl HostOps for InMemoryHost {
    fn move_tab_to_window(&mut self, item: ItemId, window: WindowId) -> Result<(), HostError> {
        self.state().relocate(item, None, window, false)
    }

    fn move_subtree_to_window(&mut self, item: ItemId, window: WindowId) -> Result<(), HostError> {
        self.state().relocate(item, None, window, true)
    }

    fn create_window_with_tab(&mut self, item: ItemId) -> Result<WindowId, HostError> {
        let mut state = self.state();
        let from = state
            .window_of(item)
            .ok_or_else(|| HostError(format!("unknown {item}")))?;
        let window = state.new_window();
        if let Err(err) = state.relocate(item, Some(from), window, false) {
            state.windows.remove(&window);
            return Err(err);
        }
        Ok(window)
    }

    fn create_window_with_subtree(
        &mut self,
        item: ItemId,
        source: Option<WindowId>,
    ) -> Result<WindowId, HostError> {
        let mut state = self.state();
        if state.window_of(item).is_none() {
            return Err(HostError(format!("unknown {item}")));
        }
        let window = state.new_window();
        if let Err(err) = state.relocate(item, source, window, true) {
            state.windows.remove(&window);
            return Err(err);
        }
        Ok(window)
    }

    fn focus_window(&mut self, window: WindowId) {
        self.state().focused = Some(window);
    }
}
