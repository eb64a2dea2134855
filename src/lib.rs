//! Drag-and-drop for a tree of tabs in egui, with hand-off between windows.
//!
//! A tab (with its whole subtree) can be dragged within a window's tree view, reordered in a
//! pinned strip, carried into another window mid-drag, or released outside the panel to tear it
//! off into a new window. Windows coordinate through a single
//! [`SessionBroker`](tab_dnd::SessionBroker); the host application performs the actual moves
//! through [`HostOps`](tab_dnd::HostOps).
//!
//! [`tab_tree::TabTree`] and [`tab_tree::InMemoryHost`] are a ready-made model and host.

#![forbid(unsafe_code)]

pub mod tab_dnd;
pub mod tab_tree;

pub use tab_dnd::{
    BrokerClient, BrokerHandle, DragContext, DragController, DragError, DragEvent, DragOptions,
    DragSession, DropSurface, DropTarget, HostOps, ItemId, PointerEvent, SessionBroker, TabId,
    WindowDrag, WindowId,
};
pub use tab_tree::{InMemoryHost, TabTree};
