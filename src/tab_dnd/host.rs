use super::error::HostError;
use super::types::{ItemId, WindowId};

/// The host primitives the broker calls at drop time.
///
/// Implemented by whatever owns the real tabs and windows (a browser host, a desktop shell,
/// or [`crate::tab_tree::InMemoryHost`]).
pub trait HostOps: Send {
    /// Move only `item` into `window`; its children stay where they are.
    fn move_tab_to_window(&mut self, item: ItemId, window: WindowId) -> Result<(), HostError>;

    /// Move `item` and its whole subtree into `window`.
    fn move_subtree_to_window(&mut self, item: ItemId, window: WindowId) -> Result<(), HostError>;

    /// Open a new window holding only `item`.
    fn create_window_with_tab(&mut self, item: ItemId) -> Result<WindowId, HostError>;

    /// Open a new window seeded with `item` and its subtree.
    ///
    /// `source` is where the subtree currently lives, when the caller knows it.
    fn create_window_with_subtree(
        &mut self,
        item: ItemId,
        source: Option<WindowId>,
    ) -> Result<WindowId, HostError>;

    /// Bring `window` to the foreground, so the OS does not throttle it while it shows a drag.
    fn focus_window(&mut self, window: WindowId) {
        let _ = window;
    }
}
