use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Options for [`super::WindowDrag`], [`super::DragController`] and [`super::SessionBroker`].
///
/// Deserializing fills every missing field from [`Default`], so a host can ship a partial config.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DragOptions {
    /// Pointer travel (in points) before a press turns into a drag.
    ///
    /// Measured as Euclidean distance over the tree and as horizontal distance over the pinned
    /// strip.
    pub activation_distance: f32,

    /// Fallback indent per tree level, used by [`crate::tab_tree::TabTree::tree_layout`].
    pub indent_width: f32,

    /// Row height used by [`crate::tab_tree::TabTree::tree_layout`].
    pub row_height: f32,

    /// How often a window refreshes its cached copy of the session, in milliseconds.
    ///
    /// Pointer-move handling only ever reads that cache, so this is also the upper bound on how
    /// stale a window's view of the session may be.
    pub poll_interval_ms: u64,

    /// How long a window waits for the broker to answer one request, in milliseconds.
    pub request_timeout_ms: u64,

    /// If true, record drag and session events in a small ring buffer (see [`super::DebugLog`]).
    pub debug_event_log: bool,

    /// Capacity of the debug ring buffer.
    pub debug_event_log_capacity: usize,
}

impl Default for DragOptions {
    fn default() -> Self {
        Self {
            activation_distance: 8.0,
            indent_width: 16.0,
            row_height: 24.0,
            poll_interval_ms: 100,
            request_timeout_ms: 500,
            debug_event_log: false,
            debug_event_log_capacity: 256,
        }
    }
}

impl DragOptions {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms.max(1))
    }
}
