use serde::{Deserialize, Serialize};

use super::types::{ItemId, SessionId, TreeSnapshot, WindowId};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DragSessionState {
    #[default]
    Idle,
    /// The drag is in the window it started in.
    DraggingLocal,
    /// The drag was handed off to another window.
    DraggingRemote,
}

/// The single in-flight drag, as recorded by the broker.
///
/// Timestamps are milliseconds on the broker's monotonic clock.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DragSession {
    pub session_id: SessionId,
    pub item_id: ItemId,
    pub state: DragSessionState,
    pub source_window_id: WindowId,
    pub current_window_id: WindowId,
    pub started_at: u64,
    pub updated_at: u64,
    pub tree_snapshot: TreeSnapshot,
    pub is_locked: bool,
    pub is_outside_tree: bool,
    pub current_hover_window_id: Option<WindowId>,
}

impl DragSession {
    pub fn is_active(&self) -> bool {
        self.state != DragSessionState::Idle
    }

    pub fn is_owned_by(&self, window: WindowId) -> bool {
        self.current_window_id == window
    }

    /// Ownership moved away from the source window.
    pub fn is_remote(&self) -> bool {
        self.current_window_id != self.source_window_id
    }
}

/// The reduced session view answered by `GET_DRAG_STATE`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DragState {
    pub item_id: ItemId,
    pub snapshot: TreeSnapshot,
    pub source_window_id: WindowId,
}

impl From<&DragSession> for DragState {
    fn from(session: &DragSession) -> Self {
        Self {
            item_id: session.item_id,
            snapshot: session.tree_snapshot.clone(),
            source_window_id: session.source_window_id,
        }
    }
}
