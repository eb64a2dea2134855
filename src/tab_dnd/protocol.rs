//! Broker message contract and its JSON wire form.
//!
//! Requests and broadcasts are tagged by `type` (e.g. `{"type":"BEGIN_CROSS_WINDOW_MOVE",
//! "targetWindowId":2}`); responses are `{success, data?, error?}`.

use serde::{Deserialize, Serialize};

use super::error::{DragError, ProtocolError};
use super::session::{DragSession, DragState};
use super::types::{ItemId, TreeSnapshot, WindowId};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    rename_all = "SCREAMING_SNAKE_CASE",
    rename_all_fields = "camelCase"
)]
pub enum Request {
    GetDragSession,
    SetDragState {
        item_id: ItemId,
        snapshot: TreeSnapshot,
        source_window_id: WindowId,
    },
    ClearDragState,
    BeginCrossWindowMove {
        target_window_id: WindowId,
        /// Owner the claimant last saw; the claim fails if ownership moved since.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        expected_current_window_id: Option<WindowId>,
    },
    NotifyTreeViewHover {
        window_id: WindowId,
    },
    SetOutsideTree {
        outside: bool,
    },
    GetDragState,
    MoveTabToWindow {
        item_id: ItemId,
        window_id: WindowId,
    },
    MoveSubtreeToWindow {
        item_id: ItemId,
        window_id: WindowId,
    },
    CreateWindowWithTab {
        item_id: ItemId,
    },
    CreateWindowWithSubtree {
        item_id: ItemId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        source_window_id: Option<WindowId>,
    },
    WindowClosed {
        window_id: WindowId,
    },
}

impl Request {
    /// Wire name, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::GetDragSession => "GET_DRAG_SESSION",
            Self::SetDragState { .. } => "SET_DRAG_STATE",
            Self::ClearDragState => "CLEAR_DRAG_STATE",
            Self::BeginCrossWindowMove { .. } => "BEGIN_CROSS_WINDOW_MOVE",
            Self::NotifyTreeViewHover { .. } => "NOTIFY_TREE_VIEW_HOVER",
            Self::SetOutsideTree { .. } => "SET_OUTSIDE_TREE",
            Self::GetDragState => "GET_DRAG_STATE",
            Self::MoveTabToWindow { .. } => "MOVE_TAB_TO_WINDOW",
            Self::MoveSubtreeToWindow { .. } => "MOVE_SUBTREE_TO_WINDOW",
            Self::CreateWindowWithTab { .. } => "CREATE_WINDOW_WITH_TAB",
            Self::CreateWindowWithSubtree { .. } => "CREATE_WINDOW_WITH_SUBTREE",
            Self::WindowClosed { .. } => "WINDOW_CLOSED",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ResponseData {
    Session(Option<DragSession>),
    DragState(Option<DragState>),
    /// Window created by a `CREATE_WINDOW_*` request.
    Window(WindowId),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<ResponseData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<DragError>,
}

impl Response {
    pub fn ok(data: Option<ResponseData>) -> Self {
        Self {
            success: true,
            data,
            error: None,
        }
    }

    pub fn err(error: DragError) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error),
        }
    }

    pub fn into_result(self) -> Result<Option<ResponseData>, DragError> {
        if self.success {
            Ok(self.data)
        } else {
            Err(self.error.unwrap_or_else(|| {
                DragError::TransportUnreachable("failure without error".to_owned())
            }))
        }
    }
}

impl From<Result<Option<ResponseData>, DragError>> for Response {
    fn from(result: Result<Option<ResponseData>, DragError>) -> Self {
        match result {
            Ok(data) => Self::ok(data),
            Err(err) => Self::err(err),
        }
    }
}

/// Pushed by the broker to every subscribed window.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BrokerEvent {
    DragSessionEnded,
}

pub fn encode_request(request: &Request) -> Result<String, ProtocolError> {
    Ok(serde_json::to_string(request)?)
}

pub fn decode_request(text: &str) -> Result<Request, ProtocolError> {
    Ok(serde_json::from_str(text)?)
}

pub fn encode_response(response: &Response) -> Result<String, ProtocolError> {
    Ok(serde_json::to_string(response)?)
}

pub fn decode_response(text: &str) -> Result<Response, ProtocolError> {
    Ok(serde_json::from_str(text)?)
}

pub fn encode_event(event: BrokerEvent) -> Result<String, ProtocolError> {
    Ok(serde_json::to_string(&event)?)
}

pub fn decode_event(text: &str) -> Result<BrokerEvent, ProtocolError> {
    Ok(serde_json::from_str(text)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tab_dnd::types::TabId;

    #[test]
    fn request_wire_names_match_the_contract() {
        let request = Request::BeginCrossWindowMove {
            target_window_id: WindowId(2),
            expected_current_window_id: None,
        };
        assert_eq!(
            encode_request(&request).unwrap(),
            r#"{"type":"BEGIN_CROSS_WINDOW_MOVE","targetWindowId":2}"#
        );
        assert_eq!(
            encode_request(&Request::GetDragSession).unwrap(),
            r#"{"type":"GET_DRAG_SESSION"}"#
        );
        assert_eq!(Request::GetDragSession.kind(), "GET_DRAG_SESSION");

        let guarded = Request::BeginCrossWindowMove {
            target_window_id: WindowId(2),
            expected_current_window_id: Some(WindowId(1)),
        };
        assert_eq!(
            encode_request(&guarded).unwrap(),
            r#"{"type":"BEGIN_CROSS_WINDOW_MOVE","targetWindowId":2,"expectedCurrentWindowId":1}"#
        );
    }

    #[test]
    fn optional_source_window_may_be_omitted() {
        let request =
            decode_request(r#"{"type":"CREATE_WINDOW_WITH_SUBTREE","itemId":5}"#).unwrap();
        assert_eq!(
            request,
            Request::CreateWindowWithSubtree {
                item_id: ItemId(5),
                source_window_id: None
            }
        );
    }

    #[test]
    fn set_drag_state_carries_the_snapshot() {
        let text = r#"{"type":"SET_DRAG_STATE","itemId":1,"sourceWindowId":3,
            "snapshot":{"itemId":1,"tabId":11,"title":"docs"}}"#;
        let Request::SetDragState { snapshot, source_window_id, .. } = decode_request(text).unwrap()
        else {
            panic!("wrong request");
        };
        assert_eq!(snapshot.tab_id, TabId(11));
        assert_eq!(source_window_id, WindowId(3));
    }

    #[test]
    fn failed_response_round_trips_its_error() {
        let text = encode_response(&Response::err(DragError::LockConflict)).unwrap();
        assert_eq!(text, r#"{"success":false,"error":{"kind":"LOCK_CONFLICT"}}"#);
        let back = decode_response(&text).unwrap();
        assert_eq!(back.into_result(), Err(DragError::LockConflict));
    }

    #[test]
    fn session_ended_broadcast_has_no_payload() {
        assert_eq!(
            encode_event(BrokerEvent::DragSessionEnded).unwrap(),
            r#"{"type":"DRAG_SESSION_ENDED"}"#
        );
        assert_eq!(
            decode_event(r#"{"type":"DRAG_SESSION_ENDED"}"#).unwrap(),
            BrokerEvent::DragSessionEnded
        );
    }
}
