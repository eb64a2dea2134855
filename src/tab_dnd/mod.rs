//! Tab dragging within a tree view, across windows sharing one [`SessionBroker`], and out into
//! new windows.
//!
//! The pieces, bottom-up:
//! - [`resolve_tree_target`] / [`resolve_strip_target`]: pure pointer → [`DropTarget`] math.
//! - [`DragController`]: the per-window pointer state machine.
//! - [`SessionBroker`]: the one authoritative [`DragSession`], serialized on its own thread.
//! - [`BrokerClient`]: a window's cached, non-blocking view of the broker.
//! - [`WindowDrag`]: controller and client wired together; what a window actually uses.

mod broker;
mod client;
mod controller;
mod debug;
mod egui_input;
mod error;
mod geometry;
mod host;
mod layout;
mod options;
mod protocol;
mod resolver;
mod session;
mod transport;
mod types;
mod window;


pub use broker::{BrokerHandle, SessionBroker};
pub use client::{BrokerClient, ClientTick, SessionCache};
pub use controller::{
    ActiveDrag, DragContext, DragController, DragEvent, DragOrigin, DragPhase, PointerEvent,
};
pub use debug::DebugLog;
pub use egui_input::{PointerInput, pointer_inputs};
pub use error::{DragError, HostError, ProtocolError};
pub use geometry::{DepthRange, calculate_depth_range, calculate_target_depth};
pub use host::HostOps;
pub use layout::{
    DragAxis, DropSurface, DropTarget, StripLayout, StripSlot, TreeLayout, TreeRow,
};
pub use options::DragOptions;
pub use protocol::{
    BrokerEvent, Request, Response, ResponseData, decode_event, decode_request, decode_response,
    encode_event, encode_request, encode_response,
};
pub use resolver::{resolve_strip_target, resolve_tree_target};
pub use session::{DragSession, DragSessionState, DragState};
pub use transport::{BrokerTransport, ChannelTransport};
pub use types::{DragSource, ItemId, SessionId, SubtreeLookup, TabId, TreeSnapshot, WindowId};
pub use window::WindowDrag;
