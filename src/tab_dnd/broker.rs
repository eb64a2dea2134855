use std::collections::BTreeMap;
use std::sync::mpsc;
use std::thread::JoinHandle;
use std::time::Instant;

use super::debug::DebugLog;
use super::error::DragError;
use super::host::HostOps;
use super::options::DragOptions;
use super::protocol::{BrokerEvent, Request, Response, ResponseData};
use super::session::{DragSession, DragSessionState, DragState};
use super::transport::ChannelTransport;
use super::types::{SessionId, WindowId};

/// The single authoritative store of the in-flight drag.
///
/// All mutations go through [`Self::handle`], one request at a time. Spawn it with
/// [`Self::spawn`] to run it as an actor on its own thread, which is how windows talk to it.
pub struct SessionBroker {
    host: Box<dyn HostOps>,
    epoch: Instant,
    session: Option<DragSession>,
    next_session_id: u64,
    subscribers: BTreeMap<WindowId, mpsc::Sender<BrokerEvent>>,
    debug: DebugLog,
}

impl std::fmt::Debug for SessionBroker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionBroker")
            .field("session", &self.session)
            .field("subscribers", &self.subscribers.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

pub(super) enum BrokerMessage {
    Request {
        request: Request,
        reply: mpsc::Sender<Response>,
    },
    Subscribe {
        window: WindowId,
        events: mpsc::Sender<BrokerEvent>,
    },
    Shutdown,
}

impl SessionBroker {
    pub fn new(host: Box<dyn HostOps>, options: &DragOptions) -> Self {
        let debug = DebugLog::new(options.debug_event_log, options.debug_event_log_capacity);
        Self {
            host,
            epoch: Instant::now(),
            session: None,
            next_session_id: 1,
            subscribers: BTreeMap::new(),
            debug,
        }
    }

    /// Current session, if a drag is in flight.
    pub fn session(&self) -> Option<&DragSession> {
        self.session.as_ref().filter(|s| s.is_active())
    }

    pub fn debug_log(&self) -> &DebugLog {
        &self.debug
    }

    /// Register `window` for broadcasts. Replaces any earlier subscription of the same window.
    pub fn subscribe(&mut self, window: WindowId) -> mpsc::Receiver<BrokerEvent> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.insert(window, tx);
        rx
    }

    pub fn handle(&mut self, request: Request) -> Response {
        self.handle_at(request, Instant::now())
    }

    /// Handle one request as if it arrived at `now`.
    pub fn handle_at(&mut self, request: Request, now: Instant) -> Response {
        self.debug.begin_tick();
        let kind = request.kind();
        let result = self.dispatch(request, now);
        match &result {
            Ok(_) => {}
            Err(err) if err.is_expected() => self.debug.event("broker", format!("{kind}: {err}")),
            Err(err) => {
                log::warn!("drag broker: {kind} failed: {err}");
                self.debug.event("broker", format!("{kind} FAILED: {err}"));
            }
        }
        result.into()
    }

    fn dispatch(
        &mut self,
        request: Request,
        now: Instant,
    ) -> Result<Option<ResponseData>, DragError> {
        match request {
            Request::GetDragSession => Ok(Some(ResponseData::Session(self.session().cloned()))),

            Request::GetDragState => Ok(Some(ResponseData::DragState(
                self.session().map(DragState::from),
            ))),

            Request::SetDragState {
                item_id,
                snapshot,
                source_window_id,
            } => {
                if self.session().is_some() {
                    return Err(DragError::SessionActive);
                }
                let session_id = SessionId(self.next_session_id);
                self.next_session_id += 1;
                let stamp = self.stamp(now);
                self.session = Some(DragSession {
                    session_id,
                    item_id,
                    state: DragSessionState::DraggingLocal,
                    source_window_id,
                    current_window_id: source_window_id,
                    started_at: stamp,
                    updated_at: stamp,
                    tree_snapshot: snapshot,
                    is_locked: false,
                    is_outside_tree: false,
                    current_hover_window_id: None,
                });
                self.debug.event(
                    "broker",
                    format!(
                        "session START id={} {item_id} source={source_window_id}",
                        session_id.0
                    ),
                );
                Ok(None)
            }

            Request::ClearDragState => {
                self.end_session("clear");
                Ok(None)
            }

            Request::BeginCrossWindowMove {
                target_window_id,
                expected_current_window_id,
            } => self.begin_cross_window_move(target_window_id, expected_current_window_id, now),

            Request::NotifyTreeViewHover { window_id } => {
                let stamp = self.stamp(now);
                let Some(session) = self.session.as_mut().filter(|s| s.is_active()) else {
                    return Ok(None);
                };
                if session.current_hover_window_id != Some(window_id) {
                    session.current_hover_window_id = Some(window_id);
                    session.updated_at = stamp;
                    self.host.focus_window(window_id);
                    self.debug.event("broker", format!("hover {window_id}"));
                }
                Ok(None)
            }

            Request::SetOutsideTree { outside } => {
                let stamp = self.stamp(now);
                let session = self
                    .session
                    .as_mut()
                    .filter(|s| s.is_active())
                    .ok_or(DragError::SessionAbsent)?;
                if session.is_outside_tree != outside {
                    session.is_outside_tree = outside;
                    session.updated_at = stamp;
                }
                Ok(None)
            }

            Request::MoveTabToWindow { item_id, window_id } => {
                self.host.move_tab_to_window(item_id, window_id)?;
                self.debug.event("broker", format!("move tab {item_id} -> {window_id}"));
                Ok(None)
            }

            Request::MoveSubtreeToWindow { item_id, window_id } => {
                self.host.move_subtree_to_window(item_id, window_id)?;
                self.debug
                    .event("broker", format!("move subtree {item_id} -> {window_id}"));
                Ok(None)
            }

            Request::CreateWindowWithTab { item_id } => {
                let window = self.host.create_window_with_tab(item_id)?;
                self.debug
                    .event("broker", format!("new window {window} with tab {item_id}"));
                Ok(Some(ResponseData::Window(window)))
            }

            Request::CreateWindowWithSubtree {
                item_id,
                source_window_id,
            } => {
                let window = self
                    .host
                    .create_window_with_subtree(item_id, source_window_id)?;
                self.debug
                    .event("broker", format!("new window {window} with subtree {item_id}"));
                Ok(Some(ResponseData::Window(window)))
            }

            Request::WindowClosed { window_id } => {
                self.subscribers.remove(&window_id);
                let involved = self.session().is_some_and(|s| {
                    s.current_window_id == window_id || s.source_window_id == window_id
                });
                if involved {
                    self.end_session("owner window closed");
                }
                Ok(None)
            }
        }
    }

    /// Lock, reassign the owner, unlock. The lock never outlives the request.
    ///
    /// `expected` is the owner the claimant last saw. Of several claims made against the same
    /// owner, only the first one wins; the others find the owner changed and get
    /// [`DragError::LockConflict`].
    fn begin_cross_window_move(
        &mut self,
        target: WindowId,
        expected: Option<WindowId>,
        now: Instant,
    ) -> Result<Option<ResponseData>, DragError> {
        let stamp = self.stamp(now);
        let session = self
            .session
            .as_mut()
            .filter(|s| s.is_active())
            .ok_or(DragError::SessionAbsent)?;
        if session.is_locked {
            return Err(DragError::LockConflict);
        }
        if session.current_window_id == target {
            return Err(DragError::AlreadyOwned);
        }
        if expected.is_some_and(|expected| expected != session.current_window_id) {
            return Err(DragError::LockConflict);
        }

        session.is_locked = true;
        let previous = session.current_window_id;
        session.current_window_id = target;
        session.state = if target == session.source_window_id {
            DragSessionState::DraggingLocal
        } else {
            DragSessionState::DraggingRemote
        };
        session.updated_at = stamp;
        session.is_locked = false;

        let snapshot = session.clone();
        self.debug.event(
            "broker",
            format!("hand-off {previous} -> {target} id={}", snapshot.session_id.0),
        );
        Ok(Some(ResponseData::Session(Some(snapshot))))
    }

    fn end_session(&mut self, reason: &str) {
        if let Some(ended) = self.session.take() {
            self.debug.event(
                "broker",
                format!("session END id={} reason={reason}", ended.session_id.0),
            );
        }
        self.broadcast(BrokerEvent::DragSessionEnded);
    }

    fn broadcast(&mut self, event: BrokerEvent) {
        self.subscribers.retain(|window, tx| {
            let delivered = tx.send(event).is_ok();
            if !delivered {
                log::debug!("drag broker: dropping unreachable subscriber {window}");
            }
            delivered
        });
    }

    fn stamp(&self, now: Instant) -> u64 {
        let elapsed = now.saturating_duration_since(self.epoch).as_millis();
        u64::try_from(elapsed).unwrap_or(u64::MAX)
    }

    /// Run the broker on its own thread.
    pub fn spawn(mut self) -> BrokerHandle {
        let (tx, rx) = mpsc::channel::<BrokerMessage>();
        let join = std::thread::Builder::new()
            .name("tab-drag-broker".to_owned())
            .spawn(move || {
                while let Ok(message) = rx.recv() {
                    match message {
                        BrokerMessage::Request { request, reply } => {
                            let response = self.handle(request);
                            // The requester may have timed out and gone away.
                            let _ = reply.send(response);
                        }
                        BrokerMessage::Subscribe { window, events } => {
                            self.subscribers.insert(window, events);
                        }
                        BrokerMessage::Shutdown => break,
                    }
                }
            });

        let join = match join {
            Ok(join) => Some(join),
            Err(err) => {
                log::warn!("drag broker: failed to spawn thread: {err}");
                None
            }
        };

        BrokerHandle { tx, join }
    }
}

/// Owner handle of a broker running on its own thread.
///
/// Dropping the handle stops the broker once every connected window has gone.
#[derive(Debug)]
pub struct BrokerHandle {
    tx: mpsc::Sender<BrokerMessage>,
    join: Option<JoinHandle<()>>,
}

impl BrokerHandle {
    /// Connect `window` to the broker: subscribes it to broadcasts and returns its transport.
    pub fn connect(
        &self,
        window: WindowId,
        options: &DragOptions,
    ) -> Result<ChannelTransport, DragError> {
        let (events_tx, events_rx) = mpsc::channel();
        self.tx
            .send(BrokerMessage::Subscribe {
                window,
                events: events_tx,
            })
            .map_err(|err| DragError::TransportUnreachable(err.to_string()))?;
        Ok(ChannelTransport::new(
            window,
            self.tx.clone(),
            events_rx,
            options.request_timeout(),
        ))
    }

    /// Stop the broker thread and wait for it.
    pub fn shutdown(mut self) {
        let _ = self.tx.send(BrokerMessage::Shutdown);
        if let Some(join) = self.join.take() {
            if join.join().is_err() {
                log::warn!("drag broker: thread panicked");
            }
        }
    }
}
