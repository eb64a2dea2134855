use std::time::Instant;

use egui::{Pos2, Vec2};

use super::client::BrokerClient;
use super::controller::{DragContext, DragController, DragEvent, DragOrigin, PointerEvent};
use super::debug::DebugLog;
use super::error::DragError;
use super::options::DragOptions;
use super::protocol::BrokerEvent;
use super::transport::BrokerTransport;
use super::types::{DragSource, SessionId, TreeSnapshot, WindowId};

/// The broker session this window registered or claimed for its current drag.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct HeldSession {
    id: SessionId,
    source_window: WindowId,
}

/// One window's side of tab dragging: its [`DragController`] wired to its [`BrokerClient`].
///
/// Call [`Self::tick`] once per frame (or timer tick), [`Self::pointer_entered`] when the pointer
/// enters the tree surface, and [`Self::handle`] for every pointer event. All broker failures
/// are handled here; the caller only ever sees [`DragEvent`]s.
#[derive(Debug)]
pub struct WindowDrag<T> {
    window: WindowId,
    options: DragOptions,
    controller: DragController,
    client: BrokerClient<T>,
    held: Option<HeldSession>,
    outside_reported: bool,
    debug: DebugLog,
}

impl<T: BrokerTransport> WindowDrag<T> {
    pub fn new(window: WindowId, transport: T, options: DragOptions) -> Self {
        let client = BrokerClient::new(window, transport, options.poll_interval());
        let debug = DebugLog::new(options.debug_event_log, options.debug_event_log_capacity);
        Self {
            window,
            options,
            controller: DragController::new(),
            client,
            held: None,
            outside_reported: false,
            debug,
        }
    }

    pub fn window(&self) -> WindowId {
        self.window
    }

    pub fn options(&self) -> &DragOptions {
        &self.options
    }

    pub fn set_options(&mut self, options: DragOptions) {
        self.debug.set_enabled(options.debug_event_log);
        self.options = options;
    }

    pub fn controller(&self) -> &DragController {
        &self.controller
    }

    pub fn client(&self) -> &BrokerClient<T> {
        &self.client
    }

    pub fn debug_log(&self) -> &DebugLog {
        &self.debug
    }

    /// Apply broadcasts and the periodic session refresh.
    ///
    /// Cancels the local drag if the session ended, or if it was claimed by another window
    /// (the drag continues over there). A failed poll cancels it too, and releases the session.
    pub fn tick(&mut self, now: Instant) -> Vec<DragEvent> {
        self.debug.begin_tick();
        let mut out = Vec::new();

        let tick = self.client.tick(now);
        for event in tick.events {
            match event {
                BrokerEvent::DragSessionEnded => {
                    self.debug.event("window", "broadcast DRAG_SESSION_ENDED");
                    self.held = None;
                    self.outside_reported = false;
                    out.extend(self.controller.session_ended());
                }
            }
        }

        let Some(held) = self.held else {
            return out;
        };
        if self.controller.active().is_none() {
            return out;
        }
        if let Some(err) = tick.poll_error {
            self.report("poll", &err);
            out.extend(self.controller.cancel());
            self.end_session();
            return out;
        }
        match self.client.cached() {
            Some(session) if session.session_id == held.id => {
                if !session.is_owned_by(self.window) {
                    self.debug.event(
                        "window",
                        format!("drag claimed by {}", session.current_window_id),
                    );
                    self.held = None;
                    self.outside_reported = false;
                    out.extend(self.controller.cancel());
                }
            }
            _ => {
                self.debug.event("window", "session gone from broker");
                self.held = None;
                self.outside_reported = false;
                out.extend(self.controller.cancel());
            }
        }
        out
    }

    /// The pointer entered this window's tree surface. Claims a drag in flight elsewhere and
    /// continues it here.
    pub fn pointer_entered(
        &mut self,
        pos: Pos2,
        now: Instant,
        ctx: &DragContext<'_>,
    ) -> Option<DragEvent> {
        if !self.controller.is_idle() {
            return None;
        }

        let session = match self.client.on_pointer_enter(now) {
            Ok(Some(session)) => session,
            Ok(None) => return None,
            Err(err) => {
                self.report("claim", &err);
                return None;
            }
        };

        self.debug.event(
            "window",
            format!("claimed session id={} {}", session.session_id.0, session.item_id),
        );
        self.held = Some(HeldSession {
            id: session.session_id,
            source_window: session.source_window_id,
        });
        self.outside_reported = session.is_outside_tree;
        let source = DragSource {
            item_id: session.item_id,
            tab_id: session.tree_snapshot.tab_id,
        };
        Some(
            self.controller
                .start_programmatic(source, pos, Vec2::ZERO, ctx),
        )
    }

    pub fn handle(&mut self, event: PointerEvent, ctx: &DragContext<'_>) -> Option<DragEvent> {
        let out = self.controller.update(event, ctx, &self.options);
        if let PointerEvent::Move { .. } = event {
            self.notify_hover();
        }
        let out = out?;
        match out {
            DragEvent::Started {
                source,
                origin: DragOrigin::Local,
                ..
            } => self.on_local_start(source, ctx).then_some(out),

            DragEvent::Started {
                origin: DragOrigin::Remote,
                ..
            } => Some(out),

            DragEvent::Moved { pointer, .. } => {
                self.on_move(pointer, ctx);
                // A failed broker call may have cancelled the drag.
                match self.controller.active() {
                    Some(_) => Some(out),
                    None => Some(DragEvent::Cancelled {
                        source: drag_source(&out),
                    }),
                }
            }

            DragEvent::Dropped { source, .. } => Some(self.on_drop(source, out)),

            DragEvent::ExternalDrop { source, .. } => Some(self.on_external_drop(source, out)),

            DragEvent::Cancelled { .. } => {
                self.end_session();
                Some(out)
            }
        }
    }

    /// Register the freshly started drag with the broker. Cancels it on failure.
    fn on_local_start(&mut self, source: DragSource, ctx: &DragContext<'_>) -> bool {
        let snapshot = ctx
            .lookup
            .and_then(|lookup| lookup.snapshot(source.item_id))
            .unwrap_or_else(|| TreeSnapshot {
                item_id: source.item_id,
                tab_id: source.tab_id,
                title: String::new(),
                children: Vec::new(),
            });

        let registered = self
            .client
            .set_session(source.item_id, snapshot)
            .and_then(|()| self.client.refresh(Instant::now()));
        match registered {
            Ok(Some(session)) if session.item_id == source.item_id => {
                self.debug.event(
                    "window",
                    format!("session START id={} {}", session.session_id.0, source.item_id),
                );
                self.held = Some(HeldSession {
                    id: session.session_id,
                    source_window: self.window,
                });
                self.outside_reported = false;
                true
            }
            Ok(_) => {
                self.debug.event("window", "session vanished right after start");
                self.controller.cancel();
                false
            }
            Err(err) => {
                self.report("start", &err);
                self.controller.cancel();
                false
            }
        }
    }

    /// Hover is reported whenever a drag from another window passes over, held here or not.
    fn notify_hover(&mut self) {
        if let Err(err) = self.client.on_pointer_move() {
            self.report("hover", &err);
            if !err.is_expected() && self.held.is_some() {
                self.abort();
            }
        }
    }

    fn on_move(&mut self, pointer: Pos2, ctx: &DragContext<'_>) {
        if self.held.is_none() || self.controller.active().is_none() {
            return;
        }

        let outside = ctx.is_outside_panel(pointer);
        if outside != self.outside_reported {
            match self.client.set_outside_tree(outside) {
                Ok(()) => self.outside_reported = outside,
                Err(err) => {
                    self.report("outside", &err);
                    if !err.is_expected() {
                        self.abort();
                    }
                }
            }
        }
    }

    fn on_drop(&mut self, source: DragSource, dropped: DragEvent) -> DragEvent {
        let Some(held) = self.held else {
            return dropped;
        };

        if held.source_window != self.window {
            if let Err(err) = self
                .client
                .move_subtree_to_window(source.item_id, self.window)
            {
                self.report("drop", &err);
                self.end_session();
                return DragEvent::Cancelled { source };
            }
            self.debug.event(
                "window",
                format!("moved {} here from {}", source.item_id, held.source_window),
            );
        }
        self.end_session();
        dropped
    }

    fn on_external_drop(&mut self, source: DragSource, dropped: DragEvent) -> DragEvent {
        let source_window = self.held.map_or(self.window, |held| held.source_window);
        match self
            .client
            .create_window_with_subtree(source.item_id, Some(source_window))
        {
            Ok(window) => {
                self.debug.event(
                    "window",
                    format!("detached {} into {window}", source.item_id),
                );
                self.end_session();
                dropped
            }
            Err(err) => {
                self.report("detach", &err);
                self.end_session();
                DragEvent::Cancelled { source }
            }
        }
    }

    /// Cancel the local drag after a failed broker call and release the session.
    fn abort(&mut self) {
        self.controller.cancel();
        self.end_session();
    }

    /// Clear the held session (if any), and swallow the broadcast it triggers for this window.
    fn end_session(&mut self) {
        self.outside_reported = false;
        if self.held.take().is_none() {
            return;
        }
        if let Err(err) = self.client.clear_session() {
            self.report("clear", &err);
        }
        // The broker broadcasts before it answers, so our own echo is already queued.
        self.client.drain_events();
    }

    fn report(&mut self, what: &str, err: &DragError) {
        if err.is_expected() {
            self.debug.event("window", format!("{what}: {err}"));
        } else {
            log::warn!("tab drag in {}: {what} failed: {err}", self.window);
            self.debug.event("window", format!("{what} FAILED: {err}"));
        }
    }
}

fn drag_source(event: &DragEvent) -> DragSource {
    match *event {
        DragEvent::Started { source, .. }
        | DragEvent::Moved { source, .. }
        | DragEvent::Dropped { source, .. }
        | DragEvent::ExternalDrop { source, .. }
        | DragEvent::Cancelled { source } => source,
    }
}
