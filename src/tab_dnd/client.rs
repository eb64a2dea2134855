use std::time::{Duration, Instant};

use super::error::DragError;
use super::protocol::{BrokerEvent, Request, ResponseData};
use super::session::DragSession;
use super::transport::BrokerTransport;
use super::types::{ItemId, SessionId, TreeSnapshot, WindowId};

/// Last known session, refreshed at most once per interval.
///
/// Pointer-move handling reads only this cache, so it never waits on the broker. The price is
/// that the cached value may be up to one interval old.
#[derive(Clone, Debug)]
pub struct SessionCache {
    session: Option<DragSession>,
    refreshed_at: Option<Instant>,
    interval: Duration,
}

impl SessionCache {
    pub fn new(interval: Duration) -> Self {
        Self {
            session: None,
            refreshed_at: None,
            interval,
        }
    }

    pub fn get(&self) -> Option<&DragSession> {
        self.session.as_ref()
    }

    pub fn refreshed_at(&self) -> Option<Instant> {
        self.refreshed_at
    }

    pub fn is_stale(&self, now: Instant) -> bool {
        self.refreshed_at
            .is_none_or(|at| now.saturating_duration_since(at) >= self.interval)
    }

    pub fn store(&mut self, session: Option<DragSession>, now: Instant) {
        self.session = session.filter(DragSession::is_active);
        self.refreshed_at = Some(now);
    }

    /// Forget the session but keep the refresh time.
    pub fn clear(&mut self) {
        self.session = None;
    }

    fn get_mut(&mut self) -> Option<&mut DragSession> {
        self.session.as_mut()
    }
}

/// What one [`BrokerClient::tick`] observed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ClientTick {
    pub events: Vec<BrokerEvent>,

    /// The session poll failed. The cache reads as "no session" until the next good poll.
    pub poll_error: Option<DragError>,
}

/// Per-window proxy to the [`super::SessionBroker`].
#[derive(Debug)]
pub struct BrokerClient<T> {
    window: WindowId,
    transport: T,
    cache: SessionCache,

    /// Session and observed hover window the last `NOTIFY_TREE_VIEW_HOVER` was sent for.
    hover_notified: Option<(SessionId, Option<WindowId>)>,
}

impl<T: BrokerTransport> BrokerClient<T> {
    pub fn new(window: WindowId, transport: T, poll_interval: Duration) -> Self {
        Self {
            window,
            transport,
            cache: SessionCache::new(poll_interval),
            hover_notified: None,
        }
    }

    pub fn window(&self) -> WindowId {
        self.window
    }

    pub fn cache(&self) -> &SessionCache {
        &self.cache
    }

    pub fn cached(&self) -> Option<&DragSession> {
        self.cache.get()
    }

    /// Drain pending broadcasts and refresh the cache if it is due.
    ///
    /// A failed refresh empties the cache and is reported in [`ClientTick::poll_error`].
    pub fn tick(&mut self, now: Instant) -> ClientTick {
        let events = self.drain_events();
        if events.contains(&BrokerEvent::DragSessionEnded) {
            self.cache.clear();
        }
        let mut poll_error = None;
        if self.cache.is_stale(now) {
            if let Err(err) = self.refresh(now) {
                if !err.is_expected() {
                    log::warn!("drag client {}: session poll failed: {err}", self.window);
                }
                self.cache.store(None, now);
                poll_error = Some(err);
            }
        }
        ClientTick { events, poll_error }
    }

    pub fn drain_events(&mut self) -> Vec<BrokerEvent> {
        std::iter::from_fn(|| self.transport.poll_event()).collect()
    }

    /// Fetch the session now, bypassing (and then updating) the cache.
    pub fn refresh(&mut self, now: Instant) -> Result<Option<DragSession>, DragError> {
        let session = match self.transport.request(Request::GetDragSession)? {
            Some(ResponseData::Session(session)) => session,
            other => return Err(unexpected("GET_DRAG_SESSION", other.as_ref())),
        };
        self.cache.store(session.clone(), now);
        Ok(session.filter(DragSession::is_active))
    }

    /// The pointer entered this window's tree surface.
    ///
    /// Returns the session if this window just took it over from another one.
    pub fn on_pointer_enter(&mut self, now: Instant) -> Result<Option<DragSession>, DragError> {
        let Some(session) = self.refresh(now)? else {
            return Ok(None);
        };
        if session.is_owned_by(self.window) {
            return Ok(None);
        }

        let claimed = match self.transport.request(Request::BeginCrossWindowMove {
            target_window_id: self.window,
            expected_current_window_id: Some(session.current_window_id),
        })? {
            Some(ResponseData::Session(Some(session))) => session,
            other => return Err(unexpected("BEGIN_CROSS_WINDOW_MOVE", other.as_ref())),
        };
        self.cache.store(Some(claimed.clone()), now);
        Ok(Some(claimed))
    }

    /// The pointer moved over this window. Sends at most one hover notification per change of
    /// the recorded hover window.
    pub fn on_pointer_move(&mut self) -> Result<(), DragError> {
        let window = self.window;
        let Some(session) = self.cache.get() else {
            return Ok(());
        };
        if session.source_window_id == window || session.current_hover_window_id == Some(window) {
            return Ok(());
        }
        let key = (session.session_id, session.current_hover_window_id);
        if self.hover_notified == Some(key) {
            return Ok(());
        }

        self.transport
            .request(Request::NotifyTreeViewHover { window_id: window })?;
        self.hover_notified = Some(key);
        if let Some(session) = self.cache.get_mut() {
            session.current_hover_window_id = Some(window);
        }
        Ok(())
    }

    pub fn set_session(
        &mut self,
        item_id: ItemId,
        snapshot: TreeSnapshot,
    ) -> Result<(), DragError> {
        self.transport.request(Request::SetDragState {
            item_id,
            snapshot,
            source_window_id: self.window,
        })?;
        self.hover_notified = None;
        Ok(())
    }

    pub fn clear_session(&mut self) -> Result<(), DragError> {
        self.cache.clear();
        self.hover_notified = None;
        self.transport.request(Request::ClearDragState)?;
        Ok(())
    }

    pub fn set_outside_tree(&mut self, outside: bool) -> Result<(), DragError> {
        self.transport.request(Request::SetOutsideTree { outside })?;
        if let Some(session) = self.cache.get_mut() {
            session.is_outside_tree = outside;
        }
        Ok(())
    }

    /// Simple variant of [`Self::refresh`] that does not touch the cache.
    pub fn drag_state(&mut self) -> Result<Option<super::session::DragState>, DragError> {
        match self.transport.request(Request::GetDragState)? {
            Some(ResponseData::DragState(state)) => Ok(state),
            other => Err(unexpected("GET_DRAG_STATE", other.as_ref())),
        }
    }

    pub fn move_tab_to_window(
        &mut self,
        item_id: ItemId,
        window_id: WindowId,
    ) -> Result<(), DragError> {
        self.transport
            .request(Request::MoveTabToWindow { item_id, window_id })?;
        Ok(())
    }

    pub fn move_subtree_to_window(
        &mut self,
        item_id: ItemId,
        window_id: WindowId,
    ) -> Result<(), DragError> {
        self.transport
            .request(Request::MoveSubtreeToWindow { item_id, window_id })?;
        Ok(())
    }

    pub fn create_window_with_tab(&mut self, item_id: ItemId) -> Result<WindowId, DragError> {
        match self.transport.request(Request::CreateWindowWithTab { item_id })? {
            Some(ResponseData::Window(window)) => Ok(window),
            other => Err(unexpected("CREATE_WINDOW_WITH_TAB", other.as_ref())),
        }
    }

    pub fn create_window_with_subtree(
        &mut self,
        item_id: ItemId,
        source_window_id: Option<WindowId>,
    ) -> Result<WindowId, DragError> {
        match self.transport.request(Request::CreateWindowWithSubtree {
            item_id,
            source_window_id,
        })? {
            Some(ResponseData::Window(window)) => Ok(window),
            other => Err(unexpected("CREATE_WINDOW_WITH_SUBTREE", other.as_ref())),
        }
    }
}

fn unexpected(kind: &str, data: Option<&ResponseData>) -> DragError {
    DragError::TransportUnreachable(format!("unexpected answer to {kind}: {data:?}"))
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use super::*;
    use crate::tab_dnd::session::DragSessionState;
    use crate::tab_dnd::types::TabId;

    /// Scripted transport: answers from a queue and records every request.
    #[derive(Default)]
    struct Scripted {
        answers: VecDeque<Result<Option<ResponseData>, DragError>>,
        sent: Vec<Request>,
        events: VecDeque<BrokerEvent>,
    }

    impl BrokerTransport for Scripted {
        fn request(&mut self, request: Request) -> Result<Option<ResponseData>, DragError> {
            self.sent.push(request);
            self.answers
                .pop_front()
                .unwrap_or(Err(DragError::TransportUnreachable("script exhausted".to_owned())))
        }

        fn poll_event(&mut self) -> Option<BrokerEvent> {
            self.events.pop_front()
        }
    }

    fn session(source: u64, current: u64) -> DragSession {
        DragSession {
            session_id: SessionId(1),
            item_id: ItemId(5),
            state: DragSessionState::DraggingLocal,
            source_window_id: WindowId(source),
            current_window_id: WindowId(current),
            started_at: 0,
            updated_at: 0,
            tree_snapshot: TreeSnapshot {
                item_id: ItemId(5),
                tab_id: TabId(50),
                title: "dragged".to_owned(),
                children: Vec::new(),
            },
            is_locked: false,
            is_outside_tree: false,
            current_hover_window_id: None,
        }
    }

    fn client(answers: Vec<Result<Option<ResponseData>, DragError>>) -> BrokerClient<Scripted> {
        let transport = Scripted {
            answers: answers.into(),
            ..Default::default()
        };
        BrokerClient::new(WindowId(2), transport, Duration::from_millis(100))
    }

    #[test]
    fn polls_once_per_interval() {
        let t0 = Instant::now();
        let mut client = client(vec![
            Ok(Some(ResponseData::Session(Some(session(1, 1))))),
            Ok(Some(ResponseData::Session(None))),
        ]);

        client.tick(t0);
        client.tick(t0 + Duration::from_millis(40));
        client.tick(t0 + Duration::from_millis(99));
        assert_eq!(client.transport.sent.len(), 1);
        assert!(client.cached().is_some());

        client.tick(t0 + Duration::from_millis(100));
        assert_eq!(client.transport.sent.len(), 2);
        assert!(client.cached().is_none());
    }

    #[test]
    fn unreachable_broker_empties_the_cache() {
        let t0 = Instant::now();
        let mut client = client(vec![Ok(Some(ResponseData::Session(Some(session(1, 1)))))]);
        assert_eq!(client.tick(t0).poll_error, None);
        assert!(client.cached().is_some());
        let tick = client.tick(t0 + Duration::from_millis(150));
        assert!(matches!(
            tick.poll_error,
            Some(DragError::TransportUnreachable(_))
        ));
        assert!(client.cached().is_none());
    }

    #[test]
    fn session_ended_broadcast_clears_cache_before_next_poll() {
        let t0 = Instant::now();
        let mut client = client(vec![Ok(Some(ResponseData::Session(Some(session(1, 1)))))]);
        client.tick(t0);
        client.transport.events.push_back(BrokerEvent::DragSessionEnded);
        let tick = client.tick(t0 + Duration::from_millis(10));
        assert_eq!(tick.events, vec![BrokerEvent::DragSessionEnded]);
        assert!(client.cached().is_none());
    }

    #[test]
    fn enter_claims_a_foreign_session() {
        let mut claimed = session(1, 2);
        claimed.state = DragSessionState::DraggingRemote;
        let mut client = client(vec![
            Ok(Some(ResponseData::Session(Some(session(1, 1))))),
            Ok(Some(ResponseData::Session(Some(claimed.clone())))),
        ]);

        let result = client.on_pointer_enter(Instant::now()).unwrap();
        assert_eq!(result, Some(claimed));
        assert_eq!(
            client.transport.sent[1],
            Request::BeginCrossWindowMove {
                target_window_id: WindowId(2),
                expected_current_window_id: Some(WindowId(1)),
            }
        );
        assert!(client.cached().is_some_and(|s| s.is_owned_by(WindowId(2))));
    }

    #[test]
    fn enter_without_session_sends_no_claim() {
        let mut client = client(vec![Ok(Some(ResponseData::Session(None)))]);
        assert_eq!(client.on_pointer_enter(Instant::now()).unwrap(), None);
        assert_eq!(client.transport.sent, vec![Request::GetDragSession]);
    }

    #[test]
    fn enter_of_owning_window_sends_no_claim() {
        let mut client = client(vec![Ok(Some(ResponseData::Session(Some(session(1, 2)))))]);
        assert_eq!(client.on_pointer_enter(Instant::now()).unwrap(), None);
        assert_eq!(client.transport.sent.len(), 1);
    }

    #[test]
    fn lock_conflict_surfaces_from_enter() {
        let mut client = client(vec![
            Ok(Some(ResponseData::Session(Some(session(1, 1))))),
            Err(DragError::LockConflict),
        ]);
        assert_eq!(
            client.on_pointer_enter(Instant::now()),
            Err(DragError::LockConflict)
        );
    }

    #[test]
    fn hover_is_notified_once_until_it_changes() {
        let t0 = Instant::now();
        let mut client = client(vec![
            Ok(Some(ResponseData::Session(Some(session(1, 1))))),
            Ok(None),
        ]);
        client.tick(t0);

        client.on_pointer_move().unwrap();
        client.on_pointer_move().unwrap();
        client.on_pointer_move().unwrap();
        let hovers = client
            .transport
            .sent
            .iter()
            .filter(|r| matches!(r, Request::NotifyTreeViewHover { .. }))
            .count();
        assert_eq!(hovers, 1);

        // Another window took the hover; the next move here notifies again.
        let mut elsewhere = session(1, 1);
        elsewhere.current_hover_window_id = Some(WindowId(3));
        client
            .transport
            .answers
            .push_back(Ok(Some(ResponseData::Session(Some(elsewhere)))));
        client.transport.answers.push_back(Ok(None));
        client.tick(t0 + Duration::from_millis(100));
        client.on_pointer_move().unwrap();
        client.on_pointer_move().unwrap();
        let hovers = client
            .transport
            .sent
            .iter()
            .filter(|r| matches!(r, Request::NotifyTreeViewHover { .. }))
            .count();
        assert_eq!(hovers, 2);
    }

    #[test]
    fn failed_hover_notification_is_retried() {
        let mut client = client(vec![
            Ok(Some(ResponseData::Session(Some(session(1, 1))))),
            Err(DragError::TransportUnreachable("busy".to_owned())),
            Ok(None),
        ]);
        client.tick(Instant::now());

        assert!(client.on_pointer_move().is_err());
        assert!(client.on_pointer_move().is_ok());
        client.on_pointer_move().unwrap();
        let hovers = client
            .transport
            .sent
            .iter()
            .filter(|r| matches!(r, Request::NotifyTreeViewHover { .. }))
            .count();
        assert_eq!(hovers, 2);
        assert_eq!(
            client.cached().and_then(|s| s.current_hover_window_id),
            Some(WindowId(2))
        );
    }

    #[test]
    fn source_window_never_notifies_hover() {
        let mut client = client(vec![Ok(Some(ResponseData::Session(Some(session(2, 2)))))]);
        client.tick(Instant::now());
        client.on_pointer_move().unwrap();
        assert_eq!(client.transport.sent.len(), 1);
    }
}
