use std::sync::mpsc;
use std::time::Duration;

use super::broker::BrokerMessage;
use super::error::DragError;
use super::protocol::{BrokerEvent, Request, ResponseData};
use super::types::WindowId;

/// How a window reaches the broker.
pub trait BrokerTransport {
    /// Send one request and wait (bounded) for its answer.
    fn request(&mut self, request: Request) -> Result<Option<ResponseData>, DragError>;

    /// Next pending broadcast, without blocking.
    fn poll_event(&mut self) -> Option<BrokerEvent>;
}

/// Transport to a broker running on a thread, see [`super::SessionBroker::spawn`].
///
/// Dropping it tells the broker the window is gone.
#[derive(Debug)]
pub struct ChannelTransport {
    window: WindowId,
    tx: mpsc::Sender<BrokerMessage>,
    events: mpsc::Receiver<BrokerEvent>,
    timeout: Duration,
}

impl ChannelTransport {
    pub(super) fn new(
        window: WindowId,
        tx: mpsc::Sender<BrokerMessage>,
        events: mpsc::Receiver<BrokerEvent>,
        timeout: Duration,
    ) -> Self {
        Self {
            window,
            tx,
            events,
            timeout,
        }
    }

    pub fn window(&self) -> WindowId {
        self.window
    }
}

impl std::fmt::Debug for BrokerMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Request { request, .. } => write!(f, "Request({})", request.kind()),
            Self::Subscribe { window, .. } => write!(f, "Subscribe({window})"),
            Self::Shutdown => write!(f, "Shutdown"),
        }
    }
}

impl BrokerTransport for ChannelTransport {
    fn request(&mut self, request: Request) -> Result<Option<ResponseData>, DragError> {
        let (reply_tx, reply_rx) = mpsc::channel();
        self.tx
            .send(BrokerMessage::Request {
                request,
                reply: reply_tx,
            })
            .map_err(|err| DragError::TransportUnreachable(err.to_string()))?;

        match reply_rx.recv_timeout(self.timeout) {
            Ok(response) => response.into_result(),
            Err(mpsc::RecvTimeoutError::Timeout) => Err(DragError::TransportUnreachable(format!(
                "no answer within {:?}",
                self.timeout
            ))),
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                Err(DragError::TransportUnreachable("broker stopped".to_owned()))
            }
        }
    }

    fn poll_event(&mut self) -> Option<BrokerEvent> {
        self.events.try_recv().ok()
    }
}

impl Drop for ChannelTransport {
    fn drop(&mut self) {
        let (reply, _) = mpsc::channel();
        let _ = self.tx.send(BrokerMessage::Request {
            request: Request::WindowClosed {
                window_id: self.window,
            },
            reply,
        });
    }
}
