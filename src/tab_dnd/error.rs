use serde::{Deserialize, Serialize};

/// Why a broker request did not go through.
///
/// The first four variants are normal outcomes of contention and are never surfaced to the
/// user; see [`DragError::is_expected`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "message", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DragError {
    /// No drag is in progress.
    SessionAbsent,

    /// Another window's hand-off holds the session lock.
    LockConflict,

    /// The window asking for the session already owns it.
    AlreadyOwned,

    /// A new session was requested while another drag is still in flight.
    SessionActive,

    /// The host could not move or create the item (e.g. it no longer exists).
    HostOperationFailed(String),

    /// The broker could not be reached or did not answer in time.
    TransportUnreachable(String),
}

impl DragError {
    /// Expected under normal use: prevents a hand-off, nothing to report.
    pub fn is_expected(&self) -> bool {
        matches!(
            self,
            Self::SessionAbsent | Self::LockConflict | Self::AlreadyOwned | Self::SessionActive
        )
    }
}

impl std::fmt::Display for DragError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SessionAbsent => write!(f, "no drag session in progress"),
            Self::LockConflict => write!(f, "drag session is locked by another hand-off"),
            Self::AlreadyOwned => write!(f, "drag session is already owned by this window"),
            Self::SessionActive => write!(f, "a drag session is already in progress"),
            Self::HostOperationFailed(err) => write!(f, "host operation failed: {err}"),
            Self::TransportUnreachable(err) => write!(f, "broker unreachable: {err}"),
        }
    }
}

impl std::error::Error for DragError {}

/// Failure reported by a [`super::HostOps`] implementation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HostError(pub String);

impl std::fmt::Display for HostError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for HostError {}

impl From<HostError> for DragError {
    fn from(err: HostError) -> Self {
        Self::HostOperationFailed(err.0)
    }
}

/// A wire message could not be encoded or decoded.
#[derive(Debug)]
pub enum ProtocolError {
    Json(serde_json::Error),
}

impl std::fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Json(err) => write!(f, "json error: {err}"),
        }
    }
}

impl std::error::Error for ProtocolError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Json(err) => Some(err),
        }
    }
}

impl From<serde_json::Error> for ProtocolError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err)
    }
}
