//! Status events delivered to the engine's observer.

use serde::Serialize;

use crate::models::Quote;
use crate::state::SyncState;

/// Status carried by a [`SyncEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    Syncing,
    Success,
    Conflict,
    Error,
}

impl SyncStatus {
    /// Engine state entered when this status is emitted.
    #[must_use]
    pub const fn target_state(self) -> SyncState {
        match self {
            Self::Syncing => SyncState::Syncing,
            Self::Success => SyncState::Idle,
            Self::Conflict => SyncState::Conflict,
            Self::Error => SyncState::Error,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Syncing => "syncing",
            Self::Success => "success",
            Self::Conflict => "conflict",
            Self::Error => "error",
        }
    }
}

/// One state transition, as seen by the observer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncEvent {
    /// Strictly increasing per engine
    pub sequence: u64,
    pub status: SyncStatus,
    pub message: String,
    /// Resolved collection, on success
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Vec<Quote>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_changes: Option<Vec<Quote>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_changes: Option<Vec<Quote>>,
}

/// Receives every transition of a sync engine, synchronously and in order.
pub trait SyncObserver {
    fn on_event(&self, event: &SyncEvent);
}

impl<F> SyncObserver for F
where
    F: Fn(&SyncEvent),
{
    fn on_event(&self, event: &SyncEvent) {
        self(event);
    }
}
