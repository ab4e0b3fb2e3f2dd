//! Sync engine state shared by the core and its front ends.

use serde::{Deserialize, Serialize};

/// Lifecycle state of a sync engine.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncState {
    #[default]
    Idle,
    Syncing,
    Conflict,
    Error,
}

impl SyncState {
    /// Whether a new cycle may start from this state.
    #[must_use]
    pub const fn accepts_trigger(self) -> bool {
        matches!(self, Self::Idle | Self::Error)
    }

    /// Whether the engine may move from `self` to `next`.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Idle | Self::Error, Self::Syncing)
                | (Self::Syncing, Self::Idle | Self::Conflict | Self::Error)
                | (Self::Conflict, Self::Idle | Self::Error)
        )
    }
}
