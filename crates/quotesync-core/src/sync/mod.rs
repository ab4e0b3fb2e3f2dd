//! Synchronization between the local record store and the remote gateway.
//!
//! A cycle fetches the remote collection, compares it with the local one and
//! either saves the outcome or parks in the conflict state until the caller
//! picks a [`ResolutionMode`]. Every transition is reported to a
//! [`SyncObserver`] as a [`SyncEvent`].

mod compare;
mod engine;
mod event;

pub use compare::{
    collections_equivalent, detect_changes, merge_by_text, merge_newest_by_id, ConflictReport,
};
pub use engine::{EngineOptions, ResolutionMode, SkipReason, SyncEngine, SyncOutcome};
pub use event::{SyncEvent, SyncObserver, SyncStatus};

#[cfg(test)]
mod tests;
