//! The sync engine: one reconciliation cycle at a time, on a timer or on demand.

use std::fmt;
use std::future::Future;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::time::MissedTickBehavior;

use super::compare::{
    adopt_remote_ids, adopt_server_ids, carry_forward_timestamps, collections_equivalent,
    concurrent_additions, merge_by_text, merge_newest_by_id, ConflictReport,
};
use super::event::{SyncEvent, SyncObserver, SyncStatus};
use crate::config::{ConflictPolicy, EquivalenceMode, SyncConfig};
use crate::error::{Error, Result};
use crate::models::Quote;
use crate::remote::RemoteGateway;
use crate::state::SyncState;
use crate::store::RecordStore;

/// How a pending conflict should be settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResolutionMode {
    /// Push the local collection and keep it
    KeepLocal,
    /// Replace the local collection with the remote one
    UseRemote,
    /// Union by text, push it and keep it
    Merge,
}

impl ResolutionMode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::KeepLocal => "keep-local",
            Self::UseRemote => "use-remote",
            Self::Merge => "merge",
        }
    }
}

impl fmt::Display for ResolutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResolutionMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "keep-local" | "local" => Ok(Self::KeepLocal),
            "use-remote" | "remote" => Ok(Self::UseRemote),
            "merge" => Ok(Self::Merge),
            other => Err(Error::Validation(format!(
                "unknown resolution mode '{other}' (expected keep-local, use-remote or merge)"
            ))),
        }
    }
}

/// Why a trigger did not start a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Another cycle is still in flight
    InFlight,
    /// A conflict is waiting for [`SyncEngine::resolve`]
    AwaitingResolution,
}

/// Result of a trigger that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    Skipped(SkipReason),
    /// The cycle finished; holds the collection as saved
    Synced(Vec<Quote>),
    Conflict(ConflictReport),
}

/// Engine tuning, usually taken from [`SyncConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineOptions {
    pub policy: ConflictPolicy,
    pub equivalence: EquivalenceMode,
    pub interval: Duration,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self::from(&SyncConfig::default())
    }
}

impl From<&SyncConfig> for EngineOptions {
    fn from(config: &SyncConfig) -> Self {
        Self {
            policy: config.policy,
            equivalence: config.equivalence,
            interval: config.interval(),
        }
    }
}

#[derive(Debug, Default)]
struct EngineInner {
    state: SyncState,
    sequence: u64,
    last_synced: Option<DateTime<Utc>>,
    pending: Option<PendingConflict>,
}

#[derive(Debug, Clone)]
struct PendingConflict {
    remote: Vec<Quote>,
    report: ConflictReport,
}

#[derive(Debug, Default)]
struct EventPayload {
    data: Option<Vec<Quote>>,
    server_changes: Option<Vec<Quote>>,
    local_changes: Option<Vec<Quote>>,
}

/// Clears the in-flight flag when the cycle that set it ends.
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Reconciles a [`RecordStore`] with a [`RemoteGateway`], reporting every
/// state transition to an observer.
pub struct SyncEngine<S, G, O> {
    store: S,
    gateway: G,
    observer: O,
    options: EngineOptions,
    in_flight: AtomicBool,
    inner: Mutex<EngineInner>,
}

impl<S, G, O> SyncEngine<S, G, O>
where
    S: RecordStore,
    G: RemoteGateway,
    O: SyncObserver,
{
    /// Create an idle engine, reading the last sync time from the store.
    pub fn new(store: S, gateway: G, observer: O, options: EngineOptions) -> Result<Self> {
        let last_synced = store.last_synced()?;
        Ok(Self {
            store,
            gateway,
            observer,
            options,
            in_flight: AtomicBool::new(false),
            inner: Mutex::new(EngineInner {
                last_synced,
                ..EngineInner::default()
            }),
        })
    }

    pub const fn store(&self) -> &S {
        &self.store
    }

    pub const fn gateway(&self) -> &G {
        &self.gateway
    }

    pub const fn options(&self) -> &EngineOptions {
        &self.options
    }

    pub fn state(&self) -> SyncState {
        self.lock_inner().state
    }

    pub fn is_syncing(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    pub fn last_synced(&self) -> Option<DateTime<Utc>> {
        self.lock_inner().last_synced
    }

    /// The differences awaiting resolution, if the engine is in conflict.
    pub fn pending_conflict(&self) -> Option<ConflictReport> {
        self.lock_inner()
            .pending
            .as_ref()
            .map(|pending| pending.report.clone())
    }

    /// Run one sync cycle now.
    ///
    /// A trigger arriving while a cycle is in flight, or while a conflict
    /// awaits resolution, is ignored and emits nothing. Failures are reported
    /// to the observer as an `error` event and then returned.
    pub async fn sync_now(&self) -> Result<SyncOutcome> {
        let Some(_flight) = InFlight::acquire(&self.in_flight) else {
            tracing::debug!("Sync already in progress; ignoring trigger");
            return Ok(SyncOutcome::Skipped(SkipReason::InFlight));
        };
        if !self.state().accepts_trigger() {
            tracing::debug!("Sync conflict awaiting resolution; ignoring trigger");
            return Ok(SyncOutcome::Skipped(SkipReason::AwaitingResolution));
        }

        self.emit(
            SyncStatus::Syncing,
            "Connecting to server...".to_string(),
            EventPayload::default(),
        )?;

        match self.run_cycle().await {
            Ok(outcome) => Ok(outcome),
            Err(error) => {
                self.report_failure(&error);
                Err(error)
            }
        }
    }

    /// Settle the pending conflict with `mode` and return the saved collection.
    pub async fn resolve(&self, mode: ResolutionMode) -> Result<Vec<Quote>> {
        let Some(_flight) = InFlight::acquire(&self.in_flight) else {
            return Err(Error::SyncInProgress);
        };
        let remote = {
            let inner = self.lock_inner();
            match (&inner.pending, inner.state) {
                (Some(pending), SyncState::Conflict) => pending.remote.clone(),
                _ => return Err(Error::NoPendingConflict),
            }
        };

        tracing::info!("Resolving sync conflict with {mode}");
        match self.apply_resolution(mode, remote).await {
            Ok(saved) => Ok(saved),
            Err(error) => {
                self.report_failure(&error);
                Err(error)
            }
        }
    }

    /// Sync immediately and then every `interval` until `shutdown` completes.
    ///
    /// Failed cycles are logged and retried on the next tick. A cycle already
    /// running when `shutdown` completes is allowed to finish.
    pub async fn run_periodic<F>(&self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        let mut ticker = tokio::time::interval(self.options.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                () = &mut shutdown => {
                    tracing::info!("Periodic sync stopped");
                    break;
                }
                _ = ticker.tick() => {
                    tracing::debug!(
                        "Sync scheduler tick: interval={}s",
                        self.options.interval.as_secs()
                    );
                    if let Err(error) = self.sync_now().await {
                        tracing::warn!("Scheduled sync failed: {}", error);
                    }
                }
            }
        }
    }

    async fn run_cycle(&self) -> Result<SyncOutcome> {
        let remote = self.gateway.fetch_all().await?;
        let local = self.store.load()?;

        if collections_equivalent(&local, &remote, self.options.equivalence) {
            let mut resolved = local.clone();
            adopt_remote_ids(&mut resolved, &remote);
            let saved = self.commit(&local, resolved, "Sync complete")?;
            return Ok(SyncOutcome::Synced(saved));
        }

        match self.options.policy {
            ConflictPolicy::AutoMerge => {
                let merged = self.auto_merge(&local, &remote).await?;
                let saved = self.commit(&local, merged, "Sync complete (merged)")?;
                Ok(SyncOutcome::Synced(saved))
            }
            ConflictPolicy::Manual => {
                let report = ConflictReport::between(&local, &remote);
                self.lock_inner().pending = Some(PendingConflict {
                    remote,
                    report: report.clone(),
                });
                self.emit(
                    SyncStatus::Conflict,
                    format!(
                        "Data changes detected: {} local, {} remote",
                        report.local_changes.len(),
                        report.server_changes.len()
                    ),
                    EventPayload {
                        server_changes: Some(report.server_changes.clone()),
                        local_changes: Some(report.local_changes.clone()),
                        ..EventPayload::default()
                    },
                )?;
                Ok(SyncOutcome::Conflict(report))
            }
        }
    }

    async fn auto_merge(&self, local: &[Quote], remote: &[Quote]) -> Result<Vec<Quote>> {
        let mut merged = merge_newest_by_id(local, remote);
        let unsynced = merged
            .iter()
            .enumerate()
            .filter(|(_, quote)| quote.id.is_none() && !remote.contains(quote))
            .map(|(index, _)| index)
            .collect::<Vec<_>>();

        if !unsynced.is_empty() {
            let outgoing = unsynced
                .iter()
                .map(|&index| merged[index].clone())
                .collect::<Vec<_>>();
            let echoes = self.gateway.push_all(&outgoing).await?;
            adopt_server_ids(&mut merged, &unsynced, &echoes);
        }

        Ok(merged)
    }

    async fn apply_resolution(&self, mode: ResolutionMode, remote: Vec<Quote>) -> Result<Vec<Quote>> {
        let local = self.store.load()?;

        let resolved = match mode {
            ResolutionMode::KeepLocal => self.push_and_adopt(local.clone()).await?,
            ResolutionMode::UseRemote => remote,
            ResolutionMode::Merge => self.push_and_adopt(merge_by_text(&local, &remote)).await?,
        };

        self.commit(&local, resolved, &format!("Conflict resolved ({mode})"))
    }

    async fn push_and_adopt(&self, mut quotes: Vec<Quote>) -> Result<Vec<Quote>> {
        let echoes = self.gateway.push_all(&quotes).await?;
        let indices = (0..quotes.len()).collect::<Vec<_>>();
        adopt_server_ids(&mut quotes, &indices, &echoes);
        Ok(quotes)
    }

    /// Write `resolved` over the store, keeping records added since `snapshot`
    /// was read, then stamp the sync time and report success.
    fn commit(&self, snapshot: &[Quote], mut resolved: Vec<Quote>, message: &str) -> Result<Vec<Quote>> {
        carry_forward_timestamps(&mut resolved, snapshot);

        let saved = self.store.update(|current| {
            let added = concurrent_additions(current, snapshot);
            if !added.is_empty() {
                tracing::debug!("Keeping {} quote(s) added during sync", added.len());
            }
            *current = resolved;
            current.extend(added);
            Ok(())
        })?;

        let now = Utc::now();
        self.store.set_last_synced(now)?;
        {
            let mut inner = self.lock_inner();
            inner.last_synced = Some(now);
            inner.pending = None;
        }

        tracing::info!("{} with {} quotes", message, saved.len());
        self.emit(
            SyncStatus::Success,
            format!("{message} ({})", now.format("%H:%M:%S")),
            EventPayload {
                data: Some(saved.clone()),
                ..EventPayload::default()
            },
        )?;
        Ok(saved)
    }

    fn report_failure(&self, error: &Error) {
        tracing::warn!("Sync failed: {}", error);
        self.lock_inner().pending = None;
        if let Err(emit_error) = self.emit(
            SyncStatus::Error,
            format!("Sync failed: {error}"),
            EventPayload::default(),
        ) {
            tracing::error!("Could not report sync failure: {}", emit_error);
        }
    }

    /// Move to the state implied by `status` and notify the observer.
    ///
    /// The state check, state change and sequence bump happen under one lock;
    /// the observer runs after it is released.
    fn emit(&self, status: SyncStatus, message: String, payload: EventPayload) -> Result<()> {
        let event = {
            let mut inner = self.lock_inner();
            let next = status.target_state();
            if !inner.state.can_transition_to(next) {
                return Err(Error::InvalidTransition {
                    from: inner.state,
                    to: next,
                });
            }
            inner.state = next;
            inner.sequence += 1;
            SyncEvent {
                sequence: inner.sequence,
                status,
                message,
                data: payload.data,
                server_changes: payload.server_changes,
                local_changes: payload.local_changes,
            }
        };

        self.observer.on_event(&event);
        Ok(())
    }

    fn lock_inner(&self) -> MutexGuard<'_, EngineInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
