use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use pretty_assertions::assert_eq;
use tokio::sync::Notify;

use super::*;
use crate::config::ConflictPolicy;
use crate::error::{Error, Result};
use crate::models::{Quote, QuoteId};
use crate::remote::RemoteGateway;
use crate::state::SyncState;
use crate::store::{MemoryStore, RecordStore};

#[derive(Default)]
struct FakeGateway {
    remote: RefCell<Vec<Quote>>,
    fail_fetch: Cell<bool>,
    fail_push_at: Cell<Option<usize>>,
    push_attempts: RefCell<Vec<Quote>>,
    next_id: Cell<u64>,
    fetches: Cell<usize>,
    fetch_gate: Option<Rc<Notify>>,
    push_gate: Option<Rc<Notify>>,
}

impl FakeGateway {
    fn with_remote(remote: Vec<Quote>) -> Self {
        Self {
            remote: RefCell::new(remote),
            next_id: Cell::new(100),
            ..Self::default()
        }
    }

    fn attempted_texts(&self) -> Vec<String> {
        self.push_attempts
            .borrow()
            .iter()
            .map(|quote| quote.text.clone())
            .collect()
    }
}

impl RemoteGateway for FakeGateway {
    async fn fetch_all(&self) -> Result<Vec<Quote>> {
        self.fetches.set(self.fetches.get() + 1);
        if let Some(gate) = &self.fetch_gate {
            gate.notified().await;
        }
        if self.fail_fetch.get() {
            return Err(Error::Api {
                status: 503,
                message: "unavailable".to_string(),
            });
        }
        Ok(self.remote.borrow().clone())
    }

    async fn push_all(&self, quotes: &[Quote]) -> Result<Vec<Quote>> {
        if let Some(gate) = &self.push_gate {
            gate.notified().await;
        }

        let mut completed = Vec::new();
        for (index, quote) in quotes.iter().enumerate() {
            self.push_attempts.borrow_mut().push(quote.clone());
            if self.fail_push_at.get() == Some(index) {
                return Err(Error::Push {
                    completed,
                    source: Box::new(Error::Api {
                        status: 500,
                        message: "write failed".to_string(),
                    }),
                });
            }
            let id = self.next_id.get();
            self.next_id.set(id + 1);
            let echo = quote.clone().with_id(QuoteId::new(id));
            self.remote.borrow_mut().push(echo.clone());
            completed.push(echo);
        }
        Ok(completed)
    }
}

type Events = Rc<RefCell<Vec<SyncEvent>>>;

fn engine_with(
    store: MemoryStore,
    gateway: FakeGateway,
    policy: ConflictPolicy,
) -> (SyncEngine<MemoryStore, FakeGateway, impl Fn(&SyncEvent)>, Events) {
    let events: Events = Rc::default();
    let sink = Rc::clone(&events);
    let options = EngineOptions {
        policy,
        ..EngineOptions::default()
    };
    let engine = SyncEngine::new(
        store,
        gateway,
        move |event: &SyncEvent| sink.borrow_mut().push(event.clone()),
        options,
    )
    .unwrap();
    (engine, events)
}

fn quote(text: &str, category: &str) -> Quote {
    Quote {
        id: None,
        text: text.to_string(),
        category: category.to_string(),
        last_updated: None,
    }
}

fn statuses(events: &Events) -> Vec<SyncStatus> {
    events.borrow().iter().map(|event| event.status).collect()
}

fn texts(quotes: &[Quote]) -> Vec<&str> {
    quotes.iter().map(|quote| quote.text.as_str()).collect()
}

#[tokio::test(flavor = "current_thread")]
async fn repeated_cycles_without_changes_are_idempotent() {
    let local = vec![quote("a", "x"), quote("b", "y")];
    let remote = vec![
        quote("a", "x").with_id(QuoteId::new(1)),
        quote("b", "y").with_id(QuoteId::new(2)),
    ];
    let (engine, events) = engine_with(
        MemoryStore::with_quotes(local),
        FakeGateway::with_remote(remote),
        ConflictPolicy::Manual,
    );

    let first = engine.sync_now().await.unwrap();
    let second = engine.sync_now().await.unwrap();

    let SyncOutcome::Synced(first) = first else {
        panic!("expected a completed sync, got {first:?}");
    };
    assert_eq!(second, SyncOutcome::Synced(first.clone()));
    assert_eq!(
        first.iter().map(|quote| quote.id).collect::<Vec<_>>(),
        vec![Some(QuoteId::new(1)), Some(QuoteId::new(2))]
    );
    assert_eq!(
        statuses(&events),
        vec![
            SyncStatus::Syncing,
            SyncStatus::Success,
            SyncStatus::Syncing,
            SyncStatus::Success
        ]
    );
    assert_eq!(engine.state(), SyncState::Idle);
    assert!(engine.last_synced().is_some());
    assert!(engine.gateway().push_attempts.borrow().is_empty());
}

#[tokio::test(flavor = "current_thread")]
async fn differing_collections_enter_conflict() {
    let (engine, events) = engine_with(
        MemoryStore::with_quotes(vec![quote("a", "x")]),
        FakeGateway::with_remote(vec![quote("b", "y")]),
        ConflictPolicy::Manual,
    );

    let outcome = engine.sync_now().await.unwrap();

    let SyncOutcome::Conflict(report) = outcome else {
        panic!("expected a conflict, got {outcome:?}");
    };
    assert_eq!(texts(&report.local_changes), vec!["a"]);
    assert_eq!(texts(&report.server_changes), vec!["b"]);
    assert_eq!(engine.state(), SyncState::Conflict);
    assert_eq!(engine.pending_conflict(), Some(report.clone()));
    assert_eq!(
        statuses(&events),
        vec![SyncStatus::Syncing, SyncStatus::Conflict]
    );

    let conflict_event = events.borrow()[1].clone();
    assert_eq!(conflict_event.local_changes, Some(report.local_changes));
    assert_eq!(conflict_event.server_changes, Some(report.server_changes));
    assert_eq!(conflict_event.data, None);

    assert_eq!(engine.store().write_count(), 0);
    assert_eq!(engine.last_synced(), None);
}

#[tokio::test(flavor = "current_thread")]
async fn triggers_wait_for_conflict_resolution() {
    let (engine, events) = engine_with(
        MemoryStore::with_quotes(vec![quote("a", "x")]),
        FakeGateway::with_remote(vec![quote("b", "y")]),
        ConflictPolicy::Manual,
    );
    engine.sync_now().await.unwrap();

    let outcome = engine.sync_now().await.unwrap();

    assert_eq!(
        outcome,
        SyncOutcome::Skipped(SkipReason::AwaitingResolution)
    );
    assert_eq!(events.borrow().len(), 2);
    assert_eq!(engine.gateway().fetches.get(), 1);
}

#[tokio::test(flavor = "current_thread")]
async fn merge_resolution_unions_by_text_with_local_first() {
    let (engine, events) = engine_with(
        MemoryStore::with_quotes(vec![quote("a", "local"), quote("b", "local")]),
        FakeGateway::with_remote(vec![
            quote("b", "remote").with_id(QuoteId::new(1)),
            quote("c", "remote").with_id(QuoteId::new(2)),
        ]),
        ConflictPolicy::Manual,
    );
    engine.sync_now().await.unwrap();

    let saved = engine.resolve(ResolutionMode::Merge).await.unwrap();

    assert_eq!(texts(&saved), vec!["a", "b", "c"]);
    assert_eq!(saved[1].category, "local");
    assert_eq!(
        saved.iter().map(|quote| quote.id).collect::<Vec<_>>(),
        vec![
            Some(QuoteId::new(100)),
            Some(QuoteId::new(101)),
            Some(QuoteId::new(2))
        ]
    );
    assert_eq!(engine.gateway().attempted_texts(), vec!["a", "b", "c"]);
    assert_eq!(engine.store().load().unwrap(), saved);
    assert_eq!(engine.state(), SyncState::Idle);
    assert_eq!(engine.pending_conflict(), None);
    assert!(engine.last_synced().is_some());
    assert_eq!(
        statuses(&events),
        vec![
            SyncStatus::Syncing,
            SyncStatus::Conflict,
            SyncStatus::Success
        ]
    );
    let sequences = events
        .borrow()
        .iter()
        .map(|event| event.sequence)
        .collect::<Vec<_>>();
    assert_eq!(sequences, vec![1, 2, 3]);
}

#[tokio::test(flavor = "current_thread")]
async fn keep_local_pushes_each_local_record_once() {
    let (engine, _events) = engine_with(
        MemoryStore::with_quotes(vec![quote("a", "x"), quote("b", "x")]),
        FakeGateway::with_remote(vec![quote("c", "y").with_id(QuoteId::new(1))]),
        ConflictPolicy::Manual,
    );
    engine.sync_now().await.unwrap();

    let saved = engine.resolve(ResolutionMode::KeepLocal).await.unwrap();

    assert_eq!(texts(&saved), vec!["a", "b"]);
    assert_eq!(engine.gateway().attempted_texts(), vec!["a", "b"]);
    assert!(saved.iter().all(|quote| quote.text != "c"));
}

#[tokio::test(flavor = "current_thread")]
async fn use_remote_adopts_remote_without_pushing() {
    let old = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let new = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
    let (engine, events) = engine_with(
        MemoryStore::with_quotes(vec![quote("mine", "x")
            .with_id(QuoteId::new(1))
            .with_last_updated(new)]),
        FakeGateway::with_remote(vec![
            quote("theirs", "x")
                .with_id(QuoteId::new(1))
                .with_last_updated(old),
            quote("extra", "y").with_id(QuoteId::new(2)),
        ]),
        ConflictPolicy::Manual,
    );
    engine.sync_now().await.unwrap();

    let saved = engine.resolve(ResolutionMode::UseRemote).await.unwrap();

    assert_eq!(texts(&saved), vec!["theirs", "extra"]);
    assert_eq!(saved[0].last_updated, Some(new));
    assert!(engine.gateway().push_attempts.borrow().is_empty());
    assert_eq!(events.borrow().last().unwrap().status, SyncStatus::Success);
}

#[tokio::test(flavor = "current_thread")]
async fn resolve_without_conflict_is_rejected() {
    let (engine, events) = engine_with(
        MemoryStore::new(),
        FakeGateway::with_remote(Vec::new()),
        ConflictPolicy::Manual,
    );

    let error = engine.resolve(ResolutionMode::Merge).await.unwrap_err();

    assert!(matches!(error, Error::NoPendingConflict));
    assert!(events.borrow().is_empty());
}

#[tokio::test(flavor = "current_thread")]
async fn trigger_during_cycle_is_ignored() {
    let gate = Rc::new(Notify::new());
    let gateway = FakeGateway {
        fetch_gate: Some(Rc::clone(&gate)),
        ..FakeGateway::with_remote(vec![quote("a", "x")])
    };
    let (engine, events) = engine_with(
        MemoryStore::with_quotes(vec![quote("a", "x")]),
        gateway,
        ConflictPolicy::Manual,
    );

    let (first, second) = tokio::join!(engine.sync_now(), async {
        tokio::task::yield_now().await;
        assert_eq!(engine.state(), SyncState::Syncing);
        assert!(engine.is_syncing());
        let before = events.borrow().len();

        let outcome = engine.sync_now().await.unwrap();

        assert_eq!(events.borrow().len(), before);
        gate.notify_one();
        outcome
    });

    assert!(matches!(first.unwrap(), SyncOutcome::Synced(_)));
    assert_eq!(second, SyncOutcome::Skipped(SkipReason::InFlight));
    assert_eq!(
        statuses(&events),
        vec![SyncStatus::Syncing, SyncStatus::Success]
    );
    assert_eq!(engine.gateway().fetches.get(), 1);
    assert!(!engine.is_syncing());
}

#[tokio::test(flavor = "current_thread")]
async fn partial_push_failure_keeps_first_and_skips_rest() {
    let store = MemoryStore::with_quotes(vec![quote("a", "x"), quote("b", "x"), quote("c", "x")]);
    let gateway = FakeGateway::with_remote(Vec::new());
    gateway.fail_push_at.set(Some(1));
    let (engine, events) = engine_with(store, gateway, ConflictPolicy::AutoMerge);

    let error = engine.sync_now().await.unwrap_err();

    let Error::Push { completed, .. } = &error else {
        panic!("expected a push error, got {error:?}");
    };
    assert_eq!(texts(completed), vec!["a"]);
    assert_eq!(engine.gateway().attempted_texts(), vec!["a", "b"]);
    assert_eq!(texts(&engine.gateway().remote.borrow()), vec!["a"]);
    assert_eq!(
        statuses(&events),
        vec![SyncStatus::Syncing, SyncStatus::Error]
    );
    assert_eq!(engine.state(), SyncState::Error);
    assert_eq!(engine.store().write_count(), 0);
    assert!(engine
        .store()
        .load()
        .unwrap()
        .iter()
        .all(|quote| quote.id.is_none()));
    assert_eq!(engine.last_synced(), None);
}

#[tokio::test(flavor = "current_thread")]
async fn fetch_failure_keeps_store_and_last_sync_then_retries() {
    let synced_at = Utc.with_ymd_and_hms(2024, 2, 2, 2, 2, 2).unwrap();
    let store = MemoryStore::with_quotes(vec![quote("a", "x")]);
    store.set_last_synced(synced_at).unwrap();
    let gateway = FakeGateway::with_remote(vec![quote("a", "x")]);
    gateway.fail_fetch.set(true);
    let (engine, events) = engine_with(store, gateway, ConflictPolicy::Manual);

    let error = engine.sync_now().await.unwrap_err();

    assert!(error.is_transport());
    assert_eq!(engine.state(), SyncState::Error);
    assert_eq!(engine.last_synced(), Some(synced_at));
    assert_eq!(engine.store().write_count(), 0);
    assert!(events.borrow()[1].message.contains("unavailable"));

    engine.gateway().fail_fetch.set(false);
    let outcome = engine.sync_now().await.unwrap();

    assert!(matches!(outcome, SyncOutcome::Synced(_)));
    assert!(engine.last_synced() > Some(synced_at));
    assert_eq!(
        statuses(&events),
        vec![
            SyncStatus::Syncing,
            SyncStatus::Error,
            SyncStatus::Syncing,
            SyncStatus::Success
        ]
    );
}

#[tokio::test(flavor = "current_thread")]
async fn failed_resolution_drops_pending_conflict() {
    let (engine, events) = engine_with(
        MemoryStore::with_quotes(vec![quote("a", "x")]),
        FakeGateway::with_remote(vec![quote("b", "y").with_id(QuoteId::new(1))]),
        ConflictPolicy::Manual,
    );
    engine.sync_now().await.unwrap();
    engine.gateway().fail_push_at.set(Some(0));

    let error = engine.resolve(ResolutionMode::KeepLocal).await.unwrap_err();

    assert!(error.is_transport());
    assert_eq!(engine.state(), SyncState::Error);
    assert_eq!(engine.pending_conflict(), None);
    assert_eq!(engine.store().load().unwrap(), vec![quote("a", "x")]);
    assert_eq!(
        statuses(&events),
        vec![
            SyncStatus::Syncing,
            SyncStatus::Conflict,
            SyncStatus::Error
        ]
    );
}

#[tokio::test(flavor = "current_thread")]
async fn auto_merge_pushes_unsynced_and_keeps_newest() {
    let old = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let new = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
    let (engine, events) = engine_with(
        MemoryStore::with_quotes(vec![
            quote("a", "x"),
            quote("b", "x").with_id(QuoteId::new(5)).with_last_updated(new),
        ]),
        FakeGateway::with_remote(vec![
            quote("b-old", "x")
                .with_id(QuoteId::new(5))
                .with_last_updated(old),
            quote("c", "y").with_id(QuoteId::new(6)),
        ]),
        ConflictPolicy::AutoMerge,
    );

    let outcome = engine.sync_now().await.unwrap();

    let SyncOutcome::Synced(saved) = outcome else {
        panic!("expected a completed sync, got {outcome:?}");
    };
    assert_eq!(texts(&saved), vec!["a", "b", "c"]);
    assert_eq!(saved[0].id, Some(QuoteId::new(100)));
    assert_eq!(engine.gateway().attempted_texts(), vec!["a"]);
    assert_eq!(
        statuses(&events),
        vec![SyncStatus::Syncing, SyncStatus::Success]
    );
    assert_eq!(events.borrow()[1].data, Some(saved));
}

#[tokio::test(flavor = "current_thread")]
async fn quotes_added_mid_cycle_survive_the_final_write() {
    let gate = Rc::new(Notify::new());
    let gateway = FakeGateway {
        push_gate: Some(Rc::clone(&gate)),
        ..FakeGateway::with_remote(vec![quote("b", "y").with_id(QuoteId::new(1))])
    };
    let (engine, _events) = engine_with(
        MemoryStore::with_quotes(vec![quote("a", "x")]),
        gateway,
        ConflictPolicy::Manual,
    );
    engine.sync_now().await.unwrap();

    let (saved, ()) = tokio::join!(engine.resolve(ResolutionMode::KeepLocal), async {
        tokio::task::yield_now().await;
        engine
            .store()
            .update(|quotes| {
                quotes.push(quote("late", "z"));
                Ok(())
            })
            .unwrap();
        gate.notify_one();
    });

    let saved = saved.unwrap();
    assert_eq!(texts(&saved), vec!["a", "late"]);
    assert_eq!(saved[0].id, Some(QuoteId::new(100)));
    assert_eq!(saved[1].id, None);
    assert_eq!(engine.gateway().attempted_texts(), vec!["a"]);
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn periodic_sync_runs_immediately_then_every_interval() {
    let (engine, events) = engine_with(
        MemoryStore::with_quotes(vec![quote("a", "x")]),
        FakeGateway::with_remote(vec![quote("a", "x")]),
        ConflictPolicy::Manual,
    );
    assert_eq!(engine.options().interval, Duration::from_secs(30));

    engine
        .run_periodic(tokio::time::sleep(Duration::from_secs(65)))
        .await;

    assert_eq!(engine.gateway().fetches.get(), 3);
    assert_eq!(
        statuses(&events),
        [SyncStatus::Syncing, SyncStatus::Success].repeat(3)
    );
}

fn assert_unique_ids(quotes: &[Quote]) {
    let mut seen = std::collections::HashSet::new();
    for id in quotes.iter().filter_map(|quote| quote.id) {
        assert!(seen.insert(id), "id {id} saved twice in {quotes:?}");
    }
}

#[tokio::test(flavor = "current_thread")]
async fn auto_merge_links_a_remote_id_to_one_local_copy() {
    let (engine, _events) = engine_with(
        MemoryStore::with_quotes(vec![quote("a", "x"), quote("a", "x")]),
        FakeGateway::with_remote(vec![quote("a", "x").with_id(QuoteId::new(5))]),
        ConflictPolicy::AutoMerge,
    );

    let outcome = engine.sync_now().await.unwrap();

    let SyncOutcome::Synced(saved) = outcome else {
        panic!("expected a completed sync, got {outcome:?}");
    };
    assert_eq!(
        saved.iter().map(|quote| quote.id).collect::<Vec<_>>(),
        vec![Some(QuoteId::new(5)), Some(QuoteId::new(100))]
    );
    assert_eq!(engine.gateway().attempted_texts(), vec!["a"]);
    assert_unique_ids(&engine.store().load().unwrap());
}

#[tokio::test(flavor = "current_thread")]
async fn auto_merge_keeps_ids_unique_when_local_holds_remote_id() {
    let new = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
    let (engine, _events) = engine_with(
        MemoryStore::with_quotes(vec![
            quote("b", "x").with_id(QuoteId::new(5)).with_last_updated(new),
            quote("a", "x"),
        ]),
        FakeGateway::with_remote(vec![quote("a", "x").with_id(QuoteId::new(5))]),
        ConflictPolicy::AutoMerge,
    );

    engine.sync_now().await.unwrap();

    let saved = engine.store().load().unwrap();
    assert_eq!(texts(&saved), vec!["b", "a"]);
    assert_unique_ids(&saved);
}

#[tokio::test(flavor = "current_thread")]
async fn merge_resolution_gives_edited_remote_copy_a_fresh_id() {
    let (engine, _events) = engine_with(
        MemoryStore::with_quotes(vec![quote("a", "x").with_id(QuoteId::new(1))]),
        FakeGateway::with_remote(vec![quote("a-edited", "x").with_id(QuoteId::new(1))]),
        ConflictPolicy::Manual,
    );
    assert!(matches!(
        engine.sync_now().await.unwrap(),
        SyncOutcome::Conflict(_)
    ));

    let saved = engine.resolve(ResolutionMode::Merge).await.unwrap();

    assert_eq!(texts(&saved), vec!["a", "a-edited"]);
    assert_eq!(
        saved.iter().map(|quote| quote.id).collect::<Vec<_>>(),
        vec![Some(QuoteId::new(1)), Some(QuoteId::new(101))]
    );
    assert_unique_ids(&engine.store().load().unwrap());
}
