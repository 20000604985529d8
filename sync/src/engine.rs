//! Synchronization engine for one collection.
//!
//! The engine owns the [`CollectionState`] of its collection behind a single
//! lock. Every handler (local mutation, snapshot delivery, write completion,
//! sweep) runs to completion under that lock and publishes the next
//! [`CollectionView`] before releasing it. Remote writes run as independent
//! tasks, chained per id so two mutations of the same entity reach the remote
//! in issuance order.

use crate::clock::{Clock, SystemClock};
use crate::config::{SyncConfig, WritePolicy};
use crate::deadline::with_fallback;
use crate::error::{RemoteError, Result, SyncError};
use crate::facade::CollectionView;
use crate::local::{CacheKey, LocalCache, LocalStore};
use crate::remote::RemoteStore;
use dashmap::DashMap;
use futures::{FutureExt, StreamExt};
use parking_lot::Mutex;
use shopfront_engine::{
    CollectionName, CollectionSchema, CollectionState, Entity, EntityId, Fields, Snapshot,
    Timestamp, VolatileFields,
};
use std::fmt;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Everything guarded by the collection lock.
struct EngineState {
    collection: CollectionState,
    is_loading: bool,
    last_error: Option<String>,
    revision: u64,
    /// Bumped on every start and stop; background tasks carry the value
    /// they were spawned with and give up once it moves.
    generation: u64,
    running: bool,
}

#[derive(Default)]
struct Tasks {
    subscription: Option<JoinHandle<()>>,
    sweep: Option<JoinHandle<()>>,
    persister: Option<JoinHandle<()>>,
}

impl Tasks {
    fn abort_stream(&mut self) {
        for task in [self.subscription.take(), self.sweep.take()]
            .into_iter()
            .flatten()
        {
            task.abort();
        }
    }
}

#[derive(Debug, Clone)]
enum WriteOp {
    Put(Entity),
    Delete,
}

struct Inner {
    collection: CollectionName,
    remote: Option<Arc<dyn RemoteStore>>,
    cache: Option<LocalCache>,
    config: SyncConfig,
    volatile: VolatileFields,
    clock: Arc<dyn Clock>,
    state: Mutex<EngineState>,
    view_tx: watch::Sender<Arc<CollectionView>>,
    inflight: DashMap<EntityId, JoinHandle<()>>,
    tasks: Mutex<Tasks>,
}

impl Inner {
    fn publish(&self, state: &mut EngineState) {
        state.revision += 1;
        let view = CollectionView {
            collection: self.collection.clone(),
            entities: state.collection.visible().to_vec(),
            is_loading: state.is_loading,
            last_error: state.last_error.clone(),
            source: state.collection.source(),
            pending: state.collection.ledger().len(),
            revision: state.revision,
        };
        self.view_tx.send_replace(Arc::new(view));
    }

    fn fail(&self, state: &mut EngineState, err: SyncError) -> SyncError {
        tracing::debug!(collection = %self.collection, error = %err, "operation rejected");
        state.last_error = Some(err.to_string());
        self.publish(state);
        err
    }

    fn is_current(state: &EngineState, generation: u64) -> bool {
        state.running && state.generation == generation
    }

    fn apply_snapshot(&self, generation: u64, snapshot: Snapshot) -> bool {
        let mut state = self.state.lock();
        if !Self::is_current(&state, generation) {
            return false;
        }

        let size = snapshot.len();
        let report = state.collection.apply_snapshot(snapshot);
        state.is_loading = false;
        tracing::debug!(
            collection = %self.collection,
            size,
            confirmed = report.confirmed.len() + report.deletions_confirmed.len(),
            overridden = report.overridden.len(),
            pending = report.pending_creates.len() + report.deletions_pending.len(),
            "snapshot applied"
        );
        self.publish(&mut state);
        true
    }

    fn settle_loading(&self, generation: u64) -> bool {
        let mut state = self.state.lock();
        if !Self::is_current(&state, generation) {
            return false;
        }
        if state.is_loading {
            state.is_loading = false;
            self.publish(&mut state);
        }
        true
    }

    fn stream_failed(&self, generation: u64, err: &RemoteError) -> bool {
        let mut state = self.state.lock();
        if !Self::is_current(&state, generation) {
            return false;
        }
        tracing::warn!(collection = %self.collection, error = %err, "subscription failed");
        state.last_error = Some(SyncError::from(err.clone()).to_string());
        state.is_loading = false;
        self.publish(&mut state);
        true
    }

    fn denied(&self, generation: u64) {
        tracing::debug!(collection = %self.collection, "subscription denied, collection is empty");
        self.apply_snapshot(generation, Snapshot::empty());
    }

    fn sweep(&self) -> Vec<EntityId> {
        let Some(ttl) = self.config.pending_ttl else {
            return Vec::new();
        };
        let ttl_ms = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX);
        let cutoff = self.clock.now().saturating_sub(ttl_ms);

        let mut state = self.state.lock();
        let evicted = state.collection.evict_stale(cutoff);
        if !evicted.is_empty() {
            tracing::warn!(
                collection = %self.collection,
                count = evicted.len(),
                "evicted unconfirmed local changes"
            );
            self.publish(&mut state);
        }
        evicted
    }

    fn write_failed(&self, id: &str, op: &WriteOp, err: SyncError) {
        tracing::warn!(
            collection = %self.collection,
            id = %id,
            error = %err,
            "remote write failed"
        );

        let mut state = self.state.lock();
        state.last_error = Some(err.to_string());
        if self.config.write_policy == WritePolicy::Rollback {
            // A newer local mutation of the id supersedes this write.
            let still_pending = match op {
                WriteOp::Put(entity) => state.collection.is_pending_value(entity),
                WriteOp::Delete => state.collection.ledger().is_deleting(id),
            };
            if still_pending && state.collection.revert(id) {
                tracing::info!(
                    collection = %self.collection,
                    id = %id,
                    "rolled back to last snapshot value"
                );
            }
        }
        self.publish(&mut state);
    }

    /// Fields sent to the remote: the full value minus server-managed fields.
    fn outgoing_fields(&self, entity: &Entity) -> Fields {
        entity
            .fields
            .iter()
            .filter(|(name, _)| !self.volatile.contains(name))
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect()
    }

    /// Must be called while holding the state lock.
    fn queue_write(self: &Arc<Self>, remote: Arc<dyn RemoteStore>, id: EntityId, op: WriteOp) {
        self.inflight.retain(|_, handle| !handle.is_finished());
        let previous = self.inflight.remove(&id).map(|(_, handle)| handle);

        let weak = Arc::downgrade(self);
        let collection = self.collection.clone();
        let limit = self.config.write_timeout;
        let payload = match &op {
            WriteOp::Put(entity) => Some(self.outgoing_fields(entity)),
            WriteOp::Delete => None,
        };
        let task_id = id.clone();

        let handle = tokio::spawn(async move {
            if let Some(previous) = previous {
                let _ = previous.await;
            }

            let request = async {
                match payload {
                    Some(fields) => remote.write_document(&collection, &task_id, fields).await,
                    None => remote.delete_document(&collection, &task_id).await,
                }
            };
            let result = match tokio::time::timeout(limit, request).await {
                Ok(result) => result.map_err(SyncError::from),
                Err(_) => Err(SyncError::Timeout(limit)),
            };

            match result {
                Ok(()) => {
                    tracing::debug!(
                        collection = %collection,
                        id = %task_id,
                        "remote write acknowledged"
                    )
                }
                Err(err) => {
                    if let Some(inner) = weak.upgrade() {
                        inner.write_failed(&task_id, &op, err);
                    }
                }
            }
        });
        self.inflight.insert(id, handle);
    }

    fn spawn_persister(&self, cache: LocalCache) {
        let mut tasks = self.tasks.lock();
        if tasks.persister.is_some() {
            return;
        }

        let mut rx = self.view_tx.subscribe();
        let clock = self.clock.clone();
        let collection = self.collection.clone();
        tasks.persister = Some(tokio::spawn(async move {
            let mut saved = rx.borrow_and_update().entities.clone();
            while rx.changed().await.is_ok() {
                let view = rx.borrow_and_update().clone();
                if view.entities == saved {
                    continue;
                }
                match cache.save(view.entities.clone(), clock.now()).await {
                    Ok(()) => {
                        tracing::trace!(
                            collection = %collection,
                            revision = view.revision,
                            "state persisted"
                        );
                        saved = view.entities.clone();
                    }
                    Err(err) => {
                        tracing::warn!(
                            collection = %collection,
                            error = %err,
                            "failed to persist state"
                        )
                    }
                }
            }
        }));
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        let tasks = self.tasks.get_mut();
        tasks.abort_stream();
        if let Some(persister) = tasks.persister.take() {
            persister.abort();
        }
    }
}

async fn run_subscription(weak: Weak<Inner>, remote: Arc<dyn RemoteStore>, generation: u64) {
    let Some((collection, config)) = weak
        .upgrade()
        .map(|inner| (inner.collection.clone(), inner.config.clone()))
    else {
        return;
    };
    let mut attempt = 0u32;

    loop {
        match remote.subscribe(&collection).await {
            Ok(mut stream) => {
                let mut awaiting_first = true;
                loop {
                    let next = if awaiting_first {
                        let first = stream.next().map(Some);
                        match with_fallback(config.read_timeout, first, None).await {
                            Some(next) => next,
                            None => {
                                tracing::info!(
                                    collection = %collection,
                                    "first snapshot is late, serving cached state"
                                );
                                awaiting_first = false;
                                match weak.upgrade() {
                                    Some(inner) if inner.settle_loading(generation) => continue,
                                    _ => return,
                                }
                            }
                        }
                    } else {
                        stream.next().await
                    };

                    let Some(inner) = weak.upgrade() else {
                        return;
                    };
                    match next {
                        Some(Ok(snapshot)) => {
                            awaiting_first = false;
                            attempt = 0;
                            if !inner.apply_snapshot(generation, snapshot) {
                                return;
                            }
                        }
                        Some(Err(err)) if err.is_permission_denied() => {
                            inner.denied(generation);
                            return;
                        }
                        Some(Err(err)) => {
                            if !inner.stream_failed(generation, &err) {
                                return;
                            }
                            break;
                        }
                        None => {
                            let err = RemoteError::Unavailable("subscription closed".into());
                            if !inner.stream_failed(generation, &err) {
                                return;
                            }
                            break;
                        }
                    }
                }
            }
            Err(err) if err.is_permission_denied() => {
                if let Some(inner) = weak.upgrade() {
                    inner.denied(generation);
                }
                return;
            }
            Err(err) => match weak.upgrade() {
                Some(inner) if inner.stream_failed(generation, &err) => {}
                _ => return,
            },
        }

        attempt += 1;
        if !config.retry.allows(attempt) {
            tracing::error!(collection = %collection, attempt, "giving up on subscription");
            return;
        }
        let delay = config.retry.delay_for_attempt(attempt);
        tracing::warn!(collection = %collection, attempt, ?delay, "resubscribing");
        tokio::time::sleep(delay).await;
    }
}

async fn run_sweep(weak: Weak<Inner>, interval: Duration, generation: u64) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker.tick().await;

    loop {
        ticker.tick().await;
        let Some(inner) = weak.upgrade() else {
            return;
        };
        if !Inner::is_current(&inner.state.lock(), generation) {
            return;
        }
        inner.sweep();
    }
}

/// Synchronization engine for one collection. Cheap to clone.
#[derive(Clone)]
pub struct SyncEngine {
    inner: Arc<Inner>,
}

impl SyncEngine {
    /// Start building an engine for `collection`.
    pub fn builder(collection: impl Into<CollectionName>) -> SyncEngineBuilder {
        SyncEngineBuilder::new(collection)
    }

    /// Collection path.
    pub fn collection(&self) -> &str {
        &self.inner.collection
    }

    /// Current time of the engine's clock.
    pub fn now(&self) -> Timestamp {
        self.inner.clock.now()
    }

    /// Key of the local cache blob, if a local store is configured.
    pub fn cache_key(&self) -> Option<&CacheKey> {
        self.inner.cache.as_ref().map(LocalCache::key)
    }

    /// Load the cached state, then open the remote subscription.
    ///
    /// Calling `start` on a running engine does nothing.
    pub async fn start(&self) {
        let inner = &self.inner;
        let generation = {
            let mut state = inner.state.lock();
            if state.running {
                return;
            }
            state.running = true;
            state.generation += 1;
            state.generation
        };
        tracing::info!(collection = %inner.collection, "starting");

        if let Some(cache) = &inner.cache {
            let limit = inner.config.read_timeout;
            match with_fallback(limit, cache.load(), Err(SyncError::Timeout(limit))).await {
                Ok(Some(entities)) => {
                    let count = entities.len();
                    let mut state = inner.state.lock();
                    if state.collection.load_cache(entities) {
                        tracing::debug!(
                            collection = %inner.collection,
                            count,
                            "loaded cached state"
                        );
                        inner.publish(&mut state);
                    }
                }
                Ok(None) => tracing::debug!(collection = %inner.collection, "no cached state"),
                Err(err) => {
                    tracing::warn!(
                        collection = %inner.collection,
                        error = %err,
                        "failed to load cached state"
                    )
                }
            }
            inner.spawn_persister(cache.clone());
        }

        if !Inner::is_current(&inner.state.lock(), generation) {
            return;
        }

        let Some(remote) = inner.remote.clone() else {
            tracing::warn!(
                collection = %inner.collection,
                "remote store not configured, serving cached state"
            );
            let mut state = inner.state.lock();
            state.is_loading = false;
            state.last_error = Some(SyncError::NotConfigured.to_string());
            inner.publish(&mut state);
            return;
        };

        let mut tasks = inner.tasks.lock();
        tasks.subscription = Some(tokio::spawn(run_subscription(
            Arc::downgrade(inner),
            remote,
            generation,
        )));
        if inner.config.pending_ttl.is_some() {
            tasks.sweep = Some(tokio::spawn(run_sweep(
                Arc::downgrade(inner),
                inner.config.sweep_interval,
                generation,
            )));
        }
    }

    /// Close the subscription. No snapshot is processed afterwards;
    /// in-flight writes still complete.
    pub fn stop(&self) {
        {
            let mut state = self.inner.state.lock();
            if !state.running {
                return;
            }
            state.running = false;
            state.generation += 1;
        }
        self.inner.tasks.lock().abort_stream();
        tracing::info!(collection = %self.inner.collection, "stopped");
    }

    /// Create an entity under a generated id.
    pub fn create(&self, fields: Fields) -> Result<EntityId> {
        self.create_with_id(uuid::Uuid::new_v4().to_string(), fields)
    }

    /// Create an entity under `id`. The id must not be visible.
    pub fn create_with_id(&self, id: impl Into<EntityId>, fields: Fields) -> Result<EntityId> {
        let inner = &self.inner;
        let mut state = inner.state.lock();
        let Some(remote) = inner.remote.clone() else {
            return Err(inner.fail(&mut state, SyncError::NotConfigured));
        };

        let now = inner.clock.now();
        let entity = match state.collection.create(id, fields, now).cloned() {
            Ok(entity) => entity,
            Err(err) => return Err(inner.fail(&mut state, err.into())),
        };
        inner.publish(&mut state);
        tracing::debug!(collection = %inner.collection, id = %entity.id, "created");

        let id = entity.id.clone();
        inner.queue_write(remote, id.clone(), WriteOp::Put(entity));
        Ok(id)
    }

    /// Merge `partial` into a visible entity. Returns the new full value.
    pub fn update(&self, id: &str, partial: &Fields) -> Result<Entity> {
        let inner = &self.inner;
        let mut state = inner.state.lock();
        let Some(remote) = inner.remote.clone() else {
            return Err(inner.fail(&mut state, SyncError::NotConfigured));
        };

        let now = inner.clock.now();
        let entity = match state.collection.update(id, partial, now) {
            Ok(entity) => entity,
            Err(err) => return Err(inner.fail(&mut state, err.into())),
        };
        inner.publish(&mut state);
        tracing::debug!(collection = %inner.collection, id = %id, "updated");

        inner.queue_write(remote, id.to_string(), WriteOp::Put(entity.clone()));
        Ok(entity)
    }

    /// Delete a visible entity.
    pub fn delete(&self, id: &str) -> Result<()> {
        let inner = &self.inner;
        let mut state = inner.state.lock();
        let Some(remote) = inner.remote.clone() else {
            return Err(inner.fail(&mut state, SyncError::NotConfigured));
        };

        if let Err(err) = state.collection.delete(id, inner.clock.now()) {
            return Err(inner.fail(&mut state, err.into()));
        }
        inner.publish(&mut state);
        tracing::debug!(collection = %inner.collection, id = %id, "deleted");

        inner.queue_write(remote, id.to_string(), WriteOp::Delete);
        Ok(())
    }

    /// Look up a visible entity.
    pub fn get(&self, id: &str) -> Option<Entity> {
        self.view().get(id).cloned()
    }

    /// Current published view.
    pub fn view(&self) -> Arc<CollectionView> {
        self.inner.view_tx.borrow().clone()
    }

    /// Receiver notified on every publication.
    pub fn watch(&self) -> watch::Receiver<Arc<CollectionView>> {
        self.inner.view_tx.subscribe()
    }

    /// Record a failure detected outside the engine.
    pub fn record_error(&self, message: impl fmt::Display) {
        let mut state = self.inner.state.lock();
        state.last_error = Some(message.to_string());
        self.inner.publish(&mut state);
    }

    /// Evict ledger entries older than the pending TTL now.
    pub fn sweep_now(&self) -> Vec<EntityId> {
        self.inner.sweep()
    }

    /// Wait until every issued remote write has completed.
    pub async fn wait_for_writes(&self) {
        while self
            .inner
            .inflight
            .iter()
            .any(|entry| !entry.value().is_finished())
        {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    /// Save the current visible state to the local store.
    pub async fn persist(&self) -> Result<()> {
        let Some(cache) = &self.inner.cache else {
            return Ok(());
        };
        let entities = self.view().entities.clone();
        cache.save(entities, self.inner.clock.now()).await
    }
}

impl fmt::Debug for SyncEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncEngine")
            .field("collection", &self.inner.collection)
            .field("remote", &self.inner.remote.is_some())
            .field("cache", &self.inner.cache)
            .finish()
    }
}

/// Builder for [`SyncEngine`].
pub struct SyncEngineBuilder {
    collection: CollectionName,
    remote: Option<Arc<dyn RemoteStore>>,
    local: Option<(Arc<dyn LocalStore>, CacheKey)>,
    config: SyncConfig,
    schema: Option<CollectionSchema>,
    volatile: VolatileFields,
    clock: Arc<dyn Clock>,
}

impl SyncEngineBuilder {
    pub fn new(collection: impl Into<CollectionName>) -> Self {
        Self {
            collection: collection.into(),
            remote: None,
            local: None,
            config: SyncConfig::default(),
            schema: None,
            volatile: VolatileFields::default(),
            clock: Arc::new(SystemClock),
        }
    }

    /// Sync against `remote`. Without one, every mutation fails fast.
    pub fn remote(mut self, remote: Arc<dyn RemoteStore>) -> Self {
        self.remote = Some(remote);
        self
    }

    /// Like [`remote`](Self::remote), for an optional remote.
    pub fn maybe_remote(mut self, remote: Option<Arc<dyn RemoteStore>>) -> Self {
        self.remote = remote;
        self
    }

    /// Persist the visible state under `key`.
    pub fn local_store(mut self, store: Arc<dyn LocalStore>, key: CacheKey) -> Self {
        self.local = Some((store, key));
        self
    }

    pub fn config(mut self, config: SyncConfig) -> Self {
        self.config = config;
        self
    }

    pub fn schema(mut self, schema: CollectionSchema) -> Self {
        self.schema = Some(schema);
        self
    }

    pub fn volatile_fields(mut self, volatile: VolatileFields) -> Self {
        self.volatile = volatile;
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn build(self) -> SyncEngine {
        let mut collection = CollectionState::new(self.collection.clone())
            .with_volatile_fields(self.volatile.clone());
        if let Some(schema) = self.schema {
            collection = collection.with_schema(schema);
        }
        let cache = self
            .local
            .map(|(store, key)| LocalCache::new(store, key, self.collection.clone()));
        let initial = CollectionView::initial(self.collection.clone());
        let (view_tx, _) = watch::channel(Arc::new(initial));

        SyncEngine {
            inner: Arc::new(Inner {
                collection: self.collection,
                remote: self.remote,
                cache,
                config: self.config,
                volatile: self.volatile,
                clock: self.clock,
                state: Mutex::new(EngineState {
                    collection,
                    is_loading: true,
                    last_error: None,
                    revision: 0,
                    generation: 0,
                    running: false,
                }),
                view_tx,
                inflight: DashMap::new(),
                tasks: Mutex::new(Tasks::default()),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::remote::MemoryRemote;
    use serde_json::json;

    fn fields(value: serde_json::Value) -> Fields {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn create_is_visible_immediately() {
        let remote = Arc::new(MemoryRemote::new());
        remote.pause();
        let engine = SyncEngine::builder("products").remote(remote.clone()).build();
        engine.start().await;

        let id = engine.create(fields(json!({"name": "Tea"}))).unwrap();
        let view = engine.view();
        assert_eq!(view.ids(), vec![id.as_str()]);
        assert_eq!(view.pending, 1);

        engine.wait_for_writes().await;
        assert!(remote.document("products", &id).is_some());
    }

    #[tokio::test]
    async fn outgoing_fields_skip_volatile() {
        let engine = SyncEngine::builder("products").build();
        let entity = Entity::new(
            "p1",
            fields(json!({"name": "Tea", "updatedAt": 5, "createdAt": 1})),
            5,
        );
        let sent = engine.inner.outgoing_fields(&entity);
        assert_eq!(sent, fields(json!({"name": "Tea"})));
    }

    #[tokio::test]
    async fn missing_remote_fails_fast() {
        let engine = SyncEngine::builder("products").build();
        engine.start().await;

        assert!(matches!(
            engine.create(Fields::new()),
            Err(SyncError::NotConfigured)
        ));
        let view = engine.view();
        assert!(!view.is_loading);
        assert!(view.is_empty());
        assert_eq!(view.last_error.as_deref(), Some("remote store is not configured"));
    }

    #[tokio::test]
    async fn sweep_evicts_old_entries() {
        let remote = Arc::new(MemoryRemote::new());
        remote.pause();
        let clock = Arc::new(ManualClock::new(1_000));
        let engine = SyncEngine::builder("products")
            .remote(remote)
            .clock(clock.clone())
            .config(SyncConfig::new().with_pending_ttl(Some(Duration::from_secs(60))))
            .build();

        engine.create_with_id("p1", Fields::new()).unwrap();
        assert!(engine.sweep_now().is_empty());

        clock.advance(61_000);
        assert_eq!(engine.sweep_now(), vec!["p1".to_string()]);
        assert!(engine.get("p1").is_none());
    }

    #[tokio::test]
    async fn rollback_skips_superseded_write() {
        let remote = Arc::new(MemoryRemote::new());
        remote.pause();
        let engine = SyncEngine::builder("products")
            .remote(remote)
            .config(SyncConfig::new().with_write_policy(WritePolicy::Rollback))
            .build();

        engine.create_with_id("p1", fields(json!({"price": 20}))).unwrap();
        let older = engine.update("p1", &fields(json!({"price": 25}))).unwrap();
        engine.update("p1", &fields(json!({"price": 26}))).unwrap();

        let err = SyncError::from(RemoteError::Rejected("no".into()));
        engine.inner.write_failed("p1", &WriteOp::Put(older), err);
        assert_eq!(engine.get("p1").unwrap().fields["price"], 26);
        assert!(engine.view().last_error.is_some());

        let current = engine.update("p1", &fields(json!({"price": 27}))).unwrap();
        let err = SyncError::from(RemoteError::Rejected("no".into()));
        engine.inner.write_failed("p1", &WriteOp::Put(current), err);
        assert!(engine.get("p1").is_none());
    }

    #[tokio::test]
    async fn revisions_increase() {
        let remote = Arc::new(MemoryRemote::new());
        remote.pause();
        let engine = SyncEngine::builder("products").remote(remote).build();
        let before = engine.view().revision;
        engine.create_with_id("p1", Fields::new()).unwrap();
        engine.update("p1", &fields(json!({"x": 1}))).unwrap();
        assert_eq!(engine.view().revision, before + 2);
    }
}
