//! Integration tests for the synchronization engine.
//!
//! Every test runs against the in-process remote; persistence tests use an
//! in-memory SQLite database.

use async_trait::async_trait;
use serde_json::{json, Value};
use shopfront_engine::{Entity, Fields, StateSource};
use shopfront_sync::{
    CacheKey, Collection, CollectionView, LocalCache, LocalStore, ManualClock, MemoryLocalStore,
    MemoryRemote, RemoteError, RemoteStore, RetryConfig, SqliteLocalStore, SyncConfig,
    SyncEngine, WritePolicy,
};
use std::sync::Arc;
use std::time::Duration;

const PRODUCTS: &str = "products";

fn fields(value: Value) -> Fields {
    value.as_object().cloned().unwrap()
}

fn product(id: &str, price: u64) -> Entity {
    Entity::new(id, fields(json!({"name": id, "price": price})), 1)
}

fn test_config() -> SyncConfig {
    SyncConfig::new()
        .with_read_timeout(Duration::from_millis(500))
        .with_write_timeout(Duration::from_millis(500))
        .with_retry(
            RetryConfig::new()
                .with_initial_delay(Duration::from_millis(10))
                .with_max_delay(Duration::from_millis(50)),
        )
}

fn collection(remote: &Arc<MemoryRemote>, config: SyncConfig) -> Collection {
    Collection::new(
        SyncEngine::builder(PRODUCTS)
            .remote(remote.clone())
            .config(config)
            .build(),
    )
}

async fn wait_for(collection: &Collection, predicate: impl Fn(&CollectionView) -> bool) {
    let mut rx = collection.watch();
    tokio::time::timeout(Duration::from_secs(5), rx.wait_for(|view| predicate(view)))
        .await
        .expect("timed out waiting for view")
        .expect("engine dropped");
}

async fn started(remote: &Arc<MemoryRemote>, config: SyncConfig) -> Collection {
    let products = collection(remote, config);
    products.start().await;
    wait_for(&products, |v| v.source == StateSource::Remote).await;
    products
}

fn price(collection: &Collection, id: &str) -> Option<Value> {
    collection.get(id).map(|e| e.fields["price"].clone())
}

// ============================================================================
// Confirmation scenarios
// ============================================================================

#[tokio::test]
async fn create_is_visible_before_confirmation() {
    let remote = Arc::new(MemoryRemote::new());
    let products = started(&remote, test_config()).await;
    remote.pause();

    let id = products
        .create(fields(json!({"name": "Tee", "price": 20})))
        .unwrap();
    assert_eq!(products.entities()[0].id, id);
    assert_eq!(products.view().pending, 1);

    // The write lands, but no snapshot reports it yet.
    products.engine().wait_for_writes().await;
    assert!(remote.document(PRODUCTS, &id).is_some());
    assert_eq!(products.view().pending, 1);
    assert_eq!(products.entities().len(), 1);
}

#[tokio::test]
async fn confirmation_clears_ledger() {
    let remote = Arc::new(MemoryRemote::new());
    let products = started(&remote, test_config()).await;

    let id = products
        .create(fields(json!({"name": "Tee", "price": 20})))
        .unwrap();
    wait_for(&products, |v| v.pending == 0).await;

    let entities = products.entities();
    assert_eq!(entities.len(), 1);
    assert_eq!(entities[0].id, id);
    // The visible record is the remote one, server timestamps included.
    assert!(entities[0].fields.contains_key("updatedAt"));
}

#[tokio::test]
async fn pending_update_wins_over_stale_snapshot() {
    let remote = Arc::new(MemoryRemote::new());
    remote.seed(PRODUCTS, vec![product("p1", 20)]);
    let products = started(&remote, test_config()).await;

    remote.pause();
    assert!(products.update("p1", &fields(json!({"price": 25}))));
    products.engine().wait_for_writes().await;

    let before = products.view().revision;
    remote.push_snapshot(PRODUCTS, vec![product("p1", 20)]);
    wait_for(&products, |v| v.revision > before).await;
    assert_eq!(price(&products, "p1"), Some(json!(25)));
    assert_eq!(products.view().pending, 1);

    remote.resume();
    wait_for(&products, |v| v.pending == 0).await;
    assert_eq!(price(&products, "p1"), Some(json!(25)));
}

#[tokio::test]
async fn confirmed_entity_follows_remote() {
    let remote = Arc::new(MemoryRemote::new());
    remote.seed(PRODUCTS, vec![product("p1", 20)]);
    let products = started(&remote, test_config()).await;

    assert!(products.update("p1", &fields(json!({"price": 25}))));
    wait_for(&products, |v| v.pending == 0).await;

    // Another client changes the price.
    remote
        .write_document(PRODUCTS, "p1", fields(json!({"price": 30})))
        .await
        .unwrap();
    wait_for(&products, |v| {
        v.get("p1").map(|e| e.fields["price"] == json!(30)) == Some(true)
    })
    .await;
}

#[tokio::test]
async fn delete_stays_hidden_until_confirmed() {
    let remote = Arc::new(MemoryRemote::new());
    remote.seed(PRODUCTS, vec![product("p1", 20), product("p2", 30)]);
    let products = started(&remote, test_config()).await;

    remote.pause();
    assert!(products.delete("p1"));
    assert!(products.get("p1").is_none());

    let before = products.view().revision;
    remote.push_snapshot(PRODUCTS, vec![product("p1", 20), product("p2", 30)]);
    wait_for(&products, |v| v.revision > before).await;
    assert!(products.get("p1").is_none());
    assert_eq!(products.view().pending, 1);

    remote.resume();
    wait_for(&products, |v| v.pending == 0).await;
    assert_eq!(products.view().ids(), vec!["p2"]);
}

#[tokio::test]
async fn writes_to_one_id_land_in_order() {
    let remote = Arc::new(MemoryRemote::new());
    remote.seed(PRODUCTS, vec![product("p1", 0)]);
    remote.set_write_delay(Duration::from_millis(2));
    let products = started(&remote, test_config()).await;

    for price in 1..=20 {
        assert!(products.update("p1", &fields(json!({"price": price}))));
    }
    products.engine().wait_for_writes().await;

    assert_eq!(remote.document(PRODUCTS, "p1").unwrap().fields["price"], 20);
    wait_for(&products, |v| v.pending == 0).await;
    assert_eq!(price(&products, "p1"), Some(json!(20)));
}

// ============================================================================
// Lifecycle
// ============================================================================

#[tokio::test]
async fn no_snapshot_is_processed_after_stop() {
    let remote = Arc::new(MemoryRemote::new());
    let products = started(&remote, test_config()).await;

    products.stop();
    let revision = products.view().revision;
    remote.seed(PRODUCTS, vec![product("p1", 20)]);
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert!(products.get("p1").is_none());
    assert_eq!(products.view().revision, revision);
}

#[tokio::test]
async fn in_flight_writes_survive_stop() {
    let remote = Arc::new(MemoryRemote::new());
    remote.set_write_delay(Duration::from_millis(20));
    let products = started(&remote, test_config()).await;

    let id = products.create(fields(json!({"name": "Tee"}))).unwrap();
    products.stop();
    products.engine().wait_for_writes().await;

    assert!(remote.document(PRODUCTS, &id).is_some());
}

#[tokio::test]
async fn restart_resumes_delivery() {
    let remote = Arc::new(MemoryRemote::new());
    let products = started(&remote, test_config()).await;

    products.stop();
    remote.seed(PRODUCTS, vec![product("p1", 20)]);
    products.start().await;
    wait_for(&products, |v| v.get("p1").is_some()).await;
}

#[tokio::test]
async fn late_first_snapshot_settles_loading() {
    let remote = Arc::new(MemoryRemote::new());
    remote.pause();
    let products = collection(
        &remote,
        test_config().with_read_timeout(Duration::from_millis(30)),
    );

    products.start().await;
    assert!(products.is_loading());
    wait_for(&products, |v| !v.is_loading).await;
    assert_eq!(products.view().source, StateSource::Empty);

    remote.seed(PRODUCTS, vec![product("p1", 20)]);
    remote.resume();
    wait_for(&products, |v| v.source == StateSource::Remote).await;
    assert!(products.get("p1").is_some());
}

#[tokio::test]
async fn stream_failure_resubscribes() {
    let remote = Arc::new(MemoryRemote::new());
    let products = started(&remote, test_config()).await;

    remote.push_error(PRODUCTS, RemoteError::Unavailable("connection reset".into()));
    wait_for(&products, |v| v.last_error.is_some()).await;

    remote.seed(PRODUCTS, vec![product("p1", 20)]);
    wait_for(&products, |v| v.get("p1").is_some()).await;
    assert_eq!(
        products.last_error().as_deref(),
        Some("remote error: remote unavailable: connection reset")
    );
}

#[tokio::test]
async fn permission_denied_is_silent() {
    let remote = Arc::new(MemoryRemote::new());
    remote.deny("orders");
    let orders = Collection::new(
        SyncEngine::builder("orders")
            .remote(remote.clone())
            .config(test_config())
            .build(),
    );

    orders.start().await;
    wait_for(&orders, |v| !v.is_loading).await;
    assert!(orders.entities().is_empty());
    assert!(orders.last_error().is_none());
}

// ============================================================================
// Write failures
// ============================================================================

#[tokio::test]
async fn rollback_reverts_rejected_update() {
    let remote = Arc::new(MemoryRemote::new());
    remote.seed(PRODUCTS, vec![product("p1", 20)]);
    let products = started(
        &remote,
        test_config().with_write_policy(WritePolicy::Rollback),
    )
    .await;

    remote.reject_writes(true);
    assert!(products.update("p1", &fields(json!({"price": 25}))));
    assert_eq!(price(&products, "p1"), Some(json!(25)));

    products.engine().wait_for_writes().await;
    assert_eq!(price(&products, "p1"), Some(json!(20)));
    assert_eq!(products.view().pending, 0);
    assert_eq!(
        products.last_error().as_deref(),
        Some("remote error: write rejected: writes are rejected")
    );
}

#[tokio::test]
async fn rollback_reverts_rejected_create_and_delete() {
    let remote = Arc::new(MemoryRemote::new());
    remote.seed(PRODUCTS, vec![product("p1", 20)]);
    let products = started(
        &remote,
        test_config().with_write_policy(WritePolicy::Rollback),
    )
    .await;

    remote.reject_writes(true);
    let id = products.create(fields(json!({"name": "Tee"}))).unwrap();
    assert!(products.delete("p1"));
    products.engine().wait_for_writes().await;

    assert!(products.get(&id).is_none());
    assert!(products.get("p1").is_some());
    assert_eq!(products.view().pending, 0);
}

#[tokio::test]
async fn write_timeout_counts_as_failure() {
    let remote = Arc::new(MemoryRemote::new());
    remote.seed(PRODUCTS, vec![product("p1", 20)]);
    let products = started(
        &remote,
        test_config()
            .with_write_timeout(Duration::from_millis(20))
            .with_write_policy(WritePolicy::Rollback),
    )
    .await;

    remote.set_write_delay(Duration::from_millis(500));
    assert!(products.update("p1", &fields(json!({"price": 25}))));
    products.engine().wait_for_writes().await;

    assert_eq!(price(&products, "p1"), Some(json!(20)));
    assert_eq!(products.last_error().as_deref(), Some("timed out after 20ms"));
}

#[tokio::test]
async fn keep_optimistic_until_swept() {
    let remote = Arc::new(MemoryRemote::new());
    remote.seed(PRODUCTS, vec![product("p1", 20)]);
    let clock = Arc::new(ManualClock::new(1_000_000));
    let products = Collection::new(
        SyncEngine::builder(PRODUCTS)
            .remote(remote.clone())
            .clock(clock.clone())
            .config(test_config().with_pending_ttl(Some(Duration::from_secs(60))))
            .build(),
    );
    products.start().await;
    wait_for(&products, |v| v.source == StateSource::Remote).await;

    remote.reject_writes(true);
    assert!(products.update("p1", &fields(json!({"price": 25}))));
    products.engine().wait_for_writes().await;

    assert_eq!(price(&products, "p1"), Some(json!(25)));
    assert_eq!(products.view().pending, 1);
    assert!(products.last_error().is_some());
    assert!(products.engine().sweep_now().is_empty());

    clock.advance(61_000);
    assert_eq!(products.engine().sweep_now(), vec!["p1".to_string()]);
    assert_eq!(price(&products, "p1"), Some(json!(20)));
}

// ============================================================================
// Validation and configuration
// ============================================================================

#[tokio::test]
async fn mutations_of_unknown_ids_fail() {
    let remote = Arc::new(MemoryRemote::new());
    let products = started(&remote, test_config()).await;

    assert!(!products.update("missing", &fields(json!({"price": 1}))));
    assert!(!products.delete("missing"));
    assert_eq!(
        products.last_error().as_deref(),
        Some("engine error: entity not found: missing")
    );
    assert_eq!(remote.write_count(), 0);
}

#[tokio::test]
async fn missing_remote_serves_cache_and_refuses_writes() {
    let store = Arc::new(MemoryLocalStore::new());
    let key = CacheKey::shared(PRODUCTS);
    LocalCache::new(store.clone(), key.clone(), PRODUCTS)
        .save(vec![product("p1", 20)], 1)
        .await
        .unwrap();

    let products = Collection::new(
        SyncEngine::builder(PRODUCTS)
            .local_store(store, key)
            .config(test_config())
            .build(),
    );
    products.start().await;

    assert!(!products.is_loading());
    assert_eq!(products.view().ids(), vec!["p1"]);
    assert!(products.create(fields(json!({"name": "x"}))).is_none());
    assert!(!products.update("p1", &fields(json!({"price": 1}))));
    assert!(!products.delete("p1"));
    assert_eq!(products.view().ids(), vec!["p1"]);
    assert_eq!(
        products.last_error().as_deref(),
        Some("remote store is not configured")
    );
}

// ============================================================================
// Local persistence
// ============================================================================

#[tokio::test]
async fn cold_start_from_cache_when_remote_unreachable() {
    let store = Arc::new(SqliteLocalStore::in_memory().await.unwrap());
    let remote = Arc::new(MemoryRemote::new());
    remote.seed(PRODUCTS, vec![product("p1", 20), product("p2", 30)]);

    let first = Collection::new(
        SyncEngine::builder(PRODUCTS)
            .remote(remote.clone())
            .local_store(store.clone(), CacheKey::shared(PRODUCTS))
            .config(test_config())
            .build(),
    );
    first.start().await;
    wait_for(&first, |v| v.source == StateSource::Remote).await;
    first.engine().persist().await.unwrap();
    first.stop();

    remote.set_online(false);
    let second = Collection::new(
        SyncEngine::builder(PRODUCTS)
            .remote(remote.clone())
            .local_store(store, CacheKey::shared(PRODUCTS))
            .config(test_config())
            .build(),
    );
    second.start().await;
    wait_for(&second, |v| !v.is_loading).await;

    let view = second.view();
    assert_eq!(view.source, StateSource::Cache);
    assert_eq!(view.ids(), vec!["p1", "p2"]);
    assert!(view.last_error.is_some());

    // Back online: the resubscription replaces the cached base.
    remote.set_online(true);
    wait_for(&second, |v| v.source == StateSource::Remote).await;
    assert_eq!(second.view().ids(), vec!["p1", "p2"]);
}

/// Local store whose reads take `delay`.
struct SlowLocalStore {
    inner: Arc<MemoryLocalStore>,
    delay: Duration,
}

#[async_trait]
impl LocalStore for SlowLocalStore {
    async fn load_blob(&self, key: &str) -> shopfront_sync::Result<Option<String>> {
        tokio::time::sleep(self.delay).await;
        self.inner.load_blob(key).await
    }

    async fn save_blob(&self, key: &str, value: &str) -> shopfront_sync::Result<()> {
        self.inner.save_blob(key, value).await
    }
}

#[tokio::test]
async fn slow_cache_load_is_bounded_by_read_timeout() {
    let inner = Arc::new(MemoryLocalStore::new());
    let key = CacheKey::shared(PRODUCTS);
    LocalCache::new(inner.clone(), key.clone(), PRODUCTS)
        .save(vec![product("cached", 5)], 1)
        .await
        .unwrap();
    let store = Arc::new(SlowLocalStore {
        inner,
        delay: Duration::from_secs(30),
    });

    let remote = Arc::new(MemoryRemote::new());
    remote.seed(PRODUCTS, vec![product("p1", 20)]);
    remote.set_online(false);

    let products = Collection::new(
        SyncEngine::builder(PRODUCTS)
            .remote(remote.clone())
            .local_store(store, key)
            .config(test_config().with_read_timeout(Duration::from_millis(50)))
            .build(),
    );
    tokio::time::timeout(Duration::from_secs(5), products.start())
        .await
        .expect("start waited for the cache");
    wait_for(&products, |v| !v.is_loading).await;

    let view = products.view();
    assert_eq!(view.source, StateSource::Empty);
    assert!(view.is_empty());

    remote.set_online(true);
    wait_for(&products, |v| v.source == StateSource::Remote).await;
    assert_eq!(products.view().ids(), vec!["p1"]);
}

#[tokio::test]
async fn visible_state_is_persisted_automatically() {
    let store = Arc::new(MemoryLocalStore::new());
    let remote = Arc::new(MemoryRemote::new());
    let key = CacheKey::shared(PRODUCTS);
    let products = Collection::new(
        SyncEngine::builder(PRODUCTS)
            .remote(remote.clone())
            .local_store(store.clone(), key.clone())
            .config(test_config())
            .build(),
    );
    products.start().await;
    wait_for(&products, |v| v.source == StateSource::Remote).await;

    let id = products.create(fields(json!({"name": "Tee"}))).unwrap();
    let cache = LocalCache::new(store.clone(), key, PRODUCTS);
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let cached = cache.load().await.unwrap().unwrap_or_default();
            if cached.iter().any(|e| e.id == id) {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("state was never persisted");
}

#[tokio::test]
async fn cache_never_overrides_remote() {
    let store = Arc::new(MemoryLocalStore::new());
    let key = CacheKey::shared(PRODUCTS);
    LocalCache::new(store.clone(), key.clone(), PRODUCTS)
        .save(vec![product("stale", 1)], 1)
        .await
        .unwrap();

    let remote = Arc::new(MemoryRemote::new());
    remote.seed(PRODUCTS, vec![product("p1", 20)]);
    let products = Collection::new(
        SyncEngine::builder(PRODUCTS)
            .remote(remote.clone())
            .local_store(store.clone(), key)
            .config(test_config())
            .build(),
    );
    products.start().await;
    wait_for(&products, |v| v.source == StateSource::Remote).await;

    assert_eq!(products.view().ids(), vec!["p1"]);
    assert!(store.load_blob("cache/products").await.unwrap().is_some());
}
