//! # Shopfront Sync
//!
//! Async runtime around [`shopfront_engine`]: one [`SyncEngine`] per
//! collection keeps the visible state of that collection in step with an
//! authoritative [`RemoteStore`] while applying local mutations immediately.
//!
//! - local mutations are visible at once and written to the remote in the
//!   background
//! - every remote snapshot is reconciled with the pending write ledger
//! - the visible state is persisted to a [`LocalStore`] and served from there
//!   on cold start or while the remote is unreachable
//!
//! Consumers use the [`Collection`] facade, which never returns an error:
//! failures turn into `None`/`false` and are recorded as the collection's
//! last error.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use serde_json::json;
//! use shopfront_sync::{CacheKey, Collection, MemoryLocalStore, MemoryRemote, SyncEngine};
//!
//! # async fn demo() {
//! let engine = SyncEngine::builder("products")
//!     .remote(Arc::new(MemoryRemote::new()))
//!     .local_store(Arc::new(MemoryLocalStore::new()), CacheKey::shared("products"))
//!     .build();
//! let products = Collection::new(engine);
//! products.start().await;
//!
//! let fields = json!({"name": "Tee", "price": 20}).as_object().cloned().unwrap();
//! let id = products.create(fields).unwrap();
//! assert!(products.get(&id).is_some());
//! # }
//! ```

pub mod clock;
pub mod collections;
pub mod config;
pub mod deadline;
pub mod engine;
pub mod error;
pub mod facade;
pub mod local;
pub mod remote;
pub mod storefront;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{Config, ConfigError, RetryConfig, SyncConfig, WritePolicy};
pub use engine::{SyncEngine, SyncEngineBuilder};
pub use error::{RemoteError, Result, SyncError};
pub use facade::{Collection, CollectionView};
pub use local::{CacheKey, LocalCache, LocalStore, MemoryLocalStore, SqliteLocalStore};
pub use remote::{MemoryRemote, RemoteStore, SnapshotStream};
pub use storefront::{Account, Session, Storefront, StorefrontBuilder};
