//! Composition root: every collection of a storefront session, wired to one
//! remote, one local store and one configuration.

use crate::clock::{Clock, SystemClock};
use crate::collections::{catalog, orders, profile, wishlist};
use crate::collections::{Catalog, Orders, ProfileStore, Wishlist};
use crate::config::SyncConfig;
use crate::engine::SyncEngine;
use crate::error::Result;
use crate::facade::{Collection, CollectionView};
use crate::local::{CacheKey, LocalStore};
use crate::remote::RemoteStore;
use shopfront_engine::CollectionSchema;
use std::sync::Arc;

/// Identity the storefront runs for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Session {
    Anonymous,
    SignedIn { user_id: String },
}

impl Session {
    pub fn signed_in(user_id: impl Into<String>) -> Self {
        Session::SignedIn {
            user_id: user_id.into(),
        }
    }

    pub fn user_id(&self) -> Option<&str> {
        match self {
            Session::Anonymous => None,
            Session::SignedIn { user_id } => Some(user_id),
        }
    }
}

/// Collections scoped to a signed-in user.
#[derive(Debug, Clone)]
pub struct Account {
    pub orders: Orders,
    pub wishlist: Wishlist,
    pub profile: ProfileStore,
    /// Store-wide orders; empty unless the user is staff.
    pub all_orders: Orders,
}

/// All synchronized collections of one session.
#[derive(Debug, Clone)]
pub struct Storefront {
    session: Session,
    catalog: Catalog,
    account: Option<Account>,
}

impl Storefront {
    /// Start building a storefront for `session`.
    pub fn builder(session: Session) -> StorefrontBuilder {
        StorefrontBuilder {
            session,
            remote: None,
            local: None,
            config: SyncConfig::default(),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Collections of the signed-in user, if any.
    pub fn account(&self) -> Option<&Account> {
        self.account.as_ref()
    }

    fn collections(&self) -> Vec<&Collection> {
        let mut collections = vec![self.catalog.collection()];
        if let Some(account) = &self.account {
            collections.extend([
                account.orders.collection(),
                account.wishlist.collection(),
                account.profile.collection(),
                account.all_orders.collection(),
            ]);
        }
        collections
    }

    /// Start every collection concurrently.
    pub async fn start(&self) {
        futures::future::join_all(self.collections().into_iter().map(Collection::start)).await;
        tracing::info!(session = ?self.session, "storefront started");
    }

    pub fn stop(&self) {
        for collection in self.collections() {
            collection.stop();
        }
    }

    /// Wait until no collection is loading.
    pub async fn wait_until_loaded(&self) {
        futures::future::join_all(
            self.collections()
                .into_iter()
                .map(Collection::wait_until_loaded),
        )
        .await;
    }

    /// Current view of every collection.
    pub fn views(&self) -> Vec<Arc<CollectionView>> {
        self.collections().into_iter().map(Collection::view).collect()
    }

    /// Save every collection to the local store now.
    pub async fn persist(&self) -> Result<()> {
        for collection in self.collections() {
            collection.engine().persist().await?;
        }
        Ok(())
    }

    /// Wait until every issued remote write has completed.
    pub async fn wait_for_writes(&self) {
        for collection in self.collections() {
            collection.engine().wait_for_writes().await;
        }
    }
}

/// Builder for [`Storefront`].
pub struct StorefrontBuilder {
    session: Session,
    remote: Option<Arc<dyn RemoteStore>>,
    local: Option<Arc<dyn LocalStore>>,
    config: SyncConfig,
    clock: Arc<dyn Clock>,
}

impl StorefrontBuilder {
    pub fn remote(mut self, remote: Arc<dyn RemoteStore>) -> Self {
        self.remote = Some(remote);
        self
    }

    pub fn maybe_remote(mut self, remote: Option<Arc<dyn RemoteStore>>) -> Self {
        self.remote = remote;
        self
    }

    pub fn local_store(mut self, store: Arc<dyn LocalStore>) -> Self {
        self.local = Some(store);
        self
    }

    pub fn config(mut self, config: SyncConfig) -> Self {
        self.config = config;
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    fn collection(&self, path: &str, key: CacheKey, schema: CollectionSchema) -> Collection {
        let mut builder = SyncEngine::builder(path)
            .maybe_remote(self.remote.clone())
            .config(self.config.clone())
            .schema(schema)
            .clock(self.clock.clone());
        if let Some(store) = &self.local {
            builder = builder.local_store(store.clone(), key);
        }
        Collection::new(builder.build())
    }

    pub fn build(self) -> Storefront {
        let catalog = Catalog::new(self.collection(
            catalog::COLLECTION,
            CacheKey::shared(catalog::COLLECTION),
            catalog::schema(),
        ));

        let account = self.session.user_id().map(|uid| {
            let orders_path = orders::customer_path(uid);
            let wishlist_path = wishlist::path(uid);
            let profile_path = profile::path(uid);

            Account {
                orders: Orders::customer(
                    self.collection(
                        &orders_path,
                        CacheKey::scoped("orders", uid),
                        orders::schema(&orders_path),
                    ),
                    uid,
                ),
                wishlist: Wishlist::new(self.collection(
                    &wishlist_path,
                    CacheKey::scoped("wishlist", uid),
                    wishlist::schema(&wishlist_path),
                )),
                profile: ProfileStore::new(
                    self.collection(
                        &profile_path,
                        CacheKey::scoped("profile", uid),
                        profile::schema(&profile_path),
                    ),
                    uid,
                    self.remote.clone(),
                    self.config.read_timeout,
                ),
                all_orders: Orders::admin(self.collection(
                    orders::ADMIN_COLLECTION,
                    CacheKey::scoped(orders::ADMIN_CACHE, uid),
                    orders::schema(orders::ADMIN_COLLECTION),
                )),
            }
        });

        Storefront {
            session: self.session,
            catalog,
            account,
        }
    }
}
