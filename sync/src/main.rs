//! Shopfront Sync demo.
//!
//! Runs a storefront session against an in-process remote and a SQLite
//! fallback cache, logging what every collection sees.

use serde_json::json;
use shopfront_engine::Entity;
use shopfront_sync::collections::{OrderItem, Product, Profile};
use shopfront_sync::{Config, MemoryRemote, RemoteStore, Session, SqliteLocalStore, Storefront};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn seed_catalog(remote: &MemoryRemote) {
    let products = [
        ("p-tea", "Green tea", 4.5, "tea", 12),
        ("p-mug", "Stoneware mug", 14.0, "kitchen", 3),
        ("p-pot", "Cast iron teapot", 39.9, "kitchen", 0),
    ];
    let entities = products
        .into_iter()
        .filter_map(|(id, name, price, category, stock)| {
            json!({"name": name, "price": price, "category": category, "stock": stock})
                .as_object()
                .cloned()
                .map(|fields| Entity::new(id, fields, 0))
        })
        .collect();
    remote.seed("products", entities);
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "shopfront_sync=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    dotenvy::dotenv().ok();
    let config = Config::from_env()?;

    tracing::info!(url = %config.local_store_url, "opening local store");
    let local = Arc::new(SqliteLocalStore::connect(&config.local_store_url).await?);

    let remote = config.remote_enabled.then(|| {
        let remote = Arc::new(MemoryRemote::new());
        seed_catalog(&remote);
        remote.deny("orders");
        remote
    });
    if remote.is_none() {
        tracing::warn!("remote disabled, serving the local cache only");
    }

    let session = match &config.user_id {
        Some(uid) => Session::signed_in(uid.clone()),
        None => Session::signed_in("demo-user"),
    };
    let storefront = Storefront::builder(session)
        .maybe_remote(remote.clone().map(|r| r as Arc<dyn RemoteStore>))
        .local_store(local)
        .config(config.sync.clone())
        .build();

    storefront.start().await;
    storefront.wait_until_loaded().await;

    let catalog = storefront.catalog();
    for product in catalog.products() {
        tracing::info!(id = %product.id, name = %product.name, price = product.price, "product");
    }

    let added = catalog.add_product(&Product::new("Bamboo whisk", 9.0, "tea").with_stock(5));
    tracing::info!(id = ?added, visible = catalog.products().len(), "added product");

    if let Some(account) = storefront.account() {
        let mut profile = account
            .profile
            .profile()
            .unwrap_or_else(|| Profile::new("Demo customer"));
        profile.loyalty_points += 10;
        account.profile.save_profile(&profile);

        let wishlisted = account.wishlist.toggle("p-mug");
        tracing::info!(wishlisted = ?wishlisted, "toggled wishlist");

        let order = account.orders.place_order(vec![
            OrderItem::new("p-tea", "Green tea", 4.5, 2),
            OrderItem::new("p-mug", "Stoneware mug", 14.0, 1),
        ]);
        tracing::info!(id = ?order, "placed order");

        let role = account.profile.role().await;
        tracing::info!(?role, all_orders = account.all_orders.orders().len(), "session role");
    }

    storefront.wait_for_writes().await;
    for view in storefront.views() {
        tracing::info!(
            collection = %view.collection,
            entities = view.len(),
            pending = view.pending,
            last_error = ?view.last_error,
            "final state"
        );
    }
    storefront.persist().await?;

    storefront.stop();
    Ok(())
}
