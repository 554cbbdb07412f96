use anyhow::Context;
use fonda_api::{
    app,
    cache::RecordCache,
    state::{AppState, AuthConfig, CartLocks},
    worker,
};
use fonda_core::identity::{HttpIdentityLookup, IdentityLookup, StaticIdentityLookup};
use fonda_order::{CartStore, CustomerRepository, OrderRepository, ProductRepository};
use fonda_store::{
    app_config::Config, ChangeFeed, DbClient, InMemoryStore, MemoryCartStore, RedisCartStore,
    RedisClient, StoreCustomerRepository, StoreOrderRepository, StoreProductRepository,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

type Repositories = (
    Arc<dyn ProductRepository>,
    Arc<dyn OrderRepository>,
    Arc<dyn CustomerRepository>,
);

const CART_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fonda_api=debug,tower_http=debug,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().context("Failed to load config")?;
    tracing::info!("Starting Fonda API on port {}", config.server.port);

    let feed = ChangeFeed::default();
    let (products, orders, customers) = repositories(&config, &feed).await?;

    // Redis backs both carts and rate limiting; without it carts live in memory
    let (carts, redis) = match config.redis.url.as_deref() {
        Some(url) => {
            let client = RedisClient::new(url).await.context("Failed to connect to Redis")?;
            let carts: Arc<dyn CartStore> = Arc::new(RedisCartStore::new(
                client.clone(),
                config.business_rules.cart_ttl_seconds,
            ));
            (carts, Some(Arc::new(client)))
        }
        None => {
            tracing::warn!("No Redis configured: carts are kept in memory, rate limiting is off");
            let ttl = Duration::from_secs(config.business_rules.cart_ttl_seconds);
            let memory = Arc::new(MemoryCartStore::new(ttl));
            memory.spawn_sweeper(CART_SWEEP_INTERVAL.min(ttl).max(Duration::from_secs(1)));
            let carts: Arc<dyn CartStore> = memory;
            (carts, None)
        }
    };

    let identity: Arc<dyn IdentityLookup> = match config.identity.base_url.as_deref() {
        Some(base_url) => Arc::new(HttpIdentityLookup::new(base_url, config.identity.token.clone())),
        None => Arc::new(StaticIdentityLookup::new()),
    };

    if config.auth.admins.is_empty() {
        tracing::warn!("No admin accounts configured: admin routes are unreachable");
    }

    let app_state = AppState {
        products,
        orders,
        customers,
        carts,
        identity,
        redis,
        feed,
        catalog: RecordCache::default(),
        board: RecordCache::default(),
        business_rules: config.business_rules.clone(),
        auth: AuthConfig {
            secret: config.auth.jwt_secret.clone(),
            expiration: config.auth.jwt_expiration_seconds,
            admins: config.auth.admins.clone(),
        },
        cart_locks: CartLocks::default(),
    };

    worker::spawn_cache_sync(app_state.clone());

    let app = app(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;
    Ok(())
}

/// Postgres when a database URL is configured, otherwise one in-memory store
/// behind all three repositories.
async fn repositories(config: &Config, feed: &ChangeFeed) -> anyhow::Result<Repositories> {
    match config.database.url.as_deref() {
        Some(url) => {
            let db = DbClient::connect(url, &config.database)
                .await
                .context("Failed to connect to Postgres")?;
            db.migrate().await?;
            feed.listen_postgres(&db.pool).await?;
            let products: Arc<dyn ProductRepository> = Arc::new(StoreProductRepository::new(db.pool.clone()));
            let orders: Arc<dyn OrderRepository> = Arc::new(StoreOrderRepository::new(db.pool.clone()));
            let customers: Arc<dyn CustomerRepository> = Arc::new(StoreCustomerRepository::new(db.pool));
            Ok((products, orders, customers))
        }
        None => {
            tracing::warn!("No database configured: data is kept in memory only");
            let store = Arc::new(InMemoryStore::new(feed.clone()));
            let products: Arc<dyn ProductRepository> = store.clone();
            let orders: Arc<dyn OrderRepository> = store.clone();
            let customers: Arc<dyn CustomerRepository> = store;
            Ok((products, orders, customers))
        }
    }
}
