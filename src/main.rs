use anyhow::Context;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use event_forms::{
    app,
    cache::FormCache,
    config::{Config, StorageBackend},
    database::Database,
    redis_client::RedisClient,
    store::{CachedEventStore, EventStore, InMemoryEventStore, PgEventStore},
    AppState,
};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

fn init_tracing(config: &Config) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.app.rust_log));

    let registry = tracing_subscriber::registry().with(filter);
    if config.app.log_format == "json" {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn build_store(config: &Config) -> anyhow::Result<Arc<dyn EventStore>> {
    if config.database.backend == StorageBackend::Memory {
        warn!("Using in-memory storage, data is lost on restart");
        return Ok(Arc::new(InMemoryEventStore::new()));
    }

    // Connect to the database
    let db = Database::new(&config.database)
        .await
        .context("Failed to connect to database")?;
    info!("Database connected");

    db.run_migrations()
        .await
        .context("Failed to run migrations")?;

    let pg = PgEventStore::new(db);

    // Redis опционален: без него схемы форм читаются напрямую из БД
    let Some(redis_url) = config.redis.url.as_deref() else {
        return Ok(Arc::new(pg));
    };
    let redis = match RedisClient::new(redis_url).await {
        Ok(redis) => redis,
        Err(e) => {
            warn!("Redis unavailable, form cache disabled: {}", e);
            return Ok(Arc::new(pg));
        }
    };
    if let Err(e) = redis.ping().await {
        warn!("Redis ping failed, form cache disabled: {}", e);
        return Ok(Arc::new(pg));
    }
    info!("Redis connected");

    let cache = FormCache::new(redis, config.redis.form_ttl_seconds);
    Ok(Arc::new(CachedEventStore::new(pg, cache)))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Config::from_env().context("Invalid configuration")?;
    init_tracing(&config);

    info!("Starting EventForm+ API ({})", config.app.environment);

    let store = build_store(&config).await?;
    let state = AppState::new(store, config.clone()).context("Failed to build mailer")?;

    let addr: SocketAddr = format!("{}:{}", config.app.host, config.app.port)
        .parse()
        .context("Invalid HOST/PORT")?;
    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app(state).into_make_service()).await?;
    Ok(())
}
