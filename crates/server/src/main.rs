use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use animerate_core::{
    create_authenticator, load_config, validate_config, AniListMatcher, Authenticator,
    CacheBackend, CatalogMatcher, Config, DiscoveryPipeline, DiscoveryScheduler, FeedSource,
    HttpFeedSource, KvCache, MemoryCache, RedisCache, SqliteTitleStore, TitleLocks, TitleService,
    TitleStore,
};
use animerate_server::{create_router, AppState};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Determine config path
    let config_path = std::env::var("ANIMERATE_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    // Load configuration
    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    // Validate configuration
    validate_config(&config).context("Configuration validation failed")?;

    info!("Configuration loaded successfully");
    info!("Auth method: {:?}", config.auth.method);
    info!("Database path: {:?}", config.database.path);

    // Create authenticator
    let authenticator: Arc<dyn Authenticator> = Arc::from(
        create_authenticator(&config.auth).context("Failed to create authenticator")?,
    );
    info!("Using authenticator: {}", authenticator.method_name());

    // Create SQLite title store
    let store: Arc<dyn TitleStore> = Arc::new(
        SqliteTitleStore::new(&config.database.path).context("Failed to create title store")?,
    );
    info!("Title store initialized");

    let cache = create_cache(&config).await?;

    let titles = Arc::new(TitleService::new(
        Arc::clone(&store),
        Arc::clone(&cache),
        Duration::from_secs(config.cache.title_ttl_secs),
    ));

    let discovery = create_discovery(&config, store, cache, titles.title_locks())?;
    if let Some(scheduler) = &discovery {
        if config.discovery.enabled {
            scheduler.start().await;
        } else {
            info!("Discovery loop disabled, cycles run only on request");
        }
    }

    // Create app state
    let state = Arc::new(AppState::new(
        config.clone(),
        authenticator,
        titles,
        discovery.clone(),
    ));

    // Create router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::new(config.server.host, config.server.port);
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    // Run server with graceful shutdown
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("Server error")?;

    info!("Server shutting down...");
    if let Some(scheduler) = &discovery {
        if scheduler.is_running() {
            info!("Stopping discovery scheduler...");
            scheduler.stop().await;
        }
    }

    Ok(())
}

async fn create_cache(config: &Config) -> Result<Arc<dyn KvCache>> {
    match config.cache.backend {
        CacheBackend::Memory => {
            info!("Using in-memory cache");
            Ok(Arc::new(MemoryCache::new()))
        }
        CacheBackend::Redis => {
            let url = config
                .cache
                .redis_url
                .as_deref()
                .context("cache.redis_url is required for the redis backend")?;
            let cache = RedisCache::connect(url)
                .await
                .context("Failed to connect to Redis")?;
            info!("Using Redis cache");
            Ok(Arc::new(cache))
        }
    }
}

/// Build the discovery scheduler, or `None` when no feed is configured.
fn create_discovery(
    config: &Config,
    store: Arc<dyn TitleStore>,
    cache: Arc<dyn KvCache>,
    title_locks: Arc<TitleLocks>,
) -> Result<Option<Arc<DiscoveryScheduler>>> {
    let discovery = &config.discovery;
    if discovery.feed_url.is_empty() {
        if discovery.enabled {
            warn!("Discovery enabled but no feed_url configured");
        }
        info!("Discovery not configured");
        return Ok(None);
    }

    let feed: Arc<dyn FeedSource> = Arc::new(
        HttpFeedSource::new(
            discovery.feed_url.clone(),
            &discovery.user_agent,
            discovery.request_timeout(),
        )
        .context("Failed to create feed client")?,
    );
    let matcher: Arc<dyn CatalogMatcher> = Arc::new(
        AniListMatcher::new(&config.catalog_search).context("Failed to create catalog matcher")?,
    );
    info!(
        "Discovery feed {} (catalog lookups via {})",
        discovery.feed_url, config.catalog_search.url
    );

    let pipeline = DiscoveryPipeline::new(feed, matcher, store, cache, discovery)
        .with_title_locks(title_locks);
    Ok(Some(Arc::new(DiscoveryScheduler::new(
        Arc::new(pipeline),
        discovery.interval(),
    ))))
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
