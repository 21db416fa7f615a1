use forum_engagement::config::Config;
use forum_engagement::database::{create_pool, run_migrations};
use forum_engagement::redis::RedisClient;
use forum_engagement::services::{
    Engine,
    notification_service::{NoopNotifier, Notifier, RedisNotifier},
    ranking_service::Ranker,
};
use forum_engagement::stores::PgStore;
use forum_engagement::{AppState, create_app};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "forum_engagement=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;
    tracing::info!("Configuration loaded successfully");

    // Create database connection pool
    let db = create_pool(&config.database_url).await?;
    tracing::info!("Database connection pool created");

    // Run migrations
    run_migrations(&db).await?;
    tracing::info!("Database migrations completed");

    // Badge notifications go through Redis when it is reachable
    let redis = match RedisClient::new(&config.redis_url).await {
        Ok(client) => {
            tracing::info!("Redis client created");
            Some(Arc::new(client))
        }
        Err(e) => {
            tracing::warn!("Redis unavailable, badge notifications disabled: {}", e);
            None
        }
    };
    let notifier: Arc<dyn Notifier> = match &redis {
        Some(client) => Arc::new(RedisNotifier::new(
            client.clone(),
            config.notification_queue.clone(),
        )),
        None => Arc::new(NoopNotifier),
    };

    let store = Arc::new(PgStore::new(db));
    let engine = Engine::new(
        store,
        notifier,
        Ranker::new(config.hot_gravity)?,
        config.trending_max_limit,
    );

    // Create application state
    let state = AppState {
        engine,
        redis,
        config: Arc::new(config.clone()),
    };

    // Create application
    let app = create_app(state);

    // Create listener
    let listener = TcpListener::bind(format!("{}:{}", config.host, config.port)).await?;
    tracing::info!("Server listening on {}:{}", config.host, config.port);

    // Start server
    axum::serve(listener, app).await?;

    Ok(())
}
