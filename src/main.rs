use inside_athletics::{
    AppState,
    auth::{KeySetCache, RemoteKeySource},
    config::{AppConfig, Env},
    create_router,
    models::default_roles,
    repository::{PostgresRepository, RepositoryState},
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// main
///
/// Loads configuration, initializes logging, connects the role graph database,
/// prepares the key set cache and serves the gateway.
#[tokio::main]
async fn main() {
    // 1. Configuration (fail-fast on missing secrets)
    dotenv::dotenv().ok();
    let config = AppConfig::load();

    // 2. Logging: pretty locally, JSON in production. RUST_LOG wins when set.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "inside_athletics=debug,tower_http=info".into());

    match config.env {
        Env::Local => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        Env::Production => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
    }

    tracing::info!("Application starting in {:?} mode", config.env);

    // 3. Database
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.db_url)
        .await
        .expect("FATAL: Failed to connect to Postgres. Check DATABASE_URL.");

    // LOCAL-ONLY: bring the schema up and seed the default roles.
    if config.env == Env::Local {
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .expect("FATAL: Failed to run database migrations.");
    }

    let repo = Arc::new(PostgresRepository::new(pool)) as RepositoryState;

    if config.env == Env::Local {
        for spec in default_roles() {
            match repo.seed_role(&spec).await {
                Ok(role) => tracing::info!(role = %role.name, "default role seeded"),
                Err(e) => tracing::warn!(role = %spec.name, error = %e, "default role not seeded"),
            }
        }
    }

    // 4. Key discovery. The first fetch is attempted eagerly; a failure here is not
    // fatal because the cache retries on the first request that needs a key.
    let source = RemoteKeySource::new(config.jwks_url.clone(), config.jwks_fetch_timeout)
        .expect("FATAL: Failed to build the JWKS HTTP client.");
    tracing::info!(url = %source.url(), "using JWKS endpoint");
    let keys = Arc::new(KeySetCache::new(Arc::new(source)));
    if let Err(e) = keys.refresh().await {
        tracing::warn!(error = %e, "initial key set fetch failed");
    }

    // 5. State, router, server
    let bind_addr = config.bind_addr.clone();
    let app = create_router(AppState::new(repo, keys, config));

    let listener = TcpListener::bind(&bind_addr)
        .await
        .expect("FATAL: Failed to bind HTTP listener. Check BIND_ADDR.");

    tracing::info!("Listening on {}", bind_addr);
    tracing::info!("API Documentation (Swagger UI) available at /docs");

    axum::serve(listener, app)
        .await
        .expect("FATAL: HTTP server terminated unexpectedly.");
}
