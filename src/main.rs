use question_board::{
    AppState, MemoryStore, MongoStore, SessionRegistry, StoreState,
    config::{AppConfig, Env},
    create_router, seed,
};
use std::{path::Path, sync::Arc};
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// main
///
/// Entry point: configuration, logging, store, then the HTTP server.
#[tokio::main]
async fn main() {
    // 1. Configuration & Environment Loading (Fail-Fast)
    dotenv::dotenv().ok();
    let config = AppConfig::load();

    // 2. Logging: RUST_LOG wins, otherwise sensible local defaults.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "question_board=debug,tower_http=info".into());

    // 3. Pretty logs locally, JSON in production for log aggregation.
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

    // 4. Store Initialization
    let store = match &config.mongodb_uri {
        Some(uri) => {
            let mongo = MongoStore::connect(uri, &config.mongodb_database)
                .await
                .expect("FATAL: Failed to connect to MongoDB. Check MONGODB_URI.");
            Arc::new(mongo) as StoreState
        }
        None => {
            // LOCAL-ONLY: no database configured, run on seeded in-memory data.
            tracing::warn!("MONGODB_URI not set, using the in-memory store");
            let memory = Arc::new(MemoryStore::new());
            prime_memory_store(memory.as_ref(), &config.seed_data_dir).await;
            memory as StoreState
        }
    };

    let app_state = AppState {
        store,
        config,
        sessions: SessionRegistry::new(),
    };
    let port = app_state.config.port;

    // 5. Router and Server Startup
    let app = create_router(app_state);

    let listener = TcpListener::bind(("0.0.0.0", port))
        .await
        .expect("FATAL: Failed to bind the HTTP port.");

    tracing::info!("Listening on 0.0.0.0:{}", port);
    tracing::info!("API Documentation (Swagger UI) available at: http://localhost:{}/swagger-ui", port);

    axum::serve(listener, app)
        .await
        .expect("FATAL: HTTP server terminated unexpectedly.");
}

/// Loads the local seed directory into the in-memory store. A missing or broken seed set
/// leaves the store empty; the service still starts.
async fn prime_memory_store(store: &MemoryStore, seed_dir: &str) {
    let dir = Path::new(seed_dir);
    if !dir.is_dir() {
        tracing::warn!(seed_dir, "seed directory not found, the in-memory store starts empty");
        return;
    }

    let loaded = match seed::load_seed_dir(dir) {
        Ok(loaded) => loaded,
        Err(e) => {
            tracing::error!(error = %e, "failed to load seed data");
            return;
        }
    };

    if let Err(e) = seed::apply_seed(store, loaded).await {
        tracing::error!(error = %e, "failed to seed the in-memory store");
    }
}
