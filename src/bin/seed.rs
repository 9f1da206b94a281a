//! Uploads the JSON seed files into MongoDB, replacing the seeded collections.
//!
//! Usage: `seed [DIR]` (defaults to `SEED_DATA_DIR`, then `seed-data`).

use anyhow::Context;
use question_board::{AppConfig, MongoStore, seed};
use std::path::PathBuf;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "question_board=info,seed=info".into()),
        )
        .init();

    let config = AppConfig::load();
    let dir = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(&config.seed_data_dir));

    let uri = config
        .mongodb_uri
        .as_deref()
        .context("MONGODB_URI must be set to seed the database")?;

    let store = MongoStore::connect(uri, &config.mongodb_database)
        .await
        .context("failed to connect to MongoDB")?;

    let loaded = seed::load_seed_dir(&dir)
        .with_context(|| format!("failed to load seed data from {}", dir.display()))?;
    anyhow::ensure!(!loaded.is_empty(), "no seed files found in {}", dir.display());

    let report = seed::apply_seed(&store, loaded).await?;

    for (collection, inserted) in &report {
        println!("✓ {collection}: {inserted} documents");
    }
    println!("Seeding complete. Log in with any seeded user id (e.g. user-001).");

    Ok(())
}
