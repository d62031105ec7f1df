use std::sync::Arc;

use migration::{Migrator, MigratorTrait};
use sea_orm::Database;

use factionpulse::api::ratelimit::{RateLimitConfig, RateLimiter};
use factionpulse::api::{ApiClient, ApiConfig};
use factionpulse::collector::Collector;
use factionpulse::collector::config::CollectorConfig;
use factionpulse::config::Config;
use factionpulse::data::SnapshotStore;
use factionpulse::error::Error;
use factionpulse::ranking::{RankingCache, RankingConfig};

#[tokio::main]
async fn main() -> Result<(), Error> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env()?;

    let db = Database::connect(&config.database_url).await?;
    Migrator::up(&db, None).await?;

    let limiter = Arc::new(RateLimiter::new(
        RateLimitConfig::default(),
        config.api_keys.clone(),
    ));
    let api = ApiClient::new(
        ApiConfig {
            base_url: config.api_base_url.clone(),
            ..Default::default()
        },
        limiter,
    );

    let store = SnapshotStore::new(db.clone());
    let ranking = RankingCache::new(db, api.clone(), RankingConfig::default());

    let collector = Arc::new(Collector::new(
        store,
        api,
        ranking,
        CollectorConfig {
            retention_days: config.retention_days,
            ..Default::default()
        },
    ));
    collector.start().await?;

    tracing::info!("Engine running, press Ctrl+C to stop");
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "Failed to listen for shutdown signal");
    }

    tracing::info!("Shutdown requested");
    collector.stop().await?;

    Ok(())
}
