mod routes;
mod store;

use std::{str::FromStr, sync::Arc};

use anyhow::Context;
use sqlx::sqlite::SqlitePoolOptions;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;
use tracing_subscriber::EnvFilter;

use doubloon_core::{EntropyRolls, GameConfig, SymbolTable, WagerEngine};
use doubloon_shared::DEFAULT_DATABASE_URL;

use crate::routes::{router, AppState};
use crate::store::SqliteProfileStore;

fn env_or<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .parse()
            .with_context(|| format!("invalid value for {key}: {raw:?}")),
        Err(_) => Ok(default),
    }
}

fn game_config_from_env() -> anyhow::Result<GameConfig> {
    let defaults = GameConfig::default();
    Ok(GameConfig {
        max_stake: env_or("DOUBLOON_MAX_STAKE", defaults.max_stake)?,
        max_spins_per_wager: env_or("DOUBLOON_MAX_SPINS", defaults.max_spins_per_wager)?,
        bonus_spins_per_wild: env_or("DOUBLOON_BONUS_SPINS", defaults.bonus_spins_per_wild)?,
        max_chain_spins: env_or("DOUBLOON_MAX_CHAIN", defaults.max_chain_spins)?,
        boost_cap_percent: env_or("DOUBLOON_BOOST_CAP", defaults.boost_cap_percent)?,
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    let db = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(
            &std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string()),
        )
        .await?;
    let store = SqliteProfileStore::new(db);
    store.migrate().await?;

    let config = game_config_from_env()?;
    info!(?config, "game configuration loaded");
    let engine = WagerEngine::new(
        store,
        SymbolTable::pirate_default(),
        config,
        EntropyRolls::new(),
    );

    let state = Arc::new(AppState {
        engine,
        api_key: std::env::var("API_KEY").unwrap_or_else(|_| "dev-key".into()),
    });

    let app = router(state).layer(
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any),
    );

    let addr = std::env::var("BIND").unwrap_or_else(|_| "127.0.0.1:8080".to_string());
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("listening on {addr}");
    axum::serve(listener, app).await?;
    Ok(())
}
