use actix_web::{web, App, HttpServer};
use sqlx::postgres::PgPoolOptions;
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use match_service::cache::MatchCache;
use match_service::db::{InteractionRepository, ProfileRepository};
use match_service::handlers::{get_matches, health, track_interaction, MatchHandlerState};
use match_service::services::MatchingEngine;
use match_service::Config;

#[actix_web::main]
async fn main() -> io::Result<()> {
    // Initialize structured logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,actix_web=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::error!("Configuration loading failed: {}", e);
            eprintln!("ERROR: Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    tracing::info!(
        "Starting {} v{}",
        config.service.service_name,
        env!("CARGO_PKG_VERSION")
    );

    // Database pool
    let pool = match PgPoolOptions::new()
        .max_connections(config.database.pool_size)
        .acquire_timeout(Duration::from_secs(5))
        .connect(&config.database.url)
        .await
    {
        Ok(pool) => pool,
        Err(e) => {
            tracing::error!("Failed to connect to Postgres: {}", e);
            std::process::exit(1);
        }
    };

    // Redis-backed match cache
    let cache = match MatchCache::new(&config.redis.url, config.matching.cache_ttl_secs).await {
        Ok(cache) => cache,
        Err(e) => {
            tracing::error!("Failed to connect to Redis: {}", e);
            std::process::exit(1);
        }
    };

    let engine = Arc::new(MatchingEngine::new(
        Arc::new(ProfileRepository::new(pool.clone())),
        Arc::new(InteractionRepository::new(pool)),
        Arc::new(cache),
        config.matching.clone(),
    ));

    let state = web::Data::new(MatchHandlerState { engine });
    let port = config.service.http_port;

    tracing::info!("HTTP server listening on 0.0.0.0:{}", port);

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .service(get_matches)
            .service(track_interaction)
            .service(health)
    })
    .bind(("0.0.0.0", port))?
    .run()
    .await
}
