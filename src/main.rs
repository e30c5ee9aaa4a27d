mod config;
mod db;
mod entities;
mod error;
mod models;
mod repository;
mod routes;
mod store;
mod validation;

use std::sync::Arc;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{config::Config, repository::FilmRepository, store::FilmStore};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub films: FilmRepository,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "info,filmlib=debug,sqlx=warn".to_string()),
        )
        .init();

    let config = Arc::new(Config::from_env()?);

    let db = db::connect_and_migrate(&config).await?;
    let store = FilmStore::new(db);
    if config.seed_sample_films {
        db::seed_sample_films(&store).await?;
    }

    let state = Arc::new(AppState { config: config.clone(), films: FilmRepository::new(store) });

    let app = routes::router(state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)),
    );

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    tracing::info!(addr = %config.addr, prefix = %config.api_prefix, "listening");
    axum::serve(listener, app).await?;

    Ok(())
}
