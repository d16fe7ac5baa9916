mod catalog;
mod config;
mod details;
mod error;
mod models;
mod query;
mod routes;
mod stats;
mod tmdb;

use std::{sync::Arc, time::Duration};

use anyhow::Context;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    catalog::Catalog,
    config::Config,
    details::{FirstSearchResult, MetadataResolver, PersonLocator},
    tmdb::{TmdbApi, TmdbClient},
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub catalog: Arc<Catalog>,
    pub tmdb: Arc<dyn TmdbApi>,
    pub locator: Arc<dyn PersonLocator>,
}

impl AppState {
    pub fn resolver(&self) -> MetadataResolver<'_> {
        MetadataResolver::new(
            self.tmdb.as_ref(),
            self.locator.as_ref(),
            &self.config.tmdb_image_base_url,
            self.config.max_concurrent,
        )
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,reelscope=debug".to_string()),
        )
        .init();

    let config = Arc::new(Config::from_env()?);

    let catalog = Catalog::load(&config.catalog_path).context("loading catalog")?;
    if catalog.is_empty() {
        tracing::warn!(path = %config.catalog_path.display(), "catalog has no rows");
    }
    tracing::info!(movies = catalog.len(), "catalog ready");

    let http = reqwest::Client::builder()
        .user_agent("reelscope/0.1")
        .timeout(Duration::from_secs(config.tmdb_timeout_secs))
        .build()?;

    let tmdb = TmdbClient::new(
        http,
        config.tmdb_api_key.clone(),
        config.tmdb_access_token.clone(),
        config.tmdb_base_url.clone(),
        config.tmdb_rps,
    );

    let state = Arc::new(AppState {
        config: config.clone(),
        catalog: Arc::new(catalog),
        tmdb: Arc::new(tmdb),
        locator: Arc::new(FirstSearchResult),
    });

    let app = routes::router(state)
        .layer(CorsLayer::new().allow_origin(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    tracing::info!(addr = %config.addr, "listening");
    axum::serve(listener, app).await?;

    Ok(())
}
