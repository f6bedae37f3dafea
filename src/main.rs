use std::sync::Arc;

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post},
};
use tower_http::cors::{Any, CorsLayer};
use tracing_subscriber::EnvFilter;

mod api;
mod config;
mod db;
mod error;
mod middleware;
mod models;
mod services;
#[cfg(test)]
mod tests;

use config::{Config, StoreBackend};
use db::{MemoryStore, RedisStore, SessionStore};
use services::{auth_service::AuthService, session_service::SessionAuthority};

#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionAuthority>,
    pub credentials: AuthService,
}

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let protected = Router::new()
        .route("/me", get(api::user::get_current_user))
        .route("/logout", post(api::auth::logout))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::auth_middleware,
        ));

    Router::new()
        .route("/register", post(api::auth::register))
        .route("/login", post(api::auth::login))
        .route("/refresh", post(api::auth::refresh))
        .merge(protected)
        .layer(cors)
        .with_state(state)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = Config::from_env()?;
    tracing::info!(auth = ?config.auth, store = ?config.store_backend, "Configuration loaded");

    let store: Arc<dyn SessionStore> = match config.store_backend {
        StoreBackend::Redis => {
            Arc::new(RedisStore::connect(&config.redis_url, config.store_timeout).await?)
        }
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory session store; sessions are lost on restart");
            Arc::new(MemoryStore::new())
        }
    };

    let pool = db::create_db_pool(&config.database_url).await?;

    let state = AppState {
        sessions: Arc::new(SessionAuthority::new(&config.auth, store)),
        credentials: AuthService::new(pool, bcrypt::DEFAULT_COST),
    };

    let app = create_router(state);

    tracing::info!("listening on {}", config.bind_addr);
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
