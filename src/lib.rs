pub mod auth;
pub mod chat;
pub mod config;
pub mod db;

use std::sync::Arc;

use axum::Router;
use sqlx::SqlitePool;
use tower_http::cors::CorsLayer;

#[derive(Clone)]
pub struct AppState {
    pub db_pool: SqlitePool,
    pub keys: auth::AuthKeys,
    pub groups: chat::groups::RoomGroups,
    pub blobs: Arc<dyn chat::blob::BlobStore>,
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .nest("/chat", chat::router())
        .with_state(state)
        .layer(CorsLayer::permissive())
}

#[macro_export]
macro_rules! include_res {
    (bytes, $p:expr) => {
        include_bytes!(concat!(env!("CARGO_MANIFEST_DIR"), "/res", $p))
    };
    (str, $p:expr) => {
        include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/res", $p))
    };
}
