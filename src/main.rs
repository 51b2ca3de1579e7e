use std::sync::Arc;

use atelier::{
    AppState, app,
    auth::AuthKeys,
    chat::{blob::DiskBlobStore, groups::RoomGroups},
    config::Config,
    db,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("atelier=info")),
        )
        .init();

    let config = Config::from_env()?;
    let db_pool = db::connect(&config.database_url).await?;
    db::init_schema(&db_pool).await?;

    let state = AppState {
        db_pool,
        keys: AuthKeys::new(config.secret_key.as_bytes()),
        groups: RoomGroups::new(),
        blobs: Arc::new(DiskBlobStore::new(config.media_dir.clone())),
    };

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app(state)).await?;
    Ok(())
}
