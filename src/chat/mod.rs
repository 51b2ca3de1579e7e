pub mod blob;
pub mod error;
pub mod event;
pub mod fmt;
pub mod frame;
pub mod groups;
pub mod store;
mod ws;

pub use error::ChatError;
pub use ws::FORBIDDEN_CLOSE;

use axum::{routing::get, Router};

use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/{room_id}/ws", get(ws::room_ws))
}
