use axum::Router;

use crate::AppState;

pub mod error;
mod health;
mod images;

pub use images::UPLOAD_FIELD;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(images::router())
        .merge(health::router())
}
