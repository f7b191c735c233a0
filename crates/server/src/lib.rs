mod app;
pub mod config;
pub mod metrics;
mod middleware;
pub mod routes;
pub mod sentry;
mod state;
pub mod storage;

use std::env;

pub use app::{Server, build_router};
pub use middleware::version::VERSION_HEADER;
pub use state::AppState;
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::{Layer as _, SubscriberExt},
    util::SubscriberInitExt,
};

pub fn init_tracing() {
    if tracing::dispatcher::has_been_set() {
        return;
    }

    let env_filter = env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=info".to_string());
    let fmt_layer = fmt::layer()
        .json()
        .with_target(false)
        .with_span_events(FmtSpan::CLOSE)
        .boxed();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(env_filter))
        .with(ErrorLayer::default())
        .with(fmt_layer)
        .with(sentry::sentry_layer())
        .init();
}
