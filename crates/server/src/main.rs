use gallery_server::{Server, config::GalleryServerConfig, init_tracing, sentry};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is the normal production case.
    let _ = dotenv::dotenv();

    sentry::init_once();
    init_tracing();

    let config = GalleryServerConfig::from_env()?;
    Server::run(config).await
}
