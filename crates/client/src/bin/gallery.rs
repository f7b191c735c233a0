use std::{path::PathBuf, time::Duration};

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use gallery_client::{
    ConsoleNotifier, GalleryController, GalleryViewState, HttpGalleryBackend, HttpProber,
    ResolverConfig, SelectedFile, UploadOutcome,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "gallery", about = "Browse and upload to a photo gallery", version)]
struct Args {
    /// Gallery server base URL
    #[arg(long, env = "GALLERY_SERVER_URL", default_value = "http://localhost:5000")]
    server_url: String,

    /// TOML file with fallback bucket URLs and known keys
    #[arg(long)]
    resolver_config: Option<PathBuf>,

    /// Number of columns to lay cards out in
    #[arg(long, default_value_t = GalleryViewState::DEFAULT_COLUMNS)]
    columns: usize,

    /// Seconds to wait for the server to accept an upload
    #[arg(long, default_value_t = 10)]
    upload_timeout_secs: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load the gallery and print its columns
    List,
    /// Upload an image, falling back to a local preview
    Upload { path: PathBuf },
    /// Download an image by name
    Download {
        name: String,
        /// Output path, defaults to the image name
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

type Controller = GalleryController<HttpGalleryBackend, HttpProber, ConsoleNotifier>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let resolver = match &args.resolver_config {
        Some(path) => ResolverConfig::load(path)
            .await
            .with_context(|| format!("failed to read {}", path.display()))?,
        None => ResolverConfig::default(),
    };
    let backend = HttpGalleryBackend::new(&args.server_url)?;
    let mut controller = GalleryController::new(backend, HttpProber::new(), ConsoleNotifier, resolver)
        .with_columns(args.columns)
        .with_upload_timeout(Duration::from_secs(args.upload_timeout_secs));

    match args.command {
        Command::List => {
            controller.load_gallery().await;
            print_view(&controller);
        }
        Command::Upload { path } => {
            let file = SelectedFile::from_path(&path)
                .await
                .with_context(|| format!("failed to read {}", path.display()))?;
            match controller.upload_image(Some(file)).await {
                UploadOutcome::Uploaded(file) => println!("stored as {}", file.name),
                UploadOutcome::Failed(e) => bail!("upload failed: {e}"),
                UploadOutcome::LocalOnly { .. } | UploadOutcome::NoFileSelected => {}
            }
            print_view(&controller);
        }
        Command::Download { name, output } => {
            controller.load_gallery().await;
            let index = controller
                .view()
                .position(&name)
                .with_context(|| format!("no image named {name}"))?;
            let request = controller.download(index)?;
            let bytes = controller.backend().fetch(&request.url).await?;
            let output = output.unwrap_or_else(|| PathBuf::from(&request.file_name));
            tokio::fs::write(&output, &bytes)
                .await
                .with_context(|| format!("failed to write {}", output.display()))?;
            println!("saved {} ({} bytes)", output.display(), bytes.len());
        }
    }

    Ok(())
}

fn print_view(controller: &Controller) {
    for (i, column) in controller.view().columns().iter().enumerate() {
        println!("column {}:", i + 1);
        for card in column {
            let mut line = format!("  {}  {}", card.name, display_url(&card.url));
            if let Some(badge) = card.badge() {
                line.push_str(&format!("  [{badge}]"));
            }
            if card.hidden {
                line.push_str("  (hidden)");
            }
            println!("{line}");
        }
    }
}

fn display_url(url: &str) -> String {
    match url.split_once(',') {
        Some((header, payload)) if url.starts_with("data:") => {
            format!("{header},... ({} chars)", payload.len())
        }
        _ => url.to_string(),
    }
}
