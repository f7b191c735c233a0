use std::time::Duration;

use api_types::UploadedFile;
use base64::{Engine as _, engine::general_purpose::STANDARD};
use chrono::{DateTime, Utc};
use tracing::instrument;

use crate::{
    api::{GalleryBackend, SelectedFile},
    error::ClientError,
    indicator::LoadingIndicator,
    notify::Notifier,
    probe::UrlProber,
    resolver::{DirectResolution, ResolverConfig, resolve_direct},
    view::{Card, CardOrigin, GalleryViewState},
};

pub const SELECT_FILE_MESSAGE: &str = "Please select a file!";
pub const UPLOAD_SUCCESS_MESSAGE: &str = "Upload successful!";
pub const LOCAL_ONLY_MESSAGE: &str = "Server upload failed. Image is displayed locally only.";
pub const LOCAL_DOWNLOAD_MESSAGE: &str = "Cannot download local-only images";
pub const BUCKET_UNREACHABLE_DIAGNOSTIC: &str = "Error: Cannot access storage bucket";

const DEFAULT_DOWNLOAD_NAME: &str = "download.jpg";

/// Where the last load found its images.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GallerySource {
    Server,
    DirectStorage { base_url: String },
    /// Neither the server nor any storage base answered.
    Unavailable,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadOutcome {
    pub source: GallerySource,
    pub loaded: usize,
    pub failed: usize,
}

impl LoadOutcome {
    pub fn diagnostic(&self) -> String {
        match self.source {
            GallerySource::Unavailable => BUCKET_UNREACHABLE_DIAGNOSTIC.to_string(),
            _ => format!("{} images loaded", self.loaded),
        }
    }
}

#[derive(Debug)]
pub enum UploadOutcome {
    NoFileSelected,
    Uploaded(UploadedFile),
    /// The server did not store the file; a preview is shown instead.
    LocalOnly { error: ClientError },
    /// Neither the upload nor the local preview worked.
    Failed(ClientError),
}

/// What to fetch when the user downloads a card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    pub url: String,
    pub file_name: String,
}

/// Owns the gallery view and drives it from user actions.
pub struct GalleryController<B, P, N> {
    backend: B,
    prober: P,
    notifier: N,
    resolver: ResolverConfig,
    view: GalleryViewState,
    indicator: LoadingIndicator,
    upload_timeout: Duration,
    url_ttl: chrono::Duration,
}

impl<B, P, N> GalleryController<B, P, N>
where
    B: GalleryBackend,
    P: UrlProber,
    N: Notifier,
{
    pub const DEFAULT_UPLOAD_TIMEOUT: Duration = Duration::from_secs(10);
    pub const DEFAULT_URL_TTL_SECS: i64 = 3600;

    pub fn new(backend: B, prober: P, notifier: N, resolver: ResolverConfig) -> Self {
        Self {
            backend,
            prober,
            notifier,
            resolver,
            view: GalleryViewState::default(),
            indicator: LoadingIndicator::new(),
            upload_timeout: Self::DEFAULT_UPLOAD_TIMEOUT,
            url_ttl: chrono::Duration::seconds(Self::DEFAULT_URL_TTL_SECS),
        }
    }

    pub fn with_columns(mut self, columns: usize) -> Self {
        self.view = GalleryViewState::new(columns);
        self
    }

    pub fn with_upload_timeout(mut self, timeout: Duration) -> Self {
        self.upload_timeout = timeout;
        self
    }

    /// How long listed URLs are trusted before [`needs_refresh`](Self::needs_refresh) fires.
    pub fn with_url_ttl(mut self, ttl: chrono::Duration) -> Self {
        self.url_ttl = ttl;
        self
    }

    pub fn view(&self) -> &GalleryViewState {
        &self.view
    }

    pub fn indicator(&self) -> &LoadingIndicator {
        &self.indicator
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn prober(&self) -> &P {
        &self.prober
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    /// Rebuilds the view from the server, falling back to probing storage.
    ///
    /// Never fails: every step that errors counts as having found nothing.
    #[instrument(name = "gallery.load", skip(self))]
    pub async fn load_gallery(&mut self) -> LoadOutcome {
        let _loading = self.indicator.show();

        match self.backend.list_images().await {
            Ok(records) if !records.is_empty() => {
                let cards: Vec<Card> = records
                    .into_iter()
                    .map(|r| Card::new(r.name, r.url, CardOrigin::Server))
                    .collect();
                let outcome = LoadOutcome {
                    source: GallerySource::Server,
                    loaded: cards.len(),
                    failed: 0,
                };
                self.view.replace(cards, Utc::now());
                return self.finish_load(outcome);
            }
            Ok(_) => tracing::debug!("server listed no images, probing storage"),
            Err(e) => tracing::warn!(error = %e, "listing failed, probing storage"),
        }

        let outcome = match resolve_direct(&self.resolver, &self.prober).await {
            DirectResolution::NoReachableBase => {
                self.view.replace(Vec::new(), Utc::now());
                LoadOutcome {
                    source: GallerySource::Unavailable,
                    loaded: 0,
                    failed: 0,
                }
            }
            DirectResolution::Resolved {
                base_url,
                images,
                failed,
            } => {
                let cards: Vec<Card> = images
                    .into_iter()
                    .map(|i| Card::new(i.name, i.url, CardOrigin::DirectStorage))
                    .collect();
                let loaded = cards.len();
                self.view.replace(cards, Utc::now());
                LoadOutcome {
                    source: GallerySource::DirectStorage { base_url },
                    loaded,
                    failed,
                }
            }
        };
        self.finish_load(outcome)
    }

    fn finish_load(&self, outcome: LoadOutcome) -> LoadOutcome {
        tracing::info!(
            source = ?outcome.source,
            loaded = outcome.loaded,
            failed = outcome.failed,
            "gallery loaded"
        );
        self.notifier.diagnostic(&outcome.diagnostic());
        outcome
    }

    /// Uploads the selected file, showing a local preview when the server
    /// does not store it.
    #[instrument(name = "gallery.upload", skip(self, file))]
    pub async fn upload_image(&mut self, file: Option<SelectedFile>) -> UploadOutcome {
        let Some(file) = file else {
            self.notifier.message(SELECT_FILE_MESSAGE);
            return UploadOutcome::NoFileSelected;
        };

        let _loading = self.indicator.show();

        let result = tokio::time::timeout(self.upload_timeout, self.backend.upload_image(&file))
            .await
            .unwrap_or(Err(ClientError::Timeout));

        match result {
            Ok(uploaded) => {
                tracing::info!(key = %uploaded.name, "upload stored");
                self.view.clear();
                self.load_gallery().await;
                self.notifier.message(UPLOAD_SUCCESS_MESSAGE);
                UploadOutcome::Uploaded(uploaded)
            }
            Err(error) => {
                tracing::warn!(error = %error, file = %file.name, "server upload failed");
                let name = file.name.clone();
                match read_as_data_url(file).await {
                    Ok(data_url) => {
                        self.view.show_local_only(name, data_url);
                        self.notifier.message(LOCAL_ONLY_MESSAGE);
                        UploadOutcome::LocalOnly { error }
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "failed to read file for local preview");
                        self.notifier.message(&format!("Upload failed: {error}"));
                        UploadOutcome::Failed(error)
                    }
                }
            }
        }
    }

    /// Resolves what a download of the card at `index` should fetch.
    pub fn download(&self, index: usize) -> Result<DownloadRequest, ClientError> {
        let card = self.view.card(index).ok_or(ClientError::NoSuchCard(index))?;
        if card.is_local_only() {
            self.notifier.message(LOCAL_DOWNLOAD_MESSAGE);
            return Err(ClientError::LocalOnlyDownload);
        }

        let file_name = if card.name.is_empty() {
            DEFAULT_DOWNLOAD_NAME.to_string()
        } else {
            card.name.clone()
        };
        Ok(DownloadRequest {
            url: card.url.clone(),
            file_name,
        })
    }

    /// Hides a card whose image failed to load.
    pub fn report_broken(&mut self, index: usize) -> bool {
        let hidden = self.view.hide(index);
        if hidden {
            tracing::debug!(index, "hid broken image");
        }
        hidden
    }

    pub fn needs_refresh(&self, now: DateTime<Utc>) -> bool {
        self.view.is_stale(now, self.url_ttl)
    }
}

async fn read_as_data_url(file: SelectedFile) -> Result<String, tokio::task::JoinError> {
    tokio::task::spawn_blocking(move || {
        let mime = if file.content_type.is_empty() {
            "application/octet-stream"
        } else {
            file.content_type.as_str()
        };
        format!("data:{mime};base64,{}", STANDARD.encode(&file.data))
    })
    .await
}
