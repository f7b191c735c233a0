use std::{path::Path, time::Duration};

use api_types::{ImageRecord, ListImagesResponse, UploadResponse, UploadedFile};
use async_trait::async_trait;
use backon::{ExponentialBuilder, Retryable};
use bytes::Bytes;
use reqwest::{
    Client,
    multipart::{Form, Part},
};
use tracing::warn;
use url::Url;

use crate::error::{ClientError, map_reqwest_error};

/// Multipart field the server reads the image from.
pub const UPLOAD_FIELD: &str = "image";

/// A file picked for upload.
#[derive(Debug, Clone)]
pub struct SelectedFile {
    pub name: String,
    pub content_type: String,
    pub data: Bytes,
}

impl SelectedFile {
    pub fn new(name: impl Into<String>, content_type: impl Into<String>, data: Bytes) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            data,
        }
    }

    /// Reads a file from disk, guessing its MIME type from the extension.
    pub async fn from_path(path: &Path) -> Result<Self, ClientError> {
        let data = tokio::fs::read(path).await?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let content_type = mime_guess::from_path(path)
            .first_or_octet_stream()
            .essence_str()
            .to_string();
        Ok(Self::new(name, content_type, Bytes::from(data)))
    }
}

/// The gallery server as seen by the controller.
#[async_trait]
pub trait GalleryBackend: Send + Sync {
    /// Lists every stored image with a URL the client can load.
    async fn list_images(&self) -> Result<Vec<ImageRecord>, ClientError>;

    /// Uploads one file. Anything other than a confirmed store is an error.
    async fn upload_image(&self, file: &SelectedFile) -> Result<UploadedFile, ClientError>;
}

/// HTTP client for the gallery server with retries on listing.
#[derive(Debug, Clone)]
pub struct HttpGalleryBackend {
    base: Url,
    http: Client,
    max_retries: usize,
}

impl HttpGalleryBackend {
    const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
    const DEFAULT_RETRIES: usize = 2;

    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        let base = Url::parse(base_url).map_err(|e| ClientError::Url(e.to_string()))?;
        let http = Client::builder()
            .timeout(Self::REQUEST_TIMEOUT)
            .user_agent(concat!("gallery-client/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ClientError::Transport(e.to_string()))?;
        Ok(Self {
            base,
            http,
            max_retries: Self::DEFAULT_RETRIES,
        })
    }

    /// Number of retries for transient listing failures. Uploads are never retried.
    pub fn with_max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn base_url(&self) -> &str {
        self.base.as_str()
    }

    /// Fetches the bytes behind an image URL, resolving it against the server base.
    pub async fn fetch(&self, url: &str) -> Result<Bytes, ClientError> {
        let url = self.resolve(url)?;
        let res = self.http.get(url).send().await.map_err(map_reqwest_error)?;
        let res = check_status(res).await?;
        res.bytes().await.map_err(map_reqwest_error)
    }

    fn endpoint(&self, path: &str) -> Result<Url, ClientError> {
        self.base
            .join(path)
            .map_err(|e| ClientError::Url(e.to_string()))
    }

    /// Record URLs may be relative to the server when it serves files itself.
    fn resolve(&self, url: &str) -> Result<Url, ClientError> {
        self.base
            .join(url)
            .map_err(|e| ClientError::Url(e.to_string()))
    }

    async fn fetch_listing(&self) -> Result<ListImagesResponse, ClientError> {
        let res = self
            .http
            .get(self.endpoint("/images")?)
            .header("X-Client-Version", env!("CARGO_PKG_VERSION"))
            .send()
            .await
            .map_err(map_reqwest_error)?;
        check_status(res)
            .await?
            .json::<ListImagesResponse>()
            .await
            .map_err(|e| ClientError::Serde(e.to_string()))
    }
}

#[async_trait]
impl GalleryBackend for HttpGalleryBackend {
    async fn list_images(&self) -> Result<Vec<ImageRecord>, ClientError> {
        let listing = (|| async { self.fetch_listing().await })
            .retry(
                ExponentialBuilder::default()
                    .with_min_delay(Duration::from_millis(200))
                    .with_max_delay(Duration::from_secs(2))
                    .with_max_times(self.max_retries)
                    .with_jitter(),
            )
            .when(|e: &ClientError| e.should_retry())
            .notify(|e: &ClientError, dur: Duration| {
                warn!(
                    "Listing failed, retrying after {:.2}s: {}",
                    dur.as_secs_f64(),
                    e
                )
            })
            .await?;

        listing
            .images
            .into_iter()
            .map(|mut record| {
                record.url = self.resolve(&record.url)?.to_string();
                Ok::<_, ClientError>(record)
            })
            .collect()
    }

    async fn upload_image(&self, file: &SelectedFile) -> Result<UploadedFile, ClientError> {
        let part = Part::bytes(file.data.to_vec())
            .file_name(file.name.clone())
            .mime_str(&file.content_type)
            .map_err(|e| ClientError::Transport(e.to_string()))?;
        let form = Form::new().part(UPLOAD_FIELD, part);

        let res = self
            .http
            .post(self.endpoint("/upload")?)
            .header("X-Client-Version", env!("CARGO_PKG_VERSION"))
            .multipart(form)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        let body = check_status(res)
            .await?
            .json::<UploadResponse>()
            .await
            .map_err(|e| ClientError::Serde(e.to_string()))?;

        if !body.success {
            return Err(ClientError::Rejected(
                body.error
                    .unwrap_or_else(|| "Unknown server error".to_string()),
            ));
        }
        let mut uploaded = body
            .file
            .ok_or_else(|| ClientError::Rejected("response did not describe the stored file".into()))?;
        uploaded.url = self.resolve(&uploaded.url)?.to_string();
        Ok(uploaded)
    }
}

async fn check_status(res: reqwest::Response) -> Result<reqwest::Response, ClientError> {
    let status = res.status();
    if status.is_success() {
        Ok(res)
    } else {
        let body = res.text().await.unwrap_or_default();
        Err(ClientError::Http {
            status: status.as_u16(),
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_urls_resolve_against_server() {
        let backend = HttpGalleryBackend::new("http://localhost:5000").unwrap();
        assert_eq!(
            backend.resolve("/files/1-a%20b.png").unwrap().as_str(),
            "http://localhost:5000/files/1-a%20b.png"
        );
        assert_eq!(
            backend
                .resolve("https://bucket.s3.amazonaws.com/a.png?X-Amz-Expires=3600")
                .unwrap()
                .as_str(),
            "https://bucket.s3.amazonaws.com/a.png?X-Amz-Expires=3600"
        );
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        assert!(matches!(
            HttpGalleryBackend::new("not a url"),
            Err(ClientError::Url(_))
        ));
    }

    #[tokio::test]
    async fn selected_file_guesses_mime_from_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("photo.png");
        tokio::fs::write(&path, b"png").await.unwrap();

        let file = SelectedFile::from_path(&path).await.unwrap();
        assert_eq!(file.name, "photo.png");
        assert_eq!(file.content_type, "image/png");
        assert_eq!(&file.data[..], b"png");
    }
}
