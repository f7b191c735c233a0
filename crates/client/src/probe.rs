use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, header::CONTENT_TYPE};

/// Answers whether a URL currently loads as an image. Never fails.
#[async_trait]
pub trait UrlProber: Send + Sync {
    async fn probe(&self, url: &str) -> bool;
}

#[derive(Debug, Clone)]
pub struct HttpProber {
    http: Client,
}

impl HttpProber {
    const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

    pub fn new() -> Self {
        let http = Client::builder()
            .timeout(Self::PROBE_TIMEOUT)
            .user_agent(concat!("gallery-client/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_default();
        Self { http }
    }

    pub fn with_client(http: Client) -> Self {
        Self { http }
    }
}

impl Default for HttpProber {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UrlProber for HttpProber {
    async fn probe(&self, url: &str) -> bool {
        let res = match self.http.get(url).send().await {
            Ok(res) => res,
            Err(e) => {
                tracing::debug!(url, error = %e, "probe failed");
                return false;
            }
        };

        if !res.status().is_success() {
            tracing::debug!(url, status = %res.status(), "probe rejected");
            return false;
        }

        let content_type = res
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let loadable = looks_like_image(content_type.as_deref());
        if !loadable {
            tracing::debug!(url, content_type = ?content_type, "probe returned non-image");
        }
        loadable
    }
}

/// S3 serves objects uploaded without a type as `application/octet-stream`.
fn looks_like_image(content_type: Option<&str>) -> bool {
    let Some(content_type) = content_type else {
        return true;
    };
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    essence.starts_with("image/") || essence == "application/octet-stream" || essence.is_empty()
}
