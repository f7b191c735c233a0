use std::{collections::HashSet, path::Path};

use serde::{Deserialize, Serialize};

use crate::{error::ClientError, probe::UrlProber};

const DEFAULT_BASE_URLS: &[&str] = &[
    "https://art-gallery-images-bucket.s3.eu-north-1.amazonaws.com/",
    "https://s3.eu-north-1.amazonaws.com/art-gallery-images-bucket/",
    "https://art-gallery-images-bucket.s3.amazonaws.com/",
];

const DEFAULT_MARKER_KEY: &str = "download.jpg";

const DEFAULT_KNOWN_KEYS: &[&str] = &[
    "download.jpg",
    "glWla8v.png",
    "1198598-3840x2160-desktop-4k-studio-ghibli-background-image.jpg",
    "1743335438225-653393.jpg",
    "1198712-3840x2160-desktop-4k-studio-ghibli-wallpaper.jpg",
    "sea-of-stars-game-screenshot-4k-wallpaper-uhdpaper.com-905@1@h.jpg",
    "star-wars-kylo-ren-rey-from-star-wars-bb-8-wallpaper-0788ce9a3b1dfa6ddfe2779fd7d6b4f1.jpg",
    "wallpaperflare.com_wallpaper (1).jpg",
    "wallpaperflare.com_wallpaper (2).jpg",
    "wallpaperflare.com_wallpaper (3).jpg",
    "wallpaperflare.com_wallpaper.jpg",
    "wp3614529-star-wars-4k-wallpapers.jpg",
    "1198790-3840x2160-desktop-4k-studio-ghibli-wallpaper.jpg",
    "1198799-3840x2160-desktop-4k-studio-ghibli-background-photo.jpg",
    "1374174.png",
    "1743335748510-guts-neon-iconic-5120x2880-21415.png",
    "1743340184178-guts-berserk-amoled-5120x2880-19129.jpg",
    "653393.jpg",
    "galaxy-space-pixel-art-digital-art-4k-wallpaper-uhdpaper.com-762@0@i.jpg",
];

/// Where to look for images when the server cannot list them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Candidate bucket URLs, tried in order.
    pub base_urls: Vec<String>,
    /// Object probed to decide whether a base URL is reachable.
    pub marker_key: String,
    /// Keys probed under the first reachable base.
    pub known_keys: Vec<String>,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            base_urls: DEFAULT_BASE_URLS.iter().map(|s| s.to_string()).collect(),
            marker_key: DEFAULT_MARKER_KEY.to_string(),
            known_keys: DEFAULT_KNOWN_KEYS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl ResolverConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self, ClientError> {
        toml::from_str(raw).map_err(|e| ClientError::Config(e.to_string()))
    }

    pub async fn load(path: &Path) -> Result<Self, ClientError> {
        let raw = tokio::fs::read_to_string(path).await?;
        Self::from_toml_str(&raw)
    }
}

/// Ways of spelling a key inside a URL, in the order they are tried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodingStrategy {
    /// Percent-encode everything outside the unreserved set.
    Component,
    /// Only replace spaces with `%20`.
    SpacesOnly,
    /// Use the key unchanged.
    Raw,
}

impl EncodingStrategy {
    pub const ALL: [EncodingStrategy; 3] = [Self::Component, Self::SpacesOnly, Self::Raw];

    pub fn encode(self, key: &str) -> String {
        match self {
            Self::Component => urlencoding::encode(key).into_owned(),
            Self::SpacesOnly => key.replace(' ', "%20"),
            Self::Raw => key.to_string(),
        }
    }
}

/// A key located directly in storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedImage {
    pub name: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectResolution {
    /// No candidate base URL answered the marker probe.
    NoReachableBase,
    Resolved {
        base_url: String,
        images: Vec<ResolvedImage>,
        failed: usize,
    },
}

fn join(base: &str, path: &str) -> String {
    if base.ends_with('/') {
        format!("{base}{path}")
    } else {
        format!("{base}/{path}")
    }
}

/// Locates images by probing storage URLs one at a time.
pub async fn resolve_direct<P>(config: &ResolverConfig, prober: &P) -> DirectResolution
where
    P: UrlProber + ?Sized,
{
    let mut active_base = None;
    for base in &config.base_urls {
        if prober.probe(&join(base, &config.marker_key)).await {
            active_base = Some(base.clone());
            break;
        }
        tracing::debug!(base = %base, "storage base unreachable");
    }

    let Some(base_url) = active_base else {
        return DirectResolution::NoReachableBase;
    };

    let mut images = Vec::new();
    let mut failed = 0;
    for key in &config.known_keys {
        match probe_key(&base_url, key, prober).await {
            Some(url) => images.push(ResolvedImage {
                name: key.clone(),
                url,
            }),
            None => {
                tracing::debug!(key = %key, "no encoding of key loaded");
                failed += 1;
            }
        }
    }

    DirectResolution::Resolved {
        base_url,
        images,
        failed,
    }
}

async fn probe_key<P>(base_url: &str, key: &str, prober: &P) -> Option<String>
where
    P: UrlProber + ?Sized,
{
    let mut tried = HashSet::new();
    for strategy in EncodingStrategy::ALL {
        let url = join(base_url, &strategy.encode(key));
        if !tried.insert(url.clone()) {
            continue;
        }
        if prober.probe(&url).await {
            return Some(url);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;

    /// Answers true for a fixed set of URLs and records every probe.
    #[derive(Default)]
    struct FakeProber {
        reachable: HashSet<String>,
        probed: Mutex<Vec<String>>,
    }

    impl FakeProber {
        fn with(urls: &[&str]) -> Self {
            Self {
                reachable: urls.iter().map(|s| s.to_string()).collect(),
                probed: Mutex::default(),
            }
        }

        fn probed(&self) -> Vec<String> {
            self.probed.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl UrlProber for FakeProber {
        async fn probe(&self, url: &str) -> bool {
            self.probed.lock().unwrap().push(url.to_string());
            self.reachable.contains(url)
        }
    }

    fn config(keys: &[&str]) -> ResolverConfig {
        ResolverConfig {
            base_urls: vec![
                "https://a.example/".to_string(),
                "https://b.example/bucket".to_string(),
            ],
            marker_key: "download.jpg".to_string(),
            known_keys: keys.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn encodings_differ_for_reserved_characters() {
        let key = "wallpaperflare.com_wallpaper (1).jpg";
        assert_eq!(
            EncodingStrategy::Component.encode(key),
            "wallpaperflare.com_wallpaper%20%281%29.jpg"
        );
        assert_eq!(
            EncodingStrategy::SpacesOnly.encode(key),
            "wallpaperflare.com_wallpaper%20(1).jpg"
        );
        assert_eq!(EncodingStrategy::Raw.encode(key), key);
        assert_eq!(
            EncodingStrategy::Component.encode("uhdpaper.com-905@1@h.jpg"),
            "uhdpaper.com-905%401%40h.jpg"
        );
    }

    #[test]
    fn default_table_matches_deployed_bucket() {
        let config = ResolverConfig::default();
        assert_eq!(config.base_urls.len(), 3);
        assert_eq!(config.marker_key, "download.jpg");
        assert_eq!(config.known_keys.len(), 19);
        assert_eq!(config.known_keys[0], "download.jpg");
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = ResolverConfig::from_toml_str(
            r#"base_urls = ["http://localhost:9000/gallery/"]"#,
        )
        .unwrap();
        assert_eq!(config.base_urls, vec!["http://localhost:9000/gallery/"]);
        assert_eq!(config.marker_key, "download.jpg");
        assert_eq!(config.known_keys.len(), 19);

        assert!(matches!(
            ResolverConfig::from_toml_str("base_urls = 3"),
            Err(ClientError::Config(_))
        ));
    }

    #[tokio::test]
    async fn first_reachable_base_wins() {
        let prober = FakeProber::with(&[
            "https://b.example/bucket/download.jpg",
            "https://b.example/bucket/a.png",
        ]);
        let resolution = resolve_direct(&config(&["a.png"]), &prober).await;

        assert_eq!(
            resolution,
            DirectResolution::Resolved {
                base_url: "https://b.example/bucket".to_string(),
                images: vec![ResolvedImage {
                    name: "a.png".to_string(),
                    url: "https://b.example/bucket/a.png".to_string(),
                }],
                failed: 0,
            }
        );
        // Identical encodings are probed once.
        assert_eq!(
            prober.probed(),
            vec![
                "https://a.example/download.jpg",
                "https://b.example/bucket/download.jpg",
                "https://b.example/bucket/a.png",
            ]
        );
    }

    #[tokio::test]
    async fn falls_through_encodings_in_order() {
        let prober = FakeProber::with(&[
            "https://a.example/download.jpg",
            "https://a.example/wallpaperflare.com_wallpaper (1).jpg",
        ]);
        let resolution = resolve_direct(
            &config(&["wallpaperflare.com_wallpaper (1).jpg", "missing.png"]),
            &prober,
        )
        .await;

        let DirectResolution::Resolved { images, failed, .. } = resolution else {
            panic!("expected a reachable base");
        };
        assert_eq!(failed, 1);
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].name, "wallpaperflare.com_wallpaper (1).jpg");
        assert_eq!(
            prober.probed()[1..4],
            [
                "https://a.example/wallpaperflare.com_wallpaper%20%281%29.jpg",
                "https://a.example/wallpaperflare.com_wallpaper%20(1).jpg",
                "https://a.example/wallpaperflare.com_wallpaper (1).jpg",
            ]
        );
    }

    #[tokio::test]
    async fn no_reachable_base_probes_no_keys() {
        let prober = FakeProber::default();
        let resolution = resolve_direct(&config(&["a.png", "b.png"]), &prober).await;

        assert_eq!(resolution, DirectResolution::NoReachableBase);
        assert_eq!(prober.probed().len(), 2);
    }
}
