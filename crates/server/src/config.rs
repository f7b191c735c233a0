use std::{env, path::PathBuf};

use secrecy::SecretString;
use thiserror::Error;

const DEFAULT_PORT: u16 = 5000;
const DEFAULT_REGION: &str = "us-east-1";
const DEFAULT_BUCKET: &str = "art-gallery-images-bucket";
const DEFAULT_PRESIGN_EXPIRY_SECS: u64 = 3600;
const DEFAULT_LOCAL_DIR: &str = "./uploads";
const DEFAULT_LOCAL_PUBLIC_PATH: &str = "/files";
const DEFAULT_MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("environment variable `{0}` is not set")]
    MissingVar(&'static str),
    #[error("invalid value for environment variable `{0}`")]
    InvalidVar(&'static str),
}

#[derive(Debug, Clone)]
pub struct GalleryServerConfig {
    pub listen_addr: String,
    pub storage: StorageConfig,
    pub list_prefix: Option<String>,
    pub max_upload_bytes: usize,
    pub static_dir: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub enum StorageConfig {
    S3(S3Config),
    LocalDisk(LocalDiskConfig),
}

#[derive(Debug, Clone)]
pub struct S3Config {
    pub region: String,
    pub bucket: String,
    /// Custom S3-compatible endpoint. Requests use path-style addressing when set.
    pub endpoint_url: Option<String>,
    pub credentials: Option<S3Credentials>,
    pub presign_expiry_secs: u64,
    pub url_mode: UrlMode,
}

#[derive(Debug, Clone)]
pub struct S3Credentials {
    pub access_key_id: String,
    pub secret_access_key: SecretString,
}

/// How listing and upload responses address stored objects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UrlMode {
    /// Time-limited signed GET URLs.
    Presigned,
    /// `<base_url>/<percent-encoded key>`, for buckets with public read access.
    Public { base_url: String },
}

#[derive(Debug, Clone)]
pub struct LocalDiskConfig {
    pub root: PathBuf,
    /// URL path under which the server exposes `root`.
    pub public_path: String,
}

impl GalleryServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let listen_addr = match var("GALLERY_LISTEN_ADDR") {
            Some(addr) => addr,
            None => {
                let port = match var("PORT") {
                    Some(raw) => raw.parse::<u16>().map_err(|_| ConfigError::InvalidVar("PORT"))?,
                    None => DEFAULT_PORT,
                };
                format!("0.0.0.0:{port}")
            }
        };

        let storage = match var("GALLERY_STORAGE").as_deref() {
            None | Some("s3") => StorageConfig::S3(S3Config::from_lookup(&var)?),
            Some("local") => StorageConfig::LocalDisk(LocalDiskConfig::from_lookup(&var)),
            Some(_) => return Err(ConfigError::InvalidVar("GALLERY_STORAGE")),
        };

        let max_upload_bytes = match var("GALLERY_MAX_UPLOAD_BYTES") {
            Some(raw) => raw
                .parse()
                .map_err(|_| ConfigError::InvalidVar("GALLERY_MAX_UPLOAD_BYTES"))?,
            None => DEFAULT_MAX_UPLOAD_BYTES,
        };

        Ok(Self {
            listen_addr,
            storage,
            list_prefix: var("GALLERY_LIST_PREFIX"),
            max_upload_bytes,
            static_dir: var("GALLERY_STATIC_DIR").map(PathBuf::from),
        })
    }
}

impl S3Config {
    fn from_lookup(var: &dyn Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let region = var("AWS_REGION").unwrap_or_else(|| DEFAULT_REGION.to_string());
        let bucket = var("AWS_BUCKET_NAME").unwrap_or_else(|| DEFAULT_BUCKET.to_string());
        let endpoint_url = var("AWS_ENDPOINT_URL");

        let credentials = match var("AWS_ACCESS_KEY_ID") {
            Some(access_key_id) => {
                let secret_access_key = var("AWS_SECRET_ACCESS_KEY")
                    .ok_or(ConfigError::MissingVar("AWS_SECRET_ACCESS_KEY"))?;
                Some(S3Credentials {
                    access_key_id,
                    secret_access_key: SecretString::new(secret_access_key.into()),
                })
            }
            None => {
                tracing::warn!("AWS_ACCESS_KEY_ID not set, storage requests will not be signed");
                None
            }
        };

        let presign_expiry_secs = match var("GALLERY_PRESIGN_EXPIRY_SECS") {
            Some(raw) => match raw.parse::<u64>() {
                Ok(secs) if secs > 0 => secs,
                _ => return Err(ConfigError::InvalidVar("GALLERY_PRESIGN_EXPIRY_SECS")),
            },
            None => DEFAULT_PRESIGN_EXPIRY_SECS,
        };

        let url_mode = match var("GALLERY_PUBLIC_BASE_URL") {
            Some(base_url) => UrlMode::Public {
                base_url: base_url.trim_end_matches('/').to_string(),
            },
            None => UrlMode::Presigned,
        };

        tracing::info!(
            region = %region,
            bucket = %bucket,
            endpoint_url = ?endpoint_url,
            url_mode = ?url_mode,
            "S3 storage config loaded"
        );

        Ok(Self {
            region,
            bucket,
            endpoint_url,
            credentials,
            presign_expiry_secs,
            url_mode,
        })
    }
}

impl LocalDiskConfig {
    fn from_lookup(var: &dyn Fn(&str) -> Option<String>) -> Self {
        let root = var("GALLERY_LOCAL_DIR").unwrap_or_else(|| DEFAULT_LOCAL_DIR.to_string());
        let public_path =
            var("GALLERY_LOCAL_PUBLIC_PATH").unwrap_or_else(|| DEFAULT_LOCAL_PUBLIC_PATH.to_string());

        Self {
            root: PathBuf::from(root),
            public_path: normalize_public_path(&public_path),
        }
    }
}

fn normalize_public_path(path: &str) -> String {
    let trimmed = path.trim().trim_matches('/');
    if trimmed.is_empty() {
        DEFAULT_LOCAL_PUBLIC_PATH.to_string()
    } else {
        format!("/{trimmed}")
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use secrecy::ExposeSecret;

    use super::*;

    fn config_from(pairs: &[(&str, &str)]) -> Result<GalleryServerConfig, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        GalleryServerConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_match_documented_values() {
        let config = config_from(&[]).unwrap();

        assert_eq!(config.listen_addr, "0.0.0.0:5000");
        assert_eq!(config.max_upload_bytes, DEFAULT_MAX_UPLOAD_BYTES);
        assert!(config.list_prefix.is_none());
        assert!(config.static_dir.is_none());

        let StorageConfig::S3(s3) = config.storage else {
            panic!("expected S3 storage by default");
        };
        assert_eq!(s3.region, "us-east-1");
        assert_eq!(s3.bucket, "art-gallery-images-bucket");
        assert_eq!(s3.presign_expiry_secs, 3600);
        assert_eq!(s3.url_mode, UrlMode::Presigned);
        assert!(s3.credentials.is_none());
    }

    #[test]
    fn port_is_used_when_listen_addr_missing() {
        let config = config_from(&[("PORT", "8080")]).unwrap();
        assert_eq!(config.listen_addr, "0.0.0.0:8080");

        let config = config_from(&[("PORT", "8080"), ("GALLERY_LISTEN_ADDR", "127.0.0.1:9000")])
            .unwrap();
        assert_eq!(config.listen_addr, "127.0.0.1:9000");
    }

    #[test]
    fn invalid_numbers_name_the_variable() {
        let err = config_from(&[("PORT", "eighty")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidVar("PORT")));

        let err = config_from(&[("GALLERY_PRESIGN_EXPIRY_SECS", "0")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidVar("GALLERY_PRESIGN_EXPIRY_SECS")));
    }

    #[test]
    fn access_key_requires_secret() {
        let err = config_from(&[("AWS_ACCESS_KEY_ID", "AKIA")]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingVar("AWS_SECRET_ACCESS_KEY")));

        let config = config_from(&[
            ("AWS_ACCESS_KEY_ID", "AKIA"),
            ("AWS_SECRET_ACCESS_KEY", "shh"),
        ])
        .unwrap();
        let StorageConfig::S3(s3) = config.storage else {
            panic!("expected S3 storage");
        };
        let credentials = s3.credentials.unwrap();
        assert_eq!(credentials.access_key_id, "AKIA");
        assert_eq!(credentials.secret_access_key.expose_secret(), "shh");
    }

    #[test]
    fn public_base_url_switches_url_mode() {
        let config =
            config_from(&[("GALLERY_PUBLIC_BASE_URL", "https://cdn.example.test/gallery/")]).unwrap();
        let StorageConfig::S3(s3) = config.storage else {
            panic!("expected S3 storage");
        };
        assert_eq!(
            s3.url_mode,
            UrlMode::Public {
                base_url: "https://cdn.example.test/gallery".to_string()
            }
        );
    }

    #[test]
    fn local_storage_normalizes_public_path() {
        let config = config_from(&[
            ("GALLERY_STORAGE", "local"),
            ("GALLERY_LOCAL_DIR", "/srv/gallery"),
            ("GALLERY_LOCAL_PUBLIC_PATH", "media/"),
        ])
        .unwrap();

        let StorageConfig::LocalDisk(local) = config.storage else {
            panic!("expected local storage");
        };
        assert_eq!(local.root, PathBuf::from("/srv/gallery"));
        assert_eq!(local.public_path, "/media");
    }

    #[test]
    fn unknown_storage_backend_is_rejected() {
        let err = config_from(&[("GALLERY_STORAGE", "ftp")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidVar("GALLERY_STORAGE")));
    }
}
