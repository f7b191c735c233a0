use std::time::Duration;

use async_trait::async_trait;
use aws_credential_types::Credentials;
use aws_sdk_s3::{
    Client,
    config::{BehaviorVersion, Region},
    error::DisplayErrorContext,
    presigning::PresigningConfig,
    primitives::ByteStream,
};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use secrecy::ExposeSecret;

use super::{ObjectStore, StorageError, StoredObject, encode_key_path};
use crate::config::{S3Config, UrlMode};

#[derive(Clone)]
pub struct S3Store {
    client: Client,
    bucket: String,
    presign_expiry: Duration,
    url_mode: UrlMode,
}

impl S3Store {
    pub fn new(config: &S3Config) -> Self {
        let mut builder = aws_sdk_s3::config::Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()));

        if let Some(credentials) = &config.credentials {
            builder = builder.credentials_provider(Credentials::new(
                credentials.access_key_id.clone(),
                credentials.secret_access_key.expose_secret().to_string(),
                None,
                None,
                "gallery-env",
            ));
        }

        if let Some(endpoint) = &config.endpoint_url {
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }

        Self {
            client: Client::from_conf(builder.build()),
            bucket: config.bucket.clone(),
            presign_expiry: Duration::from_secs(config.presign_expiry_secs),
            url_mode: config.url_mode.clone(),
        }
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn list(&self, prefix: Option<&str>) -> Result<Vec<StoredObject>, StorageError> {
        let mut objects = Vec::new();
        let mut continuation_token: Option<String> = None;

        loop {
            let output = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .set_prefix(prefix.map(str::to_string))
                .set_continuation_token(continuation_token.take())
                .send()
                .await
                .map_err(|e| StorageError::Backend(DisplayErrorContext(&e).to_string()))?;

            for object in output.contents() {
                let Some(key) = object.key() else { continue };
                // Zero-byte "folder" placeholders are not images.
                if key.ends_with('/') {
                    continue;
                }
                objects.push(StoredObject {
                    key: key.to_string(),
                    last_modified: object.last_modified().and_then(to_chrono),
                    size: object.size(),
                    content_type: None,
                });
            }

            match output.next_continuation_token() {
                Some(token) if output.is_truncated().unwrap_or(false) => {
                    continuation_token = Some(token.to_string());
                }
                _ => break,
            }
        }

        Ok(objects)
    }

    async fn put(&self, key: &str, body: Bytes, content_type: &str) -> Result<(), StorageError> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(body))
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| StorageError::Backend(DisplayErrorContext(&e).to_string()))?;

        Ok(())
    }

    async fn head(&self, key: &str) -> Result<Option<StoredObject>, StorageError> {
        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(output) => Ok(Some(StoredObject {
                key: key.to_string(),
                last_modified: output.last_modified().and_then(to_chrono),
                size: output.content_length(),
                content_type: output.content_type().map(str::to_string),
            })),
            Err(err) => {
                let service_error = err.into_service_error();
                if service_error.is_not_found() {
                    Ok(None)
                } else {
                    Err(StorageError::Backend(
                        DisplayErrorContext(&service_error).to_string(),
                    ))
                }
            }
        }
    }

    async fn read_url(&self, key: &str) -> Result<String, StorageError> {
        match &self.url_mode {
            UrlMode::Public { base_url } => Ok(format!("{}/{}", base_url, encode_key_path(key))),
            UrlMode::Presigned => {
                let presigning = PresigningConfig::expires_in(self.presign_expiry)
                    .map_err(|e| StorageError::Presign(e.to_string()))?;

                let presigned = self
                    .client
                    .get_object()
                    .bucket(&self.bucket)
                    .key(key)
                    .presigned(presigning)
                    .await
                    .map_err(|e| StorageError::Presign(DisplayErrorContext(&e).to_string()))?;

                Ok(presigned.uri().to_string())
            }
        }
    }
}

fn to_chrono(timestamp: &aws_sdk_s3::primitives::DateTime) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(timestamp.secs(), timestamp.subsec_nanos())
}
