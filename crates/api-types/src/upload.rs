use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// The stored object produced by a successful upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct UploadedFile {
    pub name: String,
    pub url: String,
}

/// Body of `POST /upload`.
///
/// The server answers `{ "success": true, "file": {...} }` on success and
/// `{ "error": "..." }` otherwise; both shapes decode into this type, with
/// `success` defaulting to `false`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct UploadResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub file: Option<UploadedFile>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub error: Option<String>,
}

impl UploadResponse {
    pub fn stored(file: UploadedFile) -> Self {
        Self {
            success: true,
            file: Some(file),
            error: None,
        }
    }
}
