use api_types::{ImageRecord, ListImagesResponse, UploadResponse, UploadedFile};
use axum::{
    Json, Router,
    extract::{Multipart, Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::future::try_join_all;
use tracing::instrument;

use super::error::ApiError;
use crate::{AppState, storage::StorageError};

/// Multipart field carrying the image.
pub const UPLOAD_FIELD: &str = "image";

const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";
/// Keys are `<millis>-<name>`; this keeps them well under the 255-byte file name limit.
const MAX_NAME_BYTES: usize = 200;
/// Longest suffix still treated as an extension when truncating.
const MAX_EXTENSION_BYTES: usize = 16;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/images", get(list_images))
        .route("/upload", post(upload_image))
        .route("/download/{*name}", get(download_image))
}

#[instrument(name = "images.list", skip(state))]
async fn list_images(State(state): State<AppState>) -> Result<Json<ListImagesResponse>, ApiError> {
    let store = state.store();
    let objects = store
        .list(state.config().list_prefix.as_deref())
        .await
        .map_err(ApiError::List)?;

    let images = try_join_all(objects.into_iter().map(|object| async move {
        let url = store.read_url(&object.key).await?;
        Ok::<_, StorageError>(ImageRecord {
            name: object.key,
            url,
            timestamp: object.last_modified,
            content_type: object.content_type,
        })
    }))
    .await
    .map_err(ApiError::List)?;

    state.metrics().record_listing(images.len());
    tracing::debug!(count = images.len(), "listed images");

    Ok(Json(ListImagesResponse { images }))
}

struct IncomingFile {
    file_name: Option<String>,
    content_type: Option<String>,
    data: Bytes,
}

#[instrument(name = "images.upload", skip(state, multipart))]
async fn upload_image(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let mut incoming = None;
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let data = field.bytes().await?;
        incoming = Some(IncomingFile {
            file_name,
            content_type,
            data,
        });
        break;
    }

    // Browsers submit an empty, unnamed part when no file was chosen.
    let file = incoming
        .filter(|f| !(f.data.is_empty() && f.file_name.as_deref().unwrap_or("").is_empty()))
        .ok_or(ApiError::NoFile)?;

    let original_name = file.file_name.as_deref().and_then(sanitize_file_name);
    let content_type = resolve_content_type(file.content_type.as_deref(), original_name.as_deref());
    let original_name = original_name.map(|name| align_extension(name, &content_type));
    let key = upload_key(original_name.as_deref(), &content_type, Utc::now());

    let store = state.store();
    store
        .put(&key, file.data, &content_type)
        .await
        .map_err(ApiError::Upload)?;
    let url = store.read_url(&key).await.map_err(ApiError::Upload)?;

    state.metrics().record_upload();
    tracing::info!(key = %key, content_type = %content_type, "stored upload");

    Ok(Json(UploadResponse::stored(UploadedFile { name: key, url })))
}

#[instrument(name = "images.download", skip(state))]
async fn download_image(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Response, ApiError> {
    let store = state.store();
    if store.head(&name).await.map_err(ApiError::Download)?.is_none() {
        return Err(ApiError::NotFound(name));
    }

    let url = store.read_url(&name).await.map_err(ApiError::Download)?;
    Ok((StatusCode::FOUND, [(header::LOCATION, url)]).into_response())
}

/// Keeps the final path component of a client-supplied file name.
///
/// Spaces and punctuation survive; only separators and control characters are
/// dropped. Returns `None` when nothing usable remains.
fn sanitize_file_name(raw: &str) -> Option<String> {
    let base = raw.rsplit(['/', '\\']).next().unwrap_or(raw);
    let cleaned: String = base.chars().filter(|c| !c.is_control()).collect();
    let cleaned = truncate_keeping_extension(cleaned.trim(), MAX_NAME_BYTES);
    let cleaned = cleaned.trim();

    if cleaned.is_empty() || cleaned == "." || cleaned == ".." {
        None
    } else {
        Some(cleaned.to_string())
    }
}

/// Cuts `name` to at most `max_bytes` on a char boundary, shortening the stem
/// rather than the extension.
fn truncate_keeping_extension(name: &str, max_bytes: usize) -> String {
    if name.len() <= max_bytes {
        return name.to_string();
    }

    let (stem, extension) = match name.rfind('.') {
        Some(dot) if dot > 0 && name.len() - dot <= MAX_EXTENSION_BYTES => name.split_at(dot),
        _ => (name, ""),
    };
    let mut end = max_bytes.saturating_sub(extension.len()).min(stem.len());
    while !stem.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}{}", &stem[..end], extension)
}

/// Appends an extension for `content_type` when the name would not be
/// guessed back to it. Objects are typed by their key when listed and served.
fn align_extension(name: String, content_type: &str) -> String {
    if content_type == FALLBACK_CONTENT_TYPE
        || mime_guess::from_path(&name)
            .iter()
            .any(|mime| mime.essence_str() == content_type)
    {
        return name;
    }

    match known_extension(content_type) {
        Some(extension) => format!("{name}.{extension}"),
        None => name,
    }
}

fn resolve_content_type(declared: Option<&str>, file_name: Option<&str>) -> String {
    match declared.map(|ct| ct.trim().to_ascii_lowercase()) {
        Some(ct) if ct == "image/jpg" || ct == "image/pjpeg" => "image/jpeg".to_string(),
        Some(ct) if !ct.is_empty() && ct != FALLBACK_CONTENT_TYPE => ct,
        _ => file_name
            .and_then(|name| mime_guess::from_path(name).first())
            .map(|mime| mime.essence_str().to_string())
            .unwrap_or_else(|| FALLBACK_CONTENT_TYPE.to_string()),
    }
}

/// `<millis>-<name>` for named uploads, `image_<millis>.<ext>` otherwise.
///
/// Two uploads of the same name within one millisecond produce the same key.
fn upload_key(original_name: Option<&str>, content_type: &str, now: DateTime<Utc>) -> String {
    let millis = now.timestamp_millis();
    match original_name {
        Some(name) => format!("{millis}-{name}"),
        None => format!(
            "image_{millis}.{}",
            known_extension(content_type).unwrap_or("bin")
        ),
    }
}

fn known_extension(content_type: &str) -> Option<&'static str> {
    match content_type {
        "image/jpeg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/gif" => Some("gif"),
        "image/webp" => Some("webp"),
        "image/avif" => Some("avif"),
        "image/bmp" => Some("bmp"),
        "image/svg+xml" => Some("svg"),
        "image/tiff" => Some("tiff"),
        other => mime_guess::get_mime_extensions_str(other).and_then(|exts| exts.first().copied()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_keeps_spaces_and_drops_directories() {
        assert_eq!(
            sanitize_file_name("C:\\Users\\me\\wallpaperflare.com_wallpaper (1).jpg").as_deref(),
            Some("wallpaperflare.com_wallpaper (1).jpg")
        );
        assert_eq!(sanitize_file_name("../../etc/passwd").as_deref(), Some("passwd"));
        assert_eq!(sanitize_file_name("  "), None);
        assert_eq!(sanitize_file_name("dir/"), None);
    }

    #[test]
    fn keys_are_timestamp_prefixed() {
        let now = DateTime::from_timestamp_millis(1_743_335_438_225).unwrap();

        assert_eq!(
            upload_key(Some("653393.jpg"), "image/jpeg", now),
            "1743335438225-653393.jpg"
        );
        assert_eq!(upload_key(None, "image/png", now), "image_1743335438225.png");
        assert_eq!(upload_key(None, "image/jpeg", now), "image_1743335438225.jpg");
        assert_eq!(
            upload_key(None, "application/x-unknown-thing", now),
            "image_1743335438225.bin"
        );
    }

    #[test]
    fn declared_content_type_wins_over_guess() {
        assert_eq!(resolve_content_type(Some("image/webp"), Some("a.png")), "image/webp");
        assert_eq!(
            resolve_content_type(Some("application/octet-stream"), Some("a.png")),
            "image/png"
        );
        assert_eq!(resolve_content_type(None, None), "application/octet-stream");
        assert_eq!(resolve_content_type(Some("image/jpg"), None), "image/jpeg");
    }

    #[test]
    fn extension_follows_content_type() {
        assert_eq!(align_extension("photo".into(), "image/png"), "photo.png");
        assert_eq!(align_extension("scan.png".into(), "image/webp"), "scan.png.webp");
        assert_eq!(align_extension("cat.jpg".into(), "image/jpeg"), "cat.jpg");
        assert_eq!(align_extension("cat.jpeg".into(), "image/jpeg"), "cat.jpeg");
        assert_eq!(align_extension("notes".into(), "application/octet-stream"), "notes");
    }

    #[test]
    fn long_names_are_cut_by_bytes_and_keep_extension() {
        let name = format!("{}.jpg", "風".repeat(200));
        let cut = sanitize_file_name(&name).unwrap();
        assert!(cut.len() <= MAX_NAME_BYTES);
        assert!(cut.ends_with(".jpg"));
        assert!(cut.starts_with('風'));

        let no_extension = "a".repeat(300);
        assert_eq!(sanitize_file_name(&no_extension).unwrap().len(), MAX_NAME_BYTES);
        assert_eq!(sanitize_file_name("short.png").as_deref(), Some("short.png"));
    }
}
