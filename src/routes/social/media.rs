//! Media upload endpoints (/social/media)
//!
//! Files land in the external object store; drafts reference them by the
//! public URL. Uploads are validated per file and partial failures come
//! back as a 200 with an `errors` list next to the succeeded subset.

use axum::{
    Json, Router,
    extract::{Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
};
use bytes::Bytes;
use chrono::Utc;
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

use crate::AppState;
use crate::constants::{
    ALLOWED_IMAGE_TYPES, ALLOWED_VIDEO_TYPES, MAX_IMAGE_SIZE, MAX_VIDEO_SIZE, MEDIA_BUCKET,
};
use crate::routes::auth::AuthUser;
use crate::services::error::{ApiError, LogErr};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/social/media", post(upload_media).delete(delete_media))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
        }
    }

    fn default_extension(&self) -> &'static str {
        match self {
            MediaKind::Image => "jpg",
            MediaKind::Video => "mp4",
        }
    }
}

/// Check one file against the MIME allow-list and size caps
fn validate_media(file_name: &str, content_type: &str, size: usize) -> Result<MediaKind, String> {
    let kind = if ALLOWED_IMAGE_TYPES.contains(&content_type) {
        MediaKind::Image
    } else if ALLOWED_VIDEO_TYPES.contains(&content_type) {
        MediaKind::Video
    } else {
        return Err(format!(
            "{}: Invalid file type. Allowed: images (JPEG, PNG, GIF, WebP) and videos (MP4, MOV, WebM, MPEG)",
            file_name
        ));
    };

    let max_size = match kind {
        MediaKind::Image => MAX_IMAGE_SIZE,
        MediaKind::Video => MAX_VIDEO_SIZE,
    };
    if size > max_size {
        return Err(format!(
            "{}: File too large. Max size: {}MB",
            file_name,
            max_size / (1024 * 1024)
        ));
    }

    Ok(kind)
}

/// Storage object path: scoped to the uploader, collision-proofed with a
/// timestamp and random suffix
fn object_path(user_id: &str, file_name: &str, kind: MediaKind) -> String {
    let extension = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_lowercase())
        .filter(|ext| !ext.is_empty())
        .unwrap_or_else(|| kind.default_extension().to_string());

    let suffix: String = rand::rng()
        .sample_iter(&rand::distr::Alphanumeric)
        .take(6)
        .map(char::from)
        .collect::<String>()
        .to_lowercase();

    format!(
        "{}/{}-{}.{}",
        user_id,
        Utc::now().timestamp_millis(),
        suffix,
        extension
    )
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UploadedMedia {
    name: String,
    path: String,
    url: String,
    #[serde(rename = "type")]
    kind: &'static str,
    mime_type: String,
    size: usize,
}

/// POST /social/media - Upload one or more media files for use in drafts.
/// Accepts `file` (single) or repeated `files` fields.
async fn upload_media(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    mut multipart: Multipart,
) -> Result<Response, ApiError> {
    let storage = state.storage.as_ref().ok_or_else(|| {
        ApiError::Configuration("Media storage is not configured".to_string())
    })?;

    let mut files: Vec<(String, String, Bytes)> = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::Validation(format!("Invalid multipart body: {}", e)))?
    {
        if !matches!(field.name(), Some("file") | Some("files")) {
            continue;
        }

        let file_name = field.file_name().unwrap_or("upload").to_string();
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::Validation(format!("Failed to read upload: {}", e)))?;

        if !data.is_empty() {
            files.push((file_name, content_type, data));
        }
    }

    if files.is_empty() {
        return Err(ApiError::Validation("No files provided".to_string()));
    }

    let mut uploaded: Vec<UploadedMedia> = Vec::new();
    let mut errors: Vec<String> = Vec::new();

    for (file_name, content_type, data) in files {
        let kind = match validate_media(&file_name, &content_type, data.len()) {
            Ok(kind) => kind,
            Err(reason) => {
                errors.push(reason);
                continue;
            }
        };

        let path = object_path(&user_id, &file_name, kind);
        let size = data.len();

        if let Err(e) = storage.upload(MEDIA_BUCKET, &path, &content_type, data).await {
            eprintln!("Storage upload error: {}", e);
            errors.push(format!("{}: Upload failed - {}", file_name, e));
            continue;
        }

        uploaded.push(UploadedMedia {
            name: file_name,
            url: storage.public_url(MEDIA_BUCKET, &path),
            path,
            kind: kind.as_str(),
            mime_type: content_type,
            size,
        });
    }

    if uploaded.is_empty() {
        let first = errors
            .first()
            .cloned()
            .unwrap_or_else(|| "All uploads failed".to_string());
        return Ok((
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": first, "details": errors })),
        )
            .into_response());
    }

    let errors = (!errors.is_empty()).then_some(errors);

    // Single-file uploads get a flat `url` for easier consumption
    let body = if uploaded.len() == 1 {
        json!({
            "success": true,
            "url": uploaded[0].url,
            "file": uploaded[0],
            "errors": errors,
        })
    } else {
        json!({
            "success": true,
            "urls": uploaded.iter().map(|f| f.url.clone()).collect::<Vec<_>>(),
            "files": uploaded,
            "errors": errors,
        })
    };

    Ok(Json(body).into_response())
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct DeleteMediaRequest {
    path: Option<String>,
}

#[derive(Serialize)]
struct DeleteMediaResponse {
    success: bool,
}

/// DELETE /social/media - Remove an uploaded file. Paths are scoped by
/// uploader, so users can only delete their own objects.
async fn delete_media(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    Json(body): Json<DeleteMediaRequest>,
) -> Result<Json<DeleteMediaResponse>, ApiError> {
    let storage = state.storage.as_ref().ok_or_else(|| {
        ApiError::Configuration("Media storage is not configured".to_string())
    })?;

    let path = body
        .path
        .ok_or_else(|| ApiError::Validation("File path is required".to_string()))?;

    if !path.starts_with(&format!("{}/", user_id)) {
        return Err(ApiError::Forbidden(
            "You can only delete your own files".to_string(),
        ));
    }

    storage
        .delete(MEDIA_BUCKET, &path)
        .await
        .log_upstream("Media delete error")?;

    Ok(Json(DeleteMediaResponse { success: true }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_media_types() {
        assert_eq!(
            validate_media("a.png", "image/png", 1024),
            Ok(MediaKind::Image)
        );
        assert_eq!(
            validate_media("a.mov", "video/quicktime", 1024),
            Ok(MediaKind::Video)
        );
        assert!(validate_media("a.pdf", "application/pdf", 1024).is_err());
    }

    #[test]
    fn test_validate_media_size_caps() {
        assert!(validate_media("big.png", "image/png", MAX_IMAGE_SIZE + 1).is_err());
        assert_eq!(
            validate_media("big.mp4", "video/mp4", MAX_IMAGE_SIZE + 1),
            Ok(MediaKind::Video)
        );
        assert!(validate_media("huge.mp4", "video/mp4", MAX_VIDEO_SIZE + 1).is_err());
    }

    #[test]
    fn test_object_path_shape() {
        let path = object_path("user_1", "Photo.JPG", MediaKind::Image);
        assert!(path.starts_with("user_1/"));
        assert!(path.ends_with(".jpg"));

        let fallback = object_path("user_1", "clip", MediaKind::Video);
        assert!(fallback.ends_with(".mp4"));
    }
}
