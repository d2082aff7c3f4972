/**
 * Upload Routes
 * Administrator image uploads for certificates and projects
 */
use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::AdminSession;
use crate::error::AppError;
use crate::AppState;

const MAX_FILE_SIZE: usize = 5 * 1024 * 1024; // 5MB
const ALLOWED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "gif"];

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub url: String,
    pub filename: String,
    pub size: usize,
    pub mime_type: String,
}

fn validate_image_magic_bytes(bytes: &[u8]) -> Option<&'static str> {
    match bytes {
        // JPEG: FF D8 FF
        [0xFF, 0xD8, 0xFF, ..] => Some("image/jpeg"),
        // PNG: 89 50 4E 47
        [0x89, 0x50, 0x4E, 0x47, ..] => Some("image/png"),
        // GIF: 47 49 46 38
        [0x47, 0x49, 0x46, 0x38, ..] => Some("image/gif"),
        // WebP: 52 49 46 46 ... 57 45 42 50
        [0x52, 0x49, 0x46, 0x46, _, _, _, _, 0x57, 0x45, 0x42, 0x50, ..] => Some("image/webp"),
        _ => None,
    }
}

fn extension_for_mime(mime: &str) -> &'static str {
    match mime {
        "image/jpeg" => "jpg",
        "image/png" => "png",
        "image/gif" => "gif",
        _ => "webp",
    }
}

/// Client-supplied names are only inspected for their extension; anything
/// that looks like a path is refused outright.
fn is_safe_filename(filename: &str) -> bool {
    !filename.contains("..")
        && !filename.contains('/')
        && !filename.contains('\\')
        && !filename.contains('\0')
}

/// POST /api/uploads - Store an image under a random name (admin)
pub async fn upload_image(
    _admin: AdminSession,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<UploadResponse>), AppError> {
    let field = match multipart.next_field().await {
        Ok(Some(field)) => field,
        Ok(None) => return Err(AppError::BadRequest("No file provided".to_string())),
        Err(e) => {
            tracing::warn!("Multipart error: {}", e);
            return Err(AppError::BadRequest("Invalid multipart data".to_string()));
        }
    };

    let original_name = field.file_name().unwrap_or("unknown").to_string();
    if !is_safe_filename(&original_name) {
        return Err(AppError::BadRequest("Invalid filename".to_string()));
    }
    let original_ext = original_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_lowercase())
        .unwrap_or_default();
    if !ALLOWED_EXTENSIONS.contains(&original_ext.as_str()) {
        return Err(AppError::BadRequest(
            "Unsupported file type. Allowed: JPEG, PNG, WebP, GIF.".to_string(),
        ));
    }

    let bytes = field.bytes().await.map_err(|e| {
        tracing::warn!("Failed to read upload bytes: {}", e);
        AppError::BadRequest("Failed to read file data".to_string())
    })?;

    if bytes.len() > MAX_FILE_SIZE {
        return Err(AppError::BadRequest(
            "File too large. Maximum size is 5MB.".to_string(),
        ));
    }
    if bytes.is_empty() {
        return Err(AppError::BadRequest("Empty file".to_string()));
    }

    let mime_type = validate_image_magic_bytes(&bytes).ok_or_else(|| {
        AppError::BadRequest("File content does not match an allowed image type.".to_string())
    })?;

    let upload_dir = &state.config.upload_dir;
    tokio::fs::create_dir_all(upload_dir)
        .await
        .map_err(|e| AppError::Internal(format!("create upload directory: {}", e)))?;

    let filename = format!("{}.{}", Uuid::new_v4(), extension_for_mime(mime_type));
    tokio::fs::write(upload_dir.join(&filename), &bytes)
        .await
        .map_err(|e| AppError::Internal(format!("write upload {}: {}", filename, e)))?;

    tracing::info!("Image uploaded: {} ({} bytes)", filename, bytes.len());

    Ok((
        StatusCode::CREATED,
        Json(UploadResponse {
            url: format!("/uploads/{}", filename),
            filename,
            size: bytes.len(),
            mime_type: mime_type.to_string(),
        }),
    ))
}
