//! Media uploads: avatars, post media and voice messages.
//!
//! Files land in the uploads directory under a timestamped name derived from
//! the original filename (whitespace replaced with dashes) and are served
//! back at /uploads/{name}.

use std::path::{Path as FsPath, PathBuf};

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;

use crate::auth::middleware::Claims;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub url: String,
}

/// Sanitize a client-supplied filename: basename only, whitespace to dashes.
fn safe_file_name(original: &str) -> String {
    let base = FsPath::new(original)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("upload");
    base.split_whitespace().collect::<Vec<_>>().join("-")
}

/// Pull the named field out of a multipart body and persist it.
/// Returns the public /uploads URL.
async fn save_upload(
    uploads_dir: &FsPath,
    mut multipart: Multipart,
    field_name: &str,
) -> Result<String, StatusCode> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| StatusCode::BAD_REQUEST)?
    {
        if field.name() != Some(field_name) {
            continue;
        }

        let original = field.file_name().unwrap_or("upload").to_string();
        let file_name = format!(
            "{}-{}",
            chrono::Utc::now().timestamp_millis(),
            safe_file_name(&original)
        );
        let data = field.bytes().await.map_err(|_| StatusCode::BAD_REQUEST)?;
        if data.is_empty() {
            return Err(StatusCode::BAD_REQUEST);
        }

        let path: PathBuf = uploads_dir.join(&file_name);
        tokio::fs::write(&path, &data)
            .await
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

        tracing::debug!(file = %file_name, bytes = data.len(), "Stored upload");
        return Ok(format!("/uploads/{file_name}"));
    }

    Err(StatusCode::BAD_REQUEST)
}

/// POST /api/auth/avatar
/// Store a new avatar and point the caller's profile at it.
pub async fn upload_avatar(
    State(state): State<AppState>,
    claims: Claims,
    multipart: Multipart,
) -> Result<Json<UploadResponse>, StatusCode> {
    let url = save_upload(&state.uploads_dir, multipart, "avatar").await?;

    let db = state.db.clone();
    let user_id = claims.sub;
    let avatar = url.clone();
    tokio::task::spawn_blocking(move || {
        let conn = db.lock().map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
        conn.execute(
            "UPDATE users SET avatar = ?1 WHERE id = ?2",
            rusqlite::params![avatar, user_id],
        )
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
        Ok::<(), StatusCode>(())
    })
    .await
    .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)??;

    Ok(Json(UploadResponse { url }))
}

/// POST /api/posts/media
/// Store post media. Admin or subadmin only; the URL is attached to a post
/// in a follow-up create call.
pub async fn upload_post_media(
    State(state): State<AppState>,
    claims: Claims,
    multipart: Multipart,
) -> Result<Json<UploadResponse>, StatusCode> {
    if !claims.is_admin() {
        return Err(StatusCode::FORBIDDEN);
    }
    let url = save_upload(&state.uploads_dir, multipart, "media").await?;
    Ok(Json(UploadResponse { url }))
}

/// POST /api/messages/audio
/// Store a voice message recording.
pub async fn upload_message_audio(
    State(state): State<AppState>,
    _claims: Claims,
    multipart: Multipart,
) -> Result<Json<UploadResponse>, StatusCode> {
    let url = save_upload(&state.uploads_dir, multipart, "audio").await?;
    Ok(Json(UploadResponse { url }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_names_are_flattened_and_dashed() {
        assert_eq!(safe_file_name("my photo.png"), "my-photo.png");
        assert_eq!(safe_file_name("../../etc/passwd"), "passwd");
        assert_eq!(safe_file_name("voice  note.webm"), "voice-note.webm");
    }
}
