//! Likes and comments on feed posts.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::middleware::Claims;
use crate::db::models::Comment;
use crate::feed::posts;
use crate::state::AppState;
use crate::ws::broadcast;
use crate::ws::protocol::ServerEvent;

#[derive(Debug, Serialize)]
pub struct LikesResponse {
    pub likes: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct CommentRequest {
    pub text: String,
}

/// POST /api/posts/{id}/like
/// Toggle the caller's like. Broadcasts the updated like list.
pub async fn toggle_like(
    State(state): State<AppState>,
    claims: Claims,
    Path(post_id): Path<String>,
) -> Result<Json<LikesResponse>, StatusCode> {
    let db = state.db.clone();
    let user_id = claims.sub;
    let id = post_id.clone();

    let likes = tokio::task::spawn_blocking(move || {
        let conn = db.lock().map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

        let exists: bool = conn
            .query_row(
                "SELECT COUNT(*) FROM posts WHERE id = ?1",
                rusqlite::params![id],
                |row| row.get::<_, i64>(0).map(|c| c > 0),
            )
            .unwrap_or(false);
        if !exists {
            return Err(StatusCode::NOT_FOUND);
        }

        let removed = conn
            .execute(
                "DELETE FROM post_likes WHERE post_id = ?1 AND user_id = ?2",
                rusqlite::params![id, user_id],
            )
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
        if removed == 0 {
            conn.execute(
                "INSERT INTO post_likes (post_id, user_id) VALUES (?1, ?2)",
                rusqlite::params![id, user_id],
            )
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
        }

        posts::load_likes(&conn, &id).map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
    })
    .await
    .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)??;

    broadcast::broadcast_to_all(
        &state.connections,
        &ServerEvent::UpdateLikes {
            post_id,
            likes: likes.clone(),
        },
    );

    Ok(Json(LikesResponse { likes }))
}

/// POST /api/posts/{id}/comment
/// Append a comment. Author name and role are denormalized from the token.
pub async fn add_comment(
    State(state): State<AppState>,
    claims: Claims,
    Path(post_id): Path<String>,
    Json(body): Json<CommentRequest>,
) -> Result<Json<Vec<Comment>>, StatusCode> {
    let text = body.text.trim().to_string();
    if text.is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }

    let db = state.db.clone();
    let id = post_id.clone();
    let author_id = claims.sub.clone();
    let author_name = claims.name.clone();
    let author_role = claims.role.clone();

    let (comment, comments) = tokio::task::spawn_blocking(move || {
        let conn = db.lock().map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

        let exists: bool = conn
            .query_row(
                "SELECT COUNT(*) FROM posts WHERE id = ?1",
                rusqlite::params![id],
                |row| row.get::<_, i64>(0).map(|c| c > 0),
            )
            .unwrap_or(false);
        if !exists {
            return Err(StatusCode::NOT_FOUND);
        }

        let comment = Comment {
            id: Uuid::now_v7().to_string(),
            author: author_id,
            name: author_name,
            role: author_role,
            text,
            created_at: Utc::now().to_rfc3339(),
        };
        conn.execute(
            "INSERT INTO post_comments (id, post_id, author_id, author_name, author_role, text, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            rusqlite::params![
                comment.id,
                id,
                comment.author,
                comment.name,
                comment.role,
                comment.text,
                comment.created_at,
            ],
        )
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

        let post = posts::load_post(&conn, &id)
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
            .ok_or(StatusCode::NOT_FOUND)?;

        Ok::<_, StatusCode>((comment, post.comments))
    })
    .await
    .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)??;

    let comment_value =
        serde_json::to_value(&comment).map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    broadcast::broadcast_to_all(
        &state.connections,
        &ServerEvent::NewComment {
            post_id,
            comment: comment_value,
        },
    );

    Ok(Json(comments))
}
