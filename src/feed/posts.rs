//! REST endpoints for feed post CRUD.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use rusqlite::Connection;
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::middleware::Claims;
use crate::db::models::{Author, Comment, Post};
use crate::notifications;
use crate::state::AppState;
use crate::ws::broadcast;
use crate::ws::protocol::ServerEvent;

/// Maximum posts returned by the feed listing.
const FEED_LIMIT: u32 = 50;
/// Notification preview length (chars).
const NOTIF_PREVIEW_LEN: usize = 80;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePostRequest {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub post_type: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub media_url: String,
}

/// Load one post with author, likes and comments joined in.
pub fn load_post(conn: &Connection, post_id: &str) -> rusqlite::Result<Option<Post>> {
    let base = conn.query_row(
        "SELECT p.id, p.kind, p.post_type, p.title, p.content, p.media_url, p.created_at,
                u.id, u.name, u.avatar, u.role
         FROM posts p
         JOIN users u ON u.id = p.author_id
         WHERE p.id = ?1",
        rusqlite::params![post_id],
        |row| {
            Ok(Post {
                id: row.get(0)?,
                kind: row.get(1)?,
                post_type: row.get(2)?,
                title: row.get(3)?,
                content: row.get(4)?,
                media_url: row.get(5)?,
                created_at: row.get(6)?,
                author: Author {
                    id: row.get(7)?,
                    name: row.get(8)?,
                    avatar: row.get(9)?,
                    role: row.get(10)?,
                },
                likes: Vec::new(),
                comments: Vec::new(),
            })
        },
    );

    let mut post = match base {
        Ok(post) => post,
        Err(rusqlite::Error::QueryReturnedNoRows) => return Ok(None),
        Err(e) => return Err(e),
    };

    post.likes = load_likes(conn, post_id)?;
    post.comments = load_comments(conn, post_id)?;
    Ok(Some(post))
}

/// User ids that currently like a post.
pub fn load_likes(conn: &Connection, post_id: &str) -> rusqlite::Result<Vec<String>> {
    let mut stmt = conn.prepare("SELECT user_id FROM post_likes WHERE post_id = ?1")?;
    let likes = stmt
        .query_map(rusqlite::params![post_id], |row| row.get(0))?
        .collect::<rusqlite::Result<Vec<String>>>()?;
    Ok(likes)
}

fn load_comments(conn: &Connection, post_id: &str) -> rusqlite::Result<Vec<Comment>> {
    let mut stmt = conn.prepare(
        "SELECT id, author_id, author_name, author_role, text, created_at
         FROM post_comments WHERE post_id = ?1 ORDER BY created_at",
    )?;
    let comments = stmt
        .query_map(rusqlite::params![post_id], |row| {
            Ok(Comment {
                id: row.get(0)?,
                author: row.get(1)?,
                name: row.get(2)?,
                role: row.get(3)?,
                text: row.get(4)?,
                created_at: row.get(5)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<Comment>>>()?;
    Ok(comments)
}

/// GET /api/posts
/// Latest feed posts, newest first. Public.
pub async fn list_posts(State(state): State<AppState>) -> Result<Json<Vec<Post>>, StatusCode> {
    let db = state.db.clone();

    let posts = tokio::task::spawn_blocking(move || {
        let conn = db.lock().map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
        let mut stmt = conn
            .prepare("SELECT id FROM posts ORDER BY created_at DESC LIMIT ?1")
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
        let ids: Vec<String> = stmt
            .query_map(rusqlite::params![FEED_LIMIT], |row| row.get(0))
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
            .filter_map(|r| r.ok())
            .collect();

        let mut posts = Vec::with_capacity(ids.len());
        for id in ids {
            if let Ok(Some(post)) = load_post(&conn, &id) {
                posts.push(post);
            }
        }
        Ok::<_, StatusCode>(posts)
    })
    .await
    .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)??;

    Ok(Json(posts))
}

/// POST /api/posts
/// Create a feed post. Admin or subadmin only. Broadcasts the post and a
/// notification to every connected client.
pub async fn create_post(
    State(state): State<AppState>,
    claims: Claims,
    Json(body): Json<CreatePostRequest>,
) -> Result<Json<Post>, StatusCode> {
    if !claims.is_admin() {
        return Err(StatusCode::FORBIDDEN);
    }

    let db = state.db.clone();
    let author_id = claims.sub.clone();

    let (post, notif) = tokio::task::spawn_blocking(move || {
        let conn = db.lock().map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

        let id = Uuid::now_v7().to_string();
        let created_at = Utc::now().to_rfc3339();
        conn.execute(
            "INSERT INTO posts (id, author_id, kind, post_type, title, content, media_url, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            rusqlite::params![
                id,
                author_id,
                body.kind.as_deref().unwrap_or("Message"),
                body.post_type.as_deref().unwrap_or("texte"),
                body.title,
                body.content,
                body.media_url,
                created_at,
            ],
        )
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

        let post = load_post(&conn, &id)
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
            .ok_or(StatusCode::INTERNAL_SERVER_ERROR)?;

        let title = if body.title.is_empty() {
            "Nouvelle publication"
        } else {
            &body.title
        };
        let preview: String = body.content.chars().take(NOTIF_PREVIEW_LEN).collect();
        let notif = notifications::create(&conn, "post", title, &preview, "/index.html")
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

        Ok::<_, StatusCode>((post, notif))
    })
    .await
    .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)??;

    let post_value = serde_json::to_value(&post).map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    let notif_value = serde_json::to_value(&notif).map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    broadcast::broadcast_to_all(&state.connections, &ServerEvent::NewPost(post_value));
    broadcast::broadcast_to_all(&state.connections, &ServerEvent::NewNotif(notif_value));

    Ok(Json(post))
}

/// DELETE /api/posts/{id}
/// Remove a post and its likes and comments. Admin or subadmin only.
pub async fn delete_post(
    State(state): State<AppState>,
    claims: Claims,
    Path(post_id): Path<String>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    if !claims.is_admin() {
        return Err(StatusCode::FORBIDDEN);
    }

    let db = state.db.clone();
    let id = post_id.clone();

    tokio::task::spawn_blocking(move || {
        let conn = db.lock().map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
        conn.execute("DELETE FROM posts WHERE id = ?1", rusqlite::params![id])
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
        Ok::<(), StatusCode>(())
    })
    .await
    .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)??;

    broadcast::broadcast_to_all(&state.connections, &ServerEvent::DeletePost { post_id });

    Ok(Json(serde_json::json!({ "success": true })))
}
