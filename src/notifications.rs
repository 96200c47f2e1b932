//! Broadcast notifications: created as a side effect of posts, events and
//! polls, listed per user with a computed read flag.

use axum::{extract::State, http::StatusCode, Json};
use chrono::Utc;
use rusqlite::Connection;
use uuid::Uuid;

use crate::auth::middleware::Claims;
use crate::db::models::Notification;
use crate::state::AppState;

/// Maximum notifications returned by the listing endpoint.
const LIST_LIMIT: u32 = 30;

/// Insert a notification row. Called from inside other modules' blocking
/// sections so the notification commits together with the triggering write.
/// The caller broadcasts the returned row as a new_notif event.
pub fn create(
    conn: &Connection,
    kind: &str,
    title: &str,
    message: &str,
    url: &str,
) -> rusqlite::Result<Notification> {
    let id = Uuid::now_v7().to_string();
    let created_at = Utc::now().to_rfc3339();
    conn.execute(
        "INSERT INTO notifications (id, kind, title, message, url, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        rusqlite::params![id, kind, title, message, url, created_at],
    )?;
    Ok(Notification {
        id,
        kind: kind.to_string(),
        title: title.to_string(),
        message: message.to_string(),
        url: url.to_string(),
        read: false,
        created_at,
    })
}

/// GET /api/notifs
/// Latest notifications, newest first, with the caller's read flag.
pub async fn list_notifs(
    State(state): State<AppState>,
    claims: Claims,
) -> Result<Json<Vec<Notification>>, StatusCode> {
    let db = state.db.clone();
    let user_id = claims.sub;

    let notifs = tokio::task::spawn_blocking(move || {
        let conn = db.lock().map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
        let mut stmt = conn
            .prepare(
                "SELECT n.id, n.kind, n.title, n.message, n.url, n.created_at,
                        EXISTS(SELECT 1 FROM notification_reads r
                               WHERE r.notification_id = n.id AND r.user_id = ?1)
                 FROM notifications n
                 ORDER BY n.created_at DESC
                 LIMIT ?2",
            )
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

        let notifs: Vec<Notification> = stmt
            .query_map(rusqlite::params![user_id, LIST_LIMIT], |row| {
                Ok(Notification {
                    id: row.get(0)?,
                    kind: row.get(1)?,
                    title: row.get(2)?,
                    message: row.get(3)?,
                    url: row.get(4)?,
                    created_at: row.get(5)?,
                    read: row.get::<_, i64>(6)? != 0,
                })
            })
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
            .filter_map(|r| r.ok())
            .collect();

        Ok::<_, StatusCode>(notifs)
    })
    .await
    .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)??;

    Ok(Json(notifs))
}

/// POST /api/notifs/read
/// Mark every notification as read for the caller.
pub async fn mark_all_read(
    State(state): State<AppState>,
    claims: Claims,
) -> Result<Json<serde_json::Value>, StatusCode> {
    let db = state.db.clone();
    let user_id = claims.sub;

    tokio::task::spawn_blocking(move || {
        let conn = db.lock().map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
        conn.execute(
            "INSERT OR IGNORE INTO notification_reads (notification_id, user_id)
             SELECT id, ?1 FROM notifications",
            rusqlite::params![user_id],
        )
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
        Ok::<(), StatusCode>(())
    })
    .await
    .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)??;

    Ok(Json(serde_json::json!({ "success": true })))
}
