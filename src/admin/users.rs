//! Member management endpoints. All require admin or subadmin; role changes
//! are reserved to the primary admin.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use crate::auth::accounts::{user_from_row, USER_COLUMNS};
use crate::auth::middleware::Claims;
use crate::db::models::User;
use crate::state::AppState;

const VALID_ROLES: &[&str] = &["member", "subadmin", "admin"];

#[derive(Debug, Deserialize)]
pub struct RoleRequest {
    pub role: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuspendRequest {
    pub suspended: bool,
    #[serde(default)]
    pub restore_date: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
}

/// GET /api/admin/users
pub async fn list_users(
    State(state): State<AppState>,
    claims: Claims,
) -> Result<Json<Vec<User>>, StatusCode> {
    if !claims.is_admin() {
        return Err(StatusCode::FORBIDDEN);
    }

    let db = state.db.clone();

    let users = tokio::task::spawn_blocking(move || {
        let conn = db.lock().map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC"
            ))
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
        let users: Vec<User> = stmt
            .query_map([], user_from_row)
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
            .filter_map(|r| r.ok())
            .collect();
        Ok::<_, StatusCode>(users)
    })
    .await
    .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)??;

    Ok(Json(users))
}

fn load_user(conn: &rusqlite::Connection, user_id: &str) -> Result<User, StatusCode> {
    conn.query_row(
        &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
        rusqlite::params![user_id],
        user_from_row,
    )
    .map_err(|_| StatusCode::NOT_FOUND)
}

/// PATCH /api/admin/users/{id}/role
/// Primary admin only.
pub async fn set_role(
    State(state): State<AppState>,
    claims: Claims,
    Path(user_id): Path<String>,
    Json(body): Json<RoleRequest>,
) -> Result<Json<User>, StatusCode> {
    if !claims.is_primary_admin() {
        return Err(StatusCode::FORBIDDEN);
    }
    if !VALID_ROLES.contains(&body.role.as_str()) {
        return Err(StatusCode::BAD_REQUEST);
    }

    let db = state.db.clone();

    let user = tokio::task::spawn_blocking(move || {
        let conn = db.lock().map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
        let changed = conn
            .execute(
                "UPDATE users SET role = ?1 WHERE id = ?2",
                rusqlite::params![body.role, user_id],
            )
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
        if changed == 0 {
            return Err(StatusCode::NOT_FOUND);
        }
        load_user(&conn, &user_id)
    })
    .await
    .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)??;

    Ok(Json(user))
}

/// PATCH /api/admin/users/{id}/suspend
/// Suspend or reinstate an account, optionally with an automatic restore
/// date checked at login.
pub async fn set_suspension(
    State(state): State<AppState>,
    claims: Claims,
    Path(user_id): Path<String>,
    Json(body): Json<SuspendRequest>,
) -> Result<Json<User>, StatusCode> {
    if !claims.is_admin() {
        return Err(StatusCode::FORBIDDEN);
    }

    let db = state.db.clone();

    let user = tokio::task::spawn_blocking(move || {
        let conn = db.lock().map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
        let changed = conn
            .execute(
                "UPDATE users SET suspended = ?1, restore_date = ?2, suspended_reason = ?3
                 WHERE id = ?4",
                rusqlite::params![
                    body.suspended,
                    body.restore_date,
                    body.reason.unwrap_or_default(),
                    user_id,
                ],
            )
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
        if changed == 0 {
            return Err(StatusCode::NOT_FOUND);
        }
        load_user(&conn, &user_id)
    })
    .await
    .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)??;

    Ok(Json(user))
}

/// DELETE /api/admin/users/{id}
pub async fn delete_user(
    State(state): State<AppState>,
    claims: Claims,
    Path(user_id): Path<String>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    if !claims.is_admin() {
        return Err(StatusCode::FORBIDDEN);
    }

    let db = state.db.clone();

    tokio::task::spawn_blocking(move || {
        let conn = db.lock().map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
        conn.execute("DELETE FROM users WHERE id = ?1", rusqlite::params![user_id])
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
        Ok::<(), StatusCode>(())
    })
    .await
    .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)??;

    Ok(Json(serde_json::json!({ "success": true })))
}
