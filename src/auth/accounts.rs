//! Account endpoints: signup, login, profile, and password change.
//! Passwords are bcrypt-hashed; login enforces suspension with automatic
//! restore once the restore date has passed.

use axum::{extract::State, http::StatusCode, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::jwt;
use crate::auth::middleware::Claims;
use crate::db::models::User;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub country: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: User,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub bio: Option<String>,
    pub country: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub new_password: String,
}

/// Map a users table row (without password_hash) to the User model.
/// Column order: id, name, email, country, role, avatar, bio,
/// suspended, suspended_reason, restore_date, created_at.
pub fn user_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        country: row.get(3)?,
        role: row.get(4)?,
        avatar: row.get(5)?,
        bio: row.get(6)?,
        suspended: row.get::<_, i64>(7)? != 0,
        suspended_reason: row.get(8)?,
        restore_date: row.get(9)?,
        created_at: row.get(10)?,
    })
}

pub const USER_COLUMNS: &str =
    "id, name, email, country, role, avatar, bio, suspended, suspended_reason, restore_date, created_at";

/// POST /api/auth/signup
/// Create an account and return a token. Email must be unused.
pub async fn signup(
    State(state): State<AppState>,
    Json(body): Json<SignupRequest>,
) -> Result<Json<AuthResponse>, StatusCode> {
    let name = body.name.trim().to_string();
    let email = body.email.trim().to_lowercase();
    if name.is_empty() || email.is_empty() || body.password.is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }

    let db = state.db.clone();
    let password = body.password.clone();
    let country = body.country.clone();

    let user = tokio::task::spawn_blocking(move || {
        // bcrypt is CPU-bound, keep it off the async runtime
        let hash = bcrypt::hash(&password, bcrypt::DEFAULT_COST)
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

        let conn = db.lock().map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

        let taken: bool = conn
            .query_row(
                "SELECT COUNT(*) FROM users WHERE email = ?1",
                rusqlite::params![email],
                |row| row.get::<_, i64>(0).map(|c| c > 0),
            )
            .unwrap_or(false);
        if taken {
            return Err(StatusCode::BAD_REQUEST);
        }

        let id = Uuid::now_v7().to_string();
        let now = Utc::now().to_rfc3339();
        conn.execute(
            "INSERT INTO users (id, name, email, password_hash, country, role, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, 'member', ?6)",
            rusqlite::params![id, name, email, hash, country, now],
        )
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

        Ok(User {
            id,
            name,
            email,
            country,
            role: "member".to_string(),
            avatar: String::new(),
            bio: String::new(),
            suspended: false,
            suspended_reason: String::new(),
            restore_date: None,
            created_at: now,
        })
    })
    .await
    .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)??;

    let token = jwt::issue_token(&state.jwt_secret, &user.id, &user.name, &user.email, &user.role)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    tracing::info!(user_id = %user.id, "Account created");
    Ok(Json(AuthResponse { token, user }))
}

/// POST /api/auth/login
/// Verify credentials and return a token. Suspended accounts are rejected
/// with 403 until their restore date passes, at which point the suspension
/// is lifted automatically.
pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, StatusCode> {
    let db = state.db.clone();
    let email = body.email.trim().to_lowercase();
    let password = body.password.clone();

    let user = tokio::task::spawn_blocking(move || {
        let conn = db.lock().map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

        let (user, hash): (User, String) = conn
            .query_row(
                &format!(
                    "SELECT {USER_COLUMNS}, password_hash FROM users WHERE email = ?1"
                ),
                rusqlite::params![email],
                |row| Ok((user_from_row(row)?, row.get(11)?)),
            )
            .map_err(|_| StatusCode::BAD_REQUEST)?;

        let mut user = user;
        if user.suspended {
            let restore_passed = user
                .restore_date
                .as_deref()
                .and_then(|d| DateTime::parse_from_rfc3339(d).ok())
                .map(|d| Utc::now() >= d)
                .unwrap_or(false);

            if restore_passed {
                // Suspension expired — lift it
                conn.execute(
                    "UPDATE users SET suspended = 0, restore_date = NULL WHERE id = ?1",
                    rusqlite::params![user.id],
                )
                .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
                user.suspended = false;
                user.restore_date = None;
            } else {
                return Err(StatusCode::FORBIDDEN);
            }
        }

        if !bcrypt::verify(&password, &hash).unwrap_or(false) {
            return Err(StatusCode::BAD_REQUEST);
        }

        Ok(user)
    })
    .await
    .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)??;

    let token = jwt::issue_token(&state.jwt_secret, &user.id, &user.name, &user.email, &user.role)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(Json(AuthResponse { token, user }))
}

/// GET /api/auth/me — Return the authenticated user's profile.
pub async fn get_me(
    State(state): State<AppState>,
    claims: Claims,
) -> Result<Json<User>, StatusCode> {
    let db = state.db.clone();
    let user_id = claims.sub;

    let user = tokio::task::spawn_blocking(move || {
        let conn = db.lock().map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
        conn.query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
            rusqlite::params![user_id],
            |row| user_from_row(row),
        )
        .map_err(|_| StatusCode::NOT_FOUND)
    })
    .await
    .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)??;

    Ok(Json(user))
}

/// PUT /api/auth/me — Update own bio and country.
pub async fn update_me(
    State(state): State<AppState>,
    claims: Claims,
    Json(body): Json<UpdateProfileRequest>,
) -> Result<Json<User>, StatusCode> {
    let db = state.db.clone();
    let user_id = claims.sub;

    let user = tokio::task::spawn_blocking(move || {
        let conn = db.lock().map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

        if let Some(bio) = &body.bio {
            conn.execute(
                "UPDATE users SET bio = ?1 WHERE id = ?2",
                rusqlite::params![bio, user_id],
            )
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
        }
        if let Some(country) = &body.country {
            conn.execute(
                "UPDATE users SET country = ?1 WHERE id = ?2",
                rusqlite::params![country, user_id],
            )
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
        }

        conn.query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
            rusqlite::params![user_id],
            |row| user_from_row(row),
        )
        .map_err(|_| StatusCode::NOT_FOUND)
    })
    .await
    .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)??;

    Ok(Json(user))
}

/// PUT /api/auth/password — Change own password. Minimum 6 characters.
pub async fn change_password(
    State(state): State<AppState>,
    claims: Claims,
    Json(body): Json<ChangePasswordRequest>,
) -> Result<StatusCode, StatusCode> {
    if body.new_password.len() < 6 {
        return Err(StatusCode::BAD_REQUEST);
    }

    let db = state.db.clone();
    let user_id = claims.sub;
    let password = body.new_password;

    tokio::task::spawn_blocking(move || {
        let hash = bcrypt::hash(&password, bcrypt::DEFAULT_COST)
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
        let conn = db.lock().map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
        conn.execute(
            "UPDATE users SET password_hash = ?1 WHERE id = ?2",
            rusqlite::params![hash, user_id],
        )
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
        Ok::<(), StatusCode>(())
    })
    .await
    .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)??;

    Ok(StatusCode::OK)
}

/// Seed the primary admin account on first boot if it does not exist.
pub fn seed_admin(
    db: &crate::db::DbPool,
    email: &str,
    password: &str,
) -> Result<bool, Box<dyn std::error::Error>> {
    let conn = db.lock().map_err(|e| format!("DB lock error: {}", e))?;

    let exists: bool = conn.query_row(
        "SELECT COUNT(*) FROM users WHERE email = ?1",
        rusqlite::params![email],
        |row| row.get::<_, i64>(0).map(|c| c > 0),
    )?;
    if exists {
        return Ok(false);
    }

    let hash = bcrypt::hash(password, bcrypt::DEFAULT_COST)?;
    let id = Uuid::now_v7().to_string();
    let now = Utc::now().to_rfc3339();
    conn.execute(
        "INSERT INTO users (id, name, email, password_hash, role, created_at)
         VALUES (?1, 'Admin Glory', ?2, ?3, 'admin', ?4)",
        rusqlite::params![id, email, hash, now],
    )?;

    Ok(true)
}
