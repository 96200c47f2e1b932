//! Community polls: single-choice votes that can be moved until the poll
//! closes or expires.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use rusqlite::Connection;
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::middleware::Claims;
use crate::db::models::{Poll, PollOption};
use crate::notifications;
use crate::state::AppState;
use crate::ws::broadcast;
use crate::ws::protocol::ServerEvent;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePollRequest {
    pub question: String,
    pub options: Vec<String>,
    #[serde(default)]
    pub expires_at: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteRequest {
    pub opt_index: usize,
}

fn load_poll(conn: &Connection, poll_id: &str) -> rusqlite::Result<Option<Poll>> {
    let base = conn.query_row(
        "SELECT id, question, expires_at, closed, created_at FROM polls WHERE id = ?1",
        rusqlite::params![poll_id],
        |row| {
            Ok(Poll {
                id: row.get(0)?,
                question: row.get(1)?,
                expires_at: row.get(2)?,
                closed: row.get::<_, i64>(3)? != 0,
                created_at: row.get(4)?,
                options: Vec::new(),
            })
        },
    );

    let mut poll = match base {
        Ok(poll) => poll,
        Err(rusqlite::Error::QueryReturnedNoRows) => return Ok(None),
        Err(e) => return Err(e),
    };

    let mut stmt = conn.prepare(
        "SELECT id, text FROM poll_options WHERE poll_id = ?1 ORDER BY position",
    )?;
    poll.options = stmt
        .query_map(rusqlite::params![poll_id], |row| {
            Ok(PollOption {
                id: row.get(0)?,
                text: row.get(1)?,
                votes: Vec::new(),
            })
        })?
        .collect::<rusqlite::Result<Vec<PollOption>>>()?;

    for option in &mut poll.options {
        let mut vstmt = conn.prepare(
            "SELECT user_id FROM poll_votes WHERE poll_id = ?1 AND option_id = ?2",
        )?;
        option.votes = vstmt
            .query_map(rusqlite::params![poll_id, option.id], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
    }

    Ok(Some(poll))
}

/// A poll accepts votes only while open and before its expiry.
fn poll_open(poll: &Poll) -> bool {
    if poll.closed {
        return false;
    }
    match &poll.expires_at {
        Some(expires) => match expires.parse::<DateTime<Utc>>() {
            Ok(expires) => Utc::now() < expires,
            Err(_) => true,
        },
        None => true,
    }
}

/// GET /api/polls
/// All polls, newest first. Public.
pub async fn list_polls(State(state): State<AppState>) -> Result<Json<Vec<Poll>>, StatusCode> {
    let db = state.db.clone();

    let polls = tokio::task::spawn_blocking(move || {
        let conn = db.lock().map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
        let mut stmt = conn
            .prepare("SELECT id FROM polls ORDER BY created_at DESC")
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
        let ids: Vec<String> = stmt
            .query_map([], |row| row.get(0))
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
            .filter_map(|r| r.ok())
            .collect();

        let mut polls = Vec::with_capacity(ids.len());
        for id in ids {
            if let Ok(Some(poll)) = load_poll(&conn, &id) {
                polls.push(poll);
            }
        }
        Ok::<_, StatusCode>(polls)
    })
    .await
    .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)??;

    Ok(Json(polls))
}

/// POST /api/polls
/// Create a poll. Admin or subadmin only.
pub async fn create_poll(
    State(state): State<AppState>,
    claims: Claims,
    Json(body): Json<CreatePollRequest>,
) -> Result<Json<Poll>, StatusCode> {
    if !claims.is_admin() {
        return Err(StatusCode::FORBIDDEN);
    }
    if body.question.trim().is_empty() || body.options.len() < 2 {
        return Err(StatusCode::BAD_REQUEST);
    }

    let db = state.db.clone();

    let (poll, notif) = tokio::task::spawn_blocking(move || {
        let conn = db.lock().map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

        let id = Uuid::now_v7().to_string();
        conn.execute(
            "INSERT INTO polls (id, question, expires_at, closed, created_at)
             VALUES (?1, ?2, ?3, 0, ?4)",
            rusqlite::params![id, body.question, body.expires_at, Utc::now().to_rfc3339()],
        )
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

        for (position, text) in body.options.iter().enumerate() {
            conn.execute(
                "INSERT INTO poll_options (id, poll_id, position, text) VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![Uuid::now_v7().to_string(), id, position as i64, text],
            )
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
        }

        let poll = load_poll(&conn, &id)
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
            .ok_or(StatusCode::INTERNAL_SERVER_ERROR)?;

        let notif = notifications::create(
            &conn,
            "post",
            "Nouveau Sondage !",
            &poll.question,
            "/sondages.html",
        )
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

        Ok::<_, StatusCode>((poll, notif))
    })
    .await
    .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)??;

    let poll_value = serde_json::to_value(&poll).map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    let notif_value = serde_json::to_value(&notif).map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    broadcast::broadcast_to_all(&state.connections, &ServerEvent::NewPoll(poll_value));
    broadcast::broadcast_to_all(&state.connections, &ServerEvent::NewNotif(notif_value));

    Ok(Json(poll))
}

/// POST /api/polls/{id}/vote
/// Cast or move the caller's vote. Closed or expired polls reject with 400.
pub async fn vote(
    State(state): State<AppState>,
    claims: Claims,
    Path(poll_id): Path<String>,
    Json(body): Json<VoteRequest>,
) -> Result<Json<Poll>, StatusCode> {
    let db = state.db.clone();
    let user_id = claims.sub;
    let id = poll_id.clone();

    let poll = tokio::task::spawn_blocking(move || {
        let conn = db.lock().map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

        let poll = load_poll(&conn, &id)
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
            .ok_or(StatusCode::BAD_REQUEST)?;
        if !poll_open(&poll) {
            return Err(StatusCode::BAD_REQUEST);
        }
        let option = poll.options.get(body.opt_index).ok_or(StatusCode::BAD_REQUEST)?;

        // One vote per user; a second vote moves it
        conn.execute(
            "INSERT INTO poll_votes (poll_id, user_id, option_id) VALUES (?1, ?2, ?3)
             ON CONFLICT(poll_id, user_id) DO UPDATE SET option_id = ?3",
            rusqlite::params![id, user_id, option.id],
        )
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

        load_poll(&conn, &id)
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
            .ok_or(StatusCode::INTERNAL_SERVER_ERROR)
    })
    .await
    .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)??;

    let poll_value = serde_json::to_value(&poll).map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    broadcast::broadcast_to_all(&state.connections, &ServerEvent::UpdatePoll(poll_value));

    Ok(Json(poll))
}

/// PATCH /api/polls/{id}/close
/// Close a poll to further votes. Admin or subadmin only.
pub async fn close_poll(
    State(state): State<AppState>,
    claims: Claims,
    Path(poll_id): Path<String>,
) -> Result<Json<Poll>, StatusCode> {
    if !claims.is_admin() {
        return Err(StatusCode::FORBIDDEN);
    }

    let db = state.db.clone();
    let id = poll_id.clone();

    let poll = tokio::task::spawn_blocking(move || {
        let conn = db.lock().map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
        let changed = conn
            .execute("UPDATE polls SET closed = 1 WHERE id = ?1", rusqlite::params![id])
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
        if changed == 0 {
            return Err(StatusCode::NOT_FOUND);
        }
        load_poll(&conn, &id)
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
            .ok_or(StatusCode::NOT_FOUND)
    })
    .await
    .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)??;

    let poll_value = serde_json::to_value(&poll).map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    broadcast::broadcast_to_all(&state.connections, &ServerEvent::UpdatePoll(poll_value));

    Ok(Json(poll))
}

/// DELETE /api/polls/{id}
/// Remove a poll. Admin or subadmin only.
pub async fn delete_poll(
    State(state): State<AppState>,
    claims: Claims,
    Path(poll_id): Path<String>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    if !claims.is_admin() {
        return Err(StatusCode::FORBIDDEN);
    }

    let db = state.db.clone();
    let id = poll_id.clone();

    tokio::task::spawn_blocking(move || {
        let conn = db.lock().map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
        conn.execute("DELETE FROM polls WHERE id = ?1", rusqlite::params![id])
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
        Ok::<(), StatusCode>(())
    })
    .await
    .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)??;

    broadcast::broadcast_to_all(&state.connections, &ServerEvent::DeletePoll { poll_id });

    Ok(Json(serde_json::json!({ "success": true })))
}
