//! Community events with toggle-style participation.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::middleware::Claims;
use crate::db::models::{Event, Participant};
use crate::notifications;
use crate::state::AppState;
use crate::ws::broadcast;
use crate::ws::protocol::ServerEvent;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEventRequest {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    pub title: String,
    pub date: String,
    #[serde(default)]
    pub time: String,
    #[serde(rename = "lieu", default)]
    pub location: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Serialize)]
pub struct ParticipantsResponse {
    pub participants: Vec<String>,
}

fn load_event(conn: &Connection, event_id: &str) -> rusqlite::Result<Option<Event>> {
    let base = conn.query_row(
        "SELECT id, kind, title, date, time, location, description, created_at
         FROM events WHERE id = ?1",
        rusqlite::params![event_id],
        |row| {
            Ok(Event {
                id: row.get(0)?,
                kind: row.get(1)?,
                title: row.get(2)?,
                date: row.get(3)?,
                time: row.get(4)?,
                location: row.get(5)?,
                description: row.get(6)?,
                created_at: row.get(7)?,
                participants: Vec::new(),
            })
        },
    );

    let mut event = match base {
        Ok(event) => event,
        Err(rusqlite::Error::QueryReturnedNoRows) => return Ok(None),
        Err(e) => return Err(e),
    };

    let mut stmt = conn.prepare(
        "SELECT u.id, u.name FROM event_participants ep
         JOIN users u ON u.id = ep.user_id
         WHERE ep.event_id = ?1",
    )?;
    event.participants = stmt
        .query_map(rusqlite::params![event_id], |row| {
            Ok(Participant {
                id: row.get(0)?,
                name: row.get(1)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<Participant>>>()?;

    Ok(Some(event))
}

/// GET /api/events
/// All events, soonest first. Public.
pub async fn list_events(State(state): State<AppState>) -> Result<Json<Vec<Event>>, StatusCode> {
    let db = state.db.clone();

    let events = tokio::task::spawn_blocking(move || {
        let conn = db.lock().map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
        let mut stmt = conn
            .prepare("SELECT id FROM events ORDER BY date")
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
        let ids: Vec<String> = stmt
            .query_map([], |row| row.get(0))
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
            .filter_map(|r| r.ok())
            .collect();

        let mut events = Vec::with_capacity(ids.len());
        for id in ids {
            if let Ok(Some(event)) = load_event(&conn, &id) {
                events.push(event);
            }
        }
        Ok::<_, StatusCode>(events)
    })
    .await
    .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)??;

    Ok(Json(events))
}

/// POST /api/events
/// Create an event. Admin or subadmin only. Broadcasts the event and a
/// notification carrying the event date.
pub async fn create_event(
    State(state): State<AppState>,
    claims: Claims,
    Json(body): Json<CreateEventRequest>,
) -> Result<Json<Event>, StatusCode> {
    if !claims.is_admin() {
        return Err(StatusCode::FORBIDDEN);
    }
    if body.title.trim().is_empty() || body.date.trim().is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }

    let db = state.db.clone();

    let (event, notif) = tokio::task::spawn_blocking(move || {
        let conn = db.lock().map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

        let id = Uuid::now_v7().to_string();
        conn.execute(
            "INSERT INTO events (id, kind, title, date, time, location, description, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            rusqlite::params![
                id,
                body.kind.as_deref().unwrap_or("Culte"),
                body.title,
                body.date,
                body.time,
                body.location,
                body.description,
                Utc::now().to_rfc3339(),
            ],
        )
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

        let event = load_event(&conn, &id)
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
            .ok_or(StatusCode::INTERNAL_SERVER_ERROR)?;

        let title = format!("Nouvel événement : {}", event.title);
        let message = if event.time.is_empty() {
            event.date.clone()
        } else {
            format!("{} à {}", event.date, event.time)
        };
        let notif = notifications::create(&conn, "event", &title, &message, "/evenements.html")
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

        Ok::<_, StatusCode>((event, notif))
    })
    .await
    .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)??;

    let event_value = serde_json::to_value(&event).map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    let notif_value = serde_json::to_value(&notif).map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    broadcast::broadcast_to_all(&state.connections, &ServerEvent::NewEvent(event_value));
    broadcast::broadcast_to_all(&state.connections, &ServerEvent::NewNotif(notif_value));

    Ok(Json(event))
}

/// POST /api/events/{id}/join
/// Toggle the caller's participation and broadcast the new participant list.
pub async fn toggle_participation(
    State(state): State<AppState>,
    claims: Claims,
    Path(event_id): Path<String>,
) -> Result<Json<ParticipantsResponse>, StatusCode> {
    let db = state.db.clone();
    let user_id = claims.sub;
    let id = event_id.clone();

    let participants = tokio::task::spawn_blocking(move || {
        let conn = db.lock().map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

        let exists: bool = conn
            .query_row(
                "SELECT COUNT(*) FROM events WHERE id = ?1",
                rusqlite::params![id],
                |row| row.get::<_, i64>(0).map(|c| c > 0),
            )
            .unwrap_or(false);
        if !exists {
            return Err(StatusCode::NOT_FOUND);
        }

        let removed = conn
            .execute(
                "DELETE FROM event_participants WHERE event_id = ?1 AND user_id = ?2",
                rusqlite::params![id, user_id],
            )
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
        if removed == 0 {
            conn.execute(
                "INSERT INTO event_participants (event_id, user_id) VALUES (?1, ?2)",
                rusqlite::params![id, user_id],
            )
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
        }

        let mut stmt = conn
            .prepare("SELECT user_id FROM event_participants WHERE event_id = ?1")
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
        let participants: Vec<String> = stmt
            .query_map(rusqlite::params![id], |row| row.get(0))
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
            .filter_map(|r| r.ok())
            .collect();

        Ok::<_, StatusCode>(participants)
    })
    .await
    .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)??;

    broadcast::broadcast_to_all(
        &state.connections,
        &ServerEvent::UpdateEvent {
            id: event_id,
            participants: participants.clone(),
        },
    );

    Ok(Json(ParticipantsResponse { participants }))
}

/// DELETE /api/events/{id}
/// Remove an event. Admin or subadmin only.
pub async fn delete_event(
    State(state): State<AppState>,
    claims: Claims,
    Path(event_id): Path<String>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    if !claims.is_admin() {
        return Err(StatusCode::FORBIDDEN);
    }

    let db = state.db.clone();
    let id = event_id.clone();

    tokio::task::spawn_blocking(move || {
        let conn = db.lock().map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
        conn.execute("DELETE FROM events WHERE id = ?1", rusqlite::params![id])
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
        Ok::<(), StatusCode>(())
    })
    .await
    .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)??;

    broadcast::broadcast_to_all(&state.connections, &ServerEvent::DeleteEvent { event_id });

    Ok(Json(serde_json::json!({ "success": true })))
}
