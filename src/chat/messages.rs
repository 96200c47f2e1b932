//! REST endpoints for chat message history and creation.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use rusqlite::Connection;
use serde::Deserialize;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::auth::middleware::Claims;
use crate::chat::conv_allowed;
use crate::db::models::Message;
use crate::state::AppState;
use crate::ws::broadcast;
use crate::ws::protocol::ServerEvent;

/// Maximum messages returned per conv.
const HISTORY_LIMIT: u32 = 100;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMessageRequest {
    #[serde(default)]
    pub text: String,
    pub conv: String,
    #[serde(rename = "type", default)]
    pub message_type: Option<String>,
    #[serde(default)]
    pub audio_url: String,
    #[serde(default)]
    pub duration: i64,
}

/// Build the reactions map for a message: emoji -> list of user names.
pub fn load_reactions(conn: &Connection, message_id: &str) -> rusqlite::Result<Value> {
    let mut stmt = conn.prepare(
        "SELECT emoji, user_name FROM message_reactions
         WHERE message_id = ?1 ORDER BY emoji",
    )?;
    let mut map: Map<String, Value> = Map::new();
    let rows = stmt.query_map(rusqlite::params![message_id], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
    })?;
    for row in rows {
        let (emoji, user_name) = row?;
        if let Some(users) = map
            .entry(emoji)
            .or_insert_with(|| Value::Array(Vec::new()))
            .as_array_mut()
        {
            users.push(Value::String(user_name));
        }
    }
    Ok(Value::Object(map))
}

fn message_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Message> {
    Ok(Message {
        id: row.get(0)?,
        author: row.get(1)?,
        name: row.get(2)?,
        role: row.get(3)?,
        text: row.get(4)?,
        audio_url: row.get(5)?,
        duration: row.get(6)?,
        message_type: row.get(7)?,
        conv: row.get(8)?,
        created_at: row.get(9)?,
        reactions: Value::Object(Map::new()),
    })
}

const MESSAGE_COLUMNS: &str =
    "id, author_id, author_name, author_role, text, audio_url, duration, message_type, conv, created_at";

/// GET /api/messages/{conv}
/// Conv history, oldest first. Members cannot read the admin conv.
pub async fn get_conv_messages(
    State(state): State<AppState>,
    claims: Claims,
    Path(conv): Path<String>,
) -> Result<Json<Vec<Message>>, StatusCode> {
    if !conv_allowed(&conv, &claims.role) {
        return Err(StatusCode::FORBIDDEN);
    }

    let db = state.db.clone();

    let messages = tokio::task::spawn_blocking(move || {
        let conn = db.lock().map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {MESSAGE_COLUMNS} FROM messages
                 WHERE conv = ?1 ORDER BY created_at LIMIT ?2"
            ))
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

        let mut messages: Vec<Message> = stmt
            .query_map(rusqlite::params![conv, HISTORY_LIMIT], |row| {
                message_from_row(row)
            })
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
            .filter_map(|r| r.ok())
            .collect();

        for msg in &mut messages {
            if let Ok(reactions) = load_reactions(&conn, &msg.id) {
                msg.reactions = reactions;
            }
        }

        Ok::<_, StatusCode>(messages)
    })
    .await
    .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)??;

    Ok(Json(messages))
}

/// POST /api/messages
/// Create a text or audio message and broadcast it to the conv room.
pub async fn create_message(
    State(state): State<AppState>,
    claims: Claims,
    Json(body): Json<CreateMessageRequest>,
) -> Result<Json<Message>, StatusCode> {
    if !conv_allowed(&body.conv, &claims.role) {
        return Err(StatusCode::FORBIDDEN);
    }

    let db = state.db.clone();

    let msg = tokio::task::spawn_blocking(move || {
        let conn = db.lock().map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

        let msg = Message {
            id: Uuid::now_v7().to_string(),
            author: claims.sub,
            name: claims.name,
            role: claims.role,
            text: body.text,
            audio_url: body.audio_url,
            duration: body.duration,
            message_type: body.message_type.unwrap_or_else(|| "text".to_string()),
            conv: body.conv,
            reactions: Value::Object(Map::new()),
            created_at: Utc::now().to_rfc3339(),
        };
        conn.execute(
            "INSERT INTO messages (id, author_id, author_name, author_role, text, audio_url, duration, message_type, conv, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            rusqlite::params![
                msg.id,
                msg.author,
                msg.name,
                msg.role,
                msg.text,
                msg.audio_url,
                msg.duration,
                msg.message_type,
                msg.conv,
                msg.created_at,
            ],
        )
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

        Ok::<_, StatusCode>(msg)
    })
    .await
    .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)??;

    let msg_value = serde_json::to_value(&msg).map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    broadcast::broadcast_to_room(
        &state.connections,
        &state.rooms,
        &msg.conv,
        &ServerEvent::NewMessage(msg_value),
    );

    Ok(Json(msg))
}
