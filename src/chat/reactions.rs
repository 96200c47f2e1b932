//! Emoji reactions on chat messages. A reaction toggles per user name:
//! first request adds it, the next one removes it.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::Value;

use crate::auth::middleware::Claims;
use crate::chat::messages::load_reactions;
use crate::state::AppState;
use crate::ws::broadcast;
use crate::ws::protocol::ServerEvent;

#[derive(Debug, Deserialize)]
pub struct ReactRequest {
    pub emoji: String,
}

/// POST /api/messages/{id}/react
/// Toggle the caller's reaction and broadcast the full map to the conv room.
pub async fn toggle_reaction(
    State(state): State<AppState>,
    claims: Claims,
    Path(message_id): Path<String>,
    Json(body): Json<ReactRequest>,
) -> Result<Json<Value>, StatusCode> {
    let db = state.db.clone();
    let display_name = claims.name.clone();
    let msg_id = message_id.clone();
    let emoji = body.emoji;

    let (conv, reactions) = tokio::task::spawn_blocking(move || {
        let conn = db.lock().map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

        let conv: String = conn
            .query_row(
                "SELECT conv FROM messages WHERE id = ?1",
                rusqlite::params![msg_id],
                |row| row.get(0),
            )
            .map_err(|_| StatusCode::NOT_FOUND)?;

        let removed = conn
            .execute(
                "DELETE FROM message_reactions WHERE message_id = ?1 AND emoji = ?2 AND user_name = ?3",
                rusqlite::params![msg_id, emoji, display_name],
            )
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
        if removed == 0 {
            conn.execute(
                "INSERT INTO message_reactions (message_id, emoji, user_name) VALUES (?1, ?2, ?3)",
                rusqlite::params![msg_id, emoji, display_name],
            )
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
        }

        let reactions =
            load_reactions(&conn, &msg_id).map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
        Ok::<_, StatusCode>((conv, reactions))
    })
    .await
    .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)??;

    broadcast::broadcast_to_room(
        &state.connections,
        &state.rooms,
        &conv,
        &ServerEvent::UpdateReactions {
            msg_id: message_id,
            reactions: reactions.clone(),
        },
    );

    Ok(Json(serde_json::json!({ "reactions": reactions })))
}
