//! Delivery helpers over the connection registry.
//! Encoding failures and sends to closed channels are silently dropped —
//! unicast to an absent connection is a no-op, not an error.

use super::{ConnectionRegistry, RoomRegistry};
use crate::ws::protocol::ServerEvent;

fn encode(event: &ServerEvent) -> Option<axum::extract::ws::Message> {
    match serde_json::to_string(event) {
        Ok(json) => Some(axum::extract::ws::Message::Text(json.into())),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode server event");
            None
        }
    }
}

/// Broadcast an event to every connected client.
pub fn broadcast_to_all(registry: &ConnectionRegistry, event: &ServerEvent) {
    let Some(msg) = encode(event) else { return };
    for entry in registry.iter() {
        let _ = entry.value().send(msg.clone());
    }
}

/// Send an event to a single connection. No-op if the id is not connected.
pub fn send_to_conn(registry: &ConnectionRegistry, conn_id: &str, event: &ServerEvent) {
    let Some(msg) = encode(event) else { return };
    if let Some(sender) = registry.get(conn_id) {
        let _ = sender.send(msg);
    }
}

/// Send an event to an explicit set of connections.
pub fn send_to_conns(registry: &ConnectionRegistry, conn_ids: &[String], event: &ServerEvent) {
    let Some(msg) = encode(event) else { return };
    for conn_id in conn_ids {
        if let Some(sender) = registry.get(conn_id) {
            let _ = sender.send(msg.clone());
        }
    }
}

/// Broadcast an event to every member of a conv room.
pub fn broadcast_to_room(
    registry: &ConnectionRegistry,
    rooms: &RoomRegistry,
    conv: &str,
    event: &ServerEvent,
) {
    let members: Vec<String> = rooms
        .get(conv)
        .map(|m| m.iter().cloned().collect())
        .unwrap_or_default();
    send_to_conns(registry, &members, event);
}
