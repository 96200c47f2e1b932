pub mod actor;
pub mod broadcast;
pub mod handler;
pub mod protocol;

use dashmap::DashMap;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Type alias for the sender half of a WebSocket connection's channel.
/// Other parts of the system can clone this to push messages to a specific client.
pub type ConnectionSender = mpsc::UnboundedSender<axum::extract::ws::Message>;

/// Connection registry: one entry per live WebSocket connection, keyed by
/// the server-assigned connection id. The connection id is the addressing
/// key for signaling relay and live presence.
pub type ConnectionRegistry = Arc<DashMap<String, ConnectionSender>>;

/// Conv room registry: conv name -> set of subscribed connection ids.
/// Chat messages and reaction updates fan out per conv.
pub type RoomRegistry = Arc<DashMap<String, HashSet<String>>>;

/// Create a new empty connection registry.
pub fn new_connection_registry() -> ConnectionRegistry {
    Arc::new(DashMap::new())
}

/// Create a new empty room registry.
pub fn new_room_registry() -> RoomRegistry {
    Arc::new(DashMap::new())
}

/// Subscribe a connection to a conv room.
pub fn join_room(rooms: &RoomRegistry, conv: &str, conn_id: &str) {
    rooms
        .entry(conv.to_string())
        .or_default()
        .insert(conn_id.to_string());
}

/// Remove a connection from every conv room it joined.
/// Empty rooms are dropped.
pub fn leave_all_rooms(rooms: &RoomRegistry, conn_id: &str) {
    let room_names: Vec<String> = rooms.iter().map(|e| e.key().clone()).collect();
    for name in room_names {
        if let Some(mut members) = rooms.get_mut(&name) {
            members.remove(conn_id);
            if members.is_empty() {
                drop(members);
                rooms.remove(&name);
            }
        }
    }
}
