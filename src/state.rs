use std::path::PathBuf;

use crate::db::DbPool;
use crate::live::LiveState;
use crate::ws::{ConnectionRegistry, RoomRegistry};

/// Shared application state passed to all handlers via axum State extractor.
#[derive(Clone)]
pub struct AppState {
    /// SQLite connection wrapped in Arc<Mutex>
    pub db: DbPool,
    /// JWT signing secret (256-bit random key)
    pub jwt_secret: Vec<u8>,
    /// Active WebSocket connections keyed by connection id
    pub connections: ConnectionRegistry,
    /// Conv room membership for chat broadcasts
    pub rooms: RoomRegistry,
    /// Live session coordinator state
    pub live: LiveState,
    /// Directory where uploaded media is stored
    pub uploads_dir: PathBuf,
}
