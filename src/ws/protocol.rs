//! JSON wire protocol for the real-time surface.
//!
//! Frames are text messages of the form `{"event": "...", "data": {...}}`.
//! Inbound frames are dispatched to the live coordinator, the signaling
//! relay, or the conv room registry. A frame that fails to parse is logged
//! and dropped — one bad client message must never disturb other connections.

use serde::{Deserialize, Serialize};

use crate::live::{coordinator, signaling, StreamKind};
use crate::state::AppState;

/// Inbound events, tagged by name.
#[derive(Debug, Clone, Deserialize)]
#[serde(
    tag = "event",
    content = "data",
    rename_all = "snake_case",
    rename_all_fields = "camelCase"
)]
pub enum ClientEvent {
    /// Subscribe this connection to a chat conv room.
    JoinConv { conv: String },

    /// Start broadcasting. The calling connection becomes the broadcaster.
    StartLive {
        title: String,
        live_type: StreamKind,
        user_name: String,
        #[serde(default)]
        user_role: String,
    },
    /// Enroll as a viewer of the live room.
    JoinLive {
        user_name: String,
        #[serde(default)]
        user_role: String,
    },
    /// Query for an active session; enrolls the caller if one exists.
    CheckLive {},
    /// End the session (broadcaster only; otherwise a no-op).
    StopLive {},
    /// Leave the live room explicitly.
    LeaveLive {},

    /// Broadcaster -> viewer peer-connection offer.
    WebrtcOffer {
        offer: serde_json::Value,
        target_id: String,
    },
    /// Viewer -> broadcaster peer-connection answer.
    WebrtcAnswer {
        answer: serde_json::Value,
        streamer_id: String,
    },
    /// ICE candidate exchange, either direction.
    IceCandidate {
        candidate: serde_json::Value,
        target_id: String,
    },

    /// Emoji reaction fanned out to the live room.
    LiveReaction { emoji: String, user_name: String },
    /// Chat comment fanned out to the live room, timestamped server-side.
    LiveComment {
        text: String,
        user_name: String,
        #[serde(default)]
        user_role: String,
    },
}

/// Outbound events, tagged by name.
#[derive(Debug, Clone, Serialize)]
#[serde(
    tag = "event",
    content = "data",
    rename_all = "snake_case",
    rename_all_fields = "camelCase"
)]
pub enum ServerEvent {
    /// Sent once on attach; carries the server-assigned connection id.
    Connected { conn_id: String },

    // Feed
    NewPost(serde_json::Value),
    DeletePost { post_id: String },
    UpdateLikes { post_id: String, likes: Vec<String> },
    NewComment {
        post_id: String,
        comment: serde_json::Value,
    },

    // Chat
    NewMessage(serde_json::Value),
    UpdateReactions {
        msg_id: String,
        reactions: serde_json::Value,
    },

    // Events
    NewEvent(serde_json::Value),
    UpdateEvent {
        id: String,
        participants: Vec<String>,
    },
    DeleteEvent { event_id: String },

    // Polls
    NewPoll(serde_json::Value),
    UpdatePoll(serde_json::Value),
    DeletePoll { poll_id: String },

    // Notifications
    NewNotif(serde_json::Value),

    // Live lifecycle
    LiveStarted {
        title: String,
        live_type: StreamKind,
        viewer_count: usize,
    },
    LiveInfo {
        title: String,
        live_type: StreamKind,
        viewer_count: usize,
    },
    ViewerCount { count: usize },
    ViewerJoined { viewer_id: String, name: String },
    ViewerLeft { viewer_id: String },
    LiveEnded,
    NoLive,
    LiveReaction { emoji: String, user_name: String },
    LiveComment {
        text: String,
        user_name: String,
        user_role: String,
        time: String,
    },

    // Signaling relay (all unicast)
    WebrtcOffer {
        offer: serde_json::Value,
        streamer_id: String,
    },
    WebrtcAnswer {
        answer: serde_json::Value,
        viewer_id: String,
    },
    IceCandidate {
        candidate: serde_json::Value,
        from_id: String,
    },
}

/// Decode a client frame. Clients may omit `data` (or send null) for events
/// that carry no payload; both forms decode to the same variant as an empty
/// `data: {}`.
fn decode_client_event(text: &str) -> Result<ClientEvent, serde_json::Error> {
    let mut value: serde_json::Value = serde_json::from_str(text)?;
    if let Some(frame) = value.as_object_mut() {
        let data = frame
            .entry("data")
            .or_insert(serde_json::Value::Null);
        if data.is_null() {
            *data = serde_json::Value::Object(serde_json::Map::new());
        }
    }
    serde_json::from_value(value)
}

/// Handle an incoming text frame: decode and dispatch.
pub fn handle_text_message(text: &str, state: &AppState, conn_id: &str) {
    let event = match decode_client_event(text) {
        Ok(event) => event,
        Err(e) => {
            tracing::warn!(
                conn_id = %conn_id,
                error = %e,
                "Failed to decode client event"
            );
            return;
        }
    };

    dispatch_event(event, state, conn_id);
}

/// Dispatch a decoded event to the appropriate handler.
fn dispatch_event(event: ClientEvent, state: &AppState, conn_id: &str) {
    match event {
        ClientEvent::JoinConv { conv } => {
            crate::ws::join_room(&state.rooms, &conv, conn_id);
            tracing::debug!(conn_id = %conn_id, conv = %conv, "Joined conv room");
        }

        ClientEvent::StartLive {
            title,
            live_type,
            user_name,
            user_role: _,
        } => coordinator::handle_start_live(state, conn_id, title, live_type, &user_name),
        ClientEvent::JoinLive {
            user_name,
            user_role,
        } => coordinator::handle_join_live(state, conn_id, &user_name, &user_role),
        ClientEvent::CheckLive {} => coordinator::handle_check_live(state, conn_id),
        ClientEvent::StopLive {} => coordinator::handle_stop_live(state, conn_id),
        ClientEvent::LeaveLive {} => coordinator::handle_leave_live(state, conn_id),

        ClientEvent::WebrtcOffer { offer, target_id } => {
            signaling::relay_offer(state, conn_id, offer, &target_id)
        }
        ClientEvent::WebrtcAnswer { answer, streamer_id } => {
            signaling::relay_answer(state, conn_id, answer, &streamer_id)
        }
        ClientEvent::IceCandidate {
            candidate,
            target_id,
        } => signaling::relay_ice_candidate(state, conn_id, candidate, &target_id),

        ClientEvent::LiveReaction { emoji, user_name } => {
            coordinator::handle_live_reaction(state, &emoji, &user_name)
        }
        ClientEvent::LiveComment {
            text,
            user_name,
            user_role,
        } => coordinator::handle_live_comment(state, &text, &user_name, &user_role),
    }
}
