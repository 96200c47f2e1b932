//! Live session state: the singleton broadcast session, the viewer presence
//! registry, and the live room membership set.
//!
//! All state lives behind one mutex. Every operation mutates state, computes
//! its outbound event plan, and pushes the plan onto the connection channels
//! inside the same critical section. Sends are unbounded-channel pushes and
//! never block, and because they happen under the lock, two racing operations
//! can never emit their viewer counts out of order: the last viewer_count on
//! the wire always reflects the registry size that last mutation produced.
//! Operations also return the plan, for the coordinator's logging and for
//! transport-free tests.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ws::protocol::ServerEvent;
use crate::ws::{broadcast, ConnectionRegistry};

/// Stream kind: camera+mic or audio-only broadcast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StreamKind {
    #[serde(rename = "video")]
    VideoAudio,
    #[serde(rename = "audio")]
    AudioOnly,
}

/// A viewer enrolled in the live room. Rebuilt each session, never persisted.
#[derive(Debug, Clone)]
pub struct ViewerRecord {
    pub name: String,
    pub role: String,
}

/// The singleton broadcast session. `broadcaster` is a connection id and is
/// valid only while that connection is alive — the coordinator clears the
/// session on its disconnect.
#[derive(Debug, Clone)]
pub struct LiveSession {
    pub broadcaster: String,
    pub title: String,
    pub kind: StreamKind,
    pub started_at: DateTime<Utc>,
}

/// Summary of the current session for the HTTP status endpoint.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveSnapshot {
    pub active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub live_type: Option<StreamKind>,
    pub viewer_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
}

/// Where a planned event should be delivered.
#[derive(Debug, Clone, PartialEq)]
pub enum Target {
    /// Every connected client (global announcements).
    All,
    /// One connection id. Delivery to an absent id is a silent no-op.
    One(String),
    /// An explicit set of connection ids (room snapshot taken under the lock).
    Room(Vec<String>),
}

/// An outbound event paired with its delivery target.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub target: Target,
    pub event: ServerEvent,
}

impl Delivery {
    fn all(event: ServerEvent) -> Self {
        Self {
            target: Target::All,
            event,
        }
    }
    fn one(conn_id: &str, event: ServerEvent) -> Self {
        Self {
            target: Target::One(conn_id.to_string()),
            event,
        }
    }
    fn room(members: Vec<String>, event: ServerEvent) -> Self {
        Self {
            target: Target::Room(members),
            event,
        }
    }
}

/// Inner state guarded by the session mutex.
#[derive(Debug, Default)]
struct LiveRoom {
    session: Option<LiveSession>,
    /// Viewer presence registry keyed by connection id. The broadcaster is
    /// never enrolled here.
    viewers: HashMap<String, ViewerRecord>,
    /// Live room membership: broadcaster plus all viewers. Kept explicitly
    /// rather than derived, so relay logic needs no transport grouping.
    room: HashSet<String>,
}

impl LiveRoom {
    fn room_snapshot(&self) -> Vec<String> {
        self.room.iter().cloned().collect()
    }

    /// End the current session, clearing all viewer state.
    /// Returns the live_ended delivery for the room as it was.
    fn end_session(&mut self) -> Option<Delivery> {
        self.session.take()?;
        let members = self.room_snapshot();
        self.viewers.clear();
        self.room.clear();
        Some(Delivery::room(members, ServerEvent::LiveEnded))
    }

    /// Enroll a connection as a viewer and plan the resulting events:
    /// viewer_count to the room, viewer_joined to the broadcaster (if any),
    /// live_info to the new viewer (if a session is active).
    fn enroll_viewer(&mut self, conn_id: &str, record: ViewerRecord, notice_name: &str) -> Vec<Delivery> {
        self.room.insert(conn_id.to_string());
        self.viewers.insert(conn_id.to_string(), record);
        let count = self.viewers.len();

        let mut plan = Vec::new();

        if let Some(session) = &self.session {
            plan.push(Delivery::one(
                conn_id,
                ServerEvent::LiveInfo {
                    title: session.title.clone(),
                    live_type: session.kind,
                    viewer_count: count,
                },
            ));
        }

        plan.push(Delivery::room(
            self.room_snapshot(),
            ServerEvent::ViewerCount { count },
        ));

        if let Some(session) = &self.session {
            plan.push(Delivery::one(
                &session.broadcaster,
                ServerEvent::ViewerJoined {
                    viewer_id: conn_id.to_string(),
                    name: notice_name.to_string(),
                },
            ));
        }

        plan
    }

    /// Drop a viewer if present. No-op for unknown ids — disconnect and an
    /// explicit leave for the same connection may both fire.
    fn drop_viewer(&mut self, conn_id: &str) -> Vec<Delivery> {
        if self.viewers.remove(conn_id).is_none() {
            return Vec::new();
        }
        self.room.remove(conn_id);
        let count = self.viewers.len();

        let mut plan = vec![Delivery::room(
            self.room_snapshot(),
            ServerEvent::ViewerCount { count },
        )];

        if let Some(session) = &self.session {
            plan.push(Delivery::one(
                &session.broadcaster,
                ServerEvent::ViewerLeft {
                    viewer_id: conn_id.to_string(),
                },
            ));
        }

        plan
    }
}

/// Handle on live session state. Cheap to clone; constructed in main (or a
/// test) and carried in AppState — never a process-wide global.
#[derive(Debug, Clone)]
pub struct LiveState {
    inner: Arc<Mutex<LiveRoom>>,
    /// Shared with AppState; delivery under the session lock goes straight
    /// onto these channels.
    connections: ConnectionRegistry,
}

impl LiveState {
    pub fn new(connections: ConnectionRegistry) -> Self {
        Self {
            inner: Arc::default(),
            connections,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, LiveRoom> {
        // A poisoned session lock means a panic mid-transition; recovering
        // the inner data keeps unrelated connections working.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Push a plan onto the connection channels. Callers invoke this while
    /// still holding the session lock so emission order matches mutation
    /// order across connections.
    fn emit(&self, plan: &[Delivery]) {
        for Delivery { target, event } in plan {
            match target {
                Target::All => broadcast::broadcast_to_all(&self.connections, event),
                Target::One(conn_id) => broadcast::send_to_conn(&self.connections, conn_id, event),
                Target::Room(members) => broadcast::send_to_conns(&self.connections, members, event),
            }
        }
    }

    /// Start a broadcast with the calling connection as broadcaster.
    ///
    /// If a session is already active under a different connection, it is
    /// force-stopped first: its room receives live_ended and the viewer
    /// registry is cleared, exactly as on broadcaster disconnect. The same
    /// broadcaster re-issuing start_live just rebinds title and kind.
    pub fn start(&self, conn_id: &str, title: String, kind: StreamKind) -> Vec<Delivery> {
        let mut room = self.lock();
        let mut plan = Vec::new();

        match &room.session {
            Some(session) if session.broadcaster == conn_id => {
                // Rebind without tearing the room down
            }
            Some(_) => {
                if let Some(ended) = room.end_session() {
                    plan.push(ended);
                }
            }
            None => {}
        }

        let viewer_count = room.viewers.len();
        room.room.insert(conn_id.to_string());
        room.session = Some(LiveSession {
            broadcaster: conn_id.to_string(),
            title: title.clone(),
            kind,
            started_at: Utc::now(),
        });

        // Global announcement so idle users can discover the live
        plan.push(Delivery::all(ServerEvent::LiveStarted {
            title,
            live_type: kind,
            viewer_count,
        }));
        self.emit(&plan);
        plan
    }

    /// Enroll the calling connection as a viewer. Valid in any state.
    pub fn join(&self, conn_id: &str, name: &str, role: &str) -> Vec<Delivery> {
        let mut room = self.lock();
        let active = room.session.is_some();
        let record = ViewerRecord {
            name: name.to_string(),
            role: role.to_string(),
        };
        // enroll_viewer plans live_info first (check_live order); an explicit
        // join sends viewer_count and the broadcaster notice before live_info
        let mut plan = room.enroll_viewer(conn_id, record, name);
        if active {
            plan.rotate_left(1);
        }
        self.emit(&plan);
        plan
    }

    /// Query for an active session. Implicit join when one exists: the caller
    /// is enrolled as a generic viewer and receives live_info; otherwise it
    /// gets no_live and no state changes.
    pub fn check(&self, conn_id: &str) -> Vec<Delivery> {
        let mut room = self.lock();
        let plan = if room.session.is_none() {
            vec![Delivery::one(conn_id, ServerEvent::NoLive)]
        } else {
            let record = ViewerRecord {
                name: "viewer".to_string(),
                role: "member".to_string(),
            };
            room.enroll_viewer(conn_id, record, "Spectateur")
        };
        self.emit(&plan);
        plan
    }

    /// Stop the broadcast. Only honored for the recorded broadcaster —
    /// anyone else is a silent no-op, as is stopping when idle.
    pub fn stop(&self, conn_id: &str) -> Vec<Delivery> {
        let mut room = self.lock();
        let plan: Vec<Delivery> = match &room.session {
            Some(session) if session.broadcaster == conn_id => {
                room.end_session().into_iter().collect()
            }
            _ => Vec::new(),
        };
        self.emit(&plan);
        plan
    }

    /// Explicit viewer leave. Unknown ids are a no-op.
    pub fn leave(&self, conn_id: &str) -> Vec<Delivery> {
        let mut room = self.lock();
        let plan = room.drop_viewer(conn_id);
        self.emit(&plan);
        plan
    }

    /// Transport-level disconnect. The broadcaster check runs strictly before
    /// the viewer check: the broadcaster is never enrolled as a viewer, and
    /// broadcaster cleanup takes precedence if that invariant is ever broken.
    pub fn disconnect(&self, conn_id: &str) -> Vec<Delivery> {
        let mut room = self.lock();
        let is_broadcaster = room
            .session
            .as_ref()
            .is_some_and(|s| s.broadcaster == conn_id);
        let plan: Vec<Delivery> = if is_broadcaster {
            room.end_session().into_iter().collect()
        } else {
            room.drop_viewer(conn_id)
        };
        self.emit(&plan);
        plan
    }

    /// Force-stop from the HTTP admin path, regardless of caller.
    pub fn force_stop(&self) -> Vec<Delivery> {
        let mut room = self.lock();
        let plan: Vec<Delivery> = room.end_session().into_iter().collect();
        self.emit(&plan);
        plan
    }

    /// Relay an emoji reaction to the live room. No state kept.
    pub fn reaction(&self, emoji: &str, user_name: &str) -> Vec<Delivery> {
        let room = self.lock();
        let plan = vec![Delivery::room(
            room.room_snapshot(),
            ServerEvent::LiveReaction {
                emoji: emoji.to_string(),
                user_name: user_name.to_string(),
            },
        )];
        self.emit(&plan);
        plan
    }

    /// Relay a chat comment to the live room, timestamped with the
    /// coordinator's clock (HH:MM), not the sender's.
    pub fn comment(&self, text: &str, user_name: &str, user_role: &str) -> Vec<Delivery> {
        let room = self.lock();
        let plan = vec![Delivery::room(
            room.room_snapshot(),
            ServerEvent::LiveComment {
                text: text.to_string(),
                user_name: user_name.to_string(),
                user_role: user_role.to_string(),
                time: Utc::now().format("%H:%M").to_string(),
            },
        )];
        self.emit(&plan);
        plan
    }

    /// Current broadcaster connection id, if a session is active.
    pub fn broadcaster(&self) -> Option<String> {
        self.lock().session.as_ref().map(|s| s.broadcaster.clone())
    }

    /// Session summary for GET /api/live.
    pub fn snapshot(&self) -> LiveSnapshot {
        let room = self.lock();
        match &room.session {
            Some(session) => LiveSnapshot {
                active: true,
                title: Some(session.title.clone()),
                live_type: Some(session.kind),
                viewer_count: room.viewers.len(),
                started_at: Some(session.started_at),
            },
            None => LiveSnapshot {
                active: false,
                title: None,
                live_type: None,
                viewer_count: room.viewers.len(),
                started_at: None,
            },
        }
    }

    /// Viewer presence registry size.
    pub fn viewer_count(&self) -> usize {
        self.lock().viewers.len()
    }
}
