//! Live session coordination: applies each inbound live event to the session
//! state and logs the notable transitions.
//!
//! `LiveState` computes each operation's event plan and pushes it onto the
//! connection channels inside its own critical section, so a racing pair of
//! operations can never emit stale viewer counts. The returned plan is only
//! inspected here, never re-sent.

use crate::live::StreamKind;
use crate::state::AppState;
use crate::ws::protocol::ServerEvent;

pub fn handle_start_live(
    state: &AppState,
    conn_id: &str,
    title: String,
    live_type: StreamKind,
    user_name: &str,
) {
    tracing::info!(
        conn_id = %conn_id,
        user = %user_name,
        title = %title,
        "Live session started"
    );
    state.live.start(conn_id, title, live_type);
}

pub fn handle_join_live(state: &AppState, conn_id: &str, user_name: &str, user_role: &str) {
    tracing::debug!(conn_id = %conn_id, user = %user_name, "Viewer joined live");
    state.live.join(conn_id, user_name, user_role);
}

pub fn handle_check_live(state: &AppState, conn_id: &str) {
    state.live.check(conn_id);
}

pub fn handle_stop_live(state: &AppState, conn_id: &str) {
    let plan = state.live.stop(conn_id);
    if !plan.is_empty() {
        tracing::info!(conn_id = %conn_id, "Live session stopped");
    }
}

pub fn handle_leave_live(state: &AppState, conn_id: &str) {
    state.live.leave(conn_id);
}

pub fn handle_live_reaction(state: &AppState, emoji: &str, user_name: &str) {
    state.live.reaction(emoji, user_name);
}

pub fn handle_live_comment(state: &AppState, text: &str, user_name: &str, user_role: &str) {
    state.live.comment(text, user_name, user_role);
}

/// Connection teardown. Runs before the connection is removed from the
/// registry so a live_ended or viewer_count update still reaches the room.
pub fn handle_disconnect(state: &AppState, conn_id: &str) {
    let plan = state.live.disconnect(conn_id);
    if plan
        .iter()
        .any(|d| matches!(d.event, ServerEvent::LiveEnded))
    {
        tracing::info!(conn_id = %conn_id, "Broadcaster disconnected, live session ended");
    }
}
