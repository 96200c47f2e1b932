//! WebRTC signaling relay. Media never transits the server: offers, answers
//! and ICE candidates are forwarded verbatim between the broadcaster and a
//! single viewer, addressed by connection id. A relay to an absent id is a
//! silent drop.

use crate::state::AppState;
use crate::ws::broadcast;
use crate::ws::protocol::ServerEvent;

/// Broadcaster -> viewer offer. The sender is tagged as the streamer so the
/// viewer knows where to address its answer.
pub fn relay_offer(state: &AppState, conn_id: &str, offer: serde_json::Value, target_id: &str) {
    tracing::debug!(from = %conn_id, to = %target_id, "Relaying WebRTC offer");
    broadcast::send_to_conn(
        &state.connections,
        target_id,
        &ServerEvent::WebrtcOffer {
            offer,
            streamer_id: conn_id.to_string(),
        },
    );
}

/// Viewer -> broadcaster answer, tagged with the answering viewer's id.
pub fn relay_answer(state: &AppState, conn_id: &str, answer: serde_json::Value, streamer_id: &str) {
    tracing::debug!(from = %conn_id, to = %streamer_id, "Relaying WebRTC answer");
    broadcast::send_to_conn(
        &state.connections,
        streamer_id,
        &ServerEvent::WebrtcAnswer {
            answer,
            viewer_id: conn_id.to_string(),
        },
    );
}

/// ICE candidate, either direction.
pub fn relay_ice_candidate(
    state: &AppState,
    conn_id: &str,
    candidate: serde_json::Value,
    target_id: &str,
) {
    broadcast::send_to_conn(
        &state.connections,
        target_id,
        &ServerEvent::IceCandidate {
            candidate,
            from_id: conn_id.to_string(),
        },
    );
}
