//! HTTP control over the live session, sharing state with the WS coordinator.

use axum::{extract::State, http::StatusCode, Json};

use crate::auth::middleware::Claims;
use crate::live::LiveSnapshot;
use crate::state::AppState;

/// GET /api/live
/// Current session summary. Public; consistent with the WS view because it
/// reads the same state.
pub async fn live_status(State(state): State<AppState>) -> Json<LiveSnapshot> {
    Json(state.live.snapshot())
}

/// POST /api/admin/live/stop
/// Force-stop the session regardless of which connection started it.
pub async fn stop_live(
    State(state): State<AppState>,
    claims: Claims,
) -> Result<Json<serde_json::Value>, StatusCode> {
    if !claims.is_admin() {
        return Err(StatusCode::FORBIDDEN);
    }

    let stopped = !state.live.force_stop().is_empty();
    if stopped {
        tracing::info!(admin = %claims.sub, "Live session stopped by admin");
    }

    Ok(Json(serde_json::json!({ "success": true, "stopped": stopped })))
}
