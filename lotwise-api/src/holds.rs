use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct PlaceHoldRequest {
    pub space_id: Uuid,
    pub spot_label: String,
    /// Anonymous carts pass a client-generated session id; if absent one is
    /// minted so the hold still has a server-side owner record.
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PlaceHoldResponse {
    pub hold_id: Uuid,
    pub space_id: Uuid,
    pub spot_label: String,
    pub expires_at: DateTime<Utc>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/holds", post(place_hold))
        .route("/v1/holds/{hold_id}", delete(release_hold))
}

async fn place_hold(
    State(state): State<AppState>,
    Json(req): Json<PlaceHoldRequest>,
) -> Result<(StatusCode, Json<PlaceHoldResponse>), AppError> {
    let owner = req
        .session_id
        .unwrap_or_else(|| format!("anon-{}", Uuid::new_v4().simple()));

    let hold = state
        .holds
        .place_hold(req.space_id, &req.spot_label, &owner, None)?;

    Ok((
        StatusCode::CREATED,
        Json(PlaceHoldResponse {
            hold_id: hold.id,
            space_id: hold.space_id,
            spot_label: hold.spot_label,
            expires_at: hold.expires_at,
        }),
    ))
}

/// Unconditional release; repeating it (or releasing an unknown id) is a
/// success so clients can fire-and-forget from flaky connections.
async fn release_hold(State(state): State<AppState>, Path(hold_id): Path<Uuid>) -> StatusCode {
    state.holds.release_hold(hold_id);
    StatusCode::NO_CONTENT
}
