use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    routing::{delete, get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use futures_util::{Stream, StreamExt};
use lotwise_core::{Clock, SpaceListing};
use lotwise_domain::events::EngineEvent;
use lotwise_domain::spot::Spot;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RegisterSpaceRequest {
    pub name: String,
    pub host_id: String,
    /// Minor units (cents) per hour.
    pub rate_per_hour: i64,
    pub spot_labels: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct RegisterSpaceResponse {
    pub space_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct SpotsQuery {
    pub as_of: Option<DateTime<Utc>>,
    /// Optional booking window. Each spot carries at most one current
    /// claim, so availability for the window reduces to whether that
    /// claim ends by `start`.
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct SpotsResponse {
    pub space_id: Uuid,
    pub available: bool,
    pub spots: Vec<Spot>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/spaces", post(register_space))
        .route("/v1/spaces/{space_id}", delete(remove_space))
        .route("/v1/spaces/{space_id}/spots", get(list_spots))
        .route("/v1/spaces/{space_id}/bookings", get(list_space_bookings))
        .route("/v1/spaces/{space_id}/stream", get(space_stream))
}

/// Hook from the listing catalog: a newly listed space gets one ledger
/// entry per spot label. Listing CRUD beyond this lives elsewhere.
async fn register_space(
    State(state): State<AppState>,
    Json(req): Json<RegisterSpaceRequest>,
) -> Result<(StatusCode, Json<RegisterSpaceResponse>), AppError> {
    if req.spot_labels.is_empty() {
        return Err(AppError::Validation(
            "a space needs at least one spot label".to_string(),
        ));
    }
    let mut deduped = req.spot_labels.clone();
    deduped.sort();
    deduped.dedup();
    if deduped.len() != req.spot_labels.len() {
        return Err(AppError::Validation(
            "spot labels must be unique within a space".to_string(),
        ));
    }

    let space_id = Uuid::new_v4();
    state.catalog.insert(SpaceListing {
        id: space_id,
        host_id: req.host_id.clone(),
        name: req.name,
        rate_per_hour: req.rate_per_hour,
        spot_labels: req.spot_labels.clone(),
    });
    state
        .ledger
        .register_space(space_id, &req.host_id, req.spot_labels);

    Ok((StatusCode::CREATED, Json(RegisterSpaceResponse { space_id })))
}

async fn remove_space(
    State(state): State<AppState>,
    Path(space_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.catalog.remove(space_id);
    if state.ledger.remove_space(space_id) {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!("space not found: {}", space_id)))
    }
}

async fn list_spots(
    State(state): State<AppState>,
    Path(space_id): Path<Uuid>,
    Query(query): Query<SpotsQuery>,
) -> Result<Json<SpotsResponse>, AppError> {
    if let (Some(start), Some(end)) = (query.start, query.end) {
        if end <= start {
            return Err(AppError::Validation(
                "window ends before it starts".to_string(),
            ));
        }
    }

    let as_of = query.as_of.unwrap_or_else(|| state.clock.now());
    let spots = state.ledger.query(space_id, as_of)?;
    let available = match query.start {
        Some(start) => spots.iter().any(|s| s.is_free_from(start)),
        None => spots.iter().any(|s| s.is_available(as_of)),
    };
    Ok(Json(SpotsResponse {
        space_id,
        available,
        spots,
    }))
}

async fn list_space_bookings(
    State(state): State<AppState>,
    Path(space_id): Path<Uuid>,
) -> Json<Vec<lotwise_domain::booking::Booking>> {
    Json(state.engine.list_for_space(space_id))
}

/// Live availability/booking feed for one space, for UI refresh.
async fn space_stream(
    State(state): State<AppState>,
    Path(space_id): Path<Uuid>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.events.subscribe();

    let stream = tokio_stream::wrappers::BroadcastStream::new(rx).filter_map(move |result| {
        async move {
            let event = match result {
                Ok(event) => event,
                // Lagged receiver; drop and keep streaming.
                Err(_) => return None,
            };
            let (name, matches) = match &event {
                EngineEvent::Spot(e) => ("spot", e.space_id == space_id),
                EngineEvent::Booking(e) => ("booking", e.space_id == space_id),
            };
            if !matches {
                return None;
            }
            serde_json::to_string(&event)
                .ok()
                .map(|data| Ok::<_, Infallible>(Event::default().event(name).data(data)))
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}
