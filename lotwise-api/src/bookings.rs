use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use lotwise_core::{Identity, UserRef};
use lotwise_domain::booking::{Booking, BookingStatus, CreateBookingRequest};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct BookingResponse {
    pub booking: Booking,
    /// Present once the push payment has been initiated; a null here after
    /// creation means the gateway was down and `/pay` should be retried.
    pub correlation_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: BookingStatus,
    pub reason: Option<String>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/bookings", post(create_booking).get(list_my_bookings))
        .route("/v1/bookings/{booking_id}", get(get_booking))
        .route("/v1/bookings/{booking_id}/pay", post(retry_payment))
        .route("/v1/bookings/{booking_id}/status", post(update_status))
}

fn current_user(state: &AppState, headers: &HeaderMap) -> Result<UserRef, AppError> {
    let token = headers
        .get("x-user-id")
        .and_then(|v| v.to_str().ok());
    state
        .identity
        .resolve(token)
        .ok_or_else(|| AppError::Unauthenticated("booking requires an identified driver".to_string()))
}

async fn create_booking(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<CreateBookingRequest>,
) -> Result<(StatusCode, Json<BookingResponse>), AppError> {
    let driver = current_user(&state, &headers)?;
    let payer_contact = req.payer_contact.clone();

    let booking = state.engine.create_booking(req, &driver).await?;

    // Payment initiation is best-effort at checkout; a gateway outage
    // leaves the booking PENDING and the client retries via /pay before
    // the sweeper's grace period runs out.
    let correlation_id = match state.reconciler.initiate(booking.id, &payer_contact).await {
        Ok(corr) => Some(corr),
        Err(e) => {
            warn!(booking_id = %booking.id, error = %e, "payment initiation failed at checkout");
            None
        }
    };

    let booking = state.engine.get_booking(booking.id).unwrap_or(booking);
    Ok((
        StatusCode::CREATED,
        Json(BookingResponse {
            booking,
            correlation_id,
        }),
    ))
}

async fn retry_payment(
    State(state): State<AppState>,
    Path(booking_id): Path<Uuid>,
    Json(req): Json<RetryPaymentRequest>,
) -> Result<Json<BookingResponse>, AppError> {
    let correlation_id = state
        .reconciler
        .initiate(booking_id, &req.payer_contact)
        .await?;

    let booking = state
        .engine
        .get_booking(booking_id)
        .ok_or_else(|| AppError::NotFound(format!("booking not found: {}", booking_id)))?;
    Ok(Json(BookingResponse {
        booking,
        correlation_id: Some(correlation_id),
    }))
}

#[derive(Debug, Deserialize)]
pub struct RetryPaymentRequest {
    pub payer_contact: String,
}

/// Driver/host cancellation. Confirmation belongs to the payment callback
/// and activation/completion to the schedule, so no other target status is
/// accepted here.
async fn update_status(
    State(state): State<AppState>,
    Path(booking_id): Path<Uuid>,
    headers: HeaderMap,
    Json(req): Json<UpdateStatusRequest>,
) -> Result<Json<Booking>, AppError> {
    let _caller = current_user(&state, &headers)?;
    if req.status != BookingStatus::Cancelled {
        return Err(AppError::Validation(
            "only cancellation can be requested on this endpoint".to_string(),
        ));
    }

    let booking = state
        .engine
        .update_status(booking_id, req.status, req.reason.as_deref())?;
    Ok(Json(booking))
}

async fn list_my_bookings(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<Booking>>, AppError> {
    let driver = current_user(&state, &headers)?;
    Ok(Json(state.engine.list_for_driver(&driver.id)))
}

async fn get_booking(
    State(state): State<AppState>,
    Path(booking_id): Path<Uuid>,
) -> Result<Json<Booking>, AppError> {
    state
        .engine
        .get_booking(booking_id)
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("booking not found: {}", booking_id)))
}
