use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::booking::{BookingStatus, PaymentStatus};

/// Availability change for one spot, streamed to live UIs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpotEvent {
    pub space_id: Uuid,
    pub spot_label: String,
    pub kind: SpotEventKind,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SpotEventKind {
    Held { hold_id: Uuid, until: DateTime<Utc> },
    Booked { booking_id: Uuid },
    Released,
}

/// Booking status change. Sweep-driven cancellations carry a reason so the
/// driver can be notified.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingEvent {
    pub booking_id: Uuid,
    pub space_id: Uuid,
    pub spot_label: String,
    pub driver_id: String,
    pub status: BookingStatus,
    pub payment_status: PaymentStatus,
    pub reason: Option<String>,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EngineEvent {
    Spot(SpotEvent),
    Booking(BookingEvent),
}
