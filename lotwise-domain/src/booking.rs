use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Booking lifecycle status.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Active,
    Completed,
    Cancelled,
}

impl BookingStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, BookingStatus::Completed | BookingStatus::Cancelled)
    }

    /// The transition table. Anything not listed is illegal.
    pub fn can_transition_to(&self, next: BookingStatus) -> bool {
        use BookingStatus::*;
        matches!(
            (self, next),
            (Pending, Confirmed)
                | (Pending, Cancelled)
                | (Confirmed, Active)
                | (Confirmed, Completed)
                | (Confirmed, Cancelled)
                | (Active, Completed)
        )
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
    Refunded,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VehicleDetails {
    pub plate: String,
    pub model: Option<String>,
}

/// The durable record of a driver's intent to pay for a spot over a time
/// window. Never deleted, only transitioned to a terminal status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: Uuid,
    pub space_id: Uuid,
    pub spot_label: String,
    pub driver_id: String,
    pub host_id: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    /// Minor units (cents).
    pub total_price: i64,
    pub currency: String,
    pub vehicle: Option<VehicleDetails>,
    pub status: BookingStatus,
    pub payment_status: PaymentStatus,
    /// Push-payment correlation id, set once payment is initiated.
    pub correlation_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    pub fn update_status(&mut self, new_status: BookingStatus, now: DateTime<Utc>) {
        self.status = new_status;
        self.updated_at = now;
    }

    pub fn update_payment_status(&mut self, new_status: PaymentStatus, now: DateTime<Utc>) {
        self.payment_status = new_status;
        self.updated_at = now;
    }
}

/// Simple rate x duration pricing, rounding the window up to whole hours.
pub fn price_for_window(
    rate_per_hour: i64,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> i64 {
    let minutes = (end - start).num_minutes().max(0);
    let hours = (minutes + 59) / 60;
    rate_per_hour * hours
}

/// Checkout request as received from the client.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateBookingRequest {
    pub space_id: Uuid,
    pub spot_label: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub vehicle: Option<VehicleDetails>,
    /// Hold to convert, if the driver placed one first.
    pub hold_id: Option<Uuid>,
    /// Mobile-money number the push payment is sent to.
    pub payer_contact: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_transition_table() {
        use BookingStatus::*;
        assert!(Pending.can_transition_to(Confirmed));
        assert!(Pending.can_transition_to(Cancelled));
        assert!(Confirmed.can_transition_to(Active));
        assert!(Confirmed.can_transition_to(Completed));
        assert!(Active.can_transition_to(Completed));

        assert!(!Completed.can_transition_to(Pending));
        assert!(!Cancelled.can_transition_to(Confirmed));
        assert!(!Active.can_transition_to(Cancelled));
        assert!(!Pending.can_transition_to(Active));
    }

    #[test]
    fn test_price_rounds_up_to_whole_hours() {
        let start = Utc::now();
        assert_eq!(price_for_window(500, start, start + Duration::hours(2)), 1000);
        assert_eq!(
            price_for_window(500, start, start + Duration::minutes(90)),
            1000
        );
        assert_eq!(price_for_window(500, start, start - Duration::hours(1)), 0);
    }
}
