use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An ephemeral, unpaid claim on a spot (cart-stage reservation).
///
/// The ownership record lives server-side keyed by `id`; `owner` is a
/// free-text session or user identifier, so anonymous carts are allowed.
/// Holds are never revoked by a timer of their own — an overdue hold waits
/// for the sweep.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hold {
    pub id: Uuid,
    pub space_id: Uuid,
    pub spot_label: String,
    pub owner: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Hold {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}
