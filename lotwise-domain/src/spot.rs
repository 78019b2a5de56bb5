use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Occupancy state of a single parking spot.
///
/// A spot is either free, held by an unpaid cart-stage claim that expires
/// on its own, or committed to a booking. Keeping this as a tagged variant
/// means a released spot cannot carry a stale `held_until` around.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "state", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SpotState {
    Available,
    Held {
        hold_id: Uuid,
        until: DateTime<Utc>,
    },
    Booked {
        booking_id: Uuid,
        /// None for a confirmed booking with no fixed end (kept until
        /// explicitly completed or cancelled).
        until: Option<DateTime<Utc>>,
    },
}

/// One physically bookable position within a space.
///
/// `label` is host-assigned and unique within the owning space. `version`
/// increments on every state change; the ledger uses it as the
/// compare-and-swap guard on the claim path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Spot {
    pub label: String,
    pub state: SpotState,
    pub version: u64,
}

impl Spot {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            state: SpotState::Available,
            version: 0,
        }
    }

    /// Whether a new claim may take this spot at `now`. An expired hold
    /// counts as claimable; a booking never does, even past its window
    /// (the sweeper completes it first).
    pub fn is_claimable(&self, now: DateTime<Utc>) -> bool {
        match &self.state {
            SpotState::Available => true,
            SpotState::Held { until, .. } => *until <= now,
            SpotState::Booked { .. } => false,
        }
    }

    /// Availability as reported to callers: claimable, normalized
    /// against the clock so an overdue hold already reads as free.
    pub fn is_available(&self, now: DateTime<Utc>) -> bool {
        self.is_claimable(now)
    }

    /// Whether the spot is free for a window opening at `from`. A spot
    /// carries at most one current claim, so anything ending by `from` no
    /// longer blocks, including a booking past its end (the sweeper will
    /// have completed it by then). An open-ended booking always blocks.
    pub fn is_free_from(&self, from: DateTime<Utc>) -> bool {
        match &self.state {
            SpotState::Available => true,
            SpotState::Held { until, .. } => *until <= from,
            SpotState::Booked {
                until: Some(until), ..
            } => *until <= from,
            SpotState::Booked { until: None, .. } => false,
        }
    }
}

/// A host's listed space: an ordered set of uniquely labeled spots plus the
/// derived aggregate availability flag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Space {
    pub id: Uuid,
    pub host_id: String,
    pub spots: Vec<Spot>,
    /// True iff at least one spot is available. Recomputed by the ledger
    /// on every mutation.
    pub available: bool,
}

impl Space {
    pub fn new(id: Uuid, host_id: impl Into<String>, labels: Vec<String>) -> Self {
        let spots = labels.into_iter().map(Spot::new).collect::<Vec<_>>();
        let available = !spots.is_empty();
        Self {
            id,
            host_id: host_id.into(),
            spots,
            available,
        }
    }

    pub fn spot(&self, label: &str) -> Option<&Spot> {
        self.spots.iter().find(|s| s.label == label)
    }

    pub fn spot_mut(&mut self, label: &str) -> Option<&mut Spot> {
        self.spots.iter_mut().find(|s| s.label == label)
    }

    pub fn recompute_availability(&mut self, now: DateTime<Utc>) {
        self.available = self.spots.iter().any(|s| s.is_available(now));
    }
}
