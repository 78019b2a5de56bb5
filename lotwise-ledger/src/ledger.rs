use chrono::{DateTime, Utc};
use lotwise_core::Clock;
use lotwise_domain::spot::{Space, Spot, SpotState};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use tracing::{debug, warn};
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("space not found: {0}")]
    SpaceNotFound(Uuid),

    #[error("spot not found: {space_id}/{label}")]
    SpotNotFound { space_id: Uuid, label: String },

    #[error("spot already claimed: {space_id}/{label}")]
    Conflict { space_id: Uuid, label: String },
}

/// Who is taking the spot.
#[derive(Debug, Clone, Copy)]
pub enum Claimant {
    Hold {
        hold_id: Uuid,
        until: DateTime<Utc>,
    },
    Booking {
        booking_id: Uuid,
        until: Option<DateTime<Utc>>,
    },
}

/// Reference to whoever currently holds a spot, used for guarded releases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HolderRef {
    Hold(Uuid),
    Booking(Uuid),
}

/// The authoritative per-space record of spots and their occupancy.
///
/// Each space sits behind its own mutex; a claim's read-check-write runs
/// entirely inside that critical section, so two drivers racing for one
/// spot serialize there and exactly one wins. There is no cross-space
/// ordering and no global write lock on the hot path.
pub struct SpotLedger {
    spaces: RwLock<HashMap<Uuid, Arc<Mutex<Space>>>>,
    clock: Arc<dyn Clock>,
}

impl SpotLedger {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            spaces: RwLock::new(HashMap::new()),
            clock,
        }
    }

    /// Called when a host lists a space. Registering an id that already
    /// exists is ignored so active claims cannot be wiped by a replay.
    pub fn register_space(&self, space_id: Uuid, host_id: &str, labels: Vec<String>) {
        let mut spaces = self.spaces.write().expect("ledger lock poisoned");
        if spaces.contains_key(&space_id) {
            warn!(space_id = %space_id, "space already registered, ignoring");
            return;
        }
        spaces.insert(
            space_id,
            Arc::new(Mutex::new(Space::new(space_id, host_id, labels))),
        );
    }

    /// Deleting the owning space is the only way spots are ever removed.
    pub fn remove_space(&self, space_id: Uuid) -> bool {
        let mut spaces = self.spaces.write().expect("ledger lock poisoned");
        spaces.remove(&space_id).is_some()
    }

    fn space(&self, space_id: Uuid) -> Result<Arc<Mutex<Space>>, LedgerError> {
        let spaces = self.spaces.read().expect("ledger lock poisoned");
        spaces
            .get(&space_id)
            .cloned()
            .ok_or(LedgerError::SpaceNotFound(space_id))
    }

    /// Atomically take a spot for `claimant`. Fails with `Conflict` and no
    /// mutation if the spot has a live holder, unless that holder is the
    /// hold named in `supersedes` (the checkout conversion path).
    pub fn claim(
        &self,
        space_id: Uuid,
        label: &str,
        claimant: Claimant,
        supersedes: Option<Uuid>,
    ) -> Result<u64, LedgerError> {
        let now = self.clock.now();
        let space = self.space(space_id)?;
        let mut space = space.lock().expect("space lock poisoned");

        let spot = space.spot_mut(label).ok_or_else(|| LedgerError::SpotNotFound {
            space_id,
            label: label.to_string(),
        })?;

        let superseding = matches!(
            (&spot.state, supersedes),
            (SpotState::Held { hold_id, .. }, Some(expected)) if *hold_id == expected
        );
        if !spot.is_claimable(now) && !superseding {
            return Err(LedgerError::Conflict {
                space_id,
                label: label.to_string(),
            });
        }

        spot.state = match claimant {
            Claimant::Hold { hold_id, until } => SpotState::Held { hold_id, until },
            Claimant::Booking { booking_id, until } => SpotState::Booked { booking_id, until },
        };
        spot.version += 1;
        let version = spot.version;

        space.recompute_availability(now);
        debug!(space_id = %space_id, label, version, "spot claimed");
        Ok(version)
    }

    /// Return a spot to inventory. Releasing an already-available spot is a
    /// no-op success; the return value says whether state actually changed.
    pub fn release(&self, space_id: Uuid, label: &str) -> Result<bool, LedgerError> {
        let now = self.clock.now();
        let space = self.space(space_id)?;
        let mut space = space.lock().expect("space lock poisoned");

        let spot = space.spot_mut(label).ok_or_else(|| LedgerError::SpotNotFound {
            space_id,
            label: label.to_string(),
        })?;

        let changed = !matches!(spot.state, SpotState::Available);
        if changed {
            spot.state = SpotState::Available;
            spot.version += 1;
        }
        space.recompute_availability(now);
        Ok(changed)
    }

    /// Release only if `holder` still owns the spot. Lets a stale caller
    /// (an expired hold whose spot was since claimed by someone else)
    /// degrade to a no-op instead of freeing the successor's claim.
    pub fn release_holder(
        &self,
        space_id: Uuid,
        label: &str,
        holder: HolderRef,
    ) -> Result<bool, LedgerError> {
        let now = self.clock.now();
        let space = self.space(space_id)?;
        let mut space = space.lock().expect("space lock poisoned");

        let spot = space.spot_mut(label).ok_or_else(|| LedgerError::SpotNotFound {
            space_id,
            label: label.to_string(),
        })?;

        let owns = match (&spot.state, holder) {
            (SpotState::Held { hold_id, .. }, HolderRef::Hold(id)) => *hold_id == id,
            (SpotState::Booked { booking_id, .. }, HolderRef::Booking(id)) => *booking_id == id,
            _ => false,
        };
        if owns {
            spot.state = SpotState::Available;
            spot.version += 1;
        }
        space.recompute_availability(now);
        Ok(owns)
    }

    /// Spot states as of `as_of`, with overdue holds already normalized to
    /// available (the stored state is untouched; the sweep does the real
    /// release).
    pub fn query(&self, space_id: Uuid, as_of: DateTime<Utc>) -> Result<Vec<Spot>, LedgerError> {
        let space = self.space(space_id)?;
        let space = space.lock().expect("space lock poisoned");

        Ok(space
            .spots
            .iter()
            .map(|spot| {
                let mut spot = spot.clone();
                if let SpotState::Held { until, .. } = spot.state {
                    if until <= as_of {
                        spot.state = SpotState::Available;
                    }
                }
                spot
            })
            .collect())
    }

    /// Aggregate availability flag for a space.
    pub fn space_available(&self, space_id: Uuid) -> Result<bool, LedgerError> {
        let now = self.clock.now();
        let space = self.space(space_id)?;
        let space = space.lock().expect("space lock poisoned");
        Ok(space.spots.iter().any(|s| s.is_available(now)))
    }

    /// Release every spot whose hold TTL has elapsed. Each space is swept
    /// under its own lock, so this is safe to run concurrently with claims
    /// and with another sweep. Returns what was released.
    pub fn release_expired_holds(&self, now: DateTime<Utc>) -> Vec<(Uuid, String, Uuid)> {
        let spaces: Vec<Arc<Mutex<Space>>> = {
            let spaces = self.spaces.read().expect("ledger lock poisoned");
            spaces.values().cloned().collect()
        };

        let mut released = Vec::new();
        for space in spaces {
            let mut space = space.lock().expect("space lock poisoned");
            let space_id = space.id;
            for spot in &mut space.spots {
                if let SpotState::Held { hold_id, until } = spot.state {
                    if until <= now {
                        spot.state = SpotState::Available;
                        spot.version += 1;
                        released.push((space_id, spot.label.clone(), hold_id));
                    }
                }
            }
            space.recompute_availability(now);
        }
        released
    }
}
