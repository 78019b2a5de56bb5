use crate::ledger::{Claimant, HolderRef, LedgerError, SpotLedger};
use chrono::Duration;
use lotwise_core::Clock;
use lotwise_domain::events::{SpotEvent, SpotEventKind};
use lotwise_domain::hold::Hold;
use lotwise_store::EventBus;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::info;
use uuid::Uuid;

/// Creates and releases cart-stage holds, layered on the ledger's atomic
/// claim. Ownership records are kept server-side keyed by hold id; the
/// client only caches a copy. No per-hold timers run here — an overdue
/// hold is the sweeper's problem, which bounds staleness to one sweep
/// interval even if the client vanishes.
pub struct HoldManager {
    ledger: Arc<SpotLedger>,
    clock: Arc<dyn Clock>,
    events: EventBus,
    holds: RwLock<HashMap<Uuid, Hold>>,
    default_ttl: Duration,
}

impl HoldManager {
    pub fn new(
        ledger: Arc<SpotLedger>,
        clock: Arc<dyn Clock>,
        events: EventBus,
        default_ttl_seconds: u64,
    ) -> Self {
        Self {
            ledger,
            clock,
            events,
            holds: RwLock::new(HashMap::new()),
            default_ttl: Duration::seconds(default_ttl_seconds as i64),
        }
    }

    /// Claim a spot for the caller. `owner` may be an anonymous session id.
    pub fn place_hold(
        &self,
        space_id: Uuid,
        spot_label: &str,
        owner: &str,
        ttl: Option<Duration>,
    ) -> Result<Hold, LedgerError> {
        let now = self.clock.now();
        let hold_id = Uuid::new_v4();
        let expires_at = now + ttl.unwrap_or(self.default_ttl);

        self.ledger.claim(
            space_id,
            spot_label,
            Claimant::Hold {
                hold_id,
                until: expires_at,
            },
            None,
        )?;

        let hold = Hold {
            id: hold_id,
            space_id,
            spot_label: spot_label.to_string(),
            owner: owner.to_string(),
            created_at: now,
            expires_at,
        };
        self.holds
            .write()
            .expect("holds lock poisoned")
            .insert(hold_id, hold.clone());

        info!(hold_id = %hold_id, space_id = %space_id, spot = spot_label, "hold placed");
        self.events.publish_spot(SpotEvent {
            space_id,
            spot_label: spot_label.to_string(),
            kind: SpotEventKind::Held {
                hold_id,
                until: expires_at,
            },
            at: now,
        });
        Ok(hold)
    }

    /// Driver-initiated release. Unconditional and idempotent: an unknown
    /// or already-released id is a no-op success, and a spot since claimed
    /// by someone else is left alone.
    pub fn release_hold(&self, hold_id: Uuid) {
        let hold = self
            .holds
            .write()
            .expect("holds lock poisoned")
            .remove(&hold_id);

        let Some(hold) = hold else {
            return;
        };

        match self
            .ledger
            .release_holder(hold.space_id, &hold.spot_label, HolderRef::Hold(hold_id))
        {
            Ok(true) => {
                self.events.publish_spot(SpotEvent {
                    space_id: hold.space_id,
                    spot_label: hold.spot_label.clone(),
                    kind: SpotEventKind::Released,
                    at: self.clock.now(),
                });
            }
            Ok(false) => {}
            // The owning space was deleted out from under the hold.
            Err(_) => {}
        }
    }

    pub fn get_hold(&self, hold_id: Uuid) -> Option<Hold> {
        self.holds
            .read()
            .expect("holds lock poisoned")
            .get(&hold_id)
            .cloned()
    }

    /// Drop the ownership record without touching the ledger. Used when a
    /// hold converts into a booking at checkout, and by the sweeper after
    /// the ledger already released the expired claim.
    pub fn forget(&self, hold_id: Uuid) {
        self.holds
            .write()
            .expect("holds lock poisoned")
            .remove(&hold_id);
    }

    pub fn active_count(&self) -> usize {
        let now = self.clock.now();
        self.holds
            .read()
            .expect("holds lock poisoned")
            .values()
            .filter(|h| !h.is_expired(now))
            .count()
    }
}
