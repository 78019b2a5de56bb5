use lotwise_core::{Clock, ListingCatalog, UserRef};
use lotwise_domain::booking::{
    price_for_window, Booking, BookingStatus, CreateBookingRequest, PaymentStatus,
};
use lotwise_domain::events::{BookingEvent, SpotEvent, SpotEventKind};
use lotwise_ledger::{Claimant, HolderRef, HoldManager, LedgerError, SpotLedger};
use lotwise_store::EventBus;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::info;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error("space not found: {0}")]
    SpaceNotFound(Uuid),

    #[error("unknown spot label: {space_id}/{label}")]
    SpotUnknown { space_id: Uuid, label: String },

    #[error("spot unavailable: {space_id}/{label}")]
    SpotUnavailable { space_id: Uuid, label: String },

    #[error("booking not found: {0}")]
    NotFound(Uuid),

    #[error("invalid transition from {from:?} to {to:?}")]
    InvalidTransition {
        from: BookingStatus,
        to: BookingStatus,
    },

    #[error("booking window ends before it starts")]
    InvalidWindow,

    #[error("listing catalog error: {0}")]
    Catalog(String),
}

/// The durable paid-intent record and its transition rules. Bookings are
/// created against the ledger's atomic claim, advanced by payment
/// callbacks, host/driver action, and the sweeper, and never deleted.
pub struct BookingEngine {
    bookings: RwLock<HashMap<Uuid, Booking>>,
    ledger: Arc<SpotLedger>,
    holds: Arc<HoldManager>,
    catalog: Arc<dyn ListingCatalog>,
    clock: Arc<dyn Clock>,
    events: EventBus,
    currency: String,
}

impl BookingEngine {
    pub fn new(
        ledger: Arc<SpotLedger>,
        holds: Arc<HoldManager>,
        catalog: Arc<dyn ListingCatalog>,
        clock: Arc<dyn Clock>,
        events: EventBus,
        currency: String,
    ) -> Self {
        Self {
            bookings: RwLock::new(HashMap::new()),
            ledger,
            holds,
            catalog,
            clock,
            events,
            currency,
        }
    }

    /// Checkout: validate against the catalog, price the window, claim the
    /// spot (superseding the driver's own hold if named) and persist the
    /// booking as PENDING/PENDING. On a claim conflict nothing is written.
    pub async fn create_booking(
        &self,
        req: CreateBookingRequest,
        driver: &UserRef,
    ) -> Result<Booking, BookingError> {
        if req.end_time <= req.start_time {
            return Err(BookingError::InvalidWindow);
        }

        let listing = self
            .catalog
            .get_space(req.space_id)
            .await
            .map_err(|e| BookingError::Catalog(e.to_string()))?
            .ok_or(BookingError::SpaceNotFound(req.space_id))?;

        if !listing.spot_labels.iter().any(|l| l == &req.spot_label) {
            return Err(BookingError::SpotUnknown {
                space_id: req.space_id,
                label: req.spot_label,
            });
        }

        let now = self.clock.now();
        let booking_id = Uuid::new_v4();
        let total_price = price_for_window(listing.rate_per_hour, req.start_time, req.end_time);

        // A named hold only unlocks the claim when it is the caller's own
        // hold on this exact spot. Hold ids circulate (they are on the
        // event stream), so anything else is ignored and the claim
        // conflicts normally.
        let supersedes = req.hold_id.and_then(|hold_id| {
            self.holds
                .get_hold(hold_id)
                .filter(|h| {
                    h.owner == driver.id
                        && h.space_id == req.space_id
                        && h.spot_label == req.spot_label
                })
                .map(|h| h.id)
        });

        self.ledger
            .claim(
                req.space_id,
                &req.spot_label,
                Claimant::Booking {
                    booking_id,
                    until: Some(req.end_time),
                },
                supersedes,
            )
            .map_err(|e| match e {
                LedgerError::Conflict { space_id, label } => {
                    BookingError::SpotUnavailable { space_id, label }
                }
                LedgerError::SpaceNotFound(id) => BookingError::SpaceNotFound(id),
                LedgerError::SpotNotFound { space_id, label } => {
                    BookingError::SpotUnknown { space_id, label }
                }
            })?;

        // The hold is folded into the booking; its ownership record goes.
        if let Some(hold_id) = supersedes {
            self.holds.forget(hold_id);
        }

        let booking = Booking {
            id: booking_id,
            space_id: req.space_id,
            spot_label: req.spot_label.clone(),
            driver_id: driver.id.clone(),
            host_id: listing.host_id.clone(),
            start_time: req.start_time,
            end_time: req.end_time,
            total_price,
            currency: self.currency.clone(),
            vehicle: req.vehicle,
            status: BookingStatus::Pending,
            payment_status: PaymentStatus::Pending,
            correlation_id: None,
            created_at: now,
            updated_at: now,
        };
        self.bookings
            .write()
            .expect("bookings lock poisoned")
            .insert(booking_id, booking.clone());

        info!(booking_id = %booking_id, space_id = %req.space_id, spot = %req.spot_label,
              total_price, "booking created");
        self.events.publish_spot(SpotEvent {
            space_id: req.space_id,
            spot_label: req.spot_label,
            kind: SpotEventKind::Booked { booking_id },
            at: now,
        });
        self.publish_booking_event(&booking, None);
        Ok(booking)
    }

    /// Advance the booking through the transition table. Illegal moves fail
    /// with `InvalidTransition` and leave state untouched. Transitions out
    /// of occupancy (COMPLETED, CANCELLED) release the spot through the
    /// guarded ledger path.
    pub fn update_status(
        &self,
        booking_id: Uuid,
        new_status: BookingStatus,
        reason: Option<&str>,
    ) -> Result<Booking, BookingError> {
        let now = self.clock.now();
        let mut bookings = self.bookings.write().expect("bookings lock poisoned");
        let booking = bookings
            .get_mut(&booking_id)
            .ok_or(BookingError::NotFound(booking_id))?;

        if !booking.status.can_transition_to(new_status) {
            return Err(BookingError::InvalidTransition {
                from: booking.status,
                to: new_status,
            });
        }

        booking.update_status(new_status, now);
        if new_status == BookingStatus::Cancelled && booking.payment_status == PaymentStatus::Paid {
            // Money already moved; the refund itself is a collaborator's
            // concern, the state is recorded here.
            booking.update_payment_status(PaymentStatus::Refunded, now);
        }
        let snapshot = booking.clone();
        drop(bookings);

        if new_status.is_terminal() {
            let _ = self.ledger.release_holder(
                snapshot.space_id,
                &snapshot.spot_label,
                HolderRef::Booking(booking_id),
            );
            self.events.publish_spot(SpotEvent {
                space_id: snapshot.space_id,
                spot_label: snapshot.spot_label.clone(),
                kind: SpotEventKind::Released,
                at: now,
            });
        }

        info!(booking_id = %booking_id, status = ?new_status, "booking transitioned");
        self.publish_booking_event(&snapshot, reason);
        Ok(snapshot)
    }

    /// Store the gateway correlation id once payment is initiated.
    pub fn attach_correlation(
        &self,
        booking_id: Uuid,
        correlation_id: &str,
    ) -> Result<(), BookingError> {
        let now = self.clock.now();
        let mut bookings = self.bookings.write().expect("bookings lock poisoned");
        let booking = bookings
            .get_mut(&booking_id)
            .ok_or(BookingError::NotFound(booking_id))?;
        booking.correlation_id = Some(correlation_id.to_string());
        booking.updated_at = now;
        Ok(())
    }

    pub fn find_by_correlation(&self, correlation_id: &str) -> Option<Booking> {
        let bookings = self.bookings.read().expect("bookings lock poisoned");
        bookings
            .values()
            .find(|b| b.correlation_id.as_deref() == Some(correlation_id))
            .cloned()
    }

    /// Apply a successful payment. Returns false if it was already applied,
    /// so duplicate callbacks degrade to no-ops.
    pub fn apply_payment_success(&self, booking_id: Uuid) -> Result<bool, BookingError> {
        let now = self.clock.now();
        let mut bookings = self.bookings.write().expect("bookings lock poisoned");
        let booking = bookings
            .get_mut(&booking_id)
            .ok_or(BookingError::NotFound(booking_id))?;

        if booking.payment_status == PaymentStatus::Paid {
            return Ok(false);
        }
        booking.update_payment_status(PaymentStatus::Paid, now);
        if booking.status == BookingStatus::Pending {
            booking.update_status(BookingStatus::Confirmed, now);
        }
        let snapshot = booking.clone();
        drop(bookings);

        self.publish_booking_event(&snapshot, None);
        Ok(true)
    }

    /// Record a failed push payment. The booking stays PENDING so the
    /// driver can retry; the sweeper cancels it after the grace period.
    pub fn apply_payment_failure(&self, booking_id: Uuid) -> Result<bool, BookingError> {
        let now = self.clock.now();
        let mut bookings = self.bookings.write().expect("bookings lock poisoned");
        let booking = bookings
            .get_mut(&booking_id)
            .ok_or(BookingError::NotFound(booking_id))?;

        if booking.payment_status != PaymentStatus::Pending {
            return Ok(false);
        }
        booking.update_payment_status(PaymentStatus::Failed, now);
        let snapshot = booking.clone();
        drop(bookings);

        self.publish_booking_event(&snapshot, Some("payment not received"));
        Ok(true)
    }

    pub fn get_booking(&self, booking_id: Uuid) -> Option<Booking> {
        let bookings = self.bookings.read().expect("bookings lock poisoned");
        bookings.get(&booking_id).cloned()
    }

    pub fn list_for_driver(&self, driver_id: &str) -> Vec<Booking> {
        let bookings = self.bookings.read().expect("bookings lock poisoned");
        bookings
            .values()
            .filter(|b| b.driver_id == driver_id)
            .cloned()
            .collect()
    }

    pub fn list_for_space(&self, space_id: Uuid) -> Vec<Booking> {
        let bookings = self.bookings.read().expect("bookings lock poisoned");
        bookings
            .values()
            .filter(|b| b.space_id == space_id)
            .cloned()
            .collect()
    }

    /// Point-in-time copy for the sweeper's scan.
    pub fn snapshot(&self) -> Vec<Booking> {
        let bookings = self.bookings.read().expect("bookings lock poisoned");
        bookings.values().cloned().collect()
    }

    fn publish_booking_event(&self, booking: &Booking, reason: Option<&str>) {
        self.events.publish_booking(BookingEvent {
            booking_id: booking.id,
            space_id: booking.space_id,
            spot_label: booking.spot_label.clone(),
            driver_id: booking.driver_id.clone(),
            status: booking.status,
            payment_status: booking.payment_status,
            reason: reason.map(|r| r.to_string()),
            at: booking.updated_at,
        });
    }
}
