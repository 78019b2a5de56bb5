use crate::engine::BookingEngine;
use chrono::Duration;
use lotwise_core::Clock;
use lotwise_domain::booking::{BookingStatus, PaymentStatus};
use lotwise_domain::events::{SpotEvent, SpotEventKind};
use lotwise_ledger::{HoldManager, SpotLedger};
use lotwise_store::EventBus;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    pub holds_released: usize,
    pub bookings_activated: usize,
    pub bookings_completed: usize,
    pub bookings_cancelled: usize,
}

impl SweepReport {
    pub fn is_empty(&self) -> bool {
        *self == SweepReport::default()
    }
}

/// The recurring scan that resolves every time-based transition: overdue
/// holds back to inventory, confirmed bookings into their window, finished
/// bookings to COMPLETED, and unpaid bookings past the grace period to
/// CANCELLED. Runs as a background task independent of any client session;
/// each mutation it makes is individually atomic and idempotent, so a
/// second sweep overlapping this one degrades to no-ops.
pub struct ExpirySweeper {
    ledger: Arc<SpotLedger>,
    holds: Arc<HoldManager>,
    engine: Arc<BookingEngine>,
    clock: Arc<dyn Clock>,
    events: EventBus,
    interval: std::time::Duration,
    payment_grace: Duration,
}

impl ExpirySweeper {
    pub fn new(
        ledger: Arc<SpotLedger>,
        holds: Arc<HoldManager>,
        engine: Arc<BookingEngine>,
        clock: Arc<dyn Clock>,
        events: EventBus,
        interval_seconds: u64,
        payment_grace_seconds: u64,
    ) -> Self {
        Self {
            ledger,
            holds,
            engine,
            clock,
            events,
            interval: std::time::Duration::from_secs(interval_seconds.max(1)),
            payment_grace: Duration::seconds(payment_grace_seconds as i64),
        }
    }

    /// One pass. Callable from anywhere (timer, test, ops endpoint).
    pub fn sweep(&self) -> SweepReport {
        let now = self.clock.now();
        let mut report = SweepReport::default();

        // (a) Overdue holds back to inventory.
        for (space_id, spot_label, hold_id) in self.ledger.release_expired_holds(now) {
            self.holds.forget(hold_id);
            self.events.publish_spot(SpotEvent {
                space_id,
                spot_label,
                kind: SpotEventKind::Released,
                at: now,
            });
            report.holds_released += 1;
        }

        // (b)-(d) Time-based booking transitions. A transition losing a
        // race with a concurrent sweep or a user action just errors with
        // InvalidTransition and is skipped.
        for booking in self.engine.snapshot() {
            match booking.status {
                BookingStatus::Confirmed if booking.end_time <= now => {
                    if self
                        .engine
                        .update_status(booking.id, BookingStatus::Completed, None)
                        .is_ok()
                    {
                        report.bookings_completed += 1;
                    }
                }
                BookingStatus::Confirmed if booking.start_time <= now => {
                    if self
                        .engine
                        .update_status(booking.id, BookingStatus::Active, None)
                        .is_ok()
                    {
                        report.bookings_activated += 1;
                    }
                }
                BookingStatus::Active if booking.end_time <= now => {
                    if self
                        .engine
                        .update_status(booking.id, BookingStatus::Completed, None)
                        .is_ok()
                    {
                        report.bookings_completed += 1;
                    }
                }
                BookingStatus::Pending
                    if booking.payment_status != PaymentStatus::Paid
                        && booking.created_at + self.payment_grace <= now =>
                {
                    let _ = self.engine.apply_payment_failure(booking.id);
                    if self
                        .engine
                        .update_status(
                            booking.id,
                            BookingStatus::Cancelled,
                            Some("payment not received in time"),
                        )
                        .is_ok()
                    {
                        report.bookings_cancelled += 1;
                    }
                }
                _ => {}
            }
        }

        if report.is_empty() {
            debug!("sweep pass: nothing to do");
        } else {
            info!(
                holds_released = report.holds_released,
                activated = report.bookings_activated,
                completed = report.bookings_completed,
                cancelled = report.bookings_cancelled,
                "sweep pass applied transitions"
            );
        }
        report
    }

    /// Background loop. Lives for the process, not for any client session,
    /// and exits when the shutdown signal flips.
    pub async fn run(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        info!(interval_secs = self.interval.as_secs(), "expiry sweeper started");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.sweep();
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("expiry sweeper stopping");
                        break;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::tests::{harness, request, Harness};
    use lotwise_core::UserRef;
    use lotwise_domain::booking::Booking;

    fn sweeper_for(h: &Harness) -> ExpirySweeper {
        ExpirySweeper::new(
            h.ledger.clone(),
            h.holds.clone(),
            h.engine.clone(),
            h.clock.clone(),
            EventBus::default(),
            60,
            1800,
        )
    }

    fn driver() -> UserRef {
        UserRef {
            id: "d1".to_string(),
            contact: Some("254700000001".to_string()),
        }
    }

    async fn paid_booking(h: &Harness) -> Booking {
        let booking = h
            .engine
            .create_booking(request(h, "A1", None), &driver())
            .await
            .unwrap();
        h.engine.apply_payment_success(booking.id).unwrap();
        h.engine.get_booking(booking.id).unwrap()
    }

    #[tokio::test]
    async fn test_sweep_releases_expired_hold() {
        let h = harness();
        let sweeper = sweeper_for(&h);
        let hold = h.holds.place_hold(h.space_id, "A1", "d1", None).unwrap();

        // Not yet due.
        assert!(sweeper.sweep().is_empty());

        h.clock.advance(Duration::minutes(16));
        let report = sweeper.sweep();
        assert_eq!(report.holds_released, 1);
        assert!(h.ledger.space_available(h.space_id).unwrap());
        assert!(h.holds.get_hold(hold.id).is_none());

        // Second sweep over the same ground is a no-op.
        assert!(sweeper.sweep().is_empty());
    }

    #[tokio::test]
    async fn test_sweep_activates_and_completes_booking() {
        let h = harness();
        let sweeper = sweeper_for(&h);
        let booking = paid_booking(&h).await;

        let report = sweeper.sweep();
        assert_eq!(report.bookings_activated, 1);
        assert_eq!(
            h.engine.get_booking(booking.id).unwrap().status,
            BookingStatus::Active
        );

        h.clock.advance(Duration::hours(3));
        let report = sweeper.sweep();
        assert_eq!(report.bookings_completed, 1);
        assert_eq!(
            h.engine.get_booking(booking.id).unwrap().status,
            BookingStatus::Completed
        );
        assert!(h.ledger.space_available(h.space_id).unwrap());
    }

    #[tokio::test]
    async fn test_sweep_completes_confirmed_booking_directly() {
        let h = harness();
        let sweeper = sweeper_for(&h);
        let booking = paid_booking(&h).await;

        // The whole window elapses between sweeps; CONFIRMED goes straight
        // to COMPLETED.
        h.clock.advance(Duration::hours(3));
        let report = sweeper.sweep();
        assert_eq!(report.bookings_completed, 1);
        assert_eq!(report.bookings_activated, 0);
        assert_eq!(
            h.engine.get_booking(booking.id).unwrap().status,
            BookingStatus::Completed
        );
    }

    #[tokio::test]
    async fn test_sweep_cancels_unpaid_booking_after_grace() {
        let h = harness();
        let sweeper = sweeper_for(&h);
        let booking = h
            .engine
            .create_booking(request(&h, "A1", None), &driver())
            .await
            .unwrap();

        // Inside the grace period the booking is left alone.
        h.clock.advance(Duration::minutes(10));
        assert!(sweeper.sweep().is_empty());

        h.clock.advance(Duration::minutes(21));
        let report = sweeper.sweep();
        assert_eq!(report.bookings_cancelled, 1);

        let booking = h.engine.get_booking(booking.id).unwrap();
        assert_eq!(booking.status, BookingStatus::Cancelled);
        assert_eq!(booking.payment_status, PaymentStatus::Failed);
        assert!(h.ledger.space_available(h.space_id).unwrap());
    }

    #[tokio::test]
    async fn test_overlapping_sweeps_are_safe() {
        let h = harness();
        let _hold = h.holds.place_hold(h.space_id, "A1", "d1", None).unwrap();
        h.clock.advance(Duration::minutes(16));

        let a = Arc::new(sweeper_for(&h));
        let b = Arc::new(sweeper_for(&h));
        let (ra, rb) = tokio::join!(
            tokio::task::spawn_blocking({
                let a = a.clone();
                move || a.sweep()
            }),
            tokio::task::spawn_blocking({
                let b = b.clone();
                move || b.sweep()
            }),
        );
        let total = ra.unwrap().holds_released + rb.unwrap().holds_released;
        assert_eq!(total, 1);
    }

    #[tokio::test]
    async fn test_run_loop_sweeps_and_stops() {
        let h = harness();
        // Tick fast so the test does not wait on wall time.
        let sweeper = Arc::new(ExpirySweeper {
            ledger: h.ledger.clone(),
            holds: h.holds.clone(),
            engine: h.engine.clone(),
            clock: h.clock.clone(),
            events: EventBus::default(),
            interval: std::time::Duration::from_millis(10),
            payment_grace: Duration::seconds(1800),
        });
        let _hold = h.holds.place_hold(h.space_id, "A1", "d1", None).unwrap();
        h.clock.advance(Duration::minutes(16));

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(sweeper.clone().run(shutdown_rx));

        // Give the loop a couple of ticks.
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert!(h.ledger.space_available(h.space_id).unwrap());

        shutdown_tx.send(true).unwrap();
        handle.await.unwrap();
    }
}
