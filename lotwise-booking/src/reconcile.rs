use crate::engine::{BookingEngine, BookingError};
use lotwise_core::{GatewayError, PaymentCallback, PaymentGateway, PaymentOutcome};
use lotwise_domain::booking::{BookingStatus, PaymentStatus};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    #[error("booking not found: {0}")]
    BookingNotFound(Uuid),

    #[error("booking not awaiting payment: {0}")]
    NotAwaitingPayment(Uuid),

    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

/// How a callback was handled. Everything here is acknowledged to the
/// gateway with a 2xx; non-2xx responses just trigger redelivery storms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackDisposition {
    /// The booking advanced.
    Applied,
    /// Same outcome delivered before; nothing changed.
    Duplicate,
    /// Correlation id unknown (or the redelivery raced a restart). Logged
    /// and swallowed.
    Stale,
}

/// Correlates externally initiated push payments with bookings and applies
/// the gateway's asynchronous verdicts.
pub struct PaymentReconciler {
    engine: Arc<BookingEngine>,
    gateway: Arc<dyn PaymentGateway>,
}

impl PaymentReconciler {
    pub fn new(engine: Arc<BookingEngine>, gateway: Arc<dyn PaymentGateway>) -> Self {
        Self { engine, gateway }
    }

    /// Ask the gateway to push a payment prompt to the payer and remember
    /// the correlation id on the booking for the callback to find.
    pub async fn initiate(
        &self,
        booking_id: Uuid,
        payer_contact: &str,
    ) -> Result<String, ReconcileError> {
        let booking = self
            .engine
            .get_booking(booking_id)
            .ok_or(ReconcileError::BookingNotFound(booking_id))?;

        // Only an unpaid PENDING booking may (re)start a push. Anything
        // else would prompt the payer a second time and rotate the
        // correlation id away from the one already applied.
        if booking.status != BookingStatus::Pending
            || booking.payment_status == PaymentStatus::Paid
        {
            return Err(ReconcileError::NotAwaitingPayment(booking_id));
        }

        let correlation_id = self
            .gateway
            .initiate_push(
                booking.total_price,
                payer_contact,
                &booking_id.to_string(),
            )
            .await?;

        self.engine
            .attach_correlation(booking_id, &correlation_id)
            .map_err(|_| ReconcileError::BookingNotFound(booking_id))?;

        info!(booking_id = %booking_id, correlation_id = %correlation_id, "push payment initiated");
        Ok(correlation_id)
    }

    /// Apply a gateway callback. Idempotent and tolerant of unknown ids;
    /// the caller always responds 200 to the gateway regardless of the
    /// disposition returned here.
    pub fn on_callback(&self, callback: &PaymentCallback) -> CallbackDisposition {
        let Some(booking) = self.engine.find_by_correlation(&callback.correlation_id) else {
            warn!(
                correlation_id = %callback.correlation_id,
                result_code = callback.result_code,
                "callback for unknown correlation id, acknowledging"
            );
            return CallbackDisposition::Stale;
        };

        let applied = match callback.outcome() {
            PaymentOutcome::Success => self.engine.apply_payment_success(booking.id),
            PaymentOutcome::Failure => self.engine.apply_payment_failure(booking.id),
        };

        match applied {
            Ok(true) => {
                info!(
                    booking_id = %booking.id,
                    correlation_id = %callback.correlation_id,
                    result_code = callback.result_code,
                    "payment callback applied"
                );
                CallbackDisposition::Applied
            }
            Ok(false) => CallbackDisposition::Duplicate,
            Err(BookingError::NotFound(_)) => CallbackDisposition::Stale,
            Err(e) => {
                warn!(booking_id = %booking.id, error = %e, "callback could not be applied");
                CallbackDisposition::Stale
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::tests::{harness, request};
    use lotwise_core::{MockGateway, UserRef};

    fn driver() -> UserRef {
        UserRef {
            id: "d1".to_string(),
            contact: Some("254700000001".to_string()),
        }
    }

    fn success(correlation_id: &str) -> PaymentCallback {
        PaymentCallback {
            correlation_id: correlation_id.to_string(),
            result_code: 0,
            result_desc: "The service request is processed successfully.".to_string(),
        }
    }

    #[tokio::test]
    async fn test_initiate_then_success_callback_confirms() {
        let h = harness();
        let reconciler = PaymentReconciler::new(h.engine.clone(), Arc::new(MockGateway::new()));

        let booking = h
            .engine
            .create_booking(request(&h, "A1", None), &driver())
            .await
            .unwrap();
        let corr = reconciler
            .initiate(booking.id, "254700000001")
            .await
            .unwrap();

        assert_eq!(
            reconciler.on_callback(&success(&corr)),
            CallbackDisposition::Applied
        );
        let booking = h.engine.get_booking(booking.id).unwrap();
        assert_eq!(booking.status, BookingStatus::Confirmed);
        assert_eq!(booking.payment_status, PaymentStatus::Paid);
    }

    #[tokio::test]
    async fn test_duplicate_success_callback_is_noop() {
        let h = harness();
        let reconciler = PaymentReconciler::new(h.engine.clone(), Arc::new(MockGateway::new()));

        let booking = h
            .engine
            .create_booking(request(&h, "A1", None), &driver())
            .await
            .unwrap();
        let corr = reconciler
            .initiate(booking.id, "254700000001")
            .await
            .unwrap();

        assert_eq!(
            reconciler.on_callback(&success(&corr)),
            CallbackDisposition::Applied
        );
        assert_eq!(
            reconciler.on_callback(&success(&corr)),
            CallbackDisposition::Duplicate
        );
        assert_eq!(
            h.engine.get_booking(booking.id).unwrap().status,
            BookingStatus::Confirmed
        );
    }

    #[tokio::test]
    async fn test_failure_callback_keeps_booking_pending() {
        let h = harness();
        let reconciler = PaymentReconciler::new(h.engine.clone(), Arc::new(MockGateway::new()));

        let booking = h
            .engine
            .create_booking(request(&h, "A1", None), &driver())
            .await
            .unwrap();
        let corr = reconciler
            .initiate(booking.id, "254700000001")
            .await
            .unwrap();

        let failed = PaymentCallback {
            correlation_id: corr,
            result_code: 1032,
            result_desc: "Request cancelled by user".to_string(),
        };
        assert_eq!(
            reconciler.on_callback(&failed),
            CallbackDisposition::Applied
        );
        let booking = h.engine.get_booking(booking.id).unwrap();
        assert_eq!(booking.status, BookingStatus::Pending);
        assert_eq!(booking.payment_status, PaymentStatus::Failed);
    }

    #[tokio::test]
    async fn test_unknown_correlation_id_is_swallowed() {
        let h = harness();
        let reconciler = PaymentReconciler::new(h.engine.clone(), Arc::new(MockGateway::new()));

        assert_eq!(
            reconciler.on_callback(&success("push_does_not_exist")),
            CallbackDisposition::Stale
        );
    }

    #[tokio::test]
    async fn test_initiate_rejected_once_paid() {
        let h = harness();
        let reconciler = PaymentReconciler::new(h.engine.clone(), Arc::new(MockGateway::new()));

        let booking = h
            .engine
            .create_booking(request(&h, "A1", None), &driver())
            .await
            .unwrap();
        let corr = reconciler
            .initiate(booking.id, "254700000001")
            .await
            .unwrap();
        reconciler.on_callback(&success(&corr));

        // A second push would prompt the payer to pay twice.
        let err = reconciler
            .initiate(booking.id, "254700000001")
            .await
            .unwrap_err();
        assert!(matches!(err, ReconcileError::NotAwaitingPayment(_)));

        // The applied correlation id survives.
        let booking = h.engine.get_booking(booking.id).unwrap();
        assert_eq!(booking.correlation_id.as_deref(), Some(corr.as_str()));
    }

    #[tokio::test]
    async fn test_initiate_rejected_on_cancelled_booking() {
        let h = harness();
        let reconciler = PaymentReconciler::new(h.engine.clone(), Arc::new(MockGateway::new()));

        let booking = h
            .engine
            .create_booking(request(&h, "A1", None), &driver())
            .await
            .unwrap();
        h.engine
            .update_status(booking.id, BookingStatus::Cancelled, Some("driver cancel"))
            .unwrap();

        let err = reconciler
            .initiate(booking.id, "254700000001")
            .await
            .unwrap_err();
        assert!(matches!(err, ReconcileError::NotAwaitingPayment(_)));
    }

    #[tokio::test]
    async fn test_gateway_outage_surfaces_as_error() {
        let h = harness();
        let reconciler = PaymentReconciler::new(h.engine.clone(), Arc::new(MockGateway::new()));

        let booking = h
            .engine
            .create_booking(request(&h, "A1", None), &driver())
            .await
            .unwrap();
        let err = reconciler
            .initiate(booking.id, "fail-gateway")
            .await
            .unwrap_err();
        assert!(matches!(err, ReconcileError::Gateway(_)));

        // Nothing was attached; the booking can still be retried.
        assert!(h.engine.get_booking(booking.id).unwrap().correlation_id.is_none());
    }
}
