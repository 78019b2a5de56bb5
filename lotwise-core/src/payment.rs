use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use uuid::Uuid;

/// Outcome carried by a gateway callback. Push-payment gateways report a
/// numeric result code; 0 means the payer approved and funds moved.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentOutcome {
    Success,
    Failure,
}

/// Asynchronous callback delivered by the gateway to our webhook endpoint.
/// May arrive late, duplicated, or for a correlation id we never issued.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentCallback {
    pub correlation_id: String,
    pub result_code: i32,
    pub result_desc: String,
}

impl PaymentCallback {
    pub fn outcome(&self) -> PaymentOutcome {
        if self.result_code == 0 {
            PaymentOutcome::Success
        } else {
            PaymentOutcome::Failure
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("payment gateway unavailable: {0}")]
    Unavailable(String),
}

/// Seam to the external push-payment gateway. `initiate_push` asks the
/// gateway to prompt the payer on their device; the result arrives later
/// as a [`PaymentCallback`].
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn initiate_push(
        &self,
        amount: i64,
        payer_contact: &str,
        reference: &str,
    ) -> Result<String, GatewayError>;
}

/// Mock gateway for tests and local runs. Hands out correlation ids and
/// remembers every initiated push so tests can replay callbacks.
#[derive(Debug, Default)]
pub struct MockGateway {
    initiated: Mutex<Vec<(String, i64, String)>>,
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// (correlation_id, amount, reference) for every push initiated.
    pub fn initiated(&self) -> Vec<(String, i64, String)> {
        self.initiated.lock().expect("gateway lock poisoned").clone()
    }
}

#[async_trait]
impl PaymentGateway for MockGateway {
    async fn initiate_push(
        &self,
        amount: i64,
        payer_contact: &str,
        reference: &str,
    ) -> Result<String, GatewayError> {
        // Trigger for testing the unavailable path.
        if payer_contact == "fail-gateway" {
            return Err(GatewayError::Unavailable(
                "simulated gateway outage".to_string(),
            ));
        }

        let correlation_id = format!("push_{}", Uuid::new_v4().simple());
        self.initiated
            .lock()
            .expect("gateway lock poisoned")
            .push((correlation_id.clone(), amount, reference.to_string()));

        tracing::info!(
            correlation_id = %correlation_id,
            amount,
            "mock push payment initiated"
        );
        Ok(correlation_id)
    }
}
