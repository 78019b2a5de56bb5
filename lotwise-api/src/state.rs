use lotwise_booking::{BookingEngine, ExpirySweeper, PaymentReconciler};
use lotwise_core::{Clock, Identity, InMemoryCatalog};
use lotwise_ledger::{HoldManager, SpotLedger};
use lotwise_store::{app_config::BusinessRules, EventBus};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub ledger: Arc<SpotLedger>,
    pub holds: Arc<HoldManager>,
    pub engine: Arc<BookingEngine>,
    pub reconciler: Arc<PaymentReconciler>,
    pub sweeper: Arc<ExpirySweeper>,
    pub catalog: Arc<InMemoryCatalog>,
    pub identity: Arc<dyn Identity>,
    pub clock: Arc<dyn Clock>,
    pub events: EventBus,
    pub business_rules: BusinessRules,
}
