use axum::{http::Method, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod bookings;
pub mod error;
pub mod holds;
pub mod spaces;
pub mod state;
pub mod webhooks;

pub use state::AppState;

use lotwise_booking::{BookingEngine, ExpirySweeper, PaymentReconciler};
use lotwise_core::{Clock, InMemoryCatalog, PaymentGateway, SessionIdentity};
use lotwise_ledger::{HoldManager, SpotLedger};
use lotwise_store::{app_config::BusinessRules, EventBus};
use std::sync::Arc;

/// Wire the engine components together. The binary passes the system
/// clock and the real gateway adapter; tests pass a manual clock and the
/// mock.
pub fn build_state(
    rules: BusinessRules,
    clock: Arc<dyn Clock>,
    gateway: Arc<dyn PaymentGateway>,
) -> AppState {
    let events = EventBus::default();
    let ledger = Arc::new(SpotLedger::new(clock.clone()));
    let catalog = Arc::new(InMemoryCatalog::new());
    let holds = Arc::new(HoldManager::new(
        ledger.clone(),
        clock.clone(),
        events.clone(),
        rules.hold_ttl_seconds,
    ));
    let engine = Arc::new(BookingEngine::new(
        ledger.clone(),
        holds.clone(),
        catalog.clone(),
        clock.clone(),
        events.clone(),
        rules.currency.clone(),
    ));
    let reconciler = Arc::new(PaymentReconciler::new(engine.clone(), gateway));
    let sweeper = Arc::new(ExpirySweeper::new(
        ledger.clone(),
        holds.clone(),
        engine.clone(),
        clock.clone(),
        events.clone(),
        rules.sweep_interval_seconds,
        rules.payment_grace_seconds,
    ));

    AppState {
        ledger,
        holds,
        engine,
        reconciler,
        sweeper,
        catalog,
        identity: Arc::new(SessionIdentity),
        clock,
        events,
        business_rules: rules,
    }
}

pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
            axum::http::header::USER_AGENT,
        ]);

    Router::new()
        .merge(holds::routes())
        .merge(bookings::routes())
        .merge(spaces::routes())
        .merge(webhooks::routes())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
