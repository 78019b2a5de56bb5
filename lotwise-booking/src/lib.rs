pub mod engine;
pub mod reconcile;
pub mod sweeper;

pub use engine::{BookingEngine, BookingError};
pub use reconcile::{CallbackDisposition, PaymentReconciler, ReconcileError};
pub use sweeper::{ExpirySweeper, SweepReport};
