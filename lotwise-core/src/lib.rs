pub mod catalog;
pub mod clock;
pub mod identity;
pub mod payment;

pub use catalog::{InMemoryCatalog, ListingCatalog, SpaceListing};
pub use clock::{Clock, ManualClock, SystemClock};
pub use identity::{Identity, SessionIdentity, UserRef};
pub use payment::{GatewayError, MockGateway, PaymentCallback, PaymentGateway, PaymentOutcome};
