pub mod booking;
pub mod events;
pub mod hold;
pub mod spot;

pub use booking::{
    price_for_window, Booking, BookingStatus, CreateBookingRequest, PaymentStatus, VehicleDetails,
};
pub use events::{BookingEvent, EngineEvent, SpotEvent, SpotEventKind};
pub use hold::Hold;
pub use spot::{Space, Spot, SpotState};
