//! Business logic components
//!
//! # Components
//!
//! - [`availability`] - Per-listing calendars of unavailable days
//! - [`fees`] - Pure fee calculation over minor units
//! - [`gateway`] - Payment provider adapter with idempotent capture
//! - [`engine`] - The booking state machine orchestrating the above
//! - [`events`] - Domain-event feed and subscriptions
//! - [`booking_store`] / [`listings`] - Thread-safe record storage
//! - [`clock`] - Injected time source

pub mod availability;
pub mod booking_store;
pub mod clock;
pub mod engine;
pub mod events;
pub mod fees;
pub mod gateway;
pub mod listings;

pub use availability::AvailabilityIndex;
pub use booking_store::BookingStore;
pub use clock::{Clock, FixedClock, SystemClock};
pub use engine::{BookingEngine, CalendarOp, Decision};
pub use events::EventBus;
pub use fees::FeeSchedule;
pub use gateway::{
    GatewayCapture, GatewayClient, GatewayFailure, PaymentGatewayAdapter, SimulatedGateway,
};
pub use listings::ListingDirectory;
