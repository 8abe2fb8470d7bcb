//! Core data types for the rental booking engine
//!
//! # Components
//!
//! - `booking` - Identifiers, booking status, date ranges, the booking record
//! - `listing` - Read-only listing reference data
//! - `money` - Minor-unit amounts and the fee breakdown
//! - `payment` - Payment orders and capture receipts
//! - `event` - Domain events published on every transition
//! - `command` - Validated replay-log commands
//! - `error` - The error taxonomy

pub mod booking;
pub mod command;
pub mod error;
pub mod event;
pub mod listing;
pub mod money;
pub mod payment;

pub use booking::{Booking, BookingId, BookingStatus, DateRange, ListingId, UserId};
pub use command::{ReplayAction, ReplayCommand};
pub use error::{BookingError, ErrorKind};
pub use event::{DomainEvent, EventKind};
pub use listing::Listing;
pub use money::{format_major, FeeBreakdown, MinorUnits};
pub use payment::{CaptureReceipt, OrderId, OrderStatus, PaymentOrder, TransactionId};
