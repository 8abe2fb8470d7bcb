//! Rental Booking Engine Library
//! # Overview
//!
//! This library provides the booking lifecycle and payment-reconciliation
//! core of a peer-to-peer rental marketplace: turning a date-range request
//! into a conflict-free, paid, confirmed reservation.
//!
//! # Architecture
//!
//! The system is organized into several key components:
//!
//! - [`types`] - Core data types (Booking, PaymentOrder, DomainEvent, etc.)
//! - [`cli`] - CLI argument parsing
//! - [`core`] - Business logic components:
//!   - [`core::engine`] - The booking state machine
//!   - [`core::availability`] - Per-listing unavailable-day calendars
//!   - [`core::fees`] - Pure fee calculation
//!   - [`core::gateway`] - Payment gateway adapter with idempotent capture
//!   - [`core::events`] - Domain-event feed for external dispatchers
//! - [`io`] - Command-log I/O with pluggable parsing strategies
//! - [`strategy`] - Replay pipelines (sync, async per-listing lanes)
//!
//! # Booking Lifecycle
//!
//! A booking moves through the following states:
//!
//! - **Requested**: renter asked for a date range; price quote frozen
//! - **Approved**: owner accepted; the dates are atomically reserved
//! - **Rejected**: owner declined (terminal)
//! - **PaymentPending**: renter initiated payment; an order is open
//! - **Confirmed**: exactly one payment order captured
//! - **Cancelled**: renter or owner cancelled; dates released (terminal)
//! - **Completed**: the end date passed (terminal)
//!
//! # Conflict Policy
//!
//! For a given listing, the date ranges of all bookings in `Approved`,
//! `PaymentPending` or `Confirmed` state are pairwise disjoint at all
//! times. Approval reserves dates with compare-and-set semantics:
//! first-approved-wins, and the losing approval gets a conflict error
//! listing the contested days.

// Module declarations
pub mod cli;
pub mod core;
pub mod io;
pub mod strategy;
pub mod types;

pub use core::{
    AvailabilityIndex, BookingEngine, CalendarOp, Clock, Decision, EventBus, FeeSchedule,
    FixedClock, GatewayClient, PaymentGatewayAdapter, SimulatedGateway, SystemClock,
};
pub use io::write_bookings_csv;
pub use types::{
    Booking, BookingError, BookingId, BookingStatus, CaptureReceipt, DateRange, DomainEvent,
    ErrorKind, EventKind, Listing, ListingId, PaymentOrder, UserId,
};
