//! Error types for the rental booking engine
//!
//! This module defines all error types that can occur while driving a booking
//! through its lifecycle. Every variant carries enough context for the caller
//! to act on it (conflicting dates, expected actors, order ids).
//!
//! # Error Classes
//!
//! Variants map onto six classes via [`BookingError::kind`]:
//!
//! - **Validation**: malformed input, rejected before any state is touched
//! - **Conflict**: date overlap / double-booking attempt / wrong-state operation
//! - **Authorization**: wrong actor for the action
//! - **NotFound**: unknown listing, booking or payment order
//! - **Gateway**: transient payment-provider failure, safe to retry
//! - **GatewayRejection**: terminal payment decline for that attempt

use crate::types::booking::{BookingId, BookingStatus, ListingId, UserId};
use crate::types::payment::OrderId;
use chrono::NaiveDate;
use thiserror::Error;

/// Coarse classification of a [`BookingError`]
///
/// Mirrors the error taxonomy the external callers dispatch on: validation
/// and authorization failures are rejected synchronously, conflicts carry
/// alternatives-worthy detail, and the two gateway classes tell the caller
/// whether a retry is safe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed input; nothing was mutated
    Validation,
    /// Date overlap, double-booking attempt, or wrong-state operation
    Conflict,
    /// The acting user is not allowed to perform the action
    Authorization,
    /// Referenced listing, booking or order does not exist
    NotFound,
    /// Transient payment-provider failure; the same call may be retried
    Gateway,
    /// The payment provider declined this attempt; retry needs a fresh order
    GatewayRejection,
}

/// Main error type for the booking engine
///
/// Each variant includes the identifiers and values needed to diagnose the
/// failure or to offer the user an alternative (e.g. the exact days that
/// conflict).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BookingError {
    /// The requested range is inverted (`end < start`)
    #[error("Invalid date range: end {end} is before start {start}")]
    InvalidDateRange {
        /// Requested first day
        start: NaiveDate,
        /// Requested last day
        end: NaiveDate,
    },

    /// The requested range starts strictly in the past
    #[error("Start date {start} is in the past (today is {today})")]
    StartDateInPast {
        /// Requested first day
        start: NaiveDate,
        /// The engine clock's current day
        today: NaiveDate,
    },

    /// A listing must have a positive per-day price
    #[error("Invalid price {price} minor units for listing {listing}")]
    InvalidPrice {
        /// Listing being registered
        listing: ListingId,
        /// Offending price in minor units
        price: i64,
    },

    /// A booking with this ID already exists
    #[error("Duplicate booking ID {booking}")]
    DuplicateBooking {
        /// The duplicated booking ID
        booking: BookingId,
    },

    /// A listing with this ID is already registered
    #[error("Duplicate listing ID {listing}")]
    DuplicateListing {
        /// The duplicated listing ID
        listing: ListingId,
    },

    /// Price computation would overflow the minor-unit representation
    #[error("Arithmetic overflow in {operation}")]
    ArithmeticOverflow {
        /// Operation that would overflow
        operation: String,
    },

    /// One or more days in the requested range are already unavailable
    ///
    /// Carries the exact conflicting days so the caller can offer
    /// alternatives; conflicts never silently auto-resolve.
    #[error("Dates unavailable for listing {listing}: {} day(s) conflict, first {}", conflicts.len(), conflicts.first().map(|d| d.to_string()).unwrap_or_default())]
    DatesUnavailable {
        /// Listing whose calendar conflicts
        listing: ListingId,
        /// The days that are already taken, sorted ascending
        conflicts: Vec<NaiveDate>,
    },

    /// The booking is not in a state that allows this event
    #[error("Booking {booking} cannot accept {event} while {from}")]
    InvalidTransition {
        /// Booking being transitioned
        booking: BookingId,
        /// Its current status (unchanged by the failed attempt)
        from: BookingStatus,
        /// The attempted lifecycle event
        event: String,
    },

    /// A confirmed booking cannot complete before its end date passes
    #[error("Booking {booking} runs until {end} (today is {today})")]
    EndDateNotReached {
        /// Booking being completed
        booking: BookingId,
        /// Its last booked day
        end: NaiveDate,
        /// The engine clock's current day
        today: NaiveDate,
    },

    /// Owner attempted to free days that an active booking holds
    #[error("Listing {listing} has {} day(s) held by an active booking", conflicts.len())]
    BookedDatesProtected {
        /// Listing whose calendar was being edited
        listing: ListingId,
        /// Days protected by an Approved/PaymentPending/Confirmed booking
        conflicts: Vec<NaiveDate>,
    },

    /// A different order for this booking was already captured
    ///
    /// At most one order per booking may ever reach `Captured`; this guards
    /// the invariant at capture-commit time.
    #[error("Booking {booking} already captured via order {captured_order}, refusing order {order}")]
    DuplicateCapture {
        /// Booking the order belongs to
        booking: BookingId,
        /// The order whose capture was refused
        order: OrderId,
        /// The order that already captured
        captured_order: OrderId,
    },

    /// The booking already has an order that has not failed
    ///
    /// A fresh order may only be created once the prior one is `Failed`.
    #[error("Booking {booking} already has open payment order {order}")]
    OpenOrderExists {
        /// Booking for which a new order was requested
        booking: BookingId,
        /// The existing open order
        order: OrderId,
    },

    /// The acting user does not own the listing
    #[error("User {actor} is not the owner of listing {listing}")]
    NotListingOwner {
        /// Listing the action targeted
        listing: ListingId,
        /// The acting user
        actor: UserId,
    },

    /// The acting user is not the booking's renter
    #[error("User {actor} is not the renter of booking {booking}")]
    NotRenter {
        /// Booking the action targeted
        booking: BookingId,
        /// The acting user
        actor: UserId,
    },

    /// The acting user is neither the renter nor the listing owner
    #[error("User {actor} is not a participant of booking {booking}")]
    NotParticipant {
        /// Booking the action targeted
        booking: BookingId,
        /// The acting user
        actor: UserId,
    },

    /// Referenced listing does not exist
    #[error("Listing {listing} not found")]
    ListingNotFound {
        /// The unknown listing ID
        listing: ListingId,
    },

    /// Referenced booking does not exist
    #[error("Booking {booking} not found")]
    BookingNotFound {
        /// The unknown booking ID
        booking: BookingId,
    },

    /// Referenced payment order does not exist
    #[error("Payment order '{order}' not found")]
    OrderNotFound {
        /// The unknown order ID
        order: OrderId,
    },

    /// The booking has no payment order to capture
    #[error("Booking {booking} has no payment order")]
    NoOpenOrder {
        /// Booking without an order
        booking: BookingId,
    },

    /// Transient provider failure (network, timeout); nothing was mutated
    ///
    /// The caller may retry the same call; for captures the same order ID
    /// stays valid.
    #[error("Payment gateway unavailable during {operation}: {reason}")]
    GatewayUnavailable {
        /// The gateway call that failed
        operation: String,
        /// Provider/transport detail
        reason: String,
    },

    /// The provider declined the payment; terminal for this order
    ///
    /// The order is marked `Failed` and the booking stays `PaymentPending`;
    /// a retry requires a fresh order.
    #[error("Payment declined for order '{order}': {reason}")]
    PaymentDeclined {
        /// The declined order
        order: OrderId,
        /// Provider decline reason
        reason: String,
    },
}

impl BookingError {
    /// Classify this error into the caller-facing taxonomy
    pub fn kind(&self) -> ErrorKind {
        match self {
            BookingError::InvalidDateRange { .. }
            | BookingError::StartDateInPast { .. }
            | BookingError::InvalidPrice { .. }
            | BookingError::DuplicateBooking { .. }
            | BookingError::DuplicateListing { .. }
            | BookingError::ArithmeticOverflow { .. } => ErrorKind::Validation,

            BookingError::DatesUnavailable { .. }
            | BookingError::InvalidTransition { .. }
            | BookingError::EndDateNotReached { .. }
            | BookingError::BookedDatesProtected { .. }
            | BookingError::DuplicateCapture { .. }
            | BookingError::OpenOrderExists { .. } => ErrorKind::Conflict,

            BookingError::NotListingOwner { .. }
            | BookingError::NotRenter { .. }
            | BookingError::NotParticipant { .. } => ErrorKind::Authorization,

            BookingError::ListingNotFound { .. }
            | BookingError::BookingNotFound { .. }
            | BookingError::OrderNotFound { .. }
            | BookingError::NoOpenOrder { .. } => ErrorKind::NotFound,

            BookingError::GatewayUnavailable { .. } => ErrorKind::Gateway,
            BookingError::PaymentDeclined { .. } => ErrorKind::GatewayRejection,
        }
    }

    /// Whether the failed call may be retried as-is
    ///
    /// True only for the transient gateway class; everything else either
    /// needs different input or a fresh payment order.
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Gateway
    }
}

// Helper functions for creating common errors

impl BookingError {
    /// Create an InvalidTransition error
    pub fn invalid_transition(booking: BookingId, from: BookingStatus, event: &str) -> Self {
        BookingError::InvalidTransition {
            booking,
            from,
            event: event.to_string(),
        }
    }

    /// Create a DatesUnavailable error
    pub fn dates_unavailable(listing: ListingId, conflicts: Vec<NaiveDate>) -> Self {
        BookingError::DatesUnavailable { listing, conflicts }
    }

    /// Create a GatewayUnavailable error
    pub fn gateway_unavailable(operation: &str, reason: &str) -> Self {
        BookingError::GatewayUnavailable {
            operation: operation.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Create a PaymentDeclined error
    pub fn payment_declined(order: &str, reason: &str) -> Self {
        BookingError::PaymentDeclined {
            order: order.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Create an ArithmeticOverflow error
    pub fn arithmetic_overflow(operation: &str) -> Self {
        BookingError::ArithmeticOverflow {
            operation: operation.to_string(),
        }
    }
}
