//! Domain events emitted by the booking state machine
//!
//! The core exposes an append-only feed of typed events; delivery (push,
//! email, in-app) belongs entirely to the external notification dispatcher.
//! Events for one booking are observed in transition order; there is no
//! cross-booking ordering guarantee.

use crate::types::booking::{BookingId, ListingId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The kind of lifecycle fact an event records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventKind {
    /// A renter asked for a date range
    BookingRequested,
    /// The owner accepted and the dates were reserved
    BookingApproved,
    /// The owner declined the request
    BookingRejected,
    /// A payment order for the booking was captured
    PaymentCaptured,
    /// The booking is paid and final
    BookingConfirmed,
    /// Renter or owner cancelled; dates released
    BookingCancelled,
    /// The stay's end date passed
    BookingCompleted,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// One entry in the domain-event feed
///
/// Carries the full participant tuple so a dispatcher can route to either
/// party without a lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainEvent {
    /// What happened
    pub kind: EventKind,

    /// The booking the event belongs to
    pub booking: BookingId,

    /// The listing being booked
    pub listing: ListingId,

    /// The requesting renter
    pub renter: UserId,

    /// The listing's owner
    pub owner: UserId,

    /// When the transition was committed (UTC)
    pub at: DateTime<Utc>,
}
