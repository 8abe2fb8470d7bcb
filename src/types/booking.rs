//! Booking-related types for the rental booking engine
//!
//! This module defines the identifiers, the booking status enum, the
//! inclusive calendar date range, and the booking record itself.

use crate::types::error::BookingError;
use crate::types::money::FeeBreakdown;
use crate::types::payment::{OrderId, TransactionId};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Listing identifier
pub type ListingId = u32;

/// User identifier (renters and listing owners share the ID space)
pub type UserId = u32;

/// Booking identifier
pub type BookingId = u64;

/// Lifecycle states of a booking
///
/// A booking starts in `Requested` and ends in one of the terminal states
/// `Rejected`, `Cancelled` or `Completed`. Only the BookingEngine mutates
/// a booking's status; terminal bookings are archived, never deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    /// Renter asked for the dates; owner decision pending
    Requested,
    /// Owner accepted; the dates are reserved on the calendar
    Approved,
    /// Owner declined; terminal, calendar untouched
    Rejected,
    /// Renter initiated payment; a payment order is open
    PaymentPending,
    /// Payment captured; the reservation is final
    Confirmed,
    /// Cancelled by renter or owner; terminal, dates released
    Cancelled,
    /// The stay's end date has passed; terminal, dates released
    Completed,
}

impl BookingStatus {
    /// Whether this status holds days on the listing's calendar
    ///
    /// Unavailable-date entries for a booking's range exist if and only if
    /// the booking is in one of these states.
    pub fn holds_calendar(&self) -> bool {
        matches!(
            self,
            BookingStatus::Approved | BookingStatus::PaymentPending | BookingStatus::Confirmed
        )
    }

    /// Whether this status admits no further transitions
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            BookingStatus::Rejected | BookingStatus::Cancelled | BookingStatus::Completed
        )
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BookingStatus::Requested => "requested",
            BookingStatus::Approved => "approved",
            BookingStatus::Rejected => "rejected",
            BookingStatus::PaymentPending => "payment_pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::Completed => "completed",
        };
        f.write_str(s)
    }
}

/// Inclusive range of calendar days
///
/// Days are timezone-less `NaiveDate` keys so the same stay hashes to the
/// same calendar entries regardless of where the request originated. The
/// constructor rejects inverted ranges; a single-day range (`start == end`)
/// is the smallest legal one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    /// First booked day
    pub start: NaiveDate,
    /// Last booked day (inclusive, `end >= start`)
    pub end: NaiveDate,
}

impl DateRange {
    /// Create a validated range
    ///
    /// # Errors
    ///
    /// Returns `InvalidDateRange` if `end < start`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, BookingError> {
        if end < start {
            return Err(BookingError::InvalidDateRange { start, end });
        }
        Ok(DateRange { start, end })
    }

    /// Number of billable nights (calendar days in the inclusive range)
    pub fn nights(&self) -> u32 {
        // The validated constructor bounds this well below u32::MAX.
        u32::try_from((self.end - self.start).num_days() + 1).unwrap_or(u32::MAX)
    }

    /// Iterate over every day in the range, ascending
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        let end = self.end;
        self.start.iter_days().take_while(move |d| *d <= end)
    }

    /// Whether two ranges share at least one day
    pub fn overlaps(&self, other: &DateRange) -> bool {
        self.start <= other.end && other.start <= self.end
    }
}

/// A renter's request to rent a listing for a date range
///
/// Created in `Requested` state by the engine; the price quote is computed
/// once at creation and immutable afterwards. Payment fields stay `None`
/// until the renter initiates payment and the capture succeeds.
#[derive(Debug, Clone, PartialEq)]
pub struct Booking {
    /// Unique booking identifier
    pub id: BookingId,

    /// The listing being booked
    pub listing: ListingId,

    /// The requesting renter
    pub renter: UserId,

    /// Inclusive stay range
    pub range: DateRange,

    /// Current lifecycle state
    pub status: BookingStatus,

    /// Price quote frozen at request time
    ///
    /// `quote.total` is the amount the renter pays; it never changes after
    /// creation even if the listing is later repriced.
    pub quote: FeeBreakdown,

    /// Latest payment order, if payment was initiated
    pub payment_order: Option<OrderId>,

    /// Provider transaction that confirmed the booking, if captured
    pub payment_transaction: Option<TransactionId>,
}

impl Booking {
    /// Create a new booking in `Requested` state
    pub fn requested(
        id: BookingId,
        listing: ListingId,
        renter: UserId,
        range: DateRange,
        quote: FeeBreakdown,
    ) -> Self {
        Booking {
            id,
            listing,
            renter,
            range,
            status: BookingStatus::Requested,
            quote,
            payment_order: None,
            payment_transaction: None,
        }
    }
}
