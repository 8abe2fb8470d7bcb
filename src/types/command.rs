//! Replay commands — the validated form of one command-log row
//!
//! The CSV boundary converts raw rows into these typed commands before they
//! reach the engine. Every command names its listing so the async replay
//! strategy can partition a batch into per-listing lanes.

use crate::types::booking::{BookingId, DateRange, ListingId, UserId};
use crate::types::money::MinorUnits;

/// A single validated command from the replay log
#[derive(Debug, Clone, PartialEq)]
pub struct ReplayCommand {
    /// The listing this command belongs to (the partitioning lane)
    pub listing: ListingId,

    /// The operation to apply
    pub action: ReplayAction,
}

/// The operation carried by a [`ReplayCommand`]
#[derive(Debug, Clone, PartialEq)]
pub enum ReplayAction {
    /// Register a listing with its owner and per-day price
    AddListing {
        /// Listing owner
        owner: UserId,
        /// Price per day in minor units
        price_per_day: MinorUnits,
    },

    /// A renter requests a stay
    Request {
        /// Booking ID assigned by the log
        booking: BookingId,
        /// Requesting renter
        renter: UserId,
        /// Requested stay
        range: DateRange,
    },

    /// The owner approves a requested booking
    Approve {
        /// Target booking
        booking: BookingId,
        /// Acting user (must be the owner)
        actor: UserId,
    },

    /// The owner rejects a requested booking
    Reject {
        /// Target booking
        booking: BookingId,
        /// Acting user (must be the owner)
        actor: UserId,
    },

    /// The renter initiates payment for an approved booking
    Pay {
        /// Target booking
        booking: BookingId,
        /// Acting user (must be the renter)
        actor: UserId,
    },

    /// Capture the booking's open payment order
    Capture {
        /// Target booking
        booking: BookingId,
    },

    /// Complete a confirmed booking whose end date has passed
    Complete {
        /// Target booking
        booking: BookingId,
    },

    /// Renter or owner cancels an active booking
    Cancel {
        /// Target booking
        booking: BookingId,
        /// Acting user (renter or owner)
        actor: UserId,
    },

    /// Owner blocks a day range on the listing's calendar
    Block {
        /// Acting user (must be the owner)
        actor: UserId,
        /// Days to block
        range: DateRange,
    },

    /// Owner frees a day range on the listing's calendar
    Unblock {
        /// Acting user (must be the owner)
        actor: UserId,
        /// Days to free
        range: DateRange,
    },
}
