//! Listing reference data
//!
//! Listings are owned by the marketplace's catalog service; the booking core
//! treats them as read-only reference data (owner for authorization, price
//! for the quote) plus the availability calendar kept elsewhere.

use crate::types::booking::{ListingId, UserId};
use crate::types::money::MinorUnits;

/// An item available for rent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Listing {
    /// Unique listing identifier
    pub id: ListingId,

    /// The user who owns the listing and decides booking requests
    pub owner: UserId,

    /// Price per calendar day, in minor units
    pub price_per_day: MinorUnits,
}
