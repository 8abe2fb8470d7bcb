//! Listing registry
//!
//! The catalog service owns listings; the core keeps this read-mostly
//! directory of the reference data it needs (owner for authorization, price
//! for the quote). Injected into the engine, never reached through global
//! state.

use crate::types::{BookingError, Listing, ListingId};
use dashmap::DashMap;

/// Thread-safe directory of listing reference data
#[derive(Debug, Default)]
pub struct ListingDirectory {
    listings: DashMap<ListingId, Listing>,
}

impl ListingDirectory {
    /// Create an empty directory
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listing
    ///
    /// # Errors
    ///
    /// * `InvalidPrice` - the per-day price is not positive
    /// * `DuplicateListing` - a listing with this ID already exists
    pub fn register(&self, listing: Listing) -> Result<(), BookingError> {
        if listing.price_per_day <= 0 {
            return Err(BookingError::InvalidPrice {
                listing: listing.id,
                price: listing.price_per_day,
            });
        }

        let id = listing.id;
        let mut inserted = false;
        self.listings.entry(id).or_insert_with(|| {
            inserted = true;
            listing
        });
        if inserted {
            Ok(())
        } else {
            Err(BookingError::DuplicateListing { listing: id })
        }
    }

    /// Look up a listing by ID
    pub fn get(&self, id: ListingId) -> Option<Listing> {
        self.listings.get(&id).map(|entry| *entry.value())
    }
}
