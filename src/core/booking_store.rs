//! Booking record storage
//!
//! Holds every booking the engine has ever created; terminal bookings are
//! archived in place for audit, never deleted.
//!
//! # Concurrency
//!
//! Records live in a `DashMap` keyed by booking ID. [`BookingStore::update`]
//! runs its closure while holding the booking's entry lock, which is what
//! serializes state transitions for one booking while letting transitions
//! for different bookings run concurrently. The engine publishes each
//! transition's domain event inside that closure, so the per-booking event
//! order is the transition order.

use crate::types::{Booking, BookingError, BookingId, DateRange, ListingId};
use chrono::NaiveDate;
use dashmap::DashMap;

/// Thread-safe store of booking records
#[derive(Debug, Default)]
pub struct BookingStore {
    bookings: DashMap<BookingId, Booking>,
}

impl BookingStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new booking, running `on_insert` under the entry lock
    ///
    /// The hook publishes the creation event before any other thread can
    /// observe (and transition) the booking, keeping the per-booking event
    /// order total.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateBooking` if the ID is already taken.
    pub fn insert_with<F>(&self, booking: Booking, on_insert: F) -> Result<(), BookingError>
    where
        F: FnOnce(&Booking),
    {
        let id = booking.id;
        let mut inserted = false;
        let entry = self.bookings.entry(id).or_insert_with(|| {
            inserted = true;
            booking
        });
        if inserted {
            on_insert(entry.value());
            Ok(())
        } else {
            Err(BookingError::DuplicateBooking { booking: id })
        }
    }

    /// Snapshot a booking by ID
    pub fn get(&self, id: BookingId) -> Option<Booking> {
        self.bookings.get(&id).map(|entry| entry.value().clone())
    }

    /// Update a booking under its entry lock
    ///
    /// The closure may mutate the record and return a value; if it returns
    /// an error the record keeps whatever state the closure left it in, so
    /// closures must not mutate before all guards have passed (the engine's
    /// transition discipline).
    ///
    /// # Errors
    ///
    /// * `BookingNotFound` - no booking with this ID
    /// * Any error returned by the closure
    pub fn update<T, F>(&self, id: BookingId, f: F) -> Result<T, BookingError>
    where
        F: FnOnce(&mut Booking) -> Result<T, BookingError>,
    {
        let mut entry = self
            .bookings
            .get_mut(&id)
            .ok_or(BookingError::BookingNotFound { booking: id })?;
        f(entry.value_mut())
    }

    /// All bookings, sorted by ID for deterministic output
    pub fn all_sorted(&self) -> Vec<Booking> {
        let mut bookings: Vec<Booking> = self
            .bookings
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        bookings.sort_by_key(|b| b.id);
        bookings
    }

    /// Days of `range` held by calendar-holding bookings of a listing
    ///
    /// Used to protect booked days from owner calendar edits. Sorted
    /// ascending, deduplicated.
    pub fn calendar_held_days(&self, listing: ListingId, range: &DateRange) -> Vec<NaiveDate> {
        let mut held: Vec<NaiveDate> = self
            .bookings
            .iter()
            .filter(|entry| {
                let b = entry.value();
                b.listing == listing && b.status.holds_calendar() && b.range.overlaps(range)
            })
            .flat_map(|entry| {
                let b = entry.value();
                b.range
                    .days()
                    .filter(|d| *d >= range.start && *d <= range.end)
                    .collect::<Vec<_>>()
            })
            .collect();
        held.sort_unstable();
        held.dedup();
        held
    }
}
