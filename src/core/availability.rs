//! Per-listing availability calendars
//!
//! This module provides the `AvailabilityIndex`, the single shared-resource
//! contention point of the core: a map from listing to the set of calendar
//! days that cannot be booked.
//!
//! # Concurrency
//!
//! Calendars are stored in a `DashMap` keyed by listing. All mutations for a
//! listing run while holding that listing's entry lock, so they are
//! linearized (single-writer-per-listing); mutations for different listings
//! proceed fully in parallel. `reserve` re-checks the range under the entry
//! lock before inserting, giving compare-and-set semantics: between a
//! caller's availability check and its reservation, another reservation may
//! win, and the loser gets a conflict instead of a double-booking.

use crate::types::{BookingError, DateRange, ListingId};
use chrono::NaiveDate;
use dashmap::DashMap;
use std::collections::BTreeSet;

/// Per-listing calendar of unavailable days
///
/// Days are stored with set semantics: no two entries for the same
/// (listing, day) pair, and re-inserting an existing day is a no-op.
#[derive(Debug, Default)]
pub struct AvailabilityIndex {
    /// Calendar per listing; the entry lock linearizes same-listing writes
    calendars: DashMap<ListingId, BTreeSet<NaiveDate>>,
}

impl AvailabilityIndex {
    /// Create an empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Days of `range` that are already unavailable, sorted ascending
    pub fn conflicting_days(&self, listing: ListingId, range: &DateRange) -> Vec<NaiveDate> {
        match self.calendars.get(&listing) {
            Some(calendar) => range.days().filter(|d| calendar.contains(d)).collect(),
            None => Vec::new(),
        }
    }

    /// Whether the whole range can still be booked
    ///
    /// True iff no day of the range is unavailable and the range does not
    /// start strictly in the past.
    pub fn is_range_free(&self, listing: ListingId, range: &DateRange, today: NaiveDate) -> bool {
        range.start >= today && self.conflicting_days(listing, range).is_empty()
    }

    /// Atomically mark every day of the range unavailable
    ///
    /// Compare-and-set: the range is re-validated under the listing's entry
    /// lock, and either all days are inserted or none are.
    ///
    /// # Errors
    ///
    /// * `StartDateInPast` - the range starts before `today`
    /// * `DatesUnavailable` - at least one day is already taken; the error
    ///   lists the conflicting days and the calendar is unchanged
    pub fn reserve(
        &self,
        listing: ListingId,
        range: &DateRange,
        today: NaiveDate,
    ) -> Result<(), BookingError> {
        if range.start < today {
            return Err(BookingError::StartDateInPast {
                start: range.start,
                today,
            });
        }

        let mut calendar = self.calendars.entry(listing).or_insert_with(BTreeSet::new);

        let conflicts: Vec<NaiveDate> = range.days().filter(|d| calendar.contains(d)).collect();
        if !conflicts.is_empty() {
            return Err(BookingError::dates_unavailable(listing, conflicts));
        }

        for day in range.days() {
            calendar.insert(day);
        }
        Ok(())
    }

    /// Remove every day of the range from the calendar
    ///
    /// Idempotent: removing already-free days is a no-op, not an error.
    pub fn release(&self, listing: ListingId, range: &DateRange) {
        if let Some(mut calendar) = self.calendars.get_mut(&listing) {
            for day in range.days() {
                calendar.remove(&day);
            }
        }
    }

    /// Mark every day of the range unavailable, deduplicating
    ///
    /// Owner-calendar entry point: days already present (including days held
    /// by a booking) are simply kept, never errored.
    pub fn block_days(&self, listing: ListingId, range: &DateRange) {
        let mut calendar = self.calendars.entry(listing).or_insert_with(BTreeSet::new);
        for day in range.days() {
            calendar.insert(day);
        }
    }

    /// All unavailable days for a listing, sorted ascending
    pub fn list_unavailable(&self, listing: ListingId) -> Vec<NaiveDate> {
        self.calendars
            .get(&listing)
            .map(|calendar| calendar.iter().copied().collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    fn day(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn range(start: &str, end: &str) -> DateRange {
        DateRange::new(day(start), day(end)).unwrap()
    }

    const TODAY: &str = "2026-08-01";

    #[test]
    fn test_empty_index_is_free() {
        let index = AvailabilityIndex::new();
        assert!(index.is_range_free(1, &range("2026-09-10", "2026-09-12"), day(TODAY)));
        assert!(index.list_unavailable(1).is_empty());
    }

    #[test]
    fn test_reserve_marks_days_unavailable() {
        let index = AvailabilityIndex::new();
        index
            .reserve(1, &range("2026-09-10", "2026-09-12"), day(TODAY))
            .unwrap();

        assert!(!index.is_range_free(1, &range("2026-09-11", "2026-09-11"), day(TODAY)));
        assert_eq!(
            index.list_unavailable(1),
            vec![day("2026-09-10"), day("2026-09-11"), day("2026-09-12")]
        );
    }

    #[test]
    fn test_reserve_conflict_reports_days_and_mutates_nothing() {
        let index = AvailabilityIndex::new();
        index
            .reserve(1, &range("2026-09-11", "2026-09-12"), day(TODAY))
            .unwrap();

        // Overlaps on the 11th and 12th; the 10th must not be inserted
        let result = index.reserve(1, &range("2026-09-10", "2026-09-12"), day(TODAY));
        match result.unwrap_err() {
            BookingError::DatesUnavailable { listing, conflicts } => {
                assert_eq!(listing, 1);
                assert_eq!(conflicts, vec![day("2026-09-11"), day("2026-09-12")]);
            }
            other => panic!("expected DatesUnavailable, got {other:?}"),
        }
        assert_eq!(
            index.list_unavailable(1),
            vec![day("2026-09-11"), day("2026-09-12")]
        );
    }

    #[test]
    fn test_reserve_rejects_past_start() {
        let index = AvailabilityIndex::new();
        let result = index.reserve(1, &range("2026-07-20", "2026-08-05"), day(TODAY));
        assert!(matches!(
            result.unwrap_err(),
            BookingError::StartDateInPast { .. }
        ));
        assert!(index.list_unavailable(1).is_empty());
    }

    #[test]
    fn test_range_starting_today_is_free() {
        let index = AvailabilityIndex::new();
        assert!(index.is_range_free(1, &range(TODAY, "2026-08-03"), day(TODAY)));
        assert!(index.reserve(1, &range(TODAY, "2026-08-03"), day(TODAY)).is_ok());
    }

    #[test]
    fn test_release_is_idempotent() {
        let index = AvailabilityIndex::new();
        index
            .reserve(1, &range("2026-09-10", "2026-09-12"), day(TODAY))
            .unwrap();

        index.release(1, &range("2026-09-10", "2026-09-12"));
        assert!(index.list_unavailable(1).is_empty());

        // Releasing again (and releasing an unknown listing) is a no-op
        index.release(1, &range("2026-09-10", "2026-09-12"));
        index.release(99, &range("2026-09-10", "2026-09-12"));
    }

    #[test]
    fn test_block_days_deduplicates() {
        let index = AvailabilityIndex::new();
        index.block_days(1, &range("2026-09-10", "2026-09-12"));
        index.block_days(1, &range("2026-09-11", "2026-09-14"));

        assert_eq!(index.list_unavailable(1).len(), 5);
    }

    #[test]
    fn test_listings_are_independent() {
        let index = AvailabilityIndex::new();
        index
            .reserve(1, &range("2026-09-10", "2026-09-12"), day(TODAY))
            .unwrap();

        assert!(index.is_range_free(2, &range("2026-09-10", "2026-09-12"), day(TODAY)));
        index
            .reserve(2, &range("2026-09-10", "2026-09-12"), day(TODAY))
            .unwrap();
    }

    #[test]
    fn test_concurrent_overlapping_reserves_admit_exactly_one_winner() {
        let index = Arc::new(AvailabilityIndex::new());
        let today = day(TODAY);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let index = Arc::clone(&index);
                thread::spawn(move || {
                    index.reserve(1, &range("2026-09-10", "2026-09-12"), today)
                })
            })
            .collect();

        let successes = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(Result::is_ok)
            .count();

        assert_eq!(successes, 1);
        assert_eq!(index.list_unavailable(1).len(), 3);
    }
}
