//! Booking state machine
//!
//! This module provides the `BookingEngine`, which orchestrates the
//! availability index, fee calculator, payment gateway adapter and event
//! bus to move a booking through its lifecycle:
//!
//! ```text
//! Requested ──OwnerApproves──▶ Approved ──RenterInitiatesPayment──▶ PaymentPending
//!     │                            │                                     │
//!     └─OwnerRejects─▶ Rejected    │                          CaptureSucceeds
//!                                  │                                     ▼
//!                                  └────RenterOrOwnerCancels──▶     Confirmed
//!                                       (also from PaymentPending        │
//!                                        and Confirmed) ▶ Cancelled  EndDatePassed
//!                                                                        ▼
//!                                                                    Completed
//! ```
//!
//! Conflict policy is first-approved-wins: approval reserves the dates with
//! compare-and-set semantics, and the loser of a race over overlapping
//! ranges gets a conflict error while its booking stays `Requested`.
//!
//! Transitions for one booking run under the booking's entry lock and every
//! committed transition publishes exactly one domain event from inside that
//! critical section. A failed transition leaves the booking in its prior
//! valid state.

use crate::core::availability::AvailabilityIndex;
use crate::core::booking_store::BookingStore;
use crate::core::clock::Clock;
use crate::core::events::EventBus;
use crate::core::fees::FeeSchedule;
use crate::core::gateway::{GatewayClient, PaymentGatewayAdapter};
use crate::core::listings::ListingDirectory;
use crate::types::{
    Booking, BookingError, BookingId, BookingStatus, CaptureReceipt, DateRange, DomainEvent,
    EventKind, Listing, ListingId, PaymentOrder, ReplayAction, ReplayCommand, UserId,
};
use chrono::NaiveDate;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Owner's verdict on a booking request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Accept the request and reserve the dates
    Approve,
    /// Decline the request; the calendar is untouched
    Reject,
}

/// Edit applied to a listing's owner calendar
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalendarOp {
    /// Mark the days unavailable (deduplicating)
    Add,
    /// Free the days (refused over an active booking's range)
    Remove,
}

/// The booking lifecycle orchestrator
///
/// Cheap to clone and safe to share across tasks: all state lives behind
/// `Arc`-wrapped thread-safe components, injected rather than ambient.
#[derive(Clone)]
pub struct BookingEngine {
    listings: Arc<ListingDirectory>,
    bookings: Arc<BookingStore>,
    availability: Arc<AvailabilityIndex>,
    payments: Arc<PaymentGatewayAdapter>,
    fees: FeeSchedule,
    events: Arc<EventBus>,
    clock: Arc<dyn Clock>,
}

impl BookingEngine {
    /// Create an engine over a gateway client and clock
    ///
    /// `gateway_timeout` bounds every provider call; on timeout nothing is
    /// mutated and the caller may retry.
    pub fn new(
        gateway: Arc<dyn GatewayClient>,
        gateway_timeout: Duration,
        clock: Arc<dyn Clock>,
    ) -> Self {
        BookingEngine {
            listings: Arc::new(ListingDirectory::new()),
            bookings: Arc::new(BookingStore::new()),
            availability: Arc::new(AvailabilityIndex::new()),
            payments: Arc::new(PaymentGatewayAdapter::new(gateway, gateway_timeout)),
            fees: FeeSchedule::default(),
            events: Arc::new(EventBus::new()),
            clock,
        }
    }

    /// Replace the default fee schedule
    pub fn with_fees(mut self, fees: FeeSchedule) -> Self {
        self.fees = fees;
        self
    }

    /// The domain-event feed and subscription point
    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// The payment-order records
    pub fn payments(&self) -> &PaymentGatewayAdapter {
        &self.payments
    }

    /// All bookings sorted by ID (terminal ones included, for audit)
    pub fn bookings(&self) -> Vec<Booking> {
        self.bookings.all_sorted()
    }

    /// Snapshot one booking
    pub fn booking(&self, id: BookingId) -> Option<Booking> {
        self.bookings.get(id)
    }

    /// Register a listing's reference data
    pub fn register_listing(&self, listing: Listing) -> Result<(), BookingError> {
        self.listings.register(listing)
    }

    /// Sorted unavailable days for a listing
    pub fn unavailable_dates(&self, listing: ListingId) -> Vec<NaiveDate> {
        self.availability.list_unavailable(listing)
    }

    /// Create a booking request
    ///
    /// Validates the range, checks the calendar, freezes the price quote and
    /// stores the booking as `Requested`. No days are reserved yet — that
    /// happens at approval.
    ///
    /// # Errors
    ///
    /// * `ListingNotFound` - unknown listing
    /// * `InvalidDateRange` / `StartDateInPast` - malformed request
    /// * `DatesUnavailable` - the range intersects unavailable days; no
    ///   booking record is created
    /// * `DuplicateBooking` - the booking ID is taken
    pub fn request_booking(
        &self,
        id: BookingId,
        listing_id: ListingId,
        renter: UserId,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Booking, BookingError> {
        let listing = self
            .listings
            .get(listing_id)
            .ok_or(BookingError::ListingNotFound { listing: listing_id })?;

        let range = DateRange::new(start, end)?;
        let today = self.clock.today();
        if range.start < today {
            return Err(BookingError::StartDateInPast {
                start: range.start,
                today,
            });
        }

        let conflicts = self.availability.conflicting_days(listing_id, &range);
        if !conflicts.is_empty() {
            return Err(BookingError::dates_unavailable(listing_id, conflicts));
        }

        let quote = self.fees.quote(range.nights(), listing.price_per_day)?;
        let booking = Booking::requested(id, listing_id, renter, range, quote);

        self.bookings.insert_with(booking.clone(), |stored| {
            self.publish(EventKind::BookingRequested, stored, listing.owner);
        })?;

        Ok(booking)
    }

    /// Apply the owner's decision to a requested booking
    ///
    /// Approval re-checks the calendar and reserves the range atomically;
    /// if another booking claimed an overlapping range since the request,
    /// the approval fails with the conflicting days and the booking stays
    /// `Requested` (first-approved-wins).
    ///
    /// # Errors
    ///
    /// * `BookingNotFound` / `ListingNotFound`
    /// * `NotListingOwner` - the actor does not own the listing
    /// * `InvalidTransition` - the booking is not `Requested`
    /// * `DatesUnavailable` - approval lost the race; nothing was mutated
    pub fn decide_booking(
        &self,
        id: BookingId,
        decision: Decision,
        actor: UserId,
    ) -> Result<Booking, BookingError> {
        let listing = self.listing_of(id)?;
        let today = self.clock.today();

        self.bookings.update(id, |booking| {
            if actor != listing.owner {
                return Err(BookingError::NotListingOwner {
                    listing: listing.id,
                    actor,
                });
            }

            let event_name = match decision {
                Decision::Approve => "OwnerApproves",
                Decision::Reject => "OwnerRejects",
            };
            if booking.status != BookingStatus::Requested {
                return Err(BookingError::invalid_transition(
                    id,
                    booking.status,
                    event_name,
                ));
            }

            match decision {
                Decision::Approve => {
                    // Compare-and-set reservation; on conflict the booking
                    // stays Requested and the error lists the taken days
                    self.availability
                        .reserve(booking.listing, &booking.range, today)?;
                    booking.status = BookingStatus::Approved;
                    self.publish(EventKind::BookingApproved, booking, listing.owner);
                }
                Decision::Reject => {
                    booking.status = BookingStatus::Rejected;
                    self.publish(EventKind::BookingRejected, booking, listing.owner);
                }
            }
            Ok(booking.clone())
        })
    }

    /// Renter initiates payment for an approved booking
    ///
    /// Moves the booking to `PaymentPending` and creates a payment order
    /// over the booking's frozen total. From `PaymentPending` with a failed
    /// order, creates a fresh order for the retry (the state is unchanged).
    /// If order creation fails on a first attempt, the booking is returned
    /// to `Approved`.
    ///
    /// # Errors
    ///
    /// * `NotRenter` - the actor is not the booking's renter
    /// * `InvalidTransition` - the booking is neither `Approved` nor
    ///   retryable `PaymentPending`
    /// * `OpenOrderExists` - the prior order has not failed
    /// * `GatewayUnavailable` / `PaymentDeclined` - provider failures
    pub async fn initiate_payment(
        &self,
        id: BookingId,
        actor: UserId,
    ) -> Result<PaymentOrder, BookingError> {
        // Claim the transition under the entry lock before the provider
        // call, so racing initiations cannot create duplicate orders.
        let (amount, first_attempt) = self.bookings.update(id, |booking| {
            if actor != booking.renter {
                return Err(BookingError::NotRenter { booking: id, actor });
            }
            match booking.status {
                BookingStatus::Approved => {
                    booking.status = BookingStatus::PaymentPending;
                    Ok((booking.quote.total, true))
                }
                // Retry path: a prior order failed, the state stays put
                BookingStatus::PaymentPending => Ok((booking.quote.total, false)),
                other => Err(BookingError::invalid_transition(
                    id,
                    other,
                    "RenterInitiatesPayment",
                )),
            }
        })?;

        match self.payments.create_order(id, amount).await {
            Ok(order) => {
                self.bookings.update(id, |booking| {
                    booking.payment_order = Some(order.order.clone());
                    Ok(())
                })?;
                Ok(order)
            }
            Err(error) => {
                if first_attempt {
                    // Roll the claim back so the booking is left in its
                    // prior valid state
                    self.bookings.update(id, |booking| {
                        if booking.status == BookingStatus::PaymentPending {
                            booking.status = BookingStatus::Approved;
                        }
                        Ok(())
                    })?;
                }
                Err(error)
            }
        }
    }

    /// Capture a payment order and confirm its booking
    ///
    /// Idempotent end to end: the adapter returns the same transaction to
    /// every caller, and the state machine checks the booking's current
    /// status before applying the transition, short-circuiting if it is
    /// already `Confirmed` — N concurrent captures yield exactly one
    /// `Confirmed` transition. Callable from a webhook or a client-driven
    /// confirmation step. Gateway timeouts mutate nothing; retry with the
    /// same order ID is safe.
    ///
    /// # Errors
    ///
    /// * `OrderNotFound` / `BookingNotFound`
    /// * `GatewayUnavailable` - transient, retryable
    /// * `PaymentDeclined` - terminal for the order; the booking stays
    ///   `PaymentPending` for a fresh retry
    /// * `InvalidTransition` - capture succeeded for a booking that is no
    ///   longer awaiting payment (e.g. cancelled meanwhile)
    pub async fn capture_payment(&self, order: &str) -> Result<CaptureReceipt, BookingError> {
        let receipt = self.payments.capture_order(order).await?;
        let listing = self.listing_of(receipt.booking)?;

        self.bookings.update(receipt.booking, |booking| {
            match booking.status {
                BookingStatus::Confirmed => {
                    // Repeat capture; the transition already happened
                    Ok(())
                }
                BookingStatus::PaymentPending => {
                    booking.status = BookingStatus::Confirmed;
                    booking.payment_transaction = Some(receipt.transaction_id.clone());
                    self.publish(EventKind::PaymentCaptured, booking, listing.owner);
                    self.publish(EventKind::BookingConfirmed, booking, listing.owner);
                    Ok(())
                }
                other => Err(BookingError::invalid_transition(
                    booking.id,
                    other,
                    "CaptureSucceeds",
                )),
            }
        })?;

        Ok(receipt)
    }

    /// Capture the booking's current payment order
    ///
    /// Convenience for callers that track bookings rather than orders.
    pub async fn capture_payment_for_booking(
        &self,
        id: BookingId,
    ) -> Result<CaptureReceipt, BookingError> {
        let booking = self
            .bookings
            .get(id)
            .ok_or(BookingError::BookingNotFound { booking: id })?;
        let order = booking
            .payment_order
            .ok_or(BookingError::NoOpenOrder { booking: id })?;
        self.capture_payment(&order).await
    }

    /// Renter or owner cancels an active booking
    ///
    /// Allowed from `Approved`, `PaymentPending` and `Confirmed`; the
    /// reserved days are released.
    ///
    /// # Errors
    ///
    /// * `NotParticipant` - the actor is neither renter nor owner
    /// * `InvalidTransition` - the booking is not in a cancellable state
    pub fn cancel_booking(&self, id: BookingId, actor: UserId) -> Result<Booking, BookingError> {
        let listing = self.listing_of(id)?;

        self.bookings.update(id, |booking| {
            if actor != booking.renter && actor != listing.owner {
                return Err(BookingError::NotParticipant { booking: id, actor });
            }
            if !booking.status.holds_calendar() {
                return Err(BookingError::invalid_transition(
                    id,
                    booking.status,
                    "RenterOrOwnerCancels",
                ));
            }

            self.availability.release(booking.listing, &booking.range);
            booking.status = BookingStatus::Cancelled;
            self.publish(EventKind::BookingCancelled, booking, listing.owner);
            Ok(booking.clone())
        })
    }

    /// Complete a confirmed booking whose end date has passed
    ///
    /// # Errors
    ///
    /// * `InvalidTransition` - the booking is not `Confirmed`
    /// * `EndDateNotReached` - the stay is still running
    pub fn complete_booking(&self, id: BookingId) -> Result<Booking, BookingError> {
        let listing = self.listing_of(id)?;
        let today = self.clock.today();

        self.bookings.update(id, |booking| {
            if booking.status != BookingStatus::Confirmed {
                return Err(BookingError::invalid_transition(
                    id,
                    booking.status,
                    "EndDatePassed",
                ));
            }
            if booking.range.end >= today {
                return Err(BookingError::EndDateNotReached {
                    booking: id,
                    end: booking.range.end,
                    today,
                });
            }

            self.availability.release(booking.listing, &booking.range);
            booking.status = BookingStatus::Completed;
            self.publish(EventKind::BookingCompleted, booking, listing.owner);
            Ok(booking.clone())
        })
    }

    /// Complete every confirmed booking whose end date has passed
    ///
    /// Returns the IDs that were completed. Bookings racing into another
    /// state are skipped, not errored.
    pub fn complete_expired(&self) -> Vec<BookingId> {
        let today = self.clock.today();
        self.bookings
            .all_sorted()
            .into_iter()
            .filter(|b| b.status == BookingStatus::Confirmed && b.range.end < today)
            .filter(|b| self.complete_booking(b.id).is_ok())
            .map(|b| b.id)
            .collect()
    }

    /// Owner edits a listing's unavailable-day calendar
    ///
    /// `Add` blocks the days (deduplicating). `Remove` frees them, but
    /// refuses to free days held by an `Approved`, `PaymentPending` or
    /// `Confirmed` booking — those entries exist exactly because of the
    /// booking and may only go away with it.
    ///
    /// # Errors
    ///
    /// * `ListingNotFound`
    /// * `NotListingOwner` - the actor does not own the listing
    /// * `BookedDatesProtected` - `Remove` over an active booking's days
    pub fn mutate_unavailable_dates(
        &self,
        listing_id: ListingId,
        range: &DateRange,
        op: CalendarOp,
        actor: UserId,
    ) -> Result<(), BookingError> {
        let listing = self
            .listings
            .get(listing_id)
            .ok_or(BookingError::ListingNotFound { listing: listing_id })?;
        if actor != listing.owner {
            return Err(BookingError::NotListingOwner {
                listing: listing_id,
                actor,
            });
        }

        match op {
            CalendarOp::Add => {
                self.availability.block_days(listing_id, range);
                Ok(())
            }
            CalendarOp::Remove => {
                let held = self.bookings.calendar_held_days(listing_id, range);
                if !held.is_empty() {
                    return Err(BookingError::BookedDatesProtected {
                        listing: listing_id,
                        conflicts: held,
                    });
                }
                self.availability.release(listing_id, range);
                Ok(())
            }
        }
    }

    /// Apply one validated replay command
    ///
    /// The CLI's dispatch point; errors are returned, never swallowed, so
    /// the replay loop can log and continue.
    pub async fn apply(&self, command: ReplayCommand) -> Result<(), BookingError> {
        let listing = command.listing;
        match command.action {
            ReplayAction::AddListing {
                owner,
                price_per_day,
            } => self.register_listing(Listing {
                id: listing,
                owner,
                price_per_day,
            }),
            ReplayAction::Request {
                booking,
                renter,
                range,
            } => self
                .request_booking(booking, listing, renter, range.start, range.end)
                .map(|_| ()),
            ReplayAction::Approve { booking, actor } => self
                .decide_booking(booking, Decision::Approve, actor)
                .map(|_| ()),
            ReplayAction::Reject { booking, actor } => self
                .decide_booking(booking, Decision::Reject, actor)
                .map(|_| ()),
            ReplayAction::Pay { booking, actor } => {
                self.initiate_payment(booking, actor).await.map(|_| ())
            }
            ReplayAction::Capture { booking } => self
                .capture_payment_for_booking(booking)
                .await
                .map(|_| ()),
            ReplayAction::Cancel { booking, actor } => {
                self.cancel_booking(booking, actor).map(|_| ())
            }
            ReplayAction::Complete { booking } => self.complete_booking(booking).map(|_| ()),
            ReplayAction::Block { actor, range } => {
                self.mutate_unavailable_dates(listing, &range, CalendarOp::Add, actor)
            }
            ReplayAction::Unblock { actor, range } => {
                self.mutate_unavailable_dates(listing, &range, CalendarOp::Remove, actor)
            }
        }
    }

    /// The listing a booking belongs to
    fn listing_of(&self, id: BookingId) -> Result<Listing, BookingError> {
        let booking = self
            .bookings
            .get(id)
            .ok_or(BookingError::BookingNotFound { booking: id })?;
        self.listings
            .get(booking.listing)
            .ok_or(BookingError::ListingNotFound {
                listing: booking.listing,
            })
    }

    /// Publish one transition event
    fn publish(&self, kind: EventKind, booking: &Booking, owner: UserId) {
        info!(
            booking = booking.id,
            listing = booking.listing,
            status = %booking.status,
            event = %kind,
            "booking transition"
        );
        self.events.publish(DomainEvent {
            kind,
            booking: booking.id,
            listing: booking.listing,
            renter: booking.renter,
            owner,
            at: self.clock.now(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::clock::FixedClock;
    use crate::core::gateway::{GatewayFailure, SimulatedGateway};
    use crate::types::ErrorKind;

    const TIMEOUT: Duration = Duration::from_millis(200);
    const OWNER: UserId = 10;
    const RENTER: UserId = 20;
    const OTHER_RENTER: UserId = 21;

    fn day(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    struct Harness {
        gateway: Arc<SimulatedGateway>,
        clock: Arc<FixedClock>,
        engine: BookingEngine,
    }

    /// Engine over a simulated gateway, pinned to 2026-08-01, with one
    /// listing (id 1, owner 10, 50.00/day) registered
    fn harness() -> Harness {
        let gateway = Arc::new(SimulatedGateway::new());
        let clock = Arc::new(FixedClock::at_day(day("2026-08-01")));
        let engine = BookingEngine::new(
            Arc::clone(&gateway) as Arc<dyn GatewayClient>,
            TIMEOUT,
            Arc::clone(&clock) as Arc<dyn Clock>,
        );
        engine
            .register_listing(Listing {
                id: 1,
                owner: OWNER,
                price_per_day: 5000,
            })
            .unwrap();
        Harness {
            gateway,
            clock,
            engine,
        }
    }

    fn request(engine: &BookingEngine, id: BookingId, start: &str, end: &str) -> Booking {
        engine
            .request_booking(id, 1, RENTER, day(start), day(end))
            .unwrap()
    }

    #[test]
    fn test_request_creates_requested_booking_with_frozen_quote() {
        let h = harness();
        let booking = request(&h.engine, 1, "2026-09-10", "2026-09-12");

        assert_eq!(booking.status, BookingStatus::Requested);
        assert_eq!(booking.quote.subtotal, 15000);
        assert_eq!(booking.quote.total, 16050);
        assert_eq!(booking.quote.lister_payout, 14550);
        assert_eq!(
            h.engine.events().feed_for(1).first().map(|e| e.kind),
            Some(EventKind::BookingRequested)
        );
        // No days reserved until approval
        assert!(h.engine.unavailable_dates(1).is_empty());
    }

    #[test]
    fn test_request_rejects_inverted_range_and_past_start() {
        let h = harness();

        let inverted = h
            .engine
            .request_booking(1, 1, RENTER, day("2026-09-12"), day("2026-09-10"));
        assert_eq!(inverted.unwrap_err().kind(), ErrorKind::Validation);

        let past = h
            .engine
            .request_booking(1, 1, RENTER, day("2026-07-01"), day("2026-07-03"));
        assert!(matches!(
            past.unwrap_err(),
            BookingError::StartDateInPast { .. }
        ));

        // Neither attempt created a record
        assert!(h.engine.bookings().is_empty());
    }

    #[test]
    fn test_request_against_unavailable_range_creates_no_record() {
        let h = harness();
        let blocked = DateRange::new(day("2026-09-10"), day("2026-09-12")).unwrap();
        h.engine
            .mutate_unavailable_dates(1, &blocked, CalendarOp::Add, OWNER)
            .unwrap();

        let result = h
            .engine
            .request_booking(1, 1, RENTER, day("2026-09-11"), day("2026-09-13"));
        match result.unwrap_err() {
            BookingError::DatesUnavailable { conflicts, .. } => {
                assert_eq!(conflicts, vec![day("2026-09-11"), day("2026-09-12")]);
            }
            other => panic!("expected DatesUnavailable, got {other:?}"),
        }
        assert!(h.engine.bookings().is_empty());
    }

    #[test]
    fn test_approve_reserves_days() {
        let h = harness();
        request(&h.engine, 1, "2026-09-10", "2026-09-12");

        let booking = h.engine.decide_booking(1, Decision::Approve, OWNER).unwrap();
        assert_eq!(booking.status, BookingStatus::Approved);
        assert_eq!(h.engine.unavailable_dates(1).len(), 3);
    }

    #[test]
    fn test_decide_requires_listing_owner() {
        let h = harness();
        request(&h.engine, 1, "2026-09-10", "2026-09-12");

        let result = h.engine.decide_booking(1, Decision::Approve, RENTER);
        assert_eq!(result.unwrap_err().kind(), ErrorKind::Authorization);
        assert_eq!(h.engine.booking(1).unwrap().status, BookingStatus::Requested);
    }

    #[test]
    fn test_reject_leaves_availability_unchanged() {
        let h = harness();
        request(&h.engine, 1, "2026-09-10", "2026-09-12");

        let booking = h.engine.decide_booking(1, Decision::Reject, OWNER).unwrap();
        assert_eq!(booking.status, BookingStatus::Rejected);
        assert!(h.engine.unavailable_dates(1).is_empty());
        assert_eq!(
            h.engine.events().feed_for(1).last().map(|e| e.kind),
            Some(EventKind::BookingRejected)
        );
    }

    #[test]
    fn test_first_approved_wins_over_earlier_request() {
        let h = harness();
        // A requested first, B second, ranges overlap
        request(&h.engine, 1, "2026-09-10", "2026-09-12");
        h.engine
            .request_booking(2, 1, OTHER_RENTER, day("2026-09-11"), day("2026-09-14"))
            .unwrap();

        // B's approval commits first
        h.engine.decide_booking(2, Decision::Approve, OWNER).unwrap();

        // A's approval must now conflict, never silently double-book
        let result = h.engine.decide_booking(1, Decision::Approve, OWNER);
        match result.unwrap_err() {
            BookingError::DatesUnavailable { conflicts, .. } => {
                assert_eq!(conflicts, vec![day("2026-09-11"), day("2026-09-12")]);
            }
            other => panic!("expected DatesUnavailable, got {other:?}"),
        }
        // A stays Requested so the owner can reject or the renter re-dates
        assert_eq!(h.engine.booking(1).unwrap().status, BookingStatus::Requested);
        assert_eq!(h.engine.booking(2).unwrap().status, BookingStatus::Approved);
    }

    #[test]
    fn test_active_ranges_stay_disjoint_under_concurrent_approval() {
        let h = harness();
        for id in 1..=6u64 {
            h.engine
                .request_booking(id, 1, RENTER, day("2026-09-10"), day("2026-09-12"))
                .unwrap();
        }

        let engine = h.engine.clone();
        let handles: Vec<_> = (1..=6u64)
            .map(|id| {
                let engine = engine.clone();
                std::thread::spawn(move || engine.decide_booking(id, Decision::Approve, OWNER))
            })
            .collect();

        let approvals = handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .filter(Result::is_ok)
            .count();

        assert_eq!(approvals, 1);
        assert_eq!(h.engine.unavailable_dates(1).len(), 3);
    }

    #[tokio::test]
    async fn test_full_lifecycle_to_completed() {
        let h = harness();
        request(&h.engine, 1, "2026-09-10", "2026-09-12");
        h.engine.decide_booking(1, Decision::Approve, OWNER).unwrap();

        let order = h.engine.initiate_payment(1, RENTER).await.unwrap();
        assert_eq!(order.amount, 16050);
        assert_eq!(
            h.engine.booking(1).unwrap().status,
            BookingStatus::PaymentPending
        );

        let receipt = h.engine.capture_payment(&order.order).await.unwrap();
        let booking = h.engine.booking(1).unwrap();
        assert_eq!(booking.status, BookingStatus::Confirmed);
        assert_eq!(booking.payment_transaction, Some(receipt.transaction_id));

        h.clock.set_day(day("2026-09-13"));
        let completed = h.engine.complete_expired();
        assert_eq!(completed, vec![1]);
        assert_eq!(h.engine.booking(1).unwrap().status, BookingStatus::Completed);
        assert!(h.engine.unavailable_dates(1).is_empty());

        let kinds: Vec<EventKind> = h.engine.events().feed_for(1).iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            vec![
                EventKind::BookingRequested,
                EventKind::BookingApproved,
                EventKind::PaymentCaptured,
                EventKind::BookingConfirmed,
                EventKind::BookingCompleted,
            ]
        );
    }

    #[tokio::test]
    async fn test_initiate_payment_requires_renter_and_approved_state() {
        let h = harness();
        request(&h.engine, 1, "2026-09-10", "2026-09-12");

        // Not yet approved
        let result = h.engine.initiate_payment(1, RENTER).await;
        assert!(matches!(
            result.unwrap_err(),
            BookingError::InvalidTransition { .. }
        ));

        h.engine.decide_booking(1, Decision::Approve, OWNER).unwrap();

        // Wrong actor
        let result = h.engine.initiate_payment(1, OWNER).await;
        assert_eq!(result.unwrap_err().kind(), ErrorKind::Authorization);
        assert_eq!(h.engine.booking(1).unwrap().status, BookingStatus::Approved);
    }

    #[tokio::test]
    async fn test_failed_order_creation_rolls_back_to_approved() {
        let h = harness();
        request(&h.engine, 1, "2026-09-10", "2026-09-12");
        h.engine.decide_booking(1, Decision::Approve, OWNER).unwrap();

        h.gateway.script_failure(GatewayFailure::Unavailable {
            reason: "connection reset".to_string(),
        });
        let result = h.engine.initiate_payment(1, RENTER).await;
        assert!(result.unwrap_err().is_retryable());
        assert_eq!(h.engine.booking(1).unwrap().status, BookingStatus::Approved);

        // Retry goes through
        h.engine.initiate_payment(1, RENTER).await.unwrap();
    }

    #[tokio::test]
    async fn test_concurrent_captures_confirm_exactly_once() {
        let h = harness();
        request(&h.engine, 1, "2026-09-10", "2026-09-12");
        h.engine.decide_booking(1, Decision::Approve, OWNER).unwrap();
        let order = h.engine.initiate_payment(1, RENTER).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..8 {
            let engine = h.engine.clone();
            let id = order.order.clone();
            handles.push(tokio::spawn(async move {
                engine.capture_payment(&id).await
            }));
        }

        let mut transactions = Vec::new();
        for handle in handles {
            transactions.push(handle.await.unwrap().unwrap().transaction_id);
        }
        transactions.dedup();
        assert_eq!(transactions.len(), 1);

        // Exactly one Confirmed transition and one PaymentCaptured event
        assert_eq!(h.engine.events().count(EventKind::BookingConfirmed), 1);
        assert_eq!(h.engine.events().count(EventKind::PaymentCaptured), 1);
    }

    #[tokio::test]
    async fn test_decline_keeps_booking_payment_pending_for_retry() {
        let h = harness();
        request(&h.engine, 1, "2026-09-10", "2026-09-12");
        h.engine.decide_booking(1, Decision::Approve, OWNER).unwrap();
        let order = h.engine.initiate_payment(1, RENTER).await.unwrap();

        h.gateway.script_failure(GatewayFailure::Declined {
            reason: "insufficient funds".to_string(),
        });
        let result = h.engine.capture_payment(&order.order).await;
        assert_eq!(result.unwrap_err().kind(), ErrorKind::GatewayRejection);
        assert_eq!(
            h.engine.booking(1).unwrap().status,
            BookingStatus::PaymentPending
        );

        // Fresh order, fresh capture, booking confirms
        let retry = h.engine.initiate_payment(1, RENTER).await.unwrap();
        assert_ne!(retry.order, order.order);
        h.engine.capture_payment(&retry.order).await.unwrap();
        assert_eq!(h.engine.booking(1).unwrap().status, BookingStatus::Confirmed);
    }

    #[tokio::test]
    async fn test_cancel_releases_days() {
        let h = harness();
        request(&h.engine, 1, "2026-09-10", "2026-09-12");
        h.engine.decide_booking(1, Decision::Approve, OWNER).unwrap();
        assert_eq!(h.engine.unavailable_dates(1).len(), 3);

        h.engine.cancel_booking(1, RENTER).unwrap();
        assert_eq!(h.engine.booking(1).unwrap().status, BookingStatus::Cancelled);
        assert!(h.engine.unavailable_dates(1).is_empty());
    }

    #[test]
    fn test_cancel_requires_participant_and_active_state() {
        let h = harness();
        request(&h.engine, 1, "2026-09-10", "2026-09-12");

        // Requested is not cancellable per the transition table
        let result = h.engine.cancel_booking(1, RENTER);
        assert!(matches!(
            result.unwrap_err(),
            BookingError::InvalidTransition { .. }
        ));

        h.engine.decide_booking(1, Decision::Approve, OWNER).unwrap();
        let result = h.engine.cancel_booking(1, 99);
        assert_eq!(result.unwrap_err().kind(), ErrorKind::Authorization);

        // Owner may cancel too
        h.engine.cancel_booking(1, OWNER).unwrap();
    }

    #[tokio::test]
    async fn test_complete_requires_end_date_passed() {
        let h = harness();
        request(&h.engine, 1, "2026-09-10", "2026-09-12");
        h.engine.decide_booking(1, Decision::Approve, OWNER).unwrap();
        h.engine.initiate_payment(1, RENTER).await.unwrap();
        h.engine.capture_payment_for_booking(1).await.unwrap();

        let result = h.engine.complete_booking(1);
        assert!(matches!(
            result.unwrap_err(),
            BookingError::EndDateNotReached { .. }
        ));

        h.clock.set_day(day("2026-09-13"));
        h.engine.complete_booking(1).unwrap();
    }

    #[test]
    fn test_owner_calendar_add_and_remove() {
        let h = harness();
        let range = DateRange::new(day("2026-10-01"), day("2026-10-03")).unwrap();

        h.engine
            .mutate_unavailable_dates(1, &range, CalendarOp::Add, OWNER)
            .unwrap();
        assert_eq!(h.engine.unavailable_dates(1).len(), 3);

        // Duplicate add deduplicates
        h.engine
            .mutate_unavailable_dates(1, &range, CalendarOp::Add, OWNER)
            .unwrap();
        assert_eq!(h.engine.unavailable_dates(1).len(), 3);

        h.engine
            .mutate_unavailable_dates(1, &range, CalendarOp::Remove, OWNER)
            .unwrap();
        assert!(h.engine.unavailable_dates(1).is_empty());

        let result = h
            .engine
            .mutate_unavailable_dates(1, &range, CalendarOp::Add, RENTER);
        assert_eq!(result.unwrap_err().kind(), ErrorKind::Authorization);
    }

    #[test]
    fn test_owner_cannot_free_booked_days() {
        let h = harness();
        request(&h.engine, 1, "2026-09-10", "2026-09-12");
        h.engine.decide_booking(1, Decision::Approve, OWNER).unwrap();

        let range = DateRange::new(day("2026-09-09"), day("2026-09-14")).unwrap();
        let result = h
            .engine
            .mutate_unavailable_dates(1, &range, CalendarOp::Remove, OWNER);
        assert!(matches!(
            result.unwrap_err(),
            BookingError::BookedDatesProtected { .. }
        ));
        assert_eq!(h.engine.unavailable_dates(1).len(), 3);
    }

    #[tokio::test]
    async fn test_apply_drives_full_lifecycle() {
        let h = harness();
        let range = DateRange::new(day("2026-09-10"), day("2026-09-12")).unwrap();

        let commands = vec![
            ReplayAction::Request {
                booking: 1,
                renter: RENTER,
                range,
            },
            ReplayAction::Approve {
                booking: 1,
                actor: OWNER,
            },
            ReplayAction::Pay {
                booking: 1,
                actor: RENTER,
            },
            ReplayAction::Capture { booking: 1 },
        ];
        for action in commands {
            h.engine
                .apply(ReplayCommand { listing: 1, action })
                .await
                .unwrap();
        }

        assert_eq!(h.engine.booking(1).unwrap().status, BookingStatus::Confirmed);
    }
}
