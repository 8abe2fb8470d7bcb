//! Domain-event feed and subscriptions
//!
//! The state machine publishes one typed event per committed transition;
//! this bus stores them in an append-only feed and fans them out to
//! subscribers over a `tokio::sync::broadcast` channel. The core never
//! awaits delivery: publishing is synchronous and subscribers that fall
//! behind lag on their own receiver, not on the engine.
//!
//! Ordering: events for one booking are published under that booking's
//! entry lock, so both the feed and every subscriber observe them in
//! transition order. There is no cross-booking ordering guarantee.

use crate::types::{BookingId, DomainEvent, EventKind};
use std::sync::Mutex;
use tokio::sync::broadcast;

/// Default broadcast buffer per subscriber
const DEFAULT_CAPACITY: usize = 1024;

/// Append-only domain-event feed with broadcast fan-out
#[derive(Debug)]
pub struct EventBus {
    feed: Mutex<Vec<DomainEvent>>,
    sender: broadcast::Sender<DomainEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl EventBus {
    /// Create a bus with the default subscriber buffer
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a bus with a custom subscriber buffer
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        EventBus {
            feed: Mutex::new(Vec::new()),
            sender,
        }
    }

    /// Append an event to the feed and fan it out
    ///
    /// Never blocks and never fails: with no live subscribers the broadcast
    /// send is a no-op and the feed still records the event.
    pub fn publish(&self, event: DomainEvent) {
        let mut feed = match self.feed.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        feed.push(event.clone());
        drop(feed);

        let _ = self.sender.send(event);
    }

    /// Subscribe to events published from now on
    pub fn subscribe(&self) -> broadcast::Receiver<DomainEvent> {
        self.sender.subscribe()
    }

    /// Snapshot of the full feed, in publish order
    pub fn feed(&self) -> Vec<DomainEvent> {
        match self.feed.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Snapshot of one booking's events, in transition order
    pub fn feed_for(&self, booking: BookingId) -> Vec<DomainEvent> {
        self.feed()
            .into_iter()
            .filter(|e| e.booking == booking)
            .collect()
    }

    /// How many feed events have the given kind
    pub fn count(&self, kind: EventKind) -> usize {
        self.feed().iter().filter(|e| e.kind == kind).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn event(kind: EventKind, booking: BookingId) -> DomainEvent {
        DomainEvent {
            kind,
            booking,
            listing: 1,
            renter: 20,
            owner: 10,
            at: Utc.with_ymd_and_hms(2026, 8, 1, 12, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_feed_preserves_publish_order() {
        let bus = EventBus::new();
        bus.publish(event(EventKind::BookingRequested, 1));
        bus.publish(event(EventKind::BookingApproved, 1));
        bus.publish(event(EventKind::BookingRequested, 2));

        let kinds: Vec<EventKind> = bus.feed().iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            vec![
                EventKind::BookingRequested,
                EventKind::BookingApproved,
                EventKind::BookingRequested
            ]
        );
    }

    #[test]
    fn test_feed_for_filters_one_booking() {
        let bus = EventBus::new();
        bus.publish(event(EventKind::BookingRequested, 1));
        bus.publish(event(EventKind::BookingRequested, 2));
        bus.publish(event(EventKind::BookingApproved, 1));

        let booking_1 = bus.feed_for(1);
        assert_eq!(booking_1.len(), 2);
        assert!(booking_1.iter().all(|e| e.booking == 1));
    }

    #[test]
    fn test_publish_without_subscribers_is_fine() {
        let bus = EventBus::new();
        bus.publish(event(EventKind::BookingRequested, 1));
        assert_eq!(bus.feed().len(), 1);
    }

    #[tokio::test]
    async fn test_subscribers_receive_events_in_order() {
        let bus = EventBus::new();
        let mut receiver = bus.subscribe();

        bus.publish(event(EventKind::BookingRequested, 1));
        bus.publish(event(EventKind::BookingApproved, 1));

        assert_eq!(receiver.recv().await.unwrap().kind, EventKind::BookingRequested);
        assert_eq!(receiver.recv().await.unwrap().kind, EventKind::BookingApproved);
    }

    #[tokio::test]
    async fn test_subscription_starts_at_subscribe_time() {
        let bus = EventBus::new();
        bus.publish(event(EventKind::BookingRequested, 1));

        let mut receiver = bus.subscribe();
        bus.publish(event(EventKind::BookingApproved, 1));

        assert_eq!(receiver.recv().await.unwrap().kind, EventKind::BookingApproved);
    }
}
