//! Payment-order types for the rental booking engine
//!
//! A payment order is the core's record of one attempt to charge a booking
//! through the external payment provider. A booking accumulates multiple
//! orders only when prior ones failed; at most one order per booking ever
//! reaches `Captured`.

use crate::types::booking::BookingId;
use crate::types::money::MinorUnits;
use serde::{Deserialize, Serialize};

/// Provider-issued order identifier
pub type OrderId = String;

/// Provider-issued transaction identifier, assigned at capture
pub type TransactionId = String;

/// Lifecycle states of a payment order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// Order exists at the provider; funds not yet moved
    Created,
    /// Funds charged; the stored transaction ID is final
    Captured,
    /// The provider declined this attempt; terminal for this order
    Failed,
}

/// One attempt to charge a booking
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentOrder {
    /// Provider-issued order ID
    pub order: OrderId,

    /// Booking this order pays for
    pub booking: BookingId,

    /// Amount to charge, in minor units
    ///
    /// Always the booking's frozen `quote.total`.
    pub amount: MinorUnits,

    /// Current order state
    pub status: OrderStatus,

    /// Provider transaction ID, present once captured
    pub transaction: Option<TransactionId>,
}

impl PaymentOrder {
    /// Create a freshly-placed order in `Created` state
    pub fn created(order: OrderId, booking: BookingId, amount: MinorUnits) -> Self {
        PaymentOrder {
            order,
            booking,
            amount,
            status: OrderStatus::Created,
            transaction: None,
        }
    }
}

/// The result of a successful (or idempotently repeated) capture
///
/// Every caller of `capture_order` for the same order receives the same
/// transaction ID, however many times and however concurrently it is called.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureReceipt {
    /// The captured order
    pub order: OrderId,

    /// Booking the capture pays for
    pub booking: BookingId,

    /// Provider transaction ID
    pub transaction_id: TransactionId,

    /// Captured amount in minor units
    pub amount: MinorUnits,
}
