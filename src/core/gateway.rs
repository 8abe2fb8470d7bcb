//! Payment gateway adapter
//!
//! Wraps order creation and capture against the external payment provider.
//! The provider is reached through the [`GatewayClient`] trait; the adapter
//! owns the core's `PaymentOrder` records and layers on:
//!
//! - a caller-supplied timeout around every provider call
//! - idempotent capture: repeated captures of the same order return the same
//!   transaction ID without re-charging
//! - reconciliation: a provider answering "already captured" for an order
//!   the core still held as `Created` (crash/restart) is adopted rather
//!   than errored
//! - failure classification: transient transport failures (retryable, no
//!   state mutated) vs declines (terminal for that order)
//!
//! The adapter never retries internally; retry is always caller-driven.

use crate::types::{
    BookingError, BookingId, CaptureReceipt, MinorUnits, OrderId, OrderStatus, PaymentOrder,
    TransactionId,
};
use async_trait::async_trait;
use dashmap::DashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;
use tracing::{debug, info};

/// Provider-side failure of a gateway call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayFailure {
    /// Transport-level failure (network, provider outage); nothing charged
    Unavailable {
        /// Transport detail
        reason: String,
    },
    /// The provider refused the operation (e.g. funds declined)
    Declined {
        /// Provider decline reason
        reason: String,
    },
}

/// Provider answer to a capture call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayCapture {
    /// Transaction the provider charged (or had already charged)
    pub transaction_id: TransactionId,

    /// True when the provider had already captured this order earlier
    ///
    /// Set on repeat captures and after crash recovery; the transaction ID
    /// is the original one either way.
    pub already_captured: bool,
}

/// Client for the external payment provider
///
/// Implementations are expected to be idempotent on capture: capturing an
/// order twice must report the original transaction instead of charging
/// again. The adapter relies on this for reconciliation.
#[async_trait]
pub trait GatewayClient: Send + Sync {
    /// Create an order for `amount` minor units against a booking
    async fn create_order(
        &self,
        booking: BookingId,
        amount: MinorUnits,
    ) -> Result<OrderId, GatewayFailure>;

    /// Capture a previously created order
    async fn capture(&self, order: &str) -> Result<GatewayCapture, GatewayFailure>;
}

/// Deterministic in-process provider
///
/// Stands in for the real gateway in the replay CLI and in tests: order and
/// transaction IDs are sequential, repeat captures answer "already captured"
/// with the original transaction, and failures can be scripted one call at
/// a time.
#[derive(Debug, Default)]
pub struct SimulatedGateway {
    orders: DashMap<OrderId, SimulatedOrder>,
    sequence: AtomicU64,
    scripted_failures: Mutex<Vec<GatewayFailure>>,
}

#[derive(Debug, Clone)]
struct SimulatedOrder {
    #[allow(dead_code)]
    booking: BookingId,
    #[allow(dead_code)]
    amount: MinorUnits,
    transaction: Option<TransactionId>,
}

impl SimulatedGateway {
    /// Create a gateway with no orders and nothing scripted
    pub fn new() -> Self {
        Self::default()
    }

    /// Script a failure for the next provider call
    ///
    /// Failures are consumed in FIFO order, one per call, before the call's
    /// normal behavior runs.
    pub fn script_failure(&self, failure: GatewayFailure) {
        let mut scripted = match self.scripted_failures.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        scripted.push(failure);
    }

    fn take_scripted_failure(&self) -> Option<GatewayFailure> {
        let mut scripted = match self.scripted_failures.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if scripted.is_empty() {
            None
        } else {
            Some(scripted.remove(0))
        }
    }

    fn next_sequence(&self) -> u64 {
        self.sequence.fetch_add(1, Ordering::Relaxed) + 1
    }
}

#[async_trait]
impl GatewayClient for SimulatedGateway {
    async fn create_order(
        &self,
        booking: BookingId,
        amount: MinorUnits,
    ) -> Result<OrderId, GatewayFailure> {
        if let Some(failure) = self.take_scripted_failure() {
            return Err(failure);
        }

        let order = format!("ord-{}-{}", booking, self.next_sequence());
        self.orders.insert(
            order.clone(),
            SimulatedOrder {
                booking,
                amount,
                transaction: None,
            },
        );
        Ok(order)
    }

    async fn capture(&self, order: &str) -> Result<GatewayCapture, GatewayFailure> {
        if let Some(failure) = self.take_scripted_failure() {
            return Err(failure);
        }

        let mut entry = self
            .orders
            .get_mut(order)
            .ok_or_else(|| GatewayFailure::Declined {
                reason: format!("unknown order '{order}'"),
            })?;

        if let Some(transaction) = &entry.transaction {
            return Ok(GatewayCapture {
                transaction_id: transaction.clone(),
                already_captured: true,
            });
        }

        let transaction = format!("txn-{}", self.next_sequence());
        entry.transaction = Some(transaction.clone());
        Ok(GatewayCapture {
            transaction_id: transaction,
            already_captured: false,
        })
    }
}

/// The core's adapter over the payment provider
///
/// Owns the `PaymentOrder` records and enforces the order-side invariants:
/// a booking gets a fresh order only after its prior one failed, and at most
/// one order per booking ever reaches `Captured`.
pub struct PaymentGatewayAdapter {
    client: Arc<dyn GatewayClient>,
    orders: DashMap<OrderId, PaymentOrder>,
    booking_orders: DashMap<BookingId, Vec<OrderId>>,
    call_timeout: Duration,
}

impl PaymentGatewayAdapter {
    /// Create an adapter over `client` with a per-call timeout
    pub fn new(client: Arc<dyn GatewayClient>, call_timeout: Duration) -> Self {
        PaymentGatewayAdapter {
            client,
            orders: DashMap::new(),
            booking_orders: DashMap::new(),
            call_timeout,
        }
    }

    /// Snapshot an order by ID
    pub fn order(&self, order: &str) -> Option<PaymentOrder> {
        self.orders.get(order).map(|entry| entry.value().clone())
    }

    /// All orders ever created for a booking, in creation order
    pub fn orders_for(&self, booking: BookingId) -> Vec<PaymentOrder> {
        self.booking_orders
            .get(&booking)
            .map(|ids| ids.iter().filter_map(|id| self.order(id)).collect())
            .unwrap_or_default()
    }

    /// Create a payment order for a booking
    ///
    /// Refused while the booking already has an order in `Created` or
    /// `Captured` state: retries get a fresh order only once the prior one
    /// failed.
    ///
    /// # Errors
    ///
    /// * `OpenOrderExists` - the booking already has an open order
    /// * `GatewayUnavailable` - transport failure or timeout; retryable
    /// * `PaymentDeclined` - the provider refused to create the order
    pub async fn create_order(
        &self,
        booking: BookingId,
        amount: MinorUnits,
    ) -> Result<PaymentOrder, BookingError> {
        // Fast pre-check; re-validated under the entry lock after the call
        if let Some(open) = self.open_order_for(booking) {
            return Err(BookingError::OpenOrderExists {
                booking,
                order: open,
            });
        }

        debug!(booking, amount, "gateway create_order");
        let order_id = self
            .call(self.client.create_order(booking, amount))
            .await
            .map_err(|f| map_failure(f, "create_order", None))?;

        self.orders.insert(
            order_id.clone(),
            PaymentOrder::created(order_id.clone(), booking, amount),
        );

        // Commit the link under the booking's entry lock so two racing
        // creates cannot both leave an open order behind.
        let mut ids = self.booking_orders.entry(booking).or_insert_with(Vec::new);
        if let Some(open) = ids
            .iter()
            .find(|id| self.is_open(id) && **id != order_id)
            .cloned()
        {
            // Lost the race; void the fresh provider order locally
            if let Some(mut fresh) = self.orders.get_mut(&order_id) {
                fresh.status = OrderStatus::Failed;
            }
            ids.push(order_id);
            return Err(BookingError::OpenOrderExists {
                booking,
                order: open,
            });
        }
        ids.push(order_id.clone());
        drop(ids);

        info!(booking, order = %order_id, amount, "payment order created");
        self.order(&order_id)
            .ok_or(BookingError::OrderNotFound { order: order_id })
    }

    /// Capture an order, idempotently
    ///
    /// An order the core already holds as `Captured` short-circuits locally
    /// with the stored transaction and no provider call. Otherwise the
    /// provider is called under the adapter timeout; "already captured"
    /// answers (crash recovery) are adopted as a normal capture.
    ///
    /// # Errors
    ///
    /// * `OrderNotFound` - unknown order ID
    /// * `GatewayUnavailable` - transport failure or timeout; nothing was
    ///   mutated and the same order ID may be retried
    /// * `PaymentDeclined` - the provider declined; the order is `Failed`
    ///   and the booking needs a fresh order
    /// * `DuplicateCapture` - a different order for this booking already
    ///   captured
    pub async fn capture_order(&self, order: &str) -> Result<CaptureReceipt, BookingError> {
        let snapshot = self.order(order).ok_or_else(|| BookingError::OrderNotFound {
            order: order.to_string(),
        })?;

        match snapshot.status {
            OrderStatus::Captured => {
                // Idempotent repeat: same transaction, no provider call
                return receipt_from(&snapshot);
            }
            OrderStatus::Failed => {
                return Err(BookingError::payment_declined(
                    order,
                    "order already failed; create a fresh order",
                ));
            }
            OrderStatus::Created => {}
        }

        debug!(order, booking = snapshot.booking, "gateway capture");
        let outcome = self.call(self.client.capture(order)).await;

        match outcome {
            Ok(capture) => self.commit_capture(&snapshot, capture),
            Err(GatewayFailure::Unavailable { reason }) => {
                // Fail-soft: no state mutated, the caller may retry as-is
                Err(BookingError::gateway_unavailable("capture", &reason))
            }
            Err(GatewayFailure::Declined { reason }) => {
                if let Some(mut entry) = self.orders.get_mut(order) {
                    entry.status = OrderStatus::Failed;
                }
                info!(order, reason = %reason, "payment declined");
                Err(BookingError::payment_declined(order, &reason))
            }
        }
    }

    /// Record a successful provider capture
    fn commit_capture(
        &self,
        snapshot: &PaymentOrder,
        capture: GatewayCapture,
    ) -> Result<CaptureReceipt, BookingError> {
        // At most one order per booking may ever reach Captured
        if let Some(ids) = self.booking_orders.get(&snapshot.booking) {
            if let Some(other) = ids
                .iter()
                .find(|id| **id != snapshot.order && self.is_captured(id))
                .cloned()
            {
                return Err(BookingError::DuplicateCapture {
                    booking: snapshot.booking,
                    order: snapshot.order.clone(),
                    captured_order: other,
                });
            }
        }

        let mut entry =
            self.orders
                .get_mut(&snapshot.order)
                .ok_or_else(|| BookingError::OrderNotFound {
                    order: snapshot.order.clone(),
                })?;

        match entry.status {
            OrderStatus::Captured => {
                // A concurrent capture committed first; the provider handed
                // both callers the same transaction
            }
            _ => {
                if capture.already_captured {
                    info!(
                        order = %snapshot.order,
                        booking = snapshot.booking,
                        "reconciled order the provider had already captured"
                    );
                }
                entry.status = OrderStatus::Captured;
                entry.transaction = Some(capture.transaction_id.clone());
            }
        }

        let committed = entry.value().clone();
        drop(entry);
        receipt_from(&committed)
    }

    /// The booking's open (`Created` or `Captured`) order, if any
    fn open_order_for(&self, booking: BookingId) -> Option<OrderId> {
        self.booking_orders
            .get(&booking)
            .and_then(|ids| ids.iter().find(|id| self.is_open(id)).cloned())
    }

    fn is_open(&self, order: &OrderId) -> bool {
        self.orders
            .get(order)
            .map(|o| o.status != OrderStatus::Failed)
            .unwrap_or(false)
    }

    fn is_captured(&self, order: &OrderId) -> bool {
        self.orders
            .get(order)
            .map(|o| o.status == OrderStatus::Captured)
            .unwrap_or(false)
    }

    /// Run a provider call under the adapter timeout
    ///
    /// A timeout is reported as a transport failure; by then nothing local
    /// has been mutated, so the caller is free to retry.
    async fn call<T, F>(&self, future: F) -> Result<T, GatewayFailure>
    where
        F: Future<Output = Result<T, GatewayFailure>>,
    {
        match tokio::time::timeout(self.call_timeout, future).await {
            Ok(result) => result,
            Err(_) => Err(GatewayFailure::Unavailable {
                reason: format!("timed out after {:?}", self.call_timeout),
            }),
        }
    }
}

/// Build a receipt from a captured order record
fn receipt_from(order: &PaymentOrder) -> Result<CaptureReceipt, BookingError> {
    let transaction_id = order
        .transaction
        .clone()
        .ok_or_else(|| BookingError::OrderNotFound {
            order: order.order.clone(),
        })?;
    Ok(CaptureReceipt {
        order: order.order.clone(),
        booking: order.booking,
        transaction_id,
        amount: order.amount,
    })
}

/// Map a provider failure into the caller-facing taxonomy
fn map_failure(failure: GatewayFailure, operation: &str, order: Option<&str>) -> BookingError {
    match failure {
        GatewayFailure::Unavailable { reason } => {
            BookingError::gateway_unavailable(operation, &reason)
        }
        GatewayFailure::Declined { reason } => {
            BookingError::payment_declined(order.unwrap_or("unassigned"), &reason)
        }
    }
}
