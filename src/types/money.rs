//! Money representation for the rental booking engine
//!
//! All amounts are carried as integer minor currency units (cents). Rate
//! arithmetic happens in `rust_decimal` and is rounded back to minor units
//! exactly once per fee line, so rounding error never compounds.

use rust_decimal::Decimal;

/// An amount in minor currency units (cents)
pub type MinorUnits = i64;

/// The priced breakdown of a booking
///
/// Computed once by the fee calculator at request time and frozen on the
/// booking. All fields are minor units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeBreakdown {
    /// `nights × price_per_day`
    pub subtotal: MinorUnits,

    /// Platform commission charged on top of the subtotal to the renter
    pub renter_fee: MinorUnits,

    /// Platform commission deducted from the owner's payout
    pub lister_fee: MinorUnits,

    /// What the renter pays: `subtotal + renter_fee`
    pub total: MinorUnits,

    /// What the owner receives: `subtotal − lister_fee`
    pub lister_payout: MinorUnits,
}

/// Format a minor-unit amount as major units with two decimals
///
/// `16050` becomes `"160.50"`. Used for CSV output and log lines.
pub fn format_major(amount: MinorUnits) -> String {
    Decimal::new(amount, 2).to_string()
}
