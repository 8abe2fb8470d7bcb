//! CSV format handling for the command log and booking-state output
//!
//! This module centralizes all CSV format concerns, providing:
//! - `CsvCommand` structure for deserialization of raw log rows
//! - Conversion from raw rows to validated [`ReplayCommand`]s
//! - Booking-state output serialization
//!
//! All functions are pure (no I/O) for easy testing. Rows are validated here,
//! at the boundary, so nothing loosely-typed ever reaches the state machine.

use crate::types::{
    format_major, Booking, BookingId, DateRange, ListingId, MinorUnits, ReplayAction,
    ReplayCommand, UserId,
};
use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::Write;
use std::str::FromStr;

/// CSV record structure for deserialization
///
/// Matches the command-log format with columns:
/// `op,booking,listing,actor,start,end,price`. Most fields are optional
/// because different operations use different subsets; presence is
/// validated per-operation in [`convert_csv_command`].
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct CsvCommand {
    pub op: String,
    pub booking: Option<BookingId>,
    pub listing: Option<ListingId>,
    pub actor: Option<UserId>,
    pub start: Option<String>,
    pub end: Option<String>,
    pub price: Option<String>,
}

/// Convert a raw CSV row into a validated replay command
///
/// Checks that every field the operation needs is present and well-formed:
/// dates parse as ISO `YYYY-MM-DD`, prices parse as positive major-unit
/// decimals with at most two fractional digits, and every row names its
/// listing (the async strategy's partition key).
///
/// # Arguments
///
/// * `row` - The deserialized CSV row
///
/// # Returns
///
/// * `Ok(ReplayCommand)` - Successfully validated command
/// * `Err(String)` - Error message describing the conversion failure
pub fn convert_csv_command(row: CsvCommand) -> Result<ReplayCommand, String> {
    let listing = row
        .listing
        .ok_or_else(|| format!("'{}' requires field 'listing'", row.op))?;

    let action = match row.op.to_lowercase().as_str() {
        "listing" => ReplayAction::AddListing {
            owner: require(row.actor, &row.op, "actor")?,
            price_per_day: parse_price(&require(row.price, &row.op, "price")?)?,
        },
        "request" => ReplayAction::Request {
            booking: require(row.booking, &row.op, "booking")?,
            renter: require(row.actor, &row.op, "actor")?,
            range: parse_range(&row)?,
        },
        "approve" => ReplayAction::Approve {
            booking: require(row.booking, &row.op, "booking")?,
            actor: require(row.actor, &row.op, "actor")?,
        },
        "reject" => ReplayAction::Reject {
            booking: require(row.booking, &row.op, "booking")?,
            actor: require(row.actor, &row.op, "actor")?,
        },
        "pay" => ReplayAction::Pay {
            booking: require(row.booking, &row.op, "booking")?,
            actor: require(row.actor, &row.op, "actor")?,
        },
        "capture" => ReplayAction::Capture {
            booking: require(row.booking, &row.op, "booking")?,
        },
        "cancel" => ReplayAction::Cancel {
            booking: require(row.booking, &row.op, "booking")?,
            actor: require(row.actor, &row.op, "actor")?,
        },
        "complete" => ReplayAction::Complete {
            booking: require(row.booking, &row.op, "booking")?,
        },
        "block" => ReplayAction::Block {
            actor: require(row.actor, &row.op, "actor")?,
            range: parse_range(&row)?,
        },
        "unblock" => ReplayAction::Unblock {
            actor: require(row.actor, &row.op, "actor")?,
            range: parse_range(&row)?,
        },
        other => return Err(format!("Invalid operation '{other}'")),
    };

    Ok(ReplayCommand { listing, action })
}

/// Require an operation field to be present
fn require<T>(field: Option<T>, op: &str, name: &str) -> Result<T, String> {
    field.ok_or_else(|| format!("'{op}' requires field '{name}'"))
}

/// Parse the row's start/end columns into a validated range
fn parse_range(row: &CsvCommand) -> Result<DateRange, String> {
    let start = parse_date(&require(row.start.clone(), &row.op, "start")?)?;
    let end = parse_date(&require(row.end.clone(), &row.op, "end")?)?;
    DateRange::new(start, end).map_err(|e| e.to_string())
}

/// Parse an ISO `YYYY-MM-DD` date key
fn parse_date(value: &str) -> Result<NaiveDate, String> {
    value
        .trim()
        .parse()
        .map_err(|_| format!("Invalid date '{value}' (expected YYYY-MM-DD)"))
}

/// Parse a major-unit price ("50.00") into minor units
///
/// Rejects non-positive prices and fractions finer than a cent.
fn parse_price(value: &str) -> Result<MinorUnits, String> {
    let price =
        Decimal::from_str(value.trim()).map_err(|_| format!("Invalid price '{value}'"))?;
    if price <= Decimal::ZERO {
        return Err(format!("Invalid price '{value}' (must be positive)"));
    }

    let minor = price
        .checked_mul(Decimal::ONE_HUNDRED)
        .ok_or_else(|| format!("Invalid price '{value}' (out of range)"))?;
    if minor.fract() != Decimal::ZERO {
        return Err(format!("Invalid price '{value}' (finer than a cent)"));
    }
    minor
        .to_i64()
        .ok_or_else(|| format!("Invalid price '{value}' (out of range)"))
}

/// Write booking states to CSV format
///
/// Writes bookings in CSV format with columns:
/// `booking,listing,renter,start,end,status,total,order,transaction`.
/// Bookings are sorted by ID for deterministic output; money is printed in
/// major units.
///
/// # Arguments
///
/// * `bookings` - Slice of booking states to write
/// * `output` - Mutable reference to a writer for outputting CSV
///
/// # Returns
///
/// * `Ok(())` if writing succeeded
/// * `Err(String)` if a write error occurred
pub fn write_bookings_csv(bookings: &[Booking], output: &mut dyn Write) -> Result<(), String> {
    use csv::Writer;

    let mut writer = Writer::from_writer(output);

    writer
        .write_record([
            "booking",
            "listing",
            "renter",
            "start",
            "end",
            "status",
            "total",
            "order",
            "transaction",
        ])
        .map_err(|e| format!("Failed to write CSV header: {}", e))?;

    let mut sorted = bookings.to_vec();
    sorted.sort_by_key(|b| b.id);

    for booking in sorted {
        writer
            .write_record(&[
                booking.id.to_string(),
                booking.listing.to_string(),
                booking.renter.to_string(),
                booking.range.start.to_string(),
                booking.range.end.to_string(),
                booking.status.to_string(),
                format_major(booking.quote.total),
                booking.payment_order.clone().unwrap_or_default(),
                booking.payment_transaction.clone().unwrap_or_default(),
            ])
            .map_err(|e| format!("Failed to write booking record: {}", e))?;
    }

    writer
        .flush()
        .map_err(|e| format!("Failed to flush output: {}", e))?;

    Ok(())
}
