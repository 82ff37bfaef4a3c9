//! Money helpers
//!
//! Balances and amounts are `i64` minor units (cents) everywhere, including
//! caller input. Major units only appear when rendering response bodies.

use rust_decimal::Decimal;

/// Decimal places carried by a minor unit
const MINOR_UNIT_SCALE: u32 = 2;

/// Parse an amount of minor units from caller text ("1234")
///
/// Only a plain base-10 integer is accepted: fractions, exponents (`1e3`),
/// NaN, infinities and values outside `i64` range give `None`. The sign is
/// preserved; callers decide whether zero or negative is allowed.
pub fn parse_minor(input: &str) -> Option<i64> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<i64>().ok()
}

/// Render minor units as a major-unit decimal (1234 -> 12.34)
pub fn to_major(minor: i64) -> Decimal {
    Decimal::new(minor, MINOR_UNIT_SCALE)
}

/// Format minor units for display, always with two fractional digits
pub fn format_minor(minor: i64) -> String {
    format!("{:.2}", to_major(minor))
}
