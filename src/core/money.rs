//! Money normalization.
//!
//! Two prices exist for every owned player. The market price is what the
//! player costs to buy now and comes from search. The selling price is what
//! a sale returns and is edited by the user. Only the selling price feeds
//! budget math, and neither is ever re-derived from the other after the
//! player joins the squad.

use crate::core::squad::{MAX_FREE_TRANSFERS, MIN_FREE_TRANSFERS};

/// Rounds to one decimal place, half away from zero.
pub fn round_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Rounds to one decimal, mapping anything that is not finite afterwards
/// to 0. Values near `f64::MAX` overflow when scaled.
fn round_finite(value: f64) -> f64 {
    let rounded = round_tenth(value);
    if rounded.is_finite() { rounded } else { 0.0 }
}

/// Normalizes a user-entered player price: non-finite or negative values
/// become 0, everything else is rounded to one decimal.
pub fn normalize_price(value: f64) -> f64 {
    if value < 0.0 {
        return 0.0;
    }
    round_finite(value)
}

/// Normalizes the bank balance. Non-finite values become 0; negative values
/// are kept.
pub fn normalize_bank(value: f64) -> f64 {
    round_finite(value)
}

/// Parses a money string as typed by a user. Anything unparseable is 0.
pub fn parse_money(input: &str) -> f64 {
    input
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}

/// Coerces a free transfer count into the supported range. Values below the
/// minimum fall back to 1, values above the maximum clamp.
pub fn normalize_free_transfers(value: i64) -> u8 {
    if value < MIN_FREE_TRANSFERS as i64 {
        MIN_FREE_TRANSFERS
    } else if value > MAX_FREE_TRANSFERS as i64 {
        MAX_FREE_TRANSFERS
    } else {
        value as u8
    }
}

pub fn parse_free_transfers(input: &str) -> u8 {
    input
        .trim()
        .parse::<i64>()
        .map(normalize_free_transfers)
        .unwrap_or(MIN_FREE_TRANSFERS)
}

/// Seeds the selling price of a freshly added player from its market price.
pub fn seed_selling_price(market_price: f64) -> f64 {
    normalize_price(market_price)
}

/// Money needed on top of a sale to buy a replacement.
pub fn net_cost(buy_market_price: f64, sell_selling_price: f64) -> f64 {
    round_tenth(buy_market_price - sell_selling_price)
}
