//! Currency amounts.
//!
//! All amounts are integers in the smallest unit of a 6-decimal stable-value
//! token (1 PYUSD = 1,000,000 units). Conversion to and from human-readable
//! decimal strings goes through [`Decimal`] so no float rounding ever touches
//! a balance.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

use crate::{DigitalHouseError, Result, constants};

/// Amount in smallest currency units.
pub type Amount = u64;

/// Exact decimal value of `amount` in whole tokens.
#[must_use]
pub fn to_decimal(amount: Amount) -> Decimal {
    Decimal::from_i128_with_scale(i128::from(amount), constants::CURRENCY_DECIMALS)
}

/// Format an amount as whole tokens with `places` decimals, e.g.
/// `format_amount(1_250_000, 2) == "1.25"`. Rounds half away from zero.
#[must_use]
pub fn format_amount(amount: Amount, places: u32) -> String {
    let value = to_decimal(amount).round_dp_with_strategy(
        places,
        rust_decimal::RoundingStrategy::MidpointAwayFromZero,
    );
    format!("{value:.prec$}", prec = places as usize)
}

/// Parse a whole-token decimal string (`"1000"`, `"12.5"`) into units.
///
/// Rejects negative values and anything finer than one unit.
pub fn parse_amount(s: &str) -> Result<Amount> {
    let value = Decimal::from_str(s.trim()).map_err(|e| DigitalHouseError::InvalidArgument {
        reason: format!("invalid amount {s:?}: {e}"),
    })?;
    if value.is_sign_negative() && !value.is_zero() {
        return Err(DigitalHouseError::InvalidArgument {
            reason: format!("amount {s:?} is negative"),
        });
    }
    let value = value.normalize();
    if value.scale() > constants::CURRENCY_DECIMALS {
        return Err(DigitalHouseError::InvalidArgument {
            reason: format!(
                "amount {s:?} has more than {} decimal places",
                constants::CURRENCY_DECIMALS
            ),
        });
    }
    let units = value
        .checked_mul(Decimal::from(constants::UNITS_PER_TOKEN))
        .and_then(|units| units.to_u64())
        .ok_or_else(|| DigitalHouseError::InvalidArgument {
            reason: format!("amount {s:?} out of range"),
        })?;
    Ok(units)
}

/// Whole tokens to units, e.g. `tokens(1000) == 1_000_000_000`.
///
/// # Panics
/// If the result does not fit in an [`Amount`] (more than
/// `u64::MAX / 1_000_000` tokens), in every build profile. Use
/// [`checked_tokens`] for untrusted input.
#[must_use]
pub const fn tokens(whole: u64) -> Amount {
    match checked_tokens(whole) {
        Some(units) => units,
        None => panic!("token amount overflows u64 units"),
    }
}

/// Whole tokens to units, `None` on overflow.
#[must_use]
pub const fn checked_tokens(whole: u64) -> Option<Amount> {
    whole.checked_mul(constants::UNITS_PER_TOKEN)
}

/// Nights between check-in and check-out, rounding partial days up.
/// Zero when the range is empty or reversed.
#[must_use]
pub fn stay_nights(check_in: DateTime<Utc>, check_out: DateTime<Utc>) -> u64 {
    let seconds = (check_out - check_in).num_seconds();
    if seconds <= 0 {
        return 0;
    }
    let nights = (seconds + constants::SECONDS_PER_DAY - 1) / constants::SECONDS_PER_DAY;
    nights.unsigned_abs()
}
