use bigdecimal::{BigDecimal, Zero};
use std::str::FromStr;

use crate::errors::WalletError;

/// Fractional digits used when rendering balances for display
pub const DEFAULT_DISPLAY_PRECISION: u32 = 6;

/// Convert a raw on-chain amount (wei, lamports, nanoTON, token base units)
/// into a fixed-point decimal string.
///
/// The value is `raw / 10^decimals`, truncated toward zero to `precision`
/// fractional digits. Arithmetic is exact, so amounts up to 2^256 keep every
/// digit before truncation.
///
/// # Examples
/// ```
/// use wallet_monitor_api::utils::amount::to_decimal;
/// assert_eq!(to_decimal("1000000000000000000", 18, 6).unwrap(), "1.000000");
/// assert_eq!(to_decimal("1500000000", 9, 6).unwrap(), "1.500000");
/// ```
pub fn to_decimal(raw: &str, decimals: u32, precision: u32) -> Result<String, WalletError> {
    let raw_value = parse_decimal(raw)?;
    let (digits, scale) = raw_value.as_bigint_and_exponent();

    // Shifting the scale divides by 10^decimals without any rounding
    let shifted = BigDecimal::new(digits, scale + decimals as i64);
    // Reducing the scale drops digits, i.e. rounds toward zero
    let truncated = shifted.with_scale(precision as i64);

    Ok(render_fixed(&truncated, precision))
}

/// Same as [`to_decimal`] with the default display precision
pub fn format_balance(raw: &str, decimals: u32) -> Result<String, WalletError> {
    to_decimal(raw, decimals, DEFAULT_DISPLAY_PRECISION)
}

/// Returns true when `|current - previous| > threshold`.
///
/// A difference exactly equal to the threshold is not a change.
pub fn has_changed(previous: &str, current: &str, threshold: &str) -> Result<bool, WalletError> {
    let previous = parse_decimal(previous)?;
    let current = parse_decimal(current)?;
    let threshold = parse_decimal(threshold)?;

    let diff = (current - previous).abs();
    Ok(diff > threshold)
}

/// [`has_changed`] with a zero threshold: any difference counts
pub fn has_any_change(previous: &str, current: &str) -> Result<bool, WalletError> {
    has_changed(previous, current, "0")
}

/// True if `value` parses as a decimal amount
pub fn is_decimal(value: &str) -> bool {
    parse_decimal(value).is_ok()
}

fn parse_decimal(value: &str) -> Result<BigDecimal, WalletError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(WalletError::InvalidAmount(value.to_string()));
    }
    BigDecimal::from_str(trimmed).map_err(|_| WalletError::InvalidAmount(value.to_string()))
}

/// Render a decimal whose scale is exactly `precision` without exponent notation
fn render_fixed(value: &BigDecimal, precision: u32) -> String {
    let negative = *value < BigDecimal::zero();
    let (digits, _) = value.as_bigint_and_exponent();
    let mut magnitude = digits.magnitude().to_string();

    let precision = precision as usize;
    if magnitude.len() <= precision {
        magnitude = format!("{}{}", "0".repeat(precision + 1 - magnitude.len()), magnitude);
    }

    let split = magnitude.len() - precision;
    let (int_part, frac_part) = magnitude.split_at(split);
    let sign = if negative { "-" } else { "" };

    if precision == 0 {
        format!("{}{}", sign, int_part)
    } else {
        format!("{}{}.{}", sign, int_part, frac_part)
    }
}
