//! Exact conversion between decimal display amounts and integer base units.
//!
//! Amounts never pass through floating point. Parsing goes through
//! `rust_decimal`, whose 96-bit mantissa holds 28 significant digits; inputs
//! that would need more are rejected instead of rounded.

use std::str::FromStr;

use rust_decimal::Decimal;

/// Decimals of the native value unit (wei per ether).
pub const NATIVE_DECIMALS: u32 = 18;

const MAX_SIGNIFICANT_DIGITS: usize = 28;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UnitsError {
    #[error("amount is empty")]
    Empty,

    #[error("'{0}' is not a plain decimal number")]
    Malformed(String),

    #[error("'{input}' has more than {decimals} fractional digits")]
    TooPrecise { input: String, decimals: u32 },

    #[error("'{0}' is out of range")]
    OutOfRange(String),
}

/// Convert a decimal string such as `"1.5"` into base units.
///
/// Accepts digits with at most one `.`; signs, exponents, separators and
/// whitespace inside the number are rejected.
pub fn parse_units(raw: &str, decimals: u32) -> Result<u128, UnitsError> {
    let input = raw.trim();
    if input.is_empty() {
        return Err(UnitsError::Empty);
    }

    let (int_part, frac_part) = match input.split_once('.') {
        Some((int_part, frac_part)) => (int_part, frac_part),
        None => (input, ""),
    };
    let digits_only = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    if (int_part.is_empty() && frac_part.is_empty())
        || !digits_only(int_part)
        || !digits_only(frac_part)
    {
        return Err(UnitsError::Malformed(input.to_string()));
    }

    let frac_significant = frac_part.trim_end_matches('0');
    if frac_significant.len() > decimals as usize {
        return Err(UnitsError::TooPrecise {
            input: input.to_string(),
            decimals,
        });
    }
    // Significant digits exclude leading zeros on either side of the point
    // and trailing zeros, which only shift the exponent.
    let digits = format!("{int_part}{frac_significant}");
    let leading_trimmed = digits.trim_start_matches('0');
    let core = leading_trimmed.trim_end_matches('0');
    if core.is_empty() {
        return Ok(0);
    }
    if core.len() > MAX_SIGNIFICANT_DIGITS {
        return Err(UnitsError::OutOfRange(input.to_string()));
    }
    let shift = leading_trimmed.len() - core.len();

    let mantissa = Decimal::from_str(core)
        .ok()
        .and_then(|value| u128::try_from(value.mantissa()).ok())
        .ok_or_else(|| UnitsError::Malformed(input.to_string()))?;
    let exponent = (decimals as usize - frac_significant.len()) + shift;
    u32::try_from(exponent)
        .ok()
        .and_then(|exp| 10u128.checked_pow(exp))
        .and_then(|factor| mantissa.checked_mul(factor))
        .ok_or_else(|| UnitsError::OutOfRange(input.to_string()))
}

/// Render base units as the shortest exact decimal string.
pub fn format_units(value: u128, decimals: u32) -> String {
    let digits = value.to_string();
    let decimals = decimals as usize;
    if decimals == 0 {
        return digits;
    }

    let padded = if digits.len() <= decimals {
        format!("{}{}", "0".repeat(decimals + 1 - digits.len()), digits)
    } else {
        digits
    };
    let (int_part, frac_part) = padded.split_at(padded.len() - decimals);
    let frac_part = frac_part.trim_end_matches('0');
    if frac_part.is_empty() {
        int_part.to_string()
    } else {
        format!("{int_part}.{frac_part}")
    }
}
