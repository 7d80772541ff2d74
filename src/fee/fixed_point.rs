//! Fixed-point price arithmetic for the fee fallback
//!
//! Prices are parsed from their decimal text straight into integers scaled by
//! 10^12; no floating point is involved anywhere. Products are formed in 512 bits
//! so that `fee * price * 10^decimals` cannot overflow for any 256-bit amount.

use ethereum_types::{U256, U512};

use crate::amount::Amount;
use crate::fee::TokenPrice;

/// Number of decimal digits prices are scaled by.
pub const PRICE_SCALE_DIGITS: u32 = 12;

/// Fallback buffer over the oracle-implied input amount: 12/10 = 1.2x.
pub const FALLBACK_BUFFER_NUM: u64 = 12;
pub const FALLBACK_BUFFER_DEN: u64 = 10;

const MAX_EXPONENT: i64 = 64;

/// Parses a non-negative decimal (`"0.0042"`, `"3100"`, `"1.5e-9"`, `"2E+3"`) into an
/// integer scaled by 10^[`PRICE_SCALE_DIGITS`]. Digits beyond the scale are truncated.
pub fn parse_scaled_decimal(text: &str) -> Result<U256, String> {
    let text = text.trim();
    let (mantissa, exponent) = match text.find(|c: char| c == 'e' || c == 'E') {
        Some(pos) => {
            let exp = text[pos + 1..]
                .parse::<i64>()
                .map_err(|e| format!("invalid exponent in '{}': {}", text, e))?;
            (&text[..pos], exp)
        }
        None => (text, 0),
    };

    let (int_part, frac_part) = match mantissa.split_once('.') {
        Some((int_part, frac_part)) => (int_part, frac_part),
        None => (mantissa, ""),
    };
    let all_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    if int_part.is_empty() && frac_part.is_empty() || !all_digits(int_part) || !all_digits(frac_part) {
        return Err(format!("invalid decimal '{}'", text));
    }

    let digits = format!("{}{}", int_part, frac_part);
    let digits = digits.trim_start_matches('0');
    if digits.is_empty() {
        return Ok(U256::zero());
    }

    let shift = exponent - frac_part.len() as i64 + i64::from(PRICE_SCALE_DIGITS);
    if shift > MAX_EXPONENT {
        return Err(format!("decimal '{}' is out of range", text));
    }

    if shift >= 0 {
        let value = U256::from_dec_str(digits).map_err(|e| format!("decimal '{}' is out of range: {:?}", text, e))?;
        value
            .checked_mul(U256::exp10(shift as usize))
            .ok_or_else(|| format!("decimal '{}' is out of range", text))
    } else {
        let drop = usize::try_from(-shift).unwrap_or(usize::MAX);
        if drop >= digits.len() {
            return Ok(U256::zero());
        }
        U256::from_dec_str(&digits[..digits.len() - drop])
            .map_err(|e| format!("decimal '{}' is out of range: {:?}", text, e))
    }
}

/// Input amount for an exact-input quote expected to yield at least `fee_out` of the
/// fee asset:
///
/// ```text
/// ceil(fee_out * price_fee * 10^dec_in * 1.2 / (price_in * 10^dec_fee))
/// ```
///
/// Returns `None` when a price is zero, the fee is zero, or the result does not fit
/// in 256 bits.
pub fn fallback_amount_in(fee_out: Amount, fee_price: &TokenPrice, in_price: &TokenPrice) -> Option<Amount> {
    if fee_out.is_zero() || fee_price.price_scaled.is_zero() || in_price.price_scaled.is_zero() {
        return None;
    }

    let numerator = U512::from(fee_out.as_u256())
        .checked_mul(U512::from(fee_price.price_scaled))?
        .checked_mul(U512::exp10(usize::from(in_price.decimals)))?
        .checked_mul(U512::from(FALLBACK_BUFFER_NUM))?;
    let denominator = U512::from(in_price.price_scaled)
        .checked_mul(U512::exp10(usize::from(fee_price.decimals)))?
        .checked_mul(U512::from(FALLBACK_BUFFER_DEN))?;

    let (quotient, remainder) = numerator.div_mod(denominator);
    let ceil = if remainder.is_zero() {
        quotient
    } else {
        quotient + U512::one()
    };

    U256::try_from(ceil).ok().map(Amount::new)
}
