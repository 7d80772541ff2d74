//! Token amounts
//!
//! Ledger balances are arbitrary-precision integers. Internally they are 256-bit
//! unsigned values; on every boundary (JSON payloads, RPC calls, logs) they are
//! decimal strings.

use std::fmt;
use std::str::FromStr;

use ethereum_types::U256;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

/// Unsigned token amount in the asset's smallest unit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Amount(U256);

impl Amount {
    pub const ZERO: Amount = Amount(U256([0; 4]));

    pub fn new(value: U256) -> Self {
        Self(value)
    }

    pub fn as_u256(&self) -> U256 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn checked_add(self, other: Amount) -> Option<Amount> {
        self.0.checked_add(other.0).map(Amount)
    }

    pub fn checked_sub(self, other: Amount) -> Option<Amount> {
        self.0.checked_sub(other.0).map(Amount)
    }
}

impl From<u64> for Amount {
    fn from(value: u64) -> Self {
        Self(U256::from(value))
    }
}

impl From<u128> for Amount {
    fn from(value: u128) -> Self {
        Self(U256::from(value))
    }
}

impl From<U256> for Amount {
    fn from(value: U256) -> Self {
        Self(value)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // U256's Display is base 10
        write!(f, "{}", self.0)
    }
}

impl FromStr for Amount {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(format!("invalid decimal amount: '{}'", s));
        }
        U256::from_dec_str(s)
            .map(Amount)
            .map_err(|e| format!("invalid decimal amount '{}': {:?}", s, e))
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

/// Signed delta used by `token_diff` intents. Serialized as `"-123"` / `"123"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SignedAmount {
    negative: bool,
    magnitude: Amount,
}

impl SignedAmount {
    pub fn positive(magnitude: Amount) -> Self {
        Self {
            negative: false,
            magnitude,
        }
    }

    pub fn negative(magnitude: Amount) -> Self {
        Self {
            // "-0" is normalised to "0"
            negative: !magnitude.is_zero(),
            magnitude,
        }
    }

    pub fn is_negative(&self) -> bool {
        self.negative
    }

    pub fn magnitude(&self) -> Amount {
        self.magnitude
    }
}

impl fmt::Display for SignedAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.negative {
            write!(f, "-{}", self.magnitude)
        } else {
            write!(f, "{}", self.magnitude)
        }
    }
}

impl FromStr for SignedAmount {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.strip_prefix('-') {
            Some(rest) => Ok(SignedAmount::negative(rest.parse()?)),
            None => Ok(SignedAmount::positive(s.parse()?)),
        }
    }
}

impl Serialize for SignedAmount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for SignedAmount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn amounts_serialize_as_decimal_strings() {
        let amount = Amount::from(100_001_500u64);
        assert_eq!(serde_json::to_string(&amount).unwrap(), "\"100001500\"");

        let big: Amount = "340282366920938463463374607431768211456".parse().unwrap();
        assert_eq!(big.to_string(), "340282366920938463463374607431768211456");
    }

    #[test]
    fn rejects_non_decimal_input() {
        assert!("0x10".parse::<Amount>().is_err());
        assert!("".parse::<Amount>().is_err());
        assert!("-5".parse::<Amount>().is_err());
    }

    #[test]
    fn signed_amount_handles_sign_and_negative_zero() {
        let neg: SignedAmount = "-42".parse().unwrap();
        assert!(neg.is_negative());
        assert_eq!(neg.to_string(), "-42");

        let zero = SignedAmount::negative(Amount::ZERO);
        assert_eq!(zero.to_string(), "0");
    }

    #[test]
    fn checked_sub_underflow_is_none() {
        assert_eq!(Amount::from(1u64).checked_sub(Amount::from(2u64)), None);
    }
}
