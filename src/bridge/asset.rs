//! Ledger asset identifiers
//!
//! `nep141:<contract>` for fungible tokens, `nep171:<contract>:<token_id>` for NFTs and
//! `nep245:<contract>:<token_id>` for multi-token balances.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SdkError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetStandard {
    Nep141,
    Nep171,
    Nep245,
}

impl AssetStandard {
    pub fn prefix(&self) -> &'static str {
        match self {
            AssetStandard::Nep141 => "nep141",
            AssetStandard::Nep171 => "nep171",
            AssetStandard::Nep245 => "nep245",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AssetId {
    pub standard: AssetStandard,
    pub contract_id: String,
    /// Present for `nep171` and `nep245`.
    pub token_id: Option<String>,
}

impl AssetId {
    pub fn nep141(contract_id: impl Into<String>) -> Self {
        Self {
            standard: AssetStandard::Nep141,
            contract_id: contract_id.into(),
            token_id: None,
        }
    }

    pub fn parse(asset_id: &str) -> Result<Self, SdkError> {
        let invalid = |reason: &str| SdkError::InvalidAssetId {
            asset_id: asset_id.to_string(),
            reason: reason.to_string(),
        };

        let (prefix, rest) = asset_id
            .split_once(':')
            .ok_or_else(|| invalid("missing standard prefix"))?;
        let standard = match prefix {
            "nep141" => AssetStandard::Nep141,
            "nep171" => AssetStandard::Nep171,
            "nep245" => AssetStandard::Nep245,
            _ => return Err(invalid("unknown standard")),
        };

        let (contract_id, token_id) = match standard {
            AssetStandard::Nep141 => (rest, None),
            AssetStandard::Nep171 | AssetStandard::Nep245 => {
                let (contract_id, token_id) = rest.split_once(':').ok_or_else(|| invalid("missing token id"))?;
                if token_id.is_empty() {
                    return Err(invalid("empty token id"));
                }
                (contract_id, Some(token_id.to_string()))
            }
        };
        if !is_valid_account_id(contract_id) {
            return Err(invalid("invalid contract account id"));
        }

        Ok(Self {
            standard,
            contract_id: contract_id.to_string(),
            token_id,
        })
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.token_id {
            Some(token_id) => write!(f, "{}:{}:{}", self.standard.prefix(), self.contract_id, token_id),
            None => write!(f, "{}:{}", self.standard.prefix(), self.contract_id),
        }
    }
}

impl FromStr for AssetId {
    type Err = SdkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AssetId::parse(s)
    }
}

/// NEAR account id rules: 2-64 chars of `a-z0-9`, parts separated by single `.`, `-` or `_`.
pub fn is_valid_account_id(account_id: &str) -> bool {
    if account_id.len() < 2 || account_id.len() > 64 {
        return false;
    }
    let mut prev_separator = true;
    for c in account_id.chars() {
        match c {
            'a'..='z' | '0'..='9' => prev_separator = false,
            '.' | '-' | '_' => {
                if prev_separator {
                    return false;
                }
                prev_separator = true;
            }
            _ => return false,
        }
    }
    !prev_separator
}
