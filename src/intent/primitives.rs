//! Intent primitives
//!
//! One primitive is one atomic ledger operation. The JSON shape (internally tagged by
//! `"intent"`, amounts as decimal strings, optional fields omitted) is exactly what the
//! settlement contract parses out of a signed payload, so it must stay stable.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::amount::{Amount, SignedAmount};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "intent", rename_all = "snake_case")]
pub enum Intent {
    /// Move assets between two ledger accounts.
    Transfer(Transfer),
    /// Withdraw a fungible (NEP-141) token to a NEAR account.
    FtWithdraw(FtWithdraw),
    /// Unwrap and withdraw the native token.
    NativeWithdraw(NativeWithdraw),
    /// Withdraw multi-token (NEP-245) balances.
    MtWithdraw(MtWithdraw),
    /// Withdraw a non-fungible (NEP-171) token.
    NftWithdraw(NftWithdraw),
    /// Declare a balance change the signer is willing to accept (swap leg).
    TokenDiff(TokenDiff),
}

impl Intent {
    pub fn kind(&self) -> &'static str {
        match self {
            Intent::Transfer(_) => "transfer",
            Intent::FtWithdraw(_) => "ft_withdraw",
            Intent::NativeWithdraw(_) => "native_withdraw",
            Intent::MtWithdraw(_) => "mt_withdraw",
            Intent::NftWithdraw(_) => "nft_withdraw",
            Intent::TokenDiff(_) => "token_diff",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    pub receiver_id: String,
    /// Asset id (`nep141:...`) to amount.
    pub tokens: BTreeMap<String, Amount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memo: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FtWithdraw {
    /// Token contract account id (without the `nep141:` prefix).
    pub token: String,
    pub receiver_id: String,
    pub amount: Amount,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memo: Option<String>,
    /// When set, the withdrawal is performed with `ft_transfer_call` and this message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub msg: Option<String>,
    /// Native-token storage deposit attached for the receiver's registration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_deposit: Option<Amount>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeWithdraw {
    pub receiver_id: String,
    pub amount: Amount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MtWithdraw {
    pub token: String,
    pub receiver_id: String,
    pub token_ids: Vec<String>,
    pub amounts: Vec<Amount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memo: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub msg: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NftWithdraw {
    pub token: String,
    pub receiver_id: String,
    pub token_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memo: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenDiff {
    /// Asset id to signed delta (negative = given away, positive = received).
    pub diff: BTreeMap<String, SignedAmount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memo: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub referral: Option<String>,
}
