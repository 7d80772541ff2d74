//! Direct withdrawals to NEAR accounts
//!
//! Withdraws `nep141` tokens from the ledger straight to a NEAR account. The only
//! fee is the storage deposit the token contract may require to register the
//! receiver. It is paid in wrapped NEAR through the `storage_deposit` field of the
//! `ft_withdraw`, which the ledger debits next to the withdrawn amount. Withdrawals
//! of wrapped NEAR pay it from the same balance; any other token first buys it with
//! a quoted `token_diff`.

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tracing::debug;

use crate::amount::{Amount, SignedAmount};
use crate::bridge::asset::{is_valid_account_id, AssetId, AssetStandard};
use crate::bridge::{
    Bridge, ParsedAsset, RouteConfig, RouteKind, WithdrawalIdentifier, WithdrawalParams, WithdrawalStatus,
};
use crate::chain::Chain;
use crate::error::SdkError;
use crate::fee::{FeeEstimation, FeeQuoter, UnderlyingFee};
use crate::intent::primitives::{FtWithdraw, Intent, NativeWithdraw, TokenDiff};
use crate::relay::SettlementTx;

/// Storage deposit (in yoctoNEAR) a token contract requires before `account_id` can hold
/// its tokens. Zero when the account is already registered.
#[async_trait]
pub trait StorageDepositSource: Send + Sync {
    async fn required_storage_deposit(&self, token_contract: &str, account_id: &str) -> Result<Amount>;
}

pub struct DirectBridge {
    wrapped_native_contract: String,
    storage: Arc<dyn StorageDepositSource>,
    quoter: Option<Arc<FeeQuoter>>,
}

impl DirectBridge {
    pub fn new(
        wrapped_native_contract: impl Into<String>,
        storage: Arc<dyn StorageDepositSource>,
        quoter: Option<Arc<FeeQuoter>>,
    ) -> Self {
        Self {
            wrapped_native_contract: wrapped_native_contract.into(),
            storage,
            quoter,
        }
    }

    fn wrapped_native_asset(&self) -> String {
        AssetId::nep141(self.wrapped_native_contract.clone()).to_string()
    }

    fn parse(&self, params: &WithdrawalParams) -> Result<AssetId, SdkError> {
        self.parse_asset_id(&params.asset_id)?
            .map(|parsed| parsed.asset)
            .ok_or_else(|| SdkError::UnsupportedAssetForRoute {
                asset_id: params.asset_id.clone(),
                route: RouteKind::Direct,
            })
    }

    fn storage_deposit_of(fee: &FeeEstimation) -> Option<Amount> {
        match fee.underlying_fees.get(&RouteKind::Direct) {
            Some(UnderlyingFee::StorageDeposit { amount }) if !amount.is_zero() => Some(*amount),
            _ => None,
        }
    }
}

/// `(unwrap_native, msg)` from an explicit direct route config.
fn direct_options(params: &WithdrawalParams) -> (bool, Option<String>) {
    match &params.route_config {
        Some(RouteConfig::Direct { unwrap_native, msg }) => (*unwrap_native, msg.clone()),
        _ => (false, None),
    }
}

/// Named accounts, 64-char implicit accounts and `0x` EVM-implicit accounts.
fn is_valid_near_destination(address: &str) -> bool {
    if let Some(hex_part) = address.strip_prefix("0x") {
        return hex_part.len() == 40 && hex_part.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
    }
    is_valid_account_id(address)
}

#[async_trait]
impl Bridge for DirectBridge {
    fn route(&self) -> RouteKind {
        RouteKind::Direct
    }

    fn parse_asset_id(&self, asset_id: &str) -> Result<Option<ParsedAsset>, SdkError> {
        let Ok(asset) = AssetId::parse(asset_id) else {
            return Ok(None);
        };
        if asset.standard != AssetStandard::Nep141 {
            return Ok(None);
        }
        Ok(Some(ParsedAsset {
            route: RouteKind::Direct,
            landing_chain: Chain::Near,
            asset,
        }))
    }

    async fn validate_withdrawal(&self, params: &WithdrawalParams) -> Result<(), SdkError> {
        let asset = self.parse(params)?;
        if !is_valid_near_destination(&params.destination_address) {
            return Err(SdkError::InvalidDestination {
                chain: Chain::Near,
                address: params.destination_address.clone(),
                reason: "not a valid NEAR account id".to_string(),
            });
        }
        if params.amount.is_zero() {
            return Err(SdkError::AmountTooLow {
                asset_id: params.asset_id.clone(),
                amount: params.amount,
                min_amount: Amount::from(1u64),
            });
        }
        let (unwrap_native, _) = direct_options(params);
        if unwrap_native && asset.contract_id != self.wrapped_native_contract {
            return Err(SdkError::UnsupportedAssetForRoute {
                asset_id: params.asset_id.clone(),
                route: RouteKind::Direct,
            });
        }
        Ok(())
    }

    async fn estimate_withdrawal_fee(&self, params: &WithdrawalParams) -> Result<FeeEstimation, SdkError> {
        let asset = self.parse(params)?;
        let (unwrap_native, _) = direct_options(params);
        if unwrap_native {
            return Ok(FeeEstimation::zero(RouteKind::Direct));
        }

        let storage = self
            .storage
            .required_storage_deposit(&asset.contract_id, &params.destination_address)
            .await
            .map_err(SdkError::Transport)?;
        let underlying_fees = BTreeMap::from([(RouteKind::Direct, UnderlyingFee::StorageDeposit { amount: storage })]);

        if storage.is_zero() {
            return Ok(FeeEstimation {
                amount: Amount::ZERO,
                quote: None,
                underlying_fees,
            });
        }

        if asset.contract_id == self.wrapped_native_contract {
            debug!("Storage deposit {} for {} paid in-token", storage, params.destination_address);
            return Ok(FeeEstimation {
                amount: storage,
                quote: None,
                underlying_fees,
            });
        }

        let quoter = self.quoter.as_ref().ok_or_else(|| {
            SdkError::Config(format!(
                "storage deposit for {} must be quoted but no fee quoter is configured",
                params.asset_id
            ))
        })?;
        let quote = quoter
            .quote_fee(&params.asset_id, &self.wrapped_native_asset(), storage)
            .await?;

        Ok(FeeEstimation {
            amount: quote.amount_in,
            quote: Some(quote),
            underlying_fees,
        })
    }

    async fn create_withdrawal_intents(
        &self,
        params: &WithdrawalParams,
        fee: &FeeEstimation,
    ) -> Result<Vec<Intent>, SdkError> {
        let asset = self.parse(params)?;
        let (unwrap_native, msg) = direct_options(params);
        let mut intents = Vec::new();

        if let Some(quote) = &fee.quote {
            intents.push(Intent::TokenDiff(TokenDiff {
                diff: BTreeMap::from([
                    (quote.asset_in.clone(), SignedAmount::negative(quote.amount_in)),
                    (quote.asset_out.clone(), SignedAmount::positive(quote.amount_out)),
                ]),
                memo: None,
                referral: None,
            }));
        }

        if unwrap_native {
            intents.push(Intent::NativeWithdraw(NativeWithdraw {
                receiver_id: params.destination_address.clone(),
                amount: params.amount,
            }));
            return Ok(intents);
        }

        // The storage deposit is debited on top of `amount`, from the signer's wNEAR
        // balance or from the wNEAR bought above.
        intents.push(Intent::FtWithdraw(FtWithdraw {
            token: asset.contract_id,
            receiver_id: params.destination_address.clone(),
            amount: params.amount,
            memo: params.destination_memo.clone(),
            msg,
            storage_deposit: Self::storage_deposit_of(fee),
        }));
        Ok(intents)
    }

    async fn create_withdrawal_identifier(
        &self,
        params: &WithdrawalParams,
        index: usize,
        tx: &SettlementTx,
    ) -> Result<WithdrawalIdentifier, SdkError> {
        Ok(WithdrawalIdentifier {
            route: RouteKind::Direct,
            landing_chain: Chain::Near,
            index,
            withdrawal_params: params.clone(),
            tx: tx.clone(),
        })
    }

    /// Direct withdrawals complete in the settlement transaction itself.
    async fn describe_withdrawal(&self, identifier: &WithdrawalIdentifier) -> Result<WithdrawalStatus, SdkError> {
        Ok(WithdrawalStatus::Completed {
            tx_hash: Some(identifier.tx.hash.clone()),
        })
    }
}
