//! Withdrawal CLI
//!
//! Withdraws one ledger asset to a destination account, or only estimates the fee.
//!
//! ## Usage
//!
//! ```bash
//! INTENTS_SIGNER_PRIVATE_KEY=<hex ed25519 secret> cargo run --bin withdraw -- \
//!   --config config/intents-sdk.toml \
//!   --asset-id nep141:usdt.tether-token.near \
//!   --amount 100000000 \
//!   --destination alice.near
//! ```
//!
//! Add `--estimate-only` to print the fee without signing anything.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use intent_settlement::{
    bridge::{Bridge, DirectBridge, InternalTransferBridge, RouteConfig, WithdrawalParams},
    clients::{HttpPriceOracle, HttpRelayer, NearRpcClient, RpcSaltSource},
    config::SdkConfig,
    fee::FeeQuoter,
    sdk::{IntentsSdk, ProcessOptions},
    signing::{LocalEd25519Key, Nep413Signer},
    AbortController, Amount,
};
use serde_json::json;
use tokio::signal;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "withdraw")]
#[command(about = "Withdraw assets from the intents ledger to a destination account")]
struct Args {
    /// Path to configuration file (default: config/intents-sdk.toml or INTENTS_SDK_CONFIG_PATH env var)
    #[arg(short, long)]
    config: Option<String>,

    /// Ledger asset id, e.g. nep141:wrap.near
    #[arg(long)]
    asset_id: String,

    /// Amount in the asset's smallest unit
    #[arg(long)]
    amount: String,

    /// Destination account or address
    #[arg(long)]
    destination: String,

    /// Memo forwarded to the destination
    #[arg(long)]
    memo: Option<String>,

    /// Take the fee out of `amount` instead of adding it on top
    #[arg(long)]
    fee_inclusive: bool,

    /// Transfer to another ledger account instead of withdrawing
    #[arg(long)]
    internal: bool,

    /// Withdraw wrapped NEAR as native NEAR
    #[arg(long, conflicts_with = "internal")]
    unwrap_native: bool,

    /// Ledger account to sign for (default: the key's implicit account)
    #[arg(long)]
    signer_id: Option<String>,

    /// Only print the fee estimate
    #[arg(long)]
    estimate_only: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt::init();

    let config = SdkConfig::load_from_path(args.config.as_deref())?;
    info!("Verifying contract: {}", config.env.verifying_contract);
    info!("Relay URL: {}", config.env.relay_url);

    let key_hex = std::env::var("INTENTS_SIGNER_PRIVATE_KEY")
        .context("INTENTS_SIGNER_PRIVATE_KEY env var is required (hex ed25519 secret key)")?;
    let key = Arc::new(LocalEd25519Key::from_hex(key_hex.trim())?);
    let signer_id = args
        .signer_id
        .clone()
        .unwrap_or_else(|| key.implicit_account_id());
    info!("Signing as {}", signer_id);

    let rpc = NearRpcClient::new(config.env.near_rpc_url.clone())?;
    let relayer = Arc::new(HttpRelayer::new(
        config.env.relay_url.clone(),
        config.env.verifying_contract.clone(),
    )?);
    let oracle = Arc::new(HttpPriceOracle::new(config.env.price_oracle_url.clone())?);
    let quoter = Arc::new(FeeQuoter::new(relayer.clone(), oracle, config.quote_options()));

    let bridges: Vec<Arc<dyn Bridge>> = vec![
        Arc::new(DirectBridge::new(
            config.env.wrapped_native_contract.clone(),
            Arc::new(rpc.clone()),
            Some(quoter),
        )),
        Arc::new(InternalTransferBridge::new()),
    ];
    let salt_source = Arc::new(RpcSaltSource::new(rpc, config.env.verifying_contract.clone()));
    let signer = Arc::new(Nep413Signer::new(signer_id, key));
    let sdk = IntentsSdk::new(&config, bridges, salt_source, signer, relayer);

    let amount: Amount = args
        .amount
        .parse()
        .map_err(|e: String| anyhow::anyhow!("Invalid --amount: {}", e))?;
    let route_config = if args.internal {
        Some(RouteConfig::InternalTransfer)
    } else if args.unwrap_native {
        Some(RouteConfig::Direct {
            unwrap_native: true,
            msg: None,
        })
    } else {
        None
    };
    let params = WithdrawalParams {
        asset_id: args.asset_id,
        amount,
        destination_address: args.destination,
        destination_memo: args.memo,
        fee_inclusive: args.fee_inclusive,
        route_config,
    };

    if args.estimate_only {
        let fee = sdk.estimate_withdrawal_fee(&params).await?;
        println!("{}", serde_json::to_string_pretty(&fee)?);
        return Ok(());
    }

    // Ctrl-C aborts settlement and completion waits
    let controller = Arc::new(AbortController::new());
    let options = ProcessOptions {
        abort: Some(controller.signal()),
        ..Default::default()
    };
    let interrupt = {
        let controller = Arc::clone(&controller);
        tokio::spawn(async move {
            if signal::ctrl_c().await.is_ok() {
                warn!("Interrupted, aborting withdrawal");
                controller.abort("interrupted by user");
            }
        })
    };
    let outcome = sdk.process_withdrawal(params, &options).await;
    interrupt.abort();
    let outcome = outcome?;

    let output = json!({
        "intent_hash": outcome.intent_hash,
        "settlement_tx": outcome.settlement_tx,
        "fee": outcome.fee,
        "destination_tx_hash": outcome.destination_tx_hash,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
