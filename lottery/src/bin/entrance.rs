use std::sync::Arc;

use alloy::providers::RootProvider;
use alloy::transports::http::ReqwestTransport;
use anyhow::{Context as _, Result};
use clap::Parser;
use lottery::addresses::NetworkAddresses;
use lottery::env::load_dotenvy_vars_if_present;
use lottery::notify::{TracingSink, ViewRenderer};
use lottery::provider::retry::{build_http_retry_provider, RetryService};
use lottery::provider::{RpcProvider, WalletProvider};
use lottery::{LotteryEntrance, SessionContext};
use lottery_common::wei_to_eth_string;
use tokio::time::Duration;
use tracing::{debug, info, warn};

use self::entrance::*;
mod entrance {
    pub mod cli;
    pub mod render;
}

type HttpTransport = RetryService<ReqwestTransport>;
type HttpWallet = RpcProvider<RootProvider<HttpTransport>, HttpTransport>;

#[tokio::main]
async fn main() -> Result<()> {
    let env_file = load_dotenvy_vars_if_present();
    lottery::tracing::init();
    match env_file {
        Ok(Some(path)) => debug!(path = %path.display(), "loaded environment file"),
        Ok(None) => {}
        Err(e) => warn!("{e:#}"),
    }

    let args = cli::Cli::parse();
    let wallet = args.wallet;

    let addresses = NetworkAddresses::load(&wallet.addresses)?;
    debug!(
        chains = ?addresses.chain_ids().collect::<Vec<_>>(),
        "loaded raffle deployments"
    );
    let provider: Option<Arc<HttpWallet>> = wallet.rpc_url.clone().map(|rpc_url| {
        Arc::new(RpcProvider::new(build_http_retry_provider(
            rpc_url,
            wallet.backoff,
            wallet.max_retries,
        )))
    });

    let renderer: Arc<dyn ViewRenderer> = match args.command {
        cli::Command::Status { json: true } => Arc::new(render::JsonRenderer),
        _ => Arc::new(render::TerminalRenderer),
    };
    let session = LotteryEntrance::new(
        SessionContext::new(provider.clone(), addresses, Arc::new(TracingSink), renderer)
            .with_confirmations(wallet.confirmations),
    );

    match args.command {
        cli::Command::Status { json } => {
            session.start().await?;
            if !json {
                let balance = session.contract_balance().await?;
                println!("Contract balance: {} ETH", wei_to_eth_string(balance));
            }
        }
        cli::Command::Enter { value } => {
            session.start().await?;
            let receipt = match value {
                Some(value) => session.enter_with(value).await?,
                None => session.enter().await?,
            };
            info!(
                tx_hash = %receipt.tx_hash,
                confirmations = receipt.confirmations,
                "entered the raffle"
            );
        }
        cli::Command::Watch { poll_interval } => {
            session.start().await?;
            let provider = provider.context("watching requires a wallet provider")?;
            watch(&session, &provider, Duration::from_millis(poll_interval)).await?;
        }
    }

    Ok(())
}

/// Refreshes the view on every new block and rebuilds the session when the
/// wallet switches networks, until interrupted.
async fn watch(
    session: &LotteryEntrance<HttpWallet>,
    provider: &HttpWallet,
    poll_interval: Duration,
) -> Result<()> {
    let mut chain_id = provider.chain_id().await?;
    let mut last_block = provider.latest_block_number().await?;
    info!(chain_id, block = last_block, "watching the raffle");

    loop {
        tokio::select! {
            interrupted = tokio::signal::ctrl_c() => {
                interrupted.context("couldn't listen for ctrl-c")?;
                session.teardown();
                return Ok(());
            }
            _ = tokio::time::sleep(poll_interval) => {}
        }

        match provider.chain_id().await {
            Ok(current) if current != chain_id => {
                chain_id = current;
                // Failures are reported by the session and retried next tick.
                let _ = session.network_changed(chain_id).await;
                continue;
            }
            Ok(_) => {}
            Err(e) => {
                warn!("couldn't poll the chain id: {e:#}");
                continue;
            }
        }

        match provider.latest_block_number().await {
            Ok(block) if block != last_block => {
                last_block = block;
                let _ = session.refresh().await;
            }
            Ok(_) => {}
            Err(e) => warn!("couldn't poll the latest block: {e:#}"),
        }
    }
}
