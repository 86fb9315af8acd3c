use std::path::PathBuf;

use alloy::primitives::U256;
use clap::{Args, Parser, Subcommand, ValueHint};
use url::Url;

const WALLET_HELP_HEADING: &str = "Wallet options";

/// Raffle entrance client
#[derive(Parser)]
#[command(version = lottery::version(), propagate_version = true)]
pub(crate) struct Cli {
    #[command(subcommand)]
    pub(crate) command: Command,

    #[clap(flatten)]
    pub(crate) wallet: WalletConfig,
}

#[derive(Args, Clone, Debug)]
pub(crate) struct WalletConfig {
    /// JSON-RPC endpoint acting as the wallet provider. Its node must hold
    /// unlocked accounts. Without it the client reports that no wallet is
    /// available.
    #[arg(short = 'u', long, env = "LOTTERY_RPC_URL", value_hint = ValueHint::Url, help_heading = WALLET_HELP_HEADING)]
    pub(crate) rpc_url: Option<Url>,
    /// Raffle deployments per chain id, as written by the deploy scripts.
    #[arg(
        short,
        long,
        env = "LOTTERY_ADDRESSES",
        default_value = "contractAddresses.json",
        value_hint = ValueHint::FilePath,
        help_heading = WALLET_HELP_HEADING
    )]
    pub(crate) addresses: PathBuf,
    /// Confirmations an entry needs before the view is refreshed.
    #[arg(short, long, env = "LOTTERY_CONFIRMATIONS", default_value_t = 1, help_heading = WALLET_HELP_HEADING)]
    pub(crate) confirmations: u64,
    /// Backoff in milliseconds for retried read requests.
    #[arg(long, env = "LOTTERY_BACKOFF", default_value_t = 0, help_heading = WALLET_HELP_HEADING)]
    pub(crate) backoff: u64,
    /// The maximum number of retries of a read request. Entries are never
    /// retried.
    #[arg(long, env = "LOTTERY_MAX_RETRIES", default_value_t = 0, help_heading = WALLET_HELP_HEADING)]
    pub(crate) max_retries: u32,
}

#[derive(Subcommand)]
pub(crate) enum Command {
    /// Connects, reads the raffle and prints it.
    Status {
        /// Print the raffle state as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Enters the raffle.
    Enter {
        /// Amount to pay in ETH. Defaults to the entrance fee.
        #[arg(short, long, value_parser = parse_eth)]
        value: Option<U256>,
    },
    /// Keeps the raffle view up to date, following new blocks and network
    /// switches.
    Watch {
        /// Polling interval in milliseconds, roughly the block time.
        #[arg(short, long, env = "LOTTERY_POLL_INTERVAL", default_value_t = 2000)]
        poll_interval: u64,
    },
}

fn parse_eth(s: &str) -> Result<U256, String> {
    lottery_common::eth_string_to_wei(s).map_err(|e| format!("invalid ETH amount '{s}': {e}"))
}
