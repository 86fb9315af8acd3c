//! Client for a deployed raffle contract: connect a wallet, keep a
//! consistent snapshot of the raffle, and enter it one payment at a time.

pub mod addresses;
pub mod connection;
pub mod contract;
pub mod dispatcher;
pub mod entrance;
pub mod env;
pub mod error;
pub mod fetcher;
pub mod notify;
pub mod provider;
pub mod tracing;

pub use entrance::{LotteryEntrance, SessionContext};
pub use error::EntranceError;

/// Common information for the `--version` CLI flags.
pub fn version() -> String {
    let pkg_name = env!("CARGO_PKG_NAME");
    let pkg_version = env!("CARGO_PKG_VERSION");
    format!("{pkg_name} {pkg_version}")
}
