use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use alloy::primitives::{Address, U256};
use futures::try_join;
use lottery_common::network_config;
use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::addresses::NetworkAddresses;
use crate::connection::ConnectionState;
use crate::error::EntranceError;
use crate::provider::{RaffleContract, WalletProvider};

/// Snapshot of the raffle as of the last successful refresh.
///
/// Only ever replaced as a whole, so the three fields always come from the
/// same batch of reads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewState {
    /// In wei.
    pub entrance_fee: U256,
    pub num_players: U256,
    pub recent_winner: Address,
}

/// Reads the raffle and publishes [`ViewState`] snapshots.
pub struct ContractStateFetcher {
    addresses: Arc<NetworkAddresses>,
    view: watch::Sender<ViewState>,
    /// Tickets handed out to refreshes, in start order.
    issued: AtomicU64,
    /// Ticket of the refresh whose result is currently published.
    published: AtomicU64,
}

impl ContractStateFetcher {
    pub fn new(addresses: Arc<NetworkAddresses>) -> Self {
        Self {
            addresses,
            view: watch::Sender::new(ViewState::default()),
            issued: AtomicU64::new(0),
            published: AtomicU64::new(0),
        }
    }

    /// Raffle address on `chain_id`.
    pub fn resolve(&self, chain_id: u64) -> Result<Address, EntranceError> {
        self.addresses
            .resolve(chain_id)
            .ok_or(EntranceError::UnknownNetwork { chain_id })
    }

    /// Re-reads the raffle on the provider's active network.
    ///
    /// On failure the published snapshot is left untouched. A refresh that
    /// resolves after a newer one has already published returns its own
    /// reads without publishing them.
    pub async fn refresh<P>(
        &self,
        provider: &P,
        connection: &ConnectionState,
    ) -> Result<ViewState, EntranceError>
    where
        P: WalletProvider + RaffleContract,
    {
        if !connection.is_connected() {
            return Err(EntranceError::unavailable("wallet is not connected"));
        }
        let ticket = self.issued.fetch_add(1, Ordering::SeqCst) + 1;

        let chain_id = provider.chain_id().await.map_err(EntranceError::ReadFailure)?;
        let raffle = self.resolve(chain_id)?;

        let (entrance_fee, num_players, recent_winner) = try_join!(
            provider.entrance_fee(raffle),
            provider.number_of_players(raffle),
            provider.recent_winner(raffle),
        )
        .map_err(EntranceError::ReadFailure)?;

        if let Some(expected) = unexpected_fee(chain_id, entrance_fee) {
            warn!(
                chain_id,
                %expected,
                fetched = %entrance_fee,
                "entrance fee differs from the one the raffle was deployed with"
            );
        }
        let fetched = ViewState {
            entrance_fee,
            num_players,
            recent_winner,
        };
        if self.publish(ticket, fetched) {
            info!(
                chain_id,
                %raffle,
                entrance_fee = %fetched.entrance_fee,
                num_players = %fetched.num_players,
                recent_winner = %fetched.recent_winner,
                "raffle state refreshed"
            );
        } else {
            debug!(ticket, "discarding refresh superseded by a newer one");
        }
        Ok(fetched)
    }

    /// Publishes `state` unless a refresh started later already did.
    fn publish(&self, ticket: u64, state: ViewState) -> bool {
        self.view.send_if_modified(|current| {
            // Runs under the channel's write lock, so tickets are compared
            // and stored atomically with the value.
            if ticket <= self.published.load(Ordering::SeqCst) {
                return false;
            }
            self.published.store(ticket, Ordering::SeqCst);
            *current = state;
            true
        })
    }

    /// Ether held by the raffle on the provider's active network.
    pub async fn contract_balance<P>(&self, provider: &P) -> Result<U256, EntranceError>
    where
        P: WalletProvider,
    {
        let chain_id = provider.chain_id().await.map_err(EntranceError::ReadFailure)?;
        let raffle = self.resolve(chain_id)?;
        provider
            .balance(raffle)
            .await
            .map_err(EntranceError::ReadFailure)
    }

    pub fn current(&self) -> ViewState {
        *self.view.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<ViewState> {
        self.view.subscribe()
    }

    /// Drops back to the zero snapshot; in-flight refreshes started before
    /// the reset are discarded.
    pub fn reset(&self) {
        let ticket = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        self.view.send_modify(|current| {
            self.published.store(ticket, Ordering::SeqCst);
            *current = ViewState::default();
        });
    }
}

/// The fee `chain_id` was deployed with, when `fee` differs from it.
fn unexpected_fee(chain_id: u64, fee: U256) -> Option<U256> {
    network_config(chain_id)
        .map(|network| network.entrance_fee)
        .filter(|expected| *expected != fee)
}
