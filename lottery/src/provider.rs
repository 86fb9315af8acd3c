use std::future::Future;
use std::ops::Deref;
use std::sync::Arc;

use alloy::primitives::{Address, TxHash, U256};
use alloy::{providers::Provider, transports::Transport};
use anyhow::Context as _;
use serde::Serialize;
use tokio::sync::{Semaphore, SemaphorePermit};
use tracing::{debug, warn};

#[cfg(test)]
pub(crate) mod canned;
pub mod retry;

const MAX_NUMBER_OF_PARALLEL_REQUESTS: usize = 16;

/// The wallet side of a provider: accounts, active network and balances.
pub trait WalletProvider {
    /// Asks the wallet to expose its accounts to the client.
    fn request_accounts(&self) -> impl Future<Output = anyhow::Result<Vec<Address>>> + Send;

    /// Chain id of the network the wallet is currently pointed at.
    fn chain_id(&self) -> impl Future<Output = anyhow::Result<u64>> + Send;

    fn balance(&self, address: Address) -> impl Future<Output = anyhow::Result<U256>> + Send;
}

/// The calls the client makes against a deployed raffle.
pub trait RaffleContract {
    fn entrance_fee(&self, raffle: Address) -> impl Future<Output = anyhow::Result<U256>> + Send;

    fn number_of_players(
        &self,
        raffle: Address,
    ) -> impl Future<Output = anyhow::Result<U256>> + Send;

    fn recent_winner(&self, raffle: Address)
        -> impl Future<Output = anyhow::Result<Address>> + Send;

    /// Submits `enterRaffle` paying `value`, returning once the provider
    /// accepted the transaction.
    fn enter_raffle(
        &self,
        raffle: Address,
        from: Address,
        value: U256,
    ) -> impl Future<Output = anyhow::Result<TxHash>> + Send;

    /// Resolves once `tx_hash` has been included and buried under
    /// `confirmations - 1` further blocks.
    fn wait_for_receipt(
        &self,
        tx_hash: TxHash,
        confirmations: u64,
    ) -> impl Future<Output = anyhow::Result<EntryReceipt>> + Send;
}

/// The parts of a transaction receipt the client cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EntryReceipt {
    pub tx_hash: TxHash,
    pub block_number: Option<u64>,
    pub confirmations: u64,
    /// Execution status, `false` when the transaction was mined but reverted.
    pub success: bool,
}

/// Wrapper around an alloy provider acting as the user's wallet.
///
/// The node behind it owns the accounts and signs `eth_sendTransaction`, the
/// same way an injected browser wallet does.
pub struct RpcProvider<ProviderT, TransportT> {
    provider: Arc<ProviderT>,
    // Every session shares the same HTTP client, so we bound the number of
    // in-flight RPC requests ourselves.
    semaphore: Arc<Semaphore>,
    _phantom: std::marker::PhantomData<TransportT>,
}

pub struct ProviderGuard<'a, ProviderT> {
    provider: Arc<ProviderT>,
    _permit: SemaphorePermit<'a>,
}

impl<ProviderT> Deref for ProviderGuard<'_, ProviderT> {
    type Target = ProviderT;

    fn deref(&self) -> &Self::Target {
        &self.provider
    }
}

impl<ProviderT, TransportT> RpcProvider<ProviderT, TransportT>
where
    ProviderT: Provider<TransportT>,
    TransportT: Transport + Clone,
{
    pub fn new(provider: ProviderT) -> Self {
        Self {
            provider: provider.into(),
            semaphore: Arc::new(Semaphore::new(MAX_NUMBER_OF_PARALLEL_REQUESTS)),
            _phantom: std::marker::PhantomData,
        }
    }

    pub async fn get_provider(&self) -> Result<ProviderGuard<ProviderT>, anyhow::Error> {
        Ok(ProviderGuard {
            provider: self.provider.clone(),
            _permit: self.semaphore.acquire().await?,
        })
    }

    pub async fn latest_block_number(&self) -> anyhow::Result<u64> {
        self.get_provider()
            .await?
            .get_block_number()
            .await
            .context("couldn't retrieve the latest block number")
    }
}

impl<ProviderT, TransportT> WalletProvider for RpcProvider<ProviderT, TransportT>
where
    ProviderT: Provider<TransportT>,
    TransportT: Transport + Clone,
{
    async fn request_accounts(&self) -> anyhow::Result<Vec<Address>> {
        let provider = self.get_provider().await?;
        match provider
            .raw_request::<_, Vec<Address>>("eth_requestAccounts".into(), ())
            .await
        {
            Ok(accounts) => Ok(accounts),
            Err(e) => {
                // Plain nodes do not implement the wallet permission request,
                // their accounts are readable directly.
                warn!("eth_requestAccounts failed, falling back to eth_accounts: {e}");
                let accounts = provider
                    .get_accounts()
                    .await
                    .context("couldn't list wallet accounts")?;
                debug!(count = accounts.len(), "accounts listed");
                Ok(accounts)
            }
        }
    }

    async fn chain_id(&self) -> anyhow::Result<u64> {
        self.get_provider()
            .await?
            .get_chain_id()
            .await
            .context("couldn't retrieve the chain id")
    }

    async fn balance(&self, address: Address) -> anyhow::Result<U256> {
        self.get_provider()
            .await?
            .get_balance(address)
            .await
            .with_context(|| format!("couldn't retrieve the balance of {address}"))
    }
}
