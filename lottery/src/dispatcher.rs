use std::pin::Pin;
use std::sync::Arc;

use alloy::primitives::{Address, TxHash, U256};
use anyhow::anyhow;
use async_stream::stream;
use futures::future::{AbortHandle, Abortable};
use futures::Stream;
use parking_lot::Mutex;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::error::EntranceError;
use crate::provider::{EntryReceipt, RaffleContract};

/// Confirmations an entry needs before it counts as done.
pub const DEFAULT_CONFIRMATIONS: u64 = 1;

/// What happened to one entry, in order: `Submitted` then exactly one of
/// `Confirmed` or `Failed` (a rejection before submission skips
/// `Submitted`).
#[derive(Debug)]
pub enum TransactionLifecycleEvent {
    Submitted { tx_hash: TxHash },
    Confirmed(EntryReceipt),
    Failed(EntranceError),
}

pub type LifecycleStream = Pin<Box<dyn Stream<Item = TransactionLifecycleEvent> + Send>>;

/// A payment-bearing `enterRaffle` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Entry {
    pub raffle: Address,
    pub from: Address,
    /// In wei.
    pub amount: U256,
}

/// Submits raffle entries, one at a time.
pub struct ActionDispatcher {
    confirmations: u64,
    in_flight: Arc<Semaphore>,
    /// Cancels the confirmation wait of the current entry.
    pending: Mutex<Option<AbortHandle>>,
}

impl Default for ActionDispatcher {
    fn default() -> Self {
        Self::new(DEFAULT_CONFIRMATIONS)
    }
}

impl ActionDispatcher {
    pub fn new(confirmations: u64) -> Self {
        Self {
            confirmations: confirmations.max(1),
            in_flight: Arc::new(Semaphore::new(1)),
            pending: Mutex::new(None),
        }
    }

    /// Starts an entry and returns its lifecycle.
    ///
    /// Fails immediately with [`EntranceError::AlreadyInFlight`] while a
    /// previous lifecycle stream is alive, and with
    /// [`EntranceError::SubmissionRejected`] for a zero amount. The contract
    /// minimum is not checked here: the contract rejects the call and the
    /// stream reports `Failed`. Nothing is ever resubmitted automatically.
    pub fn submit_entry<C>(
        &self,
        contract: Arc<C>,
        entry: Entry,
    ) -> Result<LifecycleStream, EntranceError>
    where
        C: RaffleContract + Send + Sync + 'static,
    {
        if entry.amount.is_zero() {
            return Err(EntranceError::rejected(
                None,
                anyhow!("entry amount must be positive"),
            ));
        }
        let permit = self
            .in_flight
            .clone()
            .try_acquire_owned()
            .map_err(|_| EntranceError::AlreadyInFlight)?;

        let (abort_handle, abort_registration) = AbortHandle::new_pair();
        *self.pending.lock() = Some(abort_handle);
        let confirmations = self.confirmations;

        Ok(Box::pin(stream! {
            // Released right before the final event, so a consumer holding
            // the outcome already sees the dispatcher idle. Dropping the
            // stream early releases it too.
            let permit = permit;
            let Entry { raffle, from, amount } = entry;

            match contract.enter_raffle(raffle, from, amount).await {
                Err(source) => {
                    warn!(%from, %amount, "entry rejected before submission: {source:#}");
                    drop(permit);
                    yield TransactionLifecycleEvent::Failed(EntranceError::rejected(None, source));
                }
                Ok(tx_hash) => {
                    info!(%tx_hash, %from, %amount, "entry submitted");
                    yield TransactionLifecycleEvent::Submitted { tx_hash };

                    let wait = Abortable::new(
                        contract.wait_for_receipt(tx_hash, confirmations),
                        abort_registration,
                    );
                    match wait.await {
                        Ok(Ok(receipt)) if receipt.success => {
                            info!(
                                %tx_hash,
                                confirmations = receipt.confirmations,
                                "entry confirmed"
                            );
                            drop(permit);
                            yield TransactionLifecycleEvent::Confirmed(receipt);
                        }
                        Ok(Ok(receipt)) => {
                            warn!(%tx_hash, "entry reverted");
                            drop(permit);
                            yield TransactionLifecycleEvent::Failed(EntranceError::rejected(
                                Some(tx_hash),
                                anyhow!(
                                    "transaction {tx_hash} reverted in block {:?}",
                                    receipt.block_number
                                ),
                            ));
                        }
                        Ok(Err(source)) => {
                            warn!(%tx_hash, "confirmation failed: {source:#}");
                            drop(permit);
                            yield TransactionLifecycleEvent::Failed(EntranceError::rejected(
                                Some(tx_hash),
                                source,
                            ));
                        }
                        Err(_aborted) => {
                            debug!(%tx_hash, "confirmation wait cancelled");
                            drop(permit);
                        }
                    }
                }
            }
        }))
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.available_permits() == 0
    }

    /// Cancels the pending confirmation wait, if any. Its lifecycle stream
    /// ends without a final event.
    pub fn cancel_pending(&self) {
        if let Some(handle) = self.pending.lock().take() {
            handle.abort();
        }
    }
}
