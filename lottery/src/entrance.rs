//! The raffle entrance session: connection, state refresh and entries wired
//! together for one user.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use alloy::primitives::U256;
use futures::StreamExt as _;
use tracing::{debug, info};

use crate::addresses::NetworkAddresses;
use crate::connection::{ConnectionGate, ConnectionState};
use crate::dispatcher::{ActionDispatcher, Entry, TransactionLifecycleEvent, DEFAULT_CONFIRMATIONS};
use crate::error::EntranceError;
use crate::fetcher::{ContractStateFetcher, ViewState};
use crate::notify::{Notification, NotificationSink, ViewRenderer};
use crate::provider::{EntryReceipt, RaffleContract, WalletProvider};

/// Everything a session needs, built by whoever hosts it.
pub struct SessionContext<P> {
    /// `None` when no wallet provider is available.
    pub provider: Option<Arc<P>>,
    pub addresses: Arc<NetworkAddresses>,
    pub sink: Arc<dyn NotificationSink>,
    pub renderer: Arc<dyn ViewRenderer>,
    pub confirmations: u64,
}

impl<P> SessionContext<P> {
    pub fn new(
        provider: Option<Arc<P>>,
        addresses: NetworkAddresses,
        sink: Arc<dyn NotificationSink>,
        renderer: Arc<dyn ViewRenderer>,
    ) -> Self {
        Self {
            provider,
            addresses: Arc::new(addresses),
            sink,
            renderer,
            confirmations: DEFAULT_CONFIRMATIONS,
        }
    }

    pub fn with_confirmations(mut self, confirmations: u64) -> Self {
        self.confirmations = confirmations;
        self
    }
}

/// One user's view of the raffle.
///
/// Every error is reported to the [`NotificationSink`] before being
/// returned, and none of them leave the session unusable. After
/// [`teardown`](Self::teardown) late results are dropped without rendering
/// or notifying.
pub struct LotteryEntrance<P> {
    provider: Option<Arc<P>>,
    sink: Arc<dyn NotificationSink>,
    renderer: Arc<dyn ViewRenderer>,
    gate: ConnectionGate,
    fetcher: ContractStateFetcher,
    dispatcher: ActionDispatcher,
    torn_down: AtomicBool,
}

impl<P> LotteryEntrance<P>
where
    P: WalletProvider + RaffleContract + Send + Sync + 'static,
{
    pub fn new(context: SessionContext<P>) -> Self {
        let SessionContext {
            provider,
            addresses,
            sink,
            renderer,
            confirmations,
        } = context;
        Self {
            provider,
            sink,
            renderer,
            gate: ConnectionGate::new(),
            fetcher: ContractStateFetcher::new(addresses),
            dispatcher: ActionDispatcher::new(confirmations),
            torn_down: AtomicBool::new(false),
        }
    }

    /// Connects and loads the raffle state.
    pub async fn start(&self) -> Result<ViewState, EntranceError> {
        self.connect().await?;
        self.refresh().await
    }

    pub async fn connect(&self) -> Result<ConnectionState, EntranceError> {
        self.ensure_live()?;
        let connection = self
            .gate
            .connect(self.provider.as_deref())
            .await
            .map_err(|e| self.report(e))?;
        if !self.is_torn_down() {
            self.renderer.render_connection(&connection);
        }
        Ok(connection)
    }

    /// Re-reads the raffle and renders the new snapshot. On failure the
    /// previous snapshot stays on screen.
    pub async fn refresh(&self) -> Result<ViewState, EntranceError> {
        self.ensure_live()?;
        let provider = self.provider().map_err(|e| self.report(e))?;
        let connection = self.gate.current();

        match self.fetcher.refresh(&*provider, &connection).await {
            Ok(_) if self.is_torn_down() => Err(EntranceError::TornDown),
            Ok(_) => {
                // Render what is published, a newer refresh may have won.
                let view = self.fetcher.current();
                self.renderer.render(&view);
                Ok(view)
            }
            Err(e) => {
                if let EntranceError::UnknownNetwork { chain_id } = &e {
                    if !self.is_torn_down() {
                        self.renderer.render_no_contract(*chain_id);
                    }
                }
                Err(self.report(e))
            }
        }
    }

    /// Enters the raffle paying the current entrance fee.
    pub async fn enter(&self) -> Result<EntryReceipt, EntranceError> {
        let fee = self.fetcher.current().entrance_fee;
        self.enter_with(fee).await
    }

    /// Enters the raffle paying `amount` wei, then refreshes once the entry
    /// is confirmed.
    pub async fn enter_with(&self, amount: U256) -> Result<EntryReceipt, EntranceError> {
        self.ensure_live()?;
        let provider = self.provider().map_err(|e| self.report(e))?;
        let from = self
            .gate
            .current()
            .account()
            .ok_or_else(|| self.report(EntranceError::unavailable("wallet is not connected")))?;
        let chain_id = provider
            .chain_id()
            .await
            .map_err(|e| self.report(EntranceError::ReadFailure(e)))?;
        let raffle = self.fetcher.resolve(chain_id).map_err(|e| self.report(e))?;

        let mut lifecycle = self
            .dispatcher
            .submit_entry(provider, Entry { raffle, from, amount })
            .map_err(|e| self.report(e))?;
        self.renderer.render_busy(true);

        let mut outcome = Err(EntranceError::TornDown);
        while let Some(event) = lifecycle.next().await {
            if self.is_torn_down() {
                break;
            }
            self.sink.notify(&Notification::from(&event));
            match event {
                TransactionLifecycleEvent::Submitted { tx_hash } => {
                    debug!(%tx_hash, "waiting for confirmation")
                }
                TransactionLifecycleEvent::Confirmed(receipt) => outcome = Ok(receipt),
                TransactionLifecycleEvent::Failed(e) => outcome = Err(e),
            }
        }
        drop(lifecycle);

        if self.is_torn_down() {
            return Err(EntranceError::TornDown);
        }
        self.renderer.render_busy(false);

        let receipt = outcome?;
        // Any refresh error has already been reported, the entry itself
        // went through.
        let _ = self.refresh().await;
        Ok(receipt)
    }

    /// Handles the wallet switching to another network mid-session: the
    /// connection and the snapshot belong to the old network, so both are
    /// dropped and rebuilt against the new one.
    pub async fn network_changed(&self, chain_id: u64) -> Result<ViewState, EntranceError> {
        self.ensure_live()?;
        info!(chain_id, "network changed, reconnecting");
        self.gate.reset();
        self.fetcher.reset();
        self.renderer.render(&self.fetcher.current());
        self.start().await
    }

    /// Ether held by the raffle.
    pub async fn contract_balance(&self) -> Result<U256, EntranceError> {
        self.ensure_live()?;
        let provider = self.provider().map_err(|e| self.report(e))?;
        self.fetcher
            .contract_balance(&*provider)
            .await
            .map_err(|e| self.report(e))
    }

    pub fn view(&self) -> ViewState {
        self.fetcher.current()
    }

    pub fn connection(&self) -> ConnectionState {
        self.gate.current()
    }

    pub fn is_entry_in_flight(&self) -> bool {
        self.dispatcher.is_in_flight()
    }

    /// Stops the session: a pending confirmation wait is cancelled and
    /// every result still in flight is discarded.
    pub fn teardown(&self) {
        if !self.torn_down.swap(true, Ordering::SeqCst) {
            debug!("tearing down lottery entrance");
            self.dispatcher.cancel_pending();
        }
    }
}

impl<P> LotteryEntrance<P> {
    fn is_torn_down(&self) -> bool {
        self.torn_down.load(Ordering::SeqCst)
    }

    fn ensure_live(&self) -> Result<(), EntranceError> {
        if self.is_torn_down() {
            Err(EntranceError::TornDown)
        } else {
            Ok(())
        }
    }

    fn provider(&self) -> Result<Arc<P>, EntranceError> {
        self.provider
            .clone()
            .ok_or_else(|| EntranceError::unavailable("no wallet detected"))
    }

    /// Hands `err` to the sink unless the session is gone, and gives it back.
    fn report(&self, err: EntranceError) -> EntranceError {
        if !self.is_torn_down() {
            self.sink.notify(&Notification::from(&err));
        }
        err
    }
}

impl<P> Drop for LotteryEntrance<P> {
    fn drop(&mut self) {
        self.torn_down.store(true, Ordering::SeqCst);
        self.dispatcher.cancel_pending();
    }
}
