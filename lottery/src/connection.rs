use alloy::primitives::Address;
use anyhow::Context as _;
use tokio::sync::{watch, Mutex};
use tracing::{debug, info};

use crate::error::EntranceError;
use crate::provider::WalletProvider;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connected(Address),
}

impl ConnectionState {
    pub fn account(&self) -> Option<Address> {
        match self {
            ConnectionState::Connected(account) => Some(*account),
            ConnectionState::Disconnected => None,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.account().is_some()
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            ConnectionState::Disconnected => f.write_str("Connect"),
            ConnectionState::Connected(account) => write!(f, "Connected to {account}"),
        }
    }
}

/// Owns the session's [`ConnectionState`]; nothing else writes it.
pub struct ConnectionGate {
    state: watch::Sender<ConnectionState>,
    // Serializes account requests so concurrent callers share one prompt.
    connecting: Mutex<()>,
}

impl Default for ConnectionGate {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionGate {
    pub fn new() -> Self {
        Self {
            state: watch::Sender::new(ConnectionState::Disconnected),
            connecting: Mutex::new(()),
        }
    }

    /// Connects to `wallet`, or returns the cached state when already
    /// connected.
    pub async fn connect<W>(&self, wallet: Option<&W>) -> Result<ConnectionState, EntranceError>
    where
        W: WalletProvider,
    {
        let _connecting = self.connecting.lock().await;
        let current = self.current();
        if current.is_connected() {
            debug!("already connected");
            return Ok(current);
        }

        let wallet = wallet.ok_or_else(|| EntranceError::unavailable("no wallet detected"))?;
        let accounts = wallet
            .request_accounts()
            .await
            .context("wallet refused the account request")
            .map_err(|e| EntranceError::unavailable(format!("{e:#}")))?;
        let account = *accounts
            .first()
            .ok_or_else(|| EntranceError::unavailable("the wallet exposes no accounts"))?;

        info!(%account, "Connected!");
        let connected = ConnectionState::Connected(account);
        self.state.send_replace(connected);
        Ok(connected)
    }

    pub fn current(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// The connection indicator.
    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    /// Forgets the connection so the next [`connect`](Self::connect) asks the
    /// wallet again.
    pub fn reset(&self) {
        self.state.send_replace(ConnectionState::Disconnected);
    }
}
