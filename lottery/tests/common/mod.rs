#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use alloy::primitives::{Address, TxHash, U256};
use anyhow::{anyhow, bail};
use lottery::addresses::NetworkAddresses;
use lottery::connection::ConnectionState;
use lottery::fetcher::ViewState;
use lottery::notify::{Notification, NotificationSink, ViewRenderer};
use lottery::provider::{EntryReceipt, RaffleContract, WalletProvider};
use parking_lot::Mutex;
use tokio::sync::Semaphore;

pub const HARDHAT: u64 = 31337;
pub const GOERLI: u64 = 5;
pub const MAINNET: u64 = 1;

pub const HARDHAT_RAFFLE: Address = Address::with_last_byte(0xaa);
pub const GOERLI_RAFFLE: Address = Address::with_last_byte(0xbb);
pub const PLAYER: Address = Address::with_last_byte(0x01);

pub fn fee() -> U256 {
    lottery_common::DEFAULT_ENTRANCE_FEE
}

/// Deployments on hardhat and goerli, nothing on mainnet.
pub fn addresses() -> NetworkAddresses {
    [(HARDHAT, HARDHAT_RAFFLE), (GOERLI, GOERLI_RAFFLE)]
        .into_iter()
        .collect()
}

#[derive(Debug, Default)]
struct Deployment {
    fee: U256,
    players: Vec<Address>,
    balance: U256,
}

/// A wallet pointed at an in-memory chain running the raffle.
///
/// Entries are mined only when `confirm` hands out a permit, so tests decide
/// when a submitted entry resolves.
pub struct FakeChain {
    chain_id: AtomicU64,
    accounts: Vec<Address>,
    deployments: Mutex<HashMap<Address, Deployment>>,
    pending: Mutex<HashMap<TxHash, (Address, Address, U256)>>,
    submissions: AtomicU64,
    pub confirm: Semaphore,
    pub account_requests: AtomicUsize,
    pub reads: AtomicUsize,
    fail_reads: Mutex<bool>,
}

impl FakeChain {
    pub fn new() -> Self {
        let deployments = [
            (
                HARDHAT_RAFFLE,
                Deployment {
                    fee: fee(),
                    ..Default::default()
                },
            ),
            (
                GOERLI_RAFFLE,
                Deployment {
                    fee: fee() * U256::from(10),
                    ..Default::default()
                },
            ),
        ];
        Self {
            chain_id: AtomicU64::new(HARDHAT),
            accounts: vec![PLAYER],
            deployments: Mutex::new(deployments.into_iter().collect()),
            pending: Mutex::new(HashMap::new()),
            submissions: AtomicU64::new(0),
            confirm: Semaphore::new(0),
            account_requests: AtomicUsize::new(0),
            reads: AtomicUsize::new(0),
            fail_reads: Mutex::new(false),
        }
    }

    /// Mines every entry as soon as it is submitted.
    pub fn auto_confirming() -> Self {
        let chain = Self::new();
        chain.confirm.add_permits(1_000);
        chain
    }

    pub fn switch_to(&self, chain_id: u64) {
        self.chain_id.store(chain_id, Ordering::SeqCst);
    }

    pub fn fail_reads(&self, fail: bool) {
        *self.fail_reads.lock() = fail;
    }

    pub fn players(&self, raffle: Address) -> usize {
        self.deployments
            .lock()
            .get(&raffle)
            .map_or(0, |it| it.players.len())
    }

    fn read<T>(&self, raffle: Address, f: impl FnOnce(&Deployment) -> T) -> anyhow::Result<T> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if *self.fail_reads.lock() {
            bail!("connection reset by peer");
        }
        self.deployments
            .lock()
            .get(&raffle)
            .map(f)
            .ok_or_else(|| anyhow!("no contract code at {raffle}"))
    }
}

impl WalletProvider for FakeChain {
    async fn request_accounts(&self) -> anyhow::Result<Vec<Address>> {
        self.account_requests.fetch_add(1, Ordering::SeqCst);
        Ok(self.accounts.clone())
    }

    async fn chain_id(&self) -> anyhow::Result<u64> {
        Ok(self.chain_id.load(Ordering::SeqCst))
    }

    async fn balance(&self, address: Address) -> anyhow::Result<U256> {
        self.read(address, |it| it.balance)
    }
}

impl RaffleContract for FakeChain {
    async fn entrance_fee(&self, raffle: Address) -> anyhow::Result<U256> {
        self.read(raffle, |it| it.fee)
    }

    async fn number_of_players(&self, raffle: Address) -> anyhow::Result<U256> {
        self.read(raffle, |it| U256::from(it.players.len()))
    }

    async fn recent_winner(&self, raffle: Address) -> anyhow::Result<Address> {
        self.read(raffle, |_| Address::ZERO)
    }

    async fn enter_raffle(
        &self,
        raffle: Address,
        from: Address,
        value: U256,
    ) -> anyhow::Result<TxHash> {
        let fee = self.read(raffle, |it| it.fee)?;
        if value < fee {
            bail!("execution reverted: Raffle__PayMoreToEnterRaffle");
        }
        let n = self.submissions.fetch_add(1, Ordering::SeqCst) + 1;
        let tx_hash = TxHash::left_padding_from(&n.to_be_bytes());
        self.pending.lock().insert(tx_hash, (raffle, from, value));
        Ok(tx_hash)
    }

    async fn wait_for_receipt(
        &self,
        tx_hash: TxHash,
        confirmations: u64,
    ) -> anyhow::Result<EntryReceipt> {
        self.confirm.acquire().await?.forget();
        let (raffle, from, value) = self
            .pending
            .lock()
            .remove(&tx_hash)
            .ok_or_else(|| anyhow!("unknown transaction {tx_hash}"))?;
        let mut deployments = self.deployments.lock();
        let deployment = deployments.entry(raffle).or_default();
        deployment.players.push(from);
        deployment.balance += value;
        Ok(EntryReceipt {
            tx_hash,
            block_number: Some(self.submissions.load(Ordering::SeqCst)),
            confirmations,
            success: true,
        })
    }
}

/// Everything the session showed the user, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Shown {
    Notified(Notification),
    Rendered(ViewState),
    Connection(ConnectionState),
    NoContract(u64),
    Busy(bool),
}

#[derive(Default)]
pub struct Screen {
    shown: Mutex<Vec<Shown>>,
}

impl Screen {
    pub fn shown(&self) -> Vec<Shown> {
        self.shown.lock().clone()
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.shown()
            .into_iter()
            .filter_map(|it| match it {
                Shown::Notified(notification) => Some(notification),
                _ => None,
            })
            .collect()
    }

    pub fn renders(&self) -> Vec<ViewState> {
        self.shown()
            .into_iter()
            .filter_map(|it| match it {
                Shown::Rendered(view) => Some(view),
                _ => None,
            })
            .collect()
    }

    pub fn position(&self, predicate: impl Fn(&Shown) -> bool) -> Option<usize> {
        self.shown().iter().position(predicate)
    }

    fn push(&self, shown: Shown) {
        self.shown.lock().push(shown);
    }
}

impl NotificationSink for Screen {
    fn notify(&self, notification: &Notification) {
        self.push(Shown::Notified(notification.clone()));
    }
}

impl ViewRenderer for Screen {
    fn render(&self, view: &ViewState) {
        self.push(Shown::Rendered(*view));
    }

    fn render_connection(&self, connection: &ConnectionState) {
        self.push(Shown::Connection(*connection));
    }

    fn render_no_contract(&self, chain_id: u64) {
        self.push(Shown::NoContract(chain_id));
    }

    fn render_busy(&self, busy: bool) {
        self.push(Shown::Busy(busy));
    }
}
