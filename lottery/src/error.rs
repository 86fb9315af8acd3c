use alloy::primitives::TxHash;
use thiserror::Error;

/// Everything that can go wrong while connecting, reading the raffle or
/// entering it.
///
/// None of these are fatal: the session reports them to its
/// [`NotificationSink`](crate::notify::NotificationSink) and stays usable.
#[derive(Error, Debug)]
pub enum EntranceError {
    /// No wallet provider is configured, reachable or unlocked.
    #[error(
        "no wallet provider available ({reason}); install a wallet such as MetaMask \
         or point the client at a node with unlocked accounts"
    )]
    ProviderUnavailable { reason: String },

    /// The active network has no raffle deployment in the address book.
    #[error("no raffle contract deployed on chain {chain_id}")]
    UnknownNetwork { chain_id: u64 },

    /// One of the view calls failed; the previous snapshot is kept.
    #[error("failed to read the raffle state: {0:#}")]
    ReadFailure(#[source] anyhow::Error),

    /// The entry was refused by the user, the node or the contract.
    #[error("raffle entry rejected: {source:#}")]
    SubmissionRejected {
        tx_hash: Option<TxHash>,
        #[source]
        source: anyhow::Error,
    },

    /// An entry from this dispatcher is still waiting for confirmation.
    #[error("an entry is already in flight, wait for it to resolve")]
    AlreadyInFlight,

    /// The session was torn down and the result was discarded.
    #[error("the session has been torn down")]
    TornDown,
}

impl EntranceError {
    pub(crate) fn unavailable(reason: impl Into<String>) -> Self {
        Self::ProviderUnavailable {
            reason: reason.into(),
        }
    }

    pub(crate) fn rejected(tx_hash: Option<TxHash>, source: anyhow::Error) -> Self {
        Self::SubmissionRejected { tx_hash, source }
    }
}
