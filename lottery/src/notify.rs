use tracing::{error, info, warn};

use crate::connection::ConnectionState;
use crate::dispatcher::TransactionLifecycleEvent;
use crate::error::EntranceError;
use crate::fetcher::ViewState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Info,
    Warning,
    Error,
}

/// A user-facing message, the equivalent of a toast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
}

impl Notification {
    pub fn new(
        kind: NotificationKind,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            title: title.into(),
            message: message.into(),
        }
    }
}

impl From<&TransactionLifecycleEvent> for Notification {
    fn from(event: &TransactionLifecycleEvent) -> Self {
        match event {
            TransactionLifecycleEvent::Submitted { tx_hash } => Notification::new(
                NotificationKind::Info,
                "txn submitted",
                format!("Waiting for {tx_hash} to be mined"),
            ),
            TransactionLifecycleEvent::Confirmed(_) => Notification::new(
                NotificationKind::Info,
                "txn notification",
                "Transaction Complete!",
            ),
            TransactionLifecycleEvent::Failed(err) => err.into(),
        }
    }
}

impl From<&EntranceError> for Notification {
    fn from(err: &EntranceError) -> Self {
        let (kind, title) = match err {
            EntranceError::ProviderUnavailable { .. } => (NotificationKind::Warning, "wallet"),
            EntranceError::UnknownNetwork { .. } => (NotificationKind::Warning, "network"),
            EntranceError::ReadFailure(_) => (NotificationKind::Error, "raffle state"),
            EntranceError::SubmissionRejected { .. } => (NotificationKind::Error, "txn failed"),
            EntranceError::AlreadyInFlight => (NotificationKind::Warning, "txn pending"),
            EntranceError::TornDown => (NotificationKind::Info, "session"),
        };
        Notification::new(kind, title, err.to_string())
    }
}

/// Surfaces notifications to the user.
pub trait NotificationSink: Send + Sync {
    fn notify(&self, notification: &Notification);
}

/// Renders the raffle view. Calls are synchronous and must not mutate what
/// they are given.
pub trait ViewRenderer: Send + Sync {
    fn render(&self, view: &ViewState);

    /// The connection indicator.
    fn render_connection(&self, _connection: &ConnectionState) {}

    /// The active network has no raffle deployment.
    fn render_no_contract(&self, _chain_id: u64) {}

    /// Whether an entry is being processed (the disabled button).
    fn render_busy(&self, _busy: bool) {}
}

/// Emits notifications as log events.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl NotificationSink for TracingSink {
    fn notify(&self, notification: &Notification) {
        let Notification {
            kind,
            title,
            message,
        } = notification;
        match kind {
            NotificationKind::Info => info!(%title, "{message}"),
            NotificationKind::Warning => warn!(%title, "{message}"),
            NotificationKind::Error => error!(%title, "{message}"),
        }
    }
}
