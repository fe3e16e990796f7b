//! Wallet agents
//!
//! A [`WalletAgent`] owns the user's identity and signs on their behalf.
//! [`KeypairWallet`] is the local implementation: a keypair file plus an
//! approval hook standing in for the user's confirmation prompt.

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use parking_lot::RwLock;
use solana_sdk::{
    pubkey::Pubkey,
    signature::{Keypair, Signer},
    transaction::Transaction,
};
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{debug, info};

/// Errors reported by a wallet agent
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum WalletError {
    /// The user or agent declined the request
    #[error("Request rejected: {0}")]
    Rejected(String),

    #[error("Wallet not connected")]
    NotConnected,

    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Signing error: {0}")]
    Signing(String),
}

/// Lifecycle notifications for subscribers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalletEvent {
    Connected(Pubkey),
    Disconnected,
    AccountChanged(Pubkey),
}

/// Capability set consumed from a wallet
#[async_trait]
pub trait WalletAgent: Send + Sync {
    /// Current identity; `None` until connected
    fn identity(&self) -> Option<Pubkey>;

    /// Establish the connection and return the identity
    async fn connect(&self) -> Result<Pubkey, WalletError>;

    /// Sign `transaction`, returning the signed copy
    async fn sign_transaction(&self, transaction: Transaction) -> Result<Transaction, WalletError>;

    /// Subscribe to lifecycle events, if the agent publishes any
    fn subscribe(&self) -> Option<broadcast::Receiver<WalletEvent>> {
        None
    }
}

/// Decides whether a transaction may be signed
pub type Approver = Arc<dyn Fn(&Transaction) -> bool + Send + Sync>;

const EVENT_CAPACITY: usize = 16;

/// Keypair-backed wallet agent
pub struct KeypairWallet {
    keypair: Arc<Keypair>,
    connected: RwLock<Option<Pubkey>>,
    approver: Approver,
    events: broadcast::Sender<WalletEvent>,
}

impl KeypairWallet {
    /// Load a keypair from a file holding either 64 raw bytes or the solana
    /// CLI JSON array format
    pub fn from_file(path: &str) -> Result<Self> {
        let path = expand_home(path);
        let keypair_bytes = std::fs::read(&path)
            .with_context(|| format!("Failed to read keypair file: {}", path))?;

        let bytes = if keypair_bytes.len() == 64 {
            keypair_bytes
        } else {
            serde_json::from_slice::<Vec<u8>>(&keypair_bytes)
                .context("Failed to parse keypair JSON")?
        };

        Ok(Self::from_keypair(keypair_from_bytes(&bytes)?))
    }

    pub fn from_keypair(keypair: Keypair) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            keypair: Arc::new(keypair),
            connected: RwLock::new(None),
            approver: Arc::new(|_: &Transaction| true),
            events,
        }
    }

    /// Replace the approval hook
    pub fn with_approver(mut self, approver: Approver) -> Self {
        self.approver = approver;
        self
    }

    /// Public key of the backing keypair, connected or not
    pub fn pubkey(&self) -> Pubkey {
        self.keypair.pubkey()
    }

    pub fn disconnect(&self) {
        if self.connected.write().take().is_some() {
            let _ = self.events.send(WalletEvent::Disconnected);
            info!("Wallet disconnected");
        }
    }
}

#[async_trait]
impl WalletAgent for KeypairWallet {
    fn identity(&self) -> Option<Pubkey> {
        *self.connected.read()
    }

    async fn connect(&self) -> Result<Pubkey, WalletError> {
        let pubkey = self.keypair.pubkey();
        let previous = self.connected.write().replace(pubkey);

        if previous != Some(pubkey) {
            let _ = self.events.send(WalletEvent::Connected(pubkey));
            info!(identity = %pubkey, "Wallet connected");
        }
        Ok(pubkey)
    }

    async fn sign_transaction(&self, mut transaction: Transaction) -> Result<Transaction, WalletError> {
        let identity = self.identity().ok_or(WalletError::NotConnected)?;

        let approver = Arc::clone(&self.approver);
        let candidate = transaction.clone();
        let approved = tokio::task::spawn_blocking(move || approver(&candidate))
            .await
            .map_err(|e| WalletError::Signing(format!("approval task failed: {e}")))?;
        if !approved {
            return Err(WalletError::Rejected("user declined to sign".to_string()));
        }

        let blockhash = transaction.message.recent_blockhash;
        transaction
            .try_sign(&[self.keypair.as_ref()], blockhash)
            .map_err(|e| WalletError::Signing(e.to_string()))?;

        debug!(identity = %identity, "Transaction signed");
        Ok(transaction)
    }

    fn subscribe(&self) -> Option<broadcast::Receiver<WalletEvent>> {
        Some(self.events.subscribe())
    }
}

fn keypair_from_bytes(bytes: &[u8]) -> Result<Keypair> {
    if bytes.len() != 64 {
        anyhow::bail!("Invalid keypair length: expected 64 bytes, got {}", bytes.len());
    }
    if bytes.iter().all(|&b| b == 0) {
        anyhow::bail!("Invalid keypair: all-zero key rejected");
    }
    Keypair::try_from(bytes).context("Invalid keypair bytes")
}

fn expand_home(path: &str) -> String {
    match (path.strip_prefix("~/"), std::env::var("HOME")) {
        (Some(rest), Ok(home)) => format!("{}/{}", home.trim_end_matches('/'), rest),
        _ => path.to_string(),
    }
}
