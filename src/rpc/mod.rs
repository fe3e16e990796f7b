//! Network access
//!
//! [`NetworkClient`] is the narrow surface the transfer and history flows
//! consume. [`RpcNetworkClient`] backs it with the solana JSON-RPC client;
//! tests substitute a recording fake.

use async_trait::async_trait;
use solana_sdk::{
    account::Account, commitment_config::CommitmentConfig, hash::Hash, pubkey::Pubkey,
    signature::Signature,
};
use solana_transaction_status::EncodedConfirmedTransactionWithStatusMeta;

pub mod client;
pub mod errors;

pub use client::RpcNetworkClient;
pub use errors::{NetworkError, NetworkResult};

/// Terminal state of a confirmation poll
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmationOutcome {
    /// Reached the requested commitment without error
    Confirmed,
    /// Landed on-chain but execution failed
    Failed(String),
    /// The polling bound elapsed without a verdict
    TimedOut,
}

/// Capabilities consumed from a blockchain node
#[async_trait]
pub trait NetworkClient: Send + Sync {
    /// Look up an account; `None` when the account does not exist
    async fn account_info(&self, pubkey: &Pubkey) -> NetworkResult<Option<Account>>;

    /// All known signatures for an address, most recent first
    async fn signatures_for_address(&self, address: &Pubkey) -> NetworkResult<Vec<Signature>>;

    /// Resolve a signature; `None` when the node has no record of it
    async fn resolve_transaction(
        &self,
        signature: &Signature,
    ) -> NetworkResult<Option<EncodedConfirmedTransactionWithStatusMeta>>;

    /// Fetch a fresh blockhash
    async fn latest_blockhash(&self) -> NetworkResult<Hash>;

    /// Submit a serialized, signed transaction
    async fn submit_raw(&self, wire: &[u8]) -> NetworkResult<Signature>;

    /// Wait for `signature` to reach `commitment`, bounded by the client's own
    /// polling limit
    async fn await_confirmation(
        &self,
        signature: &Signature,
        commitment: CommitmentConfig,
    ) -> NetworkResult<ConfirmationOutcome>;
}
