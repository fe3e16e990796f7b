//! solwallet - wallet-driven Solana transfers and address history
//!
//! The library holds the whole pipeline; the binary only wires it to a
//! config file and the terminal.
//!
//! - [`tx_builder`]: assemble an unsigned transaction, then sign, broadcast
//!   and confirm it through a [`wallet::WalletAgent`]
//! - [`history`]: list and resolve the transactions of an address
//! - [`rpc`]: the [`rpc::NetworkClient`] seam and its JSON-RPC implementation
//! - [`transfer`]: the SOL transfer flow built on top of both

pub mod config;
pub mod history;
pub mod metrics;
pub mod observability;
pub mod rpc;
pub mod transfer;
pub mod tx_builder;
pub mod types;
pub mod wallet;

#[cfg(any(test, feature = "test_utils"))]
pub mod test_utils;

// Re-export commonly used types
pub use solana_sdk::{pubkey::Pubkey, signature::Signature};
pub use tx_builder::{FlowError, FlowResult};
