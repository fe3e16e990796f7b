//! Transfer transaction pipeline
//!
//! ## Architecture
//!
//! - **errors**: [`FlowError`] taxonomy shared by every public operation
//! - **instructions**: system transfer construction and sanity checks
//! - **envelope**: unsigned envelope and signed, serialize-once transaction
//! - **assembler**: instruction + fee payer + fresh blockhash
//! - **submitter**: sign → serialize → broadcast → confirm
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use solana_sdk::{commitment_config::CommitmentConfig, pubkey::Pubkey};
//! use solwallet::rpc::NetworkClient;
//! use solwallet::tx_builder::{transfer_instruction, FlowError, TransactionAssembler, TransactionSubmitter};
//! use solwallet::wallet::WalletAgent;
//!
//! # async fn example(network: Arc<dyn NetworkClient>, wallet: Arc<dyn WalletAgent>) -> Result<(), FlowError> {
//! let payer = wallet.connect().await?;
//! let ix = transfer_instruction(&payer, &Pubkey::new_unique(), 500_000_000)?;
//!
//! let envelope = TransactionAssembler::new(network.clone())
//!     .assemble(ix, wallet.identity())
//!     .await?;
//! let signature = TransactionSubmitter::new(network, CommitmentConfig::confirmed())
//!     .submit(wallet.as_ref(), envelope)
//!     .await?;
//! # let _ = signature;
//! # Ok(())
//! # }
//! ```

pub mod errors;
pub use errors::{FlowError, FlowResult};

mod assembler;
mod envelope;
mod instructions;
mod submitter;

pub use assembler::TransactionAssembler;
pub use envelope::{SignedTransaction, TransactionEnvelope};
pub use instructions::{format_sol, transfer_instruction, validate_instruction};
pub use submitter::TransactionSubmitter;
