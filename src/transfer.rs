//! Wallet-driven SOL transfers
//!
//! Ties the wallet agent, the assembler and the submitter together: resolve
//! the payer from the connected wallet, look at both accounts, build the
//! system transfer and run it through the pipeline.

use std::str::FromStr;
use std::sync::Arc;

use solana_sdk::{commitment_config::CommitmentConfig, pubkey::Pubkey};
use tracing::{debug, info, warn};

use crate::rpc::NetworkClient;
use crate::tx_builder::{
    format_sol, transfer_instruction, FlowError, FlowResult, TransactionAssembler,
    TransactionSubmitter,
};
use crate::types::{AccountSnapshot, TransferReceipt};
use crate::wallet::{WalletAgent, WalletError};

pub struct TransferFlow {
    network: Arc<dyn NetworkClient>,
    wallet: Arc<dyn WalletAgent>,
    assembler: TransactionAssembler,
    submitter: TransactionSubmitter,
}

impl TransferFlow {
    pub fn new(
        network: Arc<dyn NetworkClient>,
        wallet: Arc<dyn WalletAgent>,
        commitment: CommitmentConfig,
    ) -> Self {
        Self {
            assembler: TransactionAssembler::new(Arc::clone(&network)),
            submitter: TransactionSubmitter::new(Arc::clone(&network), commitment),
            network,
            wallet,
        }
    }

    /// Connect the wallet agent and return its identity
    pub async fn connect(&self) -> FlowResult<Pubkey> {
        self.wallet.connect().await.map_err(|err| match err {
            WalletError::Rejected(reason) => {
                FlowError::WalletUnavailable(format!("connection declined: {reason}"))
            }
            other => FlowError::WalletUnavailable(other.to_string()),
        })
    }

    /// Account summary, `None` for an account the network does not know
    pub async fn inspect_account(&self, pubkey: &Pubkey) -> FlowResult<Option<AccountSnapshot>> {
        let account = self
            .network
            .account_info(pubkey)
            .await
            .map_err(|e| FlowError::network_unavailable(e.to_string()))?;
        Ok(account.as_ref().map(AccountSnapshot::from))
    }

    /// Transfer to a base58-encoded destination
    pub async fn send(&self, destination: &str, lamports: u64) -> FlowResult<TransferReceipt> {
        let to = Pubkey::from_str(destination.trim())
            .map_err(|e| FlowError::invalid_input(format!("destination '{destination}': {e}")))?;
        self.send_to(to, lamports).await
    }

    pub async fn send_to(&self, to: Pubkey, lamports: u64) -> FlowResult<TransferReceipt> {
        let from = self
            .wallet
            .identity()
            .ok_or_else(|| FlowError::invalid_input("wallet is not connected"))?;

        let instruction = transfer_instruction(&from, &to, lamports)?;

        self.log_account("payer", &from).await;
        self.log_account("receiver", &to).await;

        let envelope = self.assembler.assemble(instruction, Some(from)).await?;

        info!(
            from = %from,
            to = %to,
            lamports,
            sol = %format_sol(lamports),
            "Submitting transfer"
        );
        let signature = self.submitter.submit(self.wallet.as_ref(), envelope).await?;

        Ok(TransferReceipt {
            signature,
            from,
            to,
            lamports,
        })
    }

    /// Informational lookup; failures never block the transfer
    async fn log_account(&self, role: &'static str, pubkey: &Pubkey) {
        match self.inspect_account(pubkey).await {
            Ok(Some(snapshot)) => debug!(
                role,
                %pubkey,
                lamports = snapshot.lamports,
                data_len = snapshot.data_len,
                "Account state"
            ),
            Ok(None) => debug!(role, %pubkey, "Account does not exist yet"),
            Err(err) => warn!(role, %pubkey, error = %err, "Account lookup failed"),
        }
    }
}
