//! Sign → serialize → broadcast → confirm
//!
//! Each call makes a single pass. A step starts only after the previous one
//! succeeded. Nothing is retried here: a rejected or unconfirmed transfer
//! must be reassembled by the caller with a fresh blockhash.

use std::sync::Arc;

use solana_sdk::{commitment_config::CommitmentConfig, signature::Signature};
use tracing::{debug, info, warn, Instrument};

use super::envelope::{SignedTransaction, TransactionEnvelope};
use super::errors::{FlowError, FlowResult};
use crate::metrics::{metrics, Timer};
use crate::observability::TraceContext;
use crate::rpc::{ConfirmationOutcome, NetworkClient};
use crate::wallet::WalletAgent;

pub struct TransactionSubmitter {
    network: Arc<dyn NetworkClient>,
    commitment: CommitmentConfig,
}

impl TransactionSubmitter {
    pub fn new(network: Arc<dyn NetworkClient>, commitment: CommitmentConfig) -> Self {
        Self {
            network,
            commitment,
        }
    }

    /// Sign `envelope` with `wallet`, broadcast it once and wait for the
    /// configured commitment.
    pub async fn submit(
        &self,
        wallet: &dyn WalletAgent,
        envelope: TransactionEnvelope,
    ) -> FlowResult<Signature> {
        let trace = TraceContext::new("submit_transfer");
        let m = metrics();
        m.transfers_attempted.inc();
        let timer = Timer::new();

        let result = self
            .run(wallet, &envelope)
            .instrument(trace.span())
            .await;

        match &result {
            Ok(signature) => {
                m.transfers_confirmed.inc();
                timer.observe_duration(&m.submit_latency);
                info!(
                    correlation_id = %trace.correlation_id,
                    signature = %signature,
                    latency_ms = trace.elapsed_ms(),
                    "Transfer confirmed"
                );
            }
            Err(err) => {
                m.record_transfer_failure(err.category());
                warn!(
                    correlation_id = %trace.correlation_id,
                    category = err.category(),
                    error = %err,
                    latency_ms = trace.elapsed_ms(),
                    "Transfer failed"
                );
            }
        }
        result
    }

    async fn run(
        &self,
        wallet: &dyn WalletAgent,
        envelope: &TransactionEnvelope,
    ) -> FlowResult<Signature> {
        let unsigned = envelope.to_unsigned_transaction()?;

        debug!("Requesting wallet signature");
        let signed = wallet.sign_transaction(unsigned).await?;
        let signed = SignedTransaction::from_wallet(signed, envelope)?;
        let expected = signed.signature();
        let wire = signed.serialize()?;

        debug!(wire_len = wire.len(), "Broadcasting");
        let signature = self
            .network
            .submit_raw(&wire)
            .await
            .map_err(|err| {
                warn!(signature = %expected, error = %err, "Broadcast failed");
                FlowError::from_broadcast(err, expected)
            })?;
        if signature != expected {
            warn!(%signature, %expected, "Node returned an unexpected signature");
        }

        debug!(%signature, commitment = ?self.commitment.commitment, "Awaiting confirmation");
        match self
            .network
            .await_confirmation(&signature, self.commitment)
            .await
        {
            Ok(ConfirmationOutcome::Confirmed) => Ok(signature),
            Ok(ConfirmationOutcome::Failed(reason)) => {
                Err(FlowError::ConfirmationFailed { signature, reason })
            }
            Ok(ConfirmationOutcome::TimedOut) => Err(FlowError::ConfirmationTimeout { signature }),
            Err(err) => {
                // Already broadcast: the outcome is unknown, not retryable.
                warn!(%signature, error = %err, "Confirmation polling aborted");
                Err(FlowError::ConfirmationTimeout { signature })
            }
        }
    }
}
