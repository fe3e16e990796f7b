//! Envelope assembly
//!
//! One instruction, the payer as fee payer, and a blockhash fetched for this
//! call only. Inputs are validated before the network is touched.

use std::sync::Arc;

use solana_sdk::{instruction::Instruction, pubkey::Pubkey};
use tracing::{debug, instrument};

use super::envelope::TransactionEnvelope;
use super::errors::{FlowError, FlowResult};
use super::instructions::validate_instruction;
use crate::rpc::NetworkClient;

pub struct TransactionAssembler {
    network: Arc<dyn NetworkClient>,
}

impl TransactionAssembler {
    pub fn new(network: Arc<dyn NetworkClient>) -> Self {
        Self { network }
    }

    /// Build a submittable envelope around `instruction`.
    ///
    /// `payer` is the wallet's current identity, `None` while disconnected.
    #[instrument(skip(self, instruction), fields(program = %instruction.program_id))]
    pub async fn assemble(
        &self,
        instruction: Instruction,
        payer: Option<Pubkey>,
    ) -> FlowResult<TransactionEnvelope> {
        let payer = payer.ok_or_else(|| FlowError::invalid_input("no payer identity"))?;
        if payer == Pubkey::default() {
            return Err(FlowError::invalid_input("payer is the default address"));
        }
        validate_instruction(&instruction)?;

        let mut envelope = TransactionEnvelope::new();
        envelope.add_instruction(instruction).set_fee_payer(payer);

        let blockhash = self
            .network
            .latest_blockhash()
            .await
            .map_err(|e| FlowError::network_unavailable(e.to_string()))?;
        envelope.set_freshness(blockhash);

        debug!(payer = %payer, blockhash = %blockhash, "Envelope assembled");
        Ok(envelope)
    }
}
