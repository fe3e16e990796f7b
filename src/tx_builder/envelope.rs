//! Unsigned envelopes and signed transactions
//!
//! A [`TransactionEnvelope`] stays mutable until it is signed. It only turns
//! into a signable transaction once it has a fee payer, a blockhash and at
//! least one instruction. A [`SignedTransaction`] is immutable and is
//! consumed by serialization, so the wire bytes are produced exactly once.

use solana_sdk::{
    hash::Hash, instruction::Instruction, message::Message, pubkey::Pubkey,
    signature::Signature, transaction::Transaction,
};

use super::errors::{FlowError, FlowResult};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionEnvelope {
    instructions: Vec<Instruction>,
    fee_payer: Option<Pubkey>,
    freshness: Option<Hash>,
}

impl TransactionEnvelope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_instruction(&mut self, instruction: Instruction) -> &mut Self {
        self.instructions.push(instruction);
        self
    }

    pub fn set_fee_payer(&mut self, payer: Pubkey) -> &mut Self {
        self.fee_payer = Some(payer);
        self
    }

    /// Attach the recent blockhash the network will check for staleness
    pub fn set_freshness(&mut self, blockhash: Hash) -> &mut Self {
        self.freshness = Some(blockhash);
        self
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    pub fn fee_payer(&self) -> Option<Pubkey> {
        self.fee_payer
    }

    pub fn freshness(&self) -> Option<Hash> {
        self.freshness
    }

    pub fn is_submittable(&self) -> bool {
        self.fee_payer.is_some() && self.freshness.is_some() && !self.instructions.is_empty()
    }

    /// Compile into an unsigned transaction ready for the wallet
    pub fn to_unsigned_transaction(&self) -> FlowResult<Transaction> {
        let payer = self
            .fee_payer
            .ok_or_else(|| FlowError::invalid_input("envelope has no fee payer"))?;
        let blockhash = self
            .freshness
            .ok_or_else(|| FlowError::invalid_input("envelope has no recent blockhash"))?;
        if self.instructions.is_empty() {
            return Err(FlowError::invalid_input("envelope has no instructions"));
        }

        let message = Message::new_with_blockhash(&self.instructions, Some(&payer), &blockhash);
        Ok(Transaction::new_unsigned(message))
    }
}

/// A transaction carrying every signature its message requires
#[derive(Debug, Clone)]
pub struct SignedTransaction {
    tx: Transaction,
}

impl SignedTransaction {
    /// Accept what the wallet returned for `envelope`.
    ///
    /// The wallet must not have swapped the fee payer or blockhash, and
    /// every required signature must verify against the message.
    pub fn from_wallet(tx: Transaction, envelope: &TransactionEnvelope) -> FlowResult<Self> {
        let required = usize::from(tx.message.header.num_required_signatures);
        if required == 0 || tx.signatures.len() != required || !tx.is_signed() {
            return Err(FlowError::SigningFailed(
                "wallet returned a transaction with missing signatures".to_string(),
            ));
        }
        if tx.message.account_keys.first() != envelope.fee_payer().as_ref() {
            return Err(FlowError::SigningFailed(
                "wallet changed the fee payer".to_string(),
            ));
        }
        if Some(tx.message.recent_blockhash) != envelope.freshness() {
            return Err(FlowError::SigningFailed(
                "wallet changed the recent blockhash".to_string(),
            ));
        }
        tx.verify()
            .map_err(|e| FlowError::SigningFailed(format!("signature verification failed: {e}")))?;

        Ok(Self { tx })
    }

    /// The fee payer's signature, which the network uses as the transaction id
    pub fn signature(&self) -> Signature {
        self.tx.signatures[0]
    }

    pub fn transaction(&self) -> &Transaction {
        &self.tx
    }

    /// Serialize to the canonical wire format, consuming the transaction
    pub fn serialize(self) -> FlowResult<Vec<u8>> {
        bincode::serialize(&self.tx).map_err(encoding_failed)
    }
}

/// The signed transaction could not be encoded locally; nothing was sent
fn encoding_failed(err: bincode::Error) -> FlowError {
    FlowError::SigningFailed(format!("serialization failed: {err}"))
}

#[cfg(test)]
#[allow(deprecated)]
mod tests {
    use super::*;
    use solana_sdk::{
        signature::{Keypair, Signer},
        system_instruction,
    };

    fn envelope_for(payer: &Keypair) -> TransactionEnvelope {
        let mut envelope = TransactionEnvelope::new();
        envelope
            .add_instruction(system_instruction::transfer(
                &payer.pubkey(),
                &Pubkey::new_unique(),
                42,
            ))
            .set_fee_payer(payer.pubkey())
            .set_freshness(Hash::new_from_array([1u8; 32]));
        envelope
    }

    #[test]
    fn test_incomplete_envelope_is_not_submittable() {
        let mut envelope = TransactionEnvelope::new();
        assert!(!envelope.is_submittable());
        assert!(matches!(
            envelope.to_unsigned_transaction(),
            Err(FlowError::InvalidInput(_))
        ));

        envelope.set_fee_payer(Pubkey::new_unique());
        envelope.set_freshness(Hash::new_from_array([2u8; 32]));
        assert!(!envelope.is_submittable());
        let err = envelope.to_unsigned_transaction().unwrap_err();
        assert_eq!(err, FlowError::invalid_input("envelope has no instructions"));
    }

    #[test]
    fn test_unsigned_transaction_carries_payer_and_blockhash() {
        let payer = Keypair::new();
        let envelope = envelope_for(&payer);

        let tx = envelope.to_unsigned_transaction().unwrap();
        assert_eq!(tx.message.account_keys[0], payer.pubkey());
        assert_eq!(tx.message.recent_blockhash, Hash::new_from_array([1u8; 32]));
        assert!(!tx.is_signed());
    }

    #[test]
    fn test_unsigned_transaction_rejected() {
        let payer = Keypair::new();
        let envelope = envelope_for(&payer);
        let tx = envelope.to_unsigned_transaction().unwrap();

        assert!(matches!(
            SignedTransaction::from_wallet(tx, &envelope),
            Err(FlowError::SigningFailed(_))
        ));
    }

    #[test]
    fn test_swapped_blockhash_rejected() {
        let payer = Keypair::new();
        let envelope = envelope_for(&payer);
        let mut tx = envelope.to_unsigned_transaction().unwrap();
        tx.sign(&[&payer], Hash::new_from_array([9u8; 32]));

        let err = SignedTransaction::from_wallet(tx, &envelope).unwrap_err();
        assert_eq!(
            err,
            FlowError::SigningFailed("wallet changed the recent blockhash".to_string())
        );
    }

    #[test]
    fn test_signed_transaction_serializes_to_wire_format() {
        let payer = Keypair::new();
        let envelope = envelope_for(&payer);
        let mut tx = envelope.to_unsigned_transaction().unwrap();
        tx.sign(&[&payer], envelope.freshness().unwrap());
        let expected_signature = tx.signatures[0];

        let signed = SignedTransaction::from_wallet(tx, &envelope).unwrap();
        assert_eq!(signed.signature(), expected_signature);

        let wire = signed.serialize().unwrap();
        let decoded: Transaction = bincode::deserialize(&wire).unwrap();
        assert_eq!(decoded.signatures[0], expected_signature);
        assert_eq!(decoded.message.account_keys[0], payer.pubkey());
    }

    #[test]
    fn test_encoding_failure_is_local() {
        let err = encoding_failed(Box::new(bincode::ErrorKind::SizeLimit));

        assert!(matches!(
            &err,
            FlowError::SigningFailed(reason) if reason.starts_with("serialization failed")
        ));
        assert_eq!(err.category(), "signing");
        assert!(!err.outcome_unknown());
    }
}
