//! Test Utilities Module
//!
//! Deterministic stand-ins for the network and the wallet. Both record
//! into a shared [`CallLog`] so tests can assert on call order across the
//! two collaborators.
//!
//! These utilities are only compiled when running tests or when the
//! `test_utils` feature is enabled.

#![cfg(any(test, feature = "test_utils"))]

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use solana_sdk::{
    account::Account,
    commitment_config::CommitmentConfig,
    hash::Hash,
    pubkey::Pubkey,
    signature::{Keypair, Signature, Signer},
    transaction::Transaction,
};
use solana_transaction_status::{
    EncodedConfirmedTransactionWithStatusMeta, EncodedTransaction,
    EncodedTransactionWithStatusMeta,
};

use crate::rpc::{ConfirmationOutcome, NetworkClient, NetworkError, NetworkResult};
use crate::wallet::{WalletAgent, WalletError};

/// One recorded collaborator call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Connect,
    Sign,
    AccountInfo(Pubkey),
    ListSignatures(Pubkey),
    Resolve(Signature),
    LatestBlockhash,
    SubmitRaw,
    AwaitConfirmation(Signature, CommitmentConfig),
}

/// Shared, ordered record of calls
#[derive(Debug, Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<Call>>>);

impl CallLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, call: Call) {
        self.0.lock().push(call);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.0.lock().clone()
    }

    pub fn count(&self, predicate: impl Fn(&Call) -> bool) -> usize {
        self.0.lock().iter().filter(|c| predicate(c)).count()
    }

    /// Position of the first call matching `predicate`
    pub fn position(&self, predicate: impl Fn(&Call) -> bool) -> Option<usize> {
        self.0.lock().iter().position(|c| predicate(c))
    }
}

/// How the fake network answers a lookup for one signature
#[derive(Debug, Clone)]
pub enum FakeResolution {
    /// Resolves to [`fake_confirmed_transaction`] at this slot
    Found(u64),
    Absent,
    Fail(String),
}

/// Minimal resolved transaction for history tests
pub fn fake_confirmed_transaction(slot: u64) -> EncodedConfirmedTransactionWithStatusMeta {
    EncodedConfirmedTransactionWithStatusMeta {
        slot,
        transaction: EncodedTransactionWithStatusMeta {
            transaction: EncodedTransaction::LegacyBinary(String::new()),
            meta: None,
            version: None,
        },
        block_time: Some(1_600_000_000 + slot as i64),
    }
}

pub fn unavailable(message: &str) -> NetworkError {
    NetworkError::Unavailable {
        endpoint: Some("fake://network".to_string()),
        message: message.to_string(),
    }
}

pub fn refused(message: &str) -> NetworkError {
    NetworkError::Unreachable {
        endpoint: Some("fake://network".to_string()),
        message: message.to_string(),
    }
}

pub fn rejected(message: &str) -> NetworkError {
    NetworkError::Rejected {
        endpoint: Some("fake://network".to_string()),
        message: message.to_string(),
        code: Some(-32002),
    }
}

/// Scriptable [`NetworkClient`]
pub struct FakeNetwork {
    log: CallLog,
    blockhash: NetworkResult<Hash>,
    submit_signature: Option<Signature>,
    submit_error: Option<NetworkError>,
    confirmation: NetworkResult<ConfirmationOutcome>,
    signatures: NetworkResult<Vec<Signature>>,
    resolutions: HashMap<Signature, FakeResolution>,
    resolution_delays: HashMap<Signature, Duration>,
    accounts: HashMap<Pubkey, Account>,
    submitted: Mutex<Vec<Vec<u8>>>,
}

impl FakeNetwork {
    /// Healthy network: fixed blockhash, accepts broadcasts, confirms on the
    /// first poll, empty history
    pub fn new(log: CallLog) -> Self {
        Self {
            log,
            blockhash: Ok(Hash::new_from_array([7u8; 32])),
            submit_signature: None,
            submit_error: None,
            confirmation: Ok(ConfirmationOutcome::Confirmed),
            signatures: Ok(Vec::new()),
            resolutions: HashMap::new(),
            resolution_delays: HashMap::new(),
            accounts: HashMap::new(),
            submitted: Mutex::new(Vec::new()),
        }
    }

    pub fn with_blockhash(mut self, blockhash: NetworkResult<Hash>) -> Self {
        self.blockhash = blockhash;
        self
    }

    /// Answer broadcasts with `signature` instead of the transaction's own
    pub fn with_submit_signature(mut self, signature: Signature) -> Self {
        self.submit_signature = Some(signature);
        self
    }

    pub fn with_submit_error(mut self, error: NetworkError) -> Self {
        self.submit_error = Some(error);
        self
    }

    pub fn with_confirmation(mut self, outcome: NetworkResult<ConfirmationOutcome>) -> Self {
        self.confirmation = outcome;
        self
    }

    pub fn with_signatures(mut self, signatures: NetworkResult<Vec<Signature>>) -> Self {
        self.signatures = signatures;
        self
    }

    pub fn with_resolution(mut self, signature: Signature, resolution: FakeResolution) -> Self {
        self.resolutions.insert(signature, resolution);
        self
    }

    pub fn with_resolution_delay(mut self, signature: Signature, delay: Duration) -> Self {
        self.resolution_delays.insert(signature, delay);
        self
    }

    pub fn with_account(mut self, pubkey: Pubkey, account: Account) -> Self {
        self.accounts.insert(pubkey, account);
        self
    }

    /// Wire payloads received by `submit_raw`
    pub fn submitted(&self) -> Vec<Vec<u8>> {
        self.submitted.lock().clone()
    }
}

#[async_trait]
impl NetworkClient for FakeNetwork {
    async fn account_info(&self, pubkey: &Pubkey) -> NetworkResult<Option<Account>> {
        self.log.record(Call::AccountInfo(*pubkey));
        Ok(self.accounts.get(pubkey).cloned())
    }

    async fn signatures_for_address(&self, address: &Pubkey) -> NetworkResult<Vec<Signature>> {
        self.log.record(Call::ListSignatures(*address));
        self.signatures.clone()
    }

    async fn resolve_transaction(
        &self,
        signature: &Signature,
    ) -> NetworkResult<Option<EncodedConfirmedTransactionWithStatusMeta>> {
        self.log.record(Call::Resolve(*signature));
        if let Some(delay) = self.resolution_delays.get(signature) {
            tokio::time::sleep(*delay).await;
        }
        match self.resolutions.get(signature) {
            Some(FakeResolution::Found(slot)) => Ok(Some(fake_confirmed_transaction(*slot))),
            Some(FakeResolution::Absent) | None => Ok(None),
            Some(FakeResolution::Fail(message)) => Err(unavailable(message)),
        }
    }

    async fn latest_blockhash(&self) -> NetworkResult<Hash> {
        self.log.record(Call::LatestBlockhash);
        self.blockhash.clone()
    }

    async fn submit_raw(&self, wire: &[u8]) -> NetworkResult<Signature> {
        self.log.record(Call::SubmitRaw);
        self.submitted.lock().push(wire.to_vec());

        if let Some(err) = &self.submit_error {
            return Err(err.clone());
        }
        if let Some(signature) = self.submit_signature {
            return Ok(signature);
        }
        let tx: Transaction = bincode::deserialize(wire)
            .map_err(|e| rejected(&format!("failed to deserialize transaction: {e}")))?;
        tx.signatures
            .first()
            .copied()
            .ok_or_else(|| rejected("transaction has no signatures"))
    }

    async fn await_confirmation(
        &self,
        signature: &Signature,
        commitment: CommitmentConfig,
    ) -> NetworkResult<ConfirmationOutcome> {
        self.log.record(Call::AwaitConfirmation(*signature, commitment));
        self.confirmation.clone()
    }
}

/// How the fake wallet answers a signing request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignBehavior {
    Sign,
    Reject,
    Fail,
    /// Return the transaction untouched
    SkipSignature,
}

/// Scriptable [`WalletAgent`] backed by a real keypair
pub struct FakeWallet {
    log: CallLog,
    keypair: Keypair,
    identity: Mutex<Option<Pubkey>>,
    behavior: SignBehavior,
}

impl FakeWallet {
    /// Disconnected wallet that signs when asked
    pub fn new(log: CallLog) -> Self {
        Self {
            log,
            keypair: Keypair::new(),
            identity: Mutex::new(None),
            behavior: SignBehavior::Sign,
        }
    }

    /// Same as `new`, already connected
    pub fn connected(log: CallLog) -> Self {
        let wallet = Self::new(log);
        *wallet.identity.lock() = Some(wallet.keypair.pubkey());
        wallet
    }

    pub fn with_behavior(mut self, behavior: SignBehavior) -> Self {
        self.behavior = behavior;
        self
    }

    pub fn pubkey(&self) -> Pubkey {
        self.keypair.pubkey()
    }
}

#[async_trait]
impl WalletAgent for FakeWallet {
    fn identity(&self) -> Option<Pubkey> {
        *self.identity.lock()
    }

    async fn connect(&self) -> Result<Pubkey, WalletError> {
        self.log.record(Call::Connect);
        let pubkey = self.keypair.pubkey();
        *self.identity.lock() = Some(pubkey);
        Ok(pubkey)
    }

    async fn sign_transaction(&self, mut transaction: Transaction) -> Result<Transaction, WalletError> {
        self.log.record(Call::Sign);
        match self.behavior {
            SignBehavior::Sign => {
                let blockhash = transaction.message.recent_blockhash;
                transaction
                    .try_sign(&[&self.keypair], blockhash)
                    .map_err(|e| WalletError::Signing(e.to_string()))?;
                Ok(transaction)
            }
            SignBehavior::Reject => Err(WalletError::Rejected("user cancelled".to_string())),
            SignBehavior::Fail => Err(WalletError::Signing("device disconnected".to_string())),
            SignBehavior::SkipSignature => Ok(transaction),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_call_log_shared_between_fakes() {
        let log = CallLog::new();
        let network = FakeNetwork::new(log.clone());
        let wallet = FakeWallet::new(log.clone());

        wallet.connect().await.unwrap();
        network.latest_blockhash().await.unwrap();

        assert_eq!(log.calls(), vec![Call::Connect, Call::LatestBlockhash]);
        assert_eq!(log.position(|c| *c == Call::LatestBlockhash), Some(1));
    }

    #[tokio::test]
    async fn test_unknown_signature_resolves_absent() {
        let network = FakeNetwork::new(CallLog::new());
        let resolved = network
            .resolve_transaction(&Signature::from([4u8; 64]))
            .await
            .unwrap();
        assert!(resolved.is_none());
    }
}
