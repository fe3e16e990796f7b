//! Common types used throughout the crate

use serde::Serialize;
use solana_sdk::{account::Account, pubkey::Pubkey, signature::Signature};
use solana_transaction_status::EncodedConfirmedTransactionWithStatusMeta;

/// A history entry: signature plus the resolved on-chain transaction
#[derive(Debug)]
pub struct TransactionRecord {
    pub signature: Signature,
    pub transaction: EncodedConfirmedTransactionWithStatusMeta,
}

impl TransactionRecord {
    pub fn new(signature: Signature, transaction: EncodedConfirmedTransactionWithStatusMeta) -> Self {
        Self {
            signature,
            transaction,
        }
    }

    pub fn slot(&self) -> u64 {
        self.transaction.slot
    }

    /// Unix timestamp of the block, when the node knows it
    pub fn block_time(&self) -> Option<i64> {
        self.transaction.block_time
    }

    /// `None` when the node returned no status metadata
    pub fn succeeded(&self) -> Option<bool> {
        self.transaction
            .transaction
            .meta
            .as_ref()
            .map(|meta| meta.err.is_none())
    }

    pub fn fee(&self) -> Option<u64> {
        self.transaction.transaction.meta.as_ref().map(|meta| meta.fee)
    }
}

/// Summary of an account lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AccountSnapshot {
    pub lamports: u64,
    pub data_len: usize,
    pub owner: Pubkey,
    pub executable: bool,
}

impl From<&Account> for AccountSnapshot {
    fn from(account: &Account) -> Self {
        Self {
            lamports: account.lamports,
            data_len: account.data.len(),
            owner: account.owner,
            executable: account.executable,
        }
    }
}

/// Result of a confirmed transfer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferReceipt {
    pub signature: Signature,
    pub from: Pubkey,
    pub to: Pubkey,
    pub lamports: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use solana_sdk::system_program;

    #[test]
    fn test_account_snapshot_from_account() {
        let account = Account {
            lamports: 1_500,
            data: vec![0u8; 165],
            owner: system_program::id(),
            executable: false,
            rent_epoch: 0,
        };

        let snapshot = AccountSnapshot::from(&account);
        assert_eq!(snapshot.lamports, 1_500);
        assert_eq!(snapshot.data_len, 165);
        assert_eq!(snapshot.owner, system_program::id());
        assert!(!snapshot.executable);
    }
}
