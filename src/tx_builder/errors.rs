//! Error taxonomy for transfer and history operations
//!
//! Every public operation of the crate reports a [`FlowError`]. Variants map
//! one-to-one onto the caller's recovery options: reassemble and retry,
//! surface to the user, or check status before doing anything else.

use solana_sdk::signature::Signature;
use thiserror::Error;

use crate::rpc::NetworkError;
use crate::wallet::WalletError;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FlowError {
    /// Caller supplied missing or malformed arguments
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The node could not be reached; the whole operation may be retried
    /// with a fresh blockhash
    #[error("Network unavailable: {0}")]
    NetworkUnavailable(String),

    /// The wallet agent or its user declined to sign
    #[error("Signing rejected: {0}")]
    SigningRejected(String),

    /// The wallet agent failed for any other reason
    #[error("Signing failed: {0}")]
    SigningFailed(String),

    /// The node declined the submitted payload. Carries the node's reason
    /// verbatim. The envelope must be reassembled before another attempt.
    #[error("Submission rejected: {0}")]
    SubmissionRejected(String),

    /// No verdict within the polling bound, or the broadcast failed after
    /// the payload may have reached a node. The transaction may still land;
    /// check history before resubmitting.
    #[error("Confirmation timed out for {signature}")]
    ConfirmationTimeout { signature: Signature },

    /// The transaction executed and the network reports it failed
    #[error("Transaction {signature} failed: {reason}")]
    ConfirmationFailed { signature: Signature, reason: String },

    /// A history entry could not be resolved (strict history mode only)
    #[error("Failed to resolve {signature}: {reason}")]
    ResolutionFailed { signature: Signature, reason: String },

    /// The wallet agent could not be connected
    #[error("Wallet unavailable: {0}")]
    WalletUnavailable(String),

    /// Invalid configuration values
    #[error("Configuration error: {0}")]
    Configuration(String),
}

pub type FlowResult<T> = std::result::Result<T, FlowError>;

impl FlowError {
    /// Whether repeating the whole operation from scratch may succeed.
    ///
    /// Nothing in this crate retries on its own; this only informs callers.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::NetworkUnavailable(_) => true,

            Self::InvalidInput(_) => false,
            Self::SigningRejected(_) => false,
            Self::SigningFailed(_) => false,
            Self::SubmissionRejected(_) => false,
            // Ambiguous: resubmitting blindly risks a double transfer
            Self::ConfirmationTimeout { .. } => false,
            Self::ConfirmationFailed { .. } => false,
            Self::ResolutionFailed { .. } => false,
            Self::WalletUnavailable(_) => false,
            Self::Configuration(_) => false,
        }
    }

    /// Whether the transaction may already be on-chain
    pub fn outcome_unknown(&self) -> bool {
        matches!(self, Self::ConfirmationTimeout { .. })
    }

    /// Get the error category for metrics and observability
    pub fn category(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "invalid_input",
            Self::NetworkUnavailable(_) => "network",
            Self::SigningRejected(_) => "signing_rejected",
            Self::SigningFailed(_) => "signing",
            Self::SubmissionRejected(_) => "submission",
            Self::ConfirmationTimeout { .. } => "confirmation_timeout",
            Self::ConfirmationFailed { .. } => "confirmation_failed",
            Self::ResolutionFailed { .. } => "resolution",
            Self::WalletUnavailable(_) => "wallet",
            Self::Configuration(_) => "config",
        }
    }
}

// Convenience constructors
impl FlowError {
    pub fn invalid_input(reason: impl Into<String>) -> Self {
        Self::InvalidInput(reason.into())
    }

    pub fn network_unavailable(reason: impl Into<String>) -> Self {
        Self::NetworkUnavailable(reason.into())
    }

    /// Classify a failed broadcast of the transaction signed as `signature`.
    ///
    /// Only an explicit answer from the node or a connection that was never
    /// opened settles the outcome. A timeout or an unreadable reply leaves
    /// the payload possibly in flight.
    pub fn from_broadcast(err: NetworkError, signature: Signature) -> Self {
        match &err {
            NetworkError::Rejected { .. } => Self::SubmissionRejected(err.to_string()),
            _ if err.never_sent() => Self::NetworkUnavailable(err.to_string()),
            NetworkError::Unreachable { .. }
            | NetworkError::Unavailable { .. }
            | NetworkError::Malformed(_) => Self::ConfirmationTimeout { signature },
        }
    }
}

impl From<WalletError> for FlowError {
    fn from(err: WalletError) -> Self {
        match err {
            WalletError::Rejected(reason) => Self::SigningRejected(reason),
            other => Self::SigningFailed(other.to_string()),
        }
    }
}
