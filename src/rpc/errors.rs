use solana_rpc_client_api::client_error::{Error as ClientError, ErrorKind as ClientErrorKind};
use solana_rpc_client_api::request::RpcError;
use thiserror::Error;

/// Errors surfaced by a [`NetworkClient`](super::NetworkClient)
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NetworkError {
    /// No connection to the node could be opened; nothing was sent
    #[error("Network unreachable: {message} (endpoint: {endpoint:?})")]
    Unreachable {
        endpoint: Option<String>,
        message: String,
    },

    /// The request may have been sent but no usable answer came back
    #[error("Network unavailable: {message} (endpoint: {endpoint:?})")]
    Unavailable {
        endpoint: Option<String>,
        message: String,
    },

    /// The node answered and declined the request
    #[error("{message}")]
    Rejected {
        endpoint: Option<String>,
        message: String,
        code: Option<i64>,
    },

    /// The node answered with something we could not interpret
    #[error("Malformed response: {0}")]
    Malformed(String),
}

pub type NetworkResult<T> = std::result::Result<T, NetworkError>;

impl NetworkError {
    /// Whether the request provably never left this process
    pub fn never_sent(&self) -> bool {
        matches!(self, NetworkError::Unreachable { .. })
    }

    /// Classify a solana client error.
    ///
    /// Refused or failed connections become `Unreachable`. Other transport
    /// failures (I/O, HTTP, client-side timeouts) become `Unavailable`.
    /// Anything the node itself answered with becomes `Rejected`, keeping
    /// the node's message verbatim.
    pub fn from_client_error(err: ClientError, endpoint: Option<String>) -> Self {
        match err.kind() {
            ClientErrorKind::Io(e) if is_connect_failure(e.kind()) => NetworkError::Unreachable {
                endpoint,
                message: e.to_string(),
            },
            ClientErrorKind::Io(e) => NetworkError::Unavailable {
                endpoint,
                message: e.to_string(),
            },
            ClientErrorKind::Reqwest(e) if e.is_connect() => NetworkError::Unreachable {
                endpoint,
                message: e.to_string(),
            },
            ClientErrorKind::Reqwest(e) => NetworkError::Unavailable {
                endpoint,
                message: e.to_string(),
            },
            ClientErrorKind::RpcError(RpcError::RpcResponseError { code, message, .. }) => {
                NetworkError::Rejected {
                    endpoint,
                    message: message.clone(),
                    code: Some(*code),
                }
            }
            ClientErrorKind::RpcError(RpcError::ParseError(message)) => {
                NetworkError::Malformed(message.clone())
            }
            ClientErrorKind::SerdeJson(e) => NetworkError::Malformed(e.to_string()),
            ClientErrorKind::TransactionError(e) => NetworkError::Rejected {
                endpoint,
                message: e.to_string(),
                code: None,
            },
            ClientErrorKind::Custom(message) => {
                let lowered = message.to_lowercase();
                if lowered.contains("timeout") || lowered.contains("timed out") {
                    NetworkError::Unavailable {
                        endpoint,
                        message: message.clone(),
                    }
                } else {
                    NetworkError::Rejected {
                        endpoint,
                        message: message.clone(),
                        code: None,
                    }
                }
            }
            _ => NetworkError::Unavailable {
                endpoint,
                message: err.to_string(),
            },
        }
    }
}

fn is_connect_failure(kind: std::io::ErrorKind) -> bool {
    matches!(
        kind,
        std::io::ErrorKind::ConnectionRefused
            | std::io::ErrorKind::NotConnected
            | std::io::ErrorKind::AddrNotAvailable
    )
}
