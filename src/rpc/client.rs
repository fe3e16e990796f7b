//! JSON-RPC backed [`NetworkClient`]
//!
//! Wraps the nonblocking solana `RpcClient`. Raw submission and transaction
//! lookup go through `RpcClient::send` so that the caller's bytes are sent
//! untouched and a `null` lookup result maps to `None` instead of a decode
//! error.

use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine};
use serde_json::json;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_client::rpc_client::GetConfirmedSignaturesForAddress2Config;
use solana_rpc_client_api::config::{RpcSendTransactionConfig, RpcTransactionConfig};
use solana_rpc_client_api::request::RpcRequest;
use solana_sdk::{
    account::Account, commitment_config::CommitmentConfig, hash::Hash, pubkey::Pubkey,
    signature::Signature,
};
use solana_transaction_status::{EncodedConfirmedTransactionWithStatusMeta, UiTransactionEncoding};
use tracing::{debug, instrument, warn};

use super::{ConfirmationOutcome, NetworkClient, NetworkError, NetworkResult};
use crate::config::Config;
use crate::metrics::{metrics, Timer};
use crate::tx_builder::FlowError;

/// Largest page `getSignaturesForAddress` accepts
pub const MAX_SIGNATURE_PAGE: usize = 1_000;

pub struct RpcNetworkClient {
    client: Arc<RpcClient>,
    endpoint: String,
    commitment: CommitmentConfig,
    confirm_timeout: Duration,
    poll_interval: Duration,
    page_limit: usize,
    max_signatures: Option<usize>,
}

impl std::fmt::Debug for RpcNetworkClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcNetworkClient")
            .field("endpoint", &self.endpoint)
            .field("commitment", &self.commitment.commitment)
            .field("confirm_timeout", &self.confirm_timeout)
            .field("poll_interval", &self.poll_interval)
            .field("page_limit", &self.page_limit)
            .field("max_signatures", &self.max_signatures)
            .finish_non_exhaustive()
    }
}

impl RpcNetworkClient {
    /// Create a client for `url` using one commitment level for every read,
    /// preflight and confirmation
    pub fn new(url: impl Into<String>, commitment: CommitmentConfig, request_timeout: Duration) -> Self {
        let client =
            RpcClient::new_with_timeout_and_commitment(url.into(), request_timeout, commitment);
        Self::from_rpc_client(client, commitment)
    }

    /// Wrap an already configured `RpcClient`, e.g. one with a custom sender
    pub fn from_rpc_client(client: RpcClient, commitment: CommitmentConfig) -> Self {
        Self {
            endpoint: client.url(),
            client: Arc::new(client),
            commitment,
            confirm_timeout: Duration::from_secs(30),
            poll_interval: Duration::from_millis(500),
            page_limit: MAX_SIGNATURE_PAGE,
            max_signatures: None,
        }
    }

    /// Build from validated application configuration
    pub fn from_config(config: &Config) -> Result<Self, FlowError> {
        let commitment = config.rpc.commitment_config()?;
        Ok(Self::new(
            config.rpc.url.clone(),
            commitment,
            Duration::from_secs(config.rpc.timeout_secs),
        )
        .with_confirmation_bound(
            Duration::from_secs(config.rpc.confirm_timeout_secs),
            Duration::from_millis(config.rpc.confirm_poll_interval_ms),
        )
        .with_paging(config.history.page_limit, config.history.max_signatures))
    }

    pub fn with_confirmation_bound(mut self, timeout: Duration, poll_interval: Duration) -> Self {
        self.confirm_timeout = timeout;
        self.poll_interval = poll_interval.max(Duration::from_millis(1));
        self
    }

    pub fn with_paging(mut self, page_limit: usize, max_signatures: Option<usize>) -> Self {
        self.page_limit = page_limit.clamp(1, MAX_SIGNATURE_PAGE);
        self.max_signatures = max_signatures;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn commitment(&self) -> CommitmentConfig {
        self.commitment
    }

    fn classify(&self, err: solana_client::client_error::ClientError) -> NetworkError {
        NetworkError::from_client_error(err, Some(self.endpoint.clone()))
    }

    fn parse_signature(raw: &str) -> NetworkResult<Signature> {
        Signature::from_str(raw)
            .map_err(|e| NetworkError::Malformed(format!("signature {raw}: {e}")))
    }
}

#[async_trait]
impl NetworkClient for RpcNetworkClient {
    #[instrument(skip(self), fields(endpoint = %self.endpoint))]
    async fn account_info(&self, pubkey: &Pubkey) -> NetworkResult<Option<Account>> {
        let timer = Timer::new();
        let response = self
            .client
            .get_account_with_commitment(pubkey, self.commitment)
            .await
            .map_err(|e| self.classify(e));
        timer.observe_rpc("getAccountInfo");
        Ok(response?.value)
    }

    #[instrument(skip(self), fields(endpoint = %self.endpoint))]
    async fn signatures_for_address(&self, address: &Pubkey) -> NetworkResult<Vec<Signature>> {
        let mut signatures: Vec<Signature> = Vec::new();
        let mut before: Option<Signature> = None;

        loop {
            let config = GetConfirmedSignaturesForAddress2Config {
                before,
                until: None,
                limit: Some(self.page_limit),
                commitment: Some(self.commitment),
            };

            let timer = Timer::new();
            let page = self
                .client
                .get_signatures_for_address_with_config(address, config)
                .await
                .map_err(|e| self.classify(e));
            timer.observe_rpc("getSignaturesForAddress");
            let page = page?;

            let page_len = page.len();
            for entry in page {
                signatures.push(Self::parse_signature(&entry.signature)?);
            }
            debug!(page_len, total = signatures.len(), "Fetched signature page");

            let capped = self
                .max_signatures
                .is_some_and(|max| signatures.len() >= max);
            if page_len < self.page_limit || capped {
                break;
            }
            before = signatures.last().copied();
        }

        if let Some(max) = self.max_signatures {
            signatures.truncate(max);
        }
        Ok(signatures)
    }

    #[instrument(skip(self), fields(endpoint = %self.endpoint))]
    async fn resolve_transaction(
        &self,
        signature: &Signature,
    ) -> NetworkResult<Option<EncodedConfirmedTransactionWithStatusMeta>> {
        let config = RpcTransactionConfig {
            encoding: Some(UiTransactionEncoding::Json),
            commitment: Some(self.commitment),
            max_supported_transaction_version: Some(0),
        };

        let timer = Timer::new();
        let result = self
            .client
            .send::<Option<EncodedConfirmedTransactionWithStatusMeta>>(
                RpcRequest::GetTransaction,
                json!([signature.to_string(), config]),
            )
            .await
            .map_err(|e| self.classify(e));
        timer.observe_rpc("getTransaction");
        result
    }

    #[instrument(skip(self), fields(endpoint = %self.endpoint))]
    async fn latest_blockhash(&self) -> NetworkResult<Hash> {
        let timer = Timer::new();
        let result = self
            .client
            .get_latest_blockhash_with_commitment(self.commitment)
            .await
            .map(|(hash, _last_valid_block_height)| hash)
            .map_err(|e| self.classify(e));
        timer.observe_rpc("getLatestBlockhash");
        result
    }

    #[instrument(skip(self, wire), fields(endpoint = %self.endpoint, wire_len = wire.len()))]
    async fn submit_raw(&self, wire: &[u8]) -> NetworkResult<Signature> {
        let config = RpcSendTransactionConfig {
            skip_preflight: false,
            preflight_commitment: Some(self.commitment.commitment),
            encoding: Some(UiTransactionEncoding::Base64),
            ..RpcSendTransactionConfig::default()
        };

        let timer = Timer::new();
        let result = self
            .client
            .send::<String>(
                RpcRequest::SendTransaction,
                json!([BASE64_STANDARD.encode(wire), config]),
            )
            .await
            .map_err(|e| self.classify(e));
        timer.observe_rpc("sendTransaction");
        Self::parse_signature(&result?)
    }

    #[instrument(skip(self), fields(endpoint = %self.endpoint))]
    async fn await_confirmation(
        &self,
        signature: &Signature,
        commitment: CommitmentConfig,
    ) -> NetworkResult<ConfirmationOutcome> {
        let deadline = Instant::now() + self.confirm_timeout;
        let mut polls: u32 = 0;

        loop {
            polls += 1;
            let timer = Timer::new();
            let status = self
                .client
                .get_signature_status_with_commitment(signature, commitment)
                .await;
            timer.observe_rpc("getSignatureStatuses");

            match status {
                Ok(Some(Ok(()))) => {
                    debug!(polls, "Signature reached commitment");
                    return Ok(ConfirmationOutcome::Confirmed);
                }
                Ok(Some(Err(err))) => return Ok(ConfirmationOutcome::Failed(err.to_string())),
                Ok(None) => {}
                Err(err) => {
                    // A failed poll says nothing about the transaction itself.
                    warn!(polls, error = %err, "Confirmation poll failed");
                    metrics().confirmation_poll_errors.inc();
                }
            }

            if Instant::now() >= deadline {
                return Ok(ConfirmationOutcome::TimedOut);
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{HashMap, VecDeque};

    use parking_lot::Mutex;
    use serde_json::Value;
    use solana_client::rpc_client::RpcClientConfig;
    use solana_client::rpc_sender::{RpcSender, RpcTransportStats};
    use solana_rpc_client_api::client_error::{ErrorKind as ClientErrorKind, Result as ClientResult};
    use solana_rpc_client_api::request::{RpcError, RpcResponseErrorData};

    #[derive(Default)]
    struct Script {
        replies: HashMap<RpcRequest, VecDeque<ClientResult<Value>>>,
        requests: Vec<(RpcRequest, Value)>,
    }

    /// Answers each request kind from a queue and records what was sent.
    /// Status polls with nothing queued report the signature as unknown.
    #[derive(Clone, Default)]
    struct ScriptedSender(Arc<Mutex<Script>>);

    impl ScriptedSender {
        fn reply(&self, request: RpcRequest, reply: ClientResult<Value>) -> &Self {
            self.0
                .lock()
                .replies
                .entry(request)
                .or_default()
                .push_back(reply);
            self
        }

        fn params(&self, request: RpcRequest) -> Vec<Value> {
            self.0
                .lock()
                .requests
                .iter()
                .filter(|(r, _)| *r == request)
                .map(|(_, params)| params.clone())
                .collect()
        }
    }

    #[async_trait]
    impl RpcSender for ScriptedSender {
        async fn send(&self, request: RpcRequest, params: Value) -> ClientResult<Value> {
            let mut script = self.0.lock();
            script.requests.push((request, params));
            match script.replies.get_mut(&request).and_then(VecDeque::pop_front) {
                Some(reply) => reply,
                None if request == RpcRequest::GetSignatureStatuses => {
                    Ok(json!({ "context": { "slot": 1 }, "value": [null] }))
                }
                None => Err(ClientErrorKind::Custom(format!("no reply scripted for {request}")).into()),
            }
        }

        fn get_transport_stats(&self) -> RpcTransportStats {
            RpcTransportStats::default()
        }

        fn url(&self) -> String {
            "scripted://node".to_string()
        }
    }

    fn scripted_client(sender: &ScriptedSender) -> RpcNetworkClient {
        let commitment = CommitmentConfig::confirmed();
        let rpc = RpcClient::new_sender(sender.clone(), RpcClientConfig::with_commitment(commitment));
        RpcNetworkClient::from_rpc_client(rpc, commitment)
            .with_confirmation_bound(Duration::from_millis(50), Duration::from_millis(1))
    }

    fn signatures(count: u8) -> Vec<Signature> {
        (1..=count).map(|n| Signature::from([n; 64])).collect()
    }

    fn page(entries: &[Signature]) -> ClientResult<Value> {
        Ok(Value::Array(
            entries
                .iter()
                .map(|signature| {
                    json!({
                        "signature": signature.to_string(),
                        "slot": 10,
                        "err": null,
                        "memo": null,
                        "blockTime": null,
                        "confirmationStatus": "finalized",
                    })
                })
                .collect(),
        ))
    }

    fn status(result: Value, err: Value) -> ClientResult<Value> {
        Ok(json!({
            "context": { "slot": 12 },
            "value": [{
                "slot": 11,
                "confirmations": null,
                "status": result,
                "err": err,
                "confirmationStatus": "finalized",
            }],
        }))
    }

    fn poll_failure() -> ClientResult<Value> {
        Err(ClientErrorKind::Custom("connection reset by peer".to_string()).into())
    }

    #[test]
    fn test_paging_is_clamped() {
        let client = RpcNetworkClient::new(
            "http://127.0.0.1:8899",
            CommitmentConfig::confirmed(),
            Duration::from_secs(5),
        )
        .with_paging(50_000, Some(10));

        assert_eq!(client.page_limit, MAX_SIGNATURE_PAGE);
        assert_eq!(client.max_signatures, Some(10));

        let client = client.with_paging(0, None);
        assert_eq!(client.page_limit, 1);
    }

    #[test]
    fn test_from_config_uses_single_commitment() {
        let mut config = Config::default();
        config.rpc.commitment = "finalized".to_string();

        let client = RpcNetworkClient::from_config(&config).unwrap();
        assert_eq!(client.commitment(), CommitmentConfig::finalized());
        assert_eq!(client.endpoint(), config.rpc.url);
    }

    #[test]
    fn test_parse_signature_rejects_garbage() {
        assert!(matches!(
            RpcNetworkClient::parse_signature("not-a-signature"),
            Err(NetworkError::Malformed(_))
        ));
        let sig = Signature::from([3u8; 64]);
        assert_eq!(
            RpcNetworkClient::parse_signature(&sig.to_string()).unwrap(),
            sig
        );
    }

    #[tokio::test]
    async fn test_signature_paging_follows_before_cursor() {
        let sender = ScriptedSender::default();
        let all = signatures(5);
        sender
            .reply(RpcRequest::GetSignaturesForAddress, page(&all[0..2]))
            .reply(RpcRequest::GetSignaturesForAddress, page(&all[2..4]))
            .reply(RpcRequest::GetSignaturesForAddress, page(&all[4..5]));
        let client = scripted_client(&sender).with_paging(2, None);
        let address = Pubkey::new_unique();

        let listed = client.signatures_for_address(&address).await.unwrap();

        assert_eq!(listed, all);
        let requests = sender.params(RpcRequest::GetSignaturesForAddress);
        assert_eq!(requests.len(), 3);
        assert_eq!(requests[0][0], json!(address.to_string()));
        assert_eq!(requests[0][1]["limit"], json!(2));
        assert!(requests[0][1]["before"].is_null());
        assert_eq!(requests[1][1]["before"], json!(all[1].to_string()));
        assert_eq!(requests[2][1]["before"], json!(all[3].to_string()));
    }

    #[tokio::test]
    async fn test_signature_paging_stops_on_empty_page() {
        let sender = ScriptedSender::default();
        let all = signatures(2);
        sender
            .reply(RpcRequest::GetSignaturesForAddress, page(&all))
            .reply(RpcRequest::GetSignaturesForAddress, page(&[]));
        let client = scripted_client(&sender).with_paging(2, None);

        let listed = client
            .signatures_for_address(&Pubkey::new_unique())
            .await
            .unwrap();

        assert_eq!(listed, all);
        assert_eq!(sender.params(RpcRequest::GetSignaturesForAddress).len(), 2);
    }

    #[tokio::test]
    async fn test_max_signatures_truncates_and_stops_paging() {
        let sender = ScriptedSender::default();
        let all = signatures(6);
        sender
            .reply(RpcRequest::GetSignaturesForAddress, page(&all[0..2]))
            .reply(RpcRequest::GetSignaturesForAddress, page(&all[2..4]))
            .reply(RpcRequest::GetSignaturesForAddress, page(&all[4..6]));
        let client = scripted_client(&sender).with_paging(2, Some(3));

        let listed = client
            .signatures_for_address(&Pubkey::new_unique())
            .await
            .unwrap();

        assert_eq!(listed, all[0..3].to_vec());
        assert_eq!(sender.params(RpcRequest::GetSignaturesForAddress).len(), 2);
    }

    #[tokio::test]
    async fn test_confirmation_keeps_polling_after_poll_errors() {
        let sender = ScriptedSender::default();
        sender
            .reply(RpcRequest::GetSignatureStatuses, poll_failure())
            .reply(RpcRequest::GetSignatureStatuses, poll_failure())
            .reply(RpcRequest::GetSignatureStatuses, status(json!({ "Ok": null }), Value::Null));
        let client = scripted_client(&sender)
            .with_confirmation_bound(Duration::from_secs(5), Duration::from_millis(1));

        let outcome = client
            .await_confirmation(&Signature::from([8u8; 64]), CommitmentConfig::confirmed())
            .await
            .unwrap();

        assert_eq!(outcome, ConfirmationOutcome::Confirmed);
        assert_eq!(sender.params(RpcRequest::GetSignatureStatuses).len(), 3);
    }

    #[tokio::test]
    async fn test_confirmation_reports_execution_failure() {
        let sender = ScriptedSender::default();
        sender.reply(
            RpcRequest::GetSignatureStatuses,
            status(json!({ "Err": "AccountInUse" }), json!("AccountInUse")),
        );
        let client = scripted_client(&sender);

        let outcome = client
            .await_confirmation(&Signature::from([8u8; 64]), CommitmentConfig::confirmed())
            .await
            .unwrap();

        assert!(matches!(outcome, ConfirmationOutcome::Failed(_)));
        assert_eq!(sender.params(RpcRequest::GetSignatureStatuses).len(), 1);
    }

    #[tokio::test]
    async fn test_confirmation_deadline_is_timed_out() {
        let sender = ScriptedSender::default();
        sender.reply(RpcRequest::GetSignatureStatuses, poll_failure());
        let client = scripted_client(&sender);

        let outcome = client
            .await_confirmation(&Signature::from([8u8; 64]), CommitmentConfig::confirmed())
            .await
            .unwrap();

        assert_eq!(outcome, ConfirmationOutcome::TimedOut);
        assert!(!sender.params(RpcRequest::GetSignatureStatuses).is_empty());
    }

    #[tokio::test]
    async fn test_submit_raw_sends_base64_payload() {
        let sender = ScriptedSender::default();
        let signature = Signature::from([5u8; 64]);
        sender.reply(RpcRequest::SendTransaction, Ok(json!(signature.to_string())));
        let client = scripted_client(&sender);

        let returned = client.submit_raw(&[1, 2, 3]).await.unwrap();

        assert_eq!(returned, signature);
        let params = sender.params(RpcRequest::SendTransaction);
        assert_eq!(params[0][0], json!(BASE64_STANDARD.encode([1u8, 2, 3])));
        assert_eq!(params[0][1]["encoding"], json!("base64"));
    }

    #[tokio::test]
    async fn test_submit_raw_rejection_keeps_node_message() {
        let sender = ScriptedSender::default();
        sender.reply(
            RpcRequest::SendTransaction,
            Err(ClientErrorKind::RpcError(RpcError::RpcResponseError {
                code: -32002,
                message: "Blockhash not found".to_string(),
                data: RpcResponseErrorData::Empty,
            })
            .into()),
        );
        let client = scripted_client(&sender);

        let err = client.submit_raw(&[1, 2, 3]).await.unwrap_err();

        assert_eq!(
            err,
            NetworkError::Rejected {
                endpoint: Some("scripted://node".to_string()),
                message: "Blockhash not found".to_string(),
                code: Some(-32002),
            }
        );
    }

    #[tokio::test]
    async fn test_null_transaction_lookup_is_absent() {
        let sender = ScriptedSender::default();
        sender.reply(RpcRequest::GetTransaction, Ok(Value::Null));
        let client = scripted_client(&sender);

        let resolved = client
            .resolve_transaction(&Signature::from([6u8; 64]))
            .await
            .unwrap();

        assert!(resolved.is_none());
    }
}
