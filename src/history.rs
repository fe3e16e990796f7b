//! Address transaction history
//!
//! One signature listing, then one lookup per signature. Output keeps the
//! listing order (most recent first). Signatures the node has no record of
//! are skipped; lookup failures are skipped too unless the fetcher runs in
//! [`ResolutionPolicy::Strict`].

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;
use tracing::{debug, info, warn, Instrument};

use crate::config::HistoryConfig;
use crate::metrics::metrics;
use crate::observability::TraceContext;
use crate::rpc::NetworkClient;
use crate::tx_builder::{FlowError, FlowResult};
use crate::types::TransactionRecord;

/// What to do when a single signature fails to resolve
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolutionPolicy {
    /// Skip the entry, as if the node had no record
    #[default]
    Lenient,
    /// Fail the whole fetch with `ResolutionFailed`
    Strict,
}

pub struct HistoryFetcher {
    network: Arc<dyn NetworkClient>,
    policy: ResolutionPolicy,
    concurrency: usize,
}

impl HistoryFetcher {
    /// Lenient, sequential fetcher
    pub fn new(network: Arc<dyn NetworkClient>) -> Self {
        Self {
            network,
            policy: ResolutionPolicy::Lenient,
            concurrency: 1,
        }
    }

    pub fn from_config(network: Arc<dyn NetworkClient>, config: &HistoryConfig) -> Self {
        let policy = if config.strict {
            ResolutionPolicy::Strict
        } else {
            ResolutionPolicy::Lenient
        };
        Self::new(network)
            .with_policy(policy)
            .with_concurrency(config.concurrency)
    }

    pub fn with_policy(mut self, policy: ResolutionPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Resolve up to `concurrency` signatures at once; ordering is kept
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn policy(&self) -> ResolutionPolicy {
        self.policy
    }

    pub async fn fetch_history(&self, address: &Pubkey) -> FlowResult<Vec<TransactionRecord>> {
        let trace = TraceContext::new("fetch_history");
        let span = trace.span();
        self.fetch(address, &trace).instrument(span).await
    }

    async fn fetch(
        &self,
        address: &Pubkey,
        trace: &TraceContext,
    ) -> FlowResult<Vec<TransactionRecord>> {
        metrics().history_fetches.inc();

        let signatures = self
            .network
            .signatures_for_address(address)
            .await
            .map_err(|e| FlowError::network_unavailable(e.to_string()))?;
        debug!(%address, count = signatures.len(), "Listed signatures");

        let network = self.network.as_ref();
        let resolved: Vec<_> = stream::iter(signatures)
            .map(move |signature| async move {
                let outcome = network.resolve_transaction(&signature).await;
                (signature, outcome)
            })
            .buffered(self.concurrency)
            .collect()
            .await;

        let mut records = Vec::with_capacity(resolved.len());
        let mut skipped = 0usize;
        for (signature, outcome) in resolved {
            match outcome {
                Ok(Some(transaction)) => records.push(TransactionRecord::new(signature, transaction)),
                Ok(None) => {
                    debug!(%signature, "No record for signature");
                    skipped += 1;
                }
                Err(err) => match self.policy {
                    ResolutionPolicy::Strict => {
                        return Err(FlowError::ResolutionFailed {
                            signature,
                            reason: err.to_string(),
                        });
                    }
                    ResolutionPolicy::Lenient => {
                        warn!(%signature, error = %err, "Skipping unresolvable signature");
                        skipped += 1;
                    }
                },
            }
        }

        metrics().history_records.inc_by(records.len() as u64);
        metrics().history_skipped.inc_by(skipped as u64);
        info!(
            %address,
            records = records.len(),
            skipped,
            latency_ms = trace.elapsed_ms(),
            "History fetched"
        );
        Ok(records)
    }
}
