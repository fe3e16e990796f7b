//! Observability module for correlation and tracing

use std::time::Instant;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Correlation ID for tracking one user request across log lines
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct CorrelationId(String);

impl CorrelationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for CorrelationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for CorrelationId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Per-operation trace context.
///
/// Created at the start of a transfer or history fetch; its span carries
/// the ids on every event logged inside the operation.
#[derive(Debug, Clone)]
pub struct TraceContext {
    pub operation: &'static str,
    pub correlation_id: CorrelationId,
    trace_id: String,
    started: Instant,
}

impl TraceContext {
    pub fn new(operation: &'static str) -> Self {
        Self::with_correlation(operation, CorrelationId::new())
    }

    /// Continue an existing correlation under a new trace
    pub fn with_correlation(operation: &'static str, correlation_id: CorrelationId) -> Self {
        Self {
            operation,
            correlation_id,
            trace_id: Uuid::new_v4().simple().to_string(),
            started: Instant::now(),
        }
    }

    pub fn trace_id(&self) -> &str {
        &self.trace_id
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }

    /// Span to instrument the operation's future with
    pub fn span(&self) -> tracing::Span {
        tracing::info_span!(
            "operation",
            op = self.operation,
            trace_id = %self.trace_id,
            correlation_id = %self.correlation_id,
        )
    }
}
