//! Single interaction execution and outcome classification.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tokio::time::Instant;
use tracing::trace;

use crate::error::TransportError;
use crate::metrics::MetricsSink;
use crate::session::Session;

/// Header carrying the session id on every request.
pub const SESSION_HEADER: &str = "x-session-id";

/// JSON body sent for each interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct InteractionPayload<'a> {
    pub action: &'a str,
    #[serde(rename = "sessionId")]
    pub session_id: &'a str,
}

/// Everything a transport needs to issue one interaction.
#[derive(Debug, Clone, Copy)]
pub struct InteractionRequest<'a> {
    pub target: &'a str,
    pub payload: InteractionPayload<'a>,
}

impl<'a> InteractionRequest<'a> {
    /// Header name and value identifying the session.
    pub fn session_header(&self) -> (&'static str, &'a str) {
        (SESSION_HEADER, self.payload.session_id)
    }
}

/// Pluggable client used to reach the target.
///
/// Returns the response status code, or a [`TransportError`] when no
/// response was received. Connection pooling is the transport's concern.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: InteractionRequest<'_>) -> Result<u16, TransportError>;
}

/// Classified result of one interaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Success { status: u16 },
    /// Response received with status >= 300
    ResponseError { status: u16 },
    TransportFailure(TransportError),
}

impl Outcome {
    pub fn from_status(status: u16) -> Self {
        if status >= 300 {
            Outcome::ResponseError { status }
        } else {
            Outcome::Success { status }
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success { .. })
    }
}

/// One dispatched interaction, reported and then dropped.
#[derive(Debug, Clone)]
pub struct Interaction {
    pub action: String,
    pub session_id: String,
    pub outcome: Outcome,
    /// `None` when no response was received
    pub latency: Option<Duration>,
}

/// Issues interactions against the target and reports them to a sink.
///
/// Cheap to clone; every clone shares the transport and sink.
#[derive(Clone)]
pub struct RequestExecutor {
    target: Arc<str>,
    transport: Arc<dyn Transport>,
    sink: Arc<dyn MetricsSink>,
}

impl RequestExecutor {
    pub fn new(
        target: impl Into<Arc<str>>,
        transport: Arc<dyn Transport>,
        sink: Arc<dyn MetricsSink>,
    ) -> Self {
        Self {
            target: target.into(),
            transport,
            sink,
        }
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn sink(&self) -> &Arc<dyn MetricsSink> {
        &self.sink
    }

    /// Execute one interaction.
    ///
    /// Increments exactly one of the success/error counters and, when a
    /// response came back, records one latency observation. Never fails.
    pub async fn execute(&self, session: Session) -> Interaction {
        let request = InteractionRequest {
            target: &self.target,
            payload: InteractionPayload {
                action: &session.action,
                session_id: &session.session_id,
            },
        };

        let start = Instant::now();
        let result = self.transport.send(request).await;

        let (outcome, latency) = match result {
            Ok(status) => {
                let latency = start.elapsed();
                self.sink.observe_duration(latency);
                (Outcome::from_status(status), Some(latency))
            }
            Err(e) => (Outcome::TransportFailure(e), None),
        };

        if outcome.is_success() {
            self.sink.record_success();
        } else {
            self.sink.record_error();
            trace!(
                action = %session.action,
                session_id = %session.session_id,
                outcome = ?outcome,
                "Interaction failed"
            );
        }

        Interaction {
            action: session.action,
            session_id: session.session_id,
            outcome,
            latency,
        }
    }
}
