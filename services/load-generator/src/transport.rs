//! HTTP transport backed by a pooled reqwest client.

use async_trait::async_trait;
use loadgen::{InteractionRequest, Transport, TransportError};
use reqwest::Client;

use crate::config::TransportSettings;

/// Sends interactions as JSON POST requests.
///
/// A single client is shared by every request, so connections are pooled
/// across a tick's batch.
#[derive(Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(settings: TransportSettings) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(settings.request_timeout)
            .connect_timeout(settings.connect_timeout)
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: InteractionRequest<'_>) -> Result<u16, TransportError> {
        let (header, session_id) = request.session_header();

        let response = self
            .client
            .post(request.target)
            .header(header, session_id)
            .json(&request.payload)
            .send()
            .await
            .map_err(classify)?;

        let status = response.status().as_u16();
        // Drain the body so the connection returns to the pool
        let _ = response.bytes().await;
        Ok(status)
    }
}

fn classify(error: reqwest::Error) -> TransportError {
    if error.is_timeout() {
        TransportError::Timeout
    } else if error.is_connect() {
        TransportError::Connect(error.to_string())
    } else {
        TransportError::Request(error.to_string())
    }
}
