//! Transport serving recorded responses.

use super::{ConsumerId, TopologyTransport};
use crate::core::{Result, TopographError};
use crate::topology::{RequestOptions, TopologyRequest, TopologyResponse};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Serves queued responses in order, repeating the last one once the queue
/// is down to a single entry. Used by the CLI and by tests.
#[derive(Debug, Default)]
pub struct StaticTransport {
    responses: Mutex<VecDeque<Result<TopologyResponse>>>,
    latency: Option<Duration>,
    calls: AtomicUsize,
}

impl StaticTransport {
    /// Transport answering every request with `response`
    pub fn new(response: TopologyResponse) -> Self {
        Self::from_sequence(vec![Ok(response)])
    }

    /// Transport answering requests with `responses` in order
    pub fn from_sequence(responses: Vec<Result<TopologyResponse>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            latency: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Load a recorded JSON response from disk
    pub async fn from_file(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path).await?;
        Ok(Self::new(TopologyResponse::from_json(&content)?))
    }

    /// Delay every answer by `latency`
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Number of requests that reached this transport
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn next_response(&self) -> Result<TopologyResponse> {
        let mut responses = self.responses.lock();
        let next = if responses.len() > 1 {
            responses.pop_front()
        } else {
            responses.front().map(|response| match response {
                Ok(response) => Ok(response.clone()),
                Err(e) => Err(TopographError::transport(e.to_string())),
            })
        };
        next.unwrap_or_else(|| Err(TopographError::transport("no recorded response")))
    }
}

#[async_trait]
impl TopologyTransport for StaticTransport {
    async fn query(
        &self,
        consumer: ConsumerId,
        request: &TopologyRequest,
        _options: RequestOptions,
    ) -> Result<TopologyResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tracing::debug!(%consumer, key = %request.cache_key(), "serving recorded topology response");
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        self.next_response()
    }
}
