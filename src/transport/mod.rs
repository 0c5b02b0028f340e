//! Data transport for topology requests.
//!
//! The topology core never talks to a backend directly. It hands a
//! [`TopologyRequest`] to a [`TopologyTransport`] and gets a raw
//! [`TopologyResponse`] back. Retry policy, if any, belongs to the transport
//! implementation.

pub mod cache;
pub mod fixture;

use crate::core::Result;
use crate::topology::{RequestOptions, TopologyRequest, TopologyResponse};
use async_trait::async_trait;
use std::fmt;

pub use cache::CachingTransport;
pub use fixture::StaticTransport;

/// Identity of a logical consumer issuing requests (one per widget)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConsumerId(pub u64);

impl fmt::Display for ConsumerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "consumer-{}", self.0)
    }
}

/// Request/response query interface
#[async_trait]
pub trait TopologyTransport: Send + Sync {
    /// Execute one topology request on behalf of `consumer`
    async fn query(
        &self,
        consumer: ConsumerId,
        request: &TopologyRequest,
        options: RequestOptions,
    ) -> Result<TopologyResponse>;
}

#[async_trait]
impl<T: TopologyTransport + ?Sized> TopologyTransport for std::sync::Arc<T> {
    async fn query(
        &self,
        consumer: ConsumerId,
        request: &TopologyRequest,
        options: RequestOptions,
    ) -> Result<TopologyResponse> {
        (**self).query(consumer, request, options).await
    }
}
