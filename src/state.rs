//! Shared application state handed to every handler

use crate::clock::Clock;
use crate::config::{Config, Credential};
use crate::error::ApiError;
use crate::upstream::fanout::Concurrency;
use crate::upstream::fetch::UpstreamClient;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub upstream: UpstreamClient,
    pub clock: Arc<dyn Clock>,
}

impl AppState {
    pub fn new(config: Config, clock: Arc<dyn Clock>) -> anyhow::Result<Self> {
        Ok(AppState {
            config: Arc::new(config),
            upstream: UpstreamClient::new()?,
            clock,
        })
    }

    /// Credential for an upstream family, or a configuration error before any
    /// network call is attempted
    pub fn require(&self, credential: Credential) -> Result<&str, ApiError> {
        self.config
            .credential(credential)
            .ok_or(ApiError::MissingCredential(credential))
    }

    /// Concurrency used by the batched dashboard aggregations
    pub fn batching(&self) -> Concurrency {
        Concurrency::Batched(self.config.fanout_batch_size)
    }
}
