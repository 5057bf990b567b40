//! Shared, process-wide application state: the breaker registry, retry
//! queue, car fallback cache, upstream client, and configuration.

use std::sync::Arc;

use gateway_resilience::{BreakerRegistry, CarCache, RetryQueue};

use crate::client::UpstreamClient;
use crate::config::Config;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub client: UpstreamClient,
    pub breakers: Arc<BreakerRegistry>,
    pub retry_queue: Arc<RetryQueue>,
    pub car_cache: Arc<CarCache>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let config = Arc::new(config);
        let client = UpstreamClient::new(config.upstream_timeout);
        let retry_queue = RetryQueue::new(config.retry_interval, config.retry_max_attempts);
        Self {
            config,
            client,
            breakers: Arc::new(BreakerRegistry::new()),
            retry_queue,
            car_cache: Arc::new(CarCache::new()),
        }
    }
}
