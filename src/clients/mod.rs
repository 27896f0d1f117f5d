pub mod accounts;
pub mod case_server;
pub mod parties;

pub use accounts::HttpAccountLookup;
pub use case_server::HttpCaseServer;
pub use parties::HttpPartyLookup;

use failsafe::{backoff, failure_policy, Config as BreakerConfig, StateMachine};
use reqwest::Client;
use std::time::Duration;
use url::Url;

use crate::config::Config;

pub(crate) type LookupCircuitBreaker =
    StateMachine<failure_policy::ConsecutiveFailures<backoff::EqualJittered>, ()>;

/// Connection settings shared by the lookup clients.
#[derive(Debug, Clone)]
pub struct LookupSettings {
    pub timeout: Duration,
    pub failure_threshold: u32,
    pub reset_timeout: Duration,
}

impl Default for LookupSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            failure_threshold: 3,
            reset_timeout: Duration::from_secs(60),
        }
    }
}

impl From<&Config> for LookupSettings {
    fn from(config: &Config) -> Self {
        Self {
            timeout: Duration::from_secs(config.lookup_timeout_secs),
            failure_threshold: config.lookup_failure_threshold,
            reset_timeout: Duration::from_secs(config.lookup_reset_timeout_secs),
        }
    }
}

pub(crate) fn build_http_client(timeout: Duration) -> Client {
    Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_default()
}

/// `{base_url}/{collection}/{id}` with `id` percent-encoded as one path segment.
pub(crate) fn resource_url(base_url: &str, collection: &str, id: &str) -> Result<Url, String> {
    let mut url =
        Url::parse(base_url).map_err(|e| format!("invalid base URL {}: {}", base_url, e))?;
    url.path_segments_mut()
        .map_err(|_| format!("base URL {} cannot carry a path", base_url))?
        .pop_if_empty()
        .push(collection)
        .push(id);
    Ok(url)
}

pub(crate) fn build_circuit_breaker(settings: &LookupSettings) -> LookupCircuitBreaker {
    let backoff = backoff::equal_jittered(settings.reset_timeout, settings.reset_timeout * 2);
    let policy = failure_policy::consecutive_failures(settings.failure_threshold, backoff);
    BreakerConfig::new().failure_policy(policy).build()
}
