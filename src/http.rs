use std::thread;
use std::time::Duration;

use tracing::{debug, warn};

use crate::config::AppConfig;
use crate::error::{Error, Result};

/// Anything that can turn a catalog URL into its HTML.
pub(crate) trait Fetch: Send + Sync {
    fn fetch_html(&self, target_url: &str) -> Result<String>;
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct RetryPolicy {
    pub(crate) connect_timeout: Duration,
    pub(crate) read_timeout: Duration,
    pub(crate) attempts: usize,
    pub(crate) retry_delay: Duration,
}

impl RetryPolicy {
    pub(crate) fn from_config(config: &AppConfig) -> Self {
        Self {
            connect_timeout: config.connect_timeout(),
            read_timeout: config.read_timeout(),
            attempts: config.fetch_attempts,
            retry_delay: config.retry_delay(),
        }
    }
}

/// Routes every catalog request through a CORS-bypass relay that takes the
/// percent-encoded target URL appended to its endpoint.
#[derive(Debug, Clone)]
pub(crate) struct ProxyFetcher {
    endpoint: String,
    policy: RetryPolicy,
}

impl ProxyFetcher {
    pub(crate) fn new(endpoint: impl Into<String>, policy: RetryPolicy) -> Self {
        Self {
            endpoint: endpoint.into(),
            policy,
        }
    }

    pub(crate) fn from_config(config: &AppConfig) -> Self {
        Self::new(config.proxy_endpoint.clone(), RetryPolicy::from_config(config))
    }

    pub(crate) fn proxied_url(&self, target_url: &str) -> String {
        format!("{}{}", self.endpoint, urlencoding::encode(target_url))
    }
}

impl Fetch for ProxyFetcher {
    fn fetch_html(&self, target_url: &str) -> Result<String> {
        debug!(target_url, "fetching through proxy");
        get_text_with_retries(&self.proxied_url(target_url), &self.policy)
    }
}

fn should_retry_http_status(status: u16) -> bool {
    status == 408 || status == 429 || (500..=599).contains(&status)
}

pub(crate) fn get_text_with_retries(url: &str, policy: &RetryPolicy) -> Result<String> {
    let attempts = policy.attempts.max(1);
    let agent = ureq::AgentBuilder::new()
        .timeout_connect(policy.connect_timeout)
        .timeout_read(policy.read_timeout)
        .timeout_write(policy.read_timeout)
        .build();

    for attempt in 1..=attempts {
        let retry_left = attempt < attempts;
        let failure = match agent.get(url).set("Accept", "text/html").call() {
            Ok(response) => {
                // A body we cannot decode is never handed out half-read.
                return response
                    .into_string()
                    .map_err(|err| Error::FetchFailure(format!("response decode failed: {err}")));
            }
            Err(ureq::Error::Status(status, response)) => {
                let snippet = response
                    .into_string()
                    .unwrap_or_default()
                    .trim()
                    .chars()
                    .take(240)
                    .collect::<String>();
                let detail = if snippet.is_empty() {
                    format!("HTTP status {status}")
                } else {
                    format!("HTTP status {status} ({snippet})")
                };
                if !should_retry_http_status(status) {
                    return Err(Error::FetchFailure(detail));
                }
                detail
            }
            Err(ureq::Error::Transport(err)) => format!("transport error: {err}"),
        };

        if retry_left {
            warn!(attempt, attempts, failure = %failure, "fetch failed, retrying");
            thread::sleep(policy.retry_delay);
            continue;
        }
        return Err(Error::FetchFailure(format!(
            "failed after {attempts} attempt(s): {failure}"
        )));
    }

    Err(Error::FetchFailure(
        "exhausted attempts without a concrete error".to_string(),
    ))
}
