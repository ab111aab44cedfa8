//! HTTP fetcher
//!
//! One fetch call drives the whole request lifecycle for a page:
//!
//! - full SSRF validation of the target, resolved addresses included,
//!   before the first request
//! - per-attempt timeout
//! - manual redirect following (the client's own redirect policy is disabled)
//!   with every hop re-validated by the SSRF guard
//! - retry with exponential backoff and jitter for 5xx responses only; 4xx
//!   is a structural defect and transport failures are terminal
//! - latency measured as the wall-clock time of the attempt that produced
//!   the final outcome

use crate::config::{ScanConfig, UserAgentConfig};
use crate::url::SsrfGuard;
use crate::GuardError;
use rand::Rng;
use reqwest::{redirect::Policy, Client, StatusCode};
use std::collections::HashSet;
use std::time::{Duration, Instant};
use thiserror::Error;
use url::Url;

/// Terminal fetch failures. None of these are retried; the page they belong
/// to is classified necrosis.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchFailure {
    #[error("Target is not allowed")]
    BlockedTarget(#[source] GuardError),

    #[error("Request timed out")]
    Timeout,

    #[error("Connection failed")]
    Connect,

    #[error("Too many redirects")]
    TooManyRedirects,

    #[error("Redirect loop detected")]
    RedirectLoop,

    #[error("Redirect target is not allowed")]
    BlockedRedirect(#[source] GuardError),

    #[error("Transport error")]
    Transport,
}

/// A fetch that produced an HTTP response (any status code)
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// Final URL after redirects, normalized by the caller if needed
    pub final_url: Url,
    pub status_code: u16,
    /// Wall-clock time of the final attempt
    pub latency_ms: u64,
    /// Body text, read only for 200 responses (link extraction input)
    pub body: Option<String>,
    /// 5xx retries performed before this outcome
    pub retries: u32,
}

/// Outcome of fetching one page
pub type FetchOutcome = Result<FetchedPage, FetchFailure>;

/// Builds the shared HTTP client for a session
pub fn build_http_client(user_agent: &UserAgentConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(user_agent.header_value())
        .connect_timeout(Duration::from_secs(10))
        .redirect(Policy::none()) // redirects handled manually, see fetch()
        .gzip(true)
        .brotli(true)
        .build()
}

/// Issues HTTP requests for one session
pub struct Fetcher {
    client: Client,
    guard: SsrfGuard,
    timeout: Duration,
    max_retries: u32,
    retry_base_delay: Duration,
    max_redirects: u32,
}

impl Fetcher {
    pub fn new(client: Client, guard: SsrfGuard, config: &ScanConfig) -> Self {
        Self {
            client,
            guard,
            timeout: Duration::from_millis(config.fetch_timeout_ms),
            max_retries: config.max_retries,
            retry_base_delay: Duration::from_millis(config.retry_base_delay_ms),
            max_redirects: config.max_redirects,
        }
    }

    /// Fetches `url`, following redirects and retrying 5xx responses.
    ///
    /// The target passes the full SSRF gate first, DNS resolution included.
    /// The frontier's literal check cannot catch a public-looking name that
    /// resolves to a private address, so the resolved-address check runs
    /// here, before the first request goes out.
    pub async fn fetch(&self, url: &Url) -> FetchOutcome {
        self.guard
            .validate(url)
            .await
            .map_err(FetchFailure::BlockedTarget)?;

        let mut retries = 0u32;

        loop {
            let started = Instant::now();
            let result = self.fetch_following_redirects(url).await;
            let latency_ms = started.elapsed().as_millis() as u64;

            match result {
                Ok((final_url, response)) => {
                    let status = response.status();

                    if status.is_server_error() && retries < self.max_retries {
                        let delay = self.backoff_delay(retries);
                        tracing::debug!(
                            "HTTP {} from {}, retry {} in {:?}",
                            status.as_u16(),
                            url,
                            retries + 1,
                            delay
                        );
                        tokio::time::sleep(delay).await;
                        retries += 1;
                        continue;
                    }

                    let body = if status == StatusCode::OK {
                        response.text().await.ok()
                    } else {
                        None
                    };

                    return Ok(FetchedPage {
                        final_url,
                        status_code: status.as_u16(),
                        latency_ms,
                        body,
                        retries,
                    });
                }
                Err(failure) => return Err(failure),
            }
        }
    }

    /// One attempt: issues the request and walks the redirect chain, passing
    /// every hop back through the SSRF guard. A URL that starts safe but
    /// redirects into a private network is rejected here.
    async fn fetch_following_redirects(
        &self,
        url: &Url,
    ) -> Result<(Url, reqwest::Response), FetchFailure> {
        let mut current = url.clone();
        let mut seen: HashSet<String> = HashSet::new();
        seen.insert(current.to_string());

        for _ in 0..=self.max_redirects {
            let response = self
                .client
                .get(current.as_str())
                .timeout(self.timeout)
                .send()
                .await
                .map_err(classify_transport_error)?;

            if !response.status().is_redirection() {
                return Ok((current, response));
            }

            let location = response
                .headers()
                .get(reqwest::header::LOCATION)
                .and_then(|v| v.to_str().ok())
                .ok_or(FetchFailure::Transport)?;

            let next = current
                .join(location)
                .map_err(|_| FetchFailure::Transport)?;

            self.guard
                .validate(&next)
                .await
                .map_err(FetchFailure::BlockedRedirect)?;

            if !seen.insert(next.to_string()) {
                return Err(FetchFailure::RedirectLoop);
            }

            tracing::trace!("Redirect: {} -> {}", current, next);
            current = next;
        }

        Err(FetchFailure::TooManyRedirects)
    }

    /// Exponential backoff with uniform jitter of up to half the base delay
    fn backoff_delay(&self, retries_so_far: u32) -> Duration {
        let base = self.retry_base_delay * 2u32.saturating_pow(retries_so_far);
        let jitter_cap = (self.retry_base_delay.as_millis() as u64 / 2).max(1);
        let jitter = rand::thread_rng().gen_range(0..jitter_cap);
        base + Duration::from_millis(jitter)
    }
}

fn classify_transport_error(e: reqwest::Error) -> FetchFailure {
    if e.is_timeout() {
        FetchFailure::Timeout
    } else if e.is_connect() {
        FetchFailure::Connect
    } else {
        FetchFailure::Transport
    }
}
