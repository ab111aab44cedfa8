//! robots.txt policy cache
//!
//! One `/robots.txt` fetch per host per session, with a short timeout. The
//! policy is deliberately fail-open: a host without robots.txt, an error
//! response, or a fetch failure all mean "allow", so a missing file never
//! starves the crawl. Matching is delegated to the `robotstxt` crate.

use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use robotstxt::DefaultMatcher;
use std::collections::HashMap;
use url::Url;

/// How long a fetched policy stays valid within a session
const POLICY_TTL_MINUTES: i64 = 60;

/// Timeout for the robots.txt fetch itself
const ROBOTS_FETCH_TIMEOUT_SECS: u64 = 5;

/// Cached per-host robots.txt rules
#[derive(Debug, Clone)]
pub struct CachedPolicy {
    /// Raw robots.txt body; `None` means the fetch failed and everything is
    /// allowed (fail-open)
    body: Option<String>,

    /// When the policy was fetched
    fetched_at: DateTime<Utc>,
}

impl CachedPolicy {
    fn allow_all() -> Self {
        Self {
            body: None,
            fetched_at: Utc::now(),
        }
    }

    fn from_body(body: String) -> Self {
        Self {
            body: Some(body),
            fetched_at: Utc::now(),
        }
    }

    fn is_expired(&self) -> bool {
        Utc::now() - self.fetched_at > Duration::minutes(POLICY_TTL_MINUTES)
    }

    /// Checks whether `url` is allowed for `user_agent` under this policy
    pub fn is_allowed(&self, url: &str, user_agent: &str) -> bool {
        match &self.body {
            None => true,
            Some(body) => {
                let mut matcher = DefaultMatcher::default();
                matcher.one_agent_allowed_by_robots(body, user_agent, url)
            }
        }
    }
}

/// Session-scoped robots.txt cache, one entry per host.
///
/// Owned by a single session's scheduler task; no cross-session sharing, so
/// no locking is needed. A fresh fetch per session is acceptable and simpler.
pub struct RobotsCache {
    client: Client,
    user_agent: String,
    entries: HashMap<String, CachedPolicy>,
}

impl RobotsCache {
    pub fn new(client: Client, user_agent: String) -> Self {
        Self {
            client,
            user_agent,
            entries: HashMap::new(),
        }
    }

    /// Answers whether `url` may be fetched, consulting the cached per-host
    /// policy and fetching `/robots.txt` lazily on first contact with a host.
    pub async fn is_allowed(&mut self, url: &Url) -> bool {
        let host = match url.host_str() {
            Some(h) => h.to_lowercase(),
            None => return false,
        };

        let needs_fetch = match self.entries.get(&host) {
            Some(policy) => policy.is_expired(),
            None => true,
        };

        if needs_fetch {
            let policy = self.fetch_policy(url).await;
            self.entries.insert(host.clone(), policy);
        }

        self.entries
            .get(&host)
            .map(|policy| policy.is_allowed(url.as_str(), &self.user_agent))
            .unwrap_or(true)
    }

    async fn fetch_policy(&self, url: &Url) -> CachedPolicy {
        let mut robots_url = url.clone();
        robots_url.set_path("/robots.txt");
        robots_url.set_query(None);
        robots_url.set_fragment(None);

        tracing::debug!("Fetching robots.txt: {}", robots_url);

        let response = self
            .client
            .get(robots_url.as_str())
            .timeout(std::time::Duration::from_secs(ROBOTS_FETCH_TIMEOUT_SECS))
            .send()
            .await;

        match response {
            Ok(resp) if resp.status().is_success() => match resp.text().await {
                Ok(body) => CachedPolicy::from_body(body),
                Err(_) => CachedPolicy::allow_all(),
            },
            // 4xx/5xx on robots.txt means no policy, allow everything
            Ok(_) => CachedPolicy::allow_all(),
            Err(e) => {
                tracing::debug!("robots.txt fetch failed ({}), allowing all", e);
                CachedPolicy::allow_all()
            }
        }
    }

    /// Number of hosts with a cached policy
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allow_all_policy() {
        let policy = CachedPolicy::allow_all();
        assert!(policy.is_allowed("https://example.com/any", "TestBot"));
        assert!(policy.is_allowed("https://example.com/admin", "TestBot"));
    }

    #[test]
    fn test_disallow_all() {
        let policy = CachedPolicy::from_body("User-agent: *\nDisallow: /".to_string());
        assert!(!policy.is_allowed("https://example.com/", "TestBot"));
        assert!(!policy.is_allowed("https://example.com/page", "TestBot"));
    }

    #[test]
    fn test_disallow_prefix() {
        let policy = CachedPolicy::from_body("User-agent: *\nDisallow: /admin".to_string());
        assert!(policy.is_allowed("https://example.com/", "TestBot"));
        assert!(policy.is_allowed("https://example.com/page", "TestBot"));
        assert!(!policy.is_allowed("https://example.com/admin", "TestBot"));
        assert!(!policy.is_allowed("https://example.com/admin/users", "TestBot"));
    }

    #[test]
    fn test_allow_overrides_disallow() {
        let policy = CachedPolicy::from_body(
            "User-agent: *\nDisallow: /private\nAllow: /private/public".to_string(),
        );
        assert!(!policy.is_allowed("https://example.com/private", "TestBot"));
        assert!(policy.is_allowed("https://example.com/private/public", "TestBot"));
    }

    #[test]
    fn test_specific_user_agent() {
        let policy = CachedPolicy::from_body(
            "User-agent: BadBot\nDisallow: /\n\nUser-agent: *\nAllow: /".to_string(),
        );
        assert!(policy.is_allowed("https://example.com/page", "GoodBot"));
        assert!(!policy.is_allowed("https://example.com/page", "BadBot"));
    }

    #[test]
    fn test_malformed_body_fails_open() {
        let policy = CachedPolicy::from_body("not a robots file {{{".to_string());
        assert!(policy.is_allowed("https://example.com/any", "TestBot"));
    }

    #[test]
    fn test_expiry() {
        let mut policy = CachedPolicy::allow_all();
        assert!(!policy.is_expired());
        policy.fetched_at = Utc::now() - Duration::minutes(POLICY_TTL_MINUTES + 1);
        assert!(policy.is_expired());
    }
}
