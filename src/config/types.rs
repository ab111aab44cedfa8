use serde::Deserialize;

/// Main configuration structure for Site Tomograph
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub scan: ScanConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub limits: LimitsConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            scan: ScanConfig::default(),
            user_agent: UserAgentConfig::default(),
            limits: LimitsConfig::default(),
        }
    }
}

/// Per-session scan behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Maximum link depth from the seed URL (seed is depth 0)
    #[serde(rename = "max-depth")]
    pub max_depth: u32,

    /// Maximum number of nodes a session may discover
    #[serde(rename = "max-pages")]
    pub max_pages: usize,

    /// Latency above this threshold classifies a page as blockage (milliseconds)
    #[serde(rename = "latency-threshold-ms")]
    pub latency_threshold_ms: u64,

    /// Maximum number of concurrent in-flight fetches per session
    #[serde(rename = "max-concurrent-fetches")]
    pub max_concurrent_fetches: usize,

    /// Per-attempt fetch timeout (milliseconds)
    #[serde(rename = "fetch-timeout-ms")]
    pub fetch_timeout_ms: u64,

    /// Maximum retries after the initial attempt, 5xx responses only
    #[serde(rename = "max-retries")]
    pub max_retries: u32,

    /// Base backoff delay, doubled per retry (milliseconds)
    #[serde(rename = "retry-base-delay-ms")]
    pub retry_base_delay_ms: u64,

    /// Maximum redirect hops per fetch
    #[serde(rename = "max-redirects")]
    pub max_redirects: u32,

    /// Permit loopback targets (mock servers in tests). Private-range and
    /// metadata addresses stay blocked regardless of this switch.
    #[serde(rename = "allow-loopback")]
    pub allow_loopback: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            max_depth: 3,
            max_pages: 100,
            latency_threshold_ms: 2000,
            max_concurrent_fetches: 5,
            fetch_timeout_ms: 10_000,
            max_retries: 3,
            retry_base_delay_ms: 250,
            max_redirects: 5,
            allow_loopback: false,
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UserAgentConfig {
    /// Name of the scanner
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the scanner
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the scanner
    #[serde(rename = "contact-url")]
    pub contact_url: String,
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            crawler_name: "SiteTomograph".to_string(),
            crawler_version: env!("CARGO_PKG_VERSION").to_string(),
            contact_url: "https://example.com/tomograph".to_string(),
        }
    }
}

impl UserAgentConfig {
    /// Formats the User-Agent header value: Name/Version (+ContactURL)
    pub fn header_value(&self) -> String {
        format!(
            "{}/{} (+{})",
            self.crawler_name, self.crawler_version, self.contact_url
        )
    }
}

/// Process-wide admission limits
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Scan-initiation requests allowed per client IP per minute
    #[serde(rename = "scans-per-minute")]
    pub scans_per_minute: usize,

    /// Sessions allowed to run concurrently across the whole process
    #[serde(rename = "max-active-sessions")]
    pub max_active_sessions: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            scans_per_minute: 5,
            max_active_sessions: 10,
        }
    }
}
