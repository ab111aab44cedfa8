//! URL handling for Site Tomograph
//!
//! This module provides URL normalization, seed intake hygiene, the SSRF
//! guard, and the same-domain scope rule.

mod guard;
mod normalize;

pub use guard::SsrfGuard;
pub(crate) use guard::is_internal_v4;
pub use normalize::{normalize_url, prepare_seed};

use url::Url;

/// Extracts the lowercase host from a URL
pub fn extract_host(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Same-domain scope rule for the crawl.
///
/// A candidate host is in scope when it equals the seed host or is a
/// dot-separated subdomain of it. Both sides are expected to be normalized
/// (lowercased, `www.` stripped), so `www.example.com` and `example.com`
/// compare equal and `blog.example.com` is in scope for seed `example.com`,
/// while `notexample.com` is not.
pub fn same_domain(seed_host: &str, candidate_host: &str) -> bool {
    candidate_host == seed_host
        || candidate_host
            .strip_suffix(seed_host)
            .is_some_and(|prefix| prefix.ends_with('.'))
}
