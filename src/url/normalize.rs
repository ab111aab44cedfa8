use crate::GuardError;
use url::Url;

/// Tracking query parameters removed during normalization
const TRACKING_PARAMS: &[&str] = &["fbclid", "gclid", "mc_eid", "ref", "source"];

/// Longest raw URL accepted from a caller
const MAX_URL_LEN: usize = 2048;

/// Prepares a raw seed URL string received from a client.
///
/// Trims whitespace, rejects empty or oversized input, and prefixes
/// `https://` when no scheme is present so bare hostnames are accepted.
pub fn prepare_seed(raw: &str) -> Result<String, GuardError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.len() > MAX_URL_LEN {
        return Err(GuardError::InvalidUrl);
    }

    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        Ok(trimmed.to_string())
    } else {
        Ok(format!("https://{}", trimmed))
    }
}

/// Normalizes a URL so that equivalent spellings map to one graph node.
///
/// Steps: parse; require http/https; lowercase the host and strip a leading
/// `www.`; collapse dot segments and duplicate slashes in the path; drop the
/// trailing slash (except root); drop the fragment; drop tracking query
/// parameters and sort the rest.
pub fn normalize_url(url_str: &str) -> Result<Url, GuardError> {
    let mut url = Url::parse(url_str).map_err(|_| GuardError::InvalidUrl)?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(GuardError::UnsupportedScheme);
    }

    let host = url.host_str().ok_or(GuardError::InvalidUrl)?;
    let mut host = host.to_lowercase();
    if let Some(stripped) = host.strip_prefix("www.") {
        host = stripped.to_string();
    }
    url.set_host(Some(&host))
        .map_err(|_| GuardError::InvalidUrl)?;

    let normalized_path = normalize_path(url.path());
    url.set_path(&normalized_path);

    url.set_fragment(None);

    if url.query().is_some() {
        let mut params: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(key, _)| !is_tracking_param(key))
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        params.sort_by(|a, b| a.0.cmp(&b.0));

        if params.is_empty() {
            url.set_query(None);
        } else {
            let query = params
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect::<Vec<_>>()
                .join("&");
            url.set_query(Some(&query));
        }
    }

    Ok(url)
}

/// Removes dot segments, duplicate slashes, and the trailing slash
fn normalize_path(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            "" | "." => continue,
            ".." => {
                segments.pop();
            }
            _ => segments.push(segment),
        }
    }

    if segments.is_empty() {
        return "/".to_string();
    }

    format!("/{}", segments.join("/"))
}

fn is_tracking_param(key: &str) -> bool {
    key.starts_with("utm_") || TRACKING_PARAMS.contains(&key)
}
