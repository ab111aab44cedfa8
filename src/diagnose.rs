//! Diagnosis classifier
//!
//! A pure function from a completed fetch outcome to a terminal health
//! status. Degree-derived annotations (orphan, overload) are not statuses;
//! the report builder computes those from the final graph.

use crate::crawler::FetchOutcome;
use crate::graph::HealthStatus;

/// Classifies a resolved fetch.
///
/// - necrosis: transport failure, blocked or broken redirects, or an HTTP
///   4xx/5xx (a 5xx lands here only after retries are exhausted)
/// - blockage: responded, but slower than `latency_threshold_ms`
/// - healthy: everything else
pub fn classify(outcome: &FetchOutcome, latency_threshold_ms: u64) -> HealthStatus {
    match outcome {
        Err(_) => HealthStatus::Necrosis,
        Ok(page) => {
            if page.status_code >= 400 {
                HealthStatus::Necrosis
            } else if page.latency_ms > latency_threshold_ms {
                HealthStatus::Blockage
            } else {
                HealthStatus::Healthy
            }
        }
    }
}
