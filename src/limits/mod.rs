//! Rate governor: scan admission control
//!
//! Two independent limits, both enforced before a session is created:
//!
//! - per-client-IP: a sliding 60-second window of scan-initiation requests
//! - global: a cap on concurrently active sessions across the process
//!
//! The governor is the only cross-session mutable state besides nothing at
//! all (robots caches are per-session), so all access goes through one mutex.
//! A successful admission yields a [`ScanPermit`] whose `Drop` releases the
//! global slot, tying slot lifetime to session lifetime.

use crate::config::LimitsConfig;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use thiserror::Error;

/// Window width for the per-IP scan-start limit
const WINDOW: Duration = Duration::from_secs(60);

/// Admission refusals. Neither is retried internally; the caller retries later.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdmissionError {
    #[error("Too many scan requests; retry in {retry_after_secs} seconds")]
    RateLimited { retry_after_secs: u64 },

    #[error("Scanner is at capacity; try again later")]
    CapacityExceeded,
}

#[derive(Debug, Default)]
struct GovernorState {
    /// Scan-start timestamps per client IP, pruned to the window on access
    requests: HashMap<String, Vec<Instant>>,

    /// Sessions currently holding a permit
    active_sessions: usize,
}

/// Process-wide admission controller.
///
/// Initialized once at process start and shared via `Arc`; it outlives every
/// session it admits.
#[derive(Debug)]
pub struct RateGovernor {
    scans_per_minute: usize,
    max_active_sessions: usize,
    state: Mutex<GovernorState>,
}

impl RateGovernor {
    pub fn new(config: &LimitsConfig) -> Arc<Self> {
        Arc::new(Self {
            scans_per_minute: config.scans_per_minute,
            max_active_sessions: config.max_active_sessions,
            state: Mutex::new(GovernorState::default()),
        })
    }

    /// Requests admission for a new scan from `client_ip`.
    ///
    /// Checks the global session cap first, then the per-IP window. On
    /// success the request is recorded and a permit holding one global slot
    /// is returned.
    pub fn admit(self: &Arc<Self>, client_ip: &str) -> Result<ScanPermit, AdmissionError> {
        let mut state = self.state.lock().expect("governor mutex poisoned");
        let now = Instant::now();

        if state.active_sessions >= self.max_active_sessions {
            return Err(AdmissionError::CapacityExceeded);
        }

        let timestamps = state.requests.entry(client_ip.to_string()).or_default();
        timestamps.retain(|t| now.duration_since(*t) < WINDOW);

        if timestamps.len() >= self.scans_per_minute {
            let oldest = timestamps[0];
            let retry_after = WINDOW.saturating_sub(now.duration_since(oldest));
            return Err(AdmissionError::RateLimited {
                retry_after_secs: retry_after.as_secs().max(1),
            });
        }

        timestamps.push(now);
        state.active_sessions += 1;

        // Drop window entries for IPs that have gone quiet
        state
            .requests
            .retain(|_, times| times.iter().any(|t| now.duration_since(*t) < WINDOW));

        Ok(ScanPermit {
            governor: Arc::clone(self),
        })
    }

    /// Number of sessions currently holding a permit
    pub fn active_sessions(&self) -> usize {
        self.state.lock().expect("governor mutex poisoned").active_sessions
    }

    fn release(&self) {
        let mut state = self.state.lock().expect("governor mutex poisoned");
        state.active_sessions = state.active_sessions.saturating_sub(1);
    }
}

/// A held global-concurrency slot; released on drop.
#[derive(Debug)]
pub struct ScanPermit {
    governor: Arc<RateGovernor>,
}

impl Drop for ScanPermit {
    fn drop(&mut self) {
        self.governor.release();
    }
}
