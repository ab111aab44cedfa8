//! Session event stream
//!
//! [`ScanEvent`] is the closed set of frames the engine emits; the
//! [`EventEmitter`] is the session's only point of contact with whatever
//! transport relays them. Events serialize as JSON objects tagged by a
//! `type` field, one frame per event.

use crate::graph::HealthStatus;
use crate::report::Report;
use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;
use tokio::sync::mpsc::UnboundedSender;

/// Outbound event frames, tagged by `type`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScanEvent {
    /// First discovery of a URL
    NodeDiscovered { id: String, url: String, depth: u32 },

    /// Edge creation; both endpoints have already been discovered
    LinkDiscovered { source: String, target: String },

    /// Fetch resolution for a node
    DiagnosisUpdate {
        id: String,
        status: HealthStatus,
        status_code: Option<u16>,
        latency: Option<u64>,
    },

    /// The node-count cap was hit; no further nodes will be discovered
    LimitReached { message: String },

    /// Session terminated on the success path
    ScanComplete { report: Report },

    /// Fatal session error, message sanitized
    Error { message: String },
}

/// Sends engine events to the external transport.
///
/// Send failures mean the receiving side is gone; the session keeps running
/// to completion and the frames are dropped.
#[derive(Debug, Clone)]
pub struct EventEmitter {
    tx: UnboundedSender<ScanEvent>,
}

impl EventEmitter {
    pub fn new(tx: UnboundedSender<ScanEvent>) -> Self {
        Self { tx }
    }

    pub fn emit(&self, event: ScanEvent) {
        if self.tx.send(event).is_err() {
            tracing::trace!("event receiver dropped, frame discarded");
        }
    }

    pub fn node_discovered(&self, id: String, url: String, depth: u32) {
        self.emit(ScanEvent::NodeDiscovered { id, url, depth });
    }

    pub fn link_discovered(&self, source: String, target: String) {
        self.emit(ScanEvent::LinkDiscovered { source, target });
    }

    pub fn diagnosis_update(
        &self,
        id: String,
        status: HealthStatus,
        status_code: Option<u16>,
        latency: Option<u64>,
    ) {
        self.emit(ScanEvent::DiagnosisUpdate {
            id,
            status,
            status_code,
            latency,
        });
    }

    pub fn limit_reached(&self, message: String) {
        self.emit(ScanEvent::LimitReached { message });
    }

    pub fn scan_complete(&self, report: Report) {
        self.emit(ScanEvent::ScanComplete { report });
    }

    pub fn error(&self, message: &str) {
        self.emit(ScanEvent::Error {
            message: sanitize_message(message),
        });
    }
}

/// Maximum length of a user-visible error message
const MAX_MESSAGE_LEN: usize = 200;

/// Strips internals from an error message before it leaves the process.
///
/// Filesystem paths and internal IP literals are replaced with placeholders
/// and the result is truncated. Only generic category text should reach a
/// remote viewer.
pub fn sanitize_message(message: &str) -> String {
    let mut sanitized = message.to_string();

    for prefix in ["/home/", "/var/", "/etc/", "/usr/", "/tmp/"] {
        while let Some(pos) = sanitized.find(prefix) {
            let end = sanitized[pos..]
                .find(char::is_whitespace)
                .map(|o| pos + o)
                .unwrap_or(sanitized.len());
            sanitized.replace_range(pos..end, "[path]");
        }
    }

    let mut sanitized = mask_internal_ips(&sanitized);

    if sanitized.len() > MAX_MESSAGE_LEN {
        let mut cut = MAX_MESSAGE_LEN;
        while !sanitized.is_char_boundary(cut) {
            cut -= 1;
        }
        sanitized.truncate(cut);
        sanitized.push_str("...");
    }

    sanitized
}

/// Replaces internal IPv4 literals, and a trailing `:port`, with a
/// placeholder. Candidates are parsed as addresses rather than matched by
/// string prefix, so version strings like "HTTP/1.0" and public addresses
/// pass through untouched while the whole 172.16.0.0/12 range is caught.
fn mask_internal_ips(message: &str) -> String {
    let mut out = String::with_capacity(message.len());
    let mut rest = message;

    while let Some(start) = rest.find(|c: char| c.is_ascii_digit()) {
        let (head, tail) = rest.split_at(start);
        out.push_str(head);

        let end = tail
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(tail.len());
        let candidate = &tail[..end];
        let addr = candidate.trim_end_matches('.');

        match addr.parse::<Ipv4Addr>() {
            Ok(parsed) if crate::url::is_internal_v4(parsed) => {
                out.push_str("[internal]");
                // Trailing dots were sentence punctuation, keep them
                out.push_str(&candidate[addr.len()..]);
                rest = strip_port(&tail[end..]);
            }
            _ => {
                out.push_str(candidate);
                rest = &tail[end..];
            }
        }
    }

    out.push_str(rest);
    out
}

/// Drops a `:port` suffix left dangling after a masked address
fn strip_port(text: &str) -> &str {
    if let Some(after_colon) = text.strip_prefix(':') {
        let digits = after_colon
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(after_colon.len());
        if digits > 0 {
            return &after_colon[digits..];
        }
    }
    text
}
