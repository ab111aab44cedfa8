//! Crawl session: the frontier/scheduler state machine
//!
//! One session owns one graph, one frontier, and one visited set. The drive
//! loop is a single task; fetches run concurrently in a bounded `JoinSet`,
//! and every graph mutation happens on the drive task when a fetch joins, so
//! the graph needs no locking.
//!
//! Frontier discipline is depth-first (a stack), bounded by the configured
//! max depth, the same-domain rule, and the node-count cap. The visited set
//! guarantees a URL is discovered at most once per session.

use crate::config::Config;
use crate::crawler::extractor::extract_links;
use crate::crawler::fetcher::{build_http_client, FetchOutcome, Fetcher};
use crate::diagnose::classify;
use crate::events::EventEmitter;
use crate::graph::PageGraph;
use crate::limits::ScanPermit;
use crate::report::{build_report, Report};
use crate::robots::RobotsCache;
use crate::url::{extract_host, normalize_url, prepare_seed, same_domain, SsrfGuard};
use crate::{Result, ScanError};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::task::JoinSet;
use url::Url;

/// Why a session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// Frontier exhausted with no work in flight
    Completed,
    /// Node-count cap reached; in-flight work was allowed to settle
    LimitReached,
    /// Stop requested; in-flight work was allowed to settle
    Stopped,
    /// Unrecoverable internal fault
    Error,
}

/// Requests cooperative cancellation of a running session.
///
/// Stopping is not an abort: the session stops accepting frontier entries
/// and transitions to `Stopped` once in-flight fetches settle.
#[derive(Debug, Clone)]
pub struct StopHandle {
    flag: Arc<AtomicBool>,
}

impl StopHandle {
    pub fn stop(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }
}

/// A discovered node awaiting its fetch
struct FrontierEntry {
    node: usize,
    url: Url,
}

/// One bounded, same-domain structural scan.
pub struct CrawlSession {
    config: Config,
    fetcher: Arc<Fetcher>,
    robots: RobotsCache,
    guard: SsrfGuard,
    graph: PageGraph,
    frontier: Vec<FrontierEntry>,
    visited: HashSet<String>,
    seed_url: Url,
    seed_host: String,
    emitter: EventEmitter,
    stop: Arc<AtomicBool>,
    limit_hit: bool,
    /// Global-concurrency slot; released when the session is dropped
    _permit: Option<ScanPermit>,
}

impl CrawlSession {
    /// Validates the seed and prepares a session.
    ///
    /// The seed passes the full SSRF gate (including DNS resolution) here,
    /// before any crawl activity; a blocked seed never creates a session.
    pub async fn new(
        raw_seed: &str,
        config: Config,
        emitter: EventEmitter,
        permit: Option<ScanPermit>,
    ) -> Result<Self> {
        crate::config::validate(&config)?;

        let prepared = prepare_seed(raw_seed)?;
        let seed_url = normalize_url(&prepared)?;

        let guard = SsrfGuard::new(config.scan.allow_loopback);
        guard.validate(&seed_url).await?;

        let seed_host = extract_host(&seed_url).ok_or(crate::GuardError::InvalidUrl)?;

        let client = build_http_client(&config.user_agent)?;
        let fetcher = Arc::new(Fetcher::new(client.clone(), guard, &config.scan));
        let robots = RobotsCache::new(client, config.user_agent.header_value());

        Ok(Self {
            config,
            fetcher,
            robots,
            guard,
            graph: PageGraph::new(),
            frontier: Vec::new(),
            visited: HashSet::new(),
            seed_url,
            seed_host,
            emitter,
            stop: Arc::new(AtomicBool::new(false)),
            limit_hit: false,
            _permit: permit,
        })
    }

    /// Handle for requesting a cooperative stop from another task
    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            flag: Arc::clone(&self.stop),
        }
    }

    /// Runs the scan to termination.
    ///
    /// On the success path the final report is built from the graph, emitted
    /// as `scan_complete`, and returned. An internal fault emits a sanitized
    /// `error` frame and surfaces as `Err`; per-node fetch failures never
    /// land here, they classify their own node as necrosis.
    pub async fn run(mut self) -> Result<(Termination, Report)> {
        match self.drive().await {
            Ok(termination) => {
                let report = build_report(&self.graph, self.config.scan.latency_threshold_ms);
                self.emitter.scan_complete(report.clone());
                tracing::info!(
                    "Scan finished ({:?}): {} pages, {} edges",
                    termination,
                    self.graph.node_count(),
                    self.graph.edge_count()
                );
                Ok((termination, report))
            }
            Err(e) => {
                tracing::error!("Session failed: {}", e);
                self.emitter.error(&e.to_string());
                Err(e)
            }
        }
    }

    async fn drive(&mut self) -> Result<Termination> {
        if self.robots.is_allowed(&self.seed_url).await {
            let seed_url = self.seed_url.clone();
            let node = self.discover(&seed_url, 0)?;
            self.frontier.push(FrontierEntry {
                node,
                url: seed_url,
            });
        } else {
            tracing::warn!("Seed {} disallowed by robots.txt", self.seed_url);
        }

        let mut in_flight: JoinSet<(usize, FetchOutcome)> = JoinSet::new();

        loop {
            if self.stop.load(Ordering::Relaxed) && !self.frontier.is_empty() {
                tracing::info!(
                    "Stop requested; dropping {} frontier entries",
                    self.frontier.len()
                );
                self.frontier.clear();
            }

            while in_flight.len() < self.config.scan.max_concurrent_fetches {
                let Some(entry) = self.frontier.pop() else { break };
                let fetcher = Arc::clone(&self.fetcher);
                tracing::debug!("Fetching {}", entry.url);
                in_flight.spawn(async move {
                    let outcome = fetcher.fetch(&entry.url).await;
                    (entry.node, outcome)
                });
            }

            // Frontier empty and nothing in flight: the session has settled
            let Some(joined) = in_flight.join_next().await else { break };
            let (node, outcome) =
                joined.map_err(|e| ScanError::Internal(format!("fetch task panicked: {}", e)))?;
            self.on_fetch_resolved(node, outcome).await?;
        }

        Ok(if self.stop.load(Ordering::Relaxed) {
            Termination::Stopped
        } else if self.limit_hit {
            Termination::LimitReached
        } else {
            Termination::Completed
        })
    }

    /// Applies one fetch result: classify, resolve the node, emit the
    /// diagnosis, then feed extracted links back through the gate.
    async fn on_fetch_resolved(&mut self, node: usize, outcome: FetchOutcome) -> Result<()> {
        let status = classify(&outcome, self.config.scan.latency_threshold_ms);

        let (status_code, latency) = match &outcome {
            Ok(page) => (Some(page.status_code), Some(page.latency_ms)),
            Err(failure) => {
                tracing::debug!("Fetch failed for {}: {}", PageGraph::node_label(node), failure);
                (None, None)
            }
        };

        self.graph.resolve(node, status, status_code, latency)?;
        self.emitter
            .diagnosis_update(PageGraph::node_label(node), status, status_code, latency);

        if let Ok(page) = outcome {
            if let Some(body) = page.body {
                let links = extract_links(&body, &page.final_url);
                self.handle_links(node, links).await?;
            }
        }

        Ok(())
    }

    /// Records edges and discovers new frontier entries from one page's links.
    ///
    /// Targets already in the graph only gain an edge (deduplicated). New
    /// targets must pass, in order: same-domain scope, depth bound, visited
    /// set, SSRF literal check, node-count cap, robots.txt. The guard's
    /// resolved-address check runs in the fetch task, before the first
    /// request, so DNS lookups stay off the drive loop.
    ///
    /// Once a stop is requested, fetches that settle afterwards still get
    /// their diagnosis but discover nothing new.
    async fn handle_links(&mut self, source: usize, links: Vec<Url>) -> Result<()> {
        if self.stop.load(Ordering::Relaxed) {
            return Ok(());
        }

        let parent_depth = self
            .graph
            .node(source)
            .ok_or_else(|| ScanError::Internal(format!("unknown source node {}", source)))?
            .depth;

        for link in links {
            let Ok(normalized) = normalize_url(link.as_str()) else {
                continue;
            };

            if let Some(target) = self.graph.find(normalized.as_str()) {
                if target != source && self.graph.add_edge(source, target)? {
                    self.emitter.link_discovered(
                        PageGraph::node_label(source),
                        PageGraph::node_label(target),
                    );
                }
                continue;
            }

            let Some(host) = extract_host(&normalized) else {
                continue;
            };
            if !same_domain(&self.seed_host, &host) {
                continue;
            }

            let depth = parent_depth + 1;
            if depth > self.config.scan.max_depth {
                continue;
            }

            if self.visited.contains(normalized.as_str()) {
                continue;
            }

            if self.guard.check_literal(&normalized).is_err() {
                tracing::debug!("Guard rejected discovered link {}", normalized);
                continue;
            }

            if self.limit_hit {
                continue;
            }
            if self.graph.node_count() >= self.config.scan.max_pages {
                self.limit_hit = true;
                self.frontier.clear();
                self.emitter.limit_reached(format!(
                    "Node limit of {} reached; letting in-flight fetches settle",
                    self.config.scan.max_pages
                ));
                continue;
            }

            if !self.robots.is_allowed(&normalized).await {
                tracing::debug!("robots.txt disallows {}", normalized);
                continue;
            }

            let target = self.discover(&normalized, depth)?;
            if self.graph.add_edge(source, target)? {
                self.emitter.link_discovered(
                    PageGraph::node_label(source),
                    PageGraph::node_label(target),
                );
            }
            self.frontier.push(FrontierEntry {
                node: target,
                url: normalized,
            });
        }

        Ok(())
    }

    /// Creates a pending node and announces it. `node_discovered` always
    /// precedes any edge or diagnosis involving the node.
    fn discover(&mut self, url: &Url, depth: u32) -> Result<usize> {
        self.visited.insert(url.to_string());
        let node = self.graph.add_node(url.as_str(), depth)?;
        self.emitter
            .node_discovered(PageGraph::node_label(node), url.to_string(), depth);
        Ok(node)
    }
}
