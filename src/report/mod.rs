//! Final report builder
//!
//! Runs once over the final graph at session termination. Orphan and
//! overload are derived here from the edge list, never from live node state,
//! so a node's in-degree rising after its own diagnosis cannot produce a
//! flip-flopping status.

use crate::graph::{HealthStatus, PageGraph};
use serde::{Deserialize, Serialize};

/// Out-degree above which a page counts as overloaded
pub const OVERLOAD_THRESHOLD: u32 = 50;

/// Aggregate counts over the final graph
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub total_pages: usize,
    pub dead_links: usize,
    pub slow_pages: usize,
    pub orphan_pages: usize,
}

/// One necrotic page: url plus the status code that condemned it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NecroticEntry {
    pub url: String,
    pub status_code: Option<u16>,
}

/// Full per-page record for downstream consumers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageEntry {
    pub url: String,
    pub status: HealthStatus,
    pub status_code: Option<u16>,
    pub latency: Option<u64>,
    pub depth: u32,
}

/// The final structured diagnosis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub summary: Summary,
    pub recommendations: Vec<String>,
    pub necrotic_tissue: Vec<NecroticEntry>,
    pub pages: Vec<PageEntry>,
}

/// Builds the report from a finished session's graph.
///
/// Orphans are nodes with a recomputed in-degree of zero, excluding the seed
/// (node 0). Necrotic entries keep discovery order.
pub fn build_report(graph: &PageGraph, latency_threshold_ms: u64) -> Report {
    let in_degrees = graph.recompute_in_degrees();
    let out_degrees = graph.recompute_out_degrees();

    let mut dead_links = 0;
    let mut slow_pages = 0;
    let mut orphan_pages = 0;
    let mut overloaded_pages = 0;
    let mut necrotic_tissue = Vec::new();
    let mut pages = Vec::with_capacity(graph.node_count());

    for node in graph.nodes() {
        match node.status {
            HealthStatus::Necrosis => {
                dead_links += 1;
                necrotic_tissue.push(NecroticEntry {
                    url: node.url.clone(),
                    status_code: node.status_code,
                });
            }
            HealthStatus::Blockage => slow_pages += 1,
            HealthStatus::Healthy | HealthStatus::Pending => {}
        }

        if node.index != 0 && in_degrees[node.index] == 0 {
            orphan_pages += 1;
        }
        if out_degrees[node.index] > OVERLOAD_THRESHOLD {
            overloaded_pages += 1;
        }

        pages.push(PageEntry {
            url: node.url.clone(),
            status: node.status,
            status_code: node.status_code,
            latency: node.latency_ms,
            depth: node.depth,
        });
    }

    let summary = Summary {
        total_pages: graph.node_count(),
        dead_links,
        slow_pages,
        orphan_pages,
    };

    let recommendations =
        build_recommendations(&summary, overloaded_pages, latency_threshold_ms);

    Report {
        summary,
        recommendations,
        necrotic_tissue,
        pages,
    }
}

/// Deterministic, templated recommendation strings keyed off the counts
fn build_recommendations(
    summary: &Summary,
    overloaded_pages: usize,
    latency_threshold_ms: u64,
) -> Vec<String> {
    let mut recommendations = Vec::new();

    if summary.dead_links > 0 {
        recommendations.push(format!(
            "Found {} necrotic links; consider repairing or removing them",
            summary.dead_links
        ));
    }

    if summary.slow_pages > 0 {
        recommendations.push(format!(
            "Found {} high-latency pages (over {}ms); consider optimizing them",
            summary.slow_pages, latency_threshold_ms
        ));
    }

    if summary.orphan_pages > 0 {
        recommendations.push(format!(
            "Found {} orphan pages; consider adding internal links to them",
            summary.orphan_pages
        ));
    }

    if overloaded_pages > 0 {
        recommendations.push(format!(
            "Found {} pages with more than {} outbound links; consider splitting their navigation",
            overloaded_pages, OVERLOAD_THRESHOLD
        ));
    }

    if recommendations.is_empty() {
        recommendations.push("Site structure looks healthy; no obvious problems found".to_string());
    }

    recommendations
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_graph() -> PageGraph {
        let mut graph = PageGraph::new();
        let seed = graph.add_node("https://example.com/", 0).unwrap();
        let about = graph.add_node("https://example.com/about", 1).unwrap();
        let broken = graph.add_node("https://example.com/broken", 1).unwrap();
        graph.add_edge(seed, about).unwrap();
        graph.add_edge(seed, broken).unwrap();
        graph
            .resolve(seed, HealthStatus::Healthy, Some(200), Some(30))
            .unwrap();
        graph
            .resolve(about, HealthStatus::Healthy, Some(200), Some(50))
            .unwrap();
        graph
            .resolve(broken, HealthStatus::Necrosis, Some(404), Some(12))
            .unwrap();
        graph
    }

    #[test]
    fn test_summary_counts() {
        let report = build_report(&sample_graph(), 2000);
        assert_eq!(
            report.summary,
            Summary {
                total_pages: 3,
                dead_links: 1,
                slow_pages: 0,
                orphan_pages: 0,
            }
        );
    }

    #[test]
    fn test_necrotic_tissue_in_discovery_order() {
        let mut graph = sample_graph();
        let late = graph.add_node("https://example.com/late", 1).unwrap();
        let seed = 0;
        graph.add_edge(seed, late).unwrap();
        graph
            .resolve(late, HealthStatus::Necrosis, Some(500), Some(5))
            .unwrap();

        let report = build_report(&graph, 2000);
        assert_eq!(report.necrotic_tissue.len(), 2);
        assert_eq!(report.necrotic_tissue[0].url, "https://example.com/broken");
        assert_eq!(report.necrotic_tissue[0].status_code, Some(404));
        assert_eq!(report.necrotic_tissue[1].url, "https://example.com/late");
    }

    #[test]
    fn test_orphan_excludes_seed() {
        let mut graph = PageGraph::new();
        graph.add_node("https://example.com/", 0).unwrap();
        let report = build_report(&graph, 2000);
        // A lone seed has in-degree 0 but is never an orphan
        assert_eq!(report.summary.orphan_pages, 0);
    }

    #[test]
    fn test_recommendations_for_dead_links() {
        let report = build_report(&sample_graph(), 2000);
        assert!(report.recommendations[0].contains("1 necrotic"));
    }

    #[test]
    fn test_healthy_site_recommendation() {
        let mut graph = PageGraph::new();
        let seed = graph.add_node("https://example.com/", 0).unwrap();
        graph
            .resolve(seed, HealthStatus::Healthy, Some(200), Some(10))
            .unwrap();
        let report = build_report(&graph, 2000);
        assert_eq!(report.recommendations.len(), 1);
        assert!(report.recommendations[0].contains("healthy"));
    }

    #[test]
    fn test_slow_page_counted() {
        let mut graph = PageGraph::new();
        let seed = graph.add_node("https://example.com/", 0).unwrap();
        graph
            .resolve(seed, HealthStatus::Blockage, Some(200), Some(3500))
            .unwrap();
        let report = build_report(&graph, 2000);
        assert_eq!(report.summary.slow_pages, 1);
        assert!(report.recommendations[0].contains("high-latency"));
    }

    #[test]
    fn test_pending_nodes_appear_in_pages() {
        let mut graph = sample_graph();
        let seed = 0;
        let pending = graph.add_node("https://example.com/unfetched", 1).unwrap();
        graph.add_edge(seed, pending).unwrap();

        let report = build_report(&graph, 2000);
        assert_eq!(report.summary.total_pages, 4);
        let entry = report
            .pages
            .iter()
            .find(|p| p.url.ends_with("/unfetched"))
            .unwrap();
        assert_eq!(entry.status, HealthStatus::Pending);
        assert_eq!(entry.status_code, None);
    }

    #[test]
    fn test_report_json_roundtrip() {
        let report = build_report(&sample_graph(), 2000);
        let json = serde_json::to_string(&report).unwrap();
        let parsed: Report = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.summary, report.summary);
        assert_eq!(parsed, report);
    }
}
