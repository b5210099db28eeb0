use crate::graph::LinkGraph;
use serde::{Deserialize, Serialize};

/// Snapshot emitted each time a URL is dequeued, before it is fetched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlProgress {
    pub nodes: usize,
    pub edges: usize,
    pub visited: usize,
    pub url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlStats {
    /// Pages dequeued with a fetch attempted (successful or not).
    pub visited: usize,
    pub fetch_failures: usize,
    /// Pages that fetched fine but produced no links.
    pub empty_pages: usize,
    pub out_of_scope_links: usize,
    pub budget_dropped_links: usize,
    /// Links pointing at a page whose node was removed after a failed fetch.
    pub failed_target_links: usize,
    pub interrupted: bool,
}

#[derive(Debug, Clone)]
pub struct CrawlOutcome {
    /// Canonical form of the start URL the run was seeded with.
    pub start_url: String,
    pub scope: String,
    pub node_budget: usize,
    pub graph: LinkGraph,
    pub stats: CrawlStats,
}
