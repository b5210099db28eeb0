use crate::error::GraphError;
use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// A page admitted to the graph. `seq` records discovery order, which node
/// indices alone cannot: `StableGraph` reuses slots freed by removals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageNode {
    pub url: String,
    pub seq: u64,
}

/// Plain node/edge lists, in discovery order, for handing the graph to a
/// persistence layer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    pub nodes: Vec<String>,
    pub edges: Vec<(String, String)>,
}

/// Simple directed graph of pages (nodes keyed by canonical URL) and
/// hyperlinks. Parallel edges are never created; self-loops are allowed.
#[derive(Debug, Clone, Default)]
pub struct LinkGraph {
    graph: StableDiGraph<PageNode, u64>,
    index: HashMap<String, NodeIndex>,
    next_node_seq: u64,
    next_edge_seq: u64,
}

impl LinkGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `url` as a node. Returns `false` if it was already present.
    pub fn add_node(&mut self, url: &str) -> bool {
        if self.index.contains_key(url) {
            return false;
        }
        let seq = self.next_node_seq;
        self.next_node_seq += 1;
        let idx = self.graph.add_node(PageNode {
            url: url.to_string(),
            seq,
        });
        self.index.insert(url.to_string(), idx);
        true
    }

    /// Adds the edge `source -> target` between two existing nodes.
    /// Returns `Ok(false)` if the edge already existed.
    pub fn add_edge(&mut self, source: &str, target: &str) -> Result<bool, GraphError> {
        let from = self.node_index(source)?;
        let to = self.node_index(target)?;
        if self.graph.find_edge(from, to).is_some() {
            return Ok(false);
        }
        let seq = self.next_edge_seq;
        self.next_edge_seq += 1;
        self.graph.add_edge(from, to, seq);
        Ok(true)
    }

    /// Removes `url` together with every edge touching it.
    pub fn remove_node(&mut self, url: &str) -> bool {
        match self.index.remove(url) {
            Some(idx) => self.graph.remove_node(idx).is_some(),
            None => false,
        }
    }

    pub fn has_node(&self, url: &str) -> bool {
        self.index.contains_key(url)
    }

    pub fn has_edge(&self, source: &str, target: &str) -> bool {
        match (self.index.get(source), self.index.get(target)) {
            (Some(&from), Some(&to)) => self.graph.contains_edge(from, to),
            _ => false,
        }
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    pub fn out_degree(&self, url: &str) -> Option<usize> {
        let idx = *self.index.get(url)?;
        Some(self.graph.edges(idx).count())
    }

    /// Node URLs in discovery order.
    pub fn nodes(&self) -> Vec<&str> {
        let mut nodes: Vec<&PageNode> = self
            .graph
            .node_indices()
            .map(|idx| &self.graph[idx])
            .collect();
        nodes.sort_by_key(|n| n.seq);
        nodes.into_iter().map(|n| n.url.as_str()).collect()
    }

    /// Edges as `(source, target)` URL pairs, in the order they were added.
    pub fn edges(&self) -> Vec<(&str, &str)> {
        let mut edges: Vec<_> = self
            .graph
            .edge_indices()
            .filter_map(|e| {
                let (from, to) = self.graph.edge_endpoints(e)?;
                Some((self.graph[e], from, to))
            })
            .collect();
        edges.sort_by_key(|(seq, _, _)| *seq);
        edges
            .into_iter()
            .map(|(_, from, to)| (self.graph[from].url.as_str(), self.graph[to].url.as_str()))
            .collect()
    }

    /// Subgraph induced by the first `n` nodes in discovery order.
    pub fn first_n_subgraph(&self, n: usize) -> Result<LinkGraph, GraphError> {
        if n > self.node_count() {
            return Err(GraphError::SubgraphTooLarge {
                requested: n,
                available: self.node_count(),
            });
        }

        let kept: Vec<&str> = self.nodes().into_iter().take(n).collect();
        let keep: HashSet<&str> = kept.iter().copied().collect();

        let mut sub = LinkGraph::new();
        for url in &kept {
            sub.add_node(url);
        }
        for (from, to) in self.edges() {
            if keep.contains(from) && keep.contains(to) {
                sub.add_edge(from, to)?;
            }
        }
        Ok(sub)
    }

    pub fn snapshot(&self) -> GraphSnapshot {
        GraphSnapshot {
            nodes: self.nodes().into_iter().map(str::to_string).collect(),
            edges: self
                .edges()
                .into_iter()
                .map(|(from, to)| (from.to_string(), to.to_string()))
                .collect(),
        }
    }

    pub fn from_snapshot(snapshot: &GraphSnapshot) -> Result<LinkGraph, GraphError> {
        let mut graph = LinkGraph::new();
        for url in &snapshot.nodes {
            graph.add_node(url);
        }
        for (from, to) in &snapshot.edges {
            graph.add_edge(from, to)?;
        }
        Ok(graph)
    }

    fn node_index(&self, url: &str) -> Result<NodeIndex, GraphError> {
        self.index
            .get(url)
            .copied()
            .ok_or_else(|| GraphError::UnknownNode(url.to_string()))
    }
}
