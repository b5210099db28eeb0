use crate::data::Database;
use serde::{Deserialize, Serialize};
use sitegraph_scanner::{CrawlOutcome, GraphSnapshot, LinkGraph};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

/// On-disk formats for a finished graph
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Sqlite,
}

impl OutputFormat {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "json" => Some(OutputFormat::Json),
            "sqlite" | "db" => Some(OutputFormat::Sqlite),
            _ => None,
        }
    }

    /// SQLite for `.db`/`.sqlite`/`.sqlite3`, JSON for anything else
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_lowercase())
            .as_deref()
        {
            Some("db" | "sqlite" | "sqlite3") => OutputFormat::Sqlite,
            _ => OutputFormat::Json,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphMetadata {
    pub generator: String,
    pub version: String,
    pub generated_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_budget: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pages_visited: Option<usize>,
    #[serde(default)]
    pub interrupted: bool,
    /// Set when the file holds the first-N-nodes subgraph of another graph
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subgraph_nodes: Option<usize>,
}

impl GraphMetadata {
    pub fn new() -> Self {
        Self {
            generator: "sitegraph".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            generated_at: chrono::Utc::now().to_rfc3339(),
            start_url: None,
            scope: None,
            node_budget: None,
            pages_visited: None,
            interrupted: false,
            subgraph_nodes: None,
        }
    }

    pub fn for_crawl(outcome: &CrawlOutcome) -> Self {
        Self {
            start_url: Some(outcome.start_url.clone()),
            scope: Some(outcome.scope.clone()),
            node_budget: Some(outcome.node_budget),
            pages_visited: Some(outcome.stats.visited),
            interrupted: outcome.stats.interrupted,
            ..Self::new()
        }
    }

    /// Metadata for a first-`n` subgraph cut from a graph described by `self`
    pub fn for_subgraph(&self, n: usize) -> Self {
        Self {
            start_url: self.start_url.clone(),
            scope: self.scope.clone(),
            node_budget: self.node_budget,
            pages_visited: self.pages_visited,
            interrupted: self.interrupted,
            subgraph_nodes: Some(n),
            ..Self::new()
        }
    }
}

impl Default for GraphMetadata {
    fn default() -> Self {
        Self::new()
    }
}

/// JSON document layout: `{ "metadata": {..}, "nodes": [..], "edges": [[src, dst], ..] }`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphFile {
    #[serde(default)]
    pub metadata: GraphMetadata,
    #[serde(flatten)]
    pub graph: GraphSnapshot,
}

pub fn save_graph_json(
    graph: &LinkGraph,
    metadata: &GraphMetadata,
    path: &Path,
) -> Result<(), String> {
    let document = GraphFile {
        metadata: metadata.clone(),
        graph: graph.snapshot(),
    };
    let file = File::create(path)
        .map_err(|e| format!("Failed to create {}: {}", path.display(), e))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, &document)
        .map_err(|e| format!("Failed to write {}: {}", path.display(), e))?;
    writer
        .flush()
        .map_err(|e| format!("Failed to write {}: {}", path.display(), e))
}

pub fn load_graph_json(path: &Path) -> Result<(GraphMetadata, LinkGraph), String> {
    let file =
        File::open(path).map_err(|e| format!("Failed to open {}: {}", path.display(), e))?;
    let document: GraphFile = serde_json::from_reader(BufReader::new(file))
        .map_err(|e| format!("Graph could not be loaded from {}: {}", path.display(), e))?;
    let graph = LinkGraph::from_snapshot(&document.graph)
        .map_err(|e| format!("Graph in {} is inconsistent: {}", path.display(), e))?;
    Ok((document.metadata, graph))
}

/// Stores a crawl as a new run in the SQLite database at `path`.
/// Returns the run id.
pub fn save_crawl_sqlite(outcome: &CrawlOutcome, path: &Path) -> Result<String, String> {
    let db = Database::new(path)
        .map_err(|e| format!("Failed to open database {}: {}", path.display(), e))?;
    let run_id = db
        .create_run(&outcome.start_url, &outcome.scope, outcome.node_budget)
        .map_err(|e| format!("Failed to record run: {}", e))?;

    if let Err(e) = db.save_graph(&run_id, &outcome.graph) {
        let _ = db.fail_run(&run_id);
        return Err(format!("Failed to store graph: {}", e));
    }
    db.complete_run(&run_id, &outcome.stats)
        .map_err(|e| format!("Failed to finish run: {}", e))?;

    Ok(run_id)
}

/// Writes a crawl outcome in the requested format. Returns a short
/// description of where it went.
pub fn save_crawl(outcome: &CrawlOutcome, path: &Path, format: OutputFormat) -> Result<String, String> {
    match format {
        OutputFormat::Json => {
            save_graph_json(&outcome.graph, &GraphMetadata::for_crawl(outcome), path)?;
            Ok(format!("{}", path.display()))
        }
        OutputFormat::Sqlite => {
            let run_id = save_crawl_sqlite(outcome, path)?;
            Ok(format!("{} (run {})", path.display(), run_id))
        }
    }
}
