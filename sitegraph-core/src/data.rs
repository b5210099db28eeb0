use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Result, params};
use serde::{Deserialize, Serialize};
use sitegraph_scanner::{CrawlStats, GraphSnapshot, LinkGraph};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

pub struct Database {
    conn: Connection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunStatus {
    Running,
    Completed,
    Interrupted,
    Failed,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Running => "running",
            RunStatus::Completed => "completed",
            RunStatus::Interrupted => "interrupted",
            RunStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "running" => Some(RunStatus::Running),
            "completed" => Some(RunStatus::Completed),
            "interrupted" => Some(RunStatus::Interrupted),
            "failed" => Some(RunStatus::Failed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunRecord {
    pub id: String,
    pub start_time: i64,
    pub end_time: Option<i64>,
    pub status: String,
    pub start_url: String,
    pub scope: String,
    pub node_budget: i64,
    pub pages_visited: Option<i64>,
}

fn current_timestamp() -> i64 {
    chrono::Utc::now().timestamp()
}

impl Database {
    pub fn drop(path: &Path) -> std::io::Result<()> {
        fs::remove_file(path)
    }
    pub fn exists(path: &Path) -> bool {
        path.exists()
    }
    pub fn new(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
            PRAGMA foreign_keys = ON;
            ",
        )?;

        let db = Database { conn };
        db.init_schema()?;
        Ok(db)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            "
            -- One row per crawl run
            CREATE TABLE IF NOT EXISTS crawl_runs (
    id TEXT PRIMARY KEY,
    start_time INTEGER NOT NULL,
    end_time INTEGER,
    status TEXT NOT NULL CHECK(status IN ('running', 'completed', 'interrupted', 'failed')),
    start_url TEXT NOT NULL,
    scope TEXT NOT NULL,
    node_budget INTEGER NOT NULL,
    pages_visited INTEGER
);

-- Pages admitted to the graph
CREATE TABLE IF NOT EXISTS nodes (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    run_id TEXT NOT NULL,
    url TEXT NOT NULL,
    discovery_order INTEGER NOT NULL,
    UNIQUE(run_id, url),
    FOREIGN KEY(run_id) REFERENCES crawl_runs(id) ON DELETE CASCADE
);

-- Hyperlinks between pages
CREATE TABLE IF NOT EXISTS edges (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    run_id TEXT NOT NULL,
    source_node_id INTEGER NOT NULL,
    target_node_id INTEGER NOT NULL,
    UNIQUE(source_node_id, target_node_id),
    FOREIGN KEY(run_id) REFERENCES crawl_runs(id) ON DELETE CASCADE,
    FOREIGN KEY(source_node_id) REFERENCES nodes(id) ON DELETE CASCADE,
    FOREIGN KEY(target_node_id) REFERENCES nodes(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_nodes_run ON nodes(run_id);
CREATE INDEX IF NOT EXISTS idx_edges_run ON edges(run_id);
CREATE INDEX IF NOT EXISTS idx_edges_target ON edges(target_node_id);
            ",
        )?;
        Ok(())
    }

    // Run management
    pub fn create_run(&self, start_url: &str, scope: &str, node_budget: usize) -> Result<String> {
        let run_id = uuid::Uuid::new_v4().to_string();
        let timestamp = current_timestamp();

        self.conn.execute(
            "INSERT INTO crawl_runs (id, start_time, status, start_url, scope, node_budget) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                &run_id,
                timestamp,
                RunStatus::Running.as_str(),
                start_url,
                scope,
                node_budget as i64
            ],
        )?;

        Ok(run_id)
    }

    /// Marks the run finished, as `interrupted` if the crawl was cut short.
    pub fn complete_run(&self, run_id: &str, stats: &CrawlStats) -> Result<()> {
        let status = if stats.interrupted {
            RunStatus::Interrupted
        } else {
            RunStatus::Completed
        };
        self.conn.execute(
            "UPDATE crawl_runs SET status = ?1, end_time = ?2, pages_visited = ?3 WHERE id = ?4",
            params![
                status.as_str(),
                current_timestamp(),
                stats.visited as i64,
                run_id
            ],
        )?;
        Ok(())
    }

    pub fn fail_run(&self, run_id: &str) -> Result<()> {
        self.conn.execute(
            "UPDATE crawl_runs SET status = ?1, end_time = ?2 WHERE id = ?3",
            params![RunStatus::Failed.as_str(), current_timestamp(), run_id],
        )?;
        Ok(())
    }

    pub fn get_run(&self, run_id: &str) -> Result<Option<RunRecord>> {
        self.conn
            .query_row(
                "SELECT id, start_time, end_time, status, start_url, scope, node_budget, pages_visited
                 FROM crawl_runs WHERE id = ?1",
                params![run_id],
                |row| {
                    Ok(RunRecord {
                        id: row.get(0)?,
                        start_time: row.get(1)?,
                        end_time: row.get(2)?,
                        status: row.get(3)?,
                        start_url: row.get(4)?,
                        scope: row.get(5)?,
                        node_budget: row.get(6)?,
                        pages_visited: row.get(7)?,
                    })
                },
            )
            .optional()
    }

    pub fn list_runs(&self) -> Result<Vec<RunRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, start_time, end_time, status, start_url, scope, node_budget, pages_visited
             FROM crawl_runs ORDER BY start_time, rowid",
        )?;

        let runs = stmt
            .query_map([], |row| {
                Ok(RunRecord {
                    id: row.get(0)?,
                    start_time: row.get(1)?,
                    end_time: row.get(2)?,
                    status: row.get(3)?,
                    start_url: row.get(4)?,
                    scope: row.get(5)?,
                    node_budget: row.get(6)?,
                    pages_visited: row.get(7)?,
                })
            })?
            .collect::<Result<Vec<_>>>()?;

        Ok(runs)
    }

    // Graph storage

    /// Writes every node and edge of `graph` under `run_id` in one transaction.
    pub fn save_graph(&self, run_id: &str, graph: &LinkGraph) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        let mut node_ids: HashMap<&str, i64> = HashMap::new();
        {
            let mut insert_node = tx.prepare(
                "INSERT INTO nodes (run_id, url, discovery_order) VALUES (?1, ?2, ?3)",
            )?;
            for (order, url) in graph.nodes().into_iter().enumerate() {
                insert_node.execute(params![run_id, url, order as i64])?;
                node_ids.insert(url, tx.last_insert_rowid());
            }

            let mut insert_edge = tx.prepare(
                "INSERT INTO edges (run_id, source_node_id, target_node_id) VALUES (?1, ?2, ?3)",
            )?;
            for (from, to) in graph.edges() {
                if let (Some(source_id), Some(target_id)) = (node_ids.get(from), node_ids.get(to))
                {
                    insert_edge.execute(params![run_id, source_id, target_id])?;
                }
            }
        }
        tx.commit()
    }

    /// Nodes in discovery order and edges in insertion order for `run_id`.
    pub fn load_snapshot(&self, run_id: &str) -> Result<GraphSnapshot> {
        let mut node_stmt = self
            .conn
            .prepare("SELECT url FROM nodes WHERE run_id = ?1 ORDER BY discovery_order")?;
        let nodes = node_stmt
            .query_map(params![run_id], |row| row.get(0))?
            .collect::<Result<Vec<String>>>()?;

        let mut edge_stmt = self.conn.prepare(
            "SELECT s.url, t.url
             FROM edges e
             JOIN nodes s ON e.source_node_id = s.id
             JOIN nodes t ON e.target_node_id = t.id
             WHERE e.run_id = ?1
             ORDER BY e.id",
        )?;
        let edges = edge_stmt
            .query_map(params![run_id], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<Result<Vec<(String, String)>>>()?;

        Ok(GraphSnapshot { nodes, edges })
    }

    pub fn load_graph(&self, run_id: &str) -> Result<LinkGraph> {
        let snapshot = self.load_snapshot(run_id)?;
        LinkGraph::from_snapshot(&snapshot)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, Type::Text, Box::new(e)))
    }

    /// `(nodes, edges)` stored for a run.
    pub fn get_run_counts(&self, run_id: &str) -> Result<(i64, i64)> {
        let nodes: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM nodes WHERE run_id = ?1",
            params![run_id],
            |row| row.get(0),
        )?;
        let edges: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM edges WHERE run_id = ?1",
            params![run_id],
            |row| row.get(0),
        )?;
        Ok((nodes, edges))
    }

    pub fn delete_run(&self, run_id: &str) -> Result<bool> {
        let deleted = self
            .conn
            .execute("DELETE FROM crawl_runs WHERE id = ?1", params![run_id])?;
        Ok(deleted > 0)
    }

    pub fn get_connection(&self) -> &Connection {
        &self.conn
    }
}
