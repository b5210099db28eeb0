// Tests for database functionality

use sitegraph_core::data::{Database, RunStatus};
use sitegraph_scanner::{CrawlStats, LinkGraph};
use tempfile::TempDir;

fn create_test_db() -> (TempDir, Database) {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("test.db");
    let db = Database::new(&db_path).unwrap();
    (temp_dir, db)
}

fn sample_graph() -> LinkGraph {
    let mut graph = LinkGraph::new();
    for url in [
        "http://site.test/",
        "http://site.test/a",
        "http://site.test/b",
    ] {
        graph.add_node(url);
    }
    graph.add_edge("http://site.test/", "http://site.test/a").unwrap();
    graph.add_edge("http://site.test/", "http://site.test/b").unwrap();
    graph.add_edge("http://site.test/a", "http://site.test/").unwrap();
    graph
}

// ============================================================================
// Database Creation Tests
// ============================================================================

#[test]
fn test_database_creation() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("test.db");

    let db = Database::new(&db_path);
    assert!(db.is_ok());
    assert!(db_path.exists());
}

#[test]
fn test_database_exists_and_drop() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("test.db");

    assert!(!Database::exists(&db_path));

    {
        let _db = Database::new(&db_path).unwrap();
    }
    assert!(Database::exists(&db_path));

    Database::drop(&db_path).unwrap();
    assert!(!Database::exists(&db_path));
}

#[test]
fn test_reopening_keeps_existing_runs() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("test.db");

    let run_id = {
        let db = Database::new(&db_path).unwrap();
        db.create_run("http://site.test/", "site.test", 10).unwrap()
    };

    let db = Database::new(&db_path).unwrap();
    assert!(db.get_run(&run_id).unwrap().is_some());
}

// ============================================================================
// Run Tests
// ============================================================================

#[test]
fn test_create_run() {
    let (_temp_dir, db) = create_test_db();

    let run_id = db.create_run("http://site.test/", "site.test", 2000).unwrap();
    let run = db.get_run(&run_id).unwrap().unwrap();

    assert_eq!(run.id, run_id);
    assert_eq!(run.status, RunStatus::Running.as_str());
    assert_eq!(run.start_url, "http://site.test/");
    assert_eq!(run.scope, "site.test");
    assert_eq!(run.node_budget, 2000);
    assert!(run.end_time.is_none());
    assert!(run.pages_visited.is_none());
}

#[test]
fn test_run_ids_are_unique() {
    let (_temp_dir, db) = create_test_db();

    let first = db.create_run("http://site.test/", "site.test", 5).unwrap();
    let second = db.create_run("http://site.test/", "site.test", 5).unwrap();

    assert_ne!(first, second);
    assert_eq!(db.list_runs().unwrap().len(), 2);
}

#[test]
fn test_complete_run() {
    let (_temp_dir, db) = create_test_db();
    let run_id = db.create_run("http://site.test/", "site.test", 5).unwrap();

    let stats = CrawlStats {
        visited: 4,
        ..CrawlStats::default()
    };
    db.complete_run(&run_id, &stats).unwrap();

    let run = db.get_run(&run_id).unwrap().unwrap();
    assert_eq!(RunStatus::parse(&run.status), Some(RunStatus::Completed));
    assert_eq!(run.pages_visited, Some(4));
    assert!(run.end_time.is_some());
}

#[test]
fn test_complete_interrupted_run() {
    let (_temp_dir, db) = create_test_db();
    let run_id = db.create_run("http://site.test/", "site.test", 5).unwrap();

    let stats = CrawlStats {
        visited: 1,
        interrupted: true,
        ..CrawlStats::default()
    };
    db.complete_run(&run_id, &stats).unwrap();

    let run = db.get_run(&run_id).unwrap().unwrap();
    assert_eq!(RunStatus::parse(&run.status), Some(RunStatus::Interrupted));
}

#[test]
fn test_fail_run() {
    let (_temp_dir, db) = create_test_db();
    let run_id = db.create_run("http://site.test/", "site.test", 5).unwrap();

    db.fail_run(&run_id).unwrap();

    let run = db.get_run(&run_id).unwrap().unwrap();
    assert_eq!(RunStatus::parse(&run.status), Some(RunStatus::Failed));
}

#[test]
fn test_get_unknown_run() {
    let (_temp_dir, db) = create_test_db();
    assert!(db.get_run("no-such-run").unwrap().is_none());
}

#[test]
fn test_run_status_parse() {
    for status in [
        RunStatus::Running,
        RunStatus::Completed,
        RunStatus::Interrupted,
        RunStatus::Failed,
    ] {
        assert_eq!(RunStatus::parse(status.as_str()), Some(status));
    }
    assert_eq!(RunStatus::parse("paused"), None);
}

// ============================================================================
// Graph Storage Tests
// ============================================================================

#[test]
fn test_save_and_load_graph() {
    let (_temp_dir, db) = create_test_db();
    let run_id = db.create_run("http://site.test/", "site.test", 5).unwrap();
    let graph = sample_graph();

    db.save_graph(&run_id, &graph).unwrap();

    let snapshot = db.load_snapshot(&run_id).unwrap();
    assert_eq!(snapshot, graph.snapshot());

    let loaded = db.load_graph(&run_id).unwrap();
    assert_eq!(loaded.nodes(), graph.nodes());
    assert_eq!(loaded.edges(), graph.edges());
}

#[test]
fn test_get_run_counts() {
    let (_temp_dir, db) = create_test_db();
    let run_id = db.create_run("http://site.test/", "site.test", 5).unwrap();

    assert_eq!(db.get_run_counts(&run_id).unwrap(), (0, 0));

    db.save_graph(&run_id, &sample_graph()).unwrap();
    assert_eq!(db.get_run_counts(&run_id).unwrap(), (3, 3));
}

#[test]
fn test_runs_store_graphs_independently() {
    let (_temp_dir, db) = create_test_db();
    let first = db.create_run("http://site.test/", "site.test", 5).unwrap();
    let second = db.create_run("http://site.test/", "site.test", 1).unwrap();

    db.save_graph(&first, &sample_graph()).unwrap();
    let mut single = LinkGraph::new();
    single.add_node("http://site.test/");
    db.save_graph(&second, &single).unwrap();

    assert_eq!(db.get_run_counts(&first).unwrap(), (3, 3));
    assert_eq!(db.get_run_counts(&second).unwrap(), (1, 0));
    assert_eq!(db.load_snapshot(&second).unwrap().nodes, vec!["http://site.test/"]);
}

#[test]
fn test_delete_run_cascades() {
    let (_temp_dir, db) = create_test_db();
    let run_id = db.create_run("http://site.test/", "site.test", 5).unwrap();
    db.save_graph(&run_id, &sample_graph()).unwrap();

    assert!(db.delete_run(&run_id).unwrap());
    assert!(!db.delete_run(&run_id).unwrap());

    let (nodes, edges): (i64, i64) = db
        .get_connection()
        .query_row(
            "SELECT (SELECT COUNT(*) FROM nodes), (SELECT COUNT(*) FROM edges)",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .unwrap();
    assert_eq!((nodes, edges), (0, 0));
}

#[test]
fn test_save_graph_for_unknown_run_fails() {
    let (_temp_dir, db) = create_test_db();
    let result = db.save_graph("no-such-run", &sample_graph());
    assert!(result.is_err());
    assert_eq!(db.get_run_counts("no-such-run").unwrap(), (0, 0));
}
