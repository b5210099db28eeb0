use indicatif::{ProgressBar, ProgressStyle};
use sitegraph_scanner::{
    CrawlConfig, CrawlOutcome, CrawlProgress, Crawler, HttpFetcher, InterruptPolicy,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tracing::debug;
use url::Url;

/// Options for configuring a crawl operation
pub struct CrawlOptions {
    pub url: String,
    pub node_budget: usize,
    /// Host suffix to stay within; `None` uses the start URL's host
    pub scope: Option<String>,
    pub timeout_secs: u64,
    pub interrupt_policy: InterruptPolicy,
    pub show_progress_bars: bool,
    /// Listen for Ctrl-C and turn it into a fetch cancellation
    pub handle_interrupts: bool,
}

impl CrawlOptions {
    pub fn new(url: impl Into<String>, node_budget: usize) -> Self {
        Self {
            url: url.into(),
            node_budget,
            scope: None,
            timeout_secs: 10,
            interrupt_policy: InterruptPolicy::default(),
            show_progress_bars: false,
            handle_interrupts: false,
        }
    }
}

/// Callback for reporting crawl progress lines
pub type CrawlProgressCallback = Arc<dyn Fn(String) + Send + Sync>;

/// One operator-facing progress line, e.g.
/// `n = 12 m = 40 visited 7 pages, visiting http://...`
pub fn format_progress(progress: &CrawlProgress) -> String {
    format!(
        "n = {} m = {} visited {} pages, visiting {}",
        progress.nodes, progress.edges, progress.visited, progress.url
    )
}

/// Execute a crawl with the given options
/// Returns the crawl outcome (graph plus run statistics)
pub async fn execute_crawl(
    options: CrawlOptions,
    progress_callback: Option<CrawlProgressCallback>,
) -> Result<CrawlOutcome, String> {
    let CrawlOptions {
        url,
        node_budget,
        scope,
        timeout_secs,
        interrupt_policy,
        show_progress_bars,
        handle_interrupts,
    } = options;

    let fetcher = HttpFetcher::with_timeout(timeout_secs)
        .map_err(|e| format!("Failed to create HTTP client: {}", e))?;

    let mut config = CrawlConfig::new(url, node_budget).with_interrupt_policy(interrupt_policy);
    if let Some(scope) = scope {
        config = config.with_scope(scope);
    }

    // Set up single progress bar for overall crawl progress (only if enabled)
    let progress_bar = if show_progress_bars {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} {msg}")
                .map_err(|e| format!("Invalid progress template: {}", e))?,
        );
        pb.enable_steady_tick(Duration::from_millis(100));
        pb.set_message("Starting crawl...");
        Some(pb)
    } else {
        None
    };

    let pb_clone = progress_bar.clone();
    let crawler = Crawler::new(fetcher, config)
        .map_err(|e| e.to_string())?
        .with_progress_callback(Arc::new(move |progress: &CrawlProgress| {
            let line = format_progress(progress);
            if let Some(ref pb) = pb_clone {
                pb.set_message(line.clone());
            }
            if let Some(ref callback) = progress_callback {
                callback(line);
            }
        }));

    let (crawler, interrupt_listener) = if handle_interrupts {
        let signal = Arc::new(Notify::new());
        let listener = tokio::spawn(forward_interrupts(signal.clone()));
        (crawler.with_interrupt(signal), Some(listener))
    } else {
        (crawler, None)
    };

    let result = crawler.crawl().await;

    if let Some(listener) = interrupt_listener {
        listener.abort();
    }

    // Finish progress bar (only if enabled)
    if let Some(ref pb) = progress_bar {
        match &result {
            Ok(outcome) => pb.finish_with_message(format!(
                "Crawl complete! {} pages visited",
                outcome.stats.visited
            )),
            Err(_) => pb.finish_and_clear(),
        }
    }

    result.map_err(|e| e.to_string())
}

/// Each Ctrl-C cancels one fetch.
async fn forward_interrupts(signal: Arc<Notify>) {
    while tokio::signal::ctrl_c().await.is_ok() {
        debug!("Interrupt received");
        signal.notify_one();
    }
}

/// Generate a summary report for a finished crawl
pub fn generate_crawl_report(outcome: &CrawlOutcome) -> String {
    let stats = &outcome.stats;
    let mut report = String::new();
    report.push_str("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n\n");
    report.push_str("# Summary:\n");
    report.push_str(&format!("  Start URL: {}\n", outcome.start_url));
    report.push_str(&format!("  Scope: {}\n", outcome.scope));
    report.push_str(&format!("  Node budget: {}\n", outcome.node_budget));
    report.push_str(&format!("  Pages visited: {}\n", stats.visited));
    report.push_str(&format!("  Nodes (n): {}\n", outcome.graph.node_count()));
    report.push_str(&format!("  Edges (m): {}\n", outcome.graph.edge_count()));
    report.push_str(&format!("  Failed fetches: {}\n", stats.fetch_failures));
    report.push_str(&format!("  Pages without links: {}\n", stats.empty_pages));
    report.push_str(&format!(
        "  Links dropped: {} out of scope, {} over budget, {} to failed pages\n",
        stats.out_of_scope_links, stats.budget_dropped_links, stats.failed_target_links
    ));
    if stats.interrupted {
        report.push_str("  Status: interrupted (partial graph)\n");
    } else {
        report.push_str("  Status: completed\n");
    }

    report.push_str("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n\n");

    // Group nodes by host
    let mut by_host: BTreeMap<String, usize> = BTreeMap::new();
    for node in outcome.graph.nodes() {
        if let Ok(url) = Url::parse(node)
            && let Some(host) = url.host_str()
        {
            *by_host.entry(host.to_string()).or_default() += 1;
        }
    }

    for (host, count) in &by_host {
        report.push_str(&format!("## {}\n", host));
        report.push_str(&format!("  {} pages in graph\n\n", count));
    }

    report
}
