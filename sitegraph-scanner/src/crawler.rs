use crate::admission::{Admission, AdmissionController};
use crate::error::{FetchError, Result, ScanError};
use crate::fetch::{FetchResult, LinkFetcher, canonicalize};
use crate::graph::LinkGraph;
use crate::result::{CrawlOutcome, CrawlProgress, CrawlStats};
use crate::scope::DomainScope;
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use tokio::sync::Notify;
use tracing::{debug, info, warn};
use url::Url;

pub type ProgressCallback = Arc<dyn Fn(&CrawlProgress) + Send + Sync>;

/// What an operator interrupt does to a running crawl.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InterruptPolicy {
    /// Stop the crawl and return the graph built so far.
    #[default]
    Abort,
    /// Treat the interrupted page like a failed fetch and keep going.
    SkipPage,
}

/// Static parameters of a single crawl run.
#[derive(Debug, Clone)]
pub struct CrawlConfig {
    pub start_url: String,
    pub node_budget: usize,
    /// Host suffix defining the crawl region. Defaults to the start URL's host.
    pub scope: Option<String>,
    pub interrupt_policy: InterruptPolicy,
}

impl CrawlConfig {
    pub fn new(start_url: impl Into<String>, node_budget: usize) -> Self {
        Self {
            start_url: start_url.into(),
            node_budget,
            scope: None,
            interrupt_policy: InterruptPolicy::default(),
        }
    }

    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    pub fn with_interrupt_policy(mut self, policy: InterruptPolicy) -> Self {
        self.interrupt_policy = policy;
        self
    }
}

/// Breadth-first crawler growing a [`LinkGraph`] from one start page.
///
/// Pages are fetched one at a time in FIFO order. Each in-scope link goes
/// through the [`AdmissionController`], so the graph never holds more than
/// the configured node budget. A page whose fetch fails is removed from the
/// graph with all of its edges and is never admitted again.
pub struct Crawler<F> {
    fetcher: F,
    start_url: String,
    scope: DomainScope,
    admission: AdmissionController,
    interrupt_policy: InterruptPolicy,
    progress_callback: Option<ProgressCallback>,
    interrupt: Option<Arc<Notify>>,
}

impl<F: LinkFetcher> Crawler<F> {
    pub fn new(fetcher: F, config: CrawlConfig) -> Result<Self> {
        let parsed = Url::parse(&config.start_url)
            .map_err(|e| ScanError::InvalidUrl(format!("{}: {}", config.start_url, e)))?;
        let start_url = canonicalize(&parsed).ok_or_else(|| {
            ScanError::InvalidUrl(format!("{}: only http and https are crawled", parsed))
        })?;

        if config.node_budget == 0 {
            return Err(ScanError::InvalidConfig(
                "node budget must be at least 1".to_string(),
            ));
        }

        let scope = match config.scope.as_deref() {
            Some(suffix) => DomainScope::new(suffix),
            None => DomainScope::from_url(&parsed).ok_or_else(|| {
                ScanError::InvalidConfig(format!("{} has no host to scope the crawl to", parsed))
            })?,
        };
        if scope.suffix().is_empty() {
            return Err(ScanError::InvalidConfig(
                "scope suffix must not be empty".to_string(),
            ));
        }

        Ok(Self {
            fetcher,
            start_url,
            scope,
            admission: AdmissionController::new(config.node_budget),
            interrupt_policy: config.interrupt_policy,
            progress_callback: None,
            interrupt: None,
        })
    }

    pub fn with_progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    /// Installs an interrupt source. Every `notify_one` on it cancels one
    /// fetch (the one in flight, or the next one to start).
    pub fn with_interrupt(mut self, signal: Arc<Notify>) -> Self {
        self.interrupt = Some(signal);
        self
    }

    pub fn start_url(&self) -> &str {
        &self.start_url
    }

    pub fn scope(&self) -> &DomainScope {
        &self.scope
    }

    pub fn node_budget(&self) -> usize {
        self.admission.budget()
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    pub async fn crawl(&self) -> Result<CrawlOutcome> {
        info!(
            "Starting crawl of {} (budget {} nodes, scope {})",
            self.start_url,
            self.admission.budget(),
            self.scope.suffix()
        );

        let mut graph = LinkGraph::new();
        graph.add_node(&self.start_url);
        let mut frontier = VecDeque::from([self.start_url.clone()]);
        let mut visited: HashSet<String> = HashSet::new();
        let mut failed: HashSet<String> = HashSet::new();
        let mut stats = CrawlStats::default();

        while let Some(url) = frontier.pop_front() {
            if !visited.insert(url.clone()) {
                continue;
            }
            stats.visited = visited.len();
            self.report_progress(&graph, visited.len(), &url);

            let links = match self.fetch(&url).await {
                Ok(Some(links)) if !links.is_empty() => links,
                Ok(_) => {
                    debug!("No links on {}", url);
                    stats.empty_pages += 1;
                    continue;
                }
                Err(FetchError::Cancelled) if self.interrupt_policy == InterruptPolicy::Abort => {
                    warn!("Interrupted while visiting {}, stopping crawl", url);
                    stats.interrupted = true;
                    break;
                }
                Err(e) => {
                    warn!("Fetch failed for {}: {} (node removed)", url, e);
                    graph.remove_node(&url);
                    failed.insert(url);
                    stats.fetch_failures += 1;
                    continue;
                }
            };

            for link in links {
                if !self.scope.in_scope(&link) {
                    debug!("  -> {} out of scope, skipping", link);
                    stats.out_of_scope_links += 1;
                    continue;
                }
                if failed.contains(&link) {
                    debug!("  -> {} failed earlier, skipping", link);
                    stats.failed_target_links += 1;
                    continue;
                }

                match self.admission.admit(&mut graph, &url, &link)? {
                    Admission::Created if !visited.contains(&link) => {
                        debug!("  -> {} admitted, queued", link);
                        frontier.push_back(link);
                    }
                    Admission::Dropped => {
                        debug!("  -> {} dropped, node budget spent", link);
                        stats.budget_dropped_links += 1;
                    }
                    _ => {}
                }
            }
        }

        info!(
            "Crawled {} pages, producing a graph with n = {} nodes and m = {} edges",
            stats.visited,
            graph.node_count(),
            graph.edge_count()
        );
        Ok(CrawlOutcome {
            start_url: self.start_url.clone(),
            scope: self.scope.suffix().to_string(),
            node_budget: self.admission.budget(),
            graph,
            stats,
        })
    }

    async fn fetch(&self, url: &str) -> FetchResult {
        match &self.interrupt {
            Some(signal) => tokio::select! {
                biased;
                _ = signal.notified() => Err(FetchError::Cancelled),
                result = self.fetcher.fetch_links(url) => result,
            },
            None => self.fetcher.fetch_links(url).await,
        }
    }

    fn report_progress(&self, graph: &LinkGraph, visited: usize, url: &str) {
        info!(
            "n = {} m = {} visited {} pages, visiting {}",
            graph.node_count(),
            graph.edge_count(),
            visited,
            url
        );
        if let Some(ref callback) = self.progress_callback {
            callback(&CrawlProgress {
                nodes: graph.node_count(),
                edges: graph.edge_count(),
                visited,
                url: url.to_string(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::HttpFetcher;
    use std::sync::Mutex;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{method, path},
    };

    fn html(body: String) -> ResponseTemplate {
        ResponseTemplate::new(200)
            .insert_header("content-type", "text/html")
            .set_body_bytes(body.into_bytes())
    }

    /// Root links to two pages; page1 links back to root and to a page that 404s.
    async fn mount_small_site(mock_server: &MockServer) {
        let uri = mock_server.uri();
        let pages = [
            (
                "/",
                format!(r#"<a href="{uri}/page1">1</a><a href="{uri}/page2">2</a>"#),
            ),
            (
                "/page1",
                r#"<a href="/">home</a><a href="/broken">broken</a>"#.to_string(),
            ),
            (
                "/page2",
                r#"<a href="https://elsewhere.example/">away</a>"#.to_string(),
            ),
        ];
        for (route, body) in pages {
            Mock::given(method("GET"))
                .and(path(route))
                .respond_with(html(format!("<html><body>{body}</body></html>")))
                .mount(mock_server)
                .await;
        }
        Mock::given(method("GET"))
            .and(path("/broken"))
            .respond_with(ResponseTemplate::new(404))
            .mount(mock_server)
            .await;
    }

    #[tokio::test]
    async fn test_crawl_builds_graph_over_http() {
        let mock_server = MockServer::start().await;
        mount_small_site(&mock_server).await;
        let uri = mock_server.uri();

        let crawler = Crawler::new(HttpFetcher::new().unwrap(), CrawlConfig::new(&uri, 10)).unwrap();
        let outcome = crawler.crawl().await.unwrap();

        let root = format!("{uri}/");
        let page1 = format!("{uri}/page1");
        let page2 = format!("{uri}/page2");
        assert_eq!(
            outcome.graph.nodes(),
            vec![root.as_str(), page1.as_str(), page2.as_str()]
        );
        assert_eq!(
            outcome.graph.edges(),
            vec![
                (root.as_str(), page1.as_str()),
                (root.as_str(), page2.as_str()),
                (page1.as_str(), root.as_str()),
            ]
        );
        assert_eq!(outcome.stats.visited, 4);
        assert_eq!(outcome.stats.fetch_failures, 1);
        assert_eq!(outcome.stats.out_of_scope_links, 1);
        assert!(!outcome.stats.interrupted);
    }

    #[tokio::test]
    async fn test_progress_callback_sees_every_dequeue() {
        let mock_server = MockServer::start().await;
        mount_small_site(&mock_server).await;

        let seen: Arc<Mutex<Vec<CrawlProgress>>> = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = seen.clone();
        let crawler = Crawler::new(
            HttpFetcher::new().unwrap(),
            CrawlConfig::new(mock_server.uri(), 10),
        )
        .unwrap()
        .with_progress_callback(Arc::new(move |progress: &CrawlProgress| {
            seen_clone.lock().unwrap().push(progress.clone());
        }));

        let outcome = crawler.crawl().await.unwrap();
        let seen = seen.lock().unwrap();

        assert_eq!(seen.len(), outcome.stats.visited);
        assert_eq!(seen[0].nodes, 1);
        assert_eq!(seen[0].edges, 0);
        assert_eq!(seen[0].visited, 1);
        assert_eq!(seen[0].url, format!("{}/", mock_server.uri()));
        // counts are observed before the page is fetched
        assert!(seen.windows(2).all(|w| w[0].visited + 1 == w[1].visited));
    }

    #[test]
    fn test_new_rejects_bad_config() {
        let fetcher = || HttpFetcher::new().unwrap();
        assert!(matches!(
            Crawler::new(fetcher(), CrawlConfig::new("not a url", 5)),
            Err(ScanError::InvalidUrl(_))
        ));
        assert!(matches!(
            Crawler::new(fetcher(), CrawlConfig::new("ftp://example.com/", 5)),
            Err(ScanError::InvalidUrl(_))
        ));
        assert!(matches!(
            Crawler::new(fetcher(), CrawlConfig::new("http://example.com/", 0)),
            Err(ScanError::InvalidConfig(_))
        ));
        assert!(matches!(
            Crawler::new(
                fetcher(),
                CrawlConfig::new("http://example.com/", 5).with_scope(" . ")
            ),
            Err(ScanError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_new_canonicalizes_start_and_derives_scope() {
        let crawler = Crawler::new(
            HttpFetcher::new().unwrap(),
            CrawlConfig::new("http://www.caltech.edu?lang=en#top", 2000),
        )
        .unwrap();
        assert_eq!(crawler.start_url(), "http://www.caltech.edu/");
        assert_eq!(crawler.scope().suffix(), "www.caltech.edu");
        assert_eq!(crawler.node_budget(), 2000);
    }
}
