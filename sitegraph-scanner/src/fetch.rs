use crate::error::{FetchError, Result};
use reqwest::Client;
use scraper::{Html, Selector};
use std::collections::HashSet;
use std::future::Future;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// `Ok(None)` means the page was fetched but is not something we extract
/// links from (non-HTML).
pub type FetchResult = std::result::Result<Option<Vec<String>>, FetchError>;

/// Turns a page URL into the canonical absolute URLs it links to.
///
/// Implementations own canonicalization and content-type filtering; the
/// crawler treats every returned string as an opaque page identity.
pub trait LinkFetcher {
    fn fetch_links(&self, url: &str) -> impl Future<Output = FetchResult> + Send;
}

pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self> {
        Self::with_timeout(10)
    }

    pub fn with_timeout(timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("sitegraph/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(timeout_secs.div_ceil(2)))
            .pool_max_idle_per_host(8)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(60))
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()?;

        Ok(Self { client })
    }
}

impl LinkFetcher for HttpFetcher {
    async fn fetch_links(&self, url: &str) -> FetchResult {
        debug!("Fetching {}", url);

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let is_html = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|ct| ct.contains("text/html") || ct.contains("application/xhtml+xml"))
            .unwrap_or(false);
        if !is_html {
            debug!("  -> not HTML, no links taken");
            return Ok(None);
        }

        // Resolve relative links against where we ended up after redirects.
        let base = response.url().clone();
        let body = response.text().await?;

        Ok(Some(extract_links(&body, &base)))
    }
}

/// Canonical, de-duplicated `a[href]` targets of an HTML document, in
/// document order.
pub fn extract_links(html: &str, base: &Url) -> Vec<String> {
    let document = Html::parse_document(html);
    let Ok(link_selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    let mut seen = HashSet::new();
    let mut links = Vec::new();
    for element in document.select(&link_selector) {
        if let Some(href) = element.value().attr("href")
            && let Some(absolute_url) = resolve_url(base, href)
            && seen.insert(absolute_url.clone())
        {
            debug!("Found link: {}", absolute_url);
            links.push(absolute_url);
        }
    }
    links
}

fn resolve_url(base: &Url, href: &str) -> Option<String> {
    let href = href.trim();
    // Skip empty, javascript:, mailto:, tel:, etc.
    if href.is_empty()
        || href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with('#')
    {
        return None;
    }

    canonicalize(&base.join(href).ok()?)
}

/// Drops query and fragment so parameterised variants of a page collapse to
/// one identity. Non-HTTP schemes yield `None`.
pub fn canonicalize(url: &Url) -> Option<String> {
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }
    let mut url = url.clone();
    url.set_query(None);
    url.set_fragment(None);
    Some(url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{method, path},
    };

    fn html_response(body: &str) -> ResponseTemplate {
        ResponseTemplate::new(200)
            .insert_header("content-type", "text/html; charset=utf-8")
            .set_body_bytes(body.as_bytes())
    }

    #[test]
    fn test_canonicalize_strips_query_and_fragment() {
        let url = Url::parse("https://example.com/news?id=7&page=2#top").unwrap();
        assert_eq!(
            canonicalize(&url),
            Some("https://example.com/news".to_string())
        );
    }

    #[test]
    fn test_canonicalize_rejects_non_http_schemes() {
        let url = Url::parse("ftp://example.com/file").unwrap();
        assert_eq!(canonicalize(&url), None);
    }

    #[test]
    fn test_extract_links_resolves_and_dedups() {
        let base = Url::parse("http://example.com/dir/page").unwrap();
        let html = r##"<html><body>
            <a href="other">relative</a>
            <a href="/root?session=1">root with query</a>
            <a href="/root?session=2">root again</a>
            <a href="http://example.com/dir/other#frag">same as first</a>
            <a href="#section">fragment only</a>
            <a href="mailto:me@example.com">mail</a>
            <a href="javascript:void(0)">js</a>
            <a href="">empty</a>
            <a>no href</a>
        </body></html>"##;

        assert_eq!(
            extract_links(html, &base),
            vec![
                "http://example.com/dir/other".to_string(),
                "http://example.com/root".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_fetch_html_page() {
        let mock_server = MockServer::start().await;
        let root_html = format!(
            r#"<html><body>
                <a href="{}/page1">Page 1</a>
                <a href="/page2?ref=home">Page 2</a>
            </body></html>"#,
            mock_server.uri()
        );
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(html_response(&root_html))
            .mount(&mock_server)
            .await;

        let fetcher = HttpFetcher::new().unwrap();
        let links = fetcher
            .fetch_links(&format!("{}/", mock_server.uri()))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(
            links,
            vec![
                format!("{}/page1", mock_server.uri()),
                format!("{}/page2", mock_server.uri()),
            ]
        );
    }

    #[tokio::test]
    async fn test_fetch_non_html_yields_none() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/data.json"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "application/json")
                    .set_body_bytes(br#"{"href": "http://example.com"}"#),
            )
            .mount(&mock_server)
            .await;

        let fetcher = HttpFetcher::new().unwrap();
        let result = fetcher
            .fetch_links(&format!("{}/data.json", mock_server.uri()))
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_fetch_error_status_is_failure() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&mock_server)
            .await;

        let fetcher = HttpFetcher::new().unwrap();
        let err = fetcher
            .fetch_links(&format!("{}/missing", mock_server.uri()))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Status { status: 404, .. }));
        assert!(!err.is_cancellation());
    }

    #[tokio::test]
    async fn test_fetch_unreachable_host_is_failure() {
        // nothing listens on port 1
        let fetcher = HttpFetcher::with_timeout(2).unwrap();
        let err = fetcher
            .fetch_links("http://127.0.0.1:1/")
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Http(_)));
    }
}
