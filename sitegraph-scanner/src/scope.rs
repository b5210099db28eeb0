use url::Url;

/// Host-suffix filter deciding which discovered links belong to the crawl.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainScope {
    suffix: String,
}

impl DomainScope {
    pub fn new(suffix: &str) -> Self {
        Self {
            suffix: suffix.trim().trim_start_matches('.').to_ascii_lowercase(),
        }
    }

    /// Scope covering the host of `url` and all of its subdomains.
    pub fn from_url(url: &Url) -> Option<Self> {
        url.host_str().map(Self::new)
    }

    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    pub fn in_scope(&self, url: &str) -> bool {
        if let Ok(parsed) = Url::parse(url)
            && let Some(host) = parsed.host_str()
        {
            return host_matches(&host.to_ascii_lowercase(), &self.suffix);
        }
        false
    }
}

pub fn in_scope(url: &str, scope_suffix: &str) -> bool {
    DomainScope::new(scope_suffix).in_scope(url)
}

fn host_matches(host: &str, suffix: &str) -> bool {
    if suffix.is_empty() {
        return false;
    }
    host == suffix
        || host
            .strip_suffix(suffix)
            .is_some_and(|prefix| prefix.ends_with('.'))
}
