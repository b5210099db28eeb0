use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("HTTP client error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ScanError>;

/// Why a single page could not be turned into a link list.
///
/// Every variant except [`FetchError::Cancelled`] is a fetch failure: the
/// crawler drops the page's node and moves on. Cancellation is routed through
/// the configured [`InterruptPolicy`](crate::crawler::InterruptPolicy).
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{url} answered with HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("fetch cancelled by operator")]
    Cancelled,

    #[error("{0}")]
    Other(String),
}

impl FetchError {
    pub fn is_cancellation(&self) -> bool {
        matches!(self, FetchError::Cancelled)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("no node for {0}")]
    UnknownNode(String),

    #[error("cannot take the first {requested} nodes of a graph with {available}")]
    SubgraphTooLarge { requested: usize, available: usize },
}
