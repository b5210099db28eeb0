pub mod admission;
pub mod crawler;
pub mod error;
pub mod fetch;
pub mod graph;
pub mod result;
pub mod scope;

pub use admission::{Admission, AdmissionController, Phase};
pub use crawler::{CrawlConfig, Crawler, InterruptPolicy, ProgressCallback};
pub use error::{FetchError, GraphError, ScanError};
pub use fetch::{FetchResult, HttpFetcher, LinkFetcher};
pub use graph::{GraphSnapshot, LinkGraph};
pub use result::{CrawlOutcome, CrawlProgress, CrawlStats};
pub use scope::{DomainScope, in_scope};
