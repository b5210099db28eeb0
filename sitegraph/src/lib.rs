pub mod handlers;

// Re-export commonly used handler functions for convenience
pub use handlers::{
    describe_graph_file, parse_interrupt_policy, parse_start_url, resolve_format,
    resolve_output_path, write_subgraph,
};

// Re-export crawl functionality from sitegraph-core
pub use sitegraph_core::crawl::{
    CrawlOptions, CrawlProgressCallback, execute_crawl, generate_crawl_report,
};
