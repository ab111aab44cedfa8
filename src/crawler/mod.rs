//! Crawl engine: session scheduling, fetching, and link extraction

mod extractor;
mod fetcher;
mod session;

pub use extractor::extract_links;
pub use fetcher::{build_http_client, FetchFailure, FetchOutcome, FetchedPage, Fetcher};
pub use session::{CrawlSession, StopHandle, Termination};
