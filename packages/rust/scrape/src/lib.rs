//! Source page scraping for content update jobs.
//!
//! The pipeline depends on the [`SourceScraper`] trait rather than a concrete
//! HTTP client, so tests can substitute canned snapshots. [`HttpScraper`] is
//! the production implementation: fetch, extract the main content region,
//! and reduce it to markdown-ish text for the rewrite prompt.

mod extract;
mod http;

pub use extract::{extract_main_text, extract_title};
pub use http::HttpScraper;

use docforge_shared::{Result, ScrapedSnapshot};

/// Fetches one source URL and returns its extracted snapshot.
///
/// Implementations must be cheap to share; the pipeline scrapes a job's
/// sources concurrently from a single instance.
#[allow(async_fn_in_trait)]
pub trait SourceScraper: Send + Sync {
    async fn scrape(&self, url: &str) -> Result<ScrapedSnapshot>;
}
