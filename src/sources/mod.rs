//! Per-source chapter scrapers.
//!
//! Each site module exposes `chapters(fetcher, slug)`; [`chapters`] dispatches
//! on [`Source`]. Neatmanga and Toonily share the Madara skin and delegate to
//! [`madara`] for the actual parsing.

pub mod dates;
pub mod madara;
pub mod mangapill;
pub mod neatmanga;
pub mod toonily;

use reqwest::StatusCode;
use thiserror::Error;

use crate::http_client::Fetcher;
use crate::models::{Chapter, Source};

#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("series '{slug}' not found on {site}")]
    NotFound { site: Source, slug: String },

    #[error("unexpected status {status} from {url}")]
    Status { status: StatusCode, url: String },

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("failed to parse chapter listing: {0}")]
    Parse(String),
}

/// Scrape the chapter list for one series from the given source.
///
/// Returns chapters deduplicated by identity, in chapter order (sites
/// occasionally repeat rows in their listings).
pub async fn chapters(
    fetcher: &Fetcher,
    source: Source,
    slug: &str,
) -> Result<Vec<Chapter>, ScrapeError> {
    let chapters = match source {
        Source::Neatmanga => neatmanga::chapters(fetcher, slug).await,
        Source::Mangapill => mangapill::chapters(fetcher, slug).await,
        Source::Toonily => toonily::chapters(fetcher, slug).await,
    }?;
    Ok(crate::models::dedup_and_sort(chapters))
}
