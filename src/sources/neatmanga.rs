use crate::http_client::Fetcher;
use crate::models::{Chapter, Source};
use crate::sources::{madara, ScrapeError};

const BASE_URL: &str = "https://neatmanga.com";

/// Neatmanga - Madara skin, chapter list behind the series ajax endpoint.
pub async fn chapters(fetcher: &Fetcher, slug: &str) -> Result<Vec<Chapter>, ScrapeError> {
    let url = format!("{BASE_URL}/manga/{slug}/ajax/chapters");
    madara::fetch_chapters(fetcher, Source::Neatmanga, slug, &url).await
}
