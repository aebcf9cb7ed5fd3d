use crate::http_client::Fetcher;
use crate::models::{Chapter, Source};
use crate::sources::{madara, ScrapeError};

const BASE_URL: &str = "https://toonily.com";

/// Toonily - Madara skin; series live under /webtoon/ and the ajax endpoint
/// wants its trailing slash.
pub async fn chapters(fetcher: &Fetcher, slug: &str) -> Result<Vec<Chapter>, ScrapeError> {
    let url = format!("{BASE_URL}/webtoon/{slug}/ajax/chapters/");
    madara::fetch_chapters(fetcher, Source::Toonily, slug, &url).await
}
