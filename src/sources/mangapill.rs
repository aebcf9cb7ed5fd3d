use chrono::Utc;
use scraper::{Html, Selector};

use crate::http_client::Fetcher;
use crate::models::{Chapter, Source};
use crate::sources::ScrapeError;

const BASE_URL: &str = "https://mangapill.com";

/// Mangapill - plain server-rendered pages, chapters listed on the series page
/// under `div#chapters`. The listing carries no release dates, so chapters get
/// stamped with the scrape time (identity excludes the timestamp anyway).
pub async fn chapters(fetcher: &Fetcher, slug: &str) -> Result<Vec<Chapter>, ScrapeError> {
    let url = format!("{BASE_URL}/manga/{slug}");
    let response = fetcher.get(&url).await?;

    if response.status() == reqwest::StatusCode::NOT_FOUND {
        return Err(ScrapeError::NotFound {
            site: Source::Mangapill,
            slug: slug.to_string(),
        });
    }
    if !response.status().is_success() {
        return Err(ScrapeError::Status {
            status: response.status(),
            url,
        });
    }

    parse_series_page(&response.text().await?)
}

fn parse_series_page(html: &str) -> Result<Vec<Chapter>, ScrapeError> {
    let document = Html::parse_document(html);
    let link = Selector::parse("div#chapters a").expect("static selector is valid");

    let now = Utc::now();
    let mut chapters = Vec::new();

    for anchor in document.select(&link) {
        let href = anchor
            .value()
            .attr("href")
            .ok_or_else(|| ScrapeError::Parse("chapter link without href".into()))?;
        let label = anchor.text().collect::<String>();
        let num = label
            .trim()
            .trim_start_matches("Chapter ")
            .trim()
            .to_string();
        if num.is_empty() {
            continue;
        }

        let url = if href.starts_with('/') {
            format!("{BASE_URL}{href}")
        } else {
            href.to_string()
        };

        chapters.push(Chapter {
            num,
            url,
            released: now,
        });
    }

    if chapters.is_empty() {
        return Err(ScrapeError::Parse(
            "no chapter links under div#chapters".into(),
        ));
    }

    Ok(chapters)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <html><body>
            <h1>Chainsaw Man</h1>
            <div id="chapters" data-filter-list>
                <a href="/chapters/723-10132000/chainsaw-man-chapter-132">Chapter 132</a>
                <a href="/chapters/723-10131000/chainsaw-man-chapter-131">Chapter 131</a>
                <a href="https://mangapill.com/chapters/723-10130500/chainsaw-man-chapter-130.5">Chapter 130.5</a>
            </div>
        </body></html>
    "#;

    #[test]
    fn parses_chapter_links() {
        let chapters = parse_series_page(PAGE).unwrap();
        assert_eq!(chapters.len(), 3);
        assert_eq!(chapters[0].num, "132");
        assert_eq!(
            chapters[0].url,
            "https://mangapill.com/chapters/723-10132000/chainsaw-man-chapter-132"
        );
        assert_eq!(chapters[2].num, "130.5");
    }

    #[test]
    fn relative_hrefs_are_absolutized() {
        let chapters = parse_series_page(PAGE).unwrap();
        assert!(chapters.iter().all(|c| c.url.starts_with(BASE_URL)));
    }

    #[test]
    fn page_without_chapter_list_is_a_parse_error() {
        let err = parse_series_page("<html><body>nope</body></html>").unwrap_err();
        assert!(matches!(err, ScrapeError::Parse(_)));
    }
}
