//! Shared scraping for Madara/WP-Manga themed sites.
//!
//! These sites expose the chapter list as an HTML fragment behind a POST-only
//! ajax endpoint. The markup is the same across skins: one `li.wp-manga-chapter`
//! per chapter, an anchor labelled `Chapter N`, and the release date in an `i`
//! element (inside `span.chapter-release-date` on most skins).

use chrono::Utc;
use scraper::{ElementRef, Html, Selector};

use crate::http_client::Fetcher;
use crate::models::{Chapter, Source};
use crate::sources::{dates, ScrapeError};

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("static selector is valid")
}

/// Fetch and parse a Madara chapter-list ajax endpoint.
pub(crate) async fn fetch_chapters(
    fetcher: &Fetcher,
    source: Source,
    slug: &str,
    ajax_url: &str,
) -> Result<Vec<Chapter>, ScrapeError> {
    let response = fetcher.post(ajax_url).await?;

    if response.status() == reqwest::StatusCode::NOT_FOUND {
        return Err(ScrapeError::NotFound {
            site: source,
            slug: slug.to_string(),
        });
    }
    if !response.status().is_success() {
        return Err(ScrapeError::Status {
            status: response.status(),
            url: ajax_url.to_string(),
        });
    }

    parse_fragment(&response.text().await?)
}

/// Parse the chapter-list fragment returned by the ajax endpoint.
pub(crate) fn parse_fragment(html: &str) -> Result<Vec<Chapter>, ScrapeError> {
    let document = Html::parse_document(html);
    let row = selector("li.wp-manga-chapter");
    let link = selector("a");

    let mut chapters = Vec::new();
    let now = Utc::now();

    for item in document.select(&row) {
        let anchor = item
            .select(&link)
            .next()
            .ok_or_else(|| ScrapeError::Parse("chapter row without a link".into()))?;
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
            return Err(ScrapeError::Parse(format!(
                "empty chapter label for {href}"
            )));
        }

        chapters.push(Chapter {
            num,
            url: href.to_string(),
            released: dates::parse_release(&release_text(&item), now),
        });
    }

    if chapters.is_empty() {
        // a Madara fragment always carries the list; an empty parse means the
        // markup changed under us
        return Err(ScrapeError::Parse(
            "no li.wp-manga-chapter rows found".into(),
        ));
    }

    Ok(chapters)
}

fn release_text(item: &ElementRef) -> String {
    let dated = selector("span.chapter-release-date i");
    let bare = selector("i");
    item.select(&dated)
        .next()
        .or_else(|| item.select(&bare).next())
        .map(|i| i.text().collect::<String>())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    const FRAGMENT: &str = r#"
        <ul class="main version-chap">
            <li class="wp-manga-chapter">
                <a href="https://example.com/manga/berserk/chapter-375/">Chapter 375</a>
                <span class="chapter-release-date"><i>2 days ago</i></span>
            </li>
            <li class="wp-manga-chapter">
                <a href="https://example.com/manga/berserk/chapter-374/">Chapter 374</a>
                <span class="chapter-release-date"><i>January 5, 2024</i></span>
            </li>
            <li class="wp-manga-chapter">
                <a href="https://example.com/manga/berserk/chapter-373-5/">Chapter 373.5</a>
                <i>3 weeks ago</i>
            </li>
        </ul>
    "#;

    #[test]
    fn parses_chapter_rows() {
        let chapters = parse_fragment(FRAGMENT).unwrap();
        assert_eq!(chapters.len(), 3);
        assert_eq!(chapters[0].num, "375");
        assert_eq!(
            chapters[0].url,
            "https://example.com/manga/berserk/chapter-375/"
        );
        assert_eq!(chapters[1].num, "374");
        assert_eq!(chapters[2].num, "373.5");
    }

    #[test]
    fn absolute_release_date_is_parsed() {
        let chapters = parse_fragment(FRAGMENT).unwrap();
        assert_eq!(
            chapters[1].released.format("%Y-%m-%d").to_string(),
            "2024-01-05"
        );
    }

    #[test]
    fn release_date_outside_span_still_found() {
        let chapters = parse_fragment(FRAGMENT).unwrap();
        // third row has a bare <i> and a relative date; it lands near now
        let age = Utc::now() - chapters[2].released;
        assert!(age >= chrono::Duration::weeks(3));
        assert!(age < chrono::Duration::weeks(3) + chrono::Duration::minutes(5));
    }

    #[test]
    fn empty_fragment_is_a_parse_error() {
        let err = parse_fragment("<div>maintenance</div>").unwrap_err();
        assert!(matches!(err, ScrapeError::Parse(_)));
    }

    #[test]
    fn row_without_href_is_a_parse_error() {
        let html = r#"<li class="wp-manga-chapter"><a>Chapter 1</a></li>"#;
        assert!(matches!(
            parse_fragment(html),
            Err(ScrapeError::Parse(_))
        ));
    }
}
