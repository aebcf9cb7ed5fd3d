//! Orchestration: scrape every tracked series, reconcile against the cached
//! snapshot, persist the merged snapshot, and report what's new.
//!
//! One failing series must never poison the run: its cached entry is carried
//! into the next snapshot untouched and every other series proceeds normally.

use std::collections::{BTreeMap, HashMap};

use futures::stream::{self, StreamExt};
use thiserror::Error;

use crate::cache::{CacheError, SnapshotStore};
use crate::config::SourcesConfig;
use crate::http_client::Fetcher;
use crate::models::{self, Chapter, Manga, Source};
use crate::sources::{self, ScrapeError};

/// New chapters per series name, in name order.
pub type NewChapters = BTreeMap<String, Vec<Chapter>>;

const SCRAPE_CONCURRENCY: usize = 4;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Cache(#[from] CacheError),
}

struct ScrapeOutcome {
    source: Source,
    name: String,
    result: Result<Vec<Chapter>, ScrapeError>,
}

/// Run one full check: load snapshot, scrape, reconcile, persist.
///
/// The snapshot is persisted exactly once, after every source has been
/// processed; a persistence failure is an error (otherwise the same chapters
/// would be re-announced on every run).
pub async fn run(
    fetcher: &Fetcher,
    store: &SnapshotStore,
    sources_cfg: &SourcesConfig,
) -> Result<NewChapters, SyncError> {
    let cached = store.load().await?;
    let outcomes = scrape_all(fetcher, sources_cfg).await;
    let (snapshot, fresh) = reconcile(cached, outcomes);
    store.store(&snapshot).await?;
    Ok(fresh)
}

/// Scrape every tracked series with bounded concurrency, preserving the
/// configured order so the snapshot stays deterministic.
async fn scrape_all(fetcher: &Fetcher, sources_cfg: &SourcesConfig) -> Vec<ScrapeOutcome> {
    let tracked: Vec<(Source, String)> = sources_cfg
        .tracked()
        .into_iter()
        .map(|(source, slug)| (source, slug.to_string()))
        .collect();

    stream::iter(tracked)
        .map(|(source, name)| async move {
            log::debug!("checking {}/{}", source, name);
            let result = sources::chapters(fetcher, source, &name).await;
            ScrapeOutcome {
                source,
                name,
                result,
            }
        })
        .buffered(SCRAPE_CONCURRENCY)
        .collect()
        .await
}

/// Pure diff-and-merge core.
///
/// Per series:
/// - scrape failed: keep the cached entry unchanged, announce nothing;
/// - first sighting: cache everything, announce nothing;
/// - otherwise: announce chapters absent from the cache, cache the union.
///
/// Cached series that are no longer configured are dropped from the snapshot.
fn reconcile(cached: Vec<Manga>, outcomes: Vec<ScrapeOutcome>) -> (Vec<Manga>, NewChapters) {
    let mut cache_by_name: HashMap<String, Manga> =
        cached.into_iter().map(|m| (m.name.clone(), m)).collect();

    let mut snapshot = Vec::with_capacity(outcomes.len());
    let mut fresh = NewChapters::new();

    for outcome in outcomes {
        let previous = cache_by_name.remove(&outcome.name);

        match (outcome.result, previous) {
            (Err(e), Some(entry)) => {
                log::warn!(
                    "scrape failed for {}/{}, keeping {} cached chapters: {}",
                    outcome.source,
                    outcome.name,
                    entry.n_chapters(),
                    e
                );
                snapshot.push(entry);
            }
            (Err(e), None) => {
                log::warn!(
                    "scrape failed for {}/{} (nothing cached yet): {}",
                    outcome.source,
                    outcome.name,
                    e
                );
            }
            (Ok(chapters), None) => {
                let manga = Manga::new(outcome.name, outcome.source, chapters);
                log::info!(
                    "first sighting of {}/{}: {} chapters cached, none announced",
                    outcome.source,
                    manga.name,
                    manga.n_chapters()
                );
                snapshot.push(manga);
            }
            (Ok(chapters), Some(entry)) => {
                let new = models::new_chapters(&entry.chapters, &chapters);
                if new.is_empty() {
                    log::debug!("nothing new for {}/{}", outcome.source, outcome.name);
                } else {
                    log::info!(
                        "new chapters for {}/{}: {:?}",
                        outcome.source,
                        outcome.name,
                        new.iter().map(|c| c.num.as_str()).collect::<Vec<_>>()
                    );
                    fresh.insert(outcome.name.clone(), new);
                }
                snapshot.push(Manga::new(
                    outcome.name,
                    outcome.source,
                    models::merge_chapters(&entry.chapters, &chapters),
                ));
            }
        }
    }

    for name in cache_by_name.into_keys() {
        log::info!("'{}' is no longer tracked, dropping it from the snapshot", name);
    }

    (snapshot, fresh)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn ch(num: &str) -> Chapter {
        Chapter {
            num: num.to_string(),
            url: format!("https://example.com/ch/{num}"),
            released: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    fn ok(name: &str, nums: &[&str]) -> ScrapeOutcome {
        ScrapeOutcome {
            source: Source::Neatmanga,
            name: name.to_string(),
            result: Ok(nums.iter().map(|n| ch(n)).collect()),
        }
    }

    fn failed(name: &str) -> ScrapeOutcome {
        ScrapeOutcome {
            source: Source::Neatmanga,
            name: name.to_string(),
            result: Err(ScrapeError::Parse("markup changed".into())),
        }
    }

    fn manga(name: &str, nums: &[&str]) -> Manga {
        Manga::new(name, Source::Neatmanga, nums.iter().map(|n| ch(n)).collect())
    }

    #[test]
    fn first_sighting_caches_but_announces_nothing() {
        let (snapshot, fresh) = reconcile(vec![], vec![ok("berserk", &["1", "2", "3"])]);
        assert!(fresh.is_empty());
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].n_chapters(), 3);
    }

    #[test]
    fn nothing_new_when_scrape_matches_cache() {
        let cached = vec![manga("berserk", &["1", "2"])];
        let (snapshot, fresh) = reconcile(cached, vec![ok("berserk", &["1", "2"])]);
        assert!(fresh.is_empty());
        assert_eq!(snapshot[0].n_chapters(), 2);
    }

    #[test]
    fn new_chapters_are_announced_and_merged() {
        let cached = vec![manga("berserk", &["1", "2"])];
        let (snapshot, fresh) = reconcile(cached, vec![ok("berserk", &["2", "3", "4"])]);

        let nums: Vec<&str> = fresh["berserk"].iter().map(|c| c.num.as_str()).collect();
        assert_eq!(nums, ["3", "4"]);

        // the snapshot is the union: chapter 1 vanished upstream but stays cached
        let cached_nums: Vec<&str> = snapshot[0].chapters.iter().map(|c| c.num.as_str()).collect();
        assert_eq!(cached_nums, ["1", "2", "3", "4"]);
    }

    #[test]
    fn failed_scrape_preserves_cached_entry() {
        let cached = vec![manga("berserk", &["1", "2"]), manga("overgeared", &["9"])];
        let (snapshot, fresh) = reconcile(
            cached,
            vec![failed("berserk"), ok("overgeared", &["9", "10"])],
        );

        assert_eq!(fresh.len(), 1);
        assert_eq!(fresh["overgeared"][0].num, "10");

        let berserk = snapshot.iter().find(|m| m.name == "berserk").unwrap();
        assert_eq!(berserk.n_chapters(), 2);
    }

    #[test]
    fn failed_scrape_with_no_cache_adds_nothing() {
        let (snapshot, fresh) = reconcile(vec![], vec![failed("berserk")]);
        assert!(snapshot.is_empty());
        assert!(fresh.is_empty());
    }

    #[test]
    fn untracked_manga_is_dropped_from_snapshot() {
        let cached = vec![manga("berserk", &["1"]), manga("old-series", &["5"])];
        let (snapshot, _) = reconcile(cached, vec![ok("berserk", &["1"])]);
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].name, "berserk");
    }

    #[test]
    fn chapters_missing_upstream_are_not_re_announced() {
        // site trimmed its listing to the latest chapters only
        let cached = vec![manga("berserk", &["1", "2", "3"])];
        let (snapshot, fresh) = reconcile(cached, vec![ok("berserk", &["3"])]);
        assert!(fresh.is_empty());
        assert_eq!(snapshot[0].n_chapters(), 3);
    }

    #[test]
    fn announcements_are_in_chapter_order() {
        let cached = vec![manga("berserk", &["1"])];
        let (_, fresh) = reconcile(cached, vec![ok("berserk", &["1", "10", "2", "9"])]);
        let nums: Vec<&str> = fresh["berserk"].iter().map(|c| c.num.as_str()).collect();
        assert_eq!(nums, ["2", "9", "10"]);
    }
}
