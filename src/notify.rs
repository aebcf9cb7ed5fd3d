//! Push notification for freshly published chapters: one JSON webhook with a
//! title and a Markdown body, one line per chapter.

use reqwest::Url;
use serde::Serialize;
use thiserror::Error;

use crate::sync::NewChapters;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("invalid webhook url '{url}': {source}")]
    InvalidUrl {
        url: String,
        source: url::ParseError,
    },

    #[error("webhook request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("webhook answered {status}")]
    Status { status: reqwest::StatusCode },
}

#[derive(Serialize)]
struct Payload<'a> {
    title: &'a str,
    body: &'a str,
}

#[derive(Debug)]
pub struct Notifier {
    client: reqwest::Client,
    webhook_url: Option<Url>,
}

impl Notifier {
    pub fn new(client: reqwest::Client, webhook_url: Option<&str>) -> Result<Self, NotifyError> {
        let webhook_url = webhook_url
            .map(|raw| {
                Url::parse(raw).map_err(|source| NotifyError::InvalidUrl {
                    url: raw.to_string(),
                    source,
                })
            })
            .transpose()?;
        Ok(Self {
            client,
            webhook_url,
        })
    }

    /// Push a notification for the given chapters. Empty input is a no-op;
    /// without a configured webhook the announcement only hits the log.
    pub async fn send(&self, fresh: &NewChapters) -> Result<(), NotifyError> {
        if fresh.is_empty() {
            return Ok(());
        }

        let (title, body) = render(fresh);

        let Some(url) = &self.webhook_url else {
            log::info!("no webhook configured; new chapters:\n{body}");
            return Ok(());
        };

        let response = self
            .client
            .post(url.clone())
            .json(&Payload {
                title: &title,
                body: &body,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(NotifyError::Status {
                status: response.status(),
            });
        }

        log::info!("notified {} series via webhook", fresh.len());
        Ok(())
    }
}

fn render(fresh: &NewChapters) -> (String, String) {
    let names: Vec<&str> = fresh.keys().map(String::as_str).collect();
    let title = format!("mangawatch ({})", names.join(", "));

    let body = fresh
        .iter()
        .flat_map(|(name, chapters)| {
            chapters
                .iter()
                .map(move |c| format!("- [{} #{}]({})", name, c.num, c.url))
        })
        .collect::<Vec<_>>()
        .join("\n");

    (title, body)
}
