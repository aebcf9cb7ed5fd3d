use std::time::Duration;

use rand::Rng;
use reqwest::{Client, ClientBuilder, Method, Response};
use tokio::time::sleep;

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

/// Retry/backoff configuration for outbound requests.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub timeout: Duration,
    pub max_retries: usize,
    pub initial_retry_delay_ms: u64,
    pub max_retry_delay_ms: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_retries: 4,
            initial_retry_delay_ms: 500,
            max_retry_delay_ms: 8000,
        }
    }
}

/// HTTP client shared by every scraper: browser-ish headers plus retry with
/// exponential backoff for transient upstream failures.
#[derive(Clone)]
pub struct Fetcher {
    client: Client,
    config: HttpConfig,
}

impl Fetcher {
    pub fn new(config: HttpConfig) -> Result<Self, reqwest::Error> {
        let client = ClientBuilder::new()
            .timeout(config.timeout)
            .user_agent(USER_AGENT)
            .gzip(true)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()?;
        Ok(Self { client, config })
    }

    /// Exponential backoff with ±25% jitter to avoid hammering a recovering site.
    fn retry_delay(&self, attempt: usize) -> Duration {
        let base = self.config.initial_retry_delay_ms;
        let delay_ms = (base * 2u64.pow(attempt as u32)).min(self.config.max_retry_delay_ms);
        let jitter = rand::thread_rng().gen_range(0.75..=1.25);
        Duration::from_millis((delay_ms as f64 * jitter) as u64)
    }

    /// Rate limiting, server errors, and the Cloudflare 52x range.
    fn is_retryable_status(status: reqwest::StatusCode) -> bool {
        matches!(
            status.as_u16(),
            429 | 500 | 502 | 503 | 504 | 520 | 521 | 522 | 523 | 524
        )
    }

    pub async fn get(&self, url: &str) -> Result<Response, reqwest::Error> {
        self.request(Method::GET, url).await
    }

    pub async fn post(&self, url: &str) -> Result<Response, reqwest::Error> {
        self.request(Method::POST, url).await
    }

    /// Send a request, retrying retryable statuses and transport failures.
    ///
    /// Non-retryable statuses (404, 403, ...) are returned untouched so callers
    /// can map them to domain errors.
    pub async fn request(&self, method: Method, url: &str) -> Result<Response, reqwest::Error> {
        let mut last_error = None;

        for attempt in 0..=self.config.max_retries {
            match self.client.request(method.clone(), url).send().await {
                Ok(response) => {
                    let status = response.status();
                    if Self::is_retryable_status(status) && attempt < self.config.max_retries {
                        log::warn!(
                            "retryable status {} from {}, attempt {}/{}",
                            status,
                            url,
                            attempt + 1,
                            self.config.max_retries + 1
                        );
                        sleep(self.retry_delay(attempt)).await;
                        continue;
                    }
                    return Ok(response);
                }
                Err(e) => {
                    let transient = e.is_timeout() || e.is_connect() || e.is_request();
                    if transient && attempt < self.config.max_retries {
                        log::warn!(
                            "request to {} failed, attempt {}/{}: {}",
                            url,
                            attempt + 1,
                            self.config.max_retries + 1,
                            e
                        );
                        sleep(self.retry_delay(attempt)).await;
                        last_error = Some(e);
                        continue;
                    }
                    return Err(e);
                }
            }
        }

        Err(last_error.expect("retry loop exits early unless an error was stored"))
    }

    pub fn client(&self) -> &Client {
        &self.client
    }
}
