//! Minimal object-storage client: exactly the operations the snapshot cache
//! needs (get/put against one bucket), signed with SigV4.
//!
//! Retry policy: storage backends occasionally answer 500 or drop the
//! connection mid-response; both are retried up to [`MAX_ATTEMPTS`] times with
//! a fresh signature per attempt. Anything else surfaces immediately, with the
//! provider's XML `Code`/`Message` attached when present.

use std::collections::BTreeMap;
use std::time::Duration;

use bytes::Bytes;
use quick_xml::events::Event;
use quick_xml::Reader;
use reqwest::{Client, Method, StatusCode, Url};
use thiserror::Error;

use crate::s3::signer::SigV4Signer;

const MAX_ATTEMPTS: usize = 5;

#[derive(Debug, Error)]
pub enum S3Error {
    #[error("object '{key}' does not exist")]
    NoSuchKey { key: String },

    #[error("unexpected response {status} from {method} {url}{detail}")]
    Response {
        status: StatusCode,
        method: String,
        url: String,
        detail: String,
    },

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("invalid bucket endpoint: {0}")]
    Endpoint(String),
}

/// Options for [`S3Client::put`].
#[derive(Debug, Default, Clone)]
pub struct PutOptions {
    /// Defaults to a guess from the key's extension, then octet-stream.
    pub content_type: Option<String>,
    /// Stored as `x-amz-meta-{key}` headers.
    pub metadata: BTreeMap<String, String>,
    /// Sets `x-amz-acl: public-read`.
    pub public: bool,
}

#[derive(Debug)]
pub struct S3Client {
    http: Client,
    signer: SigV4Signer,
    endpoint: Url,
    bucket: String,
}

impl S3Client {
    pub fn new(
        endpoint: &str,
        bucket: String,
        region: String,
        access_key: String,
        secret_key: String,
    ) -> Result<Self, S3Error> {
        let endpoint =
            Url::parse(endpoint).map_err(|e| S3Error::Endpoint(format!("{endpoint}: {e}")))?;
        if endpoint.host_str().is_none() {
            return Err(S3Error::Endpoint(format!("{endpoint} has no host")));
        }

        let http = Client::builder()
            .timeout(Duration::from_secs(10))
            .connect_timeout(Duration::from_secs(3))
            .build()?;

        Ok(Self {
            http,
            signer: SigV4Signer::new(access_key, secret_key, region),
            endpoint,
            bucket,
        })
    }

    /// Download an object. A 404 maps to [`S3Error::NoSuchKey`].
    pub async fn get(&self, key: &str) -> Result<Bytes, S3Error> {
        let url = self.object_url(key)?;
        let (status, body) = self
            .send_with_retry(Method::GET, &url, &BTreeMap::new(), Bytes::new())
            .await?;

        if status == StatusCode::NOT_FOUND {
            return Err(S3Error::NoSuchKey {
                key: key.to_string(),
            });
        }
        if !status.is_success() {
            return Err(response_error("GET", &url, status, &body));
        }
        Ok(body)
    }

    /// Upload an object.
    pub async fn put(&self, key: &str, body: Bytes, opts: &PutOptions) -> Result<(), S3Error> {
        let url = self.object_url(key)?;

        let content_type = opts
            .content_type
            .clone()
            .unwrap_or_else(|| mime_guess::from_path(key).first_or_octet_stream().to_string());

        let mut headers = BTreeMap::new();
        headers.insert("content-type".to_string(), content_type);
        headers.insert("content-length".to_string(), body.len().to_string());
        for (name, value) in &opts.metadata {
            headers.insert(format!("x-amz-meta-{name}"), value.clone());
        }
        if opts.public {
            headers.insert("x-amz-acl".to_string(), "public-read".to_string());
        }

        let (status, resp_body) = self
            .send_with_retry(Method::PUT, &url, &headers, body)
            .await?;
        if !status.is_success() {
            return Err(response_error("PUT", &url, status, &resp_body));
        }
        Ok(())
    }

    /// Send the request, retrying 500s and dropped connections. Each attempt is
    /// re-signed so the x-amz-date stays fresh.
    async fn send_with_retry(
        &self,
        method: Method,
        url: &Url,
        headers: &BTreeMap<String, String>,
        body: Bytes,
    ) -> Result<(StatusCode, Bytes), S3Error> {
        let mut last_error: Option<S3Error> = None;

        for attempt in 0..MAX_ATTEMPTS {
            let signed = self.signer.sign(method.as_str(), url, headers, &body);

            let mut request = self.http.request(method.clone(), url.clone());
            for (k, v) in &signed {
                request = request.header(k, v);
            }
            if !body.is_empty() {
                request = request.body(body.clone());
            }

            match request.send().await {
                Ok(response) => {
                    let status = response.status();
                    let resp_body = response.bytes().await?;
                    if status == StatusCode::INTERNAL_SERVER_ERROR && attempt + 1 < MAX_ATTEMPTS {
                        log::warn!(
                            "storage returned 500 for {} {}, attempt {}/{}",
                            method,
                            url,
                            attempt + 1,
                            MAX_ATTEMPTS
                        );
                        last_error = Some(response_error(method.as_str(), url, status, &resp_body));
                        continue;
                    }
                    return Ok((status, resp_body));
                }
                Err(e) => {
                    let dropped = e.is_timeout() || e.is_connect() || e.is_request();
                    if dropped && attempt + 1 < MAX_ATTEMPTS {
                        log::warn!(
                            "storage request {} {} failed, attempt {}/{}: {}",
                            method,
                            url,
                            attempt + 1,
                            MAX_ATTEMPTS,
                            e
                        );
                        last_error = Some(e.into());
                        continue;
                    }
                    return Err(e.into());
                }
            }
        }

        Err(last_error.expect("retry loop stores an error before continuing"))
    }

    /// `{endpoint}/{bucket}/{encoded key}`.
    fn object_url(&self, key: &str) -> Result<Url, S3Error> {
        let base = self.endpoint.as_str().trim_end_matches('/');
        let key = encode_key(key.trim_start_matches('/'));
        Url::parse(&format!("{base}/{}/{key}", self.bucket))
            .map_err(|e| S3Error::Endpoint(e.to_string()))
    }
}

fn response_error(method: &str, url: &Url, status: StatusCode, body: &[u8]) -> S3Error {
    let detail = match parse_error_xml(body) {
        Some((code, message)) => format!(": {code}: {message}"),
        None if body.is_empty() => String::new(),
        None => format!(": {}", String::from_utf8_lossy(body)),
    };
    S3Error::Response {
        status,
        method: method.to_string(),
        url: url.to_string(),
        detail,
    }
}

/// Pull `Code` and `Message` out of an S3 error document, if that's what the
/// body is.
fn parse_error_xml(body: &[u8]) -> Option<(String, String)> {
    let mut reader = Reader::from_reader(body);
    reader.config_mut().trim_text(true);

    let mut code = None;
    let mut message = None;
    let mut current = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => current = e.local_name().as_ref().to_vec(),
            Ok(Event::Text(e)) => {
                let text = e.unescape().ok()?.into_owned();
                match current.as_slice() {
                    b"Code" => code = Some(text),
                    b"Message" => message = Some(text),
                    _ => {}
                }
            }
            Ok(Event::End(_)) => current.clear(),
            Ok(Event::Eof) => break,
            Err(_) => return None,
            _ => {}
        }
    }

    Some((code?, message.unwrap_or_default()))
}

/// RFC 3986 percent-encoding, preserving `/` so keys keep their prefixes.
fn encode_key(key: &str) -> String {
    const HEX: &[u8; 16] = b"0123456789ABCDEF";
    let mut out = String::with_capacity(key.len());
    for byte in key.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' | b'/' => {
                out.push(byte as char)
            }
            _ => {
                out.push('%');
                out.push(HEX[(byte >> 4) as usize] as char);
                out.push(HEX[(byte & 0xf) as usize] as char);
            }
        }
    }
    out
}
