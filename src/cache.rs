//! Snapshot persistence: the whole tracked library is one JSON array of
//! [`Manga`] at a fixed object key.

use bytes::Bytes;
use thiserror::Error;

use crate::models::Manga;
use crate::s3::{PutOptions, S3Client, S3Error};

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("storage error: {0}")]
    Storage(#[from] S3Error),

    // corrupt JSON is not silently reset: overwriting the snapshot would
    // re-notify the entire library on the next run
    #[error("snapshot at '{key}' is not valid JSON: {source}")]
    Corrupt {
        key: String,
        source: serde_json::Error,
    },

    #[error("failed to serialize snapshot: {0}")]
    Serialize(serde_json::Error),
}

pub struct SnapshotStore {
    s3: S3Client,
    key: String,
}

impl SnapshotStore {
    pub fn new(s3: S3Client, key: String) -> Self {
        Self { s3, key }
    }

    /// Load the cached library. A missing object is the first run, not an error.
    pub async fn load(&self) -> Result<Vec<Manga>, CacheError> {
        let raw = match self.s3.get(&self.key).await {
            Ok(raw) => raw,
            Err(S3Error::NoSuchKey { .. }) => {
                log::info!("no snapshot at '{}' yet, starting empty", self.key);
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };

        serde_json::from_slice(&raw).map_err(|source| CacheError::Corrupt {
            key: self.key.clone(),
            source,
        })
    }

    pub async fn store(&self, mangas: &[Manga]) -> Result<(), CacheError> {
        let raw = serde_json::to_vec(mangas).map_err(CacheError::Serialize)?;
        let opts = PutOptions {
            content_type: Some("application/json".to_string()),
            ..PutOptions::default()
        };
        self.s3.put(&self.key, Bytes::from(raw), &opts).await?;
        log::debug!("snapshot stored at '{}' ({} mangas)", self.key, mangas.len());
        Ok(())
    }
}
