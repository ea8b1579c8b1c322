use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use crate::errors::ImageError;

/// Raw bytes read from some source, with whatever content type the source reported.
#[derive(Clone, PartialEq, Eq)]
pub struct FetchedMedia {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

impl std::fmt::Debug for FetchedMedia {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchedMedia")
            .field("bytes", &self.bytes.len())
            .field("content_type", &self.content_type)
            .finish()
    }
}

/// I/O side of materialization: remote fetches and reads under the media root.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MediaReader: Send + Sync {
    async fn fetch_remote(&self, url: &str) -> Result<FetchedMedia, ImageError>;
    async fn read_local(&self, reference: &str) -> Result<FetchedMedia, ImageError>;
}

/// Process-local store of staged bytes addressed by `blob:` handles.
#[cfg_attr(test, mockall::automock)]
pub trait BlobRegistry: Send + Sync {
    /// Stores the bytes and returns a fresh `blob:<uuid>` handle.
    fn stage(&self, owner_id: Uuid, bytes: Vec<u8>, content_type: Option<String>) -> String;

    /// Copies the staged bytes out. Only the staging owner may read a handle.
    fn read(&self, handle: &str, owner_id: &Uuid) -> Result<FetchedMedia, ImageError>;

    /// Drops the handle if `owner_id` staged it. Returns `false` if nothing was dropped.
    fn release(&self, handle: &str, owner_id: &Uuid) -> bool;

    /// Drops every handle staged longer than `ttl` ago, returning how many went.
    fn purge_expired(&self, ttl: Duration) -> usize;
}
