use std::time::{Duration, Instant};

use dashmap::DashMap;
use uuid::Uuid;

use crate::errors::ImageError;
use crate::repositories::media::{BlobRegistry, FetchedMedia};

pub const BLOB_SCHEME: &str = "blob:";

struct StagedBlob {
    owner_id: Uuid,
    bytes: Vec<u8>,
    content_type: Option<String>,
    staged_at: Instant,
}

/// Sharded in-memory registry. Handles die with the process.
#[derive(Default)]
pub struct InMemoryBlobRegistry {
    blobs: DashMap<String, StagedBlob>,
}

impl InMemoryBlobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }
}

impl BlobRegistry for InMemoryBlobRegistry {
    fn stage(&self, owner_id: Uuid, bytes: Vec<u8>, content_type: Option<String>) -> String {
        let handle = format!("{BLOB_SCHEME}{}", Uuid::new_v4());
        self.blobs.insert(
            handle.clone(),
            StagedBlob {
                owner_id,
                bytes,
                content_type,
                staged_at: Instant::now(),
            },
        );
        handle
    }

    fn read(&self, handle: &str, owner_id: &Uuid) -> Result<FetchedMedia, ImageError> {
        self.blobs
            .get(handle)
            .filter(|blob| blob.owner_id == *owner_id)
            .map(|blob| FetchedMedia {
                bytes: blob.bytes.clone(),
                content_type: blob.content_type.clone(),
            })
            .ok_or(ImageError::BlobNotFound)
    }

    fn release(&self, handle: &str, owner_id: &Uuid) -> bool {
        self.blobs
            .remove_if(handle, |_, blob| blob.owner_id == *owner_id)
            .is_some()
    }

    fn purge_expired(&self, ttl: Duration) -> usize {
        let mut purged = 0;
        self.blobs.retain(|_, blob| {
            let keep = blob.staged_at.elapsed() < ttl;
            if !keep {
                purged += 1;
            }
            keep
        });
        purged
    }
}
