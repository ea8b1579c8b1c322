use std::sync::Arc;

use tokio::time::{interval, Duration};
use tokio_util::sync::CancellationToken;

use crate::constants::BLOB_SWEEP_INTERVAL_SECS;
use crate::repositories::media::BlobRegistry;

/// Drops staged blob handles nobody materialized within `ttl`. Stops when `shutdown` fires.
pub async fn start_blob_sweep(blobs: Arc<dyn BlobRegistry>, ttl: Duration, shutdown: CancellationToken) {
    let mut interval = interval(Duration::from_secs(BLOB_SWEEP_INTERVAL_SECS));

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                tracing::info!("Blob sweep stopped");
                return;
            }
            _ = interval.tick() => {
                let purged = blobs.purge_expired(ttl);
                if purged > 0 {
                    tracing::info!("Purged {} expired blob handles", purged);
                }
            }
        }
    }
}
