//! Image source normalization: classify a picker handle, turn it into bytes,
//! and host the bytes in the object store.

pub mod classifier;
pub mod materializer;
pub mod pipeline;
pub mod uploader;

use std::future::Future;

use tokio_util::sync::CancellationToken;

use crate::errors::ImageError;

pub use classifier::classify;
pub use materializer::ImageMaterializer;
pub use pipeline::ImagePipeline;
pub use uploader::ImageUploader;

/// Races `fut` against `cancel`. Cancellation wins ties.
pub(crate) async fn cancellable<T, F>(cancel: &CancellationToken, fut: F) -> Result<T, ImageError>
where
    F: Future<Output = Result<T, ImageError>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(ImageError::Cancelled),
        result = fut => result,
    }
}
