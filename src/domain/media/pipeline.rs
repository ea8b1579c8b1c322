use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::{
    entities::image::{ImageHandle, UploadPurpose, UploadResult},
    errors::ImageError,
    media::{ImageMaterializer, ImageUploader},
};

/// Materialize then upload, sharing one cancellation token.
pub struct ImagePipeline {
    materializer: ImageMaterializer,
    uploader: ImageUploader,
}

impl ImagePipeline {
    pub fn new(materializer: ImageMaterializer, uploader: ImageUploader) -> Self {
        ImagePipeline { materializer, uploader }
    }

    pub fn uploader(&self) -> &ImageUploader {
        &self.uploader
    }

    pub fn max_bytes(&self) -> usize {
        self.materializer.max_bytes()
    }

    /// Materialization errors propagate; upload errors are folded into the result.
    pub async fn ingest(
        &self,
        owner_id: &Uuid,
        handle: &ImageHandle,
        purpose: UploadPurpose,
        cancel: &CancellationToken,
    ) -> Result<UploadResult, ImageError> {
        let image = self.materializer.materialize(handle, owner_id, cancel).await?;
        Ok(self.uploader.upload(owner_id, image, purpose, cancel).await)
    }
}
