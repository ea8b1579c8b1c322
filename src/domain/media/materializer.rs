use std::sync::Arc;

use base64::{
    alphabet,
    engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig},
    Engine,
};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::{
    entities::image::{ImageHandle, MaterializedImage},
    errors::ImageError,
    media::cancellable,
    repositories::media::{BlobRegistry, FetchedMedia, MediaReader},
};

const FALLBACK_CONTENT_TYPE: &str = "image/jpeg";

/// Standard alphabet, accepts payloads with or without `=` padding.
const INLINE_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Turns a classified [`ImageHandle`] into bytes plus a content type.
pub struct ImageMaterializer {
    reader: Arc<dyn MediaReader>,
    blobs: Arc<dyn BlobRegistry>,
    max_bytes: usize,
}

/// Releases a staged blob when the materializer leaves its scope, whatever the exit path.
struct ReleaseOnDrop<'a> {
    blobs: &'a dyn BlobRegistry,
    handle: &'a str,
    owner_id: &'a Uuid,
}

impl Drop for ReleaseOnDrop<'_> {
    fn drop(&mut self) {
        if self.blobs.release(self.handle, self.owner_id) {
            tracing::debug!(handle = %self.handle, "Released ephemeral handle");
        }
    }
}

impl ImageMaterializer {
    pub fn new(reader: Arc<dyn MediaReader>, blobs: Arc<dyn BlobRegistry>, max_bytes: usize) -> Self {
        ImageMaterializer { reader, blobs, max_bytes }
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    #[tracing::instrument(name = "materialize", skip_all, fields(kind = handle.kind()))]
    pub async fn materialize(
        &self,
        handle: &ImageHandle,
        owner_id: &Uuid,
        cancel: &CancellationToken,
    ) -> Result<MaterializedImage, ImageError> {
        let _release = match handle {
            ImageHandle::EphemeralHandle(h) => Some(ReleaseOnDrop {
                blobs: self.blobs.as_ref(),
                handle: h,
                owner_id,
            }),
            _ => None,
        };

        if cancel.is_cancelled() {
            return Err(ImageError::Cancelled);
        }

        let image = match handle {
            ImageHandle::InlineData { mime, payload } => decode_inline(mime, payload)?,
            ImageHandle::EphemeralHandle(h) => resolve(self.blobs.read(h, owner_id)?),
            ImageHandle::FilePath(reference) => {
                resolve(cancellable(cancel, self.reader.read_local(reference)).await?)
            }
            ImageHandle::RemoteUrl(url) => {
                resolve(cancellable(cancel, self.reader.fetch_remote(url)).await?)
            }
        };

        self.check_size(&image)?;
        tracing::debug!(size = image.bytes.len(), content_type = %image.content_type, "Materialized image");
        Ok(image)
    }

    fn check_size(&self, image: &MaterializedImage) -> Result<(), ImageError> {
        let size = image.bytes.len();
        if size == 0 {
            return Err(ImageError::EmptyPayload);
        }
        if size > self.max_bytes {
            return Err(ImageError::TooLarge { size, limit: self.max_bytes });
        }
        Ok(())
    }
}

fn decode_inline(mime: &str, payload: &str) -> Result<MaterializedImage, ImageError> {
    if !mime.starts_with("image/") {
        return Err(ImageError::MalformedInlineData(format!("not an image type: {mime}")));
    }

    let compact: String = payload.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    let bytes = INLINE_ENGINE
        .decode(compact.as_bytes())
        .map_err(|e| ImageError::MalformedInlineData(e.to_string()))?;

    Ok(MaterializedImage {
        bytes,
        content_type: mime.to_string(),
    })
}

fn resolve(fetched: FetchedMedia) -> MaterializedImage {
    let content_type = content_type_for(fetched.content_type.as_deref(), &fetched.bytes);
    MaterializedImage {
        bytes: fetched.bytes,
        content_type,
    }
}

/// Reported type when it names an image, else sniffed from magic bytes, else JPEG.
pub fn content_type_for(reported: Option<&str>, bytes: &[u8]) -> String {
    reported
        .map(|ct| ct.split(';').next().unwrap_or_default().trim().to_ascii_lowercase())
        .filter(|ct| ct.starts_with("image/"))
        .or_else(|| {
            infer::get(bytes)
                .map(|kind| kind.mime_type())
                .filter(|mime| mime.starts_with("image/"))
                .map(str::to_string)
        })
        .unwrap_or_else(|| FALLBACK_CONTENT_TYPE.to_string())
}
