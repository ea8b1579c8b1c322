use std::sync::Arc;

use chrono::Utc;
use rand::Rng;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::{
    entities::image::{MaterializedImage, UploadPurpose, UploadResult},
    errors::StorageError,
    repositories::object_store::ObjectStore,
};

const SUFFIX_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const SUFFIX_LEN: usize = 8;
const FALLBACK_EXTENSION: &str = "jpg";

const UPLOAD_FAILED: &str = "Não foi possível enviar a imagem. Tente novamente.";
const UPLOAD_CANCELLED: &str = "Envio da imagem cancelado.";

/// Writes materialized images to the object store under collision-free paths.
pub struct ImageUploader {
    store: Arc<dyn ObjectStore>,
    avatar_bucket: String,
    gesture_bucket: String,
}

impl ImageUploader {
    pub fn new(store: Arc<dyn ObjectStore>, avatar_bucket: impl Into<String>, gesture_bucket: impl Into<String>) -> Self {
        ImageUploader {
            store,
            avatar_bucket: avatar_bucket.into(),
            gesture_bucket: gesture_bucket.into(),
        }
    }

    pub fn bucket_for(&self, purpose: UploadPurpose) -> &str {
        match purpose {
            UploadPurpose::Avatar => &self.avatar_bucket,
            UploadPurpose::Gesture => &self.gesture_bucket,
        }
    }

    /// Single attempt. Store failures and cancellation come back as
    /// [`UploadResult::Failed`]; the raw store error is only logged.
    #[tracing::instrument(name = "upload", skip(self, image, cancel))]
    pub async fn upload(
        &self,
        owner_id: &Uuid,
        image: MaterializedImage,
        purpose: UploadPurpose,
        cancel: &CancellationToken,
    ) -> UploadResult {
        let bucket = self.bucket_for(purpose);
        let path = object_path(
            owner_id,
            purpose,
            Utc::now().timestamp_millis(),
            &random_suffix(),
            &extension_from_content_type(&image.content_type),
        );
        let size = image.bytes.len();

        let put = self
            .store
            .put_object(bucket, &path, image.bytes, &image.content_type, true);

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::warn!(%bucket, %path, "Upload cancelled");
                return UploadResult::failed(UPLOAD_CANCELLED);
            }
            outcome = put => outcome,
        };

        if let Err(e) = outcome {
            tracing::error!(error = %e, %bucket, %path, "Object store rejected upload");
            return UploadResult::failed(UPLOAD_FAILED);
        }

        let url = self.store.public_url(bucket, &path);
        if url.is_empty() {
            tracing::error!(%bucket, %path, "Object store returned an empty public URL");
            return UploadResult::failed(UPLOAD_FAILED);
        }

        tracing::info!(%bucket, %path, size, "Image uploaded");
        UploadResult::Uploaded { url, path }
    }

    /// Object path behind a public URL produced for `purpose`, if it points into that bucket.
    pub fn stored_path(&self, public_url: &str, purpose: UploadPurpose) -> Option<String> {
        let prefix = self.store.public_url(self.bucket_for(purpose), "");
        let without_query = public_url.split(['?', '#']).next().unwrap_or_default();

        without_query
            .strip_prefix(&prefix)
            .filter(|path| !path.is_empty())
            .map(|path| {
                urlencoding::decode(path)
                    .map(|p| p.into_owned())
                    .unwrap_or_else(|_| path.to_string())
            })
    }

    pub async fn remove(&self, purpose: UploadPurpose, paths: Vec<String>) -> Result<(), StorageError> {
        let bucket = self.bucket_for(purpose);
        self.store.remove_objects(bucket, paths).await
    }
}

/// `{owner}/{purpose}_{millis}_{suffix}.{ext}`
pub fn object_path(owner_id: &Uuid, purpose: UploadPurpose, millis: i64, suffix: &str, ext: &str) -> String {
    format!("{owner_id}/{}_{millis}_{suffix}.{ext}", purpose.as_str())
}

pub fn random_suffix() -> String {
    let mut rng = rand::thread_rng();
    (0..SUFFIX_LEN)
        .map(|_| SUFFIX_ALPHABET[rng.gen_range(0..SUFFIX_ALPHABET.len())] as char)
        .collect()
}

/// MIME subtype without parameters or `+suffix`, e.g. `image/svg+xml` → `svg`.
pub fn extension_from_content_type(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .and_then(|essence| essence.trim().split_once('/'))
        .map(|(_, subtype)| subtype.split('+').next().unwrap_or_default().to_ascii_lowercase())
        .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .unwrap_or_else(|| FALLBACK_EXTENSION.to_string())
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Mutex;

    use super::*;
    use crate::repositories::object_store::MockObjectStore;

    fn png() -> MaterializedImage {
        MaterializedImage {
            bytes: vec![1, 2, 3],
            content_type: "image/png".into(),
        }
    }

    fn store_with_public_urls() -> MockObjectStore {
        let mut store = MockObjectStore::new();
        store
            .expect_public_url()
            .returning(|bucket, path| format!("https://proj.supabase.co/storage/v1/object/public/{bucket}/{path}"));
        store
    }

    #[tokio::test]
    async fn upload_writes_to_purpose_bucket_with_upsert() {
        let owner = Uuid::new_v4();
        let mut store = store_with_public_urls();
        store
            .expect_put_object()
            .withf(move |bucket, path, bytes, content_type, upsert| {
                bucket == "gestos"
                    && path.starts_with(&format!("{owner}/gesture_"))
                    && path.ends_with(".png")
                    && bytes == &[1, 2, 3]
                    && content_type == "image/png"
                    && *upsert
            })
            .times(1)
            .returning(|_, _, _, _, _| Ok(()));
        let uploader = ImageUploader::new(Arc::new(store), "avatars", "gestos");

        let result = uploader
            .upload(&owner, png(), UploadPurpose::Gesture, &CancellationToken::new())
            .await;

        assert!(result.is_success());
        let url = result.url().unwrap();
        assert!(url.starts_with("https://proj.supabase.co/storage/v1/object/public/gestos/"));
        assert!(!url.is_empty());
        assert!(result.error().is_none());
    }

    #[tokio::test]
    async fn store_failure_becomes_failed_result_without_backend_text() {
        let mut store = store_with_public_urls();
        store.expect_put_object().times(1).returning(|_, _, _, _, _| {
            Err(StorageError::Rejected {
                status: 403,
                message: "new row violates row-level security policy".into(),
            })
        });
        let uploader = ImageUploader::new(Arc::new(store), "avatars", "gestos");

        let result = uploader
            .upload(&Uuid::new_v4(), png(), UploadPurpose::Avatar, &CancellationToken::new())
            .await;

        assert!(!result.is_success());
        assert!(result.url().is_none());
        let error = result.error().unwrap();
        assert!(!error.is_empty());
        assert!(!error.contains("row-level"));
    }

    #[tokio::test]
    async fn cancelled_upload_is_reported_as_failure() {
        let mut store = store_with_public_urls();
        store.expect_put_object().returning(|_, _, _, _, _| Ok(()));
        let uploader = ImageUploader::new(Arc::new(store), "avatars", "gestos");
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = uploader.upload(&Uuid::new_v4(), png(), UploadPurpose::Avatar, &cancel).await;

        assert_eq!(result, UploadResult::failed(UPLOAD_CANCELLED));
    }

    #[tokio::test]
    async fn empty_public_url_is_a_failure() {
        let mut store = MockObjectStore::new();
        store.expect_put_object().returning(|_, _, _, _, _| Ok(()));
        store.expect_public_url().returning(|_, _| String::new());
        let uploader = ImageUploader::new(Arc::new(store), "avatars", "gestos");

        let result = uploader
            .upload(&Uuid::new_v4(), png(), UploadPurpose::Gesture, &CancellationToken::new())
            .await;

        assert!(!result.is_success());
    }

    #[tokio::test]
    async fn identical_uploads_land_in_distinct_objects() {
        let owner = Uuid::new_v4();
        let written = Arc::new(Mutex::new(Vec::new()));
        let recorder = written.clone();
        let mut store = store_with_public_urls();
        store
            .expect_put_object()
            .times(2)
            .returning(move |_, path, _, _, _| {
                recorder.lock().unwrap().push(path.to_string());
                Ok(())
            });
        let uploader = ImageUploader::new(Arc::new(store), "avatars", "gestos");
        let cancel = CancellationToken::new();

        let first = uploader.upload(&owner, png(), UploadPurpose::Gesture, &cancel).await;
        let second = uploader.upload(&owner, png(), UploadPurpose::Gesture, &cancel).await;

        let paths = written.lock().unwrap().clone();
        assert_eq!(paths.len(), 2);
        assert_ne!(paths[0], paths[1]);
        assert_ne!(first.url().unwrap(), second.url().unwrap());
    }

    #[test]
    fn object_path_layout() {
        let owner = Uuid::parse_str("6f1c2d3e-0000-4000-8000-000000000001").unwrap();
        assert_eq!(
            object_path(&owner, UploadPurpose::Avatar, 1_700_000_000_000, "a1b2c3d4", "png"),
            "6f1c2d3e-0000-4000-8000-000000000001/avatar_1700000000000_a1b2c3d4.png"
        );
    }

    #[test]
    fn suffixes_are_base36_and_unique_within_a_millisecond() {
        let owner = Uuid::new_v4();
        let paths: HashSet<String> = (0..1000)
            .map(|_| {
                let suffix = random_suffix();
                assert_eq!(suffix.len(), 8);
                assert!(suffix.bytes().all(|b| SUFFIX_ALPHABET.contains(&b)));
                object_path(&owner, UploadPurpose::Gesture, 42, &suffix, "jpg")
            })
            .collect();

        assert_eq!(paths.len(), 1000);
    }

    #[test]
    fn extension_comes_from_mime_subtype() {
        assert_eq!(extension_from_content_type("image/png"), "png");
        assert_eq!(extension_from_content_type("image/jpeg"), "jpeg");
        assert_eq!(extension_from_content_type("image/svg+xml"), "svg");
        assert_eq!(extension_from_content_type("image/webp; q=1"), "webp");
        assert_eq!(extension_from_content_type("garbage"), "jpg");
        assert_eq!(extension_from_content_type("image/"), "jpg");
    }

    #[test]
    fn stored_path_only_matches_own_bucket() {
        let uploader = ImageUploader::new(Arc::new(store_with_public_urls()), "avatars", "gestos");

        assert_eq!(
            uploader.stored_path(
                "https://proj.supabase.co/storage/v1/object/public/avatars/u1/avatar_1_abc.png?t=99",
                UploadPurpose::Avatar
            ),
            Some("u1/avatar_1_abc.png".to_string())
        );
        assert_eq!(
            uploader.stored_path("https://ui-avatars.com/api/?name=U", UploadPurpose::Avatar),
            None
        );
        assert_eq!(
            uploader.stored_path(
                "https://proj.supabase.co/storage/v1/object/public/gestos/u1/g.png",
                UploadPurpose::Avatar
            ),
            None
        );
    }
}
