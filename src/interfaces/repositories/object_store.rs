use async_trait::async_trait;

use crate::errors::StorageError;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Writes `bytes` at `bucket/path`. With `upsert` an existing object is replaced.
    async fn put_object(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
        upsert: bool,
    ) -> Result<(), StorageError>;

    /// Public URL of an object. Pure; does not check the object exists.
    fn public_url(&self, bucket: &str, path: &str) -> String;

    async fn remove_objects(&self, bucket: &str, paths: Vec<String>) -> Result<(), StorageError>;
}
