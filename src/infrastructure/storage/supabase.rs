use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header::CONTENT_TYPE, Client, Response};
use serde::Deserialize;
use zeroize::Zeroizing;

use crate::errors::StorageError;
use crate::repositories::object_store::ObjectStore;
use crate::settings::AppConfig;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Client for the Supabase Storage REST API, authenticated with the service key.
#[derive(Clone)]
pub struct SupabaseStorage {
    client: Client,
    base_url: String,
    service_key: Zeroizing<String>,
}

#[derive(Debug, Deserialize)]
struct StorageErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

impl SupabaseStorage {
    pub fn new(config: &AppConfig) -> Result<Self, StorageError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self::with_client(client, &config.storage_url, &config.storage_service_key))
    }

    pub fn with_client(client: Client, base_url: &str, service_key: &str) -> Self {
        SupabaseStorage {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            service_key: Zeroizing::new(service_key.to_string()),
        }
    }

    fn object_url(&self, bucket: &str, path: &str) -> String {
        format!("{}/object/{}/{}", self.base_url, urlencoding::encode(bucket), encode_path(path))
    }

    async fn check(response: Response) -> Result<(), StorageError> {
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<StorageErrorBody>(&text)
            .ok()
            .and_then(|body| body.message.or(body.error))
            .unwrap_or(text);

        Err(StorageError::Rejected {
            status: status.as_u16(),
            message,
        })
    }
}

fn encode_path(path: &str) -> String {
    path.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

#[async_trait]
impl ObjectStore for SupabaseStorage {
    async fn put_object(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
        upsert: bool,
    ) -> Result<(), StorageError> {
        let response = self
            .client
            .post(self.object_url(bucket, path))
            .bearer_auth(self.service_key.as_str())
            .header("apikey", self.service_key.as_str())
            .header(CONTENT_TYPE, content_type)
            .header("x-upsert", upsert.to_string())
            .body(bytes)
            .send()
            .await?;

        Self::check(response).await
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        format!("{}/object/public/{}/{}", self.base_url, urlencoding::encode(bucket), encode_path(path))
    }

    async fn remove_objects(&self, bucket: &str, paths: Vec<String>) -> Result<(), StorageError> {
        if paths.is_empty() {
            return Ok(());
        }

        let response = self
            .client
            .delete(format!("{}/object/{}", self.base_url, urlencoding::encode(bucket)))
            .bearer_auth(self.service_key.as_str())
            .header("apikey", self.service_key.as_str())
            .json(&serde_json::json!({ "prefixes": paths }))
            .send()
            .await?;

        Self::check(response).await
    }
}
