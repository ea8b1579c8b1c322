use std::fmt;

use serde::{ser::SerializeStruct, Deserialize, Serialize, Serializer};
use validator::Validate;

/// Image source handed over by a picker, already classified by scheme.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageHandle {
    /// `file://` or `content://` reference on the local filesystem.
    FilePath(String),
    /// `blob:` handle, valid only inside this process until released.
    EphemeralHandle(String),
    /// `data:<mime>;base64,<payload>`.
    InlineData { mime: String, payload: String },
    /// Already hosted `http(s)://` URL.
    RemoteUrl(String),
}

impl ImageHandle {
    pub fn kind(&self) -> &'static str {
        match self {
            ImageHandle::FilePath(_) => "file-path",
            ImageHandle::EphemeralHandle(_) => "ephemeral-handle",
            ImageHandle::InlineData { .. } => "inline-data",
            ImageHandle::RemoteUrl(_) => "remote-url",
        }
    }
}

/// Bytes ready to be written to the object store.
#[derive(Clone, PartialEq, Eq)]
pub struct MaterializedImage {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

impl fmt::Debug for MaterializedImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MaterializedImage")
            .field("bytes", &format_args!("[{} bytes]", self.bytes.len()))
            .field("content_type", &self.content_type)
            .finish()
    }
}

/// Logical grouping of an upload; selects the bucket and the filename prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadPurpose {
    Avatar,
    Gesture,
}

impl UploadPurpose {
    pub fn as_str(&self) -> &'static str {
        match self {
            UploadPurpose::Avatar => "avatar",
            UploadPurpose::Gesture => "gesture",
        }
    }
}

impl fmt::Display for UploadPurpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a single upload attempt.
///
/// Serialized as `{ "success": bool, "url"?: string, "error"?: string }`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadResult {
    Uploaded { url: String, path: String },
    Failed { error: String },
}

impl UploadResult {
    pub fn failed(error: impl Into<String>) -> Self {
        UploadResult::Failed { error: error.into() }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, UploadResult::Uploaded { .. })
    }

    pub fn url(&self) -> Option<&str> {
        match self {
            UploadResult::Uploaded { url, .. } => Some(url),
            UploadResult::Failed { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            UploadResult::Uploaded { .. } => None,
            UploadResult::Failed { error } => Some(error),
        }
    }
}

impl Serialize for UploadResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("UploadResult", 2)?;
        state.serialize_field("success", &self.is_success())?;
        match self {
            UploadResult::Uploaded { url, .. } => state.serialize_field("url", url)?,
            UploadResult::Failed { error } => state.serialize_field("error", error)?,
        }
        state.end()
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct UploadImageRequest {
    #[validate(length(min = 1, message = "Selecione uma imagem"))]
    pub image: String,
}

#[derive(Debug, Serialize)]
pub struct StagedBlobResponse {
    pub handle: String,
    pub content_type: String,
    pub size: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uploaded_result_serializes_url_only() {
        let result = UploadResult::Uploaded {
            url: "https://cdn/x.png".into(),
            path: "u/x.png".into(),
        };
        let json = serde_json::to_value(&result).unwrap();

        assert_eq!(json, serde_json::json!({ "success": true, "url": "https://cdn/x.png" }));
    }

    #[test]
    fn failed_result_serializes_error_only() {
        let json = serde_json::to_value(UploadResult::failed("bucket not found")).unwrap();

        assert_eq!(json, serde_json::json!({ "success": false, "error": "bucket not found" }));
    }

    #[test]
    fn accessors_are_mutually_exclusive() {
        let ok = UploadResult::Uploaded { url: "u".into(), path: "p".into() };
        let err = UploadResult::failed("e");

        assert!(ok.is_success() && ok.url().is_some() && ok.error().is_none());
        assert!(!err.is_success() && err.url().is_none() && err.error().is_some());
    }

    #[test]
    fn debug_does_not_dump_bytes() {
        let image = MaterializedImage { bytes: vec![0; 4096], content_type: "image/png".into() };
        let rendered = format!("{image:?}");
        assert!(rendered.contains("[4096 bytes]"));
    }
}
