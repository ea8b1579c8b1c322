use crate::{entities::image::ImageHandle, errors::ImageError};

const DEFAULT_INLINE_MIME: &str = "image/jpeg";
const PREVIEW_CHARS: usize = 50;

/// Maps a picker handle to its source kind.
///
/// Prefixes are checked in order `data:`, `blob:`, `file://`/`content://`,
/// `http://`/`https://`, ignoring ASCII case. Anything else is rejected.
pub fn classify(raw: &str) -> Result<ImageHandle, ImageError> {
    let handle = raw.trim();

    if has_prefix(handle, "data:") {
        return parse_inline(handle);
    }
    if has_prefix(handle, "blob:") {
        return Ok(ImageHandle::EphemeralHandle(handle.to_string()));
    }
    if has_prefix(handle, "file://") || has_prefix(handle, "content://") {
        return Ok(ImageHandle::FilePath(handle.to_string()));
    }
    if has_prefix(handle, "http://") || has_prefix(handle, "https://") {
        return Ok(ImageHandle::RemoteUrl(handle.to_string()));
    }

    Err(ImageError::UnsupportedScheme(preview(handle)))
}

fn has_prefix(value: &str, prefix: &str) -> bool {
    value
        .as_bytes()
        .get(..prefix.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(prefix.as_bytes()))
}

fn parse_inline(handle: &str) -> Result<ImageHandle, ImageError> {
    let rest = &handle["data:".len()..];
    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| ImageError::MalformedInlineData("missing ',' separator".into()))?;

    let mut params = header.split(';');
    let mime = params.next().unwrap_or_default().trim();
    if !params.any(|p| p.trim().eq_ignore_ascii_case("base64")) {
        return Err(ImageError::MalformedInlineData("only base64 payloads are supported".into()));
    }

    let mime = if mime.is_empty() {
        DEFAULT_INLINE_MIME.to_string()
    } else {
        mime.to_ascii_lowercase()
    };

    Ok(ImageHandle::InlineData {
        mime,
        payload: payload.to_string(),
    })
}

fn preview(handle: &str) -> String {
    handle.chars().take(PREVIEW_CHARS).collect()
}
