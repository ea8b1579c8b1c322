use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header::CONTENT_TYPE, redirect, Client};
use url::{Host, Url};

use crate::errors::ImageError;
use crate::repositories::media::{FetchedMedia, MediaReader};
use crate::settings::AppConfig;

const FETCH_TIMEOUT: Duration = Duration::from_secs(20);

/// Reads remote images over HTTP and local references under `media_root`.
///
/// Remote hosts resolving to loopback, private or link-local addresses are
/// refused unless listed in the allowlist. Redirects are not followed.
#[derive(Clone)]
pub struct HttpMediaReader {
    client: Client,
    media_root: PathBuf,
    max_bytes: usize,
    allowed_hosts: Vec<String>,
}

impl HttpMediaReader {
    pub fn new(config: &AppConfig) -> Result<Self, ImageError> {
        let client = Client::builder()
            .timeout(FETCH_TIMEOUT)
            .redirect(redirect::Policy::none())
            .build()
            .map_err(|e| ImageError::ReadFailed(e.to_string()))?;

        Ok(Self::with_client(client, &config.media_root, config.max_image_bytes)
            .allow_hosts(config.remote_host_allowlist()))
    }

    pub fn with_client(client: Client, media_root: impl Into<PathBuf>, max_bytes: usize) -> Self {
        HttpMediaReader {
            client,
            media_root: media_root.into(),
            max_bytes,
            allowed_hosts: Vec::new(),
        }
    }

    pub fn allow_hosts<I, S>(mut self, hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_hosts = hosts.into_iter().map(|h| h.into().to_ascii_lowercase()).collect();
        self
    }

    fn too_large(&self, size: usize) -> ImageError {
        ImageError::TooLarge { size, limit: self.max_bytes }
    }
}

/// Loopback, private, link-local, shared and unspecified ranges.
pub fn is_internal_address(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => is_internal_v4(v4),
        IpAddr::V6(v6) => match v6.to_ipv4_mapped() {
            Some(v4) => is_internal_v4(v4),
            None => is_internal_v6(v6),
        },
    }
}

fn is_internal_v4(ip: Ipv4Addr) -> bool {
    let [a, b, ..] = ip.octets();
    ip.is_loopback()
        || ip.is_private()
        || ip.is_link_local()
        || ip.is_unspecified()
        || ip.is_broadcast()
        || a == 0
        || (a == 100 && (64..128).contains(&b))
}

fn is_internal_v6(ip: Ipv6Addr) -> bool {
    let first = ip.segments()[0];
    ip.is_loopback()
        || ip.is_unspecified()
        || (first & 0xfe00) == 0xfc00
        || (first & 0xffc0) == 0xfe80
}

/// Rejects URLs whose host resolves to an internal address, unless allowlisted.
pub async fn check_remote_host(url: &Url, allowed_hosts: &[String]) -> Result<(), ImageError> {
    let forbidden = || ImageError::ForbiddenHost(url.host_str().unwrap_or_default().to_string());

    let host = url.host().ok_or_else(forbidden)?;
    let name = url.host_str().unwrap_or_default().to_ascii_lowercase();
    if allowed_hosts.iter().any(|allowed| *allowed == name) {
        return Ok(());
    }

    let addresses: Vec<IpAddr> = match host {
        Host::Ipv4(ip) => vec![IpAddr::V4(ip)],
        Host::Ipv6(ip) => vec![IpAddr::V6(ip)],
        Host::Domain(domain) => {
            let port = url.port_or_known_default().unwrap_or(443);
            tokio::net::lookup_host((domain, port))
                .await
                .map_err(|e| ImageError::ReadFailed(e.to_string()))?
                .map(|addr| addr.ip())
                .collect()
        }
    };

    if addresses.is_empty() || addresses.into_iter().any(is_internal_address) {
        return Err(forbidden());
    }
    Ok(())
}

/// Maps `file:///a/b` to `<root>/a/b` and `content://authority/a` to `<root>/authority/a`.
pub fn resolve_local_path(root: &Path, reference: &str) -> Result<PathBuf, ImageError> {
    let forbidden = || ImageError::ForbiddenPath(reference.chars().take(50).collect());

    // URL parsing collapses dot segments, so traversal is caught on the raw text first
    let lowered = reference.to_ascii_lowercase();
    if reference.split(['/', '\\']).any(|s| s == "..") || lowered.contains("%2e%2e") {
        return Err(forbidden());
    }

    let url = Url::parse(reference).map_err(|e| ImageError::ReadFailed(e.to_string()))?;
    let mut segments: Vec<String> = Vec::new();

    match url.scheme() {
        "file" => {}
        "content" => {
            let authority = url.host_str().filter(|h| !h.is_empty()).ok_or_else(forbidden)?;
            segments.push(authority.to_string());
        }
        other => return Err(ImageError::UnsupportedScheme(other.to_string())),
    }

    for raw in url.path_segments().into_iter().flatten() {
        if raw.is_empty() {
            continue;
        }
        let segment = urlencoding::decode(raw).map_err(|_| forbidden())?;
        if segment == "." || segment == ".." || segment.contains(['/', '\\', '\0']) {
            return Err(forbidden());
        }
        segments.push(segment.into_owned());
    }

    if segments.is_empty() {
        return Err(forbidden());
    }

    Ok(segments.iter().fold(root.to_path_buf(), |path, s| path.join(s)))
}

#[async_trait]
impl MediaReader for HttpMediaReader {
    async fn fetch_remote(&self, url: &str) -> Result<FetchedMedia, ImageError> {
        let parsed = Url::parse(url).map_err(|e| ImageError::ReadFailed(e.to_string()))?;
        if let Err(e) = check_remote_host(&parsed, &self.allowed_hosts).await {
            tracing::warn!(host = ?parsed.host_str(), "Refusing remote image fetch");
            return Err(e);
        }

        let mut response = self
            .client
            .get(parsed)
            .send()
            .await
            .map_err(|e| ImageError::ReadFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ImageError::ReadFailed(format!("HTTP {status}")));
        }

        if let Some(length) = response.content_length() {
            let length = usize::try_from(length).unwrap_or(usize::MAX);
            if length > self.max_bytes {
                return Err(self.too_large(length));
            }
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let mut bytes = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| ImageError::ReadFailed(e.to_string()))?
        {
            let size = bytes.len() + chunk.len();
            if size > self.max_bytes {
                return Err(self.too_large(size));
            }
            bytes.extend_from_slice(&chunk);
        }

        Ok(FetchedMedia { bytes, content_type })
    }

    async fn read_local(&self, reference: &str) -> Result<FetchedMedia, ImageError> {
        let path = resolve_local_path(&self.media_root, reference)?;
        let metadata = tokio::fs::metadata(&path)
            .await
            .map_err(|e| ImageError::ReadFailed(e.kind().to_string()))?;
        let size = usize::try_from(metadata.len()).unwrap_or(usize::MAX);
        if size > self.max_bytes {
            return Err(self.too_large(size));
        }

        let bytes = tokio::fs::read(&path).await.map_err(|e| {
            tracing::debug!(path = %path.display(), error = %e, "Local media read failed");
            ImageError::ReadFailed(e.kind().to_string())
        })?;

        Ok(FetchedMedia {
            bytes,
            content_type: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_and_content_references_resolve_under_root() {
        let root = Path::new("/srv/media");

        assert_eq!(
            resolve_local_path(root, "file:///cache/photo%201.jpg").unwrap(),
            PathBuf::from("/srv/media/cache/photo 1.jpg")
        );
        assert_eq!(
            resolve_local_path(root, "content://media/external/images/12").unwrap(),
            PathBuf::from("/srv/media/media/external/images/12")
        );
    }

    #[test]
    fn internal_addresses_are_recognised() {
        for ip in [
            "127.0.0.1",
            "10.1.2.3",
            "172.16.0.9",
            "192.168.1.1",
            "169.254.169.254",
            "100.64.0.1",
            "0.0.0.0",
            "::1",
            "fd00::1",
            "fe80::1",
            "::ffff:127.0.0.1",
        ] {
            assert!(is_internal_address(ip.parse().unwrap()), "{ip} should be internal");
        }

        for ip in ["93.184.216.34", "8.8.8.8", "2606:4700::1111"] {
            assert!(!is_internal_address(ip.parse().unwrap()), "{ip} should be public");
        }
    }

    #[tokio::test]
    async fn metadata_endpoint_is_refused_unless_allowlisted() {
        let url = Url::parse("http://169.254.169.254/latest/meta-data").unwrap();

        assert!(matches!(
            check_remote_host(&url, &[]).await,
            Err(ImageError::ForbiddenHost(host)) if host == "169.254.169.254"
        ));
        assert!(check_remote_host(&url, &["169.254.169.254".to_string()]).await.is_ok());
    }

    #[tokio::test]
    async fn public_ip_literal_passes_without_lookup() {
        let url = Url::parse("https://93.184.216.34/cat.png").unwrap();
        assert!(check_remote_host(&url, &[]).await.is_ok());
    }

    #[test]
    fn traversal_is_rejected() {
        let root = Path::new("/srv/media");

        for reference in [
            "file:///../etc/passwd",
            "file:///cache/../../etc/passwd",
            "content://media/%2E%2E/secret",
            "file:///cache/a%2Fb",
            "file:///",
        ] {
            assert!(
                matches!(resolve_local_path(root, reference), Err(ImageError::ForbiddenPath(_))),
                "{reference} should be forbidden"
            );
        }
    }
}
