use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use dotenv::dotenv;
use jsonwebtoken::DecodingKey;
use std::{env, fmt, path::PathBuf, str::FromStr, time::Duration};
use zeroize::Zeroizing;

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum AppEnvironment {
    Development,
    Production,
    Testing,
}

impl FromStr for AppEnvironment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "development" => Ok(AppEnvironment::Development),
            "production" => Ok(AppEnvironment::Production),
            "testing" => Ok(AppEnvironment::Testing),
            _ => Err(ConfigError::Message(format!("Invalid environment: {}", s))),
        }
    }
}

#[derive(Deserialize, Clone)]
#[serde(rename_all = "snake_case")]
pub struct AppConfig {
    #[serde(default = "default_env")]
    pub env: AppEnvironment,

    #[serde(default = "default_name")]
    pub name: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_worker_count")]
    pub worker_count: usize,

    #[serde(default)]
    pub database_url: String,

    #[serde(default = "default_cors_origins")]
    pub cors_allowed_origins: Vec<String>,

    /// Secret the auth provider signs session tokens with.
    #[serde(default)]
    pub jwt_secret: String,

    /// Expected `aud` claim of session tokens.
    #[serde(default = "default_jwt_audience")]
    pub jwt_audience: String,

    /// Base URL of the storage REST API, e.g. `https://xyz.supabase.co/storage/v1`.
    #[serde(default)]
    pub storage_url: String,

    #[serde(default)]
    pub storage_service_key: String,

    #[serde(default = "default_avatar_bucket")]
    pub avatar_bucket: String,

    #[serde(default = "default_gesture_bucket")]
    pub gesture_bucket: String,

    /// Root directory `file://` and `content://` handles resolve against.
    #[serde(default = "default_media_root")]
    pub media_root: PathBuf,

    #[serde(default = "default_max_image_bytes")]
    pub max_image_bytes: usize,

    /// Hosts remote image URLs may point at even when they resolve to a
    /// loopback or private address. Comma-separated values are split.
    #[serde(default)]
    pub allowed_remote_hosts: Vec<String>,

    /// How long a staged blob handle stays valid, e.g. "10m".
    #[serde(default = "default_blob_ttl")]
    pub blob_ttl: String,
}

fn default_env() -> AppEnvironment {
    AppEnvironment::Development
}
fn default_name() -> String {
    "Pictoboard-API".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_host() -> String {
    "127.0.0.1".to_string()
}
fn default_worker_count() -> usize {
    num_cpus::get()
}
fn default_cors_origins() -> Vec<String> {
    vec!["*".to_string()]
}
fn default_jwt_audience() -> String {
    "authenticated".to_string()
}
fn default_avatar_bucket() -> String {
    "avatars".to_string()
}
fn default_gesture_bucket() -> String {
    "gestos".to_string()
}
fn default_media_root() -> PathBuf {
    PathBuf::from("./media")
}
fn default_max_image_bytes() -> usize {
    5 * 1024 * 1024
}
fn default_blob_ttl() -> String {
    "10m".to_string()
}

impl AppConfig {
    pub fn new() -> Result<Self, ConfigError> {
        dotenv().ok();

        let raw_env = env::var("APP_ENV").unwrap_or_else(|_| "development".into());
        let env_name = AppEnvironment::from_str(&raw_env)
            .map_err(|_| ConfigError::Message(format!("Invalid APP_ENV value: {}", raw_env)))?;

        let builder = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env_name)).required(false))
            .add_source(Environment::with_prefix("APP").prefix_separator("_").try_parsing(true));

        let mut config: Self = builder.build()?.try_deserialize()?;

        config.env = env_name;

        config.database_url = fill_or_env(config.database_url, "APP_DATABASE_URL")?;
        config.jwt_secret = fill_or_env(config.jwt_secret, "APP_JWT_SECRET")?;
        config.storage_url = fill_or_env(config.storage_url, "APP_STORAGE_URL")?;
        config.storage_service_key = fill_or_env(config.storage_service_key, "APP_STORAGE_SERVICE_KEY")?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        if self.database_url.trim().is_empty() {
            errors.push("DATABASE_URL cannot be empty".to_string());
        }
        if self.jwt_secret.len() < 32 {
            errors.push("JWT_SECRET must be at least 32 characters".to_string());
        }
        if url::Url::parse(&self.storage_url).is_err() {
            errors.push("STORAGE_URL must be an absolute URL".to_string());
        }
        if self.storage_service_key.trim().is_empty() {
            errors.push("STORAGE_SERVICE_KEY cannot be empty".to_string());
        }
        if self.avatar_bucket.trim().is_empty() || self.gesture_bucket.trim().is_empty() {
            errors.push("Bucket names cannot be empty".to_string());
        }
        if self.max_image_bytes == 0 {
            errors.push("MAX_IMAGE_BYTES must be positive".to_string());
        }
        if let Err(e) = humantime::parse_duration(&self.blob_ttl) {
            errors.push(format!("BLOB_TTL is not a duration: {e}"));
        }
        if self.is_production() && self.cors_origins().iter().any(|o| o == "*") {
            errors.push("Wildcard CORS (*) is not allowed in production".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Message(errors.join(", ")))
        }
    }

    pub fn is_production(&self) -> bool {
        self.env == AppEnvironment::Production
    }

    pub fn cors_origins(&self) -> Vec<String> {
        self.cors_allowed_origins
            .iter()
            .flat_map(|origin| origin.split(','))
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }

    pub fn remote_host_allowlist(&self) -> Vec<String> {
        self.allowed_remote_hosts
            .iter()
            .flat_map(|host| host.split(','))
            .map(|s| s.trim().to_ascii_lowercase())
            .filter(|s| !s.is_empty())
            .collect()
    }

    pub fn blob_ttl(&self) -> Duration {
        humantime::parse_duration(&self.blob_ttl).unwrap_or(Duration::from_secs(600))
    }
}

fn fill_or_env(current: String, env_key: &str) -> Result<String, ConfigError> {
    if current.trim().is_empty() {
        env::var(env_key).map_err(|_| ConfigError::Message(format!("{env_key} must be set")))
    } else {
        Ok(current)
    }
}

impl fmt::Display for AppEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AppEnvironment::Development => "development",
            AppEnvironment::Production => "production",
            AppEnvironment::Testing => "testing",
        };
        write!(f, "{s}")
    }
}

trait Redact {
    fn redact(&self) -> &str;
}

impl Redact for str {
    fn redact(&self) -> &str {
        if self.is_empty() {
            "[MISSING]"
        } else if self.len() < 32 {
            "[TOO_SHORT]"
        } else {
            "[REDACTED]"
        }
    }
}

impl Redact for String {
    fn redact(&self) -> &str {
        self.as_str().redact()
    }
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("name", &self.name)
            .field("port", &self.port)
            .field("host", &self.host)
            .field("worker_count", &self.worker_count)
            .field("database_url", &self.database_url.redact())
            .field("cors_allowed_origins", &self.cors_allowed_origins)
            .field("jwt_secret", &self.jwt_secret.redact())
            .field("jwt_audience", &self.jwt_audience)
            .field("storage_url", &self.storage_url)
            .field("storage_service_key", &self.storage_service_key.redact())
            .field("avatar_bucket", &self.avatar_bucket)
            .field("gesture_bucket", &self.gesture_bucket)
            .field("media_root", &self.media_root)
            .field("max_image_bytes", &self.max_image_bytes)
            .field("allowed_remote_hosts", &self.allowed_remote_hosts)
            .field("blob_ttl", &self.blob_ttl)
            .finish()
    }
}

#[derive(Clone)]
pub struct JwtKeys {
    pub decoding: DecodingKey,
}

impl From<&AppConfig> for JwtKeys {
    fn from(config: &AppConfig) -> Self {
        let jwt_secret = Zeroizing::new(config.jwt_secret.clone());

        JwtKeys {
            decoding: DecodingKey::from_secret(jwt_secret.as_bytes()),
        }
    }
}

impl fmt::Debug for JwtKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtKeys")
            .field("decoding", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
pub(crate) fn test_config() -> AppConfig {
    AppConfig {
        env: AppEnvironment::Testing,
        name: "Pictoboard Test".to_string(),
        port: 0,
        host: "127.0.0.1".to_string(),
        worker_count: 1,
        database_url: "postgres://localhost/pictoboard_test".into(),
        cors_allowed_origins: vec!["*".to_string()],
        jwt_secret: "test_jwt_secret_that_is_long_enough_for_hs256_1234".into(),
        jwt_audience: default_jwt_audience(),
        storage_url: "http://127.0.0.1:54321/storage/v1".into(),
        storage_service_key: "service-role-key".into(),
        avatar_bucket: default_avatar_bucket(),
        gesture_bucket: default_gesture_bucket(),
        media_root: default_media_root(),
        max_image_bytes: default_max_image_bytes(),
        allowed_remote_hosts: Vec::new(),
        blob_ttl: default_blob_ttl(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_passes_validation() {
        assert!(test_config().validate().is_ok());
    }

    #[test]
    fn validate_collects_every_problem() {
        let mut config = test_config();
        config.jwt_secret = "short".into();
        config.storage_url = "not a url".into();
        config.blob_ttl = "soon".into();

        let message = config.validate().unwrap_err().to_string();
        assert!(message.contains("JWT_SECRET"));
        assert!(message.contains("STORAGE_URL"));
        assert!(message.contains("BLOB_TTL"));
    }

    #[test]
    fn production_rejects_wildcard_cors() {
        let mut config = test_config();
        config.env = AppEnvironment::Production;
        assert!(config.validate().is_err());

        config.cors_allowed_origins = vec!["https://app.example.com, https://admin.example.com".into()];
        assert!(config.validate().is_ok());
        assert_eq!(config.cors_origins().len(), 2);
    }

    #[test]
    fn remote_host_allowlist_splits_and_lowercases() {
        let mut config = test_config();
        config.allowed_remote_hosts = vec!["Media.Internal, 127.0.0.1".into()];

        assert_eq!(config.remote_host_allowlist(), vec!["media.internal", "127.0.0.1"]);
    }

    #[test]
    fn blob_ttl_parses_humantime() {
        let mut config = test_config();
        config.blob_ttl = "90s".into();
        assert_eq!(config.blob_ttl(), Duration::from_secs(90));
    }

    #[test]
    fn debug_output_redacts_secrets() {
        let rendered = format!("{:?}", test_config());
        assert!(!rendered.contains("test_jwt_secret"));
        assert!(!rendered.contains("service-role-key"));
    }
}
