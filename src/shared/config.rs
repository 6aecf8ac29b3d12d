use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const DEFAULT_TTL_SECS: u64 = 3600;
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 5 * 1024 * 1024;
pub const DEFAULT_ALLOWED_MIME_TYPES: [&str; 4] =
    ["image/jpeg", "image/png", "image/gif", "image/webp"];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhotoCacheConfig {
    pub api: ApiConfig,
    pub cache: CacheConfig,
    pub upload: UploadConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub base_url: String,
    #[serde(default)]
    pub auth_token: Option<String>,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    pub ttl_secs: u64,
    pub storage_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    pub max_bytes: u64,
    pub allowed_mime_types: Vec<String>,
}

impl Default for PhotoCacheConfig {
    fn default() -> Self {
        Self {
            api: ApiConfig {
                base_url: "http://localhost:8080/api".to_string(),
                auth_token: None,
                request_timeout_secs: 30,
            },
            cache: CacheConfig {
                ttl_secs: DEFAULT_TTL_SECS, // 1 hour
                storage_dir: default_storage_dir(),
            },
            upload: UploadConfig::default(),
        }
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            allowed_mime_types: DEFAULT_ALLOWED_MIME_TYPES
                .iter()
                .map(|mime| mime.to_string())
                .collect(),
        }
    }
}

impl PhotoCacheConfig {
    pub fn from_env() -> Self {
        // 既定値
        let mut cfg = Self::default();

        if let Ok(v) = std::env::var("PHOTO_CACHE_API_BASE_URL") {
            let trimmed = v.trim().trim_end_matches('/');
            if !trimmed.is_empty() {
                cfg.api.base_url = trimmed.to_string();
            }
        }
        if let Ok(v) = std::env::var("PHOTO_CACHE_AUTH_TOKEN") {
            let token = v.trim();
            cfg.api.auth_token = if token.is_empty() {
                None
            } else {
                Some(token.to_string())
            };
        }
        if let Some(value) = env_u64("PHOTO_CACHE_REQUEST_TIMEOUT_SECS") {
            cfg.api.request_timeout_secs = value.max(1);
        }
        if let Some(value) = env_u64("PHOTO_CACHE_TTL_SECS") {
            cfg.cache.ttl_secs = value;
        }
        if let Ok(v) = std::env::var("PHOTO_CACHE_STORAGE_DIR") {
            if !v.trim().is_empty() {
                cfg.cache.storage_dir = PathBuf::from(v.trim());
            }
        }
        if let Some(value) = env_u64("PHOTO_CACHE_MAX_UPLOAD_BYTES") {
            cfg.upload.max_bytes = value;
        }
        if let Ok(v) = std::env::var("PHOTO_CACHE_ALLOWED_MIME_TYPES") {
            let types = parse_list(&v);
            if !types.is_empty() {
                cfg.upload.allowed_mime_types = types;
            }
        }

        cfg
    }

    pub fn validate(&self) -> Result<(), String> {
        if !(self.api.base_url.starts_with("http://") || self.api.base_url.starts_with("https://"))
        {
            return Err(format!(
                "API base_url must start with http:// or https:// (got {})",
                self.api.base_url
            ));
        }
        if self.api.request_timeout_secs == 0 {
            return Err("API request_timeout_secs must be greater than 0".to_string());
        }
        if self.cache.ttl_secs == 0 {
            return Err("Cache ttl_secs must be greater than 0".to_string());
        }
        if self.upload.max_bytes == 0 {
            return Err("Upload max_bytes must be greater than 0".to_string());
        }
        if self.upload.allowed_mime_types.is_empty() {
            return Err("Upload allowed_mime_types must not be empty".to_string());
        }
        if let Some(bad) = self
            .upload
            .allowed_mime_types
            .iter()
            .find(|mime| !mime.starts_with("image/"))
        {
            return Err(format!("Upload mime type must be an image type: {bad}"));
        }
        Ok(())
    }

    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.cache.ttl_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.api.request_timeout_secs)
    }
}

fn default_storage_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("./data"))
        .join("profile-photo-cache")
}

fn env_u64(name: &str) -> Option<u64> {
    std::env::var(name).ok().and_then(|v| parse_u64(&v))
}

fn parse_u64(value: &str) -> Option<u64> {
    value.trim().parse::<u64>().ok()
}

fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_ascii_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}
