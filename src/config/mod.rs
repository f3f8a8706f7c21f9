use crate::services::disk::DEFAULT_API_URL;
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// What a batch download answers when none of the requested files could be
/// fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EmptyArchivePolicy {
    /// Send the empty zip with a success status.
    #[default]
    Allow,
    /// Answer with an upstream error instead of an empty zip.
    Reject,
}

impl FromStr for EmptyArchivePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "allow" => Ok(EmptyArchivePolicy::Allow),
            "reject" => Ok(EmptyArchivePolicy::Reject),
            other => Err(format!("unknown empty archive policy: {}", other)),
        }
    }
}

/// Service configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Base URL of the provider's public resources API
    pub disk_api_url: String,

    /// Listing cache lifetime in seconds (default: 3600)
    pub listing_cache_ttl_secs: u64,

    /// Files fetched at once while building an archive (default: 1)
    pub archive_fetch_concurrency: usize,

    /// Behaviour for batches where every file failed (default: allow)
    pub empty_archive_policy: EmptyArchivePolicy,

    /// Allowed CORS Origins (comma separated, empty = any)
    pub allowed_origins: Vec<String>,

    /// Maximum request body size in bytes (default: 1 MB)
    pub max_form_size: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            disk_api_url: DEFAULT_API_URL.to_string(),
            listing_cache_ttl_secs: 3600,
            archive_fetch_concurrency: 1,
            empty_archive_policy: EmptyArchivePolicy::Allow,
            allowed_origins: Vec::new(),
            max_form_size: 1024 * 1024,
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let default = Self::default();

        Self {
            disk_api_url: env::var("DISK_API_URL").unwrap_or(default.disk_api_url),

            listing_cache_ttl_secs: env::var("LISTING_CACHE_TTL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.listing_cache_ttl_secs),

            archive_fetch_concurrency: env::var("ARCHIVE_FETCH_CONCURRENCY")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(|v: usize| v.max(1))
                .unwrap_or(default.archive_fetch_concurrency),

            empty_archive_policy: env::var("EMPTY_ARCHIVE_POLICY")
                .ok()
                .and_then(|v| match v.parse() {
                    Ok(policy) => Some(policy),
                    Err(e) => {
                        tracing::warn!("{}, falling back to default", e);
                        None
                    }
                })
                .unwrap_or(default.empty_archive_policy),

            allowed_origins: env::var("ALLOWED_ORIGINS")
                .map(|v| parse_origins(&v))
                .unwrap_or(default.allowed_origins),

            max_form_size: env::var("MAX_FORM_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.max_form_size),
        }
    }

    /// Create config for development (short cache, parallel archive fetches)
    pub fn development() -> Self {
        Self {
            listing_cache_ttl_secs: 60,
            archive_fetch_concurrency: 4,
            ..Self::default()
        }
    }

    pub fn listing_ttl(&self) -> Duration {
        Duration::from_secs(self.listing_cache_ttl_secs)
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
