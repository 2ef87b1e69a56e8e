//! Configuration types for the object store client.
//!
//! This module provides the `StoreConfig` type for configuring the client,
//! including region, credentials, timeouts, and transfer settings.

use crate::credentials::{CredentialsProvider, EnvCredentialsProvider};
use crate::error::{ConfigError, StoreError};
use crate::signing::uri_encode_path;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Smallest part size accepted for multipart uploads (5 MiB).
pub const MIN_PART_SIZE: u64 = 5 * 1024 * 1024;

/// Largest part size accepted for multipart uploads (5 GiB).
pub const MAX_PART_SIZE: u64 = 5 * 1024 * 1024 * 1024;

/// Default part size, also the default single-shot threshold (5 MiB).
pub const DEFAULT_PART_SIZE: u64 = MIN_PART_SIZE;

/// Largest page size accepted by listing calls.
pub const MAX_LIST_KEYS: u32 = 1000;

/// Configuration for the object store client.
#[derive(Clone)]
pub struct StoreConfig {
    /// AWS region (e.g., "us-east-1").
    pub region: String,

    /// Credentials provider.
    pub credentials_provider: Arc<dyn CredentialsProvider>,

    /// Custom endpoint URL (for S3-compatible services).
    pub endpoint: Option<Url>,

    /// Use path-style addressing instead of virtual-hosted style.
    ///
    /// Path-style: `https://s3.region.amazonaws.com/bucket/key`
    /// Virtual-hosted: `https://bucket.s3.region.amazonaws.com/key`
    pub path_style: bool,

    /// Connection timeout.
    pub connect_timeout: Duration,

    /// Read timeout for individual operations.
    pub read_timeout: Duration,

    /// Overall operation timeout.
    pub operation_timeout: Duration,

    /// Maximum number of retries for transient failures.
    pub max_retries: u32,

    /// Initial backoff delay for retries.
    pub initial_backoff: Duration,

    /// Maximum backoff delay.
    pub max_backoff: Duration,

    /// Backoff multiplier for exponential backoff.
    pub backoff_multiplier: f64,

    /// Maximum connections in the pool.
    pub max_connections: u32,

    /// Idle connection timeout.
    pub idle_timeout: Duration,

    /// Size of each uploaded part (bytes).
    pub part_size: u64,

    /// Objects up to this size (bytes) are uploaded in a single request.
    /// Larger objects use multipart upload.
    pub single_shot_threshold: u64,

    /// Maximum concurrently uploaded parts per transfer.
    pub part_concurrency: u32,

    /// Page size for listing calls.
    pub max_keys: u32,

    /// Verify SSL certificates.
    pub verify_ssl: bool,
}

impl std::fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreConfig")
            .field("region", &self.region)
            .field("endpoint", &self.endpoint)
            .field("path_style", &self.path_style)
            .field("connect_timeout", &self.connect_timeout)
            .field("read_timeout", &self.read_timeout)
            .field("operation_timeout", &self.operation_timeout)
            .field("max_retries", &self.max_retries)
            .field("max_connections", &self.max_connections)
            .field("part_size", &self.part_size)
            .field("single_shot_threshold", &self.single_shot_threshold)
            .field("part_concurrency", &self.part_concurrency)
            .field("max_keys", &self.max_keys)
            .field("verify_ssl", &self.verify_ssl)
            // credentials_provider stays out of Debug output.
            .finish_non_exhaustive()
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            region: "us-east-1".to_string(),
            credentials_provider: Arc::new(EnvCredentialsProvider::new()),
            endpoint: None,
            path_style: false,
            connect_timeout: Duration::from_secs(5),
            read_timeout: Duration::from_secs(30),
            operation_timeout: Duration::from_secs(300), // 5 minutes
            max_retries: 3,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(20),
            backoff_multiplier: 2.0,
            max_connections: 100,
            idle_timeout: Duration::from_secs(90),
            part_size: DEFAULT_PART_SIZE,
            single_shot_threshold: DEFAULT_PART_SIZE,
            part_concurrency: 4,
            max_keys: MAX_LIST_KEYS,
            verify_ssl: true,
        }
    }
}

impl StoreConfig {
    /// Create a new configuration builder.
    pub fn builder() -> StoreConfigBuilder {
        StoreConfigBuilder::default()
    }

    /// Resolve the endpoint URL for a given bucket.
    pub fn resolve_endpoint(&self, bucket: Option<&str>) -> Url {
        if let Some(endpoint) = &self.endpoint {
            return endpoint.clone();
        }

        let host = format!("s3.{}.amazonaws.com", self.region);
        let url_str = if self.path_style || bucket.is_none() {
            format!("https://{}", host)
        } else {
            format!("https://{}.{}", bucket.unwrap(), host)
        };

        Url::parse(&url_str).expect("Failed to construct endpoint URL")
    }

    /// Build the URI-encoded request path for a bucket and key.
    pub fn build_path(&self, bucket: &str, key: Option<&str>) -> String {
        let encoded = key.map(uri_encode_path);
        if self.path_style || self.endpoint.is_some() {
            match encoded {
                Some(k) => format!("/{}/{}", bucket, k),
                None => format!("/{}", bucket),
            }
        } else {
            match encoded {
                Some(k) => format!("/{}", k),
                None => "/".to_string(),
            }
        }
    }
}

/// Builder for client configuration.
#[derive(Default)]
pub struct StoreConfigBuilder {
    region: Option<String>,
    credentials_provider: Option<Arc<dyn CredentialsProvider>>,
    endpoint: Option<Url>,
    path_style: Option<bool>,
    connect_timeout: Option<Duration>,
    read_timeout: Option<Duration>,
    operation_timeout: Option<Duration>,
    max_retries: Option<u32>,
    initial_backoff: Option<Duration>,
    max_backoff: Option<Duration>,
    backoff_multiplier: Option<f64>,
    max_connections: Option<u32>,
    idle_timeout: Option<Duration>,
    part_size: Option<u64>,
    single_shot_threshold: Option<u64>,
    part_concurrency: Option<u32>,
    max_keys: Option<u32>,
    verify_ssl: Option<bool>,
}

impl StoreConfigBuilder {
    /// Create a new builder with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the AWS region.
    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    /// Set the credentials provider.
    pub fn credentials_provider(mut self, provider: Arc<dyn CredentialsProvider>) -> Self {
        self.credentials_provider = Some(provider);
        self
    }

    /// Set a custom endpoint URL.
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Result<Self, StoreError> {
        let url_str = endpoint.into();
        let url = Url::parse(&url_str).map_err(|e| {
            StoreError::Config(ConfigError::InvalidEndpoint {
                url: url_str,
                details: e.to_string(),
            })
        })?;
        self.endpoint = Some(url);
        Ok(self)
    }

    /// Set a custom endpoint URL (infallible version).
    pub fn endpoint_url(mut self, endpoint: Url) -> Self {
        self.endpoint = Some(endpoint);
        self
    }

    /// Enable path-style addressing.
    pub fn path_style(mut self, enabled: bool) -> Self {
        self.path_style = Some(enabled);
        self
    }

    /// Set the connection timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Set the read timeout.
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = Some(timeout);
        self
    }

    /// Set the overall operation timeout.
    pub fn operation_timeout(mut self, timeout: Duration) -> Self {
        self.operation_timeout = Some(timeout);
        self
    }

    /// Set the maximum number of retries.
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.max_retries = Some(retries);
        self
    }

    /// Set the initial backoff delay.
    pub fn initial_backoff(mut self, delay: Duration) -> Self {
        self.initial_backoff = Some(delay);
        self
    }

    /// Set the maximum backoff delay.
    pub fn max_backoff(mut self, delay: Duration) -> Self {
        self.max_backoff = Some(delay);
        self
    }

    /// Set the backoff multiplier.
    pub fn backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = Some(multiplier);
        self
    }

    /// Set the maximum connections in the pool.
    pub fn max_connections(mut self, connections: u32) -> Self {
        self.max_connections = Some(connections);
        self
    }

    /// Set the idle connection timeout.
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = Some(timeout);
        self
    }

    /// Set the multipart upload part size.
    pub fn part_size(mut self, size: u64) -> Self {
        self.part_size = Some(size);
        self
    }

    /// Set the single-shot upload threshold.
    ///
    /// Defaults to the part size when unset.
    pub fn single_shot_threshold(mut self, threshold: u64) -> Self {
        self.single_shot_threshold = Some(threshold);
        self
    }

    /// Set the maximum concurrently uploaded parts per transfer.
    pub fn part_concurrency(mut self, concurrency: u32) -> Self {
        self.part_concurrency = Some(concurrency);
        self
    }

    /// Set the page size for listing calls.
    pub fn max_keys(mut self, max_keys: u32) -> Self {
        self.max_keys = Some(max_keys);
        self
    }

    /// Enable or disable SSL verification.
    pub fn verify_ssl(mut self, verify: bool) -> Self {
        self.verify_ssl = Some(verify);
        self
    }

    /// Load configuration from environment variables.
    pub fn from_env(mut self) -> Self {
        // AWS standard environment variables
        if let Ok(region) = std::env::var("AWS_REGION") {
            self.region = Some(region);
        } else if let Ok(region) = std::env::var("AWS_DEFAULT_REGION") {
            self.region = Some(region);
        }

        // Custom endpoint
        if let Ok(endpoint) = std::env::var("AWS_ENDPOINT_URL_S3") {
            if let Ok(url) = Url::parse(&endpoint) {
                self.endpoint = Some(url);
            }
        } else if let Ok(endpoint) = std::env::var("AWS_ENDPOINT_URL") {
            if let Ok(url) = Url::parse(&endpoint) {
                self.endpoint = Some(url);
            }
        }

        // Client-specific settings
        if let Ok(val) = std::env::var("S3_STORE_PATH_STYLE") {
            self.path_style = Some(val.to_lowercase() == "true");
        }
        if let Ok(val) = std::env::var("S3_STORE_MAX_RETRIES") {
            if let Ok(retries) = val.parse() {
                self.max_retries = Some(retries);
            }
        }
        if let Ok(val) = std::env::var("S3_STORE_TIMEOUT_MS") {
            if let Ok(ms) = val.parse() {
                self.operation_timeout = Some(Duration::from_millis(ms));
            }
        }
        if let Ok(val) = std::env::var("S3_STORE_PART_SIZE") {
            if let Ok(size) = val.parse() {
                self.part_size = Some(size);
            }
        }
        if let Ok(val) = std::env::var("S3_STORE_SINGLE_SHOT_THRESHOLD") {
            if let Ok(threshold) = val.parse() {
                self.single_shot_threshold = Some(threshold);
            }
        }
        if let Ok(val) = std::env::var("S3_STORE_PART_CONCURRENCY") {
            if let Ok(concurrency) = val.parse() {
                self.part_concurrency = Some(concurrency);
            }
        }

        self
    }

    /// Build the configuration.
    pub fn build(self) -> Result<StoreConfig, StoreError> {
        let defaults = StoreConfig::default();

        // The region feeds endpoint construction, so it must form a
        // valid hostname label.
        let region = self.region.unwrap_or(defaults.region);
        if region.is_empty() {
            return Err(StoreError::Config(ConfigError::MissingRegion));
        }
        if !region
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        {
            return Err(StoreError::Config(ConfigError::InvalidValue {
                field: "region".to_string(),
                message: format!(
                    "Region '{}' may only contain lowercase letters, digits, and hyphens",
                    region
                ),
            }));
        }

        let part_size = self.part_size.unwrap_or(defaults.part_size);
        if part_size < MIN_PART_SIZE {
            return Err(StoreError::Config(ConfigError::InvalidValue {
                field: "part_size".to_string(),
                message: format!("Part size must be at least {} bytes", MIN_PART_SIZE),
            }));
        }
        if part_size > MAX_PART_SIZE {
            return Err(StoreError::Config(ConfigError::InvalidValue {
                field: "part_size".to_string(),
                message: format!("Part size must not exceed {} bytes", MAX_PART_SIZE),
            }));
        }

        // Unset threshold follows the part size, so small-object uploads
        // never split into a multipart transfer smaller than one part.
        let single_shot_threshold = self.single_shot_threshold.unwrap_or(part_size);
        if single_shot_threshold > MAX_PART_SIZE {
            return Err(StoreError::Config(ConfigError::InvalidValue {
                field: "single_shot_threshold".to_string(),
                message: format!(
                    "Single-shot threshold must not exceed {} bytes",
                    MAX_PART_SIZE
                ),
            }));
        }

        let part_concurrency = self.part_concurrency.unwrap_or(defaults.part_concurrency);
        if part_concurrency == 0 {
            return Err(StoreError::Config(ConfigError::InvalidValue {
                field: "part_concurrency".to_string(),
                message: "Part concurrency must be at least 1".to_string(),
            }));
        }

        let max_keys = self.max_keys.unwrap_or(defaults.max_keys);
        if max_keys == 0 || max_keys > MAX_LIST_KEYS {
            return Err(StoreError::Config(ConfigError::InvalidValue {
                field: "max_keys".to_string(),
                message: format!("Page size must be between 1 and {}", MAX_LIST_KEYS),
            }));
        }

        Ok(StoreConfig {
            region,
            credentials_provider: self
                .credentials_provider
                .unwrap_or(defaults.credentials_provider),
            endpoint: self.endpoint,
            path_style: self.path_style.unwrap_or(defaults.path_style),
            connect_timeout: self.connect_timeout.unwrap_or(defaults.connect_timeout),
            read_timeout: self.read_timeout.unwrap_or(defaults.read_timeout),
            operation_timeout: self.operation_timeout.unwrap_or(defaults.operation_timeout),
            max_retries: self.max_retries.unwrap_or(defaults.max_retries),
            initial_backoff: self.initial_backoff.unwrap_or(defaults.initial_backoff),
            max_backoff: self.max_backoff.unwrap_or(defaults.max_backoff),
            backoff_multiplier: self.backoff_multiplier.unwrap_or(defaults.backoff_multiplier),
            max_connections: self.max_connections.unwrap_or(defaults.max_connections),
            idle_timeout: self.idle_timeout.unwrap_or(defaults.idle_timeout),
            part_size,
            single_shot_threshold,
            part_concurrency,
            max_keys,
            verify_ssl: self.verify_ssl.unwrap_or(defaults.verify_ssl),
        })
    }
}
