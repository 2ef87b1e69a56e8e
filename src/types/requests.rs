//! Option structs accepted by client operations.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::crypto::EncryptionContext;
use crate::error::ValidationError;

/// Options for uploading an object.
#[derive(Debug, Clone, Default)]
pub struct PutObjectOptions {
    /// Content type. Defaults to `application/octet-stream`.
    pub content_type: Option<String>,
    /// User-defined metadata, stored as `x-amz-meta-*` headers. Keys are
    /// given without the prefix.
    pub user_metadata: HashMap<String, String>,
    /// Client-side envelope encryption for this object.
    pub encryption: Option<EncryptionContext>,
    /// Part size override in bytes. Defaults to the configured part size.
    pub part_size: Option<u64>,
}

impl PutObjectOptions {
    /// Create options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the content type.
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Add one user metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.user_metadata.insert(key.into(), value.into());
        self
    }

    /// Encrypt the object client-side before upload.
    pub fn with_encryption(mut self, encryption: EncryptionContext) -> Self {
        self.encryption = Some(encryption);
        self
    }

    /// Override the part size for this upload.
    pub fn with_part_size(mut self, part_size: u64) -> Self {
        self.part_size = Some(part_size);
        self
    }
}

/// Options for downloading an object.
#[derive(Debug, Clone, Default)]
pub struct GetObjectOptions {
    /// Byte offset to start reading from.
    pub offset: Option<u64>,
    /// Number of bytes to read starting at the offset.
    pub length: Option<u64>,
    /// Decryption context for objects uploaded with envelope encryption.
    pub encryption: Option<EncryptionContext>,
}

impl GetObjectOptions {
    /// Create options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start reading at the given byte offset.
    pub fn with_offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Read at most `length` bytes.
    pub fn with_length(mut self, length: u64) -> Self {
        self.length = Some(length);
        self
    }

    /// Read `length` bytes starting at `offset`.
    pub fn with_range(mut self, offset: u64, length: u64) -> Self {
        self.offset = Some(offset);
        self.length = Some(length);
        self
    }

    /// Decrypt the object client-side after download.
    pub fn with_encryption(mut self, encryption: EncryptionContext) -> Self {
        self.encryption = Some(encryption);
        self
    }

    /// Render the HTTP `Range` header for these options, if any.
    pub fn range_header(&self) -> Result<Option<String>, ValidationError> {
        match (self.offset, self.length) {
            (None, None) => Ok(None),
            (Some(_), Some(0)) | (None, Some(0)) => Err(ValidationError::InvalidRange {
                reason: "length must be greater than zero".to_string(),
            }),
            (Some(offset), None) => Ok(Some(format!("bytes={}-", offset))),
            (Some(offset), Some(length)) => {
                Ok(Some(format!("bytes={}-{}", offset, offset + length - 1)))
            }
            (None, Some(length)) => Ok(Some(format!("bytes=0-{}", length - 1))),
        }
    }
}

/// Which generation of the ListObjects API to call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ListApiVersion {
    /// ListObjects (marker pagination).
    V1,
    /// ListObjectsV2 (continuation-token pagination).
    #[default]
    V2,
}

/// Options for listing objects in a bucket.
#[derive(Debug, Clone, Default)]
pub struct ListObjectsOptions {
    /// Only list keys starting with this prefix.
    pub prefix: Option<String>,
    /// When false, `/` acts as a delimiter and shared prefixes collapse
    /// into single entries.
    pub recursive: bool,
    /// API generation to call.
    pub api_version: ListApiVersion,
    /// Start listing after this key (V2 only).
    pub start_after: Option<String>,
    /// Page size hint, at most 1000.
    pub max_keys: Option<u32>,
}

impl ListObjectsOptions {
    /// Create options with defaults: non-recursive ListObjectsV2.
    pub fn new() -> Self {
        Self::default()
    }

    /// Only list keys starting with this prefix.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// List recursively instead of collapsing at `/`.
    pub fn recursive(mut self) -> Self {
        self.recursive = true;
        self
    }

    /// Select the API generation.
    pub fn with_api_version(mut self, version: ListApiVersion) -> Self {
        self.api_version = version;
        self
    }

    /// Start listing after this key. Sent as `start-after` on V2 and
    /// as the initial `marker` on V1.
    pub fn with_start_after(mut self, start_after: impl Into<String>) -> Self {
        self.start_after = Some(start_after.into());
        self
    }

    /// Request at most this many keys per page.
    pub fn with_max_keys(mut self, max_keys: u32) -> Self {
        self.max_keys = Some(max_keys);
        self
    }
}

/// Conditions for a browser-based POST upload form.
///
/// Exactly one of an exact key or a key prefix condition is required;
/// the signer rejects policies with neither or both.
#[derive(Debug, Clone)]
pub struct PostPolicy {
    /// Target bucket.
    pub bucket: String,
    /// Policy expiration.
    pub expiration: DateTime<Utc>,
    /// Exact object key the form must upload to.
    pub key: Option<String>,
    /// Key prefix the uploaded key must start with.
    pub key_starts_with: Option<String>,
    /// Required content type.
    pub content_type: Option<String>,
    /// Inclusive bounds on the upload size in bytes.
    pub content_length_range: Option<(u64, u64)>,
}

impl PostPolicy {
    /// Create a policy for a bucket, expiring at the given instant.
    pub fn new(bucket: impl Into<String>, expiration: DateTime<Utc>) -> Self {
        Self {
            bucket: bucket.into(),
            expiration,
            key: None,
            key_starts_with: None,
            content_type: None,
            content_length_range: None,
        }
    }

    /// Require an exact object key.
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Require the key to start with a prefix.
    pub fn with_key_starts_with(mut self, prefix: impl Into<String>) -> Self {
        self.key_starts_with = Some(prefix.into());
        self
    }

    /// Require an exact content type.
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Bound the upload size to `[min, max]` bytes.
    pub fn with_content_length_range(mut self, min: u64, max: u64) -> Self {
        self.content_length_range = Some((min, max));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_header_forms() {
        let none = GetObjectOptions::new();
        assert_eq!(none.range_header().unwrap(), None);

        let open = GetObjectOptions::new().with_offset(100);
        assert_eq!(open.range_header().unwrap(), Some("bytes=100-".to_string()));

        let bounded = GetObjectOptions::new().with_range(100, 50);
        assert_eq!(
            bounded.range_header().unwrap(),
            Some("bytes=100-149".to_string())
        );

        let from_start = GetObjectOptions::new().with_length(10);
        assert_eq!(
            from_start.range_header().unwrap(),
            Some("bytes=0-9".to_string())
        );
    }

    #[test]
    fn test_range_header_rejects_zero_length() {
        let zero = GetObjectOptions::new().with_range(5, 0);
        assert!(zero.range_header().is_err());
    }

    #[test]
    fn test_list_options_builder() {
        let options = ListObjectsOptions::new()
            .with_prefix("photos/")
            .recursive()
            .with_max_keys(500);
        assert_eq!(options.prefix.as_deref(), Some("photos/"));
        assert!(options.recursive);
        assert_eq!(options.api_version, ListApiVersion::V2);
        assert_eq!(options.max_keys, Some(500));
    }

    #[test]
    fn test_post_policy_builder() {
        let expiration = Utc::now() + chrono::Duration::days(7);
        let policy = PostPolicy::new("my-bucket", expiration)
            .with_key_starts_with("uploads/")
            .with_content_type("image/png")
            .with_content_length_range(1024, 4 * 1024 * 1024);
        assert_eq!(policy.bucket, "my-bucket");
        assert_eq!(policy.key_starts_with.as_deref(), Some("uploads/"));
        assert_eq!(policy.content_length_range, Some((1024, 4 * 1024 * 1024)));
    }
}
