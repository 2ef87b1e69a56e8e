//! Bucket/key addressing and name validation.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Maximum object key length in bytes.
pub const MAX_OBJECT_KEY_BYTES: usize = 1024;

/// Fully qualified object address: bucket plus key.
///
/// Construction through [`ObjectLocator::new`] validates both names, so a
/// locator handed to the client is always well formed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectLocator {
    /// Bucket name.
    pub bucket: String,
    /// Object key.
    pub key: String,
}

impl ObjectLocator {
    /// Create a locator, validating both the bucket name and the object key.
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Result<Self, ValidationError> {
        let locator = Self {
            bucket: bucket.into(),
            key: key.into(),
        };
        locator.validate()?;
        Ok(locator)
    }

    /// Re-check both names. Used at client entry points since the fields
    /// are public.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_bucket_name(&self.bucket)?;
        validate_object_key(&self.key)?;
        Ok(())
    }
}

impl fmt::Display for ObjectLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.bucket, self.key)
    }
}

/// Validate a bucket name against the S3 naming rules.
///
/// Names must be 3-63 characters of lowercase letters, digits, hyphens, and
/// periods, arranged as DNS labels (each label starts and ends with a letter
/// or digit), and must not be formatted as an IPv4 address.
pub fn validate_bucket_name(bucket: &str) -> Result<(), ValidationError> {
    let invalid = |reason: &str| ValidationError::InvalidBucketName {
        bucket: bucket.to_string(),
        reason: reason.to_string(),
    };

    if bucket.len() < 3 || bucket.len() > 63 {
        return Err(invalid("must be between 3 and 63 characters long"));
    }
    if !bucket
        .bytes()
        .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-' || b == b'.')
    {
        return Err(invalid(
            "may only contain lowercase letters, digits, hyphens, and periods",
        ));
    }
    for label in bucket.split('.') {
        if label.is_empty() {
            return Err(invalid("periods must separate non-empty labels"));
        }
        let bytes = label.as_bytes();
        if !bytes[0].is_ascii_alphanumeric() || !bytes[bytes.len() - 1].is_ascii_alphanumeric() {
            return Err(invalid("each label must begin and end with a letter or digit"));
        }
    }
    let labels: Vec<&str> = bucket.split('.').collect();
    if labels.len() == 4 && labels.iter().all(|l| l.parse::<u8>().is_ok()) {
        return Err(invalid("must not be formatted as an IP address"));
    }
    Ok(())
}

/// Validate an object key: non-empty and at most 1024 bytes. Path
/// separators inside the key are opaque to the client.
pub fn validate_object_key(key: &str) -> Result<(), ValidationError> {
    if key.is_empty() {
        return Err(ValidationError::InvalidObjectKey {
            key: key.to_string(),
            reason: "must not be empty".to_string(),
        });
    }
    if key.len() > MAX_OBJECT_KEY_BYTES {
        let preview: String = key.chars().take(32).collect();
        return Err(ValidationError::InvalidObjectKey {
            key: format!("{}...", preview),
            reason: format!("must not exceed {} bytes", MAX_OBJECT_KEY_BYTES),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_bucket_names() {
        for name in [
            "abc",
            "my-bucket",
            "my.bucket.name",
            "bucket123",
            "123bucket",
            "a-b.c-d",
        ] {
            assert!(validate_bucket_name(name).is_ok(), "{} should be valid", name);
        }
    }

    #[test]
    fn test_bucket_name_length_bounds() {
        assert!(validate_bucket_name("ab").is_err());
        assert!(validate_bucket_name(&"a".repeat(63)).is_ok());
        assert!(validate_bucket_name(&"a".repeat(64)).is_err());
    }

    #[test]
    fn test_bucket_name_invalid_characters() {
        assert!(validate_bucket_name("My-Bucket").is_err());
        assert!(validate_bucket_name("bucket_name").is_err());
        assert!(validate_bucket_name("bucket name").is_err());
    }

    #[test]
    fn test_bucket_name_label_rules() {
        assert!(validate_bucket_name(".bucket").is_err());
        assert!(validate_bucket_name("bucket.").is_err());
        assert!(validate_bucket_name("buck..et").is_err());
        assert!(validate_bucket_name("-bucket").is_err());
        assert!(validate_bucket_name("bucket-").is_err());
        assert!(validate_bucket_name("buck.-et").is_err());
    }

    #[test]
    fn test_bucket_name_rejects_ip_address() {
        assert!(validate_bucket_name("192.168.5.4").is_err());
        assert!(validate_bucket_name("10.0.0.1").is_err());
        // Not a representable IPv4 address, so allowed.
        assert!(validate_bucket_name("999.999.999.999").is_ok());
        assert!(validate_bucket_name("1.2.3.4.5").is_ok());
    }

    #[test]
    fn test_object_key_bounds() {
        assert!(validate_object_key("a").is_ok());
        assert!(validate_object_key("path/to/object.txt").is_ok());
        assert!(validate_object_key("").is_err());
        assert!(validate_object_key(&"k".repeat(1024)).is_ok());
        assert!(validate_object_key(&"k".repeat(1025)).is_err());
    }

    #[test]
    fn test_locator_validates_on_construction() {
        let locator = ObjectLocator::new("my-bucket", "my/key.txt").unwrap();
        assert_eq!(locator.to_string(), "my-bucket/my/key.txt");

        assert!(ObjectLocator::new("NO", "key").is_err());
        assert!(ObjectLocator::new("my-bucket", "").is_err());
    }
}
