//! Typed results returned by store operations.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Full metadata for a stored object, from HEAD, GET, or a completed upload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectInfo {
    /// Bucket name.
    pub bucket: String,
    /// Object key.
    pub key: String,
    /// Size of the stored object in bytes.
    pub size: u64,
    /// ETag (entity tag).
    pub e_tag: Option<String>,
    /// Content type.
    pub content_type: Option<String>,
    /// Last modified time.
    pub last_modified: Option<DateTime<Utc>>,
    /// Version ID for versioned buckets.
    pub version_id: Option<String>,
    /// User-defined metadata, keys without the `x-amz-meta-` prefix.
    pub user_metadata: HashMap<String, String>,
    /// Request ID from the service.
    pub request_id: Option<String>,
}

/// One entry from an object listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectSummary {
    /// Object key, or the shared prefix when `is_prefix` is set.
    pub key: String,
    /// Size in bytes. Zero for prefix entries.
    pub size: u64,
    /// ETag (entity tag).
    pub e_tag: Option<String>,
    /// Last modified time.
    pub last_modified: Option<DateTime<Utc>>,
    /// Owner information, when the service returns it.
    pub owner: Option<Owner>,
    /// True when this entry is a common prefix from a delimited listing.
    pub is_prefix: bool,
}

impl ObjectSummary {
    /// Build a common-prefix entry for a delimited listing.
    pub fn prefix(prefix: impl Into<String>) -> Self {
        Self {
            key: prefix.into(),
            size: 0,
            e_tag: None,
            last_modified: None,
            owner: None,
            is_prefix: true,
        }
    }
}

/// Bucket or object owner information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Owner {
    /// Owner ID.
    pub id: Option<String>,
    /// Display name.
    pub display_name: Option<String>,
}

/// One entry from a bucket listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BucketInfo {
    /// Bucket name.
    pub name: String,
    /// Creation time.
    pub creation_date: Option<DateTime<Utc>>,
}

/// An in-progress multipart upload, from an incomplete-upload listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MultipartUploadInfo {
    /// Object key.
    pub key: String,
    /// Upload ID.
    pub upload_id: String,
    /// When the upload was initiated.
    pub initiated: Option<DateTime<Utc>>,
    /// Upload initiator.
    pub initiator: Option<Owner>,
    /// Object owner.
    pub owner: Option<Owner>,
}

/// One uploaded part of a multipart upload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartInfo {
    /// Part number, 1-based.
    pub part_number: u32,
    /// ETag returned when the part was stored.
    pub e_tag: String,
    /// Part size in bytes.
    pub size: Option<u64>,
    /// When the part was stored.
    pub last_modified: Option<DateTime<Utc>>,
}

impl PartInfo {
    /// Create part info from a part number and ETag.
    pub fn new(part_number: u32, e_tag: impl Into<String>) -> Self {
        Self {
            part_number,
            e_tag: e_tag.into(),
            size: None,
            last_modified: None,
        }
    }
}

/// Part reference submitted when completing a multipart upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletedPart {
    /// Part number.
    pub part_number: u32,
    /// ETag.
    pub e_tag: String,
}

impl From<PartInfo> for CompletedPart {
    fn from(part: PartInfo) -> Self {
        Self {
            part_number: part.part_number,
            e_tag: part.e_tag,
        }
    }
}

/// Per-key result from a batch remove.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DeleteOutcome {
    /// The key was removed. Removing a nonexistent key also reports
    /// success, per S3 semantics.
    Removed {
        /// Object key.
        key: String,
        /// Version ID if applicable.
        version_id: Option<String>,
        /// True when the delete created a delete marker.
        delete_marker: bool,
    },
    /// The service refused to remove the key.
    Failed {
        /// Object key.
        key: String,
        /// Service error code.
        code: String,
        /// Service error message.
        message: String,
    },
}

impl DeleteOutcome {
    /// The key this outcome is for.
    pub fn key(&self) -> &str {
        match self {
            DeleteOutcome::Removed { key, .. } => key,
            DeleteOutcome::Failed { key, .. } => key,
        }
    }

    /// True when the key was removed.
    pub fn is_removed(&self) -> bool {
        matches!(self, DeleteOutcome::Removed { .. })
    }
}

/// Presigned URL.
#[derive(Debug, Clone)]
pub struct PresignedUrl {
    /// The presigned URL.
    pub url: String,
    /// HTTP method.
    pub method: String,
    /// Expiration timestamp.
    pub expires_at: DateTime<Utc>,
    /// Headers that were signed and must accompany the request.
    pub signed_headers: HashMap<String, String>,
}

impl PresignedUrl {
    /// Check if the URL has expired.
    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }

    /// Get remaining time until expiration.
    pub fn time_remaining(&self) -> Option<chrono::Duration> {
        let remaining = self.expires_at - Utc::now();
        if remaining.num_seconds() > 0 {
            Some(remaining)
        } else {
            None
        }
    }
}

/// Form fields for a browser-based POST upload.
#[derive(Debug, Clone)]
pub struct PostPolicyForm {
    /// URL the form posts to.
    pub url: String,
    /// Form fields to submit alongside the file.
    pub fields: HashMap<String, String>,
    /// Policy expiration.
    pub expires_at: DateTime<Utc>,
}

/// Result of initiating a multipart upload.
#[derive(Debug, Clone)]
pub struct CreatedUpload {
    /// Bucket name.
    pub bucket: String,
    /// Object key.
    pub key: String,
    /// Upload ID assigned by the service.
    pub upload_id: String,
    /// Request ID from the service.
    pub request_id: Option<String>,
}

/// Result of completing a multipart upload.
#[derive(Debug, Clone)]
pub struct CompletedUpload {
    /// Bucket name.
    pub bucket: String,
    /// Object key.
    pub key: String,
    /// ETag of the assembled object.
    pub e_tag: Option<String>,
    /// Location URL of the assembled object.
    pub location: Option<String>,
    /// Request ID from the service.
    pub request_id: Option<String>,
}

/// Result body of a server-side copy.
#[derive(Debug, Clone)]
pub struct CopyObjectResult {
    /// ETag of the new object.
    pub e_tag: Option<String>,
    /// Last modified time of the new object.
    pub last_modified: Option<DateTime<Utc>>,
}

/// One page of an object listing.
#[derive(Debug, Clone, Default)]
pub struct ListObjectsPage {
    /// Objects on this page.
    pub objects: Vec<ObjectSummary>,
    /// Common prefixes on this page.
    pub common_prefixes: Vec<String>,
    /// True when more pages are available.
    pub is_truncated: bool,
    /// V2 continuation token for the next page.
    pub next_continuation_token: Option<String>,
    /// V1 marker for the next page.
    pub next_marker: Option<String>,
    /// Request ID from the service.
    pub request_id: Option<String>,
}

/// One page of an incomplete-upload listing.
#[derive(Debug, Clone, Default)]
pub struct ListUploadsPage {
    /// Uploads on this page.
    pub uploads: Vec<MultipartUploadInfo>,
    /// Common prefixes on this page.
    pub common_prefixes: Vec<String>,
    /// True when more pages are available.
    pub is_truncated: bool,
    /// Key marker for the next page.
    pub next_key_marker: Option<String>,
    /// Upload ID marker for the next page.
    pub next_upload_id_marker: Option<String>,
    /// Request ID from the service.
    pub request_id: Option<String>,
}

/// One page of a part listing.
#[derive(Debug, Clone, Default)]
pub struct ListPartsPage {
    /// Parts on this page.
    pub parts: Vec<PartInfo>,
    /// True when more pages are available.
    pub is_truncated: bool,
    /// Part number marker for the next page.
    pub next_part_number_marker: Option<u32>,
    /// Request ID from the service.
    pub request_id: Option<String>,
}

/// Bucket event notification configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotificationConfig {
    /// SNS topic subscriptions.
    pub topic_configs: Vec<TopicConfig>,
    /// SQS queue subscriptions.
    pub queue_configs: Vec<QueueConfig>,
}

impl NotificationConfig {
    /// Create an empty configuration. Setting an empty configuration
    /// removes all notifications from a bucket.
    pub fn new() -> Self {
        Self::default()
    }

    /// True when no subscriptions are configured.
    pub fn is_empty(&self) -> bool {
        self.topic_configs.is_empty() && self.queue_configs.is_empty()
    }

    /// Add a topic subscription.
    pub fn with_topic(mut self, config: TopicConfig) -> Self {
        self.topic_configs.push(config);
        self
    }

    /// Add a queue subscription.
    pub fn with_queue(mut self, config: QueueConfig) -> Self {
        self.queue_configs.push(config);
        self
    }
}

/// Events published to an SNS topic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicConfig {
    /// Configuration ID, assigned by the service when omitted.
    pub id: Option<String>,
    /// Topic ARN receiving the events.
    pub topic_arn: String,
    /// Event names, e.g. `s3:ObjectCreated:Put`.
    pub events: Vec<String>,
    /// Only notify for keys starting with this prefix.
    pub prefix_filter: Option<String>,
    /// Only notify for keys ending with this suffix.
    pub suffix_filter: Option<String>,
}

impl TopicConfig {
    /// Create a subscription for a topic ARN.
    pub fn new(topic_arn: impl Into<String>) -> Self {
        Self {
            id: None,
            topic_arn: topic_arn.into(),
            events: Vec::new(),
            prefix_filter: None,
            suffix_filter: None,
        }
    }

    /// Subscribe to an event name.
    pub fn with_event(mut self, event: impl Into<String>) -> Self {
        self.events.push(event.into());
        self
    }

    /// Only notify for keys starting with this prefix.
    pub fn with_prefix_filter(mut self, prefix: impl Into<String>) -> Self {
        self.prefix_filter = Some(prefix.into());
        self
    }

    /// Only notify for keys ending with this suffix.
    pub fn with_suffix_filter(mut self, suffix: impl Into<String>) -> Self {
        self.suffix_filter = Some(suffix.into());
        self
    }
}

/// Events published to an SQS queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Configuration ID, assigned by the service when omitted.
    pub id: Option<String>,
    /// Queue ARN receiving the events.
    pub queue_arn: String,
    /// Event names, e.g. `s3:ObjectCreated:Put`.
    pub events: Vec<String>,
    /// Only notify for keys starting with this prefix.
    pub prefix_filter: Option<String>,
    /// Only notify for keys ending with this suffix.
    pub suffix_filter: Option<String>,
}

impl QueueConfig {
    /// Create a subscription for a queue ARN.
    pub fn new(queue_arn: impl Into<String>) -> Self {
        Self {
            id: None,
            queue_arn: queue_arn.into(),
            events: Vec::new(),
            prefix_filter: None,
            suffix_filter: None,
        }
    }

    /// Subscribe to an event name.
    pub fn with_event(mut self, event: impl Into<String>) -> Self {
        self.events.push(event.into());
        self
    }

    /// Only notify for keys starting with this prefix.
    pub fn with_prefix_filter(mut self, prefix: impl Into<String>) -> Self {
        self.prefix_filter = Some(prefix.into());
        self
    }

    /// Only notify for keys ending with this suffix.
    pub fn with_suffix_filter(mut self, suffix: impl Into<String>) -> Self {
        self.suffix_filter = Some(suffix.into());
        self
    }
}
