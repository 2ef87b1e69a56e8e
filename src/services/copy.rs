//! Server-side object copy with source preconditions.
//!
//! The service translates a condition set into `x-amz-copy-source-if-*`
//! headers and reports a failed precondition as an expected outcome
//! instead of an error, so callers can branch on it without matching
//! error variants.

use super::{build_url, format_http_date, parse_error, retry_policy, DEFAULT_CONTENT_TYPE};
use crate::config::StoreConfig;
use crate::error::{ErrorKind, StoreError, ValidationError};
use crate::resilience::RetryPolicy;
use crate::signing::{uri_encode_path, RequestSigner};
use crate::transport::{HttpRequest, HttpTransport};
use crate::types::{ObjectInfo, ObjectLocator};
use crate::xml;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// How object metadata transfers during a copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MetadataDirective {
    /// Destination inherits the source metadata.
    #[default]
    Copy,
    /// Destination gets the metadata supplied with the request.
    Replace,
}

impl MetadataDirective {
    /// Wire value for the `x-amz-metadata-directive` header.
    pub fn as_str(&self) -> &'static str {
        match self {
            MetadataDirective::Copy => "COPY",
            MetadataDirective::Replace => "REPLACE",
        }
    }
}

/// Preconditions evaluated against the source object of a copy.
///
/// The two ETag conditions are mutually exclusive. The timestamp pair
/// is independent of them and of each other.
#[derive(Debug, Clone, Default)]
pub struct CopyConditions {
    /// Copy only when the source ETag equals this value.
    pub match_etag: Option<String>,
    /// Copy only when the source ETag differs from this value.
    pub not_match_etag: Option<String>,
    /// Copy only when the source changed after this instant.
    pub modified_since: Option<DateTime<Utc>>,
    /// Copy only when the source is unchanged since this instant.
    pub unmodified_since: Option<DateTime<Utc>>,
}

impl CopyConditions {
    /// Create an empty condition set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Require the source ETag to equal `etag`.
    pub fn with_match_etag(mut self, etag: impl Into<String>) -> Self {
        self.match_etag = Some(etag.into());
        self
    }

    /// Require the source ETag to differ from `etag`.
    pub fn with_not_match_etag(mut self, etag: impl Into<String>) -> Self {
        self.not_match_etag = Some(etag.into());
        self
    }

    /// Require the source to have changed after `instant`.
    pub fn with_modified_since(mut self, instant: DateTime<Utc>) -> Self {
        self.modified_since = Some(instant);
        self
    }

    /// Require the source to be unchanged since `instant`.
    pub fn with_unmodified_since(mut self, instant: DateTime<Utc>) -> Self {
        self.unmodified_since = Some(instant);
        self
    }

    /// Check the condition set for conflicts.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.match_etag.is_some() && self.not_match_etag.is_some() {
            return Err(ValidationError::ConflictingConditions {
                message: "match-etag and not-match-etag cannot be combined".to_string(),
            });
        }
        Ok(())
    }
}

/// Options for a server-side copy.
#[derive(Debug, Clone, Default)]
pub struct CopyOptions {
    /// Source preconditions.
    pub conditions: CopyConditions,
    /// Metadata handling for the destination.
    pub metadata_directive: MetadataDirective,
    /// Destination content type. Honored with
    /// [`MetadataDirective::Replace`].
    pub content_type: Option<String>,
    /// Destination user metadata. Honored with
    /// [`MetadataDirective::Replace`].
    pub user_metadata: HashMap<String, String>,
}

/// Result of a conditional copy.
#[derive(Debug)]
pub enum CopyOutcome {
    /// The copy ran. Carries the destination metadata reported by the
    /// copy response: ETag and last-modified time, with the size left
    /// at zero.
    Applied(ObjectInfo),
    /// A precondition did not hold and nothing was copied.
    PreconditionFailed {
        /// Service error code reported for the failed precondition.
        code: String,
        /// Service request ID.
        request_id: Option<String>,
    },
}

impl CopyOutcome {
    /// True when the copy was applied.
    pub fn is_applied(&self) -> bool {
        matches!(self, CopyOutcome::Applied(_))
    }
}

/// Service for server-side copies.
pub struct CopyService {
    config: Arc<StoreConfig>,
    transport: Arc<dyn HttpTransport>,
    signer: Arc<dyn RequestSigner>,
    retry: RetryPolicy,
}

impl CopyService {
    /// Create a new copy service.
    pub fn new(
        config: Arc<StoreConfig>,
        transport: Arc<dyn HttpTransport>,
        signer: Arc<dyn RequestSigner>,
    ) -> Self {
        let retry = retry_policy(&config);
        Self {
            config,
            transport,
            signer,
            retry,
        }
    }

    /// Copy an object server-side, honoring source preconditions.
    ///
    /// A failed precondition comes back as
    /// [`CopyOutcome::PreconditionFailed`], whether the service reports
    /// it as a 412 status or as an error document.
    pub async fn copy(
        &self,
        source: &ObjectLocator,
        dest: &ObjectLocator,
        options: &CopyOptions,
    ) -> Result<CopyOutcome, StoreError> {
        options.conditions.validate().map_err(StoreError::Validation)?;

        let url = build_url(&self.config, &dest.bucket, Some(&dest.key), &[]);
        let mut headers = HashMap::new();
        headers.insert(
            "x-amz-copy-source".to_string(),
            format!("/{}/{}", source.bucket, uri_encode_path(&source.key)),
        );
        headers.insert(
            "x-amz-metadata-directive".to_string(),
            options.metadata_directive.as_str().to_string(),
        );
        if let Some(etag) = &options.conditions.match_etag {
            headers.insert("x-amz-copy-source-if-match".to_string(), etag.clone());
        }
        if let Some(etag) = &options.conditions.not_match_etag {
            headers.insert("x-amz-copy-source-if-none-match".to_string(), etag.clone());
        }
        if let Some(instant) = &options.conditions.modified_since {
            headers.insert(
                "x-amz-copy-source-if-modified-since".to_string(),
                format_http_date(instant),
            );
        }
        if let Some(instant) = &options.conditions.unmodified_since {
            headers.insert(
                "x-amz-copy-source-if-unmodified-since".to_string(),
                format_http_date(instant),
            );
        }
        if options.metadata_directive == MetadataDirective::Replace {
            headers.insert(
                "content-type".to_string(),
                options
                    .content_type
                    .as_deref()
                    .unwrap_or(DEFAULT_CONTENT_TYPE)
                    .to_string(),
            );
            for (name, value) in &options.user_metadata {
                headers.insert(format!("x-amz-meta-{}", name), value.clone());
            }
        }

        let result = self
            .retry
            .execute(|| async {
                let signed = self.signer.sign("PUT", &url, &headers, None).await?;
                let request = HttpRequest::new(signed.method, signed.url.to_string())
                    .with_headers(signed.headers);
                let response = self.transport.send(request).await?;
                if !response.is_success() {
                    return Err(parse_error(&response));
                }
                let copy_result =
                    xml::parse_copy_object(&String::from_utf8_lossy(&response.body))?;
                Ok((response, copy_result))
            })
            .await;

        let (response, copy_result) = match result {
            Ok(parsed) => parsed,
            Err(error) if error.kind() == ErrorKind::PreconditionFailed => {
                let code = error
                    .service_code()
                    .unwrap_or("PreconditionFailed")
                    .to_string();
                let request_id = error.request_id().map(str::to_string);
                debug!(
                    source = %source,
                    dest = %dest,
                    code,
                    "copy precondition not met"
                );
                return Ok(CopyOutcome::PreconditionFailed { code, request_id });
            }
            Err(error) => return Err(error),
        };

        debug!(source = %source, dest = %dest, "object copied");

        Ok(CopyOutcome::Applied(ObjectInfo {
            bucket: dest.bucket.clone(),
            key: dest.key.clone(),
            size: 0,
            e_tag: copy_result.e_tag,
            content_type: None,
            last_modified: copy_result.last_modified,
            version_id: response.get_header("x-amz-version-id").map(str::to_string),
            user_metadata: HashMap::new(),
            request_id: response.request_id().map(str::to_string),
        }))
    }
}

impl std::fmt::Debug for CopyService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CopyService")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
