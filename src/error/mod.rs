//! Error types for the object-storage client.
//!
//! Errors are grouped by source into sub-enums and rolled up into
//! [`StoreError`]. Every error carries structured context (service error
//! code, request ID, offending sizes) rather than bare strings, and
//! [`StoreError::kind`] collapses the hierarchy into the coarse taxonomy
//! callers branch on.

mod mapping;

pub use mapping::{map_http_status, map_service_code, ErrorResponse};

use std::time::Duration;
use thiserror::Error;

/// Coarse error classification for caller-side branching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed names, bad parameters, incompatible resume state.
    InvalidArgument,
    /// Signing or credential failure.
    Authentication,
    /// A conditional operation's precondition did not hold (expected-negative).
    PreconditionFailed,
    /// Bucket, object, or upload session absent.
    NotFound,
    /// Checksum or decryption-tag mismatch, truncated ciphertext.
    Integrity,
    /// Network-level failure; candidates for retry.
    Transport,
    /// Any other server-reported or protocol failure, with the raw code kept.
    Service,
    /// Input source ended before its declared length.
    Eof,
}

/// Top-level error type for the object-storage client.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Configuration errors.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Credential errors.
    #[error("Credentials error: {0}")]
    Credentials(#[from] CredentialsError),

    /// Request signing errors.
    #[error("Signing error: {0}")]
    Signing(#[from] SigningError),

    /// Client-side validation errors.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Bucket operation errors.
    #[error("Bucket error: {0}")]
    Bucket(#[from] BucketError),

    /// Object operation errors.
    #[error("Object error: {0}")]
    Object(#[from] ObjectError),

    /// Multipart upload errors.
    #[error("Multipart error: {0}")]
    Multipart(#[from] MultipartError),

    /// Access and authorization errors reported by the service.
    #[error("Access error: {0}")]
    Access(#[from] AccessError),

    /// Envelope encryption errors.
    #[error("Crypto error: {0}")]
    Crypto(#[from] CryptoError),

    /// Network and transport errors.
    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    /// Other server-reported errors.
    #[error("Service error: {0}")]
    Service(#[from] ServiceError),

    /// Response parsing errors.
    #[error("Response error: {0}")]
    Response(#[from] ResponseError),

    /// Data transfer errors.
    #[error("Transfer error: {0}")]
    Transfer(#[from] TransferError),
}

impl StoreError {
    /// Collapse the error into the coarse taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            StoreError::Config(_) => ErrorKind::InvalidArgument,
            StoreError::Validation(_) => ErrorKind::InvalidArgument,
            StoreError::Credentials(_) => ErrorKind::Authentication,
            StoreError::Access(_) => ErrorKind::Authentication,
            StoreError::Signing(SigningError::InvalidExpiry { .. }) => ErrorKind::InvalidArgument,
            StoreError::Signing(_) => ErrorKind::Authentication,
            StoreError::Bucket(BucketError::NotFound { .. }) => ErrorKind::NotFound,
            StoreError::Bucket(BucketError::NoSuchPolicy { .. }) => ErrorKind::NotFound,
            StoreError::Bucket(_) => ErrorKind::Service,
            StoreError::Object(ObjectError::NotFound { .. }) => ErrorKind::NotFound,
            StoreError::Object(ObjectError::PreconditionFailed { .. }) => {
                ErrorKind::PreconditionFailed
            }
            StoreError::Multipart(MultipartError::UploadNotFound { .. }) => ErrorKind::NotFound,
            StoreError::Multipart(_) => ErrorKind::InvalidArgument,
            StoreError::Crypto(CryptoError::Integrity { .. }) => ErrorKind::Integrity,
            StoreError::Crypto(_) => ErrorKind::InvalidArgument,
            StoreError::Network(_) => ErrorKind::Transport,
            StoreError::Service(_) => ErrorKind::Service,
            StoreError::Response(_) => ErrorKind::Service,
            StoreError::Transfer(TransferError::UnexpectedEof { .. }) => ErrorKind::Eof,
            StoreError::Transfer(TransferError::ChecksumMismatch { .. }) => ErrorKind::Integrity,
            StoreError::Transfer(TransferError::Source { .. }) => ErrorKind::InvalidArgument,
            StoreError::Transfer(TransferError::Worker { .. }) => ErrorKind::Service,
            StoreError::Transfer(TransferError::Sink { .. }) => ErrorKind::InvalidArgument,
        }
    }

    /// Returns true if the error is retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            StoreError::Network(e) => e.is_retryable(),
            StoreError::Service(e) => e.is_retryable(),
            _ => false,
        }
    }

    /// Returns the retry delay hint if the service supplied one.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            StoreError::Service(ServiceError::SlowDown { retry_after, .. }) => *retry_after,
            StoreError::Service(ServiceError::Unavailable { retry_after, .. }) => *retry_after,
            _ => None,
        }
    }

    /// Returns the HTTP status code if applicable.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            StoreError::Access(_) => Some(403),
            StoreError::Bucket(BucketError::NotFound { .. }) => Some(404),
            StoreError::Bucket(BucketError::NoSuchPolicy { .. }) => Some(404),
            StoreError::Bucket(BucketError::AlreadyExists { .. }) => Some(409),
            StoreError::Bucket(BucketError::AlreadyOwnedByYou { .. }) => Some(409),
            StoreError::Bucket(BucketError::NotEmpty { .. }) => Some(409),
            StoreError::Object(ObjectError::NotFound { .. }) => Some(404),
            StoreError::Object(ObjectError::PreconditionFailed { .. }) => Some(412),
            StoreError::Multipart(MultipartError::UploadNotFound { .. }) => Some(404),
            StoreError::Validation(_) => Some(400),
            StoreError::Service(ServiceError::Internal { .. }) => Some(500),
            StoreError::Service(ServiceError::Unavailable { .. }) => Some(503),
            StoreError::Service(ServiceError::SlowDown { .. }) => Some(503),
            StoreError::Service(ServiceError::Unrecognized { status, .. }) => *status,
            _ => None,
        }
    }

    /// Returns the service error code if available.
    pub fn service_code(&self) -> Option<&str> {
        match self {
            StoreError::Bucket(e) => Some(e.code()),
            StoreError::Object(e) => Some(e.code()),
            StoreError::Multipart(e) => Some(e.code()),
            StoreError::Access(e) => Some(e.code()),
            StoreError::Service(e) => Some(e.code()),
            _ => None,
        }
    }

    /// Returns the service request ID if available.
    pub fn request_id(&self) -> Option<&str> {
        match self {
            StoreError::Bucket(e) => e.request_id(),
            StoreError::Object(e) => e.request_id(),
            StoreError::Multipart(e) => e.request_id(),
            StoreError::Access(e) => e.request_id(),
            StoreError::Service(e) => e.request_id(),
            _ => None,
        }
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Missing required region configuration.
    #[error("Missing region: region must be specified via config or environment")]
    MissingRegion,

    /// Missing required credentials.
    #[error("Missing credentials: credentials must be specified via config or environment")]
    MissingCredentials,

    /// Invalid endpoint URL.
    #[error("Invalid endpoint URL '{url}': {details}")]
    InvalidEndpoint {
        /// The invalid URL.
        url: String,
        /// Details about the validation error.
        details: String,
    },

    /// Invalid configuration value.
    #[error("Invalid configuration: {field} - {message}")]
    InvalidValue {
        /// The configuration field name.
        field: String,
        /// Error message.
        message: String,
    },
}

/// Credential errors.
#[derive(Debug, Error)]
pub enum CredentialsError {
    /// No credentials could be found.
    #[error("Credentials not found: no credentials could be loaded from any source")]
    NotFound,

    /// Credentials have expired.
    #[error("Credentials expired: session credentials expired at {expiration}")]
    Expired {
        /// When the credentials expired.
        expiration: String,
    },

    /// Credentials are invalid.
    #[error("Invalid credentials: {message}")]
    Invalid {
        /// Details about why credentials are invalid.
        message: String,
    },
}

/// Request signing errors.
#[derive(Debug, Error)]
pub enum SigningError {
    /// Presign expiry outside the permitted (0, 604800] second range.
    #[error("Invalid presign expiry: {seconds}s is outside (0, {max}]", max = 604800)]
    InvalidExpiry {
        /// The requested expiry in seconds.
        seconds: u64,
    },

    /// Signature calculation failed.
    #[error("Signature calculation failed: {message}")]
    CalculationFailed {
        /// Details about the calculation error.
        message: String,
    },

    /// Policy document could not be serialized.
    #[error("Invalid POST policy: {message}")]
    InvalidPolicy {
        /// Details about the policy error.
        message: String,
    },
}

/// Client-side validation errors.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// General validation error.
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        /// Details about the validation error.
        message: String,
    },

    /// Invalid bucket name.
    #[error("Invalid bucket name '{bucket}': {reason}")]
    InvalidBucketName {
        /// The invalid bucket name.
        bucket: String,
        /// Reason why the name is invalid.
        reason: String,
    },

    /// Invalid object key.
    #[error("Invalid object key '{key}': {reason}")]
    InvalidObjectKey {
        /// The invalid object key.
        key: String,
        /// Reason why the key is invalid.
        reason: String,
    },

    /// Invalid byte range.
    #[error("Invalid range: {reason}")]
    InvalidRange {
        /// Reason why the range is invalid.
        reason: String,
    },

    /// Conflicting copy conditions.
    #[error("Conflicting copy conditions: {message}")]
    ConflictingConditions {
        /// Details about the conflict.
        message: String,
    },

    /// An incomplete upload session exists but cannot be resumed as requested.
    #[error("Incompatible resume for '{bucket}/{key}': {reason}")]
    IncompatibleResume {
        /// The bucket name.
        bucket: String,
        /// The object key.
        key: String,
        /// Why the session cannot be resumed.
        reason: String,
    },
}

/// Bucket operation errors.
#[derive(Debug, Error)]
pub enum BucketError {
    /// Bucket not found.
    #[error("Bucket not found: '{bucket}'")]
    NotFound {
        /// The bucket name.
        bucket: String,
        /// Service request ID.
        request_id: Option<String>,
    },

    /// Bucket already exists (owned by another account).
    #[error("Bucket already exists: '{bucket}' is owned by another account")]
    AlreadyExists {
        /// The bucket name.
        bucket: String,
        /// Service request ID.
        request_id: Option<String>,
    },

    /// Bucket already owned by the caller.
    #[error("Bucket already owned by you: '{bucket}'")]
    AlreadyOwnedByYou {
        /// The bucket name.
        bucket: String,
        /// Service request ID.
        request_id: Option<String>,
    },

    /// Bucket is not empty.
    #[error("Bucket not empty: '{bucket}' contains objects")]
    NotEmpty {
        /// The bucket name.
        bucket: String,
        /// Service request ID.
        request_id: Option<String>,
    },

    /// The bucket has no policy attached.
    #[error("No policy on bucket '{bucket}'")]
    NoSuchPolicy {
        /// The bucket name.
        bucket: String,
        /// Service request ID.
        request_id: Option<String>,
    },
}

impl BucketError {
    /// Returns the service error code.
    pub fn code(&self) -> &str {
        match self {
            BucketError::NotFound { .. } => "NoSuchBucket",
            BucketError::AlreadyExists { .. } => "BucketAlreadyExists",
            BucketError::AlreadyOwnedByYou { .. } => "BucketAlreadyOwnedByYou",
            BucketError::NotEmpty { .. } => "BucketNotEmpty",
            BucketError::NoSuchPolicy { .. } => "NoSuchBucketPolicy",
        }
    }

    /// Returns the service request ID if available.
    pub fn request_id(&self) -> Option<&str> {
        match self {
            BucketError::NotFound { request_id, .. }
            | BucketError::AlreadyExists { request_id, .. }
            | BucketError::AlreadyOwnedByYou { request_id, .. }
            | BucketError::NotEmpty { request_id, .. }
            | BucketError::NoSuchPolicy { request_id, .. } => request_id.as_deref(),
        }
    }
}

/// Object operation errors.
#[derive(Debug, Error)]
pub enum ObjectError {
    /// Object not found.
    #[error("Object not found: '{bucket}/{key}'")]
    NotFound {
        /// The bucket name.
        bucket: String,
        /// The object key.
        key: String,
        /// Service request ID.
        request_id: Option<String>,
    },

    /// A copy or write precondition did not hold.
    #[error("Precondition failed for '{bucket}/{key}'")]
    PreconditionFailed {
        /// The bucket name.
        bucket: String,
        /// The object key.
        key: String,
        /// Service request ID.
        request_id: Option<String>,
    },
}

impl ObjectError {
    /// Returns the service error code.
    pub fn code(&self) -> &str {
        match self {
            ObjectError::NotFound { .. } => "NoSuchKey",
            ObjectError::PreconditionFailed { .. } => "PreconditionFailed",
        }
    }

    /// Returns the service request ID if available.
    pub fn request_id(&self) -> Option<&str> {
        match self {
            ObjectError::NotFound { request_id, .. }
            | ObjectError::PreconditionFailed { request_id, .. } => request_id.as_deref(),
        }
    }
}

/// Multipart upload errors.
#[derive(Debug, Error)]
pub enum MultipartError {
    /// Upload session not found.
    #[error("Upload not found: upload_id '{upload_id}' for '{bucket}/{key}'")]
    UploadNotFound {
        /// The bucket name.
        bucket: String,
        /// The object key.
        key: String,
        /// The upload ID.
        upload_id: String,
        /// Service request ID.
        request_id: Option<String>,
    },

    /// Invalid part.
    #[error("Invalid part {part_number}: {reason}")]
    InvalidPart {
        /// The part number.
        part_number: u32,
        /// Reason why the part is invalid.
        reason: String,
        /// Service request ID.
        request_id: Option<String>,
    },

    /// Parts listed out of ascending order at completion.
    #[error("Invalid part order: parts must be in ascending order")]
    InvalidPartOrder {
        /// Service request ID.
        request_id: Option<String>,
    },

    /// Part below the minimum size.
    #[error("Part too small: {size} bytes is below minimum of {min_size} bytes")]
    PartTooSmall {
        /// The part size.
        size: u64,
        /// Minimum required size.
        min_size: u64,
        /// Service request ID.
        request_id: Option<String>,
    },
}

impl MultipartError {
    /// Returns the service error code.
    pub fn code(&self) -> &str {
        match self {
            MultipartError::UploadNotFound { .. } => "NoSuchUpload",
            MultipartError::InvalidPart { .. } => "InvalidPart",
            MultipartError::InvalidPartOrder { .. } => "InvalidPartOrder",
            MultipartError::PartTooSmall { .. } => "EntityTooSmall",
        }
    }

    /// Returns the service request ID if available.
    pub fn request_id(&self) -> Option<&str> {
        match self {
            MultipartError::UploadNotFound { request_id, .. }
            | MultipartError::InvalidPart { request_id, .. }
            | MultipartError::InvalidPartOrder { request_id }
            | MultipartError::PartTooSmall { request_id, .. } => request_id.as_deref(),
        }
    }
}

/// Access and authorization errors.
#[derive(Debug, Error)]
pub enum AccessError {
    /// Access denied.
    #[error("Access denied")]
    AccessDenied {
        /// Additional message if available.
        message: Option<String>,
        /// Service request ID.
        request_id: Option<String>,
    },

    /// Invalid access key ID.
    #[error("Invalid access key ID")]
    InvalidAccessKeyId {
        /// Service request ID.
        request_id: Option<String>,
    },

    /// Signature does not match.
    #[error("Signature does not match")]
    SignatureDoesNotMatch {
        /// Service request ID.
        request_id: Option<String>,
    },

    /// Expired token.
    #[error("Token has expired")]
    ExpiredToken {
        /// Service request ID.
        request_id: Option<String>,
    },
}

impl AccessError {
    /// Returns the service error code.
    pub fn code(&self) -> &str {
        match self {
            AccessError::AccessDenied { .. } => "AccessDenied",
            AccessError::InvalidAccessKeyId { .. } => "InvalidAccessKeyId",
            AccessError::SignatureDoesNotMatch { .. } => "SignatureDoesNotMatch",
            AccessError::ExpiredToken { .. } => "ExpiredToken",
        }
    }

    /// Returns the service request ID if available.
    pub fn request_id(&self) -> Option<&str> {
        match self {
            AccessError::AccessDenied { request_id, .. }
            | AccessError::InvalidAccessKeyId { request_id }
            | AccessError::SignatureDoesNotMatch { request_id }
            | AccessError::ExpiredToken { request_id } => request_id.as_deref(),
        }
    }
}

/// Envelope encryption errors.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Key material is absent or has the wrong size/shape.
    #[error("Invalid key material: {message}")]
    InvalidKey {
        /// Details about the key problem.
        message: String,
    },

    /// Authentication tag mismatch or truncated ciphertext.
    #[error("Integrity failure: {message}")]
    Integrity {
        /// Details about the failure.
        message: String,
    },

    /// Required encryption metadata missing from the object.
    #[error("Missing encryption metadata: {field}")]
    MissingMetadata {
        /// The missing metadata field.
        field: String,
    },

    /// Metadata names an algorithm this codec does not implement.
    #[error("Unsupported encryption algorithm: {algorithm}")]
    UnsupportedAlgorithm {
        /// The algorithm identifier from metadata.
        algorithm: String,
    },
}

/// Network and transport errors.
#[derive(Debug, Error)]
pub enum NetworkError {
    /// Connection failed.
    #[error("Connection failed: {message}")]
    ConnectionFailed {
        /// Error message.
        message: String,
    },

    /// Request timed out.
    #[error("Request timed out after {duration:?}")]
    Timeout {
        /// The timeout duration.
        duration: Duration,
    },

    /// TLS error.
    #[error("TLS error: {message}")]
    TlsError {
        /// Error message.
        message: String,
    },

    /// Connection reset.
    #[error("Connection reset by peer")]
    ConnectionReset,
}

impl NetworkError {
    /// Returns true if the error is retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            NetworkError::ConnectionFailed { .. }
                | NetworkError::Timeout { .. }
                | NetworkError::ConnectionReset
        )
    }
}

/// Server-reported errors not covered by a more specific category.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Internal server error (500).
    #[error("Internal server error")]
    Internal {
        /// Error message.
        message: Option<String>,
        /// Service request ID.
        request_id: Option<String>,
    },

    /// Service unavailable (503).
    #[error("Service unavailable")]
    Unavailable {
        /// Retry after duration hint.
        retry_after: Option<Duration>,
        /// Service request ID.
        request_id: Option<String>,
    },

    /// Slow down (503), rate limiting.
    #[error("Slow down - reduce request rate")]
    SlowDown {
        /// Retry after duration hint.
        retry_after: Option<Duration>,
        /// Service request ID.
        request_id: Option<String>,
    },

    /// Any other server error; the raw code is preserved for diagnostics.
    #[error("Service error {code}: {message}")]
    Unrecognized {
        /// The raw service error code.
        code: String,
        /// Human-readable message from the service.
        message: String,
        /// HTTP status, when known.
        status: Option<u16>,
        /// Service request ID.
        request_id: Option<String>,
    },
}

impl ServiceError {
    /// Returns the service error code.
    pub fn code(&self) -> &str {
        match self {
            ServiceError::Internal { .. } => "InternalError",
            ServiceError::Unavailable { .. } => "ServiceUnavailable",
            ServiceError::SlowDown { .. } => "SlowDown",
            ServiceError::Unrecognized { code, .. } => code,
        }
    }

    /// Returns the service request ID if available.
    pub fn request_id(&self) -> Option<&str> {
        match self {
            ServiceError::Internal { request_id, .. }
            | ServiceError::Unavailable { request_id, .. }
            | ServiceError::SlowDown { request_id, .. }
            | ServiceError::Unrecognized { request_id, .. } => request_id.as_deref(),
        }
    }

    /// Returns true if the error is retryable.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, ServiceError::Unrecognized { .. })
    }
}

/// Response parsing errors.
#[derive(Debug, Error)]
pub enum ResponseError {
    /// XML parse error.
    #[error("XML parse error: {message}")]
    XmlParse {
        /// Error message.
        message: String,
    },

    /// Invalid response format.
    #[error("Invalid response: {message}")]
    InvalidResponse {
        /// Error message.
        message: String,
    },

    /// Missing required field.
    #[error("Missing required field '{field}' in response")]
    MissingField {
        /// The missing field name.
        field: String,
    },
}

/// Data transfer errors.
#[derive(Debug, Error)]
pub enum TransferError {
    /// Input source ended before its declared length; the multipart session
    /// is left in place so a corrected call can resume it.
    #[error("Unexpected end of input: expected {expected} bytes, received {received}")]
    UnexpectedEof {
        /// Declared size.
        expected: u64,
        /// Bytes actually read.
        received: u64,
    },

    /// Checksum mismatch between what was sent and what the service stored.
    #[error("Checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch {
        /// Expected checksum.
        expected: String,
        /// Actual checksum.
        actual: String,
    },

    /// Reading from the caller-supplied data source failed.
    #[error("Data source read failed: {message}")]
    Source {
        /// Error message.
        message: String,
    },

    /// A part upload worker stopped before reporting a result.
    #[error("Upload worker failed: {message}")]
    Worker {
        /// Error message.
        message: String,
    },

    /// Writing to the caller-supplied sink failed.
    #[error("Sink write failed: {message}")]
    Sink {
        /// Error message.
        message: String,
    },
}
