//! Error code mapping from service responses to typed errors.

use super::*;

/// Parsed service error response body.
#[derive(Debug, Clone)]
pub struct ErrorResponse {
    /// Service error code (e.g., "NoSuchKey").
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Affected bucket, if any.
    pub bucket: Option<String>,
    /// Affected key, if any.
    pub key: Option<String>,
    /// Service request ID.
    pub request_id: Option<String>,
    /// Extended request ID.
    pub host_id: Option<String>,
}

/// Map a service error code to a typed error.
///
/// Codes with a dedicated place in the taxonomy get one; everything else
/// lands in `ServiceError::Unrecognized` with the raw code preserved.
pub fn map_service_code(code: &str, response: Option<ErrorResponse>) -> StoreError {
    let resp = response.unwrap_or(ErrorResponse {
        code: code.to_string(),
        message: String::new(),
        bucket: None,
        key: None,
        request_id: None,
        host_id: None,
    });

    match code {
        // Bucket errors
        "NoSuchBucket" => StoreError::Bucket(BucketError::NotFound {
            bucket: resp.bucket.unwrap_or_default(),
            request_id: resp.request_id,
        }),
        "BucketAlreadyExists" => StoreError::Bucket(BucketError::AlreadyExists {
            bucket: resp.bucket.unwrap_or_default(),
            request_id: resp.request_id,
        }),
        "BucketAlreadyOwnedByYou" => StoreError::Bucket(BucketError::AlreadyOwnedByYou {
            bucket: resp.bucket.unwrap_or_default(),
            request_id: resp.request_id,
        }),
        "BucketNotEmpty" => StoreError::Bucket(BucketError::NotEmpty {
            bucket: resp.bucket.unwrap_or_default(),
            request_id: resp.request_id,
        }),
        "NoSuchBucketPolicy" => StoreError::Bucket(BucketError::NoSuchPolicy {
            bucket: resp.bucket.unwrap_or_default(),
            request_id: resp.request_id,
        }),

        // Object errors
        "NoSuchKey" => StoreError::Object(ObjectError::NotFound {
            bucket: resp.bucket.unwrap_or_default(),
            key: resp.key.unwrap_or_default(),
            request_id: resp.request_id,
        }),
        "PreconditionFailed" => StoreError::Object(ObjectError::PreconditionFailed {
            bucket: resp.bucket.unwrap_or_default(),
            key: resp.key.unwrap_or_default(),
            request_id: resp.request_id,
        }),

        // Multipart errors
        "NoSuchUpload" => StoreError::Multipart(MultipartError::UploadNotFound {
            bucket: resp.bucket.unwrap_or_default(),
            key: resp.key.unwrap_or_default(),
            upload_id: String::new(),
            request_id: resp.request_id,
        }),
        "InvalidPart" => StoreError::Multipart(MultipartError::InvalidPart {
            part_number: 0,
            reason: resp.message,
            request_id: resp.request_id,
        }),
        "InvalidPartOrder" => StoreError::Multipart(MultipartError::InvalidPartOrder {
            request_id: resp.request_id,
        }),
        "EntityTooSmall" => StoreError::Multipart(MultipartError::PartTooSmall {
            size: 0,
            min_size: 5 * 1024 * 1024,
            request_id: resp.request_id,
        }),

        // Access errors
        "AccessDenied" => StoreError::Access(AccessError::AccessDenied {
            message: if resp.message.is_empty() {
                None
            } else {
                Some(resp.message)
            },
            request_id: resp.request_id,
        }),
        "InvalidAccessKeyId" => StoreError::Access(AccessError::InvalidAccessKeyId {
            request_id: resp.request_id,
        }),
        "SignatureDoesNotMatch" => StoreError::Access(AccessError::SignatureDoesNotMatch {
            request_id: resp.request_id,
        }),
        "ExpiredToken" => StoreError::Access(AccessError::ExpiredToken {
            request_id: resp.request_id,
        }),

        // Integrity
        "BadDigest" | "InvalidDigest" => StoreError::Transfer(TransferError::ChecksumMismatch {
            expected: String::new(),
            actual: resp.message,
        }),

        // Validation echoed back by the service
        "InvalidBucketName" => StoreError::Validation(ValidationError::InvalidBucketName {
            bucket: resp.bucket.unwrap_or_default(),
            reason: resp.message,
        }),
        "InvalidArgument" | "InvalidRequest" | "MalformedXML" => {
            StoreError::Validation(ValidationError::InvalidArgument {
                message: resp.message,
            })
        }
        "InvalidRange" => StoreError::Validation(ValidationError::InvalidRange {
            reason: resp.message,
        }),

        // Server errors
        "InternalError" => StoreError::Service(ServiceError::Internal {
            message: if resp.message.is_empty() {
                None
            } else {
                Some(resp.message)
            },
            request_id: resp.request_id,
        }),
        "ServiceUnavailable" | "RequestTimeout" => StoreError::Service(ServiceError::Unavailable {
            retry_after: None,
            request_id: resp.request_id,
        }),
        "SlowDown" => StoreError::Service(ServiceError::SlowDown {
            retry_after: None,
            request_id: resp.request_id,
        }),

        // Anything else keeps its raw code for diagnostics
        _ => StoreError::Service(ServiceError::Unrecognized {
            code: code.to_string(),
            message: resp.message,
            status: None,
            request_id: resp.request_id,
        }),
    }
}

/// Map an HTTP status code to an error when no parseable body is available.
pub fn map_http_status(status: u16, request_id: Option<String>) -> StoreError {
    match status {
        400 => StoreError::Validation(ValidationError::InvalidArgument {
            message: "Bad request".to_string(),
        }),
        403 => StoreError::Access(AccessError::AccessDenied {
            message: None,
            request_id,
        }),
        404 => StoreError::Object(ObjectError::NotFound {
            bucket: String::new(),
            key: String::new(),
            request_id,
        }),
        412 => StoreError::Object(ObjectError::PreconditionFailed {
            bucket: String::new(),
            key: String::new(),
            request_id,
        }),
        500 => StoreError::Service(ServiceError::Internal {
            message: None,
            request_id,
        }),
        503 => StoreError::Service(ServiceError::Unavailable {
            retry_after: None,
            request_id,
        }),
        _ => StoreError::Service(ServiceError::Unrecognized {
            code: format!("Http{}", status),
            message: format!("HTTP status {}", status),
            status: Some(status),
            request_id,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(code: &str) -> ErrorResponse {
        ErrorResponse {
            code: code.into(),
            message: "message".into(),
            bucket: Some("my-bucket".into()),
            key: Some("my-key".into()),
            request_id: Some("ABC123".into()),
            host_id: None,
        }
    }

    #[test]
    fn test_map_no_such_bucket() {
        let error = map_service_code("NoSuchBucket", Some(response("NoSuchBucket")));
        match error {
            StoreError::Bucket(BucketError::NotFound { bucket, request_id }) => {
                assert_eq!(bucket, "my-bucket");
                assert_eq!(request_id, Some("ABC123".to_string()));
            }
            other => panic!("Expected BucketError::NotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_map_no_such_key() {
        let error = map_service_code("NoSuchKey", Some(response("NoSuchKey")));
        match error {
            StoreError::Object(ObjectError::NotFound { bucket, key, .. }) => {
                assert_eq!(bucket, "my-bucket");
                assert_eq!(key, "my-key");
            }
            other => panic!("Expected ObjectError::NotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_map_precondition_failed() {
        let error = map_service_code("PreconditionFailed", Some(response("PreconditionFailed")));
        assert_eq!(error.kind(), ErrorKind::PreconditionFailed);
        assert_eq!(error.service_code(), Some("PreconditionFailed"));
    }

    #[test]
    fn test_map_auth_codes() {
        for code in ["AccessDenied", "InvalidAccessKeyId", "SignatureDoesNotMatch"] {
            let error = map_service_code(code, None);
            assert_eq!(error.kind(), ErrorKind::Authentication, "code {}", code);
        }
    }

    #[test]
    fn test_map_slow_down_retryable() {
        let error = map_service_code("SlowDown", None);
        assert!(error.is_retryable());
    }

    #[test]
    fn test_unknown_code_keeps_raw_code() {
        let error = map_service_code("XMinioInvalidObjectName", Some(response("x")));
        match &error {
            StoreError::Service(ServiceError::Unrecognized { code, .. }) => {
                assert_eq!(code, "XMinioInvalidObjectName");
            }
            other => panic!("Expected Unrecognized, got {:?}", other),
        }
        assert_eq!(error.service_code(), Some("XMinioInvalidObjectName"));
        assert!(!error.is_retryable());
    }

    #[test]
    fn test_map_http_status() {
        assert_eq!(map_http_status(403, None).kind(), ErrorKind::Authentication);
        assert_eq!(map_http_status(404, None).kind(), ErrorKind::NotFound);
        assert_eq!(
            map_http_status(412, None).kind(),
            ErrorKind::PreconditionFailed
        );
        assert!(map_http_status(503, None).is_retryable());
    }
}
