//! Service-layer operations over the store's HTTP API.
//!
//! Each service covers one slice of the protocol: it signs requests,
//! sends them through the shared transport, and converts responses into
//! typed results. Idempotent requests are retried with a fresh
//! signature per attempt; requests that create or complete server-side
//! state are sent once.

mod buckets;
mod copy;
mod multipart;
mod notification;
mod objects;
mod presign;

pub use buckets::BucketsService;
pub use copy::{CopyConditions, CopyOptions, CopyOutcome, CopyService, MetadataDirective};
pub use multipart::MultipartService;
pub use notification::NotificationService;
pub use objects::ObjectsService;
pub use presign::PresignService;

use crate::config::StoreConfig;
use crate::error::{map_http_status, map_service_code, StoreError};
use crate::resilience::{RetryConfig, RetryPolicy};
use crate::transport::HttpResponse;
use crate::types::ObjectInfo;
use crate::xml;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use chrono::{DateTime, Utc};
use md5::{Digest, Md5};
use std::collections::HashMap;
use url::Url;

/// Content type applied when the caller does not supply one.
const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Convert a failed response into a typed error.
///
/// Prefers the error document in the body; falls back to the HTTP
/// status when the body is absent or unparseable.
fn parse_error(response: &HttpResponse) -> StoreError {
    let request_id = response.request_id().map(str::to_string);
    if response.body.is_empty() {
        return map_http_status(response.status, request_id);
    }
    match xml::parse_error_response(&String::from_utf8_lossy(&response.body)) {
        // A body without a <Code> element is not an error document
        // (e.g. a proxy's HTML error page); the status must decide
        // retryability then.
        Ok(parsed) if parsed.code.is_empty() => map_http_status(response.status, request_id),
        Ok(mut parsed) => {
            if parsed.request_id.is_none() {
                parsed.request_id = request_id;
            }
            let code = parsed.code.clone();
            map_service_code(&code, Some(parsed))
        }
        Err(_) => map_http_status(response.status, request_id),
    }
}

/// Build a request URL for a bucket, an optional key, and query
/// parameters.
fn build_url(
    config: &StoreConfig,
    bucket: &str,
    key: Option<&str>,
    query: &[(&str, String)],
) -> Url {
    let mut url = config.resolve_endpoint(Some(bucket));
    url.set_path(&config.build_path(bucket, key));
    if !query.is_empty() {
        let mut pairs = url.query_pairs_mut();
        for (name, value) in query {
            pairs.append_pair(name, value);
        }
    }
    url
}

/// URL of the service root, for account-level requests.
fn root_url(config: &StoreConfig) -> Url {
    let mut url = config.resolve_endpoint(None);
    url.set_path("/");
    url
}

/// Case-insensitive header lookup.
fn header<'a>(headers: &'a HashMap<String, String>, name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

/// User metadata from `x-amz-meta-*` headers, with the prefix stripped.
fn extract_user_metadata(headers: &HashMap<String, String>) -> HashMap<String, String> {
    headers
        .iter()
        .filter_map(|(name, value)| {
            name.to_lowercase()
                .strip_prefix("x-amz-meta-")
                .map(|stripped| (stripped.to_string(), value.clone()))
        })
        .collect()
}

/// Parse an HTTP-date header value such as `Last-Modified`.
fn parse_http_date(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(value)
        .ok()
        .map(|parsed| parsed.with_timezone(&Utc))
}

/// Format a timestamp as an HTTP-date header value.
fn format_http_date(value: &DateTime<Utc>) -> String {
    value.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// Base64-encoded MD5 digest for `Content-MD5` headers.
fn content_md5(body: &[u8]) -> String {
    BASE64.encode(Md5::digest(body))
}

/// Object metadata assembled from response headers.
fn object_info_from_headers(
    bucket: &str,
    key: &str,
    headers: &HashMap<String, String>,
    size: u64,
) -> ObjectInfo {
    ObjectInfo {
        bucket: bucket.to_string(),
        key: key.to_string(),
        size,
        e_tag: header(headers, "etag").map(str::to_string),
        content_type: header(headers, "content-type").map(str::to_string),
        last_modified: header(headers, "last-modified").and_then(parse_http_date),
        version_id: header(headers, "x-amz-version-id").map(str::to_string),
        user_metadata: extract_user_metadata(headers),
        request_id: header(headers, "x-amz-request-id").map(str::to_string),
    }
}

/// Retry policy derived from the client configuration.
fn retry_policy(config: &StoreConfig) -> RetryPolicy {
    RetryPolicy::new(
        RetryConfig::new(config.max_retries)
            .with_initial_backoff(config.initial_backoff)
            .with_max_backoff(config.max_backoff)
            .with_multiplier(config.backoff_multiplier),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use bytes::Bytes;

    fn test_config() -> StoreConfig {
        let mut config = StoreConfig::default();
        config.endpoint = Some(Url::parse("http://localhost:9000").unwrap());
        config.path_style = true;
        config
    }

    #[test]
    fn test_build_url_with_key_and_query() {
        let config = test_config();
        let url = build_url(
            &config,
            "my-bucket",
            Some("docs/report.pdf"),
            &[("uploadId", "abc123".to_string())],
        );
        assert_eq!(url.path(), "/my-bucket/docs/report.pdf");
        assert_eq!(url.query(), Some("uploadId=abc123"));
    }

    #[test]
    fn test_build_url_encodes_key() {
        let config = test_config();
        let url = build_url(&config, "my-bucket", Some("a b/c+d.txt"), &[]);
        assert_eq!(url.path(), "/my-bucket/a%20b/c%2Bd.txt");
    }

    #[test]
    fn test_build_url_bucket_only() {
        let config = test_config();
        let url = build_url(&config, "my-bucket", None, &[("delete", String::new())]);
        assert_eq!(url.path(), "/my-bucket");
        assert_eq!(url.query(), Some("delete="));
    }

    #[test]
    fn test_parse_error_with_body() {
        let body = r#"<?xml version="1.0" encoding="UTF-8"?>
<Error>
  <Code>NoSuchKey</Code>
  <Message>The specified key does not exist.</Message>
  <Key>missing.txt</Key>
  <BucketName>my-bucket</BucketName>
</Error>"#;
        let response = HttpResponse {
            status: 404,
            headers: HashMap::from([("x-amz-request-id".to_string(), "REQ123".to_string())]),
            body: Bytes::from(body),
        };
        let error = parse_error(&response);
        assert_eq!(error.kind(), ErrorKind::NotFound);
        assert_eq!(error.service_code(), Some("NoSuchKey"));
        assert_eq!(error.request_id(), Some("REQ123"));
    }

    #[test]
    fn test_parse_error_empty_body_uses_status() {
        let response = HttpResponse {
            status: 403,
            headers: HashMap::new(),
            body: Bytes::new(),
        };
        let error = parse_error(&response);
        assert_eq!(error.kind(), ErrorKind::Authentication);
    }

    #[test]
    fn test_parse_error_unparseable_body_uses_status() {
        let response = HttpResponse {
            status: 503,
            headers: HashMap::new(),
            body: Bytes::from("<html>Service Unavailable</html>"),
        };
        let error = parse_error(&response);
        assert!(error.is_retryable());
    }

    #[test]
    fn test_parse_error_codeless_xml_body_uses_status() {
        // Well-formed XML that is not an error document still falls
        // back to the HTTP status.
        let response = HttpResponse {
            status: 404,
            headers: HashMap::from([("x-amz-request-id".to_string(), "REQ77".to_string())]),
            body: Bytes::from("<note><to>caller</to></note>"),
        };
        let error = parse_error(&response);
        assert_eq!(error.kind(), ErrorKind::NotFound);
        assert_eq!(error.request_id(), Some("REQ77"));
    }

    #[test]
    fn test_extract_user_metadata() {
        let headers = HashMap::from([
            ("x-amz-meta-owner".to_string(), "alice".to_string()),
            ("X-Amz-Meta-Project".to_string(), "atlas".to_string()),
            ("content-type".to_string(), "text/plain".to_string()),
        ]);
        let metadata = extract_user_metadata(&headers);
        assert_eq!(metadata.len(), 2);
        assert_eq!(metadata.get("owner").map(String::as_str), Some("alice"));
        assert_eq!(metadata.get("project").map(String::as_str), Some("atlas"));
    }

    #[test]
    fn test_http_date_round_trip() {
        let parsed = parse_http_date("Mon, 12 Oct 2009 17:50:00 GMT").unwrap();
        assert_eq!(format_http_date(&parsed), "Mon, 12 Oct 2009 17:50:00 GMT");
    }

    #[test]
    fn test_parse_http_date_rejects_garbage() {
        assert!(parse_http_date("not a date").is_none());
    }

    #[test]
    fn test_content_md5_known_digest() {
        assert_eq!(content_md5(b"hello world"), "XrY7u+Ae7tCTyyK7j1rNww==");
    }

    #[test]
    fn test_object_info_from_headers() {
        let headers = HashMap::from([
            ("etag".to_string(), "\"abc123\"".to_string()),
            ("content-type".to_string(), "image/png".to_string()),
            (
                "last-modified".to_string(),
                "Mon, 12 Oct 2009 17:50:00 GMT".to_string(),
            ),
            ("x-amz-meta-camera".to_string(), "rx100".to_string()),
            ("x-amz-request-id".to_string(), "REQ9".to_string()),
        ]);
        let info = object_info_from_headers("photos", "cat.png", &headers, 2048);
        assert_eq!(info.bucket, "photos");
        assert_eq!(info.key, "cat.png");
        assert_eq!(info.size, 2048);
        assert_eq!(info.e_tag.as_deref(), Some("\"abc123\""));
        assert_eq!(info.content_type.as_deref(), Some("image/png"));
        assert!(info.last_modified.is_some());
        assert_eq!(
            info.user_metadata.get("camera").map(String::as_str),
            Some("rx100")
        );
        assert_eq!(info.request_id.as_deref(), Some("REQ9"));
    }
}
