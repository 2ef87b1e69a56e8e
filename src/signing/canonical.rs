//! Canonical request building for Signature V4.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// Characters that are NOT percent-encoded in URI paths. S3 requires
/// every byte outside the unreserved set encoded, with `/` kept as the
/// segment separator.
const URI_PATH_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~')
    .remove(b'/');

/// Characters that are NOT percent-encoded in query strings.
const QUERY_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// URI-encode a path, preserving `/` between segments.
///
/// Applied when building request paths from raw object keys; the result
/// is already in canonical form, so signing passes it through untouched.
pub fn uri_encode_path(path: &str) -> String {
    utf8_percent_encode(path, URI_PATH_SET).to_string()
}

/// URI-encode a query parameter name or value.
pub fn uri_encode_query(value: &str) -> String {
    utf8_percent_encode(value, QUERY_SET).to_string()
}

/// Build the canonical URI from a request path.
///
/// The path must already be URI-encoded, which holds for paths taken
/// from a parsed [`url::Url`]. S3 signatures use the encoded form
/// exactly as sent, so the only normalization here is the leading `/`.
pub fn build_canonical_uri(path: &str) -> String {
    if path.is_empty() {
        return "/".to_string();
    }
    if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{}", path)
    }
}

/// Build the canonical query string from decoded parameter pairs.
///
/// Each name and value is URI-encoded once, then pairs are sorted by
/// encoded name and value and joined with '&'. Taking decoded pairs
/// keeps values that were percent-encoded in the URL from being
/// encoded twice.
pub fn build_canonical_query(params: &[(String, String)]) -> String {
    if params.is_empty() {
        return String::new();
    }

    let mut encoded: Vec<(String, String)> = params
        .iter()
        .map(|(k, v)| (uri_encode_query(k), uri_encode_query(v)))
        .collect();

    encoded.sort_by(|a, b| {
        let key_cmp = a.0.cmp(&b.0);
        if key_cmp == std::cmp::Ordering::Equal {
            a.1.cmp(&b.1)
        } else {
            key_cmp
        }
    });

    encoded
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&")
}

/// Build the canonical headers string.
///
/// Headers are lowercased, trimmed, sorted by name, and joined with newlines.
/// Multiple values for the same header are comma-separated.
pub fn build_canonical_headers(headers: &[(String, String)]) -> String {
    let mut header_map: std::collections::BTreeMap<String, Vec<String>> =
        std::collections::BTreeMap::new();

    for (name, value) in headers {
        let name_lower = name.to_lowercase();

        if !super::should_sign_header(&name_lower) {
            continue;
        }

        // Trim and collapse internal whitespace
        let trimmed = value.split_whitespace().collect::<Vec<_>>().join(" ");

        header_map.entry(name_lower).or_default().push(trimmed);
    }

    header_map
        .iter()
        .map(|(name, values)| format!("{}:{}\n", name, values.join(",")))
        .collect()
}

/// Build the signed headers string.
///
/// Returns a semicolon-separated list of lowercase header names.
pub fn build_signed_headers(headers: &[(String, String)]) -> String {
    let mut names: std::collections::BTreeSet<String> = std::collections::BTreeSet::new();

    for (name, _) in headers {
        let name_lower = name.to_lowercase();
        if super::should_sign_header(&name_lower) {
            names.insert(name_lower);
        }
    }

    names.into_iter().collect::<Vec<_>>().join(";")
}

/// Build the canonical request string.
///
/// Format:
/// ```text
/// HTTPMethod\n
/// CanonicalURI\n
/// CanonicalQueryString\n
/// CanonicalHeaders\n
/// SignedHeaders\n
/// HashedPayload
/// ```
pub fn build_canonical_request(
    method: &str,
    uri: &str,
    query: &[(String, String)],
    headers: &[(String, String)],
    payload_hash: &str,
) -> String {
    let canonical_uri = build_canonical_uri(uri);
    let canonical_query = build_canonical_query(query);
    let canonical_headers = build_canonical_headers(headers);
    let signed_headers = build_signed_headers(headers);

    format!(
        "{}\n{}\n{}\n{}\n{}\n{}",
        method.to_uppercase(),
        canonical_uri,
        canonical_query,
        canonical_headers,
        signed_headers,
        payload_hash
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(input: &[(&str, &str)]) -> Vec<(String, String)> {
        input
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_uri_encode_path() {
        assert_eq!(uri_encode_path("/"), "/");
        assert_eq!(uri_encode_path("/foo/bar"), "/foo/bar");
        assert_eq!(uri_encode_path("/foo bar/baz"), "/foo%20bar/baz");
        assert_eq!(uri_encode_path("/a+b$c.txt"), "/a%2Bb%24c.txt");
    }

    #[test]
    fn test_uri_encode_query() {
        assert_eq!(uri_encode_query("foo"), "foo");
        assert_eq!(uri_encode_query("foo bar"), "foo%20bar");
        assert_eq!(uri_encode_query("foo=bar"), "foo%3Dbar");
        assert_eq!(uri_encode_query("a/b"), "a%2Fb");
    }

    #[test]
    fn test_build_canonical_uri() {
        assert_eq!(build_canonical_uri(""), "/");
        assert_eq!(build_canonical_uri("/"), "/");
        assert_eq!(build_canonical_uri("/foo/bar"), "/foo/bar");
        assert_eq!(build_canonical_uri("foo/bar"), "/foo/bar");
        // Already-encoded paths pass through without double encoding.
        assert_eq!(build_canonical_uri("/foo%20bar"), "/foo%20bar");
    }

    #[test]
    fn test_build_canonical_query() {
        assert_eq!(build_canonical_query(&[]), "");
        assert_eq!(build_canonical_query(&pairs(&[("a", "1")])), "a=1");
        assert_eq!(
            build_canonical_query(&pairs(&[("b", "2"), ("a", "1")])),
            "a=1&b=2"
        );
        assert_eq!(
            build_canonical_query(&pairs(&[("a", "2"), ("a", "1")])),
            "a=1&a=2"
        );
        assert_eq!(
            build_canonical_query(&pairs(&[("list-type", "2"), ("prefix", "photos/")])),
            "list-type=2&prefix=photos%2F"
        );
        // Flag parameters keep their empty value.
        assert_eq!(build_canonical_query(&pairs(&[("uploads", "")])), "uploads=");
    }

    #[test]
    fn test_build_canonical_headers() {
        let headers = pairs(&[
            ("Host", "example.com"),
            ("X-Amz-Date", "20231215T103045Z"),
        ]);

        let result = build_canonical_headers(&headers);
        assert!(result.contains("host:example.com\n"));
        assert!(result.contains("x-amz-date:20231215T103045Z\n"));
    }

    #[test]
    fn test_build_signed_headers() {
        let headers = pairs(&[
            ("Host", "example.com"),
            ("X-Amz-Date", "20231215T103045Z"),
            ("Content-Type", "application/json"),
        ]);

        let result = build_signed_headers(&headers);
        assert_eq!(result, "content-type;host;x-amz-date");
    }

    #[test]
    fn test_build_canonical_request() {
        let headers = pairs(&[
            ("Host", "examplebucket.s3.amazonaws.com"),
            ("X-Amz-Date", "20231215T103045Z"),
            (
                "X-Amz-Content-Sha256",
                "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855",
            ),
        ]);

        let result = build_canonical_request(
            "GET",
            "/test.txt",
            &[],
            &headers,
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855",
        );

        assert!(result.starts_with("GET\n"));
        assert!(result.contains("/test.txt\n"));
    }

    #[test]
    fn test_headers_whitespace_normalization() {
        let headers = pairs(&[
            ("Host", "  example.com  "),
            ("X-Amz-Meta-Test", "value  with   spaces"),
        ]);

        let result = build_canonical_headers(&headers);
        assert!(result.contains("host:example.com\n"));
        assert!(result.contains("x-amz-meta-test:value with spaces\n"));
    }
}
