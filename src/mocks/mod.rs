//! Mock implementations for exercising the client without a live
//! endpoint.
//!
//! [`MockTransport`] replays queued responses and records every request;
//! [`MockSigner`] stamps fixed signature headers; and
//! [`MockCredentialsProvider`] serves well-known test credentials.

mod credentials;
mod signer;
mod transport;

pub use credentials::MockCredentialsProvider;
pub use signer::{MockSigner, SignRequest};
pub use transport::{MockResponse, MockResponseBuilder, MockTransport};

use std::collections::HashMap;

/// Canned wire documents and headers for tests.
pub struct TestFixtures;

impl TestFixtures {
    /// Sample XML for a single listing page.
    pub fn list_objects_xml() -> &'static str {
        r#"<?xml version="1.0" encoding="UTF-8"?>
<ListBucketResult xmlns="http://s3.amazonaws.com/doc/2006-03-01/">
    <Name>test-bucket</Name>
    <Prefix></Prefix>
    <KeyCount>2</KeyCount>
    <MaxKeys>1000</MaxKeys>
    <IsTruncated>false</IsTruncated>
    <Contents>
        <Key>file1.txt</Key>
        <LastModified>2024-01-15T10:30:00.000Z</LastModified>
        <ETag>"abc123"</ETag>
        <Size>1024</Size>
        <StorageClass>STANDARD</StorageClass>
    </Contents>
    <Contents>
        <Key>file2.txt</Key>
        <LastModified>2024-01-16T11:30:00.000Z</LastModified>
        <ETag>"def456"</ETag>
        <Size>2048</Size>
        <StorageClass>STANDARD_IA</StorageClass>
    </Contents>
</ListBucketResult>"#
    }

    /// Sample XML for an error response.
    pub fn error_xml(code: &str, message: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<Error>
    <Code>{}</Code>
    <Message>{}</Message>
    <RequestId>test-request-id</RequestId>
</Error>"#,
            code, message
        )
    }

    /// Sample XML for initiating a multipart upload.
    pub fn initiate_multipart_xml() -> &'static str {
        r#"<?xml version="1.0" encoding="UTF-8"?>
<InitiateMultipartUploadResult xmlns="http://s3.amazonaws.com/doc/2006-03-01/">
    <Bucket>test-bucket</Bucket>
    <Key>test-key.txt</Key>
    <UploadId>upload-id-12345</UploadId>
</InitiateMultipartUploadResult>"#
    }

    /// Sample XML for completing a multipart upload.
    pub fn complete_multipart_xml() -> &'static str {
        r#"<?xml version="1.0" encoding="UTF-8"?>
<CompleteMultipartUploadResult xmlns="http://s3.amazonaws.com/doc/2006-03-01/">
    <Location>https://test-bucket.s3.amazonaws.com/test-key.txt</Location>
    <Bucket>test-bucket</Bucket>
    <Key>test-key.txt</Key>
    <ETag>"combined-etag-2"</ETag>
</CompleteMultipartUploadResult>"#
    }

    /// Sample XML for a listing of incomplete multipart uploads.
    pub fn list_uploads_xml() -> &'static str {
        r#"<?xml version="1.0" encoding="UTF-8"?>
<ListMultipartUploadsResult xmlns="http://s3.amazonaws.com/doc/2006-03-01/">
    <Bucket>test-bucket</Bucket>
    <IsTruncated>false</IsTruncated>
</ListMultipartUploadsResult>"#
    }

    /// Sample headers for a successful download response.
    pub fn get_object_headers() -> HashMap<String, String> {
        let mut headers = HashMap::new();
        headers.insert("content-type".to_string(), "text/plain".to_string());
        headers.insert("content-length".to_string(), "1024".to_string());
        headers.insert("etag".to_string(), "\"abc123\"".to_string());
        headers.insert(
            "last-modified".to_string(),
            "Mon, 15 Jan 2024 10:30:00 GMT".to_string(),
        );
        headers.insert(
            "x-amz-request-id".to_string(),
            "test-request-id".to_string(),
        );
        headers
    }

    /// Sample headers for an upload response.
    pub fn put_object_headers() -> HashMap<String, String> {
        let mut headers = HashMap::new();
        headers.insert("etag".to_string(), "\"abc123\"".to_string());
        headers.insert(
            "x-amz-request-id".to_string(),
            "test-request-id".to_string(),
        );
        headers
    }
}
