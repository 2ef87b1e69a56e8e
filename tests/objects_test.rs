//! Integration tests for object operations through the client facade.

use std::sync::Arc;

use futures::StreamExt;
use s3_store::error::ErrorKind;
use s3_store::mocks::{MockResponse, MockSigner, MockTransport, TestFixtures};
use s3_store::services::{CopyConditions, CopyOptions, CopyOutcome, MetadataDirective};
use s3_store::{
    EncryptionContext, GetObjectOptions, ObjectLocator, ObjectSource, PutObjectOptions,
    StoreClient, StoreConfig, StoreError,
};

fn test_client(transport: Arc<MockTransport>) -> StoreClient {
    let mut config = StoreConfig::default();
    config.endpoint = Some(url::Url::parse("http://localhost:9000").unwrap());
    config.path_style = true;
    config.max_retries = 0;
    StoreClient::with_signer(Arc::new(config), transport, Arc::new(MockSigner::new()))
}

#[tokio::test]
async fn test_put_small_object_single_request() {
    let transport = Arc::new(MockTransport::with_responses(vec![
        MockResponse::ok().with_headers(TestFixtures::put_object_headers()),
    ]));
    let client = test_client(transport.clone());

    let locator = ObjectLocator::new("test-bucket", "hello.txt").unwrap();
    let info = client
        .put_object(
            &locator,
            ObjectSource::from_bytes(&b"hello world"[..]),
            &PutObjectOptions::new().with_content_type("text/plain"),
        )
        .await
        .unwrap();

    assert_eq!(info.size, 11);
    assert_eq!(info.e_tag.as_deref(), Some("\"abc123\""));
    assert_eq!(transport.request_count(), 1);

    let request = transport.last_request().unwrap();
    assert_eq!(request.method, "PUT");
    assert_eq!(request.body.as_deref(), Some(&b"hello world"[..]));
    assert_eq!(
        request.headers.get("content-type").map(String::as_str),
        Some("text/plain")
    );
}

#[tokio::test]
async fn test_get_object_full() {
    let transport = Arc::new(MockTransport::with_responses(vec![
        MockResponse::ok_with_body("file contents")
            .with_headers(TestFixtures::get_object_headers()),
    ]));
    let client = test_client(transport.clone());

    let locator = ObjectLocator::new("test-bucket", "file1.txt").unwrap();
    let (info, body) = client
        .get_object(&locator, &GetObjectOptions::new())
        .await
        .unwrap();

    assert_eq!(&body[..], b"file contents");
    assert_eq!(info.e_tag.as_deref(), Some("\"abc123\""));
    assert!(transport
        .last_request()
        .unwrap()
        .headers
        .get("range")
        .is_none());
}

#[tokio::test]
async fn test_get_object_with_range() {
    let transport = Arc::new(MockTransport::with_responses(vec![
        MockResponse::ok_with_body("cdefg"),
    ]));
    let client = test_client(transport.clone());

    let locator = ObjectLocator::new("test-bucket", "file1.txt").unwrap();
    let options = GetObjectOptions::new().with_range(2, 5);
    let (_, body) = client.get_object(&locator, &options).await.unwrap();

    assert_eq!(&body[..], b"cdefg");
    let request = transport.last_request().unwrap();
    assert_eq!(
        request.headers.get("range").map(String::as_str),
        Some("bytes=2-6")
    );
}

#[tokio::test]
async fn test_get_object_to_sink_streams_body() {
    let transport = Arc::new(MockTransport::with_responses(vec![
        MockResponse::ok_with_body("streamed body"),
    ]));
    let client = test_client(transport.clone());

    let locator = ObjectLocator::new("test-bucket", "file1.txt").unwrap();
    let (_, sink) = client
        .get_object_to_sink(&locator, &GetObjectOptions::new(), Vec::new())
        .await
        .unwrap();

    assert_eq!(sink, b"streamed body");
}

#[tokio::test]
async fn test_stat_object() {
    let transport = Arc::new(MockTransport::with_responses(vec![MockResponse::ok()
        .with_headers(TestFixtures::get_object_headers())]));
    let client = test_client(transport.clone());

    let locator = ObjectLocator::new("test-bucket", "file1.txt").unwrap();
    let info = client.stat_object(&locator).await.unwrap();

    assert_eq!(info.size, 1024);
    assert_eq!(info.content_type.as_deref(), Some("text/plain"));
    assert!(info.last_modified.is_some());
    assert_eq!(transport.last_request().unwrap().method, "HEAD");
}

#[tokio::test]
async fn test_stat_missing_object_is_not_found() {
    let transport = Arc::new(MockTransport::with_responses(vec![MockResponse::error(
        404,
        TestFixtures::error_xml("NoSuchKey", "The specified key does not exist."),
    )]));
    let client = test_client(transport);

    let locator = ObjectLocator::new("test-bucket", "missing.txt").unwrap();
    let error = client.stat_object(&locator).await.unwrap_err();
    assert_eq!(error.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn test_remove_object() {
    let transport = Arc::new(MockTransport::with_responses(vec![
        MockResponse::no_content(),
    ]));
    let client = test_client(transport.clone());

    let locator = ObjectLocator::new("test-bucket", "file1.txt").unwrap();
    client.remove_object(&locator).await.unwrap();
    assert_eq!(transport.last_request().unwrap().method, "DELETE");
}

#[tokio::test]
async fn test_remove_objects_reports_per_key_failures() {
    let body = r#"<?xml version="1.0" encoding="UTF-8"?>
<DeleteResult>
  <Deleted><Key>exists-1.txt</Key></Deleted>
  <Deleted><Key>exists-2.txt</Key></Deleted>
  <Error>
    <Key>locked.txt</Key>
    <Code>AccessDenied</Code>
    <Message>Access Denied</Message>
  </Error>
</DeleteResult>"#;
    let transport = Arc::new(MockTransport::with_responses(vec![
        MockResponse::ok_with_body(body),
    ]));
    let client = test_client(transport.clone());

    let keys = vec![
        "exists-1.txt".to_string(),
        "exists-2.txt".to_string(),
        "locked.txt".to_string(),
    ];
    let outcomes: Vec<_> = client
        .remove_objects("test-bucket", keys)
        .collect::<Vec<_>>()
        .await;

    assert_eq!(outcomes.len(), 3);
    let outcomes: Vec<_> = outcomes.into_iter().map(Result::unwrap).collect();
    assert_eq!(outcomes.iter().filter(|o| o.is_removed()).count(), 2);
    let failed = outcomes.iter().find(|o| !o.is_removed()).unwrap();
    assert_eq!(failed.key(), "locked.txt");

    // The batch request carries a Content-MD5 over its body.
    let request = transport.last_request().unwrap();
    assert_eq!(request.method, "POST");
    assert!(request.headers.contains_key("content-md5"));
}

#[tokio::test]
async fn test_copy_object_applied() {
    let body = r#"<?xml version="1.0" encoding="UTF-8"?>
<CopyObjectResult>
  <ETag>"new-etag"</ETag>
  <LastModified>2024-01-20T09:00:00.000Z</LastModified>
</CopyObjectResult>"#;
    let transport = Arc::new(MockTransport::with_responses(vec![
        MockResponse::ok_with_body(body),
    ]));
    let client = test_client(transport.clone());

    let source = ObjectLocator::new("test-bucket", "source.txt").unwrap();
    let dest = ObjectLocator::new("test-bucket", "copy.txt").unwrap();
    let options = CopyOptions {
        conditions: CopyConditions::new().with_match_etag("\"source-etag\""),
        ..Default::default()
    };

    let outcome = client.copy_object(&source, &dest, &options).await.unwrap();
    let CopyOutcome::Applied(info) = outcome else {
        panic!("expected applied copy");
    };
    assert_eq!(info.e_tag.as_deref(), Some("\"new-etag\""));

    let request = transport.last_request().unwrap();
    assert_eq!(
        request.headers.get("x-amz-copy-source").map(String::as_str),
        Some("/test-bucket/source.txt")
    );
    assert_eq!(
        request
            .headers
            .get("x-amz-copy-source-if-match")
            .map(String::as_str),
        Some("\"source-etag\"")
    );
}

#[tokio::test]
async fn test_copy_object_precondition_failed_is_an_outcome() {
    let transport = Arc::new(MockTransport::with_responses(vec![MockResponse::error(
        412,
        TestFixtures::error_xml("PreconditionFailed", "At least one precondition failed."),
    )]));
    let client = test_client(transport);

    let source = ObjectLocator::new("test-bucket", "source.txt").unwrap();
    let dest = ObjectLocator::new("test-bucket", "copy.txt").unwrap();
    let options = CopyOptions {
        conditions: CopyConditions::new().with_match_etag("\"wrong-etag\""),
        ..Default::default()
    };

    let outcome = client.copy_object(&source, &dest, &options).await.unwrap();
    match outcome {
        CopyOutcome::PreconditionFailed { code, .. } => {
            assert_eq!(code, "PreconditionFailed");
        }
        CopyOutcome::Applied(_) => panic!("copy must not apply"),
    }
}

#[tokio::test]
async fn test_copy_replace_metadata_directive() {
    let body = r#"<CopyObjectResult><ETag>"e"</ETag></CopyObjectResult>"#;
    let transport = Arc::new(MockTransport::with_responses(vec![
        MockResponse::ok_with_body(body),
    ]));
    let client = test_client(transport.clone());

    let source = ObjectLocator::new("test-bucket", "source.txt").unwrap();
    let dest = ObjectLocator::new("test-bucket", "copy.txt").unwrap();
    let mut options = CopyOptions {
        metadata_directive: MetadataDirective::Replace,
        content_type: Some("application/json".to_string()),
        ..Default::default()
    };
    options
        .user_metadata
        .insert("owner".to_string(), "alice".to_string());

    client.copy_object(&source, &dest, &options).await.unwrap();

    let request = transport.last_request().unwrap();
    assert_eq!(
        request
            .headers
            .get("x-amz-metadata-directive")
            .map(String::as_str),
        Some("REPLACE")
    );
    assert_eq!(
        request.headers.get("content-type").map(String::as_str),
        Some("application/json")
    );
    assert_eq!(
        request.headers.get("x-amz-meta-owner").map(String::as_str),
        Some("alice")
    );
}

#[tokio::test]
async fn test_encrypted_put_get_round_trip() {
    let transport = Arc::new(MockTransport::new());
    transport.queue_response(MockResponse::ok().with_header("etag", "\"enc\""));
    let client = test_client(transport.clone());

    let key = [42u8; 32];
    let plaintext: Vec<u8> = (0..4096u32).map(|i| (i % 251) as u8).collect();
    let locator = ObjectLocator::new("vault", "secret.bin").unwrap();

    let put_options =
        PutObjectOptions::new().with_encryption(EncryptionContext::symmetric(&key).unwrap());
    client
        .put_object(
            &locator,
            ObjectSource::from_bytes(plaintext.clone()),
            &put_options,
        )
        .await
        .unwrap();

    // The uploaded body is ciphertext, and the key material travels in
    // the object's user metadata headers.
    let upload = transport.last_request().unwrap();
    let ciphertext = upload.body.clone().unwrap();
    assert_ne!(&ciphertext[..], &plaintext[..]);
    let meta_headers: Vec<(String, String)> = upload
        .headers
        .iter()
        .filter(|(name, _)| name.starts_with("x-amz-meta-"))
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect();
    assert!(!meta_headers.is_empty());

    // Serve the stored ciphertext and metadata back, and expect the
    // original bytes out.
    let mut response = MockResponse::ok_with_body(ciphertext);
    for (name, value) in meta_headers {
        response = response.with_header(name, value);
    }
    transport.queue_response(response);

    let get_options =
        GetObjectOptions::new().with_encryption(EncryptionContext::symmetric(&key).unwrap());
    let (info, decrypted) = client.get_object(&locator, &get_options).await.unwrap();

    assert_eq!(&decrypted[..], &plaintext[..]);
    assert_eq!(info.size, plaintext.len() as u64);
}

#[tokio::test]
async fn test_encrypted_get_with_wrong_key_fails() {
    let transport = Arc::new(MockTransport::new());
    transport.queue_response(MockResponse::ok().with_header("etag", "\"enc\""));
    let client = test_client(transport.clone());

    let locator = ObjectLocator::new("vault", "secret.bin").unwrap();
    let put_options =
        PutObjectOptions::new().with_encryption(EncryptionContext::symmetric(&[1u8; 32]).unwrap());
    client
        .put_object(
            &locator,
            ObjectSource::from_bytes(&b"sensitive"[..]),
            &put_options,
        )
        .await
        .unwrap();

    let upload = transport.last_request().unwrap();
    let mut response = MockResponse::ok_with_body(upload.body.clone().unwrap());
    for (name, value) in &upload.headers {
        if name.starts_with("x-amz-meta-") {
            response = response.with_header(name.clone(), value.clone());
        }
    }
    transport.queue_response(response);

    let get_options =
        GetObjectOptions::new().with_encryption(EncryptionContext::symmetric(&[2u8; 32]).unwrap());
    let error = client.get_object(&locator, &get_options).await.unwrap_err();
    assert!(matches!(error, StoreError::Crypto(_)));
}
