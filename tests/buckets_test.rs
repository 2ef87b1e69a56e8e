//! Integration tests for bucket, policy, and notification management
//! through the client facade.

use std::sync::Arc;

use s3_store::error::ErrorKind;
use s3_store::mocks::{MockResponse, MockSigner, MockTransport, TestFixtures};
use s3_store::types::{NotificationConfig, TopicConfig};
use s3_store::{StoreClient, StoreConfig};
use tokio_test::assert_ok;

fn test_client(transport: Arc<MockTransport>) -> StoreClient {
    let mut config = StoreConfig::default();
    config.endpoint = Some(url::Url::parse("http://localhost:9000").unwrap());
    config.path_style = true;
    config.max_retries = 0;
    StoreClient::with_signer(Arc::new(config), transport, Arc::new(MockSigner::new()))
}

#[tokio::test]
async fn test_make_bucket_default_region_has_no_body() {
    let transport = Arc::new(MockTransport::with_responses(vec![MockResponse::ok()]));
    let client = test_client(transport.clone());

    assert_ok!(client.make_bucket("new-bucket", None).await);

    let request = transport.last_request().unwrap();
    assert_eq!(request.method, "PUT");
    assert!(request.body.as_ref().map_or(true, |b| b.is_empty()));
}

#[tokio::test]
async fn test_make_bucket_with_region_sends_location_constraint() {
    let transport = Arc::new(MockTransport::with_responses(vec![MockResponse::ok()]));
    let client = test_client(transport.clone());

    client
        .make_bucket("eu-bucket", Some("eu-west-1"))
        .await
        .unwrap();

    let body = transport.last_request().unwrap().body.unwrap();
    let body = String::from_utf8_lossy(&body).to_string();
    assert!(body.contains("<LocationConstraint>eu-west-1</LocationConstraint>"));
}

#[tokio::test]
async fn test_make_bucket_accepts_names_with_periods() {
    let transport = Arc::new(MockTransport::with_responses(vec![MockResponse::ok()]));
    let client = test_client(transport);

    assert_ok!(client.make_bucket("my.dotted.bucket", None).await);
}

#[tokio::test]
async fn test_bucket_exists() {
    let transport = Arc::new(MockTransport::with_responses(vec![
        MockResponse::ok(),
        MockResponse::error(404, ""),
    ]));
    let client = test_client(transport);

    assert!(client.bucket_exists("present").await.unwrap());
    assert!(!client.bucket_exists("absent").await.unwrap());
}

#[tokio::test]
async fn test_remove_bucket() {
    let transport = Arc::new(MockTransport::with_responses(vec![
        MockResponse::no_content(),
    ]));
    let client = test_client(transport.clone());

    client.remove_bucket("old-bucket").await.unwrap();
    assert_eq!(transport.last_request().unwrap().method, "DELETE");
}

#[tokio::test]
async fn test_remove_nonempty_bucket_surfaces_service_code() {
    let transport = Arc::new(MockTransport::with_responses(vec![MockResponse::error(
        409,
        TestFixtures::error_xml("BucketNotEmpty", "The bucket you tried to delete is not empty"),
    )]));
    let client = test_client(transport);

    let error = client.remove_bucket("full-bucket").await.unwrap_err();
    assert_eq!(error.service_code(), Some("BucketNotEmpty"));
}

#[tokio::test]
async fn test_list_buckets() {
    let body = r#"<?xml version="1.0" encoding="UTF-8"?>
<ListAllMyBucketsResult>
  <Owner><ID>owner-id</ID><DisplayName>owner</DisplayName></Owner>
  <Buckets>
    <Bucket><Name>alpha</Name><CreationDate>2024-01-01T00:00:00.000Z</CreationDate></Bucket>
    <Bucket><Name>beta</Name><CreationDate>2024-02-01T00:00:00.000Z</CreationDate></Bucket>
  </Buckets>
</ListAllMyBucketsResult>"#;
    let transport = Arc::new(MockTransport::with_responses(vec![
        MockResponse::ok_with_body(body),
    ]));
    let client = test_client(transport);

    let buckets = client.list_buckets().await.unwrap();
    assert_eq!(buckets.len(), 2);
    assert_eq!(buckets[0].name, "alpha");
    assert_eq!(buckets[1].name, "beta");
}

#[tokio::test]
async fn test_bucket_policy_round_trip() {
    let policy = r#"{"Version":"2012-10-17","Statement":[]}"#;
    let transport = Arc::new(MockTransport::with_responses(vec![
        MockResponse::no_content(),
        MockResponse::ok_with_body(policy),
        MockResponse::no_content(),
    ]));
    let client = test_client(transport.clone());

    client.set_bucket_policy("files", policy).await.unwrap();
    let fetched = client.get_bucket_policy("files").await.unwrap();
    assert_eq!(fetched, policy);
    client.delete_bucket_policy("files").await.unwrap();

    let requests = transport.requests();
    assert_eq!(requests.len(), 3);
    assert!(requests.iter().all(|r| r.url.contains("policy")));
    assert_eq!(requests[0].method, "PUT");
    assert_eq!(requests[2].method, "DELETE");
}

#[tokio::test]
async fn test_get_bucket_policy_absent_yields_empty_string() {
    let transport = Arc::new(MockTransport::with_responses(vec![MockResponse::error(
        404,
        TestFixtures::error_xml("NoSuchBucketPolicy", "The bucket policy does not exist"),
    )]));
    let client = test_client(transport);

    let policy = client.get_bucket_policy("files").await.unwrap();
    assert!(policy.is_empty());
}

#[tokio::test]
async fn test_set_bucket_notification() {
    let transport = Arc::new(MockTransport::with_responses(vec![
        MockResponse::ok(),
    ]));
    let client = test_client(transport.clone());

    let notification = NotificationConfig::new().with_topic(
        TopicConfig::new("arn:aws:sns:us-east-1:1234:uploads")
            .with_event("s3:ObjectCreated:Put")
            .with_prefix_filter("incoming/"),
    );
    client
        .set_bucket_notification("files", &notification)
        .await
        .unwrap();

    let request = transport.last_request().unwrap();
    assert!(request.url.contains("notification"));
    let body = String::from_utf8_lossy(request.body.as_ref().unwrap()).to_string();
    assert!(body.contains("<Topic>arn:aws:sns:us-east-1:1234:uploads</Topic>"));
    assert!(body.contains("<Event>s3:ObjectCreated:Put</Event>"));
    assert!(body.contains("incoming/"));
}

#[tokio::test]
async fn test_get_bucket_notification() {
    let body = r#"<?xml version="1.0" encoding="UTF-8"?>
<NotificationConfiguration>
  <TopicConfiguration>
    <Id>rule-1</Id>
    <Topic>arn:aws:sns:us-east-1:1234:uploads</Topic>
    <Event>s3:ObjectCreated:*</Event>
  </TopicConfiguration>
</NotificationConfiguration>"#;
    let transport = Arc::new(MockTransport::with_responses(vec![
        MockResponse::ok_with_body(body),
    ]));
    let client = test_client(transport);

    let config = client.get_bucket_notification("files").await.unwrap();
    assert_eq!(config.topic_configs.len(), 1);
    assert_eq!(
        config.topic_configs[0].topic_arn,
        "arn:aws:sns:us-east-1:1234:uploads"
    );
    assert_eq!(config.topic_configs[0].events, vec!["s3:ObjectCreated:*"]);
}

#[tokio::test]
async fn test_remove_bucket_notification_sends_empty_configuration() {
    let transport = Arc::new(MockTransport::with_responses(vec![
        MockResponse::ok(),
    ]));
    let client = test_client(transport.clone());

    client.remove_bucket_notification("files").await.unwrap();

    let request = transport.last_request().unwrap();
    assert_eq!(request.method, "PUT");
    let body = String::from_utf8_lossy(request.body.as_ref().unwrap()).to_string();
    assert!(body.contains("<NotificationConfiguration"));
    assert!(!body.contains("TopicConfiguration"));
    assert!(!body.contains("QueueConfiguration"));
}

#[tokio::test]
async fn test_invalid_bucket_names_rejected_locally() {
    let transport = Arc::new(MockTransport::new());
    let client = test_client(transport.clone());

    for name in ["ab", "UPPER", "trailing.", ".leading", "has_underscore"] {
        let error = client.bucket_exists(name).await.unwrap_err();
        assert_eq!(error.kind(), ErrorKind::InvalidArgument, "{}", name);
    }
    assert_eq!(transport.request_count(), 0);
}
