//! Bucket-level operations.
//!
//! Bucket lifecycle, existence checks, the account-level bucket
//! listing, and bucket policy management.

use super::{build_url, parse_error, retry_policy, root_url};
use crate::config::StoreConfig;
use crate::error::{BucketError, StoreError};
use crate::resilience::RetryPolicy;
use crate::signing::RequestSigner;
use crate::transport::{HttpRequest, HttpTransport};
use crate::types::BucketInfo;
use crate::xml;
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Service for bucket-level operations.
pub struct BucketsService {
    config: Arc<StoreConfig>,
    transport: Arc<dyn HttpTransport>,
    signer: Arc<dyn RequestSigner>,
    retry: RetryPolicy,
}

impl BucketsService {
    /// Create a new buckets service.
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

    /// Create a bucket.
    ///
    /// `region` overrides the client region for this bucket. Outside
    /// `us-east-1` the request carries a location constraint document.
    /// The request is sent once.
    pub async fn create(&self, bucket: &str, region: Option<&str>) -> Result<(), StoreError> {
        let effective_region = region.unwrap_or(&self.config.region);
        let body = if effective_region == "us-east-1" {
            Bytes::new()
        } else {
            Bytes::from(xml::build_create_bucket_xml(effective_region))
        };
        let url = build_url(&self.config, bucket, None, &[]);
        let mut headers = HashMap::new();
        if !body.is_empty() {
            headers.insert("content-type".to_string(), "application/xml".to_string());
            headers.insert("content-length".to_string(), body.len().to_string());
        }

        let body_arg = if body.is_empty() {
            None
        } else {
            Some(body.as_ref())
        };
        let signed = self.signer.sign("PUT", &url, &headers, body_arg).await?;
        let mut request =
            HttpRequest::new(signed.method, signed.url.to_string()).with_headers(signed.headers);
        if !body.is_empty() {
            request = request.with_body(body.clone());
        }
        let response = self.transport.send(request).await?;
        if !response.is_success() {
            return Err(parse_error(&response));
        }

        debug!(bucket, region = effective_region, "bucket created");
        Ok(())
    }

    /// Delete a bucket. The bucket must be empty.
    pub async fn delete(&self, bucket: &str) -> Result<(), StoreError> {
        let url = build_url(&self.config, bucket, None, &[]);
        let headers = HashMap::new();

        self.retry
            .execute(|| async {
                let signed = self.signer.sign("DELETE", &url, &headers, None).await?;
                let request = HttpRequest::new(signed.method, signed.url.to_string())
                    .with_headers(signed.headers);
                let response = self.transport.send(request).await?;
                if !response.is_success() {
                    return Err(parse_error(&response));
                }
                Ok(())
            })
            .await?;

        debug!(bucket, "bucket deleted");
        Ok(())
    }

    /// Check whether a bucket exists.
    pub async fn exists(&self, bucket: &str) -> Result<bool, StoreError> {
        let url = build_url(&self.config, bucket, None, &[]);
        let headers = HashMap::new();

        self.retry
            .execute(|| async {
                let signed = self.signer.sign("HEAD", &url, &headers, None).await?;
                let request = HttpRequest::new(signed.method, signed.url.to_string())
                    .with_headers(signed.headers);
                let response = self.transport.send(request).await?;
                if response.status == 404 {
                    return Ok(false);
                }
                if !response.is_success() {
                    return Err(parse_error(&response));
                }
                Ok(true)
            })
            .await
    }

    /// List all buckets owned by the caller.
    pub async fn list(&self) -> Result<Vec<BucketInfo>, StoreError> {
        let url = root_url(&self.config);
        let headers = HashMap::new();

        let response = self
            .retry
            .execute(|| async {
                let signed = self.signer.sign("GET", &url, &headers, None).await?;
                let request = HttpRequest::new(signed.method, signed.url.to_string())
                    .with_headers(signed.headers);
                let response = self.transport.send(request).await?;
                if !response.is_success() {
                    return Err(parse_error(&response));
                }
                Ok(response)
            })
            .await?;

        xml::parse_list_buckets(&String::from_utf8_lossy(&response.body))
    }

    /// Fetch the bucket policy document as JSON.
    ///
    /// A bucket without a policy yields an empty string.
    pub async fn get_policy(&self, bucket: &str) -> Result<String, StoreError> {
        let url = build_url(&self.config, bucket, None, &[("policy", String::new())]);
        let headers = HashMap::new();

        let result = self
            .retry
            .execute(|| async {
                let signed = self.signer.sign("GET", &url, &headers, None).await?;
                let request = HttpRequest::new(signed.method, signed.url.to_string())
                    .with_headers(signed.headers);
                let response = self.transport.send(request).await?;
                if !response.is_success() {
                    return Err(parse_error(&response));
                }
                Ok(response)
            })
            .await;

        match result {
            Ok(response) => Ok(String::from_utf8_lossy(&response.body).into_owned()),
            Err(StoreError::Bucket(BucketError::NoSuchPolicy { .. })) => Ok(String::new()),
            Err(error) => Err(error),
        }
    }

    /// Replace the bucket policy with the given JSON document.
    pub async fn set_policy(&self, bucket: &str, policy: &str) -> Result<(), StoreError> {
        let url = build_url(&self.config, bucket, None, &[("policy", String::new())]);
        let body = Bytes::from(policy.to_string());
        let mut headers = HashMap::new();
        headers.insert("content-type".to_string(), "application/json".to_string());
        headers.insert("content-length".to_string(), body.len().to_string());

        self.retry
            .execute(|| async {
                let signed = self.signer.sign("PUT", &url, &headers, Some(&body)).await?;
                let request = HttpRequest::new(signed.method, signed.url.to_string())
                    .with_headers(signed.headers)
                    .with_body(body.clone());
                let response = self.transport.send(request).await?;
                if !response.is_success() {
                    return Err(parse_error(&response));
                }
                Ok(())
            })
            .await?;

        debug!(bucket, "bucket policy set");
        Ok(())
    }

    /// Delete the bucket policy. Succeeds when no policy is set.
    pub async fn delete_policy(&self, bucket: &str) -> Result<(), StoreError> {
        let url = build_url(&self.config, bucket, None, &[("policy", String::new())]);
        let headers = HashMap::new();

        let result = self
            .retry
            .execute(|| async {
                let signed = self.signer.sign("DELETE", &url, &headers, None).await?;
                let request = HttpRequest::new(signed.method, signed.url.to_string())
                    .with_headers(signed.headers);
                let response = self.transport.send(request).await?;
                if !response.is_success() {
                    return Err(parse_error(&response));
                }
                Ok(())
            })
            .await;

        match result {
            Ok(()) | Err(StoreError::Bucket(BucketError::NoSuchPolicy { .. })) => Ok(()),
            Err(error) => Err(error),
        }
    }
}

impl std::fmt::Debug for BucketsService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BucketsService")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
