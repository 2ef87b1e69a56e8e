//! Single-request object operations.
//!
//! Uploads and downloads that fit one HTTP request, object stat and
//! deletion, the batched delete endpoint, and single listing pages.
//! Multi-request flows build on these in the transfer and listing
//! modules.

use super::{
    build_url, content_md5, header, object_info_from_headers, parse_error, retry_policy,
    DEFAULT_CONTENT_TYPE,
};
use crate::config::StoreConfig;
use crate::error::{ObjectError, StoreError};
use crate::resilience::RetryPolicy;
use crate::signing::RequestSigner;
use crate::transport::{BodyStream, HttpRequest, HttpResponse, HttpTransport, StreamingResponse};
use crate::types::{DeleteOutcome, ListApiVersion, ListObjectsOptions, ListObjectsPage, ObjectInfo};
use crate::xml;
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Service for single-request object operations.
pub struct ObjectsService {
    config: Arc<StoreConfig>,
    transport: Arc<dyn HttpTransport>,
    signer: Arc<dyn RequestSigner>,
    retry: RetryPolicy,
}

impl ObjectsService {
    /// Create a new objects service.
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

    /// Upload an object in a single request.
    pub async fn put(
        &self,
        bucket: &str,
        key: &str,
        body: Bytes,
        content_type: Option<&str>,
        user_metadata: &HashMap<String, String>,
    ) -> Result<ObjectInfo, StoreError> {
        let url = build_url(&self.config, bucket, Some(key), &[]);
        let content_type = content_type.unwrap_or(DEFAULT_CONTENT_TYPE);
        let mut headers = HashMap::new();
        headers.insert("content-type".to_string(), content_type.to_string());
        headers.insert("content-length".to_string(), body.len().to_string());
        for (name, value) in user_metadata {
            headers.insert(format!("x-amz-meta-{}", name), value.clone());
        }
        let size = body.len() as u64;

        let response = self
            .retry
            .execute(|| async {
                let signed = self.signer.sign("PUT", &url, &headers, Some(&body)).await?;
                let request = HttpRequest::new(signed.method, signed.url.to_string())
                    .with_headers(signed.headers)
                    .with_body(body.clone());
                let response = self.transport.send(request).await?;
                if !response.is_success() {
                    return Err(parse_error(&response));
                }
                Ok(response)
            })
            .await?;

        debug!(bucket, key, size, "uploaded object");

        Ok(ObjectInfo {
            bucket: bucket.to_string(),
            key: key.to_string(),
            size,
            e_tag: response.etag().map(str::to_string),
            content_type: Some(content_type.to_string()),
            last_modified: None,
            version_id: response.get_header("x-amz-version-id").map(str::to_string),
            user_metadata: user_metadata.clone(),
            request_id: response.request_id().map(str::to_string),
        })
    }

    /// Download an object into memory.
    ///
    /// `range` is a raw `Range` header value when only a slice of the
    /// object is wanted.
    pub async fn get(
        &self,
        bucket: &str,
        key: &str,
        range: Option<&str>,
    ) -> Result<(ObjectInfo, Bytes), StoreError> {
        let url = build_url(&self.config, bucket, Some(key), &[]);
        let mut headers = HashMap::new();
        if let Some(range) = range {
            headers.insert("range".to_string(), range.to_string());
        }

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

        let info =
            object_info_from_headers(bucket, key, &response.headers, response.body.len() as u64);
        Ok((info, response.body))
    }

    /// Download an object as a stream of body chunks.
    pub async fn get_streaming(
        &self,
        bucket: &str,
        key: &str,
        range: Option<&str>,
    ) -> Result<(ObjectInfo, BodyStream), StoreError> {
        let url = build_url(&self.config, bucket, Some(key), &[]);
        let mut headers = HashMap::new();
        if let Some(range) = range {
            headers.insert("range".to_string(), range.to_string());
        }

        let response = self
            .retry
            .execute(|| async {
                let signed = self.signer.sign("GET", &url, &headers, None).await?;
                let request = HttpRequest::new(signed.method, signed.url.to_string())
                    .with_headers(signed.headers);
                let response = self.transport.send_download(request).await?;
                if !response.is_success() {
                    let status = response.status;
                    let response_headers = response.headers.clone();
                    let body = response.collect_body().await.unwrap_or_default();
                    return Err(parse_error(&HttpResponse {
                        status,
                        headers: response_headers,
                        body,
                    }));
                }
                Ok(response)
            })
            .await?;

        let StreamingResponse { headers, body, .. } = response;
        let size = header(&headers, "content-length")
            .and_then(|value| value.parse().ok())
            .unwrap_or(0);
        let info = object_info_from_headers(bucket, key, &headers, size);
        Ok((info, body))
    }

    /// Fetch object metadata without downloading the body.
    pub async fn head(&self, bucket: &str, key: &str) -> Result<ObjectInfo, StoreError> {
        let url = build_url(&self.config, bucket, Some(key), &[]);
        let headers = HashMap::new();

        let response = self
            .retry
            .execute(|| async {
                let signed = self.signer.sign("HEAD", &url, &headers, None).await?;
                let request = HttpRequest::new(signed.method, signed.url.to_string())
                    .with_headers(signed.headers);
                let response = self.transport.send(request).await?;
                if response.status == 404 {
                    // HEAD responses carry no error body to parse.
                    return Err(StoreError::Object(ObjectError::NotFound {
                        bucket: bucket.to_string(),
                        key: key.to_string(),
                        request_id: response.request_id().map(str::to_string),
                    }));
                }
                if !response.is_success() {
                    return Err(parse_error(&response));
                }
                Ok(response)
            })
            .await?;

        let size = response.content_length().unwrap_or(0);
        Ok(object_info_from_headers(
            bucket,
            key,
            &response.headers,
            size,
        ))
    }

    /// Delete a single object.
    ///
    /// Deleting a key that does not exist also succeeds.
    pub async fn delete(&self, bucket: &str, key: &str) -> Result<(), StoreError> {
        let url = build_url(&self.config, bucket, Some(key), &[]);
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

        debug!(bucket, key, "deleted object");
        Ok(())
    }

    /// Delete up to 1000 objects in a single request.
    ///
    /// Returns one outcome per key. Per-key failures are reported in the
    /// outcomes rather than failing the whole call. The request is sent
    /// once; transient failures are not replayed.
    pub async fn delete_batch(
        &self,
        bucket: &str,
        keys: &[String],
    ) -> Result<Vec<DeleteOutcome>, StoreError> {
        let body = Bytes::from(xml::build_delete_objects_xml(keys, false));
        let url = build_url(&self.config, bucket, None, &[("delete", String::new())]);
        let mut headers = HashMap::new();
        headers.insert("content-type".to_string(), "application/xml".to_string());
        headers.insert("content-md5".to_string(), content_md5(&body));
        headers.insert("content-length".to_string(), body.len().to_string());

        let signed = self.signer.sign("POST", &url, &headers, Some(&body)).await?;
        let request = HttpRequest::new(signed.method, signed.url.to_string())
            .with_headers(signed.headers)
            .with_body(body);
        let response = self.transport.send(request).await?;
        if !response.is_success() {
            return Err(parse_error(&response));
        }

        let outcomes = xml::parse_delete_result(&String::from_utf8_lossy(&response.body))?;
        debug!(
            bucket,
            requested = keys.len(),
            outcomes = outcomes.len(),
            "batch delete finished"
        );
        Ok(outcomes)
    }

    /// Fetch one page of a bucket listing.
    ///
    /// `token` is the continuation token (V2) or marker (V1) returned
    /// by the previous page.
    pub async fn list_page(
        &self,
        bucket: &str,
        options: &ListObjectsOptions,
        token: Option<&str>,
    ) -> Result<ListObjectsPage, StoreError> {
        let mut query: Vec<(&str, String)> = Vec::new();
        match options.api_version {
            ListApiVersion::V2 => {
                query.push(("list-type", "2".to_string()));
                if let Some(token) = token {
                    query.push(("continuation-token", token.to_string()));
                } else if let Some(start_after) = &options.start_after {
                    query.push(("start-after", start_after.clone()));
                }
            }
            ListApiVersion::V1 => {
                if let Some(marker) = token.or(options.start_after.as_deref()) {
                    query.push(("marker", marker.to_string()));
                }
            }
        }
        if let Some(prefix) = &options.prefix {
            query.push(("prefix", prefix.clone()));
        }
        if !options.recursive {
            query.push(("delimiter", "/".to_string()));
        }
        let max_keys = options.max_keys.unwrap_or(self.config.max_keys);
        query.push(("max-keys", max_keys.to_string()));

        let url = build_url(&self.config, bucket, None, &query);
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

        let mut page = xml::parse_list_objects(&String::from_utf8_lossy(&response.body))?;
        page.request_id = response.request_id().map(str::to_string);
        Ok(page)
    }
}

impl std::fmt::Debug for ObjectsService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectsService")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
