//! Multipart upload wire operations.
//!
//! Thin request/response layer over the multipart endpoints: session
//! create and abort, part upload, completion, and the part and session
//! listings. Sizing, concurrency, and resume decisions live in the
//! transfer engine, which drives these calls.

use super::{build_url, content_md5, parse_error, retry_policy, DEFAULT_CONTENT_TYPE};
use crate::config::StoreConfig;
use crate::error::{MultipartError, ResponseError, StoreError};
use crate::resilience::RetryPolicy;
use crate::signing::RequestSigner;
use crate::transport::{HttpRequest, HttpTransport};
use crate::types::{
    CompletedPart, CompletedUpload, CreatedUpload, ListPartsPage, ListUploadsPage, PartInfo,
};
use crate::xml;
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Service for multipart upload wire operations.
pub struct MultipartService {
    config: Arc<StoreConfig>,
    transport: Arc<dyn HttpTransport>,
    signer: Arc<dyn RequestSigner>,
    retry: RetryPolicy,
}

impl MultipartService {
    /// Create a new multipart service.
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

    /// Start a multipart upload session.
    ///
    /// The content type and user metadata are fixed here and apply to
    /// the assembled object. The request is sent once.
    pub async fn initiate(
        &self,
        bucket: &str,
        key: &str,
        content_type: Option<&str>,
        user_metadata: &HashMap<String, String>,
    ) -> Result<CreatedUpload, StoreError> {
        let url = build_url(
            &self.config,
            bucket,
            Some(key),
            &[("uploads", String::new())],
        );
        let mut headers = HashMap::new();
        headers.insert(
            "content-type".to_string(),
            content_type.unwrap_or(DEFAULT_CONTENT_TYPE).to_string(),
        );
        for (name, value) in user_metadata {
            headers.insert(format!("x-amz-meta-{}", name), value.clone());
        }

        let signed = self.signer.sign("POST", &url, &headers, None).await?;
        let request =
            HttpRequest::new(signed.method, signed.url.to_string()).with_headers(signed.headers);
        let response = self.transport.send(request).await?;
        if !response.is_success() {
            return Err(parse_error(&response));
        }

        let mut created =
            xml::parse_create_multipart_upload(&String::from_utf8_lossy(&response.body))?;
        created.request_id = response.request_id().map(str::to_string);
        debug!(bucket, key, upload_id = %created.upload_id, "multipart upload created");
        Ok(created)
    }

    /// Upload one part.
    ///
    /// Transient failures are retried. The returned ETag is required
    /// for completion.
    pub async fn upload_part(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        part_number: u32,
        body: Bytes,
    ) -> Result<PartInfo, StoreError> {
        let query = [
            ("partNumber", part_number.to_string()),
            ("uploadId", upload_id.to_string()),
        ];
        let url = build_url(&self.config, bucket, Some(key), &query);
        let mut headers = HashMap::new();
        headers.insert("content-length".to_string(), body.len().to_string());
        headers.insert("content-md5".to_string(), content_md5(&body));
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

        let e_tag = response
            .etag()
            .ok_or_else(|| {
                StoreError::Response(ResponseError::InvalidResponse {
                    message: format!("part {} response carried no ETag", part_number),
                })
            })?
            .to_string();

        debug!(bucket, key, part_number, size, "part uploaded");

        Ok(PartInfo {
            part_number,
            e_tag,
            size: Some(size),
            last_modified: None,
        })
    }

    /// Complete a multipart upload from the part manifest.
    ///
    /// Parts must be sorted by part number. The request is sent once;
    /// a 200 response can still carry an error document, which surfaces
    /// as the mapped error.
    pub async fn complete(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        parts: &[CompletedPart],
    ) -> Result<CompletedUpload, StoreError> {
        let body = Bytes::from(xml::build_complete_multipart_xml(parts));
        let url = build_url(
            &self.config,
            bucket,
            Some(key),
            &[("uploadId", upload_id.to_string())],
        );
        let mut headers = HashMap::new();
        headers.insert("content-type".to_string(), "application/xml".to_string());
        headers.insert("content-length".to_string(), body.len().to_string());

        let signed = self.signer.sign("POST", &url, &headers, Some(&body)).await?;
        let request = HttpRequest::new(signed.method, signed.url.to_string())
            .with_headers(signed.headers)
            .with_body(body);
        let response = self.transport.send(request).await?;
        if !response.is_success() {
            return Err(parse_error(&response));
        }

        let mut completed =
            xml::parse_complete_multipart_upload(&String::from_utf8_lossy(&response.body))?;
        completed.request_id = response.request_id().map(str::to_string);
        debug!(
            bucket,
            key,
            upload_id,
            parts = parts.len(),
            "multipart upload completed"
        );
        Ok(completed)
    }

    /// Abort a multipart upload and discard its stored parts.
    ///
    /// A session that is already gone reports success, so aborting
    /// concurrently or after completion is safe.
    pub async fn abort(&self, bucket: &str, key: &str, upload_id: &str) -> Result<(), StoreError> {
        let url = build_url(
            &self.config,
            bucket,
            Some(key),
            &[("uploadId", upload_id.to_string())],
        );
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
            Ok(()) => {
                debug!(bucket, key, upload_id, "multipart upload aborted");
                Ok(())
            }
            Err(StoreError::Multipart(MultipartError::UploadNotFound { .. })) => Ok(()),
            Err(error) => Err(error),
        }
    }

    /// Fetch one page of stored parts for a session.
    pub async fn list_parts(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        part_number_marker: Option<u32>,
        max_parts: Option<u32>,
    ) -> Result<ListPartsPage, StoreError> {
        let mut query = vec![("uploadId", upload_id.to_string())];
        if let Some(marker) = part_number_marker {
            query.push(("part-number-marker", marker.to_string()));
        }
        if let Some(max) = max_parts {
            query.push(("max-parts", max.to_string()));
        }
        let url = build_url(&self.config, bucket, Some(key), &query);
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

        let mut page = xml::parse_list_parts(&String::from_utf8_lossy(&response.body))?;
        page.request_id = response.request_id().map(str::to_string);
        Ok(page)
    }

    /// Fetch one page of in-progress multipart uploads in a bucket.
    pub async fn list_uploads(
        &self,
        bucket: &str,
        prefix: Option<&str>,
        delimiter: Option<&str>,
        key_marker: Option<&str>,
        upload_id_marker: Option<&str>,
        max_uploads: Option<u32>,
    ) -> Result<ListUploadsPage, StoreError> {
        let mut query = vec![("uploads", String::new())];
        if let Some(prefix) = prefix {
            query.push(("prefix", prefix.to_string()));
        }
        if let Some(delimiter) = delimiter {
            query.push(("delimiter", delimiter.to_string()));
        }
        if let Some(marker) = key_marker {
            query.push(("key-marker", marker.to_string()));
        }
        if let Some(marker) = upload_id_marker {
            query.push(("upload-id-marker", marker.to_string()));
        }
        if let Some(max) = max_uploads {
            query.push(("max-uploads", max.to_string()));
        }
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

        let mut page = xml::parse_list_multipart_uploads(&String::from_utf8_lossy(&response.body))?;
        page.request_id = response.request_id().map(str::to_string);
        Ok(page)
    }
}

impl std::fmt::Debug for MultipartService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MultipartService")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
