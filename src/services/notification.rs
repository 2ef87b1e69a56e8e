//! Bucket event notification configuration.

use super::{build_url, parse_error, retry_policy};
use crate::config::StoreConfig;
use crate::error::StoreError;
use crate::resilience::RetryPolicy;
use crate::signing::RequestSigner;
use crate::transport::{HttpRequest, HttpTransport};
use crate::types::NotificationConfig;
use crate::xml;
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Service for bucket notification configuration.
pub struct NotificationService {
    config: Arc<StoreConfig>,
    transport: Arc<dyn HttpTransport>,
    signer: Arc<dyn RequestSigner>,
    retry: RetryPolicy,
}

impl NotificationService {
    /// Create a new notification service.
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

    /// Fetch the notification configuration of a bucket.
    pub async fn get(&self, bucket: &str) -> Result<NotificationConfig, StoreError> {
        let url = build_url(
            &self.config,
            bucket,
            None,
            &[("notification", String::new())],
        );
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

        xml::parse_notification_config(&String::from_utf8_lossy(&response.body))
    }

    /// Replace the notification configuration of a bucket.
    pub async fn set(
        &self,
        bucket: &str,
        notification: &NotificationConfig,
    ) -> Result<(), StoreError> {
        let url = build_url(
            &self.config,
            bucket,
            None,
            &[("notification", String::new())],
        );
        let body = Bytes::from(xml::build_notification_xml(notification));
        let mut headers = HashMap::new();
        headers.insert("content-type".to_string(), "application/xml".to_string());
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

        debug!(
            bucket,
            topics = notification.topic_configs.len(),
            queues = notification.queue_configs.len(),
            "notification configuration set"
        );
        Ok(())
    }

    /// Remove all notification rules from a bucket.
    ///
    /// Implemented as setting an empty configuration, which the service
    /// treats as clearing every subscription.
    pub async fn remove(&self, bucket: &str) -> Result<(), StoreError> {
        self.set(bucket, &NotificationConfig::new()).await
    }
}

impl std::fmt::Debug for NotificationService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationService")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
