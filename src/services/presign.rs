//! Presigned URL and POST-policy generation.
//!
//! Presigning is purely local: the signer embeds the authorization data in
//! the URL query (or form fields), so no request is sent here. The returned
//! artifacts can be handed to clients that hold no credentials.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::config::StoreConfig;
use crate::error::StoreError;
use crate::signing::RequestSigner;
use crate::types::{PostPolicy, PostPolicyForm, PresignedUrl};

use super::build_url;

/// Generates presigned URLs and browser-upload forms.
pub struct PresignService {
    config: Arc<StoreConfig>,
    signer: Arc<dyn RequestSigner>,
}

impl PresignService {
    /// Creates a presign service over the shared signer.
    pub fn new(config: Arc<StoreConfig>, signer: Arc<dyn RequestSigner>) -> Self {
        Self { config, signer }
    }

    /// Produces a presigned GET URL for an object.
    ///
    /// `query_overrides` are appended to the URL before signing and become
    /// part of the signed query string. They are typically response-header
    /// overrides such as `response-content-type` or
    /// `response-content-disposition`.
    pub async fn presigned_get(
        &self,
        bucket: &str,
        key: &str,
        expires_in: Duration,
        query_overrides: Option<&HashMap<String, String>>,
    ) -> Result<PresignedUrl, StoreError> {
        let mut url = build_url(&self.config, bucket, Some(key), &[]);
        if let Some(overrides) = query_overrides {
            if !overrides.is_empty() {
                let mut pairs = url.query_pairs_mut();
                for (name, value) in overrides {
                    pairs.append_pair(name, value);
                }
            }
        }
        self.signer.presign("GET", &url, expires_in, None).await
    }

    /// Produces a presigned PUT URL for uploading an object.
    pub async fn presigned_put(
        &self,
        bucket: &str,
        key: &str,
        expires_in: Duration,
    ) -> Result<PresignedUrl, StoreError> {
        let url = build_url(&self.config, bucket, Some(key), &[]);
        self.signer.presign("PUT", &url, expires_in, None).await
    }

    /// Produces the form fields for a browser-based POST upload.
    ///
    /// The returned form targets the bucket URL; the uploaded key comes from
    /// the policy's key condition (exact or prefix).
    pub async fn presigned_post(
        &self,
        policy: &PostPolicy,
    ) -> Result<PostPolicyForm, StoreError> {
        let url = build_url(&self.config, &policy.bucket, None, &[]);
        self.signer.presign_post(&url, policy).await
    }
}

impl std::fmt::Debug for PresignService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PresignService")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::MockSigner;

    fn test_service() -> (PresignService, Arc<MockSigner>) {
        let mut config = StoreConfig::default();
        config.endpoint = Some(url::Url::parse("http://localhost:9000").unwrap());
        config.path_style = true;
        let signer = Arc::new(MockSigner::new());
        let service = PresignService::new(Arc::new(config), signer.clone());
        (service, signer)
    }

    #[tokio::test]
    async fn presigned_get_signs_object_url() {
        let (service, signer) = test_service();

        let presigned = service
            .presigned_get(
                "my-bucket",
                "reports/q1.pdf",
                Duration::from_secs(900),
                None,
            )
            .await
            .unwrap();

        assert!(presigned.url.contains("/my-bucket/reports/q1.pdf"));
        assert!(presigned.url.contains("X-Amz-Signature="));
        assert_eq!(presigned.method, "GET");
        assert_eq!(signer.presign_count(), 1);
    }

    #[tokio::test]
    async fn presigned_get_appends_query_overrides() {
        let (service, _signer) = test_service();

        let mut overrides = HashMap::new();
        overrides.insert(
            "response-content-type".to_string(),
            "application/pdf".to_string(),
        );

        let presigned = service
            .presigned_get(
                "my-bucket",
                "reports/q1.pdf",
                Duration::from_secs(900),
                Some(&overrides),
            )
            .await
            .unwrap();

        assert!(presigned
            .url
            .contains("response-content-type=application%2Fpdf"));
    }

    #[tokio::test]
    async fn presigned_put_signs_with_put_method() {
        let (service, signer) = test_service();

        let presigned = service
            .presigned_put("my-bucket", "upload.bin", Duration::from_secs(3600))
            .await
            .unwrap();

        assert!(presigned.url.contains("/my-bucket/upload.bin"));
        assert_eq!(presigned.method, "PUT");
        assert_eq!(signer.presign_count(), 1);
    }

    #[tokio::test]
    async fn presigned_post_targets_bucket_url() {
        let (service, _signer) = test_service();

        let policy = PostPolicy::new(
            "my-bucket",
            chrono::Utc::now() + chrono::Duration::hours(1),
        )
        .with_key("incoming/data.csv");

        let form = service.presigned_post(&policy).await.unwrap();

        assert!(form.url.contains("/my-bucket"));
        assert!(!form.fields.is_empty());
    }
}
