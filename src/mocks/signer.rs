//! Mock request signer for tests.

use crate::error::StoreError;
use crate::signing::{RequestSigner, SignedRequest};
use crate::types::{PostPolicy, PostPolicyForm, PresignedUrl};
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use url::Url;

/// Recorded sign request.
#[derive(Debug, Clone)]
pub struct SignRequest {
    /// HTTP method.
    pub method: String,
    /// Request URL.
    pub url: Url,
    /// Headers passed in for signing.
    pub headers: HashMap<String, String>,
    /// Whether a body was present.
    pub has_body: bool,
}

/// Mock signer that stamps fixed headers instead of computing signatures.
pub struct MockSigner {
    /// Headers to add when signing.
    headers: Mutex<HashMap<String, String>>,
    /// Error to return.
    error: Mutex<Option<StoreError>>,
    /// Number of sign calls.
    sign_count: AtomicUsize,
    /// Number of presign calls.
    presign_count: AtomicUsize,
    /// Recorded sign requests.
    sign_requests: Mutex<Vec<SignRequest>>,
}

impl MockSigner {
    /// Create a new mock signer.
    pub fn new() -> Self {
        let mut default_headers = HashMap::new();
        default_headers.insert(
            "authorization".to_string(),
            "AWS4-HMAC-SHA256 Credential=mock/signing".to_string(),
        );
        default_headers.insert("x-amz-date".to_string(), "20240115T100000Z".to_string());
        default_headers.insert(
            "x-amz-content-sha256".to_string(),
            "UNSIGNED-PAYLOAD".to_string(),
        );

        Self {
            headers: Mutex::new(default_headers),
            error: Mutex::new(None),
            sign_count: AtomicUsize::new(0),
            presign_count: AtomicUsize::new(0),
            sign_requests: Mutex::new(Vec::new()),
        }
    }

    /// Create a mock signer that returns an error.
    pub fn with_error(error: StoreError) -> Self {
        Self {
            headers: Mutex::new(HashMap::new()),
            error: Mutex::new(Some(error)),
            sign_count: AtomicUsize::new(0),
            presign_count: AtomicUsize::new(0),
            sign_requests: Mutex::new(Vec::new()),
        }
    }

    /// Set custom headers to add when signing.
    pub fn set_headers(&self, headers: HashMap<String, String>) {
        *self.headers.lock().unwrap() = headers;
    }

    /// Set an error to return on the next call.
    pub fn set_error(&self, error: Option<StoreError>) {
        *self.error.lock().unwrap() = error;
    }

    /// Get the number of sign calls.
    pub fn sign_count(&self) -> usize {
        self.sign_count.load(Ordering::Relaxed)
    }

    /// Get the number of presign calls.
    pub fn presign_count(&self) -> usize {
        self.presign_count.load(Ordering::Relaxed)
    }

    /// Get recorded sign requests.
    pub fn sign_requests(&self) -> Vec<SignRequest> {
        self.sign_requests.lock().unwrap().clone()
    }

    /// Get the last sign request.
    pub fn last_sign_request(&self) -> Option<SignRequest> {
        self.sign_requests.lock().unwrap().last().cloned()
    }

    /// Clear recorded requests and counters.
    pub fn clear_requests(&self) {
        self.sign_requests.lock().unwrap().clear();
        self.sign_count.store(0, Ordering::Relaxed);
        self.presign_count.store(0, Ordering::Relaxed);
    }
}

impl Default for MockSigner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RequestSigner for MockSigner {
    async fn sign(
        &self,
        method: &str,
        url: &Url,
        headers: &HashMap<String, String>,
        body: Option<&[u8]>,
    ) -> Result<SignedRequest, StoreError> {
        self.sign_count.fetch_add(1, Ordering::Relaxed);

        self.sign_requests.lock().unwrap().push(SignRequest {
            method: method.to_string(),
            url: url.clone(),
            headers: headers.clone(),
            has_body: body.is_some(),
        });

        if let Some(error) = self.error.lock().unwrap().take() {
            return Err(error);
        }

        let mut signed_headers = headers.clone();
        signed_headers.extend(self.headers.lock().unwrap().clone());

        Ok(SignedRequest {
            method: method.to_string(),
            url: url.clone(),
            headers: signed_headers,
            body: body.map(Bytes::copy_from_slice),
        })
    }

    async fn presign(
        &self,
        method: &str,
        url: &Url,
        expires_in: Duration,
        headers: Option<&HashMap<String, String>>,
    ) -> Result<PresignedUrl, StoreError> {
        self.presign_count.fetch_add(1, Ordering::Relaxed);

        if let Some(error) = self.error.lock().unwrap().take() {
            return Err(error);
        }

        let mut presigned = url.clone();
        presigned
            .query_pairs_mut()
            .append_pair("X-Amz-Algorithm", "AWS4-HMAC-SHA256")
            .append_pair("X-Amz-Credential", "MOCK/20240115/us-east-1/s3/aws4_request")
            .append_pair("X-Amz-Date", "20240115T100000Z")
            .append_pair("X-Amz-Expires", &expires_in.as_secs().to_string())
            .append_pair("X-Amz-SignedHeaders", "host")
            .append_pair("X-Amz-Signature", "mock-signature");

        Ok(PresignedUrl {
            url: presigned.to_string(),
            method: method.to_string(),
            expires_at: chrono::Utc::now()
                + chrono::Duration::from_std(expires_in).unwrap_or_default(),
            signed_headers: headers.cloned().unwrap_or_default(),
        })
    }

    async fn presign_post(
        &self,
        url: &Url,
        policy: &PostPolicy,
    ) -> Result<PostPolicyForm, StoreError> {
        self.presign_count.fetch_add(1, Ordering::Relaxed);

        if let Some(error) = self.error.lock().unwrap().take() {
            return Err(error);
        }

        let mut fields = HashMap::new();
        if let Some(key) = &policy.key {
            fields.insert("key".to_string(), key.clone());
        } else if let Some(prefix) = &policy.key_starts_with {
            fields.insert("key".to_string(), format!("{}${{filename}}", prefix));
        }
        fields.insert(
            "x-amz-algorithm".to_string(),
            "AWS4-HMAC-SHA256".to_string(),
        );
        fields.insert(
            "x-amz-credential".to_string(),
            "MOCK/20240115/us-east-1/s3/aws4_request".to_string(),
        );
        fields.insert("x-amz-date".to_string(), "20240115T100000Z".to_string());
        fields.insert("policy".to_string(), "mock-policy-document".to_string());
        fields.insert("x-amz-signature".to_string(), "mock-signature".to_string());

        Ok(PostPolicyForm {
            url: url.to_string(),
            fields,
            expires_at: policy.expiration,
        })
    }
}

impl std::fmt::Debug for MockSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockSigner")
            .field("sign_count", &self.sign_count())
            .field("presign_count", &self.presign_count())
            .finish()
    }
}
