//! Credential types and providers.
//!
//! Credentials can be supplied statically or read from environment
//! variables. Secrets are held in [`secrecy::SecretString`] and never
//! appear in `Debug` output.

mod env;

pub use env::EnvCredentialsProvider;

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};

use crate::error::{CredentialsError, StoreError};

/// Access credentials for the store.
#[derive(Clone)]
pub struct Credentials {
    access_key_id: String,
    secret_access_key: SecretString,
    session_token: Option<SecretString>,
    expiration: Option<DateTime<Utc>>,
}

impl Credentials {
    /// Create new long-term credentials.
    pub fn new(access_key_id: impl Into<String>, secret_access_key: impl Into<String>) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: SecretString::new(secret_access_key.into()),
            session_token: None,
            expiration: None,
        }
    }

    /// Create new temporary credentials with a session token.
    pub fn with_session_token(
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        session_token: impl Into<String>,
    ) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: SecretString::new(secret_access_key.into()),
            session_token: Some(SecretString::new(session_token.into())),
            expiration: None,
        }
    }

    /// Create temporary credentials with an expiration.
    pub fn temporary(
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        session_token: impl Into<String>,
        expiration: DateTime<Utc>,
    ) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: SecretString::new(secret_access_key.into()),
            session_token: Some(SecretString::new(session_token.into())),
            expiration: Some(expiration),
        }
    }

    /// Get the access key ID.
    pub fn access_key_id(&self) -> &str {
        &self.access_key_id
    }

    /// Get the secret access key.
    ///
    /// Note: This exposes the secret. Use carefully and avoid logging.
    pub fn secret_access_key(&self) -> &str {
        self.secret_access_key.expose_secret()
    }

    /// Get the session token, if any.
    pub fn session_token(&self) -> Option<&str> {
        self.session_token
            .as_ref()
            .map(|s| s.expose_secret().as_str())
    }

    /// Get the expiration time, if any.
    pub fn expiration(&self) -> Option<&DateTime<Utc>> {
        self.expiration.as_ref()
    }

    /// Check if credentials have expired.
    pub fn is_expired(&self) -> bool {
        match &self.expiration {
            Some(exp) => Utc::now() >= *exp,
            None => false,
        }
    }

    /// Check if credentials will expire within the given duration.
    pub fn will_expire_within(&self, duration: chrono::Duration) -> bool {
        match &self.expiration {
            Some(exp) => Utc::now() + duration >= *exp,
            None => false,
        }
    }

    /// Check if credentials are temporary (have a session token).
    pub fn is_temporary(&self) -> bool {
        self.session_token.is_some()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"[REDACTED]")
            .field(
                "session_token",
                &self.session_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("expiration", &self.expiration)
            .finish()
    }
}

/// Trait for credential providers.
#[async_trait]
pub trait CredentialsProvider: Send + Sync {
    /// Get credentials from this provider.
    async fn get_credentials(&self) -> Result<Credentials, StoreError>;

    /// Refresh credentials if possible.
    ///
    /// Default implementation returns current credentials.
    async fn refresh_credentials(&self) -> Result<Credentials, StoreError> {
        self.get_credentials().await
    }

    /// Provider name for logging/debugging.
    fn name(&self) -> &'static str;
}

/// Static credentials provider for testing or explicit configuration.
pub struct StaticCredentialsProvider {
    credentials: Credentials,
}

impl StaticCredentialsProvider {
    /// Create a new static credentials provider.
    pub fn new(credentials: Credentials) -> Self {
        Self { credentials }
    }
}

#[async_trait]
impl CredentialsProvider for StaticCredentialsProvider {
    async fn get_credentials(&self) -> Result<Credentials, StoreError> {
        if self.credentials.is_expired() {
            return Err(StoreError::Credentials(CredentialsError::Expired {
                expiration: self
                    .credentials
                    .expiration()
                    .map(|e| e.to_rfc3339())
                    .unwrap_or_default(),
            }));
        }
        Ok(self.credentials.clone())
    }

    fn name(&self) -> &'static str {
        "static"
    }
}

impl fmt::Debug for StaticCredentialsProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticCredentialsProvider")
            .field("credentials", &self.credentials)
            .finish()
    }
}
