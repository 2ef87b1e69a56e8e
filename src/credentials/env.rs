//! Environment variable credentials provider.

use std::env;

use async_trait::async_trait;

use super::{Credentials, CredentialsProvider};
use crate::error::{CredentialsError, StoreError};

/// Environment variable names for credentials.
pub const AWS_ACCESS_KEY_ID: &str = "AWS_ACCESS_KEY_ID";
pub const AWS_SECRET_ACCESS_KEY: &str = "AWS_SECRET_ACCESS_KEY";
pub const AWS_SESSION_TOKEN: &str = "AWS_SESSION_TOKEN";

/// Credentials provider that reads from environment variables.
///
/// This provider looks for the following environment variables:
/// - `AWS_ACCESS_KEY_ID`: The access key ID
/// - `AWS_SECRET_ACCESS_KEY`: The secret access key
/// - `AWS_SESSION_TOKEN`: Optional session token for temporary credentials
#[derive(Debug, Clone, Default)]
pub struct EnvCredentialsProvider {
    /// Custom access key ID variable name.
    access_key_var: Option<String>,
    /// Custom secret key variable name.
    secret_key_var: Option<String>,
    /// Custom session token variable name.
    session_token_var: Option<String>,
}

impl EnvCredentialsProvider {
    /// Create a new environment credentials provider with default variable names.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a provider with custom variable names.
    pub fn with_vars(
        access_key_var: impl Into<String>,
        secret_key_var: impl Into<String>,
        session_token_var: Option<String>,
    ) -> Self {
        Self {
            access_key_var: Some(access_key_var.into()),
            secret_key_var: Some(secret_key_var.into()),
            session_token_var,
        }
    }

    fn access_key_var(&self) -> &str {
        self.access_key_var.as_deref().unwrap_or(AWS_ACCESS_KEY_ID)
    }

    fn secret_key_var(&self) -> &str {
        self.secret_key_var
            .as_deref()
            .unwrap_or(AWS_SECRET_ACCESS_KEY)
    }

    fn session_token_var(&self) -> &str {
        self.session_token_var
            .as_deref()
            .unwrap_or(AWS_SESSION_TOKEN)
    }
}

#[async_trait]
impl CredentialsProvider for EnvCredentialsProvider {
    async fn get_credentials(&self) -> Result<Credentials, StoreError> {
        let access_key_id = env::var(self.access_key_var())
            .map_err(|_| StoreError::Credentials(CredentialsError::NotFound))?;

        if access_key_id.is_empty() {
            return Err(StoreError::Credentials(CredentialsError::Invalid {
                message: format!("{} is empty", self.access_key_var()),
            }));
        }

        let secret_access_key = env::var(self.secret_key_var())
            .map_err(|_| StoreError::Credentials(CredentialsError::NotFound))?;

        if secret_access_key.is_empty() {
            return Err(StoreError::Credentials(CredentialsError::Invalid {
                message: format!("{} is empty", self.secret_key_var()),
            }));
        }

        // Session token is optional
        let session_token = env::var(self.session_token_var())
            .ok()
            .filter(|s| !s.is_empty());

        let credentials = if let Some(token) = session_token {
            Credentials::with_session_token(access_key_id, secret_access_key, token)
        } else {
            Credentials::new(access_key_id, secret_access_key)
        };

        Ok(credentials)
    }

    fn name(&self) -> &'static str {
        "environment"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    // Environment variables are process-global, so these tests take turns.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    struct EnvGuard {
        saved: Vec<(&'static str, Option<String>)>,
    }

    impl EnvGuard {
        fn set(vars: &[(&'static str, Option<&str>)]) -> Self {
            let saved = vars
                .iter()
                .map(|(k, _)| (*k, env::var(*k).ok()))
                .collect();
            for (key, value) in vars {
                match value {
                    Some(v) => env::set_var(key, v),
                    None => env::remove_var(key),
                }
            }
            Self { saved }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            for (key, original) in &self.saved {
                match original {
                    Some(v) => env::set_var(key, v),
                    None => env::remove_var(key),
                }
            }
        }
    }

    #[tokio::test]
    async fn test_env_provider_success() {
        let _lock = ENV_LOCK.lock();
        let _guard = EnvGuard::set(&[
            (AWS_ACCESS_KEY_ID, Some("AKID")),
            (AWS_SECRET_ACCESS_KEY, Some("SECRET")),
            (AWS_SESSION_TOKEN, None),
        ]);

        let provider = EnvCredentialsProvider::new();
        let creds = provider.get_credentials().await.unwrap();
        assert_eq!(creds.access_key_id(), "AKID");
        assert!(creds.session_token().is_none());
    }

    #[tokio::test]
    async fn test_env_provider_with_session_token() {
        let _lock = ENV_LOCK.lock();
        let _guard = EnvGuard::set(&[
            (AWS_ACCESS_KEY_ID, Some("AKID")),
            (AWS_SECRET_ACCESS_KEY, Some("SECRET")),
            (AWS_SESSION_TOKEN, Some("TOKEN")),
        ]);

        let provider = EnvCredentialsProvider::new();
        let creds = provider.get_credentials().await.unwrap();
        assert_eq!(creds.session_token(), Some("TOKEN"));
    }

    #[tokio::test]
    async fn test_env_provider_missing_access_key() {
        let _lock = ENV_LOCK.lock();
        let _guard = EnvGuard::set(&[
            (AWS_ACCESS_KEY_ID, None),
            (AWS_SECRET_ACCESS_KEY, None),
        ]);

        let provider = EnvCredentialsProvider::new();
        assert!(provider.get_credentials().await.is_err());
    }

    #[tokio::test]
    async fn test_env_provider_empty_access_key() {
        let _lock = ENV_LOCK.lock();
        let _guard = EnvGuard::set(&[
            (AWS_ACCESS_KEY_ID, Some("")),
            (AWS_SECRET_ACCESS_KEY, Some("SECRET")),
        ]);

        let provider = EnvCredentialsProvider::new();
        assert!(provider.get_credentials().await.is_err());
    }

    #[tokio::test]
    async fn test_env_provider_custom_vars() {
        let _lock = ENV_LOCK.lock();
        let _guard = EnvGuard::set(&[
            ("MY_ACCESS_KEY", Some("CUSTOM_AKID")),
            ("MY_SECRET_KEY", Some("CUSTOM_SECRET")),
        ]);

        let provider = EnvCredentialsProvider::with_vars("MY_ACCESS_KEY", "MY_SECRET_KEY", None);
        let creds = provider.get_credentials().await.unwrap();
        assert_eq!(creds.access_key_id(), "CUSTOM_AKID");
    }
}
