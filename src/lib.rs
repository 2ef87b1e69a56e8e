//! Client for S3-compatible object storage.
//!
//! Turns arbitrary-length byte streams into correctly sequenced,
//! resumable, optionally encrypted requests against an S3-compatible
//! service, and turns paginated result sets back into lazy sequences.
//!
//! # Features
//!
//! - **Resumable multipart uploads**: large objects are sliced into
//!   concurrently uploaded parts; an interrupted upload leaves its
//!   session in place and a corrected retry reuses the stored parts.
//! - **Client-side envelope encryption**: streaming AES-256-GCM under a
//!   per-object data key, wrapped with a shared secret or an RSA key
//!   pair.
//! - **Lazy listings**: objects and incomplete uploads come back as
//!   pull-based iterators that fetch pages only as they are consumed.
//! - **Presigning**: time-bounded GET/PUT URLs and POST policy forms
//!   usable by any HTTP client.
//! - **Conditional copy**: ETag and timestamp preconditions with
//!   precondition failures reported as outcomes, not errors.
//! - **S3-compatible**: works against MinIO, LocalStack, R2, and the
//!   real thing.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use s3_store::{ObjectLocator, ObjectSource, PutObjectOptions};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), s3_store::StoreError> {
//!     let client = s3_store::create_client_from_env()?;
//!
//!     let locator = ObjectLocator::new("my-bucket", "hello.txt")?;
//!     let info = client
//!         .put_object(
//!             &locator,
//!             ObjectSource::from_bytes(&b"Hello, object store!"[..]),
//!             &PutObjectOptions::new().with_content_type("text/plain"),
//!         )
//!         .await?;
//!
//!     println!("Uploaded with ETag: {:?}", info.e_tag);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![deny(unsafe_code)]

pub mod client;
pub mod config;
pub mod credentials;
pub mod crypto;
pub mod error;
pub mod listing;
pub mod mocks;
pub mod resilience;
pub mod services;
pub mod signing;
pub mod transfer;
pub mod transport;
pub mod types;
pub mod xml;

// Re-export main types at crate root
pub use client::{StoreClient, StoreClientBuilder};
pub use config::StoreConfig;
pub use credentials::{
    Credentials, CredentialsProvider, EnvCredentialsProvider, StaticCredentialsProvider,
};
pub use crypto::EncryptionContext;
pub use error::{ErrorKind, StoreError};
pub use listing::{ObjectLister, UploadLister};
pub use services::{CopyConditions, CopyOptions, CopyOutcome, MetadataDirective};
pub use transfer::ObjectSource;
pub use transport::{HttpRequest, HttpResponse, HttpTransport};
pub use types::{
    BucketInfo, DeleteOutcome, GetObjectOptions, ListApiVersion, ListObjectsOptions,
    MultipartUploadInfo, NotificationConfig, ObjectInfo, ObjectLocator, ObjectSummary, PostPolicy,
    PostPolicyForm, PresignedUrl, PutObjectOptions, QueueConfig, TopicConfig,
};

/// Create a client from environment variables.
///
/// Reads:
/// - `AWS_REGION` / `AWS_DEFAULT_REGION` for the region
/// - `AWS_ACCESS_KEY_ID` and `AWS_SECRET_ACCESS_KEY` for credentials
/// - `AWS_SESSION_TOKEN` for temporary credentials
/// - `AWS_ENDPOINT_URL_S3` / `AWS_ENDPOINT_URL` for custom endpoints
///
/// # Example
///
/// ```rust,no_run
/// let client = s3_store::create_client_from_env()?;
/// # Ok::<(), s3_store::StoreError>(())
/// ```
pub fn create_client_from_env() -> Result<StoreClient> {
    StoreClientBuilder::new().from_env().build()
}

/// Create a client with explicit configuration.
///
/// # Example
///
/// ```rust,no_run
/// use s3_store::{Credentials, StaticCredentialsProvider, StoreConfig};
/// use std::sync::Arc;
///
/// let config = StoreConfig::builder()
///     .region("us-west-2")
///     .credentials_provider(Arc::new(StaticCredentialsProvider::new(
///         Credentials::new("AKID", "SECRET"),
///     )))
///     .build()?;
///
/// let client = s3_store::create_client(config)?;
/// # Ok::<(), s3_store::StoreError>(())
/// ```
pub fn create_client(config: StoreConfig) -> Result<StoreClient> {
    StoreClientBuilder::new().config(config).build()
}

/// Result type alias for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
