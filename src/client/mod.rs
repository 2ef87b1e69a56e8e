//! Object store client facade.
//!
//! [`StoreClient`] is the entry point for callers: it validates bucket
//! and object names, then dispatches to the service layer, the upload
//! engine, and the listing iterators. Services are created lazily on
//! first use and share the configuration, transport, and signer.

use std::collections::VecDeque;
use std::io::{Cursor, Read, Write};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures::{Stream, StreamExt};
use once_cell::sync::OnceCell;
use tokio::sync::mpsc;

use crate::config::StoreConfig;
use crate::crypto::DecryptingReader;
use crate::error::{StoreError, TransferError, ValidationError};
use crate::listing::{ObjectLister, UploadLister};
use crate::services::{
    BucketsService, CopyOptions, CopyOutcome, CopyService, MultipartService, NotificationService,
    ObjectsService, PresignService,
};
use crate::signing::{RequestSigner, SignerV4};
use crate::transfer::{read_failed, ChannelReader, ObjectSource, UploadEngine};
use crate::transport::{HttpTransport, ReqwestTransport};
use crate::types::{
    validate_bucket_name, BucketInfo, DeleteOutcome, GetObjectOptions, ListObjectsOptions,
    NotificationConfig, ObjectInfo, ObjectLocator, PostPolicy, PostPolicyForm, PresignedUrl,
    PutObjectOptions,
};

/// Largest number of keys a single batch-delete request may carry.
const DELETE_BATCH_SIZE: usize = 1000;

/// High-level client for an S3-compatible object store.
///
/// Cheap to share: wrap it in an [`Arc`] and call it from as many tasks
/// as needed. All operations validate names before any request is sent;
/// violations surface as [`ValidationError`] without touching the
/// network.
pub struct StoreClient {
    config: Arc<StoreConfig>,
    transport: Arc<dyn HttpTransport>,
    signer: Arc<dyn RequestSigner>,

    // Lazy-initialized services
    objects: OnceCell<Arc<ObjectsService>>,
    buckets: OnceCell<Arc<BucketsService>>,
    multipart: OnceCell<Arc<MultipartService>>,
    copy: OnceCell<Arc<CopyService>>,
    presign: OnceCell<Arc<PresignService>>,
    notification: OnceCell<Arc<NotificationService>>,
    engine: OnceCell<Arc<UploadEngine>>,
}

impl StoreClient {
    /// Create a client over the given configuration and transport.
    pub fn new(config: StoreConfig, transport: Arc<dyn HttpTransport>) -> Self {
        let config = Arc::new(config);
        let signer: Arc<dyn RequestSigner> = Arc::new(SignerV4::new(
            config.credentials_provider.clone(),
            &config.region,
        ));
        Self::with_signer(config, transport, signer)
    }

    /// Create a client with an explicit signer, for tests that stub
    /// signing out.
    pub fn with_signer(
        config: Arc<StoreConfig>,
        transport: Arc<dyn HttpTransport>,
        signer: Arc<dyn RequestSigner>,
    ) -> Self {
        Self {
            config,
            transport,
            signer,
            objects: OnceCell::new(),
            buckets: OnceCell::new(),
            multipart: OnceCell::new(),
            copy: OnceCell::new(),
            presign: OnceCell::new(),
            notification: OnceCell::new(),
            engine: OnceCell::new(),
        }
    }

    /// Create a builder.
    pub fn builder() -> StoreClientBuilder {
        StoreClientBuilder::new()
    }

    /// The client configuration.
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    fn objects(&self) -> &Arc<ObjectsService> {
        self.objects.get_or_init(|| {
            Arc::new(ObjectsService::new(
                self.config.clone(),
                self.transport.clone(),
                self.signer.clone(),
            ))
        })
    }

    fn buckets(&self) -> &Arc<BucketsService> {
        self.buckets.get_or_init(|| {
            Arc::new(BucketsService::new(
                self.config.clone(),
                self.transport.clone(),
                self.signer.clone(),
            ))
        })
    }

    fn multipart(&self) -> &Arc<MultipartService> {
        self.multipart.get_or_init(|| {
            Arc::new(MultipartService::new(
                self.config.clone(),
                self.transport.clone(),
                self.signer.clone(),
            ))
        })
    }

    fn copy_service(&self) -> &Arc<CopyService> {
        self.copy.get_or_init(|| {
            Arc::new(CopyService::new(
                self.config.clone(),
                self.transport.clone(),
                self.signer.clone(),
            ))
        })
    }

    fn presign(&self) -> &Arc<PresignService> {
        self.presign.get_or_init(|| {
            Arc::new(PresignService::new(self.config.clone(), self.signer.clone()))
        })
    }

    fn notification(&self) -> &Arc<NotificationService> {
        self.notification.get_or_init(|| {
            Arc::new(NotificationService::new(
                self.config.clone(),
                self.transport.clone(),
                self.signer.clone(),
            ))
        })
    }

    fn engine(&self) -> &Arc<UploadEngine> {
        self.engine.get_or_init(|| {
            Arc::new(UploadEngine::new(
                self.config.clone(),
                self.objects().clone(),
                self.multipart().clone(),
            ))
        })
    }

    // ----- buckets -----

    /// Create a bucket, optionally in a region other than the client's.
    pub async fn make_bucket(&self, bucket: &str, region: Option<&str>) -> Result<(), StoreError> {
        validate_bucket_name(bucket)?;
        self.buckets().create(bucket, region).await
    }

    /// Delete a bucket. The bucket must be empty.
    pub async fn remove_bucket(&self, bucket: &str) -> Result<(), StoreError> {
        validate_bucket_name(bucket)?;
        self.buckets().delete(bucket).await
    }

    /// Whether the bucket exists and is accessible.
    pub async fn bucket_exists(&self, bucket: &str) -> Result<bool, StoreError> {
        validate_bucket_name(bucket)?;
        self.buckets().exists(bucket).await
    }

    /// List all buckets owned by the caller.
    pub async fn list_buckets(&self) -> Result<Vec<BucketInfo>, StoreError> {
        self.buckets().list().await
    }

    // ----- objects -----

    /// Upload an object.
    ///
    /// Inputs at or below the configured single-shot threshold go out as
    /// one PUT; larger inputs run as a resumable multipart upload with
    /// bounded part concurrency. With
    /// [`PutObjectOptions::with_encryption`] the body is envelope
    /// encrypted before upload and the key-carrying entries are added to
    /// the object's user metadata.
    pub async fn put_object(
        &self,
        locator: &ObjectLocator,
        source: ObjectSource,
        options: &PutObjectOptions,
    ) -> Result<ObjectInfo, StoreError> {
        locator.validate()?;
        self.engine().put(locator, source, options).await
    }

    /// Download an object into memory.
    ///
    /// With an encryption context in `options` the body is decrypted and
    /// verified before it is returned; a ranged read of an encrypted
    /// object is rejected, since a slice of the ciphertext cannot be
    /// authenticated.
    pub async fn get_object(
        &self,
        locator: &ObjectLocator,
        options: &GetObjectOptions,
    ) -> Result<(ObjectInfo, Bytes), StoreError> {
        locator.validate()?;
        let range = options.range_header()?;

        let Some(context) = &options.encryption else {
            return self
                .objects()
                .get(&locator.bucket, &locator.key, range.as_deref())
                .await;
        };
        if range.is_some() {
            return Err(StoreError::Validation(ValidationError::InvalidArgument {
                message: "ranged reads of encrypted objects are not supported".to_string(),
            }));
        }

        let (mut info, body) = self.objects().get(&locator.bucket, &locator.key, None).await?;
        let materials = context.unwrap_materials(&info.user_metadata)?;
        let plaintext = tokio::task::spawn_blocking(move || -> Result<Bytes, StoreError> {
            let mut reader = DecryptingReader::new(Cursor::new(body), &materials)?;
            let mut out = Vec::new();
            reader.read_to_end(&mut out).map_err(read_failed)?;
            Ok(Bytes::from(out))
        })
        .await
        .map_err(|error| {
            StoreError::Transfer(TransferError::Worker {
                message: format!("decryption task failed: {}", error),
            })
        })??;

        info.size = plaintext.len() as u64;
        Ok((info, plaintext))
    }

    /// Download an object into `sink`, chunk by chunk.
    ///
    /// The body never resides in memory as a whole, so arbitrarily large
    /// objects stream through bounded buffers. The sink is taken by
    /// value and handed back so the decrypting path can run it on a
    /// blocking worker.
    pub async fn get_object_to_sink<W>(
        &self,
        locator: &ObjectLocator,
        options: &GetObjectOptions,
        sink: W,
    ) -> Result<(ObjectInfo, W), StoreError>
    where
        W: Write + Send + 'static,
    {
        locator.validate()?;
        let range = options.range_header()?;
        if options.encryption.is_some() && range.is_some() {
            return Err(StoreError::Validation(ValidationError::InvalidArgument {
                message: "ranged reads of encrypted objects are not supported".to_string(),
            }));
        }

        let (info, mut body) = self
            .objects()
            .get_streaming(&locator.bucket, &locator.key, range.as_deref())
            .await?;

        let Some(context) = &options.encryption else {
            let mut sink = sink;
            while let Some(chunk) = body.next().await {
                let chunk = chunk?;
                sink.write_all(&chunk).map_err(sink_failed)?;
            }
            sink.flush().map_err(sink_failed)?;
            return Ok((info, sink));
        };

        let materials = context.unwrap_materials(&info.user_metadata)?;
        let (tx, rx) = mpsc::channel::<Result<Bytes, StoreError>>(4);
        let forward = tokio::spawn(async move {
            while let Some(chunk) = body.next().await {
                if tx.send(chunk).await.is_err() {
                    break;
                }
            }
        });
        let drained = tokio::task::spawn_blocking(move || -> Result<W, StoreError> {
            let mut reader = DecryptingReader::new(ChannelReader::new(rx), &materials)?;
            let mut sink = sink;
            let mut buffer = [0u8; 64 * 1024];
            loop {
                let n = reader.read(&mut buffer).map_err(read_failed)?;
                if n == 0 {
                    break;
                }
                sink.write_all(&buffer[..n]).map_err(sink_failed)?;
            }
            sink.flush().map_err(sink_failed)?;
            Ok(sink)
        })
        .await;
        forward.abort();

        let sink = drained.map_err(|error| {
            StoreError::Transfer(TransferError::Worker {
                message: format!("decryption task failed: {}", error),
            })
        })??;
        Ok((info, sink))
    }

    /// Fetch an object's metadata without its body.
    pub async fn stat_object(&self, locator: &ObjectLocator) -> Result<ObjectInfo, StoreError> {
        locator.validate()?;
        self.objects().head(&locator.bucket, &locator.key).await
    }

    /// Delete an object. Idempotent: deleting an absent key succeeds.
    pub async fn remove_object(&self, locator: &ObjectLocator) -> Result<(), StoreError> {
        locator.validate()?;
        self.objects().delete(&locator.bucket, &locator.key).await
    }

    /// Delete many objects, yielding a per-key outcome for each.
    ///
    /// Keys go out in batches of 1,000 per request, and a batch is only
    /// issued once the consumer asks for its outcomes. A key that fails
    /// server-side yields [`DeleteOutcome::Failed`] for that key alone;
    /// the rest of the batch is unaffected. A request-level failure ends
    /// the sequence with one terminal error.
    pub fn remove_objects(
        &self,
        bucket: &str,
        keys: Vec<String>,
    ) -> impl Stream<Item = Result<DeleteOutcome, StoreError>> + Send {
        struct RemoveState {
            objects: Arc<ObjectsService>,
            bucket: String,
            pending: VecDeque<Vec<String>>,
            buffered: VecDeque<DeleteOutcome>,
            invalid: Option<ValidationError>,
            done: bool,
        }

        let mut pending = VecDeque::new();
        let mut batch = Vec::with_capacity(keys.len().min(DELETE_BATCH_SIZE));
        for key in keys {
            batch.push(key);
            if batch.len() == DELETE_BATCH_SIZE {
                pending.push_back(std::mem::take(&mut batch));
            }
        }
        if !batch.is_empty() {
            pending.push_back(batch);
        }

        let state = RemoveState {
            objects: self.objects().clone(),
            bucket: bucket.to_string(),
            pending,
            buffered: VecDeque::new(),
            invalid: validate_bucket_name(bucket).err(),
            done: false,
        };

        futures::stream::unfold(state, |mut state| async move {
            if state.done {
                return None;
            }
            if let Some(error) = state.invalid.take() {
                state.done = true;
                return Some((Err(StoreError::Validation(error)), state));
            }
            loop {
                if let Some(outcome) = state.buffered.pop_front() {
                    return Some((Ok(outcome), state));
                }
                let batch = state.pending.pop_front()?;
                match state.objects.delete_batch(&state.bucket, &batch).await {
                    Ok(outcomes) => state.buffered.extend(outcomes),
                    Err(error) => {
                        state.done = true;
                        return Some((Err(error), state));
                    }
                }
            }
        })
    }

    /// Copy an object server-side, honoring the preconditions in
    /// `options`.
    ///
    /// A precondition that does not hold comes back as
    /// [`CopyOutcome::PreconditionFailed`] rather than an error, so
    /// callers can treat it as an expected negative.
    pub async fn copy_object(
        &self,
        source: &ObjectLocator,
        destination: &ObjectLocator,
        options: &CopyOptions,
    ) -> Result<CopyOutcome, StoreError> {
        source.validate()?;
        destination.validate()?;
        self.copy_service().copy(source, destination, options).await
    }

    // ----- listing -----

    /// List the objects of a bucket lazily.
    ///
    /// The lister fetches one page per signed request and only when its
    /// buffer runs dry, so dropping it early costs no extra requests.
    pub fn list_objects(
        &self,
        bucket: &str,
        options: ListObjectsOptions,
    ) -> Result<ObjectLister, StoreError> {
        validate_bucket_name(bucket)?;
        Ok(ObjectLister::new(self.objects().clone(), bucket, options))
    }

    /// List the incomplete multipart uploads of a bucket lazily.
    pub fn list_incomplete_uploads(
        &self,
        bucket: &str,
        prefix: Option<String>,
        recursive: bool,
    ) -> Result<UploadLister, StoreError> {
        validate_bucket_name(bucket)?;
        Ok(UploadLister::new(
            self.multipart().clone(),
            bucket,
            prefix,
            recursive,
        ))
    }

    /// Abort every incomplete multipart upload for the locator, freeing
    /// its server-side part storage.
    pub async fn remove_incomplete_upload(
        &self,
        locator: &ObjectLocator,
    ) -> Result<(), StoreError> {
        locator.validate()?;
        self.engine().remove_incomplete_upload(locator).await
    }

    // ----- presigning -----

    /// Produce a presigned GET URL for an object.
    ///
    /// `response_overrides` become signed query parameters such as
    /// `response-content-type`. The expiry must be in (0, 604800]
    /// seconds; the service, not the client, enforces it afterward.
    pub async fn presigned_get_object(
        &self,
        locator: &ObjectLocator,
        expires_in: Duration,
        response_overrides: Option<&std::collections::HashMap<String, String>>,
    ) -> Result<PresignedUrl, StoreError> {
        locator.validate()?;
        self.presign()
            .presigned_get(&locator.bucket, &locator.key, expires_in, response_overrides)
            .await
    }

    /// Produce a presigned PUT URL for uploading an object.
    pub async fn presigned_put_object(
        &self,
        locator: &ObjectLocator,
        expires_in: Duration,
    ) -> Result<PresignedUrl, StoreError> {
        locator.validate()?;
        self.presign()
            .presigned_put(&locator.bucket, &locator.key, expires_in)
            .await
    }

    /// Produce the form fields for a browser-based POST upload.
    pub async fn presigned_post_policy(
        &self,
        policy: &PostPolicy,
    ) -> Result<PostPolicyForm, StoreError> {
        validate_bucket_name(&policy.bucket)?;
        self.presign().presigned_post(policy).await
    }

    // ----- bucket policy -----

    /// Fetch the bucket policy as a JSON document.
    ///
    /// A bucket with no policy yields an empty string.
    pub async fn get_bucket_policy(&self, bucket: &str) -> Result<String, StoreError> {
        validate_bucket_name(bucket)?;
        self.buckets().get_policy(bucket).await
    }

    /// Replace the bucket policy with the given JSON document.
    pub async fn set_bucket_policy(&self, bucket: &str, policy: &str) -> Result<(), StoreError> {
        validate_bucket_name(bucket)?;
        self.buckets().set_policy(bucket, policy).await
    }

    /// Delete the bucket policy. Succeeds when no policy is set.
    pub async fn delete_bucket_policy(&self, bucket: &str) -> Result<(), StoreError> {
        validate_bucket_name(bucket)?;
        self.buckets().delete_policy(bucket).await
    }

    // ----- bucket notification -----

    /// Fetch the notification configuration of a bucket.
    pub async fn get_bucket_notification(
        &self,
        bucket: &str,
    ) -> Result<NotificationConfig, StoreError> {
        validate_bucket_name(bucket)?;
        self.notification().get(bucket).await
    }

    /// Replace the notification configuration of a bucket.
    pub async fn set_bucket_notification(
        &self,
        bucket: &str,
        notification: &NotificationConfig,
    ) -> Result<(), StoreError> {
        validate_bucket_name(bucket)?;
        self.notification().set(bucket, notification).await
    }

    /// Remove all notification rules from a bucket.
    pub async fn remove_bucket_notification(&self, bucket: &str) -> Result<(), StoreError> {
        validate_bucket_name(bucket)?;
        self.notification().remove(bucket).await
    }
}

impl std::fmt::Debug for StoreClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn sink_failed(error: std::io::Error) -> StoreError {
    StoreError::Transfer(TransferError::Sink {
        message: error.to_string(),
    })
}

/// Builder for [`StoreClient`].
pub struct StoreClientBuilder {
    config: Option<StoreConfig>,
    from_env: bool,
    transport: Option<Arc<dyn HttpTransport>>,
}

impl StoreClientBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self {
            config: None,
            from_env: false,
            transport: None,
        }
    }

    /// Use the provided configuration.
    pub fn config(mut self, config: StoreConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Load configuration from environment variables.
    pub fn from_env(mut self) -> Self {
        self.from_env = true;
        self
    }

    /// Use a custom HTTP transport.
    pub fn transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Build the client.
    pub fn build(self) -> Result<StoreClient, StoreError> {
        let config = if let Some(config) = self.config {
            config
        } else if self.from_env {
            StoreConfig::builder().from_env().build()?
        } else {
            StoreConfig::default()
        };

        let transport = if let Some(transport) = self.transport {
            transport
        } else {
            let builder = ReqwestTransport::builder()
                .connect_timeout(config.connect_timeout)
                .read_timeout(config.read_timeout)
                .pool_max_idle_per_host(config.max_connections as usize)
                .pool_idle_timeout(Some(config.idle_timeout))
                .verify_ssl(config.verify_ssl);

            Arc::new(builder.build()?)
        };

        Ok(StoreClient::new(config, transport))
    }
}

impl Default for StoreClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
