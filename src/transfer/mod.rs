//! Object upload engine and transfer plumbing.
//!
//! [`UploadEngine`] owns the whole upload path: it sizes the input, goes
//! single-shot below the threshold, otherwise runs a multipart session
//! with part slicing, resume of matching incomplete sessions, bounded
//! concurrent part uploads, and completion. A failed multipart attempt
//! leaves its session in place so a corrected call can resume it.

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::io::{self, Cursor, Read};
use std::path::PathBuf;
use std::sync::Arc;

use bytes::Bytes;
use md5::{Digest, Md5};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::config::{StoreConfig, MAX_PART_SIZE, MIN_PART_SIZE};
use crate::crypto::{ciphertext_length, EncryptingReader, DEFAULT_CHUNK_SIZE};
use crate::error::{StoreError, TransferError, ValidationError};
use crate::services::{MultipartService, ObjectsService};
use crate::types::{
    CompletedPart, MultipartUploadInfo, ObjectInfo, ObjectLocator, PartInfo, PutObjectOptions,
};

/// Part number ceiling accepted by the protocol.
const MAX_PART_COUNT: u32 = 10_000;

/// Input for an object upload.
pub enum ObjectSource {
    /// Whole body held in memory.
    Bytes(Bytes),
    /// Blocking reader, with the total size when the caller knows it.
    Reader {
        /// The data source.
        reader: Box<dyn Read + Send>,
        /// Declared total size in bytes; `None` reads until end of data.
        size: Option<u64>,
    },
    /// File on disk; the size is taken from its metadata.
    File(PathBuf),
}

impl ObjectSource {
    /// Upload a body already held in memory.
    pub fn from_bytes(bytes: impl Into<Bytes>) -> Self {
        Self::Bytes(bytes.into())
    }

    /// Upload from a blocking reader.
    ///
    /// With a declared `size`, exactly that many bytes are consumed and a
    /// source that ends early fails the upload; with `None` the reader is
    /// drained to end of data.
    pub fn from_reader(reader: impl Read + Send + 'static, size: Option<u64>) -> Self {
        Self::Reader {
            reader: Box::new(reader),
            size,
        }
    }

    /// Upload a file from disk.
    pub fn from_file(path: impl Into<PathBuf>) -> Self {
        Self::File(path.into())
    }
}

impl fmt::Debug for ObjectSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bytes(bytes) => f.debug_tuple("Bytes").field(&bytes.len()).finish(),
            Self::Reader { size, .. } => f
                .debug_struct("Reader")
                .field("size", size)
                .finish_non_exhaustive(),
            Self::File(path) => f.debug_tuple("File").field(path).finish(),
        }
    }
}

/// Splits a blocking reader into fixed-size chunks.
pub struct ChunkedReader<R> {
    reader: R,
    chunk_size: usize,
    position: u64,
}

impl<R: Read> ChunkedReader<R> {
    /// Create a reader yielding chunks of `chunk_size` bytes.
    pub fn new(reader: R, chunk_size: usize) -> Self {
        Self {
            reader,
            chunk_size,
            position: 0,
        }
    }

    /// Read the next chunk, filling it completely unless the source ends.
    ///
    /// Returns `None` once the source is exhausted; only the final chunk
    /// may be shorter than the configured size.
    pub fn read_chunk(&mut self) -> io::Result<Option<Bytes>> {
        let mut buffer = vec![0u8; self.chunk_size];
        let mut total_read = 0;

        while total_read < self.chunk_size {
            match self.reader.read(&mut buffer[total_read..]) {
                Ok(0) => break,
                Ok(n) => total_read += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }

        if total_read == 0 {
            return Ok(None);
        }

        buffer.truncate(total_read);
        self.position += total_read as u64;
        Ok(Some(Bytes::from(buffer)))
    }

    /// Total bytes read so far.
    pub fn position(&self) -> u64 {
        self.position
    }
}

/// Blocking reader over chunks delivered by an async producer.
///
/// Bridges a download stream into a synchronous pipeline such as the
/// decrypting reader. Reads block on the channel, so they must run off
/// the async runtime; memory use is bounded by the channel capacity.
pub struct ChannelReader {
    receiver: mpsc::Receiver<Result<Bytes, StoreError>>,
    current: Bytes,
    position: usize,
}

impl ChannelReader {
    /// Create a reader over a chunk channel.
    pub fn new(receiver: mpsc::Receiver<Result<Bytes, StoreError>>) -> Self {
        Self {
            receiver,
            current: Bytes::new(),
            position: 0,
        }
    }
}

impl Read for ChannelReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        while self.position == self.current.len() {
            match self.receiver.blocking_recv() {
                Some(Ok(chunk)) => {
                    self.current = chunk;
                    self.position = 0;
                }
                Some(Err(error)) => {
                    return Err(io::Error::new(io::ErrorKind::Other, error));
                }
                None => return Ok(0),
            }
        }
        let available = &self.current[self.position..];
        let n = available.len().min(buf.len());
        buf[..n].copy_from_slice(&available[..n]);
        self.position += n;
        Ok(n)
    }
}

/// Per-call upload parameters shared across the engine's stages.
#[derive(Clone, Copy)]
struct UploadPlan<'a> {
    part_size: u64,
    content_type: Option<&'a str>,
    user_metadata: &'a HashMap<String, String>,
    encrypted: bool,
}

type SourceChunks = ChunkedReader<Box<dyn Read + Send>>;

/// Drives object uploads.
///
/// Inputs at or below the single-shot threshold go out as one PUT;
/// everything else runs as a multipart session. Before initiating a new
/// session the engine looks for an incomplete one on the same locator and
/// resumes it when its stored parts fit the configured part size, reusing
/// any part whose number, size, and ETag match the bytes that would be
/// uploaded.
pub struct UploadEngine {
    config: Arc<StoreConfig>,
    objects: Arc<ObjectsService>,
    multipart: Arc<MultipartService>,
}

impl UploadEngine {
    /// Create an engine over the object and multipart services.
    pub fn new(
        config: Arc<StoreConfig>,
        objects: Arc<ObjectsService>,
        multipart: Arc<MultipartService>,
    ) -> Self {
        Self {
            config,
            objects,
            multipart,
        }
    }

    /// Upload an object from `source`.
    ///
    /// A declared size that exceeds the source fails with an end-of-input
    /// error after the already-read parts are stored, leaving the
    /// multipart session resumable. Envelope encryption, when requested,
    /// is applied to the stream before sizing, and the key-carrying
    /// metadata entries are added to the object's user metadata.
    pub async fn put(
        &self,
        locator: &ObjectLocator,
        source: ObjectSource,
        options: &PutObjectOptions,
    ) -> Result<ObjectInfo, StoreError> {
        let part_size = options.part_size.unwrap_or(self.config.part_size);
        if !(MIN_PART_SIZE..=MAX_PART_SIZE).contains(&part_size) {
            return Err(StoreError::Validation(ValidationError::InvalidArgument {
                message: format!(
                    "part size {} is outside {}..={}",
                    part_size, MIN_PART_SIZE, MAX_PART_SIZE
                ),
            }));
        }
        let threshold = self.config.single_shot_threshold;

        let (raw, declared) = resolve_source(source).await?;

        // Bound reads by the declared size so a source with extra bytes
        // cannot push past it.
        let bounded: Box<dyn Read + Send> = match declared {
            Some(limit) => Box::new(raw.take(limit)),
            None => raw,
        };

        let mut user_metadata = options.user_metadata.clone();
        let (reader, declared_stored): (Box<dyn Read + Send>, Option<u64>) =
            match &options.encryption {
                Some(context) => {
                    let materials = context.generate_materials(DEFAULT_CHUNK_SIZE)?;
                    for (name, value) in materials.metadata() {
                        user_metadata.insert(name.clone(), value.clone());
                    }
                    let stored_size =
                        declared.map(|len| ciphertext_length(len, materials.chunk_size()));
                    let encrypting = EncryptingReader::new(bounded, &materials)?;
                    (Box::new(encrypting), stored_size)
                }
                None => (bounded, declared),
            };

        let plan = UploadPlan {
            part_size,
            content_type: options.content_type.as_deref(),
            user_metadata: &user_metadata,
            encrypted: options.encryption.is_some(),
        };

        match declared_stored {
            Some(total) if total <= threshold => {
                self.single_shot(locator, reader, total, plan).await
            }
            Some(total) => {
                let parts_needed = total.div_ceil(part_size);
                if parts_needed > u64::from(MAX_PART_COUNT) {
                    return Err(StoreError::Validation(ValidationError::InvalidArgument {
                        message: format!(
                            "{} bytes needs {} parts at part size {}; the protocol caps an upload at {} parts",
                            total, parts_needed, part_size, MAX_PART_COUNT
                        ),
                    }));
                }
                let chunks = ChunkedReader::new(reader, part_size as usize);
                self.multipart_upload(locator, chunks, VecDeque::new(), Some(total), plan)
                    .await
            }
            None => {
                self.put_unknown_size(locator, reader, threshold, plan)
                    .await
            }
        }
    }

    /// Abort every incomplete multipart session for the locator.
    pub async fn remove_incomplete_upload(
        &self,
        locator: &ObjectLocator,
    ) -> Result<(), StoreError> {
        let sessions = self.sessions_for(locator).await?;
        for session in sessions {
            debug!(
                bucket = %locator.bucket,
                key = %locator.key,
                upload_id = %session.upload_id,
                "aborting incomplete upload"
            );
            self.multipart
                .abort(&locator.bucket, &locator.key, &session.upload_id)
                .await?;
        }
        Ok(())
    }

    async fn single_shot(
        &self,
        locator: &ObjectLocator,
        reader: Box<dyn Read + Send>,
        expected: u64,
        plan: UploadPlan<'_>,
    ) -> Result<ObjectInfo, StoreError> {
        let body = read_to_end(reader).await?;
        if body.len() as u64 != expected {
            return Err(StoreError::Transfer(TransferError::UnexpectedEof {
                expected,
                received: body.len() as u64,
            }));
        }
        debug!(
            bucket = %locator.bucket,
            key = %locator.key,
            size = expected,
            "uploading object in a single request"
        );
        self.objects
            .put(
                &locator.bucket,
                &locator.key,
                body,
                plan.content_type,
                plan.user_metadata,
            )
            .await
    }

    async fn put_unknown_size(
        &self,
        locator: &ObjectLocator,
        reader: Box<dyn Read + Send>,
        threshold: u64,
        plan: UploadPlan<'_>,
    ) -> Result<ObjectInfo, StoreError> {
        // Read one part to learn whether the source fits a single request.
        let chunks = ChunkedReader::new(reader, plan.part_size as usize);
        let (chunks, first) = next_chunk(chunks).await?;
        let first = match first {
            Some(chunk) => chunk,
            None => {
                return self
                    .objects
                    .put(
                        &locator.bucket,
                        &locator.key,
                        Bytes::new(),
                        plan.content_type,
                        plan.user_metadata,
                    )
                    .await;
            }
        };

        if (first.len() as u64) < plan.part_size {
            if first.len() as u64 <= threshold {
                return self
                    .objects
                    .put(
                        &locator.bucket,
                        &locator.key,
                        first,
                        plan.content_type,
                        plan.user_metadata,
                    )
                    .await;
            }
            let mut seeded = VecDeque::new();
            seeded.push_back(first);
            return self
                .multipart_upload(locator, chunks, seeded, None, plan)
                .await;
        }

        // The first part filled completely; only a second read tells
        // whether the source ends exactly on the part boundary.
        let (chunks, second) = next_chunk(chunks).await?;
        let mut seeded = VecDeque::new();
        match second {
            None if plan.part_size <= threshold => {
                self.objects
                    .put(
                        &locator.bucket,
                        &locator.key,
                        first,
                        plan.content_type,
                        plan.user_metadata,
                    )
                    .await
            }
            None => {
                seeded.push_back(first);
                self.multipart_upload(locator, chunks, seeded, None, plan)
                    .await
            }
            Some(second_chunk) => {
                seeded.push_back(first);
                seeded.push_back(second_chunk);
                self.multipart_upload(locator, chunks, seeded, None, plan)
                    .await
            }
        }
    }

    async fn multipart_upload(
        &self,
        locator: &ObjectLocator,
        mut chunks: SourceChunks,
        mut seeded: VecDeque<Bytes>,
        declared: Option<u64>,
        plan: UploadPlan<'_>,
    ) -> Result<ObjectInfo, StoreError> {
        let (upload_id, existing) = self.open_session(locator, plan).await?;

        let concurrency = self.config.part_concurrency.max(1) as usize;
        let mut tasks: JoinSet<Result<CompletedPart, StoreError>> = JoinSet::new();
        let mut completed: Vec<CompletedPart> = Vec::new();
        let mut first_error: Option<StoreError> = None;
        let mut part_number: u32 = 0;
        let mut total: u64 = 0;
        let mut reused: u32 = 0;

        'dispatch: loop {
            while tasks.len() >= concurrency {
                harvest(&mut tasks, &mut completed, &mut first_error).await;
                if first_error.is_some() {
                    break 'dispatch;
                }
            }

            let chunk = match seeded.pop_front() {
                Some(chunk) => Some(chunk),
                None => match next_chunk(chunks).await {
                    Ok((returned, chunk)) => {
                        chunks = returned;
                        chunk
                    }
                    Err(error) => {
                        first_error = Some(error);
                        break 'dispatch;
                    }
                },
            };
            let Some(chunk) = chunk else {
                break 'dispatch;
            };

            if part_number == MAX_PART_COUNT {
                first_error = Some(StoreError::Validation(ValidationError::InvalidArgument {
                    message: format!(
                        "upload needs more than {} parts at part size {}",
                        MAX_PART_COUNT, plan.part_size
                    ),
                }));
                break 'dispatch;
            }
            part_number += 1;
            total += chunk.len() as u64;

            if let Some(stored) = existing.get(&part_number) {
                if part_matches(stored, &chunk) {
                    debug!(part = part_number, etag = %stored.e_tag, "reusing stored part");
                    completed.push(CompletedPart {
                        part_number,
                        e_tag: stored.e_tag.clone(),
                    });
                    reused += 1;
                    continue;
                }
            }

            let multipart = Arc::clone(&self.multipart);
            let bucket = locator.bucket.clone();
            let key = locator.key.clone();
            let upload = upload_id.clone();
            tasks.spawn(async move {
                let part = multipart
                    .upload_part(&bucket, &key, &upload, part_number, chunk)
                    .await?;
                Ok(CompletedPart::from(part))
            });
        }

        while !tasks.is_empty() {
            harvest(&mut tasks, &mut completed, &mut first_error).await;
        }

        if first_error.is_none() {
            if let Some(expected) = declared {
                if total != expected {
                    first_error = Some(StoreError::Transfer(TransferError::UnexpectedEof {
                        expected,
                        received: total,
                    }));
                }
            }
        }

        if let Some(error) = first_error {
            // The session and its stored parts stay for a later resume.
            warn!(
                bucket = %locator.bucket,
                key = %locator.key,
                upload_id = %upload_id,
                parts_stored = completed.len(),
                "multipart upload failed; session left resumable"
            );
            return Err(error);
        }

        completed.sort_by_key(|part| part.part_number);
        debug!(
            bucket = %locator.bucket,
            key = %locator.key,
            upload_id = %upload_id,
            parts = completed.len(),
            reused = reused,
            size = total,
            "completing multipart upload"
        );

        let done = match self
            .multipart
            .complete(&locator.bucket, &locator.key, &upload_id, &completed)
            .await
        {
            Ok(done) => done,
            Err(error) if matches!(error, StoreError::Network(_)) => {
                // The completion may have landed before the failure. A
                // multipart ETag carries the part count, so one lookup
                // settles whether it did.
                match self.objects.head(&locator.bucket, &locator.key).await {
                    Ok(info)
                        if etag_has_part_count(info.e_tag.as_deref(), completed.len()) =>
                    {
                        debug!(
                            bucket = %locator.bucket,
                            key = %locator.key,
                            "completion confirmed by object lookup"
                        );
                        return Ok(info);
                    }
                    _ => return Err(error),
                }
            }
            Err(error) => return Err(error),
        };

        Ok(ObjectInfo {
            bucket: locator.bucket.clone(),
            key: locator.key.clone(),
            size: total,
            e_tag: done.e_tag,
            content_type: plan.content_type.map(str::to_string),
            last_modified: None,
            version_id: None,
            user_metadata: plan.user_metadata.clone(),
            request_id: done.request_id,
        })
    }

    /// Pick or create the session for this upload.
    ///
    /// A discovered incomplete session is resumed when its stored parts
    /// fit the configured part size; otherwise it is aborted before a
    /// fresh one is initiated. Encrypted uploads never resume: the key
    /// material in a session's metadata is fixed at initiation, so a
    /// discovered session with stored parts is an error and one without
    /// parts is replaced.
    async fn open_session(
        &self,
        locator: &ObjectLocator,
        plan: UploadPlan<'_>,
    ) -> Result<(String, HashMap<u32, PartInfo>), StoreError> {
        if let Some(previous) = self.newest_session(locator).await? {
            let stored = self.stored_parts(locator, &previous).await?;
            if plan.encrypted {
                if !stored.is_empty() {
                    return Err(StoreError::Validation(ValidationError::IncompatibleResume {
                        bucket: locator.bucket.clone(),
                        key: locator.key.clone(),
                        reason: "an incomplete upload with stored parts cannot share this \
                                 call's encryption keys; remove it first"
                            .to_string(),
                    }));
                }
                self.multipart
                    .abort(&locator.bucket, &locator.key, &previous)
                    .await?;
            } else if parts_compatible(&stored, plan.part_size) {
                debug!(
                    bucket = %locator.bucket,
                    key = %locator.key,
                    upload_id = %previous,
                    stored_parts = stored.len(),
                    "resuming incomplete upload"
                );
                return Ok((previous, stored));
            } else {
                debug!(
                    bucket = %locator.bucket,
                    key = %locator.key,
                    upload_id = %previous,
                    "stored parts do not fit the configured part size; aborting stale session"
                );
                self.multipart
                    .abort(&locator.bucket, &locator.key, &previous)
                    .await?;
            }
        }

        let created = self
            .multipart
            .initiate(
                &locator.bucket,
                &locator.key,
                plan.content_type,
                plan.user_metadata,
            )
            .await?;
        Ok((created.upload_id, HashMap::new()))
    }

    async fn newest_session(
        &self,
        locator: &ObjectLocator,
    ) -> Result<Option<String>, StoreError> {
        let sessions = self.sessions_for(locator).await?;
        let mut newest: Option<MultipartUploadInfo> = None;
        for upload in sessions {
            let newer = match (&newest, &upload.initiated) {
                (None, _) => true,
                (Some(current), Some(initiated)) => current
                    .initiated
                    .map_or(true, |existing| *initiated > existing),
                (Some(_), None) => false,
            };
            if newer {
                newest = Some(upload);
            }
        }
        Ok(newest.map(|upload| upload.upload_id))
    }

    async fn sessions_for(
        &self,
        locator: &ObjectLocator,
    ) -> Result<Vec<MultipartUploadInfo>, StoreError> {
        let mut sessions = Vec::new();
        let mut key_marker: Option<String> = None;
        let mut upload_id_marker: Option<String> = None;

        loop {
            let page = self
                .multipart
                .list_uploads(
                    &locator.bucket,
                    Some(&locator.key),
                    None,
                    key_marker.as_deref(),
                    upload_id_marker.as_deref(),
                    None,
                )
                .await?;
            sessions.extend(
                page.uploads
                    .into_iter()
                    .filter(|upload| upload.key == locator.key),
            );
            if !page.is_truncated {
                break;
            }
            key_marker = page.next_key_marker;
            upload_id_marker = page.next_upload_id_marker;
            if key_marker.is_none() && upload_id_marker.is_none() {
                break;
            }
        }

        Ok(sessions)
    }

    async fn stored_parts(
        &self,
        locator: &ObjectLocator,
        upload_id: &str,
    ) -> Result<HashMap<u32, PartInfo>, StoreError> {
        let mut parts = HashMap::new();
        let mut marker: Option<u32> = None;

        loop {
            let page = self
                .multipart
                .list_parts(&locator.bucket, &locator.key, upload_id, marker, None)
                .await?;
            for part in page.parts {
                parts.insert(part.part_number, part);
            }
            if !page.is_truncated {
                break;
            }
            marker = page.next_part_number_marker;
            if marker.is_none() {
                break;
            }
        }

        Ok(parts)
    }
}

impl fmt::Debug for UploadEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadEngine")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

async fn harvest(
    tasks: &mut JoinSet<Result<CompletedPart, StoreError>>,
    completed: &mut Vec<CompletedPart>,
    first_error: &mut Option<StoreError>,
) {
    let Some(joined) = tasks.join_next().await else {
        return;
    };
    match joined {
        Ok(Ok(part)) => completed.push(part),
        Ok(Err(error)) => {
            if first_error.is_none() {
                *first_error = Some(error);
            }
        }
        Err(join_error) => {
            if first_error.is_none() {
                *first_error = Some(StoreError::Transfer(TransferError::Worker {
                    message: join_error.to_string(),
                }));
            }
        }
    }
}

async fn resolve_source(
    source: ObjectSource,
) -> Result<(Box<dyn Read + Send>, Option<u64>), StoreError> {
    match source {
        ObjectSource::Bytes(bytes) => {
            let size = bytes.len() as u64;
            Ok((Box::new(Cursor::new(bytes)), Some(size)))
        }
        ObjectSource::Reader { reader, size } => Ok((reader, size)),
        ObjectSource::File(path) => {
            let shown = path.display().to_string();
            let opened = tokio::task::spawn_blocking(
                move || -> io::Result<(std::fs::File, u64)> {
                    let file = std::fs::File::open(&path)?;
                    let size = file.metadata()?.len();
                    Ok((file, size))
                },
            )
            .await
            .map_err(|error| worker_failed("file open", &error))?;
            let (file, size) = opened.map_err(|error| {
                StoreError::Transfer(TransferError::Source {
                    message: format!("{}: {}", shown, error),
                })
            })?;
            Ok((Box::new(file), Some(size)))
        }
    }
}

async fn next_chunk(chunks: SourceChunks) -> Result<(SourceChunks, Option<Bytes>), StoreError> {
    let (chunks, outcome) = tokio::task::spawn_blocking(move || {
        let mut chunks = chunks;
        let outcome = chunks.read_chunk();
        (chunks, outcome)
    })
    .await
    .map_err(|error| worker_failed("source read", &error))?;
    let chunk = outcome.map_err(read_failed)?;
    Ok((chunks, chunk))
}

async fn read_to_end(reader: Box<dyn Read + Send>) -> Result<Bytes, StoreError> {
    tokio::task::spawn_blocking(move || -> io::Result<Bytes> {
        let mut reader = reader;
        let mut buffer = Vec::new();
        reader.read_to_end(&mut buffer)?;
        Ok(Bytes::from(buffer))
    })
    .await
    .map_err(|error| worker_failed("source read", &error))?
    .map_err(read_failed)
}

/// Recover a typed error carried inside an I/O error, as the encrypting
/// and decrypting readers report theirs.
pub(crate) fn read_failed(error: io::Error) -> StoreError {
    let message = error.to_string();
    match error.into_inner().map(|inner| inner.downcast::<StoreError>()) {
        Some(Ok(store_error)) => *store_error,
        _ => StoreError::Transfer(TransferError::Source { message }),
    }
}

fn worker_failed(what: &str, error: &tokio::task::JoinError) -> StoreError {
    StoreError::Transfer(TransferError::Worker {
        message: format!("{} task failed: {}", what, error),
    })
}

fn part_matches(stored: &PartInfo, chunk: &Bytes) -> bool {
    stored.size == Some(chunk.len() as u64) && etag_matches(&stored.e_tag, chunk)
}

fn etag_matches(e_tag: &str, chunk: &[u8]) -> bool {
    let digest = hex::encode(Md5::digest(chunk));
    e_tag.trim_matches('"').eq_ignore_ascii_case(&digest)
}

/// Stored parts fit the configured part size when every part except the
/// highest-numbered one is exactly that size.
fn parts_compatible(stored: &HashMap<u32, PartInfo>, part_size: u64) -> bool {
    let Some(last) = stored.keys().copied().max() else {
        return true;
    };
    stored.values().all(|part| match part.size {
        Some(size) if part.part_number == last => size <= part_size,
        Some(size) => size == part_size,
        None => false,
    })
}

fn etag_has_part_count(e_tag: Option<&str>, parts: usize) -> bool {
    let Some(tag) = e_tag else {
        return false;
    };
    match tag.trim_matches('"').rsplit_once('-') {
        Some((_, count)) => count.parse::<usize>().ok() == Some(parts),
        None => false,
    }
}
