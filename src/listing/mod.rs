//! Lazy pagination over the listing APIs.
//!
//! [`ObjectLister`] and [`UploadLister`] pull pages on demand: a page is
//! fetched only when a caller asks for an item the buffer cannot serve,
//! so abandoning a listing early never costs speculative requests. A
//! failed page fetch ends the sequence with one error; items already
//! yielded remain valid.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use futures::Stream;
use tracing::debug;

use crate::error::StoreError;
use crate::services::{MultipartService, ObjectsService};
use crate::types::{ListApiVersion, ListObjectsOptions, MultipartUploadInfo, ObjectSummary};

/// Iterates the objects in a bucket, page by page.
///
/// Non-recursive listings yield common-prefix entries (with
/// [`ObjectSummary::is_prefix`] set) interleaved with leaf objects in key
/// order, de-duplicated across pages.
pub struct ObjectLister {
    objects: Arc<ObjectsService>,
    bucket: String,
    options: ListObjectsOptions,
    token: Option<String>,
    buffered: VecDeque<ObjectSummary>,
    seen_prefixes: HashSet<String>,
    exhausted: bool,
}

impl ObjectLister {
    /// Create a lister over a bucket.
    pub fn new(
        objects: Arc<ObjectsService>,
        bucket: impl Into<String>,
        options: ListObjectsOptions,
    ) -> Self {
        Self {
            objects,
            bucket: bucket.into(),
            options,
            token: None,
            buffered: VecDeque::new(),
            seen_prefixes: HashSet::new(),
            exhausted: false,
        }
    }

    /// Yield the next entry, fetching a page when the buffer runs dry.
    ///
    /// Returns `None` once the listing is finished. A page fetch failure
    /// is returned once and ends the sequence.
    pub async fn next(&mut self) -> Option<Result<ObjectSummary, StoreError>> {
        loop {
            if let Some(entry) = self.buffered.pop_front() {
                return Some(Ok(entry));
            }
            if self.exhausted {
                return None;
            }
            match self.fetch_page().await {
                Ok(entries) => self.buffered.extend(entries),
                Err(error) => {
                    self.exhausted = true;
                    return Some(Err(error));
                }
            }
        }
    }

    /// Yield the next non-empty batch of entries.
    ///
    /// Returns `Ok(None)` once the listing is finished.
    pub async fn next_page(&mut self) -> Result<Option<Vec<ObjectSummary>>, StoreError> {
        if !self.buffered.is_empty() {
            return Ok(Some(self.buffered.drain(..).collect()));
        }
        while !self.exhausted {
            match self.fetch_page().await {
                Ok(entries) if !entries.is_empty() => return Ok(Some(entries)),
                Ok(_) => continue,
                Err(error) => {
                    self.exhausted = true;
                    return Err(error);
                }
            }
        }
        Ok(None)
    }

    /// Adapt the lister into a [`futures::Stream`] of entries.
    pub fn into_stream(self) -> impl Stream<Item = Result<ObjectSummary, StoreError>> + Send {
        futures::stream::unfold(self, |mut lister| async move {
            let item = lister.next().await?;
            Some((item, lister))
        })
    }

    async fn fetch_page(&mut self) -> Result<Vec<ObjectSummary>, StoreError> {
        let page = self
            .objects
            .list_page(&self.bucket, &self.options, self.token.as_deref())
            .await?;

        // V1 omits NextMarker in undelimited listings; the last key of
        // the page serves as the marker then.
        let last_key = page.objects.last().map(|object| object.key.clone());
        let next_token = match self.options.api_version {
            ListApiVersion::V2 => page.next_continuation_token.clone(),
            ListApiVersion::V1 => page.next_marker.clone().or(last_key),
        };
        self.exhausted = !page.is_truncated || next_token.is_none();
        self.token = next_token;

        let mut fresh_prefixes = Vec::new();
        for prefix in page.common_prefixes {
            if self.seen_prefixes.insert(prefix.clone()) {
                fresh_prefixes.push(prefix);
            }
        }

        debug!(
            bucket = %self.bucket,
            objects = page.objects.len(),
            prefixes = fresh_prefixes.len(),
            finished = self.exhausted,
            "fetched listing page"
        );

        Ok(interleave(
            page.objects,
            fresh_prefixes,
            |object| &object.key,
            ObjectSummary::prefix,
        ))
    }
}

impl std::fmt::Debug for ObjectLister {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectLister")
            .field("bucket", &self.bucket)
            .field("options", &self.options)
            .field("exhausted", &self.exhausted)
            .finish_non_exhaustive()
    }
}

/// Iterates the incomplete multipart uploads in a bucket.
///
/// Non-recursive listings yield common-prefix entries as records with an
/// empty upload ID, de-duplicated across pages.
pub struct UploadLister {
    multipart: Arc<MultipartService>,
    bucket: String,
    prefix: Option<String>,
    delimiter: Option<String>,
    key_marker: Option<String>,
    upload_id_marker: Option<String>,
    buffered: VecDeque<MultipartUploadInfo>,
    seen_prefixes: HashSet<String>,
    exhausted: bool,
}

impl UploadLister {
    /// Create a lister over a bucket's incomplete uploads.
    pub fn new(
        multipart: Arc<MultipartService>,
        bucket: impl Into<String>,
        prefix: Option<String>,
        recursive: bool,
    ) -> Self {
        Self {
            multipart,
            bucket: bucket.into(),
            prefix,
            delimiter: if recursive { None } else { Some("/".to_string()) },
            key_marker: None,
            upload_id_marker: None,
            buffered: VecDeque::new(),
            seen_prefixes: HashSet::new(),
            exhausted: false,
        }
    }

    /// Yield the next entry, fetching a page when the buffer runs dry.
    pub async fn next(&mut self) -> Option<Result<MultipartUploadInfo, StoreError>> {
        loop {
            if let Some(entry) = self.buffered.pop_front() {
                return Some(Ok(entry));
            }
            if self.exhausted {
                return None;
            }
            match self.fetch_page().await {
                Ok(entries) => self.buffered.extend(entries),
                Err(error) => {
                    self.exhausted = true;
                    return Some(Err(error));
                }
            }
        }
    }

    /// Adapt the lister into a [`futures::Stream`] of entries.
    pub fn into_stream(
        self,
    ) -> impl Stream<Item = Result<MultipartUploadInfo, StoreError>> + Send {
        futures::stream::unfold(self, |mut lister| async move {
            let item = lister.next().await?;
            Some((item, lister))
        })
    }

    async fn fetch_page(&mut self) -> Result<Vec<MultipartUploadInfo>, StoreError> {
        let page = self
            .multipart
            .list_uploads(
                &self.bucket,
                self.prefix.as_deref(),
                self.delimiter.as_deref(),
                self.key_marker.as_deref(),
                self.upload_id_marker.as_deref(),
                None,
            )
            .await?;

        self.exhausted = !page.is_truncated
            || (page.next_key_marker.is_none() && page.next_upload_id_marker.is_none());
        self.key_marker = page.next_key_marker.clone();
        self.upload_id_marker = page.next_upload_id_marker.clone();

        let mut fresh_prefixes = Vec::new();
        for prefix in page.common_prefixes {
            if self.seen_prefixes.insert(prefix.clone()) {
                fresh_prefixes.push(prefix);
            }
        }

        Ok(interleave(
            page.uploads,
            fresh_prefixes,
            |upload| &upload.key,
            |prefix| MultipartUploadInfo {
                key: prefix,
                upload_id: String::new(),
                initiated: None,
                initiator: None,
                owner: None,
            },
        ))
    }
}

impl std::fmt::Debug for UploadLister {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadLister")
            .field("bucket", &self.bucket)
            .field("prefix", &self.prefix)
            .field("exhausted", &self.exhausted)
            .finish_non_exhaustive()
    }
}

/// Merge key-sorted items with key-sorted prefixes, preserving overall
/// key order.
fn interleave<T>(
    items: Vec<T>,
    prefixes: Vec<String>,
    key_of: impl Fn(&T) -> &str,
    prefix_entry: impl Fn(String) -> T,
) -> Vec<T> {
    let mut merged = Vec::with_capacity(items.len() + prefixes.len());
    let mut items = items.into_iter().peekable();
    let mut prefixes = prefixes.into_iter().peekable();
    loop {
        let take_item = match (items.peek(), prefixes.peek()) {
            (Some(item), Some(prefix)) => key_of(item) <= prefix.as_str(),
            (Some(_), None) => true,
            (None, Some(_)) => false,
            (None, None) => break,
        };
        if take_item {
            if let Some(item) = items.next() {
                merged.push(item);
            }
        } else if let Some(prefix) = prefixes.next() {
            merged.push(prefix_entry(prefix));
        }
    }
    merged
}
