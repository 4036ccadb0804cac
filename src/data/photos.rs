//! Pet photos: blob storage contract, object paths, and download URL cache.

use crate::error::{PetCareError, Result};
use crate::model::OwnerId;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

/// Extension used when the local photo URI does not carry one.
pub const DEFAULT_PHOTO_EXTENSION: &str = "jpg";

/// Object storage holding pet photos.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Upload the file at `local_uri` to `path`, replacing any previous object.
    async fn upload(&self, local_uri: &str, path: &str) -> Result<()>;

    /// Resolve a download URL for a stored object.
    async fn download_url(&self, path: &str) -> Result<String>;

    /// Delete an object; a missing object is not an error.
    async fn delete_if_exists(&self, path: &str) -> Result<()>;
}

/// File extension of a local photo URI, without query string.
pub fn photo_extension(local_uri: &str) -> &str {
    let without_query = local_uri.split(['?', '#']).next().unwrap_or(local_uri);
    let file_name = without_query.rsplit('/').next().unwrap_or(without_query);
    match file_name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => ext,
        _ => DEFAULT_PHOTO_EXTENSION,
    }
}

/// Storage path of a pet's photo: `users/{owner}/pets/{pet_id}.{ext}`.
pub fn photo_path(owner: &OwnerId, pet_id: &str, local_uri: &str) -> String {
    format!(
        "users/{owner}/pets/{pet_id}.{}",
        photo_extension(local_uri).to_ascii_lowercase()
    )
}

/// Resolved download URLs keyed by storage path.
///
/// A path whose lookup is in progress is held as pending so concurrent
/// refreshes do not request it twice.
#[derive(Debug, Default)]
pub struct PhotoUrlCache {
    entries: HashMap<String, Option<String>>,
}

impl PhotoUrlCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolved URL for `path`, if known.
    pub fn get(&self, path: &str) -> Option<&str> {
        self.entries.get(path).and_then(|url| url.as_deref())
    }

    /// `true` when `path` is resolved or being resolved.
    pub fn contains(&self, path: &str) -> bool {
        self.entries.contains_key(path)
    }

    pub fn is_pending(&self, path: &str) -> bool {
        matches!(self.entries.get(path), Some(None))
    }

    /// Claim a lookup for `path`. Returns `false` if it is already cached or pending.
    pub fn mark_pending(&mut self, path: &str) -> bool {
        if self.entries.contains_key(path) {
            return false;
        }
        self.entries.insert(path.to_owned(), None);
        true
    }

    pub fn set(&mut self, path: &str, url: impl Into<String>) {
        self.entries.insert(path.to_owned(), Some(url.into()));
    }

    pub fn invalidate(&mut self, path: &str) {
        self.entries.remove(path);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Default)]
struct BlobInner {
    objects: HashMap<String, String>,
    failing_downloads: HashSet<String>,
    download_requests: usize,
}

/// Blob store held in process memory. URLs look like `memory://{path}`.
#[derive(Debug, Default)]
pub struct InMemoryBlobStore {
    inner: Mutex<BlobInner>,
}

impl InMemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BlobInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Paths of all stored objects, sorted.
    pub fn paths(&self) -> Vec<String> {
        let mut paths: Vec<_> = self.lock().objects.keys().cloned().collect();
        paths.sort();
        paths
    }

    /// Local URI an object was uploaded from.
    pub fn source_of(&self, path: &str) -> Option<String> {
        self.lock().objects.get(path).cloned()
    }

    /// Make URL lookups for `path` fail until cleared.
    pub fn fail_download_for(&self, path: impl Into<String>) {
        self.lock().failing_downloads.insert(path.into());
    }

    pub fn clear_faults(&self) {
        self.lock().failing_downloads.clear();
    }

    /// Number of `download_url` calls so far.
    pub fn download_requests(&self) -> usize {
        self.lock().download_requests
    }
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
    async fn upload(&self, local_uri: &str, path: &str) -> Result<()> {
        if local_uri.trim().is_empty() {
            return Err(PetCareError::Storage("empty photo uri".to_owned()));
        }
        self.lock()
            .objects
            .insert(path.to_owned(), local_uri.to_owned());
        Ok(())
    }

    async fn download_url(&self, path: &str) -> Result<String> {
        let mut inner = self.lock();
        inner.download_requests += 1;
        if inner.failing_downloads.contains(path) || !inner.objects.contains_key(path) {
            return Err(PetCareError::Storage(format!("no download url for {path}")));
        }
        Ok(format!("memory://{path}"))
    }

    async fn delete_if_exists(&self, path: &str) -> Result<()> {
        self.lock().objects.remove(path);
        Ok(())
    }
}
