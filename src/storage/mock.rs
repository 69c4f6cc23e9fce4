//! In-memory `StorageAdapter` used by workflow and HTTP-layer tests.
//!
//! Mirrors the reference daemon's `MockGitBackend`: a `RwLock`-guarded
//! in-memory map standing in for the vendor, plus an injectable failure
//! flag so tests can exercise the error paths without a live Dropbox app.

use std::collections::BTreeMap;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::core::{ImageCandidate, PostedState, StorageError};
use crate::storage::traits::{StorageAdapter, stem};

#[derive(Debug, Clone)]
struct StoredImage {
    bytes: Vec<u8>,
    content_hash: String,
}

/// An in-memory object store scoped to one tenant's folder tree.
#[derive(Default)]
pub struct MockStorageAdapter {
    images: RwLock<BTreeMap<String, StoredImage>>,
    sidecars: RwLock<BTreeMap<String, String>>,
    folders: RwLock<std::collections::BTreeSet<String>>,
    fail_next_download: std::sync::atomic::AtomicBool,
    download_calls: std::sync::atomic::AtomicUsize,
}

impl MockStorageAdapter {
    /// Construct an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an image at `folder/filename` with the given content hash.
    pub fn seed_image(&self, folder: &str, filename: &str, bytes: Vec<u8>, content_hash: impl Into<String>) {
        let key = format!("{folder}/{filename}");
        self.images.write().expect("poisoned").insert(key, StoredImage { bytes, content_hash: content_hash.into() });
        self.folders.write().expect("poisoned").insert(folder.to_string());
    }

    /// Seed sidecar text for `folder/basename.txt`.
    pub fn seed_sidecar(&self, folder: &str, basename: &str, text: impl Into<String>) {
        let key = format!("{folder}/{basename}.txt");
        self.sidecars.write().expect("poisoned").insert(key, text.into());
    }

    /// Number of times `download` has been called, for the dedup
    /// "never downloads a posted image" invariant test.
    #[must_use]
    pub fn download_count(&self) -> usize {
        self.download_calls.load(std::sync::atomic::Ordering::SeqCst)
    }

    /// Force the next `download` call to fail (simulating a transient
    /// network error).
    pub fn fail_next_download(&self) {
        self.fail_next_download.store(true, std::sync::atomic::Ordering::SeqCst);
    }
}

#[async_trait]
impl StorageAdapter for MockStorageAdapter {
    async fn list_images(&self, folder: &str) -> Result<Vec<String>, StorageError> {
        let prefix = format!("{folder}/");
        Ok(self
            .images
            .read()
            .expect("poisoned")
            .keys()
            .filter_map(|k| k.strip_prefix(&prefix).map(str::to_string))
            .collect())
    }

    async fn list_images_with_hashes(&self, folder: &str) -> Result<Vec<ImageCandidate>, StorageError> {
        let prefix = format!("{folder}/");
        Ok(self
            .images
            .read()
            .expect("poisoned")
            .iter()
            .filter_map(|(k, v)| {
                k.strip_prefix(&prefix)
                    .map(|filename| ImageCandidate { filename: filename.to_string(), content_hash: v.content_hash.clone() })
            })
            .collect())
    }

    async fn download(&self, folder: &str, filename: &str) -> Result<Vec<u8>, StorageError> {
        self.download_calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        if self.fail_next_download.swap(false, std::sync::atomic::Ordering::SeqCst) {
            return Err(StorageError::Transient { source: anyhow::anyhow!("simulated failure"), detail: "mock download failure".to_string() });
        }
        let key = format!("{folder}/{filename}");
        self.images
            .read()
            .expect("poisoned")
            .get(&key)
            .map(|img| img.bytes.clone())
            .ok_or_else(|| StorageError::NotFound { path: key })
    }

    async fn temp_link(&self, folder: &str, filename: &str) -> Result<String, StorageError> {
        let key = format!("{folder}/{filename}");
        if !self.images.read().expect("poisoned").contains_key(&key) {
            return Err(StorageError::NotFound { path: key });
        }
        Ok(format!("https://mock.storage.invalid/{key}"))
    }

    async fn write_sidecar_text(&self, folder: &str, basename: &str, text: &str) -> Result<(), StorageError> {
        let key = format!("{folder}/{basename}.txt");
        self.sidecars.write().expect("poisoned").insert(key, text.to_string());
        Ok(())
    }

    async fn read_sidecar_text(&self, folder: &str, basename: &str) -> Result<Option<String>, StorageError> {
        let key = format!("{folder}/{basename}.txt");
        Ok(self.sidecars.read().expect("poisoned").get(&key).cloned())
    }

    async fn move_with_sidecars(&self, folder: &str, filename: &str, target_subfolder: &str) -> Result<(), StorageError> {
        let src_key = format!("{folder}/{filename}");
        let dest_folder = format!("{folder}/{target_subfolder}");
        let dest_key = format!("{dest_folder}/{filename}");

        let image = self
            .images
            .write()
            .expect("poisoned")
            .remove(&src_key)
            .ok_or_else(|| StorageError::NotFound { path: src_key.clone() })?;
        self.images.write().expect("poisoned").insert(dest_key, image);
        self.folders.write().expect("poisoned").insert(dest_folder.clone());

        let stem = stem(filename);
        let src_sidecar_key = format!("{folder}/{stem}.txt");
        if let Some(text) = self.sidecars.write().expect("poisoned").remove(&src_sidecar_key) {
            let dest_sidecar_key = format!("{dest_folder}/{stem}.txt");
            self.sidecars.write().expect("poisoned").insert(dest_sidecar_key, text);
        }
        Ok(())
    }

    async fn ensure_folder(&self, folder: &str) -> Result<(), StorageError> {
        self.folders.write().expect("poisoned").insert(folder.to_string());
        Ok(())
    }

    async fn load_posted_state(&self, root: &str) -> Result<PostedState, StorageError> {
        let key = format!("{root}/posted.json");
        match self.sidecars.read().expect("poisoned").get(&key) {
            Some(text) => Ok(serde_json::from_str(text).unwrap_or_default()),
            None => Ok(PostedState::default()),
        }
    }

    async fn save_posted_state(&self, root: &str, state: &PostedState) -> Result<(), StorageError> {
        let key = format!("{root}/posted.json");
        let text = serde_json::to_string(state).expect("PostedState always serializes");
        self.sidecars.write().expect("poisoned").insert(key, text);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn list_images_with_hashes_excludes_other_folders() {
        let store = MockStorageAdapter::new();
        store.seed_image("root", "a.jpg", vec![1, 2, 3], "hA");
        store.seed_image("root/archive", "old.jpg", vec![9], "hOld");

        let candidates = store.list_images_with_hashes("root").await.unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].filename, "a.jpg");
    }

    #[tokio::test]
    async fn move_with_sidecars_relocates_both_image_and_txt() {
        let store = MockStorageAdapter::new();
        store.seed_image("root", "a.jpg", vec![1], "hA");
        store.seed_sidecar("root", "a", "caption\n# ---\n");

        store.move_with_sidecars("root", "a.jpg", "archive").await.unwrap();

        assert!(store.download("root/archive", "a.jpg").await.is_ok());
        assert!(store.read_sidecar_text("root/archive", "a").await.unwrap().is_some());
        assert!(store.download("root", "a.jpg").await.is_err());
    }

    #[tokio::test]
    async fn move_with_sidecars_succeeds_when_sidecar_absent() {
        let store = MockStorageAdapter::new();
        store.seed_image("root", "a.jpg", vec![1], "hA");
        store.move_with_sidecars("root", "a.jpg", "archive").await.unwrap();
        assert!(store.read_sidecar_text("root/archive", "a").await.unwrap().is_none());
    }
}
