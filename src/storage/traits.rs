//! Storage adapter contract. Every vendor-specific detail lives behind this
//! trait; the orchestrator and HTTP layer only ever see `StorageError`.

use async_trait::async_trait;

use crate::core::{ImageCandidate, PostedState, StorageError};

/// One content-addressed object-store adapter, scoped to a single tenant's
/// configured root folder set by the caller on each call (the adapter
/// itself is stateless aside from its auth/client handles, so one instance
/// is shared across tenants).
#[async_trait]
pub trait StorageAdapter: Send + Sync {
    /// List image filenames (supported suffixes only) in `folder`.
    async fn list_images(&self, folder: &str) -> Result<Vec<String>, StorageError>;

    /// List images together with the store's native content hash, without
    /// downloading bytes. This is what the dedup-before-download invariant
    /// in the workflow relies on.
    async fn list_images_with_hashes(&self, folder: &str) -> Result<Vec<ImageCandidate>, StorageError>;

    /// Download the full bytes of one image.
    async fn download(&self, folder: &str, filename: &str) -> Result<Vec<u8>, StorageError>;

    /// Issue a short-lived URL suitable for handing to the AI vendor.
    async fn temp_link(&self, folder: &str, filename: &str) -> Result<String, StorageError>;

    /// Overwrite (or create) the sidecar text file for `basename`.
    async fn write_sidecar_text(&self, folder: &str, basename: &str, text: &str) -> Result<(), StorageError>;

    /// Read the sidecar text file for `basename`, if it exists.
    async fn read_sidecar_text(&self, folder: &str, basename: &str) -> Result<Option<String>, StorageError>;

    /// Move an image and its sidecar (if any) from `folder` into
    /// `folder/target_subfolder`. A missing sidecar is not an error; the
    /// image move is authoritative for the result.
    async fn move_with_sidecars(
        &self,
        folder: &str,
        filename: &str,
        target_subfolder: &str,
    ) -> Result<(), StorageError>;

    /// Idempotently ensure `folder` exists.
    async fn ensure_folder(&self, folder: &str) -> Result<(), StorageError>;

    /// Load the dedup ledger from `root/posted.json`. A missing file is not
    /// an error — it means no image has ever been posted yet.
    async fn load_posted_state(&self, root: &str) -> Result<PostedState, StorageError>;

    /// Overwrite `root/posted.json` with `state`.
    async fn save_posted_state(&self, root: &str, state: &PostedState) -> Result<(), StorageError>;
}

/// Strip a path to its basename without extension, e.g. `"a/b/c.jpg" ->
/// "c"`. Shared by the Dropbox adapter and the mock so sidecar naming stays
/// consistent.
#[must_use]
pub fn stem(filename: &str) -> &str {
    let base = filename.rsplit('/').next().unwrap_or(filename);
    match base.rsplit_once('.') {
        Some((stem, _ext)) => stem,
        None => base,
    }
}

const SUPPORTED_SUFFIXES: &[&str] = &[".jpg", ".jpeg", ".png"];

/// True if `filename` has a supported image suffix (case-insensitive).
#[must_use]
pub fn is_supported_image(filename: &str) -> bool {
    let lower = filename.to_ascii_lowercase();
    SUPPORTED_SUFFIXES.iter().any(|suffix| lower.ends_with(suffix))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stem_strips_directory_and_extension() {
        assert_eq!(stem("folder/sub/image.JPG"), "image");
        assert_eq!(stem("image.png"), "image");
        assert_eq!(stem("no_extension"), "no_extension");
    }

    #[test]
    fn is_supported_image_checks_suffix_case_insensitively() {
        assert!(is_supported_image("a.JPG"));
        assert!(is_supported_image("a.png"));
        assert!(!is_supported_image("a.gif"));
        assert!(!is_supported_image("a.txt"));
    }
}
