//! Dropbox API v2 implementation of `StorageAdapter`.
//!
//! Uses the offline-refresh-token OAuth flow: a long-lived refresh token
//! (from config) is exchanged for a short-lived access token on first use
//! and whenever the API returns 401, then cached in memory.

use std::sync::Arc;
use tokio::sync::RwLock;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use crate::core::{retry_with_backoff, ImageCandidate, PostedState, StorageError};
use crate::storage::traits::{StorageAdapter, is_supported_image, stem};

const META_BASE: &str = "https://api.dropboxapi.com/2";
const CONTENT_BASE: &str = "https://content.dropboxapi.com/2";
const MAX_ATTEMPTS: u32 = 3;

/// Credentials needed to drive the Dropbox offline-access OAuth flow.
#[derive(Debug, Clone)]
pub struct DropboxCredentials {
    /// `DROPBOX_APP_KEY`.
    pub app_key: String,
    /// `DROPBOX_APP_SECRET`.
    pub app_secret: String,
    /// `DROPBOX_REFRESH_TOKEN`.
    pub refresh_token: String,
}

#[derive(Default)]
struct TokenCache {
    access_token: Option<String>,
}

/// `StorageAdapter` backed by a real Dropbox account.
pub struct DropboxAdapter {
    client: reqwest::Client,
    credentials: DropboxCredentials,
    token: Arc<RwLock<TokenCache>>,
}

impl DropboxAdapter {
    /// Build an adapter from resolved credentials. Does not perform any I/O.
    #[must_use]
    pub fn new(credentials: DropboxCredentials) -> Self {
        Self { client: reqwest::Client::new(), credentials, token: Arc::new(RwLock::new(TokenCache::default())) }
    }

    async fn access_token(&self) -> Result<String, StorageError> {
        if let Some(token) = self.token.read().await.access_token.clone() {
            return Ok(token);
        }
        self.refresh_access_token().await
    }

    async fn refresh_access_token(&self) -> Result<String, StorageError> {
        #[derive(Deserialize)]
        struct TokenResponse {
            access_token: String,
        }

        let resp = self
            .client
            .post("https://api.dropboxapi.com/oauth2/token")
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", self.credentials.refresh_token.as_str()),
                ("client_id", self.credentials.app_key.as_str()),
                ("client_secret", self.credentials.app_secret.as_str()),
            ])
            .send()
            .await
            .map_err(|e| StorageError::Auth { detail: format!("token refresh transport error: {e}") })?;

        if !resp.status().is_success() {
            return Err(StorageError::Auth { detail: format!("token refresh rejected: status {}", resp.status()) });
        }

        let parsed: TokenResponse = resp
            .json()
            .await
            .map_err(|e| StorageError::Auth { detail: format!("token refresh response malformed: {e}") })?;

        self.token.write().await.access_token = Some(parsed.access_token.clone());
        Ok(parsed.access_token)
    }

    async fn invalidate_token(&self) {
        self.token.write().await.access_token = None;
    }

    fn classify_status(status: reqwest::StatusCode) -> StorageErrorClass {
        if status == reqwest::StatusCode::UNAUTHORIZED {
            StorageErrorClass::Auth
        } else if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            StorageErrorClass::RateLimited
        } else if status == reqwest::StatusCode::NOT_FOUND || status == reqwest::StatusCode::CONFLICT {
            StorageErrorClass::NotFound
        } else if status.is_server_error() {
            StorageErrorClass::Transient
        } else {
            StorageErrorClass::Permanent
        }
    }

    async fn post_rpc(&self, path: &str, body: serde_json::Value) -> Result<serde_json::Value, StorageError> {
        self.with_retry(|| async {
            let token = self.access_token().await?;
            let resp = self
                .client
                .post(format!("{META_BASE}{path}"))
                .bearer_auth(&token)
                .json(&body)
                .send()
                .await
                .map_err(|e| transient(e.to_string()))?;

            if resp.status() == reqwest::StatusCode::UNAUTHORIZED {
                self.invalidate_token().await;
                return Err(StorageError::Auth { detail: "dropbox rejected access token".to_string() });
            }
            let status = resp.status();
            if !status.is_success() {
                let text = resp.text().await.unwrap_or_default();
                return Err(classify(status, text));
            }
            resp.json::<serde_json::Value>().await.map_err(|e| transient(e.to_string()))
        })
        .await
    }

    async fn with_retry<F, Fut, T>(&self, f: F) -> Result<T, StorageError>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<T, StorageError>>,
    {
        retry_with_backoff(MAX_ATTEMPTS, f, |e: &StorageError| {
            matches!(e.kind(), crate::core::errors::StorageErrorKind::Transient | crate::core::errors::StorageErrorKind::RateLimited)
        })
        .await
    }
}

enum StorageErrorClass {
    Auth,
    RateLimited,
    NotFound,
    Transient,
    Permanent,
}

fn transient(detail: String) -> StorageError {
    StorageError::Transient { source: anyhow::anyhow!(detail.clone()), detail }
}

fn classify(status: reqwest::StatusCode, detail: String) -> StorageError {
    match DropboxAdapter::classify_status(status) {
        StorageErrorClass::Auth => StorageError::Auth { detail },
        StorageErrorClass::RateLimited => StorageError::RateLimited { detail },
        StorageErrorClass::NotFound => StorageError::NotFound { path: detail },
        StorageErrorClass::Transient => StorageError::Transient { source: anyhow::anyhow!(detail.clone()), detail },
        StorageErrorClass::Permanent => StorageError::Permanent { source: anyhow::anyhow!(detail.clone()), detail },
    }
}

#[derive(Deserialize)]
struct ListFolderEntry {
    #[serde(rename = ".tag")]
    tag: String,
    name: String,
    #[serde(default)]
    content_hash: Option<String>,
}

#[derive(Deserialize)]
struct ListFolderResponse {
    entries: Vec<ListFolderEntry>,
    #[serde(default)]
    has_more: bool,
    #[serde(default)]
    cursor: Option<String>,
}

#[async_trait]
impl StorageAdapter for DropboxAdapter {
    async fn list_images(&self, folder: &str) -> Result<Vec<String>, StorageError> {
        Ok(self.list_images_with_hashes(folder).await?.into_iter().map(|c| c.filename).collect())
    }

    async fn list_images_with_hashes(&self, folder: &str) -> Result<Vec<ImageCandidate>, StorageError> {
        let mut out = Vec::new();
        let mut body = self.post_rpc("/files/list_folder", json!({"path": dropbox_path(folder)})).await?;
        loop {
            let page: ListFolderResponse = serde_json::from_value(body.clone())
                .map_err(|e| StorageError::Permanent { source: anyhow::anyhow!(e.to_string()), detail: "malformed list_folder response".to_string() })?;
            for entry in page.entries {
                if entry.tag == "file" && is_supported_image(&entry.name) {
                    out.push(ImageCandidate { filename: entry.name, content_hash: entry.content_hash.unwrap_or_default() });
                }
            }
            if !page.has_more {
                break;
            }
            let Some(cursor) = page.cursor else { break };
            body = self.post_rpc("/files/list_folder/continue", json!({"cursor": cursor})).await?;
        }
        Ok(out)
    }

    async fn download(&self, folder: &str, filename: &str) -> Result<Vec<u8>, StorageError> {
        let path = format!("{}/{filename}", dropbox_path(folder));
        self.with_retry(|| async {
            let token = self.access_token().await?;
            let resp = self
                .client
                .post(format!("{CONTENT_BASE}/files/download"))
                .bearer_auth(&token)
                .header("Dropbox-API-Arg", json!({"path": path}).to_string())
                .send()
                .await
                .map_err(|e| transient(e.to_string()))?;
            if resp.status() == reqwest::StatusCode::UNAUTHORIZED {
                self.invalidate_token().await;
                return Err(StorageError::Auth { detail: "dropbox rejected access token".to_string() });
            }
            let status = resp.status();
            if !status.is_success() {
                let text = resp.text().await.unwrap_or_default();
                return Err(classify(status, text));
            }
            resp.bytes().await.map(|b| b.to_vec()).map_err(|e| transient(e.to_string()))
        })
        .await
    }

    async fn temp_link(&self, folder: &str, filename: &str) -> Result<String, StorageError> {
        let path = format!("{}/{filename}", dropbox_path(folder));
        #[derive(Deserialize)]
        struct LinkResponse {
            link: String,
        }
        let resp = self.post_rpc("/files/get_temporary_link", json!({"path": path})).await?;
        let parsed: LinkResponse = serde_json::from_value(resp)
            .map_err(|e| StorageError::Permanent { source: anyhow::anyhow!(e.to_string()), detail: "malformed temp link response".to_string() })?;
        Ok(parsed.link)
    }

    async fn write_sidecar_text(&self, folder: &str, basename: &str, text: &str) -> Result<(), StorageError> {
        let path = format!("{}/{basename}.txt", dropbox_path(folder));
        self.with_retry(|| async {
            let token = self.access_token().await?;
            let resp = self
                .client
                .post(format!("{CONTENT_BASE}/files/upload"))
                .bearer_auth(&token)
                .header("Dropbox-API-Arg", json!({"path": path, "mode": "overwrite"}).to_string())
                .header("Content-Type", "application/octet-stream")
                .body(text.as_bytes().to_vec())
                .send()
                .await
                .map_err(|e| transient(e.to_string()))?;
            let status = resp.status();
            if !status.is_success() {
                let body = resp.text().await.unwrap_or_default();
                return Err(classify(status, body));
            }
            Ok(())
        })
        .await
    }

    async fn read_sidecar_text(&self, folder: &str, basename: &str) -> Result<Option<String>, StorageError> {
        match self.download(folder, &format!("{basename}.txt")).await {
            Ok(bytes) => Ok(Some(String::from_utf8_lossy(&bytes).into_owned())),
            Err(e) if e.kind() == crate::core::errors::StorageErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn move_with_sidecars(&self, folder: &str, filename: &str, target_subfolder: &str) -> Result<(), StorageError> {
        self.ensure_folder(&format!("{folder}/{target_subfolder}")).await?;

        let from_path = format!("{}/{filename}", dropbox_path(folder));
        let to_path = format!("{}/{target_subfolder}/{filename}", dropbox_path(folder));
        self.post_rpc("/files/move_v2", json!({"from_path": from_path, "to_path": to_path})).await?;

        let base = stem(filename);
        let from_sidecar = format!("{}/{base}.txt", dropbox_path(folder));
        let to_sidecar = format!("{}/{target_subfolder}/{base}.txt", dropbox_path(folder));
        match self.post_rpc("/files/move_v2", json!({"from_path": from_sidecar, "to_path": to_sidecar})).await {
            Ok(_) => {}
            Err(e) if e.kind() == crate::core::errors::StorageErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }
        Ok(())
    }

    async fn ensure_folder(&self, folder: &str) -> Result<(), StorageError> {
        match self.post_rpc("/files/create_folder_v2", json!({"path": dropbox_path(folder)})).await {
            Ok(_) => Ok(()),
            Err(StorageError::Permanent { detail, .. }) if detail.contains("path/conflict") => Ok(()),
            Err(e) => Err(e),
        }
    }

    async fn load_posted_state(&self, root: &str) -> Result<PostedState, StorageError> {
        match self.download(root, "posted.json").await {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map_err(|e| StorageError::Permanent { source: anyhow::anyhow!(e.to_string()), detail: "malformed posted.json".to_string() }),
            Err(e) if e.kind() == crate::core::errors::StorageErrorKind::NotFound => Ok(PostedState::default()),
            Err(e) => Err(e),
        }
    }

    async fn save_posted_state(&self, root: &str, state: &PostedState) -> Result<(), StorageError> {
        let text = serde_json::to_string(state).expect("PostedState always serializes");
        let path = format!("{}/posted.json", dropbox_path(root));
        self.with_retry(|| async {
            let token = self.access_token().await?;
            let resp = self
                .client
                .post(format!("{CONTENT_BASE}/files/upload"))
                .bearer_auth(&token)
                .header("Dropbox-API-Arg", json!({"path": path, "mode": "overwrite"}).to_string())
                .header("Content-Type", "application/octet-stream")
                .body(text.clone().into_bytes())
                .send()
                .await
                .map_err(|e| transient(e.to_string()))?;
            let status = resp.status();
            if !status.is_success() {
                let body = resp.text().await.unwrap_or_default();
                return Err(classify(status, body));
            }
            Ok(())
        })
        .await
    }
}

/// Dropbox's root path convention: `""` is the app folder root, every other
/// path must start with `/` and never end with one.
fn dropbox_path(folder: &str) -> String {
    if folder.is_empty() || folder == "/" {
        String::new()
    } else {
        format!("/{}", folder.trim_matches('/'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dropbox_path_normalizes_root() {
        assert_eq!(dropbox_path(""), "");
        assert_eq!(dropbox_path("/"), "");
        assert_eq!(dropbox_path("incoming"), "/incoming");
        assert_eq!(dropbox_path("/incoming/"), "/incoming");
    }
}
