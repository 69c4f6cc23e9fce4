//! The end-to-end select → analyze → caption → publish → archive pipeline.
//!
//! Mirrors the reference daemon's `SessionManager`: a struct holding
//! `Arc<dyn ...>` collaborators injected per tenant, with one public
//! operation per lifecycle action and every stage timed and tagged with the
//! same correlation id.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use rand::Rng;
use sha2::{Digest, Sha256};
use tokio::sync::RwLock;

use crate::ai::traits::AiAdapter;
use crate::core::errors::WorkflowError;
use crate::core::models::{AnalysisOutcome, CaptionSpec, CurationResult, PostedState, SidecarIdentity, WorkflowResult};
use crate::publishers::{PublishContext, PublisherEntry};
use crate::sidecar;
use crate::storage::traits::{StorageAdapter, stem};
use crate::tenant::model::TenantConfig;

const DEFAULT_CAPTION_MAX_LENGTH: usize = 2000;

/// Orchestrates one tenant's select/analyze/caption/publish/archive cycle.
pub struct WorkflowOrchestrator {
    storage: Arc<dyn StorageAdapter>,
    ai: Arc<dyn AiAdapter>,
    publishers: Vec<PublisherEntry>,
    config: TenantConfig,
    posted: RwLock<PostedState>,
}

impl WorkflowOrchestrator {
    /// Build an orchestrator already holding a loaded `PostedState`. Use
    /// `load` to construct one by reading `posted.json` from storage first.
    #[must_use]
    pub fn new(
        storage: Arc<dyn StorageAdapter>,
        ai: Arc<dyn AiAdapter>,
        publishers: Vec<PublisherEntry>,
        config: TenantConfig,
        posted: PostedState,
    ) -> Self {
        Self { storage, ai, publishers, config, posted: RwLock::new(posted) }
    }

    /// Build an orchestrator, loading `posted.json` from storage.
    pub async fn load(
        storage: Arc<dyn StorageAdapter>,
        ai: Arc<dyn AiAdapter>,
        publishers: Vec<PublisherEntry>,
        config: TenantConfig,
    ) -> Result<Self, WorkflowError> {
        let posted = storage.load_posted_state(&config.storage.root).await?;
        Ok(Self::new(storage, ai, publishers, config, posted))
    }

    /// Run one full publish cycle. `select_filename` pins a candidate;
    /// otherwise one is chosen uniformly at random from the non-posted set.
    /// `preview_mode` runs everything through analysis but performs no
    /// writes at all. `dry_run` additionally allows publishing but skips
    /// archiving and state updates.
    pub async fn execute(
        &self,
        select_filename: Option<&str>,
        preview_mode: bool,
        dry_run: bool,
        force_refresh: bool,
        correlation_id: &str,
    ) -> Result<WorkflowResult, WorkflowError> {
        let root = self.config.storage.root.clone();
        let mut timings = BTreeMap::new();

        // 1. List + dedup. Posted images are never downloaded.
        let t_list = Instant::now();
        let candidates = self.storage.list_images_with_hashes(&root).await?;
        let posted_snapshot = self.posted.read().await.clone();
        let fresh: Vec<_> = candidates
            .into_iter()
            .filter(|c| !posted_snapshot.contains(None, Some(&c.content_hash)))
            .collect();
        timings.insert("list_ms".to_string(), t_list.elapsed().as_millis() as i64);

        if fresh.is_empty() {
            tracing::info!(correlation_id, "no_new_images");
            return Err(WorkflowError::NoNewImages);
        }

        // 2. Select.
        let t_select = Instant::now();
        let selected = match select_filename {
            Some(name) => fresh
                .iter()
                .find(|c| c.filename == name)
                .cloned()
                .ok_or_else(|| WorkflowError::SelectionNotFound { filename: name.to_string() })?,
            None => {
                let idx = rand::rng().random_range(0..fresh.len());
                fresh[idx].clone()
            }
        };

        let image_bytes = self.storage.download(&root, &selected.filename).await?;
        let sha256 = sha256_hex(&image_bytes);
        if posted_snapshot.contains(Some(&sha256), None) {
            tracing::info!(correlation_id, filename = %selected.filename, "duplicate_by_sha256");
            return Err(WorkflowError::Duplicate { filename: selected.filename.clone() });
        }
        timings.insert("select_ms".to_string(), t_select.elapsed().as_millis() as i64);

        // 3. Analyze + caption.
        let t_analyze = Instant::now();
        let basename = stem(&selected.filename).to_string();
        let existing_text = self.storage.read_sidecar_text(&root, &basename).await.unwrap_or(None);
        let existing_view = existing_text.as_deref().map(sidecar::parse);

        let (analysis, sd_caption, _cache_hit, fresh_analysis) = if !self.config.features.analyze_caption_enabled {
            tracing::info!(correlation_id, "feature_analyze_caption_skipped");
            let cached_caption = existing_view.as_ref().filter(|v| v.is_cache_hit()).and_then(|v| v.sd_caption.clone());
            (crate::core::ImageAnalysis::default(), cached_caption.unwrap_or_default(), true, false)
        } else if let Some(view) = existing_view.as_ref().filter(|v| v.is_cache_hit() && !force_refresh) {
            tracing::info!(correlation_id, filename = %selected.filename, "cache_hit");
            let mut analysis = crate::core::ImageAnalysis::default();
            if let Some(desc) = view.metadata_value("description") {
                analysis.description = desc.to_string();
            }
            (analysis, view.sd_caption.clone().unwrap_or_default(), true, false)
        } else {
            let image_url = self.storage.temp_link(&root, &selected.filename).await?;
            let analysis = self.ai.analyze(&image_url).await?;
            let base_spec = CaptionSpec { platform: "default".to_string(), style: None, max_length: DEFAULT_CAPTION_MAX_LENGTH, hashtags: Vec::new() };
            let (_, sd_caption) = self.ai.create_caption_pair(&analysis, &base_spec).await?;
            (analysis, sd_caption.unwrap_or_default(), false, true)
        };
        timings.insert("analyze_ms".to_string(), t_analyze.elapsed().as_millis() as i64);

        // Per-platform caption renderings for every enabled publisher.
        let mut per_platform_caption = BTreeMap::new();
        for entry in &self.publishers {
            let caption = if fresh_analysis {
                let spec = CaptionSpec {
                    platform: entry.publisher.platform().to_string(),
                    style: entry.config.style.clone(),
                    max_length: entry.config.max_length.unwrap_or(DEFAULT_CAPTION_MAX_LENGTH),
                    hashtags: entry.config.hashtags.clone(),
                };
                match self.ai.create_caption_pair(&analysis, &spec).await {
                    Ok((caption, _)) => caption,
                    Err(_) => sd_caption.clone(),
                }
            } else {
                sd_caption.clone()
            };
            per_platform_caption.insert(entry.publisher.platform().to_string(), caption);
        }

        // 4. Sidecar write (only when fresh analysis ran). Failure is
        // non-fatal: log and continue.
        if fresh_analysis && !preview_mode && !dry_run {
            let identity = SidecarIdentity {
                image_file: selected.filename.clone(),
                content_hash: Some(selected.content_hash.clone()),
                sha256: Some(sha256.clone()),
                created: chrono::Utc::now(),
                sd_caption_version: "1",
                model_version: self.config.ai.model.clone().unwrap_or_else(|| "unknown".to_string()),
            };
            let text = sidecar::build(&sd_caption, &identity, &analysis, self.config.features.extended_metadata_enabled);
            if let Err(e) = self.storage.write_sidecar_text(&root, &basename, &text).await {
                tracing::warn!(correlation_id, error = %e, "sidecar_write_failed");
            }
        }

        if preview_mode {
            return Ok(WorkflowResult {
                correlation_id: correlation_id.to_string(),
                selected_filename: Some(selected.filename),
                any_success: false,
                per_platform: BTreeMap::new(),
                archived: false,
                preview_mode: true,
                dry_run,
                timings,
            });
        }

        // 5. Publish.
        let t_publish = Instant::now();
        let (per_platform, any_success) = if !self.config.features.publish_enabled {
            tracing::info!(correlation_id, "feature_publish_skipped");
            (BTreeMap::new(), false)
        } else {
            let futures: Vec<std::pin::Pin<Box<dyn std::future::Future<Output = crate::core::PublishResult> + Send>>> = self
                .publishers
                .iter()
                .map(|entry| {
                    let caption = per_platform_caption.get(entry.publisher.platform()).cloned().unwrap_or_default();
                    let bytes = image_bytes.clone();
                    let filename = selected.filename.clone();
                    let publisher = Arc::clone(&entry.publisher);
                    let fut: std::pin::Pin<Box<dyn std::future::Future<Output = crate::core::PublishResult> + Send>> = Box::pin(async move {
                        let ctx = PublishContext { image_bytes: &bytes, filename: &filename, caption: &caption };
                        publisher.publish(&ctx).await
                    });
                    fut
                })
                .collect();
            let results = futures::future::join_all(futures).await;
            let any_success = results.iter().any(|r| r.success);
            let map: BTreeMap<String, crate::core::PublishResult> = results.into_iter().map(|r| (r.platform.clone(), r)).collect();
            (map, any_success)
        };
        timings.insert("publish_ms".to_string(), t_publish.elapsed().as_millis() as i64);

        // 6. Archive.
        let mut archived = false;
        if self.config.content.archive && any_success && !dry_run {
            let t_archive = Instant::now();
            match self.storage.move_with_sidecars(&root, &selected.filename, &self.config.storage.archive).await {
                Ok(()) => {
                    archived = true;
                    let mut guard = self.posted.write().await;
                    guard.record(Some(sha256.clone()), Some(selected.content_hash.clone()));
                    let snapshot = guard.clone();
                    drop(guard);
                    if let Err(e) = self.storage.save_posted_state(&root, &snapshot).await {
                        tracing::warn!(correlation_id, error = %e, "posted_state_save_failed");
                    }
                }
                Err(e) => tracing::warn!(correlation_id, error = %e, "archive_failed"),
            }
            timings.insert("archive_ms".to_string(), t_archive.elapsed().as_millis() as i64);
        }

        Ok(WorkflowResult {
            correlation_id: correlation_id.to_string(),
            selected_filename: Some(selected.filename),
            any_success,
            per_platform,
            archived,
            preview_mode: false,
            dry_run,
            timings,
        })
    }

    /// Resolve an image's analysis/caption without touching the publish
    /// pipeline: sidecar-first unless `force_refresh`, otherwise a live AI
    /// call whose result is written back to the sidecar for next time.
    pub async fn analyze_image(&self, filename: &str, force_refresh: bool, correlation_id: &str) -> Result<AnalysisOutcome, WorkflowError> {
        if !self.config.features.analyze_caption_enabled {
            return Err(WorkflowError::FeatureDisabled { feature: "analyze_caption_enabled".to_string() });
        }

        let root = self.config.storage.root.clone();
        let basename = stem(filename).to_string();
        let existing_text = self.storage.read_sidecar_text(&root, &basename).await?;
        let existing_view = existing_text.as_deref().map(sidecar::parse);

        if let Some(view) = existing_view.as_ref().filter(|v| v.is_cache_hit() && !force_refresh) {
            tracing::info!(correlation_id, filename, "web_analyze_sidecar_cache_hit");
            return Ok(AnalysisOutcome { analysis: analysis_from_view(view), sd_caption: view.sd_caption.clone().unwrap_or_default(), cache_hit: true });
        }

        let image_url = self.storage.temp_link(&root, filename).await?;
        let analysis = self.ai.analyze(&image_url).await?;
        let base_spec = CaptionSpec { platform: "default".to_string(), style: None, max_length: DEFAULT_CAPTION_MAX_LENGTH, hashtags: Vec::new() };
        let (_, sd_caption) = self.ai.create_caption_pair(&analysis, &base_spec).await?;
        let sd_caption = sd_caption.unwrap_or_default();

        let identity = SidecarIdentity {
            image_file: filename.to_string(),
            content_hash: None,
            sha256: None,
            created: chrono::Utc::now(),
            sd_caption_version: "1",
            model_version: self.config.ai.model.clone().unwrap_or_else(|| "unknown".to_string()),
        };
        let text = sidecar::build(&sd_caption, &identity, &analysis, self.config.features.extended_metadata_enabled);
        if let Err(e) = self.storage.write_sidecar_text(&root, &basename, &text).await {
            tracing::warn!(correlation_id, error = %e, "sidecar_write_failed");
        }

        Ok(AnalysisOutcome { analysis, sd_caption, cache_hit: false })
    }

    /// Move `filename` into the tenant's `keep` subfolder.
    pub async fn keep_image(&self, filename: &str, preview_mode: bool, dry_run: bool) -> Result<CurationResult, WorkflowError> {
        self.curate(filename, "keep", self.config.storage.keep.clone(), self.config.features.keep_enabled, preview_mode, dry_run).await
    }

    /// Move `filename` into the tenant's `remove` subfolder.
    pub async fn remove_image(&self, filename: &str, preview_mode: bool, dry_run: bool) -> Result<CurationResult, WorkflowError> {
        self.curate(filename, "remove", self.config.storage.remove.clone(), self.config.features.remove_enabled, preview_mode, dry_run).await
    }

    async fn curate(
        &self,
        filename: &str,
        action: &str,
        destination_folder: String,
        feature_enabled: bool,
        preview_mode: bool,
        dry_run: bool,
    ) -> Result<CurationResult, WorkflowError> {
        if !feature_enabled {
            return Err(WorkflowError::FeatureDisabled { feature: format!("{action}_enabled") });
        }
        if destination_folder.is_empty()
            || destination_folder.contains('/')
            || destination_folder.contains('\\')
            || destination_folder.contains("..")
        {
            return Err(WorkflowError::InvalidFolderName { name: destination_folder.to_string() });
        }

        if preview_mode || dry_run {
            tracing::info!(filename, action, "curation_preview");
            return Ok(CurationResult {
                filename: filename.to_string(),
                action: action.to_string(),
                destination_folder: destination_folder.to_string(),
                preview_only: true,
            });
        }

        self.storage.move_with_sidecars(&self.config.storage.root, filename, &destination_folder).await?;
        Ok(CurationResult {
            filename: filename.to_string(),
            action: action.to_string(),
            destination_folder: destination_folder.to_string(),
            preview_only: false,
        })
    }
}

fn analysis_from_view(view: &crate::core::models::SidecarView) -> crate::core::ImageAnalysis {
    let mut analysis = crate::core::ImageAnalysis::default();
    if let Some(desc) = view.metadata_value("description") {
        analysis.description = desc.to_string();
    }
    if let Some(raw) = view.metadata_value("tags") {
        if let serde_json::Value::Array(items) = sidecar::metadata_as_json(raw) {
            analysis.tags = items.into_iter().filter_map(|v| v.as_str().map(str::to_string)).collect();
        }
    }
    if let Some(mood) = view.metadata_value("mood") {
        analysis.mood = Some(mood.to_string());
    }
    analysis
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::mock::MockAiAdapter;
    use crate::storage::mock::MockStorageAdapter;
    use crate::tenant::model::{ContentConfig, FeatureFlags, StorageConfig};

    fn test_config(features: FeatureFlags) -> TenantConfig {
        TenantConfig {
            tenant_id: "t1".to_string(),
            config_version: "v1".to_string(),
            expires_at: None,
            features,
            storage: StorageConfig { root: "root".to_string(), archive: "archive".to_string(), keep: "keep".to_string(), remove: "remove".to_string() },
            publishers: Vec::new(),
            email_server: None,
            ai: crate::tenant::model::AiConfig::default(),
            captionfile: crate::tenant::model::CaptionfileConfig::default(),
            confirmation: crate::tenant::model::ConfirmationConfig::default(),
            content: ContentConfig { archive: true },
            auth0: None,
            credentials: std::collections::HashMap::new(),
        }
    }

    fn all_enabled() -> FeatureFlags {
        FeatureFlags { analyze_caption_enabled: true, publish_enabled: true, keep_enabled: true, remove_enabled: true, extended_metadata_enabled: false, instagram_enabled: false }
    }

    #[tokio::test]
    async fn no_candidates_returns_no_new_images() {
        let storage = Arc::new(MockStorageAdapter::new());
        let ai = Arc::new(MockAiAdapter::new());
        let orchestrator = WorkflowOrchestrator::new(storage, ai, Vec::new(), test_config(all_enabled()), PostedState::default());
        let result = orchestrator.execute(None, false, false, false, "corr-1").await;
        assert!(matches!(result, Err(WorkflowError::NoNewImages)));
    }

    #[tokio::test]
    async fn posted_images_are_never_downloaded() {
        let storage = Arc::new(MockStorageAdapter::new());
        storage.seed_image("root", "a.jpg", vec![1, 2, 3], "hA");
        let mut posted = PostedState::default();
        posted.record(None, Some("hA".to_string()));

        let ai = Arc::new(MockAiAdapter::new());
        let orchestrator = WorkflowOrchestrator::new(storage.clone(), ai, Vec::new(), test_config(all_enabled()), posted);
        let result = orchestrator.execute(None, false, false, false, "corr-1").await;

        assert!(matches!(result, Err(WorkflowError::NoNewImages)));
        assert_eq!(storage.download_count(), 0);
    }

    #[tokio::test]
    async fn successful_publish_archives_and_records_state() {
        let storage = Arc::new(MockStorageAdapter::new());
        storage.seed_image("root", "a.jpg", vec![1, 2, 3], "hA");
        storage.ensure_folder("root/archive").await.unwrap();

        let ai = Arc::new(MockAiAdapter::new());
        let publisher = Arc::new(crate::publishers::mock::MockPublisher::new("telegram"));
        let entry = PublisherEntry {
            publisher: publisher.clone(),
            config: crate::tenant::model::PublisherConfig {
                publisher_type: crate::tenant::model::PublisherType::Telegram,
                enabled: true,
                credentials_ref: None,
                username: None,
                style: None,
                max_length: None,
                hashtags: Vec::new(),
            },
        };

        let orchestrator = WorkflowOrchestrator::new(storage.clone(), ai, vec![entry], test_config(all_enabled()), PostedState::default());
        let result = orchestrator.execute(Some("a.jpg"), false, false, false, "corr-1").await.unwrap();

        assert!(result.any_success);
        assert!(result.archived);
        assert_eq!(publisher.call_count(), 1);
        assert!(storage.read_sidecar_text("root/archive", "a").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn preview_mode_never_archives_or_publishes() {
        let storage = Arc::new(MockStorageAdapter::new());
        storage.seed_image("root", "a.jpg", vec![1, 2, 3], "hA");

        let ai = Arc::new(MockAiAdapter::new());
        let publisher = Arc::new(crate::publishers::mock::MockPublisher::new("telegram"));
        let entry = PublisherEntry {
            publisher: publisher.clone(),
            config: crate::tenant::model::PublisherConfig {
                publisher_type: crate::tenant::model::PublisherType::Telegram,
                enabled: true,
                credentials_ref: None,
                username: None,
                style: None,
                max_length: None,
                hashtags: Vec::new(),
            },
        };

        let orchestrator = WorkflowOrchestrator::new(storage.clone(), ai, vec![entry], test_config(all_enabled()), PostedState::default());
        let result = orchestrator.execute(Some("a.jpg"), true, false, false, "corr-1").await.unwrap();

        assert!(result.preview_mode);
        assert!(!result.archived);
        assert_eq!(publisher.call_count(), 0);
        assert!(storage.read_sidecar_text("root", "a").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn dry_run_publishes_but_never_writes_the_sidecar_or_archives() {
        let storage = Arc::new(MockStorageAdapter::new());
        storage.seed_image("root", "a.jpg", vec![1, 2, 3], "hA");

        let ai = Arc::new(MockAiAdapter::new());
        let publisher = Arc::new(crate::publishers::mock::MockPublisher::new("telegram"));
        let entry = PublisherEntry {
            publisher: publisher.clone(),
            config: crate::tenant::model::PublisherConfig {
                publisher_type: crate::tenant::model::PublisherType::Telegram,
                enabled: true,
                credentials_ref: None,
                username: None,
                style: None,
                max_length: None,
                hashtags: Vec::new(),
            },
        };

        let orchestrator = WorkflowOrchestrator::new(storage.clone(), ai, vec![entry], test_config(all_enabled()), PostedState::default());
        let result = orchestrator.execute(Some("a.jpg"), false, true, false, "corr-1").await.unwrap();

        assert!(result.dry_run);
        assert!(!result.archived);
        assert_eq!(publisher.call_count(), 1);
        assert!(storage.read_sidecar_text("root", "a").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn disabled_publish_feature_skips_publish_and_archive() {
        let storage = Arc::new(MockStorageAdapter::new());
        storage.seed_image("root", "a.jpg", vec![1, 2, 3], "hA");

        let ai = Arc::new(MockAiAdapter::new());
        let publisher = Arc::new(crate::publishers::mock::MockPublisher::new("telegram"));
        let entry = PublisherEntry {
            publisher: publisher.clone(),
            config: crate::tenant::model::PublisherConfig {
                publisher_type: crate::tenant::model::PublisherType::Telegram,
                enabled: true,
                credentials_ref: None,
                username: None,
                style: None,
                max_length: None,
                hashtags: Vec::new(),
            },
        };

        let mut features = all_enabled();
        features.publish_enabled = false;
        let orchestrator = WorkflowOrchestrator::new(storage.clone(), ai, vec![entry], test_config(features), PostedState::default());
        let result = orchestrator.execute(Some("a.jpg"), false, false, false, "corr-1").await.unwrap();

        assert!(!result.any_success);
        assert!(!result.archived);
        assert_eq!(publisher.call_count(), 0);
    }

    #[tokio::test]
    async fn analyze_uses_sidecar_cache_without_calling_ai() {
        let storage = Arc::new(MockStorageAdapter::new());
        storage.seed_image("root", "a.jpg", vec![1, 2, 3], "hA");
        storage.seed_sidecar("root", "a", "a cached caption\n# ---\n# image_file: a.jpg\n# description: a test image\n");
        let ai = Arc::new(MockAiAdapter::new());
        let orchestrator = WorkflowOrchestrator::new(storage, ai.clone(), Vec::new(), test_config(all_enabled()), PostedState::default());

        let outcome = orchestrator.analyze_image("a.jpg", false, "corr-1").await.unwrap();

        assert!(outcome.cache_hit);
        assert_eq!(outcome.sd_caption, "a cached caption");
        assert_eq!(ai.analyze_call_count(), 0);
        assert_eq!(ai.caption_call_count(), 0);
    }

    #[tokio::test]
    async fn analyze_force_refresh_bypasses_the_cache_and_rewrites_it() {
        let storage = Arc::new(MockStorageAdapter::new());
        storage.seed_image("root", "a.jpg", vec![1, 2, 3], "hA");
        storage.seed_sidecar("root", "a", "a cached caption\n# ---\n# image_file: a.jpg\n");
        let ai = Arc::new(MockAiAdapter::new());
        let orchestrator = WorkflowOrchestrator::new(storage.clone(), ai.clone(), Vec::new(), test_config(all_enabled()), PostedState::default());

        let outcome = orchestrator.analyze_image("a.jpg", true, "corr-1").await.unwrap();

        assert!(!outcome.cache_hit);
        assert_eq!(ai.analyze_call_count(), 1);
        assert_eq!(ai.caption_call_count(), 1);
        assert_eq!(outcome.sd_caption, "a test sd_caption");
        let rewritten = storage.read_sidecar_text("root", "a").await.unwrap().unwrap();
        assert!(rewritten.starts_with("a test sd_caption"));
    }

    #[tokio::test]
    async fn analyze_requires_feature_enabled() {
        let storage = Arc::new(MockStorageAdapter::new());
        let ai = Arc::new(MockAiAdapter::new());
        let mut features = all_enabled();
        features.analyze_caption_enabled = false;
        let orchestrator = WorkflowOrchestrator::new(storage, ai, Vec::new(), test_config(features), PostedState::default());
        let result = orchestrator.analyze_image("a.jpg", false, "corr-1").await;
        assert!(matches!(result, Err(WorkflowError::FeatureDisabled { .. })));
    }

    #[tokio::test]
    async fn keep_requires_feature_enabled() {
        let storage = Arc::new(MockStorageAdapter::new());
        let ai = Arc::new(MockAiAdapter::new());
        let mut features = all_enabled();
        features.keep_enabled = false;
        let orchestrator = WorkflowOrchestrator::new(storage, ai, Vec::new(), test_config(features), PostedState::default());
        let result = orchestrator.keep_image("a.jpg", false, false).await;
        assert!(matches!(result, Err(WorkflowError::FeatureDisabled { .. })));
    }

    #[tokio::test]
    async fn keep_preview_mode_does_not_move_the_image() {
        let storage = Arc::new(MockStorageAdapter::new());
        storage.seed_image("root", "a.jpg", vec![1], "hA");
        let ai = Arc::new(MockAiAdapter::new());
        let orchestrator = WorkflowOrchestrator::new(storage.clone(), ai, Vec::new(), test_config(all_enabled()), PostedState::default());
        let result = orchestrator.keep_image("a.jpg", true, false).await.unwrap();
        assert!(result.preview_only);
        assert!(storage.download("root", "a.jpg").await.is_ok());
    }
}
