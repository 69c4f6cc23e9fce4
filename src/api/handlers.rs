//! HTTP handlers for the tenant-facing image surface: config introspection,
//! candidate browsing, and the admin-gated analyze/publish/keep/remove
//! actions that drive `WorkflowOrchestrator`.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::Json;
use axum::extract::{Extension, Path, Query, State};
use dashmap::DashMap;

use crate::ai::AiAdapter;
use crate::api::types::{
    AnalysisResponse, AnalyzeQuery, CachedSidecarResponse, CurationQuery, CurationResponse, FeatureFlagsResponse,
    HealthResponse, ImageResponse, PublishQuery, PublishResponse, PublishersResponse,
};
use crate::core::WorkflowOrchestrator;
use crate::observability::CorrelationId;
use crate::publishers::build_publishers;
use crate::sidecar;
use crate::storage::traits::{StorageAdapter, stem};
use crate::tenant::model::TenantConfig;

use super::types::AppError;

const IMAGE_LIST_CACHE_TTL: Duration = Duration::from_secs(30);

/// Shared state for the image/workflow handlers.
#[derive(Clone)]
pub struct AppState {
    /// The tenant-agnostic object-store adapter; every call is scoped by the
    /// tenant's `storage.root` passed in per-call.
    pub storage: Arc<dyn StorageAdapter>,
    /// The tenant-agnostic AI adapter.
    pub ai: Arc<dyn AiAdapter>,
    /// `GET /api/images/list` results, keyed by tenant id, evicted by
    /// read-time TTL rather than a background sweep.
    pub list_cache: Arc<DashMap<String, (Instant, Vec<String>)>>,
}

impl AppState {
    /// Build state around shared adapters with an empty list cache.
    #[must_use]
    pub fn new(storage: Arc<dyn StorageAdapter>, ai: Arc<dyn AiAdapter>) -> Self {
        Self { storage, ai, list_cache: Arc::new(DashMap::new()) }
    }

    async fn orchestrator(&self, tenant: TenantConfig) -> Result<WorkflowOrchestrator, AppError> {
        let publishers = build_publishers(&tenant);
        Ok(WorkflowOrchestrator::load(self.storage.clone(), self.ai.clone(), publishers, tenant).await?)
    }
}

fn log_completion(endpoint: &str, correlation_id: &CorrelationId, started: Instant) {
    tracing::info!(correlation_id = %correlation_id, duration_ms = started.elapsed().as_millis() as i64, endpoint, "web_request_completed");
}

/// `GET /health`.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

/// `GET /api/config/features`.
pub async fn get_features(Extension(tenant): Extension<TenantConfig>) -> Json<FeatureFlagsResponse> {
    let f = &tenant.features;
    let mut flags = BTreeMap::new();
    flags.insert("analyze_caption_enabled".to_string(), f.analyze_caption_enabled);
    flags.insert("publish_enabled".to_string(), f.publish_enabled);
    flags.insert("keep_enabled".to_string(), f.keep_enabled);
    flags.insert("remove_enabled".to_string(), f.remove_enabled);
    flags.insert("extended_metadata_enabled".to_string(), f.extended_metadata_enabled);
    flags.insert("instagram_enabled".to_string(), f.instagram_enabled);
    Json(FeatureFlagsResponse { flags })
}

/// `GET /api/config/publishers`.
pub async fn get_publishers(Extension(tenant): Extension<TenantConfig>) -> Json<PublishersResponse> {
    let publishers = tenant
        .publishers
        .iter()
        .map(|p| (format!("{:?}", p.publisher_type).to_lowercase(), p.enabled))
        .collect();
    Json(PublishersResponse { publishers })
}

async fn build_image_response(storage: &dyn StorageAdapter, root: &str, filename: &str) -> Result<ImageResponse, AppError> {
    let temp_url = storage.temp_link(root, filename).await?;
    let basename = stem(filename);
    let sidecar_text = storage.read_sidecar_text(root, basename).await?;

    let (sha256, cached) = match sidecar_text.as_deref().map(sidecar::parse).filter(|v| v.is_cache_hit()) {
        Some(view) => {
            let sha256 = view.metadata_value("sha256").map(str::to_string);
            let metadata = view.metadata.iter().cloned().collect::<BTreeMap<_, _>>();
            (sha256, Some(CachedSidecarResponse { sd_caption: view.sd_caption.clone().unwrap_or_default(), metadata }))
        }
        None => (None, None),
    };

    Ok(ImageResponse { filename: filename.to_string(), temp_url, sha256, cached })
}

/// `GET /api/images/random`.
pub async fn get_random_image(
    State(state): State<AppState>,
    Extension(tenant): Extension<TenantConfig>,
    Extension(correlation_id): Extension<CorrelationId>,
) -> Result<Json<ImageResponse>, AppError> {
    let started = Instant::now();
    let candidates = state.storage.list_images_with_hashes(&tenant.storage.root).await?;
    let filename = {
        use rand::Rng as _;
        if candidates.is_empty() {
            None
        } else {
            let idx = rand::rng().random_range(0..candidates.len());
            Some(candidates[idx].filename.clone())
        }
    }
    .ok_or_else(|| AppError::NotFound("no images available".to_string()))?;

    let response = build_image_response(state.storage.as_ref(), &tenant.storage.root, &filename).await?;
    log_completion("images_random", &correlation_id, started);
    Ok(Json(response))
}

/// `GET /api/images/list`.
pub async fn list_images(
    State(state): State<AppState>,
    Extension(tenant): Extension<TenantConfig>,
    Extension(correlation_id): Extension<CorrelationId>,
) -> Result<Json<Vec<String>>, AppError> {
    let started = Instant::now();

    if let Some(entry) = state.list_cache.get(&tenant.tenant_id) {
        if entry.0.elapsed() < IMAGE_LIST_CACHE_TTL {
            let filenames = entry.1.clone();
            log_completion("images_list", &correlation_id, started);
            return Ok(Json(filenames));
        }
    }

    let mut filenames = state.storage.list_images(&tenant.storage.root).await?;
    filenames.sort();
    state.list_cache.insert(tenant.tenant_id.clone(), (Instant::now(), filenames.clone()));

    log_completion("images_list", &correlation_id, started);
    Ok(Json(filenames))
}

/// `GET /api/images/{filename}`.
pub async fn get_image(
    State(state): State<AppState>,
    Extension(tenant): Extension<TenantConfig>,
    Extension(correlation_id): Extension<CorrelationId>,
    Path(filename): Path<String>,
) -> Result<Json<ImageResponse>, AppError> {
    let started = Instant::now();
    let response = build_image_response(state.storage.as_ref(), &tenant.storage.root, &filename).await?;
    log_completion("images_get", &correlation_id, started);
    Ok(Json(response))
}

/// `POST /api/images/{filename}/analyze?force_refresh=bool`.
pub async fn analyze_image(
    State(state): State<AppState>,
    Extension(tenant): Extension<TenantConfig>,
    Extension(correlation_id): Extension<CorrelationId>,
    Path(filename): Path<String>,
    Query(query): Query<AnalyzeQuery>,
) -> Result<Json<AnalysisResponse>, AppError> {
    let started = Instant::now();
    let correlation_str = correlation_id.to_string();
    let orchestrator = state.orchestrator(tenant).await?;
    let outcome = orchestrator.analyze_image(&filename, query.force_refresh, &correlation_str).await?;
    log_completion("images_analyze", &correlation_id, started);
    Ok(Json(outcome.into()))
}

/// `POST /api/images/{filename}/publish`.
pub async fn publish_image(
    State(state): State<AppState>,
    Extension(tenant): Extension<TenantConfig>,
    Extension(correlation_id): Extension<CorrelationId>,
    Path(filename): Path<String>,
    Query(query): Query<PublishQuery>,
) -> Result<Json<PublishResponse>, AppError> {
    let started = Instant::now();
    let correlation_str = correlation_id.to_string();
    let orchestrator = state.orchestrator(tenant).await?;
    let result = orchestrator.execute(Some(&filename), query.preview, query.dry_run, false, &correlation_str).await?;
    log_completion("images_publish", &correlation_id, started);
    Ok(Json(result))
}

/// `POST /api/images/{filename}/keep`.
pub async fn keep_image(
    State(state): State<AppState>,
    Extension(tenant): Extension<TenantConfig>,
    Extension(correlation_id): Extension<CorrelationId>,
    Path(filename): Path<String>,
    Query(query): Query<CurationQuery>,
) -> Result<Json<CurationResponse>, AppError> {
    let started = Instant::now();
    let orchestrator = state.orchestrator(tenant).await?;
    let result = orchestrator.keep_image(&filename, query.preview, false).await?;
    log_completion("images_keep", &correlation_id, started);
    Ok(Json(result))
}

/// `POST /api/images/{filename}/remove`.
pub async fn remove_image(
    State(state): State<AppState>,
    Extension(tenant): Extension<TenantConfig>,
    Extension(correlation_id): Extension<CorrelationId>,
    Path(filename): Path<String>,
    Query(query): Query<CurationQuery>,
) -> Result<Json<CurationResponse>, AppError> {
    let started = Instant::now();
    let orchestrator = state.orchestrator(tenant).await?;
    let result = orchestrator.remove_image(&filename, query.preview, false).await?;
    log_completion("images_remove", &correlation_id, started);
    Ok(Json(result))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::mock::MockAiAdapter;
    use crate::storage::mock::MockStorageAdapter;
    use crate::tenant::model::{AiConfig, CaptionfileConfig, ConfirmationConfig, ContentConfig, FeatureFlags, StorageConfig};

    fn test_tenant(features: FeatureFlags) -> TenantConfig {
        TenantConfig {
            tenant_id: "t1".to_string(),
            config_version: "v1".to_string(),
            expires_at: None,
            features,
            storage: StorageConfig { root: "root".to_string(), archive: "archive".to_string(), keep: "keep".to_string(), remove: "remove".to_string() },
            publishers: Vec::new(),
            email_server: None,
            ai: AiConfig::default(),
            captionfile: CaptionfileConfig::default(),
            confirmation: ConfirmationConfig::default(),
            content: ContentConfig { archive: true },
            auth0: None,
            credentials: std::collections::HashMap::new(),
        }
    }

    #[tokio::test]
    async fn get_random_image_returns_not_found_when_store_is_empty() {
        let storage = Arc::new(MockStorageAdapter::new());
        let ai = Arc::new(MockAiAdapter::new());
        let state = AppState::new(storage, ai);
        let tenant = test_tenant(FeatureFlags::default());
        let correlation_id = CorrelationId::new();

        let result = get_random_image(State(state), Extension(tenant), Extension(correlation_id)).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn list_images_is_sorted_and_cached() {
        let storage = Arc::new(MockStorageAdapter::new());
        storage.seed_image("root", "b.jpg", vec![1], "hB");
        storage.seed_image("root", "a.jpg", vec![2], "hA");
        let ai = Arc::new(MockAiAdapter::new());
        let state = AppState::new(storage.clone(), ai);
        let tenant = test_tenant(FeatureFlags::default());
        let correlation_id = CorrelationId::new();

        let Json(first) = list_images(State(state.clone()), Extension(tenant.clone()), Extension(correlation_id)).await.unwrap();
        assert_eq!(first, vec!["a.jpg".to_string(), "b.jpg".to_string()]);

        storage.seed_image("root", "c.jpg", vec![3], "hC");
        let Json(second) = list_images(State(state), Extension(tenant), Extension(correlation_id)).await.unwrap();
        assert_eq!(second, first, "within the TTL window the cached list should be returned unchanged");
    }

    #[tokio::test]
    async fn analyze_image_rejects_disabled_feature() {
        let storage = Arc::new(MockStorageAdapter::new());
        storage.seed_image("root", "a.jpg", vec![1], "hA");
        let ai = Arc::new(MockAiAdapter::new());
        let state = AppState::new(storage, ai);
        let tenant = test_tenant(FeatureFlags::default());
        let correlation_id = CorrelationId::new();

        let result = analyze_image(
            State(state),
            Extension(tenant),
            Extension(correlation_id),
            Path("a.jpg".to_string()),
            Query(AnalyzeQuery::default()),
        )
        .await;
        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }
}
