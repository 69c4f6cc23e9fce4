//! Host → `TenantConfig` resolution: normalization, the orchestrator HTTP
//! call, schema mapping, credential resolution, and the TTL/LRU cache.

use chrono::{Duration, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::core::{retry_with_backoff, TenantResolutionError};
use crate::tenant::cache::TenantConfigCache;
use crate::tenant::credentials::{self, CredentialResolver};
use crate::tenant::model::{
    AiConfig, Auth0Config, CaptionfileConfig, ConfirmationConfig, ContentConfig, EmailServerConfig,
    FeatureFlags, PublisherConfig, StorageConfig, TenantConfig,
};

const DEFAULT_TTL_SECONDS: i64 = 600;
const MAX_ATTEMPTS: u32 = 3;

/// Normalize a raw `Host` header value: lowercase, strip port, strip a
/// trailing dot. Idempotent: `normalize_host(normalize_host(h)) ==
/// normalize_host(h)`.
pub fn normalize_host(raw: &str) -> Result<String, TenantResolutionError> {
    let dotless = raw.trim().trim_end_matches('.');
    let without_port = dotless.rsplit_once(':').map_or(dotless, |(host, port)| {
        if !port.is_empty() && port.chars().all(|c| c.is_ascii_digit()) { host } else { dotless }
    });
    let trimmed = without_port.to_ascii_lowercase();

    if trimmed.is_empty() || !is_valid_dns_label_sequence(&trimmed) {
        return Err(TenantResolutionError::InvalidHost { host: raw.to_string() });
    }
    Ok(trimmed)
}

fn is_valid_dns_label_sequence(host: &str) -> bool {
    host.split('.').all(|label| {
        !label.is_empty()
            && label.len() <= 63
            && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
            && !label.starts_with('-')
            && !label.ends_with('-')
    })
}

/// Wire shapes returned by the orchestrator's `/v1/runtime/by-host` endpoint.
#[derive(Debug, Deserialize)]
struct RuntimeResponse {
    schema_version: u8,
    tenant_id: String,
    config_version: String,
    #[serde(default = "default_ttl")]
    ttl_seconds: i64,
    #[serde(default)]
    features: FeatureFlags,
    storage: StorageConfig,
    #[serde(default)]
    publishers: Vec<PublisherConfig>,
    #[serde(default)]
    email_server: Option<EmailServerConfig>,
    #[serde(default)]
    ai: AiConfig,
    #[serde(default)]
    captionfile: CaptionfileConfig,
    #[serde(default)]
    confirmation: ConfirmationConfig,
    #[serde(default)]
    content: Option<ContentConfig>,
    #[serde(default)]
    auth0: Option<Auth0Config>,
}

fn default_ttl() -> i64 {
    DEFAULT_TTL_SECONDS
}

impl RuntimeResponse {
    fn into_tenant_config(self, resolved_credentials: std::collections::HashMap<String, String>) -> TenantConfig {
        let (features, publishers, email_server, ai, auth0) = if self.schema_version == 1 {
            // Schema 1 predates publishers/AI: conservative defaults.
            (self.features, Vec::new(), None, AiConfig::default(), None)
        } else {
            (self.features, self.publishers, self.email_server, self.ai, self.auth0)
        };

        TenantConfig {
            tenant_id: self.tenant_id,
            config_version: self.config_version,
            expires_at: Some(Utc::now() + Duration::seconds(self.ttl_seconds.max(0))),
            features,
            storage: self.storage,
            publishers: publishers.into_iter().filter(|p| p.enabled).collect(),
            email_server,
            ai,
            captionfile: self.captionfile,
            confirmation: self.confirmation,
            content: self.content.unwrap_or_default(),
            auth0,
            credentials: resolved_credentials,
        }
    }

    fn validate(&self) -> Result<(), String> {
        if !(1..=2).contains(&self.schema_version) {
            return Err(format!("unsupported schema_version {}", self.schema_version));
        }
        if !self.storage.root.starts_with('/') {
            return Err("storage.root must be absolute".to_string());
        }
        if self.storage.root.contains("..") {
            return Err("storage.root must not contain '..'".to_string());
        }
        for folder in [&self.storage.archive, &self.storage.keep, &self.storage.remove] {
            if folder.contains('/') || folder.contains('\\') || folder.contains("..") {
                return Err(format!("invalid storage subfolder name: {folder}"));
            }
        }
        let mut seen_types = std::collections::HashSet::new();
        for publisher in &self.publishers {
            if !seen_types.insert(publisher.publisher_type) {
                return Err("duplicate publisher type".to_string());
            }
        }
        Ok(())
    }
}

/// Resolves tenant configuration for incoming hostnames, backed by a
/// TTL/LRU cache and falling back to stale-serve when the orchestrator is
/// unreachable.
pub struct TenantResolver {
    client: reqwest::Client,
    orchestrator_base_url: String,
    cache: TenantConfigCache,
    credential_resolver: Box<dyn CredentialResolver>,
}

impl TenantResolver {
    /// Build a resolver against `orchestrator_base_url`, with a cache
    /// bounded to `cache_max_size` entries.
    #[must_use]
    pub fn new(orchestrator_base_url: impl Into<String>, cache_max_size: usize, credential_resolver: Box<dyn CredentialResolver>) -> Self {
        Self {
            client: reqwest::Client::new(),
            orchestrator_base_url: orchestrator_base_url.into(),
            cache: TenantConfigCache::new(cache_max_size),
            credential_resolver,
        }
    }

    /// Resolve `raw_host` to a `TenantConfig`, consulting the cache first.
    pub async fn get_config(&self, raw_host: &str) -> Result<TenantConfig, TenantResolutionError> {
        let host = normalize_host(raw_host)?;
        let now = Utc::now();

        if let Some(config) = self.cache.get_fresh(&host, now) {
            tracing::debug!(host = %host, "runtime_config_cache_hit");
            return Ok(config);
        }
        tracing::debug!(host = %host, "runtime_config_cache_miss");

        match self.fetch_and_resolve(&host).await {
            Ok(config) => {
                self.cache.insert(host, config.clone(), now);
                Ok(config)
            }
            Err(err) => {
                if let Some(stale) = self.cache.get_any(&host) {
                    tracing::warn!(host = %host, error = %err, "runtime_config_cache_stale_serve");
                    return Ok(stale);
                }
                Err(err)
            }
        }
    }

    async fn fetch_and_resolve(&self, host: &str) -> Result<TenantConfig, TenantResolutionError> {
        let request_id = Uuid::new_v4();
        let url = format!("{}/v1/runtime/by-host", self.orchestrator_base_url);

        let response = retry_with_backoff(
            MAX_ATTEMPTS,
            || async {
                self.client
                    .get(&url)
                    .query(&[("host", host)])
                    .header("X-Request-Id", request_id.to_string())
                    .send()
                    .await
            },
            |e: &reqwest::Error| !e.is_status() || e.status().is_some_and(|s| s.is_server_error()),
        )
        .await
        .map_err(|e| TenantResolutionError::OrchestratorUnavailable { host: host.to_string(), source: anyhow::anyhow!(e.to_string()) })?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(TenantResolutionError::TenantNotFound { host: host.to_string() });
        }
        if !response.status().is_success() {
            return Err(TenantResolutionError::OrchestratorUnavailable {
                host: host.to_string(),
                source: anyhow::anyhow!("orchestrator returned status {}", response.status()),
            });
        }

        let body: RuntimeResponse = response
            .json()
            .await
            .map_err(|e| TenantResolutionError::InvalidConfig { host: host.to_string(), detail: e.to_string() })?;

        body.validate().map_err(|detail| TenantResolutionError::InvalidConfig { host: host.to_string(), detail })?;

        let mut refs: Vec<String> = body.publishers.iter().filter_map(|p| p.credentials_ref.clone()).collect();
        if let Some(server) = &body.email_server {
            refs.push(server.password_ref.clone());
        }
        refs.sort();
        refs.dedup();

        let resolved = credentials::resolve_all(self.credential_resolver.as_ref(), refs).await;

        Ok(body.into_tenant_config(resolved))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_host_lowercases_strips_port_and_trailing_dot() {
        assert_eq!(normalize_host("ACME.Example.com:8443.").unwrap(), "acme.example.com");
    }

    #[test]
    fn normalize_host_is_idempotent() {
        let once = normalize_host("ACME.example.com:443").unwrap();
        let twice = normalize_host(&once).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn normalize_host_rejects_empty_label() {
        assert!(normalize_host("acme..example.com").is_err());
    }

    #[test]
    fn normalize_host_rejects_invalid_characters() {
        assert!(normalize_host("acme_bad!host.com").is_err());
    }
}
