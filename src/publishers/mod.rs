//! Publisher set: one `Publisher` implementation per outbound channel, built
//! behind a tagged factory keyed by `TenantConfig`'s `publishers[].type`.

use std::sync::Arc;

use async_trait::async_trait;

use crate::core::PublishResult;
use crate::tenant::model::{PublisherConfig, PublisherType, TenantConfig};

/// Telegram Bot API publisher.
pub mod telegram;
/// SMTP (email / FetLife) publisher.
pub mod email;
/// Instagram publisher stub (feature-flagged, minimal surface).
pub mod instagram;
/// In-memory mock used by workflow tests.
pub mod mock;

/// One context value passed to every publisher call: the caption variants
/// already rendered for that platform and the image bytes/URL.
pub struct PublishContext<'a> {
    /// Image bytes to attach/upload.
    pub image_bytes: &'a [u8],
    /// Image filename, for attachment naming.
    pub filename: &'a str,
    /// Caption text tailored to this publisher's platform rules.
    pub caption: &'a str,
}

/// Uniform publish interface. Implementors never propagate errors out of
/// `publish` — failures are captured in `PublishResult`.
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Platform name, used as the `per_platform` map key and in logs.
    fn platform(&self) -> &'static str;

    /// Run the publish. Must not panic; any internal error is captured into
    /// `PublishResult::success = false`.
    async fn publish(&self, ctx: &PublishContext<'_>) -> PublishResult;
}

/// A constructed publisher paired with the config entry it was built from,
/// so callers (the workflow orchestrator) can render per-platform captions
/// using `style`/`max_length`/`hashtags` without re-deriving them.
pub struct PublisherEntry {
    /// The constructed publisher.
    pub publisher: Arc<dyn Publisher>,
    /// The config entry it was built from.
    pub config: PublisherConfig,
}

/// Build the enabled publisher set for one tenant. Disabled publishers
/// (`enabled=false`, or `type=instagram` without `features.instagram_enabled`)
/// are never constructed, so a disabled publisher's credentials are never
/// touched or logged.
#[must_use]
pub fn build_publishers(config: &TenantConfig) -> Vec<PublisherEntry> {
    config
        .publishers
        .iter()
        .filter(|p| p.enabled)
        .filter_map(|p| build_one(p, config).map(|publisher| PublisherEntry { publisher, config: p.clone() }))
        .collect()
}

fn build_one(publisher: &PublisherConfig, config: &TenantConfig) -> Option<Arc<dyn Publisher>> {
    match publisher.publisher_type {
        PublisherType::Telegram => {
            let token = config.credentials.get(publisher.credentials_ref.as_deref()?)?.clone();
            Some(Arc::new(telegram::TelegramPublisher::new(token)))
        }
        PublisherType::Email | PublisherType::Fetlife => {
            let server = config.email_server.as_ref()?;
            let password = config.credentials.get(&server.password_ref)?.clone();
            Some(Arc::new(email::EmailPublisher::new(server.clone(), password, publisher.publisher_type)))
        }
        PublisherType::Instagram => {
            if !config.features.instagram_enabled {
                return None;
            }
            let password = config.credentials.get(publisher.credentials_ref.as_deref()?)?.clone();
            Some(Arc::new(instagram::InstagramPublisher::new(publisher.username.clone().unwrap_or_default(), password)))
        }
    }
}
