//! The fully-resolved per-tenant runtime configuration and the orchestrator
//! wire schema it is built from.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Feature gates, read once per `execute` run per the "feature gates are
/// read-once" invariant.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeatureFlags {
    /// Gates the analyze+caption stage; when false, cached sidecar data (if
    /// any) is used as-is and no AI calls are made.
    #[serde(default)]
    pub analyze_caption_enabled: bool,
    /// Gates the publish + archive stages entirely.
    #[serde(default)]
    pub publish_enabled: bool,
    /// Gates the keep curation action.
    #[serde(default)]
    pub keep_enabled: bool,
    /// Gates the remove curation action.
    #[serde(default)]
    pub remove_enabled: bool,
    /// Gates phase-2 extended sidecar metadata.
    #[serde(default)]
    pub extended_metadata_enabled: bool,
    /// Gates constructing the Instagram publisher at all.
    #[serde(default)]
    pub instagram_enabled: bool,
}

/// Object-store layout for this tenant.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Absolute root folder candidates are listed from.
    pub root: String,
    /// Subfolder images are archived into after a successful publish.
    #[serde(default = "default_archive_folder")]
    pub archive: String,
    /// Subfolder for the "keep" curation action.
    #[serde(default = "default_keep_folder")]
    pub keep: String,
    /// Subfolder for the "remove" curation action.
    #[serde(default = "default_remove_folder")]
    pub remove: String,
}

fn default_archive_folder() -> String {
    "archive".to_string()
}
fn default_keep_folder() -> String {
    "keep".to_string()
}
fn default_remove_folder() -> String {
    "remove".to_string()
}

/// Publisher platform tag, drives the tagged factory in `publishers::build_publishers`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PublisherType {
    /// Telegram Bot API.
    Telegram,
    /// Direct SMTP email.
    Email,
    /// FetLife, published over the tenant's shared `email_server`.
    Fetlife,
    /// Instagram (behind `features.instagram_enabled`).
    Instagram,
}

/// One entry of the `publishers[]` orchestrator field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublisherConfig {
    /// Which platform this is.
    #[serde(rename = "type")]
    pub publisher_type: PublisherType,
    /// Whether this publisher is active for the tenant.
    #[serde(default)]
    pub enabled: bool,
    /// Opaque credential reference, resolved by the credential resolver.
    /// `None` is valid and expected for `type=fetlife`, which shares the
    /// tenant's `email_server.password_ref` instead.
    #[serde(default)]
    pub credentials_ref: Option<String>,
    /// Platform username/handle, when the platform needs one (Instagram).
    #[serde(default)]
    pub username: Option<String>,
    /// Platform-specific style override.
    #[serde(default)]
    pub style: Option<String>,
    /// Platform-specific caption length cap; falls back to a per-platform
    /// default when absent.
    #[serde(default)]
    pub max_length: Option<usize>,
    /// Hashtags to consider appending.
    #[serde(default)]
    pub hashtags: Vec<String>,
}

/// SMTP server configuration shared by the email and FetLife publishers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailServerConfig {
    /// SMTP host (mapped from the orchestrator's `host` field).
    #[serde(alias = "host")]
    pub smtp_server: String,
    /// SMTP port (mapped from the orchestrator's `port` field).
    #[serde(alias = "port", default = "default_smtp_port")]
    pub smtp_port: u16,
    /// `From:` address (mapped from the orchestrator's `from_email` field).
    #[serde(alias = "from_email")]
    pub sender: String,
    /// Recipient address.
    pub recipient: String,
    /// Whether to use STARTTLS (true) or implicit TLS/plaintext (false).
    #[serde(default = "default_true")]
    pub use_tls: bool,
    /// Opaque credential reference for the SMTP password.
    pub password_ref: String,
    /// Where the caption text is placed.
    #[serde(default)]
    pub caption_target: CaptionTarget,
    /// Subject line rendering mode.
    #[serde(default)]
    pub subject_mode: SubjectMode,
}

fn default_smtp_port() -> u16 {
    587
}
fn default_true() -> bool {
    true
}

/// Where the rendered caption text is placed in the outgoing email.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptionTarget {
    /// Caption becomes the subject line.
    Subject,
    /// Caption becomes the email body.
    #[default]
    Body,
    /// Caption is used for both.
    Both,
}

/// Subject-line rendering policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubjectMode {
    /// Plain descriptive subject.
    #[default]
    Normal,
    /// Subject omits identifying detail.
    Private,
    /// Subject is rendered as if from an avatar/persona account.
    Avatar,
}

/// AI vendor settings for this tenant.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AiConfig {
    /// Chat-completions-compatible base URL.
    #[serde(default)]
    pub base_url: Option<String>,
    /// Model identifier.
    #[serde(default)]
    pub model: Option<String>,
    /// Requests-per-second budget for this tenant's shared rate limiter.
    #[serde(default = "default_ai_qps")]
    pub qps: usize,
}

fn default_ai_qps() -> usize {
    2
}

/// Sidecar-file generation settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CaptionfileConfig {
    /// Caption builder version stamp written into every sidecar.
    #[serde(default = "default_sd_caption_version")]
    pub sd_caption_version: String,
}

fn default_sd_caption_version() -> String {
    "1".to_string()
}

/// Publish-confirmation policy (e.g. whether to email the operator a copy).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfirmationConfig {
    /// Whether to send a confirmation message after a successful publish.
    #[serde(default)]
    pub enabled: bool,
}

/// Content-handling policy (archival, etc).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentConfig {
    /// Whether a successful publish triggers archiving the source image.
    #[serde(default = "default_true")]
    pub archive: bool,
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self { archive: true }
    }
}

/// Auth0/OIDC capability boundary settings (consumed only by the thin login
/// handshake; never by the workflow orchestrator).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Auth0Config {
    /// Auth0 tenant domain.
    #[serde(default)]
    pub domain: Option<String>,
    /// OAuth client id.
    #[serde(default)]
    pub client_id: Option<String>,
    /// Expected audience claim.
    #[serde(default)]
    pub audience: Option<String>,
    /// Email allowlist for the admin cookie.
    #[serde(default)]
    pub admin_login_emails: Vec<String>,
}

/// The fully-resolved runtime configuration for one host.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenantConfig {
    /// Opaque tenant identifier.
    pub tenant_id: String,
    /// Opaque hex digest identifying this config's content.
    pub config_version: String,
    /// Monotonic deadline after which this entry must be refreshed.
    #[serde(skip)]
    pub expires_at: Option<DateTime<Utc>>,
    /// Feature gates.
    #[serde(default)]
    pub features: FeatureFlags,
    /// Object-store layout.
    pub storage: StorageConfig,
    /// Configured publishers (includes disabled ones; filtered at factory time).
    #[serde(default)]
    pub publishers: Vec<PublisherConfig>,
    /// Shared SMTP settings for email/FetLife publishers.
    #[serde(default)]
    pub email_server: Option<EmailServerConfig>,
    /// AI vendor settings.
    #[serde(default)]
    pub ai: AiConfig,
    /// Sidecar generation settings.
    #[serde(default)]
    pub captionfile: CaptionfileConfig,
    /// Confirmation policy.
    #[serde(default)]
    pub confirmation: ConfirmationConfig,
    /// Content/archival policy.
    #[serde(default)]
    pub content: ContentConfig,
    /// OIDC capability-boundary settings.
    #[serde(default)]
    pub auth0: Option<Auth0Config>,
    /// Opaque `name -> credentials_ref` map as sent by the orchestrator,
    /// kept only until resolution; never serialized or logged.
    #[serde(skip)]
    pub credentials: HashMap<String, String>,
}

impl TenantConfig {
    /// True if `expires_at` is set and in the past.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|deadline| now >= deadline)
    }
}
