//! Domain types shared across the workflow orchestrator, sidecar codec,
//! storage adapter and AI adapter.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Structured output of one AI vision-analysis call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImageAnalysis {
    /// Short (≤ 30 words) human-readable description.
    pub description: String,
    /// Overall mood/tone word or short phrase.
    #[serde(default)]
    pub mood: Option<String>,
    /// Freeform tags.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Whether the model flagged the image as NSFW.
    #[serde(default)]
    pub nsfw: bool,
    /// Coarse safety labels (e.g. "suggestive", "violence").
    #[serde(default)]
    pub safety_labels: Vec<String>,
    /// Phase-2 extended metadata, present only when
    /// `extended_metadata_enabled` is set for the tenant.
    #[serde(default)]
    pub lighting: Option<String>,
    #[serde(default)]
    pub pose: Option<String>,
    #[serde(default)]
    pub materials: Option<String>,
    #[serde(default)]
    pub art_style: Option<String>,
    #[serde(default)]
    pub aesthetic_terms: Vec<String>,
    #[serde(default)]
    pub moderation: Vec<String>,
    /// Stable-diffusion-style training caption, set by `create_caption_pair`
    /// rather than `analyze` but carried on the same record once produced.
    #[serde(default)]
    pub sd_caption: Option<String>,
}

/// Platform-aware caption request passed to `AiAdapter::create_caption_pair`.
#[derive(Debug, Clone)]
pub struct CaptionSpec {
    /// Target platform name (`"telegram"`, `"email"`, ...).
    pub platform: String,
    /// Free-text style guidance folded into the prompt.
    pub style: Option<String>,
    /// Hard cap on caption length in characters.
    pub max_length: usize,
    /// Hashtags to consider appending, platform rules permitting.
    pub hashtags: Vec<String>,
}

/// Parsed view of a sidecar file, used both as the codec's output and as the
/// "cache hit" shape consumed by the analyze endpoint and the orchestrator.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SidecarView {
    /// Line 1 of the sidecar, verbatim.
    pub sd_caption: Option<String>,
    /// The `# key: value` metadata block, values kept as raw strings; JSON
    /// re-parsing of array/object-shaped values is the caller's choice.
    pub metadata: Vec<(String, String)>,
    /// Set when the text after the separator line did not parse cleanly;
    /// callers treat this as insufficient for a cache hit.
    pub parse_error: bool,
}

impl SidecarView {
    /// A sidecar qualifies as a cache hit if it carries an `sd_caption` and
    /// was not flagged as malformed.
    #[must_use]
    pub fn is_cache_hit(&self) -> bool {
        self.sd_caption.is_some() && !self.parse_error
    }

    /// Look up a metadata value by key.
    #[must_use]
    pub fn metadata_value(&self, key: &str) -> Option<&str> {
        self.metadata
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Per-tenant dedup ledger. The object store is the source of truth; this is
/// the in-memory view loaded from / written back to `posted.json`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PostedState {
    /// SHA-256 hex digests of images already posted.
    #[serde(default)]
    pub sha256_hashes: HashSet<String>,
    /// Object-store-native content hashes of images already posted.
    #[serde(default, rename = "dropbox_content_hashes")]
    pub content_hashes: HashSet<String>,
}

impl PostedState {
    /// True if either hash is already recorded.
    #[must_use]
    pub fn contains(&self, sha256: Option<&str>, content_hash: Option<&str>) -> bool {
        sha256.is_some_and(|h| self.sha256_hashes.contains(h))
            || content_hash.is_some_and(|h| self.content_hashes.contains(h))
    }

    /// Record a newly-archived image. Union is authoritative: this never
    /// removes entries, only adds.
    pub fn record(&mut self, sha256: Option<String>, content_hash: Option<String>) {
        if let Some(h) = sha256 {
            self.sha256_hashes.insert(h);
        }
        if let Some(h) = content_hash {
            self.content_hashes.insert(h);
        }
    }
}

/// Outcome of one publisher's attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishResult {
    /// Whether the publish succeeded.
    pub success: bool,
    /// Platform-native post identifier, when available.
    #[serde(default)]
    pub post_id: Option<String>,
    /// Error detail, set only when `success` is false.
    #[serde(default)]
    pub error: Option<String>,
    /// Publisher's platform name.
    pub platform: String,
    /// Wall-clock duration of the publish call.
    pub duration_ms: i64,
}

/// Outcome of one `execute` run, returned to the HTTP layer.
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowResult {
    /// Correlation id shared by every log line emitted during the run.
    pub correlation_id: String,
    /// Filename selected for this run, if selection succeeded.
    pub selected_filename: Option<String>,
    /// True if at least one publisher succeeded.
    pub any_success: bool,
    /// Per-platform outcomes, keyed by platform name.
    pub per_platform: std::collections::BTreeMap<String, PublishResult>,
    /// Whether the image was archived.
    pub archived: bool,
    /// Whether this run was a preview (no writes at all).
    pub preview_mode: bool,
    /// Whether this run was a dry publish (publish/archive skipped).
    pub dry_run: bool,
    /// Stage timings in milliseconds, keyed by stage name.
    pub timings: std::collections::BTreeMap<String, i64>,
}

/// Outcome of a keep/remove curation call.
#[derive(Debug, Clone, Serialize)]
pub struct CurationResult {
    /// The image that was curated.
    pub filename: String,
    /// `"keep"` or `"remove"`.
    pub action: String,
    /// Destination subfolder the image (and sidecar) were moved to.
    pub destination_folder: String,
    /// True if this was a preview/dry call and no move actually happened.
    pub preview_only: bool,
}

/// One candidate image as listed by the storage adapter.
#[derive(Debug, Clone)]
pub struct ImageCandidate {
    /// Filename relative to the tenant's storage root.
    pub filename: String,
    /// Object-store-native content hash.
    pub content_hash: String,
}

/// Outcome of a standalone analyze call, independent of the publish pipeline.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisOutcome {
    /// The vision analysis, either freshly produced or reconstructed from
    /// the cached sidecar.
    pub analysis: ImageAnalysis,
    /// The training/caption text, either freshly produced or read from the
    /// sidecar's first line.
    pub sd_caption: String,
    /// True if this result came from the sidecar cache rather than a live
    /// AI call.
    pub cache_hit: bool,
}

/// Identity fields threaded into the sidecar codec, independent of analysis
/// content (created timestamp, hashes, version stamps).
#[derive(Debug, Clone)]
pub struct SidecarIdentity {
    /// The basename the sidecar is stored alongside.
    pub image_file: String,
    /// Object-store content hash of the image.
    pub content_hash: Option<String>,
    /// SHA-256 hex digest of the image bytes.
    pub sha256: Option<String>,
    /// When this sidecar was (re)generated.
    pub created: DateTime<Utc>,
    /// Version stamp for the caption/sidecar builder itself.
    pub sd_caption_version: &'static str,
    /// Identifier of the AI model that produced the analysis.
    pub model_version: String,
}
