//! In-memory `AiAdapter` for workflow tests: records call counts and returns
//! pre-seeded or default responses instead of calling a real vendor.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;

use crate::core::{AiServiceError, CaptionSpec, ImageAnalysis};

use super::traits::AiAdapter;

/// Mock AI adapter. Defaults to returning a fixed analysis/caption pair;
/// tests can override via `set_analysis`/`set_caption_pair` or force a
/// failure via `fail_next_analyze`.
pub struct MockAiAdapter {
    analyze_calls: AtomicUsize,
    caption_calls: AtomicUsize,
    analysis: RwLock<ImageAnalysis>,
    caption_pair: RwLock<(String, Option<String>)>,
    fail_next_analyze: std::sync::atomic::AtomicBool,
}

impl Default for MockAiAdapter {
    fn default() -> Self {
        Self {
            analyze_calls: AtomicUsize::new(0),
            caption_calls: AtomicUsize::new(0),
            analysis: RwLock::new(ImageAnalysis { description: "a test image".to_string(), ..Default::default() }),
            caption_pair: RwLock::new(("a test caption".to_string(), Some("a test sd_caption".to_string()))),
            fail_next_analyze: std::sync::atomic::AtomicBool::new(false),
        }
    }
}

impl MockAiAdapter {
    /// Construct with default canned responses.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of times `analyze` has been called.
    #[must_use]
    pub fn analyze_call_count(&self) -> usize {
        self.analyze_calls.load(Ordering::SeqCst)
    }

    /// Number of times `create_caption_pair` has been called.
    #[must_use]
    pub fn caption_call_count(&self) -> usize {
        self.caption_calls.load(Ordering::SeqCst)
    }

    /// Force the next `analyze` call to return an error.
    pub fn fail_next_analyze(&self) {
        self.fail_next_analyze.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl AiAdapter for MockAiAdapter {
    async fn analyze(&self, _image_url: &str) -> Result<ImageAnalysis, AiServiceError> {
        self.analyze_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_next_analyze.swap(false, Ordering::SeqCst) {
            return Err(AiServiceError::Transport { source: anyhow::anyhow!("simulated failure") });
        }
        Ok(self.analysis.read().expect("poisoned").clone())
    }

    async fn create_caption_pair(
        &self,
        _analysis: &ImageAnalysis,
        _spec: &CaptionSpec,
    ) -> Result<(String, Option<String>), AiServiceError> {
        self.caption_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.caption_pair.read().expect("poisoned").clone())
    }
}
