use async_trait::async_trait;

use crate::core::{AiServiceError, CaptionSpec, ImageAnalysis};

/// Multimodal vision + caption generation, vendor-neutral at the call site.
#[async_trait]
pub trait AiAdapter: Send + Sync {
    /// Run one vision-analysis call against an image URL.
    async fn analyze(&self, image_url: &str) -> Result<ImageAnalysis, AiServiceError>;

    /// Generate `(caption, sd_caption)` for an already-analyzed image,
    /// tailored to `spec`. `sd_caption` is `None` when the adapter had to
    /// fall back to a caption-only call.
    async fn create_caption_pair(
        &self,
        analysis: &ImageAnalysis,
        spec: &CaptionSpec,
    ) -> Result<(String, Option<String>), AiServiceError>;
}
