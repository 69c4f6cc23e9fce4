//! Instagram publisher stub. Kept minimal and behind
//! `features.instagram_enabled` per the orchestrator's capability gate;
//! the vendor's Graph API flow needs a long-lived business-account token
//! and a two-step container-then-publish call that out of scope here.

use std::time::Instant;

use async_trait::async_trait;

use crate::core::PublishResult;

use super::{Publisher, PublishContext};

/// Publishes to Instagram under a configured handle. Currently a thin
/// placeholder that reports a not-yet-implemented failure rather than
/// silently dropping the post, so operators see it in `per_platform`.
pub struct InstagramPublisher {
    username: String,
    #[allow(dead_code)]
    access_token: String,
}

impl InstagramPublisher {
    /// Build a publisher for `username` using a resolved access token.
    #[must_use]
    pub fn new(username: String, access_token: String) -> Self {
        Self { username, access_token }
    }
}

#[async_trait]
impl Publisher for InstagramPublisher {
    fn platform(&self) -> &'static str {
        "instagram"
    }

    async fn publish(&self, _ctx: &PublishContext<'_>) -> PublishResult {
        let started = Instant::now();
        PublishResult {
            success: false,
            post_id: None,
            error: Some(format!("instagram publishing for {} is not yet implemented", self.username)),
            platform: self.platform().to_string(),
            duration_ms: started.elapsed().as_millis() as i64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn publish_reports_failure_without_panicking() {
        let publisher = InstagramPublisher::new("acct".to_string(), "token".to_string());
        let ctx = PublishContext { image_bytes: &[], filename: "a.jpg", caption: "c" };
        let result = publisher.publish(&ctx).await;
        assert!(!result.success);
        assert!(result.error.is_some());
    }
}
