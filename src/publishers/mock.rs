//! In-memory `Publisher` used by workflow tests: records every call it
//! receives and returns a configurable canned result.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;

use crate::core::PublishResult;

use super::{Publisher, PublishContext};

/// A publisher that never touches the network; tests configure its outcome
/// up front and then assert on `call_count`/`last_caption`.
pub struct MockPublisher {
    platform: &'static str,
    succeed: std::sync::atomic::AtomicBool,
    calls: AtomicUsize,
    last_caption: RwLock<Option<String>>,
}

impl MockPublisher {
    /// Build a mock that reports platform `platform` and succeeds unless
    /// told otherwise.
    #[must_use]
    pub fn new(platform: &'static str) -> Self {
        Self {
            platform,
            succeed: std::sync::atomic::AtomicBool::new(true),
            calls: AtomicUsize::new(0),
            last_caption: RwLock::new(None),
        }
    }

    /// Make every subsequent `publish` call fail.
    pub fn set_fail(&self) {
        self.succeed.store(false, Ordering::SeqCst);
    }

    /// Number of `publish` calls received so far.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// The caption passed to the most recent `publish` call, if any.
    #[must_use]
    pub fn last_caption(&self) -> Option<String> {
        self.last_caption.read().expect("poisoned").clone()
    }
}

#[async_trait]
impl Publisher for MockPublisher {
    fn platform(&self) -> &'static str {
        self.platform
    }

    async fn publish(&self, ctx: &PublishContext<'_>) -> PublishResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_caption.write().expect("poisoned") = Some(ctx.caption.to_string());

        if self.succeed.load(Ordering::SeqCst) {
            PublishResult { success: true, post_id: Some("mock-1".to_string()), error: None, platform: self.platform.to_string(), duration_ms: 1 }
        } else {
            PublishResult { success: false, post_id: None, error: Some("mock failure".to_string()), platform: self.platform.to_string(), duration_ms: 1 }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn records_caption_and_increments_call_count() {
        let publisher = MockPublisher::new("telegram");
        let ctx = PublishContext { image_bytes: &[1, 2], filename: "a.jpg", caption: "hello" };
        let result = publisher.publish(&ctx).await;
        assert!(result.success);
        assert_eq!(publisher.call_count(), 1);
        assert_eq!(publisher.last_caption().as_deref(), Some("hello"));
    }

    #[tokio::test]
    async fn set_fail_makes_subsequent_publishes_fail() {
        let publisher = MockPublisher::new("email");
        publisher.set_fail();
        let ctx = PublishContext { image_bytes: &[], filename: "a.jpg", caption: "c" };
        let result = publisher.publish(&ctx).await;
        assert!(!result.success);
    }
}
