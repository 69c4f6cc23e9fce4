//! Telegram Bot API publisher. Resizes the image so its longest edge is
//! ≤ 1280px, then posts via a multipart `sendPhoto` call — a direct
//! `reqwest` call rather than a dedicated bot-framework crate, matching the
//! reference daemon's preference for small typed HTTP clients.

use std::io::Cursor;
use std::time::Instant;

use async_trait::async_trait;
use image::imageops::FilterType;
use image::ImageFormat;

use crate::core::PublishResult;

use super::{Publisher, PublishContext};

const MAX_EDGE: u32 = 1280;
const CAPTION_LIMIT: usize = 1024;
const API_BASE: &str = "https://api.telegram.org";

/// Publishes images to a single Telegram chat via a bot token.
pub struct TelegramPublisher {
    client: reqwest::Client,
    bot_token: String,
}

impl TelegramPublisher {
    /// Build a publisher from a resolved bot token.
    #[must_use]
    pub fn new(bot_token: String) -> Self {
        Self { client: reqwest::Client::new(), bot_token }
    }

    fn resize_if_needed(bytes: &[u8]) -> anyhow::Result<Vec<u8>> {
        let img = image::load_from_memory(bytes)?;
        let (w, h) = (img.width(), img.height());
        let longest = w.max(h);
        let resized = if longest > MAX_EDGE {
            let scale = f64::from(MAX_EDGE) / f64::from(longest);
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let (new_w, new_h) = ((f64::from(w) * scale) as u32, (f64::from(h) * scale) as u32);
            img.resize(new_w.max(1), new_h.max(1), FilterType::Lanczos3)
        } else {
            img
        };

        let mut out = Cursor::new(Vec::new());
        resized.write_to(&mut out, ImageFormat::Jpeg)?;
        Ok(out.into_inner())
    }
}

#[async_trait]
impl Publisher for TelegramPublisher {
    fn platform(&self) -> &'static str {
        "telegram"
    }

    async fn publish(&self, ctx: &PublishContext<'_>) -> PublishResult {
        let started = Instant::now();
        let result = self.do_publish(ctx).await;
        let duration_ms = started.elapsed().as_millis() as i64;

        match result {
            Ok(post_id) => PublishResult { success: true, post_id: Some(post_id), error: None, platform: self.platform().to_string(), duration_ms },
            Err(e) => PublishResult { success: false, post_id: None, error: Some(e.to_string()), platform: self.platform().to_string(), duration_ms },
        }
    }
}

impl TelegramPublisher {
    async fn do_publish(&self, ctx: &PublishContext<'_>) -> anyhow::Result<String> {
        let resized = tokio::task::spawn_blocking({
            let bytes = ctx.image_bytes.to_vec();
            move || Self::resize_if_needed(&bytes)
        })
        .await??;

        let caption: String = ctx.caption.chars().take(CAPTION_LIMIT).collect();
        let part = reqwest::multipart::Part::bytes(resized)
            .file_name(ctx.filename.to_string())
            .mime_str("image/jpeg")?;
        let form = reqwest::multipart::Form::new().text("caption", caption).part("photo", part);

        #[derive(serde::Deserialize)]
        struct SendPhotoResult {
            result: MessageResult,
        }
        #[derive(serde::Deserialize)]
        struct MessageResult {
            message_id: i64,
        }

        let resp = self
            .client
            .post(format!("{API_BASE}/bot{}/sendPhoto", self.bot_token))
            .multipart(form)
            .send()
            .await?;

        if !resp.status().is_success() {
            anyhow::bail!("telegram sendPhoto failed: status {}", resp.status());
        }

        let parsed: SendPhotoResult = resp.json().await?;
        Ok(parsed.result.message_id.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resize_leaves_small_images_untouched_in_dimension() {
        let img = image::RgbImage::new(100, 50);
        let mut bytes = Cursor::new(Vec::new());
        image::DynamicImage::ImageRgb8(img).write_to(&mut bytes, ImageFormat::Png).unwrap();

        let resized = TelegramPublisher::resize_if_needed(&bytes.into_inner()).unwrap();
        let decoded = image::load_from_memory(&resized).unwrap();
        assert_eq!(decoded.width(), 100);
        assert_eq!(decoded.height(), 50);
    }

    #[test]
    fn resize_shrinks_longest_edge_to_cap() {
        let img = image::RgbImage::new(4000, 2000);
        let mut bytes = Cursor::new(Vec::new());
        image::DynamicImage::ImageRgb8(img).write_to(&mut bytes, ImageFormat::Png).unwrap();

        let resized = TelegramPublisher::resize_if_needed(&bytes.into_inner()).unwrap();
        let decoded = image::load_from_memory(&resized).unwrap();
        assert_eq!(decoded.width(), MAX_EDGE);
        assert!(decoded.height() <= MAX_EDGE);
    }
}
