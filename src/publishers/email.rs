//! SMTP publisher shared by the Email and FetLife platforms. FetLife
//! intentionally has no `credentials_ref` of its own — it publishes through
//! the tenant's single `email_server` credential, per the orchestrator's
//! mapping rules.

use std::time::Instant;

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::core::PublishResult;
use crate::tenant::model::{CaptionTarget, EmailServerConfig, PublisherType};

use super::{Publisher, PublishContext};

/// Publishes images over SMTP, either as a direct email or as a FetLife
/// submission (same transport, different platform label for logs).
pub struct EmailPublisher {
    server: EmailServerConfig,
    password: String,
    publisher_type: PublisherType,
}

impl EmailPublisher {
    /// Build a publisher from the tenant's shared SMTP settings.
    #[must_use]
    pub fn new(server: EmailServerConfig, password: String, publisher_type: PublisherType) -> Self {
        Self { server, password, publisher_type }
    }
}

#[async_trait]
impl Publisher for EmailPublisher {
    fn platform(&self) -> &'static str {
        match self.publisher_type {
            PublisherType::Fetlife => "fetlife",
            _ => "email",
        }
    }

    async fn publish(&self, ctx: &PublishContext<'_>) -> PublishResult {
        let started = Instant::now();
        let result = self.do_publish(ctx).await;
        let duration_ms = started.elapsed().as_millis() as i64;

        match result {
            Ok(()) => PublishResult { success: true, post_id: None, error: None, platform: self.platform().to_string(), duration_ms },
            Err(e) => PublishResult { success: false, post_id: None, error: Some(e.to_string()), platform: self.platform().to_string(), duration_ms },
        }
    }
}

impl EmailPublisher {
    async fn do_publish(&self, ctx: &PublishContext<'_>) -> anyhow::Result<()> {
        let (subject, body) = render_subject_and_body(&self.server, ctx.caption);

        let attachment = Attachment::new(ctx.filename.to_string())
            .body(ctx.image_bytes.to_vec(), ContentType::parse("image/jpeg")?);

        let email = Message::builder()
            .from(self.server.sender.parse()?)
            .to(self.server.recipient.parse()?)
            .subject(subject)
            .multipart(MultiPart::mixed().singlepart(SinglePart::plain(body)).singlepart(attachment))?;

        let creds = Credentials::new(self.server.sender.clone(), self.password.clone());
        let transport: AsyncSmtpTransport<Tokio1Executor> = if self.server.use_tls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.server.smtp_server)?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&self.server.smtp_server)?
        }
        .port(self.server.smtp_port)
        .credentials(creds)
        .build();

        transport.send(email).await?;
        Ok(())
    }
}

fn render_subject_and_body(server: &EmailServerConfig, caption: &str) -> (String, String) {
    match server.caption_target {
        CaptionTarget::Subject => (caption.to_string(), String::new()),
        CaptionTarget::Body => ("New image".to_string(), caption.to_string()),
        CaptionTarget::Both => (caption.to_string(), caption.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tenant::model::SubjectMode;

    fn server(caption_target: CaptionTarget) -> EmailServerConfig {
        EmailServerConfig {
            smtp_server: "smtp.example.com".to_string(),
            smtp_port: 587,
            sender: "bot@example.com".to_string(),
            recipient: "owner@example.com".to_string(),
            use_tls: true,
            password_ref: "EMAIL_PASSWORD".to_string(),
            caption_target,
            subject_mode: SubjectMode::Normal,
        }
    }

    #[test]
    fn subject_target_places_caption_in_subject_only() {
        let (subject, body) = render_subject_and_body(&server(CaptionTarget::Subject), "a caption");
        assert_eq!(subject, "a caption");
        assert!(body.is_empty());
    }

    #[test]
    fn body_target_places_caption_in_body_only() {
        let (subject, body) = render_subject_and_body(&server(CaptionTarget::Body), "a caption");
        assert_eq!(subject, "New image");
        assert_eq!(body, "a caption");
    }

    #[test]
    fn both_target_places_caption_in_subject_and_body() {
        let (subject, body) = render_subject_and_body(&server(CaptionTarget::Both), "a caption");
        assert_eq!(subject, "a caption");
        assert_eq!(body, "a caption");
    }

    #[test]
    fn fetlife_platform_label_differs_from_email() {
        let server = server(CaptionTarget::Body);
        let fetlife = EmailPublisher::new(server.clone(), "pw".to_string(), PublisherType::Fetlife);
        let email = EmailPublisher::new(server, "pw".to_string(), PublisherType::Email);
        assert_eq!(fetlife.platform(), "fetlife");
        assert_eq!(email.platform(), "email");
    }
}
