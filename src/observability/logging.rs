//! Structured JSON logging with field-level secret redaction.
//!
//! `tracing_subscriber::fmt::layer().json()` serializes event fields verbatim,
//! which is fine until one of those fields is a `credentials_ref` or a bearer
//! token. This module implements a small custom `Layer` that visits event
//! fields into a `serde_json::Map`, rewrites sensitive values, and writes one
//! JSON object per line.

use std::fmt;
use std::io::Write;
use std::sync::Mutex;

use serde_json::{Map, Value};
use tracing::field::{Field, Visit};
use tracing::span;
use tracing_subscriber::Layer;
use tracing_subscriber::layer::Context;
use tracing_subscriber::registry::LookupSpan;

/// Field name fragments treated as sensitive, matched case-insensitively
/// against the full field name (so `bot_token` and `refresh_token` both hit
/// on `token`).
const SENSITIVE_KEY_FRAGMENTS: &[&str] = &[
    "password",
    "secret",
    "token",
    "credentials_ref",
    "api_key",
    "apikey",
    "authorization",
    "cookie",
];

const REDACTED: &str = "***redacted***";

/// True if `key` should have its value replaced before the event is emitted.
#[must_use]
pub fn is_sensitive_key(key: &str) -> bool {
    let lower = key.to_ascii_lowercase();
    SENSITIVE_KEY_FRAGMENTS
        .iter()
        .any(|fragment| lower.contains(fragment))
}

/// Redact sensitive values in a JSON object, one level deep.
///
/// Nested objects are walked one additional level so that a field shaped
/// like `{"email_server": {"password_ref": "..."}}` is still caught; deeper
/// nesting is not inspected, which matches the shapes actually logged by
/// this service (spans carry flat fields; nested config snapshots are at
/// most two levels).
#[must_use]
pub fn redact_json(mut value: Value) -> Value {
    redact_json_at_depth(&mut value, 0);
    value
}

fn redact_json_at_depth(value: &mut Value, depth: u8) {
    let Value::Object(map) = value else {
        return;
    };
    for (key, v) in map.iter_mut() {
        if is_sensitive_key(key) {
            *v = Value::String(REDACTED.to_string());
            continue;
        }
        if depth < 1 {
            redact_json_at_depth(v, depth + 1);
        }
    }
}

/// Collects one tracing event's fields into a JSON object.
#[derive(Default)]
struct JsonVisitor {
    fields: Map<String, Value>,
}

impl Visit for JsonVisitor {
    fn record_f64(&mut self, field: &Field, value: f64) {
        self.insert(field, Value::from(value));
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.insert(field, Value::from(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.insert(field, Value::from(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.insert(field, Value::from(value));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.insert(field, Value::from(value));
    }

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        self.insert(field, Value::from(value.to_string()));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.insert(field, Value::from(format!("{value:?}")));
    }
}

impl JsonVisitor {
    fn insert(&mut self, field: &Field, value: Value) {
        let name = field.name();
        if is_sensitive_key(name) {
            self.fields.insert(name.to_string(), Value::String(REDACTED.to_string()));
        } else {
            self.fields.insert(name.to_string(), value);
        }
    }
}

/// A `tracing_subscriber` layer that emits one redacted JSON line per event.
///
/// Held behind a `Mutex<W>` rather than requiring `W: Clone + Sync`, mirroring
/// the simplest correct option for a low-volume structured log sink; under
/// real load this is usually paired with a non-blocking `tracing-appender`
/// writer so the mutex only ever guards an in-memory channel send.
pub struct RedactingJsonLayer<W> {
    writer: Mutex<W>,
    pretty: bool,
}

impl<W> RedactingJsonLayer<W>
where
    W: Write + 'static,
{
    /// Build a layer writing redacted JSON lines to `writer`.
    pub fn new(writer: W) -> Self {
        Self { writer: Mutex::new(writer), pretty: false }
    }

    /// Build a layer that pretty-prints `key=value` pairs instead of JSON,
    /// for interactive local development (`RUNTIME_LOG_FORMAT=pretty`).
    pub fn new_pretty(writer: W) -> Self {
        Self { writer: Mutex::new(writer), pretty: true }
    }

    fn write_line(&self, line: &str) {
        if let Ok(mut guard) = self.writer.lock() {
            let _ = writeln!(guard, "{line}");
        }
    }
}

impl<S, W> Layer<S> for RedactingJsonLayer<W>
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
    W: Write + 'static,
{
    fn on_event(&self, event: &tracing::Event<'_>, ctx: Context<'_, S>) {
        let mut visitor = JsonVisitor::default();
        event.record(&mut visitor);
        let mut fields = Value::Object(visitor.fields);
        fields = redact_json(fields);

        let metadata = event.metadata();
        let mut record = Map::new();
        record.insert("timestamp".to_string(), Value::from(chrono::Utc::now().to_rfc3339()));
        record.insert("level".to_string(), Value::from(metadata.level().as_str()));
        record.insert("target".to_string(), Value::from(metadata.target()));

        if let Some(span) = ctx.event_span(event) {
            record.insert("span".to_string(), Value::from(span.name()));
        }

        if let Value::Object(field_map) = fields {
            for (k, v) in field_map {
                record.insert(k, v);
            }
        }

        if self.pretty {
            let rendered = record
                .iter()
                .map(|(k, v)| format!("{k}={}", render_plain(v)))
                .collect::<Vec<_>>()
                .join(" ");
            self.write_line(&format!(
                "{} {:>5} {}",
                record.get("timestamp").and_then(Value::as_str).unwrap_or_default(),
                metadata.level(),
                rendered
            ));
        } else {
            let line = serde_json::to_string(&record).unwrap_or_else(|_| "{}".to_string());
            self.write_line(&line);
        }
    }

    fn on_new_span(&self, attrs: &span::Attributes<'_>, id: &span::Id, ctx: Context<'_, S>) {
        let mut visitor = JsonVisitor::default();
        attrs.record(&mut visitor);
        if let Some(span) = ctx.span(id) {
            span.extensions_mut().insert(visitor.fields);
        }
    }
}

fn render_plain(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sensitive_keys_detected_case_insensitively() {
        assert!(is_sensitive_key("DROPBOX_REFRESH_TOKEN"));
        assert!(is_sensitive_key("credentials_ref"));
        assert!(is_sensitive_key("bot_token"));
        assert!(!is_sensitive_key("filename"));
        assert!(!is_sensitive_key("correlation_id"));
    }

    #[test]
    fn redact_json_rewrites_top_level_secrets() {
        let value = serde_json::json!({"password": "hunter2", "filename": "a.jpg"});
        let redacted = redact_json(value);
        assert_eq!(redacted["password"], REDACTED);
        assert_eq!(redacted["filename"], "a.jpg");
    }

    #[test]
    fn redact_json_rewrites_one_level_of_nesting() {
        let value = serde_json::json!({"email_server": {"password_ref": "op://x/y/z", "host": "smtp.example.com"}});
        let redacted = redact_json(value);
        assert_eq!(redacted["email_server"]["password_ref"], REDACTED);
        assert_eq!(redacted["email_server"]["host"], "smtp.example.com");
    }
}
