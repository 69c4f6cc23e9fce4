//! The sidecar-as-cache text codec.
//!
//! Format: line 1 is the bare `sd_caption`; line 2 is exactly `# ---`;
//! every line after that is `# key: value`, lower_snake_case keys, JSON
//! values where they parse as JSON and raw strings otherwise. Fields that
//! aren't available are omitted, never written as null.

use std::fmt::Write as _;

use serde_json::Value;

use crate::core::models::{SidecarIdentity, SidecarView};
use crate::core::ImageAnalysis;

const SEPARATOR: &str = "# ---";

/// Build sidecar text from an analysis record and its identity stamp.
///
/// `extended` gates the phase-2 metadata keys (`lighting`, `pose`, ...);
/// when false only the phase-1 identity keys are written even if `analysis`
/// carries phase-2 fields.
#[must_use]
pub fn build(sd_caption: &str, identity: &SidecarIdentity, analysis: &ImageAnalysis, extended: bool) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{sd_caption}");
    let _ = writeln!(out, "{SEPARATOR}");

    write_kv(&mut out, "image_file", Value::String(identity.image_file.clone()));
    if let Some(hash) = &identity.content_hash {
        write_kv(&mut out, "content_hash", Value::String(hash.clone()));
    }
    if let Some(sha) = &identity.sha256 {
        write_kv(&mut out, "sha256", Value::String(sha.clone()));
    }
    write_kv(&mut out, "created", Value::String(identity.created.to_rfc3339()));
    write_kv(&mut out, "sd_caption_version", Value::String(identity.sd_caption_version.to_string()));
    write_kv(&mut out, "model_version", Value::String(identity.model_version.clone()));

    if !analysis.description.is_empty() {
        write_kv(&mut out, "description", Value::String(analysis.description.clone()));
    }
    if let Some(mood) = &analysis.mood {
        write_kv(&mut out, "mood", Value::String(mood.clone()));
    }
    if !analysis.tags.is_empty() {
        write_kv(&mut out, "tags", Value::Array(analysis.tags.iter().cloned().map(Value::String).collect()));
    }
    if !analysis.safety_labels.is_empty() {
        write_kv(
            &mut out,
            "safety_labels",
            Value::Array(analysis.safety_labels.iter().cloned().map(Value::String).collect()),
        );
    }

    if extended {
        if let Some(v) = &analysis.lighting {
            write_kv(&mut out, "lighting", Value::String(v.clone()));
        }
        if let Some(v) = &analysis.pose {
            write_kv(&mut out, "pose", Value::String(v.clone()));
        }
        if let Some(v) = &analysis.materials {
            write_kv(&mut out, "materials", Value::String(v.clone()));
        }
        if let Some(v) = &analysis.art_style {
            write_kv(&mut out, "art_style", Value::String(v.clone()));
        }
        if !analysis.aesthetic_terms.is_empty() {
            write_kv(
                &mut out,
                "aesthetic_terms",
                Value::Array(analysis.aesthetic_terms.iter().cloned().map(Value::String).collect()),
            );
        }
        if !analysis.moderation.is_empty() {
            write_kv(
                &mut out,
                "moderation",
                Value::Array(analysis.moderation.iter().cloned().map(Value::String).collect()),
            );
        }
    }

    out
}

fn write_kv(out: &mut String, key: &str, value: Value) {
    let rendered = match &value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    let _ = writeln!(out, "# {key}: {rendered}");
}

/// Parse sidecar text back into a `SidecarView`.
///
/// Defensive: anything past the separator line that doesn't match
/// `# key: value` is skipped rather than aborting the whole parse, but sets
/// `parse_error` so callers treat the result as cache-insufficient. Binary
/// or empty input produces an empty, non-cache-hit view.
#[must_use]
pub fn parse(text: &str) -> SidecarView {
    if text.is_empty() || text.contains('\u{0}') {
        return SidecarView { parse_error: true, ..Default::default() };
    }

    let mut lines = text.lines();
    let first = lines.next();
    let Some(first) = first else {
        return SidecarView { parse_error: true, ..Default::default() };
    };
    let sd_caption = if first.trim().is_empty() { None } else { Some(first.to_string()) };

    let Some(separator) = lines.next() else {
        return SidecarView { sd_caption, parse_error: sd_caption.is_none(), ..Default::default() };
    };
    if separator.trim() != SEPARATOR {
        return SidecarView { sd_caption, parse_error: true, ..Default::default() };
    }

    let mut metadata = Vec::new();
    let mut parse_error = false;
    for line in lines {
        let line = line.trim_end();
        if line.is_empty() {
            continue;
        }
        let Some(rest) = line.strip_prefix("# ") else {
            parse_error = true;
            continue;
        };
        let Some((key, value)) = rest.split_once(": ") else {
            parse_error = true;
            continue;
        };
        metadata.push((key.to_string(), value.to_string()));
    }

    SidecarView { sd_caption, metadata, parse_error }
}

/// Parse a metadata value as JSON when it looks like JSON, falling back to
/// the raw string. Used by callers that want typed access (e.g. `tags`).
#[must_use]
pub fn metadata_as_json(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn identity() -> SidecarIdentity {
        SidecarIdentity {
            image_file: "a.jpg".to_string(),
            content_hash: Some("hA".to_string()),
            sha256: Some("deadbeef".to_string()),
            created: Utc::now(),
            sd_caption_version: "1",
            model_version: "gpt-vision-1".to_string(),
        }
    }

    #[test]
    fn build_then_parse_round_trips_sd_caption() {
        let analysis = ImageAnalysis { description: "a figure study".to_string(), ..Default::default() };
        let text = build("a figure study, soft light", &identity(), &analysis, false);
        let view = parse(&text);
        assert_eq!(view.sd_caption.as_deref(), Some("a figure study, soft light"));
        assert!(!view.parse_error);
        assert!(view.is_cache_hit());
    }

    #[test]
    fn build_omits_extended_fields_when_not_extended() {
        let analysis = ImageAnalysis { description: "x".to_string(), lighting: Some("soft".to_string()), ..Default::default() };
        let text = build("caption", &identity(), &analysis, false);
        assert!(!text.contains("lighting"));
    }

    #[test]
    fn build_includes_extended_fields_when_requested() {
        let analysis = ImageAnalysis { description: "x".to_string(), lighting: Some("soft".to_string()), ..Default::default() };
        let text = build("caption", &identity(), &analysis, true);
        assert!(text.contains("# lighting: soft"));
    }

    #[test]
    fn parse_tags_array_as_json() {
        let analysis = ImageAnalysis { description: "x".to_string(), tags: vec!["a".to_string(), "b".to_string()], ..Default::default() };
        let text = build("caption", &identity(), &analysis, false);
        let view = parse(&text);
        let raw = view.metadata_value("tags").unwrap();
        let json = metadata_as_json(raw);
        assert_eq!(json, serde_json::json!(["a", "b"]));
    }

    #[test]
    fn empty_sidecar_is_not_a_cache_hit() {
        let view = parse("");
        assert!(view.parse_error);
        assert!(!view.is_cache_hit());
    }

    #[test]
    fn malformed_separator_marks_parse_error_but_keeps_sd_caption() {
        let view = parse("caption line\nnot a separator\n# key: value\n");
        assert_eq!(view.sd_caption.as_deref(), Some("caption line"));
        assert!(view.parse_error);
        assert!(!view.is_cache_hit());
    }

    #[test]
    fn sidecar_with_only_sd_caption_line_is_cache_insufficient() {
        let view = parse("just a caption, no metadata block\n");
        assert_eq!(view.sd_caption.as_deref(), Some("just a caption, no metadata block"));
        assert!(view.parse_error);
    }
}
