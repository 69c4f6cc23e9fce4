//! Hand-rolled legacy INI fallback parser.
//!
//! No INI crate appears anywhere in the reference corpus, and the format
//! this loader has to accept is narrow and fully specified: `[section]`
//! headers, `key = value` lines, and `#`/`;` comments. A dependency isn't
//! warranted for that.

use std::collections::BTreeMap;

/// Parsed INI file: section name (empty string for anything before the
/// first header) to an ordered map of key/value pairs.
pub type IniDocument = BTreeMap<String, BTreeMap<String, String>>;

/// Parse INI text into sections. Unknown syntax (a line that is neither a
/// section header, a comment, blank, nor `key = value`) is skipped rather
/// than treated as fatal — this fallback path only ever reads a handful of
/// well-known keys, so being permissive here beats rejecting an otherwise
/// usable file over one stray line.
#[must_use]
pub fn parse(text: &str) -> IniDocument {
    let mut doc = IniDocument::new();
    let mut section = String::new();
    doc.entry(section.clone()).or_default();

    for raw_line in text.lines() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }
        if let Some(name) = line.strip_prefix('[').and_then(|s| s.strip_suffix(']')) {
            section = name.trim().to_string();
            doc.entry(section.clone()).or_default();
            continue;
        }
        if let Some((key, value)) = line.split_once('=') {
            doc.entry(section.clone()).or_default().insert(key.trim().to_string(), value.trim().to_string());
        }
    }
    doc
}

/// Look up `section.key`, trying the named section then the unsectioned
/// (empty-name) section as a last resort.
#[must_use]
pub fn get<'a>(doc: &'a IniDocument, section: &str, key: &str) -> Option<&'a str> {
    doc.get(section)
        .and_then(|s| s.get(key))
        .or_else(|| doc.get("").and_then(|s| s.get(key)))
        .map(String::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_sections_and_keys() {
        let doc = parse("[runtime]\nbind_addr = 0.0.0.0:9090\n# a comment\n; also a comment\n\n[other]\nkey=value\n");
        assert_eq!(get(&doc, "runtime", "bind_addr"), Some("0.0.0.0:9090"));
        assert_eq!(get(&doc, "other", "key"), Some("value"));
    }

    #[test]
    fn keys_before_any_section_header_land_in_the_unsectioned_section() {
        let doc = parse("bind_addr = 1.2.3.4:80\n[runtime]\nlog_format = pretty\n");
        assert_eq!(get(&doc, "runtime", "bind_addr"), Some("1.2.3.4:80"));
    }

    #[test]
    fn malformed_lines_are_skipped_not_fatal() {
        let doc = parse("not a valid line at all\n[runtime]\nbind_addr = ok\n");
        assert_eq!(get(&doc, "runtime", "bind_addr"), Some("ok"));
    }
}
