//! Post-processing of model summaries.
//!
//! Strips model artifacts, then replaces any name that appears in a
//! labelled field of the source text (`Patient:`, `Dr.`, `Hospital:` ...)
//! with `[redacted]`.

use std::sync::LazyLock;

use regex::Regex;

pub const REDACTION_MARKER: &str = "[redacted]";

/// Person-name fields longer than this many words are not treated as names.
const MAX_NAME_WORDS: usize = 6;

/// Words that may follow a label without being part of a name.
const NON_NAME_WORDS: &[&str] = &["the", "and", "of", "for", "unknown", "n/a", "none"];

/// Strip model-specific artifacts from raw output.
///
/// Handles `<think>...</think>` reasoning blocks, Gemma `<unusedN>thought`
/// prefixes and stray special tokens.
pub fn sanitize_llm_output(raw: &str) -> String {
    static THINK_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"(?s)<think>.*?</think>").expect("valid regex"));
    static SPECIAL_TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"<unused\d+>|</?think>|<(?:start|end)_of_turn>|<eos>|<bos>|<\|[a-z_]+\|>")
            .expect("valid regex")
    });

    let mut text = THINK_RE.replace_all(raw, "").into_owned();

    if let Some(idx) = text.find("<unused") {
        if let Some(offset) = text[idx..].find("thought\n") {
            text = text[idx + offset + "thought\n".len()..].to_string();
        }
    }

    SPECIAL_TOKEN_RE.replace_all(&text, "").trim().to_string()
}

/// Names found in labelled fields of the document text, longest first.
pub fn collect_identifiers(source: &str) -> Vec<String> {
    static PERSON_FIELD_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"(?im)^[ \t]*(?:patient(?:[ \t]+name)?|doctor|physician|attending(?:[ \t]+physician)?|referring[ \t]+physician)[ \t]*:[ \t]*([^\n]+)$")
            .expect("valid regex")
    });
    static DR_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"\bDr\.?[ \t]+([A-Z][\w'-]+(?:[ \t]+[A-Z][\w'-]+){0,2})").expect("valid regex")
    });
    static FACILITY_FIELD_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"(?im)^[ \t]*(?:hospital|clinic|facility)(?:[ \t]+name)?[ \t]*:[ \t]*([^\n]+)$")
            .expect("valid regex")
    });

    let mut found: Vec<String> = Vec::new();

    let person_values = PERSON_FIELD_RE
        .captures_iter(source)
        .chain(DR_RE.captures_iter(source))
        .filter_map(|c| c.get(1).map(|m| field_value(m.as_str())));
    for value in person_values.flatten() {
        // Each part of a person's name may appear alone in the summary.
        for part in value.split_whitespace() {
            let part = part.trim_matches(|c: char| !c.is_alphanumeric());
            if part.chars().count() >= 3 && !NON_NAME_WORDS.contains(&part.to_lowercase().as_str()) {
                found.push(part.to_string());
            }
        }
        found.push(value);
    }

    let facility_values = FACILITY_FIELD_RE
        .captures_iter(source)
        .filter_map(|c| c.get(1).map(|m| field_value(m.as_str())));
    found.extend(facility_values.flatten());

    found.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
    found.dedup_by(|a, b| a.eq_ignore_ascii_case(b));
    found
}

/// Cut a field value at the first separator and reject values that are
/// too long to be a name.
fn field_value(raw: &str) -> Option<String> {
    let value = raw
        .split([',', ';', '|', '\t'])
        .next()
        .unwrap_or("")
        .split("  ")
        .next()
        .unwrap_or("")
        .trim()
        .trim_end_matches('.')
        .trim();

    let words = value.split_whitespace().count();
    if value.is_empty()
        || words > MAX_NAME_WORDS
        || NON_NAME_WORDS.contains(&value.to_lowercase().as_str())
    {
        None
    } else {
        Some(value.to_string())
    }
}

/// Replace every identifier (case-insensitive, whole word) with the marker.
pub fn scrub_identifiers(summary: &str, identifiers: &[String]) -> String {
    identifiers.iter().fold(summary.to_string(), |text, ident| {
        let mut pattern = String::from("(?i)");
        if ident.starts_with(|c: char| c.is_alphanumeric()) {
            pattern.push_str(r"\b");
        }
        pattern.push_str(&regex::escape(ident));
        if ident.ends_with(|c: char| c.is_alphanumeric()) {
            pattern.push_str(r"\b");
        }
        match Regex::new(&pattern) {
            Ok(re) => re.replace_all(&text, REDACTION_MARKER).into_owned(),
            Err(_) => text.replace(ident.as_str(), REDACTION_MARKER),
        }
    })
}
