/// Hard cap on document text sent to the model.
pub const MAX_DOCUMENT_CHARS: usize = 48_000;

pub const SUMMARY_SYSTEM_PROMPT: &str = r#"
You summarize medical documents for the care team of a case.

RULES:
1. Do NOT include the names of the patient, any doctor or any hospital or clinic.
   Refer to them as "the patient", "the physician", "the facility".
2. Do NOT include addresses, phone numbers, identifiers or dates of birth.
3. Keep clinical facts verbatim: diagnoses, medications with doses, lab values, dates of care.
4. Do not add interpretation or advice that is not in the document.
5. Answer in plain prose or short bullet points, no preamble.
"#;

/// Build the summarization prompt for one document.
///
/// Returns the prompt and whether the document text was truncated.
pub fn build_summary_prompt(document_text: &str) -> (String, bool) {
    let (body, truncated) = truncate_chars(document_text.trim(), MAX_DOCUMENT_CHARS);
    let note = if truncated {
        "NOTE: The document was truncated; summarize the part shown.\n"
    } else {
        ""
    };

    let prompt = format!(
        "{note}<document>\n{body}\n</document>\n\n\
         Summarize the document above. Exclude hospital, patient and doctor names."
    );
    (prompt, truncated)
}

fn truncate_chars(text: &str, max_chars: usize) -> (&str, bool) {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => (&text[..byte_idx], true),
        None => (text, false),
    }
}
