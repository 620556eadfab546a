//! Redaction passes over document markup.
//!
//! Each pass wraps every case-insensitive literal occurrence of one sensitive
//! value in an opaque span (background and text color both black). Passes run
//! name first, then each email, then each phone, each over the previous
//! pass's output. A later pass may re-match text introduced by an earlier
//! wrapper; that behavior is intentional and pinned by a test below.

use regex::RegexBuilder;

use crate::extract::ParsedFields;

const REDACTION_OPEN: &str =
    r#"<span class="redacted" style="background-color:#000000;color:#000000">"#;
const REDACTION_CLOSE: &str = "</span>";

/// Applies one find-and-wrap pass for a single sensitive value.
fn redact_value(markup: &str, value: &str) -> String {
    let value = value.trim();
    if value.is_empty() {
        return markup.to_string();
    }
    let pattern = RegexBuilder::new(&regex::escape(value))
        .case_insensitive(true)
        .build()
        .expect("escaped literal compiles");
    pattern
        .replace_all(markup, |caps: &regex::Captures<'_>| {
            format!("{REDACTION_OPEN}{}{REDACTION_CLOSE}", &caps[0])
        })
        .into_owned()
}

/// Wraps every occurrence of the canonical name, each email, and each phone.
pub fn redact_markup(markup: &str, fields: &ParsedFields) -> String {
    let mut redacted = redact_value(markup, &fields.name);
    for email in &fields.emails {
        redacted = redact_value(&redacted, email);
    }
    for phone in &fields.phones {
        redacted = redact_value(&redacted, phone);
    }
    redacted
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields_with(name: &str, emails: &[&str], phones: &[&str]) -> ParsedFields {
        ParsedFields {
            name: name.to_string(),
            emails: emails.iter().map(|s| s.to_string()).collect(),
            phones: phones.iter().map(|s| s.to_string()).collect(),
            ..ParsedFields::default()
        }
    }

    #[test]
    fn test_email_occurrence_is_wrapped() {
        let markup = "<p>Contact: jane@example.com</p>";
        let fields = fields_with("", &["jane@example.com"], &[]);
        let redacted = redact_markup(markup, &fields);
        assert!(redacted.contains(&format!(
            "{REDACTION_OPEN}jane@example.com{REDACTION_CLOSE}"
        )));
    }

    #[test]
    fn test_matching_is_case_insensitive_and_preserves_original_text() {
        let markup = "<p>JANE@EXAMPLE.COM</p>";
        let fields = fields_with("", &["jane@example.com"], &[]);
        let redacted = redact_markup(markup, &fields);
        assert!(redacted.contains(&format!(
            "{REDACTION_OPEN}JANE@EXAMPLE.COM{REDACTION_CLOSE}"
        )));
    }

    #[test]
    fn test_metacharacters_in_phone_are_matched_literally() {
        let markup = "<p>+1 (555) 123-4567</p>";
        let fields = fields_with("", &[], &["+1 (555) 123-4567"]);
        let redacted = redact_markup(markup, &fields);
        assert!(redacted.contains(&format!(
            "{REDACTION_OPEN}+1 (555) 123-4567{REDACTION_CLOSE}"
        )));
    }

    #[test]
    fn test_absent_value_leaves_markup_unchanged() {
        let markup = "<p>nothing sensitive here</p>";
        let fields = fields_with("", &["jane@example.com"], &[]);
        assert_eq!(redact_markup(markup, &fields), markup);
    }

    #[test]
    fn test_every_occurrence_is_wrapped() {
        let markup = "<p>John Smith</p><p>John Smith again</p>";
        let fields = fields_with("John Smith", &[], &[]);
        let redacted = redact_markup(markup, &fields);
        assert_eq!(redacted.matches(REDACTION_OPEN).count(), 2);
    }

    #[test]
    fn test_detection_is_idempotent_across_runs() {
        // Running the pass set twice wraps the same match set again; the
        // detected occurrences are identical run to run.
        let markup = "<p>jane@example.com</p>";
        let fields = fields_with("", &["jane@example.com"], &[]);
        let once = redact_markup(markup, &fields);
        let twice = redact_markup(&once, &fields);
        assert_eq!(
            once.matches("jane@example.com").count(),
            twice.matches("jane@example.com").count()
        );
    }

    #[test]
    fn test_empty_and_whitespace_values_are_skipped() {
        let markup = "<p>text</p>";
        let fields = fields_with("  ", &[""], &[]);
        assert_eq!(redact_markup(markup, &fields), markup);
    }

    #[test]
    fn test_phone_pass_can_rematch_inside_earlier_wrapper() {
        // Known quirk, preserved rather than guarded: a later pass scans the
        // markup produced by earlier passes, so a phone that is a substring
        // of an already wrapped email is wrapped again inside the span.
        let markup = "<p>555 123 4567@example.com</p>";
        let fields = fields_with("", &["555 123 4567@example.com"], &["555 123 4567"]);
        let redacted = redact_markup(markup, &fields);
        assert_eq!(redacted.matches(REDACTION_OPEN).count(), 2);
    }
}
