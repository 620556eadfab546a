use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::extract::{extract_sections, ExtractorConfig};

/// `local-part@domain.tld`, matched anywhere in the raw text.
static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)[\w.\-]+@[\w.\-]+\.\w+").expect("email pattern compiles"));

/// Optional country code, optional parenthesized area code, 3-3-4 grouping
/// separated by spaces, dots, or dashes.
static PHONE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\+?\d{1,3}[-.\s]?)?\(?\d{3}\)?[-.\s]?\d{3}[-.\s]?\d{4}")
        .expect("phone pattern compiles")
});

/// A run of 10 or more digits. Disqualifies a line from the name fallback.
static LONG_DIGIT_RUN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d{10,}").expect("digit-run pattern compiles"));

/// Fields extracted from one résumé. All best-effort: any field may be empty
/// and none is validated against a canonical format.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedFields {
    pub name: String,
    /// Canonical email — the first match in the raw text.
    pub email: String,
    /// Every email-like match, in order of first appearance. Literal repeats
    /// are kept; no dedup.
    pub emails: Vec<String>,
    /// Canonical phone — the first match in the raw text.
    pub phone: String,
    pub phones: Vec<String>,
    pub socials: Vec<String>,
    pub address: String,
    pub skills: Vec<String>,
    pub education: Vec<String>,
    pub experience: Vec<String>,
}

/// Résumé field extractor. Compiles its social-link pattern from the
/// configured domain table once at construction.
#[derive(Debug)]
pub struct FieldExtractor {
    config: ExtractorConfig,
    social_re: Regex,
}

impl FieldExtractor {
    pub fn new(config: ExtractorConfig) -> Self {
        let social_re = Regex::new(&format!(
            r"(?i)(?:https?://)?(?:www\.)?(?:{})\.com/[^\s]+",
            config.social_domains.join("|")
        ))
        .expect("social pattern compiles");
        Self { config, social_re }
    }

    /// Runs the extraction heuristics over converted document text.
    pub fn parse(&self, text: &str) -> ParsedFields {
        let sections = extract_sections(text, &self.config.heading_keywords);

        let emails: Vec<String> = EMAIL_RE
            .find_iter(text)
            .map(|m| m.as_str().to_string())
            .collect();
        let phones: Vec<String> = PHONE_RE
            .find_iter(text)
            .map(|m| m.as_str().to_string())
            .collect();
        let socials: Vec<String> = self
            .social_re
            .find_iter(text)
            .map(|m| m.as_str().to_string())
            .collect();

        let name = section(&sections, "name")
            .or_else(|| section(&sections, "contact"))
            .map(str::to_string)
            .unwrap_or_else(|| fallback_name(text));

        let address = section(&sections, "address")
            .or_else(|| section(&sections, "location"))
            .unwrap_or("")
            .to_string();

        let skills = section(&sections, "skills")
            .map(|s| {
                s.split(|c| c == ',' || c == ';')
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let education = section(&sections, "education")
            .map(|s| vec![s.to_string()])
            .unwrap_or_default();
        let experience = section(&sections, "experience")
            .or_else(|| section(&sections, "work"))
            .map(|s| vec![s.to_string()])
            .unwrap_or_default();

        ParsedFields {
            name,
            email: emails.first().cloned().unwrap_or_default(),
            emails,
            phone: phones.first().cloned().unwrap_or_default(),
            phones,
            socials,
            address,
            skills,
            education,
            experience,
        }
    }
}

/// Non-empty section content, or `None`.
fn section<'a>(sections: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
    sections.get(key).map(String::as_str).filter(|s| !s.is_empty())
}

/// First non-trivial line, accepted as a name only when it looks like one:
/// no `@`, no 10+ digit run, at most 4 space-separated tokens.
fn fallback_name(text: &str) -> String {
    let first_line = text
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty() && l.len() > 2);
    match first_line {
        Some(line)
            if !line.contains('@')
                && !LONG_DIGIT_RUN_RE.is_match(line)
                && line.split(' ').count() <= 4 =>
        {
            line.to_string()
        }
        _ => String::new(),
    }
}
