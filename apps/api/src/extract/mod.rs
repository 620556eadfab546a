//! Heuristic résumé field extraction.
//!
//! Best-effort by contract: the extractor matches a fixed heading vocabulary
//! and a handful of regexes against converted document text. False positives
//! and negatives are expected; callers must not rely on any field being
//! present or well-formed.

mod fields;
mod sections;

pub use fields::{FieldExtractor, ParsedFields};
pub use sections::extract_sections;

/// Section labels recognized as heading prefixes, matched case-insensitively
/// at the start of a line.
const SECTION_HEADINGS: &[&str] = &[
    "name",
    "email",
    "phone",
    "address",
    "location",
    "skills",
    "education",
    "experience",
    "work",
    "contact",
    "social",
    "summary",
    "objective",
];

/// Hosts treated as social-profile links when followed by `.com/`.
const SOCIAL_DOMAINS: &[&str] = &["linkedin", "twitter", "github", "facebook", "instagram"];

/// Immutable configuration table for the extractor. Constructed once at
/// startup and shared through `AppState`.
#[derive(Debug, Clone)]
pub struct ExtractorConfig {
    pub heading_keywords: Vec<String>,
    pub social_domains: Vec<String>,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            heading_keywords: SECTION_HEADINGS.iter().map(|s| s.to_string()).collect(),
            social_domains: SOCIAL_DOMAINS.iter().map(|s| s.to_string()).collect(),
        }
    }
}
