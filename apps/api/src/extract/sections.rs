use std::collections::HashMap;

/// Splits document text into labeled sections.
///
/// A line is a heading when it case-insensitively starts with one of the
/// configured keywords. The section key is the lower-cased text before the
/// first colon; text after the colon seeds the section content. Lines before
/// the first heading are dropped, and a repeated label overwrites the earlier
/// content for that label.
pub fn extract_sections(text: &str, headings: &[String]) -> HashMap<String, String> {
    let mut sections = HashMap::new();
    let mut current_section = String::new();
    let mut current_content: Vec<String> = Vec::new();

    for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let lower = line.to_lowercase();
        if headings.iter().any(|h| lower.starts_with(h.as_str())) {
            if !current_section.is_empty() {
                sections.insert(current_section.clone(), current_content.join(" "));
            }
            current_section = match lower.split_once(':') {
                Some((key, _)) => key.to_string(),
                None => lower,
            };
            current_content = Vec::new();
            if let Some((_, rest)) = line.split_once(':') {
                let rest = rest.trim();
                if !rest.is_empty() {
                    current_content.push(rest.to_string());
                }
            }
        } else {
            current_content.push(line.to_string());
        }
    }
    if !current_section.is_empty() {
        sections.insert(current_section, current_content.join(" "));
    }

    sections
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::ExtractorConfig;

    fn sections_of(text: &str) -> HashMap<String, String> {
        let config = ExtractorConfig::default();
        extract_sections(text, &config.heading_keywords)
    }

    #[test]
    fn test_heading_opens_section_and_collects_following_lines() {
        let sections = sections_of("Education\nBSc Computer Science\n2015-2019");
        assert_eq!(
            sections.get("education").map(String::as_str),
            Some("BSc Computer Science 2015-2019")
        );
    }

    #[test]
    fn test_heading_line_remainder_seeds_content() {
        let sections = sections_of("Skills: Python, Go; Rust");
        assert_eq!(
            sections.get("skills").map(String::as_str),
            Some("Python, Go; Rust")
        );
    }

    #[test]
    fn test_key_is_whole_line_before_colon_lowercased() {
        // "Work Experience" keys as "work experience", not "work" — the
        // lookups never hit it, which is part of the heuristic's contract.
        let sections = sections_of("Work Experience\nAcme Corp");
        assert_eq!(
            sections.get("work experience").map(String::as_str),
            Some("Acme Corp")
        );
        assert!(!sections.contains_key("work"));
    }

    #[test]
    fn test_lines_before_first_heading_are_dropped() {
        let sections = sections_of("John Smith\nSomewhere\nSkills: Rust");
        assert_eq!(sections.len(), 1);
        assert!(sections.contains_key("skills"));
    }

    #[test]
    fn test_repeated_label_overwrites_earlier_content() {
        let sections = sections_of("Skills: Python\nSkills: Rust");
        assert_eq!(sections.get("skills").map(String::as_str), Some("Rust"));
    }

    #[test]
    fn test_heading_match_is_case_insensitive_prefix() {
        let sections = sections_of("EDUCATION\nMIT");
        assert_eq!(sections.get("education").map(String::as_str), Some("MIT"));
    }

    #[test]
    fn test_empty_text_yields_no_sections() {
        assert!(sections_of("").is_empty());
        assert!(sections_of("\n  \n").is_empty());
    }
}
