//! Section Segmenter & Merger — splits a document into fingerprint-aligned
//! sections and reassembles optimized sections in canonical order.
//!
//! Segmentation strategy, in preference order: markup headings aligned to the
//! fingerprint, markdown heading split, whole document as one section.

use std::sync::LazyLock;

use regex::Regex;

use crate::document::{strip_tags, Document};
use crate::fingerprint::derive::canonical_label;
use crate::fingerprint::CompanyFingerprint;
use crate::optimize::section::OptimizedSection;

static MARKUP_HEADING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<h[1-4][^>]*>(.*?)</h[1-4]>").expect("markup heading regex is valid")
});

static MD_HEADING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^#{2,3}\s+(.+)$").expect("markdown heading regex is valid"));

/// One ephemeral slice of the document, produced here and consumed once by the
/// section optimizer.
#[derive(Debug, Clone)]
pub struct Section {
    pub label: String,
    pub heading_text: String,
    pub raw_text: String,
    pub original_markup: Option<String>,
    /// True when the label was matched against the fingerprint's known order.
    pub fingerprint_source: bool,
}

fn normalize(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Resolves a heading to a section label: exact (normalized) alias match from
/// the fingerprint first, canonical label otherwise.
fn label_for(heading: &str, fingerprint: &CompanyFingerprint) -> (String, bool) {
    let needle = normalize(heading);
    for (label, aliases) in &fingerprint.heading_aliases {
        if aliases.iter().any(|alias| normalize(alias) == needle) {
            return (label.clone(), true);
        }
    }
    let label = canonical_label(heading);
    let known = fingerprint.section_order.contains(&label);
    (label, known)
}

fn segment_markup(markup: &str, fingerprint: &CompanyFingerprint) -> Vec<Section> {
    let matches: Vec<(usize, usize, String)> = MARKUP_HEADING_RE
        .captures_iter(markup)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let heading = strip_tags(caps.get(1)?.as_str());
            (!heading.is_empty()).then(|| (whole.start(), whole.end(), heading))
        })
        .collect();

    matches
        .iter()
        .enumerate()
        .map(|(i, (_, end, heading))| {
            let content_end = matches.get(i + 1).map(|(start, _, _)| *start).unwrap_or(markup.len());
            let slice = &markup[*end..content_end];
            let (label, known) = label_for(heading, fingerprint);
            Section {
                label,
                heading_text: heading.clone(),
                raw_text: strip_tags(slice),
                original_markup: Some(slice.to_string()),
                fingerprint_source: known,
            }
        })
        .collect()
}

fn segment_markdown(body: &str, fingerprint: &CompanyFingerprint) -> Vec<Section> {
    let matches: Vec<(usize, usize, String)> = MD_HEADING_RE
        .captures_iter(body)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let heading = caps.get(1)?.as_str().trim().to_string();
            Some((whole.start(), whole.end(), heading))
        })
        .collect();

    if matches.is_empty() {
        return Vec::new();
    }

    let mut sections = Vec::new();

    // Text before the first heading becomes its own section so nothing is lost.
    let preamble = body[..matches[0].0].trim();
    if !preamble.is_empty() {
        let (label, known) = label_for("Overview", fingerprint);
        sections.push(Section {
            label,
            heading_text: String::new(),
            raw_text: preamble.to_string(),
            original_markup: None,
            fingerprint_source: known,
        });
    }

    for (i, (_, end, heading)) in matches.iter().enumerate() {
        let content_end = matches.get(i + 1).map(|(start, _, _)| *start).unwrap_or(body.len());
        let (label, known) = label_for(heading, fingerprint);
        sections.push(Section {
            label,
            heading_text: heading.clone(),
            raw_text: body[*end..content_end].trim().to_string(),
            original_markup: None,
            fingerprint_source: known,
        });
    }

    sections
}

/// Splits into pieces of at most `limit` bytes, never inside a char.
fn chunk_text(text: &str, limit: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::with_capacity(limit);
    for c in text.chars() {
        current.push(c);
        if current.len() >= limit {
            chunks.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

pub fn segment(doc: &Document, fingerprint: &CompanyFingerprint, chunk_limit: usize) -> Vec<Section> {
    let mut sections = doc
        .markup
        .as_deref()
        .map(|markup| segment_markup(markup, fingerprint))
        .unwrap_or_default();

    if sections.is_empty() {
        sections = segment_markdown(&doc.body, fingerprint);
    }

    if sections.is_empty() {
        let label = fingerprint
            .section_order
            .first()
            .cloned()
            .unwrap_or_else(|| "Full Text".to_string());
        sections.push(Section {
            label,
            heading_text: String::new(),
            raw_text: doc.body.clone(),
            original_markup: None,
            fingerprint_source: !fingerprint.section_order.is_empty(),
        });
    }

    // Oversized sections are chunked so every rewrite call fits its budget.
    // Chunks share the label and are concatenated back in original order —
    // this trades rewrite coherence for guaranteed completion.
    sections
        .into_iter()
        .flat_map(|section| {
            if section.raw_text.len() <= chunk_limit {
                return vec![section];
            }
            chunk_text(&section.raw_text, chunk_limit)
                .into_iter()
                .map(|chunk| Section {
                    label: section.label.clone(),
                    heading_text: section.heading_text.clone(),
                    raw_text: chunk,
                    original_markup: None,
                    fingerprint_source: section.fingerprint_source,
                })
                .collect()
        })
        .collect()
}

/// Reassembles optimized sections: fingerprint order first (original relative
/// order within a label), unknown labels appended, blank-line separated.
pub fn merge(sections: &[OptimizedSection], fingerprint: &CompanyFingerprint) -> String {
    let mut used = vec![false; sections.len()];
    let mut ordered: Vec<&OptimizedSection> = Vec::new();

    for label in &fingerprint.section_order {
        for (i, section) in sections.iter().enumerate() {
            if !used[i] && section.label == *label {
                used[i] = true;
                ordered.push(section);
            }
        }
    }
    for (i, section) in sections.iter().enumerate() {
        if !used[i] {
            ordered.push(section);
        }
    }

    ordered
        .iter()
        .map(|s| s.optimized_text.trim())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::Utc;

    use super::*;

    fn fingerprint(order: &[&str]) -> CompanyFingerprint {
        CompanyFingerprint {
            version: 1,
            section_order: order.iter().map(|s| s.to_string()).collect(),
            heading_aliases: BTreeMap::new(),
            tone: "professional".to_string(),
            formatting: "narrative".to_string(),
            lexical_anchors: vec![],
            selectors: vec![],
            last_seen: Utc::now(),
        }
    }

    fn optimized(label: &str, text: &str) -> OptimizedSection {
        OptimizedSection {
            label: label.to_string(),
            optimized_text: text.to_string(),
            change_log: vec![],
            unaddressed_items: vec![],
        }
    }

    const MD_BODY: &str =
        "## About Us\nWe build robots.\n## Responsibilities\n- Build\n- Ship\n## Requirements\n- Rust";

    #[test]
    fn test_three_markdown_headings_yield_three_sections_in_order() {
        let doc = Document {
            title: "Engineer".to_string(),
            body: MD_BODY.to_string(),
            markup: None,
        };
        let sections = segment(&doc, &fingerprint(&[]), 6000);
        assert_eq!(sections.len(), 3);
        assert_eq!(sections[0].label, "About");
        assert_eq!(sections[1].label, "Responsibilities");
        assert_eq!(sections[2].label, "Requirements");
        assert_eq!(sections[1].raw_text, "- Build\n- Ship");
    }

    #[test]
    fn test_merge_follows_reversed_fingerprint_order() {
        let sections = vec![
            optimized("About", "about text"),
            optimized("Responsibilities", "resp text"),
            optimized("Requirements", "req text"),
        ];
        let fp = fingerprint(&["Requirements", "Responsibilities", "About"]);
        assert_eq!(merge(&sections, &fp), "req text\n\nresp text\n\nabout text");
    }

    #[test]
    fn test_merge_appends_unknown_labels_last() {
        let sections = vec![
            optimized("Mystery", "mystery text"),
            optimized("About", "about text"),
        ];
        let fp = fingerprint(&["About"]);
        assert_eq!(merge(&sections, &fp), "about text\n\nmystery text");
    }

    #[test]
    fn test_markup_headings_align_to_fingerprint_aliases() {
        let mut fp = fingerprint(&["Benefits"]);
        fp.heading_aliases
            .insert("Benefits".to_string(), vec!["Perks!".to_string()]);

        let doc = Document {
            title: "Engineer".to_string(),
            body: "ignored".to_string(),
            markup: Some("<h2>Perks</h2><ul><li>Health</li></ul>".to_string()),
        };
        let sections = segment(&doc, &fp, 6000);
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].label, "Benefits");
        assert!(sections[0].fingerprint_source);
        assert_eq!(sections[0].raw_text, "Health");
        assert!(sections[0].original_markup.as_deref().unwrap().contains("<ul>"));
    }

    #[test]
    fn test_markup_without_headings_falls_back_to_markdown() {
        let doc = Document {
            title: "Engineer".to_string(),
            body: MD_BODY.to_string(),
            markup: Some("<div>no headings here</div>".to_string()),
        };
        let sections = segment(&doc, &fingerprint(&[]), 6000);
        assert_eq!(sections.len(), 3);
    }

    #[test]
    fn test_headingless_document_becomes_single_section() {
        let doc = Document {
            title: "Engineer".to_string(),
            body: "Just one plain paragraph.".to_string(),
            markup: None,
        };

        let sections = segment(&doc, &fingerprint(&[]), 6000);
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].label, "Full Text");
        assert!(!sections[0].fingerprint_source);

        // With a known fingerprint the first label is used instead.
        let sections = segment(&doc, &fingerprint(&["About", "Benefits"]), 6000);
        assert_eq!(sections[0].label, "About");
        assert!(sections[0].fingerprint_source);
    }

    #[test]
    fn test_preamble_before_first_heading_is_kept() {
        let doc = Document {
            title: "Engineer".to_string(),
            body: "Intro paragraph.\n## Requirements\n- Rust".to_string(),
            markup: None,
        };
        let sections = segment(&doc, &fingerprint(&[]), 6000);
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].raw_text, "Intro paragraph.");
        assert_eq!(sections[1].label, "Requirements");
    }

    #[test]
    fn test_oversized_section_is_chunked_with_shared_label() {
        let doc = Document {
            title: "Engineer".to_string(),
            body: "x".repeat(25),
            markup: None,
        };
        let sections = segment(&doc, &fingerprint(&[]), 10);
        assert_eq!(sections.len(), 3);
        assert!(sections.iter().all(|s| s.label == "Full Text"));
        assert_eq!(sections[0].raw_text.len(), 10);
        assert_eq!(sections[2].raw_text.len(), 5);
    }

    #[test]
    fn test_chunking_respects_char_boundaries() {
        let chunks = chunk_text(&"é".repeat(5), 3);
        assert!(chunks.concat() == "é".repeat(5));
        assert!(chunks.iter().all(|c| c.len() <= 4));
    }
}
