//! Fingerprint derivation — walks a document's heading structure and distills
//! the company's observable template: section order, heading aliases, tone,
//! formatting habits, and brand phrases worth preserving verbatim.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::document::{strip_tags, Document};

/// Brand phrases are advisory; keep the set small so rewrite prompts stay tight.
pub const MAX_LEXICAL_ANCHORS: usize = 8;

static MARKUP_HEADING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<h([1-4])[^>]*>(.*?)</h[1-4]>").expect("markup heading regex is valid")
});

static MD_HEADING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^#{2,3}\s+(.+)$").expect("markdown heading regex is valid"));

static ANCHOR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b[A-Z][A-Za-z0-9]+(?:\s+(?:[A-Z][A-Za-z0-9]+|of|for|&))+\b")
        .expect("anchor regex is valid")
});

/// Capitalized sentence-starters that precede a brand phrase without being
/// part of it ("Join Acme Robotics", "At Acme Robotics").
const LEADING_STOP_WORDS: &[&str] = &[
    "A", "An", "And", "As", "At", "But", "By", "For", "From", "If", "In", "Join", "On", "Or",
    "Our", "The", "To", "We", "With", "Your",
];

static BULLET_LINE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*(?:[-*•]|\d+\.)\s+\S").expect("bullet regex is valid"));

/// Canonical section labels with the heading aliases that map onto them.
/// Matching is substring-based over a normalized heading; first hit wins.
const LABEL_ALIASES: &[(&str, &[&str])] = &[
    ("About", &["about", "who we are", "our story", "company", "our mission"]),
    (
        "Responsibilities",
        &["responsibilit", "what you'll do", "what you will do", "the role", "duties", "day to day"],
    ),
    (
        "Requirements",
        &["requirement", "qualification", "what you bring", "skills", "experience", "about you"],
    ),
    ("Benefits", &["benefit", "perks", "what we offer", "compensation", "salary"]),
    ("How to Apply", &["apply", "next steps", "hiring process", "interview process"]),
];

/// One observed heading, in document order.
#[derive(Debug, Clone)]
pub struct Heading {
    pub text: String,
    /// Markup tag the heading came from, when the document has markup.
    pub selector: Option<String>,
}

/// The structural/stylistic profile observed in a single document. Versioning
/// and persistence live in the manager; this type is derivation output only.
#[derive(Debug, Clone)]
pub struct ObservedProfile {
    pub section_order: Vec<String>,
    pub heading_aliases: BTreeMap<String, Vec<String>>,
    pub tone: String,
    pub formatting: String,
    pub lexical_anchors: Vec<String>,
    pub selectors: Vec<String>,
}

/// Headings in source order: markup `<h1>`–`<h4>` when present, markdown
/// `##`/`###` lines otherwise.
pub fn scan_headings(doc: &Document) -> Vec<Heading> {
    if let Some(markup) = doc.markup.as_deref() {
        let headings: Vec<Heading> = MARKUP_HEADING_RE
            .captures_iter(markup)
            .map(|caps| Heading {
                text: strip_tags(&caps[2]),
                selector: Some(format!("h{}", &caps[1])),
            })
            .filter(|h| !h.text.is_empty())
            .collect();
        if !headings.is_empty() {
            return headings;
        }
    }

    MD_HEADING_RE
        .captures_iter(&doc.body)
        .map(|caps| Heading {
            text: caps[1].trim().to_string(),
            selector: None,
        })
        .collect()
}

/// Maps raw heading text to a canonical section label. Unknown headings keep
/// their own (title-cased) text as the label.
pub fn canonical_label(heading: &str) -> String {
    let normalized: String = heading
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '\'' { c } else { ' ' })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");

    for (label, aliases) in LABEL_ALIASES {
        if aliases.iter().any(|alias| normalized.contains(alias)) {
            return (*label).to_string();
        }
    }

    title_case(&normalized)
}

fn title_case(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn detect_tone(body: &str) -> String {
    let lower = body.to_lowercase();
    let exclamations = body.matches('!').count();
    let informal = ["awesome", "rockstar", "ninja", "super excited", "epic"]
        .iter()
        .any(|w| lower.contains(w));

    if informal || exclamations >= 3 {
        "casual-energetic".to_string()
    } else if lower.contains("we're") || lower.contains("you'll") || lower.contains("you're") {
        "conversational".to_string()
    } else {
        "professional".to_string()
    }
}

fn detect_formatting(body: &str) -> String {
    let lines = body.lines().filter(|l| !l.trim().is_empty()).count();
    if lines == 0 {
        return "narrative".to_string();
    }
    let bullets = BULLET_LINE_RE.find_iter(body).count();
    let ratio = bullets as f64 / lines as f64;

    if ratio >= 0.3 {
        "bullet-led".to_string()
    } else if ratio <= 0.05 {
        "narrative".to_string()
    } else {
        "mixed".to_string()
    }
}

/// Strips sentence-initial stop words so the brand term itself survives.
/// Rejects phrases that stop being multi-word capitalized after trimming.
fn trim_leading_stop_words(phrase: &str) -> Option<String> {
    let mut words: Vec<&str> = phrase.split_whitespace().collect();
    while words.len() > 1 && LEADING_STOP_WORDS.contains(&words[0]) {
        words.remove(0);
    }
    if words.len() < 2 || !words[0].starts_with(|c: char| c.is_uppercase()) {
        return None;
    }
    Some(words.join(" "))
}

/// Short capitalized multi-word phrases likely to be brand terms, deduplicated
/// in order of first appearance and bounded at `MAX_LEXICAL_ANCHORS`.
fn lexical_anchors(body: &str) -> Vec<String> {
    let mut anchors = Vec::new();
    for m in ANCHOR_RE.find_iter(body) {
        let phrase = match trim_leading_stop_words(m.as_str().trim()) {
            Some(phrase) => phrase,
            None => continue,
        };
        if phrase.len() > 40 {
            continue;
        }
        if !anchors.contains(&phrase) {
            anchors.push(phrase);
        }
        if anchors.len() == MAX_LEXICAL_ANCHORS {
            break;
        }
    }
    anchors
}

pub fn derive_profile(doc: &Document) -> ObservedProfile {
    let headings = scan_headings(doc);

    let mut section_order = Vec::new();
    let mut heading_aliases: BTreeMap<String, Vec<String>> = BTreeMap::new();
    let mut selectors = Vec::new();

    for heading in &headings {
        let label = canonical_label(&heading.text);
        if !section_order.contains(&label) {
            section_order.push(label.clone());
        }
        let aliases = heading_aliases.entry(label).or_default();
        if !aliases.contains(&heading.text) {
            aliases.push(heading.text.clone());
        }
        if let Some(selector) = &heading.selector {
            if !selectors.contains(selector) {
                selectors.push(selector.clone());
            }
        }
    }

    ObservedProfile {
        section_order,
        heading_aliases,
        tone: detect_tone(&doc.body),
        formatting: detect_formatting(&doc.body),
        lexical_anchors: lexical_anchors(&doc.body),
        selectors,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(body: &str, markup: Option<&str>) -> Document {
        Document {
            title: "Engineer".to_string(),
            body: body.to_string(),
            markup: markup.map(str::to_string),
        }
    }

    #[test]
    fn test_canonical_label_maps_aliases() {
        assert_eq!(canonical_label("Who We Are"), "About");
        assert_eq!(canonical_label("What You'll Do"), "Responsibilities");
        assert_eq!(canonical_label("Qualifications:"), "Requirements");
        assert_eq!(canonical_label("Perks & Benefits"), "Benefits");
        assert_eq!(canonical_label("How to Apply"), "How to Apply");
    }

    #[test]
    fn test_unknown_heading_keeps_own_label() {
        assert_eq!(canonical_label("Life in Berlin"), "Life In Berlin");
    }

    #[test]
    fn test_scan_prefers_markup_headings() {
        let d = doc(
            "## Markdown Heading\ntext",
            Some("<h2>Who We Are</h2><p>x</p><h3 class=\"sub\">Perks</h3>"),
        );
        let headings = scan_headings(&d);
        assert_eq!(headings.len(), 2);
        assert_eq!(headings[0].text, "Who We Are");
        assert_eq!(headings[0].selector.as_deref(), Some("h2"));
        assert_eq!(headings[1].selector.as_deref(), Some("h3"));
    }

    #[test]
    fn test_scan_falls_back_to_markdown() {
        let d = doc("## About Us\ntext\n### Requirements\nmore", None);
        let headings = scan_headings(&d);
        assert_eq!(headings.len(), 2);
        assert_eq!(headings[1].text, "Requirements");
        assert!(headings[0].selector.is_none());
    }

    #[test]
    fn test_profile_section_order_and_aliases() {
        let d = doc(
            "## Who We Are\nx\n## What You'll Do\nx\n## Qualifications\nx",
            None,
        );
        let profile = derive_profile(&d);
        assert_eq!(
            profile.section_order,
            vec!["About", "Responsibilities", "Requirements"]
        );
        assert_eq!(
            profile.heading_aliases["About"],
            vec!["Who We Are".to_string()]
        );
    }

    #[test]
    fn test_lexical_anchors_bounded_and_deduped() {
        let body = "Join Acme Robotics. At Acme Robotics we ship the Atlas Platform. \
                    Our Orbit Program and Comet Labs and Quasar Cloud and Nebula Grid and \
                    Pulsar Mesh and Vertex Hub and Zenith Core teams are hiring.";
        let anchors = lexical_anchors(body);
        assert!(anchors.len() <= MAX_LEXICAL_ANCHORS);
        assert_eq!(
            anchors.iter().filter(|a| a.as_str() == "Acme Robotics").count(),
            1
        );
    }

    #[test]
    fn test_leading_stop_words_trimmed_from_anchors() {
        let anchors =
            lexical_anchors("Join Acme Robotics today. With Quasar Cloud you ship faster.");
        assert_eq!(anchors, ["Acme Robotics", "Quasar Cloud"]);
    }

    #[test]
    fn test_tone_detection() {
        assert_eq!(detect_tone("We are seeking a qualified candidate."), "professional");
        assert_eq!(detect_tone("You'll love it here, we're a tight team."), "conversational");
        assert_eq!(detect_tone("Join us! Be a rockstar! Ship fast!"), "casual-energetic");
    }

    #[test]
    fn test_formatting_detection() {
        assert_eq!(detect_formatting("One paragraph.\nAnother paragraph."), "narrative");
        assert_eq!(detect_formatting("- one\n- two\n- three"), "bullet-led");
    }
}
