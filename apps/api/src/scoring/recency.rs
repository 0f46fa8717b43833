//! Recency scorer — posting-date detection and age banding. Purely deterministic.
//!
//! `today` is passed in rather than read from the system clock so tests are
//! stable; the orchestrator supplies `Utc::now().date_naive()`.

use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use serde_json::json;

use crate::document::Document;
use crate::scoring::{CategoryScore, NO_ACTION_NEEDED};

pub const MAX_SCORE: f64 = 5.0;
const NEUTRAL_SCORE: f64 = 2.0;

static ISO_DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{4})-(\d{2})-(\d{2})\b").expect("iso date regex is valid"));

static POSTED_AGO_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)posted\s+(\d+)\s+days?\s+ago").expect("posted-ago regex is valid")
});

static MONTH_DATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(January|February|March|April|May|June|July|August|September|October|November|December)\s+(\d{1,2}),?\s+(\d{4})\b")
        .expect("month date regex is valid")
});

fn month_number(name: &str) -> u32 {
    match name.to_lowercase().as_str() {
        "january" => 1,
        "february" => 2,
        "march" => 3,
        "april" => 4,
        "may" => 5,
        "june" => 6,
        "july" => 7,
        "august" => 8,
        "september" => 9,
        "october" => 10,
        "november" => 11,
        _ => 12,
    }
}

/// Finds the posting's age in days, checking body first, then markup.
pub fn detect_age_days(doc: &Document, today: NaiveDate) -> Option<i64> {
    let haystacks = [Some(doc.body.as_str()), doc.markup.as_deref()];

    for text in haystacks.into_iter().flatten() {
        if let Some(caps) = POSTED_AGO_RE.captures(text) {
            if let Ok(days) = caps[1].parse::<i64>() {
                return Some(days);
            }
        }
        if let Some(date) = find_date(text) {
            return Some((today - date).num_days());
        }
    }
    None
}

fn find_date(text: &str) -> Option<NaiveDate> {
    if let Some(caps) = ISO_DATE_RE.captures(text) {
        let (y, m, d) = (
            caps[1].parse().ok()?,
            caps[2].parse().ok()?,
            caps[3].parse().ok()?,
        );
        if let Some(date) = NaiveDate::from_ymd_opt(y, m, d) {
            return Some(date);
        }
    }
    if let Some(caps) = MONTH_DATE_RE.captures(text) {
        let month = month_number(&caps[1]);
        let (day, year) = (caps[2].parse().ok()?, caps[3].parse().ok()?);
        return NaiveDate::from_ymd_opt(year, month, day);
    }
    None
}

pub fn score(doc: &Document, today: NaiveDate) -> CategoryScore {
    let Some(age) = detect_age_days(doc, today) else {
        return CategoryScore::new(
            NEUTRAL_SCORE,
            MAX_SCORE,
            json!({ "age_days": null }),
            vec![
                "No posting date found — show when the role was posted so candidates \
                 know it is live."
                    .to_string(),
            ],
        );
    };

    let (score, suggestion) = match age {
        i64::MIN..=13 => (5.0, None),
        14..=30 => (4.0, None),
        31..=60 => (3.0, Some("The posting is over a month old — refresh or repost it.")),
        61..=90 => (2.0, Some("The posting is over two months old — repost it.")),
        _ => (
            1.0,
            Some("The posting is stale (90+ days) — candidates will assume it is filled."),
        ),
    };

    let suggestions = match suggestion {
        Some(s) => vec![s.to_string()],
        None => vec![NO_ACTION_NEEDED.to_string()],
    };

    CategoryScore::new(score, MAX_SCORE, json!({ "age_days": age }), suggestions)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(body: &str) -> Document {
        Document {
            title: "Engineer".to_string(),
            body: body.to_string(),
            markup: None,
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 15).unwrap()
    }

    #[test]
    fn test_fresh_iso_date_scores_max() {
        let result = score(&doc("Posted: 2025-06-10"), today());
        assert_eq!(result.score, MAX_SCORE);
        assert_eq!(result.suggestions, vec![NO_ACTION_NEEDED.to_string()]);
    }

    #[test]
    fn test_posted_days_ago_phrase() {
        let result = score(&doc("Posted 45 days ago"), today());
        assert_eq!(result.score, 3.0);
    }

    #[test]
    fn test_month_name_date() {
        assert_eq!(
            find_date("Published on March 1, 2025").unwrap(),
            NaiveDate::from_ymd_opt(2025, 3, 1).unwrap()
        );
    }

    #[test]
    fn test_stale_posting_scores_low() {
        let result = score(&doc("Posted: 2024-09-01"), today());
        assert_eq!(result.score, 1.0);
        assert!(result.suggestions[0].contains("stale"));
    }

    #[test]
    fn test_no_date_is_neutral_not_zero() {
        let result = score(&doc("No dates here at all."), today());
        assert_eq!(result.score, NEUTRAL_SCORE);
        assert!(result.suggestions[0].contains("posting date"));
    }

    #[test]
    fn test_date_in_markup_used_when_body_has_none() {
        let d = Document {
            title: "Engineer".to_string(),
            body: "No dates here.".to_string(),
            markup: Some(r#"<meta itemprop="datePosted" content="2025-06-12">"#.to_string()),
        };
        let result = score(&d, today());
        assert_eq!(result.score, MAX_SCORE);
    }
}
