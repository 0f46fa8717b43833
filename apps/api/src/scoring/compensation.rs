//! Compensation scorer — composes the extractor and the compliance engine
//! into a status ladder with pre-assigned point values.
//!
//! Jurisdiction requirements can only lower the final value, never raise it.

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::compliance::disclosure_required;
use crate::extraction::CompensationFields;
use crate::scoring::{CategoryScore, DerivedFacts, NO_ACTION_NEEDED};

pub const MAX_SCORE: f64 = 10.0;

/// Score a non-compliant posting is capped at when disclosure is required.
const COMPLIANCE_CAP: f64 = 2.0;

/// Disclosure quality ladder, best to worst.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompensationStatus {
    RangeFull,
    RangeMissingPeriod,
    SingleFull,
    VagueTerms,
    Missing,
}

impl CompensationStatus {
    pub fn for_fields(fields: &CompensationFields) -> Self {
        let has_currency = fields.currency.is_some();
        let has_period = fields.pay_period.is_some();

        if fields.is_range && has_currency && has_period {
            CompensationStatus::RangeFull
        } else if fields.is_range {
            CompensationStatus::RangeMissingPeriod
        } else if fields.min.is_some() && has_currency && has_period {
            CompensationStatus::SingleFull
        } else if !fields.vague_terms.is_empty() {
            CompensationStatus::VagueTerms
        } else {
            CompensationStatus::Missing
        }
    }

    pub fn points(self) -> f64 {
        match self {
            CompensationStatus::RangeFull => 10.0,
            CompensationStatus::RangeMissingPeriod => 7.0,
            CompensationStatus::SingleFull => 5.0,
            CompensationStatus::VagueTerms => 2.0,
            CompensationStatus::Missing => 0.0,
        }
    }

    fn suggestion(self) -> Option<&'static str> {
        match self {
            CompensationStatus::RangeFull => None,
            CompensationStatus::RangeMissingPeriod => {
                Some("State the pay period and currency alongside the salary range.")
            }
            CompensationStatus::SingleFull => {
                Some("Publish a salary range rather than a single figure.")
            }
            CompensationStatus::VagueTerms => Some(
                "Replace vague compensation language (\"competitive\", \"DOE\") with a real range.",
            ),
            CompensationStatus::Missing => {
                Some("Add compensation information — postings with ranges convert better.")
            }
        }
    }
}

pub fn score(facts: &DerivedFacts) -> CategoryScore {
    let fields = &facts.compensation.fields;
    let status = CompensationStatus::for_fields(fields);
    let mut score = status.points();
    let mut suggestions = Vec::new();

    if disclosure_required(&facts.jurisdictions) && status != CompensationStatus::RangeFull {
        score = score.min(COMPLIANCE_CAP);
        // The legal requirement goes first — it outranks style advice.
        suggestions.push(format!(
            "Pay transparency disclosure is required in: {}. Publish a full salary range \
             with currency and pay period.",
            facts.jurisdictions.join("; ")
        ));
    }

    if let Some(s) = status.suggestion() {
        suggestions.push(s.to_string());
    }
    if suggestions.is_empty() {
        suggestions.push(NO_ACTION_NEEDED.to_string());
    }

    CategoryScore::new(
        score,
        MAX_SCORE,
        json!({
            "status": status,
            "confidence": facts.compensation.confidence,
            "source": facts.compensation.source,
            "jurisdictions": facts.jurisdictions,
            "vague_terms": fields.vague_terms,
        }),
        suggestions,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extraction::{Extraction, LocationFields};

    fn facts(fields: CompensationFields, jurisdictions: Vec<&str>) -> DerivedFacts {
        DerivedFacts {
            location: Extraction::deterministic(LocationFields::default(), 0.0),
            compensation: Extraction::deterministic(fields, 0.8),
            jurisdictions: jurisdictions.into_iter().map(str::to_string).collect(),
        }
    }

    fn full_range() -> CompensationFields {
        CompensationFields {
            currency: Some("USD".to_string()),
            min: Some(120_000.0),
            max: Some(150_000.0),
            is_range: true,
            pay_period: Some("year".to_string()),
            vague_terms: vec![],
        }
    }

    #[test]
    fn test_full_range_scores_max() {
        let result = score(&facts(full_range(), vec![]));
        assert_eq!(result.score, MAX_SCORE);
        assert_eq!(result.suggestions, vec![NO_ACTION_NEEDED.to_string()]);
    }

    #[test]
    fn test_vague_terms_strictly_below_full_range() {
        let vague = CompensationFields {
            vague_terms: vec!["competitive".to_string()],
            ..CompensationFields::default()
        };
        let result = score(&facts(vague, vec![]));
        assert_eq!(
            CompensationStatus::for_fields(&CompensationFields {
                vague_terms: vec!["competitive".to_string()],
                ..CompensationFields::default()
            }),
            CompensationStatus::VagueTerms
        );
        assert!(result.score < CompensationStatus::RangeFull.points());
    }

    #[test]
    fn test_status_ladder_is_strictly_ordered() {
        let ladder = [
            CompensationStatus::RangeFull,
            CompensationStatus::RangeMissingPeriod,
            CompensationStatus::SingleFull,
            CompensationStatus::VagueTerms,
            CompensationStatus::Missing,
        ];
        for pair in ladder.windows(2) {
            assert!(pair[0].points() > pair[1].points());
        }
    }

    #[test]
    fn test_jurisdiction_caps_non_compliant_posting() {
        let partial = CompensationFields {
            currency: Some("USD".to_string()),
            min: Some(120_000.0),
            max: None,
            is_range: false,
            pay_period: Some("year".to_string()),
            vague_terms: vec![],
        };
        let result = score(&facts(partial, vec!["New York (S9427A)"]));
        assert!(result.score <= COMPLIANCE_CAP);
        assert!(result.suggestions[0].contains("New York"));
    }

    #[test]
    fn test_jurisdiction_never_raises_compliant_posting() {
        let result = score(&facts(full_range(), vec!["Colorado (Equal Pay for Equal Work Act)"]));
        assert_eq!(result.score, MAX_SCORE);
    }

    #[test]
    fn test_missing_compensation_scores_zero() {
        let result = score(&facts(CompensationFields::default(), vec![]));
        assert_eq!(result.score, 0.0);
        assert!(result.suggestions[0].contains("compensation"));
    }

    #[test]
    fn test_range_without_period_mid_ladder() {
        let fields = CompensationFields {
            currency: Some("USD".to_string()),
            min: Some(90_000.0),
            max: Some(120_000.0),
            is_range: true,
            pay_period: None,
            vague_terms: vec![],
        };
        let result = score(&facts(fields, vec![]));
        assert_eq!(result.score, 7.0);
    }
}
