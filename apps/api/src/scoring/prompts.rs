// LLM prompt constants for the model-blended category scorers.
// Each rubric call asks for small integer sub-scores (0–10) per dimension in
// one constrained JSON object — nothing else.

/// System prompt shared by all scoring rubric calls.
pub const RUBRIC_SYSTEM: &str = "You are a strict job-posting quality reviewer. \
    Score only what the text supports — do not reward intentions. \
    You MUST respond with valid JSON only, containing integer scores from 0 to 10. \
    Do NOT include any text outside the JSON object.";

/// Clarity rubric. Replace `{title}` and `{body}`.
/// "fluff" is scored as freedom from fluff: 10 = no filler at all.
pub const CLARITY_RUBRIC_TEMPLATE: &str = r#"Rate this job posting on three dimensions, each 0-10:

- "readability": sentence flow, plain language, absence of run-ons
- "specificity": concrete responsibilities, named tools, measurable expectations
- "fluff": freedom from filler and buzzwords (10 = none at all)

Return a JSON object with EXACTLY these keys:
{"readability": 0, "specificity": 0, "fluff": 0}

TITLE: {title}

POSTING:
{body}"#;

/// Structure rubric. Replace `{title}` and `{body}`.
pub const STRUCTURE_RUBRIC_TEMPLATE: &str = r#"Rate the structure of this job posting on three dimensions, each 0-10:

- "grouping": related content lives together under the right heading
- "ordering": sections follow a sensible reading order for a candidate
- "completeness": the expected sections exist (role, responsibilities, requirements, benefits, how to apply)

Return a JSON object with EXACTLY these keys:
{"grouping": 0, "ordering": 0, "completeness": 0}

TITLE: {title}

POSTING:
{body}"#;

/// Page-context rubric. Replace `{title}` and `{body}`.
pub const PAGE_CONTEXT_RUBRIC_TEMPLATE: &str = r#"Rate the overall presentation quality of this job posting page, each dimension 0-10:

- "professionalism": tone and polish a serious employer would publish
- "trust_signals": company identity, real contact/application path, no bait phrasing
- "completeness": a candidate could decide whether to apply from this page alone

Return a JSON object with EXACTLY these keys:
{"professionalism": 0, "trust_signals": 0, "completeness": 0}

TITLE: {title}

PAGE TEXT:
{body}"#;
