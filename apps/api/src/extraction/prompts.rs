// LLM prompt constants for the extraction module.
// The fallback prompts are deliberately narrow: one field set, one fixed schema.

/// System prompt for location extraction — enforces JSON-only output.
pub const LOCATION_EXTRACT_SYSTEM: &str =
    "You are a precise information extraction engine for job postings. \
    Extract the work location. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT guess values that are not stated in the text.";

/// Location extraction prompt template. Replace `{body}` before sending.
pub const LOCATION_EXTRACT_PROMPT_TEMPLATE: &str = r#"Extract the work location from this job posting.

Return a JSON object with this EXACT schema (use null for unknown fields):
{
  "city": "New York",
  "state": "NY",
  "country": "US",
  "remote": false,
  "hybrid": false
}

Rules:
- "state" is a 2-letter US state code, or null outside the US
- "country" is a 2-letter ISO code when stated or clearly implied
- "remote" / "hybrid" reflect explicit statements only
- Use null, not empty strings, for anything the posting does not state

JOB POSTING:
{body}"#;

/// System prompt for compensation extraction — enforces JSON-only output.
pub const COMPENSATION_EXTRACT_SYSTEM: &str =
    "You are a precise information extraction engine for job postings. \
    Extract stated compensation. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT invent figures that are not stated in the text.";

/// Compensation extraction prompt template. Replace `{body}` before sending.
pub const COMPENSATION_EXTRACT_PROMPT_TEMPLATE: &str = r#"Extract the stated compensation from this job posting.

Return a JSON object with this EXACT schema (use null for unknown fields):
{
  "currency": "USD",
  "min": 120000,
  "max": 150000,
  "is_range": true,
  "pay_period": "year",
  "vague_terms": ["competitive"]
}

Rules:
- Amounts are plain numbers (no separators); expand "120k" to 120000
- "pay_period" is one of "year", "month", "week", "hour", or null
- "is_range" is true only when both ends of a range are stated
- "vague_terms" lists phrases like "competitive" or "DOE" if present
- Use null for anything the posting does not state

JOB POSTING:
{body}"#;

/// Truncates the body for a fallback prompt. Extraction targets almost always
/// appear early; sending the full posting wastes budget.
pub fn excerpt(body: &str, max_chars: usize) -> &str {
    match body.char_indices().nth(max_chars) {
        Some((i, _)) => &body[..i],
        None => body,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_excerpt_shorter_than_limit_is_unchanged() {
        assert_eq!(excerpt("short body", 4000), "short body");
    }

    #[test]
    fn test_excerpt_cuts_on_char_boundary() {
        let body = "é".repeat(10);
        assert_eq!(excerpt(&body, 4).chars().count(), 4);
    }
}
