// Shared prompt constants and prompt-building utilities.
// Each service that needs LLM calls defines its own prompts.rs alongside it.
// This file contains cross-cutting prompt fragments.

/// System prompt fragment that enforces JSON-only output.
pub const JSON_ONLY_SYSTEM: &str = "You are a precise, structured assistant. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Common instruction appended to all rewrite prompts.
pub const PRESERVE_FACTS_INSTRUCTION: &str = "\
    CRITICAL: Never alter factual claims. Locations, compensation figures, dates, \
    company names, and role titles must appear in the output exactly as in the input. \
    If a sentence states where the role is based, preserve that statement verbatim.";
