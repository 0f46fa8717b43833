// Prompt templates for the rewrite pipeline. Construction is pure string
// assembly; builders live next to their call sites in section.rs/coherence.rs.

pub const SECTION_REWRITE_SYSTEM: &str = "You are an expert job-posting editor. \
    You rewrite one section at a time to be clearer, more specific, and better \
    structured, while keeping the employer's voice and every factual claim intact.";

pub const SECTION_REWRITE_TEMPLATE: &str = r#"Company: {company}
Role title: {role_title}
Desired tone: {tone}
Formatting style: {formatting}
Brand phrases to preserve verbatim: {anchors}

Rewrite the "{label}" section of this job posting. Improve clarity, specificity,
and structure. Keep the section's meaning and scope — do not invent facts,
requirements, or benefits.
{extra_instructions}

Respond with a JSON object in exactly this shape:
{"optimized_text": "<the rewritten section>", "change_log": ["<one entry per meaningful change>"], "unaddressed_items": ["<problems you could not fix from this section alone>"]}

Section text:
{text}"#;

/// Appended for sections identified as the role title.
pub const TITLE_PRESERVE_INSTRUCTION: &str = "This section is the role title. \
    Preserve the title text exactly as written; correcting an obvious typo is \
    the only permitted change.";

pub const COHERENCE_SYSTEM: &str = "You are an expert job-posting editor doing a \
    final read of a document whose sections were rewritten independently. Unify \
    tone and improve transitions only.";

pub const COHERENCE_TEMPLATE: &str = r#"Company: {company}
Desired tone: {tone}
Brand phrases to preserve verbatim: {anchors}
Extracted facts that must survive unchanged:
{facts}

Below is the full rewritten posting. Smooth transitions between sections and
unify the tone. You MUST keep every heading, every location statement, and every
compensation figure exactly as written. Do not add, remove, or reorder sections.

Respond with a JSON object in exactly this shape:
{"optimized_text": "<the full document>", "change_log": ["<one entry per change>"], "unaddressed_items": []}

Document:
{text}"#;
