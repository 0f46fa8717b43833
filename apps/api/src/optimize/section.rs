//! Per-section optimizer — one token-budgeted completion call per section.
//!
//! A failed section call is fatal for the whole rewrite: a silently dropped
//! section would corrupt merge ordering.

use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::fingerprint::CompanyFingerprint;
use crate::llm_client::json_guard::parse_model_json;
use crate::llm_client::prompts::PRESERVE_FACTS_INSTRUCTION;
use crate::llm_client::{CompletionOptions, CompletionService};
use crate::optimize::prompts::{
    SECTION_REWRITE_SYSTEM, SECTION_REWRITE_TEMPLATE, TITLE_PRESERVE_INSTRUCTION,
};
use crate::optimize::segmenter::Section;
use crate::tokens::{compute_max_output, estimate_tokens};

/// Total-token targets for a single section call. The fallback window is
/// larger so oversized prompts still get a workable output budget.
pub const TARGET_TOTAL_TOKENS: u32 = 8_192;
pub const FALLBACK_TOTAL_TOKENS: u32 = 16_384;
pub const MIN_OUTPUT_TOKENS: u32 = 256;

const REWRITE_TEMPERATURE: f32 = 0.7;

/// Request-wide context shared by every section call.
#[derive(Debug, Clone)]
pub struct GlobalContext {
    pub company: String,
    pub role_title: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizedSection {
    pub label: String,
    pub optimized_text: String,
    #[serde(default)]
    pub change_log: Vec<String>,
    #[serde(default)]
    pub unaddressed_items: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct SectionRewrite {
    optimized_text: String,
    #[serde(default)]
    change_log: Vec<String>,
    #[serde(default)]
    unaddressed_items: Vec<String>,
}

fn is_title_section(section: &Section, ctx: &GlobalContext) -> bool {
    section.label.eq_ignore_ascii_case("title")
        || (!ctx.role_title.is_empty()
            && section.heading_text.eq_ignore_ascii_case(&ctx.role_title))
}

/// Pure prompt construction, unit-testable without any network call.
pub fn build_section_prompt(
    section: &Section,
    fingerprint: &CompanyFingerprint,
    ctx: &GlobalContext,
) -> String {
    let anchors = if fingerprint.lexical_anchors.is_empty() {
        "(none)".to_string()
    } else {
        // At most five; the fingerprint may carry a few more.
        fingerprint
            .lexical_anchors
            .iter()
            .take(5)
            .cloned()
            .collect::<Vec<_>>()
            .join(", ")
    };

    let mut extra = PRESERVE_FACTS_INSTRUCTION.to_string();
    if is_title_section(section, ctx) {
        extra.push('\n');
        extra.push_str(TITLE_PRESERVE_INSTRUCTION);
    }

    SECTION_REWRITE_TEMPLATE
        .replace("{company}", &ctx.company)
        .replace("{role_title}", &ctx.role_title)
        .replace("{tone}", &fingerprint.tone)
        .replace("{formatting}", &fingerprint.formatting)
        .replace("{anchors}", &anchors)
        .replace("{label}", &section.label)
        .replace("{extra_instructions}", &extra)
        .replace("{text}", &section.raw_text)
}

pub async fn optimize_section(
    section: &Section,
    fingerprint: &CompanyFingerprint,
    ctx: &GlobalContext,
    llm: &dyn CompletionService,
) -> Result<OptimizedSection, AppError> {
    let prompt = build_section_prompt(section, fingerprint, ctx);
    let prompt_tokens = estimate_tokens(prompt.chars().count(), 1);
    let max_output = compute_max_output(
        prompt_tokens,
        TARGET_TOTAL_TOKENS,
        MIN_OUTPUT_TOKENS,
        FALLBACK_TOTAL_TOKENS,
    );

    let options = CompletionOptions {
        temperature: Some(REWRITE_TEMPERATURE),
        response_format_json: true,
        max_output_tokens: Some(max_output),
        ..CompletionOptions::default()
    };

    let raw = llm
        .complete(&prompt, SECTION_REWRITE_SYSTEM, &options)
        .await
        .map_err(|e| AppError::Llm(format!("Section '{}' rewrite failed: {e}", section.label)))?;

    let value = parse_model_json(&raw).map_err(|e| {
        AppError::Llm(format!(
            "Section '{}' rewrite returned invalid JSON: {e}",
            section.label
        ))
    })?;

    let rewrite: SectionRewrite = serde_json::from_value(value).map_err(|e| {
        AppError::Llm(format!(
            "Section '{}' rewrite has unexpected shape: {e}",
            section.label
        ))
    })?;

    if rewrite.optimized_text.trim().is_empty() {
        return Err(AppError::Llm(format!(
            "Section '{}' rewrite produced empty text",
            section.label
        )));
    }

    Ok(OptimizedSection {
        label: section.label.clone(),
        optimized_text: rewrite.optimized_text,
        change_log: rewrite.change_log,
        unaddressed_items: rewrite.unaddressed_items,
    })
}
