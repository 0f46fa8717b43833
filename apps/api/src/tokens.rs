//! Token Budget Estimator — converts content size to token counts and
//! output-length allocations for completion-service calls.
//!
//! The ~4 chars/token heuristic is deliberately rough; budgets only need to keep
//! requests inside the service's context window, not predict exact usage.

/// Fixed per-section overhead covering headings, JSON framing, and instructions.
pub const STRUCTURAL_OVERHEAD: u32 = 48;

/// Estimated prompt tokens for `char_len` characters across `section_count`
/// structural units: `ceil(char_len / 4) + section_count * STRUCTURAL_OVERHEAD`.
pub fn estimate_tokens(char_len: usize, section_count: usize) -> u32 {
    let content = char_len.div_ceil(4) as u32;
    content + (section_count as u32) * STRUCTURAL_OVERHEAD
}

/// Picks the output-token budget for a call with `prompt_tokens` already spent.
///
/// Prefers `target_total - prompt_tokens` when that leaves at least `min_output`;
/// falls back to `fallback_total - prompt_tokens` under the same condition; else
/// returns the best (possibly sub-minimum) non-negative remainder. Never negative.
pub fn compute_max_output(
    prompt_tokens: u32,
    target_total: u32,
    min_output: u32,
    fallback_total: u32,
) -> u32 {
    let from_target = target_total.saturating_sub(prompt_tokens);
    if from_target >= min_output {
        return from_target;
    }

    let from_fallback = fallback_total.saturating_sub(prompt_tokens);
    if from_fallback >= min_output {
        return from_fallback;
    }

    from_target.max(from_fallback)
}
