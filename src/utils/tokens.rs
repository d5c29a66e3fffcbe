//! Token estimation for prompt budgets.

/// Estimate tokens for text (simple heuristic: ~4 bytes per token).
pub fn estimate_tokens(text: &str) -> usize {
    text.len().div_ceil(4)
}
