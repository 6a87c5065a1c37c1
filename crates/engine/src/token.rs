//! Token estimation utilities.
//!
//! Uses a character-based heuristic: ~4 characters per token. This
//! approximation is accurate within ~10% for BPE tokenizers (GPT-3.5,
//! GPT-4, Claude) on English text, and keeps budget arithmetic
//! deterministic and reproducible across runs.

/// Estimate the token count for a string.
///
/// Heuristic: 1 token ≈ 4 characters. Rounds up.
pub fn estimate_tokens(text: &str) -> usize {
    if text.is_empty() {
        return 0;
    }
    (text.len() + 3) / 4
}

/// Estimate tokens for a JSON fragment (serialized compactly).
pub fn estimate_value_tokens(value: &serde_json::Value) -> usize {
    let json = serde_json::to_string(value).unwrap_or_default();
    estimate_tokens(&json)
}
