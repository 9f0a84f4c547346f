//! Token signatures over sets of wrong-prediction texts.

use std::collections::HashMap;

use reflex_core::config::defaults::avoidance_terms;
use reflex_core::constants::{SIGNATURE_MIN_TOKEN_LEN, SIGNATURE_TOP_TOKENS};

/// Signature used when no token recurs across the wrong predictions.
pub const FALLBACK_SIGNATURE: &str = "uncategorized_failure";

/// Derive a failure signature from wrong-prediction texts: lowercase
/// word tokens longer than 3 chars, counted across all texts, top 5
/// recurring tokens joined by comma. Ordering is by descending count
/// then alphabetical, so the signature is deterministic.
pub fn failure_signature(texts: &[&str]) -> String {
    let mut counts: HashMap<String, u32> = HashMap::new();
    for text in texts {
        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| t.chars().count() > SIGNATURE_MIN_TOKEN_LEN)
        {
            *counts.entry(token.to_lowercase()).or_insert(0) += 1;
        }
    }

    let mut recurring: Vec<(String, u32)> =
        counts.into_iter().filter(|(_, n)| *n >= 2).collect();
    if recurring.is_empty() {
        return FALLBACK_SIGNATURE.to_string();
    }
    recurring.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    recurring
        .into_iter()
        .take(SIGNATURE_TOP_TOKENS)
        .map(|(token, _)| token)
        .collect::<Vec<_>>()
        .join(",")
}

/// True when the text carries avoidance language that would reduce
/// capability if injected as a directive.
pub fn is_capability_reducing(text: &str) -> bool {
    let lower = text.to_lowercase();
    avoidance_terms().iter().any(|term| lower.contains(term))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recurring_tokens_sorted_by_count_then_name() {
        let sig = failure_signature(&[
            "the deploy pipeline timed out again",
            "deploy pipeline stalled before the smoke test",
            "timed out waiting for the deploy",
        ]);
        let tokens: Vec<&str> = sig.split(',').collect();
        assert_eq!(tokens[0], "deploy");
        assert!(tokens.contains(&"pipeline"));
        assert!(tokens.contains(&"timed"));
        assert!(tokens.len() <= 5);
    }

    #[test]
    fn falls_back_when_nothing_repeats() {
        let sig = failure_signature(&[
            "alpha bravo charlie",
            "delta echos foxtrot",
        ]);
        assert_eq!(sig, FALLBACK_SIGNATURE);
    }

    #[test]
    fn short_tokens_never_enter_the_signature() {
        let sig = failure_signature(&["the api gateway failed", "api gateway failed again"]);
        assert_eq!(sig, "failed,gateway");
    }

    #[test]
    fn avoidance_language_is_detected_case_insensitively() {
        assert!(is_capability_reducing("NEVER run the migration twice"));
        assert!(is_capability_reducing("please avoid eager flushing"));
        assert!(!is_capability_reducing("double-check shell quoting first"));
    }
}
