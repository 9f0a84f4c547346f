//! Keyword-based domain classification.

use reflex_core::config::ReflexConfig;

/// Score free text against each configured domain's keyword table and
/// return the best-scoring domain. Falls back to the first configured
/// domain when no keyword hits at all. Deterministic; ties go to the
/// earlier domain in the configured order.
pub fn classify(text: &str, config: &ReflexConfig) -> String {
    let lower = text.to_lowercase();
    let mut best: Option<(&str, usize)> = None;

    for domain in &config.domains.configured {
        let score = config
            .domains
            .keywords
            .get(domain)
            .map(|keywords| {
                keywords
                    .iter()
                    .map(|kw| lower.matches(kw.as_str()).count())
                    .sum()
            })
            .unwrap_or(0);
        if score > 0 && best.map_or(true, |(_, s)| score > s) {
            best = Some((domain, score));
        }
    }

    best.map(|(domain, _)| domain.to_string())
        .unwrap_or_else(|| config.fallback_domain().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn picks_highest_scoring_domain() {
        let config = ReflexConfig::default();
        let domain = classify("the tool command failed to execute the script", &config);
        assert_eq!(domain, "tool_reliability");
    }

    #[test]
    fn falls_back_to_first_configured() {
        let config = ReflexConfig::default();
        let domain = classify("lorem ipsum dolor sit amet", &config);
        assert_eq!(domain, config.fallback_domain());
    }

    #[test]
    fn is_deterministic() {
        let config = ReflexConfig::default();
        let text = "we will deploy the site after the build passes its tests";
        let first = classify(text, &config);
        for _ in 0..10 {
            assert_eq!(classify(text, &config), first);
        }
    }
}
