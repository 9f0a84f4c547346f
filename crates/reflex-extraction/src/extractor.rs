//! Template scan over assistant output.

use std::collections::HashSet;

use reflex_core::config::ReflexConfig;
use reflex_core::constants::{
    MAX_EXTRACTED_LEN, MAX_PREDICTIONS_PER_MESSAGE, MIN_EXTRACTED_LEN, MIN_EXTRACTION_INPUT_LEN,
};
use reflex_core::models::{PredictionType, Score};

use crate::classifier;
use crate::templates;

/// One extracted forward-looking statement, before persistence.
#[derive(Debug, Clone)]
pub struct ExtractedPrediction {
    pub text: String,
    pub prediction_type: PredictionType,
    pub confidence: Score,
    pub domain: String,
    /// Name of the template that produced the match.
    pub template: &'static str,
}

/// Scan assistant output for forward-looking statements.
///
/// Skips input under 50 chars; trims each match to 300 chars; drops
/// matches under 15 chars or case-insensitively duplicated within the
/// call; caps the result at 8. Pure function.
pub fn extract(text: &str, config: &ReflexConfig) -> Vec<ExtractedPrediction> {
    if text.chars().count() < MIN_EXTRACTION_INPUT_LEN {
        return Vec::new();
    }

    let mut results = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();

    for template in templates::all_templates() {
        let Some(re) = template.regex.as_ref() else {
            continue;
        };
        for mat in re.find_iter(text) {
            let candidate: String = mat.as_str().trim().chars().take(MAX_EXTRACTED_LEN).collect();
            if candidate.chars().count() < MIN_EXTRACTED_LEN {
                continue;
            }
            if !seen.insert(candidate.to_lowercase()) {
                continue;
            }
            let domain = classifier::classify(&candidate, config);
            results.push(ExtractedPrediction {
                text: candidate,
                prediction_type: template.prediction_type,
                confidence: Score::new(template.base_confidence),
                domain,
                template: template.name,
            });
            if results.len() >= MAX_PREDICTIONS_PER_MESSAGE {
                return results;
            }
        }
    }

    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn config() -> ReflexConfig {
        ReflexConfig::default()
    }

    #[test]
    fn skips_short_input() {
        assert!(extract("this will fail", &config()).is_empty());
    }

    #[test]
    fn extracts_a_forecast_with_type_and_domain() {
        let text = "I reviewed the change. I expect the build to pass once the dependency \
                    cache is warm, so we can merge afterwards.";
        let results = extract(text, &config());
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].prediction_type, PredictionType::ExplicitForecast);
        assert!((results[0].confidence.value() - 0.7).abs() < 1e-9);
    }

    #[test]
    fn deduplicates_case_insensitively() {
        let text = "This will break on large inputs. Later in the message: THIS WILL BREAK \
                    ON LARGE INPUTS. And that is all I have to say about the matter here.";
        let results = extract(text, &config());
        assert_eq!(results.len(), 1);
    }

    #[test]
    fn caps_output_at_eight() {
        let mut text = String::from("Status report on all of the subsystems follows. ");
        for i in 0..12 {
            text.push_str(&format!(
                "This will surely complete stage number {i} of the rollout without issue. "
            ));
        }
        let results = extract(&text, &config());
        assert_eq!(results.len(), MAX_PREDICTIONS_PER_MESSAGE);
    }

    #[test]
    fn drops_tiny_matches() {
        // Under 15 chars after trimming.
        let text = format!("{} it will do.", "padding to get past the input gate. ");
        let results = extract(&text, &config());
        assert!(results.iter().all(|r| r.text.chars().count() >= MIN_EXTRACTED_LEN));
    }

    #[test]
    fn risk_warnings_are_tagged() {
        let text = "Heads up before we run this: the export step might fail on rows with \
                    embedded newlines, so keep an eye on the logs.";
        let results = extract(text, &config());
        assert!(results
            .iter()
            .any(|r| r.prediction_type == PredictionType::RiskWarning));
    }

    proptest! {
        #[test]
        fn output_respects_the_caps(text in ".{0,2000}") {
            let results = extract(&text, &config());
            prop_assert!(results.len() <= MAX_PREDICTIONS_PER_MESSAGE);
            for r in &results {
                let len = r.text.chars().count();
                prop_assert!(len >= MIN_EXTRACTED_LEN && len <= MAX_EXTRACTED_LEN);
            }
        }

        #[test]
        fn never_emits_case_duplicates(text in "[a-zA-Z .,]{0,1500}") {
            let results = extract(&text, &config());
            let mut seen = HashSet::new();
            for r in &results {
                prop_assert!(seen.insert(r.text.to_lowercase()));
            }
        }
    }
}
