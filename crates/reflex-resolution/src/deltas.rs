//! The fixed delta table applied per verification verdict.

use reflex_core::models::OutcomeResult;

/// Statistical deltas for one outcome. Pain and satisfaction are added
/// after the decay step; the confidence delta is recorded on the outcome
/// as an audit of how the verdict would move declared confidence.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutcomeDeltas {
    pub pain: f64,
    pub satisfaction: f64,
    pub confidence: f64,
}

impl OutcomeDeltas {
    /// Deltas for a verdict. The table is fixed by contract, not tunable.
    pub fn for_result(result: OutcomeResult) -> Self {
        match result {
            OutcomeResult::Correct => Self {
                pain: 0.0,
                satisfaction: 0.15,
                confidence: 0.05,
            },
            OutcomeResult::Wrong => Self {
                pain: 0.2,
                satisfaction: 0.0,
                confidence: -0.1,
            },
            OutcomeResult::Partial => Self {
                pain: 0.05,
                satisfaction: 0.05,
                confidence: 0.0,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delta_table_is_exact() {
        let correct = OutcomeDeltas::for_result(OutcomeResult::Correct);
        assert_eq!(correct.pain, 0.0);
        assert_eq!(correct.satisfaction, 0.15);
        assert_eq!(correct.confidence, 0.05);

        let wrong = OutcomeDeltas::for_result(OutcomeResult::Wrong);
        assert_eq!(wrong.pain, 0.2);
        assert_eq!(wrong.satisfaction, 0.0);
        assert_eq!(wrong.confidence, -0.1);

        let partial = OutcomeDeltas::for_result(OutcomeResult::Partial);
        assert_eq!(partial.pain, 0.05);
        assert_eq!(partial.satisfaction, 0.05);
        assert_eq!(partial.confidence, 0.0);
    }
}
