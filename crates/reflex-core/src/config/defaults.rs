//! Default values and tables for the engine configuration.

use std::collections::HashMap;

/// Multiplicative decay applied to pain/satisfaction per resolution and
/// per sweep.
pub const DEFAULT_DECAY_RATE: f64 = 0.9;

/// EMA smoothing factor for the calibration offset.
pub const DEFAULT_CALIBRATION_ALPHA: f64 = 0.15;

/// Pain bump applied to each adjacent domain on a wrong resolution.
pub const DEFAULT_CASCADE_PAIN: f64 = 0.03;

/// Accuracy movement beyond which a trend is called improving/declining.
pub const DEFAULT_TREND_THRESHOLD: f64 = 0.1;

/// Pending predictions older than this are expired by the sweeper.
pub const DEFAULT_PENDING_EXPIRY_DAYS: i64 = 7;

/// Domain history and calibration snapshots older than this are pruned.
pub const DEFAULT_RETENTION_DAYS: i64 = 90;

/// Dormant genes below this strength are hard-deleted by the sweeper.
pub const DEFAULT_WEAK_GENE_STRENGTH: f64 = 0.05;

/// Emerging patterns below this frequency are pruned by the sweeper.
pub const DEFAULT_WEAK_PATTERN_FREQUENCY: u32 = 2;

/// Confirmations needed before the sweeper auto-activates a
/// pending-review gene (with zero contradictions).
pub const DEFAULT_AUTO_ACTIVATE_CONFIRMATIONS: u32 = 5;

/// Recommended interval between sweeps (5h).
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 5 * 3600;

/// Active genes allowed per (domain, owner).
pub const DEFAULT_MAX_ACTIVE_GENES: u64 = 20;

/// Strength adjustment on confirm.
pub const DEFAULT_CONFIRM_BONUS: f64 = 0.1;

/// Strength adjustment on contradict.
pub const DEFAULT_CONTRADICT_PENALTY: f64 = 0.15;

/// Pattern frequency at which promotion into a gene is attempted.
pub const DEFAULT_PROMOTION_FREQUENCY: u32 = 3;

/// Raised promotion bar for capability-reducing gene text.
pub const DEFAULT_CAPABILITY_REDUCING_FREQUENCY: u32 = 5;

/// Confidence assigned to a freshly mined pattern.
pub const DEFAULT_PATTERN_BASE_CONFIDENCE: f64 = 0.3;

/// Confidence bump when an existing pattern is strengthened.
pub const DEFAULT_PATTERN_CONFIDENCE_STEP: f64 = 0.1;

/// Default configured domains; the first one is the classifier fallback.
pub fn default_domains() -> Vec<String> {
    [
        "general_competence",
        "tool_reliability",
        "code_generation",
        "time_estimation",
        "task_planning",
        "communication",
        "error_avoidance",
        "model_routing",
        "deployment",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// Per-domain keyword tables used by the classifier.
pub fn default_keywords() -> HashMap<String, Vec<String>> {
    fn words(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }
    let mut map = HashMap::new();
    map.insert(
        "tool_reliability".to_string(),
        words(&["tool", "command", "execute", "script", "api", "call", "invoke", "crash"]),
    );
    map.insert(
        "code_generation".to_string(),
        words(&["code", "function", "compile", "implement", "refactor", "bug", "test", "syntax"]),
    );
    map.insert(
        "time_estimation".to_string(),
        words(&["minutes", "hours", "days", "deadline", "estimate", "schedule", "soon", "quick"]),
    );
    map.insert(
        "task_planning".to_string(),
        words(&["plan", "step", "task", "workflow", "sequence", "milestone", "breakdown"]),
    );
    map.insert(
        "communication".to_string(),
        words(&["explain", "clarify", "summary", "answer", "tone", "question", "respond"]),
    );
    map.insert(
        "error_avoidance".to_string(),
        words(&["error", "fail", "failure", "exception", "invalid", "wrong", "mistake", "retry"]),
    );
    map.insert(
        "model_routing".to_string(),
        words(&["model", "routing", "fallback", "provider", "latency", "token", "context"]),
    );
    map.insert(
        "deployment".to_string(),
        words(&["deploy", "build", "publish", "site", "hosting", "release", "pipeline", "dns"]),
    );
    map
}

/// Cascade adjacency: a wrong resolution in the key domain bumps pain in
/// the listed domains. Asymmetric on purpose; relationships mirror the
/// source system's hand-maintained table.
/// TODO: confirm the intended pairs with the product owner before adding more.
pub fn default_adjacency() -> HashMap<String, Vec<String>> {
    fn doms(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }
    let mut map = HashMap::new();
    map.insert(
        "tool_reliability".to_string(),
        doms(&["error_avoidance", "task_planning"]),
    );
    map.insert("model_routing".to_string(), doms(&["tool_reliability"]));
    map.insert("code_generation".to_string(), doms(&["error_avoidance"]));
    map.insert(
        "deployment".to_string(),
        doms(&["tool_reliability", "time_estimation"]),
    );
    map.insert("time_estimation".to_string(), doms(&["task_planning"]));
    map
}

/// Avoidance vocabulary that marks promoted gene text capability-reducing.
pub fn avoidance_terms() -> &'static [&'static str] {
    &[
        "avoid", "never", "stop", "skip", "refuse", "disable", "remove", "block", "prevent",
        "prohibit",
    ]
}
