//! Engine configuration: deployment flags, domain tables, tunables.

pub mod defaults;

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::{ReflexError, ReflexResult};

/// Deployment-level flags from the configuration provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeploymentConfig {
    /// Private deployments may approve genes and skip review gating.
    pub is_private: bool,
    /// While now < bootstrap_until on a non-private deployment, the
    /// engine observes but creates no genes.
    pub bootstrap_until: Option<DateTime<Utc>>,
}

impl Default for DeploymentConfig {
    fn default() -> Self {
        Self {
            is_private: true,
            bootstrap_until: None,
        }
    }
}

/// Domain tables: the configured list, classifier keywords, and the
/// cascade adjacency. All carried as data, not code.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DomainConfig {
    /// Configured domains; the first is the classifier fallback.
    pub configured: Vec<String>,
    pub keywords: HashMap<String, Vec<String>>,
    pub adjacency: HashMap<String, Vec<String>>,
    pub decay_rate: f64,
}

impl Default for DomainConfig {
    fn default() -> Self {
        Self {
            configured: defaults::default_domains(),
            keywords: defaults::default_keywords(),
            adjacency: defaults::default_adjacency(),
            decay_rate: defaults::DEFAULT_DECAY_RATE,
        }
    }
}

/// Resolution tunables.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolutionConfig {
    pub calibration_alpha: f64,
    pub cascade_pain: f64,
    pub trend_threshold: f64,
}

impl Default for ResolutionConfig {
    fn default() -> Self {
        Self {
            calibration_alpha: defaults::DEFAULT_CALIBRATION_ALPHA,
            cascade_pain: defaults::DEFAULT_CASCADE_PAIN,
            trend_threshold: defaults::DEFAULT_TREND_THRESHOLD,
        }
    }
}

/// Genome tunables.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenomeConfig {
    pub max_active_per_domain: u64,
    pub confirm_bonus: f64,
    pub contradict_penalty: f64,
    pub promotion_frequency: u32,
    pub capability_reducing_frequency: u32,
    pub pattern_base_confidence: f64,
    pub pattern_confidence_step: f64,
}

impl Default for GenomeConfig {
    fn default() -> Self {
        Self {
            max_active_per_domain: defaults::DEFAULT_MAX_ACTIVE_GENES,
            confirm_bonus: defaults::DEFAULT_CONFIRM_BONUS,
            contradict_penalty: defaults::DEFAULT_CONTRADICT_PENALTY,
            promotion_frequency: defaults::DEFAULT_PROMOTION_FREQUENCY,
            capability_reducing_frequency: defaults::DEFAULT_CAPABILITY_REDUCING_FREQUENCY,
            pattern_base_confidence: defaults::DEFAULT_PATTERN_BASE_CONFIDENCE,
            pattern_confidence_step: defaults::DEFAULT_PATTERN_CONFIDENCE_STEP,
        }
    }
}

/// Lifecycle sweeper tunables.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LifecycleConfig {
    pub pending_expiry_days: i64,
    pub history_retention_days: i64,
    pub calibration_retention_days: i64,
    pub weak_gene_strength: f64,
    pub weak_pattern_frequency: u32,
    pub auto_activate_confirmations: u32,
    pub sweep_interval_secs: u64,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            pending_expiry_days: defaults::DEFAULT_PENDING_EXPIRY_DAYS,
            history_retention_days: defaults::DEFAULT_RETENTION_DAYS,
            calibration_retention_days: defaults::DEFAULT_RETENTION_DAYS,
            weak_gene_strength: defaults::DEFAULT_WEAK_GENE_STRENGTH,
            weak_pattern_frequency: defaults::DEFAULT_WEAK_PATTERN_FREQUENCY,
            auto_activate_confirmations: defaults::DEFAULT_AUTO_ACTIVATE_CONFIRMATIONS,
            sweep_interval_secs: defaults::DEFAULT_SWEEP_INTERVAL_SECS,
        }
    }
}

/// Root configuration for one engine instance.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReflexConfig {
    pub deployment: DeploymentConfig,
    pub domains: DomainConfig,
    pub resolution: ResolutionConfig,
    pub genome: GenomeConfig,
    pub lifecycle: LifecycleConfig,
}

impl ReflexConfig {
    /// Parse from TOML, falling back to defaults for absent sections.
    pub fn from_toml_str(input: &str) -> ReflexResult<Self> {
        toml::from_str(input).map_err(|e| ReflexError::Config {
            message: e.to_string(),
        })
    }

    /// The classifier fallback domain (first configured).
    pub fn fallback_domain(&self) -> &str {
        self.domains
            .configured
            .first()
            .map(String::as_str)
            .unwrap_or("general_competence")
    }

    /// Adjacent domains receiving cascade pain for the given domain,
    /// filtered to those actually configured.
    pub fn cascade_targets(&self, domain: &str) -> Vec<String> {
        self.domains
            .adjacency
            .get(domain)
            .map(|targets| {
                targets
                    .iter()
                    .filter(|t| self.domains.configured.iter().any(|d| d == *t))
                    .take(2)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_have_fallback_first() {
        let cfg = ReflexConfig::default();
        assert_eq!(cfg.fallback_domain(), "general_competence");
        assert!(cfg.domains.decay_rate > 0.0 && cfg.domains.decay_rate < 1.0);
    }

    #[test]
    fn cascade_targets_capped_at_two() {
        let cfg = ReflexConfig::default();
        for domain in &cfg.domains.configured {
            assert!(cfg.cascade_targets(domain).len() <= 2);
        }
    }

    #[test]
    fn parses_partial_toml() {
        let cfg = ReflexConfig::from_toml_str(
            r#"
            [deployment]
            is_private = false

            [genome]
            max_active_per_domain = 10
            "#,
        )
        .unwrap();
        assert!(!cfg.deployment.is_private);
        assert_eq!(cfg.genome.max_active_per_domain, 10);
        // Untouched sections fall back to defaults.
        assert_eq!(cfg.lifecycle.pending_expiry_days, 7);
    }

    #[test]
    fn cascade_is_depth_one_data() {
        let cfg = ReflexConfig::default();
        // model_routing cascades into tool_reliability but not back.
        assert!(cfg.cascade_targets("model_routing").contains(&"tool_reliability".to_string()));
        assert!(!cfg.cascade_targets("tool_reliability").contains(&"model_routing".to_string()));
    }
}
