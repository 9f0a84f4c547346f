//! The two governance booleans: bootstrap (time-based, derived from
//! config) and the kill switch (runtime-only, never persisted).

use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Utc;

use reflex_core::config::DeploymentConfig;

/// Per-engine-instance governance state. The kill switch is owned here
/// and exposed only through accessors, so tests and multi-instance
/// deployments get independent switches.
pub struct GovernanceGate {
    deployment: DeploymentConfig,
    kill_switch: AtomicBool,
}

impl GovernanceGate {
    pub fn new(deployment: DeploymentConfig) -> Self {
        Self {
            deployment,
            kill_switch: AtomicBool::new(false),
        }
    }

    pub fn is_private(&self) -> bool {
        self.deployment.is_private
    }

    /// Observation-only mode: tracking continues, gene creation stops.
    /// Never active on private deployments.
    pub fn bootstrap_active(&self) -> bool {
        !self.deployment.is_private
            && self
                .deployment
                .bootstrap_until
                .is_some_and(|until| Utc::now() < until)
    }

    pub fn kill_switch_active(&self) -> bool {
        self.kill_switch.load(Ordering::SeqCst)
    }

    /// Flip the kill switch. Affects only gene injection; tracking and
    /// resolution continue unaffected.
    pub fn set_kill_switch(&self, active: bool) {
        let previous = self.kill_switch.swap(active, Ordering::SeqCst);
        if previous != active {
            tracing::warn!(active, "kill switch changed");
        }
    }
}
